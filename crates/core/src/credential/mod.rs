//! Credential ports and the sweep service

pub mod ports;
pub mod sweep;
