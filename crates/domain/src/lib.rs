//! # ESI Domain
//!
//! Domain types and models for the EVE Swagger Interface client.
//!
//! This crate contains:
//! - Domain data types (Credential, CallOptions, PreparedRequest, etc.)
//! - Domain error types and Result definitions
//! - Client settings
//! - Domain constants
//!
//! ## Architecture
//! - No dependencies on other ESI crates
//! - Only external dependencies allowed
//! - Pure domain models and data structures

pub mod config;
pub mod constants;
pub mod errors;
pub mod types;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
