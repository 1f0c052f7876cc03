//! Request pipeline helpers shared by the caching future

pub mod cache_key;
pub mod expiry;
pub mod retry;
