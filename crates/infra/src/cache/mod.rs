//! Cache backends for spec documents and responses

pub mod moka_backend;

pub use moka_backend::{MokaCacheBackend, MokaCacheConfig, NoCache};
