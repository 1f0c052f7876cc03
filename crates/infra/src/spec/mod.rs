//! Swagger document resolution and parsing

pub mod document;
pub mod resolver;

pub use document::{OperationSpec, ParameterLocation, ParameterSpec, Resource, SpecDocument};
pub use resolver::{SpecConfig, SpecResolver};
