//! Domain types and models

pub mod call;
pub mod credential;
pub mod http;

pub use call::{CallOptions, RequestConfig, RequestTimeout};
pub use credential::Credential;
pub use http::{PreparedRequest, RawResponse};
