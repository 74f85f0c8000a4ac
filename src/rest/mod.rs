//! Connected Systems REST API
//!
//! Thin client over the resource collections of a sensor hub. Higher layers
//! ask for "list systems" or "create a datastream under system X"; this module
//! owns URL construction, basic auth, pagination and status mapping.

mod client;
mod error;
mod resource_types;

pub use client::{ApiConfig, ApiHelper, Credentials, Protocol, DEFAULT_API_ROOT};
pub use error::{ApiError, ApiResult};
pub use resource_types::ResourceType;
