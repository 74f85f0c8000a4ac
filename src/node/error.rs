//! Node error types

use thiserror::Error;

use crate::models::ValidationError;
use crate::rest::ApiError;
use crate::streaming::SessionError;

/// Errors raised by nodes and the resources they manage
#[derive(Error, Debug)]
pub enum NodeError {
    #[error("Node is not registered with a session manager")]
    NoSession,

    #[error("Invalid node configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to build REST client: {0}")]
    Client(ApiError),

    #[error("API error: {0}")]
    Api(#[from] ApiError),

    #[error("Failed to create {resource}: {reason}")]
    Creation { resource: String, reason: String },

    #[error("Failed to submit observation: {0}")]
    Submission(String),

    #[error("{0} has no server-assigned id")]
    MissingResourceId(String),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Session error: {0}")]
    Session(#[from] SessionError),
}

impl NodeError {
    pub(crate) fn creation(resource: impl Into<String>, source: ApiError) -> Self {
        NodeError::Creation {
            resource: resource.into(),
            reason: source.to_string(),
        }
    }
}

/// Result type for node operations
pub type NodeResult<T> = Result<T, NodeError>;
