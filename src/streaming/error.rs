//! Streaming error types

use thiserror::Error;
use tokio_tungstenite::tungstenite;

use super::status::StreamStatus;
use crate::rest::{ApiError, ResourceType};

/// Errors raised by streamable resources and WebSocket connections
#[derive(Error, Debug)]
pub enum StreamError {
    #[error("Underlying resource not set")]
    UnderlyingResourceNotSet,

    #[error("Underlying {0} has no server-assigned id")]
    MissingResourceId(ResourceType),

    #[error("Archive playback requires a time period")]
    PlaybackPeriodUnset,

    #[error("Cannot {action} while {status}")]
    InvalidTransition {
        action: &'static str,
        status: StreamStatus,
    },

    #[error("Streamable resource is not initialized")]
    NotInitialized,

    #[error("Node is not registered with a session manager")]
    NoSession,

    #[error("Session {0} is closed")]
    SessionClosed(String),

    #[error("Connecting to {url} timed out after {timeout_ms} ms")]
    ConnectTimeout { url: String, timeout_ms: u64 },

    #[error("Invalid authorization header")]
    InvalidHeader,

    #[error("WebSocket error: {0}")]
    WebSocket(Box<tungstenite::Error>),

    #[error("Stream failed: {0}")]
    Stream(String),

    #[error("REST error: {0}")]
    Api(#[from] ApiError),
}

impl From<tungstenite::Error> for StreamError {
    fn from(e: tungstenite::Error) -> Self {
        StreamError::WebSocket(Box::new(e))
    }
}

/// Errors raised by sessions and the session manager
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("Session already registered: {0}")]
    DuplicateSession(String),

    #[error("Session {0} is closed")]
    SessionClosed(String),

    #[error("Streamable {streamable} is already bound to session {session}")]
    AlreadyBound { streamable: String, session: String },
}
