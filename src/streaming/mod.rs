//! Observation Streaming
//!
//! Real-time and archive observation streams over WebSocket.
//!
//! - **resource**: `StreamableResource` lifecycle and receive loop
//! - **session**: groups a node's resources and opens connections
//! - **manager**: registry of sessions
//! - **handler** / **message**: per-frame strategy and the message queue
//! - **playback**: live vs archive playback and stream URLs

mod error;
mod handler;
mod manager;
mod message;
mod playback;
mod resource;
mod session;
mod status;

pub use error::{SessionError, StreamError};
pub use handler::{enqueue, DefaultMessageHandler, MessageHandler, StreamEnd};
pub use manager::{SessionConfig, SessionManager};
pub use message::{message_queue, Frame, MessageReceiver, MessageSender, StreamMessage};
pub use playback::{observation_stream_url, Playback, PlaybackMode};
pub use resource::{AsStreamable, StreamSource, Streamable, StreamableResource};
pub use session::{Session, WsStream, DEFAULT_CONNECT_TIMEOUT};
pub use status::StreamStatus;
