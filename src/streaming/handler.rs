//! Message handler strategy
//!
//! A handler is injected into a streamable resource at construction and
//! invoked for every frame of its receive loop.

use std::ops::ControlFlow;

use super::message::{Frame, MessageSender, StreamMessage};

/// Why a receive loop stopped
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEnd {
    /// The server closed the stream
    Closed,
    /// The stream failed; the resource moves to `Errored`
    Failed(String),
}

/// Strategy invoked for each inbound frame
pub trait MessageHandler: Send + Sync {
    /// Handle one frame; `Break` ends the receive loop
    fn handle(&self, frame: Frame, queue: &MessageSender) -> ControlFlow<StreamEnd>;
}

/// Enqueues text and binary payloads untouched
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultMessageHandler;

impl MessageHandler for DefaultMessageHandler {
    fn handle(&self, frame: Frame, queue: &MessageSender) -> ControlFlow<StreamEnd> {
        match frame {
            Frame::Text(text) => {
                tracing::trace!(bytes = text.len(), "Received text message");
                enqueue(queue, StreamMessage::Text(text));
                ControlFlow::Continue(())
            }
            Frame::Binary(data) => {
                tracing::trace!(bytes = data.len(), "Received binary message");
                enqueue(queue, StreamMessage::Binary(data));
                ControlFlow::Continue(())
            }
            Frame::Close => {
                tracing::debug!("WebSocket closed");
                ControlFlow::Break(StreamEnd::Closed)
            }
            Frame::Error(e) => {
                tracing::warn!(error = %e, "WebSocket error");
                ControlFlow::Break(StreamEnd::Failed(e))
            }
        }
    }
}

/// Push a message without blocking; a dropped consumer discards it
pub fn enqueue(queue: &MessageSender, message: StreamMessage) {
    if queue.send(message).is_err() {
        tracing::debug!("Message receiver dropped, discarding message");
    }
}
