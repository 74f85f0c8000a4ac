//! Stream frames and the per-resource message queue
//!
//! The receive loop turns every WebSocket item into a `Frame` and hands it to
//! the resource's `MessageHandler`. Payloads the handler keeps are pushed as
//! `StreamMessage`s onto an unbounded FIFO queue; the consumer drains the
//! other end. Per resource, dequeue order equals wire order.

use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::{self, Message};

use crate::models::Observation;

/// A payload received on an observation stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamMessage {
    Text(String),
    Binary(Vec<u8>),
}

impl StreamMessage {
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            StreamMessage::Text(t) => t.as_bytes(),
            StreamMessage::Binary(b) => b,
        }
    }

    /// Decode the payload as an inline JSON observation
    pub fn to_observation(&self) -> Result<Observation, serde_json::Error> {
        Observation::from_message(self.as_bytes())
    }
}

/// Producer side of a resource's message queue
pub type MessageSender = mpsc::UnboundedSender<StreamMessage>;

/// Consumer side of a resource's message queue
pub type MessageReceiver = mpsc::UnboundedReceiver<StreamMessage>;

/// Create an empty message queue
pub fn message_queue() -> (MessageSender, MessageReceiver) {
    mpsc::unbounded_channel()
}

/// Classified inbound WebSocket item
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Text(String),
    Binary(Vec<u8>),
    /// Close frame or end of stream
    Close,
    Error(String),
}

impl Frame {
    /// Classify one item of the WebSocket stream
    ///
    /// Control frames the protocol layer answers itself (ping/pong) yield `None`.
    pub(crate) fn from_ws(item: Option<Result<Message, tungstenite::Error>>) -> Option<Frame> {
        match item {
            None => Some(Frame::Close),
            Some(Ok(Message::Text(text))) => Some(Frame::Text(text)),
            Some(Ok(Message::Binary(data))) => Some(Frame::Binary(data)),
            Some(Ok(Message::Close(_))) => Some(Frame::Close),
            Some(Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_))) => None,
            Some(Err(e)) => Some(Frame::Error(e.to_string())),
        }
    }
}
