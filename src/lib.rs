//! # OSH Connect
//!
//! Client SDK for OpenSensorHub nodes speaking the OGC Connected Systems API.
//!
//! ## Features
//!
//! - **Discovery**: list systems, datastreams and control streams over REST
//! - **Streaming**: live or archived observations over WebSockets, one
//!   background task and FIFO message queue per resource
//! - **Sessions**: start and stop all streams of a node together
//! - **Insertion**: create systems, datastreams and observations
//!
//! ## Modules
//!
//! - [`node`]: Sensor hub handle and system discovery
//! - [`streaming`]: Streamable resources, sessions and the session manager
//! - [`resources`]: `System` and `Datastream`
//! - [`rest`]: Connected Systems REST client
//! - [`models`]: Resource model, time and record schemas
//! - [`config`]: TOML / environment configuration
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use oshconnect::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let manager = SessionManager::new();
//!     let node = Node::new(
//!         Protocol::Http,
//!         "localhost",
//!         8585,
//!         Some(Credentials::new("admin", "admin")),
//!         Some(&manager),
//!     )?;
//!
//!     // Find a datastream and register it for streaming
//!     let systems = node.discover_systems().await?;
//!     let resources = systems[0].discover_datastreams().await?;
//!     let datastream = Datastream::new(node.clone(), resources[0].clone());
//!     datastream.register()?;
//!
//!     datastream.initialize()?;
//!     let mut messages = datastream.take_receiver().ok_or("message queue already taken")?;
//!     manager.start_all_streams();
//!
//!     while let Some(message) = messages.recv().await {
//!         println!("{:?}", message.to_observation()?.result());
//!     }
//!
//!     manager.close_all().await;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod models;
pub mod node;
pub mod resources;
pub mod rest;
pub mod streaming;

// Re-export top-level types for convenience
pub use models::{
    DataRecordSchema, DatastreamResource, Observation, ObservationResource, SweComponent, SystemResource,
    TimeInstant, TimePeriod, ValidationError,
};

pub use node::{Node, NodeError, NodeResult};

pub use resources::{Datastream, System};

pub use rest::{ApiConfig, ApiError, ApiHelper, Credentials, Protocol, ResourceType};

pub use streaming::{
    MessageHandler, MessageReceiver, Playback, PlaybackMode, Session, SessionError, SessionManager, StreamError,
    StreamMessage, StreamStatus, Streamable, StreamableResource,
};

pub use config::{Config, ConfigError, LoggingConfig, NodeSettings, StreamingSettings};
