//! Datastreams

use serde::Serialize;
use std::sync::Arc;

use crate::models::{DatastreamResource, Observation, ObservationResource, TimePeriod, ValidationError};
use crate::node::{Node, NodeError, NodeResult};
use crate::rest::ResourceType;
use crate::streaming::{AsStreamable, MessageHandler, StreamableResource};

const OBSERVATION_JSON: &str = "application/json";

/// An output of a system, streamable as observations
pub struct Datastream {
    stream: StreamableResource<DatastreamResource>,
}

impl Datastream {
    pub fn new(node: Node, resource: DatastreamResource) -> Arc<Self> {
        Arc::new(Self {
            stream: StreamableResource::new(node).with_resource(resource),
        })
    }

    /// Datastream whose stream frames go through `handler`
    pub fn with_handler(node: Node, resource: DatastreamResource, handler: Arc<dyn MessageHandler>) -> Arc<Self> {
        Arc::new(Self {
            stream: StreamableResource::with_handler(node, handler).with_resource(resource),
        })
    }

    /// Same as `new`, named for symmetry with `System::from_resource`
    pub fn from_resource(resource: DatastreamResource, node: Node) -> Arc<Self> {
        Self::new(node, resource)
    }

    pub fn get_resource(&self) -> Option<DatastreamResource> {
        self.stream.underlying_resource()
    }

    pub fn set_resource(&self, resource: DatastreamResource) {
        self.stream.set_underlying_resource(resource);
    }

    pub fn resource_id(&self) -> Option<String> {
        self.get_resource().and_then(|r| r.id)
    }

    pub fn parent_node(&self) -> Node {
        self.stream.parent_node()
    }

    /// Access the streaming wrapper (playback, poll, fetch)
    pub fn stream(&self) -> &StreamableResource<DatastreamResource> {
        &self.stream
    }

    /// Register this datastream's stream with the parent node's session
    pub fn register(self: &Arc<Self>) -> NodeResult<()> {
        self.parent_node().register_streamable(self.clone())
    }

    /// Build an observation of `result` stamped now
    ///
    /// The result is validated against the record schema when the datastream
    /// has one.
    pub fn create_observation(&self, result: serde_json::Value) -> Result<Observation, ValidationError> {
        let resource = self.get_resource();
        let mut observation = ObservationResource::now(result);
        observation.datastream_id = resource.as_ref().and_then(|r| r.id.clone());

        Observation::new(observation, resource.as_ref().and_then(|r| r.record_schema()))
    }

    /// POST a raw observation body and return its server-assigned id
    pub async fn insert_observation_dict<B: Serialize + ?Sized>(&self, body: &B) -> NodeResult<String> {
        let ds_id = self
            .resource_id()
            .ok_or_else(|| NodeError::MissingResourceId("datastream".to_string()))?;

        let obs_id = self
            .parent_node()
            .api()
            .create(
                ResourceType::Observation,
                body,
                OBSERVATION_JSON,
                Some((ResourceType::Datastream, &ds_id)),
            )
            .await
            .map_err(|e| NodeError::Submission(e.to_string()))?;

        tracing::debug!(datastream_id = %ds_id, observation_id = %obs_id, "Inserted observation");
        Ok(obs_id)
    }

    pub async fn insert_observation(&self, observation: &Observation) -> NodeResult<String> {
        self.insert_observation_dict(observation.resource()).await
    }

    /// Whether the datastream's valid time overlaps `period`
    pub fn is_within_period(&self, period: &TimePeriod) -> bool {
        self.get_resource()
            .and_then(|r| r.valid_time)
            .is_some_and(|valid| valid.overlaps(period))
    }
}

impl AsStreamable for Datastream {
    type Source = DatastreamResource;

    fn streamable(&self) -> &StreamableResource<DatastreamResource> {
        &self.stream
    }
}

impl std::fmt::Debug for Datastream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Datastream")
            .field("resource_id", &self.resource_id())
            .finish()
    }
}
