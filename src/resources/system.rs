//! Systems

use parking_lot::RwLock;
use std::sync::Arc;

use super::datastream::Datastream;
use crate::models::{
    ControlStreamResource, DataRecordSchema, DatastreamResource, DatastreamSchema, SystemResource, TimeInstant,
    TimePeriod,
};
use crate::node::{Node, NodeError, NodeResult};
use crate::rest::ResourceType;
use crate::streaming::{AsStreamable, MessageHandler, StreamableResource};

const SENSORML_JSON: &str = "application/sml+json";
const DATASTREAM_JSON: &str = "application/json";

/// A sensor system hosted on a node
pub struct System {
    stream: StreamableResource<SystemResource>,
    name: String,
    label: String,
    urn: String,
    description: Option<String>,
    datastreams: RwLock<Vec<DatastreamResource>>,
    control_streams: RwLock<Vec<ControlStreamResource>>,
}

impl System {
    /// Local system not yet known to the server
    ///
    /// `urn` is typically `urn:<authority>:<identifier>[:...]`.
    pub fn new(
        name: impl Into<String>,
        label: impl Into<String>,
        urn: impl Into<String>,
        node: Node,
    ) -> Arc<Self> {
        let system = Self::build(name.into(), label.into(), urn.into(), None, StreamableResource::new(node));
        system.stream.set_underlying_resource(system.to_system_resource());
        Arc::new(system)
    }

    /// Wrap a resource fetched from the server
    pub fn from_resource(resource: SystemResource, node: Node) -> Arc<Self> {
        Self::from_resource_with_handler(resource, node, None)
    }

    /// Like `from_resource`, with a custom handler for the system's stream
    pub fn from_resource_with_handler(
        resource: SystemResource,
        node: Node,
        handler: Option<Arc<dyn MessageHandler>>,
    ) -> Arc<Self> {
        let name = resource
            .display_name()
            .or_else(|| resource.id.clone())
            .unwrap_or_default();
        let label = resource.label.clone().unwrap_or_else(|| name.clone());
        let urn = resource.unique_id().unwrap_or_default();

        let stream = match handler {
            Some(handler) => StreamableResource::with_handler(node, handler),
            None => StreamableResource::new(node),
        };
        let system = Self::build(name, label, urn, resource.description.clone(), stream);
        system.stream.set_underlying_resource(resource);
        Arc::new(system)
    }

    fn build(
        name: String,
        label: String,
        urn: String,
        description: Option<String>,
        stream: StreamableResource<SystemResource>,
    ) -> Self {
        Self {
            stream,
            name,
            label,
            urn,
            description,
            datastreams: RwLock::new(Vec::new()),
            control_streams: RwLock::new(Vec::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn urn(&self) -> &str {
        &self.urn
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Server-assigned id, once the system exists remotely
    pub fn resource_id(&self) -> Option<String> {
        self.stream.underlying_resource().and_then(|r| r.id)
    }

    pub fn parent_node(&self) -> Node {
        self.stream.parent_node()
    }

    pub fn set_parent_node(&self, node: Node) {
        self.stream.set_parent_node(node);
    }

    pub fn get_system_resource(&self) -> Option<SystemResource> {
        self.stream.underlying_resource()
    }

    pub fn set_system_resource(&self, resource: SystemResource) {
        self.stream.set_underlying_resource(resource);
    }

    /// Datastreams added through this system
    pub fn datastreams(&self) -> Vec<DatastreamResource> {
        self.datastreams.read().clone()
    }

    pub fn control_streams(&self) -> Vec<ControlStreamResource> {
        self.control_streams.read().clone()
    }

    /// SensorML description of this system for insertion
    pub fn to_system_resource(&self) -> SystemResource {
        let mut resource = SystemResource::physical_system(&self.urn, &self.name);
        resource.description = self.description.clone();

        let outputs: Vec<_> = self
            .datastreams
            .read()
            .iter()
            .filter_map(|ds| serde_json::to_value(ds).ok())
            .collect();
        if !outputs.is_empty() {
            resource.outputs = Some(outputs);
        }
        resource
    }

    /// Register this system's stream with the parent node's session
    pub fn register(self: &Arc<Self>) -> NodeResult<()> {
        self.parent_node().register_streamable(self.clone())
    }

    /// List the datastreams the server holds for this system
    pub async fn discover_datastreams(&self) -> NodeResult<Vec<DatastreamResource>> {
        let id = self.require_id()?;
        let datastreams = self
            .parent_node()
            .api()
            .list_all::<DatastreamResource>(ResourceType::Datastream, Some((ResourceType::System, &id)), &[])
            .await?;

        tracing::debug!(system_id = %id, count = datastreams.len(), "Discovered datastreams");
        Ok(datastreams)
    }

    /// List and track the control streams the server holds for this system
    pub async fn discover_control_streams(&self) -> NodeResult<Vec<ControlStreamResource>> {
        let id = self.require_id()?;
        let control_streams = self
            .parent_node()
            .api()
            .list_all::<ControlStreamResource>(ResourceType::ControlStream, Some((ResourceType::System, &id)), &[])
            .await?;

        *self.control_streams.write() = control_streams.clone();
        tracing::debug!(system_id = %id, count = control_streams.len(), "Discovered control streams");
        Ok(control_streams)
    }

    /// Create a datastream for `schema` under this system on the server
    pub async fn add_insert_datastream(&self, schema: DataRecordSchema) -> NodeResult<Arc<Datastream>> {
        let id = self.require_id()?;

        let name = schema
            .label
            .clone()
            .or_else(|| schema.name.clone())
            .unwrap_or_else(|| "datastream".to_string());
        let mut resource = DatastreamResource::new(name.clone());
        resource.output_name = schema.name.clone().or_else(|| Some(name.clone()));
        resource.valid_time = Some(TimePeriod {
            start: TimeInstant::now_utc(),
            end: TimeInstant::Now,
        });
        resource.schema = Some(DatastreamSchema::swe_json(schema));

        let node = self.parent_node();
        let ds_id = node
            .api()
            .create(
                ResourceType::Datastream,
                &resource,
                DATASTREAM_JSON,
                Some((ResourceType::System, &id)),
            )
            .await
            .map_err(|e| NodeError::creation(format!("datastream {}", name), e))?;

        resource.id = Some(ds_id.clone());
        self.datastreams.write().push(resource.clone());

        tracing::info!(system_id = %id, datastream_id = %ds_id, "Created datastream");
        Ok(Datastream::new(node, resource))
    }

    /// Create this system on the server and record its id
    pub async fn insert_self(&self) -> NodeResult<String> {
        self.insert_into(&self.parent_node()).await
    }

    /// Create this system on `node`'s server without changing its parent
    pub(crate) async fn insert_into(&self, node: &Node) -> NodeResult<String> {
        let body = self.to_system_resource();
        let id = node
            .api()
            .create(ResourceType::System, &body, SENSORML_JSON, None)
            .await
            .map_err(|e| NodeError::creation(format!("system {}", self.name), e))?;

        let mut resource = self.get_system_resource().unwrap_or(body);
        resource.id = Some(id.clone());
        self.set_system_resource(resource);

        tracing::info!(system_id = %id, urn = %self.urn, "Created system");
        Ok(id)
    }

    /// Refresh the underlying resource from the server
    pub async fn retrieve_resource(&self) -> NodeResult<SystemResource> {
        let id = self.require_id()?;
        let resource: SystemResource = self.parent_node().api().retrieve(ResourceType::System, &id).await?;
        self.set_system_resource(resource.clone());
        Ok(resource)
    }

    fn require_id(&self) -> NodeResult<String> {
        self.resource_id()
            .ok_or_else(|| NodeError::MissingResourceId(format!("system {}", self.name)))
    }
}

impl AsStreamable for System {
    type Source = SystemResource;

    fn streamable(&self) -> &StreamableResource<SystemResource> {
        &self.stream
    }
}

impl std::fmt::Debug for System {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("System")
            .field("name", &self.name)
            .field("urn", &self.urn)
            .field("resource_id", &self.resource_id())
            .finish()
    }
}
