//! Sensor Hub Node
//!
//! A `Node` is the client-side handle of one OpenSensorHub server: its REST
//! endpoint, optional basic-auth credentials, the session its streams run in
//! and the systems discovered or added on it.
//!
//! `Node` is a cheap clone of a shared handle. Resources keep a clone as
//! their parent; the node itself only keeps weak references to its session
//! and systems, so dropping the caller's handles frees everything.

mod error;

pub use error::{NodeError, NodeResult};

use parking_lot::RwLock;
use std::fmt;
use std::sync::{Arc, Weak};
use uuid::Uuid;

use crate::config::NodeSettings;
use crate::models::SystemResource;
use crate::resources::System;
use crate::rest::{ApiConfig, ApiHelper, Credentials, Protocol, ResourceType};
use crate::streaming::{Session, SessionManager, Streamable};

struct NodeInner {
    id: String,
    api: ApiHelper,
    basic_auth: Option<String>,
    session: RwLock<Weak<Session>>,
    systems: RwLock<Vec<Weak<System>>>,
}

/// Handle to one sensor hub
#[derive(Clone)]
pub struct Node {
    inner: Arc<NodeInner>,
}

impl Node {
    /// Create a node, registering it with `session_manager` when given
    pub fn new(
        protocol: Protocol,
        address: impl Into<String>,
        port: u16,
        credentials: Option<Credentials>,
        session_manager: Option<&SessionManager>,
    ) -> NodeResult<Self> {
        let config = ApiConfig {
            protocol,
            address: address.into(),
            port,
            credentials,
            ..Default::default()
        };
        Self::with_api_config(config, session_manager)
    }

    /// Create a node from the `[node]` section of the configuration
    pub fn from_config(settings: &NodeSettings, session_manager: Option<&SessionManager>) -> NodeResult<Self> {
        let protocol = settings.protocol.parse::<Protocol>().map_err(NodeError::InvalidConfig)?;
        let credentials = match (&settings.username, &settings.password) {
            (Some(user), Some(pass)) => Some(Credentials::new(user, pass)),
            (Some(user), None) => Some(Credentials::new(user, "")),
            _ => None,
        };

        let config = ApiConfig {
            protocol,
            address: settings.address.clone(),
            port: settings.port,
            api_root: settings.api_root.clone(),
            credentials,
            request_timeout_ms: settings.request_timeout_ms,
        };
        Self::with_api_config(config, session_manager)
    }

    /// Create a node from a complete REST configuration
    pub fn with_api_config(config: ApiConfig, session_manager: Option<&SessionManager>) -> NodeResult<Self> {
        let basic_auth = config.credentials.as_ref().map(Credentials::basic_token);
        let api = ApiHelper::new(config).map_err(NodeError::Client)?;

        let node = Self {
            inner: Arc::new(NodeInner {
                id: format!("node-{}", Uuid::new_v4()),
                api,
                basic_auth,
                session: RwLock::new(Weak::new()),
                systems: RwLock::new(Vec::new()),
            }),
        };

        tracing::debug!(node_id = %node.id(), endpoint = %node.api_endpoint(), "Created node");

        if let Some(manager) = session_manager {
            node.register_with_session_manager(manager)?;
        }
        Ok(node)
    }

    pub fn id(&self) -> &str {
        &self.inner.id
    }

    pub fn protocol(&self) -> Protocol {
        self.inner.api.config().protocol
    }

    pub fn address(&self) -> &str {
        &self.inner.api.config().address
    }

    pub fn port(&self) -> u16 {
        self.inner.api.config().port
    }

    /// Whether the node carries credentials
    pub fn is_secure(&self) -> bool {
        self.inner.basic_auth.is_some()
    }

    /// Base64 `username:password`, present iff the node is secure
    pub fn get_decoded_auth(&self) -> Option<&str> {
        self.inner.basic_auth.as_deref()
    }

    /// `protocol://address:port/<api_root>`
    pub fn api_endpoint(&self) -> String {
        self.inner.api.api_root_url()
    }

    pub fn api(&self) -> &ApiHelper {
        &self.inner.api
    }

    /// Create this node's session in `manager`, keyed by the node id
    pub fn register_with_session_manager(&self, manager: &SessionManager) -> NodeResult<Arc<Session>> {
        let session = Session::new(self.id(), self.inner.api.base_url())
            .with_connect_timeout(manager.config().connect_timeout);
        let session = manager.register_session(self.id(), Arc::new(session))?;

        *self.inner.session.write() = Arc::downgrade(&session);
        tracing::info!(node_id = %self.id(), "Registered node with session manager");
        Ok(session)
    }

    /// The node's session, while its manager keeps it alive
    pub fn session(&self) -> Option<Arc<Session>> {
        self.inner.session.read().upgrade()
    }

    /// Register a streamable resource with this node's session
    pub fn register_streamable(&self, streamable: Arc<dyn Streamable>) -> NodeResult<()> {
        let session = self.session().ok_or(NodeError::NoSession)?;
        session.register_streamable(streamable)?;
        Ok(())
    }

    /// Discover every system on the server
    ///
    /// A non-success status is logged and yields no systems.
    pub async fn discover_systems(&self) -> NodeResult<Vec<Arc<System>>> {
        let resources = match self
            .inner
            .api
            .list_all::<SystemResource>(ResourceType::System, None, &[])
            .await
        {
            Ok(resources) => resources,
            Err(e) if e.is_status() => {
                tracing::warn!(node_id = %self.id(), error = %e, "System discovery failed");
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        };

        let systems: Vec<_> = resources
            .into_iter()
            .map(|resource| {
                let system = System::from_resource(resource, self.clone());
                self.track_system(&system);
                system
            })
            .collect();

        tracing::info!(node_id = %self.id(), count = systems.len(), "Discovered systems");
        Ok(systems)
    }

    /// Add a system to this node, creating it on the server first if asked
    ///
    /// Nothing is tracked when remote creation fails.
    pub async fn add_system(&self, system: Arc<System>, insert_remotely: bool) -> NodeResult<Arc<System>> {
        if insert_remotely {
            system.insert_into(self).await?;
        }
        system.set_parent_node(self.clone());
        self.track_system(&system);
        Ok(system)
    }

    /// Systems tracked by this node that are still alive
    pub fn systems(&self) -> Vec<Arc<System>> {
        self.inner
            .systems
            .read()
            .iter()
            .filter_map(Weak::upgrade)
            .collect()
    }

    fn track_system(&self, system: &Arc<System>) {
        let mut systems = self.inner.systems.write();
        systems.retain(|s| s.strong_count() > 0);
        if !systems.iter().any(|s| std::ptr::eq(s.as_ptr(), Arc::as_ptr(system))) {
            systems.push(Arc::downgrade(system));
        }
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id
    }
}

impl Eq for Node {}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("id", &self.inner.id)
            .field("endpoint", &self.api_endpoint())
            .field("secure", &self.is_secure())
            .finish()
    }
}
