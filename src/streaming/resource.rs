//! Streamable resources
//!
//! A `StreamableResource` wraps one server-side resource (system or
//! datastream) and owns its observation stream: lifecycle state, the WebSocket
//! receive task and the message queue the task feeds.

use async_trait::async_trait;
use futures_util::StreamExt;
use parking_lot::{Mutex, RwLock};
use std::ops::ControlFlow;
use std::sync::Arc;
use tokio::task::JoinHandle;
use uuid::Uuid;

use super::error::{SessionError, StreamError};
use super::handler::{enqueue, DefaultMessageHandler, MessageHandler, StreamEnd};
use super::message::{message_queue, Frame, MessageReceiver, MessageSender, StreamMessage};
use super::playback::{observation_stream_url, Playback};
use super::status::StreamStatus;
use crate::models::{DatastreamResource, ObservationResource, SystemResource, TimeInstant, TimePeriod};
use crate::node::Node;
use crate::rest::ResourceType;

/// A server resource that exposes an observation stream
pub trait StreamSource: Clone + Send + Sync + 'static {
    /// Collection the resource lives in
    const RESOURCE_TYPE: ResourceType;

    /// Server-assigned id, once known
    fn server_id(&self) -> Option<&str>;

    /// Replay window used by archive playback when none is configured
    fn default_period(&self) -> Option<TimePeriod> {
        None
    }
}

impl StreamSource for SystemResource {
    const RESOURCE_TYPE: ResourceType = ResourceType::System;

    fn server_id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn default_period(&self) -> Option<TimePeriod> {
        self.valid_time
    }
}

impl StreamSource for DatastreamResource {
    const RESOURCE_TYPE: ResourceType = ResourceType::Datastream;

    fn server_id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn default_period(&self) -> Option<TimePeriod> {
        self.valid_time
    }
}

/// Mutable stream state shared with the receive task
#[derive(Default)]
struct StreamState {
    status: StreamStatus,
    ws_url: Option<String>,
    sender: Option<MessageSender>,
    receiver: Option<MessageReceiver>,
    task: Option<JoinHandle<()>>,
    last_error: Option<String>,
}

/// Streaming wrapper around one system or datastream
pub struct StreamableResource<R: StreamSource> {
    id: Uuid,
    node: RwLock<Node>,
    underlying: RwLock<Option<R>>,
    handler: Arc<dyn MessageHandler>,
    playback: RwLock<Playback>,
    session_id: Mutex<Option<String>>,
    state: Arc<Mutex<StreamState>>,
}

impl<R: StreamSource> StreamableResource<R> {
    /// Create a stopped resource bound to `node` with the default handler
    pub fn new(node: Node) -> Self {
        Self::with_handler(node, Arc::new(DefaultMessageHandler))
    }

    /// Create a stopped resource with a custom message handler
    pub fn with_handler(node: Node, handler: Arc<dyn MessageHandler>) -> Self {
        Self {
            id: Uuid::new_v4(),
            node: RwLock::new(node),
            underlying: RwLock::new(None),
            handler,
            playback: RwLock::new(Playback::default()),
            session_id: Mutex::new(None),
            state: Arc::new(Mutex::new(StreamState::default())),
        }
    }

    /// Builder-style variant of `set_underlying_resource`
    pub fn with_resource(self, resource: R) -> Self {
        *self.underlying.write() = Some(resource);
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Id as 32 lowercase hex digits without hyphens
    pub fn id_str(&self) -> String {
        self.id.simple().to_string()
    }

    pub fn status(&self) -> StreamStatus {
        self.state.lock().status
    }

    /// Stream URL, `None` before `initialize()`
    pub fn ws_url(&self) -> Option<String> {
        self.state.lock().ws_url.clone()
    }

    /// Reason the last receive loop failed, if it did
    pub fn last_error(&self) -> Option<String> {
        self.state.lock().last_error.clone()
    }

    /// Take the consumer side of the queue; once per `initialize()`
    pub fn take_receiver(&self) -> Option<MessageReceiver> {
        self.state.lock().receiver.take()
    }

    pub fn underlying_resource(&self) -> Option<R> {
        self.underlying.read().clone()
    }

    pub fn set_underlying_resource(&self, resource: R) {
        *self.underlying.write() = Some(resource);
    }

    pub fn parent_node(&self) -> Node {
        self.node.read().clone()
    }

    pub fn set_parent_node(&self, node: Node) {
        *self.node.write() = node;
    }

    pub fn playback(&self) -> Playback {
        *self.playback.read()
    }

    /// Takes effect on the next `initialize()`
    pub fn set_playback(&self, playback: Playback) {
        *self.playback.write() = playback;
    }

    /// Id of the session this resource is registered with
    pub fn session_id(&self) -> Option<String> {
        self.session_id.lock().clone()
    }

    pub(crate) fn bind_session(&self, session_id: &str) -> Result<(), SessionError> {
        let mut bound = self.session_id.lock();
        match bound.as_deref() {
            Some(existing) if existing != session_id => Err(SessionError::AlreadyBound {
                streamable: self.id_str(),
                session: existing.to_string(),
            }),
            _ => {
                *bound = Some(session_id.to_string());
                Ok(())
            }
        }
    }

    pub(crate) fn unbind_session(&self) {
        *self.session_id.lock() = None;
    }

    /// Compute the stream URL and create a fresh queue
    ///
    /// Accepted from `Stopped`, `Errored` and `Initialized`.
    pub fn initialize(&self) -> Result<(), StreamError> {
        let (res_id, fallback) = self.server_ref()?;
        let url = observation_stream_url(
            self.node.read().api().config(),
            R::RESOURCE_TYPE,
            &res_id,
            &self.playback.read(),
            fallback,
        )?;

        let mut state = self.state.lock();
        if !state.status.can_initialize() {
            return Err(StreamError::InvalidTransition {
                action: "initialize",
                status: state.status,
            });
        }

        let (sender, receiver) = message_queue();
        state.ws_url = Some(url);
        state.sender = Some(sender);
        state.receiver = Some(receiver);
        state.task = None;
        state.last_error = None;
        state.status = StreamStatus::Initialized;

        tracing::debug!(
            streamable_id = %self.id_str(),
            resource = %R::RESOURCE_TYPE,
            url = ?state.ws_url,
            "Streamable resource initialized"
        );
        Ok(())
    }

    /// Spawn the receive task; returns immediately
    ///
    /// Only valid from `Initialized`. Anything else logs a warning and does
    /// nothing.
    pub fn start(&self) {
        let mut state = self.state.lock();
        if state.status != StreamStatus::Initialized {
            tracing::warn!(
                streamable_id = %self.id_str(),
                status = %state.status,
                "Cannot start a streamable resource that is not initialized"
            );
            return;
        }

        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(e) => {
                tracing::error!(streamable_id = %self.id_str(), error = %e, "No async runtime to start stream on");
                state.status = StreamStatus::Errored;
                state.last_error = Some(e.to_string());
                return;
            }
        };

        let (Some(url), Some(sender)) = (state.ws_url.clone(), state.sender.clone()) else {
            state.status = StreamStatus::Errored;
            state.last_error = Some(StreamError::NotInitialized.to_string());
            return;
        };

        state.status = StreamStatus::Starting;
        let task = ReceiveTask {
            streamable_id: self.id_str(),
            url,
            sender,
            handler: Arc::clone(&self.handler),
            node: self.parent_node(),
            state: Arc::clone(&self.state),
        };
        state.status = StreamStatus::Started;
        state.task = Some(runtime.spawn(task.run()));

        tracing::debug!(streamable_id = %self.id_str(), "Receive task spawned");
    }

    /// Stop the receive task and close the queue
    ///
    /// Idempotent. When this returns the handler will not be invoked again.
    pub async fn stop(&self) {
        let task = {
            let mut state = self.state.lock();
            let Some(task) = state.task.take() else {
                return;
            };
            if state.status.is_running() {
                state.status = StreamStatus::Stopping;
            }
            task
        };

        task.abort();
        if let Err(e) = task.await {
            if e.is_panic() {
                tracing::error!(streamable_id = %self.id_str(), "Receive task panicked");
            }
        }

        let mut state = self.state.lock();
        state.sender = None;
        if state.status == StreamStatus::Stopping {
            state.status = StreamStatus::Stopped;
        }
        tracing::info!(streamable_id = %self.id_str(), status = %state.status, "Streamable resource stopped");
    }

    /// Fetch the latest observations over REST and enqueue them
    ///
    /// Returns the number of messages enqueued.
    pub async fn poll(&self) -> Result<usize, StreamError> {
        let sender = self
            .state
            .lock()
            .sender
            .clone()
            .ok_or(StreamError::NotInitialized)?;
        let (res_id, _) = self.server_ref()?;

        let page = self
            .parent_node()
            .api()
            .list::<serde_json::Value>(
                ResourceType::Observation,
                Some((R::RESOURCE_TYPE, &res_id)),
                &[("resultTime", TimeInstant::Latest.to_string())],
            )
            .await?;

        let count = page.items.len();
        for item in page.items {
            enqueue(&sender, StreamMessage::Text(item.to_string()));
        }

        tracing::debug!(streamable_id = %self.id_str(), count, "Polled observations");
        Ok(count)
    }

    /// Retrieve every observation whose result time falls in `period`
    pub async fn fetch(&self, period: &TimePeriod) -> Result<Vec<ObservationResource>, StreamError> {
        let (res_id, _) = self.server_ref()?;
        let observations = self
            .parent_node()
            .api()
            .list_all::<ObservationResource>(
                ResourceType::Observation,
                Some((R::RESOURCE_TYPE, &res_id)),
                &[("resultTime", period.to_string())],
            )
            .await?;

        tracing::debug!(
            streamable_id = %self.id_str(),
            count = observations.len(),
            period = %period,
            "Fetched observations"
        );
        Ok(observations)
    }

    fn server_ref(&self) -> Result<(String, Option<TimePeriod>), StreamError> {
        let underlying = self.underlying.read();
        let resource = underlying.as_ref().ok_or(StreamError::UnderlyingResourceNotSet)?;
        let res_id = resource
            .server_id()
            .ok_or(StreamError::MissingResourceId(R::RESOURCE_TYPE))?;
        Ok((res_id.to_string(), resource.default_period()))
    }
}

/// Receive loop of one started resource
struct ReceiveTask {
    streamable_id: String,
    url: String,
    sender: MessageSender,
    handler: Arc<dyn MessageHandler>,
    node: Node,
    state: Arc<Mutex<StreamState>>,
}

impl ReceiveTask {
    async fn run(self) {
        let result = self.receive().await;

        let mut state = self.state.lock();
        state.sender = None;
        // stop() owns the transition once it has begun
        if state.status != StreamStatus::Started {
            return;
        }
        match result {
            Ok(()) => {
                state.status = StreamStatus::Stopped;
                tracing::info!(streamable_id = %self.streamable_id, "Stream closed by server");
            }
            Err(e) => {
                tracing::error!(streamable_id = %self.streamable_id, url = %self.url, error = %e, "Stream failed");
                state.status = StreamStatus::Errored;
                state.last_error = Some(e.to_string());
            }
        }
    }

    async fn receive(&self) -> Result<(), StreamError> {
        let session = self.node.session().ok_or(StreamError::NoSession)?;
        let mut ws = session.connect(&self.url, self.node.get_decoded_auth()).await?;
        tracing::info!(streamable_id = %self.streamable_id, url = %self.url, "Stream connected");

        loop {
            let item = ws.next().await;
            let exhausted = item.is_none();

            if let Some(frame) = Frame::from_ws(item) {
                if let ControlFlow::Break(end) = self.handler.handle(frame, &self.sender) {
                    return match end {
                        StreamEnd::Closed => Ok(()),
                        StreamEnd::Failed(reason) => Err(StreamError::Stream(reason)),
                    };
                }
            }
            if exhausted {
                return Ok(());
            }
        }
    }
}

impl<R: StreamSource> Drop for StreamableResource<R> {
    fn drop(&mut self) {
        if let Some(task) = self.state.lock().task.take() {
            task.abort();
            tracing::debug!(streamable_id = %self.id_str(), "Receive task aborted on drop");
        }
    }
}

/// Object-safe view of any streamable resource
#[async_trait]
pub trait Streamable: Send + Sync {
    fn id(&self) -> Uuid;
    fn id_str(&self) -> String;
    fn resource_type(&self) -> ResourceType;
    fn status(&self) -> StreamStatus;
    fn ws_url(&self) -> Option<String>;
    fn last_error(&self) -> Option<String>;
    fn initialize(&self) -> Result<(), StreamError>;
    fn start(&self);
    async fn stop(&self);
    fn take_receiver(&self) -> Option<MessageReceiver>;
    fn bind_session(&self, session_id: &str) -> Result<(), SessionError>;
    fn unbind_session(&self);
}

/// Types that expose a `StreamableResource`
pub trait AsStreamable: Send + Sync {
    type Source: StreamSource;

    fn streamable(&self) -> &StreamableResource<Self::Source>;
}

impl<R: StreamSource> AsStreamable for StreamableResource<R> {
    type Source = R;

    fn streamable(&self) -> &StreamableResource<R> {
        self
    }
}

#[async_trait]
impl<T: AsStreamable> Streamable for T {
    fn id(&self) -> Uuid {
        self.streamable().id()
    }

    fn id_str(&self) -> String {
        self.streamable().id_str()
    }

    fn resource_type(&self) -> ResourceType {
        <T::Source as StreamSource>::RESOURCE_TYPE
    }

    fn status(&self) -> StreamStatus {
        self.streamable().status()
    }

    fn ws_url(&self) -> Option<String> {
        self.streamable().ws_url()
    }

    fn last_error(&self) -> Option<String> {
        self.streamable().last_error()
    }

    fn initialize(&self) -> Result<(), StreamError> {
        self.streamable().initialize()
    }

    fn start(&self) {
        self.streamable().start()
    }

    async fn stop(&self) {
        self.streamable().stop().await
    }

    fn take_receiver(&self) -> Option<MessageReceiver> {
        self.streamable().take_receiver()
    }

    fn bind_session(&self, session_id: &str) -> Result<(), SessionError> {
        self.streamable().bind_session(session_id)
    }

    fn unbind_session(&self) {
        self.streamable().unbind_session()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DatastreamResource;
    use crate::rest::{Credentials, Protocol};
    use crate::streaming::SessionManager;
    use futures_util::SinkExt;
    use serde_json::json;
    use std::time::Duration;
    use tokio::net::TcpListener;
    use tokio_tungstenite::tungstenite::Message;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn datastream(id: &str) -> DatastreamResource {
        DatastreamResource {
            id: Some(id.to_string()),
            ..DatastreamResource::new("temperature")
        }
    }

    /// Serve one WebSocket connection that sends `messages` then closes
    async fn serve_messages(messages: Vec<&'static str>, close: bool) -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
            for m in messages {
                ws.send(Message::Text(m.to_string())).await.unwrap();
            }
            if close {
                ws.close(None).await.ok();
            } else {
                // Hold the connection open until the client goes away
                while ws.next().await.is_some() {}
            }
        });

        port
    }

    fn local_node(port: u16, manager: &SessionManager) -> Node {
        Node::new(Protocol::Http, "127.0.0.1", port, None, Some(manager)).unwrap()
    }

    async fn wait_for_status(resource: &StreamableResource<DatastreamResource>, status: StreamStatus) {
        for _ in 0..100 {
            if resource.status() == status {
                return;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("status stayed {} waiting for {}", resource.status(), status);
    }

    #[test]
    fn test_new_resource_is_stopped() {
        let node = Node::new(Protocol::Http, "localhost", 8585, None, None).unwrap();
        let resource = StreamableResource::<DatastreamResource>::new(node.clone());

        assert_eq!(resource.status(), StreamStatus::Stopped);
        assert_eq!(resource.ws_url(), None);
        assert_eq!(resource.id_str().len(), 32);
        assert!(!resource.id_str().contains('-'));
        assert_eq!(resource.parent_node(), node);
    }

    #[test]
    fn test_initialize_builds_url() {
        let node = Node::new(Protocol::Http, "localhost", 8585, None, None).unwrap();
        let resource = StreamableResource::new(node).with_resource(datastream("ds123"));

        resource.initialize().unwrap();
        assert_eq!(resource.status(), StreamStatus::Initialized);
        assert_eq!(
            resource.ws_url().as_deref(),
            Some("ws://localhost:8585/sensorhub/api/datastreams/ds123/observations?f=application%2Fjson")
        );
        assert!(resource.take_receiver().is_some());
        assert!(resource.take_receiver().is_none());
    }

    #[test]
    fn test_secure_node_uses_wss() {
        let node = Node::new(
            Protocol::Https,
            "hub.example.org",
            443,
            Some(Credentials::new("admin", "admin")),
            None,
        )
        .unwrap();
        let resource = StreamableResource::new(node).with_resource(datastream("ds1"));
        resource.initialize().unwrap();
        assert!(resource.ws_url().unwrap().starts_with("wss://hub.example.org:443/"));
    }

    #[test]
    fn test_initialize_requires_resource_and_id() {
        let node = Node::new(Protocol::Http, "localhost", 8585, None, None).unwrap();
        let resource = StreamableResource::<DatastreamResource>::new(node);
        assert!(matches!(resource.initialize(), Err(StreamError::UnderlyingResourceNotSet)));

        resource.set_underlying_resource(DatastreamResource::new("no id yet"));
        assert!(matches!(
            resource.initialize(),
            Err(StreamError::MissingResourceId(ResourceType::Datastream))
        ));
        assert_eq!(resource.status(), StreamStatus::Stopped);
    }

    #[test]
    fn test_start_without_initialize_is_noop() {
        let node = Node::new(Protocol::Http, "localhost", 8585, None, None).unwrap();
        let resource = StreamableResource::new(node).with_resource(datastream("ds1"));

        resource.start();
        assert_eq!(resource.status(), StreamStatus::Stopped);
    }

    #[tokio::test]
    async fn test_stop_before_start_is_noop() {
        let node = Node::new(Protocol::Http, "localhost", 8585, None, None).unwrap();
        let resource = StreamableResource::new(node).with_resource(datastream("ds1"));

        resource.stop().await;
        assert_eq!(resource.status(), StreamStatus::Stopped);

        resource.initialize().unwrap();
        resource.stop().await;
        assert_eq!(resource.status(), StreamStatus::Initialized);
    }

    #[tokio::test]
    async fn test_stream_preserves_order_and_closes_cleanly() {
        let port = serve_messages(vec!["m1", "m2", "m3"], true).await;
        let manager = SessionManager::new();
        let resource = StreamableResource::new(local_node(port, &manager)).with_resource(datastream("ds1"));

        resource.initialize().unwrap();
        let mut rx = resource.take_receiver().unwrap();
        resource.start();
        assert_eq!(resource.status(), StreamStatus::Started);

        let mut received = Vec::new();
        while let Some(msg) = tokio::time::timeout(Duration::from_secs(5), rx.recv()).await.unwrap() {
            received.push(msg);
        }
        assert_eq!(
            received,
            vec![
                StreamMessage::Text("m1".into()),
                StreamMessage::Text("m2".into()),
                StreamMessage::Text("m3".into()),
            ]
        );

        wait_for_status(&resource, StreamStatus::Stopped).await;
        assert_eq!(resource.last_error(), None);
    }

    #[tokio::test]
    async fn test_drop_closes_connection() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let (closed_tx, closed_rx) = tokio::sync::oneshot::channel();
        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
            ws.send(Message::Text("hello".to_string())).await.unwrap();
            while let Some(Ok(_)) = ws.next().await {}
            closed_tx.send(()).ok();
        });

        let manager = SessionManager::new();
        let resource = StreamableResource::new(local_node(port, &manager)).with_resource(datastream("ds1"));
        resource.initialize().unwrap();
        let mut rx = resource.take_receiver().unwrap();
        resource.start();

        let first = tokio::time::timeout(Duration::from_secs(5), rx.recv()).await.unwrap();
        assert_eq!(first, Some(StreamMessage::Text("hello".into())));

        drop(resource);
        tokio::time::timeout(Duration::from_secs(5), closed_rx)
            .await
            .expect("server never saw the connection close")
            .unwrap();
        assert_eq!(tokio::time::timeout(Duration::from_secs(5), rx.recv()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_stop_running_stream() {
        let port = serve_messages(vec!["hello"], false).await;
        let manager = SessionManager::new();
        let resource = StreamableResource::new(local_node(port, &manager)).with_resource(datastream("ds1"));

        resource.initialize().unwrap();
        let mut rx = resource.take_receiver().unwrap();
        resource.start();

        let first = tokio::time::timeout(Duration::from_secs(5), rx.recv()).await.unwrap();
        assert_eq!(first, Some(StreamMessage::Text("hello".into())));

        resource.stop().await;
        assert_eq!(resource.status(), StreamStatus::Stopped);
        assert_eq!(rx.recv().await, None);

        resource.stop().await;
        assert_eq!(resource.status(), StreamStatus::Stopped);
    }

    #[tokio::test]
    async fn test_restart_after_stop() {
        let port = serve_messages(vec![], false).await;
        let manager = SessionManager::new();
        let resource = StreamableResource::new(local_node(port, &manager)).with_resource(datastream("ds1"));

        resource.initialize().unwrap();
        resource.start();
        assert!(matches!(
            resource.initialize(),
            Err(StreamError::InvalidTransition { action: "initialize", .. })
        ));

        resource.stop().await;
        resource.initialize().unwrap();
        assert_eq!(resource.status(), StreamStatus::Initialized);
    }

    #[tokio::test]
    async fn test_connect_failure_marks_errored() {
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap().port()
        };
        let manager = SessionManager::new();
        let resource = StreamableResource::new(local_node(port, &manager)).with_resource(datastream("ds1"));

        resource.initialize().unwrap();
        let mut rx = resource.take_receiver().unwrap();
        resource.start();

        wait_for_status(&resource, StreamStatus::Errored).await;
        assert!(resource.last_error().is_some());
        assert_eq!(rx.recv().await, None);

        resource.initialize().unwrap();
        assert_eq!(resource.status(), StreamStatus::Initialized);
        assert_eq!(resource.last_error(), None);
    }

    #[tokio::test]
    async fn test_stream_without_session_errors() {
        let node = Node::new(Protocol::Http, "127.0.0.1", 1, None, None).unwrap();
        let resource = StreamableResource::new(node).with_resource(datastream("ds1"));

        resource.initialize().unwrap();
        resource.start();
        wait_for_status(&resource, StreamStatus::Errored).await;
        assert_eq!(resource.last_error(), Some(StreamError::NoSession.to_string()));
    }

    #[tokio::test]
    async fn test_poll_enqueues_latest() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/sensorhub/api/datastreams/ds1/observations"))
            .and(query_param("resultTime", "latest"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [
                    {"resultTime": "2024-01-01T00:00:00Z", "result": {"temp": 20.5}},
                    {"resultTime": "2024-01-01T00:00:01Z", "result": {"temp": 20.6}}
                ]
            })))
            .mount(&server)
            .await;

        let node = Node::new(Protocol::Http, server.address().ip().to_string(), server.address().port(), None, None)
            .unwrap();
        let resource = StreamableResource::new(node).with_resource(datastream("ds1"));

        assert!(matches!(resource.poll().await, Err(StreamError::NotInitialized)));

        resource.initialize().unwrap();
        let mut rx = resource.take_receiver().unwrap();
        assert_eq!(resource.poll().await.unwrap(), 2);

        let first = rx.recv().await.unwrap().to_observation().unwrap();
        assert_eq!(first.result()["temp"], 20.5);
    }

    #[tokio::test]
    async fn test_fetch_follows_pages() {
        let server = MockServer::start().await;
        let next = format!(
            "http://{}/sensorhub/api/datastreams/ds1/observations?page=2",
            server.address()
        );
        Mock::given(method("GET"))
            .and(path("/sensorhub/api/datastreams/ds1/observations"))
            .and(query_param("page", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [{"resultTime": "2024-01-01T00:00:02Z", "result": 3}]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/sensorhub/api/datastreams/ds1/observations"))
            .and(query_param("resultTime", "2024-01-01T00:00:00Z/2024-01-02T00:00:00Z"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [
                    {"resultTime": "2024-01-01T00:00:00Z", "result": 1},
                    {"resultTime": "2024-01-01T00:00:01Z", "result": 2}
                ],
                "links": [{"href": next, "rel": "next"}]
            })))
            .mount(&server)
            .await;

        let node = Node::new(Protocol::Http, server.address().ip().to_string(), server.address().port(), None, None)
            .unwrap();
        let resource = StreamableResource::new(node).with_resource(datastream("ds1"));
        let period = TimePeriod::parse("2024-01-01T00:00:00Z", "2024-01-02T00:00:00Z").unwrap();

        let observations = resource.fetch(&period).await.unwrap();
        let results: Vec<_> = observations.iter().map(|o| o.result.clone()).collect();
        assert_eq!(results, vec![json!(1), json!(2), json!(3)]);
    }

    #[test]
    fn test_session_binding() {
        let node = Node::new(Protocol::Http, "localhost", 8585, None, None).unwrap();
        let resource = StreamableResource::<DatastreamResource>::new(node);

        resource.bind_session("s1").unwrap();
        resource.bind_session("s1").unwrap();
        assert!(matches!(
            resource.bind_session("s2"),
            Err(SessionError::AlreadyBound { .. })
        ));

        resource.unbind_session();
        resource.bind_session("s2").unwrap();
        assert_eq!(resource.session_id().as_deref(), Some("s2"));
    }
}
