//! Streaming session
//!
//! A session groups the streamable resources of one node. It owns the WebSocket
//! connect settings and starts or stops every registered resource together.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::header::AUTHORIZATION;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use super::error::{SessionError, StreamError};
use super::resource::Streamable;

/// Client WebSocket stream returned by `Session::connect`
pub type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Default WebSocket connect timeout
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Group of streamable resources sharing one node's connection settings
pub struct Session {
    id: String,
    base_url: String,
    connect_timeout: Duration,
    closed: AtomicBool,
    streamables: RwLock<HashMap<String, Arc<dyn Streamable>>>,
}

impl Session {
    pub fn new(id: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            base_url: base_url.into(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            closed: AtomicBool::new(false),
            streamables: RwLock::new(HashMap::new()),
        }
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Add a resource to this session
    ///
    /// A resource belongs to at most one session at a time.
    pub fn register_streamable(&self, streamable: Arc<dyn Streamable>) -> Result<(), SessionError> {
        if self.is_closed() {
            return Err(SessionError::SessionClosed(self.id.clone()));
        }
        streamable.bind_session(&self.id)?;

        let id = streamable.id_str();
        self.streamables.write().insert(id.clone(), streamable);
        tracing::debug!(session_id = %self.id, streamable_id = %id, "Registered streamable");
        Ok(())
    }

    pub fn unregister_streamable(&self, id: &str) -> Option<Arc<dyn Streamable>> {
        let removed = self.streamables.write().remove(id);
        if let Some(streamable) = &removed {
            streamable.unbind_session();
        }
        removed
    }

    pub fn get_streamable(&self, id: &str) -> Option<Arc<dyn Streamable>> {
        self.streamables.read().get(id).cloned()
    }

    pub fn streamable_count(&self) -> usize {
        self.streamables.read().len()
    }

    /// Start every registered resource that is ready to start
    pub fn connect_streamables(&self) {
        let streamables: Vec<_> = self.streamables.read().values().cloned().collect();
        tracing::info!(session_id = %self.id, count = streamables.len(), "Starting streams");

        for streamable in streamables {
            streamable.start();
        }
    }

    /// Stop every resource concurrently and close the session
    pub async fn close_streamables(&self) {
        let streamables: Vec<_> = self.streamables.read().values().cloned().collect();
        futures_util::future::join_all(streamables.iter().map(|s| s.stop())).await;

        self.closed.store(true, Ordering::Release);
        let released: Vec<_> = self.streamables.write().drain().map(|(_, s)| s).collect();
        for streamable in &released {
            streamable.unbind_session();
        }

        tracing::info!(session_id = %self.id, count = released.len(), "Session closed");
    }

    /// Open a WebSocket to `url`, with basic auth when a token is given
    pub async fn connect(&self, url: &str, basic_auth: Option<&str>) -> Result<WsStream, StreamError> {
        if self.is_closed() {
            return Err(StreamError::SessionClosed(self.id.clone()));
        }

        let mut request = url.into_client_request()?;
        if let Some(token) = basic_auth {
            let value = HeaderValue::from_str(&format!("Basic {}", token)).map_err(|_| StreamError::InvalidHeader)?;
            request.headers_mut().insert(AUTHORIZATION, value);
        }

        tracing::debug!(session_id = %self.id, url = %url, "Connecting WebSocket");
        let (ws, _response) = tokio::time::timeout(self.connect_timeout, connect_async(request))
            .await
            .map_err(|_| StreamError::ConnectTimeout {
                url: url.to_string(),
                timeout_ms: self.connect_timeout.as_millis() as u64,
            })??;

        Ok(ws)
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("base_url", &self.base_url)
            .field("closed", &self.is_closed())
            .field("streamables", &self.streamable_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DatastreamResource;
    use crate::node::Node;
    use crate::rest::Protocol;
    use crate::streaming::{StreamStatus, StreamableResource};
    use futures_util::StreamExt;
    use tokio::net::TcpListener;

    fn streamable() -> Arc<StreamableResource<DatastreamResource>> {
        let node = Node::new(Protocol::Http, "localhost", 8585, None, None).unwrap();
        let resource = DatastreamResource {
            id: Some("ds1".to_string()),
            ..DatastreamResource::new("temperature")
        };
        Arc::new(StreamableResource::new(node).with_resource(resource))
    }

    #[test]
    fn test_register_and_lookup() {
        let session = Session::new("s1", "http://localhost:8585");
        let resource = streamable();

        session.register_streamable(resource.clone()).unwrap();
        assert_eq!(session.streamable_count(), 1);
        assert!(session.get_streamable(&resource.id_str()).is_some());
        assert_eq!(resource.session_id().as_deref(), Some("s1"));

        // Re-registering with the same session replaces the entry
        session.register_streamable(resource.clone()).unwrap();
        assert_eq!(session.streamable_count(), 1);
    }

    #[test]
    fn test_resource_belongs_to_one_session() {
        let first = Session::new("s1", "http://localhost:8585");
        let second = Session::new("s2", "http://localhost:8585");
        let resource = streamable();

        first.register_streamable(resource.clone()).unwrap();
        assert!(matches!(
            second.register_streamable(resource.clone()),
            Err(SessionError::AlreadyBound { .. })
        ));

        first.unregister_streamable(&resource.id_str()).unwrap();
        second.register_streamable(resource).unwrap();
    }

    #[tokio::test]
    async fn test_close_stops_everything() {
        let session = Session::new("s1", "http://localhost:8585");
        let a = streamable();
        let b = streamable();
        a.initialize().unwrap();
        session.register_streamable(a.clone()).unwrap();
        session.register_streamable(b.clone()).unwrap();

        session.close_streamables().await;

        assert!(session.is_closed());
        assert_eq!(session.streamable_count(), 0);
        assert_eq!(a.session_id(), None);
        assert!(matches!(
            session.register_streamable(streamable()),
            Err(SessionError::SessionClosed(_))
        ));
        assert!(matches!(
            session.connect("ws://127.0.0.1:1/", None).await,
            Err(StreamError::SessionClosed(_))
        ));
    }

    #[tokio::test]
    async fn test_connect_sends_basic_auth() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut auth = None;
            let mut ws = tokio_tungstenite::accept_hdr_async(
                stream,
                |req: &tokio_tungstenite::tungstenite::handshake::server::Request,
                 resp: tokio_tungstenite::tungstenite::handshake::server::Response| {
                    auth = req
                        .headers()
                        .get(AUTHORIZATION)
                        .and_then(|v| v.to_str().ok())
                        .map(str::to_string);
                    Ok(resp)
                },
            )
            .await
            .unwrap();
            while ws.next().await.is_some() {}
            auth
        });

        let session = Session::new("s1", format!("http://127.0.0.1:{}", port));
        let ws = session
            .connect(&format!("ws://127.0.0.1:{}/", port), Some("YWRtaW46YWRtaW4="))
            .await
            .unwrap();
        drop(ws);

        let auth = server.await.unwrap();
        assert_eq!(auth.as_deref(), Some("Basic YWRtaW46YWRtaW4="));
    }

    #[tokio::test]
    async fn test_connect_times_out() {
        // Accepts TCP but never answers the handshake
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let _hold = tokio::spawn(async move {
            let (_stream, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(5)).await;
        });

        let session =
            Session::new("s1", "http://127.0.0.1").with_connect_timeout(Duration::from_millis(100));
        let err = session
            .connect(&format!("ws://127.0.0.1:{}/", port), None)
            .await
            .unwrap_err();
        assert!(matches!(err, StreamError::ConnectTimeout { timeout_ms: 100, .. }));
    }

    #[test]
    fn test_connect_streamables_only_starts_initialized() {
        let session = Session::new("s1", "http://localhost:8585");
        let resource = streamable();
        session.register_streamable(resource.clone()).unwrap();

        // Not initialized: start() is a logged no-op
        session.connect_streamables();
        assert_eq!(resource.status(), StreamStatus::Stopped);
    }
}
