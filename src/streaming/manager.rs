//! Session registry
//!
//! Caller-owned registry of live sessions keyed by id. Nodes register a session
//! here; shutdown goes through `close_all`.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use super::error::SessionError;
use super::session::{Session, DEFAULT_CONNECT_TIMEOUT};

/// Settings applied to sessions created for nodes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    pub connect_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }
}

/// Registry of sessions
#[derive(Default)]
pub struct SessionManager {
    config: SessionConfig,
    sessions: RwLock<HashMap<String, Arc<Session>>>,
}

impl SessionManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: SessionConfig) -> Self {
        Self {
            config,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Register a session under `id`; an id already in use is rejected
    pub fn register_session(
        &self,
        id: impl Into<String>,
        session: Arc<Session>,
    ) -> Result<Arc<Session>, SessionError> {
        let id = id.into();
        let mut sessions = self.sessions.write();
        if sessions.contains_key(&id) {
            return Err(SessionError::DuplicateSession(id));
        }

        sessions.insert(id.clone(), Arc::clone(&session));
        tracing::info!(session_id = %id, "Registered session");
        Ok(session)
    }

    /// Remove a session and stop all of its streams
    pub async fn unregister_session(&self, id: &str) -> Result<(), SessionError> {
        let session = self
            .sessions
            .write()
            .remove(id)
            .ok_or_else(|| SessionError::SessionNotFound(id.to_string()))?;

        session.close_streamables().await;
        tracing::info!(session_id = %id, "Unregistered session");
        Ok(())
    }

    pub fn get_session(&self, id: &str) -> Option<Arc<Session>> {
        self.sessions.read().get(id).cloned()
    }

    pub fn session_ids(&self) -> Vec<String> {
        self.sessions.read().keys().cloned().collect()
    }

    pub fn session_count(&self) -> usize {
        self.sessions.read().len()
    }

    /// Start every stream of one session
    pub fn start_session_streams(&self, id: &str) -> Result<(), SessionError> {
        let session = self
            .get_session(id)
            .ok_or_else(|| SessionError::SessionNotFound(id.to_string()))?;
        session.connect_streamables();
        Ok(())
    }

    /// Start every stream of every session
    pub fn start_all_streams(&self) {
        let sessions: Vec<_> = self.sessions.read().values().cloned().collect();
        for session in sessions {
            session.connect_streamables();
        }
    }

    /// Unregister and close every session
    pub async fn close_all(&self) {
        let sessions: Vec<_> = self.sessions.write().drain().map(|(_, s)| s).collect();
        let count = sessions.len();

        futures_util::future::join_all(sessions.iter().map(|s| s.close_streamables())).await;
        tracing::info!(count, "Closed all sessions");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DatastreamResource;
    use crate::node::Node;
    use crate::rest::Protocol;
    use crate::streaming::StreamableResource;

    #[test]
    fn test_register_and_get() {
        let manager = SessionManager::new();
        let session = Arc::new(Session::new("s1", "http://localhost:8585"));

        let registered = manager.register_session("s1", session.clone()).unwrap();
        assert!(Arc::ptr_eq(&registered, &session));
        assert!(Arc::ptr_eq(&manager.get_session("s1").unwrap(), &session));
        assert_eq!(manager.session_count(), 1);
        assert!(manager.get_session("missing").is_none());
    }

    #[test]
    fn test_duplicate_session_rejected() {
        let manager = SessionManager::new();
        manager
            .register_session("s1", Arc::new(Session::new("s1", "http://a")))
            .unwrap();

        let err = manager
            .register_session("s1", Arc::new(Session::new("s1", "http://b")))
            .unwrap_err();
        assert_eq!(err, SessionError::DuplicateSession("s1".to_string()));
        assert_eq!(manager.get_session("s1").unwrap().base_url(), "http://a");
    }

    #[tokio::test]
    async fn test_unregister_closes_session() {
        let manager = SessionManager::new();
        let session = manager
            .register_session("s1", Arc::new(Session::new("s1", "http://localhost:8585")))
            .unwrap();

        let node = Node::new(Protocol::Http, "localhost", 8585, None, None).unwrap();
        let resource = Arc::new(StreamableResource::<DatastreamResource>::new(node));
        session.register_streamable(resource).unwrap();

        manager.unregister_session("s1").await.unwrap();
        assert!(session.is_closed());
        assert_eq!(session.streamable_count(), 0);
        assert_eq!(manager.session_count(), 0);

        assert_eq!(
            manager.unregister_session("s1").await.unwrap_err(),
            SessionError::SessionNotFound("s1".to_string())
        );
    }

    #[test]
    fn test_start_unknown_session() {
        let manager = SessionManager::new();
        assert!(matches!(
            manager.start_session_streams("nope"),
            Err(SessionError::SessionNotFound(_))
        ));
        // No sessions: nothing to do
        manager.start_all_streams();
    }

    #[tokio::test]
    async fn test_close_all() {
        let manager = SessionManager::new();
        let a = manager
            .register_session("a", Arc::new(Session::new("a", "http://a")))
            .unwrap();
        let b = manager
            .register_session("b", Arc::new(Session::new("b", "http://b")))
            .unwrap();

        manager.close_all().await;
        assert_eq!(manager.session_count(), 0);
        assert!(a.is_closed());
        assert!(b.is_closed());
    }
}
