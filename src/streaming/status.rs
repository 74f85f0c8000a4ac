//! Lifecycle states of a streamable resource

use std::fmt;

/// Lifecycle status of a streamable resource
///
/// ```text
/// Stopped ─initialize→ Initialized ─start→ Starting → Started ─stop→ Stopping → Stopped
///                                                        └─stream failure→ Errored
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StreamStatus {
    /// Initial and terminal state; `initialize()` makes it usable again
    #[default]
    Stopped,
    Initialized,
    Starting,
    Started,
    Stopping,
    /// The receive loop ended on an error; see `last_error()`
    Errored,
}

impl StreamStatus {
    /// Whether a receive task may be alive in this state
    pub fn is_running(&self) -> bool {
        matches!(
            self,
            StreamStatus::Starting | StreamStatus::Started | StreamStatus::Stopping
        )
    }

    /// Whether `initialize()` is accepted in this state
    pub fn can_initialize(&self) -> bool {
        matches!(
            self,
            StreamStatus::Stopped | StreamStatus::Errored | StreamStatus::Initialized
        )
    }
}

impl fmt::Display for StreamStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamStatus::Stopped => write!(f, "stopped"),
            StreamStatus::Initialized => write!(f, "initialized"),
            StreamStatus::Starting => write!(f, "starting"),
            StreamStatus::Started => write!(f, "started"),
            StreamStatus::Stopping => write!(f, "stopping"),
            StreamStatus::Errored => write!(f, "errored"),
        }
    }
}
