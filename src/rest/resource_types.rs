//! Connected Systems resource collections

use std::fmt;

/// Resource collections exposed under the API root
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceType {
    System,
    Datastream,
    Observation,
    ControlStream,
    Command,
}

impl ResourceType {
    /// Path segment of the collection (e.g. `datastreams`)
    pub fn path_segment(&self) -> &'static str {
        match self {
            ResourceType::System => "systems",
            ResourceType::Datastream => "datastreams",
            ResourceType::Observation => "observations",
            ResourceType::ControlStream => "controlstreams",
            ResourceType::Command => "commands",
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceType::System => write!(f, "system"),
            ResourceType::Datastream => write!(f, "datastream"),
            ResourceType::Observation => write!(f, "observation"),
            ResourceType::ControlStream => write!(f, "control stream"),
            ResourceType::Command => write!(f, "command"),
        }
    }
}
