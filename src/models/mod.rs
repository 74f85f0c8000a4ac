//! Connected Systems Resource Model
//!
//! Serde models for the resources exchanged with a sensor hub:
//!
//! - **system**: `SystemResource`
//! - **datastream**: `DatastreamResource`, `DatastreamSchema`, `ControlStreamResource`
//! - **observation**: `ObservationResource` and the immutable `Observation`
//! - **schema**: SWE record schemas and result validation
//! - **time**: `TimeInstant` / `TimePeriod`
//!
//! Collections come back as `{"items": [...], "links": [...]}` with paging
//! signaled by a `rel: "next"` link.

mod datastream;
mod observation;
mod schema;
mod system;
mod time;

pub use datastream::{ControlStreamResource, DatastreamResource, DatastreamSchema, SWE_JSON_FORMAT};
pub use observation::{Observation, ObservationResource};
pub use schema::{ComponentKind, DataRecordSchema, SweComponent, ValidationError};
pub use system::SystemResource;
pub use time::{TimeInstant, TimeParseError, TimePeriod};

use serde::{Deserialize, Serialize};

/// Hypermedia link
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Link {
    pub href: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rel: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

/// One page of a resource listing
#[derive(Debug, Clone, Deserialize)]
pub struct ResourceCollection<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
    #[serde(default)]
    pub links: Vec<Link>,
}

impl<T> ResourceCollection<T> {
    /// Href of the next page, if any
    pub fn next_link(&self) -> Option<&str> {
        self.links
            .iter()
            .find(|l| l.rel.as_deref() == Some("next"))
            .map(|l| l.href.as_str())
    }
}
