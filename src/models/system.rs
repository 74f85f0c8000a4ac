//! System resource as served by `/systems`

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{Link, TimePeriod};

/// Description of a sensor or platform
///
/// Servers return either a GeoJSON feature (identity under `properties`) or a
/// flat SensorML-JSON document; both deserialize into this type.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemResource {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub feature_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geometry: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub links: Option<Vec<Link>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valid_time: Option<TimePeriod>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub definition: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_of: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keywords: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outputs: Option<Vec<Value>>,
}

impl SystemResource {
    /// Local description of a physical system, ready to POST as SensorML-JSON
    pub fn physical_system(uid: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            feature_type: Some("PhysicalSystem".to_string()),
            uid: Some(uid.into()),
            label: Some(label.into()),
            ..Default::default()
        }
    }

    /// Human-readable name, preferring GeoJSON `properties.name`
    pub fn display_name(&self) -> Option<String> {
        self.property_str("name")
            .or_else(|| self.label.clone())
            .or_else(|| self.name.clone())
    }

    /// Unique identifier (URN), preferring GeoJSON `properties.uid`
    pub fn unique_id(&self) -> Option<String> {
        self.property_str("uid").or_else(|| self.uid.clone())
    }

    fn property_str(&self, key: &str) -> Option<String> {
        self.properties
            .as_ref()
            .and_then(|p| p.get(key))
            .and_then(Value::as_str)
            .map(str::to_string)
    }
}
