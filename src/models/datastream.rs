//! Datastream and control stream resources

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{DataRecordSchema, Link, TimePeriod};

/// Observation format used when inserting SWE datastreams
pub const SWE_JSON_FORMAT: &str = "application/swe+json";

/// A schema-typed time series of observations belonging to a system
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatastreamResource {
    /// Server-assigned identifier; `None` until the datastream is inserted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valid_time: Option<TimePeriod>,
    #[serde(
        rename = "phenomenonTimeInterval",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub phenomenon_time: Option<TimePeriod>,
    #[serde(rename = "resultTimeInterval", default, skip_serializing_if = "Option::is_none")]
    pub result_time: Option<TimePeriod>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub ds_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_type: Option<String>,
    #[serde(rename = "system@id", default, skip_serializing_if = "Option::is_none")]
    pub system_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub links: Option<Vec<Link>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<DatastreamSchema>,
}

impl DatastreamResource {
    /// Minimal description with only a name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            description: None,
            output_name: None,
            valid_time: None,
            phenomenon_time: None,
            result_time: None,
            ds_type: None,
            result_type: None,
            system_id: None,
            links: None,
            schema: None,
        }
    }

    /// Record schema of the observation result, when the server provided one
    pub fn record_schema(&self) -> Option<&DataRecordSchema> {
        self.schema.as_ref().and_then(|s| s.record_schema.as_ref())
    }
}

/// Result schema attached to a datastream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatastreamSchema {
    pub obs_format: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record_schema: Option<DataRecordSchema>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encoding: Option<Value>,
}

impl DatastreamSchema {
    /// SWE+JSON schema with JSON encoding
    pub fn swe_json(record_schema: DataRecordSchema) -> Self {
        Self {
            obs_format: SWE_JSON_FORMAT.to_string(),
            record_schema: Some(record_schema),
            encoding: Some(serde_json::json!({ "type": "JSONEncoding", "vectorAsArrays": false })),
        }
    }
}

/// A command channel accepted by a system
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ControlStreamResource {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valid_time: Option<TimePeriod>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub links: Option<Vec<Link>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_deserialize_server_datastream() {
        let ds: DatastreamResource = serde_json::from_value(json!({
            "id": "ds123",
            "name": "Weather - weather",
            "outputName": "weather",
            "validTime": ["2024-01-01T00:00:00Z", "now"],
            "system@id": "sys1",
            "formats": ["application/om+json"]
        }))
        .unwrap();

        assert_eq!(ds.id.as_deref(), Some("ds123"));
        assert_eq!(ds.output_name.as_deref(), Some("weather"));
        assert_eq!(ds.system_id.as_deref(), Some("sys1"));
        assert!(ds.valid_time.is_some());
        assert!(ds.record_schema().is_none());
    }

    #[test]
    fn test_insert_body_shape() {
        let mut ds = DatastreamResource::new("Counter");
        ds.output_name = Some("counter".to_string());
        ds.schema = Some(DatastreamSchema::swe_json(DataRecordSchema::new("counter", "Counter")));

        let json = serde_json::to_value(&ds).unwrap();
        assert!(json.get("id").is_none());
        assert_eq!(json["schema"]["obsFormat"], SWE_JSON_FORMAT);
        assert_eq!(json["schema"]["encoding"]["type"], "JSONEncoding");
        assert_eq!(json["schema"]["recordSchema"]["type"], "DataRecord");
    }
}
