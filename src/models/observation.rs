//! Observations
//!
//! `ObservationResource` is the inline JSON form exchanged with the server;
//! `Observation` is the immutable value handed to callers once a payload has
//! been accepted.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{DataRecordSchema, Link, TimeInstant, ValidationError};

/// One observation in `application/om+json` inline form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObservationResource {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "datastream@id", default, skip_serializing_if = "Option::is_none")]
    pub datastream_id: Option<String>,
    #[serde(rename = "samplingFeature@id", default, skip_serializing_if = "Option::is_none")]
    pub sampling_feature_id: Option<String>,
    #[serde(rename = "procedure@link", default, skip_serializing_if = "Option::is_none")]
    pub procedure_link: Option<Link>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phenomenon_time: Option<TimeInstant>,
    pub result_time: TimeInstant,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Value>,
    #[serde(default)]
    pub result: Value,
    #[serde(rename = "result@link", default, skip_serializing_if = "Option::is_none")]
    pub result_link: Option<Link>,
}

impl ObservationResource {
    /// Observation with the given result, stamped with the current time
    pub fn now(result: Value) -> Self {
        Self {
            id: None,
            datastream_id: None,
            sampling_feature_id: None,
            procedure_link: None,
            phenomenon_time: None,
            result_time: TimeInstant::now_utc(),
            parameters: None,
            result,
            result_link: None,
        }
    }

    /// Check the result against a record schema
    pub fn validate_against_schema(&self, schema: &DataRecordSchema) -> Result<(), ValidationError> {
        schema.validate(&self.result)
    }
}

/// Immutable observation value
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    resource: ObservationResource,
}

impl Observation {
    /// Wrap an observation, validating it first when a schema is given
    pub fn new(
        resource: ObservationResource,
        schema: Option<&DataRecordSchema>,
    ) -> Result<Self, ValidationError> {
        if let Some(schema) = schema {
            resource.validate_against_schema(schema)?;
        }
        Ok(Self { resource })
    }

    /// Decode an inbound stream payload (text or binary JSON)
    pub fn from_message(payload: &[u8]) -> Result<Self, serde_json::Error> {
        let resource = serde_json::from_slice(payload)?;
        Ok(Self { resource })
    }

    pub fn result(&self) -> &Value {
        &self.resource.result
    }

    pub fn result_time(&self) -> TimeInstant {
        self.resource.result_time
    }

    /// Borrow the wire representation
    pub fn resource(&self) -> &ObservationResource {
        &self.resource
    }

    /// Take the wire representation
    pub fn to_resource(&self) -> ObservationResource {
        self.resource.clone()
    }
}
