//! Record schemas and observation validation
//!
//! A structural subset of SWE Common record descriptions, enough to describe a
//! datastream's result and to reject observation payloads that do not match it.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use super::time::TimeInstant;

/// Kind of a SWE Common data component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ComponentKind {
    DataRecord,
    Vector,
    Quantity,
    Count,
    Boolean,
    Text,
    Category,
    Time,
    /// Any component type not modelled here (`DataArray`, `DataChoice`, ranges)
    #[serde(other)]
    Unknown,
}

impl ComponentKind {
    fn expected(&self) -> &'static str {
        match self {
            ComponentKind::DataRecord | ComponentKind::Vector => "object",
            ComponentKind::Quantity => "number",
            ComponentKind::Count => "integer",
            ComponentKind::Boolean => "boolean",
            ComponentKind::Text | ComponentKind::Category => "string",
            ComponentKind::Time => "ISO-8601 time or epoch number",
            ComponentKind::Unknown => "any value",
        }
    }
}

/// One field of a record schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SweComponent {
    #[serde(rename = "type")]
    pub kind: ComponentKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub definition: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_frame: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uom: Option<Value>,
    /// Child fields of a nested `DataRecord`
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<SweComponent>,
    /// Coordinates of a `Vector`
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub coordinates: Vec<SweComponent>,
}

impl SweComponent {
    /// Create a bare component of the given kind
    pub fn new(kind: ComponentKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: Some(name.into()),
            label: None,
            definition: None,
            description: None,
            reference_frame: None,
            uom: None,
            fields: Vec::new(),
            coordinates: Vec::new(),
        }
    }

    /// A numeric quantity with a UCUM unit code
    pub fn quantity(name: impl Into<String>, uom_code: &str) -> Self {
        let mut c = Self::new(ComponentKind::Quantity, name);
        c.uom = Some(serde_json::json!({ "code": uom_code }));
        c
    }

    /// The ISO-8601 sampling time field conventionally first in a record
    pub fn sampling_time() -> Self {
        let mut c = Self::new(ComponentKind::Time, "time");
        c.label = Some("Sampling Time".to_string());
        c.definition = Some("http://www.opengis.net/def/property/OGC/0/SamplingTime".to_string());
        c.reference_frame = Some("http://www.opengis.net/def/trs/BIPM/0/UTC".to_string());
        c.uom = Some(serde_json::json!({ "href": "http://www.opengis.net/def/uom/ISO-8601/0/Gregorian" }));
        c
    }

    /// Builder method: set label
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Builder method: set definition URI
    pub fn definition(mut self, definition: impl Into<String>) -> Self {
        self.definition = Some(definition.into());
        self
    }

    /// Builder method: add a child field (nested records)
    pub fn field(mut self, field: SweComponent) -> Self {
        self.fields.push(field);
        self
    }

    fn validate_value(&self, value: &Value, path: &str) -> Result<(), ValidationError> {
        let ok = match self.kind {
            ComponentKind::DataRecord => return validate_fields(&self.fields, value, path),
            ComponentKind::Vector => return validate_fields(&self.coordinates, value, path),
            ComponentKind::Quantity => value.is_number(),
            ComponentKind::Count => value.is_i64() || value.is_u64(),
            ComponentKind::Boolean => value.is_boolean(),
            ComponentKind::Text | ComponentKind::Category => value.is_string(),
            ComponentKind::Time => match value {
                Value::String(s) => s.parse::<TimeInstant>().is_ok(),
                Value::Number(_) => true,
                _ => false,
            },
            ComponentKind::Unknown => true,
        };

        if ok {
            Ok(())
        } else {
            Err(ValidationError::TypeMismatch {
                path: path.to_string(),
                expected: self.kind.expected(),
                found: json_type_name(value),
            })
        }
    }
}

/// Root record describing an observation result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataRecordSchema {
    #[serde(rename = "type", default = "data_record_type")]
    pub record_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub definition: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub fields: Vec<SweComponent>,
}

fn data_record_type() -> String {
    "DataRecord".to_string()
}

impl DataRecordSchema {
    /// Create an empty record
    pub fn new(name: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            record_type: data_record_type(),
            name: Some(name.into()),
            label: Some(label.into()),
            definition: None,
            description: None,
            fields: Vec::new(),
        }
    }

    /// Builder method: set definition URI
    pub fn definition(mut self, definition: impl Into<String>) -> Self {
        self.definition = Some(definition.into());
        self
    }

    /// Builder method: append a field
    pub fn field(mut self, field: SweComponent) -> Self {
        self.fields.push(field);
        self
    }

    /// Check that `result` carries every declared field with a compatible type
    pub fn validate(&self, result: &Value) -> Result<(), ValidationError> {
        validate_fields(&self.fields, result, "")
    }
}

fn validate_fields(fields: &[SweComponent], value: &Value, path: &str) -> Result<(), ValidationError> {
    let obj = value.as_object().ok_or_else(|| ValidationError::NotAnObject {
        path: display_path(path),
        found: json_type_name(value),
    })?;

    for field in fields {
        // Anonymous components cannot be addressed in an inline JSON result
        let Some(name) = field.name.as_deref() else {
            continue;
        };
        let child = if path.is_empty() {
            name.to_string()
        } else {
            format!("{}.{}", path, name)
        };
        let v = obj
            .get(name)
            .ok_or_else(|| ValidationError::MissingField { path: child.clone() })?;
        field.validate_value(v, &child)?;
    }

    Ok(())
}

fn display_path(path: &str) -> String {
    if path.is_empty() {
        "<root>".to_string()
    } else {
        path.to_string()
    }
}

fn json_type_name(value: &Value) -> String {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
    .to_string()
}

/// An observation payload does not match its datastream's record schema
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Missing field: {path}")]
    MissingField { path: String },

    #[error("Field {path}: expected {expected}, found {found}")]
    TypeMismatch {
        path: String,
        expected: &'static str,
        found: String,
    },

    #[error("Expected an object at {path}, found {found}")]
    NotAnObject { path: String, found: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn weather_schema() -> DataRecordSchema {
        DataRecordSchema::new("weather", "Weather Station")
            .field(SweComponent::sampling_time())
            .field(SweComponent::quantity("temperature", "Cel").label("Air Temperature"))
            .field(SweComponent::new(ComponentKind::Count, "strikes"))
            .field(
                SweComponent::new(ComponentKind::DataRecord, "wind")
                    .field(SweComponent::quantity("speed", "m/s"))
                    .field(SweComponent::new(ComponentKind::Category, "direction")),
            )
    }

    #[test]
    fn test_valid_payload() {
        let result = json!({
            "time": "2024-05-01T12:00:00Z",
            "temperature": 21.5,
            "strikes": 3,
            "wind": {"speed": 4.2, "direction": "NW"}
        });
        assert!(weather_schema().validate(&result).is_ok());
    }

    #[test]
    fn test_missing_nested_field() {
        let result = json!({
            "time": "2024-05-01T12:00:00Z",
            "temperature": 21.5,
            "strikes": 3,
            "wind": {"speed": 4.2}
        });
        assert_eq!(
            weather_schema().validate(&result),
            Err(ValidationError::MissingField {
                path: "wind.direction".to_string()
            })
        );
    }

    #[test]
    fn test_type_mismatch() {
        let result = json!({
            "time": "2024-05-01T12:00:00Z",
            "temperature": "warm",
            "strikes": 3,
            "wind": {"speed": 4.2, "direction": "NW"}
        });
        let err = weather_schema().validate(&result).unwrap_err();
        assert!(matches!(err, ValidationError::TypeMismatch { ref path, .. } if path == "temperature"));
        assert_eq!(err.to_string(), "Field temperature: expected number, found string");
    }

    #[test]
    fn test_count_rejects_fraction() {
        let schema = DataRecordSchema::new("c", "Counter").field(SweComponent::new(ComponentKind::Count, "n"));
        assert!(schema.validate(&json!({"n": 2.5})).is_err());
        assert!(schema.validate(&json!({"n": 2})).is_ok());
    }

    #[test]
    fn test_non_object_result() {
        let err = weather_schema().validate(&json!([1, 2, 3])).unwrap_err();
        assert!(matches!(err, ValidationError::NotAnObject { .. }));
    }

    #[test]
    fn test_unmodelled_component_kinds() {
        let schema: DataRecordSchema = serde_json::from_value(json!({
            "type": "DataRecord",
            "fields": [
                {"type": "Time", "name": "time"},
                {"type": "DataArray", "name": "samples", "elementType": {"type": "Quantity"}},
                {"type": "QuantityRange", "name": "range"}
            ]
        }))
        .unwrap();

        assert_eq!(schema.fields[1].kind, ComponentKind::Unknown);
        assert_eq!(schema.fields[2].kind, ComponentKind::Unknown);
        let result = json!({"time": "2024-05-01T12:00:00Z", "samples": [1.0, 2.0], "range": [0, 5]});
        assert!(schema.validate(&result).is_ok());
        assert!(matches!(
            schema.validate(&json!({"time": "2024-05-01T12:00:00Z", "range": [0, 5]})),
            Err(ValidationError::MissingField { ref path }) if path == "samples"
        ));
    }

    #[test]
    fn test_schema_serialization() {
        let json = serde_json::to_value(weather_schema()).unwrap();
        assert_eq!(json["type"], "DataRecord");
        assert_eq!(json["fields"][1]["type"], "Quantity");
        assert_eq!(json["fields"][1]["uom"]["code"], "Cel");
        assert_eq!(json["fields"][0]["referenceFrame"], "http://www.opengis.net/def/trs/BIPM/0/UTC");
    }
}
