//! Request and response shapes for the vital-signs operations.
//!
//! These are the externally observable contract: the REST layer serialises them unchanged and
//! documents them through `utoipa`.

use chrono::{DateTime, Utc};
use openehr::{parse_timestamp, OpenEhrMetadata, VitalSignsRecord};
use serde::{de, Deserialize, Deserializer, Serialize};
use serde_json::Value;
use utoipa::ToSchema;
use vitals_types::PatientId;

use crate::gateway::CompositionFormat;

fn utc_from_text<E: de::Error>(text: &str) -> Result<DateTime<Utc>, E> {
    parse_timestamp(text)
        .ok_or_else(|| E::custom(format!("invalid timestamp '{text}', expected RFC 3339")))
}

/// Deserialises an RFC 3339 instant. Values without an offset are read as UTC.
pub fn deserialize_utc<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let text = String::deserialize(deserializer)?;
    utc_from_text(&text)
}

/// [`deserialize_utc`] for optional fields; pair it with `#[serde(default)]`.
pub fn deserialize_optional_utc<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer)?
        .map(|text| utc_from_text(&text))
        .transpose()
}

/// Request to record one set of vital signs.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct VitalSignsCreate {
    #[schema(value_type = String)]
    pub patient_id: PatientId,
    /// Vital signs may be recorded outside an encounter.
    #[serde(default)]
    pub encounter_id: Option<String>,
    /// Offset-less values are read as UTC.
    #[serde(deserialize_with = "deserialize_utc")]
    pub recorded_at: DateTime<Utc>,
    /// Systolic pressure in mmHg (50-300).
    #[serde(default)]
    pub systolic: Option<i32>,
    /// Diastolic pressure in mmHg (30-200).
    #[serde(default)]
    pub diastolic: Option<i32>,
    /// Pulse rate in beats per minute (20-300).
    #[serde(default)]
    pub pulse_rate: Option<i32>,
}

/// One vital-signs reading with its openEHR audit trail.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct VitalSignsResponse {
    /// Composition uid, or a `pending::` placeholder after a degraded write.
    pub id: String,
    #[schema(value_type = String)]
    pub patient_id: PatientId,
    pub encounter_id: Option<String>,
    pub recorded_at: DateTime<Utc>,
    pub systolic: Option<u16>,
    pub diastolic: Option<u16>,
    pub pulse_rate: Option<u16>,
    pub created_at: DateTime<Utc>,
    pub openehr_metadata: OpenEhrMetadata,
}

impl VitalSignsResponse {
    pub fn from_record(
        id: impl Into<String>,
        record: &VitalSignsRecord,
        created_at: DateTime<Utc>,
        openehr_metadata: OpenEhrMetadata,
    ) -> Self {
        Self {
            id: id.into(),
            patient_id: record.patient_id().clone(),
            encounter_id: record.encounter_id().map(str::to_string),
            recorded_at: record.recorded_at(),
            systolic: record.systolic(),
            diastolic: record.diastolic(),
            pulse_rate: record.pulse_rate(),
            created_at,
            openehr_metadata,
        }
    }
}

/// One page of readings.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct VitalSignsListResponse {
    pub items: Vec<VitalSignsResponse>,
    /// Total rows available before paging.
    pub total: usize,
}

/// A composition exactly as the clinical-data server returned it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RawCompositionResponse {
    pub format: CompositionFormat,
    pub template_id: String,
    #[schema(value_type = Object)]
    pub composition: Value,
}

/// One FLAT path in a stored composition.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CompositionPath {
    pub path: String,
    #[schema(value_type = Object)]
    pub value: Value,
    /// JSON kind of `value`: `int`, `float`, `str`, `bool`, `null`, `list` or `dict`.
    #[serde(rename = "type")]
    pub value_type: String,
}

impl CompositionPath {
    pub fn new(path: impl Into<String>, value: Value) -> Self {
        let value_type = json_kind(&value).to_string();
        Self {
            path: path.into(),
            value,
            value_type,
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(n) if n.is_f64() => "float",
        Value::Number(_) => "int",
        Value::String(_) => "str",
        Value::Array(_) => "list",
        Value::Object(_) => "dict",
    }
}

/// Every path of a FLAT composition, sorted by path.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CompositionPathsResponse {
    pub composition_uid: String,
    pub template_id: String,
    pub paths: Vec<CompositionPath>,
}

/// Summary of an operational template known to the clinical-data server.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct TemplateInfo {
    #[serde(default)]
    pub template_id: String,
    #[serde(default)]
    pub concept: Option<String>,
    #[serde(default)]
    pub archetype_id: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct TemplateListResponse {
    pub templates: Vec<TemplateInfo>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct TemplateExampleResponse {
    pub template_id: String,
    pub format: CompositionFormat,
    #[schema(value_type = Object)]
    pub example: Value,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn test_create_request_optional_fields_default_to_none() {
        let req: VitalSignsCreate = serde_json::from_value(json!({
            "patient_id": "P1",
            "recorded_at": "2024-01-01T10:00:00Z",
            "pulse_rate": 72
        }))
        .unwrap();
        assert_eq!(req.systolic, None);
        assert_eq!(req.encounter_id, None);
        assert_eq!(req.pulse_rate, Some(72));
    }

    #[test]
    fn test_create_request_accepts_naive_timestamp_as_utc() {
        let req: VitalSignsCreate = serde_json::from_value(json!({
            "patient_id": "P1",
            "recorded_at": "2024-01-01T10:00:00",
            "pulse_rate": 72
        }))
        .unwrap();
        assert_eq!(
            req.recorded_at,
            Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_create_request_rejects_unparseable_timestamp() {
        let err = serde_json::from_value::<VitalSignsCreate>(json!({
            "patient_id": "P1",
            "recorded_at": "yesterday",
            "pulse_rate": 72
        }))
        .unwrap_err();
        assert!(err.to_string().contains("invalid timestamp"));
    }

    #[test]
    fn test_create_request_rejects_blank_patient() {
        let err = serde_json::from_value::<VitalSignsCreate>(json!({
            "patient_id": "  ",
            "recorded_at": "2024-01-01T10:00:00Z"
        }));
        assert!(err.is_err());
    }

    #[test]
    fn test_composition_path_kinds() {
        let kinds: Vec<String> = [
            json!(1),
            json!(1.5),
            json!("x"),
            json!(true),
            Value::Null,
            json!([1]),
            json!({"a": 1}),
        ]
        .into_iter()
        .map(|v| CompositionPath::new("p", v).value_type)
        .collect();
        assert_eq!(kinds, vec!["int", "float", "str", "bool", "null", "list", "dict"]);
    }

    #[test]
    fn test_composition_path_serialises_type_field() {
        let json = serde_json::to_value(CompositionPath::new("ctx/language", json!("en"))).unwrap();
        assert_eq!(json, json!({"path": "ctx/language", "value": "en", "type": "str"}));
    }

    #[test]
    fn test_template_info_tolerates_missing_fields() {
        let info: TemplateInfo =
            serde_json::from_value(json!({"template_id": "t1", "created_on": "2024-01-01"}))
                .unwrap();
        assert_eq!(info.template_id, "t1");
        assert_eq!(info.concept, None);
    }
}
