//! FLAT composition construction and reading.
//!
//! The FLAT format is a single-level JSON object whose keys encode the full template path to a
//! leaf value (`vital_signs/pulse_heart_beat/any_event:0/rate|magnitude`). Key order is kept as
//! inserted so that the submitted document reads in the same order as the path table.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use vitals_types::PatientId;

use crate::paths::{
    ConceptMapping, FieldMapping, BLOOD_PRESSURE, CTX_LANGUAGE, CTX_TERRITORY, CTX_TIME, DIASTOLIC,
    PULSE, PULSE_RATE, SYSTOLIC,
};
use crate::values::{format_timestamp, parse_store_timestamp, present_magnitude};
use crate::VitalSignsRecord;

pub const DEFAULT_LANGUAGE: &str = "en";
pub const DEFAULT_TERRITORY: &str = "GB";

/// An insertion-ordered mapping from FLAT paths to scalar values.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct FlatComposition(Map<String, Value>);

impl FlatComposition {
    pub fn new() -> Self {
        Self::default()
    }

    fn insert_text(&mut self, path: &str, value: &str) {
        self.0.insert(path.to_string(), Value::String(value.to_string()));
    }

    fn insert_time(&mut self, path: &str, at: DateTime<Utc>) {
        self.0
            .insert(path.to_string(), Value::String(format_timestamp(at)));
    }

    fn insert_quantity(&mut self, field: &FieldMapping, magnitude: u16) {
        self.0
            .insert(field.flat_magnitude_path.to_string(), Value::from(magnitude));
        self.insert_text(field.flat_unit_path, field.unit);
    }

    pub fn get(&self, path: &str) -> Option<&Value> {
        self.0.get(path)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.0.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates paths and values in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

/// Builds FLAT compositions for the vital-signs template.
///
/// The builder only holds the composition context (language and territory); it performs no I/O
/// and reads no clock, so identical records always produce identical compositions.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FlatCompositionBuilder {
    language: String,
    territory: String,
}

impl Default for FlatCompositionBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_LANGUAGE, DEFAULT_TERRITORY)
    }
}

impl FlatCompositionBuilder {
    pub fn new(language: impl Into<String>, territory: impl Into<String>) -> Self {
        Self {
            language: language.into(),
            territory: territory.into(),
        }
    }

    /// Renders `record` as a FLAT composition.
    ///
    /// The three context fields are always present. The blood-pressure group is emitted only when
    /// both systolic and diastolic are present, and the pulse group only when a pulse rate is
    /// present. Magnitudes are copied verbatim with their fixed units.
    pub fn build(&self, record: &VitalSignsRecord) -> FlatComposition {
        let recorded_at = record.recorded_at();
        let mut flat = FlatComposition::new();

        flat.insert_text(CTX_LANGUAGE, &self.language);
        flat.insert_text(CTX_TERRITORY, &self.territory);
        flat.insert_time(CTX_TIME, recorded_at);

        if let Some(bp) = record.blood_pressure() {
            flat.insert_quantity(&SYSTOLIC, bp.systolic);
            flat.insert_quantity(&DIASTOLIC, bp.diastolic);
            flat.insert_time(BLOOD_PRESSURE.flat_event_time_path, recorded_at);
        }

        if let Some(rate) = record.pulse_rate() {
            flat.insert_quantity(&PULSE_RATE, rate);
            flat.insert_time(PULSE.flat_event_time_path, recorded_at);
        }

        flat
    }
}

fn event_time<'a>(flat: &'a Map<String, Value>, concept: &ConceptMapping) -> Option<&'a Value> {
    flat.get(concept.flat_event_time_path)
}

/// Rebuilds a record from a FLAT composition fetched from the clinical-data server.
///
/// The recording time is taken from the blood-pressure event, then the pulse event, then the
/// composition context, then `now`. Magnitudes follow the same presence rule as query results.
pub fn read_flat_composition(
    flat: &Map<String, Value>,
    patient_id: PatientId,
    now: DateTime<Utc>,
) -> VitalSignsRecord {
    let time = event_time(flat, &BLOOD_PRESSURE)
        .or_else(|| event_time(flat, &PULSE))
        .or_else(|| flat.get(CTX_TIME))
        .or_else(|| {
            flat.iter()
                .find(|(k, _)| k.ends_with("/context/start_time"))
                .map(|(_, v)| v)
        });

    let magnitude = |field: &FieldMapping| {
        present_magnitude(field.field, flat.get(field.flat_magnitude_path))
    };

    VitalSignsRecord::from_store(
        patient_id,
        None,
        parse_store_timestamp("recorded_at", time, now),
        magnitude(&SYSTOLIC),
        magnitude(&DIASTOLIC),
        magnitude(&PULSE_RATE),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap()
    }

    fn record(systolic: Option<u16>, diastolic: Option<u16>, pulse: Option<u16>) -> VitalSignsRecord {
        VitalSignsRecord::new(PatientId::new("P1").unwrap(), None, at(), systolic, diastolic, pulse)
            .expect("test record should be valid")
    }

    #[test]
    fn test_blood_pressure_only_composition() {
        let flat = FlatCompositionBuilder::default().build(&record(Some(120), Some(80), None));

        assert_eq!(
            flat.get("vital_signs/blood_pressure/any_event:0/systolic|magnitude"),
            Some(&json!(120))
        );
        assert_eq!(
            flat.get("vital_signs/blood_pressure/any_event:0/diastolic|magnitude"),
            Some(&json!(80))
        );
        assert_eq!(
            flat.get("vital_signs/blood_pressure/any_event:0/systolic|unit"),
            Some(&json!("mm[Hg]"))
        );
        assert_eq!(
            flat.get("vital_signs/blood_pressure/any_event:0/time"),
            Some(&json!("2024-01-01T10:00:00Z"))
        );
        assert!(!flat.iter().any(|(k, _)| k.contains("pulse")));
        assert_eq!(flat.len(), 3 + 5);
    }

    #[test]
    fn test_pulse_only_composition_has_no_blood_pressure_paths() {
        let flat = FlatCompositionBuilder::default().build(&record(None, None, Some(72)));

        assert_eq!(
            flat.get("vital_signs/pulse_heart_beat/any_event:0/rate|magnitude"),
            Some(&json!(72))
        );
        assert_eq!(
            flat.get("vital_signs/pulse_heart_beat/any_event:0/rate|unit"),
            Some(&json!("/min"))
        );
        assert!(flat.contains("vital_signs/pulse_heart_beat/any_event:0/time"));
        assert!(!flat.iter().any(|(k, _)| k.contains("blood_pressure")));
    }

    #[test]
    fn test_context_fields_always_present_and_first() {
        let builder = FlatCompositionBuilder::new("en", "US");
        let flat = builder.build(&record(Some(130), Some(85), Some(64)));
        let keys: Vec<&str> = flat.iter().map(|(k, _)| k.as_str()).take(3).collect();

        assert_eq!(keys, vec![CTX_LANGUAGE, CTX_TERRITORY, CTX_TIME]);
        assert_eq!(flat.get(CTX_TERRITORY), Some(&json!("US")));
        assert_eq!(flat.get(CTX_TIME), Some(&json!("2024-01-01T10:00:00Z")));
    }

    #[test]
    fn test_build_is_deterministic() {
        let builder = FlatCompositionBuilder::default();
        let r = record(Some(118), Some(76), Some(70));
        assert_eq!(builder.build(&r), builder.build(&r));
        assert_eq!(
            serde_json::to_string(&builder.build(&r)).unwrap(),
            serde_json::to_string(&builder.build(&r)).unwrap()
        );
    }

    #[test]
    fn test_read_flat_composition_recovers_record() {
        let original = record(Some(120), Some(80), Some(66));
        let flat = FlatCompositionBuilder::default().build(&original);
        let Value::Object(map) = flat.into_value() else {
            panic!("flat composition should serialise to an object");
        };

        let later = Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap();
        let read = read_flat_composition(&map, PatientId::new("P1").unwrap(), later);
        assert_eq!(read, original);
    }

    #[test]
    fn test_read_flat_composition_falls_back_to_context_start_time() {
        let map = json!({
            "vital_signs/context/start_time": "2024-02-02T08:30:00Z",
            "vital_signs/pulse_heart_beat/any_event:0/rate|magnitude": 90
        });
        let Value::Object(map) = map else { unreachable!() };

        let read = read_flat_composition(&map, PatientId::new("P9").unwrap(), at());
        assert_eq!(
            read.recorded_at(),
            Utc.with_ymd_and_hms(2024, 2, 2, 8, 30, 0).unwrap()
        );
        assert_eq!(read.pulse_rate(), Some(90));
        assert_eq!(read.systolic(), None);
    }
}
