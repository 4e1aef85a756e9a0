//! Concept → archetype → path mapping table.
//!
//! This is the single place that knows which openEHR archetype element each application field is
//! stored under. The composition builder, the flat reader, the AQL templates and the transparency
//! metadata all read from these tables rather than carrying their own string literals.
//!
//! Two path forms are recorded for every field:
//! - the reference-model path inside the archetype (what AQL selects and what auditors look up
//!   in CKM), for example `/data[at0001]/events[at0006]/data[at0003]/items[at0004]/value`;
//! - the FLAT submission path inside the operational template, for example
//!   `vital_signs/blood_pressure/any_event:0/systolic|magnitude`.

/// Operational template the vital-signs compositions are validated against.
pub const VITAL_SIGNS_TEMPLATE_ID: &str = "open-cis.vital-signs.v1";

/// Archetype of the composition root.
pub const COMPOSITION_ARCHETYPE_ID: &str = "openEHR-EHR-COMPOSITION.encounter.v1";

/// FLAT context field for the composition language.
pub const CTX_LANGUAGE: &str = "ctx/language";

/// FLAT context field for the composition territory.
pub const CTX_TERRITORY: &str = "ctx/territory";

/// FLAT context field for the composition time (becomes `context/start_time`).
pub const CTX_TIME: &str = "ctx/time";

/// Leaf appended to a reference-model value path to reach the quantity magnitude.
pub const MAGNITUDE_LEAF: &str = "magnitude";

/// One quantity element of an observation archetype.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldMapping {
    /// Application (UI) field name.
    pub field: &'static str,
    /// Reference-model path of the `DV_QUANTITY` value inside the archetype.
    pub rm_value_path: &'static str,
    /// FLAT path carrying the magnitude.
    pub flat_magnitude_path: &'static str,
    /// FLAT path carrying the unit.
    pub flat_unit_path: &'static str,
    /// UCUM unit string submitted with the magnitude.
    pub unit: &'static str,
}

impl FieldMapping {
    /// Reference-model path down to the `magnitude` leaf.
    pub fn archetype_path(&self) -> String {
        format!("{}/{}", self.rm_value_path, MAGNITUDE_LEAF)
    }
}

/// One clinical concept (an observation archetype) and the fields mapped into it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConceptMapping {
    /// Concept name, matching the archetype concept segment.
    pub concept: &'static str,
    pub archetype_id: &'static str,
    /// FLAT path of the event time for this observation.
    pub flat_event_time_path: &'static str,
    pub fields: &'static [FieldMapping],
}

impl ConceptMapping {
    /// Looks up a field by its application name.
    pub fn field(&self, name: &str) -> Option<&'static FieldMapping> {
        self.fields.iter().find(|f| f.field == name)
    }
}

pub const SYSTOLIC: FieldMapping = FieldMapping {
    field: "systolic",
    rm_value_path: "/data[at0001]/events[at0006]/data[at0003]/items[at0004]/value",
    flat_magnitude_path: "vital_signs/blood_pressure/any_event:0/systolic|magnitude",
    flat_unit_path: "vital_signs/blood_pressure/any_event:0/systolic|unit",
    unit: "mm[Hg]",
};

pub const DIASTOLIC: FieldMapping = FieldMapping {
    field: "diastolic",
    rm_value_path: "/data[at0001]/events[at0006]/data[at0003]/items[at0005]/value",
    flat_magnitude_path: "vital_signs/blood_pressure/any_event:0/diastolic|magnitude",
    flat_unit_path: "vital_signs/blood_pressure/any_event:0/diastolic|unit",
    unit: "mm[Hg]",
};

pub const PULSE_RATE: FieldMapping = FieldMapping {
    field: "pulse_rate",
    rm_value_path: "/data[at0002]/events[at0003]/data[at0001]/items[at0004]/value",
    flat_magnitude_path: "vital_signs/pulse_heart_beat/any_event:0/rate|magnitude",
    flat_unit_path: "vital_signs/pulse_heart_beat/any_event:0/rate|unit",
    unit: "/min",
};

pub static BLOOD_PRESSURE: ConceptMapping = ConceptMapping {
    concept: "blood_pressure",
    archetype_id: "openEHR-EHR-OBSERVATION.blood_pressure.v1",
    flat_event_time_path: "vital_signs/blood_pressure/any_event:0/time",
    fields: &[SYSTOLIC, DIASTOLIC],
};

pub static PULSE: ConceptMapping = ConceptMapping {
    concept: "pulse",
    archetype_id: "openEHR-EHR-OBSERVATION.pulse.v1",
    flat_event_time_path: "vital_signs/pulse_heart_beat/any_event:0/time",
    fields: &[PULSE_RATE],
};

/// All observation concepts, in the order they appear in compositions and metadata.
pub static CONCEPTS: [&ConceptMapping; 2] = [&BLOOD_PRESSURE, &PULSE];

/// Looks up a concept by name (`blood_pressure`, `pulse`).
pub fn concept(name: &str) -> Option<&'static ConceptMapping> {
    CONCEPTS.iter().copied().find(|c| c.concept == name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ArchetypeId;
    use std::collections::HashSet;

    #[test]
    fn test_concept_lookup() {
        assert_eq!(concept("blood_pressure"), Some(&BLOOD_PRESSURE));
        assert_eq!(concept("pulse"), Some(&PULSE));
        assert_eq!(concept("temperature"), None);
    }

    #[test]
    fn test_archetype_path_ends_with_magnitude_leaf() {
        assert_eq!(
            SYSTOLIC.archetype_path(),
            "/data[at0001]/events[at0006]/data[at0003]/items[at0004]/value/magnitude"
        );
    }

    #[test]
    fn test_every_archetype_id_in_table_parses() {
        ArchetypeId::parse(COMPOSITION_ARCHETYPE_ID).expect("composition archetype should parse");
        for c in CONCEPTS {
            let id = ArchetypeId::parse(c.archetype_id).expect("observation archetype should parse");
            assert_eq!(id.concept, c.concept);
            assert!(id.is_observation());
        }
    }

    #[test]
    fn test_flat_paths_are_unique_and_grouped_under_event() {
        let mut seen = HashSet::new();
        for c in CONCEPTS {
            let event_prefix = c.flat_event_time_path.trim_end_matches("/time");
            assert!(seen.insert(c.flat_event_time_path));
            for f in c.fields {
                assert!(f.flat_magnitude_path.starts_with(event_prefix));
                assert!(f.flat_unit_path.starts_with(event_prefix));
                assert!(seen.insert(f.flat_magnitude_path));
                assert!(seen.insert(f.flat_unit_path));
            }
        }
    }

    #[test]
    fn test_field_lookup_within_concept() {
        assert_eq!(BLOOD_PRESSURE.field("diastolic"), Some(&DIASTOLIC));
        assert_eq!(BLOOD_PRESSURE.field("pulse_rate"), None);
        assert_eq!(PULSE.field("pulse_rate").map(|f| f.unit), Some("/min"));
    }
}
