//! Field → archetype-path audit trail.
//!
//! Every vital-signs response carries an [`OpenEhrMetadata`] block so that a clinician or auditor
//! can see exactly where each displayed number lives in the openEHR model. The block is derived
//! entirely from the path table in [`crate::paths`] and the record itself, so it is deterministic
//! for a given `(record, composition_uid, ehr_id, template_id)`.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use vitals_types::EhrId;

use crate::paths::{
    FieldMapping, BLOOD_PRESSURE, COMPOSITION_ARCHETYPE_ID, DIASTOLIC, PULSE, PULSE_RATE, SYSTOLIC,
};
use crate::VitalSignsRecord;

/// Where one application field is stored in the openEHR model, and the value stored there.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PathMappingEntry {
    pub field: String,
    pub archetype_id: String,
    /// Reference-model path down to the magnitude leaf.
    pub archetype_path: String,
    pub flat_path: String,
    pub value: Option<u16>,
    pub unit: Option<String>,
}

impl PathMappingEntry {
    fn new(archetype_id: &str, mapping: &FieldMapping, value: Option<u16>) -> Self {
        Self {
            field: mapping.field.to_string(),
            archetype_id: archetype_id.to_string(),
            archetype_path: mapping.archetype_path(),
            flat_path: mapping.flat_magnitude_path.to_string(),
            value,
            unit: Some(mapping.unit.to_string()),
        }
    }
}

/// openEHR identifiers and path mappings attached to a vital-signs response.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct OpenEhrMetadata {
    pub composition_uid: String,
    pub template_id: String,
    /// Composition archetype first, then one entry per populated observation.
    pub archetype_ids: Vec<String>,
    pub ehr_id: String,
    pub path_mappings: Vec<PathMappingEntry>,
}

impl OpenEhrMetadata {
    /// Describes where the populated fields of `record` are stored.
    ///
    /// The blood-pressure archetype and its two mappings appear only when both values are
    /// present; the pulse archetype and its mapping only when a pulse rate is present. Each
    /// archetype id appears at most once.
    pub fn build(
        composition_uid: &str,
        ehr_id: &EhrId,
        template_id: &str,
        record: &VitalSignsRecord,
    ) -> Self {
        let mut archetype_ids = vec![COMPOSITION_ARCHETYPE_ID.to_string()];
        let mut path_mappings = Vec::new();

        if let Some(bp) = record.blood_pressure() {
            archetype_ids.push(BLOOD_PRESSURE.archetype_id.to_string());
            path_mappings.push(PathMappingEntry::new(
                BLOOD_PRESSURE.archetype_id,
                &SYSTOLIC,
                Some(bp.systolic),
            ));
            path_mappings.push(PathMappingEntry::new(
                BLOOD_PRESSURE.archetype_id,
                &DIASTOLIC,
                Some(bp.diastolic),
            ));
        }

        if let Some(rate) = record.pulse_rate() {
            archetype_ids.push(PULSE.archetype_id.to_string());
            path_mappings.push(PathMappingEntry::new(PULSE.archetype_id, &PULSE_RATE, Some(rate)));
        }

        Self {
            composition_uid: composition_uid.to_string(),
            template_id: template_id.to_string(),
            archetype_ids,
            ehr_id: ehr_id.to_string(),
            path_mappings,
        }
    }
}
