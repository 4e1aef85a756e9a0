//! Reference information for the archetypes this workspace maps.
//!
//! Lookups accept any well-formed archetype identifier. Archetypes outside the known table still
//! get a parsed description, just without a CKM link.

use serde::Serialize;
use utoipa::ToSchema;

use crate::data_types::ArchetypeId;
use crate::OpenEhrResult;

const NO_DESCRIPTION: &str = "No description available";

const BLOOD_PRESSURE_CKM: &str = "https://ckm.openehr.org/ckm/archetypes/1013.1.3574";
const PULSE_CKM: &str = "https://ckm.openehr.org/ckm/archetypes/1013.1.4295";
const ENCOUNTER_CKM: &str = "https://ckm.openehr.org/ckm/archetypes/1013.1.120";

const BLOOD_PRESSURE_DESCRIPTION: &str = "The local systemic arterial blood pressure which is a \
surrogate for arterial pressure in the systemic circulation.";
const PULSE_DESCRIPTION: &str = "The rate and associated attributes for a pulse or heart beat.";
const ENCOUNTER_DESCRIPTION: &str =
    "Interaction, contact or care event between a subject of care and healthcare provider(s).";

/// Known archetypes: id, CKM link, description.
const KNOWN_ARCHETYPES: [(&str, &str, &str); 5] = [
    (
        "openEHR-EHR-OBSERVATION.blood_pressure.v1",
        BLOOD_PRESSURE_CKM,
        BLOOD_PRESSURE_DESCRIPTION,
    ),
    (
        "openEHR-EHR-OBSERVATION.blood_pressure.v2",
        BLOOD_PRESSURE_CKM,
        BLOOD_PRESSURE_DESCRIPTION,
    ),
    ("openEHR-EHR-OBSERVATION.pulse.v1", PULSE_CKM, PULSE_DESCRIPTION),
    ("openEHR-EHR-OBSERVATION.pulse.v2", PULSE_CKM, PULSE_DESCRIPTION),
    (
        "openEHR-EHR-COMPOSITION.encounter.v1",
        ENCOUNTER_CKM,
        ENCOUNTER_DESCRIPTION,
    ),
];

/// Description of one archetype, as returned by the archetype lookup endpoint.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, ToSchema)]
pub struct ArchetypeInfo {
    pub archetype_id: String,
    pub concept: String,
    pub description: String,
    /// Clinical Knowledge Manager page, when known.
    pub ckm_url: Option<String>,
    /// Reference-model package (`EHR` or `DEMOGRAPHIC`).
    pub reference_model: String,
    /// Reference-model class, for example `OBSERVATION`.
    #[serde(rename = "type")]
    pub rm_type: String,
}

/// Looks up reference information for `raw`.
///
/// # Errors
///
/// Returns [`crate::OpenEhrError::InvalidArchetypeId`] when `raw` is not a well-formed archetype
/// identifier.
pub fn lookup(raw: &str) -> OpenEhrResult<ArchetypeInfo> {
    let id = ArchetypeId::parse(raw)?;
    let canonical = id.to_string();

    let known = KNOWN_ARCHETYPES
        .iter()
        .find(|(known_id, _, _)| *known_id == canonical);

    Ok(ArchetypeInfo {
        archetype_id: canonical,
        concept: id.concept,
        description: known
            .map(|(_, _, d)| *d)
            .unwrap_or(NO_DESCRIPTION)
            .to_string(),
        ckm_url: known.map(|(_, url, _)| url.to_string()),
        reference_model: id.rm_package,
        rm_type: id.rm_class,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::paths::{BLOOD_PRESSURE, COMPOSITION_ARCHETYPE_ID, PULSE};
    use crate::OpenEhrError;

    #[test]
    fn test_blood_pressure_info() {
        let info = lookup("openEHR-EHR-OBSERVATION.blood_pressure.v2").unwrap();
        assert_eq!(info.concept, "blood_pressure");
        assert_eq!(info.reference_model, "EHR");
        assert_eq!(info.rm_type, "OBSERVATION");
        assert_eq!(info.ckm_url.as_deref(), Some(BLOOD_PRESSURE_CKM));
        assert!(info.description.starts_with("The local systemic arterial"));
    }

    #[test]
    fn test_every_mapped_archetype_is_known() {
        for id in [COMPOSITION_ARCHETYPE_ID, BLOOD_PRESSURE.archetype_id, PULSE.archetype_id] {
            let info = lookup(id).unwrap();
            assert!(info.ckm_url.is_some(), "{id}");
            assert_ne!(info.description, NO_DESCRIPTION, "{id}");
        }
    }

    #[test]
    fn test_unknown_but_well_formed_archetype() {
        let info = lookup("openEHR-DEMOGRAPHIC-PERSON.person.v1").unwrap();
        assert_eq!(info.concept, "person");
        assert_eq!(info.reference_model, "DEMOGRAPHIC");
        assert_eq!(info.rm_type, "PERSON");
        assert_eq!(info.ckm_url, None);
        assert_eq!(info.description, NO_DESCRIPTION);
    }

    #[test]
    fn test_type_serialises_under_reserved_name() {
        let json = serde_json::to_value(lookup(PULSE.archetype_id).unwrap()).unwrap();
        assert_eq!(json["type"], "OBSERVATION");
        assert!(json.get("rm_type").is_none());
    }

    #[test]
    fn test_malformed_id_is_rejected() {
        let err = lookup("blood_pressure").expect_err("bare concept should be rejected");
        assert!(matches!(err, OpenEhrError::InvalidArchetypeId(_)));
    }
}
