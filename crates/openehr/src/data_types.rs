//! OpenEHR identifier data types.
//!
//! Key types:
//! - [`ArchetypeId`]: Parsed and validated openEHR archetype identifier.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use crate::OpenEhrError;

/// Parsed and validated representation of an openEHR archetype identifier.
///
/// In the openEHR architecture, archetypes are formal constraint definitions that specialise
/// Reference Model (RM) classes to create domain-specific clinical models. Each archetype is
/// uniquely identified by an archetype ID, which encodes the authority, RM target, semantic
/// concept, and version in a structured string format.
///
/// # Canonical Form
///
/// `openEHR-<PACKAGE>-<RM_CLASS>.<concept>.v<version>`
///
/// Example: `openEHR-EHR-OBSERVATION.blood_pressure.v1`
///
/// # Constraints
///
/// - **Authority**: Must be `"openEHR"` (case-sensitive).
/// - **RM Package**: Must be `"EHR"` or `"DEMOGRAPHIC"`.
/// - **RM Class**: Upper-case ASCII letters and underscores (for example `OBSERVATION`).
/// - **Concept**: Lower-case ASCII letters, digits, `_` and `-`; specialisations such as
///   `blood_pressure-home` are accepted.
/// - **Version**: A positive integer.
///
/// Unlike a closed list of supported archetypes, these rules accept any well-formed identifier so
/// that reference lookups can describe archetypes this workspace does not map.
///
/// # Examples
///
/// ```rust
/// # use openehr::data_types::ArchetypeId;
/// let id = ArchetypeId::parse("openEHR-EHR-OBSERVATION.pulse.v1")?;
/// assert!(id.is_observation());
/// assert_eq!(id.to_string(), "openEHR-EHR-OBSERVATION.pulse.v1");
/// # Ok::<(), openehr::OpenEhrError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchetypeId {
    /// Archetype authority (e.g. "openEHR")
    pub authority: String,

    /// Reference Model package (e.g. "EHR")
    pub rm_package: String,

    /// Reference Model class (e.g. "COMPOSITION", "OBSERVATION")
    pub rm_class: String,

    /// Archetype concept (e.g. "blood_pressure", "pulse")
    pub concept: String,

    /// Archetype version number (e.g. 1)
    pub version: u32,
}

impl ArchetypeId {
    fn validate_components(
        authority: &str,
        rm_package: &str,
        rm_class: &str,
        concept: &str,
        version: u32,
    ) -> Result<(), OpenEhrError> {
        if authority != "openEHR" {
            return Err(OpenEhrError::InvalidArchetypeId(format!(
                "authority must be 'openEHR', got '{}'",
                authority
            )));
        }

        if !matches!(rm_package, "EHR" | "DEMOGRAPHIC") {
            return Err(OpenEhrError::InvalidArchetypeId(format!(
                "rm_package must be 'EHR' or 'DEMOGRAPHIC', got '{}'",
                rm_package
            )));
        }

        if rm_class.is_empty() || !rm_class.bytes().all(|b| b.is_ascii_uppercase() || b == b'_') {
            return Err(OpenEhrError::InvalidArchetypeId(format!(
                "rm_class must be upper-case letters or '_', got '{}'",
                rm_class
            )));
        }

        let concept_ok = !concept.is_empty()
            && concept
                .bytes()
                .all(|b| matches!(b, b'a'..=b'z' | b'0'..=b'9' | b'_' | b'-'));
        if !concept_ok {
            return Err(OpenEhrError::InvalidArchetypeId(format!(
                "concept must be lower-case letters, digits, '_' or '-', got '{}'",
                concept
            )));
        }

        if version == 0 {
            return Err(OpenEhrError::InvalidArchetypeId(
                "version must be at least 1".to_string(),
            ));
        }

        Ok(())
    }

    /// Parses and validates an openEHR archetype identifier string.
    ///
    /// # Errors
    ///
    /// Returns [`OpenEhrError::InvalidArchetypeId`] if the string is not of the form
    /// `openEHR-<PACKAGE>-<RM_CLASS>.<concept>.v<version>` or any component breaks the rules
    /// documented on the type.
    pub fn parse(raw: &str) -> Result<Self, OpenEhrError> {
        let (authority, rest) = raw
            .split_once('-')
            .ok_or_else(|| OpenEhrError::InvalidArchetypeId(raw.to_string()))?;

        let (rm_package, remainder) = rest
            .split_once('-')
            .ok_or_else(|| OpenEhrError::InvalidArchetypeId(raw.to_string()))?;

        let (rm_class, remainder) = remainder
            .split_once('.')
            .ok_or_else(|| OpenEhrError::InvalidArchetypeId(raw.to_string()))?;

        let (concept, version_part) = remainder
            .rsplit_once(".v")
            .ok_or_else(|| OpenEhrError::InvalidArchetypeId(raw.to_string()))?;

        let version = version_part
            .parse::<u32>()
            .map_err(|_| OpenEhrError::InvalidArchetypeId(raw.to_string()))?;

        Self::validate_components(authority, rm_package, rm_class, concept, version)?;

        Ok(Self {
            authority: authority.to_string(),
            rm_package: rm_package.to_string(),
            rm_class: rm_class.to_string(),
            concept: concept.to_string(),
            version,
        })
    }

    /// Returns `true` if this archetype targets the `COMPOSITION` RM class.
    pub fn is_composition(&self) -> bool {
        self.rm_class == "COMPOSITION"
    }

    /// Returns `true` if this archetype targets the `OBSERVATION` RM class.
    pub fn is_observation(&self) -> bool {
        self.rm_class == "OBSERVATION"
    }
}

impl fmt::Display for ArchetypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{}-{}.{}.v{}",
            self.authority, self.rm_package, self.rm_class, self.concept, self.version
        )
    }
}

impl Serialize for ArchetypeId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for ArchetypeId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_observation_archetype() {
        let id = ArchetypeId::parse("openEHR-EHR-OBSERVATION.blood_pressure.v2").unwrap();
        assert_eq!(id.authority, "openEHR");
        assert_eq!(id.rm_package, "EHR");
        assert_eq!(id.rm_class, "OBSERVATION");
        assert_eq!(id.concept, "blood_pressure");
        assert_eq!(id.version, 2);
        assert!(id.is_observation());
        assert!(!id.is_composition());
    }

    #[test]
    fn test_display_round_trips_canonical_form() {
        let raw = "openEHR-EHR-COMPOSITION.encounter.v1";
        assert_eq!(ArchetypeId::parse(raw).unwrap().to_string(), raw);
    }

    #[test]
    fn test_parse_accepts_demographic_package() {
        let id = ArchetypeId::parse("openEHR-DEMOGRAPHIC-PERSON.person.v1").unwrap();
        assert_eq!(id.rm_package, "DEMOGRAPHIC");
    }

    #[test]
    fn test_parse_rejects_malformed_ids() {
        for raw in [
            "",
            "blood_pressure",
            "openEHR-EHR-OBSERVATION",
            "openEHR-EHR-OBSERVATION.pulse",
            "openEHR-EHR-OBSERVATION.pulse.vX",
            "openEHR-EHR-OBSERVATION.pulse.v0",
            "acme-EHR-OBSERVATION.pulse.v1",
            "openEHR-XYZ-OBSERVATION.pulse.v1",
            "openEHR-EHR-observation.pulse.v1",
            "openEHR-EHR-OBSERVATION.Pulse.v1",
        ] {
            let err = ArchetypeId::parse(raw).expect_err(raw);
            assert!(matches!(err, OpenEhrError::InvalidArchetypeId(_)), "{raw}");
        }
    }

    #[test]
    fn test_serde_uses_canonical_string() {
        let id = ArchetypeId::parse("openEHR-EHR-OBSERVATION.pulse.v1").unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"openEHR-EHR-OBSERVATION.pulse.v1\"");
        let back: ArchetypeId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}
