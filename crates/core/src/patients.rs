//! Patient directory collaborator.
//!
//! Resolves an application patient id to the EHR that holds the patient's compositions. The
//! shipped [`PatientRegistry`] is loaded once from YAML at startup:
//!
//! ```yaml
//! patients:
//!   - patient_id: P1
//!     ehr_id: 7d44b88c-4199-4bad-97dc-d78268e01398
//! ```

use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use vitals_types::{EhrId, PatientId};

use crate::{VitalsError, VitalsResult};

#[async_trait]
pub trait PatientDirectory: Send + Sync {
    /// The EHR of `patient_id`, or `None` when the patient is unknown.
    async fn ehr_id_for(&self, patient_id: &PatientId) -> VitalsResult<Option<EhrId>>;
}

#[derive(Debug, Deserialize)]
struct RegistryFile {
    #[serde(default)]
    patients: Vec<RegistryEntry>,
}

#[derive(Debug, Deserialize)]
struct RegistryEntry {
    patient_id: PatientId,
    ehr_id: EhrId,
}

/// In-memory patient → EHR map.
#[derive(Clone, Debug, Default)]
pub struct PatientRegistry {
    entries: HashMap<PatientId, EhrId>,
}

impl PatientRegistry {
    /// Builds a registry from pairs, rejecting duplicate patient ids.
    pub fn from_entries(
        entries: impl IntoIterator<Item = (PatientId, EhrId)>,
    ) -> VitalsResult<Self> {
        let mut map = HashMap::new();
        for (patient_id, ehr_id) in entries {
            if map.contains_key(&patient_id) {
                return Err(VitalsError::Registry(format!(
                    "duplicate patient_id '{patient_id}'"
                )));
            }
            map.insert(patient_id, ehr_id);
        }
        Ok(Self { entries: map })
    }

    pub fn from_yaml_str(input: &str) -> VitalsResult<Self> {
        let de = serde_yaml::Deserializer::from_str(input);
        let file: RegistryFile = serde_path_to_error::deserialize(de)
            .map_err(|e| VitalsError::Registry(e.to_string()))?;
        Self::from_entries(file.patients.into_iter().map(|e| (e.patient_id, e.ehr_id)))
    }

    pub fn load(path: &Path) -> VitalsResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|source| VitalsError::RegistryRead {
            path: path.to_path_buf(),
            source,
        })?;
        let registry = Self::from_yaml_str(&contents)?;
        tracing::info!(path = %path.display(), patients = registry.len(), "patient registry loaded");
        Ok(registry)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl PatientDirectory for PatientRegistry {
    async fn ehr_id_for(&self, patient_id: &PatientId) -> VitalsResult<Option<EhrId>> {
        Ok(self.entries.get(patient_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const YAML: &str = "\
patients:
  - patient_id: P1
    ehr_id: ehr-1
  - patient_id: P2
    ehr_id: ehr-2
";

    #[tokio::test]
    async fn test_load_from_file_and_resolve() {
        let mut file = tempfile::NamedTempFile::new().expect("create temp file");
        file.write_all(YAML.as_bytes()).expect("write registry");

        let registry = PatientRegistry::load(file.path()).expect("registry should load");
        assert_eq!(registry.len(), 2);

        let ehr = registry
            .ehr_id_for(&PatientId::new("P2").unwrap())
            .await
            .unwrap();
        assert_eq!(ehr.map(|e| e.to_string()), Some("ehr-2".to_string()));

        let missing = registry
            .ehr_id_for(&PatientId::new("P9").unwrap())
            .await
            .unwrap();
        assert_eq!(missing, None);
    }

    #[test]
    fn test_missing_file_is_a_read_error() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let err = PatientRegistry::load(&dir.path().join("absent.yaml"))
            .expect_err("absent file should fail");
        assert!(matches!(err, VitalsError::RegistryRead { .. }));
    }

    #[test]
    fn test_duplicate_patient_is_rejected() {
        let yaml = "patients:\n  - {patient_id: P1, ehr_id: a}\n  - {patient_id: P1, ehr_id: b}\n";
        let err = PatientRegistry::from_yaml_str(yaml).expect_err("duplicate");
        assert!(matches!(err, VitalsError::Registry(msg) if msg.contains("P1")));
    }

    #[test]
    fn test_blank_ids_report_their_path() {
        let yaml = "patients:\n  - {patient_id: P1, ehr_id: ' '}\n";
        let err = PatientRegistry::from_yaml_str(yaml).expect_err("blank ehr id");
        assert!(matches!(err, VitalsError::Registry(msg) if msg.contains("patients[0].ehr_id")));
    }

    #[test]
    fn test_empty_document_is_an_empty_registry() {
        let registry = PatientRegistry::from_yaml_str("patients: []\n").unwrap();
        assert!(registry.is_empty());
    }
}
