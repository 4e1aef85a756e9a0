//! Vital-signs orchestration.
//!
//! [`VitalSignsService`] ties the pure mapping layer to its two collaborators: the patient
//! directory and the clinical-data store. Both are injected at construction time.
//!
//! Store failures are absorbed according to the operation:
//! - writes degrade to a locally generated `pending::` uid ([`WriteOutcome::Degraded`]);
//! - list queries degrade to an empty page;
//! - single reads and deletes report the record as absent;
//! - template endpoints propagate the failure.

use chrono::{DateTime, Utc};
use openehr::flat::read_flat_composition;
use openehr::{
    reconstruct_at, select_vital_signs_query, FlatCompositionBuilder, OpenEhrMetadata,
    VitalSignsRecord,
};
use serde_json::Value;
use std::sync::Arc;
use uuid::Uuid;
use vitals_types::{CompositionUid, EhrId, PatientId, TemplateId};

use crate::config::CoreConfig;
use crate::constants::PLACEHOLDER_UID_PREFIX;
use crate::gateway::{ClinicalDataStore, CompositionFormat, StoreError};
use crate::models::{
    CompositionPath, CompositionPathsResponse, RawCompositionResponse, TemplateExampleResponse,
    TemplateListResponse, VitalSignsCreate, VitalSignsListResponse, VitalSignsResponse,
};
use crate::patients::PatientDirectory;
use crate::validation::validate_vital_signs;
use crate::{VitalsError, VitalsResult};

/// How a write ended.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WriteOutcome {
    /// The store accepted the composition and assigned this uid.
    Stored(CompositionUid),
    /// The store was unavailable or refused the composition; nothing was persisted.
    Degraded {
        placeholder: CompositionUid,
        reason: String,
    },
}

impl WriteOutcome {
    pub fn composition_uid(&self) -> &CompositionUid {
        match self {
            Self::Stored(uid) => uid,
            Self::Degraded { placeholder, .. } => placeholder,
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, Self::Degraded { .. })
    }
}

/// A recorded reading and how its write ended.
#[derive(Clone, Debug, PartialEq)]
pub struct RecordedVitalSigns {
    pub outcome: WriteOutcome,
    pub response: VitalSignsResponse,
}

/// True when `uid` was generated locally after a failed write.
pub fn is_placeholder_uid(uid: &str) -> bool {
    uid.starts_with(PLACEHOLDER_UID_PREFIX)
}

fn placeholder_uid() -> VitalsResult<CompositionUid> {
    Ok(CompositionUid::new(format!(
        "{PLACEHOLDER_UID_PREFIX}{}",
        Uuid::new_v4()
    ))?)
}

#[derive(Clone)]
pub struct VitalSignsService {
    config: Arc<CoreConfig>,
    store: Arc<dyn ClinicalDataStore>,
    patients: Arc<dyn PatientDirectory>,
    builder: FlatCompositionBuilder,
}

impl VitalSignsService {
    pub fn new(
        config: Arc<CoreConfig>,
        store: Arc<dyn ClinicalDataStore>,
        patients: Arc<dyn PatientDirectory>,
    ) -> Self {
        let builder = FlatCompositionBuilder::new(config.language(), config.territory());
        Self {
            config,
            store,
            patients,
            builder,
        }
    }

    pub fn template_id(&self) -> &TemplateId {
        self.config.template_id()
    }

    async fn resolve_ehr(&self, patient_id: &PatientId) -> VitalsResult<EhrId> {
        self.patients
            .ehr_id_for(patient_id)
            .await?
            .ok_or_else(|| VitalsError::PatientNotFound(patient_id.clone()))
    }

    fn metadata(&self, uid: &str, ehr_id: &EhrId, record: &VitalSignsRecord) -> OpenEhrMetadata {
        OpenEhrMetadata::build(uid, ehr_id, self.template_id().as_str(), record)
    }

    /// Records one set of vital signs.
    ///
    /// Validation and patient lookup failures are returned before the store is called. A store
    /// failure after that point is not an error: the reading comes back under a placeholder uid.
    pub async fn record(&self, request: VitalSignsCreate) -> VitalsResult<RecordedVitalSigns> {
        self.record_at(request, Utc::now()).await
    }

    /// [`Self::record`] against an explicit service clock.
    pub async fn record_at(
        &self,
        request: VitalSignsCreate,
        now: DateTime<Utc>,
    ) -> VitalsResult<RecordedVitalSigns> {
        let record = validate_vital_signs(&request, now)?;
        let ehr_id = self.resolve_ehr(record.patient_id()).await?;
        let composition = self.builder.build(&record);

        let outcome = match self
            .store
            .create_composition(&ehr_id, self.template_id(), &composition)
            .await
        {
            Ok(uid) => WriteOutcome::Stored(uid),
            Err(e) => {
                let placeholder = placeholder_uid()?;
                tracing::warn!(
                    patient_id = %record.patient_id(),
                    ehr_id = %ehr_id,
                    placeholder = %placeholder,
                    error = %e,
                    "composition write failed, returning placeholder uid"
                );
                WriteOutcome::Degraded {
                    placeholder,
                    reason: e.to_string(),
                }
            }
        };

        let uid = outcome.composition_uid().as_str();
        let metadata = self.metadata(uid, &ehr_id, &record);
        let response = VitalSignsResponse::from_record(uid, &record, now, metadata);

        Ok(RecordedVitalSigns { outcome, response })
    }

    /// Lists a patient's readings, newest first, optionally within a recording-time window.
    ///
    /// The window applies only when both bounds are given. A store failure yields an empty page.
    pub async fn list(
        &self,
        patient_id: &PatientId,
        from_date: Option<DateTime<Utc>>,
        to_date: Option<DateTime<Utc>>,
        skip: usize,
        limit: usize,
    ) -> VitalsResult<VitalSignsListResponse> {
        let ehr_id = self.resolve_ehr(patient_id).await?;
        let query = select_vital_signs_query(&ehr_id, from_date, to_date);

        let result = match self.store.execute_query(&query).await {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!(
                    patient_id = %patient_id,
                    ehr_id = %ehr_id,
                    error = %e,
                    "vital signs query failed, returning empty list"
                );
                return Ok(VitalSignsListResponse::default());
            }
        };

        let page = reconstruct_at(&result, patient_id, skip, limit, Utc::now());
        let items = page
            .items
            .into_iter()
            .map(|stored| {
                let uid = stored
                    .composition_uid
                    .as_ref()
                    .map(CompositionUid::as_str)
                    .unwrap_or_default();
                let metadata = self.metadata(uid, &ehr_id, &stored.record);
                let created_at = stored.record.recorded_at();
                VitalSignsResponse::from_record(uid, &stored.record, created_at, metadata)
            })
            .collect();

        Ok(VitalSignsListResponse {
            items,
            total: page.total,
        })
    }

    async fn fetch_composition(
        &self,
        ehr_id: &EhrId,
        composition_uid: &CompositionUid,
        format: CompositionFormat,
    ) -> Option<Value> {
        match self
            .store
            .get_composition(ehr_id, composition_uid, format)
            .await
        {
            Ok(value) => Some(value),
            Err(StoreError::NotFound) => None,
            Err(e) => {
                tracing::warn!(
                    composition_uid = %composition_uid,
                    error = %e,
                    "composition fetch failed, reporting as absent"
                );
                None
            }
        }
    }

    /// Reads one reading back from its FLAT composition.
    pub async fn get(
        &self,
        composition_uid: &CompositionUid,
        patient_id: &PatientId,
    ) -> VitalsResult<Option<VitalSignsResponse>> {
        let ehr_id = self.resolve_ehr(patient_id).await?;
        let Some(value) = self
            .fetch_composition(&ehr_id, composition_uid, CompositionFormat::Flat)
            .await
        else {
            return Ok(None);
        };

        let Value::Object(flat) = value else {
            tracing::warn!(composition_uid = %composition_uid, "FLAT composition is not an object");
            return Ok(None);
        };

        let record = read_flat_composition(&flat, patient_id.clone(), Utc::now());
        let metadata = self.metadata(composition_uid.as_str(), &ehr_id, &record);
        Ok(Some(VitalSignsResponse::from_record(
            composition_uid.as_str(),
            &record,
            record.recorded_at(),
            metadata,
        )))
    }

    /// Deletes one reading. `false` when it was absent or the store failed.
    pub async fn delete(
        &self,
        composition_uid: &CompositionUid,
        patient_id: &PatientId,
    ) -> VitalsResult<bool> {
        let ehr_id = self.resolve_ehr(patient_id).await?;
        match self.store.delete_composition(&ehr_id, composition_uid).await {
            Ok(deleted) => {
                tracing::info!(composition_uid = %composition_uid, deleted, "composition delete");
                Ok(deleted)
            }
            Err(e) => {
                tracing::warn!(composition_uid = %composition_uid, error = %e, "composition delete failed");
                Ok(false)
            }
        }
    }

    /// The stored composition in `format`, unchanged.
    pub async fn raw_composition(
        &self,
        composition_uid: &CompositionUid,
        patient_id: &PatientId,
        format: CompositionFormat,
    ) -> VitalsResult<Option<RawCompositionResponse>> {
        let ehr_id = self.resolve_ehr(patient_id).await?;
        Ok(self
            .fetch_composition(&ehr_id, composition_uid, format)
            .await
            .map(|composition| RawCompositionResponse {
                format,
                template_id: self.template_id().to_string(),
                composition,
            }))
    }

    /// Every path of the stored FLAT composition with its value and JSON kind, sorted by path.
    pub async fn composition_paths(
        &self,
        composition_uid: &CompositionUid,
        patient_id: &PatientId,
    ) -> VitalsResult<Option<CompositionPathsResponse>> {
        let Some(raw) = self
            .raw_composition(composition_uid, patient_id, CompositionFormat::Flat)
            .await?
        else {
            return Ok(None);
        };

        let mut paths: Vec<CompositionPath> = match raw.composition {
            Value::Object(map) => map
                .into_iter()
                .map(|(path, value)| CompositionPath::new(path, value))
                .collect(),
            _ => Vec::new(),
        };
        paths.sort_by(|a, b| a.path.cmp(&b.path));

        Ok(Some(CompositionPathsResponse {
            composition_uid: composition_uid.to_string(),
            template_id: raw.template_id,
            paths,
        }))
    }

    pub async fn list_templates(&self) -> VitalsResult<TemplateListResponse> {
        let templates = self.store.list_templates().await?;
        Ok(TemplateListResponse { templates })
    }

    pub async fn template_example(
        &self,
        template_id: &TemplateId,
    ) -> VitalsResult<TemplateExampleResponse> {
        let example = self
            .store
            .template_example(template_id, CompositionFormat::Flat)
            .await?;
        Ok(TemplateExampleResponse {
            template_id: template_id.to_string(),
            format: CompositionFormat::Flat,
            example,
        })
    }
}
