//! # Vitals Core
//!
//! Core business logic for recording and reading vital signs against an openEHR clinical-data
//! server.
//!
//! This crate contains the orchestration around the pure `openehr` mapping layer:
//! - [`config`]: startup configuration and its parse helpers
//! - [`gateway`]: the External Store Gateway trait and the EHRbase HTTP client
//! - [`patients`]: patient → EHR resolution
//! - [`validation`]: clinical range and temporal checks
//! - [`service`]: [`VitalSignsService`], the operations exposed to the API layer
//!
//! **No API concerns**: HTTP routing, OpenAPI documentation and CLI handling belong in
//! `api-rest` and `vitals-cli`.

pub mod config;
pub mod constants;
pub mod error;
pub mod gateway;
pub mod models;
pub mod patients;
pub mod service;
pub mod validation;

pub use config::CoreConfig;
pub use error::{VitalsError, VitalsResult};
pub use gateway::{ClinicalDataStore, CompositionFormat, EhrBaseClient, StoreError, StoreResult};
pub use patients::{PatientDirectory, PatientRegistry};
pub use service::{is_placeholder_uid, RecordedVitalSigns, VitalSignsService, WriteOutcome};
