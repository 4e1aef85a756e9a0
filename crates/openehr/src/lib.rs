//! openEHR mapping layer for vital-signs observations.
//!
//! This crate translates between the narrow application record ([`VitalSignsRecord`]) and the
//! archetype-based openEHR representation held by the external clinical-data server:
//!
//! - [`paths`]: the static concept → archetype → path table every other module reads from.
//! - [`flat`]: FLAT composition construction for writes, and the reverse read for single fetches.
//! - [`aql`]: selection and parametrisation of the predefined AQL templates.
//! - [`result_set`]: reassembly of tabular AQL results into typed records.
//! - [`transparency`]: the field → archetype-path audit trail attached to every response.
//! - [`archetype_info`]: reference information (CKM links) for the archetypes used here.
//!
//! Everything in this crate is synchronous and free of I/O. Network access belongs to the gateway
//! in `vitals-core`.

pub mod aql;
pub mod archetype_info;
pub mod data_types;
pub mod flat;
pub mod paths;
pub mod public_structs;
pub mod result_set;
pub mod transparency;
mod values;

pub use aql::{select_vital_signs_query, AqlQuery};
pub use archetype_info::ArchetypeInfo;
pub use data_types::ArchetypeId;
pub use flat::{FlatComposition, FlatCompositionBuilder};
pub use public_structs::{BloodPressure, VitalSignsRecord};
pub use result_set::{
    reconstruct, reconstruct_at, ColumnDescriptor, QueryResult, ReconstructedPage, StoredVitalSigns,
};
pub use transparency::{OpenEhrMetadata, PathMappingEntry};
pub use values::parse_timestamp;

use thiserror::Error;

/// Errors returned by the `openehr` mapping crate.
#[derive(Debug, Error)]
pub enum OpenEhrError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("invalid archetype id: {0}")]
    InvalidArchetypeId(String),

    #[error("invalid query result: {0}")]
    InvalidQueryResult(String),

    #[error("invalid identifier: {0}")]
    InvalidId(#[from] vitals_types::IdError),
}

pub type OpenEhrResult<T> = std::result::Result<T, OpenEhrError>;
