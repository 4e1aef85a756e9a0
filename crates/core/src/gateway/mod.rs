//! External Store Gateway.
//!
//! [`ClinicalDataStore`] is the only seam through which the service reaches the clinical-data
//! server. The shipped implementation is [`ehrbase::EhrBaseClient`]; tests substitute in-process
//! fakes. Every operation is one request: timeouts belong to the implementation and nothing here
//! retries.

pub mod ehrbase;

use async_trait::async_trait;
use openehr::{AqlQuery, FlatComposition, QueryResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;
use vitals_types::{CompositionUid, EhrId, TemplateId};

use crate::models::TemplateInfo;

pub use ehrbase::EhrBaseClient;

/// Failure of a single call to the clinical-data server.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// Transport failure, timeout or 5xx response.
    #[error("clinical data store unavailable: {0}")]
    Unavailable(String),
    /// The server refused the request (validation or client error).
    #[error("clinical data store rejected the request ({status}): {body}")]
    Rejected { status: u16, body: String },
    #[error("not found in clinical data store")]
    NotFound,
    #[error("invalid response from clinical data store: {0}")]
    InvalidResponse(String),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Serialisation format for composition reads.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum CompositionFormat {
    #[default]
    Flat,
    Structured,
}

impl CompositionFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Flat => "FLAT",
            Self::Structured => "STRUCTURED",
        }
    }
}

impl std::fmt::Display for CompositionFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operations the vital-signs service needs from the clinical-data server.
#[async_trait]
pub trait ClinicalDataStore: Send + Sync {
    /// Submits a FLAT composition and returns the uid the server assigned.
    async fn create_composition(
        &self,
        ehr_id: &EhrId,
        template_id: &TemplateId,
        composition: &FlatComposition,
    ) -> StoreResult<CompositionUid>;

    /// Fetches one composition. Fails with [`StoreError::NotFound`] when absent.
    async fn get_composition(
        &self,
        ehr_id: &EhrId,
        composition_uid: &CompositionUid,
        format: CompositionFormat,
    ) -> StoreResult<Value>;

    /// Deletes one composition. `Ok(false)` when the server reports it absent.
    async fn delete_composition(
        &self,
        ehr_id: &EhrId,
        composition_uid: &CompositionUid,
    ) -> StoreResult<bool>;

    async fn execute_query(&self, query: &AqlQuery) -> StoreResult<QueryResult>;

    async fn list_templates(&self) -> StoreResult<Vec<TemplateInfo>>;

    /// Example composition for a template, in the requested format.
    async fn template_example(
        &self,
        template_id: &TemplateId,
        format: CompositionFormat,
    ) -> StoreResult<Value>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_composition_format_wire_names() {
        assert_eq!(serde_json::to_value(CompositionFormat::Flat).unwrap(), "FLAT");
        let parsed: CompositionFormat = serde_json::from_str("\"STRUCTURED\"").unwrap();
        assert_eq!(parsed, CompositionFormat::Structured);
        assert_eq!(CompositionFormat::default().to_string(), "FLAT");
    }
}
