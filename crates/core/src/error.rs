use vitals_types::{IdError, PatientId};

use crate::gateway::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum VitalsError {
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("invalid identifier: {0}")]
    InvalidId(#[from] IdError),
    #[error("patient not found: {0}")]
    PatientNotFound(PatientId),
    #[error("clinical data store error: {0}")]
    Store(#[from] StoreError),
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("failed to read patient registry {path}: {source}", path = path.display())]
    RegistryRead {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid patient registry: {0}")]
    Registry(String),
}

impl From<openehr::OpenEhrError> for VitalsError {
    fn from(err: openehr::OpenEhrError) -> Self {
        match err {
            openehr::OpenEhrError::InvalidInput(msg) => Self::Validation(msg),
            openehr::OpenEhrError::InvalidId(id) => Self::InvalidId(id),
            other => Self::Validation(other.to_string()),
        }
    }
}

pub type VitalsResult<T> = std::result::Result<T, VitalsError>;
