//! Core runtime configuration.
//!
//! Configuration is resolved once at process startup and then passed into core services. Nothing
//! in this crate reads process-wide environment variables during request handling; the parse
//! helpers below take the raw `Option<String>` values so that the binary owns the environment and
//! tests never have to touch it.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::Url;
use vitals_types::TemplateId;

use crate::constants::{
    DEFAULT_EHRBASE_TIMEOUT_SECS, DEFAULT_EHRBASE_URL, DEFAULT_PATIENT_REGISTRY, DEFAULT_REST_ADDR,
};
use crate::{VitalsError, VitalsResult};

/// Basic-auth credentials for the clinical-data server.
#[derive(Clone, PartialEq, Eq)]
pub struct EhrBaseCredentials {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for EhrBaseCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EhrBaseCredentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    ehrbase_url: Url,
    ehrbase_credentials: Option<EhrBaseCredentials>,
    ehrbase_timeout: Duration,
    template_id: TemplateId,
    language: String,
    territory: String,
    patient_registry: PathBuf,
}

impl CoreConfig {
    /// Create a new `CoreConfig`.
    pub fn new(
        ehrbase_url: Url,
        ehrbase_credentials: Option<EhrBaseCredentials>,
        ehrbase_timeout: Duration,
        template_id: TemplateId,
        language: String,
        territory: String,
        patient_registry: PathBuf,
    ) -> VitalsResult<Self> {
        if language.trim().is_empty() {
            return Err(VitalsError::Config("language cannot be empty".into()));
        }
        if territory.trim().is_empty() {
            return Err(VitalsError::Config("territory cannot be empty".into()));
        }
        if ehrbase_timeout.is_zero() {
            return Err(VitalsError::Config("EHRbase timeout must be positive".into()));
        }

        Ok(Self {
            ehrbase_url,
            ehrbase_credentials,
            ehrbase_timeout,
            template_id,
            language: language.trim().to_string(),
            territory: territory.trim().to_string(),
            patient_registry,
        })
    }

    pub fn ehrbase_url(&self) -> &Url {
        &self.ehrbase_url
    }

    pub fn ehrbase_credentials(&self) -> Option<&EhrBaseCredentials> {
        self.ehrbase_credentials.as_ref()
    }

    pub fn ehrbase_timeout(&self) -> Duration {
        self.ehrbase_timeout
    }

    pub fn template_id(&self) -> &TemplateId {
        &self.template_id
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn territory(&self) -> &str {
        &self.territory
    }

    pub fn patient_registry(&self) -> &Path {
        &self.patient_registry
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Parse the REST listen address from an optional string value.
pub fn rest_addr_from_env_value(value: Option<String>) -> VitalsResult<SocketAddr> {
    let raw = non_blank(value).unwrap_or_else(|| DEFAULT_REST_ADDR.to_string());
    raw.parse()
        .map_err(|e| VitalsError::Config(format!("invalid REST address '{raw}': {e}")))
}

/// Parse the EHRbase base URL from an optional string value.
///
/// Only `http` and `https` URLs are accepted. A trailing `/` is dropped so that endpoint paths
/// can be appended uniformly.
pub fn ehrbase_url_from_env_value(value: Option<String>) -> VitalsResult<Url> {
    let raw = non_blank(value).unwrap_or_else(|| DEFAULT_EHRBASE_URL.to_string());
    let url = Url::parse(raw.trim_end_matches('/'))
        .map_err(|e| VitalsError::Config(format!("invalid EHRbase URL '{raw}': {e}")))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(VitalsError::Config(format!(
            "EHRbase URL must use http or https, got '{}'",
            url.scheme()
        )));
    }
    if url.cannot_be_a_base() {
        return Err(VitalsError::Config(format!(
            "EHRbase URL '{raw}' cannot be used as a base"
        )));
    }

    Ok(url)
}

/// Basic-auth credentials are used only when both a user and a password are set.
pub fn credentials_from_env_values(
    user: Option<String>,
    password: Option<String>,
) -> Option<EhrBaseCredentials> {
    match (non_blank(user), password.filter(|p| !p.is_empty())) {
        (Some(username), Some(password)) => Some(EhrBaseCredentials { username, password }),
        _ => None,
    }
}

/// Parse the per-call EHRbase timeout, in whole seconds.
pub fn timeout_from_env_value(value: Option<String>) -> VitalsResult<Duration> {
    let Some(raw) = non_blank(value) else {
        return Ok(Duration::from_secs(DEFAULT_EHRBASE_TIMEOUT_SECS));
    };

    match raw.parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
        _ => Err(VitalsError::Config(format!(
            "EHRbase timeout must be a positive number of seconds, got '{raw}'"
        ))),
    }
}

/// Parse the operational template id, falling back to the vital-signs template.
pub fn template_id_from_env_value(value: Option<String>) -> VitalsResult<TemplateId> {
    let raw = non_blank(value).unwrap_or_else(|| openehr::paths::VITAL_SIGNS_TEMPLATE_ID.into());
    Ok(TemplateId::new(raw)?)
}

/// Returns the trimmed value, or `default` when unset or blank.
pub fn text_from_env_value(value: Option<String>, default: &str) -> String {
    non_blank(value).unwrap_or_else(|| default.to_string())
}

/// Parse the patient registry path.
pub fn patient_registry_from_env_value(value: Option<String>) -> PathBuf {
    PathBuf::from(non_blank(value).unwrap_or_else(|| DEFAULT_PATIENT_REGISTRY.to_string()))
}
