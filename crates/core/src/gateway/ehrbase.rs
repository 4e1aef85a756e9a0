//! # EHRbase HTTP client
//!
//! [`ClinicalDataStore`] over the openEHR REST API as served by EHRbase.

use async_trait::async_trait;
use openehr::{AqlQuery, FlatComposition, QueryResult};
use reqwest::header::{ACCEPT, ETAG};
use reqwest::{Method, StatusCode, Url};
use serde_json::Value;
use vitals_types::{CompositionUid, EhrId, TemplateId};

use super::{ClinicalDataStore, CompositionFormat, StoreError, StoreResult};
use crate::config::{CoreConfig, EhrBaseCredentials};
use crate::models::TemplateInfo;
use crate::{VitalsError, VitalsResult};

const OPENEHR_API: &str = "openehr/v1";

/// HTTP client for one EHRbase instance.
#[derive(Clone)]
pub struct EhrBaseClient {
    http: reqwest::Client,
    base_url: Url,
    credentials: Option<EhrBaseCredentials>,
}

impl EhrBaseClient {
    /// Builds a client from the resolved configuration.
    ///
    /// The configured timeout applies to every request.
    pub fn new(config: &CoreConfig) -> VitalsResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.ehrbase_timeout())
            .build()
            .map_err(|e| VitalsError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url: config.ehrbase_url().clone(),
            credentials: config.ehrbase_credentials().cloned(),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Base URL extended with `openehr/v1` and `segments`, each percent-encoded.
    fn endpoint(&self, segments: &[&str]) -> StoreResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| StoreError::Unavailable(format!("{} cannot be a base URL", self.base_url)))?
            .pop_if_empty()
            .extend(OPENEHR_API.split('/'))
            .extend(segments);
        Ok(url)
    }

    /// Build a request with optional basic auth.
    fn request(&self, method: Method, url: Url) -> reqwest::RequestBuilder {
        let mut req = self.http.request(method, url).header(ACCEPT, "application/json");
        if let Some(creds) = &self.credentials {
            req = req.basic_auth(&creds.username, Some(&creds.password));
        }
        req
    }

    /// Send a request and map transport errors.
    async fn send(&self, req: reqwest::RequestBuilder) -> StoreResult<reqwest::Response> {
        req.send().await.map_err(|e| {
            tracing::warn!(base_url = %self.base_url, error = %e, "EHRbase request failed");
            StoreError::Unavailable(format!("{}: {e}", self.base_url))
        })
    }

    /// Turns non-success statuses into [`StoreError`]s.
    async fn check_status(resp: reqwest::Response) -> StoreResult<reqwest::Response> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let body = resp.text().await.unwrap_or_default();
        Err(status_error(status, body))
    }

    async fn read_json(resp: reqwest::Response) -> StoreResult<Value> {
        resp.json::<Value>()
            .await
            .map_err(|e| StoreError::InvalidResponse(e.to_string()))
    }
}

fn status_error(status: StatusCode, body: String) -> StoreError {
    if status == StatusCode::NOT_FOUND {
        StoreError::NotFound
    } else if status.is_server_error() {
        StoreError::Unavailable(format!("server error ({status}): {body}"))
    } else {
        StoreError::Rejected {
            status: status.as_u16(),
            body,
        }
    }
}

/// Finds the uid of a newly created composition.
///
/// Looks at `uid.value` (canonical JSON), then any `…/_uid` key (FLAT), then the `ETag` header.
fn extract_composition_uid(body: Option<&Value>, etag: Option<&str>) -> Option<String> {
    let from_body = body.and_then(|body| {
        body.pointer("/uid/value")
            .and_then(Value::as_str)
            .or_else(|| {
                body.as_object()?
                    .iter()
                    .find(|(k, _)| k.ends_with("/_uid"))
                    .and_then(|(_, v)| v.as_str())
            })
    });

    from_body
        .or_else(|| etag.map(|e| e.trim().trim_start_matches("W/").trim_matches('"')))
        .map(str::trim)
        .filter(|uid| !uid.is_empty())
        .map(str::to_string)
}

#[async_trait]
impl ClinicalDataStore for EhrBaseClient {
    async fn create_composition(
        &self,
        ehr_id: &EhrId,
        template_id: &TemplateId,
        composition: &FlatComposition,
    ) -> StoreResult<CompositionUid> {
        let url = self.endpoint(&["ehr", ehr_id.as_str(), "composition"])?;
        let req = self
            .request(Method::POST, url)
            .header("Prefer", "return=representation")
            .query(&[
                ("templateId", template_id.as_str()),
                ("format", CompositionFormat::Flat.as_str()),
            ])
            .json(composition);

        let resp = Self::check_status(self.send(req).await?).await?;
        let etag = resp
            .headers()
            .get(ETAG)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let text = resp
            .text()
            .await
            .map_err(|e| StoreError::InvalidResponse(e.to_string()))?;
        let body = serde_json::from_str::<Value>(&text).ok();

        let uid = extract_composition_uid(body.as_ref(), etag.as_deref()).ok_or_else(|| {
            StoreError::InvalidResponse("composition uid missing from create response".into())
        })?;

        tracing::info!(ehr_id = %ehr_id, composition_uid = %uid, "composition created");
        CompositionUid::new(uid).map_err(|e| StoreError::InvalidResponse(e.to_string()))
    }

    async fn get_composition(
        &self,
        ehr_id: &EhrId,
        composition_uid: &CompositionUid,
        format: CompositionFormat,
    ) -> StoreResult<Value> {
        let url = self.endpoint(&["ehr", ehr_id.as_str(), "composition", composition_uid.as_str()])?;
        let req = self
            .request(Method::GET, url)
            .query(&[("format", format.as_str())]);
        let resp = Self::check_status(self.send(req).await?).await?;
        Self::read_json(resp).await
    }

    async fn delete_composition(
        &self,
        ehr_id: &EhrId,
        composition_uid: &CompositionUid,
    ) -> StoreResult<bool> {
        let url = self.endpoint(&["ehr", ehr_id.as_str(), "composition", composition_uid.as_str()])?;
        let resp = self.send(self.request(Method::DELETE, url)).await?;
        match Self::check_status(resp).await {
            Ok(_) => Ok(true),
            Err(StoreError::NotFound) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn execute_query(&self, query: &AqlQuery) -> StoreResult<QueryResult> {
        let url = self.endpoint(&["query", "aql"])?;
        let req = self.request(Method::POST, url).json(query);
        let resp = Self::check_status(self.send(req).await?).await?;
        let body = Self::read_json(resp).await?;
        QueryResult::from_value(body).map_err(|e| StoreError::InvalidResponse(e.to_string()))
    }

    async fn list_templates(&self) -> StoreResult<Vec<TemplateInfo>> {
        let url = self.endpoint(&["definition", "template", "adl1.4"])?;
        let resp = Self::check_status(self.send(self.request(Method::GET, url)).await?).await?;
        let body = Self::read_json(resp).await?;
        serde_path_to_error::deserialize(body)
            .map_err(|e| StoreError::InvalidResponse(e.to_string()))
    }

    async fn template_example(
        &self,
        template_id: &TemplateId,
        format: CompositionFormat,
    ) -> StoreResult<Value> {
        let url = self.endpoint(&["definition", "template", "adl1.4", template_id.as_str(), "example"])?;
        let req = self
            .request(Method::GET, url)
            .query(&[("format", format.as_str())]);
        let resp = Self::check_status(self.send(req).await?).await?;
        Self::read_json(resp).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ehrbase_url_from_env_value, template_id_from_env_value};
    use serde_json::json;
    use std::path::PathBuf;
    use std::time::Duration;

    fn client(url: &str) -> EhrBaseClient {
        let config = CoreConfig::new(
            ehrbase_url_from_env_value(Some(url.into())).unwrap(),
            None,
            Duration::from_secs(2),
            template_id_from_env_value(None).unwrap(),
            "en".into(),
            "GB".into(),
            PathBuf::from("patients.yaml"),
        )
        .unwrap();
        EhrBaseClient::new(&config).expect("client should build")
    }

    #[test]
    fn test_endpoint_appends_encoded_segments() {
        let c = client("http://localhost:8080/ehrbase/rest");
        let url = c
            .endpoint(&["ehr", "e1", "composition", "abc::local::1"])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:8080/ehrbase/rest/openehr/v1/ehr/e1/composition/abc::local::1"
        );

        let hostile = c.endpoint(&["ehr", "../admin"]).unwrap();
        assert!(hostile.path().ends_with("/ehr/..%2Fadmin"));
    }

    #[test]
    fn test_endpoint_with_bare_host() {
        let c = client("http://ehrbase:8080");
        assert_eq!(
            c.endpoint(&["query", "aql"]).unwrap().as_str(),
            "http://ehrbase:8080/openehr/v1/query/aql"
        );
    }

    #[test]
    fn test_status_classification() {
        assert_eq!(status_error(StatusCode::NOT_FOUND, String::new()), StoreError::NotFound);
        assert!(matches!(
            status_error(StatusCode::BAD_GATEWAY, "down".into()),
            StoreError::Unavailable(_)
        ));
        assert_eq!(
            status_error(StatusCode::UNPROCESSABLE_ENTITY, "bad path".into()),
            StoreError::Rejected {
                status: 422,
                body: "bad path".into()
            }
        );
    }

    #[test]
    fn test_extract_uid_prefers_canonical_body() {
        let body = json!({"uid": {"value": "c1::local::1"}, "vital_signs/_uid": "other"});
        assert_eq!(
            extract_composition_uid(Some(&body), Some("\"etag\"")).as_deref(),
            Some("c1::local::1")
        );
    }

    #[test]
    fn test_extract_uid_from_flat_body_and_etag() {
        let flat = json!({"vital_signs/_uid": "c2::local::1", "ctx/language": "en"});
        assert_eq!(extract_composition_uid(Some(&flat), None).as_deref(), Some("c2::local::1"));
        assert_eq!(
            extract_composition_uid(None, Some("W/\"c3::local::1\"")).as_deref(),
            Some("c3::local::1")
        );
        assert_eq!(extract_composition_uid(Some(&json!({})), None), None);
        assert_eq!(extract_composition_uid(None, Some("\"\"")), None);
    }

    #[tokio::test]
    async fn test_unreachable_server_is_unavailable() {
        // Port 9 (discard) is not expected to be listening locally.
        let c = client("http://127.0.0.1:9");
        let err = c
            .list_templates()
            .await
            .expect_err("request to closed port should fail");
        assert!(matches!(err, StoreError::Unavailable(_)));
    }
}
