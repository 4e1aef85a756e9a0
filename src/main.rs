use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api_rest::AppState;
use vitals_core::config::{
    credentials_from_env_values, ehrbase_url_from_env_value, patient_registry_from_env_value,
    rest_addr_from_env_value, template_id_from_env_value, text_from_env_value,
    timeout_from_env_value,
};
use vitals_core::{CoreConfig, EhrBaseClient, PatientRegistry, VitalSignsService};

/// Main entry point for the vital signs service
///
/// Resolves configuration once, wires the EHRbase gateway and the patient registry into the
/// service, and serves the REST API.
///
/// # Environment Variables
/// - `VITALS_REST_ADDR`: REST server address (default: "0.0.0.0:8000")
/// - `EHRBASE_URL`: EHRbase REST base URL (default: "http://localhost:8080/ehrbase/rest")
/// - `EHRBASE_USER` / `EHRBASE_PASSWORD`: basic auth, used only when both are set
/// - `EHRBASE_TIMEOUT_SECS`: per-request timeout (default: 30)
/// - `VITALS_TEMPLATE_ID`: operational template (default: "open-cis.vital-signs.v1")
/// - `VITALS_LANGUAGE` / `VITALS_TERRITORY`: composition context (default: "en" / "GB")
/// - `VITALS_PATIENT_REGISTRY`: YAML patient registry (default: "patients.yaml")
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("vitals_run=info".parse()?)
                .add_directive("vitals_core=info".parse()?)
                .add_directive("api_rest=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let env = |key: &str| std::env::var(key).ok();

    let rest_addr = rest_addr_from_env_value(env("VITALS_REST_ADDR"))?;
    let cfg = Arc::new(CoreConfig::new(
        ehrbase_url_from_env_value(env("EHRBASE_URL"))?,
        credentials_from_env_values(env("EHRBASE_USER"), env("EHRBASE_PASSWORD")),
        timeout_from_env_value(env("EHRBASE_TIMEOUT_SECS"))?,
        template_id_from_env_value(env("VITALS_TEMPLATE_ID"))?,
        text_from_env_value(env("VITALS_LANGUAGE"), openehr::flat::DEFAULT_LANGUAGE),
        text_from_env_value(env("VITALS_TERRITORY"), openehr::flat::DEFAULT_TERRITORY),
        patient_registry_from_env_value(env("VITALS_PATIENT_REGISTRY")),
    )?);

    let registry_path = cfg.patient_registry();
    let patients = if registry_path.exists() {
        PatientRegistry::load(registry_path)?
    } else {
        tracing::warn!(
            path = %registry_path.display(),
            "patient registry not found, every patient lookup will fail"
        );
        PatientRegistry::default()
    };

    let store = EhrBaseClient::new(&cfg)?;
    tracing::info!(
        ehrbase_url = %cfg.ehrbase_url(),
        template_id = %cfg.template_id(),
        authenticated = cfg.ehrbase_credentials().is_some(),
        "++ EHRbase gateway configured"
    );

    let service = VitalSignsService::new(cfg.clone(), Arc::new(store), Arc::new(patients));
    let app = api_rest::router(AppState::new(Arc::new(service)));

    tracing::info!("++ Starting vital signs REST on {}", rest_addr);
    let listener = tokio::net::TcpListener::bind(rest_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
