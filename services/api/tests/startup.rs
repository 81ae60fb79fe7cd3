use anyhow::Result;
use api_lib::adapters::{HttpBackendAdapter, InMemorySessionStore};
use api_lib::config::{Config, ConfigError};
use api_lib::error::ApiError;
use api_lib::web::{self, AppState};
use std::collections::HashMap;
use std::sync::Arc;

fn state_with(pairs: &[(&str, &str)]) -> Result<Arc<AppState>> {
    let vars: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    let config = Arc::new(Config::from_lookup(|key| vars.get(key).cloned())?);
    let backend = Arc::new(HttpBackendAdapter::new(
        config.backend_url.clone(),
        config.backend_timeout,
    )?);
    Ok(Arc::new(AppState::new(
        config,
        backend.clone(),
        backend,
        Arc::new(InMemorySessionStore::new()),
    )))
}

#[test]
fn unusable_cors_origin_is_a_config_error() -> Result<()> {
    let state = state_with(&[("CORS_ORIGIN", "http://localhost:3000\n")])?;
    let result = web::router(state);
    assert!(matches!(
        result,
        Err(ApiError::Config(ConfigError::InvalidValue(ref key, _))) if key == "CORS_ORIGIN"
    ));
    if let Err(e) = result {
        assert!(e.to_string().starts_with("Configuration error:"));
    }
    Ok(())
}

#[test]
fn default_configuration_builds_the_router() -> Result<()> {
    assert!(web::router(state_with(&[])?).is_ok());
    Ok(())
}
