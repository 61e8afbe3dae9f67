use anyhow::{anyhow, bail, Result};
use tracing::error;

use crate::config::types::{CredentialConfig, ServiceConfig};

pub fn validate_service_config(service_config: &ServiceConfig) -> Result<()> {
    let mut errors: Vec<String> = Vec::new();

    let settings = &service_config.settings;
    validate_url("settings.token.url", &settings.token.url, &mut errors);
    validate_url("settings.api.url", &settings.api.url, &mut errors);
    if settings.token.safety_margin_seconds < 0 {
        errors.push("settings.token.safety_margin_seconds must not be negative".to_owned());
    }
    if settings.http.timeout_ms == 0 {
        errors.push("settings.http.timeout_ms must be greater than 0".to_owned());
    }
    validate_credential(&service_config.credential, &mut errors);

    if errors.is_empty() {
        return Ok(());
    }
    for err in &errors {
        error!("config validation: {}", err);
    }
    Err(anyhow!("config is not valid: {}", errors.join("; ")))
}

fn validate_url(field: &str, value: &str, errors: &mut Vec<String>) {
    if value.trim().is_empty() {
        errors.push(format!("{} is empty", field));
        return;
    }
    if let Err(err) = url::Url::parse(value) {
        errors.push(format!("{} '{}' is not a valid url: {}", field, value, err));
    }
}

fn validate_credential(credential: &CredentialConfig, errors: &mut Vec<String>) {
    match (credential.path.as_deref(), credential.inline()) {
        (None, None) => {
            errors.push("credential needs a 'path' or 'api_key' with 'secret_key'".to_owned())
        }
        (Some(path), _) if path.trim().is_empty() => errors.push("credential.path is empty".to_owned()),
        (_, Some(Err(err))) => errors.push(format!("credential: {}", err)),
        _ => {}
    }
}

/// Fails when `path` is set and the file does not exist yet while no inline
/// key material could seed it.
pub fn validate_credential_source(credential: &CredentialConfig) -> Result<()> {
    if let Some(path) = credential.path.as_deref() {
        if !std::path::Path::new(path).exists() && !credential.has_key_material() {
            bail!("credential file '{}' does not exist and no inline key material is set", path);
        }
    }
    Ok(())
}
