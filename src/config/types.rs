use serde::Deserialize;

use crate::cache::credential::{AppId, Credential};
use crate::config::settings::SettingsConfig;

/// ================================
/// Full service configuration
/// ================================
#[derive(Debug, Deserialize, Clone)]
pub struct ServiceConfig {
    #[serde(default)]
    pub settings: SettingsConfig,
    pub credential: CredentialConfig,
}

/// ================================
/// Credential
/// ================================
/// Either `path` to a persisted credential file, or inline key material.
/// Inline key material together with `path` seeds a new file there.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct CredentialConfig {
    pub path: Option<String>,
    pub app_id: Option<AppId>,
    pub api_key: Option<String>,
    pub secret_key: Option<String>,
    #[serde(default)]
    pub scope: Vec<String>,
}

impl CredentialConfig {
    pub fn has_key_material(&self) -> bool {
        self.api_key.is_some() || self.secret_key.is_some()
    }

    /// Build the inline credential, if one is configured.
    pub fn inline(&self) -> Option<crate::error::Result<Credential>> {
        if !self.has_key_material() {
            return None;
        }
        Some(Credential::with_scope(
            self.app_id.clone().unwrap_or(AppId::Numeric(0)),
            self.api_key.clone().unwrap_or_default(),
            self.secret_key.clone().unwrap_or_default(),
            self.scope.clone(),
        ))
    }
}
