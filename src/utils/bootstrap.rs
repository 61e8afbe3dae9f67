use std::path::Path;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use tracing::info;

use crate::api::invoker::ApiInvoker;
use crate::cache::token_cache::TokenCache;
use crate::config::proc_validator::validate_credential_source;
use crate::config::types::ServiceConfig;
use crate::transport::Transport;

/// Token cache for the configured credential.
///
/// An existing credential file wins over inline key material; inline key
/// material with a `path` seeds that file on the first exchange.
pub async fn build_token_cache<T: Transport>(
    service_config: &ServiceConfig,
    transport: T,
) -> Result<TokenCache<T>> {
    let credential_config = &service_config.credential;
    let settings = service_config.settings.token.clone();
    validate_credential_source(credential_config)?;

    if let Some(path) = credential_config.path.as_deref().filter(|p| Path::new(p).exists()) {
        return TokenCache::from_file(path, settings, transport).await;
    }

    let credential = credential_config
        .inline()
        .ok_or_else(|| anyhow!("credential key material is not configured"))?
        .context("inline credential is not usable")?;
    info!("credential app_id '{}' taken from config", credential.app_id());

    let cache = TokenCache::new(credential, settings, transport);
    Ok(match credential_config.path.as_deref() {
        Some(path) => cache.with_persist_path(path),
        None => cache,
    })
}

pub async fn build_invoker<T: Transport>(
    service_config: &ServiceConfig,
    transport: T,
) -> Result<ApiInvoker<T>> {
    let cache = build_token_cache(service_config, transport).await?;
    Ok(ApiInvoker::new(Arc::new(cache), service_config.settings.api.clone()))
}
