use std::path::{Path, PathBuf};

use anyhow::Context;
use serde_json::{Map, Value};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::api::codec::{decode_token, token_error_message};
use crate::cache::credential::Credential;
use crate::cache::persist::CredentialFile;
use crate::cache::token::AccessToken;
use crate::config::settings::TokenEndpointConfig;
use crate::error::{Error, Result};
use crate::helpers::time::get_instant;
use crate::observability::metrics::{get_metrics, OUTCOME_ERROR, OUTCOME_SUCCESS};
use crate::transport::{encode_form, Transport, TransportRequest};

#[derive(Debug, Clone)]
struct PersistTarget {
    path: PathBuf,
    attrs: Map<String, Value>,
}

/// Holds the single live token of one credential.
///
/// Every read that may refresh, every refresh and the credential file write
/// that follows it run under one lock, so concurrent callers that find the
/// token stale queue behind the first exchange and reuse its result.
#[derive(Debug)]
pub struct TokenCache<T> {
    credential: Credential,
    settings: TokenEndpointConfig,
    transport: T,
    persist: Option<PersistTarget>,
    token: Mutex<Option<AccessToken>>,
}

impl<T: Transport> TokenCache<T> {
    pub fn new(credential: Credential, settings: TokenEndpointConfig, transport: T) -> Self {
        Self {
            credential,
            settings,
            transport,
            persist: None,
            token: Mutex::new(None),
        }
    }

    /// Write credential and token to `path` after every exchange.
    pub fn with_persist_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.persist = Some(PersistTarget {
            path: path.into(),
            attrs: Map::new(),
        });
        self
    }

    pub fn with_token(mut self, token: AccessToken) -> Self {
        self.token = Mutex::new(Some(token));
        self
    }

    /// Restore credential and last token from a credential file. The file is
    /// rewritten in place on every later exchange.
    pub async fn from_file(
        path: impl AsRef<Path>,
        settings: TokenEndpointConfig,
        transport: T,
    ) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let file = CredentialFile::load(path).await?;
        let credential = file
            .credential()
            .with_context(|| format!("credential file '{}' is not usable", path.display()))?;
        info!(
            "credential app_id '{}' loaded from '{}', cached token: {}",
            credential.app_id(),
            path.display(),
            file.token.is_some()
        );
        Ok(Self {
            credential,
            settings,
            transport,
            persist: Some(PersistTarget {
                path: path.to_path_buf(),
                attrs: file.attrs,
            }),
            token: Mutex::new(file.token),
        })
    }

    pub fn credential(&self) -> &Credential {
        &self.credential
    }

    pub fn settings(&self) -> &TokenEndpointConfig {
        &self.settings
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn persist_path(&self) -> Option<&Path> {
        self.persist.as_ref().map(|target| target.path.as_path())
    }

    /// Cached token as is, fresh or not.
    pub async fn current(&self) -> Option<AccessToken> {
        self.token.lock().await.clone()
    }

    /// Cached token if still fresh, otherwise a new one from the token endpoint.
    pub async fn get_token(&self) -> Result<AccessToken> {
        let mut slot = self.token.lock().await;
        if let Some(token) = slot
            .as_ref()
            .filter(|token| token.is_fresh(self.settings.safety_margin_seconds))
        {
            debug!("cached access_token is fresh, expires at {}", token.expires_at_unix_ts());
            return Ok(token.clone());
        }
        info!("access_token for app_id '{}' is absent or stale", self.credential.app_id());
        self.exchange(&mut slot).await
    }

    /// Drop the cached token and exchange a new one regardless of freshness.
    pub async fn force_refresh(&self) -> Result<AccessToken> {
        let mut slot = self.token.lock().await;
        slot.take();
        info!("force refresh access_token for app_id '{}'", self.credential.app_id());
        self.exchange(&mut slot).await
    }

    /// Drop the cached token. The next `get_token` exchanges a new one.
    pub async fn invalidate(&self) {
        let mut slot = self.token.lock().await;
        if slot.take().is_some() {
            get_metrics().await.token_invalidations.inc();
        }
        info!("access_token for app_id '{}' invalidated", self.credential.app_id());
        if let Err(err) = self.persist(None).await {
            warn!("persist cleared credential failed: {}", err);
        }
    }

    async fn exchange(&self, slot: &mut Option<AccessToken>) -> Result<AccessToken> {
        let metrics = get_metrics().await;
        let start = get_instant();

        let token = match self.request_token().await {
            Ok(token) => {
                metrics.token_exchanges.with_label_values(&[OUTCOME_SUCCESS]).inc();
                metrics.token_exchange_duration.with_label_values(&[OUTCOME_SUCCESS]).observe(start.elapsed().as_secs_f64());
                token
            }
            Err(err) => {
                metrics.token_exchanges.with_label_values(&[OUTCOME_ERROR]).inc();
                metrics.token_exchange_duration.with_label_values(&[OUTCOME_ERROR]).observe(start.elapsed().as_secs_f64());
                warn!("get access_token failed: {}", err);
                return Err(err);
            }
        };

        info!(
            "access_token for app_id '{}' obtained, expires_in {}s",
            self.credential.app_id(),
            token.expires_in
        );
        *slot = Some(token.clone());
        metrics.token_expiry_unix.set(token.expires_at_unix_ts());

        if let Err(source) = self.persist(Some(&token)).await {
            metrics.persist_failures.inc();
            let path = self.persist_path().map(Path::to_path_buf).unwrap_or_default();
            warn!("persist credential to '{}' failed: {}", path.display(), source);
            return Err(Error::Persistence {
                path,
                source,
                token: Box::new(token),
            });
        }
        Ok(token)
    }

    async fn request_token(&self) -> Result<AccessToken> {
        self.credential.validate()?;

        let url = self.settings.url.as_str();
        let fields = self.credential.token_request_form();
        let form = encode_form(fields.iter().map(|(key, value)| (*key, value.as_str())));
        debug!(
            "get access_token, server_url: {}, client_id: {}, scope: '{}'",
            url,
            self.credential.api_key(),
            self.credential.scope().join(",")
        );

        let response = self
            .transport
            .send(TransportRequest::form_post(url, form))
            .await
            .map_err(|err| Error::Transport {
                url: url.to_owned(),
                source: err.into(),
            })?;
        // body carries the token itself
        debug!("token endpoint status: {}, {} bytes", response.status, response.body.len());

        if !response.status.is_success() {
            return Err(Error::TokenEndpoint {
                url: url.to_owned(),
                status: response.status,
                message: token_error_message(&response.body),
            });
        }
        decode_token(&response.body)
    }

    async fn persist(&self, token: Option<&AccessToken>) -> std::io::Result<()> {
        let Some(target) = &self.persist else {
            return Ok(());
        };
        CredentialFile::new(&self.credential, token.cloned(), target.attrs.clone())
            .store(&target.path)
            .await
    }
}
