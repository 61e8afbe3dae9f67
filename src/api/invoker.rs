use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::api::codec::{contains_error_code, decode_response};
use crate::api::request::Request;
use crate::api::response::Response;
use crate::cache::token::AccessToken;
use crate::cache::token_cache::TokenCache;
use crate::config::settings::ApiEndpointConfig;
use crate::error::{Error, Result};
use crate::helpers::time::{get_instant, now_i64};
use crate::observability::metrics::{get_metrics, OUTCOME_ERROR, OUTCOME_REJECTED, OUTCOME_SUCCESS};
use crate::transport::{encode_form, Transport, TransportRequest};

/// First send plus one resend after a rejected token.
pub const MAX_ATTEMPTS: u32 = 2;

/// Calls one api endpoint with the token of a shared `TokenCache`.
#[derive(Debug)]
pub struct ApiInvoker<T> {
    cache: Arc<TokenCache<T>>,
    settings: ApiEndpointConfig,
}

impl<T> Clone for ApiInvoker<T> {
    fn clone(&self) -> Self {
        Self {
            cache: self.cache.clone(),
            settings: self.settings.clone(),
        }
    }
}

impl<T: Transport> ApiInvoker<T> {
    pub fn new(cache: Arc<TokenCache<T>>, settings: ApiEndpointConfig) -> Self {
        Self { cache, settings }
    }

    /// Like `new`, but obtains a token up front so a broken credential fails here.
    pub async fn connect(cache: Arc<TokenCache<T>>, settings: ApiEndpointConfig) -> Result<Self> {
        usable(cache.get_token().await)?;
        Ok(Self::new(cache, settings))
    }

    pub fn token_cache(&self) -> &Arc<TokenCache<T>> {
        &self.cache
    }

    pub fn settings(&self) -> &ApiEndpointConfig {
        &self.settings
    }

    /// Send `request`, resending once with a new token if the first token is
    /// rejected. Any other nonzero `error_code` is returned as a normal response.
    pub async fn execute(&self, request: Request) -> Result<Response> {
        let metrics = get_metrics().await;
        let start = get_instant();
        info!("call api start: {}", request.method);

        let result = self.execute_with_retry(&request).await;

        let outcome = match &result {
            Ok(_) => OUTCOME_SUCCESS,
            Err(Error::TokenRejected { .. }) => OUTCOME_REJECTED,
            Err(_) => OUTCOME_ERROR,
        };
        metrics.api_calls.with_label_values(&[request.method.as_str(), outcome]).inc();
        metrics.api_call_duration.with_label_values(&[request.method.as_str()]).observe(start.elapsed().as_secs_f64());
        info!("call api finish: {}, outcome: {}", request.method, outcome);
        result
    }

    async fn execute_with_retry(&self, request: &Request) -> Result<Response> {
        let mut token = usable(self.cache.get_token().await)?;
        let mut attempt = 1;
        loop {
            let body = self.send(request, &token).await?;
            if !contains_error_code(&body, self.settings.token_invalid_code) {
                return decode_response(&body);
            }
            let body = String::from_utf8_lossy(&body).into_owned();
            if attempt >= MAX_ATTEMPTS {
                warn!("access_token rejected again after refresh, response: {}", body);
                return Err(Error::TokenRejected {
                    url: self.settings.url.to_owned(),
                    body,
                });
            }
            warn!("access_token rejected, refresh and retry, response: {}", body);
            get_metrics().await.api_retries.with_label_values(&[request.method.as_str()]).inc();
            self.cache.invalidate().await;
            token = usable(self.cache.force_refresh().await)?;
            attempt += 1;
        }
    }

    async fn send(&self, request: &Request, token: &AccessToken) -> Result<Vec<u8>> {
        let url = self.settings.url.as_str();
        let mut fields = request.form_fields(now_i64())?;
        // must stay the last parameter
        fields.push(("access_token", token.access_token.to_owned()));
        let form = encode_form(fields.iter().map(|(key, value)| (*key, value.as_str())));
        debug!("api_url: {}, method_name: {}, {} data items", url, request.method, request.data.len());

        let response = self
            .cache
            .transport()
            .send(TransportRequest::form_post(url, form))
            .await
            .map_err(|err| Error::Transport {
                url: url.to_owned(),
                source: err.into(),
            })?;
        debug!("resp status: {}, response: {}", response.status, response.body_text());
        Ok(response.body)
    }
}

/// A token that was obtained but not persisted is still good to send.
fn usable(result: Result<AccessToken>) -> Result<AccessToken> {
    result.or_else(|err| {
        if let Error::Persistence { path, source, .. } = &err {
            warn!("continue with unsaved access_token, persist to '{}' failed: {}", path.display(), source);
        }
        err.into_cached_token()
    })
}
