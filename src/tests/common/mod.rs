// tests/common/mod.rs
pub use axum::Router;
pub use serde_json::json;
pub use tokio::task::JoinHandle;

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::anyhow;
use chrono::{Duration as ChronoDuration, Utc};
use http::StatusCode;

use crate::cache::credential::Credential;
use crate::cache::token::AccessToken;
use crate::cache::token_cache::TokenCache;
use crate::config::settings::{ApiEndpointConfig, TokenEndpointConfig};
use crate::transport::{Transport, TransportRequest, TransportResponse};

pub const TOKEN_URL: &str = "http://token.test/oauth/2.0/token";
pub const API_URL: &str = "http://api.test/rest/2.0/lightservice/goods";

pub const INVALID_TOKEN_BODY: &str = r#"{"error_code":110,"error_msg":"Access token invalid or no longer valid"}"#;
pub const SUCCESS_BODY: &str = r#"{"error_code":0,"error_msg":"","data":[{"shop_id":1}]}"#;

/// Scripted transport reply
#[derive(Debug, Clone)]
pub enum Reply {
    Body(StatusCode, String),
    Fail(String),
}

impl Reply {
    pub fn ok(body: &str) -> Self {
        Reply::Body(StatusCode::OK, body.to_owned())
    }
}

#[derive(Debug, Default)]
struct FakeInner {
    token_replies: Mutex<VecDeque<Reply>>,
    api_replies: Mutex<VecDeque<Reply>>,
    requests: Mutex<Vec<TransportRequest>>,
    token_calls: AtomicUsize,
    api_calls: AtomicUsize,
    token_in_flight: AtomicUsize,
    token_max_in_flight: AtomicUsize,
    token_delay_ms: AtomicUsize,
}

/// Counting in-memory transport.
///
/// Unscripted token calls answer `token-<n>` with a one hour lifetime,
/// unscripted api calls answer `SUCCESS_BODY`.
#[derive(Debug, Clone, Default)]
pub struct FakeTransport {
    inner: Arc<FakeInner>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token_delay(self, delay: Duration) -> Self {
        self.inner.token_delay_ms.store(delay.as_millis() as usize, Ordering::SeqCst);
        self
    }

    pub fn push_token_reply(&self, reply: Reply) -> &Self {
        self.inner.token_replies.lock().unwrap().push_back(reply);
        self
    }

    pub fn push_api_reply(&self, reply: Reply) -> &Self {
        self.inner.api_replies.lock().unwrap().push_back(reply);
        self
    }

    pub fn token_calls(&self) -> usize {
        self.inner.token_calls.load(Ordering::SeqCst)
    }

    pub fn api_calls(&self) -> usize {
        self.inner.api_calls.load(Ordering::SeqCst)
    }

    pub fn token_max_in_flight(&self) -> usize {
        self.inner.token_max_in_flight.load(Ordering::SeqCst)
    }

    pub fn requests_to(&self, url: &str) -> Vec<TransportRequest> {
        self.inner
            .requests
            .lock()
            .unwrap()
            .iter()
            .filter(|request| request.url == url)
            .cloned()
            .collect()
    }

    async fn token_reply(&self) -> Reply {
        let n = self.inner.token_calls.fetch_add(1, Ordering::SeqCst) + 1;
        let in_flight = self.inner.token_in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.inner.token_max_in_flight.fetch_max(in_flight, Ordering::SeqCst);

        let delay = self.inner.token_delay_ms.load(Ordering::SeqCst) as u64;
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        self.inner.token_in_flight.fetch_sub(1, Ordering::SeqCst);

        let scripted = self.inner.token_replies.lock().unwrap().pop_front();
        scripted.unwrap_or_else(|| {
            Reply::ok(&json!({"access_token": format!("token-{}", n), "expires_in": 3600}).to_string())
        })
    }

    fn api_reply(&self) -> Reply {
        self.inner.api_calls.fetch_add(1, Ordering::SeqCst);
        let scripted = self.inner.api_replies.lock().unwrap().pop_front();
        scripted.unwrap_or_else(|| Reply::ok(SUCCESS_BODY))
    }
}

impl Transport for FakeTransport {
    async fn send(&self, request: TransportRequest) -> anyhow::Result<TransportResponse> {
        let url = request.url.clone();
        self.inner.requests.lock().unwrap().push(request);
        let reply = if url == TOKEN_URL {
            self.token_reply().await
        } else {
            self.api_reply()
        };
        match reply {
            Reply::Body(status, body) => Ok(TransportResponse { status, body: body.into_bytes() }),
            Reply::Fail(message) => Err(anyhow!(message)),
        }
    }
}

pub fn credential() -> Credential {
    Credential::with_scope(1234u64, "api-key", "secret-key", vec!["basic".to_owned(), "goods".to_owned()])
        .expect("credential")
}

pub fn token_settings() -> TokenEndpointConfig {
    TokenEndpointConfig::new(TOKEN_URL)
}

pub fn api_settings() -> ApiEndpointConfig {
    ApiEndpointConfig::new(API_URL)
}

pub fn token_cache(transport: &FakeTransport) -> TokenCache<FakeTransport> {
    TokenCache::new(credential(), token_settings(), transport.clone())
}

/// Token obtained `age_seconds` ago with the given lifetime.
pub fn aged_token(value: &str, expires_in: i64, age_seconds: i64) -> AccessToken {
    AccessToken::new(value, expires_in, Utc::now() - ChronoDuration::seconds(age_seconds))
}

/// Decoded url-encoded form body, in wire order.
pub fn form_of(request: &TransportRequest) -> Vec<(String, String)> {
    url::form_urlencoded::parse(&request.body)
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect()
}

pub fn form_value<'a>(form: &'a [(String, String)], key: &str) -> Option<&'a str> {
    form.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
}

/// Spawn an Axum router on an ephemeral port and return (JoinHandle, SocketAddr)
pub async fn spawn_axum(router: Router) -> (JoinHandle<()>, SocketAddr) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind failed");
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        axum::serve(listener, router).await.expect("server failed");
    });
    (handle, addr)
}
