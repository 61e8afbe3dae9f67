use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::Client;
use tracing::debug;

use crate::config::settings::HttpConfig;
use crate::transport::{Transport, TransportRequest, TransportResponse};

/// `Transport` backed by a shared reqwest client.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn from_config(config: &HttpConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .context("build http client failed")?;
        Ok(Self::new(client))
    }
}

impl Transport for HttpTransport {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse> {
        let response = self
            .client
            .request(request.method, &request.url)
            .headers(request.headers)
            .body(request.body)
            .send()
            .await?;
        let status = response.status();
        debug!("resp status: {}", status);
        let body = response.bytes().await?.to_vec();
        Ok(TransportResponse { status, body })
    }
}
