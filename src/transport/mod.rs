//! Transport module
//! 
//! The core never talks to the network directly, it hands a `TransportRequest`
//! to a `Transport` and inspects the raw bytes that come back.

pub mod http;

use std::future::Future;

use anyhow::Result;
use ::http::{HeaderMap, HeaderValue, Method, StatusCode};

pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

#[derive(Debug, Clone)]
pub struct TransportRequest {
    pub method: Method,
    pub url: String,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl TransportRequest {
    /// POST with an url-encoded form body.
    pub fn form_post(url: &str, form: String) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(
            ::http::header::CONTENT_TYPE,
            HeaderValue::from_static(FORM_CONTENT_TYPE),
        );
        Self {
            method: Method::POST,
            url: url.to_owned(),
            headers,
            body: form.into_bytes(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: StatusCode,
    pub body: Vec<u8>,
}

impl TransportResponse {
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

pub trait Transport: Send + Sync {
    fn send(
        &self,
        request: TransportRequest,
    ) -> impl Future<Output = Result<TransportResponse>> + Send;
}

/// Url-encode `fields` preserving their order.
pub fn encode_form<'a, I>(fields: I) -> String
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut serializer = url::form_urlencoded::Serializer::new(String::new());
    for (key, value) in fields {
        serializer.append_pair(key, value);
    }
    serializer.finish()
}
