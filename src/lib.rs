//! # Token Invoker Library
//!
//! Client-credentials OAuth2 token management under an api invoker that
//! recovers from a rejected token by refreshing it and resending once.
//!
//! Modules:
//! - `cache`: credential, access token, freshness and the token cache
//! - `api`: request/response envelope, wire codec and the invoker
//! - `transport`: the send-bytes seam and its reqwest implementation
//! - `config`: YAML service configuration

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod helpers;
pub mod observability;
pub mod transport;
pub mod utils;

#[cfg(test)]
mod tests;

pub use crate::api::invoker::ApiInvoker;
pub use crate::api::request::Request;
pub use crate::api::response::Response;
pub use crate::cache::credential::{AppId, Credential};
pub use crate::cache::token::AccessToken;
pub use crate::cache::token_cache::TokenCache;
pub use crate::config::types::ServiceConfig;
pub use crate::error::{Error, Result};
pub use crate::transport::http::HttpTransport;
