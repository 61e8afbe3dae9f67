use serde::Deserialize;

use crate::api::response::ERROR_CODE_TOKEN_INVALID;
use crate::cache::token::SAFETY_MARGIN_SECONDS_DEFAULT;

pub const TOKEN_URL_DEFAULT: &str = "https://openapi.baidu.com/oauth/2.0/token";
pub const API_URL_DEFAULT: &str = "https://openapi.baidu.com/rest/2.0/lightservice/goods";
pub const HTTP_TIMEOUT_MS_DEFAULT: u64 = 5000;

/// ================================
/// Global service-wide settings
/// ================================
#[derive(Debug, Deserialize, Clone, Default)]
pub struct SettingsConfig {
    #[serde(default)]
    pub token: TokenEndpointConfig,
    #[serde(default)]
    pub api: ApiEndpointConfig,
    #[serde(default)]
    pub http: HttpConfig,
    pub logging: Option<LoggingConfig>,
}

/// Token issuance endpoint
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct TokenEndpointConfig {
    #[serde(default = "default_token_url")]
    pub url: String,
    /// tokens declared with a shorter lifetime are never reused
    #[serde(default = "default_safety_margin_seconds")]
    pub safety_margin_seconds: i64,
}

impl Default for TokenEndpointConfig {
    fn default() -> Self {
        Self {
            url: default_token_url(),
            safety_margin_seconds: default_safety_margin_seconds(),
        }
    }
}

impl TokenEndpointConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }
}

/// Api endpoint the invoker calls
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct ApiEndpointConfig {
    #[serde(default = "default_api_url")]
    pub url: String,
    /// error_code marking a rejected access token
    #[serde(default = "default_token_invalid_code")]
    pub token_invalid_code: i64,
}

impl Default for ApiEndpointConfig {
    fn default() -> Self {
        Self {
            url: default_api_url(),
            token_invalid_code: default_token_invalid_code(),
        }
    }
}

impl ApiEndpointConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct HttpConfig {
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self { timeout_ms: default_timeout_ms() }
    }
}

/// ================================
/// Logging
/// ================================
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    pub level: String, // allowed: trace, debug, info, warn, error
    pub format: LogFormat,
}

impl LoggingConfig {
    pub fn new (level: String, format: LogFormat) -> Self {
        Self { level, format }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self::new("info".to_owned(), LogFormat::Compact)
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Compact,
}

fn default_token_url() -> String {
    TOKEN_URL_DEFAULT.to_string()
}

fn default_api_url() -> String {
    API_URL_DEFAULT.to_string()
}

fn default_safety_margin_seconds() -> i64 {
    SAFETY_MARGIN_SECONDS_DEFAULT
}

fn default_token_invalid_code() -> i64 {
    ERROR_CODE_TOKEN_INVALID
}

fn default_timeout_ms() -> u64 {
    HTTP_TIMEOUT_MS_DEFAULT
}
