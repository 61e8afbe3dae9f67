use std::path::PathBuf;

use http::StatusCode;
use thiserror::Error;

use crate::cache::token::AccessToken;

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors returned by the token cache and the api invoker.
#[derive(Debug, Error)]
pub enum Error {
    /// Network failure while sending to `url`.
    #[error("send request to '{url}' failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: BoxError,
    },

    /// Token endpoint answered with a non-success status.
    #[error("token endpoint '{url}' returned {status}: {message}")]
    TokenEndpoint {
        url: String,
        status: StatusCode,
        message: String,
    },

    /// Body is not valid wire format. The raw body is kept for diagnostics.
    #[error("json decode response failed: {source}, resp: {body}")]
    Decode {
        body: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("json encode request data failed: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("credential missing: {0}")]
    CredentialMissing(&'static str),

    /// Server rejected a token that was refreshed right before the retry.
    #[error("access token rejected by '{url}' after refresh, resp: {body}")]
    TokenRejected { url: String, body: String },

    #[error("application error {code}: {message}")]
    Application { code: i64, message: String },

    /// Writing the credential file failed. The token in `token` was obtained
    /// and is cached in memory regardless.
    #[error("persist credential to '{}' failed: {source}", .path.display())]
    Persistence {
        path: PathBuf,
        #[source]
        source: std::io::Error,
        token: Box<AccessToken>,
    },
}

impl Error {
    /// Recover the freshly cached token from a persistence failure.
    /// Every other error is returned unchanged.
    pub fn into_cached_token(self) -> Result<AccessToken, Error> {
        match self {
            Error::Persistence { token, .. } => Ok(*token),
            other => Err(other),
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
