//! Wire codec for the token endpoint and the api endpoint.

use chrono::Utc;
use serde::Deserialize;
use serde_json::Value;

use crate::api::response::Response;
use crate::cache::token::{non_empty, AccessToken};
use crate::error::{Error, Result};

const ERROR_CODE_KEY: &[u8] = b"\"error_code\"";

/// Encode request data items as a json array. No items encode as `[]`.
pub fn encode_data(items: &[Value]) -> Result<String> {
    serde_json::to_string(items).map_err(Error::Encode)
}

pub fn decode_response(body: &[u8]) -> Result<Response> {
    let mut response: Response = serde_json::from_slice(body).map_err(|source| Error::Decode {
        body: String::from_utf8_lossy(body).into_owned(),
        source,
    })?;
    response.raw = body.to_vec();
    Ok(response)
}

#[derive(Debug, Deserialize)]
struct TokenBody {
    access_token: String,
    expires_in: i64,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    scope: Option<String>,
    #[serde(default)]
    session_key: Option<String>,
    #[serde(default)]
    session_secret: Option<String>,
}

/// Decode a token endpoint body, stamping the token with the current time.
///
/// On failure the body is replaced by its length, it may hold the token.
pub fn decode_token(body: &[u8]) -> Result<AccessToken> {
    let wire: TokenBody = serde_json::from_slice(body).map_err(|source| Error::Decode {
        body: redacted(body),
        source,
    })?;
    Ok(AccessToken {
        obtained_at: Utc::now(),
        access_token: wire.access_token,
        expires_in: wire.expires_in,
        refresh_token: non_empty(wire.refresh_token),
        scope: non_empty(wire.scope),
        session_key: non_empty(wire.session_key),
        session_secret: non_empty(wire.session_secret),
    })
}

fn redacted(body: &[u8]) -> String {
    format!("<redacted, {} bytes>", body.len())
}

#[derive(Debug, Deserialize)]
struct OAuthErrorBody {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

/// Human readable message for a failed token endpoint call.
pub fn token_error_message(body: &[u8]) -> String {
    match serde_json::from_slice::<OAuthErrorBody>(body) {
        Ok(OAuthErrorBody { error, error_description: Some(description) }) => {
            format!("{}: {}", error, description)
        }
        Ok(OAuthErrorBody { error, error_description: None }) => error,
        Err(_) => String::from_utf8_lossy(body).into_owned(),
    }
}

/// Scan a raw body for `"error_code": <code>` without decoding it.
///
/// Whitespace around the colon is accepted. A longer number with the same
/// prefix (`1100` for `110`) does not match.
pub fn contains_error_code(body: &[u8], code: i64) -> bool {
    let code = code.to_string();
    let code = code.as_bytes();
    let mut rest = body;
    while let Some(pos) = find(rest, ERROR_CODE_KEY) {
        rest = &rest[pos + ERROR_CODE_KEY.len()..];
        let value = skip_whitespace(rest);
        let Some(value) = value.strip_prefix(b":") else {
            continue;
        };
        let value = skip_whitespace(value);
        if value.starts_with(code) {
            let next = value.get(code.len());
            if !next.is_some_and(|b| b.is_ascii_digit()) {
                return true;
            }
        }
    }
    false
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|window| window == needle)
}

fn skip_whitespace(bytes: &[u8]) -> &[u8] {
    let start = bytes
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(bytes.len());
    &bytes[start..]
}
