use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Tokens declared to live shorter than this are never reused.
pub const SAFETY_MARGIN_SECONDS_DEFAULT: i64 = 100;

/// Access token issued by the token endpoint.
///
/// A token is replaced as a whole on every exchange, fields are never patched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessToken {
    /// Wall-clock time the token was decoded at. Unknown reads as the epoch,
    /// so a token saved without it is stale.
    #[serde(rename = "token_get_time", default = "unknown_obtained_at")]
    pub obtained_at: DateTime<Utc>,
    pub access_token: String,
    /// Lifetime in seconds, counted from `obtained_at`.
    pub expires_in: i64,
    #[serde(default, deserialize_with = "empty_as_none", skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none", skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none", skip_serializing_if = "Option::is_none")]
    pub session_key: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none", skip_serializing_if = "Option::is_none")]
    pub session_secret: Option<String>,
}

fn unknown_obtained_at() -> DateTime<Utc> {
    DateTime::<Utc>::UNIX_EPOCH
}

pub(crate) fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

fn empty_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(non_empty(Option::<String>::deserialize(deserializer)?))
}

impl AccessToken {
    pub fn new(access_token: impl Into<String>, expires_in: i64, obtained_at: DateTime<Utc>) -> Self {
        Self {
            obtained_at,
            access_token: access_token.into(),
            expires_in,
            refresh_token: None,
            scope: None,
            session_key: None,
            session_secret: None,
        }
    }

    /// Seconds elapsed between `obtained_at` and `now`.
    pub fn age_seconds(&self, now: DateTime<Utc>) -> i64 {
        (now - self.obtained_at).num_seconds()
    }

    /// Fresh means not yet expired and declared with a lifetime of at least
    /// `safety_margin_seconds`.
    pub fn is_fresh_at(&self, now: DateTime<Utc>, safety_margin_seconds: i64) -> bool {
        if self.expires_in < safety_margin_seconds {
            return false;
        }
        self.age_seconds(now) < self.expires_in
    }

    pub fn is_fresh(&self, safety_margin_seconds: i64) -> bool {
        self.is_fresh_at(Utc::now(), safety_margin_seconds)
    }

    /// Unix timestamp at which the declared lifetime runs out.
    pub fn expires_at_unix_ts(&self) -> i64 {
        self.obtained_at.timestamp() + self.expires_in
    }
}
