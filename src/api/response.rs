use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

pub const ERROR_CODE_SUCCESS: i64 = 0;
/// Error code the api returns for an invalid or expired access token.
pub const ERROR_CODE_TOKEN_INVALID: i64 = 110;

/// Decoded api response envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    #[serde(default)]
    pub error_code: i64,
    #[serde(default)]
    pub error_msg: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub data: Vec<Value>,
    #[serde(default, deserialize_with = "string_or_number", skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    /// Raw response bytes
    #[serde(skip)]
    pub raw: Vec<u8>,
}

impl Response {
    pub fn is_success(&self) -> bool {
        self.error_code == ERROR_CODE_SUCCESS
    }

    pub fn raw_text(&self) -> String {
        String::from_utf8_lossy(&self.raw).into_owned()
    }

    /// Turn a nonzero error code into `Error::Application`.
    pub fn into_result(self) -> Result<Self> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(Error::Application {
                code: self.error_code,
                message: self.error_msg,
            })
        }
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<Vec<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<Value>>::deserialize(deserializer)?.unwrap_or_default())
}

fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(value)) => Some(value),
        Some(Value::Number(value)) => Some(value.to_string()),
        _ => None,
    })
}
