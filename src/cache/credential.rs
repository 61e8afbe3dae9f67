use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub const GRANT_TYPE_CLIENT_CREDENTIALS: &str = "client_credentials";

/// Application identifier, numeric or textual depending on the issuer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AppId {
    Numeric(u64),
    Text(String),
}

impl fmt::Display for AppId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppId::Numeric(id) => write!(f, "{}", id),
            AppId::Text(id) => f.write_str(id),
        }
    }
}

impl From<u64> for AppId {
    fn from(value: u64) -> Self {
        AppId::Numeric(value)
    }
}

impl From<&str> for AppId {
    fn from(value: &str) -> Self {
        AppId::Text(value.to_owned())
    }
}

/// Key material of one application. Immutable once built.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    app_id: AppId,
    api_key: String,
    secret_key: String,
    scope: Vec<String>,
}

impl Credential {
    pub fn new(
        app_id: impl Into<AppId>,
        api_key: impl Into<String>,
        secret_key: impl Into<String>,
    ) -> Result<Self> {
        Self::with_scope(app_id, api_key, secret_key, Vec::new())
    }

    pub fn with_scope(
        app_id: impl Into<AppId>,
        api_key: impl Into<String>,
        secret_key: impl Into<String>,
        scope: Vec<String>,
    ) -> Result<Self> {
        let credential = Self {
            app_id: app_id.into(),
            api_key: api_key.into(),
            secret_key: secret_key.into(),
            scope,
        };
        credential.validate()?;
        Ok(credential)
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.api_key.trim().is_empty() {
            return Err(Error::CredentialMissing("api_key is empty"));
        }
        if self.secret_key.trim().is_empty() {
            return Err(Error::CredentialMissing("secret_key is empty"));
        }
        Ok(())
    }

    pub fn app_id(&self) -> &AppId {
        &self.app_id
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn secret_key(&self) -> &str {
        &self.secret_key
    }

    pub fn scope(&self) -> &[String] {
        &self.scope
    }

    /// Form fields of a client-credentials token request, in wire order.
    pub fn token_request_form(&self) -> Vec<(&'static str, String)> {
        vec![
            ("grant_type", GRANT_TYPE_CLIENT_CREDENTIALS.to_owned()),
            ("client_id", self.api_key.to_owned()),
            ("client_secret", self.secret_key.to_owned()),
            ("scope", self.scope.join(",")),
        ]
    }
}

// keep secrets out of logs
impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("app_id", &self.app_id)
            .field("api_key", &self.api_key)
            .field("secret_key", &"***")
            .field("scope", &self.scope)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_key_material_is_rejected() {
        let err = Credential::new(1u64, "", "secret").unwrap_err();
        assert!(matches!(err, Error::CredentialMissing(_)));

        let err = Credential::new(1u64, "key", "  ").unwrap_err();
        assert!(matches!(err, Error::CredentialMissing(_)));
    }

    #[test]
    fn token_form_joins_scopes_with_comma() {
        let credential = Credential::with_scope(
            7u64,
            "key",
            "secret",
            vec!["basic".to_owned(), "goods".to_owned()],
        )
        .unwrap();
        let form = credential.token_request_form();
        assert_eq!(form[0], ("grant_type", "client_credentials".to_owned()));
        assert_eq!(form[3], ("scope", "basic,goods".to_owned()));
    }

    #[test]
    fn debug_output_hides_secret() {
        let credential = Credential::new("app", "key", "top-secret").unwrap();
        let dump = format!("{:?}", credential);
        assert!(!dump.contains("top-secret"));
    }
}
