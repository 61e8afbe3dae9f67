use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use tokio::fs;
use tracing::debug;

use crate::cache::credential::{AppId, Credential};
use crate::cache::token::AccessToken;

/// On-disk shape of a credential and its current token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CredentialFile {
    pub appid: AppId,
    pub api_key: String,
    pub secret_key: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub scope: Vec<String>,
    #[serde(default)]
    pub token: Option<AccessToken>,
    /// Free-form attributes, carried through untouched.
    #[serde(default, deserialize_with = "null_as_default", skip_serializing_if = "Map::is_empty")]
    pub attrs: Map<String, Value>,
}

impl CredentialFile {
    pub fn new(credential: &Credential, token: Option<AccessToken>, attrs: Map<String, Value>) -> Self {
        Self {
            appid: credential.app_id().clone(),
            api_key: credential.api_key().to_owned(),
            secret_key: credential.secret_key().to_owned(),
            scope: credential.scope().to_vec(),
            token,
            attrs,
        }
    }

    pub fn credential(&self) -> crate::error::Result<Credential> {
        Credential::with_scope(
            self.appid.clone(),
            self.api_key.to_owned(),
            self.secret_key.to_owned(),
            self.scope.clone(),
        )
    }

    pub async fn load(path: &Path) -> Result<Self> {
        let content = fs::read(path)
            .await
            .with_context(|| format!("read credential file '{}' failed", path.display()))?;
        serde_json::from_slice(&content)
            .with_context(|| format!("json decode credential file '{}' failed", path.display()))
    }

    /// Write through a sibling temp file and rename it into place.
    pub async fn store(&self, path: &Path) -> io::Result<()> {
        let content = serde_json::to_vec_pretty(self).map_err(io::Error::other)?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }
        let tmp = tmp_path(path);
        fs::write(&tmp, &content).await?;
        set_owner_only(&tmp).await?;
        if let Err(err) = fs::rename(&tmp, path).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(err);
        }
        debug!("credential file '{}' written, {} bytes", path.display(), content.len());
        Ok(())
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|name| name.to_owned())
        .unwrap_or_else(|| OsString::from("credential"));
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(unix)]
async fn set_owner_only(path: &Path) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, std::fs::Permissions::from_mode(0o600)).await
}

#[cfg(not(unix))]
async fn set_owner_only(_path: &Path) -> io::Result<()> {
    Ok(())
}
