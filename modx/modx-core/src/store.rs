//! File-backed site list and credential store.

use crate::error::{ModxError, Result};
use crate::traits::{CredentialStore, SiteStore};
use crate::types::SiteDescriptor;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Site list kept as a pretty-printed JSON array.
#[derive(Debug, Clone)]
pub struct JsonSiteStore {
    path: PathBuf,
}

impl JsonSiteStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create the file as an empty list if it does not exist yet.
    pub async fn ensure_exists(&self) -> Result<()> {
        if tokio::fs::try_exists(&self.path).await? {
            return Ok(());
        }
        debug!("Creating empty site list at {}", self.path.display());
        write_atomic(&self.path, b"[]").await
    }

    async fn load(&self) -> Result<Vec<SiteDescriptor>> {
        self.ensure_exists().await?;
        let raw = tokio::fs::read_to_string(&self.path).await?;
        match serde_json::from_str(&raw) {
            Ok(sites) => Ok(sites),
            Err(e) => {
                warn!("Ignoring unreadable site list {}: {}", self.path.display(), e);
                Ok(Vec::new())
            }
        }
    }

    async fn save(&self, sites: &[SiteDescriptor]) -> Result<()> {
        let body = serde_json::to_vec_pretty(sites)?;
        write_atomic(&self.path, &body).await
    }

    /// Append a site; names must be valid and unique.
    pub async fn add_site(&self, site: SiteDescriptor) -> Result<Vec<SiteDescriptor>> {
        site.validate()?;
        let mut sites = self.load().await?;
        if sites.iter().any(|s| s.name == site.name) {
            return Err(ModxError::invalid_input(format!(
                "A site named '{}' already exists",
                site.name
            )));
        }
        sites.push(site);
        self.save(&sites).await?;
        Ok(sites)
    }

    /// Replace the site currently named `old_name`.
    pub async fn update_site(&self, old_name: &str, site: SiteDescriptor) -> Result<()> {
        site.validate()?;
        let mut sites = self.load().await?;
        let idx = sites
            .iter()
            .position(|s| s.name == old_name)
            .ok_or_else(|| ModxError::unknown_site(old_name))?;
        if site.name != old_name && sites.iter().any(|s| s.name == site.name) {
            return Err(ModxError::invalid_input(format!(
                "A site named '{}' already exists",
                site.name
            )));
        }
        sites[idx] = site;
        self.save(&sites).await
    }

    /// Remove a site by name and return it.
    pub async fn remove_site(&self, name: &str) -> Result<SiteDescriptor> {
        let mut sites = self.load().await?;
        let idx = sites
            .iter()
            .position(|s| s.name == name)
            .ok_or_else(|| ModxError::unknown_site(name))?;
        let removed = sites.remove(idx);
        self.save(&sites).await?;
        Ok(removed)
    }
}

#[async_trait]
impl SiteStore for JsonSiteStore {
    async fn list_sites(&self) -> Result<Vec<SiteDescriptor>> {
        self.load().await
    }
}

/// Bearer tokens in a TOML table of `key = "token"`.
#[derive(Debug, Clone)]
pub struct CredentialFile {
    path: PathBuf,
}

impl CredentialFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    async fn load(&self) -> Result<BTreeMap<String, String>> {
        if !tokio::fs::try_exists(&self.path).await? {
            return Ok(BTreeMap::new());
        }
        let raw = tokio::fs::read_to_string(&self.path).await?;
        toml::from_str(&raw).map_err(|e| {
            ModxError::config(format!(
                "Failed to parse credentials {}: {}",
                self.path.display(),
                e
            ))
        })
    }

    async fn save(&self, map: &BTreeMap<String, String>) -> Result<()> {
        let body = toml::to_string(map)
            .map_err(|e| ModxError::config(format!("Failed to serialize credentials: {}", e)))?;
        write_atomic(&self.path, body.as_bytes()).await?;
        restrict_permissions(&self.path).await
    }

    pub async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.load().await?.remove(key))
    }

    pub async fn store(&self, key: &str, token: &str) -> Result<()> {
        let mut map = self.load().await?;
        map.insert(key.to_string(), token.to_string());
        self.save(&map).await
    }

    /// Remove a token; returns whether one was present.
    pub async fn remove(&self, key: &str) -> Result<bool> {
        let mut map = self.load().await?;
        let existed = map.remove(key).is_some();
        if existed {
            self.save(&map).await?;
        }
        Ok(existed)
    }
}

#[async_trait]
impl CredentialStore for CredentialFile {
    async fn get_credential(&self, key: &str) -> Option<String> {
        match self.get(key).await {
            Ok(token) => token,
            Err(e) => {
                warn!("Credential lookup for '{}' failed: {}", key, e);
                None
            }
        }
    }
}

/// Write through a fresh temp file in the target directory, then rename.
pub(crate) async fn write_atomic(path: &Path, body: &[u8]) -> Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    tokio::fs::create_dir_all(&parent).await?;

    // One temp file per save.
    let target = path.to_path_buf();
    let body = body.to_vec();
    tokio::task::spawn_blocking(move || -> Result<()> {
        let mut temp = tempfile::NamedTempFile::new_in(&parent)?;
        temp.write_all(&body)?;
        temp.as_file().sync_all()?;
        temp.persist(&target).map_err(|e| ModxError::Io(e.error))?;
        Ok(())
    })
    .await
    .map_err(|e| ModxError::Other(anyhow::anyhow!("Write task failed: {}", e)))?
}

#[cfg(unix)]
async fn restrict_permissions(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600)).await?;
    Ok(())
}

#[cfg(not(unix))]
async fn restrict_permissions(_path: &Path) -> Result<()> {
    Ok(())
}
