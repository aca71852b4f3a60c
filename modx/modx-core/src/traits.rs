//! Interfaces of the collaborators the engine consumes.

use crate::error::Result;
use crate::types::SiteDescriptor;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Source of configured sites.
#[async_trait]
pub trait SiteStore: Send + Sync {
    /// List all configured sites in stored order
    async fn list_sites(&self) -> Result<Vec<SiteDescriptor>>;

    /// Find a site by its unique name
    async fn find_site(&self, name: &str) -> Result<Option<SiteDescriptor>> {
        Ok(self
            .list_sites()
            .await?
            .into_iter()
            .find(|site| site.name == name))
    }
}

#[async_trait]
impl SiteStore for Vec<SiteDescriptor> {
    async fn list_sites(&self) -> Result<Vec<SiteDescriptor>> {
        Ok(self.clone())
    }
}

/// Source of bearer tokens, looked up by a site's `token_key`.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn get_credential(&self, key: &str) -> Option<String>;
}

#[async_trait]
impl CredentialStore for HashMap<String, String> {
    async fn get_credential(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }
}

/// Severity of a user-facing message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotifyLevel {
    Info,
    Warning,
    Error,
}

impl fmt::Display for NotifyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
        };
        f.write_str(s)
    }
}

/// Fire-and-forget sink for messages shown to the user.
pub trait Notifier: Send + Sync {
    fn notify(&self, level: NotifyLevel, message: &str);

    /// Toggle a UI context flag such as `noSitesConfigured`.
    fn set_context(&self, _key: &str, _value: bool) {}

    fn info(&self, message: &str) {
        self.notify(NotifyLevel::Info, message);
    }

    fn warn(&self, message: &str) {
        self.notify(NotifyLevel::Warning, message);
    }

    fn error(&self, message: &str) {
        self.notify(NotifyLevel::Error, message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_vec_site_store_find() {
        let sites = vec![
            SiteDescriptor::new("one", "https://one.test", "api"),
            SiteDescriptor::new("two", "https://two.test", "api"),
        ];
        let found = sites.find_site("two").await.unwrap().unwrap();
        assert_eq!(found.base_url, "https://two.test");
        assert!(sites.find_site("three").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_map_credential_store() {
        let mut creds = HashMap::new();
        creds.insert("modx.one".to_string(), "secret".to_string());
        assert_eq!(creds.get_credential("modx.one").await.as_deref(), Some("secret"));
        assert_eq!(creds.get_credential("modx.two").await, None);
    }
}
