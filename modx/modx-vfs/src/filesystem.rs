//! Filesystem provider backed by the remote elements API.
//!
//! Reads and writes map onto single-element API calls. Directory operations
//! are deliberately empty: browsing happens through the site tree, not
//! through path listing.

use crate::address::Address;
use async_trait::async_trait;
use chrono::Utc;
use modx_core::config::ClientOptions;
use modx_core::error::{ModxError, Result};
use modx_core::traits::{CredentialStore, Notifier, SiteStore};
use modx_remote::{RemoteContentClient, UpdateFields};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

const EVENT_BUFFER: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    File,
    Directory,
}

/// Minimal metadata reported for every element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileStat {
    pub file_type: FileType,
    /// Creation time, epoch milliseconds
    pub ctime: i64,
    /// Modification time, epoch milliseconds
    pub mtime: i64,
    pub size: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileChangeType {
    Changed,
    Created,
    Deleted,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileChangeEvent {
    pub kind: FileChangeType,
    pub uri: String,
}

impl FileChangeEvent {
    pub fn changed(uri: impl Into<String>) -> Self {
        Self {
            kind: FileChangeType::Changed,
            uri: uri.into(),
        }
    }
}

/// Flags the editor passes with a write. Elements always exist remotely, so
/// both are accepted and ignored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteOptions {
    pub create: bool,
    pub overwrite: bool,
}

/// Result of a write that reached the remote side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    Saved,
    Failed { reason: String },
}

impl WriteOutcome {
    pub fn is_saved(&self) -> bool {
        matches!(self, Self::Saved)
    }
}

/// Operations an editor shell expects from a filesystem provider.
#[async_trait]
pub trait FileSystemProvider: Send + Sync {
    /// Subscribe to change notifications
    fn watch(&self) -> broadcast::Receiver<FileChangeEvent>;

    async fn stat(&self, uri: &str) -> Result<FileStat>;

    async fn read_directory(&self, uri: &str) -> Result<Vec<(String, FileType)>>;

    async fn create_directory(&self, uri: &str) -> Result<()>;

    async fn read_file(&self, uri: &str) -> Result<Vec<u8>>;

    async fn write_file(
        &self,
        uri: &str,
        content: &[u8],
        options: WriteOptions,
    ) -> Result<WriteOutcome>;

    async fn delete(&self, uri: &str) -> Result<()>;

    async fn rename(&self, from: &str, to: &str) -> Result<()>;
}

/// The `modx:` filesystem.
///
/// Holds no per-file state; every call resolves the site and builds a fresh
/// client, so edits to the site list or credentials apply immediately.
pub struct ModxFileSystem {
    sites: Arc<dyn SiteStore>,
    credentials: Arc<dyn CredentialStore>,
    notifier: Arc<dyn Notifier>,
    options: ClientOptions,
    events: broadcast::Sender<FileChangeEvent>,
}

impl ModxFileSystem {
    pub fn new(
        sites: Arc<dyn SiteStore>,
        credentials: Arc<dyn CredentialStore>,
        notifier: Arc<dyn Notifier>,
        options: ClientOptions,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_BUFFER);
        Self {
            sites,
            credentials,
            notifier,
            options,
            events,
        }
    }

    async fn resolve(&self, uri: &str, follow_redirects: bool) -> Result<(Address, RemoteContentClient)> {
        let address = Address::from_uri(uri).map_err(|e| e.into_not_found(uri))?;

        let site = self
            .sites
            .find_site(&address.site_name)
            .await?
            .ok_or_else(|| ModxError::unknown_site(&address.site_name).into_not_found(uri))?;

        let options = if follow_redirects {
            self.options.clone()
        } else {
            self.options.without_redirects()
        };
        let client = RemoteContentClient::for_site(&site, self.credentials.as_ref(), &options).await?;

        Ok((address, client))
    }

    fn emit(&self, event: FileChangeEvent) {
        // No subscribers is fine.
        if self.events.send(event).is_err() {
            debug!("No watchers for file change event");
        }
    }
}

#[async_trait]
impl FileSystemProvider for ModxFileSystem {
    fn watch(&self) -> broadcast::Receiver<FileChangeEvent> {
        self.events.subscribe()
    }

    async fn stat(&self, uri: &str) -> Result<FileStat> {
        Address::from_uri(uri).map_err(|e| e.into_not_found(uri))?;
        let now = Utc::now().timestamp_millis();
        Ok(FileStat {
            file_type: FileType::File,
            ctime: now,
            mtime: now,
            size: 0,
        })
    }

    async fn read_directory(&self, _uri: &str) -> Result<Vec<(String, FileType)>> {
        Ok(Vec::new())
    }

    async fn create_directory(&self, _uri: &str) -> Result<()> {
        Ok(())
    }

    /// Element content as UTF-8.
    ///
    /// Remote failures yield an empty buffer rather than an error, so the
    /// editor still opens; the failure is only logged.
    async fn read_file(&self, uri: &str) -> Result<Vec<u8>> {
        let (address, client) = self.resolve(uri, true).await?;

        match client.fetch_one(address.content_type, address.id).await {
            Ok(envelope) if envelope.success => match envelope.content() {
                Some(content) => Ok(content.into_bytes()),
                None => {
                    debug!("{} has no content field", uri);
                    Ok(Vec::new())
                }
            },
            Ok(envelope) => {
                warn!("Reading {} failed remotely: {}", uri, envelope.error_message());
                Ok(Vec::new())
            }
            Err(e) => {
                warn!("Reading {} failed: {}", uri, e);
                Ok(Vec::new())
            }
        }
    }

    /// Push content back to the element.
    ///
    /// Redirects are not followed. A remote failure is reported through the
    /// notifier and returned as `WriteOutcome::Failed`; a change event is
    /// emitted either way.
    async fn write_file(
        &self,
        uri: &str,
        content: &[u8],
        _options: WriteOptions,
    ) -> Result<WriteOutcome> {
        let (address, client) = self.resolve(uri, false).await?;

        let fields = UpdateFields::new(address.name.clone(), String::from_utf8_lossy(content));
        let outcome = match client.update(address.content_type, address.id, &fields).await {
            Ok(envelope) if envelope.success => {
                info!("Saved {}", uri);
                WriteOutcome::Saved
            }
            Ok(envelope) => WriteOutcome::Failed {
                reason: envelope.error_message().to_string(),
            },
            Err(ModxError::Redirect { status, location }) => {
                let location = location.unwrap_or_else(|| "<none>".to_string());
                warn!("Write to {} redirected: status {}, location {}", uri, status, location);
                WriteOutcome::Failed {
                    reason: format!("redirected with status {} to {}", status, location),
                }
            }
            Err(e) => WriteOutcome::Failed {
                reason: e.to_string(),
            },
        };

        if let WriteOutcome::Failed { reason } = &outcome {
            warn!("Write to {} failed: {}", uri, reason);
            self.notifier
                .warn(&format!("Failed to save {}: {}", address.name, reason));
        }

        self.emit(FileChangeEvent::changed(uri));
        Ok(outcome)
    }

    async fn delete(&self, _uri: &str) -> Result<()> {
        Ok(())
    }

    async fn rename(&self, _from: &str, _to: &str) -> Result<()> {
        Ok(())
    }
}
