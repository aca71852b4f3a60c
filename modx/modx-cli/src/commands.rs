//! Command implementations.
//!
//! Each command returns its result instead of printing, so `main` owns the
//! presentation and the commands stay testable.

use anyhow::{Context, Result, anyhow, bail};
use futures::future::join_all;
use modx_core::config::ModxConfig;
use modx_core::store::{CredentialFile, JsonSiteStore};
use modx_core::traits::{Notifier, SiteStore};
use modx_core::types::{ContentType, ElementDescriptor, SiteDescriptor};
use modx_remote::RemoteContentClient;
use modx_tree::{CategoryKey, ElementNode, SiteTree, TreeLabel, TreeNode};
use modx_vfs::{Address, FileStat, FileSystemProvider, ModxFileSystem, WriteOptions, WriteOutcome};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// Default API path for new sites.
pub const DEFAULT_API_PATH: &str = "vscode-api";

/// Credential key under which a site's token is stored.
pub fn token_key(site_name: &str) -> String {
    format!("modx.{}", site_name)
}

/// Load the configuration from `path`, or the default location.
pub async fn load_config(path: Option<&Path>) -> Result<ModxConfig> {
    let config = match path {
        Some(path) => ModxConfig::load_or_create(path).await,
        None => ModxConfig::load_or_create_default().await,
    };
    config.context("Failed to load configuration")
}

/// Stores and settings shared by every command.
pub struct App {
    pub config: ModxConfig,
    pub sites: Arc<JsonSiteStore>,
    pub credentials: Arc<CredentialFile>,
    pub notifier: Arc<dyn Notifier>,
}

impl App {
    pub fn new(config: ModxConfig, notifier: Arc<dyn Notifier>) -> Result<Self> {
        let sites = JsonSiteStore::new(config.sites_path()?);
        let credentials = CredentialFile::new(config.credentials_path()?);
        debug!(
            "Using sites {} and credentials {}",
            sites.path().display(),
            config.credentials_path()?.display()
        );
        Ok(Self {
            config,
            sites: Arc::new(sites),
            credentials: Arc::new(credentials),
            notifier,
        })
    }

    pub fn filesystem(&self) -> ModxFileSystem {
        ModxFileSystem::new(
            self.sites.clone(),
            self.credentials.clone(),
            self.notifier.clone(),
            self.config.client_options(),
        )
    }

    pub fn tree(&self) -> SiteTree {
        SiteTree::new(
            self.sites.clone(),
            self.credentials.clone(),
            self.notifier.clone(),
            self.config.client_options(),
        )
    }

    async fn require_site(&self, name: &str) -> Result<SiteDescriptor> {
        self.sites
            .find_site(name)
            .await?
            .ok_or_else(|| anyhow!("No site named '{}'", name))
    }
}

/// Fields of `sites add`.
#[derive(Debug, Clone, Default)]
pub struct NewSite {
    pub name: String,
    pub base_url: String,
    pub api_url: Option<String>,
    pub elements: Option<Vec<ContentType>>,
    pub token: Option<String>,
}

/// Fields of `sites edit`; `None` keeps the current value.
#[derive(Debug, Clone, Default)]
pub struct SiteChanges {
    pub name: Option<String>,
    pub base_url: Option<String>,
    pub api_url: Option<String>,
    pub elements: Option<Vec<ContentType>>,
    /// An empty token removes the stored one
    pub token: Option<String>,
}

pub async fn sites_list(app: &App) -> Result<Vec<SiteDescriptor>> {
    Ok(app.sites.list_sites().await?)
}

pub async fn sites_add(app: &App, new: NewSite) -> Result<SiteDescriptor> {
    let name = new.name.trim().to_string();
    let api_url = new.api_url.unwrap_or_else(|| DEFAULT_API_PATH.to_string());
    let mut site = SiteDescriptor::new(name.clone(), new.base_url.trim(), api_url.trim());
    if let Some(elements) = new.elements {
        site = site.with_elements(elements);
    }

    let token = new.token.map(|t| t.trim().to_string()).filter(|t| !t.is_empty());
    if token.is_some() {
        site = site.with_token_key(token_key(&name));
    }

    app.sites
        .add_site(site.clone())
        .await
        .with_context(|| format!("Failed to add site '{}'", name))?;

    if let Some(token) = token {
        app.credentials.store(&token_key(&name), &token).await?;
    }

    info!("Added site {}", site.name);
    Ok(site)
}

pub async fn sites_edit(app: &App, name: &str, changes: SiteChanges) -> Result<SiteDescriptor> {
    let current = app.require_site(name).await?;
    let mut site = current.clone();

    if let Some(new_name) = changes.name {
        site.name = new_name.trim().to_string();
    }
    if let Some(base_url) = changes.base_url {
        site.base_url = base_url.trim().to_string();
    }
    if let Some(api_url) = changes.api_url {
        site.api_url = api_url.trim().to_string();
    }
    if let Some(elements) = changes.elements {
        site.elements = Some(elements);
    }

    // Credential changes wait until the site record is accepted.
    let new_key = token_key(&site.name);
    let old_key = current.token_key.clone();
    let mut store_token = None;
    match changes.token.map(|t| t.trim().to_string()) {
        Some(token) if token.is_empty() => site.token_key = None,
        Some(token) => {
            site.token_key = Some(new_key.clone());
            store_token = Some(token);
        }
        None => {
            if let Some(old) = old_key.as_deref().filter(|k| *k != new_key) {
                store_token = app.credentials.get(old).await?;
                if store_token.is_some() {
                    site.token_key = Some(new_key.clone());
                }
            }
        }
    }

    app.sites
        .update_site(name, site.clone())
        .await
        .with_context(|| format!("Failed to update site '{}'", name))?;

    if let Some(token) = store_token {
        app.credentials.store(&new_key, &token).await?;
    }
    if let Some(old) = old_key.filter(|k| site.token_key.as_deref() != Some(k.as_str())) {
        app.credentials.remove(&old).await?;
    }

    info!("Updated site {}", site.name);
    Ok(site)
}

pub async fn sites_remove(app: &App, name: &str) -> Result<SiteDescriptor> {
    let removed = app
        .sites
        .remove_site(name)
        .await
        .with_context(|| format!("Failed to remove site '{}'", name))?;
    if let Some(key) = &removed.token_key {
        app.credentials.remove(key).await?;
    }
    Ok(removed)
}

/// Check that a site's API answers; returns the endpoint and HTTP status.
pub async fn sites_ping(app: &App, name: &str) -> Result<(String, u16)> {
    let site = app.require_site(name).await?;
    let client =
        RemoteContentClient::for_site(&site, app.credentials.as_ref(), &app.config.client_options())
            .await?;
    let status = client
        .ping()
        .await
        .with_context(|| format!("Failed to ping {}", client.base_url()))?;
    Ok((client.base_url().to_string(), status))
}

/// One printable row of the tree.
#[derive(Debug, Clone, PartialEq)]
pub struct TreeLine {
    pub depth: usize,
    pub label: TreeLabel,
    pub detail: Option<String>,
}

impl TreeLine {
    fn of(depth: usize, node: &TreeNode) -> Self {
        let detail = match node {
            TreeNode::Site(_) => Some(node.tooltip()),
            TreeNode::Category(_) => None,
            TreeNode::Element(element) => Some(element.uri()),
        };
        Self {
            depth,
            label: node.label(),
            detail,
        }
    }
}

/// Walk the whole tree, optionally restricted to one site.
///
/// Categories of a site are fetched concurrently.
pub async fn collect_tree(tree: &SiteTree, only_site: Option<&str>) -> Result<Vec<TreeLine>> {
    let sites: Vec<TreeNode> = tree
        .get_children(None)
        .await
        .into_iter()
        .filter(|node| match (node, only_site) {
            (TreeNode::Site(site), Some(wanted)) => site.site.name == wanted,
            _ => true,
        })
        .collect();

    if let Some(wanted) = only_site {
        if sites.is_empty() {
            bail!("No site named '{}'", wanted);
        }
    }

    let mut lines = Vec::new();
    for site in &sites {
        lines.push(TreeLine::of(0, site));

        let categories = tree.get_children(Some(site)).await;
        let listings = join_all(categories.iter().map(|c| tree.get_children(Some(c)))).await;

        for (category, elements) in categories.iter().zip(listings) {
            lines.push(TreeLine::of(1, category));
            lines.extend(elements.iter().map(|e| TreeLine::of(2, e)));
        }
    }
    Ok(lines)
}

pub async fn stat(app: &App, uri: &str) -> Result<FileStat> {
    Ok(app.filesystem().stat(uri).await?)
}

pub async fn cat(app: &App, uri: &str) -> Result<Vec<u8>> {
    Ok(app.filesystem().read_file(uri).await?)
}

/// Save `content` to the element at `uri`; a refused save is an error.
pub async fn write(app: &App, uri: &str, content: &[u8]) -> Result<()> {
    let outcome = app
        .filesystem()
        .write_file(uri, content, WriteOptions::default())
        .await?;
    match outcome {
        WriteOutcome::Saved => Ok(()),
        WriteOutcome::Failed { reason } => bail!("Save rejected: {}", reason),
    }
}

/// Create an element and return its node.
pub async fn create(
    app: &App,
    site: &str,
    content_type: ContentType,
    name: &str,
) -> Result<ElementNode> {
    let tree = app.tree();
    let category = tree
        .find_category(&CategoryKey::new(site, content_type))
        .await
        .ok_or_else(|| anyhow!("No site named '{}'", site))?;
    tree.create_element(&category, name)
        .await
        .ok_or_else(|| anyhow!("Could not create {} '{}'", content_type.noun(), name))
}

/// Rename the element at `uri`; returns its new URI.
pub async fn rename(app: &App, uri: &str, new_name: &str) -> Result<String> {
    let address = Address::from_uri(uri)?;
    let site = app.require_site(&address.site_name).await?;

    let element = ElementNode {
        site,
        content_type: address.content_type,
        element: ElementDescriptor::new(address.id, address.name.clone()),
        highlight: None,
    };
    if !app.tree().rename_element(&element, new_name).await {
        bail!("Could not rename '{}'", address.name);
    }

    let renamed = Address::new(
        address.site_name,
        address.content_type,
        address.id,
        new_name.trim(),
    );
    Ok(renamed.to_uri())
}
