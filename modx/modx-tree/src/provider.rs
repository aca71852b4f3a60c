//! Site → category → element hierarchy backed by the remote API.

use crate::filter::{FilterCache, highlight};
use crate::node::{CategoryKey, CategoryNode, ElementNode, NodeId, SiteNode, TreeNode};
use modx_core::config::ClientOptions;
use modx_core::traits::{CredentialStore, Notifier, SiteStore};
use modx_core::types::{ElementDescriptor, SiteDescriptor};
use modx_remote::{GENERIC_FAILURE, RemoteContentClient};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

const EVENT_BUFFER: usize = 256;

/// Context key raised when the site list is empty.
pub const CONTEXT_NO_SITES: &str = "noSitesConfigured";

/// Context key raised while a filter is active.
pub const CONTEXT_ACTIVE_FILTER: &str = "hasActiveFilter";

/// Fallback warning when creating or renaming fails without a remote message.
pub const TRY_ANOTHER_NAME: &str = "Try another name";

/// Published when part of the tree must be re-rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEvent {
    /// `None` means the whole tree
    pub node: Option<NodeId>,
}

/// The element tree.
pub struct SiteTree {
    sites: Arc<dyn SiteStore>,
    credentials: Arc<dyn CredentialStore>,
    notifier: Arc<dyn Notifier>,
    options: ClientOptions,
    cache: Arc<FilterCache>,
    events: broadcast::Sender<TreeEvent>,
    no_sites: AtomicBool,
}

impl SiteTree {
    pub fn new(
        sites: Arc<dyn SiteStore>,
        credentials: Arc<dyn CredentialStore>,
        notifier: Arc<dyn Notifier>,
        options: ClientOptions,
    ) -> Self {
        Self::with_cache(sites, credentials, notifier, options, Arc::new(FilterCache::new()))
    }

    /// Build a tree around an existing filter cache.
    pub fn with_cache(
        sites: Arc<dyn SiteStore>,
        credentials: Arc<dyn CredentialStore>,
        notifier: Arc<dyn Notifier>,
        options: ClientOptions,
        cache: Arc<FilterCache>,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_BUFFER);
        Self {
            sites,
            credentials,
            notifier,
            options,
            cache,
            events,
            no_sites: AtomicBool::new(false),
        }
    }

    pub fn cache(&self) -> &Arc<FilterCache> {
        &self.cache
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TreeEvent> {
        self.events.subscribe()
    }

    /// Whether the last root listing found no sites.
    pub fn no_sites_configured(&self) -> bool {
        self.no_sites.load(Ordering::Relaxed)
    }

    /// Children of `node`, or the configured sites for the root.
    ///
    /// Never fails: an unreachable category is reported and shown empty.
    pub async fn get_children(&self, node: Option<&TreeNode>) -> Vec<TreeNode> {
        match node {
            None => self.site_nodes().await,
            Some(TreeNode::Site(site)) => site
                .site
                .enabled_types()
                .into_iter()
                .map(|content_type| {
                    TreeNode::Category(CategoryNode {
                        site: site.site.clone(),
                        content_type,
                    })
                })
                .collect(),
            Some(TreeNode::Category(category)) => self
                .category_children(category)
                .await
                .into_iter()
                .map(TreeNode::Element)
                .collect(),
            Some(TreeNode::Element(_)) => Vec::new(),
        }
    }

    async fn site_nodes(&self) -> Vec<TreeNode> {
        let sites = match self.sites.list_sites().await {
            Ok(sites) => sites,
            Err(e) => {
                warn!("Failed to list sites: {}", e);
                self.notifier.error(&format!("Failed to load sites: {}", e));
                Vec::new()
            }
        };

        let empty = sites.is_empty();
        self.no_sites.store(empty, Ordering::Relaxed);
        self.notifier.set_context(CONTEXT_NO_SITES, empty);

        sites
            .into_iter()
            .map(|site| TreeNode::Site(SiteNode { site }))
            .collect()
    }

    /// Cached listing of a category, fetched on first use.
    pub async fn category_children(&self, category: &CategoryNode) -> Vec<ElementNode> {
        let key = category.key();
        if let Some(children) = self.cache.get(&key) {
            debug!("Cache hit for {}/{}", key.site, key.content_type);
            return children;
        }

        let ticket = self.cache.begin_fetch(key);
        match self.fetch_elements(category).await {
            Ok(elements) => {
                let children: Vec<ElementNode> = crate::filter::filter(&elements, &ticket.query)
                    .into_iter()
                    .map(|filtered| ElementNode {
                        site: category.site.clone(),
                        content_type: category.content_type,
                        element: filtered.element,
                        highlight: filtered.highlight,
                    })
                    .collect();
                self.cache.complete(&ticket, children.clone());
                children
            }
            Err(reason) => {
                self.cache.abandon(&ticket);
                warn!(
                    "Fetching {} from {} failed: {}",
                    category.content_type, category.site.name, reason
                );
                self.notifier.error(&format!(
                    "Failed to fetch {} from {}: {}",
                    category.content_type, category.site.name, reason
                ));
                Vec::new()
            }
        }
    }

    async fn fetch_elements(
        &self,
        category: &CategoryNode,
    ) -> std::result::Result<Vec<ElementDescriptor>, String> {
        let client = self.client(&category.site).await.map_err(|e| e.to_string())?;
        let envelope = client
            .fetch_many(category.content_type)
            .await
            .map_err(|e| e.to_string())?;
        if !envelope.success {
            return Err(envelope.error_message().to_string());
        }
        envelope.elements().map_err(|e| e.to_string())
    }

    async fn client(&self, site: &SiteDescriptor) -> modx_core::Result<RemoteContentClient> {
        RemoteContentClient::for_site(site, self.credentials.as_ref(), &self.options).await
    }

    /// Drop every cached listing and ask the view to re-render from `node`.
    pub fn refresh(&self, node: Option<NodeId>) {
        self.cache.invalidate();
        self.publish(node);
    }

    /// Replace the global filter.
    pub fn set_filter(&self, query: impl Into<String>) {
        let query = query.into();
        let active = !query.is_empty();
        info!("Tree filter set to {:?}", query);
        self.cache.set_query(query);
        self.notifier.set_context(CONTEXT_ACTIVE_FILTER, active);
        self.publish(None);
    }

    pub fn clear_filter(&self) {
        self.set_filter("");
    }

    /// Insert a freshly created element into its category without refetching.
    ///
    /// Only a category that is already loaded is touched; otherwise the next
    /// expansion fetches the full list, new element included.
    pub fn add_child(&self, category: &CategoryNode, element: ElementDescriptor) -> ElementNode {
        let node = ElementNode {
            site: category.site.clone(),
            content_type: category.content_type,
            highlight: highlight(&element.name, &self.cache.query()),
            element,
        };

        let key = category.key();
        if !self.cache.append(&key, node.clone()) {
            debug!("{}/{} not loaded, skipping append", key.site, key.content_type);
        }
        self.publish(Some(NodeId::Category(key)));
        node
    }

    /// Create an element remotely and add it to `category`.
    pub async fn create_element(&self, category: &CategoryNode, name: &str) -> Option<ElementNode> {
        let name = name.trim();
        if name.is_empty() {
            self.notifier.warn(TRY_ANOTHER_NAME);
            return None;
        }

        let result = match self.client(&category.site).await {
            Ok(client) => client.create(category.content_type, name).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(envelope) if envelope.success => match envelope.element() {
                Ok(element) => {
                    info!(
                        "Created {} '{}' (id {}) on {}",
                        category.content_type.noun(),
                        element.name,
                        element.id,
                        category.site.name
                    );
                    Some(self.add_child(category, element))
                }
                Err(e) => {
                    warn!("Create succeeded but returned no element: {}", e);
                    self.notifier.warn(GENERIC_FAILURE);
                    None
                }
            },
            Ok(envelope) => {
                self.notifier.warn(envelope.error_message());
                None
            }
            Err(e) => {
                warn!("Creating '{}' on {} failed: {}", name, category.site.name, e);
                self.notifier.warn(TRY_ANOTHER_NAME);
                None
            }
        }
    }

    /// Rename an element remotely. Returns whether the remote side accepted it.
    pub async fn rename_element(&self, element: &ElementNode, new_name: &str) -> bool {
        let new_name = new_name.trim();
        if new_name.is_empty() {
            self.notifier.warn(TRY_ANOTHER_NAME);
            return false;
        }

        let result = match self.client(&element.site).await {
            Ok(client) => {
                client
                    .rename(element.content_type, element.element.id, new_name)
                    .await
            }
            Err(e) => Err(e),
        };

        match result {
            Ok(envelope) if envelope.success => {
                self.notifier
                    .info(&format!("{} renamed to {}", element.element.name, new_name));
                self.refresh(Some(NodeId::Element(element.address())));
                true
            }
            Ok(envelope) => {
                self.notifier.warn(envelope.error_message());
                false
            }
            Err(e) => {
                warn!("Renaming {} failed: {}", element.uri(), e);
                self.notifier.warn(TRY_ANOTHER_NAME);
                false
            }
        }
    }

    /// Category node for `key`, if the site still exists.
    pub async fn find_category(&self, key: &CategoryKey) -> Option<CategoryNode> {
        match self.sites.find_site(&key.site).await {
            Ok(site) => site.map(|site| CategoryNode {
                site,
                content_type: key.content_type,
            }),
            Err(e) => {
                warn!("Failed to look up site {}: {}", key.site, e);
                None
            }
        }
    }

    fn publish(&self, node: Option<NodeId>) {
        if self.events.send(TreeEvent { node }).is_err() {
            debug!("No tree subscribers");
        }
    }
}
