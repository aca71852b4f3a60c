//! Nodes of the site tree and how they present themselves.

use modx_core::types::{ContentType, ElementDescriptor, SiteDescriptor};
use modx_vfs::Address;
use serde::Serialize;
use std::ops::Range;

/// Cache key of one category listing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct CategoryKey {
    pub site: String,
    pub content_type: ContentType,
}

impl CategoryKey {
    pub fn new(site: impl Into<String>, content_type: ContentType) -> Self {
        Self {
            site: site.into(),
            content_type,
        }
    }
}

/// Stable identity of a node, used in change events.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum NodeId {
    Site(String),
    Category(CategoryKey),
    Element(Address),
}

/// Label text with an optional highlighted char range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeLabel {
    pub text: String,
    pub highlight: Option<Range<usize>>,
}

impl TreeLabel {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            highlight: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SiteNode {
    pub site: SiteDescriptor,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CategoryNode {
    pub site: SiteDescriptor,
    pub content_type: ContentType,
}

impl CategoryNode {
    pub fn key(&self) -> CategoryKey {
        CategoryKey::new(self.site.name.clone(), self.content_type)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ElementNode {
    pub site: SiteDescriptor,
    pub content_type: ContentType,
    pub element: ElementDescriptor,
    /// Match of the active filter inside the name, in chars
    pub highlight: Option<Range<usize>>,
}

impl ElementNode {
    pub fn address(&self) -> Address {
        Address::for_element(self.site.name.clone(), self.content_type, &self.element)
    }

    /// The `modx:` URI that opens this element.
    pub fn uri(&self) -> String {
        self.address().to_uri()
    }

    pub fn category_key(&self) -> CategoryKey {
        CategoryKey::new(self.site.name.clone(), self.content_type)
    }
}

/// One entry of the tree.
#[derive(Debug, Clone, PartialEq)]
pub enum TreeNode {
    Site(SiteNode),
    Category(CategoryNode),
    Element(ElementNode),
}

impl TreeNode {
    pub fn id(&self) -> NodeId {
        match self {
            Self::Site(node) => NodeId::Site(node.site.name.clone()),
            Self::Category(node) => NodeId::Category(node.key()),
            Self::Element(node) => NodeId::Element(node.address()),
        }
    }

    pub fn label(&self) -> TreeLabel {
        match self {
            Self::Site(node) => TreeLabel::plain(node.site.name.clone()),
            Self::Category(node) => TreeLabel::plain(node.content_type.display_name()),
            Self::Element(node) => TreeLabel {
                text: node.element.name.clone(),
                highlight: node.highlight.clone(),
            },
        }
    }

    pub fn tooltip(&self) -> String {
        match self {
            Self::Site(node) => node.site.base_url.clone(),
            Self::Category(node) => {
                format!("{} — {}", node.content_type.display_name(), node.site.name)
            }
            Self::Element(node) => {
                format!("{} ({})", node.element.name, node.content_type.as_str())
            }
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            Self::Site(_) => "globe",
            Self::Category(node) => node.content_type.icon(),
            Self::Element(node) => node.content_type.icon(),
        }
    }

    /// Context tag for menus bound to this kind of node.
    pub fn context_value(&self) -> &'static str {
        match self {
            Self::Site(_) => "modxSite",
            Self::Category(_) => "modxCategory",
            Self::Element(_) => "modxElement",
        }
    }

    pub fn is_expandable(&self) -> bool {
        !matches!(self, Self::Element(_))
    }
}

impl From<SiteNode> for TreeNode {
    fn from(node: SiteNode) -> Self {
        Self::Site(node)
    }
}

impl From<CategoryNode> for TreeNode {
    fn from(node: CategoryNode) -> Self {
        Self::Category(node)
    }
}

impl From<ElementNode> for TreeNode {
    fn from(node: ElementNode) -> Self {
        Self::Element(node)
    }
}
