//! Site tree with a global filter.
//!
//! Sites expand into one category per enabled content type, categories into
//! the elements the remote API lists. Listings are cached until the next
//! refresh or filter change.

pub mod filter;
pub mod node;
pub mod provider;

pub use filter::{CategoryState, FetchTicket, FilterCache, FilteredElement, filter, highlight};
pub use node::{CategoryKey, CategoryNode, ElementNode, NodeId, SiteNode, TreeLabel, TreeNode};
pub use provider::{SiteTree, TreeEvent};
