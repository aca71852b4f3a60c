//! Global name/content filter and the per-category listing cache.
//!
//! One filter string applies to the whole tree. Listings are cached per
//! [`CategoryKey`] with the filter already applied, so any change of the
//! filter invalidates every entry. Invalidation bumps a generation counter;
//! a fetch that started under an older generation cannot store its result.

use crate::node::{CategoryKey, ElementNode};
use dashmap::DashMap;
use modx_core::types::ElementDescriptor;
use parking_lot::RwLock;
use std::ops::Range;
use tracing::debug;

/// An element that passed the filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilteredElement {
    pub element: ElementDescriptor,
    pub highlight: Option<Range<usize>>,
}

/// Keep the elements whose name or content contains `query`, ignoring case.
///
/// An empty query keeps everything and computes no highlights. Source order
/// is preserved.
pub fn filter(list: &[ElementDescriptor], query: &str) -> Vec<FilteredElement> {
    if query.is_empty() {
        return list
            .iter()
            .cloned()
            .map(|element| FilteredElement {
                element,
                highlight: None,
            })
            .collect();
    }

    let needle = fold_case(query);
    list.iter()
        .filter_map(|element| {
            let highlight = find_match(&element.name, &needle);
            let in_content = element
                .content
                .as_deref()
                .is_some_and(|content| fold_case(content).contains(&needle));

            (highlight.is_some() || in_content).then(|| FilteredElement {
                element: element.clone(),
                highlight,
            })
        })
        .collect()
}

/// First case-insensitive match of `query` in `name`, as a char range of
/// `name` itself.
pub fn highlight(name: &str, query: &str) -> Option<Range<usize>> {
    if query.is_empty() {
        return None;
    }
    find_match(name, &fold_case(query))
}

/// Lowercase char by char, so every folded char maps to one source char.
fn fold_case(text: &str) -> String {
    text.chars().flat_map(char::to_lowercase).collect()
}

fn find_match(name: &str, needle: &str) -> Option<Range<usize>> {
    let mut haystack = String::with_capacity(name.len());
    // source char index of every char pushed to `haystack`
    let mut origin = Vec::with_capacity(name.len());
    for (idx, c) in name.chars().enumerate() {
        for folded in c.to_lowercase() {
            haystack.push(folded);
            origin.push(idx);
        }
    }

    let len = needle.chars().count();
    if len == 0 {
        return None;
    }
    let byte_offset = haystack.find(needle)?;
    let start = haystack[..byte_offset].chars().count();
    Some(origin[start]..origin[start + len - 1] + 1)
}

/// Load state of one category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategoryState {
    Unloaded,
    Loading,
    Loaded,
}

/// Handed out when a fetch starts; carries the filter it must apply.
#[derive(Debug, Clone)]
pub struct FetchTicket {
    pub key: CategoryKey,
    pub generation: u64,
    pub query: String,
}

#[derive(Debug, Clone)]
enum Slot {
    Loading { generation: u64 },
    Loaded { children: Vec<ElementNode> },
}

#[derive(Debug, Default)]
struct FilterState {
    query: String,
    generation: u64,
}

/// Filter string plus cached category listings.
///
/// Shared by `Arc`. The state lock is only held for map updates, never
/// across an await.
#[derive(Debug, Default)]
pub struct FilterCache {
    state: RwLock<FilterState>,
    slots: DashMap<CategoryKey, Slot>,
}

impl FilterCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current filter string
    pub fn query(&self) -> String {
        self.state.read().query.clone()
    }

    pub fn has_filter(&self) -> bool {
        !self.state.read().query.is_empty()
    }

    pub fn generation(&self) -> u64 {
        self.state.read().generation
    }

    /// Replace the filter string and drop every cached listing.
    pub fn set_query(&self, query: impl Into<String>) -> u64 {
        let mut state = self.state.write();
        state.query = query.into();
        Self::bump(&mut state, &self.slots)
    }

    /// Drop every cached listing.
    pub fn invalidate(&self) -> u64 {
        let mut state = self.state.write();
        Self::bump(&mut state, &self.slots)
    }

    fn bump(state: &mut FilterState, slots: &DashMap<CategoryKey, Slot>) -> u64 {
        state.generation += 1;
        slots.clear();
        debug!("Filter cache invalidated, generation {}", state.generation);
        state.generation
    }

    pub fn state(&self, key: &CategoryKey) -> CategoryState {
        match self.slots.get(key).as_deref() {
            None => CategoryState::Unloaded,
            Some(Slot::Loading { .. }) => CategoryState::Loading,
            Some(Slot::Loaded { .. }) => CategoryState::Loaded,
        }
    }

    /// Cached children of a loaded category.
    pub fn get(&self, key: &CategoryKey) -> Option<Vec<ElementNode>> {
        match self.slots.get(key).as_deref() {
            Some(Slot::Loaded { children }) => Some(children.clone()),
            _ => None,
        }
    }

    /// Mark a category as loading under the current generation.
    pub fn begin_fetch(&self, key: CategoryKey) -> FetchTicket {
        let state = self.state.read();
        self.slots.insert(
            key.clone(),
            Slot::Loading {
                generation: state.generation,
            },
        );
        FetchTicket {
            key,
            generation: state.generation,
            query: state.query.clone(),
        }
    }

    /// Store a finished fetch.
    ///
    /// Returns `false` and stores nothing when the cache was invalidated
    /// after the ticket was issued.
    pub fn complete(&self, ticket: &FetchTicket, children: Vec<ElementNode>) -> bool {
        let state = self.state.read();
        if state.generation != ticket.generation {
            debug!(
                "Discarding stale listing for {}/{} (generation {} < {})",
                ticket.key.site, ticket.key.content_type, ticket.generation, state.generation
            );
            return false;
        }
        self.slots
            .insert(ticket.key.clone(), Slot::Loaded { children });
        true
    }

    /// Return a failed fetch's category to unloaded.
    pub fn abandon(&self, ticket: &FetchTicket) {
        let _state = self.state.read();
        self.slots.remove_if(&ticket.key, |_, slot| {
            matches!(slot, Slot::Loading { generation } if *generation == ticket.generation)
        });
    }

    /// Append to a loaded listing. Unloaded categories are left alone.
    pub fn append(&self, key: &CategoryKey, node: ElementNode) -> bool {
        match self.slots.get_mut(key).as_deref_mut() {
            Some(Slot::Loaded { children }) => {
                children.push(node);
                true
            }
            _ => false,
        }
    }

    /// Number of categories with a loaded listing
    pub fn loaded_count(&self) -> usize {
        self.slots
            .iter()
            .filter(|entry| matches!(entry.value(), Slot::Loaded { .. }))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use modx_core::types::{ContentType, SiteDescriptor};

    fn named(names: &[&str]) -> Vec<ElementDescriptor> {
        names
            .iter()
            .enumerate()
            .map(|(i, name)| ElementDescriptor::new(i as u64 + 1, *name))
            .collect()
    }

    fn node(name: &str) -> ElementNode {
        ElementNode {
            site: SiteDescriptor::new("main", "https://example.com", "api"),
            content_type: ContentType::Chunk,
            element: ElementDescriptor::new(1, name),
            highlight: None,
        }
    }

    fn key() -> CategoryKey {
        CategoryKey::new("main", ContentType::Chunk)
    }

    #[test]
    fn test_empty_query_is_identity() {
        let list = named(&["Header", "Footer", "Nav"]);
        let result = filter(&list, "");
        assert_eq!(result.len(), 3);
        assert!(result.iter().all(|f| f.highlight.is_none()));
        let names: Vec<_> = result.iter().map(|f| f.element.name.as_str()).collect();
        assert_eq!(names, ["Header", "Footer", "Nav"]);
    }

    #[test]
    fn test_name_match_is_highlighted() {
        let result = filter(&named(&["Header", "Footer"]), "head");
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].element.name, "Header");
        assert_eq!(result[0].highlight, Some(0..4));
    }

    #[test]
    fn test_content_match_has_no_highlight() {
        let list = vec![
            ElementDescriptor::new(1, "Footer").with_content("<div class=\"Header\">"),
            ElementDescriptor::new(2, "Nav"),
        ];
        let result = filter(&list, "HEADER");
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].element.id, 1);
        assert_eq!(result[0].highlight, None);
    }

    #[test]
    fn test_highlight_counts_chars() {
        assert_eq!(highlight("Ünïcode header", "head"), Some(8..12));
        assert_eq!(highlight("MyHeader", "HEAD"), Some(2..6));
        assert_eq!(highlight("Footer", "head"), None);
        assert_eq!(highlight("Footer", ""), None);
    }

    #[test]
    fn test_highlight_survives_length_changing_lowercase() {
        let result = filter(&[ElementDescriptor::new(1, "İstanbul")], "st");
        assert_eq!(result.len(), 1);
        let range = result[0].highlight.clone().unwrap();
        assert_eq!(range, 1..3);

        let shown: String = "İstanbul"
            .chars()
            .skip(range.start)
            .take(range.len())
            .collect();
        assert_eq!(shown, "st");

        assert_eq!(highlight("İİx", "x"), Some(2..3));
        assert_eq!(highlight("İstanbul", "i"), Some(0..1));
    }

    #[test]
    fn test_order_is_preserved() {
        let result = filter(&named(&["b-head", "a-head", "c"]), "head");
        let names: Vec<_> = result.iter().map(|f| f.element.name.as_str()).collect();
        assert_eq!(names, ["b-head", "a-head"]);
    }

    #[test]
    fn test_state_machine() {
        let cache = FilterCache::new();
        assert_eq!(cache.state(&key()), CategoryState::Unloaded);

        let ticket = cache.begin_fetch(key());
        assert_eq!(cache.state(&key()), CategoryState::Loading);
        assert!(cache.get(&key()).is_none());

        assert!(cache.complete(&ticket, vec![node("a")]));
        assert_eq!(cache.state(&key()), CategoryState::Loaded);
        assert_eq!(cache.get(&key()).unwrap().len(), 1);
    }

    #[test]
    fn test_failed_fetch_returns_to_unloaded() {
        let cache = FilterCache::new();
        let ticket = cache.begin_fetch(key());
        cache.abandon(&ticket);
        assert_eq!(cache.state(&key()), CategoryState::Unloaded);
    }

    #[test]
    fn test_stale_result_is_discarded() {
        let cache = FilterCache::new();
        let ticket = cache.begin_fetch(key());
        cache.invalidate();

        assert!(!cache.complete(&ticket, vec![node("old")]));
        assert_eq!(cache.state(&key()), CategoryState::Unloaded);
    }

    #[test]
    fn test_abandon_keeps_newer_fetch() {
        let cache = FilterCache::new();
        let old = cache.begin_fetch(key());
        cache.invalidate();
        let _new = cache.begin_fetch(key());

        cache.abandon(&old);
        assert_eq!(cache.state(&key()), CategoryState::Loading);
    }

    #[test]
    fn test_set_query_invalidates() {
        let cache = FilterCache::new();
        let ticket = cache.begin_fetch(key());
        cache.complete(&ticket, vec![node("a")]);

        let before = cache.generation();
        let after = cache.set_query("head");
        assert_eq!(after, before + 1);
        assert_eq!(cache.query(), "head");
        assert!(cache.has_filter());
        assert_eq!(cache.loaded_count(), 0);

        let ticket = cache.begin_fetch(key());
        assert_eq!(ticket.query, "head");
    }

    #[test]
    fn test_append_only_to_loaded() {
        let cache = FilterCache::new();
        assert!(!cache.append(&key(), node("x")));
        assert_eq!(cache.state(&key()), CategoryState::Unloaded);

        let ticket = cache.begin_fetch(key());
        cache.complete(&ticket, vec![node("a")]);
        assert!(cache.append(&key(), node("b")));

        let names: Vec<_> = cache
            .get(&key())
            .unwrap()
            .into_iter()
            .map(|n| n.element.name)
            .collect();
        assert_eq!(names, ["a", "b"]);
    }
}
