//! Core types shared by the remote client, the virtual filesystem and the tree.

use crate::error::{ModxError, Result};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Extension used for element kinds that hold PHP code.
pub const SCRIPT_EXTENSION: &str = "php";

/// Extension used for element kinds that hold markup.
pub const MARKUP_EXTENSION: &str = "html";

/// The four kinds of content a MODX site exposes.
///
/// The serialized form is the literal class token, which doubles as the
/// remote API's collection name and as the second segment of a virtual path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ContentType {
    #[serde(rename = "modSnippet")]
    Snippet,
    #[serde(rename = "modChunk")]
    Chunk,
    #[serde(rename = "modTemplate")]
    Template,
    #[serde(rename = "modPlugin")]
    Plugin,
}

impl ContentType {
    /// All content types in tree order.
    pub const ALL: [ContentType; 4] = [
        ContentType::Snippet,
        ContentType::Chunk,
        ContentType::Template,
        ContentType::Plugin,
    ];

    /// Literal token used in paths and API routes.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Snippet => "modSnippet",
            Self::Chunk => "modChunk",
            Self::Template => "modTemplate",
            Self::Plugin => "modPlugin",
        }
    }

    /// Virtual file extension, without the dot.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Snippet | Self::Plugin => SCRIPT_EXTENSION,
            Self::Chunk | Self::Template => MARKUP_EXTENSION,
        }
    }

    /// Plural label shown on category nodes.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Snippet => "Snippets",
            Self::Chunk => "Chunks",
            Self::Template => "Templates",
            Self::Plugin => "Plugins",
        }
    }

    /// Icon hint for category nodes.
    pub fn icon(&self) -> &'static str {
        match self {
            Self::Snippet => "code",
            Self::Chunk => "extensions",
            Self::Template => "split-vertical",
            Self::Plugin => "gear",
        }
    }

    /// Lowercase singular noun ("snippet", "chunk", ...).
    pub fn noun(&self) -> &'static str {
        match self {
            Self::Snippet => "snippet",
            Self::Chunk => "chunk",
            Self::Template => "template",
            Self::Plugin => "plugin",
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentType {
    type Err = ModxError;

    fn from_str(s: &str) -> Result<Self> {
        if let Some(found) = Self::ALL.iter().find(|t| t.as_str() == s) {
            return Ok(*found);
        }
        match s.to_lowercase().as_str() {
            "snippet" | "snippets" => Ok(Self::Snippet),
            "chunk" | "chunks" => Ok(Self::Chunk),
            "template" | "templates" => Ok(Self::Template),
            "plugin" | "plugins" => Ok(Self::Plugin),
            _ => Err(ModxError::invalid_input(format!(
                "Unknown content type '{}'. Must be one of: modSnippet, modChunk, modTemplate, modPlugin",
                s
            ))),
        }
    }
}

/// One configured remote site.
///
/// Stored as a record of the flat `sites.json` list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteDescriptor {
    /// Unique name, also the first segment of every virtual path
    pub name: String,

    /// Public site URL
    pub base_url: String,

    /// API endpoint, absolute or relative to `base_url`
    pub api_url: String,

    /// Content types shown in the tree; all four when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elements: Option<Vec<ContentType>>,

    /// Key of the bearer token in the credential store
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_key: Option<String>,
}

impl SiteDescriptor {
    /// Create a descriptor with every content type enabled and no credential.
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        api_url: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            base_url: base_url.into(),
            api_url: api_url.into(),
            elements: None,
            token_key: None,
        }
    }

    /// Restrict the enabled content types.
    pub fn with_elements(mut self, elements: Vec<ContentType>) -> Self {
        self.elements = Some(elements);
        self
    }

    /// Attach a credential key.
    pub fn with_token_key(mut self, key: impl Into<String>) -> Self {
        self.token_key = Some(key.into());
        self
    }

    /// Content types to show under this site, in configured order.
    pub fn enabled_types(&self) -> Vec<ContentType> {
        match &self.elements {
            Some(types) => types.clone(),
            None => ContentType::ALL.to_vec(),
        }
    }

    /// Whether `api_url` is a full URL rather than a path below `base_url`.
    pub fn has_absolute_api_url(&self) -> bool {
        let lower = self.api_url.trim().to_ascii_lowercase();
        lower.starts_with("http://") || lower.starts_with("https://")
    }

    /// Check the invariants the path codec and the store rely on.
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(ModxError::invalid_input("Site name must not be empty"));
        }
        if let Some(bad) = self.name.chars().find(|c| !is_unreserved(*c)) {
            return Err(ModxError::invalid_input(format!(
                "Site name '{}' contains {:?}; use letters, digits, '-', '.', '_' or '~'",
                self.name, bad
            )));
        }
        if self.name == "." || self.name == ".." {
            return Err(ModxError::invalid_input(format!(
                "Site name '{}' is not a usable path segment",
                self.name
            )));
        }
        if self.api_url.trim().is_empty() {
            return Err(ModxError::invalid_input(format!(
                "Site '{}' has no API URL",
                self.name
            )));
        }
        if self.base_url.trim().is_empty() && !self.has_absolute_api_url() {
            return Err(ModxError::invalid_input(format!(
                "Site '{}' needs a base URL when the API URL is relative",
                self.name
            )));
        }
        Ok(())
    }
}

/// URI characters that never need escaping in a path segment.
fn is_unreserved(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | '_' | '~')
}

/// An element as returned by the remote API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementDescriptor {
    #[serde(deserialize_with = "lenient_id")]
    pub id: u64,

    #[serde(default, deserialize_with = "lenient_name")]
    pub name: String,

    #[serde(
        default,
        deserialize_with = "lenient_content",
        skip_serializing_if = "Option::is_none"
    )]
    pub content: Option<String>,

    #[serde(
        rename = "type",
        default,
        deserialize_with = "lenient_content_type",
        skip_serializing_if = "Option::is_none"
    )]
    pub content_type: Option<ContentType>,
}

impl ElementDescriptor {
    pub fn new(id: u64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            content: None,
            content_type: None,
        }
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    pub fn with_type(mut self, content_type: ContentType) -> Self {
        self.content_type = Some(content_type);
        self
    }
}

/// Accepts `12` as well as `"12"`; MODX processors are not consistent.
fn lenient_id<'de, D>(deserializer: D) -> std::result::Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    match Value::deserialize(deserializer)? {
        Value::Number(n) => n
            .as_u64()
            .ok_or_else(|| D::Error::custom(format!("invalid element id {}", n))),
        Value::String(s) => s
            .trim()
            .parse()
            .map_err(|_| D::Error::custom(format!("invalid element id '{}'", s))),
        other => Err(D::Error::custom(format!("invalid element id {}", other))),
    }
}

/// A null or missing name reads as empty; other scalars use their JSON text.
fn lenient_name<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(value_text(Option::<Value>::deserialize(deserializer)?).unwrap_or_default())
}

/// Non-string content uses its JSON text, matching how single reads treat it.
fn lenient_content<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(value_text(Option::<Value>::deserialize(deserializer)?))
}

fn value_text(raw: Option<Value>) -> Option<String> {
    match raw? {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}

/// An unknown or non-string type tag becomes `None` instead of failing the listing.
fn lenient_content_type<'de, D>(deserializer: D) -> std::result::Result<Option<ContentType>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(raw
        .as_ref()
        .and_then(Value::as_str)
        .and_then(|s| s.parse().ok()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_by_type() {
        assert_eq!(ContentType::Snippet.extension(), "php");
        assert_eq!(ContentType::Plugin.extension(), "php");
        assert_eq!(ContentType::Chunk.extension(), "html");
        assert_eq!(ContentType::Template.extension(), "html");
    }

    #[test]
    fn test_content_type_parse() {
        assert_eq!("modChunk".parse::<ContentType>().unwrap(), ContentType::Chunk);
        assert_eq!("Snippet".parse::<ContentType>().unwrap(), ContentType::Snippet);
        assert_eq!("templates".parse::<ContentType>().unwrap(), ContentType::Template);
        assert!("modResource".parse::<ContentType>().is_err());
        assert!("modchunk".parse::<ContentType>().is_err());
    }

    #[test]
    fn test_content_type_serde_uses_tokens() {
        let json = serde_json::to_string(&ContentType::Template).unwrap();
        assert_eq!(json, "\"modTemplate\"");
        let back: ContentType = serde_json::from_str("\"modPlugin\"").unwrap();
        assert_eq!(back, ContentType::Plugin);
    }

    #[test]
    fn test_site_descriptor_camel_case() {
        let json = r#"{
            "name": "main",
            "baseUrl": "https://example.com",
            "apiUrl": "vscode-api",
            "elements": ["modChunk", "modSnippet"],
            "tokenKey": "modx.main"
        }"#;
        let site: SiteDescriptor = serde_json::from_str(json).unwrap();
        assert_eq!(site.enabled_types(), vec![ContentType::Chunk, ContentType::Snippet]);
        assert_eq!(site.token_key.as_deref(), Some("modx.main"));

        let out = serde_json::to_value(&site).unwrap();
        assert_eq!(out["baseUrl"], "https://example.com");
    }

    #[test]
    fn test_enabled_types_default_to_all() {
        let site = SiteDescriptor::new("a", "https://a.test", "api");
        assert_eq!(site.enabled_types(), ContentType::ALL.to_vec());
    }

    #[test]
    fn test_site_validation() {
        assert!(SiteDescriptor::new("main", "https://a.test", "api").validate().is_ok());
        assert!(SiteDescriptor::new("", "https://a.test", "api").validate().is_err());
        assert!(SiteDescriptor::new("a/b", "https://a.test", "api").validate().is_err());
        assert!(SiteDescriptor::new("a b", "https://a.test", "api").validate().is_err());
        for bad in ["a#b", "a?b", "a%20b", ".", "..", "ä", "a:b"] {
            assert!(
                SiteDescriptor::new(bad, "https://a.test", "api").validate().is_err(),
                "{bad:?} should be rejected"
            );
        }
        for good in ["my-site_2", "v1.2", "~home", ".hidden"] {
            assert!(SiteDescriptor::new(good, "https://a.test", "api").validate().is_ok());
        }
        assert!(SiteDescriptor::new("main", "", "api").validate().is_err());
        assert!(SiteDescriptor::new("main", "", "https://a.test/api").validate().is_ok());
    }

    #[test]
    fn test_element_descriptor_is_lenient() {
        let json = r#"[
            {"id": 3, "name": "Header", "content": "<h1>", "type": "modChunk"},
            {"id": "4", "name": "Footer", "type": "somethingElse"},
            {"id": 5, "name": "Nav", "type": null}
        ]"#;
        let list: Vec<ElementDescriptor> = serde_json::from_str(json).unwrap();
        assert_eq!(list[0].content_type, Some(ContentType::Chunk));
        assert_eq!(list[1].id, 4);
        assert_eq!(list[1].content_type, None);
        assert_eq!(list[1].content, None);
        assert_eq!(list[2].content_type, None);
    }

    #[test]
    fn test_odd_rows_do_not_fail_the_listing() {
        let json = r#"[
            {"id": 1, "name": "Header", "content": 42},
            {"id": 2, "name": null, "content": {"html": "<p>"}},
            {"id": 3, "content": null},
            {"id": 4, "name": 17, "content": "ok"}
        ]"#;
        let list: Vec<ElementDescriptor> = serde_json::from_str(json).unwrap();
        assert_eq!(list.len(), 4);
        assert_eq!(list[0].content.as_deref(), Some("42"));
        assert_eq!(list[1].name, "");
        assert_eq!(list[1].content.as_deref(), Some(r#"{"html":"<p>"}"#));
        assert_eq!(list[2].name, "");
        assert_eq!(list[2].content, None);
        assert_eq!(list[3].name, "17");
    }

    #[test]
    fn test_element_descriptor_rejects_bad_id() {
        let json = r#"{"id": "abc", "name": "x"}"#;
        assert!(serde_json::from_str::<ElementDescriptor>(json).is_err());
    }
}
