//! Virtual paths of remote elements.
//!
//! Every element is addressed as
//! `/<site>/<type>/<id>/<percent-encoded name>.<ext>`. The extension is
//! cosmetic: it follows from the content type so editors pick the right
//! language mode, and it is dropped again when decoding.

use modx_core::error::{ModxError, Result};
use modx_core::types::{ContentType, ElementDescriptor};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// URI scheme the filesystem is registered under.
pub const SCHEME: &str = "modx";

const SEGMENTS: usize = 4;

/// Decoded identity of one remote element.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Address {
    pub site_name: String,
    pub content_type: ContentType,
    pub id: u64,
    pub name: String,
}

impl Address {
    pub fn new(
        site_name: impl Into<String>,
        content_type: ContentType,
        id: u64,
        name: impl Into<String>,
    ) -> Self {
        Self {
            site_name: site_name.into(),
            content_type,
            id,
            name: name.into(),
        }
    }

    /// Address of an element listed under `content_type` on `site_name`.
    pub fn for_element(
        site_name: impl Into<String>,
        content_type: ContentType,
        element: &ElementDescriptor,
    ) -> Self {
        Self::new(site_name, content_type, element.id, element.name.clone())
    }

    /// Extension derived from the content type.
    pub fn extension(&self) -> &'static str {
        self.content_type.extension()
    }

    /// Last path segment: encoded name plus extension.
    pub fn file_name(&self) -> String {
        format!("{}.{}", urlencoding::encode(&self.name), self.extension())
    }

    /// Encode to a virtual path.
    pub fn encode(&self) -> String {
        encode(self)
    }

    /// Decode a virtual path.
    pub fn decode(path: &str) -> Result<Self> {
        decode(path)
    }

    /// Full URI form, `modx:/<path>`.
    pub fn to_uri(&self) -> String {
        format!("{}:{}", SCHEME, self.encode())
    }

    /// Decode either a bare path or a `modx:` URI.
    pub fn from_uri(uri: &str) -> Result<Self> {
        let path = uri
            .strip_prefix(SCHEME)
            .and_then(|rest| rest.strip_prefix(':'))
            .unwrap_or(uri);
        decode(path)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

impl FromStr for Address {
    type Err = ModxError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_uri(s)
    }
}

/// `/<site>/<type>/<id>/<encoded name>.<ext>`
pub fn encode(address: &Address) -> String {
    format!(
        "/{}/{}/{}/{}",
        address.site_name,
        address.content_type.as_str(),
        address.id,
        address.file_name()
    )
}

/// Parse a virtual path back into an [`Address`].
///
/// Fails with `MalformedAddress` unless the path has exactly four non-empty
/// segments after the leading `/`, a known content type token and a decimal
/// id.
pub fn decode(path: &str) -> Result<Address> {
    let rest = path
        .strip_prefix('/')
        .ok_or_else(|| ModxError::malformed(path, "path must start with '/'"))?;

    let segments: Vec<&str> = rest.split('/').collect();
    if segments.len() != SEGMENTS {
        return Err(ModxError::malformed(
            path,
            format!("expected {} segments, found {}", SEGMENTS, segments.len()),
        ));
    }
    if let Some(idx) = segments.iter().position(|s| s.is_empty()) {
        return Err(ModxError::malformed(
            path,
            format!("segment {} is empty", idx + 1),
        ));
    }

    let (site, type_token, id, file) = (segments[0], segments[1], segments[2], segments[3]);

    let content_type = ContentType::ALL
        .into_iter()
        .find(|t| t.as_str() == type_token)
        .ok_or_else(|| {
            ModxError::malformed(path, format!("unknown content type '{}'", type_token))
        })?;

    if !id.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ModxError::malformed(
            path,
            format!("id '{}' is not a non-negative integer", id),
        ));
    }
    let id: u64 = id
        .parse()
        .map_err(|_| ModxError::malformed(path, format!("id '{}' is out of range", id)))?;

    let name = urlencoding::decode(strip_extension(file))
        .map_err(|_| ModxError::malformed(path, "name is not valid UTF-8"))?
        .into_owned();

    Ok(Address {
        site_name: site.to_string(),
        content_type,
        id,
        name,
    })
}

/// Drop the last `.suffix`; a trailing bare dot is not an extension.
fn strip_extension(file: &str) -> &str {
    match file.rfind('.') {
        Some(idx) if idx + 1 < file.len() => &file[..idx],
        _ => file,
    }
}
