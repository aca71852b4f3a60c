//! Virtual filesystem over remote MODX elements.
//!
//! - [`Address`]: the `{site, type, id, name}` identity behind a virtual
//!   path, with a lossless encode/decode pair.
//! - [`ModxFileSystem`]: a [`FileSystemProvider`] whose reads and writes go
//!   straight to the site's API.
//!
//! # Example
//!
//! ```no_run
//! use modx_core::{ClientOptions, SiteDescriptor, TracingNotifier};
//! use modx_vfs::{FileSystemProvider, ModxFileSystem};
//! use std::collections::HashMap;
//! use std::sync::Arc;
//!
//! # async fn example() -> modx_core::Result<()> {
//! let sites = vec![SiteDescriptor::new("main", "https://example.com", "vscode-api")];
//! let fs = ModxFileSystem::new(
//!     Arc::new(sites),
//!     Arc::new(HashMap::<String, String>::new()),
//!     Arc::new(TracingNotifier),
//!     ClientOptions::default(),
//! );
//!
//! let body = fs.read_file("modx:/main/modChunk/3/header.html").await?;
//! println!("{}", String::from_utf8_lossy(&body));
//! # Ok(())
//! # }
//! ```

pub mod address;
pub mod filesystem;

pub use address::{Address, SCHEME, decode, encode};
pub use filesystem::{
    FileChangeEvent, FileChangeType, FileStat, FileSystemProvider, FileType, ModxFileSystem,
    WriteOptions, WriteOutcome,
};
