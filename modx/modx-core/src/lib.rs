//! Core types and abstractions for the modx elements tooling.
//!
//! This crate provides the data model (sites, content types, elements), the
//! error type, the collaborator traits the engine consumes (site store,
//! credential store, notifier), configuration, and simple file-backed
//! implementations of the stores.

pub mod config;
pub mod error;
pub mod notify;
pub mod store;
pub mod traits;
pub mod types;

pub use config::{ClientOptions, ModxConfig};
pub use error::{ModxError, Result};
pub use notify::{MemoryNotifier, TracingNotifier};
pub use store::{CredentialFile, JsonSiteStore};
pub use traits::{CredentialStore, Notifier, NotifyLevel, SiteStore};
pub use types::*;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::{ClientOptions, ModxConfig};
    pub use crate::error::{ModxError, Result};
    pub use crate::traits::{CredentialStore, Notifier, NotifyLevel, SiteStore};
    pub use crate::types::{ContentType, ElementDescriptor, SiteDescriptor};
}
