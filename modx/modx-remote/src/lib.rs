//! HTTP transport for the MODX elements API.
//!
//! A [`RemoteContentClient`] is bound to one site: it resolves the site's API
//! endpoint, attaches the bearer credential when one is configured, and maps
//! element operations onto `GET`/`POST`/`PUT` calls. Every response is
//! returned as an [`Envelope`] for the caller to interpret.

pub mod client;
pub mod envelope;

pub use client::{RemoteContentClient, UpdateFields, api_base};
pub use envelope::{Envelope, GENERIC_FAILURE};
