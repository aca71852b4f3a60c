//! Per-site HTTP client for the MODX elements API.

use crate::envelope::Envelope;
use modx_core::config::ClientOptions;
use modx_core::error::{ModxError, Result};
use modx_core::traits::CredentialStore;
use modx_core::types::{ContentType, SiteDescriptor};
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue, LOCATION};
use reqwest::{RequestBuilder, redirect};
use serde::Serialize;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, warn};

/// Upper bound for a connection check, independent of the client timeout.
const PING_TIMEOUT: Duration = Duration::from_secs(2);

/// Body of an update request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpdateFields {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

impl UpdateFields {
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: Some(content.into()),
        }
    }

    /// Only the name; used for renames.
    pub fn rename(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: None,
        }
    }
}

/// Effective API endpoint of a site, always ending in exactly one `/`.
///
/// An absolute `api_url` is used as-is; a relative one is joined below
/// `base_url`.
pub fn api_base(site: &SiteDescriptor) -> String {
    if site.has_absolute_api_url() {
        return format!("{}/", site.api_url.trim().trim_end_matches('/'));
    }

    let base = site.base_url.trim().trim_end_matches('/');
    let path = site.api_url.trim().trim_matches('/');
    if path.is_empty() {
        format!("{}/", base)
    } else {
        format!("{}/{}/", base, path)
    }
}

/// Transport bound to one site's endpoint and credential.
///
/// Cheap to build; callers construct one per operation so configuration
/// changes apply on the next call.
#[derive(Debug, Clone)]
pub struct RemoteContentClient {
    http: reqwest::Client,
    base: String,
    site_name: String,
}

impl RemoteContentClient {
    /// Build a client from a site and an already resolved credential.
    pub fn new(
        site: &SiteDescriptor,
        credential: Option<String>,
        options: &ClientOptions,
    ) -> Result<Self> {
        let mut headers = HeaderMap::new();
        if let Some(token) = credential.filter(|t| !t.is_empty()) {
            let mut value = HeaderValue::from_str(&format!("Bearer {}", token)).map_err(|_| {
                ModxError::invalid_input(format!(
                    "Credential for site '{}' contains characters not allowed in a header",
                    site.name
                ))
            })?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let policy = if options.follow_redirects {
            redirect::Policy::default()
        } else {
            redirect::Policy::none()
        };

        let mut builder = reqwest::Client::builder()
            .timeout(options.timeout)
            .redirect(policy)
            .default_headers(headers);
        if let Some(agent) = &options.user_agent {
            builder = builder.user_agent(agent.clone());
        }

        let http = builder
            .build()
            .map_err(|e| ModxError::remote(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base: api_base(site),
            site_name: site.name.clone(),
        })
    }

    /// Build a client, looking the site's credential up in `credentials`.
    pub async fn for_site(
        site: &SiteDescriptor,
        credentials: &dyn CredentialStore,
        options: &ClientOptions,
    ) -> Result<Self> {
        let credential = match &site.token_key {
            Some(key) => {
                let token = credentials.get_credential(key).await;
                if token.is_none() {
                    debug!("No credential stored under '{}' for site {}", key, site.name);
                }
                token
            }
            None => None,
        };
        Self::new(site, credential, options)
    }

    /// Endpoint all routes are resolved against.
    pub fn base_url(&self) -> &str {
        &self.base
    }

    pub fn site_name(&self) -> &str {
        &self.site_name
    }

    /// GET `{base}{type}/{id}`
    pub async fn fetch_one(&self, content_type: ContentType, id: u64) -> Result<Envelope> {
        let url = self.element_url(content_type, id);
        debug!("Fetching {} from {}", url, self.site_name);
        self.send(self.http.get(&url), &url).await
    }

    /// GET `{base}{type}`
    pub async fn fetch_many(&self, content_type: ContentType) -> Result<Envelope> {
        let url = self.collection_url(content_type);
        debug!("Listing {} from {}", url, self.site_name);
        let request = self
            .http
            .get(&url)
            .query(&[("type", content_type.as_str())]);
        self.send(request, &url).await
    }

    /// POST `{base}{type}` with `{name}`
    pub async fn create(&self, content_type: ContentType, name: &str) -> Result<Envelope> {
        let url = self.collection_url(content_type);
        debug!("Creating {} '{}' on {}", content_type, name, self.site_name);
        let request = self.http.post(&url).json(&json!({ "name": name }));
        self.send(request, &url).await
    }

    /// PUT `{base}{type}/{id}` with `fields`
    pub async fn update(
        &self,
        content_type: ContentType,
        id: u64,
        fields: &UpdateFields,
    ) -> Result<Envelope> {
        let url = self.element_url(content_type, id);
        debug!("Updating {} on {}", url, self.site_name);
        self.send(self.http.put(&url).json(fields), &url).await
    }

    /// Rename an element; an update carrying only the name.
    pub async fn rename(&self, content_type: ContentType, id: u64, name: &str) -> Result<Envelope> {
        self.update(content_type, id, &UpdateFields::rename(name)).await
    }

    /// GET `{base}ping`; returns the HTTP status of whatever answered.
    ///
    /// Any response counts as reachable, so callers decide what a 404 means.
    pub async fn ping(&self) -> Result<u16> {
        let url = format!("{}ping", self.base);
        debug!("Pinging {}", url);
        let response = self
            .http
            .get(&url)
            .timeout(PING_TIMEOUT)
            .send()
            .await
            .map_err(|e| transport_error(e, &url))?;
        Ok(response.status().as_u16())
    }

    fn collection_url(&self, content_type: ContentType) -> String {
        format!("{}{}", self.base, content_type.as_str())
    }

    fn element_url(&self, content_type: ContentType, id: u64) -> String {
        format!("{}{}/{}", self.base, content_type.as_str(), id)
    }

    async fn send(&self, request: RequestBuilder, url: &str) -> Result<Envelope> {
        let response = request.send().await.map_err(|e| transport_error(e, url))?;
        let status = response.status();

        if status.is_redirection() {
            let location = response
                .headers()
                .get(LOCATION)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            warn!(
                "Redirect from {}: status {}, location {:?}",
                url,
                status.as_u16(),
                location
            );
            return Err(ModxError::Redirect {
                status: status.as_u16(),
                location,
            });
        }

        let body = response.bytes().await.map_err(|e| transport_error(e, url))?;

        // Business errors come back as 4xx with an envelope; keep those.
        match serde_json::from_slice::<Envelope>(&body) {
            Ok(envelope) => {
                if !status.is_success() {
                    debug!("{} answered {} with an envelope", url, status);
                }
                Ok(envelope)
            }
            Err(e) if status.is_success() => Err(ModxError::remote(format!(
                "Invalid response from {}: {}",
                url, e
            ))),
            Err(_) => Err(ModxError::remote(format!("HTTP {} from {}", status, url))),
        }
    }
}

fn transport_error(err: reqwest::Error, url: &str) -> ModxError {
    if err.is_timeout() {
        ModxError::timeout(format!("Request to {} timed out", url))
    } else {
        ModxError::remote(format!("Request to {} failed: {}", url, err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_base_relative() {
        let site = SiteDescriptor::new("a", "https://example.com/", "/vscode-api/");
        assert_eq!(api_base(&site), "https://example.com/vscode-api/");

        let nested = SiteDescriptor::new("a", "https://example.com", "assets/api");
        assert_eq!(api_base(&nested), "https://example.com/assets/api/");
    }

    #[test]
    fn test_api_base_absolute() {
        let site = SiteDescriptor::new("a", "https://ignored.test", "https://api.example.com/v1///");
        assert_eq!(api_base(&site), "https://api.example.com/v1/");

        let upper = SiteDescriptor::new("a", "", "HTTP://api.example.com");
        assert_eq!(api_base(&upper), "HTTP://api.example.com/");
    }

    #[test]
    fn test_api_base_empty_path() {
        let site = SiteDescriptor::new("a", "https://example.com//", "/");
        assert_eq!(api_base(&site), "https://example.com/");
    }

    #[test]
    fn test_update_fields_serialization() {
        let full = serde_json::to_value(UpdateFields::new("Header", "<h1>")).unwrap();
        assert_eq!(full, json!({"name": "Header", "content": "<h1>"}));

        let rename = serde_json::to_value(UpdateFields::rename("Footer")).unwrap();
        assert_eq!(rename, json!({"name": "Footer"}));
    }

    #[test]
    fn test_header_rejects_newlines() {
        let site = SiteDescriptor::new("a", "https://example.com", "api");
        let result = RemoteContentClient::new(
            &site,
            Some("bad\ntoken".to_string()),
            &ClientOptions::default(),
        );
        assert!(result.is_err());
    }
}
