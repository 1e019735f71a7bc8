//! Page catalog resolution.
//!
//! Before answering a chat message, SiteChat asks the catalog service which
//! pages currently ground the assistant. The service returns a JSON object of
//! page name → URL; key order is kept and drives fetch order downstream.

use std::time::Duration;

use reqwest::{Client, Response};
use serde_json::{Map, Value};
use tracing::{debug, info, instrument};

use sitechat_shared::{CatalogConfig, PageCatalog, Result, SiteChatError};

/// User-Agent string for catalog requests.
const USER_AGENT: &str = concat!("SiteChat/", env!("CARGO_PKG_VERSION"));

/// Maximum catalog payload we accept (1 MB).
const MAX_CATALOG_SIZE: u64 = 1024 * 1024;

// ---------------------------------------------------------------------------
// CatalogSource
// ---------------------------------------------------------------------------

/// Anything that can produce the current page catalog.
///
/// Every failure is reported as [`SiteChatError::UpstreamUnavailable`].
#[async_trait::async_trait]
pub trait CatalogSource: Send + Sync {
    async fn resolve(&self) -> Result<PageCatalog>;
}

// ---------------------------------------------------------------------------
// CatalogClient
// ---------------------------------------------------------------------------

/// Reads the catalog from a remote HTTP endpoint, once per call. No caching.
#[derive(Debug, Clone)]
pub struct CatalogClient {
    client: Client,
    url: String,
}

impl CatalogClient {
    /// Build a client for the configured catalog endpoint.
    pub fn new(config: &CatalogConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| {
                SiteChatError::config(format!("failed to build catalog HTTP client: {e}"))
            })?;

        Ok(Self {
            client,
            url: config.url.clone(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait::async_trait]
impl CatalogSource for CatalogClient {
    #[instrument(skip_all, fields(url = %self.url))]
    async fn resolve(&self) -> Result<PageCatalog> {
        debug!("resolving page catalog");

        let response = self.client.get(&self.url).send().await.map_err(|e| {
            SiteChatError::UpstreamUnavailable(format!("error fetching selected pages: {e}"))
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(SiteChatError::UpstreamUnavailable(format!(
                "failed to fetch selected pages: HTTP {status}"
            )));
        }

        let body = read_body(response).await?;

        let catalog = parse_catalog(&body)?;
        info!(pages = catalog.len(), "page catalog resolved");
        Ok(catalog)
    }
}

/// Read the catalog body, failing as soon as it passes [`MAX_CATALOG_SIZE`].
async fn read_body(mut response: Response) -> Result<String> {
    let too_large = || {
        SiteChatError::UpstreamUnavailable(format!(
            "catalog response too large (max {MAX_CATALOG_SIZE} bytes)"
        ))
    };

    if response.content_length().is_some_and(|len| len > MAX_CATALOG_SIZE) {
        return Err(too_large());
    }

    let mut body = Vec::new();
    while let Some(chunk) = response.chunk().await.map_err(|e| {
        SiteChatError::UpstreamUnavailable(format!("failed to read catalog body: {e}"))
    })? {
        if (body.len() + chunk.len()) as u64 > MAX_CATALOG_SIZE {
            return Err(too_large());
        }
        body.extend_from_slice(&chunk);
    }

    String::from_utf8(body).map_err(|e| {
        SiteChatError::UpstreamUnavailable(format!("catalog body is not UTF-8: {e}"))
    })
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Parse a catalog payload: a JSON object whose values are all URL strings.
pub fn parse_catalog(body: &str) -> Result<PageCatalog> {
    let object: Map<String, Value> = serde_json::from_str(body).map_err(|e| {
        SiteChatError::UpstreamUnavailable(format!("catalog is not a JSON object: {e}"))
    })?;

    let mut catalog = PageCatalog::new();
    for (name, value) in object {
        match value {
            Value::String(url) => catalog.insert(name, url),
            other => {
                return Err(SiteChatError::UpstreamUnavailable(format!(
                    "catalog entry {name:?} is not a URL string: {other}"
                )));
            }
        }
    }
    Ok(catalog)
}
