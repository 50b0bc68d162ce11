//! Authenticated HTTP client for SharePoint REST and Microsoft Graph.

use std::time::Duration;

use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tracing::{debug, info, trace};

use peoplehub_core::logging::STATUS;
use peoplehub_core::{Error, Result};

use crate::config::ClientConfig;

/// Accept header for SharePoint REST calls: flat JSON with a `value` array.
pub const SHAREPOINT_ACCEPT: &str = "application/json;odata=nometadata";

/// Binary body of a successful response plus its declared content type.
#[derive(Debug, Clone)]
pub struct BinaryBody {
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// Which token a request carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Api {
    SharePoint,
    Graph,
}

/// HTTP client shared by the membership and search services. Cheap to clone.
#[derive(Debug, Clone)]
pub struct SharePointClient {
    client: Client,
    config: ClientConfig,
}

impl SharePointClient {
    /// Create a client with the given configuration.
    pub fn new(config: ClientConfig) -> Result<Self> {
        config.validate()?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        info!(
            "Initializing SharePoint client: site={}, graph={}",
            config.site_url, config.graph_url
        );

        Ok(Self { client, config })
    }

    /// Create from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::new(ClientConfig::from_env()?)
    }

    /// Get the current configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Absolute URL for a site-relative REST path (`/_api/...`).
    pub fn site_url(&self, path: &str) -> String {
        format!("{}{}", self.config.site_base(), path)
    }

    /// Absolute Graph URL for `version`, with each entry of `segments`
    /// percent-encoded as a single path segment.
    ///
    /// Directory ids can carry `#`, `/` or `?` (guest accounts look like
    /// `john_gmail.com#EXT#@tenant.onmicrosoft.com`).
    pub fn graph_segments_url(&self, version: &str, segments: &[&str]) -> Result<String> {
        let base = format!("{}/{}", self.config.graph_base(), version);
        let mut url = reqwest::Url::parse(&base)
            .map_err(|e| Error::Config(format!("Invalid graph url '{}': {}", base, e)))?;
        url.path_segments_mut()
            .map_err(|_| Error::Config(format!("Graph url '{}' cannot take a path", base)))?
            .extend(segments);
        Ok(url.to_string())
    }

    fn build_get(&self, api: Api, url: &str) -> RequestBuilder {
        let mut req = self.client.get(url);
        let token = match api {
            Api::SharePoint => {
                req = req.header(ACCEPT, SHAREPOINT_ACCEPT);
                self.config.sharepoint_token.as_ref()
            }
            Api::Graph => self.config.graph_token.as_ref(),
        };
        if let Some(token) = token {
            req = req.header(AUTHORIZATION, format!("Bearer {}", token));
        }
        req
    }

    /// GET a SharePoint REST URL and decode its JSON body.
    pub async fn get_sharepoint_json<T: DeserializeOwned>(
        &self,
        url: &str,
        headers: &[(&str, &str)],
    ) -> Result<T> {
        let mut req = self.build_get(Api::SharePoint, url);
        for (name, value) in headers {
            req = req.header(*name, *value);
        }
        let response = send(req, url).await?;
        decode_json(response, url).await
    }

    /// GET a Graph URL and decode its JSON body.
    pub async fn get_graph_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let req = self
            .build_get(Api::Graph, url)
            .header(ACCEPT, "application/json");
        let response = send(req, url).await?;
        decode_json(response, url).await
    }

    /// GET a Graph URL and return the raw body.
    pub async fn get_graph_bytes(&self, url: &str) -> Result<BinaryBody> {
        let response = send(self.build_get(Api::Graph, url), url).await?;
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_string());
        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::remote(endpoint_of(url), format!("Failed to read body: {}", e)))?;
        trace!(len = bytes.len(), "Binary body received");
        Ok(BinaryBody {
            content_type,
            bytes: bytes.to_vec(),
        })
    }
}

/// Path component of a URL, used to label errors without query strings.
pub(crate) fn endpoint_of(url: &str) -> String {
    match reqwest::Url::parse(url) {
        Ok(parsed) => parsed.path().to_string(),
        Err(_) => url.split('?').next().unwrap_or(url).to_string(),
    }
}

async fn send(req: RequestBuilder, url: &str) -> Result<Response> {
    let endpoint = endpoint_of(url);
    let response = req
        .send()
        .await
        .map_err(|e| Error::remote(&endpoint, format!("Request failed: {}", e)))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        debug!({ STATUS } = status.as_u16(), endpoint = %endpoint, "Remote call failed");
        let detail = body.trim();
        let message = if detail.is_empty() {
            format!("returned {}", status)
        } else {
            format!("returned {}: {}", status, truncate(detail, 200))
        };
        return Err(Error::remote(endpoint, message));
    }
    Ok(response)
}

async fn decode_json<T: DeserializeOwned>(response: Response, url: &str) -> Result<T> {
    let endpoint = endpoint_of(url);
    let text = response
        .text()
        .await
        .map_err(|e| Error::remote(&endpoint, format!("Failed to read body: {}", e)))?;
    serde_json::from_str(&text)
        .map_err(|e| Error::malformed(endpoint, format!("Failed to parse response: {}", e)))
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
