//! Connection configuration for the SharePoint and Graph clients.

use peoplehub_core::defaults::{
    ENV_EXPANSION_POLICY, ENV_GRAPH_TOKEN, ENV_GRAPH_URL, ENV_SHAREPOINT_TOKEN, ENV_SITE_URL,
    ENV_TIMEOUT, GRAPH_URL, TIMEOUT_SECS,
};
use peoplehub_core::{Error, ExpansionPolicy, Result};

/// Configuration shared by [`SharePointClient`](crate::SharePointClient) and the
/// services built on it.
#[derive(Clone)]
pub struct ClientConfig {
    /// Absolute URL of the SharePoint web, e.g. `https://contoso.sharepoint.com/sites/team`.
    pub site_url: String,
    /// Microsoft Graph host, without a version segment.
    pub graph_url: String,
    /// Bearer token for SharePoint REST calls.
    pub sharepoint_token: Option<String>,
    /// Bearer token for Graph calls.
    pub graph_token: Option<String>,
    /// Request timeout in seconds.
    pub timeout_seconds: u64,
    /// How failed directory-group expansions are handled.
    pub expansion_policy: ExpansionPolicy,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            site_url: String::new(),
            graph_url: GRAPH_URL.to_string(),
            sharepoint_token: None,
            graph_token: None,
            timeout_seconds: TIMEOUT_SECS,
            expansion_policy: ExpansionPolicy::default(),
        }
    }
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("site_url", &self.site_url)
            .field("graph_url", &self.graph_url)
            .field("sharepoint_token", &self.sharepoint_token.as_ref().map(|_| "***"))
            .field("graph_token", &self.graph_token.as_ref().map(|_| "***"))
            .field("timeout_seconds", &self.timeout_seconds)
            .field("expansion_policy", &self.expansion_policy)
            .finish()
    }
}

impl ClientConfig {
    /// Config for a site with every other field defaulted.
    pub fn for_site(site_url: impl Into<String>) -> Self {
        Self {
            site_url: site_url.into(),
            ..Default::default()
        }
    }

    /// Build from `PEOPLEHUB_*` environment variables.
    pub fn from_env() -> Result<Self> {
        let expansion_policy = match std::env::var(ENV_EXPANSION_POLICY) {
            Ok(v) if !v.trim().is_empty() => v.parse()?,
            _ => ExpansionPolicy::default(),
        };

        let config = Self {
            site_url: std::env::var(ENV_SITE_URL).unwrap_or_default(),
            graph_url: std::env::var(ENV_GRAPH_URL).unwrap_or_else(|_| GRAPH_URL.to_string()),
            sharepoint_token: std::env::var(ENV_SHAREPOINT_TOKEN)
                .ok()
                .filter(|t| !t.is_empty()),
            graph_token: std::env::var(ENV_GRAPH_TOKEN)
                .ok()
                .filter(|t| !t.is_empty()),
            timeout_seconds: std::env::var(ENV_TIMEOUT)
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(TIMEOUT_SECS),
            expansion_policy,
        };
        config.validate()?;
        Ok(config)
    }

    /// Check that the URLs are usable.
    pub fn validate(&self) -> Result<()> {
        if self.site_url.trim().is_empty() {
            return Err(Error::Config(format!("{} is not set", ENV_SITE_URL)));
        }
        for (name, url) in [("site url", &self.site_url), ("graph url", &self.graph_url)] {
            if !(url.starts_with("https://") || url.starts_with("http://")) {
                return Err(Error::Config(format!(
                    "{} must be an http(s) URL, got '{}'",
                    name, url
                )));
            }
        }
        if self.timeout_seconds == 0 {
            return Err(Error::Config("timeout must be positive".to_string()));
        }
        Ok(())
    }

    /// Site URL without a trailing slash.
    pub fn site_base(&self) -> &str {
        self.site_url.trim_end_matches('/')
    }

    /// Graph URL without a trailing slash.
    pub fn graph_base(&self) -> &str {
        self.graph_url.trim_end_matches('/')
    }
}
