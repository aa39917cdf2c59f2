//! Metadata URL policy.

use eidas_core::config::MetadataConfig;
use url::Url;

use crate::error::{MetadataError, MetadataResult};

/// Decides which metadata URLs may be fetched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlPolicy {
    require_https: bool,
    whitelist: Vec<String>,
}

impl Default for UrlPolicy {
    fn default() -> Self {
        Self {
            require_https: true,
            whitelist: Vec::new(),
        }
    }
}

impl UrlPolicy {
    /// Builds the policy from configuration.
    #[must_use]
    pub fn from_config(config: &MetadataConfig) -> Self {
        Self {
            require_https: config.require_https,
            whitelist: config
                .whitelist
                .iter()
                .map(|u| u.trim().to_string())
                .filter(|u| !u.is_empty())
                .collect(),
        }
    }

    /// Sets whether `https` is mandatory.
    #[must_use]
    pub const fn require_https(mut self, require: bool) -> Self {
        self.require_https = require;
        self
    }

    /// Restricts fetching to the given URLs.
    #[must_use]
    pub fn whitelist(mut self, urls: Vec<String>) -> Self {
        self.whitelist = urls;
        self
    }

    /// Checks `url` against the policy.
    ///
    /// # Errors
    ///
    /// Returns [`MetadataError::InvalidSource`] if the URL is malformed, uses
    /// a disallowed scheme or is not whitelisted.
    pub fn check(&self, url: &str) -> MetadataResult<Url> {
        let parsed = Url::parse(url)
            .map_err(|e| MetadataError::InvalidSource(format!("{url:?} is not a URL: {e}")))?;

        match parsed.scheme() {
            "https" => {}
            "http" if !self.require_https => {}
            scheme => {
                return Err(MetadataError::InvalidSource(format!(
                    "scheme {scheme:?} not allowed for {url}"
                )));
            }
        }

        if !self.whitelist.is_empty() && !self.whitelist.iter().any(|allowed| allowed == url) {
            return Err(MetadataError::InvalidSource(format!("{url} is not whitelisted")));
        }

        Ok(parsed)
    }
}
