//! Client configuration.
//!
//! The root key is shared with the server out of band; both sides must agree
//! on it. Values come from the environment (optionally via `.env`).

use graphnote_types::ItemKey;
use url::Url;

use crate::error::ConfigError;

/// Well-known key of the repository root.
pub const DEFAULT_ROOT_KEY: &str = "000000001vGeH72LxVtxKg";

/// Default server root; the graph endpoint is `<endpoint>graph/`.
pub const DEFAULT_ENDPOINT: &str = "http://localhost:8080/";

pub const ENV_ENDPOINT: &str = "GRAPHNOTE_ENDPOINT";
pub const ENV_ROOT_KEY: &str = "GRAPHNOTE_ROOT_KEY";
pub const ENV_DEPTH: &str = "GRAPHNOTE_DEPTH";

#[derive(Debug, Clone, PartialEq)]
pub struct GraphnoteConfig {
    /// Server root URL
    pub endpoint: String,

    /// Key of the repository root item
    pub root_key: ItemKey,

    /// Traversal depth of main-view reloads
    pub depth: usize,
}

impl Default for GraphnoteConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            root_key: ItemKey::from(DEFAULT_ROOT_KEY),
            depth: 1,
        }
    }
}

impl GraphnoteConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from any variable source; unset variables keep their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(endpoint) = lookup(ENV_ENDPOINT) {
            config = config.with_endpoint(&endpoint)?;
        }
        if let Some(root_key) = lookup(ENV_ROOT_KEY) {
            config = config.with_root_key(ItemKey::from(root_key));
        }
        if let Some(depth) = lookup(ENV_DEPTH) {
            let parsed = depth
                .parse::<usize>()
                .ok()
                .filter(|d| *d > 0)
                .ok_or(ConfigError::InvalidDepth { value: depth })?;
            config = config.with_depth(parsed);
        }

        Ok(config)
    }

    pub fn with_endpoint(mut self, endpoint: &str) -> Result<Self, ConfigError> {
        Url::parse(endpoint).map_err(|source| ConfigError::InvalidEndpoint {
            value: endpoint.to_string(),
            source,
        })?;
        self.endpoint = endpoint.to_string();
        Ok(self)
    }

    pub fn with_root_key(mut self, root_key: ItemKey) -> Self {
        self.root_key = root_key;
        self
    }

    pub fn with_depth(mut self, depth: usize) -> Self {
        self.depth = depth.max(1);
        self
    }
}
