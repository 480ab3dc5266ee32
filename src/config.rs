use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::cookies::PolicyKind;

pub const DEFAULT_USER_AGENT: &str = "netglue/0.1 (+https://crates.io/crates/netglue)";

/// Where cookies are kept.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CookieStoreConfig {
    /// No cookie handler is installed.
    Disabled,
    #[default]
    InMemory,
    /// Persisted to a JSON file.
    Json(PathBuf),
}

/// Where responses are cached.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheConfig {
    #[default]
    Disabled,
    InMemory,
    /// One file per entry under this directory.
    Directory(PathBuf),
}

/// Main networking configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetConfig {
    /// User agent string for HTTP requests
    pub user_agent: String,
    /// Policy installed in the cookie manager
    pub cookie_policy: PolicyKind,
    pub cookie_store: CookieStoreConfig,
    pub cache: CacheConfig,
    /// Per-request timeout; `None` waits forever
    pub request_timeout: Option<Duration>,
}

impl Default for NetConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            cookie_policy: PolicyKind::default(),
            cookie_store: CookieStoreConfig::default(),
            cache: CacheConfig::default(),
            request_timeout: Some(Duration::from_secs(30)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = NetConfig::default();
        assert_eq!(config.user_agent, DEFAULT_USER_AGENT);
        assert_eq!(config.cookie_policy, PolicyKind::AcceptOriginalServer);
        assert_eq!(config.cookie_store, CookieStoreConfig::InMemory);
        assert_eq!(config.cache, CacheConfig::Disabled);
        assert_eq!(config.request_timeout, Some(Duration::from_secs(30)));
    }

    #[test]
    fn partial_json_fills_in_defaults() {
        let config: NetConfig = serde_json::from_str(
            r#"{"cookie_policy":"accept_all","cache":{"directory":"/tmp/netglue"}}"#,
        )
        .unwrap();
        assert_eq!(config.cookie_policy, PolicyKind::AcceptAll);
        assert_eq!(config.cache, CacheConfig::Directory(PathBuf::from("/tmp/netglue")));
        assert_eq!(config.cookie_store, CookieStoreConfig::InMemory);
        assert_eq!(config.user_agent, DEFAULT_USER_AGENT);
    }
}
