//! Cookie store infrastructure.
//!
//! A **cookie store** keeps the cookies a handler accepted and hands back the ones
//! that apply to a URL. Cookies are filed under a normalized URL key: the scheme is
//! always `http` and port, path, user info, query and fragment are dropped, so
//! `https://user@a.com:8443/x?q` is filed as `http://a.com`.
//!
//! Two implementations ship with the crate:
//! - [`InMemoryCookieStore`]: lock-protected, lives as long as the process.
//! - [`JsonCookieStore`]: same semantics, persisted to one JSON file after every
//!   mutation.
//!
//! ## Semantics shared by both
//! - Adding a cookie with the same identity (name, domain, path) as an existing one
//!   under the same key replaces it and moves it to the end.
//! - Adding an already expired cookie deletes the cookie of the same identity and
//!   stores nothing. Servers delete cookies this way.
//! - `get(url)` returns cookies whose domain matches the URL host plus host-only
//!   cookies filed under that host. Expired cookies are never returned.
//! - `remove(url, cookie)` only looks under the key of `url`.
mod in_memory;
mod json;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::cookies::cookie::{domain_matches, now_unix};
use crate::cookies::Cookie;
use crate::errors::{ErrorKind, NetError, Result};

pub use in_memory::InMemoryCookieStore;
pub use json::JsonCookieStore;

/// Storage for accepted cookies.
///
/// Implementations must be `Send + Sync` and synchronize internally; all methods
/// take `&self`. Errors are I/O-kind failures of the backing storage.
pub trait CookieStore: Send + Sync {
    /// Files `cookie` under the key of `url`, replacing a cookie of the same
    /// identity.
    fn add(&self, url: &Url, cookie: Cookie) -> Result<()>;

    /// Files every cookie in `cookies` under the key of `url`, in order.
    ///
    /// The default adds them one by one, so a failure can leave the earlier ones
    /// stored. The bundled stores apply the whole batch or nothing.
    fn add_all(&self, url: &Url, cookies: Vec<Cookie>) -> Result<()> {
        for cookie in cookies {
            self.add(url, cookie)?;
        }
        Ok(())
    }

    /// Returns the non-expired cookies that apply to the host of `url`.
    fn get(&self, url: &Url) -> Result<Vec<Cookie>>;

    /// Returns every non-expired cookie in insertion order.
    fn cookies(&self) -> Result<Vec<Cookie>>;

    /// Returns the distinct URL keys that currently hold cookies.
    fn urls(&self) -> Result<Vec<Url>>;

    /// Removes `cookie` from the key of `url`. Returns true when something was removed.
    fn remove(&self, url: &Url, cookie: &Cookie) -> Result<bool>;

    /// Removes everything. Returns true when the store was not empty.
    fn remove_all(&self) -> Result<bool>;
}

pub type CookieStoreHandle = Arc<dyn CookieStore>;

/// Normalized key a cookie from `url` is filed under.
pub fn store_key(url: &Url) -> Result<String> {
    let host = url.host_str().ok_or_else(|| {
        NetError::with_message(ErrorKind::MalformedUrl, format!("{url} has no host"))
    })?;
    Ok(format!("http://{}", host.to_ascii_lowercase()))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct StoredCookie {
    key: String,
    cookie: Cookie,
}

/// Cookie state shared by the bundled stores.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct CookieSet {
    entries: Vec<StoredCookie>,
}

impl CookieSet {
    pub(crate) fn add(&mut self, key: String, cookie: Cookie) {
        let now = now_unix();
        self.entries.retain(|e| {
            !e.cookie.expired_at(now) && !(e.key == key && e.cookie.same_identity(&cookie))
        });
        if !cookie.expired_at(now) {
            self.entries.push(StoredCookie { key, cookie });
        }
    }

    /// The part of the set that outlives the session: `Discard` cookies dropped.
    pub(crate) fn persistent(&self) -> CookieSet {
        CookieSet {
            entries: self
                .entries
                .iter()
                .filter(|e| !e.cookie.discard)
                .cloned()
                .collect(),
        }
    }

    pub(crate) fn get(&self, key: &str, host: &str) -> Vec<Cookie> {
        let now = now_unix();
        self.entries
            .iter()
            .filter(|e| !e.cookie.expired_at(now))
            .filter(|e| match e.cookie.domain.as_deref() {
                Some(domain) => domain_matches(domain, host),
                None => e.key == key,
            })
            .map(|e| e.cookie.clone())
            .collect()
    }

    pub(crate) fn cookies(&self) -> Vec<Cookie> {
        let now = now_unix();
        self.entries
            .iter()
            .filter(|e| !e.cookie.expired_at(now))
            .map(|e| e.cookie.clone())
            .collect()
    }

    pub(crate) fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = Vec::new();
        for entry in &self.entries {
            if !keys.contains(&entry.key) {
                keys.push(entry.key.clone());
            }
        }
        keys
    }

    pub(crate) fn remove(&mut self, key: &str, cookie: &Cookie) -> bool {
        let before = self.entries.len();
        self.entries
            .retain(|e| !(e.key == key && e.cookie.same_identity(cookie)));
        self.entries.len() != before
    }

    pub(crate) fn clear(&mut self) -> bool {
        let had_entries = !self.entries.is_empty();
        self.entries.clear();
        had_entries
    }
}

/// Parses the stored keys back into URLs, skipping anything unparsable.
pub(crate) fn keys_to_urls(keys: Vec<String>) -> Vec<Url> {
    keys.iter().filter_map(|k| Url::parse(k).ok()).collect()
}
