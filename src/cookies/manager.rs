//! The default [`CookieHandler`]: a store plus a policy.
//!
//! ## Storing (`put`)
//! Every `Set-Cookie` and `Set-Cookie2` value is parsed. For each cookie:
//! - the domain defaults to the request host; an explicit domain that does not
//!   match the host rejects the cookie;
//! - the path defaults to the request path up to its last `/`; an explicit path
//!   that does not [path-match](crate::cookies::path_matches) the request path
//!   rejects the cookie;
//! - a port list must contain the request port (an empty list is filled with it);
//! - finally the [`CookiePolicy`] decides.
//!
//! Malformed headers and rejected cookies are skipped, not reported. Accepted
//! cookies go to the store in one [`add_all`](crate::cookies::CookieStore::add_all)
//! batch. A cookie that arrives already expired (`Max-Age=0`, a past `Expires`)
//! deletes the stored cookie of the same identity.
//!
//! ## Sending (`get`)
//! Cookies for the host are filtered by path, the `Secure` flag (https only),
//! port list and expiry, and joined into a single `Cookie` header in store order.
//! When every cookie is RFC 2965 (version 1 or later) the header uses the
//! versioned form: `$Version="1"; a="x";$Path="/";$Domain="a.com"`.
use std::sync::Arc;

use log::debug;
use parking_lot::RwLock;
use url::Url;

use crate::cookies::cookie::{default_path, domain_matches, now_unix, path_matches};
use crate::cookies::{
    AcceptOriginalServer, Cookie, CookieHandler, CookiePolicyHandle, CookieStoreHandle,
    InMemoryCookieStore,
};
use crate::errors::Result;
use crate::headers::Headers;

pub const COOKIE: &str = "Cookie";
pub const SET_COOKIE: &str = "Set-Cookie";
pub const SET_COOKIE2: &str = "Set-Cookie2";

pub struct CookieManager {
    store: CookieStoreHandle,
    policy: RwLock<CookiePolicyHandle>,
}

impl CookieManager {
    /// In-memory store, accepting cookies from the original server only.
    pub fn new() -> Self {
        Self::with_store(Arc::new(InMemoryCookieStore::new()), None)
    }

    /// Uses `store` and `policy`; `None` selects [`AcceptOriginalServer`].
    pub fn with_store(store: CookieStoreHandle, policy: Option<CookiePolicyHandle>) -> Self {
        Self {
            store,
            policy: RwLock::new(
                policy.unwrap_or_else(|| Arc::new(AcceptOriginalServer) as CookiePolicyHandle),
            ),
        }
    }

    pub fn store(&self) -> CookieStoreHandle {
        self.store.clone()
    }

    /// Replaces the policy for subsequent `put` calls.
    pub fn set_policy(&self, policy: CookiePolicyHandle) {
        *self.policy.write() = policy;
    }

    /// Applies defaulting and the domain/path/port checks. Returns false when the
    /// cookie must be dropped.
    fn admit(&self, url: &Url, host: &str, cookie: &mut Cookie) -> bool {
        match cookie.domain.as_deref() {
            Some(domain) if !domain_matches(domain, host) => return false,
            Some(_) => {}
            None => cookie.domain = Some(host.to_string()),
        }

        match cookie.path.as_deref() {
            Some(path) if !path_matches(path, url.path()) => return false,
            Some(_) => {}
            None => cookie.path = Some(default_path(url.path())),
        }

        if let Some(ports) = cookie.port_list.as_mut() {
            let Some(port) = url.port_or_known_default() else {
                return false;
            };
            if ports.is_empty() {
                ports.push(port);
            } else if !ports.contains(&port) {
                return false;
            }
        }

        true
    }
}

impl Default for CookieManager {
    fn default() -> Self {
        Self::new()
    }
}

impl CookieHandler for CookieManager {
    fn get(&self, url: &Url, _request_headers: &Headers) -> Result<Headers> {
        let mut headers = Headers::new();
        if url.host_str().is_none() {
            return Ok(headers);
        }

        let path = url.path();
        let is_https = url.scheme() == "https";
        let port = url.port_or_known_default();
        let now = now_unix();

        let cookies = self
            .store
            .get(url)?
            .into_iter()
            .filter(|c| c.path.as_deref().map_or(true, |p| path_matches(p, path)))
            .filter(|c| !c.secure || is_https)
            .filter(|c| match (&c.port_list, port) {
                (Some(ports), Some(port)) => ports.contains(&port),
                (Some(_), None) => false,
                (None, _) => true,
            })
            .filter(|c| !c.expired_at(now))
            .collect::<Vec<_>>();

        if !cookies.is_empty() {
            headers.append(COOKIE, format_cookie_header(&cookies));
        }
        Ok(headers)
    }

    fn put(&self, url: &Url, response_headers: &Headers) -> Result<()> {
        let Some(host) = url.host_str() else {
            debug!("ignoring cookies from {url}: no host");
            return Ok(());
        };

        let mut cookies = Vec::new();
        for value in response_headers.get_all(SET_COOKIE) {
            match Cookie::parse(value) {
                Some(cookie) => cookies.push(cookie),
                None => debug!("skipping malformed Set-Cookie {value:?} from {url}"),
            }
        }
        for value in response_headers.get_all(SET_COOKIE2) {
            cookies.extend(Cookie::parse_set_cookie2(value));
        }

        let policy = self.policy.read().clone();
        let mut accepted = Vec::with_capacity(cookies.len());
        for mut cookie in cookies {
            if !self.admit(url, host, &mut cookie) {
                debug!("rejecting cookie {} from {url}: scope mismatch", cookie.name);
                continue;
            }
            if !policy.should_accept(url, &cookie) {
                debug!("rejecting cookie {} from {url}: policy", cookie.name);
                continue;
            }
            accepted.push(cookie);
        }

        if accepted.is_empty() {
            return Ok(());
        }
        self.store.add_all(url, accepted)
    }
}

/// Value of the `Cookie` request header for `cookies`.
fn format_cookie_header(cookies: &[Cookie]) -> String {
    if cookies.iter().all(|c| c.version >= 1) {
        let mut out = String::from("$Version=\"1\"");
        for cookie in cookies {
            out.push_str("; ");
            out.push_str(&cookie.versioned_pair());
        }
        out
    } else {
        cookies.iter().map(Cookie::pair).collect::<Vec<_>>().join("; ")
    }
}
