//! Cookie acceptance policies.
//!
//! A [`CookiePolicy`] is a pure predicate consulted by a cookie handler before a
//! cookie is stored. Three canonical policies exist, selectable from
//! configuration through [`PolicyKind`]. Any `Fn(&Url, &Cookie) -> bool` closure
//! is a policy as well.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::cookies::cookie::domain_matches;
use crate::cookies::Cookie;

/// Decides whether a cookie received from `url` may be stored.
///
/// Implementations must be side-effect free and callable from any thread.
pub trait CookiePolicy: Send + Sync {
    fn should_accept(&self, url: &Url, cookie: &Cookie) -> bool;
}

pub type CookiePolicyHandle = Arc<dyn CookiePolicy>;

impl<F> CookiePolicy for F
where
    F: Fn(&Url, &Cookie) -> bool + Send + Sync,
{
    fn should_accept(&self, url: &Url, cookie: &Cookie) -> bool {
        self(url, cookie)
    }
}

/// Accepts every cookie.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAll;

impl CookiePolicy for AcceptAll {
    fn should_accept(&self, _url: &Url, _cookie: &Cookie) -> bool {
        true
    }
}

/// Rejects every cookie.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptNone;

impl CookiePolicy for AcceptNone {
    fn should_accept(&self, _url: &Url, _cookie: &Cookie) -> bool {
        false
    }
}

/// Accepts a cookie only when its domain matches the host it came from.
///
/// A cookie without a domain is host-only and is accepted. A URL without a host
/// never accepts.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptOriginalServer;

impl CookiePolicy for AcceptOriginalServer {
    fn should_accept(&self, url: &Url, cookie: &Cookie) -> bool {
        let Some(host) = url.host_str() else {
            return false;
        };
        match cookie.domain.as_deref() {
            Some(domain) => domain_matches(domain, host),
            None => true,
        }
    }
}

/// Names the canonical policies, e.g. for configuration files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyKind {
    AcceptAll,
    AcceptNone,
    #[default]
    AcceptOriginalServer,
}

impl PolicyKind {
    pub fn policy(self) -> CookiePolicyHandle {
        match self {
            PolicyKind::AcceptAll => Arc::new(AcceptAll),
            PolicyKind::AcceptNone => Arc::new(AcceptNone),
            PolicyKind::AcceptOriginalServer => Arc::new(AcceptOriginalServer),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    fn cookie_for(domain: Option<&str>) -> Cookie {
        let mut c = Cookie::new("a", "1");
        c.domain = domain.map(str::to_string);
        c
    }

    #[test]
    fn accept_all_and_none_ignore_input() {
        let pairs = [
            (url("http://example.com/"), cookie_for(Some("example.com"))),
            (url("https://other.org/x"), cookie_for(Some("evil.com"))),
            (url("http://10.0.0.1/"), cookie_for(None)),
        ];
        for (u, c) in &pairs {
            assert!(AcceptAll.should_accept(u, c));
            assert!(!AcceptNone.should_accept(u, c));
        }
    }

    #[test]
    fn original_server_uses_dot_boundary_suffix() {
        let p = AcceptOriginalServer;
        assert!(p.should_accept(&url("http://www.example.com/"), &cookie_for(Some("example.com"))));
        assert!(p.should_accept(&url("http://a.b.example.com/"), &cookie_for(Some(".example.com"))));
        assert!(p.should_accept(&url("http://example.com/"), &cookie_for(Some("example.com"))));
        assert!(!p.should_accept(&url("http://notexample.com/"), &cookie_for(Some("example.com"))));
        assert!(!p.should_accept(&url("http://android.com/"), &cookie_for(Some("google.com"))));
    }

    #[test]
    fn original_server_accepts_host_only_cookies() {
        assert!(AcceptOriginalServer.should_accept(&url("http://example.com/"), &cookie_for(None)));
    }

    #[test]
    fn original_server_rejects_hostless_urls() {
        assert!(!AcceptOriginalServer.should_accept(&url("data:text/plain,hi"), &cookie_for(None)));
    }

    #[test]
    fn closures_are_policies() {
        let only_a: CookiePolicyHandle = Arc::new(|_: &Url, c: &Cookie| c.name == "a");
        assert!(only_a.should_accept(&url("http://x.com/"), &Cookie::new("a", "1")));
        assert!(!only_a.should_accept(&url("http://x.com/"), &Cookie::new("b", "1")));
    }

    #[test]
    fn policy_kind_deserializes_from_snake_case() {
        let kind: PolicyKind = serde_json::from_str("\"accept_none\"").unwrap();
        assert_eq!(kind, PolicyKind::AcceptNone);
        assert!(!kind.policy().should_accept(&url("http://x.com/"), &Cookie::new("a", "1")));
        assert_eq!(PolicyKind::default(), PolicyKind::AcceptOriginalServer);
    }
}
