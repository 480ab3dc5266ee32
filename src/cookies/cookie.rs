//! Cookie value type and `Set-Cookie` parsing.
//!
//! The [`Cookie`] struct is what stores persist and policies inspect. Parsing is
//! lenient: unknown attributes are ignored, quoted values are unquoted and a
//! header without a `name=value` pair yields nothing.
//!
//! ```rust
//! use netglue::cookies::Cookie;
//!
//! let c = Cookie::parse("session=abc123; Path=/; Domain=.example.com; Secure").unwrap();
//! assert_eq!(c.name, "session");
//! assert_eq!(c.domain.as_deref(), Some(".example.com"));
//! assert!(c.secure);
//! ```

use serde::{Deserialize, Serialize};
use std::time::UNIX_EPOCH;
use time::{Date, Month, PrimitiveDateTime, Time};

/// A cookie as parsed from a response and kept by a store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cookie {
    /// Cookie name (case-sensitive).
    pub name: String,

    /// Cookie value with surrounding quotes removed.
    pub value: String,

    /// Domain attribute as sent by the server, including a leading dot if any.
    /// `None` until a handler defaults it to the request host.
    pub domain: Option<String>,

    /// Path scoping. `None` until a handler defaults it from the request path.
    pub path: Option<String>,

    /// Only send over https.
    pub secure: bool,

    /// Not exposed to scripts. Stored for completeness, not enforced here.
    pub http_only: bool,

    /// Ports the cookie may be sent to. An empty list means "the port of the
    /// request that set it" and is filled in by the handler.
    pub port_list: Option<Vec<u16>>,

    /// 0 for Netscape cookies, 1 for RFC 2109/2965 cookies.
    pub version: u8,

    /// Absolute expiry in unix seconds. Session cookies have `None`.
    pub expires_at: Option<i64>,

    /// RFC 2965 `Comment`.
    #[serde(default)]
    pub comment: Option<String>,

    /// RFC 2965 `CommentURL`.
    #[serde(default)]
    pub comment_url: Option<String>,

    /// RFC 2965 `Discard`: session only, never written to disk.
    #[serde(default)]
    pub discard: bool,
}

impl Cookie {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            domain: None,
            path: None,
            secure: false,
            http_only: false,
            port_list: None,
            version: 0,
            expires_at: None,
            comment: None,
            comment_url: None,
            discard: false,
        }
    }

    /// Parses a single `Set-Cookie` header value.
    pub fn parse(header: &str) -> Option<Cookie> {
        Self::parse_at(header, now_unix())
    }

    /// Parses a `Set-Cookie2` header value, which may carry several cookies
    /// separated by commas.
    pub fn parse_set_cookie2(header: &str) -> Vec<Cookie> {
        let now = now_unix();
        split_unquoted(header, ',')
            .into_iter()
            .filter_map(|part| Self::parse_at(part, now))
            .map(|mut c| {
                c.version = c.version.max(1);
                c
            })
            .collect()
    }

    fn parse_at(header: &str, now: i64) -> Option<Cookie> {
        let mut parts = split_unquoted(header, ';').into_iter();
        let (name, value) = parts.next()?.split_once('=')?;
        let name = name.trim();
        if name.is_empty() {
            return None;
        }

        let mut cookie = Cookie::new(name, unquote(value.trim()));
        let mut max_age: Option<i64> = None;
        let mut expires: Option<i64> = None;

        for part in parts {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }

            let (key, val) = match part.split_once('=') {
                Some((k, v)) => (k.trim(), Some(unquote(v.trim()))),
                None => (part, None),
            };

            match (key.to_ascii_lowercase().as_str(), val) {
                ("path", Some(v)) => cookie.path = Some(v.to_string()),
                ("domain", Some(v)) if !v.is_empty() => cookie.domain = Some(v.to_string()),
                ("max-age", Some(v)) => max_age = v.parse().ok(),
                ("expires", Some(v)) => expires = parse_expires(v),
                ("comment", Some(v)) => cookie.comment = Some(v.to_string()),
                ("commenturl", Some(v)) => cookie.comment_url = Some(v.to_string()),
                ("discard", _) => cookie.discard = true,
                ("version", Some(v)) => cookie.version = v.parse().unwrap_or(1),
                ("port", v) => {
                    cookie.port_list = Some(
                        v.unwrap_or_default()
                            .split(',')
                            .filter_map(|p| p.trim().parse().ok())
                            .collect(),
                    )
                }
                ("secure", _) => cookie.secure = true,
                ("httponly", _) => cookie.http_only = true,
                _ => {}
            }
        }

        // Max-Age wins over Expires when both are present
        cookie.expires_at = match max_age {
            Some(age) => Some(now.saturating_add(age)),
            None => expires,
        };

        Some(cookie)
    }

    /// True when the cookie has an expiry at or before `now` (unix seconds).
    pub fn expired_at(&self, now: i64) -> bool {
        matches!(self.expires_at, Some(at) if at <= now)
    }

    pub fn has_expired(&self) -> bool {
        self.expired_at(now_unix())
    }

    /// Two cookies with the same identity replace each other in a store.
    pub fn same_identity(&self, other: &Cookie) -> bool {
        self.name == other.name
            && self.path == other.path
            && match (&self.domain, &other.domain) {
                (Some(a), Some(b)) => a.eq_ignore_ascii_case(b),
                (None, None) => true,
                _ => false,
            }
    }

    /// `name=value` as sent in a `Cookie` request header.
    pub fn pair(&self) -> String {
        format!("{}={}", self.name, self.value)
    }

    /// RFC 2965 form: `name="value";$Path="/";$Domain="a.com";$Port="80"`.
    /// Attributes the cookie does not carry are left out.
    pub fn versioned_pair(&self) -> String {
        let mut out = format!("{}=\"{}\"", self.name, self.value);
        if let Some(path) = &self.path {
            out.push_str(&format!(";$Path=\"{path}\""));
        }
        if let Some(domain) = &self.domain {
            out.push_str(&format!(";$Domain=\"{domain}\""));
        }
        if let Some(ports) = self.port_list.as_ref().filter(|p| !p.is_empty()) {
            let ports: Vec<String> = ports.iter().map(u16::to_string).collect();
            out.push_str(&format!(";$Port=\"{}\"", ports.join(",")));
        }
        out
    }
}

/// Parses an `Expires` value into unix seconds.
///
/// Accepts the three HTTP date formats plus the Netscape form
/// `Wdy, DD-Mon-YYYY HH:MM:SS GMT`, with two or four digit years. The weekday is
/// not checked.
fn parse_expires(value: &str) -> Option<i64> {
    if let Ok(t) = httpdate::parse_http_date(value) {
        if let Ok(d) = t.duration_since(UNIX_EPOCH) {
            return Some(d.as_secs() as i64);
        }
    }

    let value = value.split_once(',').map_or(value, |(_, rest)| rest);
    let normalized = value.replace('-', " ");
    let mut fields = normalized.split_whitespace();

    let day: u8 = fields.next()?.parse().ok()?;
    let month = month_from_abbrev(fields.next()?)?;
    let year: i32 = match fields.next()? {
        y if y.len() == 2 => {
            let y: i32 = y.parse().ok()?;
            if y < 70 { 2000 + y } else { 1900 + y }
        }
        y => y.parse().ok()?,
    };

    let mut clock = fields.next()?.split(':').map(|f| f.parse::<u8>().ok());
    let (hour, minute, second) = (clock.next()??, clock.next()??, clock.next()??);
    if !matches!(fields.next(), None | Some("GMT") | Some("UTC")) {
        return None;
    }

    let date = Date::from_calendar_date(year, month, day).ok()?;
    let time = Time::from_hms(hour, minute, second).ok()?;
    Some(PrimitiveDateTime::new(date, time).assume_utc().unix_timestamp())
}

fn month_from_abbrev(s: &str) -> Option<Month> {
    const MONTHS: [&str; 12] = [
        "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
    ];
    let idx = MONTHS.iter().position(|m| s.get(..3).is_some_and(|p| p.eq_ignore_ascii_case(m)))?;
    Month::try_from(idx as u8 + 1).ok()
}

/// Dot-boundary domain match.
///
/// `host` matches `domain` when both are equal or `host` ends with `"." + domain`.
/// Comparison is ASCII case-insensitive and a single leading dot on `domain` is
/// ignored, so `.example.com` and `example.com` behave the same.
pub fn domain_matches(domain: &str, host: &str) -> bool {
    let domain = domain.strip_prefix('.').unwrap_or(domain).as_bytes();
    let host = host.as_bytes();
    if domain.is_empty() || host.is_empty() {
        return false;
    }
    if host.eq_ignore_ascii_case(domain) {
        return true;
    }
    host.len() > domain.len()
        && host[host.len() - domain.len() - 1] == b'.'
        && host[host.len() - domain.len()..].eq_ignore_ascii_case(domain)
}

/// Path match on `/` boundaries.
///
/// `request_path` matches when it equals `cookie_path`, or starts with it and
/// either `cookie_path` ends with `/` or the next request character is `/`. So
/// `/admin` matches `/admin/x` but not `/administrator`.
pub fn path_matches(cookie_path: &str, request_path: &str) -> bool {
    match request_path.strip_prefix(cookie_path) {
        Some(rest) => rest.is_empty() || cookie_path.ends_with('/') || rest.starts_with('/'),
        None => false,
    }
}

/// Path a cookie gets when the server does not send one: the request path up to
/// and including its last `/`.
pub fn default_path(request_path: &str) -> String {
    match request_path.rfind('/') {
        Some(idx) => request_path[..=idx].to_string(),
        None => "/".to_string(),
    }
}

pub(crate) fn now_unix() -> i64 {
    time::OffsetDateTime::now_utc().unix_timestamp()
}

fn unquote(s: &str) -> &str {
    s.strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(s)
}

/// Splits on `sep` outside of double quotes.
fn split_unquoted(s: &str, sep: char) -> Vec<&str> {
    let mut out = Vec::new();
    let mut in_quotes = false;
    let mut start = 0;
    for (idx, ch) in s.char_indices() {
        if ch == '"' {
            in_quotes = !in_quotes;
        } else if ch == sep && !in_quotes {
            out.push(&s[start..idx]);
            start = idx + ch.len_utf8();
        }
    }
    out.push(&s[start..]);
    out
}
