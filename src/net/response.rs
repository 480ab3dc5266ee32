//! Minimal HTTP response model.
//!
//! This struct represents a **fully buffered** HTTP response returned by
//! [`fetch`](crate::net::fetch), either straight off the wire or rebuilt from a
//! cache entry. It contains the final URL, status code + reason, response headers
//! and the raw body bytes.
//!
//! ## Notes
//! - `headers` is an `http::HeaderMap`, which is **case-insensitive** for header
//!   names.
//! - `status_text` is derived from the status code's canonical reason phrase for
//!   network responses, and taken from the stored status line for cached ones.
//!
use http::HeaderMap;
use url::Url;

use crate::errors::{ErrorKind, NetError, Result};
use crate::headers::Headers;

/// Simple structure for HTTP responses.
#[derive(Debug)]
pub struct Response {
    /// Final URL of the response (after redirects, if any).
    pub url: Url,

    /// Numeric HTTP status code (e.g., `200`, `404`).
    pub status: u16,

    /// Human-readable reason phrase (e.g., `"OK"`, `"Not Found"`).
    ///
    /// May be `"Unknown"` for non-standard codes.
    pub status_text: String,

    /// Response headers as a case-insensitive map.
    pub headers: HeaderMap,

    /// Raw response body bytes.
    pub body: Vec<u8>,

    /// True when the response was served from the response cache.
    pub from_cache: bool,
}

impl Response {
    /// `HTTP/1.1 <status> <reason>`
    pub fn status_line(&self) -> String {
        format!("HTTP/1.1 {} {}", self.status, self.status_text)
    }

    /// Headers in the shape cookie handlers and caches expect, status line
    /// included.
    pub fn cache_headers(&self) -> Headers {
        Headers::from_http(Some(self.status_line()), &self.headers)
    }

    /// Rebuilds a response from a cache entry. The entry must carry a status line.
    pub fn from_cache(url: Url, headers: &Headers, body: Vec<u8>) -> Result<Self> {
        let status = headers.status_code().ok_or_else(|| {
            NetError::with_message(
                ErrorKind::Protocol,
                format!("cached entry for {url} has no usable status line"),
            )
        })?;
        let status_text = headers
            .status_line()
            .and_then(|line| line.splitn(3, ' ').nth(2))
            .unwrap_or("Unknown")
            .to_string();

        Ok(Self {
            url,
            status,
            status_text,
            headers: headers.to_http()?,
            body,
            from_cache: true,
        })
    }
}
