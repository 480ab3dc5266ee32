use std::sync::Arc;

use url::Url;

use crate::errors::Result;
use crate::headers::Headers;

/// Intercepts cookie headers around a request/response cycle.
///
/// The connection layer calls [`get`](CookieHandler::get) before sending a request
/// and merges the returned headers into it, then calls
/// [`put`](CookieHandler::put) with the response headers once they arrive.
pub trait CookieHandler: Send + Sync {
    /// Returns the cookie headers to add to a request for `url`.
    ///
    /// `request_headers` are the headers the request carries so far. The returned
    /// map is a fresh value owned by the caller; an empty map means no cookies
    /// apply. Fails with an I/O-kind error when the backing store cannot be read.
    fn get(&self, url: &Url, request_headers: &Headers) -> Result<Headers>;

    /// Extracts and stores the cookies set by a response from `url`.
    ///
    /// Fails with an I/O-kind error when the backing store cannot be written.
    fn put(&self, url: &Url, response_headers: &Headers) -> Result<()>;
}

pub type CookieHandlerHandle = Arc<dyn CookieHandler>;
