//! Response cache interception points.
//!
//! A [`ResponseCache`] is asked for a [`CacheResponse`] when a request could be
//! served from cache, and for a [`CacheRequest`] when a fresh response should be
//! stored. Each pair addresses one cache slot for one resource.
//!
//! ## Write lifecycle
//! A [`CacheRequest`] hands out writers for the body. Nothing written becomes
//! visible until [`CacheRequest::commit`] succeeds. [`CacheRequest::abort`] may be
//! called at any time, from any thread, including while another thread is writing:
//! once it returns, pending and future writes fail, commit fails, and the slot keeps
//! whatever entry it had before (or stays empty). Abort after a successful commit
//! does nothing.
//!
//! ```rust
//! use std::io::Write;
//! use netglue::cache::{InMemoryResponseCache, ResponseCache};
//! use netglue::Headers;
//!
//! let cache = InMemoryResponseCache::new();
//! let url = url::Url::parse("http://example.com/").unwrap();
//! let request = cache
//!     .put(&url, &Headers::with_status_line("HTTP/1.1 200 OK"))
//!     .unwrap()
//!     .unwrap();
//! request.body().unwrap().write_all(b"hello").unwrap();
//! request.commit().unwrap();
//!
//! let hit = cache.get(&url, &http::Method::GET, &Headers::new()).unwrap();
//! assert!(hit.is_some());
//! ```
//!
//! Neither trait prescribes a key scheme or eviction; the bundled caches key
//! entries by the full URL and never evict on their own.

mod file;
mod in_memory;
mod staged;

use std::io::{Read, Write};
use std::sync::Arc;

use http::Method;
use url::Url;

use crate::errors::Result;
use crate::headers::Headers;

pub use file::FileResponseCache;
pub use in_memory::InMemoryResponseCache;

/// Write side of one cache slot.
pub trait CacheRequest: Send + Sync {
    /// Returns a sink for the response body. Fails once the request was aborted or
    /// committed.
    fn body(&self) -> Result<Box<dyn Write + Send>>;

    /// Discards the store. Safe to call concurrently with writes.
    fn abort(&self);

    /// Publishes the written body as the slot's entry.
    fn commit(&self) -> Result<()>;
}

/// Read side of one cache slot.
pub trait CacheResponse: Send + Sync {
    /// Header snapshot of the cached response, including its status line.
    fn headers(&self) -> Result<Headers>;

    /// Source for the cached body.
    fn body(&self) -> Result<Box<dyn Read + Send>>;
}

/// A cache of HTTP responses.
pub trait ResponseCache: Send + Sync {
    /// Looks up a cached response for `url`. `Ok(None)` is a miss.
    fn get(
        &self,
        url: &Url,
        method: &Method,
        request_headers: &Headers,
    ) -> Result<Option<Box<dyn CacheResponse>>>;

    /// Opens a store for a response from `url`. `Ok(None)` means the cache
    /// declines to store it.
    fn put(&self, url: &Url, response_headers: &Headers) -> Result<Option<Box<dyn CacheRequest>>>;

    /// Drops the entry for `url`. Returns true when there was one.
    fn remove(&self, url: &Url) -> Result<bool>;
}

pub type ResponseCacheHandle = Arc<dyn ResponseCache>;

/// Writes `body` through `request` and commits, aborting when anything fails.
pub fn store_body(request: &dyn CacheRequest, body: &[u8]) -> Result<()> {
    let written = request.body().and_then(|mut sink| {
        sink.write_all(body)?;
        sink.flush()?;
        Ok(())
    });

    match written {
        Ok(()) => request.commit(),
        Err(e) => {
            request.abort();
            Err(e)
        }
    }
}

/// Reads a cache response fully into memory.
pub fn read_entry(response: &dyn CacheResponse) -> Result<(Headers, Vec<u8>)> {
    let headers = response.headers()?;
    let mut body = Vec::new();
    response.body()?.read_to_end(&mut body)?;
    Ok((headers, body))
}
