use std::collections::HashMap;
use std::io::{Cursor, Read, Write};
use std::sync::Arc;

use http::Method;
use log::{debug, warn};
use parking_lot::RwLock;
use url::Url;

use crate::cache::staged::Staged;
use crate::cache::{CacheRequest, CacheResponse, ResponseCache};
use crate::errors::Result;
use crate::headers::Headers;

struct Entry {
    headers: Headers,
    body: Arc<[u8]>,
}

type Entries = Arc<RwLock<HashMap<String, Arc<Entry>>>>;

/// Response cache kept in memory, keyed by URL.
///
/// Only GET lookups hit. Responses without a status line are not stored.
#[derive(Clone, Default)]
pub struct InMemoryResponseCache {
    entries: Entries,
}

impl InMemoryResponseCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl ResponseCache for InMemoryResponseCache {
    fn get(
        &self,
        url: &Url,
        method: &Method,
        _request_headers: &Headers,
    ) -> Result<Option<Box<dyn CacheResponse>>> {
        if *method != Method::GET {
            return Ok(None);
        }

        let entry = self.entries.read().get(url.as_str()).cloned();
        if entry.is_none() {
            debug!("cache miss for {url}");
        }
        Ok(entry.map(|entry| Box::new(MemoryCacheResponse { entry }) as Box<dyn CacheResponse>))
    }

    fn put(&self, url: &Url, response_headers: &Headers) -> Result<Option<Box<dyn CacheRequest>>> {
        if response_headers.status_line().is_none() {
            warn!("not caching {url}: response headers carry no status line");
            return Ok(None);
        }

        Ok(Some(Box::new(MemoryCacheRequest {
            key: url.as_str().to_string(),
            headers: response_headers.clone(),
            staged: Staged::new(Vec::new()),
            entries: self.entries.clone(),
        })))
    }

    fn remove(&self, url: &Url) -> Result<bool> {
        Ok(self.entries.write().remove(url.as_str()).is_some())
    }
}

struct MemoryCacheRequest {
    key: String,
    headers: Headers,
    staged: Staged<Vec<u8>>,
    entries: Entries,
}

impl CacheRequest for MemoryCacheRequest {
    fn body(&self) -> Result<Box<dyn Write + Send>> {
        self.staged.writer()
    }

    fn abort(&self) {
        if self.staged.abort() {
            warn!("aborted cache store for {}", self.key);
        }
    }

    fn commit(&self) -> Result<()> {
        self.staged.commit_with(|body| {
            let entry = Entry {
                headers: self.headers.clone(),
                body: body.into(),
            };
            self.entries.write().insert(self.key.clone(), Arc::new(entry));
            Ok(())
        })
    }
}

/// A snapshot of an entry; later replacement or removal does not affect it.
struct MemoryCacheResponse {
    entry: Arc<Entry>,
}

impl CacheResponse for MemoryCacheResponse {
    fn headers(&self) -> Result<Headers> {
        Ok(self.entry.headers.clone())
    }

    fn body(&self) -> Result<Box<dyn Read + Send>> {
        Ok(Box::new(Cursor::new(self.entry.body.clone())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{read_entry, store_body};
    use std::thread;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    fn ok_headers() -> Headers {
        let mut h = Headers::with_status_line("HTTP/1.1 200 OK");
        h.append("Content-Type", "text/plain");
        h
    }

    fn cached_body(cache: &InMemoryResponseCache, u: &Url) -> Option<Vec<u8>> {
        cache
            .get(u, &Method::GET, &Headers::new())
            .unwrap()
            .map(|r| read_entry(r.as_ref()).unwrap().1)
    }

    #[test]
    fn commit_makes_entry_visible() {
        let cache = InMemoryResponseCache::new();
        let u = url("http://example.com/a");
        let request = cache.put(&u, &ok_headers()).unwrap().unwrap();

        request.body().unwrap().write_all(b"hello").unwrap();
        assert!(cached_body(&cache, &u).is_none());

        request.commit().unwrap();
        let response = cache.get(&u, &Method::GET, &Headers::new()).unwrap().unwrap();
        let (headers, body) = read_entry(response.as_ref()).unwrap();
        assert_eq!(headers.status_code(), Some(200));
        assert_eq!(headers.get("content-type"), Some("text/plain"));
        assert_eq!(body, b"hello");
    }

    #[test]
    fn abort_before_commit_hides_partial_entry() {
        let cache = InMemoryResponseCache::new();
        let u = url("http://example.com/a");
        let request = cache.put(&u, &ok_headers()).unwrap().unwrap();

        let mut sink = request.body().unwrap();
        sink.write_all(b"partial").unwrap();
        request.abort();

        assert!(sink.write_all(b"more").is_err());
        assert!(request.commit().is_err());
        assert!(cached_body(&cache, &u).is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn abort_keeps_previous_entry() {
        let cache = InMemoryResponseCache::new();
        let u = url("http://example.com/a");
        let first = cache.put(&u, &ok_headers()).unwrap().unwrap();
        store_body(first.as_ref(), b"v1").unwrap();

        let second = cache.put(&u, &ok_headers()).unwrap().unwrap();
        second.body().unwrap().write_all(b"v2-partial").unwrap();
        second.abort();

        assert_eq!(cached_body(&cache, &u).unwrap(), b"v1");
    }

    #[test]
    fn abort_from_another_thread_while_writing() {
        let cache = InMemoryResponseCache::new();
        let u = url("http://example.com/big");
        let request: Arc<dyn CacheRequest> = Arc::from(cache.put(&u, &ok_headers()).unwrap().unwrap());

        let writer = {
            let request = request.clone();
            thread::spawn(move || {
                let Ok(mut sink) = request.body() else {
                    return;
                };
                let chunk = [7u8; 1024];
                for _ in 0..10_000 {
                    if sink.write_all(&chunk).is_err() {
                        return;
                    }
                }
                let _ = request.commit();
            })
        };

        request.abort();
        writer.join().unwrap();

        // Either the abort won and nothing is visible, or the commit won first and
        // the entry is complete.
        match cached_body(&cache, &u) {
            None => {}
            Some(body) => assert_eq!(body.len(), 1024 * 10_000),
        }
    }

    #[test]
    fn abort_after_commit_is_noop() {
        let cache = InMemoryResponseCache::new();
        let u = url("http://example.com/a");
        let request = cache.put(&u, &ok_headers()).unwrap().unwrap();
        store_body(request.as_ref(), b"done").unwrap();
        request.abort();
        assert_eq!(cached_body(&cache, &u).unwrap(), b"done");
    }

    #[test]
    fn only_get_hits() {
        let cache = InMemoryResponseCache::new();
        let u = url("http://example.com/a");
        store_body(cache.put(&u, &ok_headers()).unwrap().unwrap().as_ref(), b"x").unwrap();
        assert!(cache.get(&u, &Method::POST, &Headers::new()).unwrap().is_none());
        assert!(cache.get(&u, &Method::GET, &Headers::new()).unwrap().is_some());
    }

    #[test]
    fn declines_responses_without_status_line() {
        let cache = InMemoryResponseCache::new();
        let mut h = Headers::new();
        h.append("Content-Type", "text/plain");
        assert!(cache.put(&url("http://example.com/"), &h).unwrap().is_none());
    }

    #[test]
    fn responses_are_snapshots() {
        let cache = InMemoryResponseCache::new();
        let u = url("http://example.com/a");
        store_body(cache.put(&u, &ok_headers()).unwrap().unwrap().as_ref(), b"x").unwrap();

        let response = cache.get(&u, &Method::GET, &Headers::new()).unwrap().unwrap();
        assert!(cache.remove(&u).unwrap());
        assert!(!cache.remove(&u).unwrap());
        assert_eq!(read_entry(response.as_ref()).unwrap().1, b"x");
    }
}
