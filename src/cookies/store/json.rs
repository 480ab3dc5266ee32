//! JSON-backed cookie store.
//!
//! `JsonCookieStore` keeps the same in-memory state as the in-memory store and
//! rewrites a single JSON file after every mutation. The file is written to a
//! temporary file in the same directory and renamed over the old one, so a crash
//! mid-write leaves the previous file intact. Cookies marked `Discard` live in
//! memory only and are never written.
//!
//! ### Example
//! ```no_run
//! use netglue::cookies::{CookieManager, JsonCookieStore};
//!
//! let store = JsonCookieStore::open("cookies.json").unwrap();
//! let manager = CookieManager::with_store(store, None);
//! ```
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{debug, info};
use parking_lot::Mutex;
use tempfile::NamedTempFile;
use url::Url;

use crate::cookies::store::{keys_to_urls, store_key, CookieSet, CookieStore};
use crate::cookies::Cookie;
use crate::errors::{ErrorKind, NetError, Result};

/// A cookie store persisted to a JSON file.
#[derive(Debug)]
pub struct JsonCookieStore {
    /// Path of the JSON file.
    path: PathBuf,
    /// Current state. The lock is held across the file write so writes are
    /// serialized in mutation order.
    cookies: Mutex<CookieSet>,
}

impl JsonCookieStore {
    /// Opens the store at `path`, loading existing cookies. A missing file is an
    /// empty store; the file is created on the first mutation.
    pub fn open(path: impl Into<PathBuf>) -> Result<Arc<Self>> {
        let path = path.into();
        let cookies = match fs::read(&path) {
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => CookieSet::default(),
            Err(e) => return Err(e.into()),
        };

        info!("opened cookie store {}", path.display());

        Ok(Arc::new(Self {
            path,
            cookies: Mutex::new(cookies),
        }))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Applies `mutate` and persists the result. The in-memory state is only
    /// replaced when the write succeeded.
    fn mutate<T>(&self, mutate: impl FnOnce(&mut CookieSet) -> T) -> Result<T> {
        let mut guard = self.cookies.lock();
        let mut next = guard.clone();
        let out = mutate(&mut next);
        self.save(&next)?;
        *guard = next;
        Ok(out)
    }

    fn save(&self, cookies: &CookieSet) -> Result<()> {
        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };

        let contents = serde_json::to_vec_pretty(&cookies.persistent())?;
        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(&contents)?;
        tmp.persist(&self.path).map_err(|e| {
            NetError::with_message(ErrorKind::Io, format!("cannot write {}", self.path.display()))
                .with_source(e.error)
        })?;

        debug!("persisted cookie store {}", self.path.display());
        Ok(())
    }
}

impl CookieStore for JsonCookieStore {
    fn add(&self, url: &Url, cookie: Cookie) -> Result<()> {
        let key = store_key(url)?;
        self.mutate(|set| set.add(key, cookie))
    }

    fn add_all(&self, url: &Url, cookies: Vec<Cookie>) -> Result<()> {
        let key = store_key(url)?;
        self.mutate(|set| {
            for cookie in cookies {
                set.add(key.clone(), cookie);
            }
        })
    }

    fn get(&self, url: &Url) -> Result<Vec<Cookie>> {
        let key = store_key(url)?;
        let host = url
            .host_str()
            .ok_or_else(|| NetError::new(ErrorKind::MalformedUrl))?;
        Ok(self.cookies.lock().get(&key, host))
    }

    fn cookies(&self) -> Result<Vec<Cookie>> {
        Ok(self.cookies.lock().cookies())
    }

    fn urls(&self) -> Result<Vec<Url>> {
        Ok(keys_to_urls(self.cookies.lock().keys()))
    }

    fn remove(&self, url: &Url, cookie: &Cookie) -> Result<bool> {
        let key = store_key(url)?;
        self.mutate(|set| set.remove(&key, cookie))
    }

    fn remove_all(&self) -> Result<bool> {
        self.mutate(CookieSet::clear)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn cookies_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cookies.json");

        {
            let store = JsonCookieStore::open(&path).unwrap();
            store.add(&url("http://a.com/"), Cookie::new("a", "1")).unwrap();
            store.add(&url("http://b.com/"), Cookie::new("b", "2")).unwrap();
        }
        assert!(path.exists());

        let store = JsonCookieStore::open(&path).unwrap();
        let names: Vec<String> = store.cookies().unwrap().into_iter().map(|c| c.name).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(store.get(&url("http://a.com/")).unwrap().len(), 1);
    }

    #[test]
    fn missing_file_is_empty_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonCookieStore::open(dir.path().join("none.json")).unwrap();
        assert!(store.cookies().unwrap().is_empty());
        assert!(!store.path().exists());
    }

    #[test]
    fn remove_is_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cookies.json");
        let c = Cookie::new("a", "1");

        let store = JsonCookieStore::open(&path).unwrap();
        store.add(&url("http://a.com/"), c.clone()).unwrap();
        assert!(store.remove(&url("http://a.com/"), &c).unwrap());
        drop(store);

        let store = JsonCookieStore::open(&path).unwrap();
        assert!(store.cookies().unwrap().is_empty());
    }

    #[test]
    fn discard_cookies_are_not_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cookies.json");
        let mut session = Cookie::new("tmp", "1");
        session.discard = true;

        let store = JsonCookieStore::open(&path).unwrap();
        store
            .add_all(&url("http://a.com/"), vec![session, Cookie::new("keep", "1")])
            .unwrap();
        assert_eq!(store.cookies().unwrap().len(), 2);
        drop(store);

        let store = JsonCookieStore::open(&path).unwrap();
        let names: Vec<String> = store.cookies().unwrap().into_iter().map(|c| c.name).collect();
        assert_eq!(names, vec!["keep"]);
    }

    #[test]
    fn failed_batch_stores_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let sub = dir.path().join("sub");
        fs::create_dir(&sub).unwrap();
        let store = JsonCookieStore::open(sub.join("cookies.json")).unwrap();
        fs::remove_dir(&sub).unwrap();

        let batch = vec![Cookie::new("a", "1"), Cookie::new("b", "2")];
        let err = store.add_all(&url("http://a.com/"), batch).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io);
        assert!(store.cookies().unwrap().is_empty());
    }

    #[test]
    fn corrupt_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cookies.json");
        fs::write(&path, b"{ not json").unwrap();
        let err = JsonCookieStore::open(&path).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io);
    }

    #[test]
    fn failed_write_leaves_state_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sub").join("cookies.json");
        fs::create_dir(dir.path().join("sub")).unwrap();

        let store = JsonCookieStore::open(&path).unwrap();
        fs::remove_dir(dir.path().join("sub")).unwrap();

        let err = store.add(&url("http://a.com/"), Cookie::new("a", "1")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io);
        assert!(store.cookies().unwrap().is_empty());
    }
}
