//! Directory-backed response cache.
//!
//! Each entry is one file named after the md5 of its URL. The file starts with a
//! single line of JSON holding the headers, followed by the raw body bytes. A store
//! is staged in a temporary file in the same directory and renamed over the entry
//! on commit, so readers only ever see complete entries.
use std::fs::{self, File};
use std::io::{BufRead, BufReader, Read, Write};
use std::path::{Path, PathBuf};

use http::Method;
use log::{debug, info, warn};
use tempfile::NamedTempFile;
use url::Url;

use crate::cache::staged::Staged;
use crate::cache::{CacheRequest, CacheResponse, ResponseCache};
use crate::errors::{ErrorKind, NetError, Result};
use crate::headers::Headers;

const ENTRY_EXTENSION: &str = "entry";

#[derive(Debug, Clone)]
pub struct FileResponseCache {
    dir: PathBuf,
}

impl FileResponseCache {
    /// Opens a cache rooted at `dir`, creating the directory if needed.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        info!("opened response cache at {}", dir.display());
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn entry_path(&self, url: &Url) -> PathBuf {
        self.dir
            .join(format!("{:x}.{ENTRY_EXTENSION}", md5::compute(url.as_str())))
    }
}

impl ResponseCache for FileResponseCache {
    fn get(
        &self,
        url: &Url,
        method: &Method,
        _request_headers: &Headers,
    ) -> Result<Option<Box<dyn CacheResponse>>> {
        if *method != Method::GET {
            return Ok(None);
        }

        let path = self.entry_path(url);
        if !path.is_file() {
            debug!("cache miss for {url}");
            return Ok(None);
        }
        Ok(Some(Box::new(FileCacheResponse { path })))
    }

    fn put(&self, url: &Url, response_headers: &Headers) -> Result<Option<Box<dyn CacheRequest>>> {
        if response_headers.status_line().is_none() {
            warn!("not caching {url}: response headers carry no status line");
            return Ok(None);
        }

        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        serde_json::to_writer(&mut tmp, response_headers)?;
        tmp.write_all(b"\n")?;

        Ok(Some(Box::new(FileCacheRequest {
            path: self.entry_path(url),
            staged: Staged::new(tmp),
        })))
    }

    fn remove(&self, url: &Url) -> Result<bool> {
        match fs::remove_file(self.entry_path(url)) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

struct FileCacheRequest {
    path: PathBuf,
    staged: Staged<NamedTempFile>,
}

impl CacheRequest for FileCacheRequest {
    fn body(&self) -> Result<Box<dyn Write + Send>> {
        self.staged.writer()
    }

    fn abort(&self) {
        // Dropping the temp file removes it
        if self.staged.abort() {
            warn!("aborted cache store for {}", self.path.display());
        }
    }

    fn commit(&self) -> Result<()> {
        self.staged.commit_with(|mut tmp| {
            tmp.flush()?;
            tmp.persist(&self.path).map_err(|e| {
                NetError::with_message(
                    ErrorKind::Io,
                    format!("cannot publish {}", self.path.display()),
                )
                .with_source(e.error)
            })?;
            Ok(())
        })
    }
}

/// Reads the entry file lazily, so an entry removed after lookup surfaces as an
/// I/O error on first access.
struct FileCacheResponse {
    path: PathBuf,
}

impl FileCacheResponse {
    fn open(&self) -> Result<(Headers, BufReader<File>)> {
        let mut reader = BufReader::new(File::open(&self.path)?);
        let mut line = String::new();
        reader.read_line(&mut line)?;
        let headers = serde_json::from_str(line.trim_end()).map_err(|e| {
            NetError::with_message(
                ErrorKind::Io,
                format!("corrupt cache entry {}", self.path.display()),
            )
            .with_source(e)
        })?;
        Ok((headers, reader))
    }
}

impl CacheResponse for FileCacheResponse {
    fn headers(&self) -> Result<Headers> {
        Ok(self.open()?.0)
    }

    fn body(&self) -> Result<Box<dyn Read + Send>> {
        Ok(Box::new(self.open()?.1))
    }
}
