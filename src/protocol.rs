//! Protocol handlers open a [`Connection`] for a URL scheme.
//!
//! A [`StreamHandlerFactory`] maps schemes onto [`StreamHandler`]s. The bundled
//! [`DefaultStreamHandlers`] only knows `file:`; http(s) goes through
//! [`NetContext::open`](crate::context::NetContext::open), which fetches with the
//! context's client, cookie handler and cache.
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use url::Url;

use crate::content::Connection;
use crate::errors::{ErrorKind, NetError, Result};
use crate::headers::Headers;

pub trait StreamHandler: Send + Sync {
    fn open(&self, url: &Url) -> Result<Box<dyn Connection>>;
}

pub type StreamHandlerHandle = Arc<dyn StreamHandler>;

pub trait StreamHandlerFactory: Send + Sync {
    /// Returns the handler for `scheme`, or `None` when the scheme is unsupported.
    fn create(&self, scheme: &str) -> Option<StreamHandlerHandle>;
}

impl<F> StreamHandlerFactory for F
where
    F: Fn(&str) -> Option<StreamHandlerHandle> + Send + Sync,
{
    fn create(&self, scheme: &str) -> Option<StreamHandlerHandle> {
        self(scheme)
    }
}

/// Scheme table, prefilled with `file`.
#[derive(Clone)]
pub struct DefaultStreamHandlers {
    handlers: HashMap<String, StreamHandlerHandle>,
}

impl DefaultStreamHandlers {
    pub fn new() -> Self {
        let mut handlers: HashMap<String, StreamHandlerHandle> = HashMap::new();
        handlers.insert("file".to_string(), Arc::new(FileStreamHandler));
        Self { handlers }
    }

    pub fn register(&mut self, scheme: &str, handler: StreamHandlerHandle) {
        self.handlers.insert(scheme.to_ascii_lowercase(), handler);
    }
}

impl Default for DefaultStreamHandlers {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamHandlerFactory for DefaultStreamHandlers {
    fn create(&self, scheme: &str) -> Option<StreamHandlerHandle> {
        self.handlers.get(&scheme.to_ascii_lowercase()).cloned()
    }
}

/// Opens local files for `file:` URLs.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileStreamHandler;

impl StreamHandler for FileStreamHandler {
    fn open(&self, url: &Url) -> Result<Box<dyn Connection>> {
        if url.scheme() != "file" {
            return Err(NetError::with_message(
                ErrorKind::MalformedUrl,
                format!("not a file url: {url}"),
            ));
        }
        let path = url.to_file_path().map_err(|_| {
            NetError::with_message(ErrorKind::MalformedUrl, format!("no local path in {url}"))
        })?;

        let meta = std::fs::metadata(&path)?;
        if !meta.is_file() {
            return Err(NetError::io(format!("{} is not a regular file", path.display())));
        }

        let mut headers = Headers::new();
        headers.append("Content-Type", guess_content_type(&path));
        headers.append("Content-Length", meta.len().to_string());

        Ok(Box::new(FileConnection {
            url: url.clone(),
            path,
            headers,
        }))
    }
}

/// Guesses a MIME type from the file extension.
pub fn guess_content_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match ext.as_deref() {
        Some("html" | "htm") => "text/html",
        Some("txt" | "text") => "text/plain",
        Some("css") => "text/css",
        Some("js") => "text/javascript",
        Some("json") => "application/json",
        Some("xml") => "application/xml",
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("svg") => "image/svg+xml",
        _ => "application/octet-stream",
    }
}

pub struct FileConnection {
    url: Url,
    path: PathBuf,
    headers: Headers,
}

impl FileConnection {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Connection for FileConnection {
    fn url(&self) -> &Url {
        &self.url
    }

    fn headers(&self) -> &Headers {
        &self.headers
    }

    fn input(&mut self) -> Result<Box<dyn Read + Send + '_>> {
        Ok(Box::new(BufReader::new(File::open(&self.path)?)))
    }
}
