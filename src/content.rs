//! Content handlers decode a connection's payload into an application value.
//!
//! Decoded values are type-erased ([`Content`]); callers that only accept some
//! types ask for them by [`TypeId`] through [`ContentHandler::content_as`], or use
//! [`content_of`] for a single concrete type.
//!
//! [`ContentHandlers`] picks a handler by MIME type: an exact match first, then a
//! `type/*` wildcard, then the fallback handler if one is set.

mod connection;
mod handlers;

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

use log::debug;

use crate::errors::{ErrorKind, NetError, Result};

pub use connection::{BufferedConnection, Connection};
pub use handlers::{
    charset, decode_text, BytesContentHandler, JsonContentHandler, TextContentHandler,
};

/// A decoded payload.
pub type Content = Box<dyn Any + Send>;

pub trait ContentHandler: Send + Sync {
    /// Decodes the payload of `conn`.
    fn content(&self, conn: &mut dyn Connection) -> Result<Content>;

    /// Decodes the payload once and returns it only when its type is one of
    /// `accepted`. An empty `accepted` list returns `None` without reading the
    /// connection.
    fn content_as(&self, conn: &mut dyn Connection, accepted: &[TypeId]) -> Result<Option<Content>> {
        if accepted.is_empty() {
            return Ok(None);
        }

        let value = self.content(conn)?;
        // Deref so the id is the payload's, not the box's
        let actual = (*value).type_id();
        Ok(accepted.iter().any(|t| *t == actual).then_some(value))
    }
}

pub type ContentHandlerHandle = Arc<dyn ContentHandler>;

/// Decodes `conn` with `handler` and downcasts to `T`. `Ok(None)` when the handler
/// produced some other type.
pub fn content_of<T: Any>(handler: &dyn ContentHandler, conn: &mut dyn Connection) -> Result<Option<T>> {
    let value = handler.content_as(conn, &[TypeId::of::<T>()])?;
    Ok(value.and_then(|v| v.downcast::<T>().ok()).map(|b| *b))
}

/// Strips parameters and lowercases a content type: `Text/HTML; charset=x` becomes
/// `text/html`.
pub fn mime_essence(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// Registry of content handlers keyed by MIME type.
#[derive(Clone, Default)]
pub struct ContentHandlers {
    handlers: HashMap<String, ContentHandlerHandle>,
    fallback: Option<ContentHandlerHandle>,
}

impl ContentHandlers {
    /// An empty registry. Every lookup fails until handlers are registered.
    pub fn new() -> Self {
        Self::default()
    }

    /// `text/*` as text, `application/json` as JSON and
    /// `application/octet-stream` as bytes. No fallback.
    pub fn with_defaults() -> Self {
        let mut handlers = Self::new();
        handlers.register("text/*", Arc::new(TextContentHandler));
        handlers.register("application/json", Arc::new(JsonContentHandler));
        handlers.register("application/octet-stream", Arc::new(BytesContentHandler));
        handlers
    }

    /// Registers `handler` for `mime`, which may be a `type/*` wildcard. Replaces
    /// any previous handler for the same key.
    pub fn register(&mut self, mime: &str, handler: ContentHandlerHandle) -> Option<ContentHandlerHandle> {
        self.handlers.insert(mime_essence(mime), handler)
    }

    pub fn set_fallback(&mut self, handler: Option<ContentHandlerHandle>) {
        self.fallback = handler;
    }

    /// Finds the handler for `content_type`. Fails with
    /// [`ErrorKind::UnknownService`] when nothing matches.
    pub fn lookup(&self, content_type: &str) -> Result<ContentHandlerHandle> {
        let essence = mime_essence(content_type);
        if let Some(handler) = self.handlers.get(&essence) {
            return Ok(handler.clone());
        }

        let wildcard = essence
            .split_once('/')
            .map(|(major, _)| format!("{major}/*"));
        if let Some(handler) = wildcard.and_then(|w| self.handlers.get(&w)) {
            return Ok(handler.clone());
        }

        match &self.fallback {
            Some(handler) => Ok(handler.clone()),
            None => Err(NetError::with_message(
                ErrorKind::UnknownService,
                format!("no content handler for {essence}"),
            )),
        }
    }

    /// Decodes `conn` with the handler for its content type. A connection without
    /// a content type is treated as `application/octet-stream`.
    pub fn content(&self, conn: &mut dyn Connection) -> Result<Content> {
        let content_type = conn
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        debug!("decoding {} as {content_type}", conn.url());
        self.lookup(&content_type)?.content(conn)
    }
}
