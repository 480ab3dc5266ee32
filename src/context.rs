use std::sync::Arc;

use log::info;
use parking_lot::RwLock;
use url::Url;

use crate::cache::{FileResponseCache, InMemoryResponseCache, ResponseCacheHandle};
use crate::config::{CacheConfig, CookieStoreConfig, NetConfig};
use crate::content::{BufferedConnection, Connection, Content, ContentHandlerHandle, ContentHandlers};
use crate::cookies::{
    CookieHandlerHandle, CookieManager, CookieStoreHandle, InMemoryCookieStore, JsonCookieStore,
};
use crate::errors::{ErrorKind, NetError, Result};
use crate::net::{fetch, Response};
use crate::protocol::{DefaultStreamHandlers, StreamHandlerFactory};

/// Everything the connection layer consults around a request: the cookie
/// handler, the response cache, content handlers and protocol handlers.
///
/// A context is passed explicitly to whoever makes requests; there is no process
/// wide default. The cookie handler and cache slots can be swapped at any time
/// from any thread. A swap is atomic: a request started before it sees the old
/// handler for its whole cycle, later requests see the new one.
pub struct NetContext {
    /// Configuration the context was built from.
    config: NetConfig,
    /// Shared HTTP client (connection pool, user agent, timeout).
    client: reqwest::Client,
    cookie_handler: RwLock<Option<CookieHandlerHandle>>,
    response_cache: RwLock<Option<ResponseCacheHandle>>,
    content_handlers: RwLock<ContentHandlers>,
    stream_handlers: RwLock<Arc<dyn StreamHandlerFactory>>,
}

impl NetContext {
    /// Context built from [`NetConfig::default`].
    pub fn new() -> Result<Self> {
        Self::from_config(NetConfig::default())
    }

    /// Builds the client, cookie handler and cache described by `config`.
    ///
    /// Fails when the JSON cookie file cannot be loaded, the cache directory
    /// cannot be created, or the HTTP client cannot be built.
    pub fn from_config(config: NetConfig) -> Result<Self> {
        // Redirects are followed by `fetch`, so cookies are handled on every hop
        let mut builder = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .redirect(reqwest::redirect::Policy::none());
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build()?;

        let cookie_store: Option<CookieStoreHandle> = match &config.cookie_store {
            CookieStoreConfig::Disabled => None,
            CookieStoreConfig::InMemory => Some(Arc::new(InMemoryCookieStore::new())),
            CookieStoreConfig::Json(path) => Some(JsonCookieStore::open(path.clone())?),
        };
        let cookie_handler = cookie_store.map(|store| {
            Arc::new(CookieManager::with_store(store, Some(config.cookie_policy.policy())))
                as CookieHandlerHandle
        });

        let response_cache: Option<ResponseCacheHandle> = match &config.cache {
            CacheConfig::Disabled => None,
            CacheConfig::InMemory => Some(Arc::new(InMemoryResponseCache::new())),
            CacheConfig::Directory(dir) => Some(Arc::new(FileResponseCache::open(dir.clone())?)),
        };

        info!(
            "network context ready (cookies: {:?}, cache: {:?})",
            config.cookie_store, config.cache
        );

        Ok(Self {
            config,
            client,
            cookie_handler: RwLock::new(cookie_handler),
            response_cache: RwLock::new(response_cache),
            content_handlers: RwLock::new(ContentHandlers::with_defaults()),
            stream_handlers: RwLock::new(Arc::new(DefaultStreamHandlers::new()) as Arc<dyn StreamHandlerFactory>),
        })
    }

    pub fn config(&self) -> &NetConfig {
        &self.config
    }

    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    /// Installs `handler` (or clears the slot with `None`) and returns the
    /// previous one.
    pub fn set_cookie_handler(&self, handler: Option<CookieHandlerHandle>) -> Option<CookieHandlerHandle> {
        std::mem::replace(&mut *self.cookie_handler.write(), handler)
    }

    /// The currently installed cookie handler.
    pub fn cookie_handler(&self) -> Option<CookieHandlerHandle> {
        self.cookie_handler.read().clone()
    }

    pub fn set_response_cache(&self, cache: Option<ResponseCacheHandle>) -> Option<ResponseCacheHandle> {
        std::mem::replace(&mut *self.response_cache.write(), cache)
    }

    pub fn response_cache(&self) -> Option<ResponseCacheHandle> {
        self.response_cache.read().clone()
    }

    /// Registers a content handler for `mime` (may be `type/*`).
    pub fn register_content_handler(&self, mime: &str, handler: ContentHandlerHandle) {
        self.content_handlers.write().register(mime, handler);
    }

    pub fn set_stream_handler_factory(&self, factory: Arc<dyn StreamHandlerFactory>) {
        *self.stream_handlers.write() = factory;
    }

    /// Async fetch through this context. See [`fetch`].
    pub async fn fetch(&self, url: Url) -> Result<Response> {
        fetch(self, url).await
    }

    /// Blocking fetch on a private current-thread runtime.
    ///
    /// # Panics
    /// Panics when called from inside an async runtime.
    pub fn fetch_blocking(&self, url: Url) -> Result<Response> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        runtime.block_on(fetch(self, url))
    }

    /// Opens a connection for `url`.
    ///
    /// The stream handler factory gets the first say. `http` and `https` URLs it
    /// does not claim are fetched with [`fetch_blocking`](Self::fetch_blocking).
    ///
    /// # Panics
    /// Fetching an `http`/`https` URL starts a runtime of its own, so it panics
    /// when called from inside an async runtime. Use [`fetch`](Self::fetch) there.
    pub fn open(&self, url: &Url) -> Result<Box<dyn Connection>> {
        let handler = self.stream_handlers.read().create(url.scheme());
        if let Some(handler) = handler {
            return handler.open(url);
        }

        match url.scheme() {
            "http" | "https" => {
                let resp = self.fetch_blocking(url.clone())?;
                Ok(Box::new(BufferedConnection::from(resp)))
            }
            scheme => Err(NetError::with_message(
                ErrorKind::MalformedUrl,
                format!("unknown protocol: {scheme}"),
            )),
        }
    }

    /// Opens `url` and decodes it with the content handler for its type.
    ///
    /// # Panics
    /// Same as [`open`](Self::open): must not be called from inside an async
    /// runtime for `http`/`https` URLs.
    pub fn content(&self, url: &Url) -> Result<Content> {
        let mut conn = self.open(url)?;
        let handlers = self.content_handlers.read().clone();
        handlers.content(conn.as_mut())
    }
}
