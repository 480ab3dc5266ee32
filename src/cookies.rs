//! Cookies: [`CookieHandler`], [`CookiePolicy`], [`CookieStore`] and the default
//! [`CookieManager`] that ties them together.

mod cookie;
mod handler;
mod manager;
mod policy;
mod store;

pub use cookie::{default_path, domain_matches, path_matches, Cookie};

pub use handler::{CookieHandler, CookieHandlerHandle};
pub use manager::{CookieManager, COOKIE, SET_COOKIE, SET_COOKIE2};

pub use policy::{
    AcceptAll, AcceptNone, AcceptOriginalServer, CookiePolicy, CookiePolicyHandle, PolicyKind,
};

pub use store::{store_key, CookieStore, CookieStoreHandle, InMemoryCookieStore, JsonCookieStore};
