//! Interception points for an HTTP connection layer.
//!
//! A [`NetContext`] carries the active cookie handler and response cache, plus
//! the content and protocol handlers used to open and decode URLs. The building
//! blocks live in their own modules and can be used without a context:
//!
//! - [`cookies`]: cookie handler, policies, stores and the default manager
//! - [`cache`]: cache request/response channels and two response caches
//! - [`content`] and [`protocol`]: payload decoding and scheme handlers
//! - [`socket`]: typed socket options
//! - [`errors`]: the error taxonomy shared by all of the above

pub mod cache;
pub mod config;
pub mod content;
pub mod context;
pub mod cookies;
pub mod errors;
pub mod headers;
pub mod net;
pub mod protocol;
pub mod socket;

pub use config::NetConfig;
pub use context::NetContext;
pub use errors::{ErrorKind, NetError, Result};
pub use headers::Headers;
