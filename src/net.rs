//! HTTP fetching on top of the context's cookie handler and response cache.

mod fetch;
mod response;

pub use fetch::{fetch, MAX_REDIRECTS};
pub use response::Response;
