use std::io::{Cursor, Read};

use url::Url;

use crate::errors::Result;
use crate::headers::Headers;
use crate::net::Response;

/// An open connection whose payload a [`ContentHandler`](crate::content::ContentHandler)
/// can decode.
pub trait Connection: Send {
    /// URL the connection was opened for (after redirects, if any).
    fn url(&self) -> &Url;

    /// Response headers, including the status line when the protocol has one.
    fn headers(&self) -> &Headers;

    /// Raw `Content-Type` header value.
    fn content_type(&self) -> Option<&str> {
        self.headers().get("content-type")
    }

    /// Source for the payload bytes.
    fn input(&mut self) -> Result<Box<dyn Read + Send + '_>>;
}

/// A connection over a fully buffered response.
#[derive(Debug, Clone)]
pub struct BufferedConnection {
    url: Url,
    headers: Headers,
    body: Vec<u8>,
}

impl BufferedConnection {
    pub fn new(url: Url, headers: Headers, body: Vec<u8>) -> Self {
        Self { url, headers, body }
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }
}

impl From<Response> for BufferedConnection {
    fn from(resp: Response) -> Self {
        let headers = resp.cache_headers();
        Self {
            url: resp.url,
            headers,
            body: resp.body,
        }
    }
}

impl Connection for BufferedConnection {
    fn url(&self) -> &Url {
        &self.url
    }

    fn headers(&self) -> &Headers {
        &self.headers
    }

    fn input(&mut self) -> Result<Box<dyn Read + Send + '_>> {
        Ok(Box::new(Cursor::new(self.body.as_slice())))
    }
}
