use http::header::LOCATION;
use http::Method;
use log::{debug, warn};
use url::Url;

use crate::cache::{read_entry, store_body, ResponseCache};
use crate::context::NetContext;
use crate::cookies::CookieHandlerHandle;
use crate::errors::{ErrorKind, NetError, Result};
use crate::headers::Headers;
use crate::net::Response;

/// Redirects followed before a fetch gives up.
pub const MAX_REDIRECTS: usize = 20;

/// Loads a URL with a GET request, going through the context's response cache and
/// cookie handler.
///
/// 1. A cache hit is returned as-is, without touching the network or cookies.
/// 2. Otherwise every hop (the first request and each redirect) gets the cookie
///    handler's headers for its own URL, and its response headers are offered to
///    the handler before the next hop is sent.
/// 3. A final `200` response without `Cache-Control: no-store` is written to the
///    cache under the requested URL.
///
/// Redirects (`301`, `302`, `303`, `307`, `308` with a `Location`) are followed
/// here rather than by the HTTP client, at most [`MAX_REDIRECTS`] times.
///
/// Cache failures only log; cookie handler failures abort the fetch.
pub async fn fetch(ctx: &NetContext, url: Url) -> Result<Response> {
    if let Some(cache) = ctx.response_cache() {
        if let Some(resp) = cached(cache.as_ref(), &url, &Headers::new()) {
            debug!("serving {url} from cache");
            return Ok(resp);
        }
    }

    let cookie_handler = ctx.cookie_handler();
    let mut target = url.clone();
    let mut redirects = 0;
    let resp = loop {
        let resp = send(ctx, &target, cookie_handler.as_ref()).await?;
        let Some(next) = redirect_target(&resp)? else {
            break resp;
        };

        redirects += 1;
        if redirects > MAX_REDIRECTS {
            return Err(NetError::with_message(
                ErrorKind::Protocol,
                format!("too many redirects fetching {url}"),
            ));
        }
        debug!("{} redirected ({}) to {next}", resp.url, resp.status);
        target = next;
    };

    if resp.status == 200 {
        let response_headers = resp.cache_headers();
        if !no_store(&response_headers) {
            if let Some(cache) = ctx.response_cache() {
                store(cache.as_ref(), &url, &response_headers, &resp.body);
            }
        }
    }

    Ok(resp)
}

/// One request/response exchange with the cookie handler on both sides.
async fn send(ctx: &NetContext, url: &Url, cookie_handler: Option<&CookieHandlerHandle>) -> Result<Response> {
    let mut request_headers = Headers::new();
    if let Some(handler) = cookie_handler {
        let cookies = handler.get(url, &request_headers)?;
        request_headers.merge(&cookies);
    }

    let res = ctx
        .client()
        .get(url.clone())
        .headers(request_headers.to_http()?)
        .send()
        .await?;

    // Fetch results
    let status = res.status().as_u16();
    let status_text = res.status().canonical_reason().unwrap_or("Unknown").to_string();
    let headers = res.headers().clone();

    // Fetch body. We don't do streaming yet
    let body = res.bytes().await?.to_vec();

    let resp = Response {
        url: url.clone(),
        status,
        status_text,
        headers,
        body,
        from_cache: false,
    };

    if let Some(handler) = cookie_handler {
        handler.put(&resp.url, &resp.cache_headers())?;
    }

    Ok(resp)
}

/// Where a redirect response points, resolved against its own URL.
fn redirect_target(resp: &Response) -> Result<Option<Url>> {
    if !matches!(resp.status, 301 | 302 | 303 | 307 | 308) {
        return Ok(None);
    }
    let Some(location) = resp.headers.get(LOCATION) else {
        return Ok(None);
    };

    let location = location.to_str().map_err(|_| {
        NetError::with_message(
            ErrorKind::Protocol,
            format!("unreadable Location header from {}", resp.url),
        )
    })?;
    Ok(Some(resp.url.join(location)?))
}

fn cached(cache: &dyn ResponseCache, url: &Url, request_headers: &Headers) -> Option<Response> {
    let hit = match cache.get(url, &Method::GET, request_headers) {
        Ok(hit) => hit?,
        Err(e) => {
            warn!("cache lookup for {url} failed: {e}");
            return None;
        }
    };

    match read_entry(hit.as_ref()).and_then(|(headers, body)| Response::from_cache(url.clone(), &headers, body)) {
        Ok(resp) => Some(resp),
        Err(e) => {
            warn!("cannot read cached {url}: {e}");
            None
        }
    }
}

fn store(cache: &dyn ResponseCache, url: &Url, headers: &Headers, body: &[u8]) {
    let request = match cache.put(url, headers) {
        Ok(Some(request)) => request,
        Ok(None) => return,
        Err(e) => {
            warn!("cannot open cache entry for {url}: {e}");
            return;
        }
    };

    if let Err(e) = store_body(request.as_ref(), body) {
        warn!("cannot cache {url}: {e}");
    }
}

fn no_store(headers: &Headers) -> bool {
    headers
        .get_all("cache-control")
        .iter()
        .flat_map(|v| v.split(','))
        .any(|directive| directive.trim().eq_ignore_ascii_case("no-store"))
}
