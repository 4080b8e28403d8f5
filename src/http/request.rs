//! Request handling and transformation.
//!
//! # Responsibilities
//! - Prepare the inbound request for forwarding to a chosen backend
//! - Join the backend's base path and query with the inbound ones
//! - Strip hop-by-hop headers and append `X-Forwarded-For`
//!
//! # Design Decisions
//! - Method, path, query, headers and body are forwarded verbatim
//! - The inbound `Host` header is preserved
//! - The body is buffered once so every attempt replays the same bytes

use std::net::IpAddr;

use axum::body::{Body, Bytes};
use axum::http::{header::HeaderValue, request::Parts, Request, Uri, Version};
use url::Url;

use crate::http::response::strip_hop_by_hop;

pub const X_FORWARDED_FOR: &str = "x-forwarded-for";

/// Build the upstream request for one attempt against `target`.
pub fn build_upstream_request(
    parts: &Parts,
    body: &Bytes,
    target: &Url,
    client_ip: Option<IpAddr>,
) -> Result<Request<Body>, axum::http::Error> {
    let uri = upstream_uri(target, &parts.uri)?;

    let mut headers = parts.headers.clone();
    strip_hop_by_hop(&mut headers);
    if let Some(ip) = client_ip {
        let forwarded = match headers.get(X_FORWARDED_FOR).and_then(|v| v.to_str().ok()) {
            Some(prior) => format!("{}, {}", prior, ip),
            None => ip.to_string(),
        };
        if let Ok(value) = HeaderValue::from_str(&forwarded) {
            headers.insert(X_FORWARDED_FOR, value);
        }
    }

    let mut request = Request::builder()
        .method(parts.method.clone())
        .uri(uri)
        .version(Version::HTTP_11)
        .body(Body::from(body.clone()))?;
    *request.headers_mut() = headers;
    Ok(request)
}

/// Absolute URI on `target` for the inbound `uri`.
pub fn upstream_uri(target: &Url, inbound: &Uri) -> Result<Uri, axum::http::Error> {
    let path = join_path(target.path(), inbound.path());
    let query = match (target.query().filter(|q| !q.is_empty()), inbound.query()) {
        (Some(a), Some(b)) if !b.is_empty() => Some(format!("{}&{}", a, b)),
        (Some(a), _) => Some(a.to_string()),
        (None, Some(b)) if !b.is_empty() => Some(b.to_string()),
        _ => None,
    };

    let authority = &target[url::Position::BeforeHost..url::Position::AfterPort];
    let mut uri = format!("{}://{}{}", target.scheme(), authority, path);
    if let Some(query) = query {
        uri.push('?');
        uri.push_str(&query);
    }
    Ok(Uri::try_from(uri)?)
}

/// Join two paths with exactly one slash between them.
pub fn join_path(base: &str, path: &str) -> String {
    match (base.ends_with('/'), path.starts_with('/')) {
        (true, true) => format!("{}{}", base, &path[1..]),
        (false, false) => format!("{}/{}", base, path),
        _ => format!("{}{}", base, path),
    }
}
