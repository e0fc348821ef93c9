//! Request handling and transformation.
//!
//! # Responsibilities
//! - Generate a unique request ID (UUID v4) unless the client sent one
//! - Prepare the request for forwarding to the upstream
//!
//! # Design Decisions
//! - Request ID added as early as possible for tracing
//! - Hop-by-hop headers and `Host` never reach the upstream
//! - `x-forwarded-for` is appended to, not replaced

use std::net::SocketAddr;

use axum::{
    body::Body,
    http::{header, HeaderMap, HeaderName, HeaderValue, Request, Uri},
};
use tower_http::request_id::{MakeRequestId, RequestId, SetRequestIdLayer};
use uuid::Uuid;

use crate::http::response::strip_hop_by_hop;

pub const X_REQUEST_ID: &str = "x-request-id";
pub const X_FORWARDED_FOR: &str = "x-forwarded-for";

/// Generates UUID v4 request ids.
#[derive(Debug, Clone, Copy, Default)]
pub struct MakeUuidRequestId;

impl MakeRequestId for MakeUuidRequestId {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        HeaderValue::from_str(&Uuid::new_v4().to_string())
            .ok()
            .map(RequestId::new)
    }
}

/// Layer that sets `x-request-id` on requests that lack one.
pub type RequestIdLayer = SetRequestIdLayer<MakeUuidRequestId>;

pub fn request_id_layer() -> RequestIdLayer {
    SetRequestIdLayer::new(HeaderName::from_static(X_REQUEST_ID), MakeUuidRequestId)
}

/// Access to the request id of an inbound request.
pub trait RequestIdExt {
    fn request_id(&self) -> &str;
}

impl<B> RequestIdExt for Request<B> {
    fn request_id(&self) -> &str {
        self.headers()
            .get(X_REQUEST_ID)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("unknown")
    }
}

/// Rebuild `request` for the upstream at `uri`.
///
/// Keeps method, version, end-to-end headers and the streamed body.
pub fn prepare_upstream_request(
    request: Request<Body>,
    uri: Uri,
    request_id: &str,
    client_addr: Option<SocketAddr>,
) -> Request<Body> {
    let (mut parts, body) = request.into_parts();

    strip_hop_by_hop(&mut parts.headers);
    parts.headers.remove(header::HOST);

    if let Ok(value) = HeaderValue::from_str(request_id) {
        parts.headers.insert(X_REQUEST_ID, value);
    }
    if let Some(addr) = client_addr {
        append_forwarded_for(&mut parts.headers, addr);
    }

    parts.uri = uri;
    Request::from_parts(parts, body)
}

fn append_forwarded_for(headers: &mut HeaderMap, addr: SocketAddr) {
    let client = addr.ip().to_string();
    let value = match headers.get(X_FORWARDED_FOR).and_then(|v| v.to_str().ok()) {
        Some(existing) if !existing.is_empty() => format!("{existing}, {client}"),
        _ => client,
    };
    if let Ok(value) = HeaderValue::from_str(&value) {
        headers.insert(X_FORWARDED_FOR, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prepare_strips_and_tags() {
        let request = Request::builder()
            .method("POST")
            .uri("/api/v1/account?id=7")
            .header(header::HOST, "gateway.local")
            .header(header::CONNECTION, "keep-alive, x-secret")
            .header("x-secret", "1")
            .header("keep-alive", "timeout=5")
            .header("x-forwarded-for", "10.1.1.1")
            .header("x-custom", "kept")
            .body(Body::empty())
            .unwrap();

        let uri: Uri = "http://10.0.0.1:8081/api/v1/account?id=7".parse().unwrap();
        let addr: SocketAddr = "192.168.0.9:50000".parse().unwrap();
        let upstream = prepare_upstream_request(request, uri.clone(), "req-1", Some(addr));

        assert_eq!(upstream.uri(), &uri);
        assert_eq!(upstream.method(), "POST");
        let headers = upstream.headers();
        assert!(headers.get(header::HOST).is_none());
        assert!(headers.get(header::CONNECTION).is_none());
        assert!(headers.get("keep-alive").is_none());
        assert!(headers.get("x-secret").is_none());
        assert_eq!(headers.get("x-custom").unwrap(), "kept");
        assert_eq!(headers.get(X_REQUEST_ID).unwrap(), "req-1");
        assert_eq!(headers.get(X_FORWARDED_FOR).unwrap(), "10.1.1.1, 192.168.0.9");
    }

    #[test]
    fn test_request_id_ext() {
        let request = Request::builder().header(X_REQUEST_ID, "abc").body(()).unwrap();
        assert_eq!(request.request_id(), "abc");
        let request = Request::builder().body(()).unwrap();
        assert_eq!(request.request_id(), "unknown");
    }

    #[test]
    fn test_generated_ids_are_uuids() {
        let request = Request::builder().body(()).unwrap();
        let id = MakeUuidRequestId.make_request_id(&request).unwrap();
        let text = id.header_value().to_str().unwrap();
        assert!(Uuid::parse_str(text).is_ok());
    }
}
