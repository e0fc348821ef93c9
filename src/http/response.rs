//! Response handling and transformation.
//!
//! # Responsibilities
//! - Stream the upstream response back to the client
//! - Strip hop-by-hop headers in both directions
//!
//! # Design Decisions
//! - Streaming responses avoid buffering entire body
//! - Headers named by `Connection` are treated as hop-by-hop too

use axum::{
    body::Body,
    http::{header, HeaderMap, HeaderName, Response},
};
use hyper::body::Incoming;

const HOP_BY_HOP: [&str; 8] = [
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// Remove hop-by-hop headers, including any listed in `Connection`.
pub fn strip_hop_by_hop(headers: &mut HeaderMap) {
    let named: Vec<HeaderName> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|name| HeaderName::from_bytes(name.trim().as_bytes()).ok())
        .collect();

    for name in named {
        headers.remove(name);
    }
    for name in HOP_BY_HOP {
        headers.remove(name);
    }
}

/// Convert an upstream response into a client response, body streamed.
pub fn into_client_response(response: Response<Incoming>) -> Response<Body> {
    let (mut parts, body) = response.into_parts();
    strip_hop_by_hop(&mut parts.headers);
    Response::from_parts(parts, Body::new(body))
}
