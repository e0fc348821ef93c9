//! Upstream forwarding.
//!
//! The dispatcher talks to upstreams through the [`Forwarder`] trait so the
//! HTTP client can be swapped for a fake in tests.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{uri::Scheme, Request, Response},
};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use thiserror::Error;

use crate::http::response::into_client_response;

/// Failure to obtain any response from the upstream.
#[derive(Debug, Error)]
pub enum ForwardError {
    #[error(transparent)]
    Client(#[from] hyper_util::client::legacy::Error),

    #[error("upstream unreachable: {0}")]
    Unreachable(String),
}

/// Sends one prepared request upstream.
#[async_trait]
pub trait Forwarder: Send + Sync + fmt::Debug {
    async fn forward(&self, request: Request<Body>) -> Result<Response<Body>, ForwardError>;
}

/// Pooled HTTP/1.1 client.
#[derive(Clone)]
pub struct HttpForwarder {
    client: Client<HttpConnector, Body>,
}

impl HttpForwarder {
    pub fn new(connect_timeout: Duration) -> Self {
        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(connect_timeout));
        connector.set_nodelay(true);

        let client = Client::builder(TokioExecutor::new()).build(connector);
        Self { client }
    }
}

impl fmt::Debug for HttpForwarder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpForwarder").finish_non_exhaustive()
    }
}

#[async_trait]
impl Forwarder for HttpForwarder {
    async fn forward(&self, request: Request<Body>) -> Result<Response<Body>, ForwardError> {
        if request.uri().scheme() == Some(&Scheme::HTTPS) {
            return Err(ForwardError::Unreachable(format!(
                "no TLS connector for {}",
                request.uri()
            )));
        }
        let response = self.client.request(request).await?;
        Ok(into_client_response(response))
    }
}
