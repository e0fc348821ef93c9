//! Admin API.
//!
//! Served on its own listener so it can be bound to loopback while the
//! gateway listens publicly. Every endpoint requires `Authorization: Bearer <api_key>`.

pub mod auth;
pub mod handlers;

use std::sync::Arc;
use std::time::Instant;

use axum::{middleware, routing::get, Router};

use self::auth::admin_auth_middleware;
use self::handlers::*;
use crate::dispatch::Dispatcher;

/// State shared by admin handlers.
#[derive(Clone)]
pub struct AdminState {
    pub dispatcher: Arc<Dispatcher>,
    pub api_key: Arc<str>,
    pub started_at: Instant,
}

impl AdminState {
    pub fn new(dispatcher: Arc<Dispatcher>, api_key: &str) -> Self {
        Self {
            dispatcher,
            api_key: Arc::from(api_key),
            started_at: Instant::now(),
        }
    }
}

pub fn setup_admin_router(state: AdminState) -> Router {
    Router::new()
        .route("/admin/status", get(get_status))
        .route("/admin/routes", get(get_routes))
        .route("/admin/breakers", get(get_breakers))
        .layer(middleware::from_fn_with_state(state.clone(), admin_auth_middleware))
        .with_state(state)
}
