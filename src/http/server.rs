//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router with the catch-all gateway handler
//! - Wire up middleware (tracing, overall timeout, request ID)
//! - Serve the admin API on its own listener when enabled
//! - Apply configuration reloads to the dispatcher
//! - Drain connections on shutdown

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{HeaderName, Request, Response},
    routing::any,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower_http::{request_id::PropagateRequestIdLayer, timeout::TimeoutLayer, trace::TraceLayer};

use crate::admin::{setup_admin_router, AdminState};
use crate::config::GatewayConfig;
use crate::dispatch::Dispatcher;
use crate::http::request::{request_id_layer, X_REQUEST_ID};
use crate::lifecycle::startup::{build_dispatcher, StartupError};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<Dispatcher>,
}

/// HTTP server for the gateway.
pub struct HttpServer {
    router: Router,
    config: GatewayConfig,
    dispatcher: Arc<Dispatcher>,
}

impl HttpServer {
    /// Create a new HTTP server, building registry, breakers and routes
    /// from `config`.
    pub fn new(config: GatewayConfig) -> Result<Self, StartupError> {
        let dispatcher = Arc::new(build_dispatcher(&config)?);
        Ok(Self::with_dispatcher(config, dispatcher))
    }

    /// Create a server around an already built dispatcher.
    pub fn with_dispatcher(config: GatewayConfig, dispatcher: Arc<Dispatcher>) -> Self {
        let state = AppState {
            dispatcher: dispatcher.clone(),
        };
        let router = Self::build_router(&config, state);
        Self {
            router,
            config,
            dispatcher,
        }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &GatewayConfig, state: AppState) -> Router {
        let request_id_header = HeaderName::from_static(X_REQUEST_ID);
        Router::new()
            .route("/{*path}", any(gateway_handler))
            .route("/", any(gateway_handler))
            .with_state(state)
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(PropagateRequestIdLayer::new(request_id_header))
            .layer(request_id_layer())
            .layer(TraceLayer::new_for_http())
    }

    /// Run the server until `shutdown` fires.
    ///
    /// Validated configurations received on `config_updates` are applied to
    /// the dispatcher without dropping connections.
    pub async fn run(
        self,
        listener: TcpListener,
        config_updates: mpsc::UnboundedReceiver<GatewayConfig>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            routes = self.dispatcher.route_count(),
            "Gateway listening"
        );

        tokio::spawn(apply_reloads(
            self.dispatcher.clone(),
            config_updates,
            shutdown.resubscribe(),
        ));

        if self.config.admin.enabled {
            let admin_listener = TcpListener::bind(&self.config.admin.bind_address).await?;
            let admin_state = AdminState::new(self.dispatcher.clone(), &self.config.admin.api_key);
            let admin_app = setup_admin_router(admin_state);
            let mut admin_shutdown = shutdown.resubscribe();

            tracing::info!(address = %admin_listener.local_addr()?, "Admin API listening");
            tokio::spawn(async move {
                let served = axum::serve(admin_listener, admin_app)
                    .with_graceful_shutdown(async move {
                        let _ = admin_shutdown.recv().await;
                    })
                    .await;
                if let Err(e) = served {
                    tracing::error!(error = %e, "Admin server failed");
                }
            });
        }

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Draining connections");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Catch-all handler: everything goes through the dispatcher.
async fn gateway_handler(State(state): State<AppState>, request: Request<Body>) -> Response<Body> {
    let client_addr = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    state.dispatcher.dispatch(request, client_addr).await
}

async fn apply_reloads(
    dispatcher: Arc<Dispatcher>,
    mut config_updates: mpsc::UnboundedReceiver<GatewayConfig>,
    mut shutdown: broadcast::Receiver<()>,
) {
    loop {
        tokio::select! {
            update = config_updates.recv() => match update {
                Some(config) => match dispatcher.reload(&config) {
                    Ok(()) => tracing::info!(routes = dispatcher.route_count(), "Configuration reloaded"),
                    Err(errors) => {
                        for error in &errors {
                            tracing::error!(error = %error, "Rejected configuration reload");
                        }
                    }
                },
                None => break,
            },
            _ = shutdown.recv() => break,
        }
    }
    tracing::debug!("Reload task stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RouteConfig;
    use axum::http::StatusCode;
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_unmatched_request_gets_404_and_request_id() {
        let mut config = GatewayConfig::default();
        config
            .routes
            .push(RouteConfig::service("account-service", "/api/v1/account", "account-service"));
        let server = HttpServer::new(config).unwrap();

        let response = server
            .router
            .oneshot(Request::builder().uri("/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(response.headers().contains_key(X_REQUEST_ID));
    }

    #[tokio::test]
    async fn test_client_request_id_is_kept() {
        let server = HttpServer::new(GatewayConfig::default()).unwrap();
        let response = server
            .router
            .oneshot(
                Request::builder()
                    .uri("/")
                    .header(X_REQUEST_ID, "client-chosen")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.headers().get(X_REQUEST_ID).unwrap(), "client-chosen");
    }
}
