use axum::{extract::State, Json};
use serde::Serialize;

use crate::admin::AdminState;
use crate::resilience::{BreakerSnapshot, CircuitState};
use crate::routing::RouteSummary;

#[derive(Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
    pub uptime_secs: u64,
    pub routes: usize,
    pub breakers: usize,
    pub open_breakers: usize,
}

pub async fn get_status(State(state): State<AdminState>) -> Json<SystemStatus> {
    let snapshots = state.dispatcher.breaker_snapshots();
    let open_breakers = snapshots
        .iter()
        .filter(|s| s.state != CircuitState::Closed)
        .count();

    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: if open_breakers == 0 { "operational" } else { "degraded" },
        uptime_secs: state.started_at.elapsed().as_secs(),
        routes: state.dispatcher.route_count(),
        breakers: snapshots.len(),
        open_breakers,
    })
}

pub async fn get_routes(State(state): State<AdminState>) -> Json<Vec<RouteSummary>> {
    Json(state.dispatcher.route_summaries())
}

pub async fn get_breakers(State(state): State<AdminState>) -> Json<Vec<BreakerSnapshot>> {
    Json(state.dispatcher.breaker_snapshots())
}
