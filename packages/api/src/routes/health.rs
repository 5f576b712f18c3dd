//! Liveness and readiness probes.
//!
//! The control plane leans on two stores: the Postgres registry behind every
//! handler, and the ClickHouse admin endpoint behind provisioning. `/health`
//! is pure liveness; `/health/db` round-trips both stores so an operator can
//! tell which side of the plane is degraded.

use std::time::Instant;

use axum::Json;
use axum::extract::State;
use axum::{Router, routing::get};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::InternalError;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(health))
        .route("/db", get(db_health))
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
}

/// Round-trip result for one backing store.
#[derive(Serialize, Deserialize, ToSchema)]
pub struct BackendHealth {
    pub reachable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rtt_ms: Option<u128>,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct DbHealthResponse {
    /// Postgres registry. Unreachable fails the whole probe with a 500.
    pub registry: BackendHealth,
    /// ClickHouse admin endpoint. Absent when provisioning is disabled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analytical_store: Option<BackendHealth>,
}

#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Service is up", body = HealthResponse)
    )
)]
#[tracing::instrument(name = "GET /health")]
pub async fn health() -> Result<Json<HealthResponse>, InternalError> {
    Ok(Json(HealthResponse {
        status: "ok".to_string(),
    }))
}

#[utoipa::path(
    get,
    path = "/health/db",
    tag = "health",
    responses(
        (status = 200, description = "Round-trip times of the backing stores", body = DbHealthResponse),
        (status = 500, description = "Registry unreachable")
    )
)]
#[tracing::instrument(name = "GET /health/db", skip(state))]
pub async fn db_health(
    State(state): State<AppState>,
) -> Result<Json<DbHealthResponse>, InternalError> {
    // Every handler needs the registry, so its failure fails the probe.
    let started = Instant::now();
    state.db.ping().await?;
    let registry = BackendHealth {
        reachable: true,
        rtt_ms: Some(started.elapsed().as_millis()),
    };

    // Admin-endpoint trouble is surfaced but does not fail the probe: the
    // bootstrap retries provisioning on the next team event anyway.
    let analytical_store = match &state.provisioner {
        Some(provisioner) => {
            let started = Instant::now();
            match provisioner.ping().await {
                Ok(()) => Some(BackendHealth {
                    reachable: true,
                    rtt_ms: Some(started.elapsed().as_millis()),
                }),
                Err(err) => {
                    tracing::warn!("ClickHouse admin endpoint unreachable: {err:#}");
                    Some(BackendHealth {
                        reachable: false,
                        rtt_ms: None,
                    })
                }
            }
        }
        None => None,
    };

    Ok(Json(DbHealthResponse {
        registry,
        analytical_store,
    }))
}
