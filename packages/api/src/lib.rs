use std::sync::Arc;

use axum::{Router, middleware::from_fn_with_state};
use middleware::auth::auth_middleware;
use state::State;
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer, cors::CorsLayer, decompression::RequestDecompressionLayer,
};
use tracing_subscriber::EnvFilter;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub mod entity;
mod middleware;
pub mod openapi;
mod routes;

pub mod agent;
pub mod bootstrap;
pub mod collector;
pub mod config;
pub mod error;
pub mod provision;
pub mod state;
pub mod tokens;

pub use axum;
pub use sea_orm;

pub mod auth {
    use crate::middleware;
    pub use middleware::auth::AppUser;
}

pub fn warn_env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("warn")
            .add_directive("hyper=warn".parse().unwrap())
            .add_directive("rustls=warn".parse().unwrap())
            .add_directive("tokio=warn".parse().unwrap())
            .add_directive("h2=warn".parse().unwrap())
            .add_directive("tower=warn".parse().unwrap())
    })
}

/// The authenticated control-plane API, served on `API_PORT`.
pub fn construct_router(state: Arc<State>) -> Router {
    let router = Router::new()
        .nest("/health", routes::health::routes())
        .nest("/teams", routes::teams::routes())
        .nest("/ingestion-tokens", routes::ingestion_tokens::routes())
        .nest("/sources", routes::sources::routes())
        .with_state(state.clone())
        .layer(from_fn_with_state(state, auth_middleware))
        .layer(CorsLayer::permissive())
        .layer(
            ServiceBuilder::new()
                .layer(RequestDecompressionLayer::new())
                .layer(CompressionLayer::new()),
        );

    Router::new()
        .merge(
            SwaggerUi::new("/swagger-ui").url("/api-doc/openapi.json", openapi::ApiDoc::openapi()),
        )
        .merge(router)
}

/// The unauthenticated OpAMP endpoint the collector fleet polls, served on
/// `OPAMP_PORT`. Kept on its own listener so the data-plane network can
/// reach it without exposing the API.
pub fn construct_opamp_router(state: Arc<State>) -> Router {
    routes::opamp::routes().with_state(state)
}
