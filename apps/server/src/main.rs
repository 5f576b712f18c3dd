#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use std::sync::Arc;

use hdx_api::config::Config;
use hdx_api::state::State;
use hdx_api::{construct_opamp_router, construct_router};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    tracing::info!("Starting HyperDX ingestion control plane");

    let config = Config::from_env()?;
    tracing::info!(
        shard_count = config.shard_count,
        provisioning_enabled = config.provisioning_enabled,
        "Loaded configuration"
    );

    let state = Arc::new(State::new(config.clone()).await?);

    let api = construct_router(state.clone());
    let opamp = construct_opamp_router(state);

    let api_addr = format!("0.0.0.0:{}", config.api_port);
    let opamp_addr = format!("0.0.0.0:{}", config.opamp_port);
    tracing::info!("API listening on {api_addr}, OpAMP on {opamp_addr}");

    let api_listener = tokio::net::TcpListener::bind(&api_addr).await?;
    let opamp_listener = tokio::net::TcpListener::bind(&opamp_addr).await?;

    tokio::try_join!(
        axum::serve(api_listener, api),
        axum::serve(opamp_listener, opamp),
    )?;

    Ok(())
}
