mod api;
mod checker;
mod config;
mod error;
mod grader;
mod languages;
mod ledger;
mod problem;
mod runner;
mod store;
mod verdict;

use anyhow::Result;
use tracing::info;

use crate::api::AppState;
use crate::config::EngineConfig;
use crate::store::RedisStore;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive("grader=info".parse()?),
        )
        .init();

    dotenvy::dotenv().ok();

    languages::init_languages()?;
    info!("Loaded language configurations");

    let config = EngineConfig::from_env();
    info!(
        "Engine config: time_limit_ms={}, max_concurrent_gradings={}, scoring_policy={:?}",
        config.time_limit_ms, config.max_concurrent_gradings, config.scoring_policy
    );

    let store = RedisStore::from_env().await?;

    let bind_addr = config.bind_addr.clone();
    let state = AppState::new(store, config);
    let app = api::router(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("Grading engine listening on {}", bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
