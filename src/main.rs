mod ai;
mod api;
mod auth;
mod billing;
mod clock;
mod config;
mod error;
mod exercises;
mod store;
mod tier;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::parse();

    tracing::info!(
        "Starting bodypilot HTTP server on {}:{}",
        config.host,
        config.port
    );
    api::run_http_server(config).await
}
