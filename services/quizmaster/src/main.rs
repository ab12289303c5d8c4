use anyhow::Result;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use quizmaster::{build_state, config::AppConfig, create_router};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("quizmaster=info,tower_http=info"));
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting quizmaster service");

    let config = AppConfig::from_env()?;
    let state = build_state(&config).await?;

    let app = create_router(state);

    let listener = TcpListener::bind(config.bind_addr).await?;
    info!("Quizmaster service listening on {}", config.bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
