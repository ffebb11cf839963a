use anyhow::Context;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use harness_web::config::HarnessConfig;
use harness_web::routes;
use harness_web::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).init();

    let config = HarnessConfig::from_env()?;
    let addr = format!("{}:{}", config.host, config.port);
    let app = routes::router(AppState::from_config(config)?);

    info!("Starting event harness on {}", addr);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app).await?;
    Ok(())
}
