use anyhow::Context;

use assetdesk_infra::{AppConfig, LogFormat};
use assetdesk_observability::TracingOptions;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env().context("invalid configuration")?;

    assetdesk_observability::init(&TracingOptions {
        filter: config.log_filter.clone(),
        json: config.log_format == LogFormat::Json,
    });
    tracing::info!(?config, "starting");

    let app = assetdesk_api::app::build_app(&config).await?;

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
