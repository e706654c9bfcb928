use anyhow::Context;

use portal_api::{
    app::{build_app, build_services},
    config::PortalConfig,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = PortalConfig::from_env().context("invalid configuration")?;
    portal_observability::tracing::init(config.log_format);
    tracing::debug!(?config, "loaded configuration");

    let services = build_services(&config).await?;
    let app = build_app(services);

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
