use anyhow::Context;
use axum::ServiceExt;
use axum::extract::Request;

use bloodbank_infra::config::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env().context("invalid configuration")?;
    bloodbank_observability::init(config.log_format);

    let bind_addr = config.bind_addr;
    let environment = config.environment;
    let app = bloodbank_api::app::build_app(config).await?;

    let listener = tokio::net::TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;

    tracing::info!(addr = %listener.local_addr()?, ?environment, "BloodBank API listening");

    axum::serve(listener, ServiceExt::<Request>::into_make_service(app))
        .await
        .context("server error")?;
    Ok(())
}
