use anyhow::Context;

use guestbook_infra::GuestbookConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    guestbook_observability::init();

    let config = GuestbookConfig::from_env().context("invalid configuration")?;
    let app = guestbook_api::app::build_app(&config).context("failed to load guestbook")?;

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!(addr = %listener.local_addr()?, ledger_id = %config.ledger_id, "listening");

    axum::serve(listener, app).await?;
    Ok(())
}
