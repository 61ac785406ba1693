use anyhow::Context;
use std::sync::Arc;
use tokio::{signal, sync::mpsc};
use tracing::{error, info};

use souq_api as api;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = api::config::load_config().context("failed to load configuration")?;
    api::config::init_tracing(cfg.log_level(), cfg.log_json);

    // Init DB
    let db_pool = api::db::establish_connection(&cfg).await?;
    if cfg.auto_migrate {
        api::db::run_migrations(&db_pool).await.map_err(|e| {
            error!("Failed running migrations: {}", e);
            e
        })?;
    }

    let db = Arc::new(db_pool);
    let config = Arc::new(cfg);

    // Init events
    let (event_tx, event_rx) = mpsc::channel(1024);
    let event_sender = api::events::EventSender::new(event_tx);
    tokio::spawn(api::events::process_events(event_rx));

    // Payment gateway client
    let gateway: Arc<dyn api::payment::PaymentGateway> =
        Arc::new(api::payment::HostedCheckoutGateway::new(
            config.payment_secret_key.clone(),
            config.payment_api_base.clone(),
        ));
    if config.payment_webhook_secret.is_none() {
        error!("payment_webhook_secret is not configured; completion notifications will be rejected");
    }

    // Aggregate app services used by HTTP handlers
    let services = api::handlers::AppServices::new(
        db.clone(),
        config.clone(),
        Arc::new(event_sender.clone()),
        gateway,
    );

    let state = api::AppState {
        db,
        config: config.clone(),
        event_sender,
        services,
    };
    let app = api::app_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("souq-api listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if signal::ctrl_c().await.is_err() {
        error!("failed to install shutdown signal handler");
        return;
    }
    info!("shutdown signal received");
}
