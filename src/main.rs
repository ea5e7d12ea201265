use std::sync::Arc;

use anyhow::Context;
use tokio::sync::Mutex;

use order_assist::cart::Menu;
use order_assist::cli::CliChannel;
use order_assist::config::OrderConfig;
use order_assist::flow::{OrderRouteState, OrderSession, SessionServices, order_routes};
use order_assist::notifications::spawn_sweep_task;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = OrderConfig::from_env().context("invalid ORDER_ASSIST_* configuration")?;

    eprintln!("🍔 Order Assist v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Store: {}", config.store.name);
    eprintln!("   Postal codes: {}", config.cep_endpoint);
    eprintln!("   Text generation: {}", config.text_endpoint);
    if let Some(port) = config.http_port {
        eprintln!("   Order API: http://0.0.0.0:{}/api/order/state", port);
    }
    eprintln!("   Type a message and press Enter. /help for commands.\n");

    let services = SessionServices::from_config(&config);
    let _sweep_handle =
        spawn_sweep_task(Arc::clone(&services.notifications), config.sweep_interval);

    let http_port = config.http_port;
    let session = Arc::new(Mutex::new(OrderSession::new(
        config,
        Menu::default(),
        services,
    )));

    if let Some(port) = http_port {
        let app = order_routes(OrderRouteState {
            session: Arc::clone(&session),
        });
        let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port))
            .await
            .with_context(|| format!("failed to bind order API port {port}"))?;
        tracing::info!(port, "Order API server started");
        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                tracing::error!(error = %e, "Order API server stopped");
            }
        });
    }

    CliChannel::new(session).run().await;
    Ok(())
}
