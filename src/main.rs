use anyhow::Context;
use dotenvy::dotenv;
use tracing::{info, warn};

use thrive::config::ServerConfig;
use thrive::logging::init_tracing;
use thrive::metrics::{init_metrics, metrics_app};
use thrive::router::init_router;
use thrive::state::init_app_state;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    init_tracing().context("failed to initialise logging")?;

    let server_config = ServerConfig::from_env();
    let state = init_app_state().await;

    sqlx::migrate!("./migrations")
        .run(&state.db)
        .await
        .context("failed to run migrations")?;

    match init_metrics() {
        Ok(Some(handle)) => {
            let metrics_addr = format!("0.0.0.0:{}", server_config.metrics_port);
            let metrics_listener = tokio::net::TcpListener::bind(&metrics_addr)
                .await
                .with_context(|| format!("failed to bind {metrics_addr}"))?;
            info!(addr = %metrics_addr, "Metrics listener started");
            tokio::spawn(async move {
                if let Err(e) = axum::serve(metrics_listener, metrics_app(handle)).await {
                    warn!(error = %e, "Metrics listener stopped");
                }
            });
        }
        Ok(None) => info!("Observability disabled"),
        Err(e) => warn!(error = %e, "Failed to install metrics recorder"),
    }

    let app = init_router(state);

    let addr = format!("0.0.0.0:{}", server_config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    println!("🚀 Server running on http://localhost:{}", server_config.port);
    println!(
        "📚 Swagger UI available at http://localhost:{}/swagger-ui",
        server_config.port
    );
    println!(
        "📖 Scalar UI available at http://localhost:{}/scalar",
        server_config.port
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
    }
}
