use anyhow::Result;
use tokio::net::TcpListener;
use tokio::signal;
use tokio::sync::broadcast;

use classifieds_notification_service::config::Settings;
use classifieds_notification_service::server::{create_app, AppState};
use classifieds_notification_service::tasks::DigestScheduleTask;
use classifieds_notification_service::telemetry::init_telemetry;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let settings = Settings::new()?;

    // Initialize tracing; the guard flushes OTLP spans on drop
    let _telemetry_guard = init_telemetry(&settings.otel)?;
    tracing::info!("Configuration loaded");

    // Create application state
    let state = AppState::new(settings.clone()).await?;
    tracing::info!(
        store = state.store.backend_name(),
        mailer = state.mailer.backend_name(),
        "Application state initialized"
    );

    let (shutdown_tx, _) = broadcast::channel(1);

    // The task is built unconditionally so a bad schedule or timezone
    // fails at startup even when the scheduler is not spawned
    let digest_task = DigestScheduleTask::new(
        settings.digest.clone(),
        settings.notification.fan_out_width,
        state.resolver.clone(),
        state.dispatcher.clone(),
        shutdown_tx.subscribe(),
    )?;

    let digest_handle = if settings.digest.run_scheduler {
        Some(tokio::spawn(async move {
            digest_task.run().await;
        }))
    } else {
        tracing::info!("Digest scheduler disabled, expecting an external scheduler to call the job endpoint");
        None
    };

    // Create Axum app
    let app = create_app(state);

    // Start server
    let addr = settings.server_addr();
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal_handler(shutdown_tx))
        .await?;

    // Wait for background tasks to finish
    if let Some(handle) = digest_handle {
        tracing::info!("Waiting for background tasks to finish...");
        let _ = handle.await;
    }

    tracing::info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal_handler(shutdown_tx: broadcast::Sender<()>) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received terminate signal, initiating graceful shutdown");
        }
    }

    // Stop the digest scheduler
    let _ = shutdown_tx.send(());
}
