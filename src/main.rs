use clap::Parser;
use pagesnap::{load_config, router, setup_logging, BrowserSession, CaptureService, Cli, Metrics};
use std::sync::Arc;
use tokio::signal;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Cli::parse();

    let config = Arc::new(load_config(&args).await?);
    setup_logging(args.verbose || config.debug)?;

    info!("Starting pagesnap v{}", env!("CARGO_PKG_VERSION"));

    let session = Arc::new(BrowserSession::new(config.clone()));
    let metrics = Arc::new(Metrics::new());
    let service = Arc::new(CaptureService::new(
        session.clone(),
        config.clone(),
        metrics,
    ));

    let app = router(service);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Listening on http://{addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Shutting down...");
    session.teardown().await;
    info!("pagesnap stopped");
    Ok(())
}

async fn shutdown_signal() {
    let mut sigint = signal::unix::signal(signal::unix::SignalKind::interrupt())
        .expect("Failed to create SIGINT handler");
    let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())
        .expect("Failed to create SIGTERM handler");

    tokio::select! {
        _ = sigint.recv() => info!("Received SIGINT"),
        _ = sigterm.recv() => info!("Received SIGTERM"),
    }
}
