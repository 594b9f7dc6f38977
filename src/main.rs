use jetview::config::Config;
use jetview::dashboard::start_dashboard_server;
use jetview::{logging, AdminEngine};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

// ========================================
// MAIN ENTRY POINT
// ========================================

#[tokio::main]
async fn main() -> std::io::Result<()> {
    let config = Config::global();
    logging::init(&config.log);

    info!("🚀 jetview v{} starting...", env!("CARGO_PKG_VERSION"));

    let engine = AdminEngine::connect(config).await;
    let shutdown = CancellationToken::new();

    let statistics = engine.start_statistics(&config.stats, &config.broker, shutdown.clone());

    let signal = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("🛑 shutdown requested");
        }
        signal.cancel();
    });

    let served = start_dashboard_server(engine, &config.server.addr, shutdown.clone()).await;

    shutdown.cancel();
    let _ = statistics.await;

    if let Err(e) = &served {
        error!(addr = %config.server.addr, error = %e, "admin server failed");
    }
    info!("jetview stopped");
    served
}
