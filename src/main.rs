use anyhow::Result;
use dotenv::dotenv;
use tracing::info;

use news_collector::collector::Collector;
use news_collector::configuration::Settings;
use news_collector::logging;
use news_collector::scheduler::Scheduler;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // A missing .env is fine
    dotenv().ok();

    let settings = Settings::new()?;
    let _log_guard = logging::init(&settings.logging)?;
    info!("News collector starting");

    let scheduler = Scheduler::from_settings(&settings.schedule)?;
    let collector = Collector::new(settings);

    tokio::select! {
        _ = scheduler.run(&collector) => {}
        _ = shutdown_signal() => {
            info!("Shutdown signal received, exiting");
        }
    }
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
