use std::sync::Arc;

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use lilith_launcher::core::http::build_http_client;
use lilith_launcher::core::orchestrator::HEADLESS_FLAG;
use lilith_launcher::{ConsoleSink, LaunchOrchestrator};

#[tokio::main]
async fn main() {
    // Initialize structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,lilith_launcher=debug")),
        )
        .init();

    info!("Lilith launcher starting...");
    if has_arg(HEADLESS_FLAG) {
        info!("Running in headless recovery mode");
    }

    let http_client = match build_http_client() {
        Ok(client) => client,
        Err(e) => {
            eprintln!("Cannot build HTTP client: {e}");
            std::process::exit(1);
        }
    };

    let orchestrator = Arc::new(LaunchOrchestrator::new(
        LaunchOrchestrator::default_work_dir(),
        http_client,
        Arc::new(ConsoleSink),
    ));

    // Ctrl-C maps to the external `stop` action: terminate the child, keep
    // the launcher alive.
    {
        let orchestrator = orchestrator.clone();
        tokio::spawn(async move {
            while tokio::signal::ctrl_c().await.is_ok() {
                if let Err(e) = orchestrator.stop().await {
                    warn!("Stop action failed: {e}");
                }
            }
        });
    }

    if orchestrator.run().await.is_err() {
        std::process::exit(1);
    }
}

fn has_arg(flag: &str) -> bool {
    std::env::args().any(|arg| arg == flag)
}
