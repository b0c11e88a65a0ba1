use anyhow::{Context, Result};
use filmscraper::{fetch::HttpSource, logging, server, Config};
use std::sync::Arc;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // ─── 1) config & logging ─────────────────────────────────────────
    let cfg = Config::from_env()?;
    logging::init(&cfg.log_level);
    info!(
        source = %cfg.source_url,
        timeout_s = cfg.fetch_timeout.as_secs(),
        retries = cfg.fetch_max_retries,
        "startup"
    );

    // ─── 2) document source ──────────────────────────────────────────
    let source = HttpSource::from_config(&cfg).context("building HTTP client")?;

    // ─── 3) serve until Ctrl-C ───────────────────────────────────────
    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
        info!("shutdown requested");
    };
    server::serve(cfg.socket_addr(), Arc::new(source), shutdown).await
}
