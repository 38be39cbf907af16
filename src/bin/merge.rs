// ============================================================================
// StockBars - variante fusionnée
// ============================================================================
// Récupère tous les tickers et écrit un seul CSV avec une colonne Ticker.
// Pas de viewer : le process s'arrête après l'écriture.
// ============================================================================

use anyhow::Result;
use tracing::{info, warn};

use stockbars::api::YahooClient;
use stockbars::fetcher::collect_merged;
use stockbars::logging::init_logging;
use stockbars::Config;

#[tokio::main]
async fn main() -> Result<()> {
    init_logging("stockbars-merge.log").unwrap_or_else(|e| {
        eprintln!("⚠️  Warning: Failed to initialize logging: {}", e);
        eprintln!("   Continuing without logging...");
    });

    let config = Config::default();
    info!(?config, "StockBars merge starting up");

    let source = YahooClient::new()?;
    let summary = collect_merged(&source, &config).await?;

    match &summary.path {
        Some(path) => info!(
            rows = summary.rows_written,
            path = %path.display(),
            failed = summary.batch.failed(),
            "Merge complete"
        ),
        None => warn!(failed = summary.batch.failed(), "Merge complete, no file written"),
    }
    Ok(())
}
