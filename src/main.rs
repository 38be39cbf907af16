// ============================================================================
// StockBars - variante par ticker
// ============================================================================
// 1. Récupère N années de barres journalières pour chaque ticker configuré
// 2. Écrit un CSV par ticker dans data/raw/
// 3. Lance le viewer sur http://127.0.0.1:5000 jusqu'à l'arrêt du process
// ============================================================================

use std::sync::Arc;

use anyhow::Result;
use tracing::{error, info};

use stockbars::api::YahooClient;
use stockbars::fetcher::collect_per_ticker;
use stockbars::logging::init_logging;
use stockbars::{web, Config};

#[tokio::main]
async fn main() -> Result<()> {
    // Logging avant tout le reste ; en cas d'échec on continue sans
    init_logging("stockbars.log").unwrap_or_else(|e| {
        eprintln!("⚠️  Warning: Failed to initialize logging: {}", e);
        eprintln!("   Continuing without logging...");
    });

    let config = Arc::new(Config::default());
    info!(?config, "StockBars starting up");

    let source = YahooClient::new()?;
    let summary = collect_per_ticker(&source, &config).await;
    for report in &summary.reports {
        info!(ticker = %report.symbol, status = %report.status, "Ticker result");
    }

    let result = web::serve(config).await;
    if let Err(e) = &result {
        error!(error = ?e, "Viewer exited with error");
    }
    result
}
