// ============================================================================
// Fetcher : récupération séquentielle des tickers
// ============================================================================
// Pour chaque ticker configuré : fetch → classification → écriture CSV
//
// Deux variantes :
// - par ticker : un fichier <data_dir>/<TICKER>.csv par symbole
// - fusionnée : un seul CSV avec une colonne Ticker
//
// CONCEPTS RUST :
// 1. Enum avec données : FetchOutcome remplace un catch-all d'exceptions
// 2. Pattern matching exhaustif : chaque cas est traité explicitement
// 3. &dyn Trait : la source distante est injectée (mock en test)
// ============================================================================

use std::fmt;
use std::path::PathBuf;

use anyhow::Result;
use tracing::{debug, error, info, warn};

use crate::api::BarSource;
use crate::config::Config;
use crate::models::BarTable;
use crate::storage;

/// Résultat typé du fetch d'un ticker
#[derive(Debug)]
pub enum FetchOutcome {
    /// Table non vide
    Fetched(BarTable),
    /// Requête valide mais aucune ligne
    Empty,
    /// Erreur réseau, symbole invalide, erreur du fournisseur...
    Failed(anyhow::Error),
}

/// Statut final d'un ticker dans un batch
#[derive(Debug, Clone, PartialEq)]
pub enum TickerStatus {
    /// Données obtenues (et écrites pour la variante par ticker)
    Ok { rows: usize },
    /// Aucune donnée : rien n'est écrit
    Empty,
    /// Échec : message d'erreur complet
    Failed(String),
}

impl fmt::Display for TickerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TickerStatus::Ok { rows } => write!(f, "OK ({} rows)", rows),
            TickerStatus::Empty => write!(f, "WARN (no data)"),
            TickerStatus::Failed(reason) => write!(f, "ERROR ({})", reason),
        }
    }
}

/// Rapport pour un ticker
#[derive(Debug, Clone, PartialEq)]
pub struct TickerReport {
    pub symbol: String,
    /// Fichier cible (variante par ticker), même s'il n'a pas été écrit
    pub path: Option<PathBuf>,
    pub status: TickerStatus,
}

/// Résumé d'un batch par ticker
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchSummary {
    pub reports: Vec<TickerReport>,
}

impl BatchSummary {
    pub fn saved(&self) -> usize {
        self.count(|s| matches!(s, TickerStatus::Ok { .. }))
    }

    pub fn empty(&self) -> usize {
        self.count(|s| matches!(s, TickerStatus::Empty))
    }

    pub fn failed(&self) -> usize {
        self.count(|s| matches!(s, TickerStatus::Failed(_)))
    }

    fn count(&self, pred: impl Fn(&TickerStatus) -> bool) -> usize {
        self.reports.iter().filter(|r| pred(&r.status)).count()
    }
}

/// Résumé de la variante fusionnée
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergeSummary {
    pub batch: BatchSummary,
    /// Fichier écrit, None si aucune table n'a été collectée
    pub path: Option<PathBuf>,
    pub rows_written: usize,
}

// ============================================================================
// Fetch d'un ticker
// ============================================================================

/// Appelle la source distante et classe le résultat
pub async fn fetch_ticker(source: &dyn BarSource, config: &Config, symbol: &str) -> FetchOutcome {
    match source.fetch_daily_bars(symbol, config).await {
        Ok(table) if table.is_empty() => FetchOutcome::Empty,
        Ok(table) => FetchOutcome::Fetched(table),
        Err(e) => FetchOutcome::Failed(e),
    }
}

/// Variante par ticker : fetch puis écriture de <data_dir>/<TICKER>.csv
///
/// data_dir est créé avant la requête, même si le ticker revient vide.
/// Une erreur de création ou d'écriture est rapportée comme l'échec de
/// ce ticker et n'interrompt jamais le batch
pub async fn save_ticker(source: &dyn BarSource, config: &Config, symbol: &str) -> TickerReport {
    let out_path = config.ticker_path(symbol);

    if let Err(e) = storage::ensure_dir(config.data_dir()) {
        error!(ticker = %symbol, error = ?e, "Failed to prepare data directory");
        return TickerReport {
            symbol: symbol.to_string(),
            path: Some(out_path),
            status: TickerStatus::Failed(format!("{:#}", e)),
        };
    }

    let status = match fetch_ticker(source, config, symbol).await {
        FetchOutcome::Fetched(table) => match storage::write_bars(&out_path, &table) {
            Ok(()) => {
                info!(ticker = %symbol, rows = table.len(), path = %out_path.display(), "OK");
                TickerStatus::Ok { rows: table.len() }
            }
            Err(e) => {
                error!(ticker = %symbol, error = ?e, "Failed to save ticker data");
                TickerStatus::Failed(format!("{:#}", e))
            }
        },
        FetchOutcome::Empty => {
            warn!(ticker = %symbol, "No data returned");
            TickerStatus::Empty
        }
        FetchOutcome::Failed(e) => {
            error!(ticker = %symbol, error = ?e, "Failed to fetch ticker data");
            TickerStatus::Failed(format!("{:#}", e))
        }
    };

    TickerReport {
        symbol: symbol.to_string(),
        path: Some(out_path),
        status,
    }
}

/// Pause configurée entre deux tickers (sauf après un échec)
async fn pause(config: &Config, status: &TickerStatus) {
    if matches!(status, TickerStatus::Failed(_)) || config.sleep.is_zero() {
        return;
    }
    debug!(sleep_ms = config.sleep.as_millis() as u64, "Pausing before next ticker");
    tokio::time::sleep(config.sleep).await;
}

// ============================================================================
// Batchs
// ============================================================================

/// Variante par ticker : traite tous les tickers dans l'ordre, un par un
pub async fn collect_per_ticker(source: &dyn BarSource, config: &Config) -> BatchSummary {
    let mut summary = BatchSummary::default();
    let total = config.tickers.len();

    for (i, symbol) in config.tickers.iter().enumerate() {
        debug!(ticker = %symbol, progress = i + 1, total, "Fetching ticker");

        let report = save_ticker(source, config, symbol).await;
        pause(config, &report.status).await;
        summary.reports.push(report);
    }

    info!(
        saved = summary.saved(),
        empty = summary.empty(),
        failed = summary.failed(),
        total,
        "Per-ticker fetch complete"
    );
    summary
}

/// Variante fusionnée : collecte les tables non vides puis écrit un seul CSV
///
/// Une erreur d'écriture du fichier final interrompt le run
pub async fn collect_merged(source: &dyn BarSource, config: &Config) -> Result<MergeSummary> {
    let mut summary = MergeSummary::default();
    let mut tables: Vec<BarTable> = Vec::new();
    let total = config.tickers.len();

    for (i, symbol) in config.tickers.iter().enumerate() {
        debug!(ticker = %symbol, progress = i + 1, total, "Fetching ticker");

        let status = match fetch_ticker(source, config, symbol).await {
            FetchOutcome::Fetched(table) => {
                info!(ticker = %symbol, rows = table.len(), "OK");
                let rows = table.len();
                tables.push(table);
                TickerStatus::Ok { rows }
            }
            FetchOutcome::Empty => {
                warn!(ticker = %symbol, "No data returned");
                TickerStatus::Empty
            }
            FetchOutcome::Failed(e) => {
                error!(ticker = %symbol, error = ?e, "Failed to fetch ticker data");
                TickerStatus::Failed(format!("{:#}", e))
            }
        };

        pause(config, &status).await;
        summary.batch.reports.push(TickerReport {
            symbol: symbol.clone(),
            path: None,
            status,
        });
    }

    if tables.is_empty() {
        warn!("No data collected, nothing written");
        return Ok(summary);
    }

    let rows = storage::write_merged(&config.merged_path, &tables)?;
    info!(
        rows,
        tickers = tables.len(),
        path = %config.merged_path.display(),
        "Merged CSV written"
    );

    summary.path = Some(config.merged_path.clone());
    summary.rows_written = rows;
    Ok(summary)
}

// ============================================================================
// Tests unitaires
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Bar, TaggedBar};
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::Duration;
    use tempfile::TempDir;

    /// Source factice : nombre de lignes par symbole, None = erreur
    struct MockSource {
        rows: HashMap<&'static str, Option<usize>>,
        calls: Mutex<Vec<String>>,
    }

    impl MockSource {
        fn new(rows: &[(&'static str, Option<usize>)]) -> Self {
            Self {
                rows: rows.iter().copied().collect(),
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl BarSource for MockSource {
        async fn fetch_daily_bars(&self, symbol: &str, _config: &Config) -> Result<BarTable> {
            self.calls.lock().unwrap().push(symbol.to_string());
            match self.rows.get(symbol).copied().flatten() {
                Some(n) => {
                    let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
                    let bars = (0..n)
                        .map(|i| {
                            let date = start + chrono::Duration::days(i as i64);
                            Bar::new(date, 1.0, 2.0, 0.5, 1.5, 100 + i as u64)
                        })
                        .collect();
                    Ok(BarTable::with_bars(symbol, bars))
                }
                None => anyhow::bail!("symbol may be delisted: {}", symbol),
            }
        }
    }

    fn config(tmp: &TempDir, tickers: &[&str]) -> Config {
        Config::default()
            .with_tickers(tickers.iter().copied())
            .with_data_dir(tmp.path().join("raw"))
            .with_merged_path(tmp.path().join("merged/all.csv"))
    }

    #[tokio::test]
    async fn test_fetch_ticker_classifies() {
        let source = MockSource::new(&[("AAPL", Some(2)), ("EMPTY", Some(0)), ("BAD", None)]);
        let cfg = Config::default();

        assert!(matches!(
            fetch_ticker(&source, &cfg, "AAPL").await,
            FetchOutcome::Fetched(t) if t.len() == 2
        ));
        assert!(matches!(fetch_ticker(&source, &cfg, "EMPTY").await, FetchOutcome::Empty));
        assert!(matches!(fetch_ticker(&source, &cfg, "BAD").await, FetchOutcome::Failed(_)));
    }

    #[tokio::test]
    async fn test_per_ticker_batch_continues_after_failure() {
        let tmp = TempDir::new().unwrap();
        let source = MockSource::new(&[("AAPL", Some(3)), ("BAD", None), ("EMPTY", Some(0)), ("TSLA", Some(1))]);
        let cfg = config(&tmp, &["AAPL", "BAD", "EMPTY", "TSLA"]);

        let summary = collect_per_ticker(&source, &cfg).await;

        // Tous les tickers sont tentés, dans l'ordre
        assert_eq!(*source.calls.lock().unwrap(), vec!["AAPL", "BAD", "EMPTY", "TSLA"]);
        assert_eq!(summary.saved(), 2);
        assert_eq!(summary.empty(), 1);
        assert_eq!(summary.failed(), 1);

        let aapl = storage::read_bars(cfg.ticker_path("AAPL")).unwrap();
        assert_eq!(aapl.len(), 3);
        assert!(!cfg.ticker_path("EMPTY").exists());
        assert!(!cfg.ticker_path("BAD").exists());

        // Le chemin prévu est rapporté même sans écriture
        let empty = &summary.reports[2];
        assert_eq!(empty.status, TickerStatus::Empty);
        assert_eq!(empty.path, Some(cfg.ticker_path("EMPTY")));
    }

    #[tokio::test]
    async fn test_per_ticker_is_idempotent() {
        let tmp = TempDir::new().unwrap();
        let source = MockSource::new(&[("AAPL", Some(4))]);
        let cfg = config(&tmp, &["AAPL"]);

        collect_per_ticker(&source, &cfg).await;
        let first = std::fs::read_to_string(cfg.ticker_path("AAPL")).unwrap();
        collect_per_ticker(&source, &cfg).await;
        let second = std::fs::read_to_string(cfg.ticker_path("AAPL")).unwrap();

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_write_failure_is_reported_per_ticker() {
        let tmp = TempDir::new().unwrap();
        let source = MockSource::new(&[("AAPL", Some(1)), ("MSFT", Some(1))]);
        let cfg = config(&tmp, &["AAPL", "MSFT"]);
        // Un répertoire à la place de AAPL.csv : l'ouverture en écriture échoue
        std::fs::create_dir_all(cfg.ticker_path("AAPL")).unwrap();

        let summary = collect_per_ticker(&source, &cfg).await;
        assert_eq!(summary.failed(), 1);
        assert_eq!(summary.saved(), 1);
        assert!(matches!(summary.reports[0].status, TickerStatus::Failed(_)));
        assert!(cfg.ticker_path("MSFT").is_file());
    }

    #[tokio::test]
    async fn test_unusable_data_dir_fails_before_fetch() {
        let tmp = TempDir::new().unwrap();
        let source = MockSource::new(&[("AAPL", Some(1)), ("MSFT", Some(1))]);
        let cfg = config(&tmp, &["AAPL", "MSFT"]);
        // data_dir est un fichier : la création du répertoire échoue
        std::fs::write(&cfg.data_dir, "not a dir").unwrap();

        let summary = collect_per_ticker(&source, &cfg).await;
        assert_eq!(summary.failed(), 2);
        assert!(source.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_data_dir_created_even_when_empty() {
        let tmp = TempDir::new().unwrap();
        let source = MockSource::new(&[("EMPTY", Some(0))]);
        let cfg = config(&tmp, &["EMPTY"]);
        assert!(!cfg.data_dir.exists());

        let summary = collect_per_ticker(&source, &cfg).await;
        assert_eq!(summary.empty(), 1);
        assert!(cfg.data_dir.is_dir());
        assert!(!cfg.ticker_path("EMPTY").exists());
    }

    #[tokio::test]
    async fn test_merged_batch() {
        let tmp = TempDir::new().unwrap();
        let source = MockSource::new(&[("AAPL", Some(2)), ("EMPTY", Some(0)), ("BAD", None), ("TSLA", Some(3))]);
        let cfg = config(&tmp, &["AAPL", "EMPTY", "BAD", "TSLA"]);

        let summary = collect_merged(&source, &cfg).await.unwrap();
        assert_eq!(summary.rows_written, 5);
        assert_eq!(summary.path, Some(cfg.merged_path.clone()));
        assert_eq!(summary.batch.saved(), 2);

        let mut rdr = csv::Reader::from_path(&cfg.merged_path).unwrap();
        let rows: Vec<TaggedBar> = rdr.deserialize().map(|r| r.unwrap()).collect();
        let tickers: Vec<&str> = rows.iter().map(|r| r.ticker.as_str()).collect();
        assert_eq!(tickers, vec!["AAPL", "AAPL", "TSLA", "TSLA", "TSLA"]);

        // Aucun fichier par ticker dans la variante fusionnée
        assert!(!cfg.data_dir.exists());
    }

    #[tokio::test]
    async fn test_merged_without_data_writes_nothing() {
        let tmp = TempDir::new().unwrap();
        let source = MockSource::new(&[("EMPTY", Some(0)), ("BAD", None)]);
        let cfg = config(&tmp, &["EMPTY", "BAD"]);

        let summary = collect_merged(&source, &cfg).await.unwrap();
        assert_eq!(summary.path, None);
        assert_eq!(summary.rows_written, 0);
        assert!(!cfg.merged_path.exists());
    }

    #[tokio::test(start_paused = true)]
    async fn test_pause_between_tickers() {
        let tmp = TempDir::new().unwrap();
        let source = MockSource::new(&[("AAPL", Some(1)), ("BAD", None), ("TSLA", Some(0))]);
        let cfg = config(&tmp, &["AAPL", "BAD", "TSLA"]).with_sleep(Duration::from_secs(2));

        let started = tokio::time::Instant::now();
        collect_per_ticker(&source, &cfg).await;

        // Pause après AAPL (ok) et TSLA (vide), pas après BAD (échec)
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(4) && elapsed < Duration::from_secs(5));
    }

    #[test]
    fn test_status_display() {
        assert_eq!(TickerStatus::Ok { rows: 3 }.to_string(), "OK (3 rows)");
        assert_eq!(TickerStatus::Empty.to_string(), "WARN (no data)");
    }
}
