// ============================================================================
// Configuration du pipeline
// ============================================================================
// Valeur immuable construite une seule fois au démarrage, puis passée
// explicitement au fetcher et au viewer (pas d'état global)
//
// CONCEPTS RUST :
// 1. Builder pattern : méthodes with_* qui consomment self
// 2. Duration : type std pour une durée (pause entre deux tickers)
// 3. Path/PathBuf : chemins de fichiers cross-platform
// ============================================================================

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::models::Interval;

/// Configuration complète du pipeline fetch → CSV → viewer
///
/// Les valeurs par défaut se modifient dans le code source
/// (pas de variables d'environnement ni de flags CLI)
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Symboles à récupérer, dans l'ordre de traitement
    pub tickers: Vec<String>,

    /// Fenêtre de récupération en années
    pub years_to_fetch: u32,

    /// Intervalle des barres (daily)
    pub interval: Interval,

    /// Prix ajustés des splits et dividendes
    pub adjust: bool,

    /// Répertoire des CSV par ticker
    pub data_dir: PathBuf,

    /// Fichier CSV unique de la variante fusionnée
    pub merged_path: PathBuf,

    /// Pause entre deux requêtes
    pub sleep: Duration,

    /// Port local du viewer
    pub port: u16,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tickers: vec!["AAPL".to_string(), "MSFT".to_string(), "TSLA".to_string()],
            years_to_fetch: 3,
            interval: Interval::D1,
            adjust: true,
            data_dir: PathBuf::from("data/raw"),
            merged_path: PathBuf::from("data/all_tickers.csv"),
            sleep: Duration::ZERO,
            port: 5000,
        }
    }
}

impl Config {
    /// Remplace la liste des tickers
    ///
    /// CONCEPT RUST : IntoIterator + Into<String>
    /// - Accepte aussi bien ["AAPL"] que vec![String::from("AAPL")]
    pub fn with_tickers<I, S>(mut self, tickers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tickers = tickers.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_years(mut self, years: u32) -> Self {
        self.years_to_fetch = years;
        self
    }

    pub fn with_adjust(mut self, adjust: bool) -> Self {
        self.adjust = adjust;
        self
    }

    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = dir.into();
        self
    }

    pub fn with_merged_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.merged_path = path.into();
        self
    }

    pub fn with_sleep(mut self, sleep: Duration) -> Self {
        self.sleep = sleep;
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Chemin du CSV d'un ticker : <data_dir>/<TICKER>.csv
    pub fn ticker_path(&self, symbol: &str) -> PathBuf {
        self.data_dir.join(format!("{}.csv", symbol))
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }
}

// ============================================================================
// Tests unitaires
// ============================================================================
