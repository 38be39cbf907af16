// ============================================================================
// Structure : Bar (une journée de cotation OHLCV)
// ============================================================================
// Représente une ligne de données journalières pour un ticker
//
// CONCEPTS RUST :
// 1. NaiveDate : date calendaire sans fuseau horaire (chrono)
// 2. #[serde(rename = "...")] : nom de colonne CSV différent du champ Rust
// 3. Ordering : NaiveDate implémente Ord, le tri par date est direct
// ============================================================================

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Intervalle de temps entre les barres
///
/// La configuration par défaut utilise uniquement D1 (daily)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interval {
    /// 1 jour (daily)
    D1,
    /// 1 semaine (weekly)
    W1,
    /// 1 mois (monthly)
    MO1,
}

impl Interval {
    /// Convertit l'intervalle en string pour l'API Yahoo Finance
    ///
    /// CONCEPT RUST : &'static str
    /// - Retourne une string littérale (dans le binaire)
    /// - Pas d'allocation
    pub fn to_yahoo_string(&self) -> &'static str {
        match self {
            Interval::D1 => "1d",
            Interval::W1 => "1wk",
            Interval::MO1 => "1mo",
        }
    }
}

impl Default for Interval {
    /// Intervalle par défaut : barres journalières
    fn default() -> Self {
        Interval::D1
    }
}

/// Une barre journalière : Date + Open, High, Low, Close, Volume
///
/// L'ordre des champs est l'ordre des colonnes du CSV (Date en premier)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    /// Jour de cotation (format ISO YYYY-MM-DD dans le CSV)
    #[serde(rename = "Date")]
    pub date: NaiveDate,

    #[serde(rename = "Open")]
    pub open: f64,

    #[serde(rename = "High")]
    pub high: f64,

    #[serde(rename = "Low")]
    pub low: f64,

    #[serde(rename = "Close")]
    pub close: f64,

    /// Volume échangé
    #[serde(rename = "Volume")]
    pub volume: u64,
}

impl Bar {
    /// Constructeur : crée une nouvelle barre
    pub fn new(date: NaiveDate, open: f64, high: f64, low: f64, close: f64, volume: u64) -> Self {
        Self {
            date,
            open,
            high,
            low,
            close,
            volume,
        }
    }
}

/// Barre étiquetée avec son ticker (variante fusionnée)
///
/// CONCEPT RUST : #[serde(flatten)] ne fonctionne pas avec le crate csv,
/// on répète donc les colonnes explicitement. Ticker est la dernière colonne.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaggedBar {
    #[serde(rename = "Date")]
    pub date: NaiveDate,

    #[serde(rename = "Open")]
    pub open: f64,

    #[serde(rename = "High")]
    pub high: f64,

    #[serde(rename = "Low")]
    pub low: f64,

    #[serde(rename = "Close")]
    pub close: f64,

    #[serde(rename = "Volume")]
    pub volume: u64,

    /// Symbole d'origine de la ligne
    #[serde(rename = "Ticker")]
    pub ticker: String,
}

impl TaggedBar {
    pub fn from_bar(bar: &Bar, ticker: &str) -> Self {
        Self {
            date: bar.date,
            open: bar.open,
            high: bar.high,
            low: bar.low,
            close: bar.close,
            volume: bar.volume,
            ticker: ticker.to_string(),
        }
    }
}

/// Table de barres pour un ticker, triée par date croissante
///
/// Une table vide signifie "pas de données" pour ce ticker
#[derive(Debug, Clone, PartialEq)]
pub struct BarTable {
    /// Symbole du ticker
    pub symbol: String,

    /// Liste des barres, dans l'ordre chronologique
    pub bars: Vec<Bar>,
}

impl BarTable {
    /// Crée une table vide pour un ticker
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            bars: Vec::new(),
        }
    }

    /// Crée une table à partir de barres déjà chargées
    pub fn with_bars(symbol: impl Into<String>, bars: Vec<Bar>) -> Self {
        Self {
            symbol: symbol.into(),
            bars,
        }
    }

    /// Ajoute une barre
    pub fn push(&mut self, bar: Bar) {
        self.bars.push(bar);
    }

    /// Retourne le nombre de barres
    pub fn len(&self) -> usize {
        self.bars.len()
    }

    /// Vérifie si la table est vide
    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn first(&self) -> Option<&Bar> {
        self.bars.first()
    }

    pub fn last(&self) -> Option<&Bar> {
        self.bars.last()
    }

    /// Trie les barres par date croissante
    ///
    /// CONCEPT RUST : sort_by_key est stable
    /// - Deux barres à la même date gardent leur ordre relatif
    pub fn sort_by_date(&mut self) {
        self.bars.sort_by_key(|b| b.date);
    }

    /// Retourne les barres dont la date est >= cutoff, triées par date
    pub fn since(&self, cutoff: NaiveDate) -> Vec<Bar> {
        let mut kept: Vec<Bar> = self
            .bars
            .iter()
            .filter(|b| b.date >= cutoff)
            .cloned()
            .collect();
        kept.sort_by_key(|b| b.date);
        kept
    }

    /// Convertit chaque barre en TaggedBar avec le symbole de la table
    ///
    /// CONCEPT RUST : impl Iterator
    /// - Pas d'allocation intermédiaire, les lignes sont produites à la demande
    pub fn tagged(&self) -> impl Iterator<Item = TaggedBar> + '_ {
        self.bars
            .iter()
            .map(move |b| TaggedBar::from_bar(b, &self.symbol))
    }
}

// ============================================================================
// Tests unitaires
// ============================================================================
