// ============================================================================
// StockBars - Library
// ============================================================================
// Expose les modules publics pour les binaires et les tests
//
// Pipeline : Yahoo Finance → barres journalières → CSV → page HTML
// ============================================================================

pub mod api;     // Source distante (Yahoo Finance)
pub mod config;  // Configuration immuable
pub mod fetcher; // Batchs de récupération (par ticker / fusionné)
pub mod logging; // Initialisation tracing
pub mod models;  // Structures de données
pub mod storage; // Lecture/écriture CSV
pub mod web;     // Viewer HTTP

pub use config::Config;
