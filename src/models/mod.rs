// ============================================================================
// Module : models
// ============================================================================
// Ce module contient les structures de données du pipeline
//
// CONCEPT RUST : Modules et visibilité
// - "pub mod" : déclare un sous-module public (accessible depuis l'extérieur)
// - Sans "pub", le module serait privé au crate
// ============================================================================

pub mod bar; // Barres OHLCV, tables par ticker, barres étiquetées

// Re-export des structures principales pour simplifier les imports
// Au lieu de : use stockbars::models::bar::BarTable;
// On peut faire : use stockbars::models::BarTable;
pub use bar::{Bar, BarTable, Interval, TaggedBar};
