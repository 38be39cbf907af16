// ============================================================================
// Module : api
// ============================================================================
// Clients pour récupérer les barres historiques depuis une source distante
// (Yahoo Finance), derrière le trait BarSource
// ============================================================================

pub mod yahoo; // Client API Yahoo Finance

// Re-export des types principaux
pub use yahoo::{BarSource, YahooClient};
