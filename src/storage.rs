// ============================================================================
// Persistance CSV
// ============================================================================
// Les fichiers CSV sont le seul état durable : pas de base, pas de cache.
// Chaque écriture écrase complètement le fichier existant.
//
// CONCEPTS RUST :
// 1. csv::Writer::serialize : une struct serde = une ligne CSV
// 2. En-têtes déduits des noms de champs (#[serde(rename)])
// 3. AsRef<Path> : accepte &str, String, PathBuf...
// ============================================================================

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use crate::models::{Bar, BarTable};

/// Crée le répertoire parent du fichier s'il n'existe pas
fn ensure_parent_dir(path: &Path) -> Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => ensure_dir(parent),
        _ => Ok(()),
    }
}

/// Crée un répertoire et ses parents s'ils n'existent pas
pub fn ensure_dir(dir: impl AsRef<Path>) -> Result<()> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir)
        .with_context(|| format!("Échec de la création du répertoire {}", dir.display()))
}

/// Écrit une table de barres : Date en première colonne, puis OHLCV
pub fn write_bars(path: impl AsRef<Path>, table: &BarTable) -> Result<()> {
    let path = path.as_ref();
    ensure_parent_dir(path)?;

    let mut wtr = csv::Writer::from_path(path)
        .with_context(|| format!("Impossible d'ouvrir {} en écriture", path.display()))?;

    for bar in &table.bars {
        wtr.serialize(bar)
            .with_context(|| format!("Échec de l'écriture d'une ligne dans {}", path.display()))?;
    }

    wtr.flush()
        .with_context(|| format!("Échec du flush de {}", path.display()))?;
    Ok(())
}

/// Relit un CSV par ticker ; la colonne Date est parsée en NaiveDate
pub fn read_bars(path: impl AsRef<Path>) -> Result<Vec<Bar>> {
    let path = path.as_ref();
    let mut rdr = csv::Reader::from_path(path)
        .with_context(|| format!("Impossible d'ouvrir {}", path.display()))?;

    // CONCEPT RUST : collect sur un itérateur de Result
    // - S'arrête à la première erreur et la retourne
    rdr.deserialize()
        .collect::<std::result::Result<Vec<Bar>, csv::Error>>()
        .with_context(|| format!("CSV invalide : {}", path.display()))
}

/// Écrit la concaténation de plusieurs tables avec une colonne Ticker
///
/// Les tables sont écrites dans l'ordre reçu, chaque table garde son ordre de lignes
pub fn write_merged(path: impl AsRef<Path>, tables: &[BarTable]) -> Result<usize> {
    let path = path.as_ref();
    ensure_parent_dir(path)?;

    let mut wtr = csv::Writer::from_path(path)
        .with_context(|| format!("Impossible d'ouvrir {} en écriture", path.display()))?;

    let mut rows = 0;
    for tagged in tables.iter().flat_map(|t| t.tagged()) {
        wtr.serialize(&tagged)
            .with_context(|| format!("Échec de l'écriture d'une ligne dans {}", path.display()))?;
        rows += 1;
    }

    wtr.flush()
        .with_context(|| format!("Échec du flush de {}", path.display()))?;
    Ok(rows)
}

// ============================================================================
// Tests unitaires
// ============================================================================
