// ============================================================================
// Initialisation du logging
// ============================================================================
// Deux sorties :
// - console : lignes OK / WARN / ERROR par ticker et résumé final
// - fichier : ./logs/<nom>.log avec rotation quotidienne
// ============================================================================

use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::info;

/// Filtre par défaut si RUST_LOG n'est pas défini
pub const DEFAULT_FILTER: &str = "stockbars=debug,tower_http=info,info";

/// Initialise le système de logging (console + fichier)
///
/// CONCEPT RUST : Tracing subscriber
/// - Registry : point central des logs
/// - Layer : transforme et route les logs
/// - EnvFilter : filtre par niveau (RUST_LOG env var)
/// - RollingFileAppender : rotation automatique
///
/// # Utilisation
/// ```bash
/// # Voir les logs en temps réel
/// tail -f logs/stockbars.log.*
///
/// # Contrôler le niveau de log
/// RUST_LOG=stockbars=trace cargo run
/// ```
pub fn init_logging(file_name: &str) -> Result<()> {
    use tracing_appender::rolling::{RollingFileAppender, Rotation};
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let log_dir = PathBuf::from("./logs");

    // Crée le répertoire s'il n'existe pas
    std::fs::create_dir_all(&log_dir).context("Échec de la création du répertoire de logs")?;

    // Rotation::DAILY : nouveau fichier chaque jour (stockbars.log.2024-01-15)
    let file_appender = RollingFileAppender::new(Rotation::DAILY, log_dir.clone(), file_name);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(file_appender) // Écrit dans le fichier
                .with_ansi(false) // Pas de codes couleur dans le fichier
                .with_target(true) // Inclut le module (ex: stockbars::fetcher)
                .with_thread_ids(true)
                .with_line_number(true),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .compact()
                .with_target(false),
        )
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| DEFAULT_FILTER.into()),
        )
        .try_init()
        .context("Un subscriber tracing est déjà installé")?;

    info!(?log_dir, "Logging initialisé");
    Ok(())
}
