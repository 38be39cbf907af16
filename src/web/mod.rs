// ============================================================================
// Module : web
// ============================================================================
// Viewer HTTP (variante par ticker uniquement) : une seule route GET /
//
// CONCEPTS RUST :
// 1. Axum : extracteurs typés (State, Query) dans la signature du handler
// 2. Arc<Config> : configuration partagée en lecture seule entre requêtes
// 3. IntoResponse : (StatusCode, Html) devient une réponse HTTP
// ============================================================================

pub mod page; // Rendu HTML

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::get,
    Router,
};
use chrono::Local;
use serde::Deserialize;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::{info, instrument, warn, Level};

use crate::config::Config;

pub use page::{cutoff_date, render_page, NO_DATA};

/// Paramètres de la requête GET /
///
/// `years` reste une String : la conversion est faite à la main pour
/// répondre 400 avec un message clair au lieu du rejet générique d'axum
#[derive(Debug, Default, Deserialize)]
pub struct ViewQuery {
    pub years: Option<String>,
}

/// Interprète le paramètre `years` ; absent → valeur par défaut
///
/// Tout entier est accepté (un négatif place la date limite dans le futur).
/// Retourne la valeur brute en cas d'erreur (pour le message 400)
pub fn parse_years(raw: Option<&str>, default: u32) -> std::result::Result<i64, String> {
    match raw {
        None => Ok(i64::from(default)),
        Some(value) => value.trim().parse::<i64>().map_err(|_| value.to_string()),
    }
}

/// GET / - Page HTML des données filtrées sur les `years` dernières années
#[instrument(skip(config))]
async fn index(State(config): State<Arc<Config>>, Query(query): Query<ViewQuery>) -> Response {
    let years = match parse_years(query.years.as_deref(), config.years_to_fetch) {
        Ok(years) => years,
        Err(raw) => {
            warn!(years = %raw, "Invalid years parameter");
            return (StatusCode::BAD_REQUEST, Html(page::render_bad_request(&raw))).into_response();
        }
    };

    let today = Local::now().date_naive();
    Html(render_page(&config, years, today)).into_response()
}

/// Construit le Router du viewer
pub fn router(config: Arc<Config>) -> Router {
    Router::new()
        .route("/", get(index))
        .layer(
            // Spans et réponses au niveau INFO : visibles avec le filtre par défaut
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .with_state(config)
}

/// Lance le serveur sur 127.0.0.1:<port> jusqu'à l'arrêt du process
pub async fn serve(config: Arc<Config>) -> Result<()> {
    let addr = SocketAddr::from(([127, 0, 0, 1], config.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Impossible d'écouter sur {}", addr))?;

    info!(%addr, "Viewer listening on http://{}", addr);
    axum::serve(listener, router(config))
        .await
        .context("Le serveur HTTP s'est arrêté sur une erreur")?;
    Ok(())
}

// ============================================================================
// Tests unitaires
// ============================================================================
