// ============================================================================
// API Client : Yahoo Finance
// ============================================================================
// Récupère les barres journalières historiques depuis Yahoo Finance
//
// CONCEPTS RUST AVANCÉS :
// 1. async/await : programmation asynchrone (non-bloquante)
// 2. Result<T, E> : gestion d'erreurs avec contexte
// 3. Serde : désérialisation JSON automatique
// 4. Traits : BarSource permet de remplacer Yahoo par un mock dans les tests
// ============================================================================

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Months, Utc};
use serde::Deserialize;
use tracing::{debug, info, instrument, warn};

use crate::config::Config;
use crate::models::{Bar, BarTable, Interval};

/// URL de base de l'API chart v8
pub const YAHOO_BASE_URL: &str = "https://query1.finance.yahoo.com";

// ============================================================================
// Structures pour parser la réponse JSON de Yahoo Finance
// ============================================================================
// Yahoo retourne un JSON complexe, on définit des structures qui matchent
// exactement la structure JSON pour que serde puisse désérialiser automatiquement
//
// En cas de symbole inconnu, "result" vaut null et "error" est renseigné
// ============================================================================

/// Réponse complète de l'API Yahoo Finance
#[derive(Debug, Deserialize)]
struct YahooResponse {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    result: Option<Vec<ChartResult>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: Option<String>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    meta: Meta,
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

/// Métadonnées du ticker
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Meta {
    symbol: Option<String>,
    /// Décalage UTC de la place de cotation, en secondes
    gmtoffset: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<Quote>,
    adjclose: Option<Vec<AdjClose>>,
}

/// Données OHLCV (Open, High, Low, Close, Volume)
#[derive(Debug, Deserialize)]
struct Quote {
    open: Option<Vec<Option<f64>>>,
    high: Option<Vec<Option<f64>>>,
    low: Option<Vec<Option<f64>>>,
    close: Option<Vec<Option<f64>>>,
    volume: Option<Vec<Option<u64>>>,
}

/// Clôture ajustée (splits + dividendes)
#[derive(Debug, Deserialize)]
struct AdjClose {
    adjclose: Option<Vec<Option<f64>>>,
}

// ============================================================================
// Trait : source de données distante
// ============================================================================

/// Source distante de barres journalières
///
/// CONCEPT RUST : #[async_trait]
/// - Permet d'écrire des méthodes async dans un trait
/// - Le trait reste utilisable comme `&dyn BarSource`
#[async_trait]
pub trait BarSource: Send + Sync {
    /// Récupère les barres couvrant les `years_to_fetch` dernières années
    ///
    /// Une table vide n'est pas une erreur : c'est "pas de données"
    async fn fetch_daily_bars(&self, symbol: &str, config: &Config) -> Result<BarTable>;
}

// ============================================================================
// Client Yahoo Finance
// ============================================================================

/// Client HTTP pour l'API chart de Yahoo Finance
#[derive(Debug, Clone)]
pub struct YahooClient {
    client: reqwest::Client,
    base_url: String,
}

impl YahooClient {
    /// Crée un client pointant sur l'API publique
    pub fn new() -> Result<Self> {
        Self::with_base_url(YAHOO_BASE_URL)
    }

    /// Crée un client pointant sur une autre URL (serveur de test)
    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self> {
        // Ajout d'un User-Agent pour éviter le blocage par Yahoo
        let client = reqwest::Client::builder()
            .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36")
            .build()
            .context("Échec de la création du client HTTP")?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl BarSource for YahooClient {
    /// CONCEPT RUST : #[instrument]
    /// - Macro tracing qui ajoute automatiquement un span
    /// - Tous les logs à l'intérieur auront le contexte du symbole
    #[instrument(skip(self, config), fields(years = config.years_to_fetch))]
    async fn fetch_daily_bars(&self, symbol: &str, config: &Config) -> Result<BarTable> {
        // Fenêtre relative à l'instant de l'appel : [now - N ans, now]
        let now = Utc::now();
        let start = lookback_start(now, config.years_to_fetch)?;

        let url = build_yahoo_url(
            &self.base_url,
            symbol,
            config.interval,
            start.timestamp(),
            now.timestamp(),
        );
        debug!(url = %url, "Built Yahoo Finance API URL");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .context("Échec de la requête HTTP vers Yahoo Finance")?;

        let status = response.status();
        debug!(status = %status, "Received HTTP response");

        // Vérifie que la réponse est un succès HTTP (200-299)
        if !status.is_success() {
            anyhow::bail!("Yahoo Finance a retourné une erreur : HTTP {}", status);
        }

        let yahoo_response: YahooResponse = response
            .json()
            .await
            .context("Échec du parsing JSON de la réponse Yahoo")?;

        let table = parse_yahoo_response(yahoo_response, symbol, config.adjust)?;

        info!(rows = table.len(), "Fetched daily bars");
        Ok(table)
    }
}

/// Début de la fenêtre : `now` moins `years` années calendaires
fn lookback_start(now: DateTime<Utc>, years: u32) -> Result<DateTime<Utc>> {
    now.checked_sub_months(Months::new(years.saturating_mul(12)))
        .with_context(|| format!("Fenêtre de {} ans hors limites", years))
}

/// Construit l'URL de l'API Yahoo Finance
///
/// events=div,splits + includeAdjustedClose : nécessaires pour obtenir
/// la série adjclose utilisée par l'ajustement des prix
fn build_yahoo_url(
    base_url: &str,
    symbol: &str,
    interval: Interval,
    period1: i64,
    period2: i64,
) -> String {
    format!(
        "{}/v8/finance/chart/{}?interval={}&period1={}&period2={}&events=div%2Csplits&includeAdjustedClose=true",
        base_url,
        symbol,
        interval.to_yahoo_string(),
        period1,
        period2
    )
}

/// Parse la réponse JSON de Yahoo et la convertit en BarTable
///
/// CONCEPT RUST : Ownership et borrowing
/// - yahoo_response est "moved" (pas de &), on en devient propriétaire
/// - symbol est borrowed (&str), on ne le copie pas
fn parse_yahoo_response(yahoo_response: YahooResponse, symbol: &str, adjust: bool) -> Result<BarTable> {
    if let Some(err) = yahoo_response.chart.error {
        anyhow::bail!(
            "Yahoo Finance a refusé {} : {} ({})",
            symbol,
            err.description.unwrap_or_default(),
            err.code.unwrap_or_default()
        );
    }

    let mut table = BarTable::new(symbol);

    // Pas de résultat ou pas de timestamps : table vide, pas une erreur
    let Some(result) = yahoo_response.chart.result.and_then(|r| r.into_iter().next()) else {
        return Ok(table);
    };

    if let Some(returned) = &result.meta.symbol {
        if !returned.eq_ignore_ascii_case(symbol) {
            debug!(requested = %symbol, returned = %returned, "Yahoo returned a different symbol");
        }
    }

    let timestamps = result.timestamp.unwrap_or_default();
    let offset = result.meta.gmtoffset.unwrap_or(0);

    let Some(quote) = result.indicators.quote.into_iter().next() else {
        return Ok(table);
    };

    let opens = quote.open.unwrap_or_default();
    let highs = quote.high.unwrap_or_default();
    let lows = quote.low.unwrap_or_default();
    let closes = quote.close.unwrap_or_default();
    let volumes = quote.volume.unwrap_or_default();
    let adj_closes = result
        .indicators
        .adjclose
        .and_then(|a| a.into_iter().next())
        .and_then(|a| a.adjclose)
        .unwrap_or_default();

    // Série adjclose absente : impossible d'ajuster, on garde les prix bruts
    let adjusting = adjust && !adj_closes.is_empty();
    if adjust && adj_closes.is_empty() && !timestamps.is_empty() {
        warn!(ticker = %symbol, "No adjclose series, keeping raw prices");
    }

    let mut skipped_count = 0;
    let mut missing_adj = 0;
    for (i, &timestamp) in timestamps.iter().enumerate() {
        // CONCEPT RUST : Pattern matching sur un tuple d'Options
        // - Une seule valeur manquante suffit à ignorer la ligne
        let (open, high, low, close) = match (
            opens.get(i).copied().flatten(),
            highs.get(i).copied().flatten(),
            lows.get(i).copied().flatten(),
            closes.get(i).copied().flatten(),
        ) {
            (Some(o), Some(h), Some(l), Some(c)) => (o, h, l, c),
            _ => {
                skipped_count += 1;
                continue;
            }
        };

        let volume = volumes.get(i).copied().flatten().unwrap_or(0);

        // Date du jour de cotation dans le fuseau de la place
        let date = DateTime::from_timestamp(timestamp + offset, 0)
            .context("Timestamp invalide")?
            .date_naive();

        // Ajustement splits/dividendes : tous les prix suivent le ratio adjclose/close
        // Une ligne sans adjclose est ignorée : pas de prix bruts dans une table ajustée
        let factor = if adjusting {
            match adj_closes.get(i).copied().flatten() {
                Some(adj) if close != 0.0 => adj / close,
                Some(_) => 1.0,
                None => {
                    missing_adj += 1;
                    continue;
                }
            }
        } else {
            1.0
        };

        table.push(Bar::new(
            date,
            open * factor,
            high * factor,
            low * factor,
            close * factor,
            volume,
        ));
    }

    if skipped_count > 0 {
        warn!(
            skipped = skipped_count,
            total = timestamps.len(),
            "Skipped bars with missing prices"
        );
    }

    if missing_adj > 0 {
        warn!(
            skipped = missing_adj,
            total = timestamps.len(),
            "Skipped bars with missing adjclose"
        );
    }

    table.sort_by_date();
    Ok(table)
}

// ============================================================================
// Tests unitaires
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone};

    // 2024-01-02 et 2024-01-03 à 09:30 New York (14:30 UTC), gmtoffset -18000
    const CHART_JSON: &str = r#"{
        "chart": {
            "result": [{
                "meta": { "symbol": "AAPL", "gmtoffset": -18000 },
                "timestamp": [1704205800, 1704292200, 1704378600],
                "indicators": {
                    "quote": [{
                        "open":   [100.0, null, 110.0],
                        "high":   [105.0, 108.0, 112.0],
                        "low":    [99.0, 101.0, 108.0],
                        "close":  [104.0, 106.0, 110.0],
                        "volume": [1000, 2000, null]
                    }],
                    "adjclose": [{ "adjclose": [52.0, 53.0, 55.0] }]
                }
            }],
            "error": null
        }
    }"#;

    fn parse(json: &str, adjust: bool) -> Result<BarTable> {
        let response: YahooResponse = serde_json::from_str(json).unwrap();
        parse_yahoo_response(response, "AAPL", adjust)
    }

    #[test]
    fn test_build_yahoo_url() {
        let url = build_yahoo_url(YAHOO_BASE_URL, "AAPL", Interval::D1, 1, 2);
        assert!(url.contains("/v8/finance/chart/AAPL?"));
        assert!(url.contains("interval=1d"));
        assert!(url.contains("period1=1&period2=2"));
        assert!(url.contains("includeAdjustedClose=true"));
    }

    #[test]
    fn test_lookback_start() {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        let start = lookback_start(now, 3).unwrap();
        assert_eq!(start, Utc.with_ymd_and_hms(2021, 6, 1, 12, 0, 0).unwrap());
    }

    #[test]
    fn test_parse_raw_prices() {
        let table = parse(CHART_JSON, false).unwrap();

        // La ligne avec open = null est ignorée
        assert_eq!(table.len(), 2);
        let first = table.first().unwrap();
        assert_eq!(first.date, NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
        assert_eq!(first.open, 100.0);
        assert_eq!(first.close, 104.0);
        assert_eq!(first.volume, 1000);

        // Volume manquant → 0
        let last = table.last().unwrap();
        assert_eq!(last.date, NaiveDate::from_ymd_opt(2024, 1, 4).unwrap());
        assert_eq!(last.volume, 0);
    }

    #[test]
    fn test_parse_adjusted_prices() {
        let table = parse(CHART_JSON, true).unwrap();
        let first = table.first().unwrap();

        // Facteur 52 / 104 = 0.5 appliqué à O/H/L/C, pas au volume
        assert!((first.open - 50.0).abs() < 1e-9);
        assert!((first.high - 52.5).abs() < 1e-9);
        assert!((first.low - 49.5).abs() < 1e-9);
        assert!((first.close - 52.0).abs() < 1e-9);
        assert_eq!(first.volume, 1000);
    }

    #[test]
    fn test_null_adjclose_row_is_skipped_when_adjusting() {
        let json = CHART_JSON.replace("[52.0, 53.0, 55.0]", "[52.0, 53.0, null]");

        let adjusted = parse(&json, true).unwrap();
        // Ligne 2 : open null, ligne 3 : adjclose null
        assert_eq!(adjusted.len(), 1);
        assert!((adjusted.first().unwrap().close - 52.0).abs() < 1e-9);

        // Sans ajustement la série adjclose est ignorée
        let raw = parse(&json, false).unwrap();
        assert_eq!(raw.len(), 2);
        assert_eq!(raw.last().unwrap().close, 110.0);
    }

    #[test]
    fn test_missing_adjclose_series_keeps_raw_prices() {
        let json = r#"{"chart":{"result":[{
            "meta":{"symbol":"AAPL","gmtoffset":-18000},
            "timestamp":[1704205800],
            "indicators":{"quote":[{"open":[100.0],"high":[105.0],"low":[99.0],"close":[104.0],"volume":[1000]}]}
        }],"error":null}}"#;

        let table = parse(json, true).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.first().unwrap().close, 104.0);
    }

    #[test]
    fn test_parse_error_payload() {
        let json = r#"{"chart":{"result":null,"error":{"code":"Not Found","description":"No data found, symbol may be delisted"}}}"#;
        let err = parse(json, true).unwrap_err();
        assert!(err.to_string().contains("No data found"));
    }

    #[test]
    fn test_parse_without_timestamps_is_empty() {
        let json = r#"{"chart":{"result":[{"meta":{"symbol":"AAPL"},"indicators":{"quote":[{}]}}],"error":null}}"#;
        let table = parse(json, true).unwrap();
        assert!(table.is_empty());
        assert_eq!(table.symbol, "AAPL");
    }

    #[tokio::test]
    async fn test_fetch_against_mock_server() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", mockito::Matcher::Regex(r"^/v8/finance/chart/AAPL".to_string()))
            .match_query(mockito::Matcher::UrlEncoded("interval".into(), "1d".into()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(CHART_JSON)
            .create_async()
            .await;

        let client = YahooClient::with_base_url(server.url()).unwrap();
        let table = client
            .fetch_daily_bars("AAPL", &Config::default())
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(table.len(), 2);
    }

    #[tokio::test]
    async fn test_fetch_http_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", mockito::Matcher::Regex(r"^/v8/finance/chart/NOPE".to_string()))
            .with_status(404)
            .create_async()
            .await;

        let client = YahooClient::with_base_url(server.url()).unwrap();
        let err = client
            .fetch_daily_bars("NOPE", &Config::default())
            .await
            .unwrap_err();

        assert!(err.to_string().contains("404"));
    }
}
