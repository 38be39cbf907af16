// ============================================================================
// Rendu HTML de la page des données
// ============================================================================
// Fonction pure : config + fenêtre + date du jour → page HTML complète
// Relit les CSV à chaque appel (pas de cache)
//
// Tout texte issu des données (ticker, nombres, chemin, paramètre) est échappé
// ============================================================================

use chrono::{Months, NaiveDate};
use tracing::{debug, error};

use crate::config::Config;
use crate::models::{Bar, BarTable};
use crate::storage;

/// Fragment affiché quand le CSV d'un ticker n'existe pas
pub const NO_DATA: &str = "<p>No data available</p>";

/// Fragment affiché quand le CSV existe mais ne peut pas être lu
pub const UNREADABLE: &str = "<p>Unable to read data</p>";

const STYLE: &str = r#"    body { font-family: Arial, sans-serif; margin: 20px; }
    h1 { color: #2c3e50; }
    table { border-collapse: collapse; width: 100%; margin: 1rem 0 2rem; }
    th, td { border: 1px solid #ddd; padding: 6px; text-align: center; }
    th { background-color: #2c3e50; color: white; }
    .note { color:#555; margin-bottom:1rem }"#;

/// Échappe les caractères spéciaux HTML
pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Date limite : aujourd'hui (minuit) moins `years` années calendaires
///
/// Un 29 février retombe sur le 28. Un `years` négatif donne une date
/// future. Hors limites : NaiveDate::MIN (tout garder) ou MAX (rien garder)
pub fn cutoff_date(today: NaiveDate, years: i64) -> NaiveDate {
    let months = years
        .checked_mul(12)
        .and_then(|m| u32::try_from(m.unsigned_abs()).ok())
        .map(Months::new);

    if years >= 0 {
        months
            .and_then(|m| today.checked_sub_months(m))
            .unwrap_or(NaiveDate::MIN)
    } else {
        months
            .and_then(|m| today.checked_add_months(m))
            .unwrap_or(NaiveDate::MAX)
    }
}

/// Rend une liste de barres en <table> HTML
fn render_table(bars: &[Bar]) -> String {
    let mut html = String::from(
        "<table class=\"table\">\n<thead><tr><th>Date</th><th>Open</th><th>High</th><th>Low</th><th>Close</th><th>Volume</th></tr></thead>\n<tbody>\n",
    );

    for bar in bars {
        let cells = [
            bar.date.to_string(),
            bar.open.to_string(),
            bar.high.to_string(),
            bar.low.to_string(),
            bar.close.to_string(),
            bar.volume.to_string(),
        ];

        html.push_str("<tr>");
        for cell in &cells {
            html.push_str("<td>");
            html.push_str(&escape_html(cell));
            html.push_str("</td>");
        }
        html.push_str("</tr>\n");
    }

    html.push_str("</tbody>\n</table>");
    html
}

/// Fragment d'un ticker : table filtrée, ou placeholder
fn render_ticker(config: &Config, symbol: &str, cutoff: NaiveDate) -> String {
    let path = config.ticker_path(symbol);
    if !path.exists() {
        debug!(ticker = %symbol, path = %path.display(), "No CSV for ticker");
        return NO_DATA.to_string();
    }

    match storage::read_bars(&path) {
        Ok(bars) => {
            let kept = BarTable::with_bars(symbol, bars).since(cutoff);
            debug!(ticker = %symbol, rows = kept.len(), "Rendering ticker table");
            render_table(&kept)
        }
        Err(e) => {
            error!(ticker = %symbol, error = ?e, "Failed to read ticker CSV");
            UNREADABLE.to_string()
        }
    }
}

/// Page complète pour une fenêtre de `years` années vue depuis `today`
pub fn render_page(config: &Config, years: i64, today: NaiveDate) -> String {
    let cutoff = cutoff_date(today, years);
    let data_dir = escape_html(&config.data_dir().display().to_string());

    let mut sections = String::new();
    for symbol in &config.tickers {
        sections.push_str(&format!(
            "  <h2>{}</h2>\n  {}\n",
            escape_html(symbol),
            render_ticker(config, symbol, cutoff)
        ));
    }

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
  <meta charset="utf-8" />
  <title>Stock Data (last {years} years)</title>
  <style>
{STYLE}
  </style>
</head>
<body>
  <h1>Stock Market Data (last {years} years)</h1>
  <div class="note">
    Showing all rows from last {years} years.<br>
    Files saved under <code>{data_dir}</code>.
  </div>
{sections}</body>
</html>
"#
    )
}

/// Page d'erreur pour un paramètre `years` invalide
pub fn render_bad_request(raw_years: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8" /><title>Bad Request</title></head>
<body>
  <h1>Bad Request</h1>
  <p>Invalid value for <code>years</code>: "{}". Expected an integer.</p>
</body>
</html>
"#,
        escape_html(raw_years)
    )
}

// ============================================================================
// Tests unitaires
// ============================================================================
