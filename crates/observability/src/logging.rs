//! Structured Logging Setup via tracing-subscriber
//!
//! Konfigurierbar per Umgebungsvariable (ueberschreibt die Konfiguration):
//! - `SB_LOG_LEVEL`: Filter-Direktive, z.B. `info` oder `syncbridge_crypto=debug`
//! - `SB_LOG_FORMAT`: Format (text/json), Standard: text
//!
//! Schluesselmaterial wird nie geloggt, nur Formate, Laengen und IDs.

use tracing_subscriber::{fmt, EnvFilter};

pub const ENV_LOG_LEVEL: &str = "SB_LOG_LEVEL";
pub const ENV_LOG_FORMAT: &str = "SB_LOG_FORMAT";

/// Ausgabeformat der Log-Zeilen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

/// Aufgeloeste Logging-Auswahl nach Konfiguration und Umgebung
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogAuswahl {
    pub filter: String,
    pub format: LogFormat,
}

/// Kombiniert Konfigurationswerte mit optionalen Umgebungswerten.
///
/// Umgebung gewinnt. Ein ungueltiges Format faellt auf `text` zurueck.
pub fn log_auswahl(
    level: &str,
    format: &str,
    env_level: Option<&str>,
    env_format: Option<&str>,
) -> LogAuswahl {
    let filter = env_level
        .filter(|l| !l.trim().is_empty())
        .unwrap_or(level)
        .trim()
        .to_string();

    let format = match env_format.unwrap_or(format) {
        "json" => LogFormat::Json,
        _ => LogFormat::Text,
    };

    LogAuswahl { filter, format }
}

/// Initialisiert das Logging-System.
///
/// Liest `SB_LOG_LEVEL` und `SB_LOG_FORMAT` aus der Umgebung.
/// Ein zweiter Aufruf im selben Prozess liefert einen Fehler statt zu paniken.
pub fn logging_initialisieren(level: &str, format: &str) -> anyhow::Result<()> {
    let env_level = std::env::var(ENV_LOG_LEVEL).ok();
    let env_format = std::env::var(ENV_LOG_FORMAT).ok();
    let auswahl = log_auswahl(level, format, env_level.as_deref(), env_format.as_deref());

    let filter = EnvFilter::try_new(&auswahl.filter).unwrap_or_else(|_| EnvFilter::new("info"));

    let ergebnis = match auswahl.format {
        LogFormat::Json => fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .with_thread_ids(true)
            .with_current_span(true)
            .try_init(),
        LogFormat::Text => fmt().with_env_filter(filter).with_target(true).try_init(),
    };

    ergebnis.map_err(|e| anyhow::anyhow!("Logging bereits initialisiert: {e}"))
}

/// Validiert ob ein Log-Level-String gueltig ist.
pub fn log_level_gueltig(level: &str) -> bool {
    matches!(level, "trace" | "debug" | "info" | "warn" | "error")
}

/// Validiert ob ein Log-Format-String gueltig ist.
pub fn log_format_gueltig(format: &str) -> bool {
    matches!(format, "text" | "json")
}
