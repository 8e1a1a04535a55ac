//! # syncbridge-observability
//!
//! Structured Logging fuer SyncBridge via tracing-subscriber
//! (Text oder JSON, Filter per Konfiguration oder `SB_LOG_LEVEL`).

pub mod logging;

pub use logging::{
    log_auswahl, log_format_gueltig, log_level_gueltig, logging_initialisieren, LogAuswahl,
    LogFormat,
};
