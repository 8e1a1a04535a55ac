//! E2EE-Konfiguration
//!
//! Wird von der Host-Anwendung aus einer TOML-Datei geladen. Alle Felder
//! haben sinnvolle Standardwerte, sodass das Subsystem ohne
//! Konfigurationsdatei lauffaehig ist.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use syncbridge_observability::{log_format_gueltig, log_level_gueltig};

/// Vollstaendige E2EE-Konfiguration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CryptoConfig {
    /// Secure-Storage-Einstellungen (Service-Namespace und Tags)
    pub speicher: SpeicherEinstellungen,
    /// Schluessel-Verzeichnis-Einstellungen
    pub verzeichnis: VerzeichnisEinstellungen,
    /// Einstellungen fuer das fremde ECIES-Format
    pub fremdformat: FremdformatEinstellungen,
    /// Logging-Einstellungen
    pub logging: LoggingEinstellungen,
}

/// Secure-Storage-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeicherEinstellungen {
    /// Service-Namespace, unter dem beide Schluesselhaelften liegen
    pub service: String,
    /// Tag fuer den privaten Schluessel
    pub private_tag: String,
    /// Tag fuer den oeffentlichen Schluessel
    pub public_tag: String,
}

impl Default for SpeicherEinstellungen {
    fn default() -> Self {
        Self {
            service: "com.syncbridge.e2ee".into(),
            private_tag: "privateKey".into(),
            public_tag: "publicKey".into(),
        }
    }
}

impl SpeicherEinstellungen {
    /// Vollstaendiger Storage-Tag des privaten Schluessels
    pub fn private_key_tag(&self) -> String {
        format!("{}.{}", self.service, self.private_tag)
    }

    /// Vollstaendiger Storage-Tag des oeffentlichen Schluessels
    pub fn public_key_tag(&self) -> String {
        format!("{}.{}", self.service, self.public_tag)
    }
}

/// Schluessel-Verzeichnis-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VerzeichnisEinstellungen {
    /// Zeitlimit fuer einen Fetch in Millisekunden
    pub fetch_timeout_ms: u64,
    /// Zeitlimit fuer einen Publish in Millisekunden
    pub publish_timeout_ms: u64,
}

impl Default for VerzeichnisEinstellungen {
    fn default() -> Self {
        Self {
            fetch_timeout_ms: 10_000,
            publish_timeout_ms: 10_000,
        }
    }
}

impl VerzeichnisEinstellungen {
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }

    pub fn publish_timeout(&self) -> Duration {
        Duration::from_millis(self.publish_timeout_ms)
    }
}

/// Einstellungen fuer das fremde ECIES-Format (Format C)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FremdformatEinstellungen {
    /// Key-ID-Praefix (4 Bytes, Big-Endian) fuer ausgehende Envelopes.
    /// Beim Lesen wird der Praefix ignoriert.
    pub key_id: u32,
}

/// Logging-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingEinstellungen {
    /// Log-Level: "trace", "debug", "info", "warn", "error"
    pub level: String,
    /// Format: "json" oder "text"
    pub format: String,
}

impl Default for LoggingEinstellungen {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "text".into(),
        }
    }
}

impl CryptoConfig {
    /// Laedt die Konfiguration aus einer TOML-Datei.
    /// Gibt die Standardkonfiguration zurueck wenn die Datei nicht existiert.
    pub fn laden(pfad: &str) -> anyhow::Result<Self> {
        match std::fs::read_to_string(pfad) {
            Ok(inhalt) => {
                let config: Self = toml::from_str(&inhalt)
                    .map_err(|e| anyhow::anyhow!("Konfigurationsfehler in '{pfad}': {e}"))?;
                config.validieren()?;
                Ok(config)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(
                    pfad = pfad,
                    "Konfigurationsdatei nicht gefunden, verwende Standardwerte"
                );
                Ok(Self::default())
            }
            Err(e) => Err(anyhow::anyhow!(
                "Konfigurationsdatei '{pfad}' nicht lesbar: {e}"
            )),
        }
    }

    /// Prueft Werte, die serde allein nicht abfangen kann
    pub fn validieren(&self) -> anyhow::Result<()> {
        if !log_level_gueltig(&self.logging.level) {
            anyhow::bail!("Ungueltiges Log-Level: '{}'", self.logging.level);
        }
        if !log_format_gueltig(&self.logging.format) {
            anyhow::bail!("Ungueltiges Log-Format: '{}'", self.logging.format);
        }
        Ok(())
    }
}
