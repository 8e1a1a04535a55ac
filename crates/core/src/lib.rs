//! syncbridge-core – Gemeinsame Identifikationstypen
//!
//! Dieses Crate stellt die Bausteine bereit, die vom Krypto-Crate und von
//! den Host-Anwendungen gemeinsam genutzt werden.

pub mod types;

// Re-Exporte fuer bequemen Zugriff
pub use types::{DeviceId, UserId};
