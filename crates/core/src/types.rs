//! Gemeinsame Identifikationstypen fuer syncbridge
//!
//! Alle IDs verwenden das Newtype-Pattern um Verwechslungen zwischen
//! Benutzer- und Geraete-IDs zur Compilezeit auszuschliessen. Die IDs
//! stammen vom Schluessel-Verzeichnis und sind opake Strings.

use serde::{Deserialize, Serialize};

/// Eindeutige Benutzer-ID (Eigentuemer eines Schluessels)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for UserId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "user:{}", self.0)
    }
}

/// Eindeutige Geraete-ID innerhalb eines Benutzers
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(pub String);

impl DeviceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for DeviceId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl std::fmt::Display for DeviceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "device:{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_id_anzeige() {
        let id = UserId::from("u1");
        assert_eq!(id.to_string(), "user:u1");
        assert_eq!(id.as_str(), "u1");
    }

    #[test]
    fn device_id_anzeige() {
        let id = DeviceId::new("d1");
        assert_eq!(id.to_string(), "device:d1");
    }

    #[test]
    fn ids_serialisieren_transparent() {
        let json = serde_json::to_string(&UserId::from("u1")).unwrap();
        assert_eq!(json, "\"u1\"");
        let decoded: DeviceId = serde_json::from_str("\"d7\"").unwrap();
        assert_eq!(decoded, DeviceId::from("d7"));
    }
}
