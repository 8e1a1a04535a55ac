//! Gemeinsame Typen fuer das E2EE-Subsystem

use chrono::{DateTime, Utc};
use p256::PublicKey;
use serde::{Deserialize, Serialize};
use syncbridge_core::{DeviceId, UserId};

use crate::error::{CryptoError, CryptoResult};
use crate::keys::KeyEncoding;

/// Format-Version eines owner-only Legacy-Records (compact)
pub const FORMAT_VERSION_LEGACY: u8 = 0;
/// Format-Version eines v1 Geraete-Records (uncompressed point)
pub const FORMAT_VERSION_DEVICE_V1: u8 = 1;

/// Veroeffentlichter oeffentlicher Schluessel im Verzeichnis
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicKeyRecord {
    pub owner_id: UserId,
    /// `None` fuer den owner-only Legacy-Record
    pub device_id: Option<DeviceId>,
    pub encoding: KeyEncoding,
    /// Schluessel-Bytes, im Verzeichnis Base64-kodiert
    #[serde(with = "base64_bytes")]
    pub bytes: Vec<u8>,
    pub format_version: u8,
    pub published_at: DateTime<Utc>,
}

impl PublicKeyRecord {
    /// Legacy owner-only Record (compact, 32 Bytes)
    pub fn legacy(owner_id: UserId, compact: &[u8]) -> CryptoResult<Self> {
        let record = Self {
            owner_id,
            device_id: None,
            encoding: KeyEncoding::Compact,
            bytes: compact.to_vec(),
            format_version: FORMAT_VERSION_LEGACY,
            published_at: Utc::now(),
        };
        record.validate()?;
        Ok(record)
    }

    /// v1 Geraete-Record (uncompressed point, 65 Bytes)
    pub fn device(owner_id: UserId, device_id: DeviceId, uncompressed: &[u8]) -> CryptoResult<Self> {
        let record = Self {
            owner_id,
            device_id: Some(device_id),
            encoding: KeyEncoding::UncompressedPoint,
            bytes: uncompressed.to_vec(),
            format_version: FORMAT_VERSION_DEVICE_V1,
            published_at: Utc::now(),
        };
        record.validate()?;
        Ok(record)
    }

    /// Prueft, dass die Byte-Laenge zur deklarierten Kodierung passt
    pub fn validate(&self) -> CryptoResult<()> {
        let expected = self.encoding.expected_len();
        if self.bytes.len() != expected {
            return Err(CryptoError::InvalidPublicKeyEncoding(format!(
                "Record von {} erwartet {expected} Bytes, enthaelt {}",
                self.owner_id,
                self.bytes.len()
            )));
        }
        Ok(())
    }

    /// Validiert den Record und dekodiert den Punkt
    pub fn public_key(&self) -> CryptoResult<PublicKey> {
        self.validate()?;
        self.encoding.decode(&self.bytes)
    }
}

/// Sicherer Schluessel-Container (wird beim Drop genullt)
#[derive(Clone)]
pub struct SecretBytes(pub Vec<u8>);

impl Drop for SecretBytes {
    fn drop(&mut self) {
        self.0.iter_mut().for_each(|b| *b = 0);
    }
}

impl std::fmt::Debug for SecretBytes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SecretBytes([REDACTED] {} bytes)", self.0.len())
    }
}

impl SecretBytes {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Serde-Helfer: `Vec<u8>` als Standard-Base64-String
pub(crate) mod base64_bytes {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let text = String::deserialize(deserializer)?;
        STANDARD.decode(text).map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
