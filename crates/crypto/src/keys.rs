//! P-256 Schluessel-Paar und Public-Key-Kodierungen
//!
//! Zwei kanonische Kodierungen desselben Punktes:
//!
//! ```text
//! compact       [X(32)]                  Legacy-Records, Format A
//! uncompressed  [0x04] [X(32)] [Y(32)]   v1-Geraete-Records, Format B/C
//! ```
//!
//! Compact kodiert nur die X-Koordinate. Von den beiden Punkten mit
//! gleichem X ist derjenige mit `y = min(y, p - y)` gemeint. Lokal
//! generierte Schluessel erfuellen diese Bedingung immer, damit compact
//! verlustfrei auf denselben Punkt zurueckfuehrt. Fuer ECDH ist die Wahl
//! ohnehin egal: `x(d * -P) == x(d * P)`.

use p256::elliptic_curve::sec1::ToEncodedPoint;
use p256::{PublicKey, SecretKey};
use rand_core::OsRng;
use serde::{Deserialize, Serialize};

use crate::error::{CryptoError, CryptoResult};
use crate::types::SecretBytes;

/// Laenge eines P-256 Skalars (Private Key)
pub const PRIVATE_KEY_LEN: usize = 32;
/// Laenge der compact-Kodierung
pub const COMPACT_LEN: usize = 32;
/// Laenge der uncompressed-point-Kodierung
pub const UNCOMPRESSED_LEN: usize = 65;

const SEC1_UNCOMPRESSED_TAG: u8 = 0x04;

/// Kodierung eines oeffentlichen Schluessels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyEncoding {
    Compact,
    UncompressedPoint,
}

impl KeyEncoding {
    /// Feste Byte-Laenge dieser Kodierung
    pub fn expected_len(self) -> usize {
        match self {
            Self::Compact => COMPACT_LEN,
            Self::UncompressedPoint => UNCOMPRESSED_LEN,
        }
    }

    /// Erkennt die Kodierung anhand der Laenge (nur fuer Importe)
    pub fn from_len(len: usize) -> Option<Self> {
        match len {
            COMPACT_LEN => Some(Self::Compact),
            UNCOMPRESSED_LEN => Some(Self::UncompressedPoint),
            _ => None,
        }
    }

    pub fn encode(self, public: &PublicKey) -> Vec<u8> {
        match self {
            Self::Compact => encode_compact(public).to_vec(),
            Self::UncompressedPoint => encode_uncompressed(public).to_vec(),
        }
    }

    pub fn decode(self, bytes: &[u8]) -> CryptoResult<PublicKey> {
        match self {
            Self::Compact => decode_compact(bytes),
            Self::UncompressedPoint => decode_uncompressed(bytes),
        }
    }
}

/// Kodiert einen Public Key als `0x04 || X || Y`
pub fn encode_uncompressed(public: &PublicKey) -> [u8; UNCOMPRESSED_LEN] {
    let point = public.to_encoded_point(false);
    let mut out = [0u8; UNCOMPRESSED_LEN];
    out.copy_from_slice(point.as_bytes());
    out
}

/// Dekodiert `0x04 || X || Y` und prueft, dass der Punkt auf der Kurve liegt
pub fn decode_uncompressed(bytes: &[u8]) -> CryptoResult<PublicKey> {
    if bytes.len() != UNCOMPRESSED_LEN || bytes[0] != SEC1_UNCOMPRESSED_TAG {
        return Err(CryptoError::InvalidPublicKeyEncoding(format!(
            "uncompressed point erwartet {UNCOMPRESSED_LEN} Bytes mit 0x04, erhalten {}",
            bytes.len()
        )));
    }
    PublicKey::from_sec1_bytes(bytes)
        .map_err(|_| CryptoError::InvalidPublicKeyEncoding("Punkt nicht auf P-256".into()))
}

/// Kodiert einen Public Key als X-Koordinate (32 Bytes)
pub fn encode_compact(public: &PublicKey) -> [u8; COMPACT_LEN] {
    let uncompressed = encode_uncompressed(public);
    let mut out = [0u8; COMPACT_LEN];
    out.copy_from_slice(&uncompressed[1..1 + COMPACT_LEN]);
    out
}

/// Dekodiert eine X-Koordinate zum Punkt mit `y = min(y, p - y)`
pub fn decode_compact(bytes: &[u8]) -> CryptoResult<PublicKey> {
    if bytes.len() != COMPACT_LEN {
        return Err(CryptoError::InvalidPublicKeyEncoding(format!(
            "compact erwartet {COMPACT_LEN} Bytes, erhalten {}",
            bytes.len()
        )));
    }

    let mut sec1 = [0u8; 1 + COMPACT_LEN];
    sec1[1..].copy_from_slice(bytes);

    sec1[0] = 0x02;
    let even = PublicKey::from_sec1_bytes(&sec1)
        .map_err(|_| CryptoError::InvalidPublicKeyEncoding("X nicht auf P-256".into()))?;
    sec1[0] = 0x03;
    let odd = PublicKey::from_sec1_bytes(&sec1)
        .map_err(|_| CryptoError::InvalidPublicKeyEncoding("X nicht auf P-256".into()))?;

    // Big-Endian Byte-Vergleich == numerischer Vergleich
    if y_coordinate(&even) <= y_coordinate(&odd) {
        Ok(even)
    } else {
        Ok(odd)
    }
}

fn y_coordinate(public: &PublicKey) -> [u8; 32] {
    let uncompressed = encode_uncompressed(public);
    let mut y = [0u8; 32];
    y.copy_from_slice(&uncompressed[33..]);
    y
}

/// true wenn die compact-Kodierung auf genau diesen Punkt zurueckfuehrt
pub fn is_compact_representable(public: &PublicKey) -> bool {
    decode_compact(&encode_compact(public))
        .map(|decoded| decoded == *public)
        .unwrap_or(false)
}

/// Ein P-256 Schluessel-Paar fuer ECDH
#[derive(Clone)]
pub struct KeyPair {
    secret: SecretKey,
    public: PublicKey,
}

impl KeyPair {
    /// Generiert ein neues, compact-darstellbares Schluessel-Paar
    pub fn generate() -> Self {
        loop {
            let secret = SecretKey::random(&mut OsRng);
            let public = secret.public_key();
            if is_compact_representable(&public) {
                return Self { secret, public };
            }
        }
    }

    /// Rekonstruiert ein Paar aus einem rohen 32-Byte Skalar
    pub fn from_private_bytes(bytes: &[u8]) -> CryptoResult<Self> {
        if bytes.len() != PRIVATE_KEY_LEN {
            return Err(CryptoError::InvalidPrivateKeyEncoding(format!(
                "erwartet {PRIVATE_KEY_LEN} Bytes, erhalten {}",
                bytes.len()
            )));
        }
        let secret = SecretKey::from_slice(bytes).map_err(|_| {
            CryptoError::InvalidPrivateKeyEncoding("Skalar ausserhalb von [1, n)".into())
        })?;
        let public = secret.public_key();
        Ok(Self { secret, public })
    }

    pub fn secret_key(&self) -> &SecretKey {
        &self.secret
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.public
    }

    /// Roher Skalar (fuer Persistenz und Export)
    pub fn private_key_bytes(&self) -> SecretBytes {
        SecretBytes::new(self.secret.to_bytes().to_vec())
    }

    pub fn public_compact(&self) -> [u8; COMPACT_LEN] {
        encode_compact(&self.public)
    }

    pub fn public_uncompressed(&self) -> [u8; UNCOMPRESSED_LEN] {
        encode_uncompressed(&self.public)
    }
}

impl PartialEq for KeyPair {
    fn eq(&self, other: &Self) -> bool {
        self.public == other.public
    }
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "KeyPair {{ private: [REDACTED], public: [P-256] }}")
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
