//! Wire-Formate der E2EE-Envelopes
//!
//! ## Format A – Legacy raw (paarweise)
//! ```text
//! [sender_compact(32)] [nonce(12)] [ciphertext] [tag(16)]
//! context "E2EE-v1", AES-256-GCM
//! ```
//!
//! ## Format B – v2 Geraete-Envelope
//! ```text
//! "v2:" + base64( [ephemeral_uncompressed(65)] [nonce(12)] [ciphertext] [tag(16)] )
//! context "E2EE-v2", AES-256-GCM
//! ```
//!
//! ## Format C – fremdes ECIES (Interop)
//! ```text
//! [key_id(4, ignoriert)] [pubkey_len(1) = 65] [ephemeral_uncompressed(65)] [nonce(12)] [ciphertext] [tag(16)]
//! context "E2EE-v1", AES-128-GCM
//! ```
//!
//! Format A und C teilen sich den Context, aber nicht die Schluessellaenge.
//! Das ist eine bestehende Interop-Vorgabe.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use p256::PublicKey;

use crate::e2e::aead::{NONCE_LEN, TAG_LEN};
use crate::error::{CryptoError, CryptoResult};
use crate::keys::{
    decode_compact, decode_uncompressed, encode_compact, encode_uncompressed, COMPACT_LEN,
    UNCOMPRESSED_LEN,
};

/// Textpraefix des v2-Formats
pub const V2_PREFIX: &str = "v2:";

/// HKDF-Context fuer Format A und C
pub const CONTEXT_V1: &[u8] = b"E2EE-v1";
/// HKDF-Context fuer Format B
pub const CONTEXT_V2: &[u8] = b"E2EE-v2";

/// Groesse des ignorierten Key-ID-Praefix in Format C
pub const FOREIGN_KEY_ID_LEN: usize = 4;

/// Ab dieser Laenge (exklusiv) wird zuerst Format C versucht
pub const FOREIGN_DISPATCH_THRESHOLD: usize = 70;

const LEGACY_MIN_LEN: usize = COMPACT_LEN + NONCE_LEN + TAG_LEN;
const V2_MIN_LEN: usize = UNCOMPRESSED_LEN + NONCE_LEN + TAG_LEN;
const FOREIGN_HEADER_LEN: usize = FOREIGN_KEY_ID_LEN + 1 + UNCOMPRESSED_LEN;
const FOREIGN_MIN_LEN: usize = FOREIGN_HEADER_LEN + NONCE_LEN + TAG_LEN;

/// Die drei Wire-Formate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WireFormat {
    /// Format A
    Legacy,
    /// Format B
    V2,
    /// Format C
    Foreign,
}

impl WireFormat {
    /// HKDF-Info fuer dieses Format
    pub fn context(self) -> &'static [u8] {
        match self {
            Self::Legacy | Self::Foreign => CONTEXT_V1,
            Self::V2 => CONTEXT_V2,
        }
    }

    /// Laenge des abgeleiteten AES-Schluessels
    pub fn key_len(self) -> usize {
        match self {
            Self::Legacy | Self::V2 => 32,
            Self::Foreign => 16,
        }
    }
}

/// Ein dekodierter Envelope. Traegt nie den symmetrischen Schluessel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Envelope {
    Legacy {
        sender: PublicKey,
        nonce: [u8; NONCE_LEN],
        ciphertext: Vec<u8>,
    },
    V2 {
        ephemeral: PublicKey,
        nonce: [u8; NONCE_LEN],
        ciphertext: Vec<u8>,
    },
    Foreign {
        key_id: [u8; FOREIGN_KEY_ID_LEN],
        ephemeral: PublicKey,
        nonce: [u8; NONCE_LEN],
        ciphertext: Vec<u8>,
    },
}

impl Envelope {
    pub fn format(&self) -> WireFormat {
        match self {
            Self::Legacy { .. } => WireFormat::Legacy,
            Self::V2 { .. } => WireFormat::V2,
            Self::Foreign { .. } => WireFormat::Foreign,
        }
    }

    /// Public Key, mit dem der Empfaenger ECDH rechnet
    pub fn peer_key(&self) -> &PublicKey {
        match self {
            Self::Legacy { sender, .. } => sender,
            Self::V2 { ephemeral, .. } | Self::Foreign { ephemeral, .. } => ephemeral,
        }
    }

    pub fn nonce(&self) -> &[u8; NONCE_LEN] {
        match self {
            Self::Legacy { nonce, .. } | Self::V2 { nonce, .. } | Self::Foreign { nonce, .. } => {
                nonce
            }
        }
    }

    /// `ciphertext || tag`
    pub fn ciphertext(&self) -> &[u8] {
        match self {
            Self::Legacy { ciphertext, .. }
            | Self::V2 { ciphertext, .. }
            | Self::Foreign { ciphertext, .. } => ciphertext,
        }
    }

    /// Binaere Wire-Darstellung (bei v2 ohne Textpraefix)
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(FOREIGN_HEADER_LEN + NONCE_LEN + self.ciphertext().len());
        match self {
            Self::Legacy { sender, .. } => {
                out.extend_from_slice(&encode_compact(sender));
            }
            Self::V2 { ephemeral, .. } => {
                out.extend_from_slice(&encode_uncompressed(ephemeral));
            }
            Self::Foreign { key_id, ephemeral, .. } => {
                out.extend_from_slice(key_id);
                out.push(UNCOMPRESSED_LEN as u8);
                out.extend_from_slice(&encode_uncompressed(ephemeral));
            }
        }
        out.extend_from_slice(self.nonce());
        out.extend_from_slice(self.ciphertext());
        out
    }

    /// Transport-Darstellung: Base64, bei v2 mit `"v2:"`-Praefix
    pub fn to_text(&self) -> String {
        let encoded = STANDARD.encode(self.to_bytes());
        match self {
            Self::V2 { .. } => format!("{V2_PREFIX}{encoded}"),
            _ => encoded,
        }
    }
}

fn split_nonce(rest: &[u8]) -> ([u8; NONCE_LEN], Vec<u8>) {
    let mut nonce = [0u8; NONCE_LEN];
    nonce.copy_from_slice(&rest[..NONCE_LEN]);
    (nonce, rest[NONCE_LEN..].to_vec())
}

/// Dekodiert Format A
pub fn decode_legacy(bytes: &[u8]) -> CryptoResult<Envelope> {
    if bytes.len() < LEGACY_MIN_LEN {
        return Err(CryptoError::InvalidCiphertext);
    }
    let (key, rest) = bytes.split_at(COMPACT_LEN);
    let sender = decode_compact(key).map_err(|_| CryptoError::InvalidCiphertext)?;
    let (nonce, ciphertext) = split_nonce(rest);
    Ok(Envelope::Legacy {
        sender,
        nonce,
        ciphertext,
    })
}

/// Dekodiert die binaere Form von Format B (ohne Praefix)
pub fn decode_v2_bytes(bytes: &[u8]) -> CryptoResult<Envelope> {
    if bytes.len() < V2_MIN_LEN {
        return Err(CryptoError::InvalidCiphertext);
    }
    let (key, rest) = bytes.split_at(UNCOMPRESSED_LEN);
    let ephemeral = decode_uncompressed(key).map_err(|_| CryptoError::InvalidCiphertext)?;
    let (nonce, ciphertext) = split_nonce(rest);
    Ok(Envelope::V2 {
        ephemeral,
        nonce,
        ciphertext,
    })
}

/// Dekodiert die Textform von Format B (`"v2:" + base64`)
pub fn decode_v2_text(text: &str) -> CryptoResult<Envelope> {
    let encoded = text
        .strip_prefix(V2_PREFIX)
        .ok_or(CryptoError::InvalidCiphertext)?;
    let bytes = STANDARD.decode(encoded.trim())?;
    decode_v2_bytes(&bytes)
}

/// Dekodiert Format C
pub fn decode_foreign(bytes: &[u8]) -> CryptoResult<Envelope> {
    if bytes.len() < FOREIGN_MIN_LEN {
        return Err(CryptoError::InvalidCiphertext);
    }
    let mut key_id = [0u8; FOREIGN_KEY_ID_LEN];
    key_id.copy_from_slice(&bytes[..FOREIGN_KEY_ID_LEN]);

    if usize::from(bytes[FOREIGN_KEY_ID_LEN]) != UNCOMPRESSED_LEN {
        return Err(CryptoError::InvalidCiphertext);
    }

    let key = &bytes[FOREIGN_KEY_ID_LEN + 1..FOREIGN_HEADER_LEN];
    let ephemeral = decode_uncompressed(key).map_err(|_| CryptoError::InvalidCiphertext)?;
    let (nonce, ciphertext) = split_nonce(&bytes[FOREIGN_HEADER_LEN..]);
    Ok(Envelope::Foreign {
        key_id,
        ephemeral,
        nonce,
        ciphertext,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::KeyPair;

    fn dummy_ct() -> Vec<u8> {
        vec![0xAB; 5 + TAG_LEN]
    }

    #[test]
    fn format_parameter() {
        assert_eq!(WireFormat::Legacy.context(), b"E2EE-v1");
        assert_eq!(WireFormat::Foreign.context(), b"E2EE-v1");
        assert_eq!(WireFormat::V2.context(), b"E2EE-v2");
        assert_eq!(WireFormat::Legacy.key_len(), 32);
        assert_eq!(WireFormat::V2.key_len(), 32);
        assert_eq!(WireFormat::Foreign.key_len(), 16);
    }

    #[test]
    fn legacy_layout() {
        let pair = KeyPair::generate();
        let env = Envelope::Legacy {
            sender: *pair.public_key(),
            nonce: [7; NONCE_LEN],
            ciphertext: dummy_ct(),
        };
        let bytes = env.to_bytes();
        assert_eq!(bytes.len(), 32 + 12 + 21);
        assert_eq!(&bytes[..32], &pair.public_compact());
        assert_eq!(&bytes[32..44], &[7; 12]);
        assert_eq!(decode_legacy(&bytes).unwrap(), env);
    }

    #[test]
    fn v2_layout_mit_praefix() {
        let pair = KeyPair::generate();
        let env = Envelope::V2 {
            ephemeral: *pair.public_key(),
            nonce: [1; NONCE_LEN],
            ciphertext: dummy_ct(),
        };
        let text = env.to_text();
        assert!(text.starts_with("v2:"));
        let raw = STANDARD.decode(&text[3..]).unwrap();
        assert_eq!(raw[0], 0x04);
        assert_eq!(raw.len(), 65 + 12 + 21);
        assert_eq!(decode_v2_text(&text).unwrap(), env);
    }

    #[test]
    fn v2_ohne_praefix_wird_abgelehnt() {
        let pair = KeyPair::generate();
        let env = Envelope::V2 {
            ephemeral: *pair.public_key(),
            nonce: [1; NONCE_LEN],
            ciphertext: dummy_ct(),
        };
        let ohne = STANDARD.encode(env.to_bytes());
        assert!(matches!(decode_v2_text(&ohne), Err(CryptoError::InvalidCiphertext)));
        assert!(matches!(
            decode_v2_text("v2:***"),
            Err(CryptoError::DecodingError(_))
        ));
    }

    #[test]
    fn foreign_layout() {
        let pair = KeyPair::generate();
        let env = Envelope::Foreign {
            key_id: [0xDE, 0xAD, 0xBE, 0xEF],
            ephemeral: *pair.public_key(),
            nonce: [9; NONCE_LEN],
            ciphertext: dummy_ct(),
        };
        let bytes = env.to_bytes();
        assert_eq!(&bytes[..4], &[0xDE, 0xAD, 0xBE, 0xEF]);
        assert_eq!(bytes[4], 65);
        assert_eq!(bytes[5], 0x04);
        assert!(bytes.len() > FOREIGN_DISPATCH_THRESHOLD);
        assert_eq!(decode_foreign(&bytes).unwrap(), env);
    }

    #[test]
    fn foreign_key_id_wird_ignoriert() {
        let pair = KeyPair::generate();
        let env = Envelope::Foreign {
            key_id: [0; 4],
            ephemeral: *pair.public_key(),
            nonce: [9; NONCE_LEN],
            ciphertext: dummy_ct(),
        };
        let mut bytes = env.to_bytes();
        bytes[..4].copy_from_slice(&[1, 2, 3, 4]);
        let decoded = decode_foreign(&bytes).unwrap();
        assert_eq!(decoded.peer_key(), pair.public_key());
        assert_eq!(decoded.ciphertext(), env.ciphertext());
    }

    #[test]
    fn foreign_falsches_laengenbyte() {
        let pair = KeyPair::generate();
        let env = Envelope::Foreign {
            key_id: [0; 4],
            ephemeral: *pair.public_key(),
            nonce: [9; NONCE_LEN],
            ciphertext: dummy_ct(),
        };
        let mut bytes = env.to_bytes();
        bytes[4] = 33;
        assert!(matches!(decode_foreign(&bytes), Err(CryptoError::InvalidCiphertext)));
    }

    #[test]
    fn zu_kurze_puffer() {
        assert!(matches!(decode_legacy(&[0u8; 59]), Err(CryptoError::InvalidCiphertext)));
        assert!(matches!(decode_v2_bytes(&[4u8; 92]), Err(CryptoError::InvalidCiphertext)));
        assert!(matches!(decode_foreign(&[0u8; 97]), Err(CryptoError::InvalidCiphertext)));
    }
}
