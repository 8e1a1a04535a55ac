//! Import und Export von Schluessel-Paaren
//!
//! Importierte Private Keys kommen als roher Skalar oder als PKCS#8-Container.
//! PKCS#8 gibt es in zwei Varianten:
//! ```text
//! flach:        SEQ { INT 0, SEQ { algo }, OCTET STRING (32 Bytes) }
//! verschachtelt: SEQ { INT 0, SEQ { algo }, OCTET STRING { SEQ { INT 1, OCTET STRING (32 Bytes), ... } } }
//! ```
//! Ein Import wird erst uebernommen, wenn der aus dem Private Key abgeleitete
//! Public Key bitgenau dem mitgelieferten entspricht.

use std::sync::Arc;

use p256::pkcs8::EncodePrivateKey;

use crate::der::{DerReader, TAG_INTEGER, TAG_OCTET_STRING, TAG_SEQUENCE};
use crate::error::{CryptoError, CryptoResult};
use crate::keys::{KeyEncoding, KeyPair, PRIVATE_KEY_LEN};
use crate::store::KeyMaterialStore;
use crate::types::SecretBytes;

/// Wie der Private Key aus einem Blob gewonnen wurde
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeAttempt {
    /// PKCS#8 korrekt geparst
    Structured,
    /// Letzte 32 Bytes des Blobs, ungeprueft
    Heuristic,
}

/// Ergebnis eines PKCS#8-Imports
#[derive(Debug, Clone)]
pub struct Imported {
    pub pair: Arc<KeyPair>,
    pub attempt: DecodeAttempt,
}

/// Bringt einen rohen Skalar auf `target_len` Bytes
///
/// Erlaubt ist die exakte Laenge oder eine fuehrende Null (DER-Vorzeichen-Padding).
pub fn normalize_raw_private_key(bytes: &[u8], target_len: usize) -> Option<Vec<u8>> {
    if bytes.len() == target_len {
        return Some(bytes.to_vec());
    }
    if bytes.len() == target_len + 1 && bytes[0] == 0 {
        return Some(bytes[1..].to_vec());
    }
    None
}

fn normalize_scalar(bytes: &[u8]) -> Option<[u8; PRIVATE_KEY_LEN]> {
    normalize_raw_private_key(bytes, PRIVATE_KEY_LEN)?.try_into().ok()
}

/// Liest den Skalar aus einem PKCS#8-Container (flach oder mit SEC1 innen)
///
/// Jede strukturelle Abweichung ergibt `None`, nie ein geratenes Ergebnis.
pub fn extract_from_pkcs8(der: &[u8]) -> Option<[u8; PRIVATE_KEY_LEN]> {
    let outer = DerReader::new(der).read_tlv(Some(TAG_SEQUENCE))?;
    let mut pkcs8 = DerReader::new(outer.value);
    pkcs8.read_tlv(Some(TAG_INTEGER))?;
    pkcs8.read_tlv(Some(TAG_SEQUENCE))?;
    let private_key = pkcs8.read_tlv(Some(TAG_OCTET_STRING))?;

    if let Some(scalar) = normalize_scalar(private_key.value) {
        return Some(scalar);
    }

    let sec1 = DerReader::new(private_key.value).read_tlv(Some(TAG_SEQUENCE))?;
    let mut ec_private_key = DerReader::new(sec1.value);
    ec_private_key.read_tlv(Some(TAG_INTEGER))?;
    let scalar = ec_private_key.read_tlv(Some(TAG_OCTET_STRING))?;
    normalize_scalar(scalar.value)
}

/// Strukturiert parsen, sonst die "letzte 32 Bytes"-Heuristik
pub fn extract_private_key(blob: &[u8]) -> CryptoResult<([u8; PRIVATE_KEY_LEN], DecodeAttempt)> {
    if let Some(scalar) = extract_from_pkcs8(blob) {
        return Ok((scalar, DecodeAttempt::Structured));
    }
    if blob.len() < PRIVATE_KEY_LEN {
        return Err(CryptoError::Pkcs8Parse);
    }

    tracing::warn!(
        laenge = blob.len(),
        "PKCS#8 nicht lesbar, verwende die letzten 32 Bytes (ungeprueft)"
    );
    let mut scalar = [0u8; PRIVATE_KEY_LEN];
    scalar.copy_from_slice(&blob[blob.len() - PRIVATE_KEY_LEN..]);
    Ok((scalar, DecodeAttempt::Heuristic))
}

/// Importiert ein Paar nach Pruefung und ersetzt das aktive
///
/// `public` ist uncompressed (65 Bytes) oder compact (32 Bytes). Der abgeleitete
/// Public Key wird in derselben Kodierung verglichen.
pub fn import_keypair(
    store: &KeyMaterialStore,
    private: &[u8],
    public: &[u8],
) -> CryptoResult<Arc<KeyPair>> {
    let scalar = normalize_raw_private_key(private, PRIVATE_KEY_LEN).ok_or_else(|| {
        CryptoError::InvalidPrivateKeyEncoding(format!("{} Bytes", private.len()))
    })?;
    let pair = KeyPair::from_private_bytes(&scalar)?;

    let encoding = KeyEncoding::from_len(public.len()).ok_or_else(|| {
        CryptoError::InvalidPublicKeyEncoding(format!("{} Bytes", public.len()))
    })?;
    encoding.decode(public)?;

    if encoding.encode(pair.public_key()) != public {
        tracing::warn!(encoding = ?encoding, "Import abgelehnt: Public Key passt nicht");
        return Err(CryptoError::KeyMismatch);
    }

    let pair = store.replace(pair)?;
    tracing::info!(encoding = ?encoding, "Schluessel-Paar importiert");
    Ok(pair)
}

/// Importiert aus einem PKCS#8-Blob
pub fn import_pkcs8(store: &KeyMaterialStore, der: &[u8], public: &[u8]) -> CryptoResult<Imported> {
    let (scalar, attempt) = extract_private_key(der)?;
    let pair = import_keypair(store, &scalar, public)?;
    Ok(Imported { pair, attempt })
}

/// Exportiert als PKCS#8 mit verschachteltem SEC1 `ECPrivateKey` (inkl. Public Key)
pub fn export_pkcs8(pair: &KeyPair) -> CryptoResult<SecretBytes> {
    let der = pair
        .secret_key()
        .to_pkcs8_der()
        .map_err(|e| CryptoError::EncodingError(e.to_string()))?;
    Ok(SecretBytes::new(der.as_bytes().to_vec()))
}

/// Exportiert `(private_scalar(32), public_uncompressed(65))`
pub fn export_raw(pair: &KeyPair) -> (SecretBytes, Vec<u8>) {
    (pair.private_key_bytes(), pair.public_uncompressed().to_vec())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
