//! P-256 ECDH + HKDF Key Agreement
//!
//! ```text
//! shared_secret = ECDH(local_private, peer_public)      (X-Koordinate, 32 Bytes)
//! key           = HKDF-SHA256(ikm = shared_secret, salt = leer, info = context, L)
//! ```
//!
//! Context und Laenge haengen vom Wire-Format ab und muessen auf beiden
//! Seiten exakt uebereinstimmen, sonst scheitert der GCM-Tag.

use hkdf::Hkdf;
use p256::{ecdh, PublicKey, SecretKey};
use sha2::Sha256;

use crate::error::{CryptoError, CryptoResult};
use crate::types::SecretBytes;

/// Leitet einen symmetrischen Schluessel aus ECDH(local, peer) ab
pub fn derive_symmetric_key(
    local: &SecretKey,
    peer: &PublicKey,
    context: &[u8],
    len: usize,
) -> CryptoResult<SecretBytes> {
    let shared = ecdh::diffie_hellman(local.to_nonzero_scalar(), peer.as_affine());
    let okm = hkdf_derive(shared.raw_secret_bytes().as_slice(), &[], context, len)?;
    Ok(SecretBytes::new(okm))
}

/// Wie `derive_symmetric_key`, aber mit einem ephemeren Sender-Schluessel
pub fn derive_ephemeral_key(
    ephemeral: &ecdh::EphemeralSecret,
    peer: &PublicKey,
    context: &[u8],
    len: usize,
) -> CryptoResult<SecretBytes> {
    let shared = ephemeral.diffie_hellman(peer);
    let okm = hkdf_derive(shared.raw_secret_bytes().as_slice(), &[], context, len)?;
    Ok(SecretBytes::new(okm))
}

/// HKDF-basierte Key Derivation (allgemein verwendbar)
///
/// Ein leerer Salt ist nach RFC 5869 gleichwertig zu HashLen Null-Bytes.
pub fn hkdf_derive(ikm: &[u8], salt: &[u8], info: &[u8], len: usize) -> CryptoResult<Vec<u8>> {
    let hk = Hkdf::<Sha256>::new(Some(salt), ikm);
    let mut okm = vec![0u8; len];
    hk.expand(info, &mut okm)
        .map_err(|e| CryptoError::KeyDerivation(e.to_string()))?;
    Ok(okm)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::KeyPair;
    use rand_core::OsRng;

    #[test]
    fn beide_seiten_leiten_denselben_schluessel_ab() {
        let a = KeyPair::generate();
        let b = KeyPair::generate();

        let ab = derive_symmetric_key(a.secret_key(), b.public_key(), b"E2EE-v1", 32).unwrap();
        let ba = derive_symmetric_key(b.secret_key(), a.public_key(), b"E2EE-v1", 32).unwrap();
        assert_eq!(ab.as_bytes(), ba.as_bytes());
        assert_eq!(ab.len(), 32);
    }

    #[test]
    fn ephemer_und_statisch_stimmen_ueberein() {
        let empfaenger = KeyPair::generate();
        let ephemeral = ecdh::EphemeralSecret::random(&mut OsRng);
        let ephemeral_public = ephemeral.public_key();

        let sender = derive_ephemeral_key(&ephemeral, empfaenger.public_key(), b"E2EE-v2", 32).unwrap();
        let empfang =
            derive_symmetric_key(empfaenger.secret_key(), &ephemeral_public, b"E2EE-v2", 32).unwrap();
        assert_eq!(sender.as_bytes(), empfang.as_bytes());
    }

    #[test]
    fn verschiedene_contexts_geben_verschiedene_keys() {
        let a = KeyPair::generate();
        let b = KeyPair::generate();
        let v1 = derive_symmetric_key(a.secret_key(), b.public_key(), b"E2EE-v1", 32).unwrap();
        let v2 = derive_symmetric_key(a.secret_key(), b.public_key(), b"E2EE-v2", 32).unwrap();
        assert_ne!(v1.as_bytes(), v2.as_bytes());
    }

    #[test]
    fn kurzer_schluessel_ist_praefix_des_langen() {
        // HKDF-Expand: die ersten 16 Bytes sind bei L=16 und L=32 gleich
        let a = KeyPair::generate();
        let b = KeyPair::generate();
        let k16 = derive_symmetric_key(a.secret_key(), b.public_key(), b"E2EE-v1", 16).unwrap();
        let k32 = derive_symmetric_key(a.secret_key(), b.public_key(), b"E2EE-v1", 32).unwrap();
        assert_eq!(k16.as_bytes(), &k32.as_bytes()[..16]);
    }

    #[test]
    fn hkdf_derive_deterministisch() {
        let key1 = hkdf_derive(b"ikm", b"", b"info", 32).unwrap();
        let key2 = hkdf_derive(b"ikm", b"", b"info", 32).unwrap();
        assert_eq!(key1, key2);
    }

    #[test]
    fn hkdf_rfc5869_testvektor_3() {
        // RFC 5869 A.3: leerer Salt und leere Info
        let ikm = [0x0bu8; 22];
        let okm = hkdf_derive(&ikm, &[], &[], 42).unwrap();
        let expected = [
            0x8d, 0xa4, 0xe7, 0x75, 0xa5, 0x63, 0xc1, 0x8f, 0x71, 0x5f, 0x80, 0x2a, 0x06, 0x3c,
            0x5a, 0x31, 0xb8, 0xa1, 0x1f, 0x5c, 0x5e, 0xe1, 0x87, 0x9e, 0xc3, 0x45, 0x4e, 0x5f,
            0x3c, 0x73, 0x8d, 0x2d, 0x9d, 0x20, 0x13, 0x95, 0xfa, 0xa4, 0xb6, 0x1a, 0x96, 0xc8,
        ];
        assert_eq!(okm, expected);
    }

    #[test]
    fn zu_lange_ausgabe_schlaegt_fehl() {
        let result = hkdf_derive(b"ikm", b"", b"info", 255 * 32 + 1);
        assert!(matches!(result, Err(CryptoError::KeyDerivation(_))));
    }
}
