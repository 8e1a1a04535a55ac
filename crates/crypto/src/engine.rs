//! Crypto Engine
//!
//! Verbindet lokalen Schluessel (Key Material Store), Peer-Keys
//! (Key Directory Client) und die Wire-Formate. Beide Kollaborateure werden
//! per Konstruktor uebergeben, es gibt keinen globalen Zustand.
//!
//! Verschluesseln an einen Benutzer braucht einen Verzeichnis-Fetch und ist
//! daher async. Entschluesseln arbeitet nur mit dem lokalen Schluessel.

use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use syncbridge_core::{DeviceId, UserId};

use crate::config::FremdformatEinstellungen;
use crate::directory::KeyDirectoryClient;
use crate::e2e::data_key::{open_sealed, seal_for_device, seal_legacy, SealedPayload};
use crate::e2e::decrypt::{decrypt_dispatch, decrypt_v2, Decrypted};
use crate::e2e::encrypt::{encrypt_foreign, encrypt_legacy, encrypt_v2};
use crate::e2e::envelope::FOREIGN_KEY_ID_LEN;
use crate::error::{CryptoError, CryptoResult};
use crate::store::KeyMaterialStore;

pub struct CryptoEngine {
    store: Arc<KeyMaterialStore>,
    directory: Arc<KeyDirectoryClient>,
    foreign_key_id: [u8; FOREIGN_KEY_ID_LEN],
}

impl CryptoEngine {
    pub fn new(
        store: Arc<KeyMaterialStore>,
        directory: Arc<KeyDirectoryClient>,
        fremdformat: &FremdformatEinstellungen,
    ) -> Self {
        Self {
            store,
            directory,
            foreign_key_id: fremdformat.key_id.to_be_bytes(),
        }
    }

    pub fn store(&self) -> &Arc<KeyMaterialStore> {
        &self.store
    }

    pub fn directory(&self) -> &Arc<KeyDirectoryClient> {
        &self.directory
    }

    /// Laedt (oder erzeugt) den lokalen Schluessel und veroeffentlicht ihn
    ///
    /// Ein gescheiterter Publish ist kein Fehler, der Rueckgabewert
    /// sagt nur, ob beide Records im Verzeichnis angekommen sind.
    pub async fn publish_local_keys(&self, user: &UserId, device: &DeviceId) -> CryptoResult<bool> {
        let pair = self.store.load_or_generate()?;
        let veroeffentlicht = self.directory.publish_keypair(user, device, &pair).await;
        if !veroeffentlicht {
            tracing::info!(user = %user, device = %device, "Lokaler Schluessel bereit, Publish ausstehend");
        }
        Ok(veroeffentlicht)
    }

    // -----------------------------------------------------------------------
    // Format A (Legacy, paarweise)
    // -----------------------------------------------------------------------

    /// Verschluesselt Bytes an den Legacy-Key eines Benutzers (Format A)
    pub async fn encrypt_bytes_for_user(
        &self,
        recipient: &UserId,
        plaintext: &[u8],
    ) -> CryptoResult<Vec<u8>> {
        let local = self.store.active()?;
        let record = self.directory.fetch_legacy(recipient).await?;
        let peer = record.public_key()?;
        Ok(encrypt_legacy(&local, &peer, plaintext)?.to_bytes())
    }

    /// Verschluesselt UTF-8-Text, Ergebnis ist Base64 (Format A)
    pub async fn encrypt_text_for_user(&self, recipient: &UserId, text: &str) -> CryptoResult<String> {
        let bytes = self.encrypt_bytes_for_user(recipient, text.as_bytes()).await?;
        Ok(STANDARD.encode(bytes))
    }

    /// Entschluesselt Format C oder A, mit Angabe des erkannten Formats
    pub fn decrypt_bytes_detailed(&self, bytes: &[u8]) -> CryptoResult<Decrypted> {
        let local = self.store.active()?;
        decrypt_dispatch(&local, bytes)
    }

    pub fn decrypt_bytes(&self, bytes: &[u8]) -> CryptoResult<Vec<u8>> {
        Ok(self.decrypt_bytes_detailed(bytes)?.plaintext)
    }

    /// Base64 rein, UTF-8 raus
    pub fn decrypt_text(&self, text: &str) -> CryptoResult<String> {
        let bytes = STANDARD.decode(text.trim())?;
        let plaintext = self.decrypt_bytes(&bytes)?;
        String::from_utf8(plaintext).map_err(|e| CryptoError::DecodingError(e.to_string()))
    }

    // -----------------------------------------------------------------------
    // Format B (v2 Geraete-Envelope)
    // -----------------------------------------------------------------------

    /// Verschluesselt an einen Geraete-Key, Ergebnis `"v2:" + base64`
    pub async fn encrypt_for_device(
        &self,
        user: &UserId,
        device: &DeviceId,
        plaintext: &[u8],
    ) -> CryptoResult<String> {
        let record = self.directory.fetch_device(user, device).await?;
        let peer = record.public_key()?;
        Ok(encrypt_v2(&peer, plaintext)?.to_text())
    }

    pub fn decrypt_v2(&self, text: &str) -> CryptoResult<Vec<u8>> {
        let local = self.store.active()?;
        decrypt_v2(&local, text)
    }

    // -----------------------------------------------------------------------
    // Format C (fremdes ECIES)
    // -----------------------------------------------------------------------

    /// Verschluesselt im Fremdformat mit der konfigurierten Key-ID
    pub async fn encrypt_foreign_for(
        &self,
        user: &UserId,
        device: &DeviceId,
        plaintext: &[u8],
    ) -> CryptoResult<Vec<u8>> {
        let record = self.directory.fetch_device(user, device).await?;
        let peer = record.public_key()?;
        Ok(encrypt_foreign(&peer, self.foreign_key_id, plaintext)?.to_bytes())
    }

    // -----------------------------------------------------------------------
    // Grosse Payloads
    // -----------------------------------------------------------------------

    pub async fn seal_large_for_device(
        &self,
        user: &UserId,
        device: &DeviceId,
        payload: &[u8],
    ) -> CryptoResult<SealedPayload> {
        let record = self.directory.fetch_device(user, device).await?;
        let peer = record.public_key()?;
        seal_for_device(&peer, payload)
    }

    pub async fn seal_large_for_user(
        &self,
        recipient: &UserId,
        payload: &[u8],
    ) -> CryptoResult<SealedPayload> {
        let local = self.store.active()?;
        let record = self.directory.fetch_legacy(recipient).await?;
        let peer = record.public_key()?;
        seal_legacy(&local, &peer, payload)
    }

    pub fn open_large(&self, sealed: &SealedPayload) -> CryptoResult<Vec<u8>> {
        let local = self.store.active()?;
        open_sealed(&local, sealed)
    }
}

impl std::fmt::Debug for CryptoEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CryptoEngine")
            .field("store", &self.store)
            .field("directory", &self.directory)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{SpeicherEinstellungen, VerzeichnisEinstellungen};
    use crate::directory::MemoryKeyDirectory;
    use crate::e2e::envelope::WireFormat;
    use crate::store::MemorySecureStorage;

    struct Geraet {
        engine: CryptoEngine,
        user: UserId,
        device: DeviceId,
    }

    fn geraet(verzeichnis: &Arc<MemoryKeyDirectory>, user: &str, device: &str) -> Geraet {
        let store = Arc::new(KeyMaterialStore::new(
            Arc::new(MemorySecureStorage::new()),
            &SpeicherEinstellungen::default(),
        ));
        let client = Arc::new(KeyDirectoryClient::new(
            verzeichnis.clone(),
            &VerzeichnisEinstellungen::default(),
        ));
        Geraet {
            engine: CryptoEngine::new(
                store,
                client,
                &FremdformatEinstellungen { key_id: 7 },
            ),
            user: UserId::from(user),
            device: DeviceId::from(device),
        }
    }

    async fn zwei_geraete() -> (Geraet, Geraet) {
        let verzeichnis = Arc::new(MemoryKeyDirectory::new());
        let a = geraet(&verzeichnis, "alice", "mac");
        let b = geraet(&verzeichnis, "bob", "android");
        assert!(a.engine.publish_local_keys(&a.user, &a.device).await.unwrap());
        assert!(b.engine.publish_local_keys(&b.user, &b.device).await.unwrap());
        (a, b)
    }

    #[tokio::test]
    async fn text_an_benutzer() {
        let (a, b) = zwei_geraete().await;
        let cipher = a.engine.encrypt_text_for_user(&b.user, "Hallo Bob").await.unwrap();
        assert_eq!(b.engine.decrypt_text(&cipher).unwrap(), "Hallo Bob");
    }

    #[tokio::test]
    async fn bytes_an_benutzer_mit_format() {
        let (a, b) = zwei_geraete().await;
        let cipher = a.engine.encrypt_bytes_for_user(&b.user, &[1, 2, 3]).await.unwrap();
        let result = b.engine.decrypt_bytes_detailed(&cipher).unwrap();
        assert_eq!(result.plaintext, vec![1, 2, 3]);
        assert_eq!(result.format, WireFormat::Legacy);
    }

    #[tokio::test]
    async fn v2_an_geraet() {
        let (a, b) = zwei_geraete().await;
        let text = a
            .engine
            .encrypt_for_device(&b.user, &b.device, b"data key")
            .await
            .unwrap();
        assert!(text.starts_with("v2:"));
        assert_eq!(b.engine.decrypt_v2(&text).unwrap(), b"data key");
    }

    #[tokio::test]
    async fn fremdformat_traegt_key_id() {
        let (a, b) = zwei_geraete().await;
        let bytes = a
            .engine
            .encrypt_foreign_for(&b.user, &b.device, b"interop")
            .await
            .unwrap();
        assert_eq!(&bytes[..4], &[0, 0, 0, 7]);

        let result = b.engine.decrypt_bytes_detailed(&bytes).unwrap();
        assert_eq!(result.format, WireFormat::Foreign);
        assert_eq!(result.plaintext, b"interop");
    }

    #[tokio::test]
    async fn grosse_payloads() {
        let (a, b) = zwei_geraete().await;
        let payload = vec![0x5Au8; 256 * 1024];

        let sealed = a
            .engine
            .seal_large_for_device(&b.user, &b.device, &payload)
            .await
            .unwrap();
        assert_eq!(b.engine.open_large(&sealed).unwrap(), payload);

        let sealed = a.engine.seal_large_for_user(&b.user, &payload).await.unwrap();
        assert_eq!(b.engine.open_large(&sealed).unwrap(), payload);
    }

    #[tokio::test]
    async fn ohne_lokalen_schluessel_not_initialized() {
        let verzeichnis = Arc::new(MemoryKeyDirectory::new());
        let a = geraet(&verzeichnis, "alice", "mac");
        assert!(matches!(
            a.engine.decrypt_bytes(&[0u8; 80]),
            Err(CryptoError::NotInitialized)
        ));
        assert!(matches!(
            a.engine.encrypt_text_for_user(&UserId::from("bob"), "x").await,
            Err(CryptoError::NotInitialized)
        ));
    }

    #[tokio::test]
    async fn unbekannter_empfaenger() {
        let (a, _b) = zwei_geraete().await;
        let result = a
            .engine
            .encrypt_text_for_user(&UserId::from("niemand"), "x")
            .await;
        assert!(matches!(result, Err(CryptoError::RecipientKeyNotFound(_))));
    }

    #[tokio::test]
    async fn offline_publish_ist_kein_fehler() {
        let verzeichnis = Arc::new(MemoryKeyDirectory::new());
        verzeichnis.set_offline(true);
        let a = geraet(&verzeichnis, "alice", "mac");
        let veroeffentlicht = a.engine.publish_local_keys(&a.user, &a.device).await.unwrap();
        assert!(!veroeffentlicht);
        assert!(a.engine.store().is_loaded());
    }

    #[tokio::test]
    async fn kaputtes_base64_und_utf8() {
        let (a, b) = zwei_geraete().await;
        assert!(matches!(
            b.engine.decrypt_text("%%%"),
            Err(CryptoError::DecodingError(_))
        ));

        let cipher = a
            .engine
            .encrypt_bytes_for_user(&b.user, &[0xFF, 0xFE])
            .await
            .unwrap();
        let text = STANDARD.encode(cipher);
        assert!(matches!(
            b.engine.decrypt_text(&text),
            Err(CryptoError::DecodingError(_))
        ));
    }

    #[tokio::test]
    async fn nach_regenerate_alte_nachrichten_unlesbar() {
        let (a, b) = zwei_geraete().await;
        let cipher = a.engine.encrypt_bytes_for_user(&b.user, b"alt").await.unwrap();
        b.engine.store().regenerate().unwrap();
        assert!(b.engine.decrypt_bytes(&cipher).is_err());
    }
}
