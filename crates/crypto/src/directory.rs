//! Key Directory Client
//!
//! Duenner Adapter ueber das externe Schluessel-Verzeichnis:
//! - Publish des lokalen Public Keys (Legacy compact + v1 pro Geraet)
//! - Fetch des Public Keys eines Empfaengers
//!
//! Publish ist ein Merge: es wird immer nur der eine Kind-Record
//! geschrieben, Records anderer Geraete desselben Benutzers bleiben
//! erhalten. Publish-Fehler werden geloggt und verschluckt, damit die
//! lokale Schluessel-Generierung auch offline gelingt. Fetch-Fehler werden
//! als `RecipientKeyNotFound` propagiert.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use syncbridge_core::{DeviceId, UserId};

use crate::config::VerzeichnisEinstellungen;
use crate::error::{CryptoError, CryptoResult};
use crate::keys::KeyPair;
use crate::types::PublicKeyRecord;

/// Externes Schluessel-Verzeichnis
#[async_trait]
pub trait KeyDirectory: Send + Sync {
    /// Upsert genau eines Records (owner, device). Nie destruktiv fuer
    /// andere Records unter demselben owner.
    async fn publish(
        &self,
        owner: &UserId,
        device: Option<&DeviceId>,
        record: PublicKeyRecord,
    ) -> anyhow::Result<()>;

    async fn fetch(
        &self,
        owner: &UserId,
        device: Option<&DeviceId>,
    ) -> anyhow::Result<Option<PublicKeyRecord>>;
}

/// In-Process Verzeichnis (Tests, Einzelrechner-Betrieb)
///
/// owner -> (device | None fuer Legacy) -> Record
#[derive(Debug, Default)]
pub struct MemoryKeyDirectory {
    records: DashMap<UserId, HashMap<Option<DeviceId>, PublicKeyRecord>>,
    offline: AtomicBool,
    verzoegerung_ms: parking_lot::Mutex<u64>,
}

impl MemoryKeyDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simuliert ein nicht erreichbares Verzeichnis
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Simuliert Netzwerk-Latenz pro Aufruf
    pub fn set_verzoegerung(&self, dauer: Duration) {
        *self.verzoegerung_ms.lock() = dauer.as_millis() as u64;
    }

    /// Anzahl der Records unter einem owner
    pub fn record_count(&self, owner: &UserId) -> usize {
        self.records.get(owner).map(|m| m.len()).unwrap_or(0)
    }

    /// Schreibt einen Record ohne Validierung (Tests fuer kaputte Records)
    pub fn insert_raw(&self, record: PublicKeyRecord) {
        self.records
            .entry(record.owner_id.clone())
            .or_default()
            .insert(record.device_id.clone(), record);
    }

    async fn netzwerk(&self) -> anyhow::Result<()> {
        let ms = *self.verzoegerung_ms.lock();
        if ms > 0 {
            tokio::time::sleep(Duration::from_millis(ms)).await;
        }
        if self.offline.load(Ordering::SeqCst) {
            anyhow::bail!("Verzeichnis nicht erreichbar");
        }
        Ok(())
    }
}

#[async_trait]
impl KeyDirectory for MemoryKeyDirectory {
    async fn publish(
        &self,
        owner: &UserId,
        device: Option<&DeviceId>,
        record: PublicKeyRecord,
    ) -> anyhow::Result<()> {
        self.netzwerk().await?;
        self.records
            .entry(owner.clone())
            .or_default()
            .insert(device.cloned(), record);
        Ok(())
    }

    async fn fetch(
        &self,
        owner: &UserId,
        device: Option<&DeviceId>,
    ) -> anyhow::Result<Option<PublicKeyRecord>> {
        self.netzwerk().await?;
        Ok(self
            .records
            .get(owner)
            .and_then(|m| m.get(&device.cloned()).cloned()))
    }
}

/// Adapter mit Zeitlimits und der Fehler-Politik des Subsystems
pub struct KeyDirectoryClient {
    directory: std::sync::Arc<dyn KeyDirectory>,
    fetch_timeout: Duration,
    publish_timeout: Duration,
}

impl KeyDirectoryClient {
    pub fn new(
        directory: std::sync::Arc<dyn KeyDirectory>,
        einstellungen: &VerzeichnisEinstellungen,
    ) -> Self {
        Self {
            directory,
            fetch_timeout: einstellungen.fetch_timeout(),
            publish_timeout: einstellungen.publish_timeout(),
        }
    }

    /// Veroeffentlicht den owner-only Legacy-Record (compact)
    ///
    /// Gibt `false` zurueck wenn der Publish nicht gelang (bereits geloggt).
    pub async fn publish_legacy(&self, user: &UserId, compact: &[u8]) -> bool {
        let record = match PublicKeyRecord::legacy(user.clone(), compact) {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!(user = %user, fehler = %e, "Legacy-Record ungueltig, nicht veroeffentlicht");
                return false;
            }
        };
        self.publish(user, None, record).await
    }

    /// Veroeffentlicht den v1 Geraete-Record (uncompressed point)
    pub async fn publish_device(&self, user: &UserId, device: &DeviceId, uncompressed: &[u8]) -> bool {
        let record = match PublicKeyRecord::device(user.clone(), device.clone(), uncompressed) {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!(user = %user, device = %device, fehler = %e, "Geraete-Record ungueltig, nicht veroeffentlicht");
                return false;
            }
        };
        self.publish(user, Some(device), record).await
    }

    /// Veroeffentlicht beide Aeren fuer ein Schluessel-Paar
    pub async fn publish_keypair(&self, user: &UserId, device: &DeviceId, pair: &KeyPair) -> bool {
        let legacy = self.publish_legacy(user, &pair.public_compact()).await;
        let device = self
            .publish_device(user, device, &pair.public_uncompressed())
            .await;
        legacy && device
    }

    /// Holt den Legacy-Record eines Benutzers
    pub async fn fetch_legacy(&self, user: &UserId) -> CryptoResult<PublicKeyRecord> {
        self.fetch(user, None).await
    }

    /// Holt den v1 Record eines bestimmten Geraets
    pub async fn fetch_device(&self, user: &UserId, device: &DeviceId) -> CryptoResult<PublicKeyRecord> {
        self.fetch(user, Some(device)).await
    }

    async fn publish(&self, user: &UserId, device: Option<&DeviceId>, record: PublicKeyRecord) -> bool {
        let call = self.directory.publish(user, device, record);
        match tokio::time::timeout(self.publish_timeout, call).await {
            Ok(Ok(())) => {
                tracing::debug!(user = %user, device = ?device, "Public Key veroeffentlicht");
                true
            }
            Ok(Err(e)) => {
                tracing::warn!(user = %user, device = ?device, fehler = %e, "Publish fehlgeschlagen, lokaler Schluessel bleibt gueltig");
                false
            }
            Err(_) => {
                tracing::warn!(user = %user, device = ?device, "Publish Zeitlimit ueberschritten");
                false
            }
        }
    }

    async fn fetch(&self, user: &UserId, device: Option<&DeviceId>) -> CryptoResult<PublicKeyRecord> {
        let ziel = match device {
            Some(d) => format!("{user}/{d}"),
            None => user.to_string(),
        };

        let call = self.directory.fetch(user, device);
        let record = match tokio::time::timeout(self.fetch_timeout, call).await {
            Ok(Ok(Some(record))) => record,
            Ok(Ok(None)) => return Err(CryptoError::RecipientKeyNotFound(ziel)),
            Ok(Err(e)) => {
                tracing::debug!(ziel = %ziel, fehler = %e, "Fetch fehlgeschlagen");
                return Err(CryptoError::RecipientKeyNotFound(ziel));
            }
            Err(_) => {
                tracing::debug!(ziel = %ziel, "Fetch Zeitlimit ueberschritten");
                return Err(CryptoError::RecipientKeyNotFound(ziel));
            }
        };

        if record.owner_id != *user || record.device_id.as_ref() != device {
            tracing::debug!(
                ziel = %ziel,
                owner = %record.owner_id,
                device = ?record.device_id,
                "Record gehoert nicht zur Anfrage"
            );
            return Err(CryptoError::RecipientKeyNotFound(ziel));
        }

        record.validate()?;
        Ok(record)
    }
}

impl std::fmt::Debug for KeyDirectoryClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyDirectoryClient")
            .field("fetch_timeout", &self.fetch_timeout)
            .field("publish_timeout", &self.publish_timeout)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::KeyEncoding;
    use std::sync::Arc;

    fn client(dir: Arc<MemoryKeyDirectory>) -> KeyDirectoryClient {
        KeyDirectoryClient::new(dir, &VerzeichnisEinstellungen::default())
    }

    #[tokio::test]
    async fn publish_device_und_fetch() {
        let dir = Arc::new(MemoryKeyDirectory::new());
        let client = client(dir);
        let pair = KeyPair::generate();
        let (u1, d1) = (UserId::from("u1"), DeviceId::from("d1"));

        assert!(client.publish_device(&u1, &d1, &pair.public_uncompressed()).await);
        let record = client.fetch_device(&u1, &d1).await.unwrap();
        assert_eq!(record.encoding, KeyEncoding::UncompressedPoint);
        assert_eq!(&record.public_key().unwrap(), pair.public_key());
    }

    #[tokio::test]
    async fn publish_ist_merge_nicht_ueberschreiben() {
        let dir = Arc::new(MemoryKeyDirectory::new());
        let client = client(dir.clone());
        let u1 = UserId::from("u1");

        let a = KeyPair::generate();
        let b = KeyPair::generate();
        assert!(client.publish_keypair(&u1, &"d1".into(), &a).await);
        assert!(client.publish_device(&u1, &"d2".into(), &b.public_uncompressed()).await);

        // Legacy + d1 + d2
        assert_eq!(dir.record_count(&u1), 3);
        let d1 = client.fetch_device(&u1, &"d1".into()).await.unwrap();
        assert_eq!(d1.bytes, a.public_uncompressed().to_vec());
        let legacy = client.fetch_legacy(&u1).await.unwrap();
        assert_eq!(legacy.bytes, a.public_compact().to_vec());
    }

    #[tokio::test]
    async fn publish_offline_wird_verschluckt() {
        let dir = Arc::new(MemoryKeyDirectory::new());
        dir.set_offline(true);
        let client = client(dir.clone());
        let pair = KeyPair::generate();

        assert!(!client.publish_legacy(&"u1".into(), &pair.public_compact()).await);
        assert_eq!(dir.record_count(&"u1".into()), 0);
    }

    #[tokio::test]
    async fn fetch_offline_ist_recipient_not_found() {
        let dir = Arc::new(MemoryKeyDirectory::new());
        let client = client(dir.clone());
        let pair = KeyPair::generate();
        client.publish_legacy(&"u1".into(), &pair.public_compact()).await;

        dir.set_offline(true);
        let result = client.fetch_legacy(&"u1".into()).await;
        assert!(matches!(result, Err(CryptoError::RecipientKeyNotFound(_))));
    }

    #[tokio::test]
    async fn fetch_unbekannter_benutzer() {
        let client = client(Arc::new(MemoryKeyDirectory::new()));
        let result = client.fetch_legacy(&"niemand".into()).await;
        assert!(matches!(result, Err(CryptoError::RecipientKeyNotFound(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn fetch_zeitlimit() {
        let dir = Arc::new(MemoryKeyDirectory::new());
        let client = KeyDirectoryClient::new(
            dir.clone(),
            &VerzeichnisEinstellungen {
                fetch_timeout_ms: 50,
                publish_timeout_ms: 50,
            },
        );
        dir.set_verzoegerung(Duration::from_secs(5));
        let result = client.fetch_legacy(&"u1".into()).await;
        assert!(matches!(result, Err(CryptoError::RecipientKeyNotFound(_))));
    }

    #[tokio::test]
    async fn kaputter_record_wird_abgelehnt() {
        let dir = Arc::new(MemoryKeyDirectory::new());
        let pair = KeyPair::generate();
        let mut record = PublicKeyRecord::legacy("u1".into(), &pair.public_compact()).unwrap();
        record.bytes.truncate(31);
        dir.insert_raw(record);

        let result = client(dir).fetch_legacy(&"u1".into()).await;
        assert!(matches!(result, Err(CryptoError::InvalidPublicKeyEncoding(_))));
    }

    /// Liefert immer denselben Record, egal wonach gefragt wird
    struct FesterRecord(PublicKeyRecord);

    #[async_trait]
    impl KeyDirectory for FesterRecord {
        async fn publish(
            &self,
            _owner: &UserId,
            _device: Option<&DeviceId>,
            _record: PublicKeyRecord,
        ) -> anyhow::Result<()> {
            Ok(())
        }

        async fn fetch(
            &self,
            _owner: &UserId,
            _device: Option<&DeviceId>,
        ) -> anyhow::Result<Option<PublicKeyRecord>> {
            Ok(Some(self.0.clone()))
        }
    }

    #[tokio::test]
    async fn fremder_record_ist_recipient_not_found() {
        let pair = KeyPair::generate();
        let geraet = PublicKeyRecord::device("u1".into(), "d1".into(), &pair.public_uncompressed())
            .unwrap();
        let client = KeyDirectoryClient::new(
            Arc::new(FesterRecord(geraet)),
            &VerzeichnisEinstellungen::default(),
        );

        // Geraete-Record auf eine Legacy-Anfrage
        let legacy = client.fetch_legacy(&"u1".into()).await;
        assert!(matches!(legacy, Err(CryptoError::RecipientKeyNotFound(_))));
        // Anderes Geraet
        let d2 = client.fetch_device(&"u1".into(), &"d2".into()).await;
        assert!(matches!(d2, Err(CryptoError::RecipientKeyNotFound(_))));
        // Anderer Benutzer
        let u2 = client.fetch_device(&"u2".into(), &"d1".into()).await;
        assert!(matches!(u2, Err(CryptoError::RecipientKeyNotFound(_))));
        // Passende Anfrage
        assert!(client.fetch_device(&"u1".into(), &"d1".into()).await.is_ok());
    }

    #[tokio::test]
    async fn ungueltige_laenge_wird_nicht_veroeffentlicht() {
        let dir = Arc::new(MemoryKeyDirectory::new());
        let client = client(dir.clone());
        assert!(!client.publish_device(&"u1".into(), &"d1".into(), &[4u8; 64]).await);
        assert_eq!(dir.record_count(&"u1".into()), 0);
    }
}
