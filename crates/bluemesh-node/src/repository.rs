//! The key repository: slot pools for network and application keys, kept in
//! sync with the tag store and the network layer's subnet table.
//!
//! Slot indices are stable across restarts because they form the low half of
//! each record's storage tag. Loading therefore restores every key into the
//! slot it was persisted under, and a key added at runtime keeps its slot
//! for the life of the record.

use std::collections::HashMap;

use tracing::{debug, info, warn};

use bluemesh_core::advertising::{network_id_advertisement, NETWORK_ID_ADV_LEN};
use bluemesh_core::keys::{ApplicationKey, NetworkKey};
use bluemesh_core::record::{decode_app_key, decode_network_key, encode_app_key, encode_network_key};
use bluemesh_core::tag::{InternalIndex, RecordKind, Tag};
use bluemesh_core::types::{AppKeyIndex, NetKeyIndex};

use crate::error::NodeError;
use crate::pool::KeyPool;
use crate::stack::NetworkLayer;
use crate::store::AnyTagStore;

/// Network key slots available to the allocator and the on-disk tag space.
pub const MAX_NETWORK_KEYS: usize = 8;

/// Application key slots available to the allocator and the on-disk tag space.
pub const MAX_APP_KEYS: usize = 16;

/// Owns the security keys of the node.
///
/// All mutating operations take the tag store as `Option<&AnyTagStore>`;
/// `None` means persistence is disabled and the change is in-memory only.
#[derive(Debug)]
pub struct KeyRepository {
    network_keys: KeyPool<NetworkKey>,
    app_keys: KeyPool<ApplicationKey>,
    /// Precomputed network-id advertisements, one per network key slot.
    network_id_adv: HashMap<InternalIndex, [u8; NETWORK_ID_ADV_LEN]>,
}

impl KeyRepository {
    pub fn new() -> Self {
        Self::with_capacities(MAX_NETWORK_KEYS, MAX_APP_KEYS)
    }

    /// Repository with smaller live bounds. The tag spaces stay at the
    /// defaults; only the number of simultaneously held keys shrinks.
    pub fn with_capacities(max_network_keys: usize, max_app_keys: usize) -> Self {
        Self {
            network_keys: KeyPool::bounded(MAX_NETWORK_KEYS, max_network_keys),
            app_keys: KeyPool::bounded(MAX_APP_KEYS, max_app_keys),
            network_id_adv: HashMap::new(),
        }
    }

    /// Add a network key: allocate a slot, configure its subnet, cache the
    /// network-id advertisement, and persist the record.
    ///
    /// A persistence failure is returned after the key is already live, so
    /// the key works for this session but will be missing after a restart.
    pub async fn add_network_key(
        &mut self,
        store: Option<&AnyTagStore>,
        network: &mut NetworkLayer,
        key: NetworkKey,
    ) -> Result<InternalIndex, NodeError> {
        let netkey_index = key.netkey_index;
        let advertisement = network_id_advertisement(&key.network_id);
        let encoded = encode_network_key(&key);

        let index = self.network_keys.insert(key)?;
        network.configure_subnet(netkey_index);
        self.network_id_adv.insert(index, advertisement);

        if let Some(store) = store {
            let tag = Tag::new(RecordKind::NetworkKey, index);
            store.store_tag(tag, &encoded).await?;
            debug!(%tag, %netkey_index, "stored network key");
        }
        Ok(index)
    }

    /// Add an application key and persist its record.
    ///
    /// The binding to a network key is not enforced here; a key bound to an
    /// index this node does not hold is accepted with a warning, since the
    /// configuration layer owns binding validation.
    pub async fn add_app_key(
        &mut self,
        store: Option<&AnyTagStore>,
        key: ApplicationKey,
    ) -> Result<InternalIndex, NodeError> {
        if self.network_key_by_index(key.netkey_index).is_none() {
            warn!(
                netkey_index = %key.netkey_index,
                appkey_index = %key.appkey_index,
                "application key bound to a network key this node does not hold"
            );
        }
        let appkey_index = key.appkey_index;
        let encoded = encode_app_key(&key);

        let index = self.app_keys.insert(key)?;

        if let Some(store) = store {
            let tag = Tag::new(RecordKind::ApplicationKey, index);
            store.store_tag(tag, &encoded).await?;
            debug!(%tag, %appkey_index, "stored application key");
        }
        Ok(index)
    }

    /// Re-persist the network key at a slot, e.g. after a field update.
    pub async fn store_network_key(
        &self,
        store: Option<&AnyTagStore>,
        index: InternalIndex,
    ) -> Result<(), NodeError> {
        let Some(key) = self.network_keys.get(index) else {
            debug!(%index, "no network key at slot, nothing to store");
            return Ok(());
        };
        if let Some(store) = store {
            let tag = Tag::new(RecordKind::NetworkKey, index);
            store.store_tag(tag, &encode_network_key(key)).await?;
        }
        Ok(())
    }

    /// Re-persist the application key at a slot.
    pub async fn store_app_key(
        &self,
        store: Option<&AnyTagStore>,
        index: InternalIndex,
    ) -> Result<(), NodeError> {
        let Some(key) = self.app_keys.get(index) else {
            debug!(%index, "no application key at slot, nothing to store");
            return Ok(());
        };
        if let Some(store) = store {
            let tag = Tag::new(RecordKind::ApplicationKey, index);
            store.store_tag(tag, &encode_app_key(key)).await?;
        }
        Ok(())
    }

    /// Load every persisted key back into its slot.
    ///
    /// Loading is best-effort: unreadable or undecodable records are skipped
    /// with a log and never abort the scan. A full pool stops the scan of
    /// that kind early with a warning.
    pub async fn load_all(&mut self, store: &AnyTagStore, network: &mut NetworkLayer) {
        let mut network_count = 0usize;
        for slot in 0..MAX_NETWORK_KEYS as u16 {
            let index = InternalIndex(slot);
            let tag = Tag::new(RecordKind::NetworkKey, index);
            let bytes = match store.get_tag(tag).await {
                Ok(Some(bytes)) => bytes,
                Ok(None) => continue,
                Err(e) => {
                    warn!(%tag, error = %e, "failed to read network key record, skipping");
                    continue;
                }
            };
            let key = match decode_network_key(&bytes) {
                Ok(key) => key,
                Err(e) => {
                    debug!(%tag, error = %e, "skipping undecodable network key record");
                    continue;
                }
            };
            let netkey_index = key.netkey_index;
            let advertisement = network_id_advertisement(&key.network_id);
            if let Err(e) = self.network_keys.insert_at(index, key) {
                warn!(error = %e, "network key pool full, stopping load");
                break;
            }
            network.configure_subnet(netkey_index);
            self.network_id_adv.insert(index, advertisement);
            network_count += 1;
        }

        let mut app_count = 0usize;
        for slot in 0..MAX_APP_KEYS as u16 {
            let index = InternalIndex(slot);
            let tag = Tag::new(RecordKind::ApplicationKey, index);
            let bytes = match store.get_tag(tag).await {
                Ok(Some(bytes)) => bytes,
                Ok(None) => continue,
                Err(e) => {
                    warn!(%tag, error = %e, "failed to read application key record, skipping");
                    continue;
                }
            };
            let key = match decode_app_key(&bytes) {
                Ok(key) => key,
                Err(e) => {
                    debug!(%tag, error = %e, "skipping undecodable application key record");
                    continue;
                }
            };
            if let Err(e) = self.app_keys.insert_at(index, key) {
                warn!(error = %e, "application key pool full, stopping load");
                break;
            }
            app_count += 1;
        }

        info!(
            network_keys = network_count,
            app_keys = app_count,
            "loaded security keys from storage"
        );
    }

    /// Delete the network key at a slot: tag record, pool slot, subnet, and
    /// cached advertisement. The tag delete runs unconditionally, so the
    /// operation is idempotent even when the slot is already empty.
    pub async fn delete_network_key(
        &mut self,
        store: Option<&AnyTagStore>,
        network: &mut NetworkLayer,
        index: InternalIndex,
    ) -> Result<(), NodeError> {
        if let Some(store) = store {
            store
                .delete_tag(Tag::new(RecordKind::NetworkKey, index))
                .await?;
        }
        if let Some(key) = self.network_keys.remove(index) {
            network.remove_subnet(key.netkey_index);
        }
        self.network_id_adv.remove(&index);
        Ok(())
    }

    /// Delete the application key at a slot. Idempotent like
    /// [`Self::delete_network_key`].
    pub async fn delete_app_key(
        &mut self,
        store: Option<&AnyTagStore>,
        index: InternalIndex,
    ) -> Result<(), NodeError> {
        if let Some(store) = store {
            store
                .delete_tag(Tag::new(RecordKind::ApplicationKey, index))
                .await?;
        }
        self.app_keys.remove(index);
        Ok(())
    }

    /// Delete every network key slot, stored or not. Node reset path.
    pub async fn delete_all_network_keys(
        &mut self,
        store: Option<&AnyTagStore>,
        network: &mut NetworkLayer,
    ) -> Result<(), NodeError> {
        for slot in 0..MAX_NETWORK_KEYS as u16 {
            self.delete_network_key(store, network, InternalIndex(slot))
                .await?;
        }
        Ok(())
    }

    /// Delete every application key slot, stored or not. Node reset path.
    pub async fn delete_all_app_keys(
        &mut self,
        store: Option<&AnyTagStore>,
    ) -> Result<(), NodeError> {
        for slot in 0..MAX_APP_KEYS as u16 {
            self.delete_app_key(store, InternalIndex(slot)).await?;
        }
        Ok(())
    }

    /// Look up a network key by its global netkey index.
    pub fn network_key_by_index(
        &self,
        netkey_index: NetKeyIndex,
    ) -> Option<(InternalIndex, &NetworkKey)> {
        self.network_keys
            .iter()
            .find(|(_, key)| key.netkey_index == netkey_index)
    }

    /// Look up an application key by its global appkey index.
    pub fn app_key_by_index(
        &self,
        appkey_index: AppKeyIndex,
    ) -> Option<(InternalIndex, &ApplicationKey)> {
        self.app_keys
            .iter()
            .find(|(_, key)| key.appkey_index == appkey_index)
    }

    pub fn network_key_at(&self, index: InternalIndex) -> Option<&NetworkKey> {
        self.network_keys.get(index)
    }

    pub fn app_key_at(&self, index: InternalIndex) -> Option<&ApplicationKey> {
        self.app_keys.get(index)
    }

    /// Resolve the network key an application key is bound to.
    pub fn network_key_for_app(&self, key: &ApplicationKey) -> Option<&NetworkKey> {
        self.network_key_by_index(key.netkey_index)
            .map(|(_, network_key)| network_key)
    }

    pub fn network_keys(&self) -> impl Iterator<Item = (InternalIndex, &NetworkKey)> {
        self.network_keys.iter()
    }

    pub fn app_keys(&self) -> impl Iterator<Item = (InternalIndex, &ApplicationKey)> {
        self.app_keys.iter()
    }

    pub fn network_key_count(&self) -> usize {
        self.network_keys.len()
    }

    pub fn app_key_count(&self) -> usize {
        self.app_keys.len()
    }

    /// The cached network-id advertisement for a network key slot.
    pub fn network_id_advertisement(
        &self,
        index: InternalIndex,
    ) -> Option<&[u8; NETWORK_ID_ADV_LEN]> {
        self.network_id_adv.get(&index)
    }
}

impl Default for KeyRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryTagStore, TagStore};
    use bluemesh_core::types::KeyBytes;

    fn netkey(value: u16) -> NetKeyIndex {
        NetKeyIndex::new(value).unwrap()
    }

    fn appkey(value: u16) -> AppKeyIndex {
        AppKeyIndex::new(value).unwrap()
    }

    fn sample_network_key(index: u16) -> NetworkKey {
        NetworkKey::derive(netkey(index), KeyBytes::new([index as u8; 16]))
    }

    fn sample_app_key(net: u16, app: u16) -> ApplicationKey {
        ApplicationKey::derive(netkey(net), appkey(app), KeyBytes::new([app as u8; 16]))
    }

    #[tokio::test]
    async fn test_network_key_survives_reload() {
        let memory = MemoryTagStore::new();
        let store = AnyTagStore::Memory(memory.clone());

        // First life of the node: store netkey index 0x0012 with a known key.
        let mut repo = KeyRepository::new();
        let mut network = NetworkLayer::new();
        let key = NetworkKey::derive(
            netkey(0x0012),
            KeyBytes::new([
                0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0a, 0x0b, 0x0c,
                0x0d, 0x0e, 0x0f,
            ]),
        );
        let expected = key;
        let slot = repo
            .add_network_key(Some(&store), &mut network, key)
            .await
            .unwrap();

        // Second life: a fresh repository over the same storage.
        let mut reloaded = KeyRepository::new();
        let mut network = NetworkLayer::new();
        reloaded.load_all(&store, &mut network).await;

        let (loaded_slot, loaded) = reloaded.network_key_by_index(netkey(0x0012)).unwrap();
        assert_eq!(loaded_slot, slot);
        assert_eq!(*loaded, expected);
        assert!(network.subnet(netkey(0x0012)).is_some());
    }

    #[tokio::test]
    async fn test_add_configures_subnet_and_caches_advertisement() {
        let mut repo = KeyRepository::new();
        let mut network = NetworkLayer::new();

        let key = sample_network_key(3);
        let network_id = key.network_id;
        let slot = repo.add_network_key(None, &mut network, key).await.unwrap();

        assert!(network.subnet(netkey(3)).is_some());
        let adv = repo.network_id_advertisement(slot).unwrap();
        assert_eq!(*adv, network_id_advertisement(&network_id));
    }

    #[tokio::test]
    async fn test_corrupted_record_skipped_others_load() {
        let memory = MemoryTagStore::new();
        let store = AnyTagStore::Memory(memory.clone());

        let mut repo = KeyRepository::new();
        let mut network = NetworkLayer::new();
        repo.add_network_key(Some(&store), &mut network, sample_network_key(0))
            .await
            .unwrap();
        repo.add_network_key(Some(&store), &mut network, sample_network_key(1))
            .await
            .unwrap();
        repo.add_network_key(Some(&store), &mut network, sample_network_key(2))
            .await
            .unwrap();

        // Truncate the middle record.
        memory
            .store_tag(Tag::new(RecordKind::NetworkKey, InternalIndex(1)), &[0xff; 10])
            .await
            .unwrap();

        let mut reloaded = KeyRepository::new();
        let mut network = NetworkLayer::new();
        reloaded.load_all(&store, &mut network).await;

        assert_eq!(reloaded.network_key_count(), 2);
        assert!(reloaded.network_key_by_index(netkey(0)).is_some());
        assert!(reloaded.network_key_by_index(netkey(1)).is_none());
        assert!(reloaded.network_key_by_index(netkey(2)).is_some());
    }

    #[tokio::test]
    async fn test_load_stops_early_when_pool_full() {
        let memory = MemoryTagStore::new();
        let store = AnyTagStore::Memory(memory.clone());

        let mut repo = KeyRepository::new();
        let mut network = NetworkLayer::new();
        for i in 0..3 {
            repo.add_network_key(Some(&store), &mut network, sample_network_key(i))
                .await
                .unwrap();
        }

        let mut tiny = KeyRepository::with_capacities(1, MAX_APP_KEYS);
        let mut network = NetworkLayer::new();
        tiny.load_all(&store, &mut network).await;

        assert_eq!(tiny.network_key_count(), 1);
        assert!(tiny.network_key_by_index(netkey(0)).is_some());
    }

    #[tokio::test]
    async fn test_delete_removes_record_slot_and_subnet() {
        let memory = MemoryTagStore::new();
        let store = AnyTagStore::Memory(memory.clone());

        let mut repo = KeyRepository::new();
        let mut network = NetworkLayer::new();
        let slot = repo
            .add_network_key(Some(&store), &mut network, sample_network_key(5))
            .await
            .unwrap();

        repo.delete_network_key(Some(&store), &mut network, slot)
            .await
            .unwrap();

        assert!(repo.network_key_at(slot).is_none());
        assert!(network.subnet(netkey(5)).is_none());
        assert!(repo.network_id_advertisement(slot).is_none());
        assert_eq!(memory.len(), 0);

        // Deleting the now-empty slot again is fine.
        repo.delete_network_key(Some(&store), &mut network, slot)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_delete_all_app_keys_empties_storage() {
        let memory = MemoryTagStore::new();
        let store = AnyTagStore::Memory(memory.clone());

        let mut repo = KeyRepository::new();
        let mut network = NetworkLayer::new();
        repo.add_network_key(Some(&store), &mut network, sample_network_key(0))
            .await
            .unwrap();
        repo.add_app_key(Some(&store), sample_app_key(0, 1)).await.unwrap();
        repo.add_app_key(Some(&store), sample_app_key(0, 2)).await.unwrap();

        repo.delete_all_app_keys(Some(&store)).await.unwrap();
        assert_eq!(repo.app_key_count(), 0);

        let mut reloaded = KeyRepository::new();
        let mut network = NetworkLayer::new();
        reloaded.load_all(&store, &mut network).await;
        assert_eq!(reloaded.app_key_count(), 0);
        assert_eq!(reloaded.network_key_count(), 1);
    }

    #[tokio::test]
    async fn test_app_key_resolves_bound_network_key() {
        let mut repo = KeyRepository::new();
        let mut network = NetworkLayer::new();
        repo.add_network_key(None, &mut network, sample_network_key(2))
            .await
            .unwrap();
        let slot = repo.add_app_key(None, sample_app_key(2, 7)).await.unwrap();

        let app = repo.app_key_at(slot).unwrap();
        let bound = repo.network_key_for_app(app).unwrap();
        assert_eq!(bound.netkey_index, netkey(2));
    }

    #[tokio::test]
    async fn test_app_key_with_unknown_binding_accepted() {
        let mut repo = KeyRepository::new();
        let slot = repo.add_app_key(None, sample_app_key(6, 1)).await.unwrap();

        assert!(repo.app_key_at(slot).is_some());
        assert!(repo.network_key_for_app(repo.app_key_at(slot).unwrap()).is_none());
    }

    #[tokio::test]
    async fn test_pool_exhaustion_surfaces_as_error() {
        let mut repo = KeyRepository::with_capacities(1, MAX_APP_KEYS);
        let mut network = NetworkLayer::new();

        repo.add_network_key(None, &mut network, sample_network_key(0))
            .await
            .unwrap();
        let err = repo
            .add_network_key(None, &mut network, sample_network_key(1))
            .await
            .unwrap_err();
        assert!(matches!(err, NodeError::Pool(_)));
    }
}
