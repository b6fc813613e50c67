//! Persistent tag store backends.
//!
//! Security keys and node state persist as fixed-layout records addressed by
//! 32-bit tags (see `bluemesh_core::tag`). Two backends are provided: a
//! shareable in-memory map for tests and embedding, and a directory of
//! per-tag files using atomic writes (write to `.tmp`, then rename) to
//! prevent corruption on power loss.

use std::collections::HashMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tokio::fs;

use bluemesh_core::tag::Tag;

/// Errors from tag store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to determine storage directory: {0}")]
    Directory(String),
}

/// Async persistence boundary for tagged records.
///
/// Absent tags are `Ok(None)` on read and `Ok(())` on delete; only real
/// backend failures surface as errors.
pub trait TagStore: Send + Sync {
    /// Store a record under a tag, replacing any previous value.
    fn store_tag(
        &self,
        tag: Tag,
        data: &[u8],
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Fetch the record stored under a tag.
    fn get_tag(&self, tag: Tag) -> impl Future<Output = Result<Option<Vec<u8>>, StoreError>> + Send;

    /// Delete the record stored under a tag. Idempotent.
    fn delete_tag(&self, tag: Tag) -> impl Future<Output = Result<(), StoreError>> + Send;
}

/// In-memory tag store backed by a shared map.
///
/// Clones share the same underlying map, so a "restarted" node handed a clone
/// observes everything the previous instance persisted.
#[derive(Debug, Clone, Default)]
pub struct MemoryTagStore {
    records: Arc<Mutex<HashMap<u32, Vec<u8>>>>,
}

impl MemoryTagStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records currently stored.
    pub fn len(&self) -> usize {
        self.records.lock().expect("tag map mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl TagStore for MemoryTagStore {
    async fn store_tag(&self, tag: Tag, data: &[u8]) -> Result<(), StoreError> {
        self.records
            .lock()
            .expect("tag map mutex poisoned")
            .insert(tag.value(), data.to_vec());
        Ok(())
    }

    async fn get_tag(&self, tag: Tag) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self
            .records
            .lock()
            .expect("tag map mutex poisoned")
            .get(&tag.value())
            .cloned())
    }

    async fn delete_tag(&self, tag: Tag) -> Result<(), StoreError> {
        self.records
            .lock()
            .expect("tag map mutex poisoned")
            .remove(&tag.value());
        Ok(())
    }
}

/// Tag store keeping one file per tag under a base directory.
///
/// File names are the eight-hex-digit tag value, e.g. `4d4e0000`.
#[derive(Debug)]
pub struct FileTagStore {
    base_dir: PathBuf,
}

impl FileTagStore {
    /// Create a store rooted at `base_dir`, creating the directory if needed.
    ///
    /// # Note
    /// This performs blocking I/O (`create_dir_all`). Call at startup before the async runtime is under load.
    pub fn new(base_dir: PathBuf) -> Result<Self, StoreError> {
        std::fs::create_dir_all(&base_dir)?;
        Ok(Self { base_dir })
    }

    /// Create a store at the default path (`~/.bluemesh/storage`).
    ///
    /// # Note
    /// This performs blocking I/O (`create_dir_all`). Call at startup before the async runtime is under load.
    pub fn default_path() -> Result<Self, StoreError> {
        let home = dirs::home_dir()
            .ok_or_else(|| StoreError::Directory("could not determine home directory".into()))?;
        Self::new(home.join(".bluemesh").join("storage"))
    }

    fn tag_path(&self, tag: Tag) -> PathBuf {
        self.base_dir.join(format!("{tag}"))
    }

    /// Write data atomically: write to a `.tmp` file then rename.
    async fn atomic_write(&self, path: &Path, data: &[u8]) -> Result<(), StoreError> {
        let tmp_path = path.with_extension("tmp");
        fs::write(&tmp_path, data).await?;
        fs::rename(&tmp_path, path).await?;
        Ok(())
    }
}

impl TagStore for FileTagStore {
    async fn store_tag(&self, tag: Tag, data: &[u8]) -> Result<(), StoreError> {
        self.atomic_write(&self.tag_path(tag), data).await
    }

    async fn get_tag(&self, tag: Tag) -> Result<Option<Vec<u8>>, StoreError> {
        match fs::read(self.tag_path(tag)).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::Io(e)),
        }
    }

    async fn delete_tag(&self, tag: Tag) -> Result<(), StoreError> {
        match fs::remove_file(self.tag_path(tag)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::Io(e)),
        }
    }
}

/// Wraps the concrete tag store backends, dispatching via match.
#[derive(Debug)]
pub enum AnyTagStore {
    Memory(MemoryTagStore),
    File(FileTagStore),
}

impl AnyTagStore {
    pub async fn store_tag(&self, tag: Tag, data: &[u8]) -> Result<(), StoreError> {
        match self {
            Self::Memory(s) => s.store_tag(tag, data).await,
            Self::File(s) => s.store_tag(tag, data).await,
        }
    }

    pub async fn get_tag(&self, tag: Tag) -> Result<Option<Vec<u8>>, StoreError> {
        match self {
            Self::Memory(s) => s.get_tag(tag).await,
            Self::File(s) => s.get_tag(tag).await,
        }
    }

    pub async fn delete_tag(&self, tag: Tag) -> Result<(), StoreError> {
        match self {
            Self::Memory(s) => s.delete_tag(tag).await,
            Self::File(s) => s.delete_tag(tag).await,
        }
    }
}

/// How the node opens its tag store once the stack reports operational.
///
/// The store handle may not exist before that signal, so the node carries a
/// provider and resolves it from the stack-operational handler.
#[derive(Debug, Clone)]
pub enum StoreProvider {
    /// No persistence. Loads see an empty store and writes are skipped.
    Disabled,
    /// Per-tag files under the given directory, or the default path if `None`.
    File(Option<PathBuf>),
    /// A shared in-memory store, for tests and embedded use.
    Memory(MemoryTagStore),
}

impl StoreProvider {
    /// Decide the provider from configuration.
    pub fn from_config(enabled: bool, custom_path: Option<&str>) -> Self {
        if !enabled {
            return Self::Disabled;
        }
        match custom_path {
            Some(path) => Self::File(Some(PathBuf::from(path))),
            None => Self::File(None),
        }
    }

    /// Resolve the provider into an open store. `Ok(None)` when persistence
    /// is disabled.
    pub fn open(&self) -> Result<Option<AnyTagStore>, StoreError> {
        match self {
            Self::Disabled => Ok(None),
            Self::File(Some(path)) => Ok(Some(AnyTagStore::File(FileTagStore::new(path.clone())?))),
            Self::File(None) => Ok(Some(AnyTagStore::File(FileTagStore::default_path()?))),
            Self::Memory(store) => Ok(Some(AnyTagStore::Memory(store.clone()))),
        }
    }

    pub fn is_disabled(&self) -> bool {
        matches!(self, Self::Disabled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bluemesh_core::tag::{InternalIndex, RecordKind};

    fn net_tag(slot: u16) -> Tag {
        Tag::new(RecordKind::NetworkKey, InternalIndex(slot))
    }

    #[tokio::test]
    async fn test_memory_store_roundtrip() {
        let store = MemoryTagStore::new();
        store.store_tag(net_tag(0), &[1, 2, 3]).await.unwrap();

        let loaded = store.get_tag(net_tag(0)).await.unwrap();
        assert_eq!(loaded.as_deref(), Some(&[1u8, 2, 3][..]));
    }

    #[tokio::test]
    async fn test_memory_store_absent_tag() {
        let store = MemoryTagStore::new();
        assert!(store.get_tag(net_tag(5)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_memory_store_overwrite() {
        let store = MemoryTagStore::new();
        store.store_tag(net_tag(0), &[1]).await.unwrap();
        store.store_tag(net_tag(0), &[2, 3]).await.unwrap();

        let loaded = store.get_tag(net_tag(0)).await.unwrap();
        assert_eq!(loaded.as_deref(), Some(&[2u8, 3][..]));
    }

    #[tokio::test]
    async fn test_memory_store_delete_idempotent() {
        let store = MemoryTagStore::new();
        store.store_tag(net_tag(0), &[1]).await.unwrap();

        store.delete_tag(net_tag(0)).await.unwrap();
        assert!(store.get_tag(net_tag(0)).await.unwrap().is_none());

        // Second delete of the same tag must also succeed.
        store.delete_tag(net_tag(0)).await.unwrap();
    }

    #[tokio::test]
    async fn test_memory_store_clones_share_records() {
        let store = MemoryTagStore::new();
        let reopened = store.clone();

        store.store_tag(net_tag(3), &[0xaa]).await.unwrap();

        let loaded = reopened.get_tag(net_tag(3)).await.unwrap();
        assert_eq!(loaded.as_deref(), Some(&[0xaau8][..]));
    }

    #[tokio::test]
    async fn test_file_store_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileTagStore::new(dir.path().to_path_buf()).unwrap();

        store.store_tag(net_tag(0x12), &[0xde, 0xad]).await.unwrap();

        let loaded = store.get_tag(net_tag(0x12)).await.unwrap();
        assert_eq!(loaded.as_deref(), Some(&[0xdeu8, 0xad][..]));
    }

    #[tokio::test]
    async fn test_file_store_names_files_by_tag() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileTagStore::new(dir.path().to_path_buf()).unwrap();

        store.store_tag(net_tag(0x0012), &[1]).await.unwrap();

        // 'M' << 24 | 'N' << 16 | 0x0012
        assert!(dir.path().join("4d4e0012").exists());
    }

    #[tokio::test]
    async fn test_file_store_absent_tag() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileTagStore::new(dir.path().to_path_buf()).unwrap();

        assert!(store.get_tag(net_tag(7)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_file_store_delete_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileTagStore::new(dir.path().to_path_buf()).unwrap();

        store.store_tag(net_tag(1), &[9]).await.unwrap();
        store.delete_tag(net_tag(1)).await.unwrap();
        store.delete_tag(net_tag(1)).await.unwrap();

        assert!(store.get_tag(net_tag(1)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_file_store_atomic_write_leaves_no_tmp() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileTagStore::new(dir.path().to_path_buf()).unwrap();

        store.store_tag(net_tag(2), b"hello").await.unwrap();

        let path = dir.path().join(format!("{}", net_tag(2)));
        assert!(path.exists());
        assert!(!path.with_extension("tmp").exists());
    }

    #[tokio::test]
    async fn test_file_store_leftover_tmp_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileTagStore::new(dir.path().to_path_buf()).unwrap();

        // Simulate a crash mid-write: a stale .tmp next to a real record.
        store.store_tag(net_tag(4), &[1, 2]).await.unwrap();
        let tmp = dir.path().join(format!("{}.tmp", net_tag(4)));
        std::fs::write(&tmp, b"stale garbage").unwrap();

        let loaded = store.get_tag(net_tag(4)).await.unwrap();
        assert_eq!(loaded.as_deref(), Some(&[1u8, 2][..]));
    }

    #[test]
    fn test_file_store_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");

        assert!(!nested.exists());
        let _store = FileTagStore::new(nested.clone()).unwrap();
        assert!(nested.exists());
    }

    #[tokio::test]
    async fn test_any_store_dispatches_to_memory() {
        let memory = MemoryTagStore::new();
        let store = AnyTagStore::Memory(memory.clone());

        store.store_tag(net_tag(0), &[5]).await.unwrap();
        assert_eq!(memory.len(), 1);
        assert_eq!(
            store.get_tag(net_tag(0)).await.unwrap().as_deref(),
            Some(&[5u8][..])
        );
    }

    #[test]
    fn test_provider_disabled_opens_no_store() {
        let provider = StoreProvider::from_config(false, Some("/tmp/ignored"));
        assert!(provider.is_disabled());
        assert!(provider.open().unwrap().is_none());
    }

    #[test]
    fn test_provider_from_config_custom_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store");
        let provider = StoreProvider::from_config(true, path.to_str());

        let store = provider.open().unwrap();
        assert!(store.is_some());
        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_provider_memory_opens_shared_store() {
        let memory = MemoryTagStore::new();
        let provider = StoreProvider::Memory(memory.clone());

        let store = provider.open().unwrap().expect("memory store");
        store.store_tag(net_tag(9), &[1]).await.unwrap();

        assert_eq!(memory.len(), 1);
    }
}
