//! A single-file durable store.
//!
//! Layout: magic `u32`, format version `u8`, then the entry list (a `u32`
//! count followed by the encoded entries). Every mutation rewrites the whole
//! file through a sibling temp file and a rename, so a crash leaves either the
//! old or the new file behind.

use crate::catalog::CatalogEntry;
use crate::encoding::{Decoder, Encoder};
use crate::storage::{CatalogStore, StoreError, StoreResult, WriteMode};
use bytes::BytesMut;
use indexmap::IndexMap;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;
use tracing::debug;

const MAGIC: u32 = 0x4f43_4154;
const VERSION: u8 = 1;

pub struct FileStore {
    path: PathBuf,
    /// serializes read-modify-write cycles against the file
    lock: RwLock<()>,
}

impl FileStore {
    /// Opens the store at `path`, creating an empty one if the file is missing.
    pub async fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let store = FileStore {
            path: path.as_ref().to_path_buf(),
            lock: RwLock::new(()),
        };
        if tokio::fs::try_exists(&store.path).await? {
            store.load().await?;
        } else {
            store.persist(&IndexMap::new()).await?;
        }
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> StoreResult<IndexMap<String, CatalogEntry>> {
        let data = tokio::fs::read(&self.path).await?;
        let mut buf = data.as_slice();
        let magic = u32::decode(&mut buf)?;
        if magic != MAGIC {
            return Err(StoreError::Corrupted(format!(
                "{} is not a catalog store",
                self.path.display()
            )));
        }
        let version = u8::decode(&mut buf)?;
        if version != VERSION {
            return Err(StoreError::Corrupted(format!(
                "unsupported catalog store version {}",
                version
            )));
        }
        let entries = Vec::<CatalogEntry>::decode(&mut buf)?;
        if !buf.is_empty() {
            return Err(StoreError::Corrupted(format!(
                "{} trailing bytes in {}",
                buf.len(),
                self.path.display()
            )));
        }
        Ok(entries
            .into_iter()
            .map(|entry| (entry.name().to_string(), entry))
            .collect())
    }

    async fn persist(&self, entries: &IndexMap<String, CatalogEntry>) -> StoreResult<()> {
        let mut buf = BytesMut::new();
        MAGIC.encode(&mut buf)?;
        VERSION.encode(&mut buf)?;
        entries.values().cloned().collect::<Vec<_>>().encode(&mut buf)?;

        let tmp = self.tmp_path();
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(&buf).await?;
        file.sync_all().await?;
        drop(file);
        tokio::fs::rename(&tmp, &self.path).await?;
        debug!(path = %self.path.display(), entries = entries.len(), "catalog store persisted");
        Ok(())
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|name| name.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl CatalogStore for FileStore {
    async fn read_all(&self) -> StoreResult<Vec<CatalogEntry>> {
        let _guard = self.lock.read().await;
        Ok(self.load().await?.into_values().collect())
    }

    async fn write(&self, entry: &CatalogEntry, mode: WriteMode) -> StoreResult<()> {
        let _guard = self.lock.write().await;
        let mut entries = self.load().await?;
        let exists = entries.contains_key(entry.name());
        match (mode, exists) {
            (WriteMode::Insert, true) => return Err(StoreError::Exists(entry.name().to_string())),
            (WriteMode::Overwrite, false) => {
                return Err(StoreError::NotFound(entry.name().to_string()))
            }
            _ => {}
        }
        entries.insert(entry.name().to_string(), entry.clone());
        self.persist(&entries).await
    }

    async fn delete(&self, name: &str) -> StoreResult<CatalogEntry> {
        let _guard = self.lock.write().await;
        let mut entries = self.load().await?;
        let removed = entries
            .shift_remove(name)
            .ok_or_else(|| StoreError::NotFound(name.to_string()))?;
        self.persist(&entries).await?;
        Ok(removed)
    }
}
