use crate::catalog::CatalogEntry;
use crate::storage::{CatalogStore, StoreError, StoreResult, WriteMode};
use indexmap::IndexMap;
use tokio::sync::RwLock;

/// A store that lives only as long as the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<IndexMap<String, CatalogEntry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = CatalogEntry>,
    {
        let entries = entries
            .into_iter()
            .map(|mut entry| {
                entry.take_schema();
                (entry.name().to_string(), entry)
            })
            .collect();
        Self {
            entries: RwLock::new(entries),
        }
    }
}

impl CatalogStore for MemoryStore {
    async fn read_all(&self) -> StoreResult<Vec<CatalogEntry>> {
        Ok(self.entries.read().await.values().cloned().collect())
    }

    async fn write(&self, entry: &CatalogEntry, mode: WriteMode) -> StoreResult<()> {
        let mut entries = self.entries.write().await;
        let exists = entries.contains_key(entry.name());
        match (mode, exists) {
            (WriteMode::Insert, true) => return Err(StoreError::Exists(entry.name().to_string())),
            (WriteMode::Overwrite, false) => {
                return Err(StoreError::NotFound(entry.name().to_string()))
            }
            _ => {}
        }
        let mut entry = entry.clone();
        entry.take_schema();
        entries.insert(entry.name().to_string(), entry);
        Ok(())
    }

    async fn delete(&self, name: &str) -> StoreResult<CatalogEntry> {
        self.entries
            .write()
            .await
            .shift_remove(name)
            .ok_or_else(|| StoreError::NotFound(name.to_string()))
    }
}
