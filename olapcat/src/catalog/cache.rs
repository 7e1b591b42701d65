//! In-memory catalog index published as immutable snapshots.
//!
//! Readers clone the current `Arc<CatalogIndex>` and work on it without holding
//! any lock. Writers serialize on `writer`, build the next index from the
//! current one and swap the pointer, so a reader sees either the whole old
//! index or the whole new one.

use crate::catalog::error::Error;
use crate::catalog::index::{CatalogIndex, Upserted};
use crate::catalog::CatalogEntry;
use crate::schema::ParsedSchema;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

pub type Generation = u64;

#[derive(Debug)]
pub struct CatalogCache {
    current: RwLock<Arc<CatalogIndex>>,
    writer: Mutex<()>,
    /// bumped on every membership change
    generation: AtomicU64,
    stale: AtomicBool,
}

impl Default for CatalogCache {
    fn default() -> Self {
        Self::new()
    }
}

impl CatalogCache {
    /// An empty cache that still needs its first load from the store.
    pub fn new() -> Self {
        Self {
            current: RwLock::new(Arc::new(CatalogIndex::new())),
            writer: Mutex::new(()),
            generation: AtomicU64::new(0),
            stale: AtomicBool::new(true),
        }
    }

    pub async fn snapshot(&self) -> Arc<CatalogIndex> {
        self.current.read().await.clone()
    }

    pub async fn resolve(&self, context: &str) -> Option<CatalogEntry> {
        self.snapshot().await.resolve(context).cloned()
    }

    pub async fn list_all(&self) -> Vec<CatalogEntry> {
        self.snapshot().await.entries().cloned().collect()
    }

    pub async fn upsert(&self, entry: CatalogEntry, overwrite: bool) -> Result<Upserted, Error> {
        let _writer = self.writer.lock().await;
        let mut next = CatalogIndex::clone(&*self.snapshot().await);
        let name = entry.name().to_string();
        let upserted = next.upsert(entry, overwrite)?;
        let generation = self.publish(next).await;
        debug!(catalog = %name, ?upserted, generation, "cache upsert");
        Ok(upserted)
    }

    pub async fn remove(&self, name: &str) -> Result<CatalogEntry, Error> {
        let _writer = self.writer.lock().await;
        let mut next = CatalogIndex::clone(&*self.snapshot().await);
        let removed = next.remove(name)?;
        let generation = self.publish(next).await;
        debug!(catalog = %name, generation, "cache remove");
        Ok(removed)
    }

    /// Attaches a lazily parsed schema if the entry still has the identity it
    /// was parsed for. Does not count as a membership change.
    pub async fn attach_schema(&self, parsed_for: &CatalogEntry, schema: Arc<ParsedSchema>) -> bool {
        let _writer = self.writer.lock().await;
        let current = self.snapshot().await;
        match current.get(parsed_for.name()) {
            Some(entry) if entry.same_identity(parsed_for) && entry.schema().is_none() => {}
            _ => return false,
        }
        let mut next = CatalogIndex::clone(&current);
        if let Some(entry) = next.get_mut(parsed_for.name()) {
            entry.set_schema(Some(schema));
        }
        *self.current.write().await = Arc::new(next);
        true
    }

    /// Publishes an empty index and marks the cache stale so the next access
    /// reloads it from the store. Returns the index that was dropped.
    pub async fn invalidate_all(&self) -> Arc<CatalogIndex> {
        let _writer = self.writer.lock().await;
        let previous = std::mem::replace(
            &mut *self.current.write().await,
            Arc::new(CatalogIndex::new()),
        );
        self.stale.store(true, Ordering::SeqCst);
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(generation, dropped = previous.len(), "cache invalidated");
        previous
    }

    /// Replaces the whole index in one swap and clears the stale mark.
    pub async fn install(&self, index: CatalogIndex) -> Generation {
        let _writer = self.writer.lock().await;
        let generation = self.publish(index).await;
        self.stale.store(false, Ordering::SeqCst);
        generation
    }

    pub fn is_stale(&self) -> bool {
        self.stale.load(Ordering::SeqCst)
    }

    pub fn generation(&self) -> Generation {
        self.generation.load(Ordering::SeqCst)
    }

    async fn publish(&self, index: CatalogIndex) -> Generation {
        *self.current.write().await = Arc::new(index);
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str) -> CatalogEntry {
        CatalogEntry::new(name, format!("solution:/{name}.xml"), "DataSource=ds1")
    }

    #[tokio::test]
    async fn snapshot_is_isolated_from_writes() -> Result<(), Error> {
        let cache = CatalogCache::new();
        assert!(cache.is_stale());
        cache.install(CatalogIndex::from_entries(vec![entry("a")])).await;
        assert!(!cache.is_stale());

        let before = cache.snapshot().await;
        cache.upsert(entry("b"), false).await?;
        cache.remove("a").await?;
        assert_eq!(before.len(), 1);
        assert!(before.get("a").is_some());
        let names = cache
            .list_all()
            .await
            .into_iter()
            .map(|e| e.name().to_string())
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["b"]);
        Ok(())
    }

    #[tokio::test]
    async fn generation() -> Result<(), Error> {
        let cache = CatalogCache::new();
        let start = cache.generation();
        cache.upsert(entry("a"), false).await?;
        assert_eq!(cache.generation(), start + 1);
        assert!(cache.upsert(entry("a"), false).await.is_err());
        assert_eq!(cache.generation(), start + 1);

        let parsed_for = cache.resolve("a").await.unwrap();
        let schema = Arc::new(ParsedSchema::new("a").with_cube("Sales"));
        assert!(cache.attach_schema(&parsed_for, schema.clone()).await);
        assert!(!cache.attach_schema(&parsed_for, schema.clone()).await);
        assert_eq!(cache.generation(), start + 1);
        assert_eq!(cache.resolve("a").await.unwrap().schema(), Some(&schema));
        Ok(())
    }

    #[tokio::test]
    async fn invalidate_all() -> Result<(), Error> {
        let cache = CatalogCache::new();
        cache.install(CatalogIndex::from_entries(vec![entry("a"), entry("b")])).await;
        let dropped = cache.invalidate_all().await;
        assert_eq!(dropped.len(), 2);
        assert!(cache.is_stale());
        assert!(cache.list_all().await.is_empty());
        assert!(cache.resolve("a").await.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn concurrent_upserts_do_not_lose_updates() {
        let cache = Arc::new(CatalogCache::new());
        let mut tasks = Vec::new();
        for i in 0..32 {
            let cache = cache.clone();
            tasks.push(tokio::spawn(async move {
                cache.upsert(entry(&format!("c{i}")), false).await
            }));
        }
        for task in tasks {
            task.await.unwrap().unwrap();
        }
        assert_eq!(cache.snapshot().await.len(), 32);
    }
}
