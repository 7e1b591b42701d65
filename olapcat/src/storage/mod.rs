use crate::catalog::CatalogEntry;
use crate::encoding;
use std::future::Future;
use thiserror::Error;

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("encoding error {0}")]
    Encoding(#[from] encoding::error::Error),
    #[error("io error: {0}")]
    IO(#[from] std::io::Error),
    #[error("catalog {0} not found")]
    NotFound(String),
    #[error("catalog {0} already stored")]
    Exists(String),
    #[error("{0}")]
    Corrupted(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    Insert,
    Overwrite,
}

/// Durable registry of catalog entries, keyed by name.
///
/// The store is the source of truth; the cache is rebuilt from `read_all`.
/// Parsed schemas are never persisted.
pub trait CatalogStore: Send + Sync {
    /// Every stored entry, in insertion order.
    fn read_all(&self) -> impl Future<Output = StoreResult<Vec<CatalogEntry>>> + Send;

    /// `Insert` fails on an existing name, `Overwrite` on a missing one.
    fn write(
        &self,
        entry: &CatalogEntry,
        mode: WriteMode,
    ) -> impl Future<Output = StoreResult<()>> + Send;

    fn delete(&self, name: &str) -> impl Future<Output = StoreResult<CatalogEntry>> + Send;
}
