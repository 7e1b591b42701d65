//! Test doubles for the loader and store seams.

use crate::catalog::CatalogEntry;
use crate::params::Parameters;
use crate::schema::{ParsedSchema, SchemaLoadError, SchemaLoader, SchemaSource};
use crate::storage::{CatalogStore, MemoryStore, StoreError, StoreResult, WriteMode};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

/// Resolves locations from a fixed table. Streams are read as
/// `name=...;cubes=a,b;roles=x` descriptors.
#[derive(Debug, Default)]
pub(crate) struct FakeLoader {
    locations: HashMap<String, ParsedSchema>,
    slow: HashMap<String, Duration>,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl FakeLoader {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_location<T: Into<String>>(mut self, location: T, schema: ParsedSchema) -> Self {
        self.locations.insert(location.into(), schema);
        self
    }

    pub(crate) fn with_slow_location<T: Into<String>>(mut self, location: T, delay: Duration) -> Self {
        self.slow.insert(location.into(), delay);
        self
    }

    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn parse_stream(bytes: &[u8]) -> Result<ParsedSchema, SchemaLoadError> {
        let text = std::str::from_utf8(bytes)
            .map_err(|e| SchemaLoadError::Malformed("stream".to_string(), e.to_string()))?;
        let params = Parameters::parse(text)
            .map_err(|e| SchemaLoadError::Malformed("stream".to_string(), e.to_string()))?;
        let name = params
            .get("name")
            .ok_or_else(|| SchemaLoadError::Malformed("stream".to_string(), "no name".to_string()))?;
        let mut schema = ParsedSchema::new(name);
        for cube in params.get("cubes").unwrap_or_default().split(',').filter(|c| !c.is_empty()) {
            schema = schema.with_cube(cube);
        }
        for role in params.get("roles").unwrap_or_default().split(',').filter(|r| !r.is_empty()) {
            schema = schema.with_role(role);
        }
        Ok(schema)
    }
}

impl SchemaLoader for FakeLoader {
    async fn load(
        &self,
        source: &SchemaSource,
        _parameters: &Parameters,
    ) -> Result<ParsedSchema, SchemaLoadError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match source {
            SchemaSource::Location(location) => {
                if let Some(delay) = self.slow.get(location) {
                    tokio::time::sleep(*delay).await;
                }
                self.locations.get(location).cloned().ok_or_else(|| {
                    SchemaLoadError::Unreadable(location.clone(), "no such location".to_string())
                })
            }
            SchemaSource::Stream(bytes) => Self::parse_stream(bytes),
        }
    }
}

/// A memory store whose reads and writes can be made to fail.
#[derive(Debug, Default)]
pub(crate) struct FlakyStore {
    inner: MemoryStore,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    write_delay_ms: AtomicU64,
}

impl FlakyStore {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_entries(entries: Vec<CatalogEntry>) -> Self {
        Self {
            inner: MemoryStore::with_entries(entries),
            ..Self::default()
        }
    }

    pub(crate) fn inner(&self) -> &MemoryStore {
        &self.inner
    }

    pub(crate) fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub(crate) fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub(crate) fn slow_writes(&self, delay: Duration) {
        self.write_delay_ms.store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    fn injected(&self, flag: &AtomicBool) -> StoreResult<()> {
        if flag.load(Ordering::SeqCst) {
            return Err(StoreError::IO(std::io::Error::new(
                std::io::ErrorKind::Other,
                "injected failure",
            )));
        }
        Ok(())
    }
}

impl CatalogStore for FlakyStore {
    async fn read_all(&self) -> StoreResult<Vec<CatalogEntry>> {
        self.injected(&self.fail_reads)?;
        self.inner.read_all().await
    }

    async fn write(&self, entry: &CatalogEntry, mode: WriteMode) -> StoreResult<()> {
        self.injected(&self.fail_writes)?;
        let delay = self.write_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        self.inner.write(entry, mode).await
    }

    async fn delete(&self, name: &str) -> StoreResult<CatalogEntry> {
        self.injected(&self.fail_writes)?;
        self.inner.delete(name).await
    }
}
