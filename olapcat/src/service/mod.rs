//! The catalog service: the public face of the registry.
//!
//! Lock discipline:
//! - readers clone the cache snapshot and never take `gate`;
//! - single-entry writes hold `gate` shared plus the name's stripe in `names`,
//!   and write the store before the cache;
//! - reloads and flushes hold `gate` exclusively, only around the index swap.

use crate::access::{AccessFilter, Session};
use crate::catalog::cache::Generation;
use crate::catalog::{
    CatalogCache, CatalogEntry, CatalogIndex, CatalogResult, DataSourceInfo, Error, Upserted,
};
use crate::config::CatalogConfig;
use crate::params::Parameters;
use crate::schema::{ParsedSchema, SchemaLoader, SchemaSource};
use crate::storage::{CatalogStore, WriteMode};
use std::sync::Arc;
use tokio::sync::{MutexGuard, RwLock, RwLockReadGuard};
use tracing::{debug, info};

mod import;
mod reload;
mod sync;

pub use import::{ImportReport, ImportRequest, OVERWRITE_DIRECTIVE, XMLA_ENABLED_DIRECTIVE};
pub use reload::ReloadReport;
pub use sync::CancelToken;

use sync::StripedLock;

pub struct CatalogService<S, L, A> {
    store: S,
    loader: L,
    access: A,
    cache: CatalogCache,
    config: CatalogConfig,
    gate: RwLock<()>,
    names: StripedLock,
}

/// Held for the duration of a single-entry write.
struct WriteGuard<'a> {
    _gate: RwLockReadGuard<'a, ()>,
    _name: MutexGuard<'a, ()>,
}

impl<S, L, A> CatalogService<S, L, A>
where
    S: CatalogStore,
    L: SchemaLoader,
    A: AccessFilter,
{
    /// The cache starts empty and is filled from `store` on first use.
    pub fn new(store: S, loader: L, access: A, config: CatalogConfig) -> Self {
        let names = StripedLock::new(config.lock_stripes);
        Self {
            store,
            loader,
            access,
            cache: CatalogCache::new(),
            config,
            gate: RwLock::new(()),
            names,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &CatalogConfig {
        &self.config
    }

    pub fn generation(&self) -> Generation {
        self.cache.generation()
    }

    /// Catalogs visible to `session`, in registration order.
    pub async fn list_catalogs(
        &self,
        session: &Session,
        jndi_only: bool,
    ) -> CatalogResult<Vec<CatalogEntry>> {
        self.ensure_loaded().await?;
        let snapshot = self.cache.snapshot().await;
        Ok(snapshot
            .entries()
            .filter(|entry| self.access.can_view(session, entry))
            .filter(|entry| !jndi_only || entry.is_jndi())
            .cloned()
            .collect())
    }

    /// Registers `catalog`. With `overwrite`, an existing catalog of the same
    /// name is replaced only if definition and effective data source match.
    pub async fn add_catalog(
        &self,
        catalog: CatalogEntry,
        overwrite: bool,
        session: &Session,
    ) -> CatalogResult<()> {
        self.register(catalog, overwrite, Some(session)).await?;
        Ok(())
    }

    /// Resolves `context` as a catalog name, then as a definition. A miss, or a
    /// catalog the session may not see, is `None`.
    ///
    /// When several catalogs share a definition the first registered one is
    /// returned; only its schema structure should be relied on, not its data
    /// source.
    pub async fn get_catalog(
        &self,
        context: &str,
        session: &Session,
    ) -> CatalogResult<Option<CatalogEntry>> {
        self.ensure_loaded().await?;
        Ok(self
            .cache
            .resolve(context)
            .await
            .filter(|entry| self.access.can_view(session, entry)))
    }

    /// Parses the schema at `location` without registering anything.
    pub async fn load_schema(
        &self,
        location: &str,
        session: &Session,
    ) -> CatalogResult<ParsedSchema> {
        debug!(session = session.name(), location, "loading schema");
        self.load_with_timeout(
            location,
            &SchemaSource::Location(location.to_string()),
            &Parameters::new(),
        )
        .await
    }

    /// The parsed schema behind `context`, parsed on first request and kept
    /// with the cached entry afterwards.
    pub async fn catalog_schema(
        &self,
        context: &str,
        session: &Session,
    ) -> CatalogResult<Option<Arc<ParsedSchema>>> {
        let entry = match self.get_catalog(context, session).await? {
            Some(entry) => entry,
            None => return Ok(None),
        };
        if let Some(schema) = entry.schema() {
            return Ok(Some(schema.clone()));
        }
        let schema = Arc::new(
            self.load_with_timeout(
                entry.name(),
                &SchemaSource::Location(entry.definition().to_string()),
                &entry_parameters(&entry),
            )
            .await?,
        );
        if self.cache.attach_schema(&entry, schema.clone()).await {
            debug!(catalog = entry.name(), "schema attached");
        }
        Ok(Some(schema))
    }

    pub async fn remove_catalog(&self, name: &str, session: &Session) -> CatalogResult<CatalogEntry> {
        let _guard = self.write_guard(name).await?;
        let snapshot = self.cache.snapshot().await;
        let existing = snapshot
            .get(name)
            .filter(|entry| self.access.can_view(session, entry))
            .ok_or_else(|| Error::NotFound(name.to_string()))?;
        if !self.access.can_mutate(session, existing) {
            return Err(Error::Forbidden(
                session.name().to_string(),
                name.to_string(),
            ));
        }
        self.store.delete(name).await?;
        let removed = self.cache.remove(name).await?;
        info!(catalog = name, session = session.name(), "catalog removed");
        Ok(removed)
    }

    /// Drops the cached index; the next call reloads it from the store.
    pub async fn flush(&self) {
        let _gate = self.gate.write().await;
        self.cache.invalidate_all().await;
        info!("catalog cache flushed");
    }

    /// Store first, then cache. `session` is `None` for imports, which carry
    /// no session.
    async fn register(
        &self,
        entry: CatalogEntry,
        overwrite: bool,
        session: Option<&Session>,
    ) -> CatalogResult<Upserted> {
        let _guard = self.write_guard(entry.name()).await?;
        let snapshot = self.cache.snapshot().await;
        let mode = match snapshot.check_upsert(&entry, overwrite)? {
            None => WriteMode::Insert,
            Some(existing) => {
                if let Some(session) = session {
                    if !self.access.can_mutate(session, existing) {
                        return Err(Error::Forbidden(
                            session.name().to_string(),
                            existing.name().to_string(),
                        ));
                    }
                }
                WriteMode::Overwrite
            }
        };
        self.store.write(&entry, mode).await?;
        let name = entry.name().to_string();
        let upserted = self.cache.upsert(entry, overwrite).await?;
        info!(catalog = %name, ?upserted, "catalog registered");
        Ok(upserted)
    }

    async fn write_guard(&self, name: &str) -> CatalogResult<WriteGuard<'_>> {
        loop {
            self.ensure_loaded().await?;
            let gate = self.gate.read().await;
            // a flush may have slipped in between loading and taking the gate
            if self.cache.is_stale() {
                drop(gate);
                continue;
            }
            let name = self.names.lock(name).await;
            return Ok(WriteGuard {
                _gate: gate,
                _name: name,
            });
        }
    }

    async fn ensure_loaded(&self) -> CatalogResult<()> {
        if !self.cache.is_stale() {
            return Ok(());
        }
        let _gate = self.gate.write().await;
        if !self.cache.is_stale() {
            return Ok(());
        }
        let entries = self.store.read_all().await?;
        let count = entries.len();
        let generation = self.cache.install(CatalogIndex::from_entries(entries)).await;
        info!(catalogs = count, generation, "catalog cache loaded");
        Ok(())
    }

    async fn load_with_timeout(
        &self,
        label: &str,
        source: &SchemaSource,
        parameters: &Parameters,
    ) -> CatalogResult<ParsedSchema> {
        let timeout = self.config.load_timeout();
        match tokio::time::timeout(timeout, self.loader.load(source, parameters)).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(Error::Timeout(label.to_string(), timeout)),
        }
    }
}

/// Loader parameters for a registered entry: its raw data-source pairs.
fn entry_parameters(entry: &CatalogEntry) -> Parameters {
    DataSourceInfo::parse(entry.datasource_info())
        .map(|info| info.parameters().clone())
        .unwrap_or_default()
}
