use crate::access::{AccessFilter, Session};
use crate::catalog::cache::Generation;
use crate::catalog::{CatalogEntry, CatalogIndex, CatalogResult, Error};
use crate::schema::{SchemaLoader, SchemaSource};
use crate::service::{entry_parameters, CancelToken, CatalogService};
use crate::storage::CatalogStore;
use futures::stream::{self, StreamExt};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

/// Outcome of a successful reload.
#[derive(Debug, Default)]
pub struct ReloadReport {
    /// entries installed in the cache
    pub loaded: usize,
    /// entries whose schema was parsed during the reload
    pub parsed: usize,
    /// per-entry parse failures; these entries stay registered, unparsed
    pub failures: Vec<(String, Error)>,
    /// the store was read again because a write landed mid-reload
    pub retried: bool,
    pub generation: Generation,
}

impl<S, L, A> CatalogService<S, L, A>
where
    S: CatalogStore,
    L: SchemaLoader,
    A: AccessFilter,
{
    /// Rebuilds the cache from the store. Either the whole new index is
    /// installed or, on any error, the previous one stays in place.
    pub async fn reinit(&self, session: &Session) -> CatalogResult<ReloadReport> {
        self.reinit_with_cancel(session, &CancelToken::new()).await
    }

    pub async fn reinit_with_cancel(
        &self,
        session: &Session,
        cancel: &CancelToken,
    ) -> CatalogResult<ReloadReport> {
        info!(session = session.name(), "reloading catalogs");
        let observed = self.cache.generation();
        let entries = self.read_store_for_reload().await?;

        let mut report = ReloadReport::default();
        let parsed = self.parse_entries(entries, cancel, &mut report).await?;

        let _gate = self.gate.write().await;
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        let entries = if self.cache.generation() != observed {
            // a write completed since the store was read; its result must not be lost
            report.retried = true;
            let fresh = self.read_store_for_reload().await?;
            reuse_schemas(fresh, parsed)
        } else {
            parsed
        };
        report.loaded = entries.len();
        report.generation = self.cache.install(CatalogIndex::from_entries(entries)).await;
        info!(
            catalogs = report.loaded,
            parsed = report.parsed,
            failed = report.failures.len(),
            retried = report.retried,
            generation = report.generation,
            "catalogs reloaded"
        );
        Ok(report)
    }

    async fn read_store_for_reload(&self) -> CatalogResult<Vec<CatalogEntry>> {
        self.store.read_all().await.map_err(|e| {
            warn!(error = %e, "catalog reload failed, keeping the current cache");
            Error::from(e)
        })
    }

    /// Parses schemas outside any registry lock. Failed entries keep no
    /// schema and are reported; cancellation is honored between entries.
    async fn parse_entries(
        &self,
        entries: Vec<CatalogEntry>,
        cancel: &CancelToken,
        report: &mut ReloadReport,
    ) -> CatalogResult<Vec<CatalogEntry>> {
        if !self.config.eager_reload {
            if cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }
            return Ok(entries);
        }
        let outcomes = stream::iter(entries.into_iter().map(move |entry| async move {
            if cancel.is_cancelled() {
                return (entry, Err(Error::Cancelled));
            }
            let result = self
                .load_with_timeout(
                    entry.name(),
                    &SchemaSource::Location(entry.definition().to_string()),
                    &entry_parameters(&entry),
                )
                .await;
            (entry, result)
        }))
        .buffered(self.config.reload_parallelism.max(1))
        .collect::<Vec<_>>()
        .await;

        if cancel.is_cancelled() {
            info!("catalog reload cancelled");
            return Err(Error::Cancelled);
        }
        let mut parsed = Vec::with_capacity(outcomes.len());
        for (mut entry, result) in outcomes {
            match result {
                Ok(schema) => {
                    report.parsed += 1;
                    entry.set_schema(Some(Arc::new(schema)));
                }
                Err(e) => {
                    warn!(catalog = entry.name(), error = %e, "schema skipped during reload");
                    report.failures.push((entry.name().to_string(), e));
                }
            }
            parsed.push(entry);
        }
        Ok(parsed)
    }
}

/// Carries schemas parsed earlier over to freshly read entries whose identity
/// is unchanged; anything new stays unparsed until first use.
fn reuse_schemas(fresh: Vec<CatalogEntry>, parsed: Vec<CatalogEntry>) -> Vec<CatalogEntry> {
    let mut parsed = parsed
        .into_iter()
        .map(|entry| (entry.name().to_string(), entry))
        .collect::<HashMap<_, _>>();
    fresh
        .into_iter()
        .map(|mut entry| {
            if let Some(mut earlier) = parsed.remove(entry.name()) {
                if earlier.same_identity(&entry) {
                    entry.set_schema(earlier.take_schema());
                }
            }
            entry
        })
        .collect()
}
