use crate::access::AccessFilter;
use crate::catalog::{CatalogEntry, CatalogResult, DataSourceInfo, Error, ImportError};
use crate::params::{Parameters, ParamsError};
use crate::schema::{ParsedSchema, SchemaLoader, SchemaLoadError, SchemaSource};
use crate::service::{CancelToken, CatalogService};
use crate::storage::CatalogStore;
use bytes::Bytes;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

pub const OVERWRITE_DIRECTIVE: &str = "overwrite";
pub const XMLA_ENABLED_DIRECTIVE: &str = "xmlaEnabledFlag";

/// Prefix of definitions for schemas registered through an import.
const IMPORTED_DEFINITION_PREFIX: &str = "mondrian:/";

#[derive(Debug, Clone, Default, PartialEq)]
struct ImportOptions {
    overwrite: bool,
    xmla_enabled: bool,
    datasource: Parameters,
}

impl ImportOptions {
    /// Splits the `overwrite` and `xmlaEnabledFlag` directives off; what is
    /// left describes the data source.
    fn from_parameters(mut params: Parameters) -> Result<Self, ParamsError> {
        let overwrite = take_flag(&mut params, OVERWRITE_DIRECTIVE)?;
        let xmla_enabled = take_flag(&mut params, XMLA_ENABLED_DIRECTIVE)?;
        Ok(Self {
            overwrite,
            xmla_enabled,
            datasource: params,
        })
    }
}

fn take_flag(params: &mut Parameters, key: &str) -> Result<bool, ParamsError> {
    match params.remove(key) {
        None => Ok(false),
        Some(value) if value.trim().eq_ignore_ascii_case("true") => Ok(true),
        Some(value) if value.trim().eq_ignore_ascii_case("false") => Ok(false),
        Some(value) => Err(ParamsError::invalid(key, &value)),
    }
}

/// One schema of a bulk import.
#[derive(Debug, Clone)]
pub struct ImportRequest {
    pub domain_id: String,
    pub analysis: Bytes,
    pub parameters: String,
}

impl ImportRequest {
    pub fn new<D, P>(domain_id: D, analysis: impl Into<Bytes>, parameters: P) -> Self
    where
        D: Into<String>,
        P: Into<String>,
    {
        Self {
            domain_id: domain_id.into(),
            analysis: analysis.into(),
            parameters: parameters.into(),
        }
    }
}

#[derive(Debug, Default)]
pub struct ImportReport {
    pub imported: Vec<CatalogEntry>,
    pub failures: Vec<(String, Error)>,
}

impl<S, L, A> CatalogService<S, L, A>
where
    S: CatalogStore,
    L: SchemaLoader,
    A: AccessFilter,
{
    /// Imports the schema file at `path` bound to `database_connection`. The
    /// file name becomes the domain id; `parameters` may override the data
    /// source and carry the import directives.
    pub async fn import_schema_file(
        &self,
        path: impl AsRef<Path>,
        database_connection: &str,
        parameters: &str,
    ) -> CatalogResult<CatalogEntry> {
        let path = path.as_ref();
        let domain_id = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let failed = |cause: ImportError| Error::Import(domain_id.clone(), cause);

        let mut params = Parameters::parse(parameters).map_err(|e| failed(e.into()))?;
        if !database_connection.is_empty() && params.get("DataSource").is_none() {
            params.insert("DataSource", database_connection);
        }
        let options = ImportOptions::from_parameters(params).map_err(|e| failed(e.into()))?;
        let analysis = tokio::fs::read(path).await.map_err(|e| failed(e.into()))?;
        self.import(Bytes::from(analysis), &domain_id, options).await
    }

    /// Imports a schema stream; `overwrite` and `xmlaEnabledFlag` are read
    /// from `parameters`.
    pub async fn import_schema(
        &self,
        analysis: Bytes,
        domain_id: &str,
        parameters: &str,
    ) -> CatalogResult<CatalogEntry> {
        let options = Parameters::parse(parameters)
            .and_then(ImportOptions::from_parameters)
            .map_err(|e| Error::Import(domain_id.to_string(), e.into()))?;
        self.import(analysis, domain_id, options).await
    }

    pub async fn import_schema_with(
        &self,
        analysis: Bytes,
        domain_id: &str,
        overwrite: bool,
        xmla_enabled: bool,
    ) -> CatalogResult<CatalogEntry> {
        let options = ImportOptions {
            overwrite,
            xmla_enabled,
            datasource: Parameters::new(),
        };
        self.import(analysis, domain_id, options).await
    }

    /// Imports every request in order. A failing request is recorded and the
    /// rest continue, except after a store failure, which aborts the batch.
    pub async fn import_all(
        &self,
        requests: Vec<ImportRequest>,
        cancel: &CancelToken,
    ) -> CatalogResult<ImportReport> {
        let mut report = ImportReport::default();
        for request in requests {
            if cancel.is_cancelled() {
                info!(imported = report.imported.len(), "bulk import cancelled");
                return Err(Error::Cancelled);
            }
            match self
                .import_schema(request.analysis, &request.domain_id, &request.parameters)
                .await
            {
                Ok(entry) => report.imported.push(entry),
                Err(e) if e.is_fatal() => {
                    warn!(domain = %request.domain_id, error = %e, "bulk import aborted");
                    return Err(e);
                }
                Err(e) => {
                    warn!(domain = %request.domain_id, error = %e, "import skipped");
                    report.failures.push((request.domain_id, e));
                }
            }
        }
        Ok(report)
    }

    /// Removes the catalog imported under `domain_id`, falling back to a
    /// catalog of that name.
    pub async fn remove_schema(&self, domain_id: &str) -> CatalogResult<CatalogEntry> {
        self.ensure_loaded().await?;
        let name = self
            .owner_of(domain_id)
            .await
            .ok_or_else(|| Error::NotFound(domain_id.to_string()))?;
        let _guard = self.write_guard(&name).await?;
        // removed or re-imported under another domain while waiting for the lock
        if self.owner_of(domain_id).await.as_deref() != Some(name.as_str()) {
            return Err(Error::NotFound(domain_id.to_string()));
        }
        self.store.delete(&name).await?;
        let removed = self.cache.remove(&name).await?;
        info!(domain = domain_id, catalog = %name, "schema removed");
        Ok(removed)
    }

    async fn owner_of(&self, domain_id: &str) -> Option<String> {
        let snapshot = self.cache.snapshot().await;
        snapshot
            .find_by_domain(domain_id)
            .or_else(|| snapshot.get(domain_id))
            .map(|entry| entry.name().to_string())
    }

    async fn import(
        &self,
        analysis: Bytes,
        domain_id: &str,
        options: ImportOptions,
    ) -> CatalogResult<CatalogEntry> {
        let schema = self.validate(analysis, domain_id, &options).await?;
        let name = schema.name().to_string();
        let datasource = DataSourceInfo::from_parameters(options.datasource);
        let entry = CatalogEntry::new(
            name.clone(),
            format!("{IMPORTED_DEFINITION_PREFIX}{name}"),
            datasource.to_string(),
        )
        .with_xmla_enabled(options.xmla_enabled)
        .with_domain_id(domain_id)
        .with_schema(Arc::new(schema));
        self.register(entry.clone(), options.overwrite, None).await?;
        info!(domain = domain_id, catalog = %name, overwrite = options.overwrite, "schema imported");
        Ok(entry)
    }

    async fn validate(
        &self,
        analysis: Bytes,
        domain_id: &str,
        options: &ImportOptions,
    ) -> CatalogResult<ParsedSchema> {
        let failed = |cause: ImportError| Error::Import(domain_id.to_string(), cause);
        let timeout = self.config.load_timeout();
        let source = SchemaSource::Stream(analysis);
        let schema = tokio::time::timeout(timeout, self.loader.load(&source, &options.datasource))
            .await
            .map_err(|_| failed(ImportError::Timeout(timeout)))?
            .map_err(|e| failed(e.into()))?;
        if schema.name().trim().is_empty() {
            return Err(failed(ImportError::Schema(SchemaLoadError::Malformed(
                domain_id.to_string(),
                "schema has no name".to_string(),
            ))));
        }
        Ok(schema)
    }
}
