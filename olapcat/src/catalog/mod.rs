use crate::schema::ParsedSchema;
use std::sync::Arc;

pub mod cache;
pub mod datasource;
pub mod error;
pub mod index;

pub use cache::CatalogCache;
pub use datasource::DataSourceInfo;
pub use error::{CatalogResult, Error, ImportError};
pub use index::{CatalogIndex, Upserted};

/// A named, registered schema binding: schema definition plus data source.
///
/// `name` is the only unique key. Two entries may share a `definition` while
/// pointing at different data sources.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogEntry {
    name: String,
    definition: String,
    datasource_info: String,
    effective_datasource_info: String,
    xmla_enabled: bool,
    domain_id: Option<String>,
    schema: Option<Arc<ParsedSchema>>,
}

impl CatalogEntry {
    pub fn new<N, D, S>(name: N, definition: D, datasource_info: S) -> Self
    where
        N: Into<String>,
        D: Into<String>,
        S: Into<String>,
    {
        let datasource_info = datasource_info.into();
        let effective_datasource_info = datasource::resolve_effective(&datasource_info);
        let xmla_enabled = DataSourceInfo::parse(&datasource_info)
            .ok()
            .and_then(|info| info.xmla_enabled())
            .unwrap_or_default();
        Self {
            name: name.into(),
            definition: definition.into(),
            datasource_info,
            effective_datasource_info,
            xmla_enabled,
            domain_id: None,
            schema: None,
        }
    }

    /// Overrides the resolved descriptor, for callers that resolve data
    /// sources themselves.
    pub fn with_effective_datasource_info<T: Into<String>>(mut self, effective: T) -> Self {
        self.effective_datasource_info = effective.into();
        self
    }

    pub fn with_xmla_enabled(mut self, xmla_enabled: bool) -> Self {
        self.xmla_enabled = xmla_enabled;
        self
    }

    pub fn with_domain_id<T: Into<String>>(mut self, domain_id: T) -> Self {
        self.domain_id = Some(domain_id.into());
        self
    }

    pub fn with_schema(mut self, schema: Arc<ParsedSchema>) -> Self {
        self.schema = Some(schema);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn definition(&self) -> &str {
        &self.definition
    }

    pub fn datasource_info(&self) -> &str {
        &self.datasource_info
    }

    pub fn effective_datasource_info(&self) -> &str {
        &self.effective_datasource_info
    }

    pub fn xmla_enabled(&self) -> bool {
        self.xmla_enabled
    }

    pub fn domain_id(&self) -> Option<&str> {
        self.domain_id.as_deref()
    }

    pub fn schema(&self) -> Option<&Arc<ParsedSchema>> {
        self.schema.as_ref()
    }

    pub fn is_jndi(&self) -> bool {
        datasource::is_jndi(&self.effective_datasource_info)
    }

    /// Overwrites must match on definition and effective data source.
    pub fn same_identity(&self, other: &CatalogEntry) -> bool {
        self.definition == other.definition
            && self.effective_datasource_info == other.effective_datasource_info
    }

    pub(crate) fn take_schema(&mut self) -> Option<Arc<ParsedSchema>> {
        self.schema.take()
    }

    pub(crate) fn set_schema(&mut self, schema: Option<Arc<ParsedSchema>>) {
        self.schema = schema;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry() {
        let entry = CatalogEntry::new(
            "Sales",
            "solution:/sales.xml",
            "Provider=mondrian;DataSource=ds1;EnableXmla=true",
        );
        assert_eq!(entry.effective_datasource_info(), "Provider=mondrian;DataSource=ds1");
        assert!(entry.xmla_enabled());
        assert!(entry.is_jndi());
        assert!(entry.schema().is_none());

        let other = CatalogEntry::new("Other", "solution:/sales.xml", "Provider=mondrian;DataSource=ds1");
        assert!(entry.same_identity(&other));
        let moved = CatalogEntry::new("Sales", "solution:/sales.xml", "DataSource=ds2");
        assert!(!entry.same_identity(&moved));
    }
}
