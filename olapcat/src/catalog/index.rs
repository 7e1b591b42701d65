use crate::catalog::error::Error;
use crate::catalog::CatalogEntry;
use indexmap::{IndexMap, IndexSet};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upserted {
    Inserted,
    Replaced,
}

/// Name- and definition-keyed view over a set of catalog entries.
///
/// `by_name` is authoritative and keeps registration order. `by_definition`
/// lists, per definition, the names carrying it in the same order, so a
/// definition lookup resolves to the first-registered entry that is still live.
#[derive(Debug, Clone, Default)]
pub struct CatalogIndex {
    by_name: IndexMap<String, CatalogEntry>,
    by_definition: HashMap<String, IndexSet<String>>,
}

impl CatalogIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds an index from entries in store order. A repeated name replaces
    /// the earlier record.
    pub fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = CatalogEntry>,
    {
        let mut index = Self::new();
        for entry in entries {
            index.remove(entry.name()).ok();
            index.insert(entry);
        }
        index
    }

    pub fn get(&self, name: &str) -> Option<&CatalogEntry> {
        self.by_name.get(name)
    }

    pub fn get_by_definition(&self, definition: &str) -> Option<&CatalogEntry> {
        self.by_definition
            .get(definition)
            .and_then(|names| names.first())
            .and_then(|name| self.by_name.get(name))
    }

    /// Name first, then definition.
    pub fn resolve(&self, context: &str) -> Option<&CatalogEntry> {
        self.get(context)
            .or_else(|| self.get_by_definition(context))
    }

    pub fn find_by_domain(&self, domain_id: &str) -> Option<&CatalogEntry> {
        self.by_name
            .values()
            .find(|entry| entry.domain_id() == Some(domain_id))
    }

    /// Checks whether `entry` may be registered, returning the entry it would
    /// replace.
    pub fn check_upsert(
        &self,
        entry: &CatalogEntry,
        overwrite: bool,
    ) -> Result<Option<&CatalogEntry>, Error> {
        match self.by_name.get(entry.name()) {
            None => Ok(None),
            Some(_) if !overwrite => Err(Error::Conflict(
                entry.name().to_string(),
                "already registered",
            )),
            Some(existing) if !existing.same_identity(entry) => Err(Error::Conflict(
                entry.name().to_string(),
                "definition or data source differs from the registered catalog",
            )),
            Some(existing) => Ok(Some(existing)),
        }
    }

    pub fn upsert(&mut self, entry: CatalogEntry, overwrite: bool) -> Result<Upserted, Error> {
        if self.check_upsert(&entry, overwrite)?.is_some() {
            // identity matched, so the definition mapping is unchanged
            self.by_name.insert(entry.name().to_string(), entry);
            Ok(Upserted::Replaced)
        } else {
            self.insert(entry);
            Ok(Upserted::Inserted)
        }
    }

    pub fn remove(&mut self, name: &str) -> Result<CatalogEntry, Error> {
        let entry = self
            .by_name
            .shift_remove(name)
            .ok_or_else(|| Error::NotFound(name.to_string()))?;
        if let Some(names) = self.by_definition.get_mut(entry.definition()) {
            names.shift_remove(name);
            if names.is_empty() {
                self.by_definition.remove(entry.definition());
            }
        }
        Ok(entry)
    }

    pub(crate) fn get_mut(&mut self, name: &str) -> Option<&mut CatalogEntry> {
        self.by_name.get_mut(name)
    }

    pub fn entries(&self) -> impl Iterator<Item = &CatalogEntry> {
        self.by_name.values()
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    fn insert(&mut self, entry: CatalogEntry) {
        self.by_definition
            .entry(entry.definition().to_string())
            .or_default()
            .insert(entry.name().to_string());
        self.by_name.insert(entry.name().to_string(), entry);
    }
}
