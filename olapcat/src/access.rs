//! Per-session visibility decisions.
//!
//! The decision engine itself is external; the registry consults it through
//! [`AccessFilter`] on every listing and mutation.

use crate::catalog::CatalogEntry;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    name: String,
    roles: Vec<String>,
}

impl Session {
    pub fn new<T: Into<String>>(name: T) -> Self {
        Self {
            name: name.into(),
            roles: Vec::new(),
        }
    }

    pub fn with_role<T: Into<String>>(mut self, role: T) -> Self {
        self.roles.push(role.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn roles(&self) -> &[String] {
        self.roles.as_slice()
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}

pub trait AccessFilter: Send + Sync {
    fn can_view(&self, session: &Session, entry: &CatalogEntry) -> bool;

    fn can_mutate(&self, session: &Session, entry: &CatalogEntry) -> bool;
}

/// Grants everything. For trusted, in-process callers.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl AccessFilter for AllowAll {
    fn can_view(&self, _session: &Session, _entry: &CatalogEntry) -> bool {
        true
    }

    fn can_mutate(&self, _session: &Session, _entry: &CatalogEntry) -> bool {
        true
    }
}

/// Adapts a pair of closures into an [`AccessFilter`].
pub struct FnAccessFilter<V, M> {
    view: V,
    mutate: M,
}

impl<V, M> FnAccessFilter<V, M>
where
    V: Fn(&Session, &CatalogEntry) -> bool + Send + Sync,
    M: Fn(&Session, &CatalogEntry) -> bool + Send + Sync,
{
    pub fn new(view: V, mutate: M) -> Self {
        Self { view, mutate }
    }
}

impl<V, M> AccessFilter for FnAccessFilter<V, M>
where
    V: Fn(&Session, &CatalogEntry) -> bool + Send + Sync,
    M: Fn(&Session, &CatalogEntry) -> bool + Send + Sync,
{
    fn can_view(&self, session: &Session, entry: &CatalogEntry) -> bool {
        (self.view)(session, entry)
    }

    fn can_mutate(&self, session: &Session, entry: &CatalogEntry) -> bool {
        (self.mutate)(session, entry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fn_filter() {
        let filter = FnAccessFilter::new(
            |session: &Session, entry: &CatalogEntry| {
                session.has_role("admin") || entry.name().starts_with("public_")
            },
            |session: &Session, _: &CatalogEntry| session.has_role("admin"),
        );
        let admin = Session::new("joe").with_role("admin");
        let guest = Session::new("suzy");
        let public = CatalogEntry::new("public_sales", "solution:/sales.xml", "DataSource=ds1");
        let private = CatalogEntry::new("hr", "solution:/hr.xml", "DataSource=hr");
        assert!(filter.can_view(&guest, &public));
        assert!(!filter.can_view(&guest, &private));
        assert!(filter.can_view(&admin, &private));
        assert!(!filter.can_mutate(&guest, &public));
        assert!(filter.can_mutate(&admin, &public));
        assert!(AllowAll.can_mutate(&guest, &private));
    }
}
