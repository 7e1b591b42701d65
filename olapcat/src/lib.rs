//! A registry of analytical schema catalogs shared by many sessions.
//!
//! [`CatalogService`] is the entry point. It keeps an in-memory index of
//! catalogs in front of a durable [`CatalogStore`], consults a
//! [`SchemaLoader`] to parse schemas and an [`AccessFilter`] to decide what
//! each session may see or change.

pub mod access;
pub mod catalog;
pub mod config;
pub mod encoding;
pub mod params;
pub mod schema;
pub mod service;
pub mod storage;

#[cfg(test)]
pub(crate) mod testing;

pub use access::{AccessFilter, AllowAll, FnAccessFilter, Session};
pub use catalog::{CatalogEntry, CatalogResult, DataSourceInfo, Error};
pub use config::CatalogConfig;
pub use params::Parameters;
pub use schema::{ParsedSchema, SchemaLoadError, SchemaLoader, SchemaSource};
pub use service::{CancelToken, CatalogService, ImportReport, ImportRequest, ReloadReport};
pub use storage::{CatalogStore, FileStore, MemoryStore, StoreError, WriteMode};
