use crate::params::ParamsError;
use crate::schema::SchemaLoadError;
use crate::storage::StoreError;
use std::time::Duration;
use thiserror::Error;

pub type CatalogResult<T> = Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("catalog {0} not found")]
    NotFound(String),
    #[error("catalog {0}: {1}")]
    Conflict(String, &'static str),
    #[error("session {0} may not access catalog {1}")]
    Forbidden(String, String),
    #[error("schema load error: {0}")]
    SchemaLoad(#[from] SchemaLoadError),
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("loading {0} timed out after {1:?}")]
    Timeout(String, Duration),
    #[error("operation cancelled")]
    Cancelled,
    #[error("import of {0} failed: {1}")]
    Import(String, ImportError),
}

/// Why an import was rejected before it reached the registry.
#[derive(Error, Debug)]
pub enum ImportError {
    #[error("{0}")]
    Parameters(#[from] ParamsError),
    #[error("{0}")]
    Schema(#[from] SchemaLoadError),
    #[error("schema validation timed out after {0:?}")]
    Timeout(Duration),
    #[error("io error: {0}")]
    IO(#[from] std::io::Error),
}

impl Error {
    /// Storage failures make further progress in a bulk operation unsafe.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::Store(_))
    }
}
