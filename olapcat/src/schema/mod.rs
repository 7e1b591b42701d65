//! Parsed analytical schemas and the loader seam that produces them.
//!
//! Parsing the schema language itself lives outside this crate; the registry
//! only needs something implementing [`SchemaLoader`].

use crate::params::Parameters;
use bytes::Bytes;
use std::fmt;
use std::future::Future;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SchemaLoadError {
    #[error("schema {0} is malformed: {1}")]
    Malformed(String, String),
    #[error("schema {0} is unreadable: {1}")]
    Unreadable(String, String),
    #[error("io error: {0}")]
    IO(#[from] std::io::Error),
}

/// Where a schema definition comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaSource {
    Location(String),
    Stream(Bytes),
}

impl fmt::Display for SchemaSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaSource::Location(location) => f.write_str(location),
            SchemaSource::Stream(bytes) => write!(f, "<stream of {} bytes>", bytes.len()),
        }
    }
}

/// The structure of an analytical model. Immutable once built; catalog entries
/// share it read-only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedSchema {
    name: String,
    cubes: Vec<String>,
    roles: Vec<String>,
}

impl ParsedSchema {
    pub fn new<T: Into<String>>(name: T) -> Self {
        Self {
            name: name.into(),
            cubes: Vec::new(),
            roles: Vec::new(),
        }
    }

    pub fn with_cube<T: Into<String>>(mut self, cube: T) -> Self {
        self.cubes.push(cube.into());
        self
    }

    pub fn with_role<T: Into<String>>(mut self, role: T) -> Self {
        self.roles.push(role.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn cubes(&self) -> &[String] {
        self.cubes.as_slice()
    }

    pub fn roles(&self) -> &[String] {
        self.roles.as_slice()
    }
}

pub trait SchemaLoader: Send + Sync {
    fn load(
        &self,
        source: &SchemaSource,
        parameters: &Parameters,
    ) -> impl Future<Output = Result<ParsedSchema, SchemaLoadError>> + Send;
}
