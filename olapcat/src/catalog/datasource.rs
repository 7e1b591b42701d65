use crate::params::{Parameters, ParamsError};
use std::fmt;

pub const DATASOURCE_KEY: &str = "DataSource";
pub const JDBC_KEY: &str = "Jdbc";
pub const ENABLE_XMLA_KEY: &str = "EnableXmla";

/// Keys that steer registration and never reach the effective descriptor.
const DIRECTIVE_KEYS: [&str; 3] = [ENABLE_XMLA_KEY, "overwrite", "xmlaEnabledFlag"];

/// A connection descriptor such as `Provider=mondrian;DataSource=sales`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DataSourceInfo {
    params: Parameters,
}

impl DataSourceInfo {
    pub fn parse(raw: &str) -> Result<Self, ParamsError> {
        Ok(Self {
            params: Parameters::parse(raw)?,
        })
    }

    /// A descriptor resolved through a directory lookup by `name`.
    pub fn jndi<T: Into<String>>(name: T) -> Self {
        let mut params = Parameters::new();
        params.insert(DATASOURCE_KEY, name);
        Self { params }
    }

    pub fn from_parameters(params: Parameters) -> Self {
        Self { params }
    }

    pub fn parameters(&self) -> &Parameters {
        &self.params
    }

    pub fn jndi_name(&self) -> Option<&str> {
        self.params.get(DATASOURCE_KEY)
    }

    /// JNDI-based: named through `DataSource` with no inline `Jdbc` connection.
    pub fn is_jndi(&self) -> bool {
        self.jndi_name().is_some_and(|name| !name.is_empty()) && !self.params.contains(JDBC_KEY)
    }

    pub fn xmla_enabled(&self) -> Option<bool> {
        self.params.flag(ENABLE_XMLA_KEY)
    }

    /// The resolved form used for identity comparisons: directives dropped and
    /// the data source key spelled canonically.
    pub fn effective(&self) -> String {
        let mut effective = Parameters::new();
        for (key, value) in self.params.iter() {
            if DIRECTIVE_KEYS.iter().any(|d| d.eq_ignore_ascii_case(key)) {
                continue;
            }
            if key.eq_ignore_ascii_case(DATASOURCE_KEY) {
                effective.insert(DATASOURCE_KEY, value);
            } else {
                effective.insert(key, value);
            }
        }
        effective.to_string()
    }
}

impl fmt::Display for DataSourceInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.params, f)
    }
}

/// Resolves a raw descriptor, falling back to the trimmed text when it does
/// not parse as `key=value` pairs.
pub fn resolve_effective(raw: &str) -> String {
    DataSourceInfo::parse(raw)
        .map(|info| info.effective())
        .unwrap_or_else(|_| raw.trim().to_string())
}

pub fn is_jndi(effective: &str) -> bool {
    DataSourceInfo::parse(effective)
        .map(|info| info.is_jndi())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jndi() {
        assert!(DataSourceInfo::jndi("sales").is_jndi());
        assert!(DataSourceInfo::parse("Provider=mondrian;datasource=sales")
            .unwrap()
            .is_jndi());
        assert!(!DataSourceInfo::parse("Provider=mondrian;Jdbc=jdbc:h2:mem;DataSource=x")
            .unwrap()
            .is_jndi());
        assert!(!DataSourceInfo::parse("Provider=mondrian").unwrap().is_jndi());
        assert!(!is_jndi("not a descriptor"));
    }

    #[test]
    fn effective() {
        let info =
            DataSourceInfo::parse("Provider=mondrian; datasource=sales; EnableXmla=true").unwrap();
        assert_eq!(info.xmla_enabled(), Some(true));
        assert_eq!(info.effective(), "Provider=mondrian;DataSource=sales");
        assert_eq!(resolve_effective("  ds1 "), "ds1");
    }
}
