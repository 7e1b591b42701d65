use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Upper bound on a single schema load, in milliseconds.
    pub load_timeout_ms: u64,
    /// Schemas parsed concurrently during a reload.
    pub reload_parallelism: usize,
    /// Parse every schema during a reload instead of on first use.
    pub eager_reload: bool,
    /// Number of per-name write locks.
    pub lock_stripes: usize,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            load_timeout_ms: 30_000,
            reload_parallelism: 4,
            eager_reload: true,
            lock_stripes: 16,
        }
    }
}

impl CatalogConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load_timeout(&self) -> Duration {
        Duration::from_millis(self.load_timeout_ms)
    }

    pub fn with_load_timeout(mut self, load_timeout: Duration) -> Self {
        self.load_timeout_ms = load_timeout.as_millis().try_into().unwrap_or(u64::MAX);
        self
    }

    pub fn with_reload_parallelism(mut self, reload_parallelism: usize) -> Self {
        self.reload_parallelism = reload_parallelism.max(1);
        self
    }

    pub fn with_eager_reload(mut self, eager_reload: bool) -> Self {
        self.eager_reload = eager_reload;
        self
    }

    pub fn with_lock_stripes(mut self, lock_stripes: usize) -> Self {
        self.lock_stripes = lock_stripes.max(1);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserialize_fills_defaults() {
        let config: CatalogConfig =
            serde_json::from_str(r#"{"load_timeout_ms": 1500, "eager_reload": false}"#).unwrap();
        assert_eq!(config.load_timeout(), Duration::from_millis(1500));
        assert!(!config.eager_reload);
        assert_eq!(config.reload_parallelism, 4);
        assert_eq!(config.lock_stripes, 16);

        let config: CatalogConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, CatalogConfig::default());
    }

    #[test]
    fn serialize() {
        let config = CatalogConfig::new()
            .with_load_timeout(Duration::from_secs(2))
            .with_lock_stripes(0);
        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["load_timeout_ms"], 2000);
        assert_eq!(json["lock_stripes"], 1);
        assert_eq!(serde_json::from_value::<CatalogConfig>(json).unwrap(), config);
    }
}
