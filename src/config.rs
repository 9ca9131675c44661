use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

use crate::constants::{
    DEFAULT_LAYER_TIMEOUT_SECS, DEFAULT_MUNICIPIOS_TTL_SECS, DEFAULT_PORT, DEFAULT_SERVICE_URL,
};
use crate::error::{CalendarError, Result};

pub const CONFIG_PATH_ENV: &str = "SUPPLY_CALENDAR_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "config.toml";

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub service: ServiceConfig,
    pub server: ServerConfig,
    pub cache: CacheConfig,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServiceConfig {
    /// MapServer root; layer ids are appended to it
    pub base_url: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct CacheConfig {
    pub municipios_ttl_secs: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self { base_url: DEFAULT_SERVICE_URL.to_string(), timeout_secs: DEFAULT_LAYER_TIMEOUT_SECS }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { port: DEFAULT_PORT }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { municipios_ttl_secs: DEFAULT_MUNICIPIOS_TTL_SECS }
    }
}

impl Config {
    /// Loads `config.toml` (or `$SUPPLY_CALENDAR_CONFIG`), then applies
    /// environment overrides. A missing default file means defaults.
    pub fn load() -> Result<Self> {
        let explicit = std::env::var(CONFIG_PATH_ENV).ok();
        let path = explicit.clone().unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());

        let mut config = if Path::new(&path).exists() {
            Self::from_file(&path)?
        } else if explicit.is_some() {
            return Err(CalendarError::Config(format!("Config file '{path}' not found")));
        } else {
            debug!("no config file, using defaults");
            Config::default()
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            CalendarError::Config(format!("Failed to read config file '{}': {}", path.display(), e))
        })?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Overrides from `FEATURE_SERVICE_URL`, `PORT` and `LAYER_TIMEOUT_SECS`.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(url) = lookup("FEATURE_SERVICE_URL").filter(|v| !v.trim().is_empty()) {
            self.service.base_url = url.trim().to_string();
        }
        if let Some(port) = lookup("PORT") {
            self.server.port = port
                .trim()
                .parse()
                .map_err(|_| CalendarError::Config(format!("Invalid PORT: {port}")))?;
        }
        if let Some(secs) = lookup("LAYER_TIMEOUT_SECS") {
            self.service.timeout_secs = secs
                .trim()
                .parse()
                .map_err(|_| CalendarError::Config(format!("Invalid LAYER_TIMEOUT_SECS: {secs}")))?;
        }
        self.validate()
    }

    fn validate(&self) -> Result<()> {
        if !self.service.base_url.starts_with("http://") && !self.service.base_url.starts_with("https://") {
            return Err(CalendarError::Config(format!(
                "service.base_url must be an http(s) URL, got '{}'",
                self.service.base_url
            )));
        }
        if self.service.timeout_secs == 0 {
            return Err(CalendarError::Config("service.timeout_secs must be positive".into()));
        }
        Ok(())
    }

    pub fn layer_timeout(&self) -> Duration {
        Duration::from_secs(self.service.timeout_secs)
    }

    pub fn municipios_ttl(&self) -> Duration {
        Duration::from_secs(self.cache.municipios_ttl_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn defaults_point_at_public_service() {
        let c = Config::default();
        assert_eq!(c.service.base_url, DEFAULT_SERVICE_URL);
        assert_eq!(c.layer_timeout(), Duration::from_secs(8));
        assert_eq!(c.municipios_ttl(), Duration::from_secs(1800));
        assert_eq!(c.server.port, 3000);
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[service]\ntimeout_secs = 3\n\n[server]\nport = 8080").unwrap();
        let c = Config::from_file(file.path()).unwrap();
        assert_eq!(c.service.timeout_secs, 3);
        assert_eq!(c.service.base_url, DEFAULT_SERVICE_URL);
        assert_eq!(c.server.port, 8080);
        assert_eq!(c.cache.municipios_ttl_secs, 1800);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[service\nport = ").unwrap();
        assert!(matches!(Config::from_file(file.path()), Err(CalendarError::Toml(_))));
    }

    #[test]
    fn env_overrides() {
        let env: HashMap<&str, &str> =
            [("FEATURE_SERVICE_URL", "http://localhost:9000/MapServer"), ("PORT", "4000")].into();
        let mut c = Config::default();
        c.apply_env(|k| env.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(c.service.base_url, "http://localhost:9000/MapServer");
        assert_eq!(c.server.port, 4000);

        let mut c = Config::default();
        assert!(c.apply_env(|k| (k == "PORT").then(|| "eighty".to_string())).is_err());
        let mut c = Config::default();
        assert!(c.apply_env(|k| (k == "LAYER_TIMEOUT_SECS").then(|| "0".to_string())).is_err());
    }
}
