use serde::{Deserialize, Serialize};
use std::env;
use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;
use std::time::Duration;

use crate::paths::ConfigPaths;

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::LOCALHOST)
}

fn default_port() -> u16 {
    env::var("PORT")
        .ok()
        .and_then(|val| val.trim().parse().ok())
        .unwrap_or(3000)
}

fn default_stop_grace_ms() -> u64 {
    3000
}

fn default_allowed_origins() -> Vec<String> {
    match env::var("DFACTORY_ALLOWED_ORIGINS") {
        Ok(val) => val
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
        Err(_) => Vec::new(),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FactoryConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Root for app workspaces. Falls back to `<config dir>/dapps`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub apps_dir: Option<PathBuf>,
    /// How long a stop waits for the root process before escalating to SIGKILL.
    #[serde(default = "default_stop_grace_ms")]
    pub stop_grace_ms: u64,
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: Vec<String>,
    #[serde(skip)]
    paths: Option<ConfigPaths>,
}

impl Default for FactoryConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            apps_dir: None,
            stop_grace_ms: default_stop_grace_ms(),
            allowed_origins: default_allowed_origins(),
            paths: None,
        }
    }
}

impl FactoryConfig {
    /// Returns the `ConfigPaths` for this config. If paths haven't been set,
    /// creates the default paths (may fail if `$HOME` is unset).
    pub fn paths(&self) -> anyhow::Result<ConfigPaths> {
        match &self.paths {
            Some(p) => Ok(p.clone()),
            None => ConfigPaths::new(),
        }
    }

    /// Load config from the default location (`~/.dfactory/config.toml`).
    pub fn load() -> anyhow::Result<Self> {
        let paths = ConfigPaths::new()?;
        Self::load_from(&paths)
    }

    pub fn load_from(paths: &ConfigPaths) -> anyhow::Result<Self> {
        let config_file = paths.config_path();
        let mut config = if config_file.exists() {
            let content = std::fs::read_to_string(&config_file)?;
            let config: FactoryConfig = toml::from_str(&content)?;
            config
        } else {
            Self::default()
        };
        config.paths = Some(paths.clone());
        config.validate()?;
        Ok(config)
    }

    /// Validate config values. Called automatically by `load` / `load_from`.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.port == 0 {
            anyhow::bail!("port must not be 0");
        }
        if self.stop_grace_ms == 0 {
            anyhow::bail!("stop_grace_ms must be greater than 0");
        }
        if let Some(dir) = &self.apps_dir {
            if dir.as_os_str().is_empty() {
                anyhow::bail!("apps_dir must not be empty when set");
            }
        }
        Ok(())
    }

    pub fn apps_dir(&self) -> anyhow::Result<PathBuf> {
        match &self.apps_dir {
            Some(dir) => Ok(dir.clone()),
            None => Ok(self.paths()?.apps_dir()),
        }
    }

    pub fn stop_grace(&self) -> Duration {
        Duration::from_millis(self.stop_grace_ms)
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_paths() -> (tempfile::TempDir, ConfigPaths) {
        let dir = tempfile::tempdir().unwrap();
        let paths = ConfigPaths::with_base(dir.path().to_path_buf());
        (dir, paths)
    }

    #[test]
    fn default_produces_expected_values() {
        let config = FactoryConfig::default();
        assert_eq!(config.host, IpAddr::V4(Ipv4Addr::LOCALHOST));
        assert_eq!(config.stop_grace_ms, 3000);
        assert!(config.apps_dir.is_none());
        if env::var("PORT").is_err() {
            assert_eq!(config.port, 3000);
        }
    }

    #[test]
    fn bind_addr_formats_correctly() {
        let mut config = FactoryConfig::default();
        config.port = 8080;
        config.host = IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0));
        assert_eq!(config.bind_addr(), "0.0.0.0:8080");
    }

    #[test]
    fn load_with_no_file_returns_default() {
        let (_dir, paths) = test_paths();
        let config = FactoryConfig::load_from(&paths).unwrap();
        assert_eq!(config.stop_grace_ms, 3000);
        assert_eq!(config.apps_dir().unwrap(), paths.apps_dir());
    }

    #[test]
    fn load_with_valid_toml() {
        let (_dir, paths) = test_paths();
        std::fs::write(
            paths.config_path(),
            "port = 8888\napps_dir = \"/srv/dapps\"\nstop_grace_ms = 500\n",
        )
        .unwrap();
        let config = FactoryConfig::load_from(&paths).unwrap();
        assert_eq!(config.port, 8888);
        assert_eq!(config.apps_dir().unwrap(), PathBuf::from("/srv/dapps"));
        assert_eq!(config.stop_grace(), Duration::from_millis(500));
    }

    #[test]
    fn load_with_invalid_toml_returns_error() {
        let (_dir, paths) = test_paths();
        std::fs::write(paths.config_path(), "not valid {{{{ toml").unwrap();
        assert!(FactoryConfig::load_from(&paths).is_err());
    }

    #[test]
    fn validate_rejects_port_zero() {
        let mut config = FactoryConfig::default();
        config.port = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_grace() {
        let mut config = FactoryConfig::default();
        config.stop_grace_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_empty_apps_dir() {
        let mut config = FactoryConfig::default();
        config.apps_dir = Some(PathBuf::new());
        assert!(config.validate().is_err());
    }

    #[test]
    fn toml_roundtrip() {
        let config = FactoryConfig::default();
        let serialized = toml::to_string(&config).unwrap();
        let deserialized: FactoryConfig = toml::from_str(&serialized).unwrap();
        assert_eq!(deserialized.port, config.port);
        assert_eq!(deserialized.host, config.host);
        assert_eq!(deserialized.stop_grace_ms, config.stop_grace_ms);
    }
}
