use std::path::{Path, PathBuf};

/// Holds a configurable base directory for all daemon file paths.
///
/// Use `ConfigPaths::new()` for production (resolves `~/.dfactory`),
/// or `ConfigPaths::with_base()` for testing with an isolated directory.
#[derive(Debug, Clone)]
pub struct ConfigPaths {
    base: PathBuf,
}

impl ConfigPaths {
    /// Create paths rooted at `~/.dfactory`. Returns an error if the home
    /// directory cannot be determined.
    pub fn new() -> anyhow::Result<Self> {
        let home = dirs::home_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine home directory"))?;
        Ok(Self {
            base: home.join(".dfactory"),
        })
    }

    pub fn with_base(base: PathBuf) -> Self {
        Self { base }
    }

    pub fn config_dir(&self) -> &Path {
        &self.base
    }

    pub fn config_path(&self) -> PathBuf {
        self.base.join("config.toml")
    }

    pub fn pid_path(&self) -> PathBuf {
        self.base.join("dfactoryd.pid")
    }

    /// Default root under which every app gets its own workspace directory.
    pub fn apps_dir(&self) -> PathBuf {
        self.base.join("dapps")
    }

    /// Ensure the config directory exists, creating it if necessary.
    pub fn ensure_config_dir(&self) -> anyhow::Result<PathBuf> {
        if !self.base.exists() {
            std::fs::create_dir_all(&self.base)?;
        }
        Ok(self.base.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_accessors_return_expected_filenames() {
        let base = PathBuf::from("/base");
        let paths = ConfigPaths::with_base(base.clone());

        assert_eq!(paths.config_dir(), base.as_path());
        assert_eq!(paths.config_path(), base.join("config.toml"));
        assert_eq!(paths.pid_path(), base.join("dfactoryd.pid"));
        assert_eq!(paths.apps_dir(), base.join("dapps"));
    }

    #[test]
    fn ensure_config_dir_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("nested").join("config");
        let paths = ConfigPaths::with_base(base.clone());

        assert!(!base.exists());
        let result = paths.ensure_config_dir().unwrap();
        assert_eq!(result, base);
        assert!(base.exists());
    }

    #[test]
    fn ensure_config_dir_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let paths = ConfigPaths::with_base(dir.path().join("config"));

        paths.ensure_config_dir().unwrap();
        paths.ensure_config_dir().unwrap();
    }
}
