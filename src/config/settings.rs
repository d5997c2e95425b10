//! Defaults file
//!
//! Optional TOML file supplying defaults that the command line overrides.
//! Sizes are written the same way as on the command line (`"128MB"`).

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use super::{BenchmarkConfig, BufferFill, CacheDropPolicy};
use crate::util::units::parse_size;
use crate::{BenchError, Result, APP_NAME, CONFIG_FILE};

/// Contents of `monkeytest.toml`; every key is optional
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub file: Option<PathBuf>,
    pub size: Option<String>,
    pub write_block_size: Option<String>,
    pub read_block_size: Option<String>,
    pub cache_drop: Option<CacheDropPolicy>,
    pub fill: Option<BufferFill>,
}

impl Settings {
    /// Load settings from `path`, or from the standard location when `None`
    ///
    /// A missing file at the standard location yields empty settings. An
    /// explicitly requested file must exist.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let (path, explicit) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => match Self::config_file_path() {
                Ok(p) => (p, false),
                Err(_) => return Ok(Self::default()),
            },
        };

        if !path.exists() {
            if explicit {
                return Err(BenchError::ConfigError(format!(
                    "Config file does not exist: {}",
                    path.display()
                )));
            }
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path).map_err(|e| {
            BenchError::ConfigError(format!("Failed to read config file {}: {}", path.display(), e))
        })?;

        let settings: Self = toml::from_str(&content).map_err(|e| {
            BenchError::ConfigError(format!("Failed to parse config file {}: {}", path.display(), e))
        })?;

        tracing::debug!(path = %path.display(), "Loaded defaults file");
        Ok(settings)
    }

    /// Standard defaults file location
    /// Uses $CONFIG_HOME/monkeytest/monkeytest.toml
    pub fn config_file_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().ok_or_else(|| {
            BenchError::ConfigError("Unable to determine config directory".to_string())
        })?;

        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Overlay these settings on `config`
    pub fn apply(&self, mut config: BenchmarkConfig) -> Result<BenchmarkConfig> {
        if let Some(file) = &self.file {
            config.target_path = file.clone();
        }
        if let Some(size) = &self.size {
            config.total_size = parse_size(size)?;
        }
        if let Some(size) = &self.write_block_size {
            config.write_block_size = parse_size(size)?;
        }
        if let Some(size) = &self.read_block_size {
            config.read_block_size = parse_size(size)?;
        }
        if let Some(policy) = self.cache_drop {
            config.cache_drop = policy;
        }
        if let Some(fill) = self.fill {
            config.fill = fill;
        }
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| BenchError::ConfigError(format!("Failed to serialize settings: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_toml_round_trip() {
        let settings = Settings {
            file: Some(PathBuf::from("/var/tmp/probe")),
            size: Some("64MB".to_string()),
            write_block_size: Some("256KB".to_string()),
            read_block_size: Some("4KB".to_string()),
            cache_drop: Some(CacheDropPolicy::Skip),
            fill: Some(BufferFill::Zero),
        };
        let text = settings.to_toml().unwrap();
        assert!(text.contains("cache_drop = \"skip\""));
        let parsed: Settings = toml::from_str(&text).unwrap();
        assert_eq!(parsed, settings);
    }

    #[test]
    fn test_apply_overrides_defaults() {
        let settings: Settings = toml::from_str(
            r#"
            size = "1MB"
            read_block_size = "64 kb"
            cache_drop = "required"
            "#,
        )
        .unwrap();
        let config = settings.apply(BenchmarkConfig::default()).unwrap();
        assert_eq!(config.total_size, 1024 * 1024);
        assert_eq!(config.read_block_size, 64 * 1024);
        assert_eq!(config.write_block_size, 1024 * 1024);
        assert_eq!(config.cache_drop, CacheDropPolicy::Required);
    }

    #[test]
    fn test_apply_rejects_bad_size() {
        let settings = Settings {
            size: Some("lots".to_string()),
            ..Settings::default()
        };
        assert!(matches!(
            settings.apply(BenchmarkConfig::default()),
            Err(BenchError::ConfigError(_))
        ));
    }

    #[test]
    fn test_load_explicit_missing_file() {
        let dir = tempdir().unwrap();
        let result = Settings::load(Some(&dir.path().join("absent.toml")));
        assert!(matches!(result, Err(BenchError::ConfigError(_))));
    }

    #[test]
    fn test_load_rejects_unknown_keys() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("monkeytest.toml");
        fs::write(&path, "threads = 4\n").unwrap();
        assert!(Settings::load(Some(&path)).is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("monkeytest.toml");
        fs::write(&path, "size = \"2MB\"\nfill = \"zero\"\n").unwrap();
        let settings = Settings::load(Some(&path)).unwrap();
        assert_eq!(settings.size.as_deref(), Some("2MB"));
        assert_eq!(settings.fill, Some(BufferFill::Zero));
    }

    #[test]
    fn test_config_file_path() {
        if let Ok(path) = Settings::config_file_path() {
            assert!(path.ends_with("monkeytest/monkeytest.toml"));
        }
    }
}
