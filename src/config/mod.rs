use std::fs;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::core::models::{KeyDerivationParams, KEY_COUNT};
use crate::core::scan_service::ScanParams;
use crate::error::{Result, SpoolError};
use crate::storage::format::{MAX_SECTORS, SPOOL_SECTOR};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScannerConfig {
    /// Sector holding the spool record.
    pub sector: u8,
    /// Number of candidate keys tried per tag.
    pub key_count: usize,
    /// Substring of the PC/SC reader name to use; first reader when unset.
    pub reader: Option<String>,
    /// Default `tracing` filter, overridden by `RUST_LOG`.
    pub log_filter: String,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            sector: SPOOL_SECTOR,
            key_count: KEY_COUNT,
            reader: None,
            log_filter: "warn".to_string(),
        }
    }
}

impl ScannerConfig {
    pub fn scan_params(&self) -> Result<ScanParams> {
        self.validate()?;
        Ok(ScanParams {
            sector: self.sector,
            derivation: KeyDerivationParams::with_key_count(self.key_count),
        })
    }

    pub fn validate(&self) -> Result<()> {
        if self.sector >= MAX_SECTORS {
            return Err(SpoolError::Config(format!(
                "sector {} is outside the tag (max {})",
                self.sector,
                MAX_SECTORS - 1
            )));
        }
        if self.key_count == 0 {
            return Err(SpoolError::Config("key_count must be positive".to_string()));
        }
        Ok(())
    }

    pub fn load() -> Result<Self> {
        let path = config_file_path();
        if path.exists() {
            let content = fs::read_to_string(&path)?;
            let config: ScannerConfig = toml::from_str(&content)?;
            Ok(config)
        } else {
            let config = ScannerConfig::default();
            config.save()?;
            Ok(config)
        }
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&config_file_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = fs::read_to_string(path)?;
            let config: ScannerConfig = toml::from_str(&content)?;
            Ok(config)
        } else {
            Err(SpoolError::Config(format!(
                "Config file not found: {}",
                path.display()
            )))
        }
    }
}

fn config_file_path() -> PathBuf {
    if let Some(dirs) = ProjectDirs::from("", "", "spoolscan") {
        dirs.config_dir().join("config.toml")
    } else {
        PathBuf::from("spoolscan.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_config_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let config = ScannerConfig {
            sector: 2,
            key_count: 6,
            reader: Some("ACR122".to_string()),
            log_filter: "spoolscan=debug".to_string(),
        };

        config.save_to(&path).unwrap();
        let loaded = ScannerConfig::load_from(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_default_config() {
        let config = ScannerConfig::default();
        assert_eq!(config.sector, 1);
        assert_eq!(config.key_count, 16);
        assert!(config.reader.is_none());
        assert_eq!(config.log_filter, "warn");
    }

    #[test]
    fn test_missing_fields_take_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "key_count = 6\n").unwrap();

        let loaded = ScannerConfig::load_from(&path).unwrap();
        assert_eq!(loaded.key_count, 6);
        assert_eq!(loaded.sector, 1);
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let dir = TempDir::new().unwrap();
        let result = ScannerConfig::load_from(&dir.path().join("absent.toml"));
        assert!(matches!(result, Err(SpoolError::Config(_))));
    }

    #[test]
    fn test_scan_params_from_config() {
        let params = ScannerConfig::default().scan_params().unwrap();
        assert_eq!(params, ScanParams::default());

        let bad = ScannerConfig {
            key_count: 0,
            ..ScannerConfig::default()
        };
        assert!(matches!(bad.scan_params(), Err(SpoolError::Config(_))));

        let bad = ScannerConfig {
            sector: 40,
            ..ScannerConfig::default()
        };
        assert!(bad.validate().is_err());
    }
}
