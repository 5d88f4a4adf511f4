//! Application configuration
//!
//! Configuration is loaded from:
//! 1. Default values
//! 2. Config file (~/.config/imager/config.toml)
//! 3. Environment variables (IMAGER_* prefix)
//!
//! Environment variables take precedence over config file values.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

/// Environment variable prefix
const ENV_PREFIX: &str = "IMAGER";

/// Default OCR timeout
const DEFAULT_OCR_TIMEOUT_SECS: u64 = 60;

/// Default Tesseract language
const DEFAULT_OCR_LANGUAGE: &str = "eng";

/// Where the history blob is kept
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// One file per key in `{data_dir}/history`
    #[default]
    File,
    /// A key-value table in `{data_dir}/imager.db`
    Sqlite,
}

impl fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageBackend::File => write!(f, "file"),
            StorageBackend::Sqlite => write!(f, "sqlite"),
        }
    }
}

impl FromStr for StorageBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "file" => Ok(StorageBackend::File),
            "sqlite" => Ok(StorageBackend::Sqlite),
            other => bail!("Unknown storage backend '{}'. Use 'file' or 'sqlite'.", other),
        }
    }
}

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory for data storage (history, SQLite db, logs)
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Backend used to persist history
    #[serde(default)]
    pub storage_backend: StorageBackend,

    /// Upper bound for a single OCR call, in seconds
    #[serde(default = "default_ocr_timeout_secs")]
    pub ocr_timeout_secs: u64,

    /// Path to the tesseract binary (defaults to `tesseract` on PATH)
    #[serde(default)]
    pub tesseract_path: Option<PathBuf>,

    /// Tesseract language code(s), e.g. `eng` or `eng+kor`
    #[serde(default = "default_ocr_language")]
    pub ocr_language: String,

    /// Log file path (defaults to {data_dir}/debug.log)
    #[serde(default)]
    pub log_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            storage_backend: StorageBackend::default(),
            ocr_timeout_secs: DEFAULT_OCR_TIMEOUT_SECS,
            tesseract_path: None,
            ocr_language: default_ocr_language(),
            log_file: None,
        }
    }
}

impl Config {
    /// Load configuration from default location and environment
    ///
    /// Order of precedence (highest to lowest):
    /// 1. Environment variables (IMAGER_DATA_DIR, IMAGER_STORAGE_BACKEND, ...)
    /// 2. Config file (~/.config/imager/config.toml or IMAGER_CONFIG)
    /// 3. Default values
    pub fn load() -> Result<Self> {
        Self::load_from_path(&Self::config_file_path())
    }

    /// Load configuration, preferring a path given on the command line
    pub fn load_with_cli_override(cli_path: Option<&PathBuf>) -> Result<Self> {
        match cli_path {
            Some(path) => Self::load_from_path(path),
            None => Self::load(),
        }
    }

    /// Load configuration from a specific path
    ///
    /// Environment variables are still applied as overrides.
    /// If the file doesn't exist, defaults are used.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {:?}", path))?;
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {:?}", path))?
        } else {
            Self::default()
        };

        config.apply_env_overrides();
        config.ensure_data_dir()?;
        Ok(config)
    }

    /// Load configuration from a TOML string (useful for testing)
    pub fn load_from_str(toml_content: &str) -> Result<Self> {
        let mut config: Config =
            toml::from_str(toml_content).context("Failed to parse config TOML")?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var(format!("{}_DATA_DIR", ENV_PREFIX)) {
            self.data_dir = PathBuf::from(val);
        }

        if let Ok(val) = std::env::var(format!("{}_STORAGE_BACKEND", ENV_PREFIX)) {
            match val.parse() {
                Ok(backend) => self.storage_backend = backend,
                Err(e) => tracing::warn!("ignoring {}_STORAGE_BACKEND: {}", ENV_PREFIX, e),
            }
        }

        if let Ok(val) = std::env::var(format!("{}_OCR_TIMEOUT_SECS", ENV_PREFIX)) {
            match val.parse::<u64>() {
                Ok(secs) if secs > 0 => self.ocr_timeout_secs = secs,
                _ => tracing::warn!("ignoring invalid {}_OCR_TIMEOUT_SECS={:?}", ENV_PREFIX, val),
            }
        }

        // Empty string clears it
        if let Ok(val) = std::env::var(format!("{}_TESSERACT_PATH", ENV_PREFIX)) {
            self.tesseract_path = if val.is_empty() {
                None
            } else {
                Some(PathBuf::from(val))
            };
        }

        if let Ok(val) = std::env::var(format!("{}_OCR_LANGUAGE", ENV_PREFIX)) {
            if !val.is_empty() {
                self.ocr_language = val;
            }
        }
    }

    /// Ensure data directory exists
    fn ensure_data_dir(&self) -> Result<()> {
        if !self.data_dir.exists() {
            std::fs::create_dir_all(&self.data_dir)
                .with_context(|| format!("Failed to create data directory: {:?}", self.data_dir))?;
        }
        Ok(())
    }

    /// Save configuration to a specific file
    pub fn save_to_path(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(config_path, content)
            .with_context(|| format!("Failed to write config file: {:?}", config_path))?;
        Ok(())
    }

    /// Get the config file path
    ///
    /// Can be overridden with IMAGER_CONFIG environment variable
    pub fn config_file_path() -> PathBuf {
        if let Ok(path) = std::env::var(format!("{}_CONFIG", ENV_PREFIX)) {
            return PathBuf::from(path);
        }

        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("imager")
            .join("config.toml")
    }

    /// Directory used by the file storage backend
    pub fn history_dir(&self) -> PathBuf {
        self.data_dir.join("history")
    }

    /// Get the path to the SQLite database
    pub fn sqlite_path(&self) -> PathBuf {
        self.data_dir.join("imager.db")
    }

    /// Log file path, falling back to {data_dir}/debug.log
    pub fn log_path(&self) -> PathBuf {
        self.log_file
            .clone()
            .unwrap_or_else(|| self.data_dir.join("debug.log"))
    }

    /// OCR timeout as a duration
    pub fn ocr_timeout(&self) -> Duration {
        Duration::from_secs(self.ocr_timeout_secs.max(1))
    }
}

/// Get the default data directory
fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("imager")
}

fn default_ocr_timeout_secs() -> u64 {
    DEFAULT_OCR_TIMEOUT_SECS
}

fn default_ocr_language() -> String {
    DEFAULT_OCR_LANGUAGE.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::Mutex;

    // Mutex to serialize tests that touch environment variables
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    /// Guard that locks env access and saves/restores env vars
    struct EnvGuard<'a> {
        _lock: std::sync::MutexGuard<'a, ()>,
        saved: Vec<(String, Option<String>)>,
    }

    impl<'a> EnvGuard<'a> {
        fn new(vars: &[&str]) -> Self {
            let lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
            let saved = vars
                .iter()
                .map(|&name| (name.to_string(), env::var(name).ok()))
                .collect();
            for name in vars {
                env::remove_var(name);
            }
            Self { _lock: lock, saved }
        }
    }

    impl Drop for EnvGuard<'_> {
        fn drop(&mut self) {
            for (name, value) in &self.saved {
                match value {
                    Some(v) => env::set_var(name, v),
                    None => env::remove_var(name),
                }
            }
        }
    }

    const ENV_VARS: &[&str] = &[
        "IMAGER_DATA_DIR",
        "IMAGER_STORAGE_BACKEND",
        "IMAGER_OCR_TIMEOUT_SECS",
        "IMAGER_TESSERACT_PATH",
        "IMAGER_OCR_LANGUAGE",
    ];

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.storage_backend, StorageBackend::File);
        assert_eq!(config.ocr_timeout_secs, 60);
        assert_eq!(config.ocr_language, "eng");
        assert!(config.tesseract_path.is_none());
        assert!(config.data_dir.ends_with("imager"));
    }

    #[test]
    fn test_file_paths() {
        let config = Config {
            data_dir: PathBuf::from("/data/imager"),
            ..Config::default()
        };

        assert_eq!(config.history_dir(), PathBuf::from("/data/imager/history"));
        assert_eq!(config.sqlite_path(), PathBuf::from("/data/imager/imager.db"));
        assert_eq!(config.log_path(), PathBuf::from("/data/imager/debug.log"));

        let config = Config {
            log_file: Some(PathBuf::from("/var/log/imager.log")),
            ..config
        };
        assert_eq!(config.log_path(), PathBuf::from("/var/log/imager.log"));
    }

    #[test]
    fn test_ocr_timeout_never_zero() {
        let config = Config {
            ocr_timeout_secs: 0,
            ..Config::default()
        };
        assert_eq!(config.ocr_timeout(), Duration::from_secs(1));
    }

    #[test]
    fn test_storage_backend_parse() {
        assert_eq!("file".parse::<StorageBackend>().unwrap(), StorageBackend::File);
        assert_eq!(
            "SQLite".parse::<StorageBackend>().unwrap(),
            StorageBackend::Sqlite
        );
        assert!("redis".parse::<StorageBackend>().is_err());
        assert_eq!(StorageBackend::Sqlite.to_string(), "sqlite");
    }

    #[test]
    fn test_env_override_data_dir() {
        let _guard = EnvGuard::new(ENV_VARS);

        let mut config = Config::default();

        env::set_var("IMAGER_DATA_DIR", "/tmp/imager-test");
        config.apply_env_overrides();

        assert_eq!(config.data_dir, PathBuf::from("/tmp/imager-test"));
    }

    #[test]
    fn test_env_override_storage_backend() {
        let _guard = EnvGuard::new(ENV_VARS);

        let mut config = Config::default();

        env::set_var("IMAGER_STORAGE_BACKEND", "sqlite");
        config.apply_env_overrides();
        assert_eq!(config.storage_backend, StorageBackend::Sqlite);

        // Invalid values leave the current setting alone
        env::set_var("IMAGER_STORAGE_BACKEND", "floppy");
        config.apply_env_overrides();
        assert_eq!(config.storage_backend, StorageBackend::Sqlite);
    }

    #[test]
    fn test_env_override_ocr_timeout() {
        let _guard = EnvGuard::new(ENV_VARS);

        let mut config = Config::default();

        env::set_var("IMAGER_OCR_TIMEOUT_SECS", "5");
        config.apply_env_overrides();
        assert_eq!(config.ocr_timeout_secs, 5);

        env::set_var("IMAGER_OCR_TIMEOUT_SECS", "0");
        config.apply_env_overrides();
        assert_eq!(config.ocr_timeout_secs, 5);

        env::set_var("IMAGER_OCR_TIMEOUT_SECS", "soon");
        config.apply_env_overrides();
        assert_eq!(config.ocr_timeout_secs, 5);
    }

    #[test]
    fn test_env_override_tesseract_path() {
        let _guard = EnvGuard::new(ENV_VARS);

        let mut config = Config::default();

        env::set_var("IMAGER_TESSERACT_PATH", "/opt/tesseract/bin/tesseract");
        config.apply_env_overrides();
        assert_eq!(
            config.tesseract_path,
            Some(PathBuf::from("/opt/tesseract/bin/tesseract"))
        );

        // Empty string clears it
        env::set_var("IMAGER_TESSERACT_PATH", "");
        config.apply_env_overrides();
        assert!(config.tesseract_path.is_none());
    }

    #[test]
    fn test_serialization() {
        let _guard = EnvGuard::new(ENV_VARS);

        let config = Config {
            data_dir: PathBuf::from("/data/imager"),
            storage_backend: StorageBackend::Sqlite,
            ocr_timeout_secs: 15,
            tesseract_path: Some(PathBuf::from("/usr/local/bin/tesseract")),
            ocr_language: "eng+kor".to_string(),
            log_file: None,
        };

        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("data_dir"));
        assert!(toml_str.contains("storage_backend = \"sqlite\""));
        assert!(toml_str.contains("ocr_timeout_secs"));

        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.data_dir, config.data_dir);
        assert_eq!(parsed.storage_backend, config.storage_backend);
        assert_eq!(parsed.ocr_timeout_secs, config.ocr_timeout_secs);
        assert_eq!(parsed.tesseract_path, config.tesseract_path);
        assert_eq!(parsed.ocr_language, config.ocr_language);
    }

    #[test]
    fn test_load_from_str() {
        let _guard = EnvGuard::new(ENV_VARS);

        let toml = r#"
            data_dir = "/custom/data"
            storage_backend = "sqlite"
            ocr_language = "kor"
        "#;

        let config = Config::load_from_str(toml).unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/custom/data"));
        assert_eq!(config.storage_backend, StorageBackend::Sqlite);
        assert_eq!(config.ocr_language, "kor");
        assert_eq!(config.ocr_timeout_secs, 60);
    }

    #[test]
    fn test_load_from_path_missing_file() {
        let _guard = EnvGuard::new(ENV_VARS);
        let temp_dir = tempfile::TempDir::new().unwrap();
        env::set_var("IMAGER_DATA_DIR", temp_dir.path().join("data"));

        let path = PathBuf::from("/nonexistent/config.toml");
        let config = Config::load_from_path(&path).unwrap();

        assert_eq!(config.storage_backend, StorageBackend::File);
        assert!(config.data_dir.is_dir());
    }

    #[test]
    fn test_save_and_reload() {
        let _guard = EnvGuard::new(ENV_VARS);
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("conf").join("config.toml");

        let config = Config {
            data_dir: temp_dir.path().join("data"),
            ocr_timeout_secs: 9,
            ..Config::default()
        };
        config.save_to_path(&path).unwrap();

        let loaded = Config::load_from_path(&path).unwrap();
        assert_eq!(loaded.data_dir, config.data_dir);
        assert_eq!(loaded.ocr_timeout_secs, 9);
    }
}
