//! Configuration for loggers and the file sink

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::sink::{Error as SinkError, Target};

/// Default rotation threshold: 10 MiB
pub const DEFAULT_ROTATE_SIZE: u64 = 10 * 1024 * 1024;

/// Default number of rotated generations kept next to the base file
pub const DEFAULT_MAX_FILES: usize = 5;

/// Largest accepted `max_files`
pub const MAX_FILES_LIMIT: usize = 1000;

/// Environment variable naming an explicit config file
pub const CONFIG_PATH_ENV: &str = "M3LOG_CONFIG";

/// File sink settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSinkConfig {
    /// Base log file; rotated generations live next to it as `<path>.N`
    #[serde(default = "default_file_path")]
    pub file_path: PathBuf,

    /// Accepted for compatibility; writes always append
    #[serde(default = "default_append")]
    pub append: bool,

    /// Encoding label understood by `encoding_rs` (e.g. "utf-8", "gbk")
    #[serde(default = "default_encoding")]
    pub encoding: String,

    /// Rotate once the base file reaches this many bytes; `None` disables rotation
    ///
    /// Stored as `0` in config files when disabled.
    #[serde(default = "default_rotate_size", with = "rotate_size_field")]
    pub rotate_size: Option<u64>,

    /// Rotated generations to retain
    #[serde(default = "default_max_files")]
    pub max_files: usize,
}

fn default_file_path() -> PathBuf {
    PathBuf::from("./logs/app.log")
}

fn default_append() -> bool {
    true
}

fn default_encoding() -> String {
    "utf-8".to_string()
}

fn default_rotate_size() -> Option<u64> {
    Some(DEFAULT_ROTATE_SIZE)
}

fn default_max_files() -> usize {
    DEFAULT_MAX_FILES
}

mod rotate_size_field {
    use serde::{Deserialize, Deserializer, Serializer};

    pub(super) fn serialize<S: Serializer>(
        value: &Option<u64>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.unwrap_or(0))
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<u64>, D::Error> {
        let bytes = u64::deserialize(deserializer)?;
        Ok((bytes > 0).then_some(bytes))
    }
}

impl Default for FileSinkConfig {
    fn default() -> Self {
        Self {
            file_path: default_file_path(),
            append: default_append(),
            encoding: default_encoding(),
            rotate_size: default_rotate_size(),
            max_files: default_max_files(),
        }
    }
}

impl FileSinkConfig {
    /// Create a config for the given base path with default rotation settings
    pub fn new(file_path: impl Into<PathBuf>) -> Self {
        Self {
            file_path: file_path.into(),
            ..Self::default()
        }
    }

    /// Check the invariants the file sink relies on
    pub fn validate(&self) -> std::result::Result<(), SinkError> {
        if self.file_path.as_os_str().is_empty() {
            return Err(SinkError::Configuration("file path is empty".to_string()));
        }
        if self.rotate_size == Some(0) {
            return Err(SinkError::Configuration(
                "rotate size must be a positive number of bytes".to_string(),
            ));
        }
        if self.max_files > MAX_FILES_LIMIT {
            return Err(SinkError::Configuration(format!(
                "max files must be at most {}, got {}",
                MAX_FILES_LIMIT, self.max_files
            )));
        }
        match encoding_rs::Encoding::for_label(self.encoding.as_bytes()) {
            None => Err(SinkError::Configuration(format!(
                "unknown encoding '{}'",
                self.encoding
            ))),
            // UTF-16 and replacement can only be decoded
            Some(encoding) if encoding.output_encoding() != encoding => {
                Err(SinkError::Configuration(format!(
                    "encoding '{}' cannot be used for output",
                    self.encoding
                )))
            }
            Some(_) => Ok(()),
        }
    }

    /// Produce a new config with the given options applied
    ///
    /// The result is validated as a whole; on error `self` is unaffected.
    pub fn apply(&self, options: &FileOptions) -> std::result::Result<Self, SinkError> {
        let mut next = self.clone();
        if let Some(path) = &options.file_path {
            next.file_path = path.clone();
        }
        if let Some(append) = options.append {
            next.append = append;
        }
        if let Some(encoding) = &options.encoding {
            next.encoding = encoding.clone();
        }
        if let Some(rotate_size) = options.rotate_size {
            next.rotate_size = rotate_size;
        }
        if let Some(max_files) = options.max_files {
            next.max_files = max_files;
        }
        next.validate()?;
        Ok(next)
    }
}

/// Partial file sink settings; unset fields keep their current value
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileOptions {
    pub file_path: Option<PathBuf>,
    pub append: Option<bool>,
    pub encoding: Option<String>,
    /// `Some(None)` turns rotation off
    pub rotate_size: Option<Option<u64>>,
    pub max_files: Option<usize>,
}

impl FileOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn file_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.file_path = Some(path.into());
        self
    }

    pub fn append(mut self, append: bool) -> Self {
        self.append = Some(append);
        self
    }

    pub fn encoding(mut self, encoding: impl Into<String>) -> Self {
        self.encoding = Some(encoding.into());
        self
    }

    pub fn rotate_size(mut self, bytes: Option<u64>) -> Self {
        self.rotate_size = Some(bytes);
        self
    }

    pub fn max_files(mut self, max_files: usize) -> Self {
        self.max_files = Some(max_files);
        self
    }
}

/// Logger configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggerConfig {
    /// Tags prepended to every entry
    #[serde(default)]
    pub tags: Vec<String>,

    /// Prefix entries with `@<timestamp>` (default: true)
    #[serde(default = "default_auto_timestamp")]
    pub auto_timestamp: bool,

    /// Where entries go (default: console)
    #[serde(default)]
    pub target: Target,

    /// File sink settings, used when the target includes the file
    #[serde(default)]
    pub file: FileSinkConfig,
}

fn default_auto_timestamp() -> bool {
    true
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            tags: Vec::new(),
            auto_timestamp: default_auto_timestamp(),
            target: Target::default(),
            file: FileSinkConfig::default(),
        }
    }
}

impl LoggerConfig {
    /// Load configuration from the default location, or return defaults if absent
    ///
    /// `M3LOG_CONFIG` overrides the location; a file named there must exist.
    pub fn load() -> Result<Self> {
        if let Some(path) = std::env::var_os(CONFIG_PATH_ENV) {
            return Self::load_from(Path::new(&path));
        }

        let path = config_file_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific file
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Self = toml::from_str(&content).context("Failed to parse config file")?;
        config.file.validate().context("Invalid file sink settings")?;
        Ok(config)
    }

    /// Save configuration to a specific file
    pub fn save_to(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, content).context("Failed to write config file")?;
        Ok(())
    }
}

/// Get the base configuration directory (~/.m3log)
/// Falls back to ./.m3log if home directory cannot be determined
pub fn config_dir() -> PathBuf {
    try_config_dir().unwrap_or_else(|| {
        tracing::warn!("Could not determine home directory, using current directory for config");
        PathBuf::from(".m3log")
    })
}

/// Try to get the base configuration directory, returning None if home dir is unavailable
pub fn try_config_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".m3log"))
}

/// Get the path to the default config file
pub fn config_file_path() -> PathBuf {
    config_dir().join("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = LoggerConfig::default();
        assert!(config.tags.is_empty());
        assert!(config.auto_timestamp);
        assert_eq!(config.target, Target::Console);
        assert_eq!(config.file.file_path, PathBuf::from("./logs/app.log"));
        assert!(config.file.append);
        assert_eq!(config.file.encoding, "utf-8");
        assert_eq!(config.file.rotate_size, Some(10 * 1024 * 1024));
        assert_eq!(config.file.max_files, 5);
    }

    #[test]
    fn test_config_serialization() {
        let mut config = LoggerConfig::default();
        config.tags = vec!["svc".to_string()];
        config.target = Target::Both;
        config.file.max_files = 2;

        let toml_str = toml::to_string(&config).unwrap();
        let parsed: LoggerConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_disabled_rotation_survives_serialization() {
        let mut config = LoggerConfig::default();
        config.file.rotate_size = None;

        let toml_str = toml::to_string(&config).unwrap();
        assert!(toml_str.contains("rotate_size = 0"));
        let parsed: LoggerConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.file.rotate_size, None);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let parsed: LoggerConfig = toml::from_str(
            r#"
            target = "file"

            [file]
            rotate_size = 100
            "#,
        )
        .unwrap();

        assert_eq!(parsed.target, Target::File);
        assert!(parsed.auto_timestamp);
        assert_eq!(parsed.file.rotate_size, Some(100));
        assert_eq!(parsed.file.max_files, DEFAULT_MAX_FILES);
    }

    #[test]
    fn test_validate_rejects_zero_rotate_size() {
        let mut config = FileSinkConfig::default();
        config.rotate_size = Some(0);
        assert!(matches!(config.validate(), Err(SinkError::Configuration(_))));
    }

    #[test]
    fn test_validate_rejects_unknown_encoding() {
        let mut config = FileSinkConfig::default();
        config.encoding = "klingon-8".to_string();
        assert!(config.validate().is_err());

        config.encoding = "GBK".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_decode_only_encoding() {
        let mut config = FileSinkConfig::default();
        for label in ["utf-16le", "UTF-16BE", "replacement"] {
            config.encoding = label.to_string();
            assert!(
                matches!(config.validate(), Err(SinkError::Configuration(_))),
                "{} accepted",
                label
            );
        }
    }

    #[test]
    fn test_validate_caps_max_files() {
        let mut config = FileSinkConfig::default();
        config.max_files = MAX_FILES_LIMIT;
        assert!(config.validate().is_ok());

        config.max_files = MAX_FILES_LIMIT + 1;
        assert!(matches!(config.validate(), Err(SinkError::Configuration(_))));
    }

    #[test]
    fn test_load_from_rejects_excessive_max_files() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(&path, "[file]\nmax_files = 5000\n").unwrap();

        assert!(LoggerConfig::load_from(&path).is_err());
    }

    #[test]
    fn test_apply_options() {
        let base = FileSinkConfig::default();
        let next = base
            .apply(
                &FileOptions::new()
                    .file_path("/tmp/x.log")
                    .rotate_size(None)
                    .max_files(3),
            )
            .unwrap();

        assert_eq!(next.file_path, PathBuf::from("/tmp/x.log"));
        assert_eq!(next.rotate_size, None);
        assert_eq!(next.max_files, 3);
        assert_eq!(next.encoding, base.encoding);
    }

    #[test]
    fn test_apply_invalid_options_is_all_or_nothing() {
        let base = FileSinkConfig::default();
        let result = base.apply(&FileOptions::new().max_files(1).rotate_size(Some(0)));
        assert!(result.is_err());
        assert_eq!(base.max_files, DEFAULT_MAX_FILES);
    }

    #[test]
    fn test_save_and_load_from() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");

        let mut config = LoggerConfig::default();
        config.auto_timestamp = false;
        config.file = FileSinkConfig::new(temp_dir.path().join("logs/app.log"));
        config.save_to(&path).unwrap();

        let loaded = LoggerConfig::load_from(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_load_from_rejects_invalid_file_settings() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(&path, "[file]\nencoding = \"klingon-8\"\n").unwrap();

        assert!(LoggerConfig::load_from(&path).is_err());
    }

    #[test]
    fn test_config_dir_does_not_panic() {
        let dir = config_dir();
        assert!(dir.ends_with(".m3log"));
    }
}
