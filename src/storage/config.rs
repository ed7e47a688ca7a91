use super::Result;
use crate::error::{CliError, StorageError};
use crate::template::MissingPolicy;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const APP_DIR: &str = "unicore";
const CONFIG_FILE: &str = "config.toml";

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    pub rate_limit: RateLimitConfig,
    pub audit: AuditConfig,
    pub template: TemplateConfig,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct RateLimitConfig {
    pub max_calls: usize,
    pub time_window_secs: f64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_calls: 100,
            time_window_secs: 60.0,
        }
    }
}

impl RateLimitConfig {
    /// Window as a `Duration`; negative or non-finite values collapse to zero
    pub fn window(&self) -> Duration {
        Duration::try_from_secs_f64(self.time_window_secs).unwrap_or(Duration::ZERO)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct AuditConfig {
    pub log_file: PathBuf,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            log_file: PathBuf::from("unicore_audit.log"),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct TemplateConfig {
    pub escape_html: bool,
    pub missing: MissingPolicy,
    pub max_length: usize,
}

impl Default for TemplateConfig {
    fn default() -> Self {
        Self {
            escape_html: true,
            missing: MissingPolicy::Error,
            max_length: 10_000,
        }
    }
}

/// Keys accepted by `Config::set`
pub const CONFIG_KEYS: [&str; 6] = [
    "rate_limit.max_calls",
    "rate_limit.time_window_secs",
    "audit.log_file",
    "template.escape_html",
    "template.missing",
    "template.max_length",
];

impl Config {
    pub fn load(path: Option<PathBuf>) -> Result<Self> {
        let config_path = match path {
            Some(p) => p,
            None => Self::config_file_path(None)?,
        };

        if !config_path.exists() {
            log::debug!("No config at {}, using defaults", config_path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&config_path).map_err(|source| StorageError::FileIo {
            path: config_path.to_string_lossy().to_string(),
            source,
        })?;

        toml::from_str(&content).map_err(|e| StorageError::ConfigParseError {
            message: format!("{}: {}", config_path.display(), e),
        })
    }

    pub fn save(&self, path: Option<PathBuf>) -> Result<()> {
        let config_path = match path {
            Some(p) => p,
            None => Self::config_file_path(None)?,
        };

        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent).map_err(|source| StorageError::FileIo {
                path: parent.to_string_lossy().to_string(),
                source,
            })?;
        }

        let toml_content = toml::to_string(self).map_err(|e| StorageError::ConfigSaveFailed {
            message: e.to_string(),
        })?;

        fs::write(&config_path, toml_content).map_err(|source| StorageError::FileIo {
            path: config_path.to_string_lossy().to_string(),
            source,
        })?;

        Ok(())
    }

    /// `<dir>/config.toml`, where `dir` defaults to `<os config dir>/unicore`
    pub fn config_file_path(config_dir: Option<&Path>) -> Result<PathBuf> {
        let app_config_dir = match config_dir {
            Some(dir) => dir.to_path_buf(),
            None => dirs::config_dir()
                .ok_or(StorageError::ConfigDirNotFound)?
                .join(APP_DIR),
        };
        Ok(app_config_dir.join(CONFIG_FILE))
    }

    /// Update one dotted key from its string form
    pub fn set(&mut self, key: &str, value: &str) -> crate::Result<()> {
        fn parse<T: std::str::FromStr>(key: &str, value: &str) -> crate::Result<T> {
            value.parse().map_err(|_| {
                CliError::InvalidArguments(format!("invalid value '{}' for {}", value, key)).into()
            })
        }

        match key {
            "rate_limit.max_calls" => self.rate_limit.max_calls = parse(key, value)?,
            "rate_limit.time_window_secs" => {
                let secs: f64 = parse(key, value)?;
                if !secs.is_finite() || secs < 0.0 {
                    return Err(CliError::InvalidArguments(format!(
                        "{} must be a non-negative number of seconds",
                        key
                    ))
                    .into());
                }
                self.rate_limit.time_window_secs = secs;
            }
            "audit.log_file" => self.audit.log_file = PathBuf::from(value),
            "template.escape_html" => self.template.escape_html = parse(key, value)?,
            "template.missing" => self.template.missing = parse(key, value)?,
            "template.max_length" => self.template.max_length = parse(key, value)?,
            _ => {
                return Err(CliError::UnknownConfigKey {
                    key: key.to_string(),
                }
                .into());
            }
        }
        Ok(())
    }

    /// `(key, value)` pairs for display, in `CONFIG_KEYS` order
    pub fn entries(&self) -> Vec<(&'static str, String)> {
        vec![
            (CONFIG_KEYS[0], self.rate_limit.max_calls.to_string()),
            (CONFIG_KEYS[1], self.rate_limit.time_window_secs.to_string()),
            (CONFIG_KEYS[2], self.audit.log_file.display().to_string()),
            (CONFIG_KEYS[3], self.template.escape_html.to_string()),
            (CONFIG_KEYS[4], self.template.missing.to_string()),
            (CONFIG_KEYS[5], self.template.max_length.to_string()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use tempfile::tempdir;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.rate_limit.max_calls, 100);
        assert_eq!(config.rate_limit.window(), Duration::from_secs(60));
        assert_eq!(config.audit.log_file, PathBuf::from("unicore_audit.log"));
        assert!(config.template.escape_html);
        assert_eq!(config.template.missing, MissingPolicy::Error);
        assert_eq!(config.template.max_length, 10_000);
    }

    #[test]
    fn test_config_load_save() {
        let temp_dir = tempdir().expect("Failed to create temp dir");
        let config_path = temp_dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.set("rate_limit.max_calls", "5").unwrap();
        config.set("template.missing", "empty").unwrap();
        config.set("audit.log_file", "/var/log/unicore.log").unwrap();

        config
            .save(Some(config_path.clone()))
            .expect("Failed to save config");
        let loaded = Config::load(Some(config_path)).expect("Failed to load config");

        assert_eq!(loaded, config);
        assert_eq!(loaded.template.missing, MissingPolicy::Empty);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let temp_dir = tempdir().expect("Failed to create temp dir");
        let config_path = temp_dir.path().join("config.toml");
        fs::write(&config_path, "[rate_limit]\nmax_calls = 3\n").unwrap();

        let config = Config::load(Some(config_path)).unwrap();
        assert_eq!(config.rate_limit.max_calls, 3);
        assert_eq!(config.rate_limit.time_window_secs, 60.0);
        assert_eq!(config.template, TemplateConfig::default());
    }

    #[test]
    fn test_invalid_toml_is_a_parse_error() {
        let temp_dir = tempdir().expect("Failed to create temp dir");
        let config_path = temp_dir.path().join("config.toml");
        fs::write(&config_path, "[rate_limit\n").unwrap();

        assert!(matches!(
            Config::load(Some(config_path)),
            Err(StorageError::ConfigParseError { .. })
        ));
    }

    #[test]
    fn test_load_nonexistent_file() {
        let temp_dir = tempdir().expect("Failed to create temp dir");
        let config = Config::load(Some(temp_dir.path().join("missing.toml")))
            .expect("Failed to load default config");
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_set_rejects_bad_keys_and_values() {
        let mut config = Config::default();
        assert!(matches!(
            config.set("rate_limit.burst", "1"),
            Err(AppError::Cli(CliError::UnknownConfigKey { .. }))
        ));
        assert!(config.set("rate_limit.max_calls", "many").is_err());
        assert!(config.set("rate_limit.time_window_secs", "-1").is_err());
        assert!(config.set("template.missing", "ignore").is_err());
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_config_file_path_override() {
        let path = Config::config_file_path(Some(Path::new("/tmp/unicore-test"))).unwrap();
        assert_eq!(path, PathBuf::from("/tmp/unicore-test/config.toml"));
        assert_eq!(Config::default().entries().len(), CONFIG_KEYS.len());
    }
}
