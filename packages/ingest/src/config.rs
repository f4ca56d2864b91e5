//! Runtime configuration.
//!
//! Settings come from a TOML file (`GRID_INGEST_CONFIG`, else
//! `./grid_ingest.toml`, else built-in defaults). The database path and the
//! Open-Meteo API key come from the environment.

use std::path::{Path, PathBuf};
use std::time::Duration;

use grid_ingest_database::paths;
use grid_ingest_scraper::DownloaderConfig;
use grid_ingest_scraper::http::DEFAULT_USER_AGENT;
use grid_ingest_scraper::openmeteo::OpenMeteoConfig;
use grid_ingest_scraper::retry::RetryPolicy;
use grid_ingest_source::SourceRegistry;
use grid_ingest_transform::DateFormats;
use serde::Deserialize;

/// Environment variable naming the config file.
pub const CONFIG_ENV: &str = "GRID_INGEST_CONFIG";

/// Config file looked for in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "grid_ingest.toml";

/// Errors loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("Cannot read config file {}: {source}", path.display())]
    Io {
        /// File that was read.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The config file is not valid TOML for [`IngestConfig`].
    #[error("Invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value is present but unusable.
    #[error("Invalid config value: {message}")]
    Invalid {
        /// Description of what went wrong.
        message: String,
    },
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DownloaderSettings {
    pub max_retries: u32,
    pub retry_delay_secs: f64,
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl Default for DownloaderSettings {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_delay_secs: 2.0,
            timeout_secs: 30,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct OpenMeteoSettings {
    pub base_url: String,
    pub timezone: String,
    pub max_retries: u32,
    pub retry_delay_secs: f64,
}

impl Default for OpenMeteoSettings {
    fn default() -> Self {
        let defaults = OpenMeteoConfig::with_api_key("");
        Self {
            base_url: defaults.base_url,
            timezone: defaults.timezone,
            max_retries: defaults.max_retries,
            retry_delay_secs: defaults.retry_delay.as_secs_f64(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SchedulerSettings {
    pub tick_secs: u64,
    pub weather_skip_window_hours: i64,
    pub weather_report_code: String,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            tick_secs: 60,
            weather_skip_window_hours: 2,
            weather_report_code: "P-7A".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TransformSettings {
    /// Replaces the embedded date format list when set.
    pub date_formats: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct MetadataSettings {
    pub instructions_path: Option<PathBuf>,
    pub lookup_path: Option<PathBuf>,
}

/// Everything the pipeline and scheduler need.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    pub downloader: DownloaderSettings,
    pub openmeteo: OpenMeteoSettings,
    pub scheduler: SchedulerSettings,
    pub transform: TransformSettings,
    pub metadata: MetadataSettings,

    /// From `GRID_INGEST_DB` / `DATABASE_URL`.
    #[serde(skip)]
    pub database_path: Option<PathBuf>,

    /// From `OPENMETEO_API_KEY`.
    #[serde(skip)]
    pub openmeteo_api_key: Option<String>,
}

impl IngestConfig {
    /// Loads configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a named config file is missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::load_with(|name| std::env::var(name).ok())
    }

    /// Loads configuration using `env` for variable lookup.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a named config file is missing or invalid.
    pub fn load_with(env: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = match env(CONFIG_ENV) {
            Some(path) => Self::from_file(Path::new(&path))?,
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_FILE))?
            }
            None => Self::default(),
        };

        config.database_path = env("GRID_INGEST_DB")
            .or_else(|| env("DATABASE_URL"))
            .filter(|v| !v.trim().is_empty())
            .map(|v| database_path_from_url(&v));
        config.openmeteo_api_key = env("OPENMETEO_API_KEY").filter(|v| !v.trim().is_empty());

        Ok(config)
    }

    /// Reads a TOML config file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml(&text)?;
        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Parses TOML config text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the text is not a valid config.
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        for (name, secs) in [
            ("downloader.retry_delay_secs", self.downloader.retry_delay_secs),
            ("openmeteo.retry_delay_secs", self.openmeteo.retry_delay_secs),
        ] {
            if !secs.is_finite() || secs < 0.0 {
                return Err(ConfigError::Invalid {
                    message: format!("{name} must be a non-negative number, got {secs}"),
                });
            }
        }
        if self.scheduler.tick_secs == 0 {
            return Err(ConfigError::Invalid {
                message: "scheduler.tick_secs must be positive".to_string(),
            });
        }
        Ok(())
    }

    /// Database file to open.
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.database_path
            .clone()
            .unwrap_or_else(paths::default_db_path)
    }

    /// Downloader settings for [`grid_ingest_scraper::Downloader`].
    #[must_use]
    pub fn downloader_config(&self) -> DownloaderConfig {
        DownloaderConfig {
            retry: RetryPolicy {
                max_retries: self.downloader.max_retries,
                retry_delay: Duration::from_secs_f64(self.downloader.retry_delay_secs),
                timeout: Duration::from_secs(self.downloader.timeout_secs),
            },
            user_agent: self.downloader.user_agent.clone(),
        }
    }

    /// Open-Meteo client settings, or `None` without an API key.
    #[must_use]
    pub fn openmeteo_config(&self) -> Option<OpenMeteoConfig> {
        let api_key = self.openmeteo_api_key.as_deref()?;
        Some(OpenMeteoConfig {
            base_url: self.openmeteo.base_url.clone(),
            timezone: self.openmeteo.timezone.clone(),
            max_retries: self.openmeteo.max_retries,
            retry_delay: Duration::from_secs_f64(self.openmeteo.retry_delay_secs),
            ..OpenMeteoConfig::with_api_key(api_key)
        })
    }

    /// Date format list: the configured override, else the embedded one.
    ///
    /// # Errors
    ///
    /// Returns [`grid_ingest_transform::TransformError::DateFormats`] if the
    /// embedded list is malformed.
    pub fn date_formats(&self) -> Result<DateFormats, grid_ingest_transform::TransformError> {
        match &self.transform.date_formats {
            Some(formats) => Ok(DateFormats::new(formats.clone())),
            None => DateFormats::embedded(),
        }
    }

    /// Source registry: files on disk when both paths are set, else the
    /// embedded copies.
    ///
    /// # Errors
    ///
    /// Returns [`grid_ingest_source::SourceError::Configuration`] if the
    /// files cannot be loaded.
    pub fn registry(&self) -> Result<SourceRegistry, grid_ingest_source::SourceError> {
        match (&self.metadata.instructions_path, &self.metadata.lookup_path) {
            (Some(instructions), Some(lookup)) => SourceRegistry::from_paths(instructions, lookup),
            (None, None) => SourceRegistry::embedded(),
            _ => Err(grid_ingest_source::SourceError::Configuration {
                message: "metadata.instructions_path and metadata.lookup_path must be set together"
                    .to_string(),
            }),
        }
    }
}

/// Accepts a bare path or a `duckdb://` URL.
fn database_path_from_url(value: &str) -> PathBuf {
    PathBuf::from(value.trim().strip_prefix("duckdb://").unwrap_or(value.trim()))
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    fn env_of(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: BTreeMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn empty_file_gives_defaults() {
        let config = IngestConfig::from_toml("").unwrap();
        assert_eq!(config, IngestConfig::default());
        assert_eq!(config.downloader.max_retries, 3);
        assert_eq!(config.scheduler.tick_secs, 60);
        assert_eq!(config.scheduler.weather_report_code, "P-7A");
        assert_eq!(config.openmeteo.timezone, "America/New_York");
    }

    #[test]
    fn partial_sections_keep_remaining_defaults() {
        let config = IngestConfig::from_toml(
            "[downloader]\nmax_retries = 5\n\n[transform]\ndate_formats = [\"%Y-%m-%d\"]\n",
        )
        .unwrap();

        assert_eq!(config.downloader.max_retries, 5);
        assert_eq!(config.downloader.timeout_secs, 30);
        assert_eq!(
            config.date_formats().unwrap().formats(),
            ["%Y-%m-%d".to_string()]
        );

        let retry = config.downloader_config().retry;
        assert_eq!(retry.max_retries, 5);
        assert_eq!(retry.retry_delay, Duration::from_secs(2));
    }

    #[test]
    fn rejects_bad_values() {
        assert!(matches!(
            IngestConfig::from_toml("[scheduler]\ntick_secs = 0\n"),
            Err(ConfigError::Invalid { .. })
        ));
        assert!(matches!(
            IngestConfig::from_toml("[downloader]\nretry_delay_secs = -1.0\n"),
            Err(ConfigError::Invalid { .. })
        ));
        assert!(matches!(
            IngestConfig::from_toml("[downloader]\nmax_retries = \"many\"\n"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn environment_overrides() {
        let config = IngestConfig::load_with(env_of(&[
            ("DATABASE_URL", "duckdb:///tmp/grid.duckdb"),
            ("OPENMETEO_API_KEY", "secret"),
        ]))
        .unwrap();

        assert_eq!(config.database_path(), PathBuf::from("/tmp/grid.duckdb"));
        assert_eq!(config.openmeteo_config().unwrap().api_key, "secret");

        let preferred = IngestConfig::load_with(env_of(&[
            ("DATABASE_URL", "/tmp/a.duckdb"),
            ("GRID_INGEST_DB", "/tmp/b.duckdb"),
        ]))
        .unwrap();
        assert_eq!(preferred.database_path(), PathBuf::from("/tmp/b.duckdb"));
        assert!(preferred.openmeteo_config().is_none());
    }

    #[test]
    fn missing_named_file_is_an_error() {
        let result =
            IngestConfig::load_with(env_of(&[(CONFIG_ENV, "/nonexistent/grid_ingest.toml")]));
        let err = result.unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
        assert!(
            err.to_string()
                .starts_with("Cannot read config file /nonexistent/grid_ingest.toml: ")
        );
    }

    #[test]
    fn metadata_paths_must_come_in_pairs() {
        let config =
            IngestConfig::from_toml("[metadata]\ninstructions_path = \"/tmp/i.txt\"\n").unwrap();
        assert!(config.registry().is_err());
        assert_eq!(IngestConfig::default().registry().unwrap().len(), 22);
    }
}
