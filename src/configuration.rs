use chrono::NaiveTime;
use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::errors::ConfigurationError;
use crate::fetcher::DEFAULT_MAX_TOOL_ROUNDS;
use crate::providers::configs::OpenAiProviderConfig;
use crate::publisher::DEFAULT_CATEGORY;

/// Optional settings file looked up in the working directory (any format `config` knows)
pub const CONFIG_FILE: &str = "news-collector";
pub const ENV_PREFIX: &str = "NEWS_COLLECTOR";
/// Names an explicit settings file, used instead of [`CONFIG_FILE`]
pub const CONFIG_PATH_VAR: &str = "NEWS_COLLECTOR_CONFIG";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProviderSettings {
    pub host: String,
    pub model: String,
    pub temperature: Option<f64>,
    pub max_tokens: Option<i32>,
    pub timeout_secs: u64,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            host: "https://api.moonshot.cn".to_string(),
            model: "moonshot-v1-128k".to_string(),
            temperature: Some(0.3),
            max_tokens: None,
            timeout_secs: 600,
        }
    }
}

impl ProviderSettings {
    pub fn into_config(self, api_key: String) -> OpenAiProviderConfig {
        OpenAiProviderConfig {
            host: self.host,
            api_key,
            model: self.model,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            timeout: Duration::from_secs(self.timeout_secs),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FetcherSettings {
    pub max_tool_rounds: usize,
}

impl Default for FetcherSettings {
    fn default() -> Self {
        Self {
            max_tool_rounds: DEFAULT_MAX_TOOL_ROUNDS,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PublisherSettings {
    pub output_dir: PathBuf,
    pub category: String,
}

impl Default for PublisherSettings {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("../content/posts"),
            category: DEFAULT_CATEGORY.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScheduleSettings {
    /// Local time of day, `HH:MM`
    pub at: String,
    pub run_on_startup: bool,
}

impl Default for ScheduleSettings {
    fn default() -> Self {
        Self {
            at: "23:50".to_string(),
            run_on_startup: true,
        }
    }
}

impl ScheduleSettings {
    pub fn time(&self) -> Result<NaiveTime, ConfigurationError> {
        NaiveTime::parse_from_str(self.at.trim(), "%H:%M").map_err(|e| {
            ConfigurationError::Invalid {
                key: "schedule.at".to_string(),
                reason: format!("expected HH:MM, got {:?} ({})", self.at, e),
            }
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub dir: PathBuf,
    pub file_name: String,
    pub max_bytes: u64,
    pub max_backups: usize,
    /// Used when RUST_LOG is not set
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("logs"),
            file_name: "news_collector.log".to_string(),
            max_bytes: 10 * 1024 * 1024,
            max_backups: 5,
            level: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default = "default_credential_file")]
    pub credential_file: PathBuf,
    #[serde(default)]
    pub provider: ProviderSettings,
    #[serde(default)]
    pub fetcher: FetcherSettings,
    #[serde(default)]
    pub publisher: PublisherSettings,
    #[serde(default)]
    pub schedule: ScheduleSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            credential_file: default_credential_file(),
            provider: ProviderSettings::default(),
            fetcher: FetcherSettings::default(),
            publisher: PublisherSettings::default(),
            schedule: ScheduleSettings::default(),
            logging: LoggingSettings::default(),
        }
    }
}

impl Settings {
    /// Defaults, then the settings file, then `NEWS_COLLECTOR_*` variables.
    ///
    /// The settings file is the one named by `NEWS_COLLECTOR_CONFIG`, which must exist,
    /// or else `news-collector.{toml,yaml,json}` if present.
    pub fn new() -> Result<Self, ConfigurationError> {
        match std::env::var_os(CONFIG_PATH_VAR) {
            Some(path) => Self::from_file(Path::new(&path)),
            None => Self::load(File::with_name(CONFIG_FILE).required(false)),
        }
    }

    fn from_file(path: &Path) -> Result<Self, ConfigurationError> {
        Self::load(File::from(path).required(true))
    }

    fn load<S>(file: S) -> Result<Self, ConfigurationError>
    where
        S: config::Source + Send + Sync + 'static,
    {
        let config = Config::builder()
            .add_source(file)
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let settings: Settings = config.try_deserialize().map_err(|err| {
            tracing::debug!("Configuration error: {:?}", &err);
            ConfigurationError::Other(err)
        })?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), ConfigurationError> {
        self.schedule.time()?;
        if self.logging.max_bytes == 0 {
            return Err(ConfigurationError::Invalid {
                key: "logging.max_bytes".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.provider.host.trim().is_empty() {
            return Err(ConfigurationError::Invalid {
                key: "provider.host".to_string(),
                reason: "must not be empty".to_string(),
            });
        }
        Ok(())
    }
}

fn default_credential_file() -> PathBuf {
    PathBuf::from("API_KEY")
}
