use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::model::provider::Provider;
use crate::retry::{Backoff, RetryPolicy};

pub const DEFAULT_CONFIG_PATH: &str = ".diff-triage.toml";

const MAX_BACKOFF: Duration = Duration::from_secs(120);

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Required environment variable {0} is not set")]
    MissingVar(&'static str),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Top-level configuration: optional `.diff-triage.toml` settings plus
/// credentials taken from the environment.
///
/// Built once in `main` and handed to both pipeline stages. Required values
/// are only checked when a stage asks for its validated settings, so a
/// missing credential surfaces before that stage does any network work.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub model: ModelConfig,

    #[serde(default)]
    pub tracker: TrackerConfig,

    #[serde(default)]
    pub retry: RetryConfig,

    #[serde(default)]
    pub report: ReportConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub provider: Provider,
    /// Model name; provider default when unset.
    pub name: Option<String>,
    /// Base URL override, mostly for proxies and self-hosted gateways.
    pub endpoint: Option<String>,
    pub temperature: f64,
    pub max_output_tokens: u32,
    pub timeout_secs: u64,
    pub project: Option<String>,
    pub region: Option<String>,
    #[serde(skip)]
    pub api_key: Option<String>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            provider: Provider::default(),
            name: None,
            endpoint: None,
            temperature: 0.2,
            max_output_tokens: 2048,
            timeout_secs: 60,
            project: None,
            region: None,
            api_key: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    pub api_base: String,
    pub title: String,
    pub timeout_secs: u64,
    #[serde(skip)]
    pub token: Option<String>,
    /// `owner/repo`, normally from GITHUB_REPOSITORY.
    #[serde(skip)]
    pub repository: Option<String>,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.github.com".to_string(),
            title: "🤖 Commit Analysis Report".to_string(),
            timeout_secs: 20,
            token: None,
            repository: None,
        }
    }
}

/// The two sections default differently, so file values are read as
/// overrides and laid over [`RetryConfig::default`].
#[derive(Debug, Clone, Deserialize)]
#[serde(from = "RetryFile")]
pub struct RetryConfig {
    pub model: RetrySettings,
    pub tracker: RetrySettings,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            model: RetrySettings {
                max_attempts: 3,
                strategy: BackoffStrategy::Exponential,
                delay_ms: 2_000,
                rate_limit_delay_ms: 10_000,
            },
            tracker: RetrySettings {
                max_attempts: 3,
                strategy: BackoffStrategy::Fixed,
                delay_ms: 5_000,
                rate_limit_delay_ms: 5_000,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackoffStrategy {
    Fixed,
    Exponential,
}

#[derive(Debug, Clone)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub strategy: BackoffStrategy,
    pub delay_ms: u64,
    pub rate_limit_delay_ms: u64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RetryFile {
    model: RetryOverrides,
    tracker: RetryOverrides,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct RetryOverrides {
    max_attempts: Option<u32>,
    strategy: Option<BackoffStrategy>,
    delay_ms: Option<u64>,
    rate_limit_delay_ms: Option<u64>,
}

impl RetryOverrides {
    fn over(self, base: RetrySettings) -> RetrySettings {
        RetrySettings {
            max_attempts: self.max_attempts.unwrap_or(base.max_attempts),
            strategy: self.strategy.unwrap_or(base.strategy),
            delay_ms: self.delay_ms.unwrap_or(base.delay_ms),
            rate_limit_delay_ms: self.rate_limit_delay_ms.unwrap_or(base.rate_limit_delay_ms),
        }
    }
}

impl From<RetryFile> for RetryConfig {
    fn from(file: RetryFile) -> Self {
        let defaults = RetryConfig::default();
        RetryConfig {
            model: file.model.over(defaults.model),
            tracker: file.tracker.over(defaults.tracker),
        }
    }
}

impl RetrySettings {
    pub fn policy(&self) -> RetryPolicy {
        let backoff = |ms: u64| match self.strategy {
            BackoffStrategy::Fixed => Backoff::Fixed(Duration::from_millis(ms)),
            BackoffStrategy::Exponential => Backoff::Exponential {
                initial: Duration::from_millis(ms),
                factor: 2,
                max: MAX_BACKOFF,
            },
        };
        RetryPolicy {
            max_attempts: self.max_attempts,
            backoff: backoff(self.delay_ms),
            rate_limit_backoff: backoff(self.rate_limit_delay_ms),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub path: PathBuf,
    /// Diffs above this size are truncated before they reach the model.
    pub max_diff_bytes: usize,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("report.md"),
            max_diff_bytes: 50_000,
        }
    }
}

/// Validated settings for the model endpoint.
#[derive(Debug, Clone)]
pub struct ModelSettings {
    pub provider: Provider,
    pub model: String,
    pub base_url: String,
    pub api_key: String,
    pub temperature: f64,
    pub max_output_tokens: u32,
    pub timeout: Duration,
    pub project: Option<String>,
    pub region: String,
}

/// Validated settings for the issue tracker.
#[derive(Debug, Clone)]
pub struct TrackerSettings {
    pub api_base: String,
    pub token: String,
    pub owner: String,
    pub repo: String,
    pub timeout: Duration,
}

impl Config {
    /// Load settings from `path` (defaults when the file doesn't exist) and
    /// overlay credentials from the process environment.
    pub fn load(path: &Path) -> Result<Config, ConfigError> {
        let mut config = if path.exists() {
            Self::load_from(path)?
        } else {
            Config::default()
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn load_from(path: &Path) -> Result<Config, ConfigError> {
        let contents = fs::read_to_string(path)?;
        let config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Overlay environment values using `lookup`. Empty values count as unset.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(provider) = var("MODEL_PROVIDER") {
            self.model.provider = provider.parse().map_err(ConfigError::Invalid)?;
        }
        if let Some(name) = var("MODEL_NAME") {
            self.model.name = Some(name);
        }
        if let Some(endpoint) = var("MODEL_ENDPOINT") {
            self.model.endpoint = Some(endpoint);
        }
        if let Some(project) = var("GOOGLE_CLOUD_PROJECT") {
            self.model.project = Some(project);
        }
        if let Some(region) = var("GOOGLE_CLOUD_REGION") {
            self.model.region = Some(region);
        }
        self.model.api_key = var("AI_STUDIO_API_KEY")
            .or_else(|| var("MODEL_API_KEY"))
            .or(self.model.api_key.take());

        self.tracker.token = var("GH_TOKEN")
            .or_else(|| var("GITHUB_TOKEN"))
            .or(self.tracker.token.take());
        self.tracker.repository = var("GITHUB_REPOSITORY").or(self.tracker.repository.take());
        Ok(())
    }

    /// Reject settings that can never work, independent of which stage runs.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, settings) in [("model", &self.retry.model), ("tracker", &self.retry.tracker)] {
            if settings.max_attempts == 0 {
                return Err(ConfigError::Invalid(format!(
                    "retry.{name}.max_attempts must be > 0"
                )));
            }
        }
        if !(0.0..=2.0).contains(&self.model.temperature) {
            return Err(ConfigError::Invalid(format!(
                "model.temperature must be within 0.0..=2.0, got {}",
                self.model.temperature
            )));
        }
        if self.report.max_diff_bytes == 0 {
            return Err(ConfigError::Invalid(
                "report.max_diff_bytes must be > 0".to_string(),
            ));
        }
        Ok(())
    }

    pub fn model_settings(&self) -> Result<ModelSettings, ConfigError> {
        let model = &self.model;
        let api_key = model
            .api_key
            .clone()
            .ok_or(ConfigError::MissingVar("AI_STUDIO_API_KEY"))?;
        let project = model.project.clone();
        if model.provider == Provider::Vertex && project.is_none() {
            return Err(ConfigError::MissingVar("GOOGLE_CLOUD_PROJECT"));
        }

        Ok(ModelSettings {
            provider: model.provider,
            model: model
                .name
                .clone()
                .unwrap_or_else(|| model.provider.default_model().to_string()),
            base_url: model
                .endpoint
                .clone()
                .unwrap_or_else(|| model.provider.default_base_url().to_string())
                .trim_end_matches('/')
                .to_string(),
            api_key,
            temperature: model.temperature,
            max_output_tokens: model.max_output_tokens,
            timeout: Duration::from_secs(model.timeout_secs),
            project,
            region: model
                .region
                .clone()
                .unwrap_or_else(|| "us-central1".to_string()),
        })
    }

    pub fn tracker_settings(&self) -> Result<TrackerSettings, ConfigError> {
        let tracker = &self.tracker;
        let token = tracker
            .token
            .clone()
            .ok_or(ConfigError::MissingVar("GH_TOKEN"))?;
        let repository = tracker
            .repository
            .as_deref()
            .ok_or(ConfigError::MissingVar("GITHUB_REPOSITORY"))?;
        let (owner, repo) = parse_repository(repository)?;

        Ok(TrackerSettings {
            api_base: tracker.api_base.trim_end_matches('/').to_string(),
            token,
            owner,
            repo,
            timeout: Duration::from_secs(tracker.timeout_secs),
        })
    }
}

/// Split an `owner/repo` identifier.
pub fn parse_repository(value: &str) -> Result<(String, String), ConfigError> {
    let invalid = || ConfigError::Invalid(format!("expected owner/repo, got {value:?}"));
    let (owner, repo) = value.trim().split_once('/').ok_or_else(invalid)?;
    if owner.is_empty() || repo.is_empty() || repo.contains('/') {
        return Err(invalid());
    }
    Ok((owner.to_string(), repo.to_string()))
}
