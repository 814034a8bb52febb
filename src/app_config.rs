use anyhow::{Context, Result, anyhow};
use log::warn;
use serde::{Deserialize, Serialize};
use std::default::Default;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::time::Duration;

/// Application configuration module
/// This module handles the application configuration including loading,
/// validating and saving configuration settings.
/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Config {
    /// Caption extraction and parsing settings
    #[serde(default)]
    pub caption: CaptionConfig,

    /// Playback synchronization settings
    #[serde(default)]
    pub sync: SyncConfig,

    /// Tokenizer service settings
    #[serde(default)]
    pub tokenizer: TokenizerConfig,

    /// Host element discovery settings
    #[serde(default)]
    pub discovery: DiscoveryConfig,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// What to do with a caption entry whose start lies after its end
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum InvertedCuePolicy {
    /// Skip the entry
    #[default]
    Drop,
    /// Exchange start and end
    Swap,
    /// Collapse the cue to its start instant
    Clamp,
}

/// Which cue wins when several intervals contain the playback position
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum OverlapPolicy {
    /// The earliest cue in track order
    #[default]
    FirstInSequence,
    /// The cue with the latest start time
    MostRecentlyStarted,
}

/// Caption extraction configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CaptionConfig {
    /// Marker substring identifying caption-fetch URLs (matched case-insensitively)
    #[serde(default = "default_url_marker")]
    pub url_marker: String,

    /// Number of leading cues sampled for character-range language detection
    #[serde(default = "default_language_sample_size")]
    pub language_sample_size: usize,

    /// Language assumed when no detection strategy produces a signal
    #[serde(default = "default_language")]
    pub default_language: String,

    /// Handling of entries with start > end
    #[serde(default)]
    pub inverted_cue_policy: InvertedCuePolicy,
}

impl Default for CaptionConfig {
    fn default() -> Self {
        Self {
            url_marker: default_url_marker(),
            language_sample_size: default_language_sample_size(),
            default_language: default_language(),
            inverted_cue_policy: InvertedCuePolicy::default(),
        }
    }
}

/// Synchronizer configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SyncConfig {
    /// Poll cadence for the video clock in milliseconds
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Tie-break rule for overlapping cues
    #[serde(default)]
    pub overlap_policy: OverlapPolicy,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            overlap_policy: OverlapPolicy::default(),
        }
    }
}

impl SyncConfig {
    /// Poll cadence as a duration
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Tokenizer service configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TokenizerConfig {
    /// Service base URL
    #[serde(default = "default_tokenizer_endpoint")]
    pub endpoint: String,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for TokenizerConfig {
    fn default() -> Self {
        Self {
            endpoint: default_tokenizer_endpoint(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Host element discovery configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct DiscoveryConfig {
    /// Delay between discovery attempts in milliseconds
    #[serde(default = "default_retry_interval_ms")]
    pub retry_interval_ms: u64,

    /// Attempts before the platform is declared unsupported
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            retry_interval_ms: default_retry_interval_ms(),
            max_attempts: default_max_attempts(),
        }
    }
}

impl DiscoveryConfig {
    /// Delay between attempts as a duration
    pub fn retry_interval(&self) -> Duration {
        Duration::from_millis(self.retry_interval_ms)
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

fn default_url_marker() -> String {
    "/?o=".to_string()
}

fn default_language_sample_size() -> usize {
    5
}

fn default_language() -> String {
    "en".to_string()
}

fn default_poll_interval_ms() -> u64 {
    100
}

fn default_tokenizer_endpoint() -> String {
    "http://localhost:8080".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_retry_interval_ms() -> u64 {
    250
}

fn default_max_attempts() -> u32 {
    40
}

impl Config {
    /// Load the configuration from a JSON file, creating a default one if it does not exist
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if path.exists() {
            let file = File::open(path)
                .with_context(|| format!("Failed to open config file: {}", path.display()))?;
            let reader = BufReader::new(file);
            let config: Config = serde_json::from_reader(reader)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
            return Ok(config);
        }

        warn!("Config file not found at '{}', creating default config.", path.display());
        let config = Config::default();
        config.save(path)?;
        Ok(config)
    }

    /// Write the configuration as pretty JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let config_json = serde_json::to_string_pretty(self)
            .context("Failed to serialize config to JSON")?;
        std::fs::write(path, config_json)
            .with_context(|| format!("Failed to write config to file: {}", path.display()))?;
        Ok(())
    }

    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        if self.caption.url_marker.is_empty() {
            return Err(anyhow!("Caption URL marker must not be empty"));
        }

        crate::language_utils::validate_language_code(&self.caption.default_language)
            .context("Default caption language is not an ISO 639-1 code")?;

        if self.sync.poll_interval_ms == 0 {
            return Err(anyhow!("Poll interval must be greater than zero"));
        }

        if self.discovery.retry_interval_ms == 0 || self.discovery.max_attempts == 0 {
            return Err(anyhow!("Host discovery needs a non-zero retry interval and attempt count"));
        }

        url::Url::parse(&self.tokenizer.endpoint)
            .with_context(|| format!("Invalid tokenizer endpoint: {}", self.tokenizer.endpoint))?;

        Ok(())
    }
}
