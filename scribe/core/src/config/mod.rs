//! TOML Configuration File Support
//!
//! Centralized configuration loading for scribe, supporting a TOML
//! configuration file at `~/.config/scribe/scribe.toml`.
//!
//! # Configuration Priority
//!
//! Configuration values are loaded with the following priority (highest first):
//! 1. CLI arguments (via [`ConfigOverrides`])
//! 2. Environment variables (`SCRIBE_*`)
//! 3. TOML configuration file
//! 4. Default values
//!
//! # XDG Base Directory Compliance
//!
//! - `$XDG_CONFIG_HOME/scribe/scribe.toml` (typically `~/.config/scribe/scribe.toml`)
//!
//! # Example Configuration
//!
//! ```toml
//! [playback]
//! min_delay_ms = 1
//! max_delay_ms = 3
//! delete_chunk_min = 20
//! delete_chunk_steps = 8
//! append_chunk_min = 100
//! append_chunk_steps = 10
//!
//! [checkpoints]
//! capacity = 30
//! ledger_path = "/home/me/.local/share/scribe/checkpoints.json"
//!
//! [agent]
//! max_chain_depth = 10
//! tool_timeout_secs = 120
//! auto_run = false
//! file_mutation_tools = ["write_file", "create_file", "replace_in_file"]
//! continuation_prefixes = ["sandbox_"]
//!
//! [stream]
//! sentinels = ["[DONE]", "[END]"]
//! ```

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::checkpoint::DEFAULT_CAPACITY;
use crate::playback::PlaybackTiming;
use crate::session::DEFAULT_MAX_CHAIN_DEPTH;
use crate::streaming::DEFAULT_SENTINELS;
use crate::tools::ToolPolicy;

/// Default time allowed for one tool execution
pub const DEFAULT_TOOL_TIMEOUT: Duration = Duration::from_secs(120);

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur when loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("Failed to read config file at {path}: {source}")]
    ReadError {
        /// The path that was attempted
        path: PathBuf,
        /// The underlying IO error
        source: std::io::Error,
    },

    /// Failed to parse TOML
    #[error("Failed to parse TOML config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

// =============================================================================
// Configuration Source Tracking
// =============================================================================

/// Tracks where a configuration value came from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigSource {
    /// Value from command-line argument
    Cli,
    /// Value from environment variable
    Env,
    /// Value from TOML configuration file
    File,
    /// Default value
    Default,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cli => write!(f, "CLI"),
            Self::Env => write!(f, "environment"),
            Self::File => write!(f, "config file"),
            Self::Default => write!(f, "default"),
        }
    }
}

// =============================================================================
// TOML Configuration Structures
// =============================================================================

/// Playback section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackToml {
    /// Shortest pause between snapshots in milliseconds
    pub min_delay_ms: Option<u64>,

    /// Longest pause between snapshots in milliseconds
    pub max_delay_ms: Option<u64>,

    /// Smallest deletion chunk in characters
    pub delete_chunk_min: Option<i64>,

    /// Target number of deletion steps
    pub delete_chunk_steps: Option<i64>,

    /// Smallest insertion chunk in characters
    pub append_chunk_min: Option<i64>,

    /// Target number of insertion steps
    pub append_chunk_steps: Option<i64>,
}

/// Checkpoints section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckpointsToml {
    /// Number of checkpoints retained
    pub capacity: Option<usize>,

    /// Where the durable ledger lives
    pub ledger_path: Option<String>,
}

/// Agent section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentToml {
    /// Maximum chained tool continuations per user prompt
    pub max_chain_depth: Option<u32>,

    /// Time allowed per tool execution in seconds
    pub tool_timeout_secs: Option<u64>,

    /// Run every extracted tool call without confirmation
    pub auto_run: Option<bool>,

    /// Tools that mutate files
    pub file_mutation_tools: Option<Vec<String>>,

    /// Name prefixes of tools that continue the chain
    pub continuation_prefixes: Option<Vec<String>>,
}

/// Stream section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamToml {
    /// End-of-stream tokens dropped silently
    pub sentinels: Option<Vec<String>>,
}

/// Top-level TOML configuration structure
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScribeToml {
    /// Playback section
    pub playback: PlaybackToml,

    /// Checkpoints section
    pub checkpoints: CheckpointsToml,

    /// Agent section
    pub agent: AgentToml,

    /// Stream section
    pub stream: StreamToml,
}

// =============================================================================
// Main Configuration Struct
// =============================================================================

/// Checkpoint history settings
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CheckpointSettings {
    /// Number of checkpoints retained
    pub capacity: usize,
    /// Durable ledger location; `None` keeps history in memory only
    pub ledger_path: Option<PathBuf>,
}

impl Default for CheckpointSettings {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            ledger_path: None,
        }
    }
}

/// Tool execution and chaining settings
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AgentSettings {
    /// Maximum chained tool continuations per user prompt
    pub max_chain_depth: u32,
    /// Time allowed per tool execution
    pub tool_timeout: Duration,
    /// Gating and continuation policy
    pub policy: ToolPolicy,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            max_chain_depth: DEFAULT_MAX_CHAIN_DEPTH,
            tool_timeout: DEFAULT_TOOL_TIMEOUT,
            policy: ToolPolicy::default(),
        }
    }
}

/// Stream decoding settings
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StreamSettings {
    /// End-of-stream tokens dropped silently
    pub sentinels: Vec<String>,
}

impl Default for StreamSettings {
    fn default() -> Self {
        Self {
            sentinels: DEFAULT_SENTINELS.iter().map(|s| (*s).to_string()).collect(),
        }
    }
}

/// Centralized configuration for scribe
///
/// Use [`load_config`] to load configuration with proper priority handling.
#[derive(Clone, Debug)]
pub struct ScribeConfig {
    /// Playback pacing and chunking
    pub playback: PlaybackTiming,

    /// Checkpoint history
    pub checkpoints: CheckpointSettings,

    /// Tool execution and chaining
    pub agent: AgentSettings,

    /// Stream decoding
    pub stream: StreamSettings,

    /// Path to the config file that was loaded (if any)
    pub config_file_path: Option<PathBuf>,

    /// Source of configuration values
    source: ConfigSource,
}

impl Default for ScribeConfig {
    fn default() -> Self {
        Self {
            playback: PlaybackTiming::default(),
            checkpoints: CheckpointSettings::default(),
            agent: AgentSettings::default(),
            stream: StreamSettings::default(),
            config_file_path: None,
            source: ConfigSource::Default,
        }
    }
}

impl ScribeConfig {
    /// Create a new configuration with default values
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the primary source of this configuration
    #[must_use]
    pub fn source(&self) -> ConfigSource {
        self.source
    }

    /// Set the configuration source
    pub fn set_source(&mut self, source: ConfigSource) {
        self.source = source;
    }

    /// Check values that cannot be clamped into something meaningful
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] for a zero checkpoint capacity
    /// or a zero tool timeout.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.checkpoints.capacity == 0 {
            return Err(ConfigError::ValidationError(
                "checkpoints.capacity must be at least 1".to_string(),
            ));
        }
        if self.agent.tool_timeout.is_zero() {
            return Err(ConfigError::ValidationError(
                "agent.tool_timeout_secs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

// =============================================================================
// Configuration Loading
// =============================================================================

/// Get the default configuration file path
///
/// Returns `$XDG_CONFIG_HOME/scribe/scribe.toml` or
/// `~/.config/scribe/scribe.toml` if `XDG_CONFIG_HOME` is not set.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("scribe").join("scribe.toml"))
}

/// Default location of the durable checkpoint ledger
#[must_use]
pub fn default_ledger_path() -> Option<PathBuf> {
    dirs::data_dir().map(|p| p.join("scribe").join("checkpoints.json"))
}

/// Load configuration from all sources with proper priority
///
/// # Errors
///
/// Returns an error if the config file exists but cannot be parsed, or if the
/// resulting values are invalid. A missing config file is not an error.
pub fn load_config() -> Result<ScribeConfig, ConfigError> {
    load_config_from_path(default_config_path())
}

/// Load configuration from a specific path
///
/// # Arguments
///
/// * `path` - Optional path to the configuration file. If `None`, only defaults
///   and environment variables are used.
///
/// # Errors
///
/// Returns an error if the specified config file cannot be read or parsed, or
/// if the resulting values are invalid.
pub fn load_config_from_path(path: Option<PathBuf>) -> Result<ScribeConfig, ConfigError> {
    let mut config = ScribeConfig::default();

    if let Some(ref config_path) = path {
        if config_path.exists() {
            let toml_content =
                std::fs::read_to_string(config_path).map_err(|e| ConfigError::ReadError {
                    path: config_path.clone(),
                    source: e,
                })?;

            let toml_config: ScribeToml = toml::from_str(&toml_content)?;
            apply_toml_config(&mut config, &toml_config);
            config.config_file_path = Some(config_path.clone());
            config.source = ConfigSource::File;

            tracing::info!(
                path = %config_path.display(),
                "Loaded configuration from file"
            );
        } else {
            tracing::debug!(
                path = %config_path.display(),
                "Config file not found, using defaults"
            );
        }
    }

    apply_env_config(&mut config);
    config.playback = config.playback.sanitized();
    config.validate()?;

    Ok(config)
}

/// Negative or zero chunk settings clamp to 1
fn chunk_setting(value: i64) -> usize {
    usize::try_from(value.max(1)).unwrap_or(1)
}

/// Apply TOML configuration values to the config struct
fn apply_toml_config(config: &mut ScribeConfig, toml: &ScribeToml) {
    // Playback settings
    if let Some(ms) = toml.playback.min_delay_ms {
        config.playback.min_delay = Duration::from_millis(ms);
    }
    if let Some(ms) = toml.playback.max_delay_ms {
        config.playback.max_delay = Duration::from_millis(ms);
    }
    if let Some(n) = toml.playback.delete_chunk_min {
        config.playback.delete_chunk_min = chunk_setting(n);
    }
    if let Some(n) = toml.playback.delete_chunk_steps {
        config.playback.delete_chunk_steps = chunk_setting(n);
    }
    if let Some(n) = toml.playback.append_chunk_min {
        config.playback.append_chunk_min = chunk_setting(n);
    }
    if let Some(n) = toml.playback.append_chunk_steps {
        config.playback.append_chunk_steps = chunk_setting(n);
    }

    // Checkpoint settings
    if let Some(capacity) = toml.checkpoints.capacity {
        config.checkpoints.capacity = capacity;
    }
    if let Some(ref path) = toml.checkpoints.ledger_path {
        config.checkpoints.ledger_path = Some(PathBuf::from(path));
    }

    // Agent settings
    if let Some(depth) = toml.agent.max_chain_depth {
        config.agent.max_chain_depth = depth;
    }
    if let Some(secs) = toml.agent.tool_timeout_secs {
        config.agent.tool_timeout = Duration::from_secs(secs);
    }
    if let Some(auto_run) = toml.agent.auto_run {
        config.agent.policy.auto_run = auto_run;
    }
    if let Some(ref tools) = toml.agent.file_mutation_tools {
        config.agent.policy.file_mutation_tools.clone_from(tools);
    }
    if let Some(ref prefixes) = toml.agent.continuation_prefixes {
        config.agent.policy.continuation_prefixes.clone_from(prefixes);
    }

    // Stream settings
    if let Some(ref sentinels) = toml.stream.sentinels {
        config.stream.sentinels.clone_from(sentinels);
    }
}

/// Apply environment variable overrides to the config
fn apply_env_config(config: &mut ScribeConfig) {
    // Playback settings from environment
    if let Ok(delay) = std::env::var("SCRIBE_PLAYBACK_MIN_DELAY_MS") {
        if let Ok(ms) = delay.parse::<u64>() {
            config.playback.min_delay = Duration::from_millis(ms);
            config.source = ConfigSource::Env;
        }
    }
    if let Ok(delay) = std::env::var("SCRIBE_PLAYBACK_MAX_DELAY_MS") {
        if let Ok(ms) = delay.parse::<u64>() {
            config.playback.max_delay = Duration::from_millis(ms);
            config.source = ConfigSource::Env;
        }
    }

    // Checkpoint settings from environment
    if let Ok(capacity) = std::env::var("SCRIBE_CHECKPOINT_CAPACITY") {
        if let Ok(n) = capacity.parse::<usize>() {
            config.checkpoints.capacity = n;
            config.source = ConfigSource::Env;
        }
    }
    if let Ok(path) = std::env::var("SCRIBE_LEDGER_PATH") {
        if !path.is_empty() {
            config.checkpoints.ledger_path = Some(PathBuf::from(path));
            config.source = ConfigSource::Env;
        }
    }

    // Agent settings from environment
    if let Ok(depth) = std::env::var("SCRIBE_MAX_CHAIN_DEPTH") {
        if let Ok(n) = depth.parse::<u32>() {
            config.agent.max_chain_depth = n;
            config.source = ConfigSource::Env;
        }
    }
    if let Ok(timeout) = std::env::var("SCRIBE_TOOL_TIMEOUT") {
        if let Ok(secs) = timeout.parse::<u64>() {
            config.agent.tool_timeout = Duration::from_secs(secs);
            config.source = ConfigSource::Env;
        }
    }
    if let Ok(auto_run) = std::env::var("SCRIBE_AUTO_RUN") {
        config.agent.policy.auto_run = auto_run != "0" && auto_run.to_lowercase() != "false";
        config.source = ConfigSource::Env;
    }
}

// =============================================================================
// CLI Override Support
// =============================================================================

/// Builder for applying CLI overrides to configuration
///
/// Use this after [`load_config`] to apply command-line argument overrides.
#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    /// Ledger path override
    pub ledger_path: Option<PathBuf>,

    /// Maximum chain depth override
    pub max_chain_depth: Option<u32>,

    /// Auto-run override
    pub auto_run: Option<bool>,

    /// Minimum playback delay override (milliseconds)
    pub min_delay_ms: Option<u64>,

    /// Maximum playback delay override (milliseconds)
    pub max_delay_ms: Option<u64>,
}

impl ConfigOverrides {
    /// Create a new empty set of overrides
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set ledger path override
    #[must_use]
    pub fn with_ledger_path(mut self, path: PathBuf) -> Self {
        self.ledger_path = Some(path);
        self
    }

    /// Set maximum chain depth override
    #[must_use]
    pub fn with_max_chain_depth(mut self, depth: u32) -> Self {
        self.max_chain_depth = Some(depth);
        self
    }

    /// Set auto-run override
    #[must_use]
    pub fn with_auto_run(mut self, auto_run: bool) -> Self {
        self.auto_run = Some(auto_run);
        self
    }

    /// Set playback delay range override
    #[must_use]
    pub fn with_delay_ms(mut self, min: u64, max: u64) -> Self {
        self.min_delay_ms = Some(min);
        self.max_delay_ms = Some(max);
        self
    }

    /// Apply overrides to a configuration
    pub fn apply(&self, config: &mut ScribeConfig) {
        if self.ledger_path.is_some()
            || self.max_chain_depth.is_some()
            || self.auto_run.is_some()
            || self.min_delay_ms.is_some()
            || self.max_delay_ms.is_some()
        {
            config.source = ConfigSource::Cli;
        }

        if let Some(ref path) = self.ledger_path {
            config.checkpoints.ledger_path = Some(path.clone());
        }

        if let Some(depth) = self.max_chain_depth {
            config.agent.max_chain_depth = depth;
        }

        if let Some(auto_run) = self.auto_run {
            config.agent.policy.auto_run = auto_run;
        }

        if let Some(ms) = self.min_delay_ms {
            config.playback.min_delay = Duration::from_millis(ms);
        }

        if let Some(ms) = self.max_delay_ms {
            config.playback.max_delay = Duration::from_millis(ms);
        }

        config.playback = config.playback.sanitized();
    }
}

// =============================================================================
// Tests
// =============================================================================
