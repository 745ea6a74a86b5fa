//! Application configuration.
//!
//! Configuration is loaded from a TOML file at:
//! 1. `$MAILSCOPE_CONFIG` (environment variable)
//! 2. `~/.config/mailscope/config.toml` (Linux/macOS)
//!    `%APPDATA%\mailscope\config.toml` (Windows)
//! 3. Built-in defaults

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Per-job analysis parameters.
    pub analysis: AnalysisConfig,
    /// Report assembly knobs (top-N list sizes).
    pub report: ReportConfig,
    /// Job scheduling and safety limits.
    pub job: JobConfig,
    /// Logging behavior.
    pub logging: LoggingConfig,
}

/// Parameters for one analysis run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Mailbox folder to analyze.
    pub folder: String,
    /// Maximum number of messages to fetch.
    pub limit: usize,
    /// Parse attachment metadata per message.
    pub include_attachments: bool,
    /// Run the sentiment/language scorers.
    pub include_sentiment: bool,
    /// Fall back to stripping the HTML body when no plain-text part exists.
    pub parse_html_body: bool,
}

/// How many entries the assembled top-N lists retain.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub top_senders: usize,
    pub top_domains: usize,
    pub top_keywords: usize,
    pub top_threads: usize,
    pub top_attachment_types: usize,
    /// Vocabulary cap for the keyword accumulator; tokens beyond this
    /// are pruned by frequency to bound memory on large mailboxes.
    pub max_vocabulary: usize,
}

/// Job lifecycle limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JobConfig {
    /// Overall wall-clock budget per job, in seconds. Expiry fails the job.
    pub timeout_secs: u64,
    /// Status writes happen at most once per this many messages.
    pub progress_every: u64,
}

/// Logging behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "error", "warn", "info", "debug", "trace".
    pub level: String,
    /// Also write logs to `<cache_dir>/mailscope.log`.
    pub log_to_file: bool,
    /// Override cache directory for logs.
    pub cache_dir: Option<PathBuf>,
}

// ── Default implementations ─────────────────────────────────────

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            folder: "INBOX".to_string(),
            limit: 1000,
            include_attachments: true,
            include_sentiment: true,
            parse_html_body: true,
        }
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            top_senders: 20,
            top_domains: 20,
            top_keywords: 50,
            top_threads: 10,
            top_attachment_types: 10,
            max_vocabulary: 50_000,
        }
    }
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 600,
            progress_every: 32,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            log_to_file: false,
            cache_dir: None,
        }
    }
}

// ── Load / save ─────────────────────────────────────────────────

/// Load configuration, searching standard locations.
///
/// Returns the default configuration if no file is found or on parse error.
pub fn load_config() -> Config {
    if let Some(path) = config_file_path() {
        if path.exists() {
            match std::fs::read_to_string(&path) {
                Ok(contents) => match toml::from_str::<Config>(&contents) {
                    Ok(cfg) => {
                        tracing::info!(path = %path.display(), "Loaded config");
                        return cfg;
                    }
                    Err(e) => {
                        tracing::warn!(
                            path = %path.display(),
                            error = %e,
                            "Failed to parse config, using defaults"
                        );
                    }
                },
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "Failed to read config file, using defaults"
                    );
                }
            }
        }
    }
    Config::default()
}

/// Save configuration to the standard location.
pub fn save_config(config: &Config) -> anyhow::Result<()> {
    let path = config_file_path()
        .ok_or_else(|| anyhow::anyhow!("Could not determine config file path"))?;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let contents = toml::to_string_pretty(config)?;
    std::fs::write(&path, contents)?;
    tracing::info!(path = %path.display(), "Saved config");
    Ok(())
}

/// Determine the config file path (checking env var first, then standard dirs).
pub fn config_file_path() -> Option<PathBuf> {
    if let Ok(env_path) = std::env::var("MAILSCOPE_CONFIG") {
        return Some(PathBuf::from(env_path));
    }

    dirs::config_dir().map(|d| d.join("mailscope").join("config.toml"))
}

/// Return the cache directory for logs.
pub fn cache_dir(config: &Config) -> PathBuf {
    if let Some(ref dir) = config.logging.cache_dir {
        return dir.clone();
    }
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("mailscope")
}

/// Return the log file path.
pub fn log_file_path(config: &Config) -> PathBuf {
    cache_dir(config).join("mailscope.log")
}
