//! Configuration file parsing and management.
//!
//! This module handles loading configuration from TOML files and `RC_*`
//! environment variables, and merging configurations with proper precedence
//! rules.

use crate::error::ReachCheckError;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

/// Configuration loaded from TOML files.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct FileConfig {
    /// Probe and scheduler settings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub probe: Option<ProbeFileConfig>,

    /// Output formatting preferences
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<OutputConfig>,
}

/// `[probe]` section.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ProbeFileConfig {
    /// Probes in flight per chunk
    #[serde(skip_serializing_if = "Option::is_none")]
    pub concurrency: Option<usize>,

    /// Per-attempt timeout (e.g. "2000ms", "2s")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<String>,

    /// Pause between chunks (e.g. "50ms")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chunk_delay: Option<String>,

    /// Only count 2xx responses as reachable
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strict_status: Option<bool>,

    /// Path requested on every host
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
}

/// `[output]` section.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct OutputConfig {
    /// Colored output with progress prefixes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pretty: Option<bool>,

    /// Newline-delimited JSON output
    #[serde(skip_serializing_if = "Option::is_none")]
    pub json: Option<bool>,
}

impl FileConfig {
    /// Overlay the `[probe]` section onto a run configuration.
    ///
    /// Values that fail to parse were already rejected by validation, so they
    /// are simply skipped here.
    pub fn apply_to(&self, mut config: crate::CheckConfig) -> crate::CheckConfig {
        let Some(probe) = &self.probe else {
            return config;
        };

        if let Some(concurrency) = probe.concurrency {
            config = config.with_concurrency(concurrency);
        }
        if let Some(timeout) = probe.timeout.as_deref().and_then(parse_duration) {
            config.timeout = timeout;
        }
        if let Some(delay) = probe.chunk_delay.as_deref().and_then(parse_duration) {
            config.chunk_delay = delay;
        }
        if let Some(strict) = probe.strict_status {
            config.strict_status = strict;
        }
        if let Some(path) = &probe.path {
            config.probe_path = path.clone();
        }
        if let Some(user_agent) = &probe.user_agent {
            config.user_agent = Some(user_agent.clone());
        }

        config
    }
}

/// Configuration discovery and loading functionality.
pub struct ConfigManager {
    /// Whether to log which files were picked up
    pub verbose: bool,
}

impl ConfigManager {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    /// Load configuration from a specific file.
    pub fn load_file<P: AsRef<Path>>(&self, path: P) -> Result<FileConfig, ReachCheckError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ReachCheckError::file_error(
                path.to_string_lossy(),
                "Configuration file not found",
            ));
        }

        let content = fs::read_to_string(path).map_err(|e| {
            ReachCheckError::file_error(
                path.to_string_lossy(),
                format!("Failed to read configuration file: {}", e),
            )
        })?;

        let config: FileConfig = toml::from_str(&content)?;
        self.validate_config(&config)?;

        debug!(path = %path.display(), "loaded configuration file");
        Ok(config)
    }

    /// Discover and load configuration files in precedence order.
    ///
    /// XDG config is lowest, then the home directory file, then the local
    /// file in the current directory.
    pub fn discover_and_load(&self) -> Result<FileConfig, ReachCheckError> {
        let mut merged_config = FileConfig::default();
        let mut loaded_files = Vec::new();

        let candidates = [
            self.get_xdg_config_path(),
            self.get_global_config_path(),
            self.get_local_config_path(),
        ];

        for path in candidates.into_iter().flatten() {
            match self.load_file(&path) {
                Ok(config) => {
                    merged_config = self.merge_configs(merged_config, config);
                    loaded_files.push(path);
                }
                Err(e) => warn!(path = %path.display(), error = %e, "ignoring configuration file"),
            }
        }

        if self.verbose && loaded_files.len() > 1 {
            for (i, path) in loaded_files.iter().enumerate() {
                let role = if i == loaded_files.len() - 1 {
                    "highest precedence"
                } else {
                    "overridden where set later"
                };
                warn!(path = %path.display(), role, "multiple configuration files found");
            }
        }

        Ok(merged_config)
    }

    /// Get the local configuration file path.
    fn get_local_config_path(&self) -> Option<PathBuf> {
        let candidates = ["./reach-check.toml", "./.reach-check.toml"];

        candidates
            .iter()
            .map(Path::new)
            .find(|path| path.exists())
            .map(Path::to_path_buf)
    }

    /// Get the global configuration file path in the home directory.
    fn get_global_config_path(&self) -> Option<PathBuf> {
        let home = env::var_os("HOME")?;
        [".reach-check.toml", "reach-check.toml"]
            .iter()
            .map(|candidate| Path::new(&home).join(candidate))
            .find(|path| path.exists())
    }

    /// Get the XDG configuration file path.
    fn get_xdg_config_path(&self) -> Option<PathBuf> {
        let config_dir = env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| env::var_os("HOME").map(|home| Path::new(&home).join(".config")))?;

        let path = config_dir.join("reach-check").join("config.toml");
        if path.exists() {
            Some(path)
        } else {
            None
        }
    }

    /// Merge two configurations; values from `higher` win.
    fn merge_configs(&self, lower: FileConfig, higher: FileConfig) -> FileConfig {
        FileConfig {
            probe: match (lower.probe, higher.probe) {
                (Some(mut lower_probe), Some(higher_probe)) => {
                    if higher_probe.concurrency.is_some() {
                        lower_probe.concurrency = higher_probe.concurrency;
                    }
                    if higher_probe.timeout.is_some() {
                        lower_probe.timeout = higher_probe.timeout;
                    }
                    if higher_probe.chunk_delay.is_some() {
                        lower_probe.chunk_delay = higher_probe.chunk_delay;
                    }
                    if higher_probe.strict_status.is_some() {
                        lower_probe.strict_status = higher_probe.strict_status;
                    }
                    if higher_probe.path.is_some() {
                        lower_probe.path = higher_probe.path;
                    }
                    if higher_probe.user_agent.is_some() {
                        lower_probe.user_agent = higher_probe.user_agent;
                    }
                    Some(lower_probe)
                }
                (lower_probe, higher_probe) => higher_probe.or(lower_probe),
            },
            output: match (lower.output, higher.output) {
                (Some(mut lower_output), Some(higher_output)) => {
                    if higher_output.pretty.is_some() {
                        lower_output.pretty = higher_output.pretty;
                    }
                    if higher_output.json.is_some() {
                        lower_output.json = higher_output.json;
                    }
                    Some(lower_output)
                }
                (lower_output, higher_output) => higher_output.or(lower_output),
            },
        }
    }

    /// Validate a configuration for common issues.
    fn validate_config(&self, config: &FileConfig) -> Result<(), ReachCheckError> {
        if let Some(probe) = &config.probe {
            if let Some(concurrency) = probe.concurrency {
                if concurrency == 0 || concurrency > 100 {
                    return Err(ReachCheckError::config("Concurrency must be between 1 and 100"));
                }
            }

            for (key, value) in [("timeout", &probe.timeout), ("chunk_delay", &probe.chunk_delay)] {
                if let Some(value) = value {
                    if parse_duration(value).is_none() {
                        return Err(ReachCheckError::config(format!(
                            "Invalid {} '{}'. Use a format like '2000ms', '2s' or '1m'",
                            key, value
                        )));
                    }
                }
            }

            if let Some(path) = &probe.path {
                if !path.starts_with('/') {
                    return Err(ReachCheckError::config(format!(
                        "Probe path '{}' must start with '/'",
                        path
                    )));
                }
            }
        }

        Ok(())
    }
}

/// Configuration values read from `RC_*` environment variables.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnvConfig {
    pub concurrency: Option<usize>,
    pub timeout: Option<Duration>,
    pub chunk_delay: Option<Duration>,
    pub strict_status: Option<bool>,
    pub path: Option<String>,
    pub pretty: Option<bool>,
    pub json: Option<bool>,
    pub config: Option<String>,
}

impl EnvConfig {
    /// Overlay the environment values onto a run configuration.
    pub fn apply_to(&self, mut config: crate::CheckConfig) -> crate::CheckConfig {
        if let Some(concurrency) = self.concurrency {
            config = config.with_concurrency(concurrency);
        }
        if let Some(timeout) = self.timeout {
            config.timeout = timeout;
        }
        if let Some(delay) = self.chunk_delay {
            config.chunk_delay = delay;
        }
        if let Some(strict) = self.strict_status {
            config.strict_status = strict;
        }
        if let Some(path) = &self.path {
            config.probe_path = path.clone();
        }
        config
    }
}

/// Load configuration from `RC_*` environment variables.
///
/// Invalid values are logged as warnings and ignored.
pub fn load_env_config() -> EnvConfig {
    load_env_config_from(|key| env::var(key).ok())
}

/// Same as [`load_env_config`], reading values through `lookup`.
pub fn load_env_config_from<F>(lookup: F) -> EnvConfig
where
    F: Fn(&str) -> Option<String>,
{
    let mut env_config = EnvConfig::default();

    if let Some(val) = lookup("RC_CONCURRENCY") {
        match val.trim().parse::<usize>() {
            Ok(concurrency) if (1..=100).contains(&concurrency) => {
                env_config.concurrency = Some(concurrency);
            }
            _ => warn!(value = %val, "invalid RC_CONCURRENCY, must be 1-100"),
        }
    }

    for (key, slot) in [
        ("RC_TIMEOUT", &mut env_config.timeout),
        ("RC_CHUNK_DELAY", &mut env_config.chunk_delay),
    ] {
        if let Some(val) = lookup(key) {
            match parse_duration(&val) {
                Some(duration) => *slot = Some(duration),
                None => warn!(key, value = %val, "invalid duration, use a format like '2000ms' or '2s'"),
            }
        }
    }

    for (key, slot) in [
        ("RC_STRICT", &mut env_config.strict_status),
        ("RC_PRETTY", &mut env_config.pretty),
        ("RC_JSON", &mut env_config.json),
    ] {
        if let Some(val) = lookup(key) {
            match parse_bool(&val) {
                Some(flag) => *slot = Some(flag),
                None => warn!(key, value = %val, "invalid boolean, use true/false"),
            }
        }
    }

    if let Some(path) = lookup("RC_PATH") {
        if path.starts_with('/') {
            env_config.path = Some(path);
        } else {
            warn!(value = %path, "invalid RC_PATH, must start with '/'");
        }
    }

    if let Some(config_path) = lookup("RC_CONFIG") {
        if !config_path.trim().is_empty() {
            env_config.config = Some(config_path);
        }
    }

    env_config
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Parse a duration like "2000ms", "2s", "1m" or a bare number of
/// milliseconds.
pub fn parse_duration(value: &str) -> Option<Duration> {
    let value = value.trim().to_lowercase();

    if let Some(ms) = value.strip_suffix("ms") {
        ms.trim().parse::<u64>().ok().map(Duration::from_millis)
    } else if let Some(secs) = value.strip_suffix('s') {
        secs.trim().parse::<u64>().ok().map(Duration::from_secs)
    } else if let Some(mins) = value.strip_suffix('m') {
        mins.trim()
            .parse::<u64>()
            .ok()
            .and_then(|m| m.checked_mul(60))
            .map(Duration::from_secs)
    } else {
        value.parse::<u64>().ok().map(Duration::from_millis)
    }
}
