use anyhow::{anyhow, bail, Context, Result};
use dirs::config_dir;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure for ghmirror
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    /// Clone retry and backoff settings
    #[serde(default)]
    pub clone: CloneConfig,

    /// Git binary settings
    #[serde(default)]
    pub git: GitConfig,

    /// GitHub API settings
    #[serde(default)]
    pub github: GitHubConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Process exit behaviour
    #[serde(default)]
    pub exit: ExitConfig,
}

/// Clone retry configuration
#[derive(Debug, Deserialize, Clone)]
pub struct CloneConfig {
    /// Total clone attempts per repository, including the first
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay inserted before every clone attempt
    #[serde(default = "default_pre_clone_delay")]
    pub pre_clone_delay: String, // "0s", "5s"

    /// Wait after the first failed attempt
    #[serde(default = "default_initial_backoff")]
    pub initial_backoff: String, // "10s"

    /// Growth factor applied to the wait after each further failure
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Upper bound for a single wait
    #[serde(default = "default_max_backoff")]
    pub max_backoff: String, // "2m"
}

/// Git binary configuration
#[derive(Debug, Deserialize, Clone)]
pub struct GitConfig {
    /// Name or path of the git executable
    #[serde(default = "default_git_binary")]
    pub binary: String,
}

/// GitHub configuration
#[derive(Debug, Deserialize, Clone, Default)]
pub struct GitHubConfig {
    /// API base URL override (GitHub Enterprise)
    #[serde(default)]
    pub api_url: Option<String>,
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    /// Log level used when RUST_LOG is unset
    #[serde(default = "default_log_level")]
    pub level: String, // "info"
}

/// Exit code configuration
#[derive(Debug, Deserialize, Clone, Default)]
pub struct ExitConfig {
    /// Exit with a nonzero status when any repository failed
    #[serde(default)]
    pub fail_on_repo_error: bool,
}

/// Clone retry schedule resolved from [`CloneConfig`]
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub pre_clone_delay: Duration,
    pub initial_backoff: Duration,
    pub backoff_multiplier: f64,
    pub max_backoff: Duration,
}

// Default value functions
fn default_max_attempts() -> u32 {
    5
}
fn default_pre_clone_delay() -> String {
    "0s".to_string()
}
fn default_initial_backoff() -> String {
    "10s".to_string()
}
fn default_backoff_multiplier() -> f64 {
    2.0
}
fn default_max_backoff() -> String {
    "2m".to_string()
}
fn default_git_binary() -> String {
    "git".to_string()
}
fn default_log_level() -> String {
    "info".to_string()
}

// Default implementations
impl Default for CloneConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            pre_clone_delay: default_pre_clone_delay(),
            initial_backoff: default_initial_backoff(),
            backoff_multiplier: default_backoff_multiplier(),
            max_backoff: default_max_backoff(),
        }
    }
}

impl Default for GitConfig {
    fn default() -> Self {
        Self {
            binary: default_git_binary(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Parse duration strings like "30s", "5m", "1h", "2d" or bare seconds
pub fn parse_duration(duration_str: &str) -> Result<Duration> {
    let duration_str = duration_str.trim().to_lowercase();

    let (value, unit_secs) = if let Some(value) = duration_str.strip_suffix('s') {
        (value.parse::<u64>().context("Invalid seconds value")?, 1)
    } else if let Some(value) = duration_str.strip_suffix('m') {
        (value.parse::<u64>().context("Invalid minutes value")?, 60)
    } else if let Some(value) = duration_str.strip_suffix('h') {
        (value.parse::<u64>().context("Invalid hours value")?, 3600)
    } else if let Some(value) = duration_str.strip_suffix('d') {
        (value.parse::<u64>().context("Invalid days value")?, 86400)
    } else {
        let value = duration_str
            .parse::<u64>()
            .context("Invalid duration format. Use format like '10s', '2m', '1h'")?;
        (value, 1)
    };

    let seconds = value
        .checked_mul(unit_secs)
        .ok_or_else(|| anyhow!("Duration {:?} is too large", duration_str))?;

    Ok(Duration::from_secs(seconds))
}

impl RetryPolicy {
    /// Wait before the next attempt after `failed_attempts` consecutive failures
    pub fn backoff_after(&self, failed_attempts: u32) -> Duration {
        if failed_attempts == 0 {
            return Duration::ZERO;
        }

        let exponent = (failed_attempts - 1).min(i32::MAX as u32) as i32;
        let scaled = self.initial_backoff.as_secs_f64() * self.backoff_multiplier.powi(exponent);
        let capped = scaled.min(self.max_backoff.as_secs_f64());

        if capped.is_finite() && capped > 0.0 {
            // Near u64::MAX seconds the f64 rounds past what Duration can hold
            Duration::try_from_secs_f64(capped).unwrap_or(self.max_backoff)
        } else {
            Duration::ZERO
        }
    }

    /// A schedule with no waits, used where delays would only slow things down
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            pre_clone_delay: Duration::ZERO,
            initial_backoff: Duration::ZERO,
            backoff_multiplier: 1.0,
            max_backoff: Duration::ZERO,
        }
    }
}

impl Config {
    /// Load configuration from the default location, falling back to defaults
    pub fn load_or_default() -> Result<Self> {
        let config_path = Self::default_config_path()?;

        if config_path.exists() {
            Self::load(&config_path)
        } else {
            tracing::debug!("No configuration at {:?}, using defaults", config_path);
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        let config: Config = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;

        config
            .validate()
            .with_context(|| format!("Invalid config file: {:?}", path))?;

        Ok(config)
    }

    /// Get the default configuration file path (XDG compliant)
    pub fn default_config_path() -> Result<PathBuf> {
        let config_dir = config_dir().context("Failed to get user config directory")?;

        Ok(config_dir.join("ghmirror").join("config.yml"))
    }

    /// Check value ranges that serde cannot express
    pub fn validate(&self) -> Result<()> {
        if self.clone.max_attempts == 0 {
            bail!("clone.max_attempts must be at least 1");
        }
        if self.clone.backoff_multiplier.is_nan() || self.clone.backoff_multiplier < 1.0 {
            bail!(
                "clone.backoff_multiplier must be >= 1.0, got {}",
                self.clone.backoff_multiplier
            );
        }
        if self.git.binary.trim().is_empty() {
            bail!("git.binary must not be empty");
        }
        self.retry_policy()?;
        Ok(())
    }

    /// Resolve the clone retry schedule
    pub fn retry_policy(&self) -> Result<RetryPolicy> {
        Ok(RetryPolicy {
            max_attempts: self.clone.max_attempts,
            pre_clone_delay: parse_duration(&self.clone.pre_clone_delay)
                .context("Invalid clone.pre_clone_delay")?,
            initial_backoff: parse_duration(&self.clone.initial_backoff)
                .context("Invalid clone.initial_backoff")?,
            backoff_multiplier: self.clone.backoff_multiplier,
            max_backoff: parse_duration(&self.clone.max_backoff)
                .context("Invalid clone.max_backoff")?,
        })
    }
}

/// Expand `~` and environment variables in a user supplied path and normalize it
pub fn expand_local_path(raw: &str) -> Result<PathBuf> {
    let expanded = shellexpand::full(raw)
        .map_err(|e| anyhow!("Failed to expand path {:?}: {}", raw, e))?;

    Ok(path_clean::clean(expanded.as_ref()))
}
