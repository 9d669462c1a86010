//! ---
//! ems_section: "01-core-functionality"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Shared primitives and utilities for the generator runtime."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationSecondsWithFrac};
use tracing::debug;

use crate::logging::LogFormat;

/// Sites emitted when nothing else is configured.
pub const DEFAULT_SITES: [&str; 3] = ["paris", "lyon", "berlin"];

fn default_interval() -> Duration {
    Duration::from_secs(2)
}

fn default_sites() -> Vec<String> {
    DEFAULT_SITES.iter().map(|site| (*site).to_owned()).collect()
}

fn default_out_path() -> PathBuf {
    PathBuf::from("outbox/raw.energy.jsonl")
}

fn default_log_format() -> LogFormat {
    LogFormat::Pretty
}

/// Primary configuration object for the generator.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub generator: GeneratorConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    pub const ENV_CONFIG_PATH: &'static str = "ECOPULSE_CONFIG";

    /// Load configuration, preferring `ECOPULSE_CONFIG` over the explicit path.
    ///
    /// Falls back to built-in defaults when neither points at a file.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Ok(env_path) = std::env::var(Self::ENV_CONFIG_PATH) {
            if !env_path.trim().is_empty() {
                return Self::from_path(Path::new(env_path.trim()));
            }
        }
        match explicit {
            Some(path) => Self::from_path(path),
            None => Ok(Self::default()),
        }
    }

    fn from_path(path: &Path) -> Result<Self> {
        debug!(config_path = %path.display(), "loading configuration");
        let contents = fs::read_to_string(path)
            .with_context(|| format!("unable to read config file {}", path.display()))?;
        contents
            .parse()
            .with_context(|| format!("failed to load config file {}", path.display()))
    }

    /// Validate structural invariants.
    pub fn validate(&self) -> Result<()> {
        self.generator.validate()
    }
}

impl std::str::FromStr for AppConfig {
    type Err = anyhow::Error;

    fn from_str(content: &str) -> std::result::Result<Self, Self::Err> {
        let config: AppConfig =
            toml::from_str(content).with_context(|| "failed to parse configuration")?;
        config.validate()?;
        Ok(config)
    }
}

/// Emission loop settings.
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratorConfig {
    /// Pause between two ticks.
    #[serde(default = "default_interval", rename = "interval_secs")]
    #[serde_as(as = "DurationSecondsWithFrac<f64>")]
    pub interval: Duration,
    #[serde(default = "default_sites")]
    pub sites: Vec<String>,
    #[serde(default = "default_out_path")]
    pub out_path: PathBuf,
    /// Total readings to emit before stopping. Unbounded when absent.
    #[serde(default)]
    pub max_messages: Option<u64>,
    #[serde(default)]
    pub random_seed: Option<u64>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            interval: default_interval(),
            sites: default_sites(),
            out_path: default_out_path(),
            max_messages: None,
            random_seed: None,
        }
    }
}

impl GeneratorConfig {
    /// Set the tick interval from a real number of seconds.
    pub fn set_interval_secs(&mut self, secs: f64) -> Result<()> {
        self.interval = Duration::try_from_secs_f64(secs).map_err(|_| {
            anyhow!("tick interval must be a finite, non-negative number of seconds, got {secs}")
        })?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.sites.is_empty() {
            return Err(anyhow!("at least one site must be configured"));
        }
        if let Some(blank) = self.sites.iter().position(|site| site.trim().is_empty()) {
            return Err(anyhow!("site #{} has an empty name", blank + 1));
        }
        if self.out_path.as_os_str().is_empty() {
            return Err(anyhow!("output path cannot be empty"));
        }
        if self.max_messages == Some(0) {
            return Err(anyhow!("max_messages must be greater than zero when set"));
        }
        Ok(())
    }
}

/// Split a comma separated site list, trimming whitespace around each name.
pub fn parse_sites(raw: &str) -> Result<Vec<String>> {
    let sites: Vec<String> = raw.split(',').map(|site| site.trim().to_owned()).collect();
    if sites.iter().any(|site| site.is_empty()) {
        return Err(anyhow!("site list '{raw}' contains an empty entry"));
    }
    Ok(sites)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_format")]
    pub format: LogFormat,
    /// Directory for the rolling log file; file logging is off when unset.
    #[serde(default)]
    pub directory: Option<PathBuf>,
    #[serde(default)]
    pub file_prefix: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: default_log_format(),
            directory: None,
            file_prefix: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn defaults_match_reference_setup() {
        let config = AppConfig::default();
        assert_eq!(config.generator.interval, Duration::from_secs(2));
        assert_eq!(config.generator.sites, vec!["paris", "lyon", "berlin"]);
        assert_eq!(
            config.generator.out_path,
            PathBuf::from("outbox/raw.energy.jsonl")
        );
        assert!(config.generator.max_messages.is_none());
        assert!(config.generator.random_seed.is_none());
        config.validate().unwrap();
    }

    #[test]
    fn parses_fractional_interval_from_toml() {
        let config: AppConfig = r#"
            [generator]
            interval_secs = 0.5
            sites = ["oslo"]
            out_path = "data/out.jsonl"
            max_messages = 12
            random_seed = 7

            [logging]
            format = "structured-json"
        "#
        .parse()
        .unwrap();
        assert_eq!(config.generator.interval, Duration::from_millis(500));
        assert_eq!(config.generator.sites, vec!["oslo"]);
        assert_eq!(config.generator.max_messages, Some(12));
        assert_eq!(config.generator.random_seed, Some(7));
        assert_eq!(config.logging.format, LogFormat::StructuredJson);
    }

    #[test]
    fn rejects_empty_site_list() {
        let err = "[generator]\nsites = []\n".parse::<AppConfig>().unwrap_err();
        assert!(err.to_string().contains("at least one site"));
    }

    #[test]
    fn rejects_zero_budget() {
        let mut config = GeneratorConfig::default();
        config.max_messages = Some(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn interval_rejects_negative_and_nan() {
        let mut config = GeneratorConfig::default();
        assert!(config.set_interval_secs(-1.0).is_err());
        assert!(config.set_interval_secs(f64::NAN).is_err());
        config.set_interval_secs(0.25).unwrap();
        assert_eq!(config.interval, Duration::from_millis(250));
    }

    #[test]
    fn parse_sites_trims_entries() {
        assert_eq!(
            parse_sites(" paris, lyon ,berlin").unwrap(),
            vec!["paris", "lyon", "berlin"]
        );
        assert!(parse_sites("paris,,lyon").is_err());
    }

    #[test]
    fn load_reads_explicit_file() -> Result<()> {
        let mut file = NamedTempFile::new()?;
        writeln!(file, "[generator]\nsites = [\"madrid\"]")?;
        file.flush()?;
        let config = AppConfig::load(Some(file.path()))?;
        assert_eq!(config.generator.sites, vec!["madrid"]);
        Ok(())
    }
}
