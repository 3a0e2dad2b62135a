//! Demo configuration.
//!
//! All settings live in a single `config.toml` file at
//! `~/.config/monthgrid/config.toml` by default. Command-line flags take
//! precedence over the file.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono_tz::Tz;
use monthgrid_core::{TracingConfig, TracingOutputFormat, ZonedCalendar};
use monthgrid_loader::LoaderConfig;
use serde::{Deserialize, Serialize};
use tracing::Level;

use crate::cli::Cli;
use crate::error::{DemoError, DemoResult};

/// Configuration for the `monthgrid` binary.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DemoConfig {
    /// IANA time zone for day and month boundaries. UTC when unset.
    pub timezone: Option<String>,

    /// iCalendar file to read. The built-in sample is used when unset.
    pub ics: Option<PathBuf>,

    /// Sub-calendars to show. All when unset.
    pub visible_calendars: Option<Vec<String>>,

    /// Loader settings.
    pub loader: LoaderConfig,

    /// Logging settings.
    pub logging: LoggingSettings,
}

/// Logging settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Level for monthgrid crates when `RUST_LOG` is unset.
    pub level: String,

    /// Output format.
    pub format: TracingOutputFormat,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            format: TracingOutputFormat::Compact,
        }
    }
}

impl DemoConfig {
    /// Loads configuration from the default path, or defaults when the
    /// file does not exist.
    pub fn load() -> DemoResult<Self> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Loads configuration from a specific path.
    pub fn load_from(path: &Path) -> DemoResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| DemoError::config(format!("failed to read {}: {}", path.display(), e)))?;
        toml::from_str(&content)
            .map_err(|e| DemoError::config(format!("failed to parse {}: {}", path.display(), e)))
    }

    /// Returns the default configuration file path.
    pub fn default_path() -> PathBuf {
        Self::default_config_dir().join("config.toml")
    }

    /// Returns the default configuration directory.
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("monthgrid")
    }

    /// Applies command-line overrides.
    pub fn apply_cli(&mut self, cli: &Cli) -> DemoResult<()> {
        if let Some(ref timezone) = cli.timezone {
            self.timezone = Some(timezone.clone());
        }
        if let Some(ref ics) = cli.ics {
            self.ics = Some(ics.clone());
        }
        if !cli.calendars.is_empty() {
            self.visible_calendars = Some(cli.calendars.clone());
        }
        if let Some(ref format) = cli.log_format {
            self.logging.format = TracingOutputFormat::from_str(format)?;
        }
        Ok(())
    }

    /// Builds the calendar for the configured time zone.
    pub fn calendar(&self) -> DemoResult<ZonedCalendar<Tz>> {
        match self.timezone.as_deref() {
            Some(name) => Ok(ZonedCalendar::named(name)?),
            None => Ok(ZonedCalendar::new(Tz::UTC)),
        }
    }

    /// Parses the configured log level.
    pub fn log_level(&self) -> DemoResult<Level> {
        Level::from_str(&self.logging.level)
            .map_err(|_| DemoError::config(format!("unknown log level: {}", self.logging.level)))
    }

    /// Tracing settings for this configuration. `--debug` wins over the file.
    pub fn tracing(&self, debug: bool) -> TracingConfig {
        if debug {
            return TracingConfig::cli_debug();
        }
        TracingConfig::default()
            .with_level(self.log_level().unwrap_or(Level::WARN))
            .with_format(self.logging.format)
    }

    /// Checks every setting that can be wrong.
    pub fn validate(&self) -> DemoResult<()> {
        self.calendar()?;
        self.log_level()?;
        self.loader.validate()?;
        if let Some(ref path) = self.ics
            && !path.is_file()
        {
            return Err(DemoError::config(format!(
                "ics file not found: {}",
                path.display()
            )));
        }
        if let Some(ref ids) = self.visible_calendars
            && ids.is_empty()
        {
            return Err(DemoError::config("visible_calendars must not be empty"));
        }
        Ok(())
    }
}
