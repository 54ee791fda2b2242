use crate::error::{ConfigError, ValidationError};
use crate::prelude::*;
use crate::retention::RetentionPolicy;
use crate::snapshot::ProtectLabel;
use config::{Config, Environment, File, FileFormat, Map};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

const CONFIG_DIR: &str = "config";

pub const ENV_PREFIX: &str = "PRUNER";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    pub project: String,
    pub retention: RetentionPolicy,
    pub deletion: DeletionSettings,
    pub gcloud: GcloudSettings,
    pub protect_label: ProtectLabel,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletionSettings {
    /// Deletes in flight at once; 1 runs them sequentially.
    pub concurrency: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GcloudSettings {
    pub binary: String,
}

/// Values supplied on the command line; they win over every other source.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub project: Option<String>,
    pub days: Option<u32>,
    pub weeks: Option<u32>,
    pub months: Option<u32>,
    pub years: Option<u32>,
    pub concurrency: Option<usize>,
    pub gcloud: Option<String>,
}

impl Settings {
    /// Layers built-in defaults, `config/default.toml`, `config/{RUN_MODE}.toml`, an explicit
    /// config file, `PRUNER_*` environment variables and finally `overrides`.
    pub fn load(config_file: Option<&Path>, overrides: &Overrides) -> Result<Self> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".into());
        Self::load_layers(Path::new(CONFIG_DIR), &run_mode, None, config_file, overrides)
    }

    /// `env` replaces the process environment when given.
    fn load_layers(
        config_dir: &Path,
        run_mode: &str,
        env: Option<Map<String, String>>,
        config_file: Option<&Path>,
        overrides: &Overrides,
    ) -> Result<Self> {
        let defaults = RetentionPolicy::default();
        let label = ProtectLabel::default();

        let mut builder = Config::builder()
            .set_default("project", "")
            .and_then(|b| b.set_default("retention.days", i64::from(defaults.days)))
            .and_then(|b| b.set_default("retention.weeks", i64::from(defaults.weeks)))
            .and_then(|b| b.set_default("retention.months", i64::from(defaults.months)))
            .and_then(|b| b.set_default("retention.years", i64::from(defaults.years)))
            .and_then(|b| b.set_default("deletion.concurrency", 1_i64))
            .and_then(|b| b.set_default("gcloud.binary", "gcloud"))
            .and_then(|b| b.set_default("protect_label.key", label.key))
            .and_then(|b| b.set_default("protect_label.value", label.value))
            .map_err(ConfigError::Parse)?
            .add_source(
                File::new(&config_dir.join("default").to_string_lossy(), FileFormat::Toml)
                    .required(false),
            )
            .add_source(
                File::new(&config_dir.join(run_mode).to_string_lossy(), FileFormat::Toml)
                    .required(false),
            );

        if let Some(path) = config_file {
            builder = builder.add_source(File::from(path).required(true));
        }

        let settings: Settings = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
                    .source(env),
            )
            .set_override_option("project", overrides.project.clone())
            .and_then(|b| b.set_override_option("retention.days", overrides.days.map(i64::from)))
            .and_then(|b| b.set_override_option("retention.weeks", overrides.weeks.map(i64::from)))
            .and_then(|b| {
                b.set_override_option("retention.months", overrides.months.map(i64::from))
            })
            .and_then(|b| b.set_override_option("retention.years", overrides.years.map(i64::from)))
            .and_then(|b| {
                b.set_override_option(
                    "deletion.concurrency",
                    overrides.concurrency.map(|n| n as i64),
                )
            })
            .and_then(|b| b.set_override_option("gcloud.binary", overrides.gcloud.clone()))
            .and_then(|b| b.build())
            .and_then(|c| c.try_deserialize())
            .map_err(ConfigError::Parse)?;

        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        if self.project.trim().is_empty() {
            return Err(ValidationError::Missing("project").into());
        }
        if self.deletion.concurrency == 0 {
            return Err(ValidationError::InvalidValue {
                field: "deletion.concurrency",
                reason: "must be at least 1".into(),
            }
            .into());
        }
        if self.protect_label.key.is_empty() {
            return Err(ValidationError::InvalidValue {
                field: "protect_label.key",
                reason: "must not be empty".into(),
            }
            .into());
        }
        Ok(())
    }
}

impl fmt::Display for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Project: {}", self.project)?;
        writeln!(f, "Daily retention: {} days", self.retention.days)?;
        writeln!(f, "Weekly retention: {} weeks", self.retention.weeks)?;
        writeln!(f, "Monthly retention: {} months", self.retention.months)?;
        writeln!(f, "Yearly retention: {} years", self.retention.years)?;
        writeln!(f, "Protected label: {}", self.protect_label)?;
        write!(f, "Delete concurrency: {}", self.deletion.concurrency)
    }
}
