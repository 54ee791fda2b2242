use crate::config::Overrides;
use crate::error::ValidationError;
use crate::retention::parse_timestamp;
use chrono::{DateTime, Utc};
use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "snapshot-pruner",
    version,
    about = "Delete disk snapshots that no daily, weekly, monthly or yearly window retains"
)]
pub struct Cli {
    /// Target project identifier
    #[arg(short = 'p', long)]
    pub project: String,

    /// Snapshots newer than this many days are never considered [default: 7]
    #[arg(short = 'd', long)]
    pub days: Option<u32>,

    /// Keep Sunday snapshots for this many weeks [default: 4]
    #[arg(short = 'w', long)]
    pub weeks: Option<u32>,

    /// Keep first-of-month snapshots for this many months [default: 12]
    #[arg(short = 'm', long)]
    pub months: Option<u32>,

    /// Keep January 1st snapshots for this many years [default: 5]
    #[arg(short = 'y', long)]
    pub years: Option<u32>,

    /// Print the resolved configuration and planned actions without deleting anything
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Reference time as RFC 3339 instead of the current time
    #[arg(long, value_name = "TIMESTAMP")]
    pub now: Option<String>,

    /// Maximum number of deletions in flight
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Path to the gcloud executable
    #[arg(long, value_name = "PATH")]
    pub gcloud: Option<String>,

    /// Additional TOML configuration file
    #[arg(long, value_name = "FILE", env = "PRUNER_CONFIG")]
    pub config: Option<PathBuf>,
}

impl Cli {
    pub fn overrides(&self) -> Overrides {
        Overrides {
            project: Some(self.project.clone()),
            days: self.days,
            weeks: self.weeks,
            months: self.months,
            years: self.years,
            concurrency: self.concurrency,
            gcloud: self.gcloud.clone(),
        }
    }

    pub fn reference_time(&self) -> Result<DateTime<Utc>, ValidationError> {
        match &self.now {
            Some(value) => Ok(parse_timestamp(value)?.with_timezone(&Utc)),
            None => Ok(Utc::now()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;
    use clap::CommandFactory;

    #[test]
    fn command_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn short_flags_map_to_overrides() {
        let cli = Cli::try_parse_from([
            "snapshot-pruner", "-p", "proj", "-d", "3", "-w", "2", "-m", "6", "-y", "1", "-n",
        ])
        .unwrap();
        assert!(cli.dry_run);
        let overrides = cli.overrides();
        assert_eq!(overrides.project.as_deref(), Some("proj"));
        assert_eq!(
            (overrides.days, overrides.weeks, overrides.months, overrides.years),
            (Some(3), Some(2), Some(6), Some(1))
        );
    }

    #[test]
    fn unset_windows_defer_to_configuration() {
        let cli = Cli::try_parse_from(["snapshot-pruner", "-p", "proj"]).unwrap();
        assert!(!cli.dry_run);
        assert_eq!(cli.overrides().weeks, None);
    }

    #[test]
    fn project_is_required() {
        let err = Cli::try_parse_from(["snapshot-pruner", "-d", "3"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn unknown_flags_are_rejected() {
        let err = Cli::try_parse_from(["snapshot-pruner", "-p", "proj", "-x"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownArgument);
    }

    #[test]
    fn reference_time_accepts_rfc3339() {
        let cli = Cli::try_parse_from([
            "snapshot-pruner", "-p", "proj", "--now", "2024-03-10T00:00:00-08:00",
        ])
        .unwrap();
        assert_eq!(
            cli.reference_time().unwrap().to_rfc3339(),
            "2024-03-10T08:00:00+00:00"
        );
    }

    #[test]
    fn malformed_reference_time_is_a_validation_error() {
        let cli = Cli::try_parse_from(["snapshot-pruner", "-p", "proj", "--now", "soon"]).unwrap();
        assert!(matches!(
            cli.reference_time(),
            Err(ValidationError::Timestamp { .. })
        ));
    }
}
