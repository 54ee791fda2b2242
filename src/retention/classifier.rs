use std::fmt;

use chrono::{DateTime, Datelike, FixedOffset, Month, TimeZone, Utc, Weekday};

use super::policy::RetentionPolicy;
use crate::error::ValidationError;

pub const WEEKLY_ANCHOR: Weekday = Weekday::Sun;
pub const MONTHLY_ANCHOR_DAY: u32 = 1;
pub const YEARLY_ANCHOR_MONTH: Month = Month::January;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Classification {
    KeepWeekly,
    KeepMonthly,
    KeepYearly,
    /// Created after the reference time; not yet eligible for any tier.
    KeepRecent,
    Delete,
}

impl Classification {
    pub fn is_keep(&self) -> bool {
        !matches!(self, Classification::Delete)
    }

    pub fn reason(&self) -> &'static str {
        match self {
            Classification::KeepWeekly => "weekly",
            Classification::KeepMonthly => "monthly",
            Classification::KeepYearly => "yearly",
            Classification::KeepRecent => "recent",
            Classification::Delete => "expired",
        }
    }

    /// The report line printed for snapshot `id`.
    pub fn line(&self, id: &str) -> String {
        match self {
            Classification::Delete => format!("Deleting {}", id),
            keep => format!("Valid {} - keeping {}", keep.reason(), id),
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Classification::Delete => write!(f, "delete"),
            keep => write!(f, "keep ({})", keep.reason()),
        }
    }
}

/// Decides which tier, if any, retains a snapshot created at `created`.
///
/// Tiers are tried weekly, monthly, then yearly; the first whose anchor position matches
/// and whose window admits the timestamp wins. Anchor positions are read in the
/// timestamp's own offset, windows are compared on absolute instants.
pub fn classify<Tz: TimeZone>(
    created: &DateTime<Tz>,
    now: DateTime<Utc>,
    policy: &RetentionPolicy,
) -> Classification {
    let instant = created.with_timezone(&Utc);
    if instant > now {
        return Classification::KeepRecent;
    }

    if is_weekly_anchor(created) && policy.weekly_cutoff(now).admits(instant) {
        Classification::KeepWeekly
    } else if is_monthly_anchor(created) && policy.monthly_cutoff(now).admits(instant) {
        Classification::KeepMonthly
    } else if is_yearly_anchor(created) && policy.yearly_cutoff(now).admits(instant) {
        Classification::KeepYearly
    } else {
        Classification::Delete
    }
}

fn is_weekly_anchor<Tz: TimeZone>(created: &DateTime<Tz>) -> bool {
    created.weekday() == WEEKLY_ANCHOR
}

fn is_monthly_anchor<Tz: TimeZone>(created: &DateTime<Tz>) -> bool {
    created.day() == MONTHLY_ANCHOR_DAY
}

fn is_yearly_anchor<Tz: TimeZone>(created: &DateTime<Tz>) -> bool {
    is_monthly_anchor(created) && created.month() == YEARLY_ANCHOR_MONTH.number_from_month()
}

/// Parses a provider creation timestamp (RFC 3339, e.g. `2024-03-10T01:02:03.456-07:00`).
pub fn parse_timestamp(value: &str) -> Result<DateTime<FixedOffset>, ValidationError> {
    DateTime::parse_from_rfc3339(value.trim()).map_err(|e| ValidationError::Timestamp {
        value: value.to_string(),
        reason: e.to_string(),
    })
}
