use chrono::{DateTime, Duration, Months, Utc};
use serde::{Deserialize, Serialize};

/// Retention windows for each tier. The daily window is a pre-filter applied before
/// classification; the other three bound the anchor-day tiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetentionPolicy {
    pub days: u32,
    pub weeks: u32,
    pub months: u32,
    pub years: u32,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            days: 7,
            weeks: 4,
            months: 12,
            years: 5,
        }
    }
}

/// Earliest instant still inside a retention window. `Unbounded` means the window reaches
/// past the representable calendar, so every timestamp is inside it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cutoff {
    At(DateTime<Utc>),
    Unbounded,
}

impl Cutoff {
    /// Inclusive: an instant equal to the cutoff is inside the window.
    pub fn admits(&self, instant: DateTime<Utc>) -> bool {
        match self {
            Cutoff::At(cutoff) => instant >= *cutoff,
            Cutoff::Unbounded => true,
        }
    }
}

impl RetentionPolicy {
    pub fn daily_cutoff(&self, now: DateTime<Utc>) -> Cutoff {
        sub_days(now, i64::from(self.days))
    }

    pub fn weekly_cutoff(&self, now: DateTime<Utc>) -> Cutoff {
        sub_days(now, i64::from(self.weeks) * 7)
    }

    pub fn monthly_cutoff(&self, now: DateTime<Utc>) -> Cutoff {
        sub_months(now, self.months)
    }

    pub fn yearly_cutoff(&self, now: DateTime<Utc>) -> Cutoff {
        match self.years.checked_mul(12) {
            Some(months) => sub_months(now, months),
            None => Cutoff::Unbounded,
        }
    }
}

fn sub_days(now: DateTime<Utc>, days: i64) -> Cutoff {
    Duration::try_days(days)
        .and_then(|span| now.checked_sub_signed(span))
        .map_or(Cutoff::Unbounded, Cutoff::At)
}

/// Calendar month subtraction; a day-of-month missing in the target month clamps to that
/// month's last day.
fn sub_months(now: DateTime<Utc>, months: u32) -> Cutoff {
    now.checked_sub_months(Months::new(months))
        .map_or(Cutoff::Unbounded, Cutoff::At)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use test_case::test_case;

    fn utc(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    #[test]
    fn default_policy_matches_cli_defaults() {
        let policy = RetentionPolicy::default();
        assert_eq!((policy.days, policy.weeks, policy.months, policy.years), (7, 4, 12, 5));
    }

    #[test]
    fn weekly_cutoff_subtracts_whole_weeks() {
        let policy = RetentionPolicy::default();
        assert_eq!(
            policy.weekly_cutoff(utc(2024, 3, 10)),
            Cutoff::At(utc(2024, 2, 11))
        );
    }

    #[test_case(utc(2024, 3, 31), 1, utc(2024, 2, 29); "clamps into leap february")]
    #[test_case(utc(2023, 3, 31), 1, utc(2023, 2, 28); "clamps into common february")]
    #[test_case(utc(2024, 1, 15), 1, utc(2023, 12, 15); "rolls back over the year")]
    #[test_case(utc(2024, 6, 15), 12, utc(2023, 6, 15); "twelve months")]
    #[test_case(utc(2024, 5, 31), 0, utc(2024, 5, 31); "zero months")]
    fn monthly_cutoff_is_calendar_aware(now: DateTime<Utc>, months: u32, expected: DateTime<Utc>) {
        let policy = RetentionPolicy {
            months,
            ..RetentionPolicy::default()
        };
        assert_eq!(policy.monthly_cutoff(now), Cutoff::At(expected));
    }

    #[test]
    fn yearly_cutoff_from_leap_day_clamps() {
        let policy = RetentionPolicy {
            years: 1,
            ..RetentionPolicy::default()
        };
        assert_eq!(
            policy.yearly_cutoff(utc(2024, 2, 29)),
            Cutoff::At(utc(2023, 2, 28))
        );
    }

    #[test]
    fn oversized_windows_are_unbounded() {
        let policy = RetentionPolicy {
            days: u32::MAX,
            weeks: u32::MAX,
            months: u32::MAX,
            years: u32::MAX,
        };
        let now = utc(2024, 6, 15);
        assert_eq!(policy.daily_cutoff(now), Cutoff::Unbounded);
        assert_eq!(policy.weekly_cutoff(now), Cutoff::Unbounded);
        assert_eq!(policy.monthly_cutoff(now), Cutoff::Unbounded);
        assert_eq!(policy.yearly_cutoff(now), Cutoff::Unbounded);
        assert!(Cutoff::Unbounded.admits(utc(1970, 1, 1)));
    }

    #[test]
    fn cutoff_admits_its_own_instant() {
        let cutoff = Cutoff::At(utc(2024, 2, 11));
        assert!(cutoff.admits(utc(2024, 2, 11)));
        assert!(!cutoff.admits(utc(2024, 2, 10)));
    }
}
