use chrono::{DateTime, Datelike, Days, Duration, Months, NaiveDate, TimeZone, Utc, Weekday};
use proptest::prelude::*;
use snapshot_pruner::retention::{classify, Classification, RetentionPolicy};

fn reference(day_offset: u64, seconds: i64) -> DateTime<Utc> {
    let date = NaiveDate::from_ymd_opt(2000, 1, 1)
        .unwrap()
        .checked_add_days(Days::new(day_offset))
        .unwrap();
    date.and_hms_opt(0, 0, 0).unwrap().and_utc() + Duration::seconds(seconds)
}

fn midnight(date: NaiveDate) -> DateTime<Utc> {
    date.and_hms_opt(0, 0, 0).unwrap().and_utc()
}

fn policy(weeks: u32, months: u32, years: u32) -> RetentionPolicy {
    RetentionPolicy {
        days: 7,
        weeks,
        months,
        years,
    }
}

proptest! {
    #[test]
    fn sundays_inside_weekly_window_are_kept_weekly(
        day_offset in 0u64..20_000,
        seconds in 0i64..86_400,
        weeks in 1u32..520,
        weeks_back in 0u32..520,
        months in 0u32..240,
        years in 0u32..50,
    ) {
        prop_assume!(weeks_back < weeks);
        let now = reference(day_offset, seconds);
        let last_sunday = now.date_naive()
            - Days::new(u64::from(now.weekday().num_days_from_sunday()));
        let created = midnight(last_sunday - Days::new(u64::from(weeks_back) * 7));
        prop_assert_eq!(created.weekday(), Weekday::Sun);
        prop_assert_eq!(
            classify(&created, now, &policy(weeks, months, years)),
            Classification::KeepWeekly
        );
    }

    #[test]
    fn firsts_inside_monthly_window_are_kept_monthly(
        day_offset in 0u64..20_000,
        seconds in 1i64..86_400,
        months in 1u32..240,
        months_back in 0u32..240,
        years in 0u32..50,
    ) {
        prop_assume!(months_back < months);
        let now = reference(day_offset, seconds);
        let first = now.date_naive().with_day(1).unwrap();
        let created = midnight(first.checked_sub_months(Months::new(months_back)).unwrap());
        prop_assume!(created.month() != 1);
        prop_assert_eq!(
            classify(&created, now, &policy(0, months, years)),
            Classification::KeepMonthly
        );
    }

    #[test]
    fn new_years_inside_yearly_window_are_kept_yearly(
        day_offset in 0u64..20_000,
        seconds in 1i64..86_400,
        years in 1u32..50,
        years_back in 0u32..50,
    ) {
        prop_assume!(years_back < years);
        let now = reference(day_offset, seconds);
        let created = Utc
            .with_ymd_and_hms(now.year() - years_back as i32, 1, 1, 0, 0, 0)
            .unwrap();
        prop_assert_eq!(
            classify(&created, now, &policy(0, 0, years)),
            Classification::KeepYearly
        );
    }

    #[test]
    fn non_anchor_days_are_deleted(
        day_offset in 0u64..20_000,
        age_days in 0u64..5_000,
        weeks in 0u32..1_000,
        months in 0u32..1_000,
        years in 0u32..100,
    ) {
        let now = reference(day_offset + 5_000, 43_200);
        let created = midnight(now.date_naive() - Days::new(age_days));
        prop_assume!(created.weekday() != Weekday::Sun && created.day() != 1);
        prop_assert_eq!(
            classify(&created, now, &policy(weeks, months, years)),
            Classification::Delete
        );
    }

    #[test]
    fn weekly_boundary_is_inclusive(
        day_offset in 0u64..20_000,
        weeks in 0u32..520,
    ) {
        let now = reference(day_offset + 4_000, 0);
        let sunday = now - Duration::days(i64::from(now.weekday().num_days_from_sunday()));
        let created = sunday - Duration::weeks(i64::from(weeks));
        let rule = policy(weeks, 0, 0);
        prop_assert_eq!(classify(&created, sunday, &rule), Classification::KeepWeekly);

        let day_older = created - Duration::days(1);
        prop_assume!(day_older.day() != 1);
        prop_assert_eq!(classify(&day_older, sunday, &rule), Classification::Delete);
    }

    #[test]
    fn classification_is_deterministic(
        day_offset in 0u64..20_000,
        age_days in 0u64..3_000,
        weeks in 0u32..100,
        months in 0u32..100,
        years in 0u32..20,
    ) {
        let now = reference(day_offset + 3_000, 3_600);
        let created = midnight(now.date_naive() - Days::new(age_days));
        let rule = policy(weeks, months, years);
        prop_assert_eq!(classify(&created, now, &rule), classify(&created, now, &rule));
    }
}
