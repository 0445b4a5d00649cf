//! Activity aggregation over the trailing 364-day window.
//!
//! Completion timestamps are projected onto calendar days in a caller-chosen
//! time zone and counted. Everything here is a pure function of its inputs.

use std::collections::HashMap;

use chrono::{DateTime, Days, Local, NaiveDate, TimeZone, Utc};

use crate::model::ActivityBucket;

/// Number of weeks shown in the heatmap.
pub const WEEKS: usize = 52;

/// Length of the activity window in days.
pub const WINDOW_DAYS: usize = WEEKS * 7;

/// Count completions per calendar day over the 364 days ending at `today`.
///
/// Buckets are ordered oldest-first and every day is present, with
/// `count = 0` when nothing was completed. Timestamps whose day falls
/// outside the window are dropped.
pub fn compute_activity<I, Tz>(timestamps: I, today: NaiveDate, tz: &Tz) -> Vec<ActivityBucket>
where
    I: IntoIterator<Item = DateTime<Utc>>,
    Tz: TimeZone,
{
    let mut per_day: HashMap<NaiveDate, u32> = HashMap::new();
    for ts in timestamps {
        *per_day.entry(ts.with_timezone(tz).date_naive()).or_insert(0) += 1;
    }

    (0..WINDOW_DAYS as u64)
        .rev()
        .filter_map(|back| today.checked_sub_days(Days::new(back)))
        .map(|date| ActivityBucket {
            date,
            count: per_day.get(&date).copied().unwrap_or(0),
        })
        .collect()
}

/// [`compute_activity`] in the system time zone, ending today.
pub fn compute_activity_local<I>(timestamps: I) -> Vec<ActivityBucket>
where
    I: IntoIterator<Item = DateTime<Utc>>,
{
    compute_activity(timestamps, Local::now().date_naive(), &Local)
}

/// Consecutive active days ending at the last bucket.
///
/// A day without activity at the end of the window does not break the
/// streak yet: it then counts back from the day before.
pub fn current_streak(buckets: &[ActivityBucket]) -> u32 {
    let Some((last, earlier)) = buckets.split_last() else {
        return 0;
    };
    let days = if last.count > 0 { buckets } else { earlier };
    days.iter().rev().take_while(|b| b.count > 0).count() as u32
}

/// Longest run of consecutive active days in the window.
pub fn longest_streak(buckets: &[ActivityBucket]) -> u32 {
    let mut longest = 0;
    let mut run = 0;
    for bucket in buckets {
        if bucket.count > 0 {
            run += 1;
            longest = longest.max(run);
        } else {
            run = 0;
        }
    }
    longest
}

/// Number of days with at least one completion.
pub fn active_days(buckets: &[ActivityBucket]) -> usize {
    buckets.iter().filter(|b| b.count > 0).count()
}

/// Total completions in the window.
pub fn total(buckets: &[ActivityBucket]) -> u32 {
    buckets.iter().map(|b| b.count).sum()
}

/// Split the window into week columns of seven days, oldest first.
pub fn weeks(buckets: &[ActivityBucket]) -> Vec<&[ActivityBucket]> {
    buckets.chunks(7).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, FixedOffset};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 15).unwrap()
    }

    fn no_timestamps() -> Vec<DateTime<Utc>> {
        Vec::new()
    }

    fn at(date: NaiveDate, hour: u32) -> DateTime<Utc> {
        date.and_hms_opt(hour, 0, 0).unwrap().and_utc()
    }

    #[test]
    fn window_has_364_chronological_days() {
        let buckets = compute_activity(no_timestamps(), today(), &Utc);
        assert_eq!(buckets.len(), 364);
        assert_eq!(buckets.last().unwrap().date, today());
        assert_eq!(buckets[0].date, today() - Duration::days(363));
        assert!(buckets.windows(2).all(|w| w[0].date < w[1].date));
        assert_eq!(total(&buckets), 0);
    }

    #[test]
    fn same_day_completions_share_a_bucket() {
        let day = today() - Duration::days(3);
        let buckets = compute_activity(vec![at(day, 9), at(day, 17)], today(), &Utc);
        let bucket = buckets.iter().find(|b| b.date == day).unwrap();
        assert_eq!(bucket.count, 2);
        assert_eq!(active_days(&buckets), 1);
        assert_eq!(buckets.iter().filter(|b| b.count == 0).count(), 363);
    }

    #[test]
    fn timestamps_outside_window_are_excluded() {
        let timestamps = vec![
            at(today() - Duration::days(364), 12),
            at(today() - Duration::days(363), 12),
            at(today() + Duration::days(1), 12),
        ];
        let buckets = compute_activity(timestamps, today(), &Utc);
        assert_eq!(total(&buckets), 1);
        assert_eq!(buckets[0].count, 1);
    }

    #[test]
    fn days_follow_the_given_time_zone() {
        // 23:30 UTC on the 14th is already the 15th at UTC+2.
        let ts = at(today() - Duration::days(1), 23) + Duration::minutes(30);
        let plus_two = FixedOffset::east_opt(2 * 3600).unwrap();
        let buckets = compute_activity(vec![ts], today(), &plus_two);
        assert_eq!(buckets.last().unwrap().count, 1);

        let buckets = compute_activity(vec![ts], today(), &Utc);
        assert_eq!(buckets[362].count, 1);
    }

    #[test]
    fn current_streak_counts_back_from_today() {
        let timestamps = (0..3).map(|d| at(today() - Duration::days(d), 8));
        let buckets = compute_activity(timestamps, today(), &Utc);
        assert_eq!(current_streak(&buckets), 3);
    }

    #[test]
    fn current_streak_survives_quiet_today() {
        let timestamps = (1..3).map(|d| at(today() - Duration::days(d), 8));
        let buckets = compute_activity(timestamps, today(), &Utc);
        assert_eq!(current_streak(&buckets), 2);
    }

    #[test]
    fn current_streak_breaks_after_two_quiet_days() {
        let timestamps = vec![at(today() - Duration::days(2), 8)];
        let buckets = compute_activity(timestamps, today(), &Utc);
        assert_eq!(current_streak(&buckets), 0);
        assert_eq!(longest_streak(&buckets), 1);
    }

    #[test]
    fn longest_streak_finds_best_run() {
        let mut timestamps: Vec<_> = (10..15).map(|d| at(today() - Duration::days(d), 8)).collect();
        timestamps.push(at(today(), 8));
        let buckets = compute_activity(timestamps, today(), &Utc);
        assert_eq!(longest_streak(&buckets), 5);
        assert_eq!(current_streak(&buckets), 1);
    }

    #[test]
    fn weeks_form_a_52_by_7_grid() {
        let buckets = compute_activity(no_timestamps(), today(), &Utc);
        let grid = weeks(&buckets);
        assert_eq!(grid.len(), WEEKS);
        assert!(grid.iter().all(|w| w.len() == 7));
        assert_eq!(grid[WEEKS - 1][6].date, today());
    }

    #[test]
    fn empty_buckets_have_no_streak() {
        assert_eq!(current_streak(&[]), 0);
        assert_eq!(longest_streak(&[]), 0);
    }
}
