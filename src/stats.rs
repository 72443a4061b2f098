//! Workout statistics: totals, type histogram, streaks and monthly rollups.
//!
//! Everything here is a pure function of the records and the `as_of` date the
//! caller passes in, so the same input always produces the same summary.

use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet};

use chrono::{Datelike, Local, Months, NaiveDate};
use tracing::{debug, warn};

use crate::data::{MonthlyStats, StatsSummary, WorkoutRecord};

/// Aggregates the full record set into a [`StatsSummary`].
///
/// Records whose date cannot be read are left out of every figure and counted
/// in `skipped_records` instead.
pub fn compute_stats(records: &[WorkoutRecord], as_of: NaiveDate) -> StatsSummary {
    let mut summary = StatsSummary::default();
    let mut days = BTreeSet::new();
    let mut months = BTreeMap::new();

    for record in records {
        let date = match record.date() {
            Ok(date) => date,
            Err(e) => {
                warn!(error = %e, "skipping workout record");
                summary.skipped_records += 1;
                continue;
            }
        };

        summary.total_workouts += 1;
        summary.total_duration += u64::from(record.duration_minutes);
        *summary.workout_types.entry(record.workout_type).or_insert(0) += 1;
        days.insert(date);
        add_to_month(&mut months, date, record);
    }

    summary.avg_duration = average_minutes(summary.total_duration, summary.total_workouts);

    let days: Vec<NaiveDate> = days.into_iter().collect();
    summary.longest_streak = longest_streak(&days);
    summary.current_streak = current_streak(&days, as_of);
    summary.monthly_data = months.into_values().collect();

    debug!(
        total = summary.total_workouts,
        skipped = summary.skipped_records,
        current_streak = summary.current_streak,
        longest_streak = summary.longest_streak,
        "computed workout stats"
    );
    summary
}

/// [`compute_stats`] as of the local calendar date.
pub fn compute_stats_today(records: &[WorkoutRecord]) -> StatsSummary {
    compute_stats(records, Local::now().date_naive())
}

/// Monthly rollup restricted to the last `months` calendar months before
/// `as_of` (inclusive of the boundary day). `months == 0` disables the window.
pub fn monthly_breakdown(
    records: &[WorkoutRecord],
    as_of: NaiveDate,
    months: u32,
) -> Vec<MonthlyStats> {
    let since = match months {
        0 => None,
        n => as_of.checked_sub_months(Months::new(n)),
    };

    let mut buckets = BTreeMap::new();
    for record in records {
        let Ok(date) = record.date() else {
            continue;
        };
        if since.is_some_and(|since| date < since) {
            continue;
        }
        add_to_month(&mut buckets, date, record);
    }
    buckets.into_values().collect()
}

/// The `limit` most recent workouts, newest first. Undated records sort last.
pub fn most_recent(records: &[WorkoutRecord], limit: usize) -> Vec<WorkoutRecord> {
    let mut dated: Vec<(Option<NaiveDate>, &WorkoutRecord)> = records
        .iter()
        .map(|record| (record.date().ok(), record))
        .collect();
    // Option orders None first, so reversing puts undated rows at the end.
    dated.sort_by_key(|(date, _)| Reverse(*date));

    dated
        .into_iter()
        .take(limit)
        .map(|(_, record)| record.clone())
        .collect()
}

/// `YYYY-MM` bucket for a calendar date.
pub fn month_key(date: NaiveDate) -> String {
    format!("{:04}-{:02}", date.year(), date.month())
}

/// Longest run of consecutive days in an ascending, de-duplicated date list.
pub fn longest_streak(days: &[NaiveDate]) -> u32 {
    let mut longest = 0;
    let mut run = 0;
    let mut previous: Option<NaiveDate> = None;

    for &day in days {
        run = match previous {
            Some(prev) if is_next_day(prev, day) => run + 1,
            _ => 1,
        };
        longest = longest.max(run);
        previous = Some(day);
    }
    longest
}

/// Run of consecutive days ending at the latest day on or before `as_of`.
///
/// The run only counts while it is still alive: its last day must be `as_of`
/// itself or the day before. Days after `as_of` are ignored.
pub fn current_streak(days: &[NaiveDate], as_of: NaiveDate) -> u32 {
    let mut past = days.iter().rev().copied().filter(|day| *day <= as_of);

    let Some(latest) = past.next() else {
        return 0;
    };
    if as_of.signed_duration_since(latest).num_days() > 1 {
        return 0;
    }

    let mut streak = 1;
    let mut previous = latest;
    for day in past {
        if !is_next_day(day, previous) {
            break;
        }
        streak += 1;
        previous = day;
    }
    streak
}

fn is_next_day(earlier: NaiveDate, later: NaiveDate) -> bool {
    later.signed_duration_since(earlier).num_days() == 1
}

fn average_minutes(total: u64, count: u32) -> u64 {
    match u64::from(count) {
        0 => 0,
        n => (total + n / 2) / n,
    }
}

fn add_to_month(
    buckets: &mut BTreeMap<String, MonthlyStats>,
    date: NaiveDate,
    record: &WorkoutRecord,
) {
    let key = month_key(date);
    let bucket = buckets.entry(key.clone()).or_insert_with(|| MonthlyStats {
        month: key,
        ..MonthlyStats::default()
    });
    bucket.workouts += 1;
    bucket.duration += u64::from(record.duration_minutes);
    *bucket.types.entry(record.workout_type).or_insert(0) += 1;
}
