//! Invariants of the aggregator over generated workout logs.

use chrono::{Duration, NaiveDate};
use proptest::prelude::*;

use workoutterm::data::WorkoutType;
use workoutterm::{compute_stats, WorkoutRecord};

fn base_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
}

fn workout_type() -> impl Strategy<Value = WorkoutType> {
    prop::sample::select(WorkoutType::ALL.to_vec())
}

/// Workouts spread over roughly four months, with a few broken dates mixed in.
fn workout_log() -> impl Strategy<Value = Vec<WorkoutRecord>> {
    prop::collection::vec(
        (workout_type(), 1u32..=600, 0i64..120, prop::bool::weighted(0.05)),
        0..80,
    )
    .prop_map(|rows| {
        rows.into_iter()
            .enumerate()
            .map(|(i, (kind, minutes, offset, broken))| {
                let day = if broken {
                    "not-a-date".to_string()
                } else {
                    (base_date() + Duration::days(offset)).to_string()
                };
                WorkoutRecord::new(format!("w{}", i), kind, minutes, day)
            })
            .collect()
    })
}

proptest! {
    #[test]
    fn type_counts_sum_to_total(log in workout_log(), as_of in 0i64..130) {
        let stats = compute_stats(&log, base_date() + Duration::days(as_of));
        let counted: u32 = stats.workout_types.values().sum();
        prop_assert_eq!(counted, stats.total_workouts);
    }

    #[test]
    fn longest_streak_bounds_current(log in workout_log(), as_of in 0i64..130) {
        let stats = compute_stats(&log, base_date() + Duration::days(as_of));
        prop_assert!(stats.longest_streak >= stats.current_streak);
    }

    #[test]
    fn every_record_is_counted_or_skipped(log in workout_log()) {
        let stats = compute_stats(&log, base_date());
        prop_assert_eq!(
            (stats.total_workouts + stats.skipped_records) as usize,
            log.len()
        );
    }

    #[test]
    fn monthly_rollup_matches_totals(log in workout_log()) {
        let stats = compute_stats(&log, base_date());
        let workouts: u32 = stats.monthly_data.iter().map(|m| m.workouts).sum();
        let duration: u64 = stats.monthly_data.iter().map(|m| m.duration).sum();
        prop_assert_eq!(workouts, stats.total_workouts);
        prop_assert_eq!(duration, stats.total_duration);

        let months: Vec<&String> = stats.monthly_data.iter().map(|m| &m.month).collect();
        let mut sorted = months.clone();
        sorted.sort();
        sorted.dedup();
        prop_assert_eq!(months, sorted);
    }

    #[test]
    fn computation_is_deterministic(log in workout_log(), as_of in 0i64..130) {
        let as_of = base_date() + Duration::days(as_of);
        prop_assert_eq!(compute_stats(&log, as_of), compute_stats(&log, as_of));
    }
}
