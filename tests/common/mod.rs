#![allow(dead_code)]

use chrono::NaiveDate;
use once_cell::sync::Lazy;

use workoutterm::telemetry::{get_subscriber, init_subscriber};
use workoutterm::{WorkoutRecord, WorkoutType};

// Ensure that the `tracing` stack is only initialised once using `once_cell`
static TRACING: Lazy<()> = Lazy::new(|| {
    let default_filter_level = "debug".to_string();

    if std::env::var("TEST_LOG").is_ok() {
        let subscriber = get_subscriber(default_filter_level, std::io::stdout);
        init_subscriber(subscriber).expect("Failed to install test subscriber");
    } else {
        let subscriber = get_subscriber(default_filter_level, std::io::sink);
        init_subscriber(subscriber).expect("Failed to install test subscriber");
    }
});

pub fn init_tracing() {
    Lazy::force(&TRACING);
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Records named `w0`, `w1`, ... one per `(type, minutes, date)` triple.
pub fn records(rows: &[(WorkoutType, u32, &str)]) -> Vec<WorkoutRecord> {
    rows.iter()
        .enumerate()
        .map(|(i, (kind, minutes, day))| {
            WorkoutRecord::new(format!("w{}", i), *kind, *minutes, *day)
        })
        .collect()
}

/// One 30 minute run on each given day.
pub fn runs_on(days: &[&str]) -> Vec<WorkoutRecord> {
    let rows: Vec<(WorkoutType, u32, &str)> =
        days.iter().map(|day| (WorkoutType::Run, 30, *day)).collect();
    records(&rows)
}
