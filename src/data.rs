use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

// ── Workout type ────────────────────────────────────────

/// Canonical workout categories.
///
/// Older clients log `flexibility`, which is folded into [`WorkoutType::Yoga`].
/// Anything unrecognised lands in [`WorkoutType::Other`] so a single odd row
/// never fails a whole page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkoutType {
    Gym,
    Run,
    Cardio,
    Strength,
    #[serde(alias = "flexibility")]
    Yoga,
    Cycling,
    Swimming,
    Sports,
    #[serde(other)]
    Other,
}

impl WorkoutType {
    pub const ALL: [WorkoutType; 9] = [
        WorkoutType::Gym,
        WorkoutType::Run,
        WorkoutType::Cardio,
        WorkoutType::Strength,
        WorkoutType::Yoga,
        WorkoutType::Cycling,
        WorkoutType::Swimming,
        WorkoutType::Sports,
        WorkoutType::Other,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            WorkoutType::Gym => "Gym",
            WorkoutType::Run => "Run",
            WorkoutType::Cardio => "Cardio",
            WorkoutType::Strength => "Strength",
            WorkoutType::Yoga => "Yoga",
            WorkoutType::Cycling => "Cycling",
            WorkoutType::Swimming => "Swimming",
            WorkoutType::Sports => "Sports",
            WorkoutType::Other => "Other",
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            WorkoutType::Gym => "🏋",
            WorkoutType::Run => "🏃",
            WorkoutType::Cardio => "❤",
            WorkoutType::Strength => "💪",
            WorkoutType::Yoga => "🧘",
            WorkoutType::Cycling => "🚴",
            WorkoutType::Swimming => "🏊",
            WorkoutType::Sports => "⚽",
            WorkoutType::Other => "•",
        }
    }
}

/// Histogram of workout types. Only types that occur are present.
pub type TypeCounts = BTreeMap<WorkoutType, u32>;

// ── Workout record ──────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    #[error("workout {id} has an unreadable date: {value:?}")]
    InvalidDate { id: String, value: String },
}

/// A single logged workout as delivered by the record store.
///
/// Both the snake_case rows of the hosted database and the camelCase rows of
/// the self-hosted API deserialize into this shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkoutRecord {
    pub id: String,
    #[serde(alias = "workoutType")]
    pub workout_type: WorkoutType,
    #[serde(alias = "durationMinutes")]
    pub duration_minutes: u32,
    #[serde(default)]
    pub notes: Option<String>,
    /// Kept verbatim; see [`WorkoutRecord::date`]. A null or missing date is
    /// read as an empty string so the row is skipped later, not the page.
    #[serde(alias = "workoutDate", default, deserialize_with = "raw_date")]
    pub workout_date: String,
}

fn raw_date<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(value) => value,
        Value::Null => String::new(),
        other => other.to_string(),
    })
}

impl WorkoutRecord {
    pub fn new(
        id: impl Into<String>,
        workout_type: WorkoutType,
        duration_minutes: u32,
        workout_date: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            workout_type,
            duration_minutes,
            notes: None,
            workout_date: workout_date.into(),
        }
    }

    /// Calendar date the workout was logged on, exactly as written.
    pub fn date(&self) -> Result<NaiveDate, RecordError> {
        parse_calendar_date(&self.workout_date).ok_or_else(|| RecordError::InvalidDate {
            id: self.id.clone(),
            value: self.workout_date.clone(),
        })
    }
}

/// Reads the calendar date out of a stored date value.
///
/// Timestamps keep the date in their own offset; nothing is shifted to UTC,
/// so `2024-01-31T23:30:00-05:00` is still January 31st.
pub fn parse_calendar_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();

    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Some(date);
    }
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(value) {
        return Some(timestamp.date_naive());
    }
    // Postgres text output: "2024-01-03 10:00:00+00"
    if let Ok(timestamp) = DateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%.f%#z") {
        return Some(timestamp.date_naive());
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .map(|timestamp| timestamp.date())
}

// ── Record store pages ──────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub pages: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkoutPage {
    pub workouts: Vec<WorkoutRecord>,
    pub pagination: Pagination,
}

/// Full record set as last fetched from the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkoutCache {
    pub records: Vec<WorkoutRecord>,
    pub refreshed_at: Option<DateTime<Utc>>,
}

// ── Stats ───────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyStats {
    /// `YYYY-MM`
    pub month: String,
    pub workouts: u32,
    pub duration: u64,
    pub types: TypeCounts,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsSummary {
    pub total_workouts: u32,
    pub total_duration: u64,
    pub avg_duration: u64,
    pub workout_types: TypeCounts,
    pub current_streak: u32,
    pub longest_streak: u32,
    pub monthly_data: Vec<MonthlyStats>,
    /// Records left out because their date could not be read.
    pub skipped_records: u32,
}

// ── Dashboard aggregate ─────────────────────────────────

#[derive(Debug, Clone, Copy)]
pub struct DashboardOptions {
    /// Width of the monthly window in calendar months; 0 keeps every month.
    pub months: u32,
    pub recent: usize,
}

impl Default for DashboardOptions {
    fn default() -> Self {
        Self {
            months: 6,
            recent: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardData {
    pub as_of: NaiveDate,
    pub recent_workouts: Vec<WorkoutRecord>,
    pub stats: StatsSummary,
    pub monthly: Vec<MonthlyStats>,
    pub refreshed_at: Option<DateTime<Utc>>,
}

impl DashboardData {
    /// Stats always come from the full record set; only the recent list is cut.
    pub fn build(
        records: &[WorkoutRecord],
        as_of: NaiveDate,
        options: DashboardOptions,
        refreshed_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            as_of,
            recent_workouts: crate::stats::most_recent(records, options.recent),
            stats: crate::stats::compute_stats(records, as_of),
            monthly: crate::stats::monthly_breakdown(records, as_of, options.months),
            refreshed_at,
        }
    }
}
