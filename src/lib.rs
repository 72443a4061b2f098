//! Workout log statistics: the aggregation core, the record store client and
//! the plumbing the `workoutterm` dashboard is built on.

pub mod api;
pub mod config;
pub mod data;
pub mod stats;
pub mod telemetry;

pub use api::{ApiError, WorkoutAPI};
pub use config::Config;
pub use data::{
    DashboardData, DashboardOptions, MonthlyStats, StatsSummary, WorkoutRecord, WorkoutType,
};
pub use stats::{compute_stats, compute_stats_today, monthly_breakdown};
