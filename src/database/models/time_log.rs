use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::macros::string_enum;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct TimeLogEntry {
    pub id: Uuid,
    pub user_id: Uuid,
    pub project_id: Option<Uuid>,
    pub task_id: Option<Uuid>,
    pub description: String,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub duration: i64, // seconds
    pub status: TimeLogStatus,
    pub billable: bool,
    pub hourly_rate: Option<f64>,
    pub note: Option<String>,
    pub total_hours: Option<f64>,
    pub regular_hours: Option<f64>,
    pub overtime_hours: Option<f64>,
    pub overtime_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

string_enum! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum TimeLogStatus {
        Running => "running",
        Paused => "paused",
        Stopped => "stopped",
    }
}

/// A time-log entry as produced by a stopped timer, a manual entry or a
/// direct client submission, before the owner and derived fields are set.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewTimeLog {
    /// Server-side running entry to finalize instead of inserting a new one
    pub log_id: Option<Uuid>,
    pub project_id: Option<Uuid>,
    pub task_id: Option<Uuid>,
    #[serde(default)]
    pub description: String,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub duration: Option<i64>,
    #[serde(default)]
    pub billable: bool,
    pub hourly_rate: Option<f64>,
    pub note: Option<String>,
    pub overtime_reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ManualTimeEntryInput {
    pub project_id: Option<Uuid>,
    pub task_id: Option<Uuid>,
    #[serde(default)]
    pub description: String,
    /// Free-form duration text: "1h 30m", "1:30" or minutes
    pub duration: String,
    #[serde(default)]
    pub billable: bool,
    pub hourly_rate: Option<f64>,
    pub note: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TimeLogPatch {
    pub description: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub billable: Option<bool>,
    pub hourly_rate: Option<f64>,
    pub note: Option<String>,
    pub overtime_reason: Option<String>,
}

impl TimeLogPatch {
    pub fn is_empty(&self) -> bool {
        self.description.is_none()
            && self.start_time.is_none()
            && self.end_time.is_none()
            && self.billable.is_none()
            && self.hourly_rate.is_none()
            && self.note.is_none()
            && self.overtime_reason.is_none()
    }

    pub fn touches_interval(&self) -> bool {
        self.start_time.is_some() || self.end_time.is_some()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeLogFilter {
    pub user_id: Option<Uuid>,
    /// Inclusive lower bound on the start date
    pub from: Option<NaiveDate>,
    /// Inclusive upper bound on the start date
    pub to: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TimeLogSummary {
    pub user_id: Option<Uuid>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub entry_count: usize,
    pub total_seconds: i64,
    pub total_hours: f64,
    pub regular_hours: f64,
    pub overtime_hours: f64,
    pub billable_hours: f64,
}

/// Store-level filter with bounds already resolved to instants
#[derive(Debug, Clone, Default)]
pub struct TimeLogQuery {
    pub user_id: Option<Uuid>,
    pub start_from: Option<DateTime<Utc>>,
    pub start_before: Option<DateTime<Utc>>,
}
