use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::macros::string_enum;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct LeaveRequest {
    pub id: Uuid,
    pub user_id: Uuid,
    pub leave_type: LeaveType,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub total_days: i32,
    pub reason: String,
    pub description: Option<String>,
    pub status: LeaveStatus,
    pub approved_by: Option<Uuid>,
    pub approved_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

string_enum! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub enum LeaveType {
        Vacation => "vacation",
        Sick => "sick",
        Personal => "personal",
        Maternity => "maternity",
        Paternity => "paternity",
        Bereavement => "bereavement",
        Unpaid => "unpaid",
        Other => "other",
    }
}

string_enum! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum LeaveStatus {
        Pending => "pending",
        Approved => "approved",
        Rejected => "rejected",
    }
}

impl LeaveStatus {
    pub fn is_resolved(&self) -> bool {
        !matches!(self, LeaveStatus::Pending)
    }
}

/// Submission body. Required fields are optional here so that a missing
/// field is reported as a validation error rather than a parse failure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct LeaveRequestInput {
    pub leave_type: Option<LeaveType>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub reason: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct LeaveRequestPatch {
    pub leave_type: Option<LeaveType>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub reason: Option<String>,
    pub description: Option<String>,
    pub notes: Option<String>,
    pub status: Option<LeaveStatus>,
}

impl LeaveRequestPatch {
    pub fn is_empty(&self) -> bool {
        self.leave_type.is_none()
            && self.start_date.is_none()
            && self.end_date.is_none()
            && self.reason.is_none()
            && self.description.is_none()
            && self.notes.is_none()
            && self.status.is_none()
    }

    /// Fields reserved for approvers
    pub fn touches_resolution(&self) -> bool {
        self.status.is_some() || self.notes.is_some()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ResolutionInput {
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaveFilter {
    pub user_id: Option<Uuid>,
    pub status: Option<LeaveStatus>,
}

/// A resolution written only if the request is still pending
#[derive(Debug, Clone)]
pub struct LeaveResolution {
    pub status: LeaveStatus,
    pub approved_by: Uuid,
    pub approved_at: DateTime<Utc>,
    pub notes: Option<String>,
}
