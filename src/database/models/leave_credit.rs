use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::leave::LeaveType;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct LeaveCreditBalance {
    pub id: Uuid,
    pub user_id: Uuid,
    pub year: i32,
    pub leave_type: LeaveType,
    pub total_credits: f64,
    pub used_credits: f64,
    pub remaining_credits: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl LeaveCreditBalance {
    pub fn new(user_id: Uuid, year: i32, leave_type: LeaveType, total_credits: f64) -> Self {
        let now = Utc::now();
        LeaveCreditBalance {
            id: Uuid::new_v4(),
            user_id,
            year,
            leave_type,
            total_credits,
            used_credits: 0.0,
            remaining_credits: total_credits,
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply a change to used credits, keeping remaining in step
    pub fn apply_used_delta(&mut self, delta: f64) {
        self.used_credits += delta;
        self.remaining_credits = self.total_credits - self.used_credits;
    }

    /// Replace the quota, keeping remaining in step
    pub fn apply_total(&mut self, total_credits: f64) {
        self.total_credits = total_credits;
        self.remaining_credits = self.total_credits - self.used_credits;
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct LeaveCreditInput {
    pub user_id: Uuid,
    pub year: i32,
    pub leave_type: LeaveType,
    pub total_credits: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct LeaveCreditAdjustment {
    /// Credits consumed (positive) or restored (negative)
    pub delta: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct LeaveCreditTotalUpdate {
    pub total_credits: f64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaveCreditFilter {
    pub user_id: Option<Uuid>,
    pub year: Option<i32>,
}
