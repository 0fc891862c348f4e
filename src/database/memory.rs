//! In-process implementation of the store traits, used by tests and by
//! the server when no database is configured for a local demo.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::database::models::{
    LeaveCreditBalance, LeaveCreditFilter, LeaveFilter, LeaveRequest, LeaveResolution,
    LeaveStatus, LeaveType, TimeLogEntry, TimeLogQuery, TimeLogStatus,
};
use crate::database::repositories::{LeaveCreditStore, LeaveRequestStore, TimeLogStore};
use crate::error::AppError;

#[derive(Default)]
pub struct MemoryStore {
    time_logs: RwLock<HashMap<Uuid, TimeLogEntry>>,
    leave_requests: RwLock<HashMap<Uuid, LeaveRequest>>,
    leave_credits: RwLock<HashMap<Uuid, LeaveCreditBalance>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TimeLogStore for MemoryStore {
    async fn insert(&self, entry: &TimeLogEntry) -> Result<TimeLogEntry, AppError> {
        let mut time_logs = self.time_logs.write().await;
        if time_logs.contains_key(&entry.id) {
            return Err(AppError::DuplicateResource(format!(
                "Time log {} already exists",
                entry.id
            )));
        }
        time_logs.insert(entry.id, entry.clone());
        Ok(entry.clone())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<TimeLogEntry>, AppError> {
        Ok(self.time_logs.read().await.get(&id).cloned())
    }

    async fn find(&self, query: &TimeLogQuery) -> Result<Vec<TimeLogEntry>, AppError> {
        let time_logs = self.time_logs.read().await;
        let mut found: Vec<TimeLogEntry> = time_logs
            .values()
            .filter(|e| query.user_id.is_none_or(|uid| e.user_id == uid))
            .filter(|e| query.start_from.is_none_or(|from| e.start_time >= from))
            .filter(|e| query.start_before.is_none_or(|before| e.start_time < before))
            .cloned()
            .collect();
        found.sort_by(|a, b| b.start_time.cmp(&a.start_time));
        Ok(found)
    }

    async fn update(
        &self,
        entry: &TimeLogEntry,
        expected: TimeLogStatus,
    ) -> Result<Option<TimeLogEntry>, AppError> {
        let mut time_logs = self.time_logs.write().await;
        match time_logs.get_mut(&entry.id) {
            Some(stored) if stored.status == expected => {
                *stored = TimeLogEntry {
                    user_id: stored.user_id,
                    created_at: stored.created_at,
                    ..entry.clone()
                };
                Ok(Some(stored.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn finalize_if_open(
        &self,
        entry: &TimeLogEntry,
    ) -> Result<Option<TimeLogEntry>, AppError> {
        let mut time_logs = self.time_logs.write().await;
        match time_logs.get_mut(&entry.id) {
            Some(stored) if stored.status != TimeLogStatus::Stopped => {
                *stored = TimeLogEntry {
                    user_id: stored.user_id,
                    created_at: stored.created_at,
                    ..entry.clone()
                };
                Ok(Some(stored.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn delete(&self, id: Uuid) -> Result<bool, AppError> {
        Ok(self.time_logs.write().await.remove(&id).is_some())
    }
}

#[async_trait]
impl LeaveRequestStore for MemoryStore {
    async fn insert(&self, request: &LeaveRequest) -> Result<LeaveRequest, AppError> {
        let mut leaves = self.leave_requests.write().await;
        if leaves.contains_key(&request.id) {
            return Err(AppError::DuplicateResource(format!(
                "Leave request {} already exists",
                request.id
            )));
        }
        leaves.insert(request.id, request.clone());
        Ok(request.clone())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<LeaveRequest>, AppError> {
        Ok(self.leave_requests.read().await.get(&id).cloned())
    }

    async fn find(&self, filter: &LeaveFilter) -> Result<Vec<LeaveRequest>, AppError> {
        let leaves = self.leave_requests.read().await;
        let mut found: Vec<LeaveRequest> = leaves
            .values()
            .filter(|l| filter.user_id.is_none_or(|uid| l.user_id == uid))
            .filter(|l| filter.status.is_none_or(|s| l.status == s))
            .cloned()
            .collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(found)
    }

    async fn find_overlapping(
        &self,
        user_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
        exclude: Option<Uuid>,
    ) -> Result<Vec<LeaveRequest>, AppError> {
        let leaves = self.leave_requests.read().await;
        Ok(leaves
            .values()
            .filter(|l| l.user_id == user_id)
            .filter(|l| matches!(l.status, LeaveStatus::Pending | LeaveStatus::Approved))
            .filter(|l| l.start_date <= end && l.end_date >= start)
            .filter(|l| exclude != Some(l.id))
            .cloned()
            .collect())
    }

    async fn update(
        &self,
        request: &LeaveRequest,
        expected: LeaveStatus,
    ) -> Result<Option<LeaveRequest>, AppError> {
        let mut leaves = self.leave_requests.write().await;
        match leaves.get_mut(&request.id) {
            Some(stored) if stored.status == expected => {
                *stored = LeaveRequest {
                    user_id: stored.user_id,
                    created_at: stored.created_at,
                    ..request.clone()
                };
                Ok(Some(stored.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn resolve(
        &self,
        id: Uuid,
        resolution: &LeaveResolution,
    ) -> Result<Option<LeaveRequest>, AppError> {
        let mut leaves = self.leave_requests.write().await;
        match leaves.get_mut(&id) {
            Some(stored) if stored.status == LeaveStatus::Pending => {
                stored.status = resolution.status;
                stored.approved_by = Some(resolution.approved_by);
                stored.approved_at = Some(resolution.approved_at);
                if resolution.notes.is_some() {
                    stored.notes = resolution.notes.clone();
                }
                stored.updated_at = Utc::now();
                Ok(Some(stored.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn delete(&self, id: Uuid, only_pending: bool) -> Result<bool, AppError> {
        let mut leaves = self.leave_requests.write().await;
        let deletable = leaves
            .get(&id)
            .is_some_and(|l| !only_pending || l.status == LeaveStatus::Pending);
        if deletable {
            leaves.remove(&id);
        }
        Ok(deletable)
    }
}

#[async_trait]
impl LeaveCreditStore for MemoryStore {
    async fn insert(&self, balance: &LeaveCreditBalance) -> Result<LeaveCreditBalance, AppError> {
        let mut credits = self.leave_credits.write().await;
        let duplicate = credits.values().any(|c| {
            c.user_id == balance.user_id
                && c.year == balance.year
                && c.leave_type == balance.leave_type
        });
        if duplicate || credits.contains_key(&balance.id) {
            return Err(AppError::DuplicateResource(format!(
                "Leave credits already exist for user {} ({} {})",
                balance.user_id, balance.year, balance.leave_type
            )));
        }
        credits.insert(balance.id, balance.clone());
        Ok(balance.clone())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<LeaveCreditBalance>, AppError> {
        Ok(self.leave_credits.read().await.get(&id).cloned())
    }

    async fn find_by_key(
        &self,
        user_id: Uuid,
        year: i32,
        leave_type: LeaveType,
    ) -> Result<Option<LeaveCreditBalance>, AppError> {
        let credits = self.leave_credits.read().await;
        Ok(credits
            .values()
            .find(|c| c.user_id == user_id && c.year == year && c.leave_type == leave_type)
            .cloned())
    }

    async fn find(&self, filter: &LeaveCreditFilter) -> Result<Vec<LeaveCreditBalance>, AppError> {
        let credits = self.leave_credits.read().await;
        let mut found: Vec<LeaveCreditBalance> = credits
            .values()
            .filter(|c| filter.user_id.is_none_or(|uid| c.user_id == uid))
            .filter(|c| filter.year.is_none_or(|year| c.year == year))
            .cloned()
            .collect();
        found.sort_by(|a, b| {
            b.year
                .cmp(&a.year)
                .then_with(|| a.leave_type.as_str().cmp(b.leave_type.as_str()))
        });
        Ok(found)
    }

    async fn adjust_used(
        &self,
        id: Uuid,
        delta: f64,
    ) -> Result<Option<LeaveCreditBalance>, AppError> {
        let mut credits = self.leave_credits.write().await;
        Ok(credits.get_mut(&id).map(|credit| {
            credit.apply_used_delta(delta);
            credit.updated_at = Utc::now();
            credit.clone()
        }))
    }

    async fn set_total(
        &self,
        id: Uuid,
        total_credits: f64,
    ) -> Result<Option<LeaveCreditBalance>, AppError> {
        let mut credits = self.leave_credits.write().await;
        Ok(credits.get_mut(&id).map(|credit| {
            credit.apply_total(total_credits);
            credit.updated_at = Utc::now();
            credit.clone()
        }))
    }
}
