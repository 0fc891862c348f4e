//! Persistence seams. Each store trait is implemented by a Postgres
//! repository in this module and by [`crate::database::memory::MemoryStore`].
//!
//! Conditional writes (`finalize_if_open`, `update` with an expected status,
//! `resolve`, `delete` with `only_pending`, `adjust_used`, `set_total`) must be
//! applied atomically by the store: the precondition and the write happen in
//! a single statement, never as a read followed by a write.

use async_trait::async_trait;
use chrono::NaiveDate;
use uuid::Uuid;

use crate::database::models::{
    LeaveCreditBalance, LeaveCreditFilter, LeaveFilter, LeaveRequest, LeaveResolution,
    LeaveStatus, LeaveType, TimeLogEntry, TimeLogQuery, TimeLogStatus,
};
use crate::error::AppError;

pub mod leave_credit;
pub mod leave_request;
pub mod time_log;

// Re-export all repositories for easy importing
pub use leave_credit::LeaveCreditRepository;
pub use leave_request::LeaveRequestRepository;
pub use time_log::TimeLogRepository;

#[async_trait]
pub trait TimeLogStore: Send + Sync {
    async fn insert(&self, entry: &TimeLogEntry) -> Result<TimeLogEntry, AppError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<TimeLogEntry>, AppError>;

    /// Entries matching the query, newest start first
    async fn find(&self, query: &TimeLogQuery) -> Result<Vec<TimeLogEntry>, AppError>;

    /// Overwrite the mutable fields of an entry whose stored status is still
    /// `expected`
    async fn update(
        &self,
        entry: &TimeLogEntry,
        expected: TimeLogStatus,
    ) -> Result<Option<TimeLogEntry>, AppError>;

    /// Write a finished entry only if the stored one is not yet stopped
    async fn finalize_if_open(&self, entry: &TimeLogEntry)
    -> Result<Option<TimeLogEntry>, AppError>;

    async fn delete(&self, id: Uuid) -> Result<bool, AppError>;
}

#[async_trait]
pub trait LeaveRequestStore: Send + Sync {
    async fn insert(&self, request: &LeaveRequest) -> Result<LeaveRequest, AppError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<LeaveRequest>, AppError>;

    /// Requests matching the filter, newest first
    async fn find(&self, filter: &LeaveFilter) -> Result<Vec<LeaveRequest>, AppError>;

    /// Pending or approved requests of `user_id` intersecting `[start, end]`
    async fn find_overlapping(
        &self,
        user_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
        exclude: Option<Uuid>,
    ) -> Result<Vec<LeaveRequest>, AppError>;

    /// Overwrite a request whose stored status is still `expected`
    async fn update(
        &self,
        request: &LeaveRequest,
        expected: LeaveStatus,
    ) -> Result<Option<LeaveRequest>, AppError>;

    /// Resolve a request that is still pending
    async fn resolve(
        &self,
        id: Uuid,
        resolution: &LeaveResolution,
    ) -> Result<Option<LeaveRequest>, AppError>;

    async fn delete(&self, id: Uuid, only_pending: bool) -> Result<bool, AppError>;
}

#[async_trait]
pub trait LeaveCreditStore: Send + Sync {
    /// Fails with `DuplicateResource` if (user, year, type) already exists
    async fn insert(&self, balance: &LeaveCreditBalance) -> Result<LeaveCreditBalance, AppError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<LeaveCreditBalance>, AppError>;

    async fn find_by_key(
        &self,
        user_id: Uuid,
        year: i32,
        leave_type: LeaveType,
    ) -> Result<Option<LeaveCreditBalance>, AppError>;

    async fn find(&self, filter: &LeaveCreditFilter) -> Result<Vec<LeaveCreditBalance>, AppError>;

    /// `used += delta` and `remaining = total - used` in one write
    async fn adjust_used(&self, id: Uuid, delta: f64)
    -> Result<Option<LeaveCreditBalance>, AppError>;

    /// `total = total_credits` and `remaining = total - used` in one write
    async fn set_total(
        &self,
        id: Uuid,
        total_credits: f64,
    ) -> Result<Option<LeaveCreditBalance>, AppError>;
}
