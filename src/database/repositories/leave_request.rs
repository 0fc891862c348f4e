use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::database::{
    models::{LeaveFilter, LeaveRequest, LeaveResolution, LeaveStatus},
    repositories::LeaveRequestStore,
    utils::sql,
};
use crate::error::AppError;

const LEAVE_COLUMNS: &str = r#"
    id,
    user_id,
    leave_type,
    start_date,
    end_date,
    total_days,
    reason,
    description,
    status,
    approved_by,
    approved_at,
    notes,
    created_at,
    updated_at
"#;

#[derive(Clone)]
pub struct LeaveRequestRepository {
    pool: PgPool,
}

impl LeaveRequestRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LeaveRequestStore for LeaveRequestRepository {
    async fn insert(&self, request: &LeaveRequest) -> Result<LeaveRequest, AppError> {
        let query = format!(
            r#"
            INSERT INTO
                leave_requests ({LEAVE_COLUMNS})
            VALUES
                (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING
                {LEAVE_COLUMNS}
            "#
        );

        let leave = sqlx::query_as::<_, LeaveRequest>(&sql(&query))
            .bind(request.id)
            .bind(request.user_id)
            .bind(request.leave_type)
            .bind(request.start_date)
            .bind(request.end_date)
            .bind(request.total_days)
            .bind(&request.reason)
            .bind(&request.description)
            .bind(request.status)
            .bind(request.approved_by)
            .bind(request.approved_at)
            .bind(&request.notes)
            .bind(request.created_at)
            .bind(request.updated_at)
            .fetch_one(&self.pool)
            .await?;

        Ok(leave)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<LeaveRequest>, AppError> {
        let query = format!("SELECT {LEAVE_COLUMNS} FROM leave_requests WHERE id = ?");

        let leave = sqlx::query_as::<_, LeaveRequest>(&sql(&query))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(leave)
    }

    async fn find(&self, filter: &LeaveFilter) -> Result<Vec<LeaveRequest>, AppError> {
        let query = format!(
            r#"
            SELECT
                {LEAVE_COLUMNS}
            FROM
                leave_requests
            WHERE
                (?::uuid IS NULL OR user_id = ?)
                AND (?::varchar IS NULL OR status = ?)
            ORDER BY
                created_at DESC
            "#
        );

        let status = filter.status.map(|s| s.as_str());

        let leaves = sqlx::query_as::<_, LeaveRequest>(&sql(&query))
            .bind(filter.user_id)
            .bind(filter.user_id)
            .bind(status)
            .bind(status)
            .fetch_all(&self.pool)
            .await?;

        Ok(leaves)
    }

    async fn find_overlapping(
        &self,
        user_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
        exclude: Option<Uuid>,
    ) -> Result<Vec<LeaveRequest>, AppError> {
        let query = format!(
            r#"
            SELECT
                {LEAVE_COLUMNS}
            FROM
                leave_requests
            WHERE
                user_id = ?
                AND status IN (?, ?)
                AND start_date <= ?
                AND end_date >= ?
                AND (?::uuid IS NULL OR id <> ?)
            "#
        );

        let leaves = sqlx::query_as::<_, LeaveRequest>(&sql(&query))
            .bind(user_id)
            .bind(LeaveStatus::Pending)
            .bind(LeaveStatus::Approved)
            .bind(end)
            .bind(start)
            .bind(exclude)
            .bind(exclude)
            .fetch_all(&self.pool)
            .await?;

        Ok(leaves)
    }

    async fn update(
        &self,
        request: &LeaveRequest,
        expected: LeaveStatus,
    ) -> Result<Option<LeaveRequest>, AppError> {
        let query = format!(
            r#"
            UPDATE
                leave_requests
            SET
                leave_type = ?,
                start_date = ?,
                end_date = ?,
                total_days = ?,
                reason = ?,
                description = ?,
                status = ?,
                approved_by = ?,
                approved_at = ?,
                notes = ?,
                updated_at = ?
            WHERE
                id = ?
                AND status = ?
            RETURNING
                {LEAVE_COLUMNS}
            "#
        );

        let leave = sqlx::query_as::<_, LeaveRequest>(&sql(&query))
            .bind(request.leave_type)
            .bind(request.start_date)
            .bind(request.end_date)
            .bind(request.total_days)
            .bind(&request.reason)
            .bind(&request.description)
            .bind(request.status)
            .bind(request.approved_by)
            .bind(request.approved_at)
            .bind(&request.notes)
            .bind(request.updated_at)
            .bind(request.id)
            .bind(expected)
            .fetch_optional(&self.pool)
            .await?;

        Ok(leave)
    }

    async fn resolve(
        &self,
        id: Uuid,
        resolution: &LeaveResolution,
    ) -> Result<Option<LeaveRequest>, AppError> {
        let query = format!(
            r#"
            UPDATE
                leave_requests
            SET
                status = ?,
                approved_by = ?,
                approved_at = ?,
                notes = COALESCE(?, notes),
                updated_at = ?
            WHERE
                id = ?
                AND status = ?
            RETURNING
                {LEAVE_COLUMNS}
            "#
        );

        let leave = sqlx::query_as::<_, LeaveRequest>(&sql(&query))
            .bind(resolution.status)
            .bind(resolution.approved_by)
            .bind(resolution.approved_at)
            .bind(&resolution.notes)
            .bind(Utc::now())
            .bind(id)
            .bind(LeaveStatus::Pending)
            .fetch_optional(&self.pool)
            .await?;

        Ok(leave)
    }

    async fn delete(&self, id: Uuid, only_pending: bool) -> Result<bool, AppError> {
        let result = if only_pending {
            sqlx::query(&sql("DELETE FROM leave_requests WHERE id = ? AND status = ?"))
                .bind(id)
                .bind(LeaveStatus::Pending)
                .execute(&self.pool)
                .await?
        } else {
            sqlx::query(&sql("DELETE FROM leave_requests WHERE id = ?"))
                .bind(id)
                .execute(&self.pool)
                .await?
        };

        Ok(result.rows_affected() > 0)
    }
}
