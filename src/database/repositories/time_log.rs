use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::database::{
    models::{TimeLogEntry, TimeLogQuery, TimeLogStatus},
    repositories::TimeLogStore,
    utils::sql,
};
use crate::error::AppError;

const TIME_LOG_COLUMNS: &str = r#"
    id,
    user_id,
    project_id,
    task_id,
    description,
    start_time,
    end_time,
    duration,
    status,
    billable,
    hourly_rate,
    note,
    total_hours,
    regular_hours,
    overtime_hours,
    overtime_reason,
    created_at,
    updated_at
"#;

#[derive(Clone)]
pub struct TimeLogRepository {
    pool: PgPool,
}

impl TimeLogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Overwrite the mutable fields when the stored status satisfies
    /// `condition`, which compares against `status`
    async fn write_fields(
        &self,
        entry: &TimeLogEntry,
        condition: &str,
        status: TimeLogStatus,
    ) -> Result<Option<TimeLogEntry>, AppError> {
        let query = format!(
            r#"
            UPDATE
                time_logs
            SET
                project_id = ?,
                task_id = ?,
                description = ?,
                start_time = ?,
                end_time = ?,
                duration = ?,
                status = ?,
                billable = ?,
                hourly_rate = ?,
                note = ?,
                total_hours = ?,
                regular_hours = ?,
                overtime_hours = ?,
                overtime_reason = ?,
                updated_at = ?
            WHERE
                id = ?
                AND {condition}
            RETURNING
                {TIME_LOG_COLUMNS}
            "#
        );

        let query = sql(&query);
        let time_log = sqlx::query_as::<_, TimeLogEntry>(&query)
            .bind(entry.project_id)
            .bind(entry.task_id)
            .bind(&entry.description)
            .bind(entry.start_time)
            .bind(entry.end_time)
            .bind(entry.duration)
            .bind(entry.status)
            .bind(entry.billable)
            .bind(entry.hourly_rate)
            .bind(&entry.note)
            .bind(entry.total_hours)
            .bind(entry.regular_hours)
            .bind(entry.overtime_hours)
            .bind(&entry.overtime_reason)
            .bind(entry.updated_at)
            .bind(entry.id)
            .bind(status)
            .fetch_optional(&self.pool)
            .await?;

        Ok(time_log)
    }
}

#[async_trait]
impl TimeLogStore for TimeLogRepository {
    async fn insert(&self, entry: &TimeLogEntry) -> Result<TimeLogEntry, AppError> {
        let query = format!(
            r#"
            INSERT INTO
                time_logs ({TIME_LOG_COLUMNS})
            VALUES
                (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING
                {TIME_LOG_COLUMNS}
            "#
        );

        let time_log = sqlx::query_as::<_, TimeLogEntry>(&sql(&query))
            .bind(entry.id)
            .bind(entry.user_id)
            .bind(entry.project_id)
            .bind(entry.task_id)
            .bind(&entry.description)
            .bind(entry.start_time)
            .bind(entry.end_time)
            .bind(entry.duration)
            .bind(entry.status)
            .bind(entry.billable)
            .bind(entry.hourly_rate)
            .bind(&entry.note)
            .bind(entry.total_hours)
            .bind(entry.regular_hours)
            .bind(entry.overtime_hours)
            .bind(&entry.overtime_reason)
            .bind(entry.created_at)
            .bind(entry.updated_at)
            .fetch_one(&self.pool)
            .await?;

        Ok(time_log)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<TimeLogEntry>, AppError> {
        let query = format!("SELECT {TIME_LOG_COLUMNS} FROM time_logs WHERE id = ?");

        let time_log = sqlx::query_as::<_, TimeLogEntry>(&sql(&query))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(time_log)
    }

    async fn find(&self, query: &TimeLogQuery) -> Result<Vec<TimeLogEntry>, AppError> {
        let statement = format!(
            r#"
            SELECT
                {TIME_LOG_COLUMNS}
            FROM
                time_logs
            WHERE
                (?::uuid IS NULL OR user_id = ?)
                AND (?::timestamptz IS NULL OR start_time >= ?)
                AND (?::timestamptz IS NULL OR start_time < ?)
            ORDER BY
                start_time DESC
            "#
        );

        let time_logs = sqlx::query_as::<_, TimeLogEntry>(&sql(&statement))
            .bind(query.user_id)
            .bind(query.user_id)
            .bind(query.start_from)
            .bind(query.start_from)
            .bind(query.start_before)
            .bind(query.start_before)
            .fetch_all(&self.pool)
            .await?;

        Ok(time_logs)
    }

    async fn update(
        &self,
        entry: &TimeLogEntry,
        expected: TimeLogStatus,
    ) -> Result<Option<TimeLogEntry>, AppError> {
        self.write_fields(entry, "status = ?", expected).await
    }

    async fn finalize_if_open(
        &self,
        entry: &TimeLogEntry,
    ) -> Result<Option<TimeLogEntry>, AppError> {
        self.write_fields(entry, "status <> ?", TimeLogStatus::Stopped)
            .await
    }

    async fn delete(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query(&sql("DELETE FROM time_logs WHERE id = ?"))
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
