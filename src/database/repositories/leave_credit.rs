use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use crate::database::{
    models::{LeaveCreditBalance, LeaveCreditFilter, LeaveType},
    repositories::LeaveCreditStore,
    utils::sql,
};
use crate::error::AppError;

const CREDIT_COLUMNS: &str = r#"
    id,
    user_id,
    year,
    leave_type,
    total_credits,
    used_credits,
    remaining_credits,
    created_at,
    updated_at
"#;

#[derive(Clone)]
pub struct LeaveCreditRepository {
    pool: PgPool,
}

impl LeaveCreditRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LeaveCreditStore for LeaveCreditRepository {
    async fn insert(&self, balance: &LeaveCreditBalance) -> Result<LeaveCreditBalance, AppError> {
        // The unique index on (user_id, year, leave_type) turns a concurrent
        // duplicate into a unique violation, mapped to DuplicateResource
        let query = format!(
            r#"
            INSERT INTO
                leave_credits ({CREDIT_COLUMNS})
            VALUES
                (?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING
                {CREDIT_COLUMNS}
            "#
        );

        let credit = sqlx::query_as::<_, LeaveCreditBalance>(&sql(&query))
            .bind(balance.id)
            .bind(balance.user_id)
            .bind(balance.year)
            .bind(balance.leave_type)
            .bind(balance.total_credits)
            .bind(balance.used_credits)
            .bind(balance.remaining_credits)
            .bind(balance.created_at)
            .bind(balance.updated_at)
            .fetch_one(&self.pool)
            .await?;

        Ok(credit)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<LeaveCreditBalance>, AppError> {
        let query = format!("SELECT {CREDIT_COLUMNS} FROM leave_credits WHERE id = ?");

        let credit = sqlx::query_as::<_, LeaveCreditBalance>(&sql(&query))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(credit)
    }

    async fn find_by_key(
        &self,
        user_id: Uuid,
        year: i32,
        leave_type: LeaveType,
    ) -> Result<Option<LeaveCreditBalance>, AppError> {
        let query = format!(
            r#"
            SELECT
                {CREDIT_COLUMNS}
            FROM
                leave_credits
            WHERE
                user_id = ?
                AND year = ?
                AND leave_type = ?
            "#
        );

        let credit = sqlx::query_as::<_, LeaveCreditBalance>(&sql(&query))
            .bind(user_id)
            .bind(year)
            .bind(leave_type)
            .fetch_optional(&self.pool)
            .await?;

        Ok(credit)
    }

    async fn find(&self, filter: &LeaveCreditFilter) -> Result<Vec<LeaveCreditBalance>, AppError> {
        let query = format!(
            r#"
            SELECT
                {CREDIT_COLUMNS}
            FROM
                leave_credits
            WHERE
                (?::uuid IS NULL OR user_id = ?)
                AND (?::integer IS NULL OR year = ?)
            ORDER BY
                year DESC,
                leave_type
            "#
        );

        let credits = sqlx::query_as::<_, LeaveCreditBalance>(&sql(&query))
            .bind(filter.user_id)
            .bind(filter.user_id)
            .bind(filter.year)
            .bind(filter.year)
            .fetch_all(&self.pool)
            .await?;

        Ok(credits)
    }

    async fn adjust_used(
        &self,
        id: Uuid,
        delta: f64,
    ) -> Result<Option<LeaveCreditBalance>, AppError> {
        let query = format!(
            r#"
            UPDATE
                leave_credits
            SET
                used_credits = used_credits + ?,
                remaining_credits = total_credits - (used_credits + ?),
                updated_at = ?
            WHERE
                id = ?
            RETURNING
                {CREDIT_COLUMNS}
            "#
        );

        let credit = sqlx::query_as::<_, LeaveCreditBalance>(&sql(&query))
            .bind(delta)
            .bind(delta)
            .bind(Utc::now())
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(credit)
    }

    async fn set_total(
        &self,
        id: Uuid,
        total_credits: f64,
    ) -> Result<Option<LeaveCreditBalance>, AppError> {
        let query = format!(
            r#"
            UPDATE
                leave_credits
            SET
                total_credits = ?,
                remaining_credits = ? - used_credits,
                updated_at = ?
            WHERE
                id = ?
            RETURNING
                {CREDIT_COLUMNS}
            "#
        );

        let credit = sqlx::query_as::<_, LeaveCreditBalance>(&sql(&query))
            .bind(total_credits)
            .bind(total_credits)
            .bind(Utc::now())
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(credit)
    }
}
