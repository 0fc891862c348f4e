use std::sync::Arc;

use uuid::Uuid;

use crate::database::models::{LeaveCreditBalance, LeaveCreditFilter, LeaveCreditInput};
use crate::database::repositories::LeaveCreditStore;
use crate::error::AppError;
use crate::services::auth::Principal;

#[derive(Clone)]
pub struct LeaveCreditService {
    store: Arc<dyn LeaveCreditStore>,
}

fn validate_credits(value: f64, field: &str) -> Result<(), AppError> {
    if !value.is_finite() {
        return Err(AppError::validation(format!("{} must be a number", field)));
    }
    Ok(())
}

fn warn_if_overdrawn(balance: &LeaveCreditBalance) {
    if balance.remaining_credits < 0.0 {
        log::warn!(
            "Leave credits for user {} ({} {}) are overdrawn: {} remaining",
            balance.user_id,
            balance.year,
            balance.leave_type,
            balance.remaining_credits
        );
    }
}

impl LeaveCreditService {
    pub fn new(store: Arc<dyn LeaveCreditStore>) -> Self {
        Self { store }
    }

    pub async fn create(
        &self,
        principal: &Principal,
        input: LeaveCreditInput,
    ) -> Result<LeaveCreditBalance, AppError> {
        principal.requires_elevated("manage leave credits")?;
        validate_credits(input.total_credits, "Total credits")?;
        if input.total_credits < 0.0 {
            return Err(AppError::validation("Total credits must not be negative"));
        }
        if !(1900..=9999).contains(&input.year) {
            return Err(AppError::validation("Year is out of range"));
        }

        if self
            .store
            .find_by_key(input.user_id, input.year, input.leave_type)
            .await?
            .is_some()
        {
            return Err(AppError::DuplicateResource(format!(
                "Leave credits for {} {} already exist for this user",
                input.year, input.leave_type
            )));
        }

        let balance = LeaveCreditBalance::new(
            input.user_id,
            input.year,
            input.leave_type,
            input.total_credits,
        );
        let saved = self.store.insert(&balance).await?;

        log::info!(
            "Granted {} {} credits for {} to user {}",
            saved.total_credits,
            saved.leave_type,
            saved.year,
            saved.user_id
        );
        Ok(saved)
    }

    /// Consume (`delta > 0`) or restore (`delta < 0`) credits
    pub async fn adjust(
        &self,
        principal: &Principal,
        id: Uuid,
        delta: f64,
    ) -> Result<LeaveCreditBalance, AppError> {
        principal.requires_elevated("manage leave credits")?;
        validate_credits(delta, "Delta")?;

        let balance = self
            .store
            .adjust_used(id, delta)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Leave credit balance {} not found", id)))?;

        warn_if_overdrawn(&balance);
        Ok(balance)
    }

    pub async fn set_total(
        &self,
        principal: &Principal,
        id: Uuid,
        total_credits: f64,
    ) -> Result<LeaveCreditBalance, AppError> {
        principal.requires_elevated("manage leave credits")?;
        validate_credits(total_credits, "Total credits")?;
        if total_credits < 0.0 {
            return Err(AppError::validation("Total credits must not be negative"));
        }

        let balance = self
            .store
            .set_total(id, total_credits)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Leave credit balance {} not found", id)))?;

        warn_if_overdrawn(&balance);
        Ok(balance)
    }

    pub async fn get(
        &self,
        principal: &Principal,
        id: Uuid,
    ) -> Result<LeaveCreditBalance, AppError> {
        let balance = self
            .store
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Leave credit balance {} not found", id)))?;

        principal.requires_access(balance.user_id, "leave credits")?;
        Ok(balance)
    }

    pub async fn list(
        &self,
        principal: &Principal,
        filter: &LeaveCreditFilter,
    ) -> Result<Vec<LeaveCreditBalance>, AppError> {
        let scoped = LeaveCreditFilter {
            user_id: principal.scope_user(filter.user_id),
            year: filter.year,
        };
        self.store.find(&scoped).await
    }
}
