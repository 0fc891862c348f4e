//! Leave request workflow: `pending -> approved | rejected`.
//!
//! Every transition out of `pending` is written with a conditional update,
//! so two approvers racing on the same request cannot both win.

use std::sync::Arc;

use chrono::{Datelike, FixedOffset, NaiveDate, Utc};
use uuid::Uuid;

use crate::database::models::{
    LeaveFilter, LeaveRequest, LeaveRequestInput, LeaveRequestPatch, LeaveResolution, LeaveStatus,
    ResolutionInput,
};
use crate::database::repositories::{LeaveCreditStore, LeaveRequestStore};
use crate::error::AppError;
use crate::services::auth::Principal;

#[derive(Clone)]
pub struct LeaveService {
    requests: Arc<dyn LeaveRequestStore>,
    credits: Arc<dyn LeaveCreditStore>,
    utc_offset: FixedOffset,
    auto_debit: bool,
}

fn inclusive_days(start: NaiveDate, end: NaiveDate) -> Result<i32, AppError> {
    i32::try_from((end - start).num_days() + 1)
        .map_err(|_| AppError::validation("Leave period is too long"))
}

fn validate_range(start: NaiveDate, end: NaiveDate, today: NaiveDate) -> Result<(), AppError> {
    if end < start {
        return Err(AppError::validation("End date must be after start date"));
    }
    if start < today {
        return Err(AppError::validation("Start date cannot be in the past"));
    }
    Ok(())
}

fn required_text(value: Option<String>, field: &str) -> Result<String, AppError> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::validation(format!("{} is required", field)))
}

fn not_found(id: Uuid) -> AppError {
    AppError::NotFound(format!("Leave request {} not found", id))
}

impl LeaveService {
    pub fn new(
        requests: Arc<dyn LeaveRequestStore>,
        credits: Arc<dyn LeaveCreditStore>,
        utc_offset: FixedOffset,
        auto_debit: bool,
    ) -> Self {
        Self {
            requests,
            credits,
            utc_offset,
            auto_debit,
        }
    }

    /// Current calendar date in the business offset
    pub fn today(&self) -> NaiveDate {
        Utc::now().with_timezone(&self.utc_offset).date_naive()
    }

    async fn ensure_no_overlap(
        &self,
        user_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
        exclude: Option<Uuid>,
    ) -> Result<(), AppError> {
        let overlapping = self
            .requests
            .find_overlapping(user_id, start, end, exclude)
            .await?;

        match overlapping.first() {
            Some(existing) => Err(AppError::validation(format!(
                "Leave overlaps an existing {} request from {} to {}",
                existing.status, existing.start_date, existing.end_date
            ))),
            None => Ok(()),
        }
    }

    pub async fn submit(
        &self,
        principal: &Principal,
        input: LeaveRequestInput,
    ) -> Result<LeaveRequest, AppError> {
        let leave_type = input
            .leave_type
            .ok_or_else(|| AppError::validation("Leave type is required"))?;
        let start_date = input
            .start_date
            .ok_or_else(|| AppError::validation("Start date is required"))?;
        let end_date = input
            .end_date
            .ok_or_else(|| AppError::validation("End date is required"))?;
        let reason = required_text(input.reason, "Reason")?;

        validate_range(start_date, end_date, self.today())?;
        let total_days = inclusive_days(start_date, end_date)?;
        self.ensure_no_overlap(principal.id, start_date, end_date, None)
            .await?;

        let now = Utc::now();
        let request = LeaveRequest {
            id: Uuid::new_v4(),
            user_id: principal.id,
            leave_type,
            start_date,
            end_date,
            total_days,
            reason,
            description: input
                .description
                .map(|d| d.trim().to_string())
                .filter(|d| !d.is_empty()),
            status: LeaveStatus::Pending,
            approved_by: None,
            approved_at: None,
            notes: None,
            created_at: now,
            updated_at: now,
        };

        let saved = self.requests.insert(&request).await?;
        log::info!(
            "User {} requested {} days of {} leave ({} to {})",
            saved.user_id,
            saved.total_days,
            saved.leave_type,
            saved.start_date,
            saved.end_date
        );
        Ok(saved)
    }

    /// Approve or reject a pending request
    pub async fn resolve(
        &self,
        principal: &Principal,
        id: Uuid,
        decision: LeaveStatus,
        input: ResolutionInput,
    ) -> Result<LeaveRequest, AppError> {
        principal.requires_elevated("resolve leave requests")?;
        if !decision.is_resolved() {
            return Err(AppError::validation(
                "Decision must be approved or rejected",
            ));
        }

        let existing = self.requests.find_by_id(id).await?.ok_or_else(|| not_found(id))?;
        if existing.status.is_resolved() {
            return Err(AppError::invalid_state(format!(
                "Leave request has already been {}",
                existing.status
            )));
        }

        let resolution = LeaveResolution {
            status: decision,
            approved_by: principal.id,
            approved_at: Utc::now(),
            notes: input
                .notes
                .map(|n| n.trim().to_string())
                .filter(|n| !n.is_empty()),
        };

        let resolved = self
            .requests
            .resolve(id, &resolution)
            .await?
            .ok_or_else(|| AppError::invalid_state("Leave request has already been resolved"))?;

        log::info!(
            "Leave request {} {} by {}",
            resolved.id,
            resolved.status,
            principal.id
        );

        if resolved.status == LeaveStatus::Approved {
            self.debit_on_approval(&resolved).await;
        }
        Ok(resolved)
    }

    /// Charge approved days against the owner's balance for the start year.
    /// The approval stands even if the ledger cannot be updated.
    async fn debit_on_approval(&self, request: &LeaveRequest) {
        if !self.auto_debit {
            return;
        }

        let year = request.start_date.year();
        let balance = match self
            .credits
            .find_by_key(request.user_id, year, request.leave_type)
            .await
        {
            Ok(Some(balance)) => balance,
            Ok(None) => {
                log::warn!(
                    "No {} {} leave credits for user {}; approval of {} not debited",
                    year,
                    request.leave_type,
                    request.user_id,
                    request.id
                );
                return;
            }
            Err(err) => {
                log::error!("Failed to look up leave credits for {}: {}", request.id, err);
                return;
            }
        };

        match self
            .credits
            .adjust_used(balance.id, f64::from(request.total_days))
            .await
        {
            Ok(Some(updated)) => {
                log::info!(
                    "Debited {} days from balance {} ({} remaining)",
                    request.total_days,
                    updated.id,
                    updated.remaining_credits
                );
                if updated.remaining_credits < 0.0 {
                    log::warn!(
                        "Leave credits for user {} are overdrawn after approving {}",
                        updated.user_id,
                        request.id
                    );
                }
            }
            Ok(None) => log::warn!("Balance {} vanished before debit", balance.id),
            Err(err) => log::error!("Failed to debit balance {}: {}", balance.id, err),
        }
    }

    pub async fn update(
        &self,
        principal: &Principal,
        id: Uuid,
        patch: LeaveRequestPatch,
    ) -> Result<LeaveRequest, AppError> {
        if patch.is_empty() {
            return Err(AppError::validation("No fields to update"));
        }

        let existing = self.requests.find_by_id(id).await?.ok_or_else(|| not_found(id))?;
        let elevated = principal.is_elevated();

        if !elevated {
            if existing.user_id != principal.id {
                return Err(AppError::Forbidden(
                    "Cannot update other users' leave requests".to_string(),
                ));
            }
            if patch.touches_resolution() {
                return Err(AppError::Forbidden(
                    "Only approvers can change status or notes".to_string(),
                ));
            }
            if existing.status.is_resolved() {
                return Err(AppError::invalid_state(format!(
                    "Cannot update {} leave",
                    existing.status
                )));
            }
        }

        let dates_changed = patch.start_date.is_some() || patch.end_date.is_some();
        let mut request = existing.clone();

        if let Some(leave_type) = patch.leave_type {
            request.leave_type = leave_type;
        }
        request.start_date = patch.start_date.unwrap_or(request.start_date);
        request.end_date = patch.end_date.unwrap_or(request.end_date);
        if patch.reason.is_some() {
            request.reason = required_text(patch.reason, "Reason")?;
        }
        if let Some(description) = patch.description {
            let description = description.trim().to_string();
            request.description = (!description.is_empty()).then_some(description);
        }
        if let Some(notes) = patch.notes {
            let notes = notes.trim().to_string();
            request.notes = (!notes.is_empty()).then_some(notes);
        }

        if dates_changed {
            if elevated {
                if request.end_date < request.start_date {
                    return Err(AppError::validation("End date must be after start date"));
                }
            } else {
                validate_range(request.start_date, request.end_date, self.today())?;
                self.ensure_no_overlap(
                    request.user_id,
                    request.start_date,
                    request.end_date,
                    Some(request.id),
                )
                .await?;
            }
            request.total_days = inclusive_days(request.start_date, request.end_date)?;
        }

        let mut newly_approved = false;
        if let Some(status) = patch.status.filter(|s| *s != existing.status) {
            if !status.is_resolved() {
                return Err(AppError::validation(
                    "Status can only be changed to approved or rejected",
                ));
            }
            if existing.status.is_resolved() {
                return Err(AppError::invalid_state(format!(
                    "Leave request has already been {}",
                    existing.status
                )));
            }
            request.status = status;
            request.approved_by = Some(principal.id);
            request.approved_at = Some(Utc::now());
            newly_approved = status == LeaveStatus::Approved;
        }

        request.updated_at = Utc::now();

        // The write only lands if nobody resolved the request since it was read
        let saved = match self.requests.update(&request, existing.status).await? {
            Some(saved) => saved,
            None => {
                return match self.requests.find_by_id(id).await? {
                    Some(current) => Err(AppError::invalid_state(format!(
                        "Leave request was {} while it was being edited",
                        current.status
                    ))),
                    None => Err(not_found(id)),
                };
            }
        };

        if newly_approved {
            log::info!("Leave request {} approved by {} via update", saved.id, principal.id);
            self.debit_on_approval(&saved).await;
        }
        Ok(saved)
    }

    pub async fn delete(&self, principal: &Principal, id: Uuid) -> Result<(), AppError> {
        let existing = self.requests.find_by_id(id).await?.ok_or_else(|| not_found(id))?;

        let only_pending = if principal.is_elevated() {
            false
        } else if existing.user_id == principal.id {
            if existing.status.is_resolved() {
                return Err(AppError::invalid_state(format!(
                    "Cannot delete {} leave",
                    existing.status
                )));
            }
            true
        } else {
            return Err(AppError::Forbidden(
                "Cannot delete other users' leave requests".to_string(),
            ));
        };

        if !self.requests.delete(id, only_pending).await? {
            return Err(AppError::invalid_state(
                "Leave request was resolved or removed concurrently",
            ));
        }

        log::info!("Leave request {} deleted by {}", id, principal.id);
        Ok(())
    }

    pub async fn get(&self, principal: &Principal, id: Uuid) -> Result<LeaveRequest, AppError> {
        let request = self.requests.find_by_id(id).await?.ok_or_else(|| not_found(id))?;
        principal.requires_access(request.user_id, "leave requests")?;
        Ok(request)
    }

    pub async fn list(
        &self,
        principal: &Principal,
        filter: &LeaveFilter,
    ) -> Result<Vec<LeaveRequest>, AppError> {
        let scoped = LeaveFilter {
            user_id: principal.scope_user(filter.user_id),
            status: filter.status,
        };
        self.requests.find(&scoped).await
    }
}
