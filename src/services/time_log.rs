use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, TimeDelta, Utc};
use uuid::Uuid;

use crate::database::models::{
    ManualTimeEntryInput, NewTimeLog, TimeLogEntry, TimeLogFilter, TimeLogPatch, TimeLogQuery,
    TimeLogStatus, TimeLogSummary,
};
use crate::database::repositories::TimeLogStore;
use crate::error::AppError;
use crate::services::auth::Principal;
use crate::services::duration::{self, AUTO_OVERTIME_REASON, WorkdayPolicy, round2};
use crate::services::manual_entry::{MAX_MANUAL_SECONDS, parse_duration};
use crate::services::timer::TimeLogSink;

#[derive(Clone)]
pub struct TimeLogService {
    store: Arc<dyn TimeLogStore>,
    policy: WorkdayPolicy,
}

/// Recompute the derived hours of an entry from its start and end.
/// An auto-generated reason is not treated as supplied, so it follows the
/// interval when the interval changes.
fn finalize(entry: &mut TimeLogEntry, policy: &WorkdayPolicy) -> Result<(), AppError> {
    match entry.end_time {
        Some(end) => {
            let supplied = entry
                .overtime_reason
                .as_deref()
                .filter(|reason| *reason != AUTO_OVERTIME_REASON);
            let worked = duration::calculate(entry.start_time, end, supplied, policy)?;
            entry.total_hours = Some(worked.total_hours);
            entry.regular_hours = Some(worked.regular_hours);
            entry.overtime_hours = Some(worked.overtime_hours);
            entry.overtime_reason = worked.overtime_reason;
        }
        None => {
            entry.total_hours = None;
            entry.regular_hours = None;
            entry.overtime_hours = None;
        }
    }
    Ok(())
}

fn validate_rate(hourly_rate: Option<f64>) -> Result<(), AppError> {
    match hourly_rate {
        Some(rate) if !rate.is_finite() || rate < 0.0 => Err(AppError::validation(
            "Hourly rate must be a non-negative number",
        )),
        _ => Ok(()),
    }
}

fn normalize_text(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl TimeLogService {
    pub fn new(store: Arc<dyn TimeLogStore>, policy: WorkdayPolicy) -> Self {
        Self { store, policy }
    }

    /// A sink that records stopped timers on behalf of `principal`
    pub fn sink_for(&self, principal: Principal) -> PrincipalTimeLogSink<'_> {
        PrincipalTimeLogSink {
            service: self,
            principal,
        }
    }

    /// Persist a time-log entry for `principal`.
    ///
    /// An entry with an end time is stored as stopped with derived hours; an
    /// entry without one is stored as running. When `log_id` names an open
    /// entry, that entry is finalized instead of inserting a new one, and a
    /// repeated submission for an already stopped entry returns it unchanged.
    pub async fn record(
        &self,
        principal: &Principal,
        input: NewTimeLog,
    ) -> Result<TimeLogEntry, AppError> {
        validate_rate(input.hourly_rate)?;

        let (status, duration) = match input.end_time {
            Some(end) => {
                if end < input.start_time {
                    return Err(AppError::validation("End time must not be before start time"));
                }
                let span = (end - input.start_time).num_seconds();
                let duration = input.duration.unwrap_or(span);
                if duration < 0 || duration > span {
                    return Err(AppError::validation(format!(
                        "Duration must be between 0 and {} seconds",
                        span
                    )));
                }
                (TimeLogStatus::Stopped, duration)
            }
            None => {
                if input.duration.is_some_and(|d| d < 0) {
                    return Err(AppError::validation("Duration must not be negative"));
                }
                (TimeLogStatus::Running, input.duration.unwrap_or(0))
            }
        };

        let now = Utc::now();

        if let Some(log_id) = input.log_id {
            let existing = self
                .store
                .find_by_id(log_id)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("Time log {} not found", log_id)))?;

            if existing.user_id != principal.id {
                return Err(AppError::Forbidden(
                    "Cannot finalize other users' time logs".to_string(),
                ));
            }

            if existing.status == TimeLogStatus::Stopped {
                log::info!("Time log {} already stopped; ignoring resubmission", log_id);
                return Ok(existing);
            }

            let mut entry = TimeLogEntry {
                project_id: input.project_id.or(existing.project_id),
                task_id: input.task_id.or(existing.task_id),
                description: input.description,
                start_time: input.start_time,
                end_time: input.end_time,
                duration,
                status,
                billable: input.billable,
                hourly_rate: input.hourly_rate,
                note: normalize_text(input.note),
                overtime_reason: normalize_text(input.overtime_reason),
                updated_at: now,
                ..existing
            };
            finalize(&mut entry, &self.policy)?;

            return match self.store.finalize_if_open(&entry).await? {
                Some(saved) => Ok(saved),
                // Stopped concurrently by another submission
                None => self
                    .store
                    .find_by_id(log_id)
                    .await?
                    .ok_or_else(|| AppError::NotFound(format!("Time log {} not found", log_id))),
            };
        }

        let mut entry = TimeLogEntry {
            id: Uuid::new_v4(),
            user_id: principal.id,
            project_id: input.project_id,
            task_id: input.task_id,
            description: input.description,
            start_time: input.start_time,
            end_time: input.end_time,
            duration,
            status,
            billable: input.billable,
            hourly_rate: input.hourly_rate,
            note: normalize_text(input.note),
            total_hours: None,
            regular_hours: None,
            overtime_hours: None,
            overtime_reason: normalize_text(input.overtime_reason),
            created_at: now,
            updated_at: now,
        };
        finalize(&mut entry, &self.policy)?;

        let saved = self.store.insert(&entry).await?;
        log::info!(
            "Recorded time log {} for user {} ({} s, {})",
            saved.id,
            saved.user_id,
            saved.duration,
            saved.status
        );
        Ok(saved)
    }

    /// Parse a free-form duration and record it as a finished entry ending now
    pub async fn submit_manual(
        &self,
        principal: &Principal,
        input: ManualTimeEntryInput,
    ) -> Result<TimeLogEntry, AppError> {
        let seconds = parse_duration(&input.duration);
        self.submit_manual_seconds(principal, input, seconds, Utc::now())
            .await
    }

    pub async fn submit_manual_seconds(
        &self,
        principal: &Principal,
        input: ManualTimeEntryInput,
        seconds: i64,
        now: DateTime<Utc>,
    ) -> Result<TimeLogEntry, AppError> {
        if seconds <= 0 {
            return Err(AppError::validation("Please enter a valid duration"));
        }
        if seconds > MAX_MANUAL_SECONDS {
            return Err(AppError::validation("Duration cannot exceed 24 hours"));
        }
        if input.project_id.is_none() {
            return Err(AppError::validation("Please select a project"));
        }

        let entry = NewTimeLog {
            log_id: None,
            project_id: input.project_id,
            task_id: input.task_id,
            description: input.description,
            start_time: now - TimeDelta::seconds(seconds),
            end_time: Some(now),
            duration: Some(seconds),
            billable: input.billable,
            hourly_rate: input.hourly_rate,
            note: input.note,
            overtime_reason: None,
        };

        self.record(principal, entry).await
    }

    pub async fn get(&self, principal: &Principal, id: Uuid) -> Result<TimeLogEntry, AppError> {
        let entry = self
            .store
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Time log {} not found", id)))?;

        principal.requires_access(entry.user_id, "time logs")?;
        Ok(entry)
    }

    fn resolve_query(
        &self,
        principal: &Principal,
        filter: &TimeLogFilter,
    ) -> Result<TimeLogQuery, AppError> {
        if let (Some(from), Some(to)) = (filter.from, filter.to) {
            if to < from {
                return Err(AppError::validation("'to' must not be before 'from'"));
            }
        }

        let local_midnight = |date: NaiveDate| {
            date.and_hms_opt(0, 0, 0)
                .and_then(|dt| dt.and_local_timezone(self.policy.utc_offset).single())
                .map(|dt| dt.with_timezone(&Utc))
        };

        Ok(TimeLogQuery {
            user_id: principal.scope_user(filter.user_id),
            start_from: filter.from.and_then(local_midnight),
            start_before: filter
                .to
                .and_then(|to| to.succ_opt())
                .and_then(local_midnight),
        })
    }

    pub async fn list(
        &self,
        principal: &Principal,
        filter: &TimeLogFilter,
    ) -> Result<Vec<TimeLogEntry>, AppError> {
        let query = self.resolve_query(principal, filter)?;
        self.store.find(&query).await
    }

    pub async fn summarize(
        &self,
        principal: &Principal,
        filter: &TimeLogFilter,
    ) -> Result<TimeLogSummary, AppError> {
        let query = self.resolve_query(principal, filter)?;
        let entries = self.store.find(&query).await?;

        let mut summary = TimeLogSummary {
            user_id: query.user_id,
            from: filter.from,
            to: filter.to,
            entry_count: entries.len(),
            ..TimeLogSummary::default()
        };

        for entry in &entries {
            let total = entry.total_hours.unwrap_or(0.0);
            summary.total_seconds += entry.duration;
            summary.total_hours += total;
            summary.regular_hours += entry.regular_hours.unwrap_or(0.0);
            summary.overtime_hours += entry.overtime_hours.unwrap_or(0.0);
            if entry.billable {
                summary.billable_hours += total;
            }
        }

        summary.total_hours = round2(summary.total_hours);
        summary.regular_hours = round2(summary.regular_hours);
        summary.overtime_hours = round2(summary.overtime_hours);
        summary.billable_hours = round2(summary.billable_hours);

        Ok(summary)
    }

    pub async fn update(
        &self,
        principal: &Principal,
        id: Uuid,
        patch: TimeLogPatch,
    ) -> Result<TimeLogEntry, AppError> {
        if patch.is_empty() {
            return Err(AppError::validation("No fields to update"));
        }
        validate_rate(patch.hourly_rate)?;

        let mut entry = self.get(principal, id).await?;
        let read_status = entry.status;

        if patch.touches_interval() {
            if entry.status != TimeLogStatus::Stopped {
                return Err(AppError::invalid_state(
                    "Cannot edit the interval of a time log that is still open",
                ));
            }
            entry.start_time = patch.start_time.unwrap_or(entry.start_time);
            entry.end_time = patch.end_time.or(entry.end_time);
            if let Some(end) = entry.end_time {
                if end < entry.start_time {
                    return Err(AppError::validation("End time must not be before start time"));
                }
                entry.duration = (end - entry.start_time).num_seconds();
            }
        }

        if let Some(description) = patch.description {
            entry.description = description;
        }
        if let Some(billable) = patch.billable {
            entry.billable = billable;
        }
        if patch.hourly_rate.is_some() {
            entry.hourly_rate = patch.hourly_rate;
        }
        if patch.note.is_some() {
            entry.note = normalize_text(patch.note);
        }
        if patch.overtime_reason.is_some() {
            entry.overtime_reason = normalize_text(patch.overtime_reason);
        }

        finalize(&mut entry, &self.policy)?;
        entry.updated_at = Utc::now();

        match self.store.update(&entry, read_status).await? {
            Some(saved) => Ok(saved),
            None => match self.store.find_by_id(id).await? {
                Some(current) => Err(AppError::invalid_state(format!(
                    "Time log became {} while it was being edited",
                    current.status
                ))),
                None => Err(AppError::NotFound(format!("Time log {} not found", id))),
            },
        }
    }

    pub async fn delete(&self, principal: &Principal, id: Uuid) -> Result<(), AppError> {
        self.get(principal, id).await?;

        if !self.store.delete(id).await? {
            return Err(AppError::NotFound(format!("Time log {} not found", id)));
        }
        Ok(())
    }
}

/// Records timer submissions as a fixed principal
pub struct PrincipalTimeLogSink<'a> {
    service: &'a TimeLogService,
    principal: Principal,
}

#[async_trait]
impl<'a> TimeLogSink for PrincipalTimeLogSink<'a> {
    async fn submit(&self, entry: NewTimeLog) -> Result<TimeLogEntry, AppError> {
        self.service.record(&self.principal, entry).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::memory::MemoryStore;
    use crate::services::auth::Role;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn service() -> TimeLogService {
        TimeLogService::new(Arc::new(MemoryStore::new()), WorkdayPolicy::default())
    }

    /// Stops an open entry right after it has been read, like a timer
    /// finishing on another device
    struct StopAfterRead {
        inner: Arc<MemoryStore>,
    }

    #[async_trait]
    impl TimeLogStore for StopAfterRead {
        async fn insert(&self, entry: &TimeLogEntry) -> Result<TimeLogEntry, AppError> {
            TimeLogStore::insert(self.inner.as_ref(), entry).await
        }

        async fn find_by_id(&self, id: Uuid) -> Result<Option<TimeLogEntry>, AppError> {
            let read = TimeLogStore::find_by_id(self.inner.as_ref(), id).await?;
            if let Some(open) = read.clone().filter(|e| e.status != TimeLogStatus::Stopped) {
                let stopped = TimeLogEntry {
                    end_time: Some(open.start_time + TimeDelta::hours(1)),
                    duration: 3600,
                    status: TimeLogStatus::Stopped,
                    ..open
                };
                self.inner.finalize_if_open(&stopped).await?;
            }
            Ok(read)
        }

        async fn find(&self, query: &TimeLogQuery) -> Result<Vec<TimeLogEntry>, AppError> {
            TimeLogStore::find(self.inner.as_ref(), query).await
        }

        async fn update(
            &self,
            entry: &TimeLogEntry,
            expected: TimeLogStatus,
        ) -> Result<Option<TimeLogEntry>, AppError> {
            TimeLogStore::update(self.inner.as_ref(), entry, expected).await
        }

        async fn finalize_if_open(
            &self,
            entry: &TimeLogEntry,
        ) -> Result<Option<TimeLogEntry>, AppError> {
            self.inner.finalize_if_open(entry).await
        }

        async fn delete(&self, id: Uuid) -> Result<bool, AppError> {
            TimeLogStore::delete(self.inner.as_ref(), id).await
        }
    }

    fn employee() -> Principal {
        Principal::new(Uuid::new_v4(), Role::Employee)
    }

    fn manual(duration: &str, project_id: Option<Uuid>) -> ManualTimeEntryInput {
        ManualTimeEntryInput {
            project_id,
            task_id: None,
            description: "Site drawings".to_string(),
            duration: duration.to_string(),
            billable: true,
            hourly_rate: None,
            note: None,
        }
    }

    fn shift(start_hour: u32, end_hour: u32) -> NewTimeLog {
        NewTimeLog {
            log_id: None,
            project_id: Some(Uuid::new_v4()),
            task_id: None,
            description: "Model review".to_string(),
            start_time: Utc.with_ymd_and_hms(2025, 3, 10, start_hour, 0, 0).unwrap(),
            end_time: Some(Utc.with_ymd_and_hms(2025, 3, 10, end_hour, 0, 0).unwrap()),
            duration: None,
            billable: false,
            hourly_rate: None,
            note: None,
            overtime_reason: None,
        }
    }

    #[tokio::test]
    async fn test_manual_entry_is_stored_as_stopped_interval() {
        let service = service();
        let principal = employee();
        let project = Uuid::new_v4();

        let entry = service
            .submit_manual(&principal, manual("1h 30m", Some(project)))
            .await
            .unwrap();

        assert_eq!(entry.user_id, principal.id);
        assert_eq!(entry.project_id, Some(project));
        assert_eq!(entry.duration, 5400);
        assert_eq!(entry.status, TimeLogStatus::Stopped);
        assert_eq!(entry.total_hours, Some(1.5));
        assert_eq!(entry.end_time.unwrap() - entry.start_time, TimeDelta::seconds(5400));
    }

    #[tokio::test]
    async fn test_manual_entry_validation() {
        let service = service();
        let principal = employee();
        let project = Some(Uuid::new_v4());

        for input in [manual("garbage", project), manual("25h", project), manual("1h", None)] {
            let result = service.submit_manual(&principal, input).await;
            assert!(matches!(result, Err(AppError::ValidationError(_))));
        }
    }

    #[tokio::test]
    async fn test_manual_entry_allows_exactly_one_day() {
        let service = service();
        let principal = employee();
        let project = Some(Uuid::new_v4());

        let full_day = service
            .submit_manual(&principal, manual("24h", project))
            .await
            .unwrap();
        assert_eq!(full_day.duration, MAX_MANUAL_SECONDS);

        let over = service
            .submit_manual(&principal, manual("24h 1m", project))
            .await;
        assert!(matches!(over, Err(AppError::ValidationError(_))));
    }

    #[tokio::test]
    async fn test_record_derives_hours_and_open_entries_stay_open() {
        let service = service();
        let principal = employee();

        let mut long_day = shift(8, 18);
        long_day.start_time += TimeDelta::minutes(30);
        let stopped = service.record(&principal, long_day).await.unwrap();
        assert_eq!(stopped.total_hours, Some(9.5));
        assert_eq!(stopped.regular_hours, Some(8.0));
        assert_eq!(stopped.overtime_hours, Some(1.5));
        assert_eq!(stopped.overtime_reason.as_deref(), Some(AUTO_OVERTIME_REASON));

        let mut open = shift(9, 10);
        open.end_time = None;
        let running = service.record(&principal, open).await.unwrap();
        assert_eq!(running.status, TimeLogStatus::Running);
        assert_eq!(running.total_hours, None);
    }

    #[tokio::test]
    async fn test_finalizing_attached_log_is_idempotent() {
        let service = service();
        let principal = employee();

        let mut open = shift(9, 12);
        open.end_time = None;
        let running = service.record(&principal, open).await.unwrap();

        let mut stop = shift(9, 12);
        stop.log_id = Some(running.id);
        let stopped = service.record(&principal, stop.clone()).await.unwrap();
        assert_eq!(stopped.id, running.id);
        assert_eq!(stopped.status, TimeLogStatus::Stopped);
        assert_eq!(stopped.total_hours, Some(3.0));

        let again = service.record(&principal, stop).await.unwrap();
        assert_eq!(again, stopped);
    }

    #[tokio::test]
    async fn test_paused_server_entry_can_be_finalized() {
        let store = Arc::new(MemoryStore::new());
        let service = TimeLogService::new(store.clone(), WorkdayPolicy::default());
        let principal = employee();

        let mut open = shift(9, 11);
        open.end_time = None;
        let running = service.record(&principal, open).await.unwrap();
        let paused = TimeLogEntry {
            status: TimeLogStatus::Paused,
            ..running
        };
        TimeLogStore::update(store.as_ref(), &paused, TimeLogStatus::Running)
            .await
            .unwrap()
            .unwrap();

        let mut stop = shift(9, 11);
        stop.log_id = Some(paused.id);
        let stopped = service.record(&principal, stop).await.unwrap();

        assert_eq!(stopped.id, paused.id);
        assert_eq!(stopped.status, TimeLogStatus::Stopped);
        assert_eq!(stopped.total_hours, Some(2.0));
    }

    #[tokio::test]
    async fn test_edit_racing_a_stop_does_not_reopen_the_entry() {
        let store = Arc::new(MemoryStore::new());
        let plain = TimeLogService::new(store.clone(), WorkdayPolicy::default());
        let racing = TimeLogService::new(
            Arc::new(StopAfterRead {
                inner: store.clone(),
            }),
            WorkdayPolicy::default(),
        );
        let principal = employee();

        let mut open = shift(9, 10);
        open.end_time = None;
        let running = plain.record(&principal, open).await.unwrap();

        let patch = TimeLogPatch {
            description: Some("Renamed while running".to_string()),
            ..TimeLogPatch::default()
        };
        let result = racing.update(&principal, running.id, patch).await;
        assert!(matches!(result, Err(AppError::InvalidState(_))));

        let stored = plain.get(&principal, running.id).await.unwrap();
        assert_eq!(stored.status, TimeLogStatus::Stopped);
        assert_eq!(stored.end_time, Some(running.start_time + TimeDelta::hours(1)));
        assert_eq!(stored.description, "Model review");
    }

    #[tokio::test]
    async fn test_update_recomputes_derived_hours() {
        let service = service();
        let principal = employee();
        let entry = service.record(&principal, shift(9, 17)).await.unwrap();
        assert_eq!(entry.overtime_hours, Some(0.0));

        let patch = TimeLogPatch {
            end_time: Some(Utc.with_ymd_and_hms(2025, 3, 10, 19, 0, 0).unwrap()),
            ..TimeLogPatch::default()
        };
        let updated = service.update(&principal, entry.id, patch).await.unwrap();

        assert_eq!(updated.total_hours, Some(10.0));
        assert_eq!(updated.regular_hours, Some(8.0));
        assert_eq!(updated.overtime_hours, Some(2.0));
        assert_eq!(updated.duration, 36_000);
        assert_eq!(updated.overtime_reason.as_deref(), Some(AUTO_OVERTIME_REASON));

        let back = TimeLogPatch {
            end_time: Some(Utc.with_ymd_and_hms(2025, 3, 10, 16, 0, 0).unwrap()),
            ..TimeLogPatch::default()
        };
        let shortened = service.update(&principal, entry.id, back).await.unwrap();
        assert_eq!(shortened.overtime_reason, None);
    }

    #[tokio::test]
    async fn test_other_employees_cannot_read_or_delete() {
        let service = service();
        let owner = employee();
        let entry = service.record(&owner, shift(9, 10)).await.unwrap();

        let stranger = employee();
        assert!(matches!(
            service.get(&stranger, entry.id).await,
            Err(AppError::Forbidden(_))
        ));
        assert!(matches!(
            service.delete(&stranger, entry.id).await,
            Err(AppError::Forbidden(_))
        ));

        let manager = Principal::new(Uuid::new_v4(), Role::Manager);
        service.delete(&manager, entry.id).await.unwrap();
        assert!(matches!(
            service.get(&owner, entry.id).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_summary_is_scoped_and_bounded_by_dates() {
        let service = service();
        let principal = employee();
        service.record(&principal, shift(8, 18)).await.unwrap();
        let mut billable = shift(9, 12);
        billable.billable = true;
        service.record(&principal, billable).await.unwrap();

        let mut next_day = shift(9, 10);
        next_day.start_time += TimeDelta::days(1);
        next_day.end_time = next_day.end_time.map(|e| e + TimeDelta::days(1));
        service.record(&principal, next_day).await.unwrap();

        service.record(&employee(), shift(9, 17)).await.unwrap();

        let day = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
        let filter = TimeLogFilter {
            user_id: None,
            from: Some(day),
            to: Some(day),
        };
        let summary = service.summarize(&principal, &filter).await.unwrap();

        assert_eq!(summary.user_id, Some(principal.id));
        assert_eq!(summary.entry_count, 2);
        assert_eq!(summary.total_seconds, 13 * 3600);
        assert_eq!(summary.total_hours, 13.0);
        assert_eq!(summary.regular_hours, 11.0);
        assert_eq!(summary.overtime_hours, 2.0);
        assert_eq!(summary.billable_hours, 3.0);
    }
}
