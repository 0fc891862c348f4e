//! Client-side single timer.
//!
//! The timer lives on the client and survives reloads through a small
//! key/value store. Nothing reaches the server until the timer is stopped,
//! at which point the tracked interval is handed to a [`TimeLogSink`].

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::{Context, anyhow};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use crate::database::models::{NewTimeLog, TimeLogEntry};
use crate::error::AppError;

/// Storage key of the persisted timer
pub const TIMER_STORAGE_KEY: &str = "active_timer";

pub trait Clock: Send + Sync {
    /// Milliseconds since the Unix epoch
    fn now_ms(&self) -> i64;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        Utc::now().timestamp_millis()
    }
}

/// Client-local key/value storage for serialized timer state
pub trait TimerStorage: Send + Sync {
    fn load(&self, key: &str) -> Option<String>;

    fn save(&self, key: &str, value: &str) -> anyhow::Result<()>;

    fn remove(&self, key: &str) -> anyhow::Result<()>;
}

impl<T: TimerStorage + ?Sized> TimerStorage for Arc<T> {
    fn load(&self, key: &str) -> Option<String> {
        (**self).load(key)
    }

    fn save(&self, key: &str, value: &str) -> anyhow::Result<()> {
        (**self).save(key, value)
    }

    fn remove(&self, key: &str) -> anyhow::Result<()> {
        (**self).remove(key)
    }
}

/// One `<key>.json` file per key inside a directory
#[derive(Debug, Clone)]
pub struct FileTimerStorage {
    dir: PathBuf,
}

impl FileTimerStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

impl TimerStorage for FileTimerStorage {
    fn load(&self, key: &str) -> Option<String> {
        fs::read_to_string(self.path(key)).ok()
    }

    fn save(&self, key: &str, value: &str) -> anyhow::Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("creating timer directory {}", self.dir.display()))?;
        fs::write(self.path(key), value).with_context(|| format!("writing timer state {}", key))
    }

    fn remove(&self, key: &str) -> anyhow::Result<()> {
        match fs::remove_file(self.path(key)) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err).with_context(|| format!("removing timer state {}", key)),
        }
    }
}

#[derive(Debug, Default)]
pub struct MemoryTimerStorage {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryTimerStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TimerStorage for MemoryTimerStorage {
    fn load(&self, key: &str) -> Option<String> {
        self.entries.lock().ok()?.get(key).cloned()
    }

    fn save(&self, key: &str, value: &str) -> anyhow::Result<()> {
        self.entries
            .lock()
            .map_err(|_| anyhow!("timer storage lock poisoned"))?
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> anyhow::Result<()> {
        self.entries
            .lock()
            .map_err(|_| anyhow!("timer storage lock poisoned"))?
            .remove(key);
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerStatus {
    Idle,
    Running,
    Paused,
}

/// Persisted timer state. Instants are epoch milliseconds.
///
/// `is_running` stays set while paused; `paused_time` is only meaningful
/// while `is_paused`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerClientState {
    pub is_running: bool,
    pub is_paused: bool,
    pub start_time: Option<i64>,
    pub paused_time: Option<i64>,
    pub total_paused_time: i64,
    pub project_id: Option<Uuid>,
    pub task_id: Option<Uuid>,
    pub description: String,
    pub log_id: Option<Uuid>,
}

fn optional_uuid(object: &serde_json::Map<String, Value>, field: &str) -> Result<Option<Uuid>, ()> {
    match object.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => s.parse::<Uuid>().map(Some).map_err(|_| ()),
        Some(_) => Err(()),
    }
}

fn optional_i64(object: &serde_json::Map<String, Value>, field: &str) -> Result<Option<i64>, ()> {
    match object.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => value.as_i64().map(Some).ok_or(()),
    }
}

fn optional_bool(object: &serde_json::Map<String, Value>, field: &str) -> Result<bool, ()> {
    match object.get(field) {
        None | Some(Value::Null) => Ok(false),
        Some(value) => value.as_bool().ok_or(()),
    }
}

/// Epoch milliseconds that map onto a calendar instant
fn is_instant(ms: i64) -> bool {
    DateTime::<Utc>::from_timestamp_millis(ms).is_some()
}

impl TimerClientState {
    pub fn status(&self) -> TimerStatus {
        match (self.is_running, self.start_time, self.is_paused) {
            (true, Some(_), true) => TimerStatus::Paused,
            (true, Some(_), false) => TimerStatus::Running,
            _ => TimerStatus::Idle,
        }
    }

    /// Read stored state field by field. Anything that does not describe a
    /// coherent timer at `now_ms` comes back as idle.
    pub fn from_json(raw: &str, now_ms: i64) -> Self {
        Self::validate(raw, now_ms).unwrap_or_default()
    }

    fn validate(raw: &str, now_ms: i64) -> Result<Self, ()> {
        let value: Value = serde_json::from_str(raw).map_err(|_| ())?;
        let object = value.as_object().ok_or(())?;

        let is_running = optional_bool(object, "isRunning")?;
        if !is_running {
            return Ok(Self::default());
        }

        let is_paused = optional_bool(object, "isPaused")?;
        let start_time = optional_i64(object, "startTime")?.ok_or(())?;
        if !is_instant(start_time) || start_time > now_ms {
            return Err(());
        }

        let paused_time = if is_paused {
            let paused_at = optional_i64(object, "pausedTime")?.ok_or(())?;
            if !is_instant(paused_at) || paused_at < start_time || paused_at > now_ms {
                return Err(());
            }
            Some(paused_at)
        } else {
            None
        };

        // Paused time can never exceed the time since the start
        let total_paused_time = optional_i64(object, "totalPausedTime")?.unwrap_or(0);
        let reference = paused_time.unwrap_or(now_ms);
        if total_paused_time < 0 || total_paused_time > reference - start_time {
            return Err(());
        }

        let description = match object.get("description") {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(s)) => s.clone(),
            Some(_) => return Err(()),
        };

        Ok(Self {
            is_running,
            is_paused,
            start_time: Some(start_time),
            paused_time,
            total_paused_time,
            project_id: optional_uuid(object, "projectId")?,
            task_id: optional_uuid(object, "taskId")?,
            description,
            log_id: optional_uuid(object, "logId")?,
        })
    }
}

/// Destination for stopped timers
#[async_trait]
pub trait TimeLogSink: Send + Sync {
    async fn submit(&self, entry: NewTimeLog) -> Result<TimeLogEntry, AppError>;
}

pub struct Timer<C: Clock, S: TimerStorage> {
    clock: C,
    storage: S,
    state: TimerClientState,
}

impl<C: Clock, S: TimerStorage> Timer<C, S> {
    /// Restore the timer from storage, discarding state that fails validation
    pub fn load(clock: C, storage: S) -> Self {
        let state = match storage.load(TIMER_STORAGE_KEY) {
            Some(raw) => {
                let state = TimerClientState::from_json(&raw, clock.now_ms());
                if state.status() == TimerStatus::Idle {
                    if let Err(err) = storage.remove(TIMER_STORAGE_KEY) {
                        log::warn!("Failed to clear stale timer state: {:#}", err);
                    }
                }
                state
            }
            None => TimerClientState::default(),
        };

        Self {
            clock,
            storage,
            state,
        }
    }

    pub fn state(&self) -> &TimerClientState {
        &self.state
    }

    pub fn status(&self) -> TimerStatus {
        self.state.status()
    }

    /// Save `next` and adopt it; a failed save leaves the current state
    /// untouched
    fn commit(&mut self, next: TimerClientState) -> Result<(), AppError> {
        let raw = serde_json::to_string(&next)
            .map_err(|err| AppError::internal_server_error_message(err.to_string()))?;
        self.storage.save(TIMER_STORAGE_KEY, &raw)?;
        self.state = next;
        Ok(())
    }

    fn clear(&mut self) -> Result<(), AppError> {
        self.storage.remove(TIMER_STORAGE_KEY)?;
        self.state = TimerClientState::default();
        Ok(())
    }

    /// Start tracking. Starting the timer that is already active is a no-op.
    pub fn start(
        &mut self,
        project_id: Uuid,
        task_id: Option<Uuid>,
        description: impl Into<String>,
    ) -> Result<(), AppError> {
        if self.status() != TimerStatus::Idle {
            if self.state.project_id == Some(project_id) && self.state.task_id == task_id {
                return Ok(());
            }
            return Err(AppError::invalid_state(
                "Another timer is already active; stop it first",
            ));
        }

        let next = TimerClientState {
            is_running: true,
            is_paused: false,
            start_time: Some(self.clock.now_ms()),
            paused_time: None,
            total_paused_time: 0,
            project_id: Some(project_id),
            task_id,
            description: description.into(),
            log_id: None,
        };
        self.commit(next)
    }

    pub fn pause(&mut self) -> Result<(), AppError> {
        if self.status() != TimerStatus::Running {
            return Err(AppError::invalid_state("No running timer to pause"));
        }

        let next = TimerClientState {
            is_paused: true,
            paused_time: Some(self.clock.now_ms()),
            ..self.state.clone()
        };
        self.commit(next)
    }

    pub fn resume(&mut self) -> Result<(), AppError> {
        if self.status() != TimerStatus::Paused {
            return Err(AppError::invalid_state("No paused timer to resume"));
        }

        let now = self.clock.now_ms();
        let paused_at = self.state.paused_time.unwrap_or(now);
        let next = TimerClientState {
            is_paused: false,
            paused_time: None,
            total_paused_time: self
                .state
                .total_paused_time
                .saturating_add(now.saturating_sub(paused_at).max(0)),
            ..self.state.clone()
        };
        self.commit(next)
    }

    /// Whole seconds tracked so far, frozen while paused
    pub fn elapsed(&self) -> i64 {
        let Some(start) = self.state.start_time else {
            return 0;
        };
        let reference = match self.status() {
            TimerStatus::Idle => return 0,
            TimerStatus::Paused => self.state.paused_time.unwrap_or(start),
            TimerStatus::Running => self.clock.now_ms(),
        };

        let tracked_ms = reference
            .saturating_sub(start)
            .saturating_sub(self.state.total_paused_time);
        if tracked_ms <= 0 { 0 } else { tracked_ms / 1000 }
    }

    /// Remember the server-side entry this timer belongs to
    pub fn attach_log(&mut self, log_id: Uuid) -> Result<(), AppError> {
        if self.status() == TimerStatus::Idle {
            return Err(AppError::invalid_state("No active timer"));
        }

        let next = TimerClientState {
            log_id: Some(log_id),
            ..self.state.clone()
        };
        self.commit(next)
    }

    /// Drop the active timer without submitting anything
    pub fn cancel(&mut self) -> Result<(), AppError> {
        self.clear()
    }

    /// Submit the tracked interval and go idle. Local state is only cleared
    /// once the sink accepts the entry, so a failed stop can be retried.
    /// After acceptance the timer is idle even if storage cannot be cleared.
    pub async fn stop(&mut self, sink: &dyn TimeLogSink) -> Result<TimeLogEntry, AppError> {
        if self.status() == TimerStatus::Idle {
            return Err(AppError::invalid_state("No active timer to stop"));
        }

        let now = self.clock.now_ms();
        let start_time = self
            .state
            .start_time
            .and_then(DateTime::<Utc>::from_timestamp_millis)
            .ok_or_else(|| AppError::invalid_state("Timer start time is out of range"))?;
        let end_time = DateTime::<Utc>::from_timestamp_millis(now)
            .ok_or_else(|| AppError::invalid_state("Clock is out of range"))?;

        let entry = NewTimeLog {
            log_id: self.state.log_id,
            project_id: self.state.project_id,
            task_id: self.state.task_id,
            description: self.state.description.clone(),
            start_time,
            end_time: Some(end_time),
            duration: Some(self.elapsed()),
            billable: false,
            hourly_rate: None,
            note: None,
            overtime_reason: None,
        };

        let saved = sink.submit(entry).await?;
        self.state = TimerClientState::default();
        if let Err(err) = self.storage.remove(TIMER_STORAGE_KEY) {
            log::warn!(
                "Time log {} recorded but stored timer state was not cleared: {:#}",
                saved.id,
                err
            );
        }
        Ok(saved)
    }
}
