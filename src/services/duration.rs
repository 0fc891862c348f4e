//! Conversion of a clock-in/clock-out pair into total, regular and overtime
//! hours.
//!
//! The regular window is 09:00–17:00 in the firm's local offset, anchored to
//! the calendar date of the clock-in. A shift that crosses midnight is still
//! measured against the start day's window only.

use chrono::{DateTime, FixedOffset, NaiveTime, Offset, TimeDelta, Timelike, Utc};
use serde::Serialize;

use crate::error::AppError;

pub const AUTO_OVERTIME_REASON: &str = "Auto-flagged: clock-out at or after 17:00";

const MS_PER_HOUR: f64 = 3_600_000.0;

#[derive(Debug, Clone, Copy)]
pub struct WorkdayPolicy {
    pub utc_offset: FixedOffset,
    pub regular_start: NaiveTime,
    pub regular_end: NaiveTime,
    pub max_regular: TimeDelta,
}

impl WorkdayPolicy {
    pub fn new(utc_offset: FixedOffset) -> Self {
        Self {
            utc_offset,
            ..Self::default()
        }
    }
}

impl Default for WorkdayPolicy {
    fn default() -> Self {
        Self {
            utc_offset: Utc.fix(),
            regular_start: NaiveTime::from_hms_opt(9, 0, 0).unwrap_or_default(),
            regular_end: NaiveTime::from_hms_opt(17, 0, 0).unwrap_or_default(),
            max_regular: TimeDelta::hours(8),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkedHours {
    pub total_hours: f64,
    pub regular_hours: f64,
    pub overtime_hours: f64,
    pub overtime_reason: Option<String>,
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn hours(delta: TimeDelta) -> f64 {
    delta.num_milliseconds() as f64 / MS_PER_HOUR
}

/// Derive worked hours for a finished interval.
///
/// `supplied_reason` is kept when present; otherwise a clock-out at or after
/// the end of the regular window with overtime gets [`AUTO_OVERTIME_REASON`].
pub fn calculate(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    supplied_reason: Option<&str>,
    policy: &WorkdayPolicy,
) -> Result<WorkedHours, AppError> {
    if end < start {
        return Err(AppError::validation("End time must not be before start time"));
    }

    let total_hours = round2(hours(end - start));

    let local_start = start.with_timezone(&policy.utc_offset);
    let local_end = end.with_timezone(&policy.utc_offset);
    let day = local_start.date_naive();

    let window_start = day
        .and_time(policy.regular_start)
        .and_local_timezone(policy.utc_offset)
        .single();
    let window_end = day
        .and_time(policy.regular_end)
        .and_local_timezone(policy.utc_offset)
        .single();

    let overlap = match (window_start, window_end) {
        (Some(window_start), Some(window_end)) => {
            let from = local_start.max(window_start);
            let to = local_end.min(window_end);
            (to - from).clamp(TimeDelta::zero(), policy.max_regular)
        }
        _ => TimeDelta::zero(),
    };

    let regular_hours = round2(hours(overlap));
    let overtime_hours = round2((total_hours - regular_hours).max(0.0));

    let supplied = supplied_reason
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .map(str::to_string);

    let overtime_reason = match supplied {
        Some(reason) => Some(reason),
        None if local_end.hour() >= policy.regular_end.hour() && overtime_hours > 0.0 => {
            Some(AUTO_OVERTIME_REASON.to_string())
        }
        None => None,
    };

    Ok(WorkedHours {
        total_hours,
        regular_hours,
        overtime_hours,
        overtime_reason,
    })
}
