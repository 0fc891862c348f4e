use std::sync::LazyLock;

use regex::Regex;

static HOURS_PART: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\d+)\s*h").expect("hours pattern is valid"));
static MINUTES_PART: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\d+)\s*m").expect("minutes pattern is valid"));
static CLOCK_FORM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+):(\d+)$").expect("clock pattern is valid"));

/// Upper bound for a single manual entry
pub const MAX_MANUAL_SECONDS: i64 = 24 * 60 * 60;

fn capture_number(re: &Regex, input: &str) -> Option<i64> {
    re.captures(input)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<i64>().ok())
}

/// Parse free-form duration text into seconds.
///
/// Accepts `"1h 30m"` (either part optional), `"1:30"` (minutes taken as
/// written, so `"1:75"` is 2h15m) and a bare integer read as minutes.
/// Anything else yields 0.
pub fn parse_duration(input: &str) -> i64 {
    let input = input.trim();
    if input.is_empty() {
        return 0;
    }

    let hours = capture_number(&HOURS_PART, input);
    let minutes = capture_number(&MINUTES_PART, input);
    if hours.is_some() || minutes.is_some() {
        return hours
            .unwrap_or(0)
            .saturating_mul(3600)
            .saturating_add(minutes.unwrap_or(0).saturating_mul(60));
    }

    if let Some(caps) = CLOCK_FORM.captures(input) {
        let hours = caps[1].parse::<i64>().unwrap_or(0);
        let minutes = caps[2].parse::<i64>().unwrap_or(0);
        return hours
            .saturating_mul(3600)
            .saturating_add(minutes.saturating_mul(60));
    }

    if input.chars().all(|c| c.is_ascii_digit()) {
        return input.parse::<i64>().map_or(0, |m| m.saturating_mul(60));
    }

    0
}
