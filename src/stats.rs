//! Statistics over a ledger snapshot. Everything here is a pure function of its
//! arguments.

use std::collections::HashSet;
use std::sync::LazyLock;

use chrono::{DateTime, Duration, Utc};
use regex::Regex;

use crate::models::{LogEntry, Stats};

static MINUTES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)\s*min").expect("minutes pattern is valid"));

/// Minutes in a free-text duration such as `"45 min"`. Anything else is 0.
pub fn parse_minutes(time_worked: &str) -> u64 {
    MINUTES
        .captures(time_worked)
        .and_then(|c| c[1].parse().ok())
        .unwrap_or(0)
}

/// `"45 min"`, `"2h"` or `"1h 30min"`.
pub fn format_minutes(minutes: u64) -> String {
    if minutes < 60 {
        return format!("{} min", minutes);
    }
    let hours = minutes / 60;
    let mins = minutes % 60;
    if mins == 0 {
        format!("{}h", hours)
    } else {
        format!("{}h {}min", hours, mins)
    }
}

pub fn compute_stats(entries: &[LogEntry]) -> Stats {
    compute_stats_at(entries, Utc::now())
}

pub fn compute_stats_at(entries: &[LogEntry], now: DateTime<Utc>) -> Stats {
    let total_sessions = entries.len() as u64;
    let total_minutes = entries
        .iter()
        .map(|e| parse_minutes(&e.time_worked))
        .fold(0u64, u64::saturating_add);

    let total_projects = entries
        .iter()
        .map(|e| e.project.trim())
        .filter(|p| !p.is_empty())
        .collect::<HashSet<_>>()
        .len() as u64;

    let with_evidence = entries.iter().filter(|e| e.has_evidence()).count() as u64;

    let week_ago = now - Duration::days(7);
    let last_7_days = entries
        .iter()
        .filter(|e| e.effective_timestamp().is_some_and(|ts| ts >= week_ago))
        .count() as u64;

    Stats {
        total_sessions,
        total_minutes,
        total_projects,
        average_time: rounded_ratio(total_minutes, total_sessions),
        evidence_rate: rounded_ratio(with_evidence.saturating_mul(100), total_sessions),
        last_7_days,
        last_session: entries.first().cloned(),
    }
}

/// `round(numerator / denominator)` with halves rounded up; 0 when dividing by 0.
///
/// Widened to `u128` so free-text durations near `u64::MAX` cannot overflow.
fn rounded_ratio(numerator: u64, denominator: u64) -> u64 {
    if denominator == 0 {
        return 0;
    }
    let (n, d) = (u128::from(numerator), u128::from(denominator));
    ((2 * n + d) / (2 * d)) as u64
}
