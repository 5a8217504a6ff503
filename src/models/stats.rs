use serde::{Deserialize, Serialize};

use super::{ActiveProject, DeadProject, Idea, LogEntry};

/// Aggregate counters derived from one ledger snapshot.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub total_sessions: u64,
    pub total_minutes: u64,
    /// Distinct non-empty trimmed project labels.
    pub total_projects: u64,
    /// Rounded mean minutes per session.
    pub average_time: u64,
    /// Percentage of sessions with evidence, rounded.
    pub evidence_rate: u64,
    /// Sessions whose effective timestamp is within the last 7 days.
    pub last_7_days: u64,
    /// Newest entry in the ledger.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_session: Option<LogEntry>,
}

/// Stats plus lifecycle state, the full read model for a dashboard.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    pub stats: Stats,
    pub active: Vec<ActiveProject>,
    pub dead: Vec<DeadProject>,
    pub ideas: Vec<Idea>,
}
