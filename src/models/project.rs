use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Hard cap on the active set.
pub const MAX_ACTIVE_PROJECTS: usize = 3;

/// Length of the rolling deadline, in days.
pub const DEADLINE_DAYS: i64 = 7;

/// `died_on_day` recorded when a countdown runs out on its own.
pub const EXPIRED_SENTINEL_DAY: i64 = 8;

/// `last_progress` of a project created directly.
pub const CREATED_MARKER: &str = "Project just created";

/// `last_progress` of a project promoted out of the idea bank.
pub const PROMOTED_MARKER: &str = "Promoted from idea bank";

/// A project currently subject to the 7-day progress deadline.
///
/// `days_left` is never decremented by a timer. It is derived on every
/// recomputation from the time elapsed since `last_progress_date`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ActiveProject {
    pub id: Uuid,
    pub name: String,
    /// Countdown in `0..=7`.
    pub days_left: i64,
    /// Achievement text of the latest matching ledger entry, or a marker.
    pub last_progress: String,
    pub last_progress_date: DateTime<Utc>,
}

impl ActiveProject {
    pub(crate) fn fresh(name: String, marker: &str, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            days_left: DEADLINE_DAYS,
            last_progress: marker.to_string(),
            last_progress_date: now,
        }
    }

    /// Symmetric, case-insensitive substring match against a ledger label.
    pub fn matches(&self, entry_project: &str) -> bool {
        let name = self.name.to_lowercase();
        let label = entry_project.to_lowercase();
        label.contains(&name) || name.contains(&label)
    }
}

/// A project removed from active tracking.
///
/// `died_on_day` is [`EXPIRED_SENTINEL_DAY`] for projects whose countdown ran
/// out, or `7 - days_left` for projects dropped by hand.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DeadProject {
    pub name: String,
    pub died_on_day: i64,
}

impl DeadProject {
    pub fn expired(&self) -> bool {
        self.died_on_day == EXPIRED_SENTINEL_DAY
    }
}

/// A project candidate in the idea bank.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Idea {
    pub id: Uuid,
    pub text: String,
}

/// Everything the lifecycle engine tracks.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct LifecycleState {
    pub active: Vec<ActiveProject>,
    /// Newest first.
    pub dead: Vec<DeadProject>,
    pub ideas: Vec<Idea>,
}

impl LifecycleState {
    pub fn has_capacity(&self) -> bool {
        self.active.len() < MAX_ACTIVE_PROJECTS
    }
}

/// Input for creating an active project.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateProjectInput {
    pub name: String,
}

/// Input for adding an idea.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateIdeaInput {
    pub text: String,
}
