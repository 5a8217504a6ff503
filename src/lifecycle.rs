//! Rolling-deadline lifecycle for active projects.
//!
//! Each active project has `DEADLINE_DAYS` to show progress. Progress is a
//! ledger entry whose project label matches the project name; the countdown is
//! recomputed from wall-clock time against the newest match and never ticks on
//! its own. A countdown that reaches 0 moves the project to the dead history in
//! the same pass.
//!
//! State transitions:
//!
//! ```text
//! (none) --add_idea--> Idea --promote_idea--> Active(7)
//! (none) --add_project------------------>     Active(7)
//! Active(n) --recompute--> Active(m) | Dead(8)
//! Active(n) --remove_project-----------> Dead(7 - n)
//! ```

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::db::{self, keys, KeyValueStore};
use crate::error::{LifecycleError, StoreError};
use crate::models::*;

const MS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

/// Outcome of one recomputation pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recomputation {
    pub state: LifecycleState,
    /// Projects that expired in this pass, in active-list order.
    pub expired: Vec<DeadProject>,
    /// Whether any active project or the dead history changed.
    pub changed: bool,
}

/// Recomputes every active project's countdown against `entries`.
///
/// `entries` must be newest-first, so the first match with a resolvable
/// timestamp is the latest progress. A newer match without a timestamp is
/// skipped rather than taken as the latest, so an older dated match can age
/// the project. Projects without a match keep their fields. Pure: the same
/// inputs always give the same output.
pub fn recompute(entries: &[LogEntry], state: &LifecycleState, now: DateTime<Utc>) -> Recomputation {
    let mut survivors = Vec::with_capacity(state.active.len());
    let mut expired = Vec::new();
    let mut changed = false;

    for project in &state.active {
        let mut project = project.clone();

        let latest = entries.iter().find_map(|e| {
            if !project.matches(&e.project) {
                return None;
            }
            e.effective_timestamp().map(|ts| (e, ts))
        });

        if let Some((entry, ts)) = latest {
            let days_left = days_left(ts, now);
            if project.days_left != days_left
                || project.last_progress != entry.achievement
                || project.last_progress_date != ts
            {
                changed = true;
            }
            project.days_left = days_left;
            project.last_progress = entry.achievement.clone();
            project.last_progress_date = ts;
        }

        if project.days_left == 0 {
            tracing::debug!(project = %project.name, "Countdown expired");
            expired.push(DeadProject {
                name: project.name,
                died_on_day: EXPIRED_SENTINEL_DAY,
            });
            changed = true;
        } else {
            survivors.push(project);
        }
    }

    let mut dead = expired.clone();
    dead.extend(state.dead.iter().cloned());

    Recomputation {
        state: LifecycleState {
            active: survivors,
            dead,
            ideas: state.ideas.clone(),
        },
        expired,
        changed,
    }
}

/// `7 - floor(days since last_progress)`, clamped to `0..=7`.
pub fn days_left(last_progress: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    let elapsed = (now - last_progress).num_milliseconds();
    let days_since = elapsed.div_euclid(MS_PER_DAY);
    (DEADLINE_DAYS - days_since).clamp(0, DEADLINE_DAYS)
}

/// Stateful lifecycle engine backed by a [`KeyValueStore`].
pub struct Lifecycle<S> {
    store: S,
}

impl<S: KeyValueStore> Lifecycle<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Current state as stored. Unreadable parts come back empty.
    pub fn state(&self) -> LifecycleState {
        LifecycleState {
            active: db::load_list(&self.store, keys::ACTIVE_PROJECTS),
            dead: db::load_list(&self.store, keys::DEAD_PROJECTS),
            ideas: db::load_list(&self.store, keys::IDEAS),
        }
    }

    /// Runs [`recompute`] and persists the result when anything changed.
    ///
    /// The active set and dead history are written in one transaction, so an
    /// expired project is never stored in both.
    pub fn recompute_at(
        &self,
        entries: &[LogEntry],
        now: DateTime<Utc>,
    ) -> Result<Recomputation, StoreError> {
        let state = self.load_strict()?;
        let result = recompute(entries, &state, now);

        if result.changed {
            self.store.set_many(&[
                (keys::ACTIVE_PROJECTS, db::encode(&result.state.active)?),
                (keys::DEAD_PROJECTS, db::encode(&result.state.dead)?),
            ])?;
        }
        for dead in &result.expired {
            tracing::info!(project = %dead.name, "Project expired");
        }

        Ok(result)
    }

    /// Like [`Lifecycle::recompute_at`] but never fails: if storage cannot be
    /// written, the freshly computed state is still returned.
    pub fn refresh_at(&self, entries: &[LogEntry], now: DateTime<Utc>) -> LifecycleState {
        match self.recompute_at(entries, now) {
            Ok(result) => result.state,
            Err(e) => {
                tracing::warn!("Failed to persist lifecycle recomputation: {}", e);
                recompute(entries, &self.state(), now).state
            }
        }
    }

    /// Adds a project with a full 7-day countdown. Rejected without any change
    /// when the active set is full.
    pub fn add_project_at(
        &self,
        name: &str,
        now: DateTime<Utc>,
    ) -> Result<ActiveProject, LifecycleError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(LifecycleError::Empty("project name"));
        }

        let mut active: Vec<ActiveProject> = db::try_load_list(&self.store, keys::ACTIVE_PROJECTS)?;
        if active.len() >= MAX_ACTIVE_PROJECTS {
            tracing::warn!(project = %name, "Rejected project, active set is full");
            return Err(LifecycleError::CapacityExceeded);
        }

        let project = ActiveProject::fresh(name.to_string(), CREATED_MARKER, now);
        active.push(project.clone());
        self.store.set(keys::ACTIVE_PROJECTS, &db::encode(&active)?)?;

        tracing::info!(id = %project.id, project = %project.name, "Activated project");
        Ok(project)
    }

    /// Moves an active project to the dead history regardless of its
    /// countdown, recording `7 - days_left` as the day it died. Unknown ids
    /// are a no-op.
    pub fn remove_project(&self, id: Uuid) -> Result<Option<DeadProject>, StoreError> {
        let mut state = self.load_strict()?;
        let Some(index) = state.active.iter().position(|p| p.id == id) else {
            return Ok(None);
        };

        let project = state.active.remove(index);
        let dead = DeadProject {
            name: project.name,
            died_on_day: DEADLINE_DAYS - project.days_left,
        };
        state.dead.insert(0, dead.clone());

        self.store.set_many(&[
            (keys::ACTIVE_PROJECTS, db::encode(&state.active)?),
            (keys::DEAD_PROJECTS, db::encode(&state.dead)?),
        ])?;

        tracing::info!(project = %dead.name, day = dead.died_on_day, "Dropped project");
        Ok(Some(dead))
    }

    pub fn add_idea(&self, text: &str) -> Result<Idea, LifecycleError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(LifecycleError::Empty("idea"));
        }

        let mut ideas: Vec<Idea> = db::try_load_list(&self.store, keys::IDEAS)?;
        let idea = Idea {
            id: Uuid::new_v4(),
            text: text.to_string(),
        };
        ideas.push(idea.clone());
        self.store.set(keys::IDEAS, &db::encode(&ideas)?)?;

        tracing::info!(id = %idea.id, "Banked idea");
        Ok(idea)
    }

    /// Turns an idea into an active project. The capacity check comes first,
    /// so a full active set rejects even unknown ids. `None` if the idea does
    /// not exist.
    pub fn promote_idea_at(
        &self,
        id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Option<ActiveProject>, LifecycleError> {
        let mut state = self.load_strict()?;
        if !state.has_capacity() {
            tracing::warn!(%id, "Rejected promotion, active set is full");
            return Err(LifecycleError::CapacityExceeded);
        }

        let Some(index) = state.ideas.iter().position(|i| i.id == id) else {
            return Ok(None);
        };
        let idea = state.ideas.remove(index);
        let project = ActiveProject::fresh(idea.text, PROMOTED_MARKER, now);
        state.active.push(project.clone());

        self.store.set_many(&[
            (keys::ACTIVE_PROJECTS, db::encode(&state.active)?),
            (keys::IDEAS, db::encode(&state.ideas)?),
        ])?;

        tracing::info!(id = %project.id, project = %project.name, "Promoted idea");
        Ok(Some(project))
    }

    /// Deletes an idea. Returns whether one was removed.
    pub fn delete_idea(&self, id: Uuid) -> Result<bool, StoreError> {
        let mut ideas: Vec<Idea> = db::try_load_list(&self.store, keys::IDEAS)?;
        let before = ideas.len();
        ideas.retain(|i| i.id != id);
        if ideas.len() == before {
            return Ok(false);
        }
        self.store.set(keys::IDEAS, &db::encode(&ideas)?)?;
        Ok(true)
    }

    fn load_strict(&self) -> Result<LifecycleState, StoreError> {
        Ok(LifecycleState {
            active: db::try_load_list(&self.store, keys::ACTIVE_PROJECTS)?,
            dead: db::try_load_list(&self.store, keys::DEAD_PROJECTS)?,
            ideas: db::try_load_list(&self.store, keys::IDEAS)?,
        })
    }
}
