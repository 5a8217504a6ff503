//! Facade over the ledger, the lifecycle engine and settings.
//!
//! Every ledger mutation is followed by a lifecycle recomputation against the
//! new snapshot. Reads recompute too, so a tracker reopened after days away
//! reports the right countdowns without any timer having fired.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::db::KeyValueStore;
use crate::error::{LedgerError, LifecycleError, StoreError};
use crate::ledger::Ledger;
use crate::lifecycle::Lifecycle;
use crate::models::*;
use crate::settings::SettingsStore;
use crate::stats;

pub struct Tracker<S> {
    ledger: Ledger<S>,
    lifecycle: Lifecycle<S>,
    settings: SettingsStore<S>,
}

impl<S: KeyValueStore + Clone> Tracker<S> {
    pub fn new(store: S) -> Self {
        Self {
            ledger: Ledger::new(store.clone()),
            lifecycle: Lifecycle::new(store.clone()),
            settings: SettingsStore::new(store),
        }
    }
}

impl<S: KeyValueStore> Tracker<S> {
    pub fn ledger(&self) -> &Ledger<S> {
        &self.ledger
    }

    pub fn lifecycle(&self) -> &Lifecycle<S> {
        &self.lifecycle
    }

    pub fn settings(&self) -> &SettingsStore<S> {
        &self.settings
    }

    // ============================================================
    // Ledger mutations
    // ============================================================

    pub fn log(&self, input: CreateEntryInput) -> Result<LogEntry, LedgerError> {
        self.log_at(input, Utc::now())
    }

    pub fn log_at(
        &self,
        input: CreateEntryInput,
        now: DateTime<Utc>,
    ) -> Result<LogEntry, LedgerError> {
        let entry = self.ledger.append_at(input, now)?;
        self.sync(now);
        Ok(entry)
    }

    pub fn update_entry(
        &self,
        id: Uuid,
        input: UpdateEntryInput,
    ) -> Result<Option<LogEntry>, StoreError> {
        let updated = self.ledger.update(id, input)?;
        if updated.is_some() {
            self.sync(Utc::now());
        }
        Ok(updated)
    }

    pub fn remove_entry(&self, id: Uuid) -> Result<bool, StoreError> {
        let removed = self.ledger.remove(id)?;
        if removed {
            self.sync(Utc::now());
        }
        Ok(removed)
    }

    pub fn clear_entries(&self) -> Result<(), StoreError> {
        self.ledger.clear()?;
        self.sync(Utc::now());
        Ok(())
    }

    // ============================================================
    // Lifecycle
    // ============================================================

    pub fn add_project(&self, name: &str) -> Result<ActiveProject, LifecycleError> {
        self.add_project_at(name, Utc::now())
    }

    /// Countdowns are brought up to `now` first, so projects that expired
    /// while nobody looked free their slot.
    pub fn add_project_at(
        &self,
        name: &str,
        now: DateTime<Utc>,
    ) -> Result<ActiveProject, LifecycleError> {
        self.catch_up(now)?;
        self.lifecycle.add_project_at(name, now)
    }

    pub fn remove_project(&self, id: Uuid) -> Result<Option<DeadProject>, StoreError> {
        self.remove_project_at(id, Utc::now())
    }

    /// The recorded day is taken from the countdown as of `now`.
    pub fn remove_project_at(
        &self,
        id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Option<DeadProject>, StoreError> {
        self.catch_up(now)?;
        self.lifecycle.remove_project(id)
    }

    pub fn add_idea(&self, text: &str) -> Result<Idea, LifecycleError> {
        self.lifecycle.add_idea(text)
    }

    pub fn promote_idea(&self, id: Uuid) -> Result<Option<ActiveProject>, LifecycleError> {
        self.promote_idea_at(id, Utc::now())
    }

    pub fn promote_idea_at(
        &self,
        id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Option<ActiveProject>, LifecycleError> {
        self.catch_up(now)?;
        self.lifecycle.promote_idea_at(id, now)
    }

    pub fn delete_idea(&self, id: Uuid) -> Result<bool, StoreError> {
        self.lifecycle.delete_idea(id)
    }

    // ============================================================
    // Reads
    // ============================================================

    /// Lifecycle state recomputed against the current ledger.
    pub fn lifecycle_state_at(&self, now: DateTime<Utc>) -> LifecycleState {
        self.lifecycle.refresh_at(&self.ledger.list(), now)
    }

    pub fn stats_at(&self, now: DateTime<Utc>) -> Stats {
        stats::compute_stats_at(&self.ledger.list(), now)
    }

    pub fn dashboard(&self) -> Dashboard {
        self.dashboard_at(Utc::now())
    }

    pub fn dashboard_at(&self, now: DateTime<Utc>) -> Dashboard {
        let entries = self.ledger.list();
        let state = self.lifecycle.refresh_at(&entries, now);
        Dashboard {
            stats: stats::compute_stats_at(&entries, now),
            active: state.active,
            dead: state.dead,
            ideas: state.ideas,
        }
    }

    /// Strict recomputation ahead of a lifecycle mutation. A failure here
    /// aborts the mutation rather than acting on stale countdowns.
    fn catch_up(&self, now: DateTime<Utc>) -> Result<(), StoreError> {
        self.lifecycle
            .recompute_at(&self.ledger.list(), now)
            .map(|_| ())
    }

    fn sync(&self, now: DateTime<Utc>) {
        if let Err(e) = self.lifecycle.recompute_at(&self.ledger.list(), now) {
            tracing::warn!("Lifecycle recomputation failed after ledger change: {}", e);
        }
    }
}
