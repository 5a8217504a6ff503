//! The ledger store: an ordered, newest-first log of work sessions.
//!
//! Every mutation is a read-modify-write of the whole list under
//! [`keys::ENTRIES`]. Reads never fail; writes report failure so the caller can
//! keep the user's input for a retry.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::db::{self, keys, KeyValueStore};
use crate::error::{LedgerError, StoreError};
use crate::models::*;
use crate::stats::parse_minutes;

/// CSV header, in column order.
pub const CSV_HEADER: [&str; 5] = ["Fecha", "Proyecto", "Tiempo", "Logro", "Evidencia"];

pub struct Ledger<S> {
    store: S,
}

impl<S: KeyValueStore> Ledger<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Validates and saves a new entry at the front of the ledger.
    pub fn append(&self, input: CreateEntryInput) -> Result<LogEntry, LedgerError> {
        self.append_at(input, Utc::now())
    }

    pub fn append_at(
        &self,
        input: CreateEntryInput,
        now: DateTime<Utc>,
    ) -> Result<LogEntry, LedgerError> {
        let errors = validate_entry(&input);
        if !errors.is_empty() {
            return Err(LedgerError::Validation(errors));
        }

        let mut entries = self.load_strict()?;
        let date = match input.date {
            Some(date) if !date.trim().is_empty() => date,
            _ => now.format(DISPLAY_DATE_FORMAT).to_string(),
        };
        let entry = LogEntry {
            id: Uuid::new_v4(),
            date,
            project: input.project,
            time_worked: input.time_worked,
            achievement: input.achievement,
            evidence: input.evidence,
            created_at: Some(now),
        };

        entries.insert(0, entry.clone());
        self.save(&entries)?;

        tracing::info!(id = %entry.id, project = %entry.project, "Saved log entry");
        Ok(entry)
    }

    /// The full snapshot, newest first. Empty if storage cannot be read.
    pub fn list(&self) -> Vec<LogEntry> {
        match self.load_strict() {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!("Failed to read ledger, returning empty snapshot: {}", e);
                Vec::new()
            }
        }
    }

    pub fn get(&self, id: Uuid) -> Option<LogEntry> {
        self.list().into_iter().find(|e| e.id == id)
    }

    /// Removes the entry with `id`. Removing an unknown id succeeds without
    /// writing. Returns whether an entry was removed.
    pub fn remove(&self, id: Uuid) -> Result<bool, StoreError> {
        let mut entries = self.load_strict()?;
        let before = entries.len();
        entries.retain(|e| e.id != id);
        if entries.len() == before {
            return Ok(false);
        }
        self.save(&entries)?;
        tracing::info!(%id, "Deleted log entry");
        Ok(true)
    }

    /// Merges `input` into the entry with `id`. `None` if no such entry.
    pub fn update(&self, id: Uuid, input: UpdateEntryInput) -> Result<Option<LogEntry>, StoreError> {
        let mut entries = self.load_strict()?;
        let Some(entry) = entries.iter_mut().find(|e| e.id == id) else {
            return Ok(None);
        };
        input.apply(entry);
        let updated = entry.clone();
        self.save(&entries)?;
        tracing::info!(%id, "Updated log entry");
        Ok(Some(updated))
    }

    pub fn clear(&self) -> Result<(), StoreError> {
        self.store.remove(keys::ENTRIES)?;
        tracing::info!("Cleared ledger");
        Ok(())
    }

    /// Pretty-printed JSON array of the snapshot.
    pub fn export_json(&self) -> Result<String, StoreError> {
        Ok(serde_json::to_string_pretty(&self.list())?)
    }

    pub fn export_csv(&self) -> String {
        entries_to_csv(&self.list())
    }

    /// Searches, filters and sorts a snapshot for browsing.
    pub fn query(&self, query: &EntryQuery) -> Vec<LogEntry> {
        filter_entries(self.list(), query)
    }

    /// Distinct non-empty project labels, in first-seen order.
    pub fn projects(&self) -> Vec<String> {
        let mut seen: Vec<String> = Vec::new();
        for entry in self.list() {
            if !entry.project.is_empty() && !seen.contains(&entry.project) {
                seen.push(entry.project);
            }
        }
        seen
    }

    fn load_strict(&self) -> Result<Vec<LogEntry>, StoreError> {
        let stored: Vec<StoredEntry> = db::try_load_list(&self.store, keys::ENTRIES)?;
        Ok(stored.into_iter().filter_map(StoredEntry::migrate).collect())
    }

    fn save(&self, entries: &[LogEntry]) -> Result<(), StoreError> {
        self.store.set(keys::ENTRIES, &db::encode(&entries)?)
    }
}

/// CSV with every field double-quoted and a header row.
///
/// Quote characters inside a field are written as-is. An empty snapshot
/// produces an empty string.
pub fn entries_to_csv(entries: &[LogEntry]) -> String {
    if entries.is_empty() {
        return String::new();
    }
    let mut lines = Vec::with_capacity(entries.len() + 1);
    lines.push(CSV_HEADER.join(","));
    for entry in entries {
        let row = [
            &entry.date,
            &entry.project,
            &entry.time_worked,
            &entry.achievement,
            &entry.evidence,
        ]
        .iter()
        .map(|cell| format!("\"{}\"", cell))
        .collect::<Vec<_>>()
        .join(",");
        lines.push(row);
    }
    lines.join("\n")
}

pub fn filter_entries(entries: Vec<LogEntry>, query: &EntryQuery) -> Vec<LogEntry> {
    let needle = query
        .search
        .as_deref()
        .map(str::to_lowercase)
        .filter(|s| !s.is_empty());

    let mut matched: Vec<LogEntry> = entries
        .into_iter()
        .filter(|e| match &needle {
            Some(n) => {
                e.project.to_lowercase().contains(n)
                    || e.achievement.to_lowercase().contains(n)
                    || e.evidence.to_lowercase().contains(n)
            }
            None => true,
        })
        .filter(|e| match query.project.as_deref() {
            Some(p) if !p.is_empty() => e.project == p,
            _ => true,
        })
        .collect();

    match query.sort {
        SortBy::Date => matched.sort_by(|a, b| {
            match (a.effective_timestamp(), b.effective_timestamp()) {
                (Some(a), Some(b)) => b.cmp(&a),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            }
        }),
        SortBy::Project => {
            matched.sort_by_key(|e| e.project.to_lowercase());
        }
        SortBy::Time => {
            matched.sort_by(|a, b| parse_minutes(&b.time_worked).cmp(&parse_minutes(&a.time_worked)))
        }
    }
    matched
}

/// Loose on-disk shape of an entry, before migration.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredEntry {
    #[serde(default)]
    id: Option<serde_json::Value>,
    #[serde(default)]
    date: Option<String>,
    #[serde(default)]
    project: Option<String>,
    #[serde(default)]
    time_worked: Option<String>,
    #[serde(default)]
    achievement: Option<String>,
    #[serde(default)]
    evidence: Option<String>,
    #[serde(default)]
    created_at: Option<String>,
}

impl StoredEntry {
    /// Normalizes a stored record. Records without an achievement are dropped;
    /// foreign ids are mapped to stable UUIDs.
    fn migrate(self) -> Option<LogEntry> {
        let achievement = self.achievement?;
        let date = self.date.unwrap_or_default();
        let project = self.project.unwrap_or_default();
        let created_at = self
            .created_at
            .as_deref()
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc));

        let id = match self.id {
            Some(serde_json::Value::String(s)) => {
                Uuid::parse_str(&s).unwrap_or_else(|_| legacy_id(&s))
            }
            Some(serde_json::Value::Number(n)) => legacy_id(&n.to_string()),
            _ => legacy_id(&format!(
                "{}|{}|{}|{}",
                date,
                project,
                achievement,
                self.created_at.as_deref().unwrap_or_default()
            )),
        };

        Some(LogEntry {
            id,
            date,
            project,
            time_worked: self.time_worked.unwrap_or_default(),
            achievement,
            evidence: self.evidence.unwrap_or_default(),
            created_at,
        })
    }
}

fn legacy_id(seed: &str) -> Uuid {
    Uuid::new_v5(&Uuid::NAMESPACE_OID, seed.as_bytes())
}
