use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Display format used for the free-text `date` field when the caller omits it.
pub const DISPLAY_DATE_FORMAT: &str = "%d/%m/%Y, %H:%M";

/// One documented work session.
///
/// `id` and `created_at` are assigned by the ledger when the entry is saved and
/// never change afterwards. `date` is whatever the user typed; `created_at` is
/// authoritative whenever both are present (see [`LogEntry::effective_timestamp`]).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub id: Uuid,
    /// User-supplied display string, not guaranteed to parse.
    pub date: String,
    /// Free-text project label. Matched by substring, not identity.
    pub project: String,
    /// Conventionally `"<n> min"`.
    pub time_worked: String,
    pub achievement: String,
    #[serde(default)]
    pub evidence: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl LogEntry {
    /// `created_at` if present, else `date` parsed as a timestamp.
    pub fn effective_timestamp(&self) -> Option<DateTime<Utc>> {
        self.created_at.or_else(|| parse_loose_timestamp(&self.date))
    }

    pub fn has_evidence(&self) -> bool {
        !self.evidence.trim().is_empty()
    }
}

/// Parses the free-text `date` field.
///
/// Accepts RFC 3339, the display form `dd/mm/YYYY, HH:MM` (interpreted as UTC),
/// and a bare `YYYY-MM-DD` (midnight UTC).
pub fn parse_loose_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in [DISPLAY_DATE_FORMAT, "%d/%m/%Y %H:%M", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    for fmt in ["%Y-%m-%d", "%d/%m/%Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            return date.and_hms_opt(0, 0, 0).map(|n| Utc.from_utc_datetime(&n));
        }
    }
    None
}

/// Input for saving a new entry. `date` defaults to the current time in
/// [`DISPLAY_DATE_FORMAT`] when absent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateEntryInput {
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub project: String,
    #[serde(default)]
    pub time_worked: String,
    #[serde(default)]
    pub achievement: String,
    #[serde(default)]
    pub evidence: String,
}

/// Partial update of an existing entry. `id` and `created_at` cannot be changed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEntryInput {
    pub date: Option<String>,
    pub project: Option<String>,
    pub time_worked: Option<String>,
    pub achievement: Option<String>,
    pub evidence: Option<String>,
}

impl UpdateEntryInput {
    pub fn is_empty(&self) -> bool {
        self.date.is_none()
            && self.project.is_none()
            && self.time_worked.is_none()
            && self.achievement.is_none()
            && self.evidence.is_none()
    }

    pub(crate) fn apply(self, entry: &mut LogEntry) {
        if let Some(date) = self.date {
            entry.date = date;
        }
        if let Some(project) = self.project {
            entry.project = project;
        }
        if let Some(time_worked) = self.time_worked {
            entry.time_worked = time_worked;
        }
        if let Some(achievement) = self.achievement {
            entry.achievement = achievement;
        }
        if let Some(evidence) = self.evidence {
            entry.evidence = evidence;
        }
    }
}

/// Field name → message for each required field that failed validation.
pub type FieldErrors = BTreeMap<String, String>;

/// Checks the three required fields of a save request.
pub fn validate_entry(input: &CreateEntryInput) -> FieldErrors {
    let mut errors = FieldErrors::new();
    if input.project.trim().is_empty() {
        errors.insert("project".into(), "project is required".into());
    }
    if input.time_worked.trim().is_empty() {
        errors.insert("timeWorked".into(), "timeWorked is required".into());
    }
    if input.achievement.trim().is_empty() {
        errors.insert("achievement".into(), "achievement is required".into());
    }
    errors
}

/// Sort order for [`EntryQuery`].
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SortBy {
    /// Newest effective timestamp first.
    #[default]
    Date,
    /// Project label, ascending, case-insensitive.
    Project,
    /// Parsed minutes, longest first.
    Time,
}

impl SortBy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Date => "date",
            Self::Project => "project",
            Self::Time => "time",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "date" => Some(Self::Date),
            "project" => Some(Self::Project),
            "time" => Some(Self::Time),
            _ => None,
        }
    }
}

/// Search, filter and sort parameters for browsing the ledger.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EntryQuery {
    /// Case-insensitive substring over project, achievement and evidence.
    pub search: Option<String>,
    /// Exact project label.
    pub project: Option<String>,
    #[serde(default)]
    pub sort: SortBy,
}
