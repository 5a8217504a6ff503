use serde::{Deserialize, Serialize};

/// The user's preferred focus window, as two `HH:MM` strings.
///
/// Stored for the presentation layer; the engine never interprets it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PowerZone {
    pub start: String,
    pub end: String,
}

impl Default for PowerZone {
    fn default() -> Self {
        Self {
            start: "20:00".to_string(),
            end: "00:00".to_string(),
        }
    }
}

/// Presentation preferences persisted alongside the ledger.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub power_zone: PowerZone,
    pub dark_mode: bool,
}

/// Partial settings update.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSettingsInput {
    pub power_zone: Option<PowerZone>,
    pub dark_mode: Option<bool>,
}
