//! Presentation preferences kept next to the ledger.

use chrono::NaiveTime;

use crate::db::{self, keys, KeyValueStore};
use crate::error::SettingsError;
use crate::models::{PowerZone, Settings, UpdateSettingsInput};

pub struct SettingsStore<S> {
    store: S,
}

impl<S: KeyValueStore> SettingsStore<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Stored settings, with defaults for anything missing or unreadable.
    pub fn get(&self) -> Settings {
        let power_zone = self
            .read::<PowerZone>(keys::POWER_ZONE)
            .unwrap_or_default();
        let dark_mode = self.read::<bool>(keys::DARK_MODE).unwrap_or(false);
        Settings {
            power_zone,
            dark_mode,
        }
    }

    pub fn update(&self, input: UpdateSettingsInput) -> Result<Settings, SettingsError> {
        let mut pairs = Vec::new();
        if let Some(zone) = &input.power_zone {
            validate_time(&zone.start)?;
            validate_time(&zone.end)?;
            pairs.push((keys::POWER_ZONE, db::encode(zone)?));
        }
        if let Some(dark_mode) = input.dark_mode {
            pairs.push((keys::DARK_MODE, db::encode(&dark_mode)?));
        }
        if !pairs.is_empty() {
            self.store.set_many(&pairs)?;
        }
        Ok(self.get())
    }

    fn read<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        match self.store.get(key) {
            Ok(Some(raw)) => serde_json::from_str(&raw)
                .map_err(|e| tracing::warn!("Malformed setting {}: {}", key, e))
                .ok(),
            Ok(None) => None,
            Err(e) => {
                tracing::warn!("Failed to read setting {}: {}", key, e);
                None
            }
        }
    }
}

fn validate_time(value: &str) -> Result<(), SettingsError> {
    NaiveTime::parse_from_str(value, "%H:%M")
        .map(|_| ())
        .map_err(|_| SettingsError::InvalidTime(value.to_string()))
}
