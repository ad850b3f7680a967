//! Latest environment reading shared between weather polling and prompts
//!
//! There is exactly one slot. The weather poller holds the only
//! [`SnapshotWriter`]; everything else reads through [`SnapshotReader`],
//! which hands out owned copies so a prompt never sees a half-applied update.

use serde::Serialize;
use tokio::sync::watch;

/// Placeholder shown before the first successful weather poll
pub const UNKNOWN_TEMPERATURE: &str = "--";

/// Condition label before the first poll, and for unmapped codes
pub const UNKNOWN_CONDITION: &str = "Unknown";

/// Latest known environment values
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnvironmentSnapshot {
    /// e.g. "24°C"
    pub temperature_label: String,
    /// e.g. "Partly Cloudy"
    pub condition_label: String,
    /// Kiosk battery percentage, when known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub battery_level: Option<u8>,
}

impl Default for EnvironmentSnapshot {
    fn default() -> Self {
        Self {
            temperature_label: UNKNOWN_TEMPERATURE.to_string(),
            condition_label: UNKNOWN_CONDITION.to_string(),
            battery_level: None,
        }
    }
}

impl EnvironmentSnapshot {
    /// Copy with a battery reading attached
    #[must_use]
    pub fn with_battery(mut self, level: Option<u8>) -> Self {
        self.battery_level = level;
        self
    }
}

/// Create the process-wide snapshot slot
#[must_use]
pub fn snapshot_slot() -> (SnapshotWriter, SnapshotReader) {
    let (tx, rx) = watch::channel(EnvironmentSnapshot::default());
    (SnapshotWriter { tx }, SnapshotReader { rx })
}

/// Sole writer of the snapshot slot
#[derive(Debug)]
pub struct SnapshotWriter {
    tx: watch::Sender<EnvironmentSnapshot>,
}

impl SnapshotWriter {
    /// Replace the weather fields, keeping anything else
    pub fn update_weather(&self, temperature_label: String, condition_label: String) {
        self.tx.send_modify(|snapshot| {
            snapshot.temperature_label = temperature_label;
            snapshot.condition_label = condition_label;
        });
    }

    /// A new reader onto this slot
    #[must_use]
    pub fn reader(&self) -> SnapshotReader {
        SnapshotReader {
            rx: self.tx.subscribe(),
        }
    }
}

/// Read handle onto the snapshot slot
#[derive(Debug, Clone)]
pub struct SnapshotReader {
    rx: watch::Receiver<EnvironmentSnapshot>,
}

impl SnapshotReader {
    /// Owned copy of the latest snapshot
    #[must_use]
    pub fn current(&self) -> EnvironmentSnapshot {
        self.rx.borrow().clone()
    }
}
