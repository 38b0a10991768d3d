//! Durable one-shot timer table standing in for the OS alarm facility.
//!
//! Timers are JSON records in `timers.json`. `calwake tick` drains the due
//! ones and feeds them back into the engine as triggers, the way an OS
//! would deliver alarm callbacks. `calwake boot` deletes the file, which is
//! exactly what a reboot does to a real timer table.

use std::io::ErrorKind;
use std::path::PathBuf;

use calwake_core::error::TimerPortError;
use calwake_core::{storage, ArmedPrecision, TimerPort};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Exact-alarm privilege override: when this variable is set, every arm is
/// granted only inexact precision, modeling a revoked privilege.
pub const NO_EXACT_ENV: &str = "CALWAKE_NO_EXACT_ALARMS";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimerRecord {
    pub id: String,
    pub at: DateTime<Utc>,
    pub exact: bool,
}

/// File-backed timer table at `~/.config/calwake/timers.json`.
pub struct TimerTable {
    path: PathBuf,
}

impl TimerTable {
    /// # Errors
    /// Returns an error if the data directory cannot be determined.
    pub fn open() -> Result<Self, Box<dyn std::error::Error>> {
        Ok(Self {
            path: storage::data_dir()?.join("timers.json"),
        })
    }

    pub fn with_path(path: PathBuf) -> Self {
        Self { path }
    }

    fn load(&self) -> Result<Vec<TimerRecord>, TimerPortError> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(TimerPortError::Rejected(e.to_string())),
        };
        serde_json::from_str(&content).map_err(|e| TimerPortError::Rejected(e.to_string()))
    }

    fn save(&self, records: &[TimerRecord]) -> Result<(), TimerPortError> {
        let content = serde_json::to_string_pretty(records)
            .map_err(|e| TimerPortError::Rejected(e.to_string()))?;
        std::fs::write(&self.path, content).map_err(|e| TimerPortError::Rejected(e.to_string()))
    }

    /// All armed timers, soonest first.
    ///
    /// # Errors
    /// Returns an error if the table cannot be read.
    pub fn armed(&self) -> Result<Vec<TimerRecord>, TimerPortError> {
        let mut records = self.load()?;
        records.sort_by_key(|r| r.at);
        Ok(records)
    }

    /// Remove and return every timer due at or before `now`.
    ///
    /// # Errors
    /// Returns an error if the table cannot be read or written back.
    pub fn due(&self, now: DateTime<Utc>) -> Result<Vec<TimerRecord>, TimerPortError> {
        let records = self.load()?;
        let (due, pending): (Vec<_>, Vec<_>) = records.into_iter().partition(|r| r.at <= now);
        if !due.is_empty() {
            self.save(&pending)?;
        }
        Ok(due)
    }

    /// Drop the whole table, as a reboot would.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be removed.
    pub fn wipe(&self) -> Result<(), std::io::Error> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }
}

impl TimerPort for TimerTable {
    fn arm(
        &mut self,
        id: &str,
        at: DateTime<Utc>,
        exact: bool,
    ) -> Result<ArmedPrecision, TimerPortError> {
        let granted_exact = exact && std::env::var_os(NO_EXACT_ENV).is_none();
        let mut records = self.load()?;
        records.retain(|r| r.id != id);
        records.push(TimerRecord {
            id: id.to_string(),
            at,
            exact: granted_exact,
        });
        self.save(&records)?;
        if granted_exact {
            Ok(ArmedPrecision::Exact)
        } else {
            Ok(ArmedPrecision::Inexact)
        }
    }

    fn cancel(&mut self, id: &str) {
        // Cancelling a missing or unreadable table is a no-op, like
        // cancelling a timer that never existed.
        if let Ok(mut records) = self.load() {
            records.retain(|r| r.id != id);
            let _ = self.save(&records);
        }
    }
}
