//! SQLite-backed persistent schedule store.
//!
//! The store is the single source of truth mapping alarm `unique_id`s to
//! armed/not-armed, plus the full alarm records kept for display and the
//! user's snooze overrides. Three logical records live in a key-value
//! table, each serialized as one JSON blob; all writes are whole-record
//! replacements so the store always reflects one coherent refresh.
//!
//! A record that fails to parse is treated as empty and logged, never an
//! error: the next refresh rebuilds it from calendar state.

use std::collections::BTreeSet;
use std::path::Path;

use chrono::{DateTime, Utc};
use log::warn;
use rusqlite::{params, Connection};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use super::data_dir;
use crate::alarm::ScheduledAlarm;
use crate::error::StoreError;

const KEY_ARMED_IDS: &str = "armed_unique_ids";
const KEY_ALARM_DETAILS: &str = "alarm_details";
const KEY_SNOOZED_ALARMS: &str = "snoozed_alarms";

/// One coherent view of the persisted schedule state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleSnapshot {
    /// Every `unique_id` currently believed to have an armed timer.
    pub armed_unique_ids: BTreeSet<String>,
    /// Full records for the armed organic alarms, kept for display.
    pub alarm_details: Vec<ScheduledAlarm>,
    /// User snooze overrides. Not derived from the calendar, so they must
    /// survive refreshes that do not re-see their event.
    pub snoozed_alarms: Vec<ScheduledAlarm>,
}

impl ScheduleSnapshot {
    /// Whether this `unique_id` belongs to a snoozed alarm.
    pub fn is_snoozed(&self, unique_id: &str) -> bool {
        self.snoozed_alarms.iter().any(|a| a.unique_id == unique_id)
    }

    /// Find any record (organic or snoozed) by id.
    pub fn find(&self, unique_id: &str) -> Option<&ScheduledAlarm> {
        self.alarm_details
            .iter()
            .chain(self.snoozed_alarms.iter())
            .find(|a| a.unique_id == unique_id)
    }
}

/// SQLite database holding the schedule snapshot.
pub struct ScheduleStore {
    conn: Connection,
}

impl ScheduleStore {
    /// Open the store at `~/.config/calwake/calwake.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self, StoreError> {
        let dir = data_dir().map_err(|e| StoreError::QueryFailed(e.to_string()))?;
        Self::open_at(dir.join("calwake.db"))
    }

    /// Open the store at an explicit path.
    pub fn open_at<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let conn = Connection::open(path.as_ref()).map_err(|source| StoreError::OpenFailed {
            path: path.as_ref().to_path_buf(),
            source,
        })?;
        let store = Self { conn };
        store.migrate()?;
        Ok(store)
    }

    /// Open an in-memory store (for tests).
    pub fn open_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn };
        store.migrate()?;
        Ok(store)
    }

    fn migrate(&self) -> Result<(), StoreError> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS kv (
                key   TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );",
        )?;
        Ok(())
    }

    fn kv_get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut stmt = self.conn.prepare("SELECT value FROM kv WHERE key = ?1")?;
        let result = stmt.query_row(params![key], |row| row.get::<_, String>(0));
        match result {
            Ok(v) => Ok(Some(v)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn kv_set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }

    /// Read one record, treating a missing or corrupt blob as the default.
    fn record_or_default<T: DeserializeOwned + Default>(&self, key: &str) -> Result<T, StoreError> {
        match self.kv_get(key)? {
            None => Ok(T::default()),
            Some(raw) => match serde_json::from_str(&raw) {
                Ok(v) => Ok(v),
                Err(e) => {
                    warn!("persisted record '{key}' is corrupt ({e}); rebuilding from scratch");
                    Ok(T::default())
                }
            },
        }
    }

    /// Load the full snapshot.
    ///
    /// # Errors
    /// Only storage-level failures error out; corrupt JSON yields the empty
    /// record for that key.
    pub fn load(&self) -> Result<ScheduleSnapshot, StoreError> {
        Ok(ScheduleSnapshot {
            armed_unique_ids: self.record_or_default(KEY_ARMED_IDS)?,
            alarm_details: self.record_or_default(KEY_ALARM_DETAILS)?,
            snoozed_alarms: self.record_or_default(KEY_SNOOZED_ALARMS)?,
        })
    }

    /// Replace the full snapshot.
    pub fn save(&self, snapshot: &ScheduleSnapshot) -> Result<(), StoreError> {
        let armed = serde_json::to_string(&snapshot.armed_unique_ids)
            .map_err(|e| StoreError::QueryFailed(e.to_string()))?;
        let details = serde_json::to_string(&snapshot.alarm_details)
            .map_err(|e| StoreError::QueryFailed(e.to_string()))?;
        let snoozed = serde_json::to_string(&snapshot.snoozed_alarms)
            .map_err(|e| StoreError::QueryFailed(e.to_string()))?;
        self.kv_set(KEY_ARMED_IDS, &armed)?;
        self.kv_set(KEY_ALARM_DETAILS, &details)?;
        self.kv_set(KEY_SNOOZED_ALARMS, &snoozed)?;
        Ok(())
    }

    /// Forget that any timer is armed, keeping the alarm records.
    ///
    /// Called on boot: the OS timer table does not survive a reboot, so
    /// every persisted "armed" entry is stale and the next refresh must
    /// re-arm from scratch.
    pub fn mark_all_disarmed(&self) -> Result<(), StoreError> {
        let mut snapshot = self.load()?;
        snapshot.armed_unique_ids.clear();
        self.save(&snapshot)
    }

    /// Future alarms for display, organic and snoozed merged, sorted by
    /// trigger time.
    pub fn upcoming_alarms(&self, now: DateTime<Utc>) -> Result<Vec<ScheduledAlarm>, StoreError> {
        let snapshot = self.load()?;
        let mut seen = BTreeSet::new();
        let mut alarms: Vec<ScheduledAlarm> = snapshot
            .alarm_details
            .iter()
            .chain(snapshot.snoozed_alarms.iter())
            .filter(|a| a.trigger_time > now && seen.insert(a.unique_id.clone()))
            .cloned()
            .collect();
        alarms.sort_by_key(|a| a.trigger_time);
        Ok(alarms)
    }

    /// Write raw bytes into a record slot. Test hook for corruption cases.
    #[cfg(test)]
    pub(crate) fn poison(&self, key: &str, raw: &str) -> Result<(), StoreError> {
        self.kv_set(key, raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn alarm(id: i64, hour: u32, snoozed: bool) -> ScheduledAlarm {
        let trigger = Utc.with_ymd_and_hms(2024, 5, 1, hour, 0, 0).unwrap();
        ScheduledAlarm {
            unique_id: if snoozed {
                crate::alarm::snooze_id(id, trigger)
            } else {
                crate::alarm::organic_id(id, trigger)
            },
            event_id: id,
            title: format!("Event {id}"),
            trigger_time: trigger,
            end_time: trigger + chrono::Duration::hours(1),
            is_snoozed: snoozed,
        }
    }

    #[test]
    fn snapshot_roundtrip() {
        let store = ScheduleStore::open_memory().unwrap();
        let mut snapshot = ScheduleSnapshot::default();
        let a = alarm(1, 9, false);
        let s = alarm(2, 10, true);
        snapshot.armed_unique_ids.insert(a.unique_id.clone());
        snapshot.armed_unique_ids.insert(s.unique_id.clone());
        snapshot.alarm_details.push(a.clone());
        snapshot.snoozed_alarms.push(s.clone());
        store.save(&snapshot).unwrap();

        let loaded = store.load().unwrap();
        assert_eq!(loaded, snapshot);
        assert!(loaded.snoozed_alarms[0].is_snoozed);
        assert!(loaded.is_snoozed(&s.unique_id));
        assert!(!loaded.is_snoozed(&a.unique_id));
    }

    #[test]
    fn empty_store_loads_empty_snapshot() {
        let store = ScheduleStore::open_memory().unwrap();
        let snapshot = store.load().unwrap();
        assert!(snapshot.armed_unique_ids.is_empty());
        assert!(snapshot.alarm_details.is_empty());
        assert!(snapshot.snoozed_alarms.is_empty());
    }

    #[test]
    fn corrupt_record_treated_as_empty() {
        let store = ScheduleStore::open_memory().unwrap();
        let mut snapshot = ScheduleSnapshot::default();
        snapshot.alarm_details.push(alarm(1, 9, false));
        store.save(&snapshot).unwrap();

        store.poison(KEY_ALARM_DETAILS, "{not json").unwrap();
        store.poison(KEY_ARMED_IDS, "42").unwrap();

        let loaded = store.load().unwrap();
        assert!(loaded.alarm_details.is_empty());
        assert!(loaded.armed_unique_ids.is_empty());
    }

    #[test]
    fn mark_all_disarmed_keeps_records() {
        let store = ScheduleStore::open_memory().unwrap();
        let a = alarm(1, 9, false);
        let mut snapshot = ScheduleSnapshot::default();
        snapshot.armed_unique_ids.insert(a.unique_id.clone());
        snapshot.alarm_details.push(a);
        store.save(&snapshot).unwrap();

        store.mark_all_disarmed().unwrap();
        let loaded = store.load().unwrap();
        assert!(loaded.armed_unique_ids.is_empty());
        assert_eq!(loaded.alarm_details.len(), 1);
    }

    #[test]
    fn upcoming_alarms_sorted_and_future_only() {
        let store = ScheduleStore::open_memory().unwrap();
        let mut snapshot = ScheduleSnapshot::default();
        snapshot.alarm_details.push(alarm(1, 15, false));
        snapshot.alarm_details.push(alarm(2, 9, false));
        snapshot.snoozed_alarms.push(alarm(3, 12, true));
        store.save(&snapshot).unwrap();

        let now = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap();
        let upcoming = store.upcoming_alarms(now).unwrap();
        let ids: Vec<i64> = upcoming.iter().map(|a| a.event_id).collect();
        // Event 2 (09:00) already passed.
        assert_eq!(ids, vec![3, 1]);
    }

    #[test]
    fn open_at_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("calwake.db");
        {
            let store = ScheduleStore::open_at(&path).unwrap();
            let mut snapshot = ScheduleSnapshot::default();
            snapshot.armed_unique_ids.insert("1_123".into());
            store.save(&snapshot).unwrap();
        }
        let store = ScheduleStore::open_at(&path).unwrap();
        assert!(store.load().unwrap().armed_unique_ids.contains("1_123"));
    }
}
