//! Scheduled alarm records and their identity keys.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::event::EventInstance;

/// One armed (or believed-armed) wake-up for an event occurrence.
///
/// Records are created by the alarm planner (organic alarms) or by a user
/// snooze, and destroyed when their trigger time passes or the user
/// dismisses them. They persist across process restarts; the host's timer
/// table does not, so after a boot every record is treated as not armed
/// until the next refresh re-arms it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledAlarm {
    /// Deterministic dedup key; also the timer identity handed to the
    /// timer port. At most one armed timer exists per `unique_id`.
    pub unique_id: String,
    pub event_id: i64,
    pub title: String,
    pub trigger_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    #[serde(default)]
    pub is_snoozed: bool,
}

impl ScheduledAlarm {
    /// Organic alarm derived from a calendar instance: fires at the
    /// instance's start.
    pub fn organic(instance: &EventInstance) -> Self {
        Self {
            unique_id: organic_id(instance.event_id, instance.start),
            event_id: instance.event_id,
            title: instance.title.clone(),
            trigger_time: instance.start,
            end_time: instance.end,
            is_snoozed: false,
        }
    }

    /// User-initiated snooze override, independent of calendar state.
    pub fn snoozed(
        event_id: i64,
        title: String,
        trigger_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
    ) -> Self {
        Self {
            unique_id: snooze_id(event_id, trigger_time),
            event_id,
            title,
            trigger_time,
            end_time,
            is_snoozed: true,
        }
    }
}

/// Identity of an organic alarm: the `(event_id, start)` compound key
/// rendered as a string. Using the compound key directly (rather than a
/// short hash of it) makes collisions impossible.
pub fn organic_id(event_id: i64, start: DateTime<Utc>) -> String {
    format!("{}_{}", event_id, start.timestamp_millis())
}

/// Identity of a snooze occurrence. Tagged so a snooze can coexist with an
/// organic alarm for the same event.
pub fn snooze_id(event_id: i64, trigger_time: DateTime<Utc>) -> String {
    format!("{}_snooze_{}", event_id, trigger_time.timestamp_millis())
}
