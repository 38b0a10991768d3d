//! Calendar event instances and the source trait the host implements.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::EventSourceError;

/// One occurrence of a calendar event, as reported by the host's calendar.
///
/// Instances are transient: they are recomputed on every refresh and never
/// cached beyond one refresh cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventInstance {
    pub event_id: i64,
    pub title: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// Display color, passed through to the notification payload.
    #[serde(default)]
    pub color: i32,
    /// All-day events carry UTC-anchored day boundaries in `start`/`end`,
    /// unrelated to the viewer's local calendar day.
    #[serde(default)]
    pub all_day: bool,
}

impl EventInstance {
    pub fn duration(&self) -> chrono::Duration {
        self.end - self.start
    }
}

/// Read access to calendar event instances.
///
/// The engine treats the calendar as an external collaborator; hosts back
/// this with whatever calendar storage they have.
pub trait EventSource {
    /// Return all instances overlapping `[range_start, range_end)`, sorted
    /// by start ascending. An empty window returns an empty list, not an
    /// error. All-day instances are included and flagged via `all_day`.
    fn query(
        &self,
        range_start: DateTime<Utc>,
        range_end: DateTime<Utc>,
    ) -> Result<Vec<EventInstance>, EventSourceError>;
}
