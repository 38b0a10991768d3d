//! Refresh planners.
//!
//! Each planner is invoked synchronously by an external trigger and runs to
//! completion; there is no worker thread and no mid-flight cancellation.
//! Arm/cancel operations are individually idempotent, so a partially
//! applied refresh is safe to retry.

mod alarms;
mod live;

pub use alarms::{AlarmPlanner, AlarmRefreshOutcome, SkipReason};
pub use live::{LiveRefreshOutcome, LiveRefreshPlanner};

#[cfg(test)]
pub(crate) mod testutil {
    use chrono::{DateTime, TimeZone, Utc};

    use crate::error::{EventSourceError, TimerPortError};
    use crate::event::{EventInstance, EventSource};
    use crate::ports::{
        ArmedPrecision, NotificationKind, NotificationPayload, NotificationPort, TimerPort,
    };

    pub fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, hour, minute, 0).unwrap()
    }

    pub fn timed(event_id: i64, start: DateTime<Utc>, end: DateTime<Utc>) -> EventInstance {
        EventInstance {
            event_id,
            title: format!("Event {event_id}"),
            start,
            end,
            color: 0,
            all_day: false,
        }
    }

    pub fn all_day(event_id: i64, start: DateTime<Utc>, end: DateTime<Utc>) -> EventInstance {
        EventInstance {
            all_day: true,
            ..timed(event_id, start, end)
        }
    }

    /// Canned calendar. Mimics the range contract: returns instances
    /// overlapping the queried range, sorted by start.
    pub struct FakeCalendar {
        pub events: Vec<EventInstance>,
        pub permission_denied: bool,
    }

    impl FakeCalendar {
        pub fn new(mut events: Vec<EventInstance>) -> Self {
            events.sort_by_key(|e| e.start);
            Self {
                events,
                permission_denied: false,
            }
        }

        pub fn denied() -> Self {
            Self {
                events: Vec::new(),
                permission_denied: true,
            }
        }
    }

    impl EventSource for FakeCalendar {
        fn query(
            &self,
            range_start: DateTime<Utc>,
            range_end: DateTime<Utc>,
        ) -> Result<Vec<EventInstance>, EventSourceError> {
            if self.permission_denied {
                return Err(EventSourceError::PermissionDenied);
            }
            Ok(self
                .events
                .iter()
                .filter(|e| e.start < range_end && e.end >= range_start)
                .cloned()
                .collect())
        }
    }

    /// Records arm/cancel calls; configurable to downgrade or reject.
    #[derive(Default)]
    pub struct RecordingTimer {
        pub armed: Vec<(String, DateTime<Utc>, bool)>,
        pub cancelled: Vec<String>,
        pub exact_unavailable: bool,
        pub reject_all: bool,
    }

    impl TimerPort for RecordingTimer {
        fn arm(
            &mut self,
            id: &str,
            at: DateTime<Utc>,
            exact: bool,
        ) -> Result<ArmedPrecision, TimerPortError> {
            if self.reject_all {
                return Err(TimerPortError::Rejected("rejected by test".into()));
            }
            self.armed.retain(|(existing, _, _)| existing != id);
            self.armed.push((id.to_string(), at, exact));
            if exact && !self.exact_unavailable {
                Ok(ArmedPrecision::Exact)
            } else {
                Ok(ArmedPrecision::Inexact)
            }
        }

        fn cancel(&mut self, id: &str) {
            self.armed.retain(|(existing, _, _)| existing != id);
            self.cancelled.push(id.to_string());
        }
    }

    /// Records show/cancel calls.
    #[derive(Default)]
    pub struct RecordingNotifier {
        pub shown: Vec<(NotificationKind, NotificationPayload)>,
        pub cancelled: Vec<(NotificationKind, i64)>,
    }

    impl NotificationPort for RecordingNotifier {
        fn show(
            &mut self,
            kind: NotificationKind,
            payload: &NotificationPayload,
        ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
            self.shown.push((kind, payload.clone()));
            Ok(())
        }

        fn cancel(&mut self, kind: NotificationKind, event_id: i64) {
            self.cancelled.push((kind, event_id));
        }
    }
}
