//! Live refresh planner: the single "currently active event" display and
//! the chained timer that keeps it fresh.
//!
//! Unlike the alarm planner, which manages a set of timers, this planner
//! owns exactly one logical timer. Every refresh re-arms it for the next
//! instant at which the display decision could change; if nothing is on
//! the calendar at all, a maintenance wake at the end of the fetch window
//! keeps the chain alive.

use chrono::{DateTime, Duration, Local, TimeZone, Utc};
use log::{debug, error, warn};
use serde::{Deserialize, Serialize};

use crate::classify::{is_active_in_zone, local_midnight_after_in_zone};
use crate::error::{CoreError, EventSourceError, TimerPortError};
use crate::event::{EventInstance, EventSource};
use crate::ports::{
    ArmedPrecision, NotificationKind, NotificationPayload, NotificationPort, TimerPort,
    LIVE_REFRESH_TIMER_ID,
};
use crate::storage::Config;

/// What one live refresh decided.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiveRefreshOutcome {
    /// The event currently shown as live, if any.
    pub display: Option<EventInstance>,
    /// When the next refresh will run.
    pub next_wake: DateTime<Utc>,
}

/// Maintains the live notification and its refresh chain.
pub struct LiveRefreshPlanner<'a, S, T, N> {
    config: &'a Config,
    source: &'a S,
    timer: &'a mut T,
    notifier: &'a mut N,
}

impl<'a, S, T, N> LiveRefreshPlanner<'a, S, T, N>
where
    S: EventSource,
    T: TimerPort,
    N: NotificationPort,
{
    pub fn new(config: &'a Config, source: &'a S, timer: &'a mut T, notifier: &'a mut N) -> Self {
        Self {
            config,
            source,
            timer,
            notifier,
        }
    }

    /// [`refresh_in_zone`](Self::refresh_in_zone) in the system's local zone.
    pub fn refresh(&mut self, now: DateTime<Utc>) -> Result<LiveRefreshOutcome, CoreError> {
        self.refresh_in_zone(now, &Local)
    }

    /// Recompute the live display and arm the next wake-up.
    ///
    /// Display choice: among active events, timed beats all-day, and among
    /// timed events the shortest one wins (the most specific current
    /// meeting). With no timed candidate, the first active all-day event in
    /// source order is shown.
    ///
    /// The next wake is the earliest of the display's end boundary (local
    /// midnight for all-day) and the earliest future event start, falling
    /// back to `now + fetch window` so the chain never stalls.
    pub fn refresh_in_zone<Tz: TimeZone>(
        &mut self,
        now: DateTime<Utc>,
        tz: &Tz,
    ) -> Result<LiveRefreshOutcome, CoreError> {
        let fetch_days = i64::from(self.config.live_fetch_days);
        let fetch_end = now + Duration::days(fetch_days);
        let events = match self.source.query(now, fetch_end) {
            Ok(events) => events,
            Err(EventSourceError::PermissionDenied) => {
                warn!("calendar read permission not granted, clearing live display");
                Vec::new()
            }
            Err(e) => return Err(e.into()),
        };

        let active: Vec<&EventInstance> = events
            .iter()
            .filter(|e| is_active_in_zone(now, tz, e))
            .collect();
        let display = active
            .iter()
            .copied()
            .filter(|e| !e.all_day)
            .min_by_key(|e| e.duration())
            .or_else(|| active.first().copied());

        let mut next_wake: Option<DateTime<Utc>> = None;

        if let Some(event) = display {
            debug!("live display: '{}' ({})", event.title, event.event_id);
            let payload = NotificationPayload::from_instance(event);
            if let Err(e) = self.notifier.show(NotificationKind::LiveOngoing, &payload) {
                error!("failed to show live notification: {e}");
            }
            // All-day events end at the viewer's local midnight, not at
            // their stored UTC boundary.
            let end_boundary = if event.all_day {
                local_midnight_after_in_zone(now, tz)
            } else {
                event.end
            };
            next_wake = Some(end_boundary);
        } else {
            debug!("no active event, clearing live display");
            self.notifier.cancel(NotificationKind::LiveOngoing, 0);
        }

        if let Some(next_start) = events.iter().filter(|e| e.start > now).map(|e| e.start).min() {
            next_wake = Some(match next_wake {
                Some(t) => t.min(next_start),
                None => next_start,
            });
        }

        // Maintenance wake: with zero events in the whole window, the chain
        // must still re-arm itself.
        let next_wake = next_wake.unwrap_or(now + Duration::days(fetch_days));

        match self.timer.arm(LIVE_REFRESH_TIMER_ID, next_wake, true) {
            Ok(ArmedPrecision::Exact) => {}
            Ok(ArmedPrecision::Inexact) => {
                warn!("exact timer unavailable, live refresh armed inexact");
            }
            Err(TimerPortError::Rejected(msg)) => {
                // The chain survives: any other trigger (boot, calendar
                // change, alarm fire) re-runs this refresh.
                error!("timer port rejected live refresh timer: {msg}");
            }
        }

        Ok(LiveRefreshOutcome {
            display: display.cloned(),
            next_wake,
        })
    }
}
