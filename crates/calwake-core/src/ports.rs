//! Host-facing ports for timers and notifications.
//!
//! The engine drives the host's one-shot timer facility and notification
//! surface through these traits; implementations live with the host.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::TimerPortError;
use crate::event::EventInstance;

/// Timer identity reserved for the single chained live-refresh timer.
/// Alarm timers use their alarm's `unique_id` instead.
pub const LIVE_REFRESH_TIMER_ID: &str = "live_refresh";

/// Precision the host actually granted for an armed timer.
///
/// `arm` requests exact wake-from-idle delivery, but the privilege can be
/// unavailable; the port downgrades rather than failing, and reports the
/// downgrade here so the caller can log it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArmedPrecision {
    Exact,
    Inexact,
}

/// One-shot absolute timers keyed by an opaque string identity.
pub trait TimerPort {
    /// Arm a timer that fires at `at`. Arming an id that already has a
    /// timer replaces it -- re-arming is a no-op in effect, not an error.
    ///
    /// `exact` requests wake-from-idle precision; the port may downgrade
    /// and must report the granted precision.
    fn arm(
        &mut self,
        id: &str,
        at: DateTime<Utc>,
        exact: bool,
    ) -> Result<ArmedPrecision, TimerPortError>;

    /// Cancel the timer with this id, if any. Idempotent.
    fn cancel(&mut self, id: &str);
}

/// The two notification surfaces the engine drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NotificationKind {
    /// A one-shot alert shown when an event's alarm fires.
    FullAlert,
    /// The ongoing, continuously replaced "currently active event" display.
    LiveOngoing,
}

/// What the host renders for a notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationPayload {
    pub event_id: i64,
    pub title: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub all_day: bool,
    pub color: i32,
}

impl NotificationPayload {
    pub fn from_instance(instance: &EventInstance) -> Self {
        Self {
            event_id: instance.event_id,
            title: instance.title.clone(),
            start: instance.start,
            end: instance.end,
            all_day: instance.all_day,
            color: instance.color,
        }
    }
}

/// User-visible alerts. Taps and action buttons route back into the engine
/// as [`Trigger::UserSnoozed`](crate::Trigger) / [`Trigger::UserDismissed`](crate::Trigger).
pub trait NotificationPort {
    /// Show (or replace, for [`NotificationKind::LiveOngoing`]) a
    /// notification.
    fn show(
        &mut self,
        kind: NotificationKind,
        payload: &NotificationPayload,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;

    /// Remove a notification. `event_id` selects the alert for
    /// [`NotificationKind::FullAlert`]; the live display ignores it.
    fn cancel(&mut self, kind: NotificationKind, event_id: i64);
}
