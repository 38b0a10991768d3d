//! Trigger dispatch.
//!
//! Hosts deliver lifecycle callbacks (boot, timer fire, permission grant,
//! user action) as [`Trigger`] values through one entry point, which routes
//! to the planners. No error escapes a dispatch: triggers like timers and
//! boot signals cannot usefully react to a thrown error, so every failure
//! is logged and folded into the returned [`DispatchSummary`].

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use log::{debug, error, warn};
use serde::{Deserialize, Serialize};

use crate::alarm::ScheduledAlarm;
use crate::event::EventSource;
use crate::planner::{AlarmPlanner, AlarmRefreshOutcome, LiveRefreshOutcome, LiveRefreshPlanner};
use crate::ports::{NotificationKind, NotificationPayload, NotificationPort, TimerPort};
use crate::storage::{Config, ScheduleStore};

/// A host callback, decoupled from any specific callback mechanism.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Trigger {
    /// System restarted. The OS timer table did not survive, so every
    /// persisted "armed" record is stale and everything re-arms.
    BootCompleted,
    /// A per-event alarm timer fired.
    AlarmFired { unique_id: String },
    /// The chained live-refresh timer fired.
    LiveTimerFired,
    /// Calendar content changed under us.
    CalendarChanged,
    /// The user granted calendar read permission.
    PermissionGranted,
    /// The user snoozed an alert. `minutes == 0` means the configured
    /// default.
    UserSnoozed {
        event_id: i64,
        title: String,
        end_time: DateTime<Utc>,
        minutes: u32,
    },
    /// The user dismissed an alarm.
    UserDismissed { unique_id: String },
}

/// Everything one dispatch did, for logging and host display.
#[derive(Debug, Default, Serialize)]
pub struct DispatchSummary {
    pub alarms: Option<AlarmRefreshOutcome>,
    pub live: Option<LiveRefreshOutcome>,
    pub snoozed: Option<ScheduledAlarm>,
    pub dismissed: Option<String>,
    /// Component failures, already logged; collected for display only.
    pub errors: Vec<String>,
}

/// Owns the store, config, and ports, and routes triggers to the planners.
///
/// `dispatch` takes `&mut self`, so a single engine value serializes its
/// refreshes by construction; hosts that deliver triggers concurrently
/// share the engine behind a `Mutex` (see [`dispatch_detached`]), which
/// doubles as the single-flight guard.
pub struct Engine<S, T, N> {
    config: Config,
    store: ScheduleStore,
    source: S,
    timer: T,
    notifier: N,
}

impl<S, T, N> Engine<S, T, N>
where
    S: EventSource,
    T: TimerPort,
    N: NotificationPort,
{
    pub fn new(config: Config, store: ScheduleStore, source: S, timer: T, notifier: N) -> Self {
        Self {
            config,
            store,
            source,
            timer,
            notifier,
        }
    }

    pub fn store(&self) -> &ScheduleStore {
        &self.store
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Route one trigger. Runs to completion; never panics or errors out.
    pub fn dispatch(&mut self, trigger: Trigger, now: DateTime<Utc>) -> DispatchSummary {
        debug!("dispatching {trigger:?}");
        let mut summary = DispatchSummary::default();
        match trigger {
            Trigger::BootCompleted => {
                if let Err(e) = self.store.mark_all_disarmed() {
                    error!("failed to reset armed state after boot: {e}");
                    summary.errors.push(e.to_string());
                }
                self.refresh_alarms(now, &mut summary);
                self.refresh_live(now, &mut summary);
            }
            Trigger::AlarmFired { unique_id } => {
                self.show_alert(&unique_id, &mut summary);
                self.refresh_alarms(now, &mut summary);
            }
            Trigger::LiveTimerFired => {
                self.refresh_live(now, &mut summary);
            }
            Trigger::CalendarChanged | Trigger::PermissionGranted => {
                self.refresh_alarms(now, &mut summary);
                self.refresh_live(now, &mut summary);
            }
            Trigger::UserSnoozed {
                event_id,
                title,
                end_time,
                minutes,
            } => {
                let minutes = if minutes == 0 {
                    self.config.notifications.default_snooze_minutes
                } else {
                    minutes
                };
                let mut planner =
                    AlarmPlanner::new(&self.config, &self.source, &self.store, &mut self.timer);
                match planner.snooze(now, event_id, title, end_time, minutes) {
                    Ok(alarm) => {
                        self.notifier.cancel(NotificationKind::FullAlert, event_id);
                        summary.snoozed = Some(alarm);
                    }
                    Err(e) => {
                        error!("snooze failed: {e}");
                        summary.errors.push(e.to_string());
                    }
                }
            }
            Trigger::UserDismissed { unique_id } => {
                let event_id = self
                    .store
                    .load()
                    .ok()
                    .and_then(|s| s.find(&unique_id).map(|a| a.event_id));
                let mut planner =
                    AlarmPlanner::new(&self.config, &self.source, &self.store, &mut self.timer);
                match planner.cancel(&unique_id) {
                    Ok(_) => {
                        if let Some(event_id) = event_id {
                            self.notifier.cancel(NotificationKind::FullAlert, event_id);
                        }
                        summary.dismissed = Some(unique_id);
                    }
                    Err(e) => {
                        error!("dismiss failed: {e}");
                        summary.errors.push(e.to_string());
                    }
                }
            }
        }
        summary
    }

    /// A fired alarm becomes a full alert, looked up from the persisted
    /// record so the payload survives process death between arm and fire.
    fn show_alert(&mut self, unique_id: &str, summary: &mut DispatchSummary) {
        let record = match self.store.load() {
            Ok(snapshot) => snapshot.find(unique_id).cloned(),
            Err(e) => {
                error!("failed to load store for fired alarm: {e}");
                summary.errors.push(e.to_string());
                None
            }
        };
        match record {
            Some(alarm) => {
                let payload = NotificationPayload {
                    event_id: alarm.event_id,
                    title: alarm.title.clone(),
                    start: alarm.trigger_time,
                    end: alarm.end_time,
                    all_day: false,
                    color: 0,
                };
                if let Err(e) = self.notifier.show(NotificationKind::FullAlert, &payload) {
                    error!("failed to show alert for '{unique_id}': {e}");
                    summary.errors.push(e.to_string());
                }
            }
            None => {
                // An unknown id means the record was already cleaned up
                // (e.g. the OS re-delivered a stale timer). Nothing to show.
                warn!("fired alarm '{unique_id}' has no persisted record");
            }
        }
    }

    fn refresh_alarms(&mut self, now: DateTime<Utc>, summary: &mut DispatchSummary) {
        let mut planner =
            AlarmPlanner::new(&self.config, &self.source, &self.store, &mut self.timer);
        match planner.refresh(now) {
            Ok(outcome) => summary.alarms = Some(outcome),
            Err(e) => {
                error!("alarm refresh failed: {e}");
                summary.errors.push(e.to_string());
            }
        }
    }

    fn refresh_live(&mut self, now: DateTime<Utc>, summary: &mut DispatchSummary) {
        let mut planner = LiveRefreshPlanner::new(
            &self.config,
            &self.source,
            &mut self.timer,
            &mut self.notifier,
        );
        match planner.refresh(now) {
            Ok(outcome) => summary.live = Some(outcome),
            Err(e) => {
                error!("live refresh failed: {e}");
                summary.errors.push(e.to_string());
            }
        }
    }
}

/// Run a dispatch on a blocking worker and return its completion handle.
///
/// Trigger mechanisms with a short execution budget (broadcast-style
/// callbacks) hand the work off here and await the returned handle before
/// considering the callback finished. The shared `Mutex` serializes
/// concurrent dispatches -- the single-flight guard over the store.
pub fn dispatch_detached<S, T, N>(
    engine: Arc<Mutex<Engine<S, T, N>>>,
    trigger: Trigger,
) -> tokio::task::JoinHandle<DispatchSummary>
where
    S: EventSource + Send + 'static,
    T: TimerPort + Send + 'static,
    N: NotificationPort + Send + 'static,
{
    tokio::task::spawn_blocking(move || {
        let mut engine = engine.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        engine.dispatch(trigger, Utc::now())
    })
}
