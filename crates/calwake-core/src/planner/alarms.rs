//! Alarm planner: one exact wake-up timer per upcoming event instance.
//!
//! Every refresh recomputes the candidate set from the calendar window and
//! reconciles it against the persisted armed set. The dedup rule is the
//! core of the algorithm: only unseen `unique_id`s get a new timer, so
//! refreshing twice with no calendar change arms nothing the second time.

use std::collections::BTreeSet;

use chrono::{DateTime, Duration, Utc};
use log::{debug, error, warn};
use serde::{Deserialize, Serialize};

use crate::alarm::ScheduledAlarm;
use crate::error::{CoreError, EventSourceError, TimerPortError};
use crate::event::EventSource;
use crate::ports::{ArmedPrecision, TimerPort};
use crate::storage::{Config, ScheduleSnapshot, ScheduleStore};

/// Why a refresh did nothing. Both cases fail soft: they are logged and
/// retried when the blocking condition changes, never raised as errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    NotificationsDisabled,
    PermissionDenied,
}

/// What one alarm refresh did.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AlarmRefreshOutcome {
    /// Alarms newly armed this refresh.
    pub armed: Vec<ScheduledAlarm>,
    /// `unique_id`s whose timers were cancelled (instance left the window).
    pub cancelled: Vec<String>,
    /// Timers armed with degraded (inexact) precision.
    pub degraded_to_inexact: usize,
    /// Arm requests the host refused; those events stay unalarmed and are
    /// retried on the next refresh.
    pub rejected: usize,
    pub skipped: Option<SkipReason>,
}

/// Schedules wake-up alarms for upcoming calendar instances.
pub struct AlarmPlanner<'a, S, T> {
    config: &'a Config,
    source: &'a S,
    store: &'a ScheduleStore,
    timer: &'a mut T,
}

impl<'a, S: EventSource, T: TimerPort> AlarmPlanner<'a, S, T> {
    pub fn new(config: &'a Config, source: &'a S, store: &'a ScheduleStore, timer: &'a mut T) -> Self {
        Self {
            config,
            source,
            store,
            timer,
        }
    }

    /// Reconcile armed timers with the calendar window `(now, now + 24h]`.
    ///
    /// All-day instances never get a timed wake-up and are excluded.
    /// Snoozed alarms are user overrides independent of calendar state:
    /// they are never cancelled here and survive until they fire, expire,
    /// or are explicitly dismissed.
    ///
    /// # Errors
    /// Only store failures propagate. A missing calendar permission or the
    /// global notifications switch turn the refresh into a logged no-op.
    pub fn refresh(&mut self, now: DateTime<Utc>) -> Result<AlarmRefreshOutcome, CoreError> {
        if !self.config.notifications.enabled {
            debug!("notifications disabled, skipping alarm scheduling");
            return Ok(AlarmRefreshOutcome {
                skipped: Some(SkipReason::NotificationsDisabled),
                ..Default::default()
            });
        }

        let window_end = now + Duration::hours(i64::from(self.config.alarm_window_hours));
        let instances = match self.source.query(now, window_end) {
            Ok(instances) => instances,
            Err(EventSourceError::PermissionDenied) => {
                warn!("calendar read permission not granted, skipping alarm scheduling");
                return Ok(AlarmRefreshOutcome {
                    skipped: Some(SkipReason::PermissionDenied),
                    ..Default::default()
                });
            }
            Err(e) => return Err(e.into()),
        };

        let snapshot = self.store.load()?;

        let candidates: Vec<ScheduledAlarm> = instances
            .iter()
            .filter(|e| !e.all_day && e.start > now && e.start <= window_end)
            .map(ScheduledAlarm::organic)
            .collect();
        let candidate_ids: BTreeSet<String> =
            candidates.iter().map(|a| a.unique_id.clone()).collect();

        let mut outcome = AlarmRefreshOutcome::default();
        let mut new_armed = BTreeSet::new();

        for alarm in &candidates {
            if snapshot.armed_unique_ids.contains(&alarm.unique_id) {
                // Already armed; re-arming an identical alarm every refresh
                // is exactly what the dedup rule prevents.
                new_armed.insert(alarm.unique_id.clone());
                continue;
            }
            match self.timer.arm(&alarm.unique_id, alarm.trigger_time, true) {
                Ok(precision) => {
                    if precision == ArmedPrecision::Inexact {
                        warn!(
                            "exact timer unavailable, armed '{}' inexact",
                            alarm.unique_id
                        );
                        outcome.degraded_to_inexact += 1;
                    }
                    new_armed.insert(alarm.unique_id.clone());
                    outcome.armed.push(alarm.clone());
                }
                Err(TimerPortError::Rejected(msg)) => {
                    error!("timer port rejected '{}': {msg}", alarm.unique_id);
                    outcome.rejected += 1;
                }
            }
        }

        // Instances that dropped out of the window (deleted or rescheduled)
        // lose their timer. Snoozed ids are exempt.
        for old_id in &snapshot.armed_unique_ids {
            if !candidate_ids.contains(old_id) && !snapshot.is_snoozed(old_id) {
                self.timer.cancel(old_id);
                outcome.cancelled.push(old_id.clone());
            }
        }

        let snoozed_alarms: Vec<ScheduledAlarm> = snapshot
            .snoozed_alarms
            .iter()
            .filter(|a| a.trigger_time > now)
            .cloned()
            .collect();
        for snoozed in &snoozed_alarms {
            new_armed.insert(snoozed.unique_id.clone());
        }

        self.store.save(&ScheduleSnapshot {
            armed_unique_ids: new_armed,
            alarm_details: candidates,
            snoozed_alarms,
        })?;

        debug!(
            "alarm refresh: {} armed, {} cancelled, {} in window",
            outcome.armed.len(),
            outcome.cancelled.len(),
            candidate_ids.len()
        );
        Ok(outcome)
    }

    /// Arm a user-initiated snooze firing `minutes` from `now`.
    ///
    /// Bypasses the window logic -- this is a direct user action -- and is
    /// appended to the persisted snoozed set so subsequent refreshes
    /// preserve it even when the event is absent from the calendar window.
    ///
    /// # Errors
    /// Unlike organic arming, a host rejection propagates so the caller can
    /// tell the user the snooze did not take.
    pub fn snooze(
        &mut self,
        now: DateTime<Utc>,
        event_id: i64,
        title: String,
        end_time: DateTime<Utc>,
        minutes: u32,
    ) -> Result<ScheduledAlarm, CoreError> {
        let trigger = now + Duration::minutes(i64::from(minutes));
        let alarm = ScheduledAlarm::snoozed(event_id, title, trigger, end_time);

        let precision = self.timer.arm(&alarm.unique_id, trigger, true)?;
        if precision == ArmedPrecision::Inexact {
            warn!("exact timer unavailable, snooze '{}' armed inexact", alarm.unique_id);
        }

        let mut snapshot = self.store.load()?;
        snapshot.armed_unique_ids.insert(alarm.unique_id.clone());
        snapshot.snoozed_alarms.push(alarm.clone());
        self.store.save(&snapshot)?;

        debug!("snoozed event {event_id} for {minutes} minutes");
        Ok(alarm)
    }

    /// Cancel an alarm and forget it everywhere: armed set, display
    /// records, and the snoozed list. Idempotent; the underlying timer is
    /// cancelled exactly once either way.
    pub fn cancel(&mut self, unique_id: &str) -> Result<bool, CoreError> {
        self.timer.cancel(unique_id);

        let mut snapshot = self.store.load()?;
        let mut removed = snapshot.armed_unique_ids.remove(unique_id);
        let details_before = snapshot.alarm_details.len();
        snapshot.alarm_details.retain(|a| a.unique_id != unique_id);
        let snoozed_before = snapshot.snoozed_alarms.len();
        snapshot.snoozed_alarms.retain(|a| a.unique_id != unique_id);
        removed = removed
            || snapshot.alarm_details.len() != details_before
            || snapshot.snoozed_alarms.len() != snoozed_before;
        self.store.save(&snapshot)?;

        debug!("cancelled alarm: {unique_id}");
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planner::testutil::{at, all_day, timed, FakeCalendar, RecordingTimer};

    fn config() -> Config {
        Config::default()
    }

    fn window_events() -> Vec<crate::event::EventInstance> {
        vec![
            timed(1, at(10, 0), at(11, 0)),
            timed(2, at(12, 30), at(13, 0)),
            all_day(3, at(0, 0), at(23, 59)),
        ]
    }

    #[test]
    fn first_refresh_arms_timed_events_only() {
        let config = config();
        let source = FakeCalendar::new(window_events());
        let store = ScheduleStore::open_memory().unwrap();
        let mut timer = RecordingTimer::default();

        let outcome = AlarmPlanner::new(&config, &source, &store, &mut timer)
            .refresh(at(9, 0))
            .unwrap();

        assert_eq!(outcome.armed.len(), 2);
        assert!(outcome.armed.iter().all(|a| !a.is_snoozed));
        assert_eq!(timer.armed.len(), 2);
        // The all-day instance never gets a timed wake-up.
        assert!(timer.armed.iter().all(|(id, _, _)| !id.starts_with("3_")));
        // All timers requested exact wake-from-idle precision.
        assert!(timer.armed.iter().all(|(_, _, exact)| *exact));
    }

    #[test]
    fn second_refresh_with_no_change_arms_nothing() {
        let config = config();
        let source = FakeCalendar::new(window_events());
        let store = ScheduleStore::open_memory().unwrap();
        let mut timer = RecordingTimer::default();

        let first = AlarmPlanner::new(&config, &source, &store, &mut timer)
            .refresh(at(9, 0))
            .unwrap();
        assert_eq!(first.armed.len(), 2);

        let second = AlarmPlanner::new(&config, &source, &store, &mut timer)
            .refresh(at(9, 5))
            .unwrap();
        assert!(second.armed.is_empty());
        assert!(second.cancelled.is_empty());
    }

    #[test]
    fn dropped_instance_gets_cancelled() {
        let config = config();
        let store = ScheduleStore::open_memory().unwrap();
        let mut timer = RecordingTimer::default();

        let source = FakeCalendar::new(window_events());
        AlarmPlanner::new(&config, &source, &store, &mut timer)
            .refresh(at(9, 0))
            .unwrap();

        // Event 2 disappears (deleted or rescheduled).
        let source = FakeCalendar::new(vec![timed(1, at(10, 0), at(11, 0))]);
        let outcome = AlarmPlanner::new(&config, &source, &store, &mut timer)
            .refresh(at(9, 5))
            .unwrap();

        assert_eq!(outcome.cancelled.len(), 1);
        assert!(outcome.cancelled[0].starts_with("2_"));
        assert_eq!(timer.cancelled.len(), 1);
    }

    #[test]
    fn corrupt_store_rebuilds_like_fresh_install() {
        let config = config();
        let source = FakeCalendar::new(window_events());

        let fresh_store = ScheduleStore::open_memory().unwrap();
        let mut fresh_timer = RecordingTimer::default();
        let fresh = AlarmPlanner::new(&config, &source, &fresh_store, &mut fresh_timer)
            .refresh(at(9, 0))
            .unwrap();

        let store = ScheduleStore::open_memory().unwrap();
        let mut timer = RecordingTimer::default();
        AlarmPlanner::new(&config, &source, &store, &mut timer)
            .refresh(at(9, 0))
            .unwrap();
        store.poison("armed_unique_ids", "not json at all").unwrap();
        store.poison("alarm_details", "]").unwrap();

        let mut timer2 = RecordingTimer::default();
        let rebuilt = AlarmPlanner::new(&config, &source, &store, &mut timer2)
            .refresh(at(9, 0))
            .unwrap();

        let fresh_ids: Vec<&str> = fresh.armed.iter().map(|a| a.unique_id.as_str()).collect();
        let rebuilt_ids: Vec<&str> = rebuilt.armed.iter().map(|a| a.unique_id.as_str()).collect();
        assert_eq!(fresh_ids, rebuilt_ids);
    }

    #[test]
    fn snooze_survives_refresh_without_its_event() {
        let config = config();
        let store = ScheduleStore::open_memory().unwrap();
        let mut timer = RecordingTimer::default();

        let source = FakeCalendar::new(Vec::new());
        let alarm = AlarmPlanner::new(&config, &source, &store, &mut timer)
            .snooze(at(9, 0), 5, "Standup".into(), at(9, 30), 15)
            .unwrap();
        assert!(alarm.is_snoozed);
        assert_eq!(alarm.trigger_time, at(9, 15));

        // Refresh with the event absent from the calendar window.
        let outcome = AlarmPlanner::new(&config, &source, &store, &mut timer)
            .refresh(at(9, 1))
            .unwrap();
        assert!(outcome.cancelled.is_empty());

        let snapshot = store.load().unwrap();
        assert_eq!(snapshot.snoozed_alarms.len(), 1);
        assert!(snapshot.armed_unique_ids.contains(&alarm.unique_id));
    }

    #[test]
    fn expired_snooze_pruned_on_refresh() {
        let config = config();
        let store = ScheduleStore::open_memory().unwrap();
        let mut timer = RecordingTimer::default();
        let source = FakeCalendar::new(Vec::new());

        AlarmPlanner::new(&config, &source, &store, &mut timer)
            .snooze(at(9, 0), 5, "Standup".into(), at(9, 30), 15)
            .unwrap();

        AlarmPlanner::new(&config, &source, &store, &mut timer)
            .refresh(at(10, 0))
            .unwrap();

        let snapshot = store.load().unwrap();
        assert!(snapshot.snoozed_alarms.is_empty());
        assert!(snapshot.armed_unique_ids.is_empty());
    }

    #[test]
    fn cancel_removes_from_both_sets_and_cancels_timer_once() {
        let config = config();
        let store = ScheduleStore::open_memory().unwrap();
        let mut timer = RecordingTimer::default();
        let source = FakeCalendar::new(Vec::new());

        let alarm = AlarmPlanner::new(&config, &source, &store, &mut timer)
            .snooze(at(9, 0), 5, "Standup".into(), at(9, 30), 15)
            .unwrap();
        // Plant the same record in the display list as well.
        let mut snapshot = store.load().unwrap();
        snapshot.alarm_details.push(alarm.clone());
        store.save(&snapshot).unwrap();

        let removed = AlarmPlanner::new(&config, &source, &store, &mut timer)
            .cancel(&alarm.unique_id)
            .unwrap();
        assert!(removed);
        assert_eq!(timer.cancelled, vec![alarm.unique_id.clone()]);

        let snapshot = store.load().unwrap();
        assert!(snapshot.alarm_details.is_empty());
        assert!(snapshot.snoozed_alarms.is_empty());
        assert!(snapshot.armed_unique_ids.is_empty());

        // Idempotent: cancelling again removes nothing.
        let removed = AlarmPlanner::new(&config, &source, &store, &mut timer)
            .cancel(&alarm.unique_id)
            .unwrap();
        assert!(!removed);
    }

    #[test]
    fn disabled_notifications_skip_entirely() {
        let mut config = config();
        config.notifications.enabled = false;
        let source = FakeCalendar::new(window_events());
        let store = ScheduleStore::open_memory().unwrap();
        let mut timer = RecordingTimer::default();

        let outcome = AlarmPlanner::new(&config, &source, &store, &mut timer)
            .refresh(at(9, 0))
            .unwrap();
        assert_eq!(outcome.skipped, Some(SkipReason::NotificationsDisabled));
        assert!(timer.armed.is_empty());
    }

    #[test]
    fn permission_denied_is_a_soft_skip() {
        let config = config();
        let source = FakeCalendar::denied();
        let store = ScheduleStore::open_memory().unwrap();
        let mut timer = RecordingTimer::default();

        let outcome = AlarmPlanner::new(&config, &source, &store, &mut timer)
            .refresh(at(9, 0))
            .unwrap();
        assert_eq!(outcome.skipped, Some(SkipReason::PermissionDenied));
        assert!(timer.armed.is_empty());
    }

    #[test]
    fn rejected_arm_is_retried_next_refresh() {
        let config = config();
        let source = FakeCalendar::new(vec![timed(1, at(10, 0), at(11, 0))]);
        let store = ScheduleStore::open_memory().unwrap();

        let mut rejecting = RecordingTimer {
            reject_all: true,
            ..Default::default()
        };
        let outcome = AlarmPlanner::new(&config, &source, &store, &mut rejecting)
            .refresh(at(9, 0))
            .unwrap();
        assert_eq!(outcome.rejected, 1);
        assert!(outcome.armed.is_empty());
        // Not persisted as armed, so the next refresh tries again.
        assert!(store.load().unwrap().armed_unique_ids.is_empty());

        let mut timer = RecordingTimer::default();
        let outcome = AlarmPlanner::new(&config, &source, &store, &mut timer)
            .refresh(at(9, 5))
            .unwrap();
        assert_eq!(outcome.armed.len(), 1);
    }

    #[test]
    fn exact_unavailable_degrades_but_still_arms() {
        let config = config();
        let source = FakeCalendar::new(vec![timed(1, at(10, 0), at(11, 0))]);
        let store = ScheduleStore::open_memory().unwrap();
        let mut timer = RecordingTimer {
            exact_unavailable: true,
            ..Default::default()
        };

        let outcome = AlarmPlanner::new(&config, &source, &store, &mut timer)
            .refresh(at(9, 0))
            .unwrap();
        assert_eq!(outcome.armed.len(), 1);
        assert_eq!(outcome.degraded_to_inexact, 1);
        assert_eq!(timer.armed.len(), 1);
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            // Dedup holds for arbitrary windows: a second refresh over an
            // unchanged calendar never arms anything new.
            #[test]
            fn refresh_is_idempotent(
                offsets in proptest::collection::vec((1i64..1440, 1i64..180), 0..12)
            ) {
                let now = at(0, 0);
                let events: Vec<_> = offsets
                    .iter()
                    .enumerate()
                    .map(|(i, (start_min, len_min))| {
                        let start = now + Duration::minutes(*start_min);
                        timed(i as i64 + 1, start, start + Duration::minutes(*len_min))
                    })
                    .collect();
                let config = Config::default();
                let source = FakeCalendar::new(events);
                let store = ScheduleStore::open_memory().unwrap();
                let mut timer = RecordingTimer::default();

                AlarmPlanner::new(&config, &source, &store, &mut timer)
                    .refresh(now)
                    .unwrap();
                let second = AlarmPlanner::new(&config, &source, &store, &mut timer)
                    .refresh(now)
                    .unwrap();

                prop_assert!(second.armed.is_empty());
                prop_assert!(second.cancelled.is_empty());
            }
        }
    }
}
