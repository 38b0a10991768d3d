//! # Calwake Core Library
//!
//! This library provides the core business logic for Calwake, a calendar
//! alarm and live-notification engine. It decides which upcoming event
//! instances need a wake-up timer, deduplicates against timers already
//! armed, computes which event is currently active, and persists enough
//! state to survive process death and device reboot without losing or
//! double-firing alarms.
//!
//! ## Architecture
//!
//! - **Planners**: Run-to-completion refresh algorithms invoked by external
//!   triggers (timer fire, boot, user action) -- no persistent worker thread
//! - **Storage**: SQLite-based schedule snapshot and TOML-based configuration
//! - **Ports**: Traits abstracting the host's timer and notification
//!   facilities; the host supplies implementations
//!
//! ## Key Components
//!
//! - [`AlarmPlanner`]: Arms one exact timer per upcoming event instance
//! - [`LiveRefreshPlanner`]: Maintains the single "current event" display
//!   and its chained refresh timer
//! - [`Engine`]: Routes host triggers to the planners
//! - [`ScheduleStore`]: Durable record of armed and snoozed alarms

pub mod alarm;
pub mod classify;
pub mod engine;
pub mod error;
pub mod event;
pub mod planner;
pub mod ports;
pub mod storage;

pub use alarm::ScheduledAlarm;
pub use engine::{dispatch_detached, DispatchSummary, Engine, Trigger};
pub use error::{CoreError, EventSourceError, StoreError, TimerPortError};
pub use event::{EventInstance, EventSource};
pub use planner::{AlarmPlanner, AlarmRefreshOutcome, LiveRefreshOutcome, LiveRefreshPlanner};
pub use ports::{ArmedPrecision, NotificationKind, NotificationPayload, NotificationPort, TimerPort};
pub use storage::{Config, ScheduleSnapshot, ScheduleStore};
