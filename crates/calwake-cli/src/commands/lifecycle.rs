//! Lifecycle triggers: due-timer delivery and boot simulation.

use std::sync::{Arc, Mutex};

use calwake_core::ports::LIVE_REFRESH_TIMER_ID;
use calwake_core::{dispatch_detached, Trigger};
use chrono::Utc;

use super::build_engine;
use crate::host::TimerTable;

/// Deliver every due timer from the table as an engine trigger, the way the
/// OS would deliver alarm callbacks after an idle period.
///
/// Dispatches run on a blocking worker; this (the trigger mechanism) awaits
/// each completion handle before moving on.
pub fn tick() -> Result<(), Box<dyn std::error::Error>> {
    let table = TimerTable::open()?;
    let due = table.due(Utc::now())?;
    if due.is_empty() {
        println!("no timers due");
        return Ok(());
    }

    let engine = Arc::new(Mutex::new(build_engine()?));
    let runtime = tokio::runtime::Runtime::new()?;
    for record in due {
        let trigger = if record.id == LIVE_REFRESH_TIMER_ID {
            Trigger::LiveTimerFired
        } else {
            Trigger::AlarmFired {
                unique_id: record.id.clone(),
            }
        };
        let summary = runtime.block_on(dispatch_detached(Arc::clone(&engine), trigger))?;
        println!("fired {} (was due {})", record.id, record.at);
        for err in &summary.errors {
            eprintln!("warning: {err}");
        }
    }
    Ok(())
}

/// Simulate a reboot: the timer table is gone, the schedule store is not,
/// and the boot trigger re-arms everything from persisted state plus fresh
/// calendar data.
pub fn boot() -> Result<(), Box<dyn std::error::Error>> {
    TimerTable::open()?.wipe()?;
    let mut engine = build_engine()?;
    let summary = engine.dispatch(Trigger::BootCompleted, Utc::now());
    match &summary.alarms {
        Some(alarms) => println!("re-armed {} alarms after boot", alarms.armed.len()),
        None => println!("boot refresh skipped"),
    }
    if let Some(live) = &summary.live {
        println!("live chain armed, next wake {}", live.next_wake);
    }
    for err in &summary.errors {
        eprintln!("warning: {err}");
    }
    Ok(())
}
