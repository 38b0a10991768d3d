use calwake_core::Trigger;
use chrono::Utc;

use super::build_engine;

/// Run the planners now, as a periodic or manual refresh would.
pub fn run(live_only: bool, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let mut engine = build_engine()?;
    let trigger = if live_only {
        Trigger::LiveTimerFired
    } else {
        Trigger::CalendarChanged
    };
    let summary = engine.dispatch(trigger, Utc::now());

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }
    if let Some(alarms) = &summary.alarms {
        match alarms.skipped {
            Some(reason) => println!("alarm refresh skipped: {reason:?}"),
            None => println!(
                "alarms: {} armed, {} cancelled",
                alarms.armed.len(),
                alarms.cancelled.len()
            ),
        }
    }
    if let Some(live) = &summary.live {
        match &live.display {
            Some(event) => println!("live: '{}' until next wake {}", event.title, live.next_wake),
            None => println!("live: nothing active, next wake {}", live.next_wake),
        }
    }
    for err in &summary.errors {
        eprintln!("warning: {err}");
    }
    Ok(())
}
