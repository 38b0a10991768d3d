use calwake_core::{ScheduleStore, Trigger};
use chrono::{Duration, Local, Utc};
use clap::Subcommand;

use super::build_engine;

#[derive(Subcommand)]
pub enum AlarmsAction {
    /// List upcoming alarms
    List {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Snooze an event's alert
    Snooze {
        /// Event id to snooze
        event_id: i64,
        /// Minutes until the snooze fires (0 = configured default)
        #[arg(long, default_value = "0")]
        minutes: u32,
        /// Title override, for events no longer in the alarm list
        #[arg(long)]
        title: Option<String>,
    },
    /// Dismiss an alarm by unique id
    Dismiss { unique_id: String },
}

pub fn run(action: AlarmsAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        AlarmsAction::List { json } => list(json),
        AlarmsAction::Snooze {
            event_id,
            minutes,
            title,
        } => snooze(event_id, minutes, title),
        AlarmsAction::Dismiss { unique_id } => dismiss(unique_id),
    }
}

fn list(json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let store = ScheduleStore::open()?;
    let alarms = store.upcoming_alarms(Utc::now())?;
    if json {
        println!("{}", serde_json::to_string_pretty(&alarms)?);
        return Ok(());
    }
    if alarms.is_empty() {
        println!("no upcoming alarms");
        return Ok(());
    }
    for alarm in alarms {
        let flag = if alarm.is_snoozed { " (snoozed)" } else { "" };
        println!(
            "{}  {}  {}{}",
            alarm.trigger_time.with_timezone(&Local).format("%Y-%m-%d %H:%M"),
            alarm.unique_id,
            alarm.title,
            flag
        );
    }
    Ok(())
}

fn snooze(event_id: i64, minutes: u32, title: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    let now = Utc::now();
    // Prefer the persisted record for title and end time; the override
    // flags cover events that already fell out of the list.
    let record = ScheduleStore::open()?
        .upcoming_alarms(now)?
        .into_iter()
        .find(|a| a.event_id == event_id);
    let (title, end_time) = match (&record, title) {
        (_, Some(title)) => (title, now + Duration::minutes(i64::from(minutes.max(1)))),
        (Some(record), None) => (record.title.clone(), record.end_time),
        (None, None) => return Err(format!("no upcoming alarm for event {event_id}; pass --title").into()),
    };

    let mut engine = build_engine()?;
    let summary = engine.dispatch(
        Trigger::UserSnoozed {
            event_id,
            title,
            end_time,
            minutes,
        },
        now,
    );
    match summary.snoozed {
        Some(alarm) => {
            println!(
                "snoozed '{}' until {}",
                alarm.title,
                alarm.trigger_time.with_timezone(&Local).format("%H:%M")
            );
            Ok(())
        }
        None => Err(summary
            .errors
            .first()
            .cloned()
            .unwrap_or_else(|| "snooze failed".to_string())
            .into()),
    }
}

fn dismiss(unique_id: String) -> Result<(), Box<dyn std::error::Error>> {
    let mut engine = build_engine()?;
    let summary = engine.dispatch(Trigger::UserDismissed { unique_id }, Utc::now());
    match summary.dismissed {
        Some(id) => {
            println!("dismissed {id}");
            Ok(())
        }
        None => Err(summary
            .errors
            .first()
            .cloned()
            .unwrap_or_else(|| "dismiss failed".to_string())
            .into()),
    }
}
