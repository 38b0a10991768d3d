use calwake_core::{EventInstance, Trigger};
use chrono::{DateTime, Local, Utc};
use clap::Subcommand;

use super::build_engine;
use crate::host::FileCalendar;

#[derive(Subcommand)]
pub enum EventsAction {
    /// Add a calendar event
    Add {
        /// Event title
        title: String,
        /// Start time, RFC 3339 (e.g. 2026-09-01T09:00:00+02:00)
        #[arg(long)]
        start: String,
        /// End time, RFC 3339
        #[arg(long)]
        end: String,
        /// All-day event (start/end interpreted as UTC day boundaries)
        #[arg(long)]
        all_day: bool,
        /// Display color as an ARGB integer
        #[arg(long, default_value = "0")]
        color: i32,
    },
    /// List stored events
    List {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Remove all events with this id
    Remove { event_id: i64 },
}

pub fn run(action: EventsAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        EventsAction::Add {
            title,
            start,
            end,
            all_day,
            color,
        } => add(title, &start, &end, all_day, color),
        EventsAction::List { json } => list(json),
        EventsAction::Remove { event_id } => remove(event_id),
    }
}

fn parse_instant(raw: &str) -> Result<DateTime<Utc>, Box<dyn std::error::Error>> {
    Ok(DateTime::parse_from_rfc3339(raw)?.with_timezone(&Utc))
}

fn add(
    title: String,
    start: &str,
    end: &str,
    all_day: bool,
    color: i32,
) -> Result<(), Box<dyn std::error::Error>> {
    let start = parse_instant(start)?;
    let end = parse_instant(end)?;
    if end <= start {
        return Err("end must be after start".into());
    }

    let calendar = FileCalendar::open()?;
    let mut events = calendar.load_all()?;
    let event_id = events.iter().map(|e| e.event_id).max().unwrap_or(0) + 1;
    events.push(EventInstance {
        event_id,
        title,
        start,
        end,
        color,
        all_day,
    });
    calendar.save_all(&events)?;
    println!("added event {event_id}");

    notify_calendar_changed()
}

fn list(json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let events = FileCalendar::open()?.load_all()?;
    if json {
        println!("{}", serde_json::to_string_pretty(&events)?);
        return Ok(());
    }
    if events.is_empty() {
        println!("no events");
        return Ok(());
    }
    for event in events {
        let when = if event.all_day {
            format!("{} (all day)", event.start.format("%Y-%m-%d"))
        } else {
            format!(
                "{} - {}",
                event.start.with_timezone(&Local).format("%Y-%m-%d %H:%M"),
                event.end.with_timezone(&Local).format("%H:%M")
            )
        };
        println!("{}  {}  {}", event.event_id, when, event.title);
    }
    Ok(())
}

fn remove(event_id: i64) -> Result<(), Box<dyn std::error::Error>> {
    let calendar = FileCalendar::open()?;
    let mut events = calendar.load_all()?;
    let before = events.len();
    events.retain(|e| e.event_id != event_id);
    if events.len() == before {
        return Err(format!("no event with id {event_id}").into());
    }
    calendar.save_all(&events)?;
    println!("removed event {event_id}");

    notify_calendar_changed()
}

/// Calendar content changed under the engine; reconcile immediately, the
/// way a content-observer job would.
fn notify_calendar_changed() -> Result<(), Box<dyn std::error::Error>> {
    let mut engine = build_engine()?;
    let summary = engine.dispatch(Trigger::CalendarChanged, Utc::now());
    for err in &summary.errors {
        eprintln!("warning: {err}");
    }
    Ok(())
}
