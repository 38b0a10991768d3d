pub mod alarms;
pub mod config;
pub mod events;
pub mod lifecycle;
pub mod refresh;

use calwake_core::{Config, Engine, ScheduleStore};

use crate::host::{DesktopNotifier, FileCalendar, TimerTable};

pub type HostEngine = Engine<FileCalendar, TimerTable, DesktopNotifier>;

/// Wire the core engine to the desktop adapters.
pub fn build_engine() -> Result<HostEngine, Box<dyn std::error::Error>> {
    let config = Config::load_or_default();
    let store = ScheduleStore::open()?;
    let source = FileCalendar::open()?;
    let timer = TimerTable::open()?;
    Ok(Engine::new(
        config,
        store,
        source,
        timer,
        DesktopNotifier::default(),
    ))
}
