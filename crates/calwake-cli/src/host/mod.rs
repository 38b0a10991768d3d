//! Desktop adapters behind the core's external interfaces: a JSON-file
//! calendar, a durable one-shot timer table, and desktop notifications.

mod calendar;
mod notify;
mod timer_table;

pub use calendar::FileCalendar;
pub use notify::DesktopNotifier;
pub use timer_table::{TimerRecord, TimerTable};
