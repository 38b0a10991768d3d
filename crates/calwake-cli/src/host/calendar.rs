//! JSON-file calendar backing the core's `EventSource`.

use std::io::ErrorKind;
use std::path::PathBuf;

use calwake_core::error::EventSourceError;
use calwake_core::{storage, EventInstance, EventSource};
use chrono::{DateTime, Utc};

/// Event instances stored as a JSON array at `~/.config/calwake/events.json`.
pub struct FileCalendar {
    path: PathBuf,
}

impl FileCalendar {
    /// # Errors
    /// Returns an error if the data directory cannot be determined.
    pub fn open() -> Result<Self, Box<dyn std::error::Error>> {
        Ok(Self {
            path: storage::data_dir()?.join("events.json"),
        })
    }

    pub fn with_path(path: PathBuf) -> Self {
        Self { path }
    }

    /// All stored events, sorted by start. A missing file is an empty
    /// calendar; an unreadable one maps to the permission error the core
    /// knows how to fail soft on.
    pub fn load_all(&self) -> Result<Vec<EventInstance>, EventSourceError> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) if e.kind() == ErrorKind::PermissionDenied => {
                return Err(EventSourceError::PermissionDenied)
            }
            Err(e) => return Err(EventSourceError::Unavailable(e.to_string())),
        };
        let mut events: Vec<EventInstance> = serde_json::from_str(&content)
            .map_err(|e| EventSourceError::Unavailable(format!("events.json: {e}")))?;
        events.sort_by_key(|e| e.start);
        Ok(events)
    }

    /// Replace the stored events.
    ///
    /// # Errors
    /// Returns an error if serialization or the write fails.
    pub fn save_all(&self, events: &[EventInstance]) -> Result<(), Box<dyn std::error::Error>> {
        let content = serde_json::to_string_pretty(events)?;
        std::fs::write(&self.path, content)?;
        Ok(())
    }
}

impl EventSource for FileCalendar {
    fn query(
        &self,
        range_start: DateTime<Utc>,
        range_end: DateTime<Utc>,
    ) -> Result<Vec<EventInstance>, EventSourceError> {
        Ok(self
            .load_all()?
            .into_iter()
            .filter(|e| e.start < range_end && e.end >= range_start)
            .collect())
    }
}
