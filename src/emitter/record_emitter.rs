use std::fmt;
use std::sync::Mutex;

use event_emitter_rs::EventEmitter;
use tracing::warn;

use crate::repository::{RepositoryError, RepositoryResult};

/// What happened to a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordEvent {
    Inserted,
    Updated,
}

impl RecordEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordEvent::Inserted => "inserted",
            RecordEvent::Updated => "updated",
        }
    }
}

impl fmt::Display for RecordEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Event emitter scoped to one table.
///
/// Events are named `"<table>.<event>"` (`"users.inserted"`) and carry the
/// record's JSON projection. Listeners run asynchronously on the emitter's
/// threads.
///
/// # Example
///
/// ```ignore
/// use modelkit::emitter::{RecordEmitter, RecordEvent};
///
/// let emitter = RecordEmitter::new("users");
/// emitter.on(RecordEvent::Inserted, |json| println!("new user: {}", json))?;
/// emitter.emit(RecordEvent::Inserted, r#"{"id":1}"#);
/// ```
pub struct RecordEmitter {
    table: &'static str,
    event_emitter: Mutex<EventEmitter>,
}

impl RecordEmitter {
    pub fn new(table: &'static str) -> Self {
        Self {
            table,
            event_emitter: Mutex::new(EventEmitter::new()),
        }
    }

    pub fn event_name(&self, event: RecordEvent) -> String {
        format!("{}.{}", self.table, event)
    }

    /// Register a listener. Returns the listener id.
    pub fn on<F>(&self, event: RecordEvent, listener: F) -> RepositoryResult<String>
    where
        F: Fn(String) + Send + Sync + 'static,
    {
        let name = self.event_name(event);
        let mut event_emitter = self
            .event_emitter
            .lock()
            .map_err(|_| RepositoryError::LockPoisoned("emitter"))?;
        Ok(event_emitter.on(&name, listener))
    }

    /// Fire an event. A poisoned emitter drops the event with a warning.
    pub fn emit(&self, event: RecordEvent, payload: impl Into<String>) {
        let name = self.event_name(event);
        match self.event_emitter.lock() {
            Ok(mut event_emitter) => {
                event_emitter.emit(&name, payload.into());
            }
            Err(_) => warn!(
                table = self.table,
                event = %name,
                "emitter lock poisoned; event dropped"
            ),
        }
    }
}

impl fmt::Debug for RecordEmitter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordEmitter")
            .field("table", &self.table)
            .finish_non_exhaustive()
    }
}
