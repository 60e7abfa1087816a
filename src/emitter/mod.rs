//! Emitter - lifecycle callbacks fired by a [`Repository`](crate::Repository).

mod record_emitter;

pub use record_emitter::{RecordEmitter, RecordEvent};
