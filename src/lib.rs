//! modelkit - Active-Record style models.
//!
//! - [`Record`]: a dirty-tracked property bag with computed fields.
//! - [`Repository`]: loads and saves records of one [`Schema`] through a [`Dao`].
//! - [`Collection`]: an ordered key/value container with a functional
//!   operation library.
//!
//! [`InMemoryDao`] is a ready-made DAO for tests and development.

extern crate self as modelkit;

pub mod collection;
pub mod dao;
#[cfg(feature = "emitter")]
pub mod emitter;
pub mod record;
mod repository;
pub mod value;

pub use collection::{Collection, DataGet, Key, Retriever};
pub use dao::{
    Appends, Condition, ConfigError, Dao, DaoError, DaoResult, Direction, InMemoryDao,
    TableConfig,
};
pub use record::{ComputedFields, Origin, Record, Schema};
pub use repository::{RecordsExt, Repository, RepositoryError, RepositoryResult};

#[cfg(feature = "emitter")]
pub use emitter::{RecordEmitter, RecordEvent};

// Derive macro shares the trait's name; they live in different namespaces.
pub use modelkit_macros::Schema;

// Re-export the EventEmitter from the event_emitter_rs crate
#[cfg(feature = "emitter")]
pub use event_emitter_rs::EventEmitter;
