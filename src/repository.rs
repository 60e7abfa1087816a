//! Repository - per-schema gateway that loads and saves [`Record`]s through a
//! [`Dao`].
//!
//! ## Example
//!
//! ```ignore
//! use modelkit::{InMemoryDao, Repository};
//!
//! let users = Repository::<User, _>::new(InMemoryDao::for_schema::<User>());
//!
//! let mut ann = users.create_record(Default::default()).with("name", "ann");
//! users.save(&mut ann)?;            // insert, fills `id`
//! ann.set("name", "anna");
//! users.save(&mut ann)?;            // update of `name` only
//!
//! let loaded = users.load(ann.primary_key())?;
//! ```

use std::marker::PhantomData;

use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::collection::Collection;
use crate::dao::{Appends, Condition, Dao, DaoError};
use crate::record::{Record, Schema};

#[cfg(feature = "emitter")]
use crate::emitter::{RecordEmitter, RecordEvent};

pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Errors raised by a repository.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error(transparent)]
    Dao(#[from] DaoError),

    #[error("repository lock poisoned during {0}")]
    LockPoisoned(&'static str),
}

/// Loads and saves records of schema `S` through `D`.
pub struct Repository<S, D> {
    dao: D,
    #[cfg(feature = "emitter")]
    emitter: RecordEmitter,
    _schema: PhantomData<fn() -> S>,
}

impl<S: Schema, D: Dao> Repository<S, D> {
    pub fn new(dao: D) -> Self {
        Self {
            dao,
            #[cfg(feature = "emitter")]
            emitter: RecordEmitter::new(S::TABLE),
            _schema: PhantomData,
        }
    }

    pub fn dao(&self) -> &D {
        &self.dao
    }

    pub fn into_dao(self) -> D {
        self.dao
    }

    /// A never-stored record of this schema.
    pub fn create_record(&self, attributes: Map<String, Value>) -> Record<S> {
        Record::from_attributes(attributes)
    }

    /// Load one record by primary key. `None` when no row matches.
    pub fn load(&self, primary_id: impl Into<Value>) -> RepositoryResult<Option<Record<S>>> {
        let primary_id = primary_id.into();
        debug!(table = S::TABLE, primary_key = %primary_id, "loading record");

        let conditions = [Condition::eq(S::PRIMARY_KEY, primary_id)];
        let row = self
            .dao
            .fetch_one(&conditions, &self.dao.all_field_names(), None)?;
        Ok(row.map(Record::from_store))
    }

    /// Load every record whose primary key is in `ids`, in the order the DAO
    /// returns them. Missing keys are skipped.
    pub fn load_many<I, V>(&self, ids: I) -> RepositoryResult<Vec<Record<S>>>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let ids: Vec<Value> = ids.into_iter().map(Into::into).collect();
        debug!(table = S::TABLE, count = ids.len(), "loading records by key");

        let conditions = [self.dao.build_in_condition(S::PRIMARY_KEY, &ids)];
        let rows = self
            .dao
            .fetch_many(&conditions, &self.dao.all_field_names(), None)?;
        Ok(rows.into_iter().map(Record::from_store).collect())
    }

    /// First record matching `conditions`.
    pub fn load_where(
        &self,
        conditions: &[Condition],
        appends: Option<&Appends>,
    ) -> RepositoryResult<Option<Record<S>>> {
        debug!(table = S::TABLE, conditions = conditions.len(), "loading record");
        let row = self
            .dao
            .fetch_one(conditions, &self.dao.all_field_names(), appends)?;
        Ok(row.map(Record::from_store))
    }

    /// Every record matching `conditions`.
    pub fn load_many_where(
        &self,
        conditions: &[Condition],
        appends: Option<&Appends>,
    ) -> RepositoryResult<Vec<Record<S>>> {
        debug!(table = S::TABLE, conditions = conditions.len(), "loading records");
        let rows = self
            .dao
            .fetch_many(conditions, &self.dao.all_field_names(), appends)?;
        Ok(rows.into_iter().map(Record::from_store).collect())
    }

    /// [`Repository::load_many_where`] as a collection keyed `0..n`.
    pub fn load_collection_where(
        &self,
        conditions: &[Condition],
        appends: Option<&Appends>,
    ) -> RepositoryResult<Collection<Record<S>>> {
        Ok(Collection::from(self.load_many_where(conditions, appends)?))
    }

    /// Persist a record.
    ///
    /// New records are inserted in full and become stored records, with the
    /// primary key filled from the DAO when it was unset. Stored records send
    /// only their dirty fields; with nothing dirty the DAO is not called.
    ///
    /// `Ok(false)` means the DAO refused the write; the record is unchanged.
    pub fn save(&self, record: &mut Record<S>) -> RepositoryResult<bool> {
        if record.is_persisted() {
            self.update(record)
        } else {
            self.insert(record)
        }
    }

    fn insert(&self, record: &mut Record<S>) -> RepositoryResult<bool> {
        debug!(table = S::TABLE, fields = record.attributes().len(), "inserting record");

        if record.has(S::PRIMARY_KEY) {
            if !self.dao.insert(record.attributes())? {
                warn!(table = S::TABLE, "insert refused by dao");
                return Ok(false);
            }
        } else {
            let Some(generated) = self.dao.insert_returning_id(record.attributes())? else {
                warn!(table = S::TABLE, "insert refused by dao");
                return Ok(false);
            };
            record.set(S::PRIMARY_KEY, generated);
        }
        record.mark_persisted();

        #[cfg(feature = "emitter")]
        self.emit(RecordEvent::Inserted, record);

        Ok(true)
    }

    fn update(&self, record: &mut Record<S>) -> RepositoryResult<bool> {
        let dirty = record.dirty_attributes();
        if dirty.is_empty() {
            return Ok(true);
        }

        let primary_id = record.persisted_value(S::PRIMARY_KEY);
        debug!(
            table = S::TABLE,
            primary_key = %primary_id,
            dirty = ?dirty.keys().collect::<Vec<_>>(),
            "updating record"
        );

        let conditions = [Condition::eq(S::PRIMARY_KEY, primary_id.clone())];
        if !self.dao.update_where(&conditions, &dirty)? {
            warn!(table = S::TABLE, primary_key = %primary_id, "update refused by dao");
            return Ok(false);
        }
        record.mark_persisted();

        #[cfg(feature = "emitter")]
        self.emit(RecordEvent::Updated, record);

        Ok(true)
    }
}

#[cfg(feature = "emitter")]
impl<S: Schema, D: Dao> Repository<S, D> {
    /// Register a listener for `"<table>.inserted"` or `"<table>.updated"`.
    /// Listeners receive the record's JSON projection after a successful
    /// write and run asynchronously.
    pub fn on<F>(&self, event: RecordEvent, listener: F) -> RepositoryResult<String>
    where
        F: Fn(String) + Send + Sync + 'static,
    {
        self.emitter.on(event, listener)
    }

    fn emit(&self, event: RecordEvent, record: &Record<S>) {
        match record.to_json() {
            Ok(json) => self.emitter.emit(event, json),
            Err(e) => warn!(table = S::TABLE, error = %e, "could not encode record for {}", event),
        }
    }
}

/// Typed repository access on any DAO.
pub trait RecordsExt: Dao + Sized {
    /// A repository of `S` borrowing this DAO.
    fn records<S: Schema>(&self) -> Repository<S, &Self> {
        Repository::new(self)
    }
}

impl<D: Dao> RecordsExt for D {}
