//! RecordingDao - wraps an InMemoryDao and records every call made to it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use modelkit::{Appends, Condition, Dao, DaoResult, InMemoryDao};
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    FetchOne(Vec<Condition>),
    FetchMany(Vec<Condition>),
    Insert(Map<String, Value>),
    LastInsertId,
    UpdateWhere(Vec<Condition>, Map<String, Value>),
}

/// Records calls; can be told to refuse writes.
///
/// Does not override `insert_returning_id`, so saves go through the default
/// insert-then-last-id sequence.
#[derive(Clone)]
pub struct RecordingDao {
    inner: InMemoryDao,
    calls: Arc<Mutex<Vec<Call>>>,
    refuse_writes: Arc<AtomicBool>,
}

impl RecordingDao {
    pub fn new(inner: InMemoryDao) -> Self {
        Self {
            inner,
            calls: Arc::new(Mutex::new(Vec::new())),
            refuse_writes: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn inner(&self) -> &InMemoryDao {
        &self.inner
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.calls.lock().unwrap().clear();
    }

    pub fn refuse_writes(&self, refuse: bool) {
        self.refuse_writes.store(refuse, Ordering::SeqCst);
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn refusing(&self) -> bool {
        self.refuse_writes.load(Ordering::SeqCst)
    }
}

impl Dao for RecordingDao {
    fn fetch_one(
        &self,
        conditions: &[Condition],
        fields: &[String],
        appends: Option<&Appends>,
    ) -> DaoResult<Option<Map<String, Value>>> {
        self.record(Call::FetchOne(conditions.to_vec()));
        self.inner.fetch_one(conditions, fields, appends)
    }

    fn fetch_many(
        &self,
        conditions: &[Condition],
        fields: &[String],
        appends: Option<&Appends>,
    ) -> DaoResult<Vec<Map<String, Value>>> {
        self.record(Call::FetchMany(conditions.to_vec()));
        self.inner.fetch_many(conditions, fields, appends)
    }

    fn all_field_names(&self) -> Vec<String> {
        self.inner.all_field_names()
    }

    fn insert(&self, attributes: &Map<String, Value>) -> DaoResult<bool> {
        self.record(Call::Insert(attributes.clone()));
        if self.refusing() {
            return Ok(false);
        }
        self.inner.insert(attributes)
    }

    fn last_insert_id(&self) -> DaoResult<Value> {
        self.record(Call::LastInsertId);
        self.inner.last_insert_id()
    }

    fn update_where(
        &self,
        conditions: &[Condition],
        attributes: &Map<String, Value>,
    ) -> DaoResult<bool> {
        self.record(Call::UpdateWhere(conditions.to_vec(), attributes.clone()));
        if self.refusing() {
            return Ok(false);
        }
        self.inner.update_where(conditions, attributes)
    }
}
