//! Records - one row-equivalent entity with dirty tracking and computed fields.
//!
//! A [`Record`] is a property bag over `serde_json::Value` attributes. Reads go
//! through [`Record::get`], writes through [`Record::set`]; every other
//! accessor is a thin wrapper over that pair.
//!
//! ## Example
//!
//! ```ignore
//! use modelkit::{ComputedFields, Record, Schema};
//! use serde_json::json;
//!
//! #[derive(Schema)]
//! #[schema(table = "users", computed = user_fields)]
//! struct User;
//!
//! fn user_fields() -> ComputedFields<User> {
//!     ComputedFields::new().always("greeting", |r| json!(format!("hi {}", r.get("name"))))
//! }
//!
//! let mut user = Record::<User>::new();
//! user.set("name", "ann");
//! assert!(user.is_dirty("name"));
//! ```

mod schema;

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use serde::de::{Deserialize, DeserializeOwned, Deserializer};
use serde::ser::{Serialize, Serializer};
use serde_json::{Map, Value};
use tracing::trace;

use crate::collection::DataGet;
use crate::dao::Dao;
use crate::repository::{Repository, RepositoryResult};
use crate::value;

pub use schema::{ComputedFields, Schema};

/// Where a record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// Built by application code; never stored.
    New,
    /// Loaded from (or written to) the data-access object.
    Store,
}

/// One entity instance of schema `S`.
pub struct Record<S> {
    attributes: Map<String, Value>,
    dirty: HashSet<String>,
    /// Last values known to be persisted; `None` for new records.
    baseline: Option<Map<String, Value>>,
    cache: RefCell<HashMap<String, Value>>,
    computed: Arc<ComputedFields<S>>,
    origin: Origin,
}

impl<S: Schema> Default for Record<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Schema> Record<S> {
    /// Create an empty, never-stored record.
    pub fn new() -> Self {
        Self::from_attributes(Map::new())
    }

    /// Create a never-stored record with initial attributes.
    ///
    /// Initial attributes are not dirty; they are written in full on insert.
    pub fn from_attributes(attributes: Map<String, Value>) -> Self {
        Record {
            attributes,
            dirty: HashSet::new(),
            baseline: None,
            cache: RefCell::new(HashMap::new()),
            computed: Arc::new(S::computed_fields()),
            origin: Origin::New,
        }
    }

    /// Create a record for attributes read back from storage.
    pub fn from_store(attributes: Map<String, Value>) -> Self {
        let mut record = Self::from_attributes(attributes);
        record.baseline = Some(record.attributes.clone());
        record.origin = Origin::Store;
        record
    }

    /// Resolve a field: always-recompute computed field, then memoized
    /// computed field, then plain attribute, then `null`.
    pub fn get(&self, name: &str) -> Value {
        if let Some(compute) = self.computed.always_fn(name) {
            return compute(self);
        }

        if let Some(compute) = self.computed.memoized_fn(name) {
            if let Some(cached) = self.cache.borrow().get(name) {
                return cached.clone();
            }
            let value = compute(self);
            trace!(table = S::TABLE, field = name, "memoized computed field");
            return self
                .cache
                .borrow_mut()
                .entry(name.to_string())
                .or_insert(value)
                .clone();
        }

        self.attributes.get(name).cloned().unwrap_or(Value::Null)
    }

    /// Write a field. Writing the value already stored (a missing attribute
    /// counts as `null`) changes nothing.
    ///
    /// For stored records a field stops being dirty when it is set back to
    /// its persisted value.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        let name = name.into();
        let value = value.into();

        let current = self.attributes.get(&name).unwrap_or(&Value::Null);
        if *current == value {
            return;
        }

        let persisted = self
            .baseline
            .as_ref()
            .map(|baseline| baseline.get(&name).unwrap_or(&Value::Null) == &value)
            .unwrap_or(false);

        self.attributes.insert(name.clone(), value);
        if persisted {
            self.dirty.remove(&name);
        } else {
            self.dirty.insert(name);
        }
    }

    /// Builder form of [`Record::set`].
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(name, value);
        self
    }

    /// Typed form of [`Record::get`]; `None` when the value does not
    /// deserialize into `T`.
    pub fn get_as<T: DeserializeOwned>(&self, name: &str) -> Option<T> {
        serde_json::from_value(self.get(name)).ok()
    }

    /// Whether a plain attribute is present and not `null`.
    pub fn has(&self, name: &str) -> bool {
        self.attributes
            .get(name)
            .map(|value| !value.is_null())
            .unwrap_or(false)
    }

    /// Live view of all attributes.
    pub fn attributes(&self) -> &Map<String, Value> {
        &self.attributes
    }

    pub fn into_attributes(self) -> Map<String, Value> {
        self.attributes
    }

    /// Snapshot of the dirty fields with their current values, in attribute
    /// order.
    pub fn dirty_attributes(&self) -> Map<String, Value> {
        self.attributes
            .iter()
            .filter(|(name, _)| self.dirty.contains(*name))
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect()
    }

    pub fn is_dirty(&self, name: &str) -> bool {
        self.dirty.contains(name)
    }

    pub fn is_persisted(&self) -> bool {
        self.origin == Origin::Store
    }

    pub fn origin(&self) -> Origin {
        self.origin
    }

    pub fn primary_key_name(&self) -> &'static str {
        S::PRIMARY_KEY
    }

    pub fn primary_key(&self) -> Value {
        self.get(S::PRIMARY_KEY)
    }

    /// Persist through the owning repository.
    pub fn save<D: Dao>(&mut self, repository: &Repository<S, D>) -> RepositoryResult<bool> {
        repository.save(self)
    }

    /// JSON projection of the attributes; empty records project to `{}`.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.attributes)
    }

    /// Serialized form: the attributes only.
    pub fn to_serialized(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(&self.attributes)
    }

    /// Restore a serialized record. The result always counts as persisted.
    pub fn from_serialized(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes).map(Self::from_store)
    }

    /// Value of a field as storage last saw it; the current value for records
    /// never stored.
    pub(crate) fn persisted_value(&self, name: &str) -> Value {
        self.baseline
            .as_ref()
            .unwrap_or(&self.attributes)
            .get(name)
            .cloned()
            .unwrap_or(Value::Null)
    }

    /// Everything now held is what storage holds.
    pub(crate) fn mark_persisted(&mut self) {
        self.baseline = Some(self.attributes.clone());
        self.dirty.clear();
        self.origin = Origin::Store;
    }
}

impl<S: Schema> Clone for Record<S> {
    fn clone(&self) -> Self {
        Record {
            attributes: self.attributes.clone(),
            dirty: self.dirty.clone(),
            baseline: self.baseline.clone(),
            cache: RefCell::new(self.cache.borrow().clone()),
            computed: Arc::clone(&self.computed),
            origin: self.origin,
        }
    }
}

impl<S: Schema> fmt::Debug for Record<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Record")
            .field("table", &S::TABLE)
            .field("attributes", &self.attributes)
            .field("dirty", &self.dirty)
            .field("origin", &self.origin)
            .finish()
    }
}

impl<S: Schema> Serialize for Record<S> {
    fn serialize<Ser: Serializer>(&self, serializer: Ser) -> Result<Ser::Ok, Ser::Error> {
        self.attributes.serialize(serializer)
    }
}

impl<'de, S: Schema> Deserialize<'de> for Record<S> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Map::<String, Value>::deserialize(deserializer).map(Self::from_store)
    }
}

impl<S: Schema> DataGet for Record<S> {
    fn to_value(&self) -> Value {
        Value::Object(self.attributes.clone())
    }

    /// The first path segment resolves through [`Record::get`], so computed
    /// fields are reachable by path.
    fn data_get(&self, path: &str) -> Value {
        if path.is_empty() {
            return self.to_value();
        }
        match path.split_once('.') {
            Some((head, rest)) => value::data_get(&self.get(head), rest),
            None => self.get(path),
        }
    }
}
