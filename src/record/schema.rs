//! Schema - per-entity-type description of a record.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use super::Record;

/// Describes one entity type: where it is stored, which field identifies it
/// and which virtual fields it computes.
///
/// Usually derived:
///
/// ```ignore
/// #[derive(Schema)]
/// #[schema(table = "users", primary_key = "id", computed = user_fields)]
/// pub struct User;
/// ```
pub trait Schema: Sized + 'static {
    /// Table (or collection) name handed to the data-access object.
    const TABLE: &'static str;

    /// Field acting as the unique identifier.
    const PRIMARY_KEY: &'static str;

    /// Virtual fields resolved by [`Record::get`] before plain attributes.
    fn computed_fields() -> ComputedFields<Self> {
        ComputedFields::new()
    }
}

type ComputeFn<S> = Arc<dyn Fn(&Record<S>) -> Value + Send + Sync>;

/// Registries of computed fields.
///
/// `always` fields run on every read; `memoized` fields run once per record
/// and are cached until the record is dropped. A name lives in at most one
/// registry; registering it again moves it.
pub struct ComputedFields<S> {
    always: HashMap<String, ComputeFn<S>>,
    memoized: HashMap<String, ComputeFn<S>>,
}

impl<S> Default for ComputedFields<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> ComputedFields<S> {
    pub fn new() -> Self {
        ComputedFields {
            always: HashMap::new(),
            memoized: HashMap::new(),
        }
    }

    /// Register a field recomputed on every read.
    pub fn always<F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&Record<S>) -> Value + Send + Sync + 'static,
    {
        let name = name.into();
        self.memoized.remove(&name);
        self.always.insert(name, Arc::new(f));
        self
    }

    /// Register a field computed on first read and cached afterwards.
    pub fn memoized<F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&Record<S>) -> Value + Send + Sync + 'static,
    {
        let name = name.into();
        self.always.remove(&name);
        self.memoized.insert(name, Arc::new(f));
        self
    }

    pub fn is_computed(&self, name: &str) -> bool {
        self.always.contains_key(name) || self.memoized.contains_key(name)
    }

    pub fn is_empty(&self) -> bool {
        self.always.is_empty() && self.memoized.is_empty()
    }

    pub(crate) fn always_fn(&self, name: &str) -> Option<&ComputeFn<S>> {
        self.always.get(name)
    }

    pub(crate) fn memoized_fn(&self, name: &str) -> Option<&ComputeFn<S>> {
        self.memoized.get(name)
    }
}
