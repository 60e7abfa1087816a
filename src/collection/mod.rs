//! Collection - an ordered key/value container with a functional operation library.
//!
//! Entries keep insertion order and unique [`Key`]s. Every transformation
//! (`map`, `filter`, `sort_by`, `group_by`, ...) returns a new collection and
//! leaves the receiver untouched; only `push`, `pop`, `prepend`, `forget` and
//! the array-access pair `put`/`offset_unset` modify it in place.
//!
//! ## Example
//!
//! ```ignore
//! use modelkit::{Collection, Retriever};
//! use serde_json::json;
//!
//! let scores = Collection::from_value(json!({"ann": 3, "bob": 1, "cid": 2}));
//! let ranked = scores.sort_by(Retriever::identity(), true);
//! assert_eq!(ranked.keys().next().unwrap().to_string(), "ann");
//!
//! let parity = Collection::from(vec![1, 2, 3, 4])
//!     .group_by(Retriever::callback(|n: &i32, _| json!(n % 2)), false);
//! assert_eq!(parity.get(0).unwrap().count(), 2);
//! ```

mod key;
mod retriever;

use std::cmp::Ordering;
use std::fmt;
use std::ops::Index;

use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};
use serde_json::{Map, Value};

use crate::value;

pub use key::Key;
pub use retriever::{DataGet, Retriever};

/// Ordered key/value collection.
#[derive(Debug, Clone, PartialEq)]
pub struct Collection<T> {
    items: Vec<(Key, T)>,
}

impl<T> Default for Collection<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Collection<T> {
    /// Create an empty collection.
    pub fn new() -> Self {
        Collection { items: Vec::new() }
    }

    /// Create a collection from anything convertible into one, including
    /// another collection.
    pub fn make(items: impl Into<Collection<T>>) -> Self {
        items.into()
    }

    /// Build from explicit `(key, value)` pairs. A repeated key overwrites the
    /// earlier value in place.
    pub fn from_entries<K, I>(entries: I) -> Self
    where
        K: Into<Key>,
        I: IntoIterator<Item = (K, T)>,
    {
        let mut collection = Collection::new();
        for (key, value) in entries {
            collection.put(key, value);
        }
        collection
    }

    /// All entries in iteration order.
    pub fn all(&self) -> &[(Key, T)] {
        &self.items
    }

    pub fn into_entries(self) -> Vec<(Key, T)> {
        self.items
    }

    pub fn count(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, key: impl Into<Key>) -> Option<&T> {
        let key = key.into();
        self.position(&key).map(|i| &self.items[i].1)
    }

    pub fn has(&self, key: impl Into<Key>) -> bool {
        let key = key.into();
        self.position(&key).is_some()
    }

    pub fn keys(&self) -> impl Iterator<Item = &Key> + '_ {
        self.items.iter().map(|(key, _)| key)
    }

    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            inner: self.items.iter(),
        }
    }

    /// Apply `f(value, key)` to every entry, keeping keys.
    pub fn map<U, F>(&self, mut f: F) -> Collection<U>
    where
        F: FnMut(&T, &Key) -> U,
    {
        Collection {
            items: self
                .items
                .iter()
                .map(|(key, value)| (key.clone(), f(value, key)))
                .collect(),
        }
    }

    /// Map every entry to zero or more `(key, value)` pairs. Later pairs
    /// overwrite earlier ones with the same key.
    pub fn map_with_keys<U, K, I, F>(&self, mut f: F) -> Collection<U>
    where
        K: Into<Key>,
        I: IntoIterator<Item = (K, U)>,
        F: FnMut(&T, &Key) -> I,
    {
        let mut result = Collection::new();
        for (key, value) in &self.items {
            for (map_key, map_value) in f(value, key) {
                result.put(map_key, map_value);
            }
        }
        result
    }

    /// Call `f(value, key)` for each entry until it returns `false`.
    pub fn each<F>(&self, mut f: F) -> &Self
    where
        F: FnMut(&T, &Key) -> bool,
    {
        for (key, value) in &self.items {
            if !f(value, key) {
                break;
            }
        }
        self
    }

    /// Left fold over the values.
    pub fn reduce<A, F>(&self, f: F, initial: A) -> A
    where
        F: FnMut(A, &T) -> A,
    {
        self.items.iter().map(|(_, value)| value).fold(initial, f)
    }

    pub fn first(&self) -> Option<&T> {
        self.items.first().map(|(_, value)| value)
    }

    pub fn first_where<F>(&self, mut f: F) -> Option<&T>
    where
        F: FnMut(&T, &Key) -> bool,
    {
        self.items
            .iter()
            .find(|(key, value)| f(value, key))
            .map(|(_, value)| value)
    }

    pub fn last(&self) -> Option<&T> {
        self.items.last().map(|(_, value)| value)
    }

    pub fn last_where<F>(&self, mut f: F) -> Option<&T>
    where
        F: FnMut(&T, &Key) -> bool,
    {
        self.items
            .iter()
            .rev()
            .find(|(key, value)| f(value, key))
            .map(|(_, value)| value)
    }

    pub fn contains_where<F>(&self, f: F) -> bool
    where
        F: FnMut(&T, &Key) -> bool,
    {
        self.first_where(f).is_some()
    }

    /// Append a value under the next integer key.
    pub fn push(&mut self, value: T) -> &mut Self {
        let key = Key::Int(self.next_index());
        self.items.push((key, value));
        self
    }

    /// Array-access write: replace the value at `key` in place, or append it.
    pub fn put(&mut self, key: impl Into<Key>, value: T) -> &mut Self {
        let key = key.into();
        match self.position(&key) {
            Some(i) => self.items[i].1 = value,
            None => self.items.push((key, value)),
        }
        self
    }

    /// Remove and return the last value.
    pub fn pop(&mut self) -> Option<T> {
        self.items.pop().map(|(_, value)| value)
    }

    /// Put a value first.
    ///
    /// Without a key, integer keys are renumbered from `0` (the new value
    /// taking `0`) and string keys are kept. With a key, any existing entry
    /// for that key is dropped and the new one leads.
    pub fn prepend(&mut self, value: T, key: Option<Key>) -> &mut Self {
        match key {
            Some(key) => {
                if let Some(i) = self.position(&key) {
                    self.items.remove(i);
                }
                self.items.insert(0, (key, value));
            }
            None => {
                let rest = std::mem::take(&mut self.items);
                self.items.push((Key::Int(0), value));
                let mut next = 1;
                for (key, value) in rest {
                    match key {
                        Key::Int(_) => {
                            self.items.push((Key::Int(next), value));
                            next += 1;
                        }
                        Key::Str(_) => self.items.push((key, value)),
                    }
                }
            }
        }
        self
    }

    /// Remove the given keys.
    pub fn forget<K, I>(&mut self, keys: I) -> &mut Self
    where
        K: Into<Key>,
        I: IntoIterator<Item = K>,
    {
        for key in keys {
            self.offset_unset(key);
        }
        self
    }

    /// Array-access removal of a single key.
    pub fn offset_unset(&mut self, key: impl Into<Key>) -> Option<T> {
        let key = key.into();
        self.position(&key).map(|i| self.items.remove(i).1)
    }

    fn position(&self, key: &Key) -> Option<usize> {
        self.items.iter().position(|(k, _)| k == key)
    }

    fn next_index(&self) -> i64 {
        self.items
            .iter()
            .filter_map(|(key, _)| key.as_int())
            .max()
            .map(|max| max + 1)
            .unwrap_or(0)
    }

    /// Keys are exactly `0..n` in order.
    fn is_list(&self) -> bool {
        self.items
            .iter()
            .enumerate()
            .all(|(i, (key, _))| *key == Key::Int(i as i64))
    }
}

impl<T: Clone> Collection<T> {
    /// Values re-keyed `0..n`.
    pub fn values(&self) -> Self {
        self.items.iter().map(|(_, value)| value.clone()).collect()
    }

    /// Keep entries where `f(value, key)` holds.
    pub fn filter<F>(&self, mut f: F) -> Self
    where
        F: FnMut(&T, &Key) -> bool,
    {
        Collection {
            items: self
                .items
                .iter()
                .filter(|(key, value)| f(value, key))
                .cloned()
                .collect(),
        }
    }

    /// Drop entries where `f(value, key)` holds.
    pub fn reject<F>(&self, mut f: F) -> Self
    where
        F: FnMut(&T, &Key) -> bool,
    {
        self.filter(|value, key| !f(value, key))
    }

    /// Every entry except the given keys.
    pub fn except<K, I>(&self, keys: I) -> Self
    where
        K: Into<Key>,
        I: IntoIterator<Item = K>,
    {
        let keys: Vec<Key> = keys.into_iter().map(Into::into).collect();
        self.filter(|_, key| !keys.contains(key))
    }

    /// Only the given keys, in the receiver's order.
    pub fn only<K, I>(&self, keys: I) -> Self
    where
        K: Into<Key>,
        I: IntoIterator<Item = K>,
    {
        let keys: Vec<Key> = keys.into_iter().map(Into::into).collect();
        self.filter(|_, key| keys.contains(key))
    }

    /// Stable sort with a comparator; keys stay with their values.
    pub fn sort_with<F>(&self, mut compare: F) -> Self
    where
        F: FnMut(&T, &T) -> Ordering,
    {
        let mut items = self.items.clone();
        items.sort_by(|(_, a), (_, b)| compare(a, b));
        Collection { items }
    }
}

impl<T: PartialEq> Collection<T> {
    pub fn contains(&self, needle: &T) -> bool {
        self.items.iter().any(|(_, value)| value == needle)
    }
}

impl<T: DataGet> Collection<T> {
    /// Whether every entry's derived value is truthy.
    pub fn every<'r>(&self, retriever: impl Into<Retriever<'r, T>>) -> bool
    where
        T: 'r,
    {
        let retriever = retriever.into();
        self.items
            .iter()
            .all(|(key, value)| value::is_truthy(&retriever.retrieve(value, key)))
    }

    /// Extract `value_path` from every item, optionally keyed by `key_path`.
    ///
    /// Items whose key path yields an array or object are appended under the
    /// next integer key.
    pub fn pluck(&self, value_path: &str, key_path: Option<&str>) -> Collection<Value> {
        let mut result = Collection::new();
        for (_, item) in &self.items {
            let plucked = item.data_get(value_path);
            match key_path.and_then(|path| Key::from_value(&item.data_get(path))) {
                Some(key) => {
                    result.put(key, plucked);
                }
                None => {
                    result.push(plucked);
                }
            }
        }
        result
    }

    pub fn sum(&self) -> f64 {
        self.sum_by(Retriever::<T>::identity())
    }

    pub fn sum_by<'r>(&self, retriever: impl Into<Retriever<'r, T>>) -> f64
    where
        T: 'r,
    {
        self.derived(&retriever.into())
            .iter()
            .map(value::to_number)
            .sum()
    }

    pub fn avg(&self) -> Option<f64> {
        self.avg_by(Retriever::<T>::identity())
    }

    pub fn avg_by<'r>(&self, retriever: impl Into<Retriever<'r, T>>) -> Option<f64>
    where
        T: 'r,
    {
        if self.is_empty() {
            return None;
        }
        Some(self.sum_by(retriever) / self.count() as f64)
    }

    /// Smallest derived value, ignoring nulls.
    pub fn min(&self) -> Option<Value> {
        self.min_by(Retriever::<T>::identity())
    }

    pub fn min_by<'r>(&self, retriever: impl Into<Retriever<'r, T>>) -> Option<Value>
    where
        T: 'r,
    {
        self.extreme(&retriever.into(), Ordering::Less)
    }

    /// Largest derived value, ignoring nulls.
    pub fn max(&self) -> Option<Value> {
        self.max_by(Retriever::<T>::identity())
    }

    pub fn max_by<'r>(&self, retriever: impl Into<Retriever<'r, T>>) -> Option<Value>
    where
        T: 'r,
    {
        self.extreme(&retriever.into(), Ordering::Greater)
    }

    pub fn median(&self) -> Option<f64> {
        self.median_by(Retriever::<T>::identity())
    }

    /// Middle derived value; the mean of the two middle values on even counts.
    pub fn median_by<'r>(&self, retriever: impl Into<Retriever<'r, T>>) -> Option<f64>
    where
        T: 'r,
    {
        let mut values = self.derived(&retriever.into());
        if values.is_empty() {
            return None;
        }
        values.sort_by(value::compare);

        let middle = values.len() / 2;
        if values.len() % 2 == 1 {
            return Some(value::to_number(&values[middle]));
        }
        Some((value::to_number(&values[middle - 1]) + value::to_number(&values[middle])) / 2.0)
    }

    /// Deep conversion into a nested structure.
    ///
    /// Empty collections and non-list keys become objects; `0..n` keys become
    /// arrays.
    pub fn to_array(&self) -> Value {
        if !self.is_empty() && self.is_list() {
            return Value::Array(self.items.iter().map(|(_, v)| v.to_value()).collect());
        }
        Value::Object(
            self.items
                .iter()
                .map(|(key, v)| (key.to_string(), v.to_value()))
                .collect(),
        )
    }

    fn derived(&self, retriever: &Retriever<'_, T>) -> Vec<Value> {
        self.items
            .iter()
            .map(|(key, item)| retriever.retrieve(item, key))
            .collect()
    }

    fn extreme(&self, retriever: &Retriever<'_, T>, wanted: Ordering) -> Option<Value> {
        self.derived(retriever)
            .into_iter()
            .filter(|value| !value.is_null())
            .fold(None, |best, candidate| match best {
                Some(best) if value::compare(&candidate, &best) != wanted => Some(best),
                _ => Some(candidate),
            })
    }
}

impl<T: DataGet + Clone> Collection<T> {
    /// Stable ascending sort by value (see [`value::compare`]); keys stay
    /// with their values.
    pub fn sort(&self) -> Self {
        self.sort_with(|a, b| value::compare(&a.to_value(), &b.to_value()))
    }

    /// Drop falsy items (see [`value::is_truthy`]).
    pub fn filter_truthy(&self) -> Self {
        self.filter(|item, _| value::is_truthy(&item.to_value()))
    }

    /// Stable sort by a derived value; keys stay with their values.
    pub fn sort_by<'r>(&self, retriever: impl Into<Retriever<'r, T>>, descending: bool) -> Self
    where
        T: 'r,
    {
        let retriever = retriever.into();
        let mut keyed: Vec<(Value, (Key, T))> = self
            .items
            .iter()
            .map(|(key, item)| (retriever.retrieve(item, key), (key.clone(), item.clone())))
            .collect();

        keyed.sort_by(|(a, _), (b, _)| {
            let ord = value::compare(a, b);
            if descending {
                ord.reverse()
            } else {
                ord
            }
        });

        Collection {
            items: keyed.into_iter().map(|(_, entry)| entry).collect(),
        }
    }

    /// Bucket entries by derived group key.
    ///
    /// A derived array places the entry in one bucket per element. Booleans
    /// become `0`/`1`. Without `preserve_keys` each bucket is keyed `0..n`.
    pub fn group_by<'r>(
        &self,
        retriever: impl Into<Retriever<'r, T>>,
        preserve_keys: bool,
    ) -> Collection<Collection<T>>
    where
        T: 'r,
    {
        let retriever = retriever.into();
        let mut groups: Collection<Collection<T>> = Collection::new();

        for (key, item) in &self.items {
            let derived = retriever.retrieve(item, key);
            let group_keys = match derived {
                Value::Array(keys) => keys,
                other => vec![other],
            };

            for group_key in group_keys.iter().filter_map(Key::from_value) {
                let bucket = match groups.position(&group_key) {
                    Some(i) => &mut groups.items[i].1,
                    None => {
                        groups.items.push((group_key, Collection::new()));
                        let last = groups.items.len() - 1;
                        &mut groups.items[last].1
                    }
                };
                if preserve_keys {
                    bucket.put(key.clone(), item.clone());
                } else {
                    bucket.push(item.clone());
                }
            }
        }

        groups
    }
}

impl<T: Serialize> Collection<T> {
    /// JSON projection. Empty collections serialize as `{}`.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

impl Collection<Value> {
    /// Coerce a JSON value: objects keep their keys, arrays are keyed `0..n`,
    /// `null` is empty and any scalar becomes a single entry.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(map) => map.into(),
            Value::Array(items) => items.into(),
            Value::Null => Collection::new(),
            scalar => Collection {
                items: vec![(Key::Int(0), scalar)],
            },
        }
    }

    /// Build from anything exposing a nested-structure conversion.
    pub fn from_arrayable(item: &impl DataGet) -> Self {
        Self::from_value(item.to_value())
    }

    /// Build from anything JSON-serializable.
    pub fn from_serializable(item: &impl Serialize) -> Result<Self, serde_json::Error> {
        serde_json::to_value(item).map(Self::from_value)
    }

    /// Flatten array and object values into one list; scalars are dropped.
    pub fn collapse(&self) -> Self {
        let mut result = Collection::new();
        for (_, value) in &self.items {
            match value {
                Value::Array(items) => items.iter().for_each(|v| {
                    result.push(v.clone());
                }),
                Value::Object(map) => map.values().for_each(|v| {
                    result.push(v.clone());
                }),
                _ => {}
            }
        }
        result
    }

    /// Swap keys and values. Values that cannot be keys are skipped; on
    /// duplicate values the last key wins.
    pub fn flip(&self) -> Self {
        let mut result = Collection::new();
        for (key, value) in &self.items {
            if let Some(flipped) = Key::from_value(value) {
                if matches!(value, Value::String(_) | Value::Number(_)) {
                    result.put(flipped, key.to_value());
                }
            }
        }
        result
    }
}

impl<T: Clone> Collection<Collection<T>> {
    /// Concatenate nested collections into one list.
    pub fn collapse(&self) -> Collection<T> {
        let mut result = Collection::new();
        for (_, inner) in &self.items {
            for (_, value) in &inner.items {
                result.push(value.clone());
            }
        }
        result
    }
}

impl<T: DataGet> DataGet for Collection<T> {
    fn to_value(&self) -> Value {
        self.to_array()
    }
}

impl<T: Serialize> Serialize for Collection<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if !self.is_empty() && self.is_list() {
            let mut seq = serializer.serialize_seq(Some(self.items.len()))?;
            for (_, value) in &self.items {
                seq.serialize_element(value)?;
            }
            return seq.end();
        }

        let mut map = serializer.serialize_map(Some(self.items.len()))?;
        for (key, value) in &self.items {
            map.serialize_entry(&key.to_string(), value)?;
        }
        map.end()
    }
}

impl<T: Serialize> fmt::Display for Collection<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let json = self.to_json().map_err(|_| fmt::Error)?;
        f.write_str(&json)
    }
}

impl<T, K: Into<Key>> Index<K> for Collection<T> {
    type Output = T;

    fn index(&self, key: K) -> &T {
        let key = key.into();
        match self.position(&key) {
            Some(i) => &self.items[i].1,
            None => panic!("undefined collection key `{}`", key),
        }
    }
}

impl<T> From<Vec<T>> for Collection<T> {
    fn from(values: Vec<T>) -> Self {
        values.into_iter().collect()
    }
}

impl From<Map<String, Value>> for Collection<Value> {
    fn from(map: Map<String, Value>) -> Self {
        Collection::from_entries(map)
    }
}

impl<T> FromIterator<T> for Collection<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Collection {
            items: iter
                .into_iter()
                .enumerate()
                .map(|(i, value)| (Key::Int(i as i64), value))
                .collect(),
        }
    }
}

impl<T> IntoIterator for Collection<T> {
    type Item = (Key, T);
    type IntoIter = std::vec::IntoIter<(Key, T)>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a, T> IntoIterator for &'a Collection<T> {
    type Item = (&'a Key, &'a T);
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Borrowing iterator over `(key, value)` entries.
pub struct Iter<'a, T> {
    inner: std::slice::Iter<'a, (Key, T)>,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = (&'a Key, &'a T);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(key, value)| (key, value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<T> DoubleEndedIterator for Iter<'_, T> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.inner.next_back().map(|(key, value)| (key, value))
    }
}
