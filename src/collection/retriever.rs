//! Value retrieval for derived-key operations (`sort_by`, `group_by`, aggregates).

use serde_json::Value;

use super::Key;
use crate::value;

/// Capability to project an item into a nested `serde_json::Value` and read
/// dotted paths out of it.
///
/// This is what `Collection::to_array` uses for deep conversion and what
/// path-based retrievers read through.
pub trait DataGet {
    /// Converts the item into a nested structure.
    fn to_value(&self) -> Value;

    /// Reads a dotted path; an empty path returns the whole item.
    fn data_get(&self, path: &str) -> Value {
        value::data_get(&self.to_value(), path)
    }
}

impl DataGet for Value {
    fn to_value(&self) -> Value {
        self.clone()
    }

    fn data_get(&self, path: &str) -> Value {
        value::data_get(self, path)
    }
}

impl<T: DataGet + ?Sized> DataGet for &T {
    fn to_value(&self) -> Value {
        (**self).to_value()
    }

    fn data_get(&self, path: &str) -> Value {
        (**self).data_get(path)
    }
}

impl DataGet for str {
    fn to_value(&self) -> Value {
        Value::String(self.to_string())
    }
}

macro_rules! scalar_data_get {
    ($($ty:ty),*) => {
        $(
            impl DataGet for $ty {
                fn to_value(&self) -> Value {
                    Value::from(self.clone())
                }
            }
        )*
    };
}

scalar_data_get!(bool, i8, i16, i32, i64, u8, u16, u32, u64, f32, f64, String);

impl<T: DataGet> DataGet for Option<T> {
    fn to_value(&self) -> Value {
        match self {
            Some(inner) => inner.to_value(),
            None => Value::Null,
        }
    }
}

/// How a derived value is obtained from an entry: a dotted path into the
/// item, or a callback over `(value, key)`.
pub enum Retriever<'r, T> {
    Path(String),
    Callback(Box<dyn Fn(&T, &Key) -> Value + 'r>),
}

impl<'r, T> Retriever<'r, T> {
    pub fn path(path: impl Into<String>) -> Self {
        Retriever::Path(path.into())
    }

    pub fn callback<F>(f: F) -> Self
    where
        F: Fn(&T, &Key) -> Value + 'r,
    {
        Retriever::Callback(Box::new(f))
    }

    /// The item itself.
    pub fn identity() -> Self {
        Retriever::Path(String::new())
    }
}

impl<T: DataGet> Retriever<'_, T> {
    pub(crate) fn retrieve(&self, item: &T, key: &Key) -> Value {
        match self {
            Retriever::Path(path) => item.data_get(path),
            Retriever::Callback(f) => f(item, key),
        }
    }
}

impl<T> From<&str> for Retriever<'_, T> {
    fn from(path: &str) -> Self {
        Retriever::Path(path.to_string())
    }
}

impl<T> From<String> for Retriever<'_, T> {
    fn from(path: String) -> Self {
        Retriever::Path(path)
    }
}
