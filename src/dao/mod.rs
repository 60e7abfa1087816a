//! Data-access objects - the storage boundary behind every repository.
//!
//! A [`Dao`] performs the actual I/O for one table. Repositories hand it
//! [`Condition`]s and [`Appends`] without interpreting them; what they mean is
//! up to the implementation.
//!
//! ## Example
//!
//! ```ignore
//! use modelkit::{Appends, Condition, Dao, Direction, InMemoryDao, TableConfig};
//!
//! let dao = InMemoryDao::new(TableConfig::new("users"))?;
//! dao.insert(&attributes)?;
//! let rows = dao.fetch_many(
//!     &[Condition::gt("age", 18)],
//!     &dao.all_field_names(),
//!     Some(&Appends::new().order_by("name", Direction::Asc).limit(10)),
//! )?;
//! ```

mod config;
mod in_memory;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub use config::{ConfigError, TableConfig};
pub use in_memory::InMemoryDao;

pub type DaoResult<T> = Result<T, DaoError>;

/// Errors raised by a data-access object.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DaoError {
    #[error("dao lock poisoned during {0}")]
    LockPoisoned(&'static str),

    #[error("unknown field `{field}` for table {table}")]
    UnknownField { table: String, field: String },

    #[error("duplicate primary key {key} in table {table}")]
    DuplicateKey { table: String, key: String },

    #[error("unsupported condition: {0}")]
    UnsupportedCondition(String),

    #[error("dao serialization error: {0}")]
    Serde(String),

    #[error("dao storage error: {0}")]
    Storage(String),
}

/// One filter condition. A slice of conditions is a conjunction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Condition {
    Eq { field: String, value: Value },
    Ne { field: String, value: Value },
    Gt { field: String, value: Value },
    Ge { field: String, value: Value },
    Lt { field: String, value: Value },
    Le { field: String, value: Value },
    In { field: String, values: Vec<Value> },
    IsNull { field: String },
    NotNull { field: String },
    /// Implementation-specific condition passed through untouched.
    Raw { value: Value },
}

impl Condition {
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Condition::Eq {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn ne(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Condition::Ne {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn gt(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Condition::Gt {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn ge(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Condition::Ge {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn lt(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Condition::Lt {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn le(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Condition::Le {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn is_in<V: Into<Value>>(
        field: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        Condition::In {
            field: field.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_null(field: impl Into<String>) -> Self {
        Condition::IsNull {
            field: field.into(),
        }
    }

    pub fn not_null(field: impl Into<String>) -> Self {
        Condition::NotNull {
            field: field.into(),
        }
    }

    pub fn raw(value: impl Into<Value>) -> Self {
        Condition::Raw {
            value: value.into(),
        }
    }
}

/// Sort direction for [`Appends::order_by`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Asc,
    Desc,
}

/// Open-ended fetch options (ordering, paging, implementation extras).
///
/// Known options have typed builders and readers; anything else goes through
/// [`Appends::set`] and is left to the DAO.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Appends {
    options: Map<String, Value>,
}

impl Appends {
    pub const ORDER_BY: &'static str = "order_by";
    pub const LIMIT: &'static str = "limit";
    pub const OFFSET: &'static str = "offset";

    pub fn new() -> Self {
        Self::default()
    }

    /// Add an ordering term; terms apply in the order added.
    pub fn order_by(mut self, field: impl Into<String>, direction: Direction) -> Self {
        let field: String = field.into();
        let term = serde_json::json!({ "field": field, "direction": direction });
        match self.options.get_mut(Self::ORDER_BY) {
            Some(Value::Array(terms)) => terms.push(term),
            _ => {
                self.options
                    .insert(Self::ORDER_BY.to_string(), Value::Array(vec![term]));
            }
        }
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.options.insert(Self::LIMIT.to_string(), Value::from(limit));
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.options.insert(Self::OFFSET.to_string(), Value::from(offset));
        self
    }

    /// Set an arbitrary option.
    pub fn set(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.options.insert(name.into(), value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.options.get(name)
    }

    pub fn options(&self) -> &Map<String, Value> {
        &self.options
    }

    /// Ordering terms. Accepts the builder form as well as strings like
    /// `"name desc, id"`.
    pub fn ordering(&self) -> Vec<(String, Direction)> {
        match self.options.get(Self::ORDER_BY) {
            Some(Value::Array(terms)) => terms.iter().filter_map(parse_order_term).collect(),
            Some(Value::String(spec)) => spec
                .split(',')
                .filter_map(|term| parse_order_str(term.trim()))
                .collect(),
            _ => Vec::new(),
        }
    }

    pub fn limit_value(&self) -> Option<u64> {
        self.options.get(Self::LIMIT).and_then(Value::as_u64)
    }

    pub fn offset_value(&self) -> Option<u64> {
        self.options.get(Self::OFFSET).and_then(Value::as_u64)
    }
}

fn parse_order_term(term: &Value) -> Option<(String, Direction)> {
    match term {
        Value::String(s) => parse_order_str(s.trim()),
        Value::Object(map) => {
            let field = map.get("field")?.as_str()?.to_string();
            let direction = match map.get("direction").and_then(Value::as_str) {
                Some(d) if d.eq_ignore_ascii_case("desc") => Direction::Desc,
                _ => Direction::Asc,
            };
            Some((field, direction))
        }
        _ => None,
    }
}

fn parse_order_str(term: &str) -> Option<(String, Direction)> {
    let mut parts = term.split_whitespace();
    let field = parts.next()?.to_string();
    let direction = match parts.next() {
        Some(d) if d.eq_ignore_ascii_case("desc") => Direction::Desc,
        _ => Direction::Asc,
    };
    Some((field, direction))
}

/// Storage boundary for one table.
///
/// `fields` passed to the fetch methods select columns; an empty slice means
/// every column.
pub trait Dao {
    /// First row matching all conditions.
    fn fetch_one(
        &self,
        conditions: &[Condition],
        fields: &[String],
        appends: Option<&Appends>,
    ) -> DaoResult<Option<Map<String, Value>>>;

    /// Every row matching all conditions, in storage order unless `appends`
    /// says otherwise.
    fn fetch_many(
        &self,
        conditions: &[Condition],
        fields: &[String],
        appends: Option<&Appends>,
    ) -> DaoResult<Vec<Map<String, Value>>>;

    /// Condition selecting rows whose `field` is one of `values`.
    fn build_in_condition(&self, field: &str, values: &[Value]) -> Condition {
        Condition::In {
            field: field.to_string(),
            values: values.to_vec(),
        }
    }

    /// Every column of the table.
    fn all_field_names(&self) -> Vec<String>;

    /// Insert one row. `Ok(false)` when storage refused the row.
    fn insert(&self, attributes: &Map<String, Value>) -> DaoResult<bool>;

    /// Key generated by the most recent insert.
    fn last_insert_id(&self) -> DaoResult<Value>;

    /// Update matching rows with `attributes`. `Ok(false)` when nothing was
    /// updated.
    fn update_where(
        &self,
        conditions: &[Condition],
        attributes: &Map<String, Value>,
    ) -> DaoResult<bool>;

    /// Insert one row and report the key generated for it; `None` when the
    /// insert was refused.
    ///
    /// The default runs [`Dao::insert`] then [`Dao::last_insert_id`]. That is
    /// not atomic: another insert through the same DAO between the two calls
    /// makes this return the other row's key. Implementations that can
    /// return the key together with the insert should override it.
    fn insert_returning_id(&self, attributes: &Map<String, Value>) -> DaoResult<Option<Value>> {
        if !self.insert(attributes)? {
            return Ok(None);
        }
        self.last_insert_id().map(Some)
    }
}

impl<D: Dao + ?Sized> Dao for &D {
    fn fetch_one(
        &self,
        conditions: &[Condition],
        fields: &[String],
        appends: Option<&Appends>,
    ) -> DaoResult<Option<Map<String, Value>>> {
        (**self).fetch_one(conditions, fields, appends)
    }

    fn fetch_many(
        &self,
        conditions: &[Condition],
        fields: &[String],
        appends: Option<&Appends>,
    ) -> DaoResult<Vec<Map<String, Value>>> {
        (**self).fetch_many(conditions, fields, appends)
    }

    fn build_in_condition(&self, field: &str, values: &[Value]) -> Condition {
        (**self).build_in_condition(field, values)
    }

    fn all_field_names(&self) -> Vec<String> {
        (**self).all_field_names()
    }

    fn insert(&self, attributes: &Map<String, Value>) -> DaoResult<bool> {
        (**self).insert(attributes)
    }

    fn last_insert_id(&self) -> DaoResult<Value> {
        (**self).last_insert_id()
    }

    fn update_where(
        &self,
        conditions: &[Condition],
        attributes: &Map<String, Value>,
    ) -> DaoResult<bool> {
        (**self).update_where(conditions, attributes)
    }

    fn insert_returning_id(&self, attributes: &Map<String, Value>) -> DaoResult<Option<Value>> {
        (**self).insert_returning_id(attributes)
    }
}

impl<D: Dao + ?Sized> Dao for Arc<D> {
    fn fetch_one(
        &self,
        conditions: &[Condition],
        fields: &[String],
        appends: Option<&Appends>,
    ) -> DaoResult<Option<Map<String, Value>>> {
        (**self).fetch_one(conditions, fields, appends)
    }

    fn fetch_many(
        &self,
        conditions: &[Condition],
        fields: &[String],
        appends: Option<&Appends>,
    ) -> DaoResult<Vec<Map<String, Value>>> {
        (**self).fetch_many(conditions, fields, appends)
    }

    fn build_in_condition(&self, field: &str, values: &[Value]) -> Condition {
        (**self).build_in_condition(field, values)
    }

    fn all_field_names(&self) -> Vec<String> {
        (**self).all_field_names()
    }

    fn insert(&self, attributes: &Map<String, Value>) -> DaoResult<bool> {
        (**self).insert(attributes)
    }

    fn last_insert_id(&self) -> DaoResult<Value> {
        (**self).last_insert_id()
    }

    fn update_where(
        &self,
        conditions: &[Condition],
        attributes: &Map<String, Value>,
    ) -> DaoResult<bool> {
        (**self).update_where(conditions, attributes)
    }

    fn insert_returning_id(&self, attributes: &Map<String, Value>) -> DaoResult<Option<Value>> {
        (**self).insert_returning_id(attributes)
    }
}
