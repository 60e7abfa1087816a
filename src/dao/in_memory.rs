//! InMemoryDao - `Vec`-backed table for testing and development.

use std::cmp::Ordering;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde_json::{Map, Value};

use super::{
    Appends, Condition, ConfigError, Dao, DaoError, DaoResult, Direction, TableConfig,
};
use crate::record::Schema;
use crate::value;

type Row = Map<String, Value>;

struct TableState {
    rows: Vec<Row>,
    next_id: i64,
    last_insert_id: Value,
}

/// In-memory table. Rows keep insertion order.
///
/// Clone-friendly via Arc: clones share the same rows.
#[derive(Clone)]
pub struct InMemoryDao {
    config: Arc<TableConfig>,
    state: Arc<RwLock<TableState>>,
}

impl InMemoryDao {
    pub fn new(config: TableConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let next_id = config.start_id;
        Ok(Self {
            config: Arc::new(config),
            state: Arc::new(RwLock::new(TableState {
                rows: Vec::new(),
                next_id,
                last_insert_id: Value::Null,
            })),
        })
    }

    /// Table named and keyed after a schema, accepting any column.
    pub fn for_schema<S: Schema>() -> Self {
        let config = TableConfig::for_schema::<S>();
        let next_id = config.start_id;
        Self {
            config: Arc::new(config),
            state: Arc::new(RwLock::new(TableState {
                rows: Vec::new(),
                next_id,
                last_insert_id: Value::Null,
            })),
        }
    }

    pub fn config(&self) -> &TableConfig {
        &self.config
    }

    /// Snapshot of every stored row.
    pub fn rows(&self) -> DaoResult<Vec<Row>> {
        Ok(self.read()?.rows.clone())
    }

    pub fn len(&self) -> DaoResult<usize> {
        Ok(self.read()?.rows.len())
    }

    pub fn is_empty(&self) -> DaoResult<bool> {
        Ok(self.read()?.rows.is_empty())
    }

    fn read(&self) -> DaoResult<RwLockReadGuard<'_, TableState>> {
        self.state.read().map_err(|_| DaoError::LockPoisoned("read"))
    }

    fn write(&self) -> DaoResult<RwLockWriteGuard<'_, TableState>> {
        self.state.write().map_err(|_| DaoError::LockPoisoned("write"))
    }

    fn check_fields<'a>(&self, fields: impl IntoIterator<Item = &'a String>) -> DaoResult<()> {
        for field in fields {
            if !self.config.allows(field) {
                return Err(DaoError::UnknownField {
                    table: self.config.table.clone(),
                    field: field.clone(),
                });
            }
        }
        Ok(())
    }

    fn check_conditions(&self, conditions: &[Condition]) -> DaoResult<()> {
        for condition in conditions {
            match condition {
                Condition::Eq { field, .. }
                | Condition::Ne { field, .. }
                | Condition::Gt { field, .. }
                | Condition::Ge { field, .. }
                | Condition::Lt { field, .. }
                | Condition::Le { field, .. }
                | Condition::In { field, .. }
                | Condition::IsNull { field }
                | Condition::NotNull { field } => self.check_fields([field])?,
                Condition::Raw { value } => {
                    return Err(DaoError::UnsupportedCondition(value.to_string()));
                }
            }
        }
        Ok(())
    }

    /// Stores a row and returns its key. Caller holds the write lock.
    fn insert_locked(
        &self,
        state: &mut TableState,
        attributes: &Row,
    ) -> DaoResult<Option<Value>> {
        self.check_fields(attributes.keys())?;

        let primary_key = self.config.primary_key.as_str();
        let mut row = attributes.clone();
        let key = match row.get(primary_key) {
            Some(key) if !key.is_null() => key.clone(),
            _ if self.config.auto_increment => {
                let key = Value::from(state.next_id);
                row.insert(primary_key.to_string(), key.clone());
                key
            }
            _ => return Ok(None),
        };

        let duplicate = state.rows.iter().any(|existing| {
            existing
                .get(primary_key)
                .map(|k| value::compare(k, &key) == Ordering::Equal)
                .unwrap_or(false)
        });
        if duplicate {
            return Err(DaoError::DuplicateKey {
                table: self.config.table.clone(),
                key: key.to_string(),
            });
        }

        if let Some(id) = key.as_i64() {
            state.next_id = state.next_id.max(id.saturating_add(1));
        }
        state.rows.push(row);
        state.last_insert_id = key.clone();
        Ok(Some(key))
    }

    fn select(
        &self,
        rows: &[Row],
        conditions: &[Condition],
        appends: Option<&Appends>,
    ) -> Vec<Row> {
        let mut matched: Vec<Row> = rows
            .iter()
            .filter(|row| conditions.iter().all(|c| matches(row, c)))
            .cloned()
            .collect();

        let Some(appends) = appends else {
            return matched;
        };

        let ordering = appends.ordering();
        if !ordering.is_empty() {
            matched.sort_by(|a, b| {
                ordering
                    .iter()
                    .map(|(field, direction)| {
                        let ord = value::compare(column(a, field), column(b, field));
                        match direction {
                            Direction::Asc => ord,
                            Direction::Desc => ord.reverse(),
                        }
                    })
                    .find(|ord| *ord != Ordering::Equal)
                    .unwrap_or(Ordering::Equal)
            });
        }

        let offset = appends.offset_value().unwrap_or(0) as usize;
        let limit = appends.limit_value().map(|l| l as usize).unwrap_or(usize::MAX);
        matched.into_iter().skip(offset).take(limit).collect()
    }
}

const NULL: Value = Value::Null;

fn column<'a>(row: &'a Row, field: &str) -> &'a Value {
    row.get(field).unwrap_or(&NULL)
}

fn matches(row: &Row, condition: &Condition) -> bool {
    let cmp = |field: &str, value: &Value| value::compare(column(row, field), value);
    match condition {
        Condition::Eq { field, value } => cmp(field, value) == Ordering::Equal,
        Condition::Ne { field, value } => cmp(field, value) != Ordering::Equal,
        Condition::Gt { field, value } => cmp(field, value) == Ordering::Greater,
        Condition::Ge { field, value } => cmp(field, value) != Ordering::Less,
        Condition::Lt { field, value } => cmp(field, value) == Ordering::Less,
        Condition::Le { field, value } => cmp(field, value) != Ordering::Greater,
        Condition::In { field, values } => {
            values.iter().any(|v| cmp(field, v) == Ordering::Equal)
        }
        Condition::IsNull { field } => column(row, field).is_null(),
        Condition::NotNull { field } => !column(row, field).is_null(),
        Condition::Raw { .. } => false,
    }
}

fn project(row: Row, fields: &[String]) -> Row {
    if fields.is_empty() {
        return row;
    }
    fields
        .iter()
        .map(|field| (field.clone(), row.get(field).cloned().unwrap_or(Value::Null)))
        .collect()
}

impl Dao for InMemoryDao {
    fn fetch_one(
        &self,
        conditions: &[Condition],
        fields: &[String],
        appends: Option<&Appends>,
    ) -> DaoResult<Option<Row>> {
        Ok(self
            .fetch_many(conditions, fields, appends)?
            .into_iter()
            .next())
    }

    fn fetch_many(
        &self,
        conditions: &[Condition],
        fields: &[String],
        appends: Option<&Appends>,
    ) -> DaoResult<Vec<Row>> {
        self.check_conditions(conditions)?;
        self.check_fields(fields)?;

        let state = self.read()?;
        Ok(self
            .select(&state.rows, conditions, appends)
            .into_iter()
            .map(|row| project(row, fields))
            .collect())
    }

    fn all_field_names(&self) -> Vec<String> {
        if !self.config.fields.is_empty() {
            return self.config.fields.clone();
        }

        let mut names = vec![self.config.primary_key.clone()];
        if let Ok(state) = self.read() {
            for row in &state.rows {
                for name in row.keys() {
                    if !names.contains(name) {
                        names.push(name.clone());
                    }
                }
            }
        }
        names
    }

    fn insert(&self, attributes: &Row) -> DaoResult<bool> {
        let mut state = self.write()?;
        Ok(self.insert_locked(&mut state, attributes)?.is_some())
    }

    fn last_insert_id(&self) -> DaoResult<Value> {
        Ok(self.read()?.last_insert_id.clone())
    }

    fn update_where(&self, conditions: &[Condition], attributes: &Row) -> DaoResult<bool> {
        self.check_conditions(conditions)?;
        self.check_fields(attributes.keys())?;

        let mut state = self.write()?;
        let matched: Vec<usize> = state
            .rows
            .iter()
            .enumerate()
            .filter(|(_, row)| conditions.iter().all(|c| matches(row, c)))
            .map(|(i, _)| i)
            .collect();

        let primary_key = self.config.primary_key.as_str();
        if let Some(key) = attributes.get(primary_key).filter(|key| !key.is_null()) {
            let taken = matched.len() > 1
                || state.rows.iter().enumerate().any(|(i, row)| {
                    !matched.contains(&i)
                        && value::compare(column(row, primary_key), key) == Ordering::Equal
                });
            if taken {
                return Err(DaoError::DuplicateKey {
                    table: self.config.table.clone(),
                    key: key.to_string(),
                });
            }
            if let Some(id) = key.as_i64() {
                state.next_id = state.next_id.max(id.saturating_add(1));
            }
        }

        for &i in &matched {
            let row = &mut state.rows[i];
            for (field, value) in attributes {
                row.insert(field.clone(), value.clone());
            }
        }
        Ok(!matched.is_empty())
    }

    fn insert_returning_id(&self, attributes: &Row) -> DaoResult<Option<Value>> {
        let mut state = self.write()?;
        self.insert_locked(&mut state, attributes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(value: Value) -> Row {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    fn users() -> InMemoryDao {
        let dao = InMemoryDao::new(
            TableConfig::new("users").with_fields(["id", "name", "age"]),
        )
        .unwrap();
        dao.insert(&row(json!({"name": "ann", "age": 31}))).unwrap();
        dao.insert(&row(json!({"name": "bob", "age": 25}))).unwrap();
        dao.insert(&row(json!({"name": "cid", "age": null}))).unwrap();
        dao
    }

    #[test]
    fn insert_assigns_increasing_ids() {
        let dao = users();
        let ids: Vec<Value> = dao.rows().unwrap().iter().map(|r| r["id"].clone()).collect();
        assert_eq!(ids, vec![json!(1), json!(2), json!(3)]);
        assert_eq!(dao.last_insert_id().unwrap(), json!(3));
    }

    #[test]
    fn explicit_ids_advance_the_counter() {
        let dao = InMemoryDao::new(TableConfig::new("tags")).unwrap();
        dao.insert(&row(json!({"id": 10}))).unwrap();
        let id = dao.insert_returning_id(&row(json!({"label": "x"}))).unwrap();
        assert_eq!(id, Some(json!(11)));
    }

    #[test]
    fn duplicate_key_is_an_error() {
        let dao = users();
        let err = dao.insert(&row(json!({"id": 2, "name": "dup"}))).unwrap_err();
        assert!(matches!(err, DaoError::DuplicateKey { .. }));
    }

    #[test]
    fn insert_without_key_is_refused_when_not_generating() {
        let dao = InMemoryDao::new(TableConfig::new("tags").with_auto_increment(false)).unwrap();
        assert!(!dao.insert(&row(json!({"label": "x"}))).unwrap());
        assert_eq!(dao.insert_returning_id(&row(json!({"label": "x"}))).unwrap(), None);
        assert!(dao.is_empty().unwrap());
    }

    #[test]
    fn fetch_filters_orders_and_pages() {
        let dao = users();
        let rows = dao
            .fetch_many(
                &[Condition::not_null("age")],
                &["name".to_string()],
                Some(&Appends::new().order_by("age", Direction::Asc)),
            )
            .unwrap();
        assert_eq!(rows, vec![row(json!({"name": "bob"})), row(json!({"name": "ann"}))]);

        let page = dao
            .fetch_many(&[], &[], Some(&Appends::new().offset(1).limit(1)))
            .unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0]["name"], json!("bob"));
    }

    #[test]
    fn fetch_one_and_in_conditions() {
        let dao = users();
        let found = dao.fetch_one(&[Condition::eq("id", "2")], &[], None).unwrap();
        assert_eq!(found.unwrap()["name"], json!("bob"));

        let rows = dao
            .fetch_many(&[dao.build_in_condition("id", &[json!(1), json!(3)])], &[], None)
            .unwrap();
        assert_eq!(rows.len(), 2);

        assert!(dao.fetch_one(&[Condition::eq("id", 99)], &[], None).unwrap().is_none());
    }

    #[test]
    fn unknown_fields_and_raw_conditions_are_rejected() {
        let dao = users();
        let err = dao.fetch_many(&[Condition::eq("email", "x")], &[], None).unwrap_err();
        assert!(matches!(err, DaoError::UnknownField { .. }));

        let err = dao.fetch_many(&[Condition::raw("age > 3")], &[], None).unwrap_err();
        assert!(matches!(err, DaoError::UnsupportedCondition(_)));

        let err = dao.insert(&row(json!({"email": "x"}))).unwrap_err();
        assert!(matches!(err, DaoError::UnknownField { .. }));
    }

    #[test]
    fn update_where_reports_matches() {
        let dao = users();
        assert!(dao
            .update_where(&[Condition::eq("id", 1)], &row(json!({"age": 32})))
            .unwrap());
        assert!(!dao
            .update_where(&[Condition::eq("id", 99)], &row(json!({"age": 1})))
            .unwrap());
        let ann = dao.fetch_one(&[Condition::eq("id", 1)], &[], None).unwrap().unwrap();
        assert_eq!(ann["age"], json!(32));
        assert_eq!(ann["name"], json!("ann"));
    }

    #[test]
    fn update_cannot_take_another_rows_key() {
        let dao = users();
        let err = dao
            .update_where(&[Condition::eq("id", 2)], &row(json!({"id": 1})))
            .unwrap_err();
        assert!(matches!(err, DaoError::DuplicateKey { .. }));
        assert_eq!(
            dao.fetch_many(&[Condition::eq("id", 1)], &[], None).unwrap().len(),
            1
        );

        let err = dao
            .update_where(&[Condition::not_null("name")], &row(json!({"id": 50})))
            .unwrap_err();
        assert!(matches!(err, DaoError::DuplicateKey { .. }));

        assert!(dao
            .update_where(&[Condition::eq("id", 2)], &row(json!({"id": 20})))
            .unwrap());
        let id = dao.insert_returning_id(&row(json!({"name": "eve"}))).unwrap();
        assert_eq!(id, Some(json!(21)));
    }

    #[test]
    fn largest_explicit_key_does_not_overflow() {
        let dao = InMemoryDao::new(TableConfig::new("tags")).unwrap();
        assert!(dao.insert(&row(json!({"id": i64::MAX}))).unwrap());
        assert_eq!(dao.last_insert_id().unwrap(), json!(i64::MAX));

        let err = dao.insert(&row(json!({"label": "x"}))).unwrap_err();
        assert!(matches!(err, DaoError::DuplicateKey { .. }));
    }

    #[test]
    fn field_names_fall_back_to_stored_columns() {
        let dao = InMemoryDao::new(TableConfig::new("posts")).unwrap();
        dao.insert(&row(json!({"title": "a"}))).unwrap();
        dao.insert(&row(json!({"title": "b", "body": "c"}))).unwrap();
        assert_eq!(dao.all_field_names(), vec!["id", "title", "body"]);
    }

    #[test]
    fn clone_shares_rows() {
        let dao = users();
        let clone = dao.clone();
        clone.insert(&row(json!({"name": "dee"}))).unwrap();
        assert_eq!(dao.len().unwrap(), 4);
    }
}
