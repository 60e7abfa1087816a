//! Table configuration for data-access objects.

use serde::{Deserialize, Serialize};

use crate::record::Schema;

/// Errors raised while loading or validating a [`TableConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid TOML table config: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("invalid JSON table config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid table config: {0}")]
    Invalid(String),
}

/// Describes one table: its name, key column and (optionally) its columns.
///
/// ```toml
/// table = "users"
/// primary_key = "id"
/// fields = ["id", "name", "email"]
/// auto_increment = true
/// start_id = 1
/// ```
///
/// An empty `fields` list means the table accepts any column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableConfig {
    pub table: String,
    pub primary_key: String,
    pub fields: Vec<String>,
    /// Generate integer keys for rows inserted without one.
    pub auto_increment: bool,
    /// First generated key.
    pub start_id: i64,
}

impl Default for TableConfig {
    fn default() -> Self {
        TableConfig {
            table: String::new(),
            primary_key: "id".to_string(),
            fields: Vec::new(),
            auto_increment: true,
            start_id: 1,
        }
    }
}

impl TableConfig {
    pub fn new(table: impl Into<String>) -> Self {
        TableConfig {
            table: table.into(),
            ..Self::default()
        }
    }

    /// Table name and key column taken from a schema.
    pub fn for_schema<S: Schema>() -> Self {
        TableConfig {
            table: S::TABLE.to_string(),
            primary_key: S::PRIMARY_KEY.to_string(),
            ..Self::default()
        }
    }

    pub fn with_primary_key(mut self, primary_key: impl Into<String>) -> Self {
        self.primary_key = primary_key.into();
        self
    }

    pub fn with_fields<I, F>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = F>,
        F: Into<String>,
    {
        self.fields = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_auto_increment(mut self, auto_increment: bool) -> Self {
        self.auto_increment = auto_increment;
        self
    }

    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: TableConfig = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_str(source: &str) -> Result<Self, ConfigError> {
        let config: TableConfig = serde_json::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.table.trim().is_empty() {
            return Err(ConfigError::Invalid("table cannot be empty".to_string()));
        }
        if self.primary_key.trim().is_empty() {
            return Err(ConfigError::Invalid(format!(
                "table {} has an empty primary_key",
                self.table
            )));
        }
        if !self.fields.is_empty() && !self.fields.contains(&self.primary_key) {
            return Err(ConfigError::Invalid(format!(
                "primary_key `{}` is not one of the fields of table {}",
                self.primary_key, self.table
            )));
        }
        Ok(())
    }

    /// Whether the table accepts a column.
    pub fn allows(&self, field: &str) -> bool {
        self.fields.is_empty() || self.fields.iter().any(|f| f == field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_toml_with_defaults() {
        let config = TableConfig::from_toml_str(
            r#"
            table = "users"
            fields = ["id", "name"]
            "#,
        )
        .unwrap();
        assert_eq!(config.table, "users");
        assert_eq!(config.primary_key, "id");
        assert!(config.auto_increment);
        assert_eq!(config.start_id, 1);
        assert!(config.allows("name"));
        assert!(!config.allows("email"));
    }

    #[test]
    fn parses_json() {
        let config = TableConfig::from_json_str(
            r#"{"table": "tags", "primary_key": "slug", "auto_increment": false}"#,
        )
        .unwrap();
        assert_eq!(config.primary_key, "slug");
        assert!(!config.auto_increment);
        assert!(config.allows("anything"));
    }

    #[test]
    fn rejects_primary_key_outside_fields() {
        let err = TableConfig::from_toml_str(
            r#"
            table = "users"
            primary_key = "uuid"
            fields = ["id"]
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let err = TableConfig::from_toml_str("primary_key = \"id\"").unwrap_err();
        assert!(err.to_string().contains("table cannot be empty"));
    }
}
