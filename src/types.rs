//! Schema-facing type vocabulary: column types, constraint kinds, join/sort
//! modifiers, and PostgreSQL-specific field configuration (timezone-aware
//! datetimes, full-text search weighting, foreign key actions).

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColumnType {
    Integer,
    Serial,
    Varchar,
    Text,
    Boolean,
    Timestamp { with_timezone: bool },
    Time { with_timezone: bool },
    Date,
    Uuid,
    Json,
    Jsonb,
    Bytea,
    Float,
    Double,
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ColumnType::Integer => "INTEGER".to_string(),
            ColumnType::Serial => "SERIAL".to_string(),
            ColumnType::Varchar => "VARCHAR".to_string(),
            ColumnType::Text => "TEXT".to_string(),
            ColumnType::Boolean => "BOOLEAN".to_string(),
            ColumnType::Timestamp { with_timezone: true } => "TIMESTAMP WITH TIME ZONE".to_string(),
            ColumnType::Timestamp { with_timezone: false } => "TIMESTAMP".to_string(),
            ColumnType::Time { with_timezone: true } => "TIME WITH TIME ZONE".to_string(),
            ColumnType::Time { with_timezone: false } => "TIME".to_string(),
            ColumnType::Date => "DATE".to_string(),
            ColumnType::Uuid => "UUID".to_string(),
            ColumnType::Json => "JSON".to_string(),
            ColumnType::Jsonb => "JSONB".to_string(),
            ColumnType::Bytea => "BYTEA".to_string(),
            ColumnType::Float => "REAL".to_string(),
            ColumnType::Double => "DOUBLE PRECISION".to_string(),
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConstraintType {
    PrimaryKey,
    ForeignKey,
    Unique,
    Check,
    Index,
}

impl fmt::Display for ConstraintType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConstraintType::PrimaryKey => "PRIMARY_KEY",
            ConstraintType::ForeignKey => "FOREIGN_KEY",
            ConstraintType::Unique => "UNIQUE",
            ConstraintType::Check => "CHECK",
            ConstraintType::Index => "INDEX",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", if *self == SortOrder::Asc { "ASC" } else { "DESC" })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JoinType {
    Inner,
    Left,
    Right,
    Full,
}

impl fmt::Display for JoinType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            JoinType::Inner => "INNER JOIN",
            JoinType::Left => "LEFT JOIN",
            JoinType::Right => "RIGHT JOIN",
            JoinType::Full => "FULL JOIN",
        };
        write!(f, "{}", s)
    }
}

/// `ON DELETE` / `ON UPDATE` action for a foreign key constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ForeignKeyAction {
    Restrict,
    NoAction,
    Cascade,
    SetDefault,
    SetNull,
}

impl Default for ForeignKeyAction {
    fn default() -> Self {
        ForeignKeyAction::NoAction
    }
}

impl fmt::Display for ForeignKeyAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ForeignKeyAction::Restrict => "RESTRICT",
            ForeignKeyAction::NoAction => "NO ACTION",
            ForeignKeyAction::Cascade => "CASCADE",
            ForeignKeyAction::SetDefault => "SET DEFAULT",
            ForeignKeyAction::SetNull => "SET NULL",
        };
        write!(f, "{}", s)
    }
}

/// Foreign key referential action configuration, attached to a field
/// descriptor's `foreign_key` spec.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostgresForeignKey {
    pub target_table: String,
    pub target_column: String,
    #[serde(default)]
    pub on_delete: ForeignKeyAction,
    #[serde(default)]
    pub on_update: ForeignKeyAction,
}

impl PostgresForeignKey {
    pub fn new(target_table: impl Into<String>, target_column: impl Into<String>) -> Self {
        Self {
            target_table: target_table.into(),
            target_column: target_column.into(),
            on_delete: ForeignKeyAction::NoAction,
            on_update: ForeignKeyAction::NoAction,
        }
    }

    pub fn on_delete(mut self, action: ForeignKeyAction) -> Self {
        self.on_delete = action;
        self
    }

    pub fn on_update(mut self, action: ForeignKeyAction) -> Self {
        self.on_update = action;
        self
    }
}

/// Per-field PostgreSQL configuration overriding the default rendering for
/// datetime, time and full-text-indexed columns. Attached via
/// `FieldDescriptor::postgres_config`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PostgresFieldConfig {
    DateTime { timezone: bool },
    Time { timezone: bool },
    FullText { language: String, weight: String },
}

impl PostgresFieldConfig {
    pub fn date_time(timezone: bool) -> Self {
        PostgresFieldConfig::DateTime { timezone }
    }

    pub fn time(timezone: bool) -> Self {
        PostgresFieldConfig::Time { timezone }
    }

    pub fn full_text(language: impl Into<String>, weight: impl Into<String>) -> Self {
        PostgresFieldConfig::FullText {
            language: language.into(),
            weight: weight.into(),
        }
    }
}

impl Default for PostgresFieldConfig {
    fn default() -> Self {
        PostgresFieldConfig::DateTime { timezone: false }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_type_renders_tz_variants() {
        assert_eq!(ColumnType::Timestamp { with_timezone: true }.to_string(), "TIMESTAMP WITH TIME ZONE");
        assert_eq!(ColumnType::Timestamp { with_timezone: false }.to_string(), "TIMESTAMP");
    }

    #[test]
    fn foreign_key_action_defaults_to_no_action() {
        let fk = PostgresForeignKey::new("users", "id");
        assert_eq!(fk.on_delete, ForeignKeyAction::NoAction);
        assert_eq!(fk.on_update, ForeignKeyAction::NoAction);
    }
}
