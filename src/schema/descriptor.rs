//! Inbound interface: abstract table descriptions handed to the planner by
//! a schema source. Out of scope here is *discovering* these from host
//! language declarations — callers simply construct them.

use crate::types::{ColumnType, PostgresFieldConfig, PostgresForeignKey};

#[derive(Debug, Clone, PartialEq)]
pub enum BaseType {
    Primitive(ColumnType),
    EnumRef { name: String, values: Vec<String> },
    ListOf(Box<BaseType>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldDescriptor {
    pub name: String,
    pub base_type: BaseType,
    pub nullable: bool,
    pub primary_key: bool,
    pub autoincrement: bool,
    pub default: Option<String>,
    pub foreign_key: Option<PostgresForeignKey>,
    pub unique: bool,
    pub index: bool,
    pub check: Option<String>,
    pub postgres_config: Option<PostgresFieldConfig>,
}

impl FieldDescriptor {
    pub fn new(name: impl Into<String>, base_type: BaseType) -> Self {
        Self {
            name: name.into(),
            base_type,
            nullable: false,
            primary_key: false,
            autoincrement: false,
            default: None,
            foreign_key: None,
            unique: false,
            index: false,
            check: None,
            postgres_config: None,
        }
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    pub fn autoincrement(mut self) -> Self {
        self.autoincrement = true;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn index(mut self) -> Self {
        self.index = true;
        self
    }

    pub fn foreign_key(mut self, fk: PostgresForeignKey) -> Self {
        self.foreign_key = Some(fk);
        self
    }

    pub fn check(mut self, expr: impl Into<String>) -> Self {
        self.check = Some(expr.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableDescriptor {
    pub table_name: String,
    pub fields: Vec<FieldDescriptor>,
}

impl TableDescriptor {
    pub fn new(table_name: impl Into<String>, fields: Vec<FieldDescriptor>) -> Self {
        Self {
            table_name: table_name.into(),
            fields,
        }
    }
}
