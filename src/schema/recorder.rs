//! Action Recorder: an append-only log of primitive migration actions. It
//! does not execute anything — schema nodes call its methods during
//! `create`/`destroy`/`migrate`, and an external executor later replays
//! `entries` in order, inside a single transaction per migration.

use crate::types::{ColumnType, ConstraintType};
use crate::types::PostgresForeignKey;

#[derive(Debug, Clone, PartialEq)]
pub enum ConstraintArgs {
    ForeignKey(PostgresForeignKey),
    Check(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    AddTable {
        table_name: String,
    },
    DropTable {
        table_name: String,
    },
    AddColumn {
        table_name: String,
        column_name: String,
        explicit_data_type: Option<ColumnType>,
        explicit_data_is_list: bool,
        custom_data_type: Option<String>,
    },
    DropColumn {
        table_name: String,
        column_name: String,
    },
    ModifyColumnType {
        table_name: String,
        column_name: String,
        explicit_data_type: Option<ColumnType>,
        explicit_data_is_list: bool,
        custom_data_type: Option<String>,
    },
    AddNotNull {
        table_name: String,
        column_name: String,
    },
    DropNotNull {
        table_name: String,
        column_name: String,
    },
    AddType {
        type_name: String,
        values: Vec<String>,
    },
    AddTypeValues {
        type_name: String,
        values: Vec<String>,
        referencing_columns: Option<Vec<(String, String)>>,
    },
    DropTypeValues {
        type_name: String,
        values: Vec<String>,
        referencing_columns: Option<Vec<(String, String)>>,
    },
    DropType {
        type_name: String,
    },
    AddConstraint {
        table_name: String,
        constraint: ConstraintType,
        constraint_name: String,
        columns: Vec<String>,
        constraint_args: Option<ConstraintArgs>,
    },
    DropConstraint {
        table_name: String,
        constraint_name: String,
    },
    AddIndex {
        table_name: String,
        columns: Option<Vec<String>>,
        index_name: String,
    },
    DropIndex {
        table_name: String,
        index_name: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Entry {
    Action(Action),
    Comment { text: String, previous_line: bool },
}

/// Append-only recorder. Tests compare `entries` literally, so argument
/// order and shape are part of the contract, not an implementation detail.
#[derive(Debug, Clone, Default)]
pub struct ActionRecorder {
    pub entries: Vec<Entry>,
}

impl ActionRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, action: Action) {
        self.entries.push(Entry::Action(action));
    }

    pub fn add_table(&mut self, table_name: impl Into<String>) {
        self.push(Action::AddTable {
            table_name: table_name.into(),
        });
    }

    pub fn drop_table(&mut self, table_name: impl Into<String>) {
        self.push(Action::DropTable {
            table_name: table_name.into(),
        });
    }

    pub fn add_column(
        &mut self,
        table_name: impl Into<String>,
        column_name: impl Into<String>,
        explicit_data_type: Option<ColumnType>,
        explicit_data_is_list: bool,
        custom_data_type: Option<String>,
    ) {
        self.push(Action::AddColumn {
            table_name: table_name.into(),
            column_name: column_name.into(),
            explicit_data_type,
            explicit_data_is_list,
            custom_data_type,
        });
    }

    pub fn drop_column(&mut self, table_name: impl Into<String>, column_name: impl Into<String>) {
        self.push(Action::DropColumn {
            table_name: table_name.into(),
            column_name: column_name.into(),
        });
    }

    pub fn modify_column_type(
        &mut self,
        table_name: impl Into<String>,
        column_name: impl Into<String>,
        explicit_data_type: Option<ColumnType>,
        explicit_data_is_list: bool,
        custom_data_type: Option<String>,
    ) {
        self.push(Action::ModifyColumnType {
            table_name: table_name.into(),
            column_name: column_name.into(),
            explicit_data_type,
            explicit_data_is_list,
            custom_data_type,
        });
    }

    pub fn add_not_null(&mut self, table_name: impl Into<String>, column_name: impl Into<String>) {
        self.push(Action::AddNotNull {
            table_name: table_name.into(),
            column_name: column_name.into(),
        });
    }

    pub fn drop_not_null(&mut self, table_name: impl Into<String>, column_name: impl Into<String>) {
        self.push(Action::DropNotNull {
            table_name: table_name.into(),
            column_name: column_name.into(),
        });
    }

    pub fn add_type(&mut self, type_name: impl Into<String>, values: Vec<String>) {
        self.push(Action::AddType {
            type_name: type_name.into(),
            values,
        });
    }

    pub fn add_type_values(
        &mut self,
        type_name: impl Into<String>,
        values: Vec<String>,
        referencing_columns: Option<Vec<(String, String)>>,
    ) {
        self.push(Action::AddTypeValues {
            type_name: type_name.into(),
            values,
            referencing_columns,
        });
    }

    pub fn drop_type_values(
        &mut self,
        type_name: impl Into<String>,
        values: Vec<String>,
        referencing_columns: Option<Vec<(String, String)>>,
    ) {
        self.push(Action::DropTypeValues {
            type_name: type_name.into(),
            values,
            referencing_columns,
        });
    }

    pub fn drop_type(&mut self, type_name: impl Into<String>) {
        self.push(Action::DropType {
            type_name: type_name.into(),
        });
    }

    pub fn add_constraint(
        &mut self,
        table_name: impl Into<String>,
        constraint: ConstraintType,
        constraint_name: impl Into<String>,
        columns: Vec<String>,
        constraint_args: Option<ConstraintArgs>,
    ) {
        self.push(Action::AddConstraint {
            table_name: table_name.into(),
            constraint,
            constraint_name: constraint_name.into(),
            columns,
            constraint_args,
        });
    }

    pub fn drop_constraint(&mut self, table_name: impl Into<String>, constraint_name: impl Into<String>) {
        self.push(Action::DropConstraint {
            table_name: table_name.into(),
            constraint_name: constraint_name.into(),
        });
    }

    pub fn add_index(
        &mut self,
        table_name: impl Into<String>,
        columns: Option<Vec<String>>,
        index_name: impl Into<String>,
    ) {
        self.push(Action::AddIndex {
            table_name: table_name.into(),
            columns,
            index_name: index_name.into(),
        });
    }

    pub fn drop_index(&mut self, table_name: impl Into<String>, index_name: impl Into<String>) {
        self.push(Action::DropIndex {
            table_name: table_name.into(),
            index_name: index_name.into(),
        });
    }

    pub fn add_comment(&mut self, text: impl Into<String>, previous_line: bool) {
        self.entries.push(Entry::Comment {
            text: text.into(),
            previous_line,
        });
    }
}
