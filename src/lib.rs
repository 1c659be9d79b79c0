pub mod database;
pub mod error;
pub mod expr;
pub mod functions;
pub mod model;
pub mod operations;
pub mod pagination;
pub mod query;
pub mod schema;
pub mod token;
pub mod types;
pub mod utils;

pub use chrono;
pub use database::{Database, DatabaseConfig};
pub use error::{Error, Result};
pub use expr::{
    and_, or_, CmpOp, ColumnRef, Comparison, ComparisonGroup, ComparisonOperand, ComparisonValue, FunctionMeta,
    GroupKind, StaticType, Value,
};
pub use functions::{Func, IntoOperand};
pub use model::{row_to_map, Model};
pub use operations::CrudOperations;
pub use pagination::{PaginatedResult, Pagination};
pub use query::{JoinClause, OrderTarget, QueryBuilder, SelectItem};
pub use schema::{
    Action, ActionRecorder, BaseType, ColumnNode, ColumnTypeRef, ConstraintArgs, ConstraintNode, Dependency,
    Entry, EnumTypeNode, FieldDescriptor, MigrationPlanner, SchemaNode, Snapshot, TableDescriptor, TableNode,
};
pub use token::Token;
pub use types::{
    ColumnType, ConstraintType, ForeignKeyAction, JoinType, PostgresFieldConfig, PostgresForeignKey, SortOrder,
};
pub use uuid::Uuid;

pub use postgres_types;
pub use tokio_postgres;
