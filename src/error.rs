// Unified error handling for pgforge: query builder, planner, and CRUD layers.

use thiserror::Error;

/// Comprehensive error type for all pgforge operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Query Builder Errors ===
    /// A value passed to a builder method is not a valid AST node for that position
    /// (e.g. a raw string where a `Comparison` was required).
    #[error("bad argument: {message}")]
    BadArgument {
        message: String,
        context: Option<String>,
    },

    /// `build()` was called on an under-specified query (empty SELECT list, no
    /// UPDATE/DELETE target, empty UPDATE SET).
    #[error("incomplete query: {message}")]
    IncompleteQuery { message: String },

    // === Schema & Migration Planner Errors ===
    /// Two schema descriptors sharing a representation key disagree in
    /// non-unionable content (e.g. an enum redefined with different values).
    #[error("merge conflict on {representation}: {message}")]
    MergeConflict {
        representation: String,
        message: String,
    },

    /// A pointer could not be resolved against any node in the ordering pass.
    #[error("unresolved dependency: {representation}")]
    UnresolvedDependency { representation: String },

    /// A constraint node's `kind` and its payload (fk_spec / check_spec) disagree,
    /// e.g. kind=FOREIGN_KEY with no fk_spec, or kind=UNIQUE with one set.
    #[error("constraint inconsistency on {representation}: {message}")]
    ConstraintInconsistency {
        representation: String,
        message: String,
    },

    // === Database Layer Errors ===
    /// Database connection errors (pool, network, auth)
    #[error("database connection error: {message}")]
    Connection {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// PostgreSQL query execution errors
    #[error("postgresql error: {message}")]
    PostgreSql {
        message: String,
        code: Option<String>,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Connection pool errors (timeout, exhausted, etc.)
    #[error("connection pool error: {message}")]
    Pool {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    // === Data Handling Errors ===
    /// JSON serialization/deserialization errors
    #[error("serialization error: {message}")]
    Serialization {
        message: String,
        field: Option<String>,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Data validation errors (constraints, formats, etc.)
    #[error("validation error: {message}")]
    Validation {
        message: String,
        field: Option<String>,
        value: Option<String>,
    },

    /// Type conversion errors
    #[error("type conversion error: {message}")]
    TypeConversion {
        message: String,
        from_type: String,
        to_type: String,
    },

    /// Pagination parameter errors
    #[error("pagination error: {message}")]
    Pagination {
        message: String,
        page: Option<u32>,
        per_page: Option<u32>,
    },

    // === CRUD Operation Errors ===
    /// Record not found errors
    #[error("record not found: {message}")]
    NotFound {
        message: String,
        table: Option<String>,
        key: Option<String>,
    },

    /// CRUD operation errors (insert, update, delete)
    #[error("operation error: {message}")]
    Operation {
        message: String,
        operation: String,
        table: Option<String>,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    // === Configuration Errors ===
    /// Database connection configuration errors
    #[error("configuration error: {message}")]
    Config {
        message: String,
        parameter: Option<String>,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Internal invariant violations that should never surface to callers.
    #[error("internal error: {message}")]
    Internal {
        message: String,
        location: Option<String>,
    },
}

// === Error Construction Helper Methods ===
impl Error {
    pub fn bad_argument(message: impl Into<String>) -> Self {
        Self::BadArgument {
            message: message.into(),
            context: None,
        }
    }

    pub fn bad_argument_in(message: impl Into<String>, context: impl Into<String>) -> Self {
        Self::BadArgument {
            message: message.into(),
            context: Some(context.into()),
        }
    }

    pub fn incomplete_query(message: impl Into<String>) -> Self {
        Self::IncompleteQuery {
            message: message.into(),
        }
    }

    pub fn merge_conflict(representation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::MergeConflict {
            representation: representation.into(),
            message: message.into(),
        }
    }

    pub fn unresolved_dependency(representation: impl Into<String>) -> Self {
        Self::UnresolvedDependency {
            representation: representation.into(),
        }
    }

    pub fn constraint_inconsistency(
        representation: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::ConstraintInconsistency {
            representation: representation.into(),
            message: message.into(),
        }
    }

    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
            source: None,
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            parameter: None,
            source: None,
        }
    }

    pub fn postgres(message: impl Into<String>, code: Option<String>) -> Self {
        Self::PostgreSql {
            message: message.into(),
            code,
            source: None,
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            field: None,
            value: None,
        }
    }

    pub fn validation_field(
        message: impl Into<String>,
        field: impl Into<String>,
        value: Option<String>,
    ) -> Self {
        Self::Validation {
            message: message.into(),
            field: Some(field.into()),
            value,
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
            table: None,
            key: None,
        }
    }

    pub fn not_found_record(
        message: impl Into<String>,
        table: impl Into<String>,
        key: impl Into<String>,
    ) -> Self {
        Self::NotFound {
            message: message.into(),
            table: Some(table.into()),
            key: Some(key.into()),
        }
    }

    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
            field: None,
            source: None,
        }
    }

    pub fn type_conversion(
        message: impl Into<String>,
        from_type: impl Into<String>,
        to_type: impl Into<String>,
    ) -> Self {
        Self::TypeConversion {
            message: message.into(),
            from_type: from_type.into(),
            to_type: to_type.into(),
        }
    }

    pub fn pagination(message: impl Into<String>, page: Option<u32>, per_page: Option<u32>) -> Self {
        Self::Pagination {
            message: message.into(),
            page,
            per_page,
        }
    }

    pub fn operation(message: impl Into<String>, operation: impl Into<String>, table: Option<String>) -> Self {
        Self::Operation {
            message: message.into(),
            operation: operation.into(),
            table,
            source: None,
        }
    }

    pub fn internal(message: impl Into<String>, location: Option<String>) -> Self {
        Self::Internal {
            message: message.into(),
            location,
        }
    }
}

// === From Implementations for External Error Types ===

impl From<tokio_postgres::Error> for Error {
    fn from(err: tokio_postgres::Error) -> Self {
        let code = err.code().map(|c| c.code().to_string());
        Self::PostgreSql {
            message: err.to_string(),
            code,
            source: Some(Box::new(err)),
        }
    }
}

impl From<deadpool_postgres::PoolError> for Error {
    fn from(err: deadpool_postgres::PoolError) -> Self {
        Self::Pool {
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            message: err.to_string(),
            field: None,
            source: Some(Box::new(err)),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::Internal {
            message: err.to_string(),
            location: Some("io".to_string()),
        }
    }
}

impl From<chrono::ParseError> for Error {
    fn from(err: chrono::ParseError) -> Self {
        Self::TypeConversion {
            message: format!("datetime parsing failed: {}", err),
            from_type: "str".to_string(),
            to_type: "DateTime<Utc>".to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
