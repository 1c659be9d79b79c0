//! The `Model` trait: the manual seam a caller implements to get CRUD
//! operations for a Rust type. Unlike a macro-derived schema source, nothing
//! here discovers fields from a struct declaration — callers hand-write
//! `to_row`/`from_row`/`table_name` themselves.

use indexmap::IndexMap;

use crate::error::{Error, Result};
use crate::expr::{ColumnRef, Value};

/// A type that can be persisted through `CrudOperations`. Implement this by
/// hand for each table-backed struct; there is no derive macro (discovering
/// fields from host-language class declarations is explicitly out of scope).
pub trait Model: Sized + Send + Sync {
    fn table_name() -> &'static str;

    fn primary_key_field() -> &'static str {
        "id"
    }

    /// Column name used by `find_latest`/`find_first`-style helpers; `None`
    /// disables them for tables without a creation timestamp.
    fn created_at_field() -> Option<&'static str> {
        None
    }

    /// Column whose value is always replaced with `NOW()` at update time,
    /// overriding whatever the model holds.
    fn updated_at_field() -> Option<&'static str> {
        None
    }

    fn unique_fields() -> Vec<&'static str> {
        Vec::new()
    }

    /// Columns participating in the primary key, used to build `ColumnRef`s
    /// for WHERE clauses; defaults to a single column named by
    /// `primary_key_field`.
    fn primary_key_columns() -> Vec<&'static str> {
        vec![Self::primary_key_field()]
    }

    fn get_primary_key(&self) -> Option<Value>;

    /// Serialize to an ordered column-name -> value map. Column order in the
    /// returned map determines INSERT column order.
    fn to_row(&self) -> Result<IndexMap<String, Value>>;

    fn from_row(row: IndexMap<String, Value>) -> Result<Self>;

    fn column(name: &'static str, static_type: crate::expr::StaticType) -> ColumnRef {
        ColumnRef::new(Self::table_name(), name, static_type)
    }
}

/// Build an `IndexMap<String, Value>` from a `tokio_postgres::Row`, in the
/// row's own column order, by column name; used by `from_row`
/// implementations and by `CrudOperations` itself when it needs to inspect a
/// raw row (e.g. `upsert`'s existence check).
pub fn row_to_map(row: &tokio_postgres::Row) -> Result<IndexMap<String, Value>> {
    let mut map = IndexMap::new();
    for (i, column) in row.columns().iter().enumerate() {
        let value = value_from_row(row, i, column.type_())?;
        map.insert(column.name().to_string(), value);
    }
    Ok(map)
}

fn value_from_row(row: &tokio_postgres::Row, idx: usize, ty: &tokio_postgres::types::Type) -> Result<Value> {
    use tokio_postgres::types::Type;

    let convert = |field: &str| Error::type_conversion(format!("failed to decode column {}", field), ty.name(), "Value");

    let value = match *ty {
        Type::BOOL => row.try_get::<_, Option<bool>>(idx).map_err(|_| convert("bool"))?.map(Value::Bool),
        Type::INT2 => row.try_get::<_, Option<i16>>(idx).map_err(|_| convert("int2"))?.map(|v| Value::Int(v as i64)),
        Type::INT4 => row.try_get::<_, Option<i32>>(idx).map_err(|_| convert("int4"))?.map(|v| Value::Int(v as i64)),
        Type::INT8 => row.try_get::<_, Option<i64>>(idx).map_err(|_| convert("int8"))?.map(Value::Int),
        Type::FLOAT4 => row.try_get::<_, Option<f32>>(idx).map_err(|_| convert("float4"))?.map(|v| Value::Float(v as f64)),
        Type::FLOAT8 => row.try_get::<_, Option<f64>>(idx).map_err(|_| convert("float8"))?.map(Value::Float),
        Type::TEXT | Type::VARCHAR => {
            row.try_get::<_, Option<String>>(idx).map_err(|_| convert("text"))?.map(Value::Text)
        }
        Type::UUID => row.try_get::<_, Option<uuid::Uuid>>(idx).map_err(|_| convert("uuid"))?.map(Value::Uuid),
        Type::TIMESTAMPTZ => row
            .try_get::<_, Option<chrono::DateTime<chrono::Utc>>>(idx)
            .map_err(|_| convert("timestamptz"))?
            .map(Value::Timestamp),
        Type::DATE => row.try_get::<_, Option<chrono::NaiveDate>>(idx).map_err(|_| convert("date"))?.map(Value::Date),
        Type::TIME => row.try_get::<_, Option<chrono::NaiveTime>>(idx).map_err(|_| convert("time"))?.map(Value::Time),
        Type::JSON | Type::JSONB => row
            .try_get::<_, Option<serde_json::Value>>(idx)
            .map_err(|_| convert("json"))?
            .map(Value::Json),
        Type::BYTEA => row.try_get::<_, Option<Vec<u8>>>(idx).map_err(|_| convert("bytea"))?.map(Value::Bytes),
        _ => row.try_get::<_, Option<String>>(idx).map_err(|_| convert("fallback"))?.map(Value::Text),
    };

    Ok(value.unwrap_or(Value::Null))
}
