//! CRUD execution layer: turns a `Model` plus a `Database` into actual
//! INSERT/SELECT/UPDATE/DELETE round trips. INSERT is hand-assembled here
//! rather than routed through `QueryBuilder`, matching the query language's
//! SELECT/UPDATE/DELETE-only scope.

use indexmap::IndexMap;
use tracing::{debug, info, trace, warn};

use crate::database::Database;
use crate::error::{Error, Result};
use crate::expr::{ColumnRef, StaticType, Value};
use crate::model::{row_to_map, Model};
use crate::pagination::{PaginatedResult, Pagination};
use crate::query::{QueryBuilder, SelectItem};

/// CRUD operations for `Model`-implementing types. Every operation has a
/// `_with_table` sibling that overrides the table name, so the same model
/// type can back more than one physical table (e.g. sharded or archived
/// copies).
pub struct CrudOperations;

fn pk_column(table: &str, field: &'static str) -> ColumnRef {
    ColumnRef::new(table, field, StaticType::Text)
}

fn to_sql_refs(values: &[Value]) -> Vec<Box<dyn tokio_postgres::types::ToSql + Send + Sync>> {
    values.iter().map(Value::to_sql_param).collect()
}

fn as_param_refs(
    boxed: &[Box<dyn tokio_postgres::types::ToSql + Send + Sync>],
) -> Vec<&(dyn tokio_postgres::types::ToSql + Send + Sync)> {
    boxed.iter().map(|b| b.as_ref()).collect()
}

impl CrudOperations {
    pub async fn insert<T: Model>(model: &T, db: &Database) -> Result<()> {
        Self::insert_with_table(model, db, T::table_name()).await
    }

    pub async fn insert_with_table<T: Model>(model: &T, db: &Database, table_name: &str) -> Result<()> {
        let row = model.to_row()?;
        let columns: Vec<&String> = row.keys().collect();
        let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("${}", i)).collect();

        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            table_name,
            columns.iter().map(|c| c.as_str()).collect::<Vec<_>>().join(", "),
            placeholders.join(", ")
        );
        debug!(sql = %sql, table = table_name, "executing insert");

        let values: Vec<Value> = columns.iter().map(|c| row[c.as_str()].clone()).collect();
        let boxed = to_sql_refs(&values);
        db.execute(&sql, &as_param_refs(&boxed)).await?;

        debug!(table = table_name, "record created");
        Ok(())
    }

    /// Insert when the model has no primary key set, update otherwise.
    pub async fn insert_or_update<T: Model + Clone>(model: &T, db: &Database) -> Result<()> {
        Self::insert_or_update_with_table(model, db, T::table_name()).await
    }

    pub async fn insert_or_update_with_table<T: Model + Clone>(model: &T, db: &Database, table_name: &str) -> Result<()> {
        match model.get_primary_key() {
            Some(pk) => match Self::find_by_pk_with_table::<T>(&pk, db, table_name).await? {
                Some(_) => Self::update_with_table(model, db, table_name).await,
                None => {
                    warn!(table = table_name, "primary key set but no matching record, inserting");
                    Self::insert_with_table(model, db, table_name).await
                }
            },
            None => {
                trace!(table = table_name, "no primary key, inserting");
                Self::insert_with_table(model, db, table_name).await
            }
        }
    }

    pub async fn find_by_id<T: Model>(id: impl Into<Value>, db: &Database) -> Result<Option<T>> {
        Self::find_by_id_with_table(id, db, T::table_name()).await
    }

    pub async fn find_by_id_with_table<T: Model>(id: impl Into<Value>, db: &Database, table_name: &str) -> Result<Option<T>> {
        Self::find_by_pk_with_table(&id.into(), db, table_name).await
    }

    async fn find_by_pk_with_table<T: Model>(id: &Value, db: &Database, table_name: &str) -> Result<Option<T>> {
        let builder = QueryBuilder::select(vec![SelectItem::table(table_name)])?
            .where_(pk_column(table_name, T::primary_key_field()).eq(id.clone()))
            .limit(1);

        let row = Self::fetch_one(&builder, db).await?;
        row.map(T::from_row).transpose()
    }

    pub async fn find_all<T: Model>(db: &Database) -> Result<Vec<T>> {
        Self::find_all_with_table(db, T::table_name()).await
    }

    pub async fn find_all_with_table<T: Model>(db: &Database, table_name: &str) -> Result<Vec<T>> {
        let builder = QueryBuilder::select(vec![SelectItem::table(table_name)])?;
        Self::fetch_all(&builder, db).await?.into_iter().map(T::from_row).collect()
    }

    pub async fn find_where<T: Model>(builder: QueryBuilder, db: &Database) -> Result<Vec<T>> {
        Self::fetch_all(&builder, db).await?.into_iter().map(T::from_row).collect()
    }

    pub async fn find_one<T: Model>(builder: QueryBuilder, db: &Database) -> Result<Option<T>> {
        let row = Self::fetch_one(&builder.limit(1), db).await?;
        row.map(T::from_row).transpose()
    }

    pub async fn count<T: Model>(db: &Database) -> Result<u64> {
        Self::count_with_table::<T>(db, T::table_name()).await
    }

    pub async fn count_with_table<T: Model>(db: &Database, table_name: &str) -> Result<u64> {
        let sql = format!("SELECT COUNT(*) FROM {}", crate::utils::Utils::quote_identifier(table_name));
        let rows = db.query(&sql, &[]).await?;
        let count: i64 = rows.first().map(|r| r.get(0)).unwrap_or(0);
        Ok(count as u64)
    }

    pub async fn count_where(builder: QueryBuilder, db: &Database) -> Result<u64> {
        let (sql, params) = builder.build()?;
        let count_sql = wrap_count_sql(&sql);
        let boxed = to_sql_refs(&params);
        let rows = db.query(&count_sql, &as_param_refs(&boxed)).await?;
        let count: i64 = rows.first().map(|r| r.get(0)).unwrap_or(0);
        Ok(count as u64)
    }

    pub async fn exists<T: Model>(db: &Database) -> Result<bool> {
        Ok(Self::count::<T>(db).await? > 0)
    }

    pub async fn update<T: Model>(model: &T, db: &Database) -> Result<()> {
        Self::update_with_table(model, db, T::table_name()).await
    }

    pub async fn update_with_table<T: Model>(model: &T, db: &Database, table_name: &str) -> Result<()> {
        let pk = model
            .get_primary_key()
            .ok_or_else(|| Error::validation("cannot update a record without a primary key"))?;

        let mut row = model.to_row()?;
        let pk_field = T::primary_key_field();
        row.shift_remove(pk_field);

        if let Some(updated_at_field) = T::updated_at_field() {
            row.shift_remove(updated_at_field);
        }

        if row.is_empty() {
            return Err(Error::validation("update has no columns to set"));
        }

        let mut builder = QueryBuilder::update(table_name);
        for (column, value) in row {
            builder = builder.set(ColumnRef::new(table_name, column, StaticType::Text), value);
        }
        builder = builder.where_(pk_column(table_name, pk_field).eq(pk.clone()));

        let (mut sql, params) = builder.build()?;
        if let Some(updated_at_field) = T::updated_at_field() {
            sql = append_now_assignment(&sql, updated_at_field);
        }

        info!(table = table_name, "updating record");
        let boxed = to_sql_refs(&params);
        db.execute(&sql, &as_param_refs(&boxed)).await?;
        Ok(())
    }

    pub async fn delete<T: Model>(model: &T, db: &Database) -> Result<bool> {
        Self::delete_with_table(model, db, T::table_name()).await
    }

    pub async fn delete_with_table<T: Model>(model: &T, db: &Database, table_name: &str) -> Result<bool> {
        let pk = model
            .get_primary_key()
            .ok_or_else(|| Error::validation("cannot delete a record without a primary key"))?;

        let builder = QueryBuilder::delete(table_name).where_(pk_column(table_name, T::primary_key_field()).eq(pk));
        let (sql, params) = builder.build()?;
        info!(table = table_name, "deleting record");
        let boxed = to_sql_refs(&params);
        let affected = db.execute(&sql, &as_param_refs(&boxed)).await?;
        Ok(affected > 0)
    }

    pub async fn delete_where(builder: QueryBuilder, db: &Database) -> Result<u64> {
        let (sql, params) = builder.build()?;
        let boxed = to_sql_refs(&params);
        db.execute(&sql, &as_param_refs(&boxed)).await
    }

    pub async fn find_paginated<T: Model>(base: QueryBuilder, pagination: &Pagination, db: &Database) -> Result<PaginatedResult<T>> {
        let total = Self::count_where(base.clone(), db).await?;
        let builder = base.limit(pagination.limit()).offset(pagination.offset());
        let rows = Self::find_where::<T>(builder, db).await?;
        Ok(PaginatedResult::with_total(rows, pagination.clone(), total))
    }

    async fn fetch_all(builder: &QueryBuilder, db: &Database) -> Result<Vec<IndexMap<String, Value>>> {
        let (sql, params) = builder.build()?;
        trace!(sql = %sql, "executing query");
        let boxed = to_sql_refs(&params);
        let rows = db.query(&sql, &as_param_refs(&boxed)).await?;
        rows.iter().map(row_to_map).collect()
    }

    async fn fetch_one(builder: &QueryBuilder, db: &Database) -> Result<Option<IndexMap<String, Value>>> {
        let (sql, params) = builder.build()?;
        trace!(sql = %sql, "executing query");
        let boxed = to_sql_refs(&params);
        let row = db.query_opt(&sql, &as_param_refs(&boxed)).await?;
        row.as_ref().map(row_to_map).transpose()
    }
}

/// Rewrite `col = $k` for `field` into `col = NOW()` and compact the
/// remaining placeholder numbering. `update_with_table` always binds the
/// updated-at column last among the SET clauses (it was removed from `row`
/// before building, so no placeholder for it exists); this only needs to
/// insert the literal assignment into the SET list.
/// Wrap an already-rendered SELECT as a subquery counted row-by-row, rather
/// than string-surgering its select list (which would leave the original
/// fields in place alongside an injected `1`, producing invalid SQL).
fn wrap_count_sql(sql: &str) -> String {
    format!("SELECT COUNT(*) FROM ({}) AS counted", sql)
}

fn append_now_assignment(sql: &str, field: &str) -> String {
    if let Some(where_pos) = sql.find(" WHERE ") {
        let (head, tail) = sql.split_at(where_pos);
        format!("{}, {} = NOW(){}", head, crate::utils::Utils::quote_identifier(field), tail)
    } else {
        format!("{}, {} = NOW()", sql, crate::utils::Utils::quote_identifier(field))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_now_assignment_inserts_before_where() {
        let sql = "UPDATE \"t\" SET \"name\" = $1 WHERE \"t\".\"id\" = $2";
        let out = append_now_assignment(sql, "updated_at");
        assert_eq!(
            out,
            "UPDATE \"t\" SET \"name\" = $1, \"updated_at\" = NOW() WHERE \"t\".\"id\" = $2"
        );
    }

    #[test]
    fn append_now_assignment_without_where_clause() {
        let sql = "UPDATE \"t\" SET \"name\" = $1";
        let out = append_now_assignment(sql, "updated_at");
        assert_eq!(out, "UPDATE \"t\" SET \"name\" = $1, \"updated_at\" = NOW()");
    }

    #[test]
    fn wrap_count_sql_preserves_the_original_select_list() {
        let sql = "SELECT \"userdemo\".* FROM \"userdemo\" WHERE \"userdemo\".\"id\" > $1";
        let out = wrap_count_sql(sql);
        assert_eq!(
            out,
            "SELECT COUNT(*) FROM (SELECT \"userdemo\".* FROM \"userdemo\" WHERE \"userdemo\".\"id\" > $1) AS counted"
        );
    }
}
