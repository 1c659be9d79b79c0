//! The query builder: a single branching builder over SELECT, UPDATE and
//! DELETE intent that renders to `(sql_text, params)` with a single ascending
//! `$n` parameter counter.
//!
//! Every mutating method takes `self` by value and returns a new builder —
//! there is no in-place mutation. A caller who wants two independent
//! refinements of the same base clones the base first:
//!
//! ```ignore
//! let base = QueryBuilder::select(vec![SelectItem::table(&user_table)]);
//! let by_name = base.clone().where_(name_eq);
//! let by_age = base.where_(age_gt);
//! // by_name and by_age do not see each other's WHERE clause.
//! ```

use crate::error::{Error, Result};
use crate::expr::{ColumnRef, Comparison, ComparisonGroup, FunctionMeta, GroupKind, Value};
use crate::types::{JoinType, SortOrder};
use crate::utils::Utils;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum QueryKind {
    Select,
    Update,
    Delete,
}

/// A single SELECT list entry; `select_raw` is kept in lockstep with its
/// rendered text so result decoding knows what each returned column is.
#[derive(Debug, Clone)]
pub enum SelectItem {
    Column(ColumnRef),
    /// Whole-table select: renders as `"t".*`.
    Table(String),
    Function(FunctionMeta),
}

impl SelectItem {
    pub fn column(col: ColumnRef) -> Self {
        SelectItem::Column(col)
    }

    pub fn table(name: impl Into<String>) -> Self {
        SelectItem::Table(name.into())
    }

    pub fn function(meta: FunctionMeta) -> Self {
        SelectItem::Function(meta)
    }

    fn owning_table(&self) -> Option<&str> {
        match self {
            SelectItem::Column(c) => Some(&c.table),
            SelectItem::Table(t) => Some(t),
            SelectItem::Function(f) => f.original_field.as_ref().map(|c| c.table.as_str()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct JoinClause {
    pub kind: JoinType,
    pub table: String,
    pub on: Comparison,
}

#[derive(Debug, Clone)]
pub enum OrderTarget {
    Column(ColumnRef),
    Raw(String),
}

#[derive(Debug, Clone, Default)]
pub struct QueryBuilder {
    query_type: Option<QueryKind>,
    main_table: Option<String>,

    select_raw: Vec<SelectItem>,
    joins: Vec<JoinClause>,
    where_conditions: Vec<ComparisonGroup>,
    group_by: Vec<ColumnRef>,
    having: Vec<Comparison>,
    order_by: Vec<(OrderTarget, SortOrder)>,
    distinct_on: Vec<ColumnRef>,
    limit: Option<i64>,
    offset: Option<i64>,
    update_set: Vec<(ColumnRef, Value)>,
    text_override: Option<(String, Vec<Value>)>,
}

impl QueryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a SELECT. `fields` must be non-empty; the main table is derived
    /// from the first field's owning table.
    pub fn select(fields: Vec<SelectItem>) -> Result<Self> {
        let mut qb = Self::new();
        qb.query_type = Some(QueryKind::Select);
        if let Some(first) = fields.first() {
            qb.main_table = first.owning_table().map(|s| s.to_string());
        }
        for field in fields {
            if let SelectItem::Function(meta) = &field {
                if qb.main_table.is_none() {
                    qb.main_table = meta.original_field.as_ref().map(|c| c.table.clone());
                }
            }
            qb.select_raw.push(field);
        }
        Ok(qb)
    }

    pub fn update(table: impl Into<String>) -> Self {
        let mut qb = Self::new();
        qb.query_type = Some(QueryKind::Update);
        qb.main_table = Some(table.into());
        qb
    }

    pub fn delete(table: impl Into<String>) -> Self {
        let mut qb = Self::new();
        qb.query_type = Some(QueryKind::Delete);
        qb.main_table = Some(table.into());
        qb
    }

    /// Bypass the builder entirely; `build()` returns this verbatim.
    pub fn text(mut self, sql: impl Into<String>, params: Vec<Value>) -> Self {
        self.text_override = Some((sql.into(), params));
        self
    }

    pub fn where_(mut self, condition: impl Into<ComparisonGroup>) -> Self {
        self.where_conditions.push(condition.into());
        self
    }

    pub fn join(mut self, kind: JoinType, table: impl Into<String>, on: Comparison) -> Self {
        self.joins.push(JoinClause {
            kind,
            table: table.into(),
            on,
        });
        self
    }

    pub fn order_by(mut self, column: ColumnRef, direction: SortOrder) -> Self {
        self.order_by.push((OrderTarget::Column(column), direction));
        self
    }

    pub fn order_by_raw(mut self, fragment: impl Into<String>, direction: SortOrder) -> Self {
        self.order_by.push((OrderTarget::Raw(fragment.into()), direction));
        self
    }

    pub fn group_by(mut self, columns: Vec<ColumnRef>) -> Self {
        self.group_by.extend(columns);
        self
    }

    pub fn having(mut self, condition: Comparison) -> Self {
        self.having.push(condition);
        self
    }

    pub fn distinct_on(mut self, columns: Vec<ColumnRef>) -> Self {
        self.distinct_on.extend(columns);
        self
    }

    pub fn limit(mut self, n: i64) -> Self {
        self.limit = Some(n);
        self
    }

    pub fn offset(mut self, n: i64) -> Self {
        self.offset = Some(n);
        self
    }

    /// Only meaningful on an UPDATE builder.
    pub fn set(mut self, column: ColumnRef, value: impl Into<Value>) -> Self {
        self.update_set.push((column, value.into()));
        self
    }

    pub fn build(&self) -> Result<(String, Vec<Value>)> {
        if let Some((sql, params)) = &self.text_override {
            return Ok((sql.clone(), params.clone()));
        }

        match self.query_type {
            Some(QueryKind::Select) => self.build_select(),
            Some(QueryKind::Update) => self.build_update(),
            Some(QueryKind::Delete) => self.build_delete(),
            None => Err(Error::incomplete_query("no query type set (call select/update/delete)")),
        }
    }

    fn build_select(&self) -> Result<(String, Vec<Value>)> {
        if self.select_raw.is_empty() {
            return Err(Error::incomplete_query("SELECT has no fields"));
        }
        let main_table = self
            .main_table
            .as_ref()
            .ok_or_else(|| Error::incomplete_query("SELECT could not determine a main table"))?;

        let mut params = Vec::new();
        let mut sql = String::from("SELECT ");

        if !self.distinct_on.is_empty() {
            let cols = self
                .distinct_on
                .iter()
                .map(|c| c.token().render())
                .collect::<Vec<_>>()
                .join(", ");
            sql.push_str(&format!("DISTINCT ON ({}) ", cols));
        }

        let fields = render_select_list(&self.select_raw);
        sql.push_str(&fields.join(", "));
        sql.push_str(&format!(" FROM {}", Utils::quote_identifier(main_table)));

        for join in &self.joins {
            sql.push_str(&format!(
                " {} {} ON {}",
                join.kind,
                Utils::quote_identifier(&join.table),
                join.on.render(&mut params)
            ));
        }

        if !self.where_conditions.is_empty() {
            sql.push_str(&format!(" WHERE {}", render_where(&self.where_conditions, &mut params)));
        }

        if !self.group_by.is_empty() {
            let cols = self
                .group_by
                .iter()
                .map(|c| c.token().render())
                .collect::<Vec<_>>()
                .join(", ");
            sql.push_str(&format!(" GROUP BY {}", cols));
        }

        if !self.having.is_empty() {
            let rendered = self
                .having
                .iter()
                .map(|c| c.render(&mut params))
                .collect::<Vec<_>>()
                .join(" AND ");
            sql.push_str(&format!(" HAVING {}", rendered));
        }

        if !self.order_by.is_empty() {
            let rendered = self
                .order_by
                .iter()
                .map(|(target, dir)| {
                    let t = match target {
                        OrderTarget::Column(c) => c.token().render(),
                        OrderTarget::Raw(r) => r.clone(),
                    };
                    format!("{} {}", t, dir)
                })
                .collect::<Vec<_>>()
                .join(", ");
            sql.push_str(&format!(" ORDER BY {}", rendered));
        }

        if let Some(n) = self.limit {
            sql.push_str(&format!(" LIMIT {}", n));
        }
        if let Some(n) = self.offset {
            sql.push_str(&format!(" OFFSET {}", n));
        }

        Ok((sql, params))
    }

    fn build_update(&self) -> Result<(String, Vec<Value>)> {
        let table = self
            .main_table
            .as_ref()
            .ok_or_else(|| Error::incomplete_query("UPDATE has no target table"))?;
        if self.update_set.is_empty() {
            return Err(Error::incomplete_query("UPDATE has an empty SET clause"));
        }

        let mut params = Vec::new();
        let mut sets = Vec::with_capacity(self.update_set.len());
        for (col, value) in &self.update_set {
            params.push(value.clone());
            sets.push(format!("{} = ${}", Utils::quote_identifier(&col.column), params.len()));
        }

        let mut sql = format!("UPDATE {} SET {}", Utils::quote_identifier(table), sets.join(", "));
        if !self.where_conditions.is_empty() {
            sql.push_str(&format!(" WHERE {}", render_where(&self.where_conditions, &mut params)));
        }
        Ok((sql, params))
    }

    fn build_delete(&self) -> Result<(String, Vec<Value>)> {
        let table = self
            .main_table
            .as_ref()
            .ok_or_else(|| Error::incomplete_query("DELETE has no target table"))?;

        let mut params = Vec::new();
        let mut sql = format!("DELETE FROM {}", Utils::quote_identifier(table));
        if !self.where_conditions.is_empty() {
            sql.push_str(&format!(" WHERE {}", render_where(&self.where_conditions, &mut params)));
        }
        Ok((sql, params))
    }
}

/// Render the SELECT list, assigning `aggregate_<k>` aliases to any function
/// metadata as it is encountered (mutating a local copy — the caller's
/// `select_raw` keeps its original unaliased metas, which is fine since the
/// alias is only needed for this render pass and for HAVING to reference).
fn render_select_list(items: &[SelectItem]) -> Vec<String> {
    let mut counter = 0usize;
    let mut fields = Vec::with_capacity(items.len());
    for item in items {
        match item {
            SelectItem::Column(c) => fields.push(c.token().render()),
            SelectItem::Table(t) => fields.push(format!("{}.*", Utils::quote_identifier(t))),
            SelectItem::Function(meta) => {
                let alias = format!("aggregate_{}", counter);
                counter += 1;
                fields.push(format!("{} AS {}", meta.sql_literal, alias));
            }
        }
    }
    fields
}

fn render_where(conditions: &[ComparisonGroup], params: &mut Vec<Value>) -> String {
    let group = ComparisonGroup::Group {
        kind: GroupKind::And,
        elements: conditions.to_vec(),
    };
    group.render(params)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::StaticType;

    fn id_col() -> ColumnRef {
        ColumnRef::new("userdemo", "id", StaticType::Integer)
    }

    #[test]
    fn whole_table_select_renders_star() {
        let qb = QueryBuilder::select(vec![SelectItem::table("userdemo")]).unwrap();
        let (sql, params) = qb.build().unwrap();
        assert_eq!(sql, "SELECT \"userdemo\".* FROM \"userdemo\"");
        assert!(params.is_empty());
    }

    #[test]
    fn where_gt_renders_single_placeholder() {
        let qb = QueryBuilder::select(vec![SelectItem::table("userdemo")])
            .unwrap()
            .where_(id_col().gt(0));
        let (sql, params) = qb.build().unwrap();
        assert_eq!(sql, "SELECT \"userdemo\".* FROM \"userdemo\" WHERE \"userdemo\".\"id\" > $1");
        assert_eq!(params, vec![Value::Int(0)]);
    }

    #[test]
    fn column_to_column_where_has_no_params() {
        let name = ColumnRef::new("userdemo", "name", StaticType::Text);
        let email = ColumnRef::new("userdemo", "email", StaticType::Text);
        let qb = QueryBuilder::select(vec![SelectItem::column(ColumnRef::new(
            "userdemo", "id", StaticType::Integer,
        ))])
        .unwrap()
        .where_(name.eq(email));
        let (sql, params) = qb.build().unwrap();
        assert_eq!(
            sql,
            "SELECT \"userdemo\".\"id\" FROM \"userdemo\" WHERE \"userdemo\".\"name\" = \"userdemo\".\"email\""
        );
        assert!(params.is_empty());
    }

    #[test]
    fn aggregate_in_select_gets_alias_and_group_by_renders() {
        use crate::functions::Func;

        let name = ColumnRef::new("userdemo", "name", StaticType::Text);
        let qb = QueryBuilder::select(vec![
            SelectItem::column(name.clone()),
            SelectItem::function(Func::count(ColumnRef::new("userdemo", "id", StaticType::Integer))),
        ])
        .unwrap()
        .group_by(vec![name]);
        let (sql, params) = qb.build().unwrap();
        assert_eq!(
            sql,
            "SELECT \"userdemo\".\"name\", count(\"userdemo\".\"id\") AS aggregate_0 FROM \"userdemo\" GROUP BY \"userdemo\".\"name\""
        );
        assert!(params.is_empty());
    }

    #[test]
    fn branching_refinements_are_independent() {
        let base = QueryBuilder::select(vec![SelectItem::table("userdemo")]).unwrap();
        let by_id = base.clone().where_(id_col().eq(1));
        let sorted = base.order_by(id_col(), SortOrder::Desc);

        let (sql_by_id, _) = by_id.build().unwrap();
        let (sql_sorted, _) = sorted.build().unwrap();

        assert!(sql_by_id.contains("WHERE"));
        assert!(!sql_sorted.contains("WHERE"));
        assert!(sql_sorted.contains("ORDER BY"));
        assert!(!sql_by_id.contains("ORDER BY"));
    }

    #[test]
    fn update_renders_set_then_where_with_continuous_numbering() {
        let name = ColumnRef::new("userdemo", "name", StaticType::Text);
        let qb = QueryBuilder::update("userdemo")
            .set(name, "alice")
            .where_(id_col().eq(5));
        let (sql, params) = qb.build().unwrap();
        assert_eq!(
            sql,
            "UPDATE \"userdemo\" SET \"name\" = $1 WHERE \"userdemo\".\"id\" = $2"
        );
        assert_eq!(params, vec![Value::Text("alice".to_string()), Value::Int(5)]);
    }

    #[test]
    fn delete_renders_without_select_list() {
        let qb = QueryBuilder::delete("userdemo").where_(id_col().eq(5));
        let (sql, params) = qb.build().unwrap();
        assert_eq!(sql, "DELETE FROM \"userdemo\" WHERE \"userdemo\".\"id\" = $1");
        assert_eq!(params, vec![Value::Int(5)]);
    }

    #[test]
    fn empty_select_list_is_incomplete() {
        let err = QueryBuilder::select(vec![]).unwrap().build().unwrap_err();
        assert!(matches!(err, Error::IncompleteQuery { .. }));
    }

    #[test]
    fn empty_update_set_is_incomplete() {
        let err = QueryBuilder::update("userdemo").build().unwrap_err();
        assert!(matches!(err, Error::IncompleteQuery { .. }));
    }

    #[test]
    fn text_override_is_returned_verbatim() {
        let qb = QueryBuilder::new().text("SELECT 1", vec![]);
        let (sql, params) = qb.build().unwrap();
        assert_eq!(sql, "SELECT 1");
        assert!(params.is_empty());
    }
}
