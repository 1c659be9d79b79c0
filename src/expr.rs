//! Expression AST & field model: column references, comparisons, comparison
//! groups, and function/aggregate metadata. This is the only vocabulary the
//! query builder consumes — nothing renders to SQL except through these
//! types, so adding a new combinator here is the only way to extend what a
//! query can express.

use std::fmt;

use crate::error::{Error, Result};
use crate::token::Token;

/// A coarse runtime tag carried on every `ColumnRef`, used only to restrict
/// which comparison operators are legal for that column (e.g. `LIKE` is only
/// sensible against string-like data). Rust has no way to recover the
/// compile-time type information a macro-based schema source would normally
/// attach, so this is checked at the call site instead, matching the
/// "runtime type error in implementations without that capability" allowance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StaticType {
    Integer,
    Float,
    Text,
    Boolean,
    Timestamp,
    Date,
    Time,
    Uuid,
    Json,
    Bytes,
    Enum,
}

impl StaticType {
    fn is_string_like(self) -> bool {
        matches!(self, StaticType::Text | StaticType::Enum | StaticType::Uuid | StaticType::Json)
    }
}

/// A bound parameter value. `Null` is the sentinel that triggers the
/// EQ->IS / NE->IS_NOT comparison rewrite.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
    Uuid(uuid::Uuid),
    Timestamp(chrono::DateTime<chrono::Utc>),
    Date(chrono::NaiveDate),
    Time(chrono::NaiveTime),
    Json(serde_json::Value),
    IntArray(Vec<i64>),
    TextArray(Vec<String>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Box this value as a `tokio_postgres` bind parameter.
    pub fn to_sql_param(&self) -> Box<dyn tokio_postgres::types::ToSql + Send + Sync> {
        match self {
            Value::Null => Box::new(Option::<String>::None),
            Value::Bool(b) => Box::new(*b),
            Value::Int(i) => Box::new(*i),
            Value::Float(f) => Box::new(*f),
            Value::Text(s) => Box::new(s.clone()),
            Value::Bytes(b) => Box::new(b.clone()),
            Value::Uuid(u) => Box::new(*u),
            Value::Timestamp(dt) => Box::new(*dt),
            Value::Date(d) => Box::new(*d),
            Value::Time(t) => Box::new(*t),
            Value::Json(j) => Box::new(j.clone()),
            Value::IntArray(v) => Box::new(v.clone()),
            Value::TextArray(v) => Box::new(v.clone()),
        }
    }
}

macro_rules! value_from {
    ($variant:ident, $ty:ty) => {
        impl From<$ty> for Value {
            fn from(v: $ty) -> Self {
                Value::$variant(v.into())
            }
        }
    };
}

value_from!(Bool, bool);
value_from!(Int, i64);
value_from!(Int, i32);
value_from!(Float, f64);
value_from!(Text, String);
value_from!(Uuid, uuid::Uuid);
value_from!(Timestamp, chrono::DateTime<chrono::Utc>);
value_from!(Date, chrono::NaiveDate);
value_from!(Time, chrono::NaiveTime);

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl<T> From<Option<T>> for Value
where
    Value: From<T>,
{
    fn from(v: Option<T>) -> Self {
        match v {
            Some(v) => Value::from(v),
            None => Value::Null,
        }
    }
}

/// `(owning_table, column_name, static_type_tag)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ColumnRef {
    pub table: String,
    pub column: String,
    pub static_type: StaticType,
}

impl ColumnRef {
    pub fn new(table: impl Into<String>, column: impl Into<String>, static_type: StaticType) -> Self {
        Self {
            table: table.into(),
            column: column.into(),
            static_type,
        }
    }

    pub fn token(&self) -> Token {
        Token::qualified(&self.table, &self.column)
    }

    fn cmp(&self, op: CmpOp, right: impl Into<ComparisonValue>) -> Comparison {
        let right = right.into();
        let (op, right) = desugar_null(op, right);
        Comparison {
            left: ComparisonOperand::Column(self.clone()),
            op,
            right,
        }
    }

    pub fn eq(&self, right: impl Into<ComparisonValue>) -> Comparison {
        self.cmp(CmpOp::Eq, right)
    }
    pub fn ne(&self, right: impl Into<ComparisonValue>) -> Comparison {
        self.cmp(CmpOp::Ne, right)
    }
    pub fn lt(&self, right: impl Into<ComparisonValue>) -> Comparison {
        self.cmp(CmpOp::Lt, right)
    }
    pub fn le(&self, right: impl Into<ComparisonValue>) -> Comparison {
        self.cmp(CmpOp::Le, right)
    }
    pub fn gt(&self, right: impl Into<ComparisonValue>) -> Comparison {
        self.cmp(CmpOp::Gt, right)
    }
    pub fn ge(&self, right: impl Into<ComparisonValue>) -> Comparison {
        self.cmp(CmpOp::Ge, right)
    }

    pub fn in_(&self, values: Vec<Value>) -> Comparison {
        Comparison {
            left: ComparisonOperand::Column(self.clone()),
            op: CmpOp::In,
            right: ComparisonValue::Values(values),
        }
    }

    pub fn not_in(&self, values: Vec<Value>) -> Comparison {
        Comparison {
            left: ComparisonOperand::Column(self.clone()),
            op: CmpOp::NotIn,
            right: ComparisonValue::Values(values),
        }
    }

    /// `LIKE`/`ILIKE` and their negations are only legal against string-like
    /// columns; anything else is a `BadArgument` raised at the call site.
    pub fn like(&self, pattern: impl Into<String>) -> Result<Comparison> {
        self.string_cmp(CmpOp::Like, pattern)
    }
    pub fn not_like(&self, pattern: impl Into<String>) -> Result<Comparison> {
        self.string_cmp(CmpOp::NotLike, pattern)
    }
    pub fn ilike(&self, pattern: impl Into<String>) -> Result<Comparison> {
        self.string_cmp(CmpOp::ILike, pattern)
    }
    pub fn not_ilike(&self, pattern: impl Into<String>) -> Result<Comparison> {
        self.string_cmp(CmpOp::NotILike, pattern)
    }

    fn string_cmp(&self, op: CmpOp, pattern: impl Into<String>) -> Result<Comparison> {
        if !self.static_type.is_string_like() {
            return Err(Error::bad_argument_in(
                format!("{:?} is only legal against string-like columns", op),
                format!("{}.{}", self.table, self.column),
            ));
        }
        Ok(Comparison {
            left: ComparisonOperand::Column(self.clone()),
            op,
            right: ComparisonValue::Value(Value::Text(pattern.into())),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    In,
    NotIn,
    Like,
    NotLike,
    ILike,
    NotILike,
    Is,
    IsNot,
    /// Full-text search `@@` match between a `tsvector` and a `tsquery`.
    Matches,
}

impl CmpOp {
    fn render(self) -> &'static str {
        match self {
            CmpOp::Eq => "=",
            CmpOp::Ne => "!=",
            CmpOp::Lt => "<",
            CmpOp::Le => "<=",
            CmpOp::Gt => ">",
            CmpOp::Ge => ">=",
            CmpOp::In => "IN",
            CmpOp::NotIn => "NOT IN",
            CmpOp::Like => "LIKE",
            CmpOp::NotLike => "NOT LIKE",
            CmpOp::ILike => "ILIKE",
            CmpOp::NotILike => "NOT ILIKE",
            CmpOp::Is => "IS",
            CmpOp::IsNot => "IS NOT",
            CmpOp::Matches => "@@",
        }
    }
}

#[derive(Debug, Clone)]
pub enum ComparisonOperand {
    Column(ColumnRef),
    Function(FunctionMeta),
}

impl ComparisonOperand {
    fn token(&self) -> Token {
        match self {
            ComparisonOperand::Column(c) => c.token(),
            ComparisonOperand::Function(f) => Token::raw(f.render_reference()),
        }
    }
}

#[derive(Debug, Clone)]
pub enum ComparisonValue {
    Column(ColumnRef),
    Function(FunctionMeta),
    Value(Value),
    /// Only produced by `in_`/`not_in`.
    Values(Vec<Value>),
}

impl From<Value> for ComparisonValue {
    fn from(v: Value) -> Self {
        ComparisonValue::Value(v)
    }
}
impl From<ColumnRef> for ComparisonValue {
    fn from(v: ColumnRef) -> Self {
        ComparisonValue::Column(v)
    }
}
impl From<FunctionMeta> for ComparisonValue {
    fn from(v: FunctionMeta) -> Self {
        ComparisonValue::Function(v)
    }
}
impl From<i64> for ComparisonValue {
    fn from(v: i64) -> Self {
        ComparisonValue::Value(Value::Int(v))
    }
}
impl From<i32> for ComparisonValue {
    fn from(v: i32) -> Self {
        ComparisonValue::Value(Value::Int(v as i64))
    }
}
impl From<&str> for ComparisonValue {
    fn from(v: &str) -> Self {
        ComparisonValue::Value(Value::Text(v.to_string()))
    }
}
impl From<String> for ComparisonValue {
    fn from(v: String) -> Self {
        ComparisonValue::Value(Value::Text(v))
    }
}
impl From<bool> for ComparisonValue {
    fn from(v: bool) -> Self {
        ComparisonValue::Value(Value::Bool(v))
    }
}

fn desugar_null(op: CmpOp, right: ComparisonValue) -> (CmpOp, ComparisonValue) {
    if let ComparisonValue::Value(Value::Null) = &right {
        match op {
            CmpOp::Eq => return (CmpOp::Is, right),
            CmpOp::Ne => return (CmpOp::IsNot, right),
            _ => {}
        }
    }
    (op, right)
}

/// `(left, op, right)`. Rendering threads a starting parameter index through
/// so callers (the query builder, or a nested group) keep a single ascending
/// `$n` counter.
#[derive(Debug, Clone)]
pub struct Comparison {
    pub left: ComparisonOperand,
    pub op: CmpOp,
    pub right: ComparisonValue,
}

impl Comparison {
    pub fn new(left: ComparisonOperand, op: CmpOp, right: ComparisonValue) -> Self {
        Self { left, op, right }
    }

    /// Render this comparison, appending any bound values to `params` and
    /// starting parameter numbering at `params.len() + 1`.
    pub fn render(&self, params: &mut Vec<Value>) -> String {
        let left = self.left.token().render();
        match &self.right {
            ComparisonValue::Column(c) => format!("{} {} {}", left, self.op.render(), c.token().render()),
            ComparisonValue::Function(f) => format!("{} {} {}", left, self.op.render(), f.render_reference()),
            ComparisonValue::Value(v) => {
                params.push(v.clone());
                format!("{} {} ${}", left, self.op.render(), params.len())
            }
            ComparisonValue::Values(vs) => {
                let mut placeholders = Vec::with_capacity(vs.len());
                for v in vs {
                    params.push(v.clone());
                    placeholders.push(format!("${}", params.len()));
                }
                format!("{} {} ({})", left, self.op.render(), placeholders.join(", "))
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupKind {
    And,
    Or,
}

/// Recursive AND/OR tree of comparisons.
#[derive(Debug, Clone)]
pub enum ComparisonGroup {
    Leaf(Comparison),
    Group {
        kind: GroupKind,
        elements: Vec<ComparisonGroup>,
    },
}

impl ComparisonGroup {
    pub fn render(&self, params: &mut Vec<Value>) -> String {
        match self {
            ComparisonGroup::Leaf(c) => c.render(params),
            ComparisonGroup::Group { kind, elements } => {
                let joiner = match kind {
                    GroupKind::And => " AND ",
                    GroupKind::Or => " OR ",
                };
                let rendered: Vec<String> = elements
                    .iter()
                    .map(|e| {
                        let inner = e.render(params);
                        if e.needs_parens() {
                            format!("({})", inner)
                        } else {
                            inner
                        }
                    })
                    .collect();
                rendered.join(joiner)
            }
        }
    }

    fn needs_parens(&self) -> bool {
        matches!(self, ComparisonGroup::Group { elements, .. } if elements.len() > 1)
    }
}

impl From<Comparison> for ComparisonGroup {
    fn from(c: Comparison) -> Self {
        ComparisonGroup::Leaf(c)
    }
}

pub fn and_(conditions: Vec<ComparisonGroup>) -> ComparisonGroup {
    ComparisonGroup::Group {
        kind: GroupKind::And,
        elements: conditions,
    }
}

pub fn or_(conditions: Vec<ComparisonGroup>) -> ComparisonGroup {
    ComparisonGroup::Group {
        kind: GroupKind::Or,
        elements: conditions,
    }
}

/// Metadata produced by an aggregate/scalar function builder. `original_field`
/// is `None` for functions that target no column (`row_number()`,
/// `current_timestamp()`): those may only appear in SELECT lists.
#[derive(Debug, Clone)]
pub struct FunctionMeta {
    pub sql_literal: String,
    pub original_field: Option<ColumnRef>,
    pub local_alias: Option<String>,
}

impl FunctionMeta {
    pub fn new(sql_literal: impl Into<String>, original_field: Option<ColumnRef>) -> Self {
        Self {
            sql_literal: sql_literal.into(),
            original_field,
            local_alias: None,
        }
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.local_alias = Some(alias.into());
        self
    }

    /// Render a reference to this function for use on the *right* side of a
    /// comparison or inside another expression: the alias once assigned,
    /// else the raw literal.
    pub fn render_reference(&self) -> String {
        match &self.local_alias {
            Some(alias) => alias.clone(),
            None => self.sql_literal.clone(),
        }
    }

    fn cmp(&self, op: CmpOp, right: impl Into<ComparisonValue>) -> Comparison {
        let right = right.into();
        let (op, right) = desugar_null(op, right);
        Comparison {
            left: ComparisonOperand::Function(self.clone()),
            op,
            right,
        }
    }

    pub fn eq(&self, right: impl Into<ComparisonValue>) -> Comparison {
        self.cmp(CmpOp::Eq, right)
    }
    pub fn ne(&self, right: impl Into<ComparisonValue>) -> Comparison {
        self.cmp(CmpOp::Ne, right)
    }
    pub fn lt(&self, right: impl Into<ComparisonValue>) -> Comparison {
        self.cmp(CmpOp::Lt, right)
    }
    pub fn le(&self, right: impl Into<ComparisonValue>) -> Comparison {
        self.cmp(CmpOp::Le, right)
    }
    pub fn gt(&self, right: impl Into<ComparisonValue>) -> Comparison {
        self.cmp(CmpOp::Gt, right)
    }
    pub fn ge(&self, right: impl Into<ComparisonValue>) -> Comparison {
        self.cmp(CmpOp::Ge, right)
    }

    /// `tsvector @@ tsquery` full-text search match.
    pub fn matches(&self, right: impl Into<ComparisonValue>) -> Comparison {
        Comparison {
            left: ComparisonOperand::Function(self.clone()),
            op: CmpOp::Matches,
            right: right.into(),
        }
    }

    /// `tsvector || tsvector` concatenation, for combining weighted search
    /// vectors across columns before matching against a single query.
    pub fn concat(&self, other: FunctionMeta) -> FunctionMeta {
        FunctionMeta::new(
            format!("{} || {}", self.sql_literal, other.sql_literal),
            self.original_field.clone(),
        )
    }
}

impl fmt::Display for FunctionMeta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.sql_literal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn col(name: &str) -> ColumnRef {
        ColumnRef::new("userdemo", name, StaticType::Integer)
    }

    #[test]
    fn eq_null_desugars_to_is() {
        let c = col("id").eq(Value::Null);
        assert!(matches!(c.op, CmpOp::Is));
    }

    #[test]
    fn ne_null_desugars_to_is_not() {
        let c = col("id").ne(Value::Null);
        assert!(matches!(c.op, CmpOp::IsNot));
    }

    #[test]
    fn column_to_column_comparison_does_not_parameterize() {
        let c = col("a").eq(ColumnRef::new("userdemo", "b", StaticType::Integer));
        let mut params = Vec::new();
        let rendered = c.render(&mut params);
        assert_eq!(rendered, "\"userdemo\".\"a\" = \"userdemo\".\"b\"");
        assert!(params.is_empty());
    }

    #[test]
    fn like_rejects_non_string_columns() {
        assert!(col("id").like("%x%").is_err());
    }

    #[test]
    fn like_accepts_string_columns() {
        let text_col = ColumnRef::new("userdemo", "name", StaticType::Text);
        assert!(text_col.like("%x%").is_ok());
    }

    #[test]
    fn in_values_renders_sequential_placeholders() {
        let c = col("id").in_(vec![Value::Int(1), Value::Int(2), Value::Int(3)]);
        let mut params = Vec::new();
        let rendered = c.render(&mut params);
        assert_eq!(rendered, "\"userdemo\".\"id\" IN ($1, $2, $3)");
        assert_eq!(params.len(), 3);
    }

    #[test]
    fn nested_group_wraps_in_parens() {
        let group = and_(vec![
            col("a").eq(1).into(),
            or_(vec![col("b").eq(2).into(), col("c").eq(3).into()]),
        ]);
        let mut params = Vec::new();
        let rendered = group.render(&mut params);
        assert_eq!(
            rendered,
            "\"userdemo\".\"a\" = $1 AND (\"userdemo\".\"b\" = $2 OR \"userdemo\".\"c\" = $3)"
        );
    }
}
