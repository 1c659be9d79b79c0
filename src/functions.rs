//! SQL function and aggregate builders: `count`, `sum`, window functions,
//! date/time constructors, string and math helpers, full-text search
//! vectors, and type-conversion wrappers. Every builder here returns a
//! `FunctionMeta`, the only vocabulary the query builder's SELECT/HAVING/
//! ORDER BY positions accept for non-column expressions.

use crate::expr::{ColumnRef, FunctionMeta};

/// Anything that can be coerced into a function operand: a bare column
/// becomes a pass-through `FunctionMeta` wrapping its own token; an existing
/// `FunctionMeta` passes through unchanged so functions can nest
/// (`count(distinct(col))`).
pub trait IntoOperand {
    fn into_operand(self) -> FunctionMeta;
}

impl IntoOperand for ColumnRef {
    fn into_operand(self) -> FunctionMeta {
        let literal = self.token().render();
        FunctionMeta::new(literal, Some(self))
    }
}

impl IntoOperand for FunctionMeta {
    fn into_operand(self) -> FunctionMeta {
        self
    }
}

fn wrap(name: &str, operand: impl IntoOperand) -> FunctionMeta {
    let inner = operand.into_operand();
    let literal = format!("{}({})", name, inner.sql_literal);
    FunctionMeta::new(literal, inner.original_field)
}

pub struct Func;

impl Func {
    // --- Aggregates ---

    pub fn count(field: impl IntoOperand) -> FunctionMeta {
        wrap("count", field)
    }

    pub fn count_star() -> FunctionMeta {
        FunctionMeta::new("count(*)", None)
    }

    pub fn distinct(field: impl IntoOperand) -> FunctionMeta {
        let inner = field.into_operand();
        FunctionMeta::new(format!("distinct {}", inner.sql_literal), inner.original_field)
    }

    pub fn sum(field: impl IntoOperand) -> FunctionMeta {
        wrap("sum", field)
    }

    pub fn avg(field: impl IntoOperand) -> FunctionMeta {
        wrap("avg", field)
    }

    pub fn max(field: impl IntoOperand) -> FunctionMeta {
        wrap("max", field)
    }

    pub fn min(field: impl IntoOperand) -> FunctionMeta {
        wrap("min", field)
    }

    pub fn abs(field: impl IntoOperand) -> FunctionMeta {
        wrap("abs", field)
    }

    pub fn array_agg(field: impl IntoOperand) -> FunctionMeta {
        wrap("array_agg", field)
    }

    pub fn string_agg(field: impl IntoOperand, delimiter: &str) -> FunctionMeta {
        let inner = field.into_operand();
        FunctionMeta::new(
            format!("string_agg({}, '{}')", inner.sql_literal, delimiter),
            inner.original_field,
        )
    }

    // --- Date/time ---

    pub fn date_trunc(precision: &str, field: impl IntoOperand) -> FunctionMeta {
        let inner = field.into_operand();
        FunctionMeta::new(
            format!("date_trunc('{}', {})", precision, inner.sql_literal),
            inner.original_field,
        )
    }

    pub fn date_part(part: &str, field: impl IntoOperand) -> FunctionMeta {
        let inner = field.into_operand();
        FunctionMeta::new(
            format!("date_part('{}', {})", part, inner.sql_literal),
            inner.original_field,
        )
    }

    /// Unlike `date_part`, the SQL `EXTRACT(field FROM source)` syntax takes
    /// `field` as a bareword, not a quoted string.
    pub fn extract(field: &str, source: impl IntoOperand) -> FunctionMeta {
        let inner = source.into_operand();
        FunctionMeta::new(
            format!("extract({} from {})", field, inner.sql_literal),
            inner.original_field,
        )
    }

    pub fn age(timestamp: impl IntoOperand) -> FunctionMeta {
        wrap("age", timestamp)
    }

    pub fn age_between(timestamp: impl IntoOperand, reference: impl IntoOperand) -> FunctionMeta {
        let t = timestamp.into_operand();
        let r = reference.into_operand();
        FunctionMeta::new(format!("age({}, {})", t.sql_literal, r.sql_literal), t.original_field)
    }

    pub fn current_date() -> FunctionMeta {
        FunctionMeta::new("current_date", None)
    }

    pub fn current_time() -> FunctionMeta {
        FunctionMeta::new("current_time", None)
    }

    pub fn current_timestamp() -> FunctionMeta {
        FunctionMeta::new("current_timestamp", None)
    }

    pub fn date(field: impl IntoOperand) -> FunctionMeta {
        wrap("date", field)
    }

    pub fn make_date(year: impl IntoOperand, month: impl IntoOperand, day: impl IntoOperand) -> FunctionMeta {
        let (y, m, d) = (year.into_operand(), month.into_operand(), day.into_operand());
        FunctionMeta::new(
            format!("make_date({}, {}, {})", y.sql_literal, m.sql_literal, d.sql_literal),
            None,
        )
    }

    pub fn make_time(hour: impl IntoOperand, minute: impl IntoOperand, sec: impl IntoOperand) -> FunctionMeta {
        let (h, m, s) = (hour.into_operand(), minute.into_operand(), sec.into_operand());
        FunctionMeta::new(
            format!("make_time({}, {}, {})", h.sql_literal, m.sql_literal, s.sql_literal),
            None,
        )
    }

    #[allow(clippy::too_many_arguments)]
    pub fn make_timestamp(
        year: impl IntoOperand,
        month: impl IntoOperand,
        day: impl IntoOperand,
        hour: impl IntoOperand,
        minute: impl IntoOperand,
        sec: impl IntoOperand,
    ) -> FunctionMeta {
        let parts = [year, month, day, hour, minute, sec]
            .into_iter()
            .map(|p| p.into_operand().sql_literal)
            .collect::<Vec<_>>()
            .join(", ");
        FunctionMeta::new(format!("make_timestamp({})", parts), None)
    }

    /// `make_interval(years => ..., months => ..., ...)`. At least one part
    /// must be supplied.
    pub fn make_interval(parts: &[(&str, i64)]) -> Result<FunctionMeta, crate::error::Error> {
        if parts.is_empty() {
            return Err(crate::error::Error::bad_argument(
                "make_interval requires at least one named part",
            ));
        }
        let rendered = parts
            .iter()
            .map(|(name, value)| format!("{} => {}", name, value))
            .collect::<Vec<_>>()
            .join(", ");
        Ok(FunctionMeta::new(format!("make_interval({})", rendered), None))
    }

    // --- Strings ---

    pub fn lower(field: impl IntoOperand) -> FunctionMeta {
        wrap("lower", field)
    }

    pub fn upper(field: impl IntoOperand) -> FunctionMeta {
        wrap("upper", field)
    }

    pub fn length(field: impl IntoOperand) -> FunctionMeta {
        wrap("length", field)
    }

    pub fn trim(field: impl IntoOperand) -> FunctionMeta {
        wrap("trim", field)
    }

    pub fn substring(field: impl IntoOperand, start: i64, length: i64) -> FunctionMeta {
        let inner = field.into_operand();
        FunctionMeta::new(
            format!("substring({} from {} for {})", inner.sql_literal, start, length),
            inner.original_field,
        )
    }

    // --- Math ---

    pub fn round(field: impl IntoOperand) -> FunctionMeta {
        wrap("round", field)
    }

    pub fn ceil(field: impl IntoOperand) -> FunctionMeta {
        wrap("ceil", field)
    }

    pub fn floor(field: impl IntoOperand) -> FunctionMeta {
        wrap("floor", field)
    }

    pub fn power(field: impl IntoOperand, exponent: f64) -> FunctionMeta {
        let inner = field.into_operand();
        FunctionMeta::new(
            format!("power({}, {})", inner.sql_literal, exponent),
            inner.original_field,
        )
    }

    pub fn sqrt(field: impl IntoOperand) -> FunctionMeta {
        wrap("sqrt", field)
    }

    // --- Window functions ---

    pub fn row_number() -> FunctionMeta {
        FunctionMeta::new("row_number()", None)
    }

    pub fn rank() -> FunctionMeta {
        FunctionMeta::new("rank()", None)
    }

    pub fn dense_rank() -> FunctionMeta {
        FunctionMeta::new("dense_rank()", None)
    }

    pub fn lag(field: impl IntoOperand) -> FunctionMeta {
        wrap("lag", field)
    }

    pub fn lead(field: impl IntoOperand) -> FunctionMeta {
        wrap("lead", field)
    }

    // --- Type conversion ---

    pub fn cast(field: impl IntoOperand, type_name: &str) -> FunctionMeta {
        let inner = field.into_operand();
        FunctionMeta::new(
            format!("cast({} as {})", inner.sql_literal, type_name),
            inner.original_field,
        )
    }

    pub fn to_char(field: impl IntoOperand, format: &str) -> FunctionMeta {
        let inner = field.into_operand();
        FunctionMeta::new(
            format!("to_char({}, '{}')", inner.sql_literal, format),
            inner.original_field,
        )
    }

    pub fn to_number(field: impl IntoOperand, format: &str) -> FunctionMeta {
        let inner = field.into_operand();
        FunctionMeta::new(
            format!("to_number({}, '{}')", inner.sql_literal, format),
            inner.original_field,
        )
    }

    pub fn to_timestamp(field: impl IntoOperand, format: &str) -> FunctionMeta {
        let inner = field.into_operand();
        FunctionMeta::new(
            format!("to_timestamp({}, '{}')", inner.sql_literal, format),
            inner.original_field,
        )
    }

    // --- Full-text search ---

    /// `to_tsvector('language', field)`. Pairs with `FunctionMeta::matches`
    /// and `FunctionMeta::concat` to build multi-column search vectors.
    pub fn to_tsvector(language: &str, field: impl IntoOperand) -> FunctionMeta {
        let inner = field.into_operand();
        FunctionMeta::new(
            format!("to_tsvector('{}', {})", language, inner.sql_literal),
            inner.original_field,
        )
    }

    /// `to_tsquery('language', 'query')`. `query` is a tsquery expression
    /// (`&`/`|`/`!` boolean operators), not a user search string to escape —
    /// callers sanitize free-text input before composing it.
    pub fn to_tsquery(language: &str, query: &str) -> FunctionMeta {
        FunctionMeta::new(format!("to_tsquery('{}', '{}')", language, query), None)
    }

    /// `setweight(tsvector, 'A'..'D')`, ranking which column a match came
    /// from once several vectors are concatenated together.
    pub fn setweight(field: impl IntoOperand, weight: &str) -> FunctionMeta {
        let inner = field.into_operand();
        FunctionMeta::new(
            format!("setweight({}, '{}')", inner.sql_literal, weight),
            inner.original_field,
        )
    }

    /// `ts_rank(vector, query)`, typically placed in the SELECT list and
    /// ordered on via its `aggregate_<k>` alias.
    pub fn ts_rank(vector: impl IntoOperand, query: impl IntoOperand) -> FunctionMeta {
        let v = vector.into_operand();
        let q = query.into_operand();
        FunctionMeta::new(format!("ts_rank({}, {})", v.sql_literal, q.sql_literal), v.original_field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::StaticType;

    fn col(name: &str) -> ColumnRef {
        ColumnRef::new("userdemo", name, StaticType::Integer)
    }

    #[test]
    fn count_wraps_column_reference() {
        let f = Func::count(col("id"));
        assert_eq!(f.sql_literal, "count(\"userdemo\".\"id\")");
        assert!(f.original_field.is_some());
    }

    #[test]
    fn count_star_has_no_original_field() {
        let f = Func::count_star();
        assert_eq!(f.sql_literal, "count(*)");
        assert!(f.original_field.is_none());
    }

    #[test]
    fn row_number_takes_no_column() {
        let f = Func::row_number();
        assert_eq!(f.sql_literal, "row_number()");
        assert!(f.original_field.is_none());
    }

    #[test]
    fn extract_uses_bareword_field() {
        let f = Func::extract("year", col("created_at"));
        assert_eq!(f.sql_literal, "extract(year from \"userdemo\".\"created_at\")");
    }

    #[test]
    fn date_part_quotes_field_name() {
        let f = Func::date_part("year", col("created_at"));
        assert_eq!(f.sql_literal, "date_part('year', \"userdemo\".\"created_at\")");
    }

    #[test]
    fn make_interval_requires_a_part() {
        assert!(Func::make_interval(&[]).is_err());
        assert!(Func::make_interval(&[("days", 3)]).is_ok());
    }

    #[test]
    fn functions_nest() {
        let f = Func::count(Func::distinct(col("email")));
        assert_eq!(f.sql_literal, "count(distinct \"userdemo\".\"email\")");
    }

    #[test]
    fn text_search_vectors_concat_and_match() {
        let title = ColumnRef::new("article", "title", StaticType::Text);
        let content = ColumnRef::new("article", "content", StaticType::Text);
        let vector = Func::to_tsvector("english", title).concat(Func::to_tsvector("english", content));
        assert_eq!(
            vector.sql_literal,
            "to_tsvector('english', \"article\".\"title\") || to_tsvector('english', \"article\".\"content\")"
        );

        let query = Func::to_tsquery("english", "python & guide");
        let cmp = vector.matches(query);
        let mut params = Vec::new();
        assert_eq!(
            cmp.render(&mut params),
            "to_tsvector('english', \"article\".\"title\") || to_tsvector('english', \"article\".\"content\") @@ to_tsquery('english', 'python & guide')"
        );
        assert!(params.is_empty());
    }

    #[test]
    fn setweight_wraps_vector_with_rank() {
        let title = ColumnRef::new("article", "title", StaticType::Text);
        let weighted = Func::setweight(Func::to_tsvector("english", title), "A");
        assert_eq!(weighted.sql_literal, "setweight(to_tsvector('english', \"article\".\"title\"), 'A')");
    }
}
