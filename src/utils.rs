//! Small stateless helpers shared across the token, query and planner layers.

#[derive(Debug, Clone)]
pub struct Utils;

impl Utils {
    /// Double-quote a bare identifier, e.g. `userdemo` -> `"userdemo"`.
    /// Names are validated earlier (schema source boundary); embedded quotes
    /// are not escaped here.
    pub fn quote_identifier(name: &str) -> String {
        format!("\"{}\"", name)
    }

    /// Quote a table-qualified column reference: `("t", "c")` -> `"t"."c"`.
    pub fn quote_qualified(table: &str, column: &str) -> String {
        format!("{}.{}", Self::quote_identifier(table), Self::quote_identifier(column))
    }
}
