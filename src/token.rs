//! Primitive SQL tokens: quoted identifiers and raw literals.
//!
//! Both variants are value-equal and hashable so selection fields and
//! distinct-on lists can deduplicate without caring how a fragment was
//! produced.

use std::fmt;

use crate::utils::Utils;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Token {
    /// A bare name, rendered double-quoted: `"x"`.
    Identifier(String),
    /// A pre-formed SQL fragment, rendered verbatim.
    RawLiteral(String),
}

impl Token {
    pub fn identifier(name: impl Into<String>) -> Self {
        Token::Identifier(name.into())
    }

    pub fn raw(fragment: impl Into<String>) -> Self {
        Token::RawLiteral(fragment.into())
    }

    /// Table-qualified identifier: `"t"."c"`.
    pub fn qualified(table: impl AsRef<str>, column: impl AsRef<str>) -> Self {
        Token::RawLiteral(Utils::quote_qualified(table.as_ref(), column.as_ref()))
    }

    pub fn render(&self) -> String {
        match self {
            Token::Identifier(s) => Utils::quote_identifier(s),
            Token::RawLiteral(s) => s.clone(),
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.render())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifier_is_quoted() {
        assert_eq!(Token::identifier("userdemo").render(), "\"userdemo\"");
    }

    #[test]
    fn raw_literal_is_verbatim() {
        assert_eq!(Token::raw("count(*)").render(), "count(*)");
    }

    #[test]
    fn qualified_joins_both_identifiers() {
        assert_eq!(
            Token::qualified("userdemo", "id").render(),
            "\"userdemo\".\"id\""
        );
    }

    #[test]
    fn tokens_dedupe_by_value() {
        use std::collections::HashSet;
        let mut set = HashSet::new();
        set.insert(Token::identifier("id"));
        set.insert(Token::identifier("id"));
        set.insert(Token::raw("id"));
        assert_eq!(set.len(), 2);
    }
}
