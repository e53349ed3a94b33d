//! Atomic render tokens

use std::borrow::Cow;
use std::fmt;
use std::hash::{Hash, Hasher};

/// An immutable fragment of rendered query text.
///
/// Expression tokens (keywords, paths, literals) are separated from an
/// adjacent expression by one space; plain tokens (punctuation, function
/// openers) attach directly.
#[derive(Debug, Clone)]
pub struct QueryToken {
    text: Cow<'static, str>,
    expression: bool,
}

impl QueryToken {
    pub const fn constant(text: &'static str, expression: bool) -> Self {
        Self {
            text: Cow::Borrowed(text),
            expression,
        }
    }

    /// Plain token
    pub fn token(text: impl Into<Cow<'static, str>>) -> Self {
        Self {
            text: text.into(),
            expression: false,
        }
    }

    /// Plain token surrounded by single spaces, used for symbolic operators
    pub fn ventilated(text: &str) -> Self {
        Self::token(format!(" {} ", text))
    }

    pub fn expression(text: impl Into<Cow<'static, str>>) -> Self {
        Self {
            text: text.into(),
            expression: true,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_expression(&self) -> bool {
        self.expression
    }
}

/// Token identity ignores case and classification
impl PartialEq for QueryToken {
    fn eq(&self, other: &Self) -> bool {
        self.text.eq_ignore_ascii_case(&other.text)
    }
}

impl Eq for QueryToken {}

impl Hash for QueryToken {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for byte in self.text.bytes() {
            state.write_u8(byte.to_ascii_lowercase());
        }
    }
}

impl fmt::Display for QueryToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Shared tokens used across renderers and rewriters
pub mod constants {
    use super::QueryToken;

    pub const TOKEN_COMMA: QueryToken = QueryToken::constant(", ", false);
    pub const TOKEN_SPACE: QueryToken = QueryToken::constant(" ", false);
    pub const TOKEN_DOT: QueryToken = QueryToken::constant(".", false);
    pub const TOKEN_EQUALS: QueryToken = QueryToken::constant(" = ", false);
    pub const TOKEN_OPEN_PAREN: QueryToken = QueryToken::constant("(", false);
    pub const TOKEN_CLOSE_PAREN: QueryToken = QueryToken::constant(")", false);
    pub const TOKEN_OPEN_BRACE: QueryToken = QueryToken::constant("{", false);
    pub const TOKEN_CLOSE_BRACE: QueryToken = QueryToken::constant("}", false);
    pub const TOKEN_DOUBLE_PIPE: QueryToken = QueryToken::constant(" || ", false);
    pub const TOKEN_ORDER_BY: QueryToken = QueryToken::constant("order by", true);
    pub const TOKEN_LOWER_FUNC: QueryToken = QueryToken::constant("lower(", false);
    pub const TOKEN_SELECT_COUNT: QueryToken = QueryToken::constant("select count(", false);
    pub const TOKEN_COUNT_FUNC: QueryToken = QueryToken::constant("count(", false);
    pub const TOKEN_COUNT_FUNC_UPPER: QueryToken = QueryToken::constant("COUNT(", false);
    pub const TOKEN_DOUBLE_UNDERSCORE: QueryToken = QueryToken::constant("__", false);
    pub const TOKEN_STAR: QueryToken = QueryToken::constant("*", false);
    pub const TOKEN_AS: QueryToken = QueryToken::constant("AS", true);
    pub const TOKEN_DISTINCT: QueryToken = QueryToken::constant("DISTINCT", true);
    pub const TOKEN_DESC: QueryToken = QueryToken::constant("desc", true);
    pub const TOKEN_ASC: QueryToken = QueryToken::constant("asc", true);
    pub const TOKEN_NULLS_FIRST: QueryToken = QueryToken::constant("nulls first", true);
    pub const TOKEN_NULLS_LAST: QueryToken = QueryToken::constant("nulls last", true);
    pub const TOKEN_NEW: QueryToken = QueryToken::constant("new", true);
}

#[cfg(test)]
mod tests {
    use super::constants::*;
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_token_equality_ignores_case() {
        assert_eq!(QueryToken::expression("SELECT"), QueryToken::token("select"));
        assert_ne!(QueryToken::token("select"), QueryToken::token("from"));

        let set: HashSet<QueryToken> = [QueryToken::token("AS"), TOKEN_AS].into_iter().collect();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_constants_classification() {
        assert!(TOKEN_ORDER_BY.is_expression());
        assert!(!TOKEN_COUNT_FUNC.is_expression());
        assert_eq!(QueryToken::ventilated(">=").text(), " >= ");
    }
}
