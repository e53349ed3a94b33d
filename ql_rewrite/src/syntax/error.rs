//! Grammar errors and the single wrapped error every parse failure surfaces as

use crate::grammar::Dialect;
use crate::lexical::LexerError;
use crate::logging::{codes, Code};
use crate::utils::{Position, SourceMap, Span};

pub type SyntaxResult<T> = Result<T, SyntaxError>;

/// Failures raised while turning tokens into a syntax tree
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SyntaxError {
    #[error(transparent)]
    Lexical(#[from] LexerError),

    #[error("Unexpected token: expected {expected}, found {found} at {span}")]
    UnexpectedToken {
        expected: String,
        found: String,
        span: Span,
    },

    #[error("Unexpected end of query: expected {expected}")]
    UnexpectedEndOfInput { expected: String, span: Span },

    #[error("Query is empty")]
    EmptyQuery,

    #[error("Grammar violation: {message} at {span}")]
    GrammarViolation { message: String, span: Span },

    #[error("{feature} are not supported in {dialect} at {span}")]
    UnsupportedInDialect {
        feature: &'static str,
        dialect: Dialect,
        span: Span,
    },

    #[error("Maximum nesting depth exceeded at {span}")]
    MaxRecursionDepth { span: Span },
}

impl SyntaxError {
    pub fn unexpected_token(expected: &str, found: &str, span: Span) -> Self {
        Self::UnexpectedToken {
            expected: expected.to_string(),
            found: found.to_string(),
            span,
        }
    }

    pub fn unexpected_end_of_input(expected: &str, span: Span) -> Self {
        Self::UnexpectedEndOfInput {
            expected: expected.to_string(),
            span,
        }
    }

    pub fn grammar_violation(message: &str, span: Span) -> Self {
        Self::GrammarViolation {
            message: message.to_string(),
            span,
        }
    }

    pub fn unsupported(feature: &'static str, dialect: Dialect, span: Span) -> Self {
        Self::UnsupportedInDialect {
            feature,
            dialect,
            span,
        }
    }

    pub fn max_recursion_depth(span: Span) -> Self {
        Self::MaxRecursionDepth { span }
    }

    pub fn error_code(&self) -> Code {
        match self {
            Self::Lexical(error) => error.error_code(),
            Self::UnexpectedToken { .. } => codes::syntax::UNEXPECTED_TOKEN,
            Self::UnexpectedEndOfInput { .. } => codes::syntax::UNEXPECTED_END_OF_INPUT,
            Self::EmptyQuery => codes::syntax::EMPTY_QUERY,
            Self::GrammarViolation { .. } => codes::syntax::GRAMMAR_VIOLATION,
            Self::UnsupportedInDialect { .. } => codes::syntax::UNSUPPORTED_IN_DIALECT,
            Self::MaxRecursionDepth { .. } => codes::syntax::MAX_RECURSION_DEPTH,
        }
    }

    pub fn span(&self) -> Option<Span> {
        match self {
            Self::Lexical(error) => Some(Span::point(error.position())),
            Self::UnexpectedToken { span, .. }
            | Self::UnexpectedEndOfInput { span, .. }
            | Self::GrammarViolation { span, .. }
            | Self::UnsupportedInDialect { span, .. }
            | Self::MaxRecursionDepth { span } => Some(*span),
            Self::EmptyQuery => None,
        }
    }

    pub fn position(&self) -> Position {
        self.span().map(|span| span.start()).unwrap_or_else(Position::start)
    }

    pub fn severity(&self) -> &'static str {
        codes::get_severity(self.error_code().as_str()).as_str()
    }

    pub fn recommended_action(&self) -> &'static str {
        codes::get_action(self.error_code().as_str())
    }
}

/// A query that does not conform to its dialect's grammar
///
/// Carries the query verbatim so callers can report exactly what was
/// rejected.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("At {position}: {message}; Bad {dialect} grammar [{query}]")]
pub struct BadGrammar {
    pub query: String,
    pub dialect: Dialect,
    pub position: Position,
    pub message: String,
    pub code: Code,
    /// Caret excerpt of the offending line, when enabled
    pub excerpt: Option<String>,
    #[source]
    pub cause: SyntaxError,
}

impl BadGrammar {
    pub fn new(query: &str, dialect: Dialect, cause: SyntaxError, with_excerpt: bool) -> Self {
        let excerpt = match cause.span() {
            Some(span) if with_excerpt && !query.is_empty() => {
                Some(SourceMap::new(query).excerpt(&span))
            }
            _ => None,
        };

        Self {
            query: query.to_string(),
            dialect,
            position: cause.position(),
            message: cause.to_string(),
            code: cause.error_code(),
            excerpt,
            cause,
        }
    }

    pub fn error_code(&self) -> Code {
        self.code
    }

    /// Message plus the caret excerpt, for terminal output
    pub fn detailed_message(&self) -> String {
        match &self.excerpt {
            Some(excerpt) if !excerpt.is_empty() => format!("{}\n{}", self, excerpt),
            _ => self.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span_at(offset: usize, column: u32) -> Span {
        let start = Position::new(offset, 1, column);
        Span::new(start, Position::new(offset + 4, 1, column + 4))
    }

    #[test]
    fn test_error_code_mapping() {
        let span = span_at(0, 1);
        assert_eq!(SyntaxError::unexpected_token("FROM", "'form'", span).error_code().as_str(), "E050");
        assert_eq!(SyntaxError::unexpected_end_of_input("FROM", span).error_code().as_str(), "E051");
        assert_eq!(SyntaxError::EmptyQuery.error_code().as_str(), "E041");
        assert_eq!(SyntaxError::max_recursion_depth(span).error_code().as_str(), "E087");
        assert_eq!(
            SyntaxError::unsupported("WITH clauses", Dialect::Jpql, span).error_code().as_str(),
            "E044"
        );
    }

    #[test]
    fn test_lexical_errors_keep_their_code() {
        let error = SyntaxError::from(LexerError::UnterminatedString {
            position: Position::new(10, 1, 11),
        });
        assert_eq!(error.error_code().as_str(), "E021");
        assert_eq!(error.position().column, 11);
    }

    #[test]
    fn test_bad_grammar_carries_query() {
        let query = "select u form User u";
        let cause = SyntaxError::unexpected_token("end of query", "'form'", span_at(9, 10));
        let error = BadGrammar::new(query, Dialect::Jpql, cause, true);

        assert_eq!(error.query, query);
        assert_eq!(error.position.column, 10);
        assert!(error.to_string().starts_with("At 1:10: Unexpected token"));
        assert!(error.to_string().ends_with("Bad JPQL grammar [select u form User u]"));
        assert!(error.detailed_message().contains("1 | select u form User u"));
    }

    #[test]
    fn test_excerpt_can_be_disabled() {
        let error = BadGrammar::new("", Dialect::Hql, SyntaxError::EmptyQuery, true);
        assert!(error.excerpt.is_none());
        assert_eq!(error.position, Position::start());
        assert_eq!(error.error_code().as_str(), "E041");
    }
}
