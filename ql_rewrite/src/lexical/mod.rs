//! Lexical analysis of query text
//!
//! Produces spanned [`LexicalToken`]s for the parser. The lexer is shared by
//! both dialects; dialect differences are enforced by the parser.

pub mod analyzer;
pub mod cursor;
pub mod token;

use crate::config::runtime::LexicalPreferences;

pub use analyzer::{LexerError, LexicalAnalyzer, LexicalMetrics, SpannedToken};
pub use cursor::TokenCursor;
pub use token::{LexicalToken, ParameterStyle, Symbol};

/// Tokenize with default preferences
pub fn tokenize(query: &str) -> Result<Vec<SpannedToken>, LexerError> {
    LexicalAnalyzer::new().tokenize(query)
}

/// Tokenize with caller-supplied preferences; hard limits stay compile-time
pub fn tokenize_with_preferences(
    query: &str,
    preferences: LexicalPreferences,
) -> Result<Vec<SpannedToken>, LexerError> {
    LexicalAnalyzer::with_preferences(preferences).tokenize(query)
}

/// Check that every lexical error code is registered
pub fn init_lexical_analysis_logging() -> Result<(), String> {
    let lexical_codes = [
        crate::logging::codes::lexical::INVALID_CHARACTER,
        crate::logging::codes::lexical::UNTERMINATED_STRING,
        crate::logging::codes::lexical::INVALID_NUMBER,
        crate::logging::codes::lexical::IDENTIFIER_TOO_LONG,
        crate::logging::codes::lexical::STRING_TOO_LARGE,
        crate::logging::codes::lexical::UNTERMINATED_COMMENT,
        crate::logging::codes::lexical::TOO_MANY_TOKENS,
        crate::logging::codes::lexical::QUERY_TOO_LONG,
        crate::logging::codes::lexical::INVALID_PARAMETER,
    ];

    for code in &lexical_codes {
        if crate::logging::codes::get_error_metadata(code.as_str()).is_none() {
            return Err(format!(
                "Lexical error code {} not found in metadata registry",
                code.as_str()
            ));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lexical_codes_registered() {
        assert!(init_lexical_analysis_logging().is_ok());
    }

    #[test]
    fn test_tokenize_with_preferences() {
        let preferences = LexicalPreferences {
            include_position_in_errors: false,
            collect_metrics: true,
        };
        let tokens = tokenize_with_preferences("from User", preferences).unwrap();
        assert_eq!(tokens.len(), 3);
        assert!(tokenize("from User #").is_err());
    }
}
