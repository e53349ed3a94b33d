//! Syntax analysis: tokens to statement trees
//!
//! [`parse`] is the single entry point used by the rest of the engine. Every
//! failure, lexical or grammatical, comes back as one [`BadGrammar`] carrying
//! the rejected query verbatim.

pub mod error;
pub mod parser;

use crate::config::runtime::{LexicalPreferences, SyntaxPreferences};
use crate::grammar::{Dialect, Statement};
use crate::lexical::{self, TokenCursor};

pub use error::{BadGrammar, SyntaxError, SyntaxResult};
pub use parser::QueryParser;

/// Parse `query` in `dialect` with default preferences
pub fn parse(query: &str, dialect: Dialect) -> Result<Statement, BadGrammar> {
    parse_with_preferences(query, dialect, SyntaxPreferences::default())
}

pub fn parse_with_preferences(
    query: &str,
    dialect: Dialect,
    preferences: SyntaxPreferences,
) -> Result<Statement, BadGrammar> {
    let with_excerpt = preferences.include_excerpt_in_errors;

    let tokens = lexical::tokenize_with_preferences(query, LexicalPreferences::default())
        .map_err(|error| BadGrammar::new(query, dialect, error.into(), with_excerpt))?;

    let mut parser = QueryParser::with_preferences(TokenCursor::new(tokens), dialect, preferences);
    parser
        .parse_statement()
        .map_err(|error| BadGrammar::new(query, dialect, error, with_excerpt))
}

/// Check that every syntax error code is registered
pub fn init_syntax_analysis_logging() -> Result<(), String> {
    let syntax_codes = [
        crate::logging::codes::syntax::BAD_GRAMMAR,
        crate::logging::codes::syntax::EMPTY_QUERY,
        crate::logging::codes::syntax::GRAMMAR_VIOLATION,
        crate::logging::codes::syntax::UNSUPPORTED_IN_DIALECT,
        crate::logging::codes::syntax::UNEXPECTED_TOKEN,
        crate::logging::codes::syntax::UNEXPECTED_END_OF_INPUT,
        crate::logging::codes::syntax::MAX_RECURSION_DEPTH,
    ];

    for code in &syntax_codes {
        if crate::logging::codes::get_error_metadata(code.as_str()).is_none() {
            return Err(format!(
                "Syntax error code {} not found in metadata registry",
                code.as_str()
            ));
        }
    }

    Ok(())
}
