//! Lexical tokens produced from query text
//!
//! Keywords are not a token kind of their own. Every word is lexed as an
//! identifier and the parser decides, by position, whether it acts as a
//! keyword. This keeps words such as `order`, `value` or `first` usable as
//! path segments and aliases.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Operator and punctuation symbols
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Symbol {
    Equals,         // =
    NotEquals,      // <>
    BangEquals,     // !=
    CaretEquals,    // ^=
    LessThan,       // <
    LessOrEqual,    // <=
    GreaterThan,    // >
    GreaterOrEqual, // >=
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Concat, // ||
    Dot,
    Comma,
    LeftParen,
    RightParen,
    LeftBrace,
    RightBrace,
}

impl Symbol {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Equals => "=",
            Self::NotEquals => "<>",
            Self::BangEquals => "!=",
            Self::CaretEquals => "^=",
            Self::LessThan => "<",
            Self::LessOrEqual => "<=",
            Self::GreaterThan => ">",
            Self::GreaterOrEqual => ">=",
            Self::Plus => "+",
            Self::Minus => "-",
            Self::Star => "*",
            Self::Slash => "/",
            Self::Percent => "%",
            Self::Concat => "||",
            Self::Dot => ".",
            Self::Comma => ",",
            Self::LeftParen => "(",
            Self::RightParen => ")",
            Self::LeftBrace => "{",
            Self::RightBrace => "}",
        }
    }

    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            Self::Equals
                | Self::NotEquals
                | Self::BangEquals
                | Self::CaretEquals
                | Self::LessThan
                | Self::LessOrEqual
                | Self::GreaterThan
                | Self::GreaterOrEqual
        )
    }
}

/// Kind of bind-parameter marker as written in the query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ParameterStyle {
    /// `?1`
    Indexed,
    /// bare `?`
    Jdbc,
    /// `:name`
    Named,
    /// `?#{..}` or `:#{..}`
    Expression,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LexicalToken {
    /// Bare word; may be a contextual keyword
    Identifier(String),
    /// Backtick-quoted identifier, kept with its quotes
    QuotedIdentifier(String),
    /// String literal, kept verbatim with quotes and escapes
    StringLiteral(String),
    /// Numeric literal, kept verbatim with any type suffix
    NumericLiteral(String),
    Parameter {
        style: ParameterStyle,
        text: String,
    },
    Symbol(Symbol),
    Eof,
}

impl LexicalToken {
    /// Source text of the token
    pub fn text(&self) -> &str {
        match self {
            Self::Identifier(text)
            | Self::QuotedIdentifier(text)
            | Self::StringLiteral(text)
            | Self::NumericLiteral(text)
            | Self::Parameter { text, .. } => text,
            Self::Symbol(symbol) => symbol.as_str(),
            Self::Eof => "",
        }
    }

    pub fn is_symbol(&self, symbol: Symbol) -> bool {
        matches!(self, Self::Symbol(s) if *s == symbol)
    }

    pub fn is_identifier(&self) -> bool {
        matches!(self, Self::Identifier(_) | Self::QuotedIdentifier(_))
    }

    pub fn is_eof(&self) -> bool {
        matches!(self, Self::Eof)
    }

    /// Human-readable description for error messages
    pub fn describe(&self) -> String {
        match self {
            Self::Eof => "end of query".to_string(),
            other => format!("'{}'", other.text()),
        }
    }
}

impl fmt::Display for LexicalToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_text() {
        assert_eq!(LexicalToken::Symbol(Symbol::NotEquals).text(), "<>");
        assert_eq!(LexicalToken::Identifier("u".into()).text(), "u");
        assert_eq!(
            LexicalToken::Parameter {
                style: ParameterStyle::Named,
                text: ":name".into()
            }
            .text(),
            ":name"
        );
        assert_eq!(LexicalToken::Eof.describe(), "end of query");
    }

    #[test]
    fn test_comparison_symbols() {
        assert!(Symbol::CaretEquals.is_comparison());
        assert!(Symbol::LessOrEqual.is_comparison());
        assert!(!Symbol::Concat.is_comparison());
        assert!(!Symbol::Dot.is_comparison());
    }
}
