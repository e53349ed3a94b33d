//! Lexical analyzer for JPQL and HQL query text
//!
//! Whitespace and comments are consumed here and never reach the parser.
//! Literal tokens keep their exact source text so rendering reproduces them
//! unchanged.

use super::token::{LexicalToken, ParameterStyle, Symbol};
use crate::config::compile_time::lexical::*;
use crate::config::runtime::LexicalPreferences;
use crate::logging::codes;
use crate::utils::{Position, Span, Spanned};

pub type SpannedToken = Spanned<LexicalToken>;

/// Lexical analysis errors with compile-time security boundaries
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LexerError {
    #[error("Invalid character: '{character}' at {position}")]
    InvalidCharacter { character: char, position: Position },

    #[error("Unterminated string literal starting at {position}")]
    UnterminatedString { position: Position },

    #[error("Invalid number format: '{text}' at {position}")]
    InvalidNumber { text: String, position: Position },

    #[error("Identifier too long: {length} characters (max {MAX_IDENTIFIER_LENGTH})")]
    IdentifierTooLong { length: usize, position: Position },

    #[error("String too large: {size} bytes (max {MAX_STRING_SIZE})")]
    StringTooLarge { size: usize, position: Position },

    #[error("Unterminated block comment starting at {position}")]
    UnterminatedComment { position: Position },

    #[error("Too many tokens: {count} (max {MAX_TOKEN_COUNT})")]
    TooManyTokens { count: usize, position: Position },

    #[error("Query too long: {length} bytes (max {MAX_QUERY_LENGTH})")]
    QueryTooLong { length: usize },

    #[error("Invalid parameter marker '{text}' at {position}")]
    InvalidParameter { text: String, position: Position },
}

impl LexerError {
    pub fn error_code(&self) -> crate::logging::Code {
        match self {
            LexerError::InvalidCharacter { .. } => codes::lexical::INVALID_CHARACTER,
            LexerError::UnterminatedString { .. } => codes::lexical::UNTERMINATED_STRING,
            LexerError::InvalidNumber { .. } => codes::lexical::INVALID_NUMBER,
            LexerError::IdentifierTooLong { .. } => codes::lexical::IDENTIFIER_TOO_LONG,
            LexerError::StringTooLarge { .. } => codes::lexical::STRING_TOO_LARGE,
            LexerError::UnterminatedComment { .. } => codes::lexical::UNTERMINATED_COMMENT,
            LexerError::TooManyTokens { .. } => codes::lexical::TOO_MANY_TOKENS,
            LexerError::QueryTooLong { .. } => codes::lexical::QUERY_TOO_LONG,
            LexerError::InvalidParameter { .. } => codes::lexical::INVALID_PARAMETER,
        }
    }

    /// Where in the query the failure was detected
    pub fn position(&self) -> Position {
        match self {
            LexerError::InvalidCharacter { position, .. }
            | LexerError::UnterminatedString { position }
            | LexerError::InvalidNumber { position, .. }
            | LexerError::IdentifierTooLong { position, .. }
            | LexerError::StringTooLarge { position, .. }
            | LexerError::UnterminatedComment { position }
            | LexerError::TooManyTokens { position, .. }
            | LexerError::InvalidParameter { position, .. } => *position,
            LexerError::QueryTooLong { .. } => Position::start(),
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct LexicalMetrics {
    pub total_tokens: usize,
    pub identifier_tokens: usize,
    pub literal_tokens: usize,
    pub parameter_tokens: usize,
    pub symbol_tokens: usize,
    pub comment_count: usize,
    pub max_string_length: usize,
}

impl LexicalMetrics {
    fn record_token(&mut self, token: &LexicalToken) {
        self.total_tokens += 1;
        match token {
            LexicalToken::Identifier(_) | LexicalToken::QuotedIdentifier(_) => {
                self.identifier_tokens += 1
            }
            LexicalToken::StringLiteral(text) => {
                self.literal_tokens += 1;
                self.max_string_length = self.max_string_length.max(text.len());
            }
            LexicalToken::NumericLiteral(_) => self.literal_tokens += 1,
            LexicalToken::Parameter { .. } => self.parameter_tokens += 1,
            LexicalToken::Symbol(_) => self.symbol_tokens += 1,
            LexicalToken::Eof => {}
        }
    }
}

/// Character cursor tracking line and column as it moves
struct Scanner<'a> {
    source: &'a str,
    pos: Position,
}

impl<'a> Scanner<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            source,
            pos: Position::start(),
        }
    }

    fn rest(&self) -> &'a str {
        &self.source[self.pos.offset..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn peek_nth(&self, n: usize) -> Option<char> {
        self.rest().chars().nth(n)
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos = self.pos.advance(ch);
        Some(ch)
    }

    fn bump_while<F: Fn(char) -> bool>(&mut self, predicate: F) {
        while self.peek().is_some_and(&predicate) {
            self.bump();
        }
    }

    fn text_from(&self, start: Position) -> &'a str {
        &self.source[start.offset..self.pos.offset]
    }
}

fn is_identifier_start(ch: char) -> bool {
    ch.is_alphabetic() || ch == '_' || ch == '$'
}

fn is_identifier_part(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '_' || ch == '$'
}

pub struct LexicalAnalyzer {
    metrics: LexicalMetrics,
    preferences: LexicalPreferences,
}

impl Default for LexicalAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl LexicalAnalyzer {
    pub fn new() -> Self {
        Self::with_preferences(LexicalPreferences::default())
    }

    pub fn with_preferences(preferences: LexicalPreferences) -> Self {
        Self {
            metrics: LexicalMetrics::default(),
            preferences,
        }
    }

    pub fn metrics(&self) -> &LexicalMetrics {
        &self.metrics
    }

    pub fn preferences(&self) -> &LexicalPreferences {
        &self.preferences
    }

    /// Tokenize a query; the result always ends with an `Eof` token
    pub fn tokenize(&mut self, query: &str) -> Result<Vec<SpannedToken>, LexerError> {
        self.metrics = LexicalMetrics::default();

        if query.len() > MAX_QUERY_LENGTH {
            let error = LexerError::QueryTooLong {
                length: query.len(),
            };
            log_error!(error.error_code(), "Query exceeds maximum length",
                "length" => query.len(),
                "limit" => MAX_QUERY_LENGTH
            );
            return Err(error);
        }

        log_debug!("Starting lexical analysis", "bytes" => query.len());

        let mut scanner = Scanner::new(query);
        let mut tokens = Vec::new();

        loop {
            if let Err(error) = self.skip_trivia(&mut scanner) {
                return Err(self.report(error));
            }

            let start = scanner.pos;
            let Some(ch) = scanner.peek() else {
                break;
            };

            if tokens.len() >= MAX_TOKEN_COUNT {
                let error = LexerError::TooManyTokens {
                    count: tokens.len(),
                    position: start,
                };
                return Err(self.report(error));
            }

            let token = match self.next_token(&mut scanner, ch) {
                Ok(token) => token,
                Err(error) => return Err(self.report(error)),
            };

            self.metrics.record_token(&token);
            tokens.push(Spanned::new(token, Span::new(start, scanner.pos)));
        }

        tokens.push(Spanned::new(LexicalToken::Eof, Span::point(scanner.pos)));

        if self.preferences.collect_metrics {
            log_success!(codes::success::TOKENIZATION_COMPLETE,
                "Lexical analysis completed",
                "tokens" => self.metrics.total_tokens,
                "identifiers" => self.metrics.identifier_tokens,
                "literals" => self.metrics.literal_tokens,
                "parameters" => self.metrics.parameter_tokens,
                "comments" => self.metrics.comment_count
            );
        }

        Ok(tokens)
    }

    fn report(&self, error: LexerError) -> LexerError {
        let position = error.position();
        let message = if self.preferences.include_position_in_errors {
            format!(
                "Lexical analysis failed at line {}, column {}",
                position.line, position.column
            )
        } else {
            "Lexical analysis failed".to_string()
        };
        log_error!(error.error_code(), &message,
            span = Span::point(position),
            "error" => &error
        );
        error
    }

    /// Whitespace, `-- line` comments and `/* block */` comments
    fn skip_trivia(&mut self, scanner: &mut Scanner<'_>) -> Result<(), LexerError> {
        loop {
            match (scanner.peek(), scanner.peek_nth(1)) {
                (Some(ch), _) if ch.is_whitespace() => {
                    scanner.bump();
                }
                (Some('-'), Some('-')) => {
                    scanner.bump_while(|c| c != '\n');
                    self.metrics.comment_count += 1;
                }
                (Some('/'), Some('*')) => {
                    let start = scanner.pos;
                    scanner.bump();
                    scanner.bump();
                    loop {
                        match scanner.bump() {
                            Some('*') if scanner.peek() == Some('/') => {
                                scanner.bump();
                                break;
                            }
                            Some(_) => {}
                            None => return Err(LexerError::UnterminatedComment { position: start }),
                        }
                    }
                    self.metrics.comment_count += 1;
                }
                _ => return Ok(()),
            }
        }
    }

    fn next_token(&mut self, scanner: &mut Scanner<'_>, ch: char) -> Result<LexicalToken, LexerError> {
        let start = scanner.pos;

        match ch {
            '\'' | '"' => self.string_literal(scanner, ch),
            '`' => self.quoted_identifier(scanner),
            '0'..='9' => self.numeric_literal(scanner),
            '.' if scanner.peek_nth(1).is_some_and(|c| c.is_ascii_digit()) => {
                self.numeric_literal(scanner)
            }
            '?' | ':' => self.parameter(scanner, ch),
            c if is_identifier_start(c) => {
                scanner.bump_while(is_identifier_part);
                let word = scanner.text_from(start);
                if word.chars().count() > MAX_IDENTIFIER_LENGTH {
                    return Err(LexerError::IdentifierTooLong {
                        length: word.chars().count(),
                        position: start,
                    });
                }
                Ok(LexicalToken::Identifier(word.to_string()))
            }
            _ => self.symbol(scanner, ch).map(LexicalToken::Symbol),
        }
    }

    /// `'..'` with `''` as the escaped quote; `".."` likewise with `""`
    fn string_literal(&mut self, scanner: &mut Scanner<'_>, quote: char) -> Result<LexicalToken, LexerError> {
        let start = scanner.pos;
        scanner.bump();

        loop {
            match scanner.bump() {
                Some(c) if c == quote => {
                    if scanner.peek() == Some(quote) {
                        scanner.bump();
                    } else {
                        break;
                    }
                }
                Some('\\') if quote == '"' => {
                    scanner.bump();
                }
                Some(_) => {}
                None => return Err(LexerError::UnterminatedString { position: start }),
            }

            let size = scanner.pos.offset - start.offset;
            if size > MAX_STRING_SIZE {
                return Err(LexerError::StringTooLarge {
                    size,
                    position: start,
                });
            }
        }

        Ok(LexicalToken::StringLiteral(scanner.text_from(start).to_string()))
    }

    fn quoted_identifier(&mut self, scanner: &mut Scanner<'_>) -> Result<LexicalToken, LexerError> {
        let start = scanner.pos;
        scanner.bump();
        scanner.bump_while(|c| c != '`');
        if scanner.bump().is_none() {
            return Err(LexerError::UnterminatedString { position: start });
        }

        let text = scanner.text_from(start);
        if text.len() - 2 > MAX_IDENTIFIER_LENGTH {
            return Err(LexerError::IdentifierTooLong {
                length: text.len() - 2,
                position: start,
            });
        }
        Ok(LexicalToken::QuotedIdentifier(text.to_string()))
    }

    /// Integer, decimal, exponent, hex, with optional `L F D BI BD` suffix
    fn numeric_literal(&mut self, scanner: &mut Scanner<'_>) -> Result<LexicalToken, LexerError> {
        let start = scanner.pos;

        let is_hex = scanner.peek() == Some('0') && matches!(scanner.peek_nth(1), Some('x' | 'X'));
        if is_hex {
            scanner.bump();
            scanner.bump();
            scanner.bump_while(|c| c.is_ascii_hexdigit());
        } else {
            scanner.bump_while(|c| c.is_ascii_digit());
            if scanner.peek() == Some('.') && scanner.peek_nth(1).is_some_and(|c| c.is_ascii_digit()) {
                scanner.bump();
                scanner.bump_while(|c| c.is_ascii_digit());
            }
            if matches!(scanner.peek(), Some('e' | 'E')) {
                let signed = matches!(scanner.peek_nth(1), Some('+' | '-'));
                let digit_at = if signed { 2 } else { 1 };
                if scanner.peek_nth(digit_at).is_some_and(|c| c.is_ascii_digit()) {
                    scanner.bump();
                    if signed {
                        scanner.bump();
                    }
                    scanner.bump_while(|c| c.is_ascii_digit());
                }
            }
        }

        match (scanner.peek(), scanner.peek_nth(1)) {
            (Some('b' | 'B'), Some('i' | 'I' | 'd' | 'D')) => {
                scanner.bump();
                scanner.bump();
            }
            (Some('l' | 'L' | 'f' | 'F' | 'd' | 'D'), _) if !is_hex => {
                scanner.bump();
            }
            (Some('l' | 'L'), _) => {
                scanner.bump();
            }
            _ => {}
        }

        if scanner.peek().is_some_and(is_identifier_part) {
            scanner.bump_while(is_identifier_part);
            return Err(LexerError::InvalidNumber {
                text: scanner.text_from(start).to_string(),
                position: start,
            });
        }

        Ok(LexicalToken::NumericLiteral(scanner.text_from(start).to_string()))
    }

    /// `?`, `?N`, `:name`, `?#{..}` and `:#{..}`
    fn parameter(&mut self, scanner: &mut Scanner<'_>, prefix: char) -> Result<LexicalToken, LexerError> {
        let start = scanner.pos;
        scanner.bump();

        if scanner.peek() == Some('#') && scanner.peek_nth(1) == Some('{') {
            scanner.bump();
            self.expression_body(scanner, start)?;
            return Ok(LexicalToken::Parameter {
                style: ParameterStyle::Expression,
                text: scanner.text_from(start).to_string(),
            });
        }

        let style = if prefix == '?' {
            scanner.bump_while(|c| c.is_ascii_digit());
            if scanner.pos.offset - start.offset == 1 {
                ParameterStyle::Jdbc
            } else {
                ParameterStyle::Indexed
            }
        } else {
            if !scanner.peek().is_some_and(is_identifier_start) {
                return Err(LexerError::InvalidParameter {
                    text: prefix.to_string(),
                    position: start,
                });
            }
            scanner.bump_while(is_identifier_part);
            ParameterStyle::Named
        };

        Ok(LexicalToken::Parameter {
            style,
            text: scanner.text_from(start).to_string(),
        })
    }

    /// Balanced `{..}` body, ignoring braces inside quotes
    fn expression_body(&mut self, scanner: &mut Scanner<'_>, start: Position) -> Result<(), LexerError> {
        let mut depth = 0usize;
        let mut quote: Option<char> = None;

        while let Some(ch) = scanner.bump() {
            match (quote, ch) {
                (Some(q), c) if c == q => quote = None,
                (Some(_), _) => {}
                (None, '\'' | '"') => quote = Some(ch),
                (None, '{') => depth += 1,
                (None, '}') => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(());
                    }
                }
                _ => {}
            }
        }

        Err(LexerError::InvalidParameter {
            text: scanner.text_from(start).to_string(),
            position: start,
        })
    }

    fn symbol(&mut self, scanner: &mut Scanner<'_>, ch: char) -> Result<Symbol, LexerError> {
        let start = scanner.pos;
        scanner.bump();
        let next = scanner.peek();

        let (symbol, two_chars) = match (ch, next) {
            ('<', Some('>')) => (Symbol::NotEquals, true),
            ('<', Some('=')) => (Symbol::LessOrEqual, true),
            ('<', _) => (Symbol::LessThan, false),
            ('>', Some('=')) => (Symbol::GreaterOrEqual, true),
            ('>', _) => (Symbol::GreaterThan, false),
            ('!', Some('=')) => (Symbol::BangEquals, true),
            ('^', Some('=')) => (Symbol::CaretEquals, true),
            ('|', Some('|')) => (Symbol::Concat, true),
            ('=', _) => (Symbol::Equals, false),
            ('+', _) => (Symbol::Plus, false),
            ('-', _) => (Symbol::Minus, false),
            ('*', _) => (Symbol::Star, false),
            ('/', _) => (Symbol::Slash, false),
            ('%', _) => (Symbol::Percent, false),
            ('.', _) => (Symbol::Dot, false),
            (',', _) => (Symbol::Comma, false),
            ('(', _) => (Symbol::LeftParen, false),
            (')', _) => (Symbol::RightParen, false),
            ('{', _) => (Symbol::LeftBrace, false),
            ('}', _) => (Symbol::RightBrace, false),
            _ => {
                return Err(LexerError::InvalidCharacter {
                    character: ch,
                    position: start,
                })
            }
        };

        if two_chars {
            scanner.bump();
        }
        Ok(symbol)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn lex(query: &str) -> Vec<LexicalToken> {
        LexicalAnalyzer::new()
            .tokenize(query)
            .unwrap()
            .into_iter()
            .map(Spanned::into_inner)
            .collect()
    }

    #[test]
    fn test_simple_query() {
        let tokens = lex("select u from User u where u.age > ?1");
        assert_eq!(tokens.len(), 12);
        assert_eq!(tokens[0], LexicalToken::Identifier("select".into()));
        assert_eq!(tokens[8], LexicalToken::Identifier("age".into()));
        assert_eq!(tokens[9], LexicalToken::Symbol(Symbol::GreaterThan));
        assert_matches!(
            &tokens[10],
            LexicalToken::Parameter { style: ParameterStyle::Indexed, text } if text == "?1"
        );
        assert!(tokens[11].is_eof());
    }

    #[test]
    fn test_string_literals_keep_source_text() {
        let tokens = lex("where u.name = 'O''Brien'");
        assert_eq!(tokens[5], LexicalToken::StringLiteral("'O''Brien'".into()));
    }

    #[test]
    fn test_numeric_literals() {
        let tokens = lex("1 2.5 .5 1e10 10L 3.0BD 0xFF");
        let texts: Vec<_> = tokens.iter().map(LexicalToken::text).collect();
        assert_eq!(texts, vec!["1", "2.5", ".5", "1e10", "10L", "3.0BD", "0xFF", ""]);
    }

    #[test]
    fn test_invalid_number() {
        let error = LexicalAnalyzer::new().tokenize("select 12abc").unwrap_err();
        assert_matches!(error, LexerError::InvalidNumber { ref text, .. } if text == "12abc");
        assert_eq!(error.error_code().as_str(), "E022");
    }

    #[test]
    fn test_parameter_styles() {
        let tokens = lex("? ?3 :name ?#{[0]} :#{#user.id}");
        let styles: Vec<_> = tokens
            .iter()
            .filter_map(|t| match t {
                LexicalToken::Parameter { style, .. } => Some(*style),
                _ => None,
            })
            .collect();
        assert_eq!(
            styles,
            vec![
                ParameterStyle::Jdbc,
                ParameterStyle::Indexed,
                ParameterStyle::Named,
                ParameterStyle::Expression,
                ParameterStyle::Expression
            ]
        );
    }

    #[test]
    fn test_expression_placeholder_braces_in_quotes() {
        let tokens = lex(":#{'}'} x");
        assert_eq!(tokens[0].text(), ":#{'}'}");
        assert_eq!(tokens[1], LexicalToken::Identifier("x".into()));
    }

    #[test]
    fn test_comments_are_skipped() {
        let tokens = lex("select /* all */ u -- trailing\nfrom User u");
        let texts: Vec<_> = tokens.iter().map(LexicalToken::text).collect();
        assert_eq!(texts, vec!["select", "u", "from", "User", "u", ""]);
    }

    #[test]
    fn test_unterminated_inputs() {
        let mut analyzer = LexicalAnalyzer::new();
        assert_matches!(
            analyzer.tokenize("where x = 'abc"),
            Err(LexerError::UnterminatedString { position }) if position.column == 11
        );
        assert_matches!(
            analyzer.tokenize("select /* open"),
            Err(LexerError::UnterminatedComment { .. })
        );
        assert_matches!(analyzer.tokenize("where x = :"), Err(LexerError::InvalidParameter { .. }));
    }

    #[test]
    fn test_multi_char_operators() {
        let tokens = lex("a <> b != c ^= d <= e >= f || g");
        let symbols: Vec<_> = tokens
            .iter()
            .filter_map(|t| match t {
                LexicalToken::Symbol(s) => Some(*s),
                _ => None,
            })
            .collect();
        assert_eq!(
            symbols,
            vec![
                Symbol::NotEquals,
                Symbol::BangEquals,
                Symbol::CaretEquals,
                Symbol::LessOrEqual,
                Symbol::GreaterOrEqual,
                Symbol::Concat
            ]
        );
    }

    #[test]
    fn test_invalid_character() {
        let error = LexicalAnalyzer::new().tokenize("select u from User u;").unwrap_err();
        assert_matches!(error, LexerError::InvalidCharacter { character: ';', position } if position.column == 21);
    }

    #[test]
    fn test_spans_track_lines() {
        let tokens = LexicalAnalyzer::new().tokenize("select u\nfrom User u").unwrap();
        assert_eq!(tokens[2].span.start().line, 2);
        assert_eq!(tokens[2].span.start().column, 1);
        assert_eq!(tokens[3].span.start().column, 6);
    }

    #[test]
    fn test_metrics() {
        let mut analyzer = LexicalAnalyzer::new();
        analyzer.tokenize("select u from User u where u.id = :id /* c */").unwrap();
        assert_eq!(analyzer.metrics().parameter_tokens, 1);
        assert_eq!(analyzer.metrics().comment_count, 1);
        assert_eq!(analyzer.metrics().total_tokens, 11);
    }
}
