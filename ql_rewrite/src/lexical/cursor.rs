//! Position-tracking cursor over lexed tokens

use super::analyzer::SpannedToken;
use super::token::{LexicalToken, Symbol};
use crate::utils::Span;

/// Cursor over a token vector that always ends with `Eof`
#[derive(Debug, Clone)]
pub struct TokenCursor {
    tokens: Vec<SpannedToken>,
    position: usize,
}

impl TokenCursor {
    pub fn new(mut tokens: Vec<SpannedToken>) -> Self {
        if !tokens.last().is_some_and(|t| t.value.is_eof()) {
            let end = tokens.last().map(|t| Span::point(t.span.end())).unwrap_or_default();
            tokens.push(SpannedToken::new(LexicalToken::Eof, end));
        }
        Self {
            tokens,
            position: 0,
        }
    }

    pub fn current(&self) -> &SpannedToken {
        let last = self.tokens.len() - 1;
        &self.tokens[self.position.min(last)]
    }

    pub fn current_token(&self) -> &LexicalToken {
        &self.current().value
    }

    pub fn current_span(&self) -> Span {
        self.current().span
    }

    /// Token `n` places ahead of the current one; `Eof` past the end
    pub fn peek_ahead(&self, n: usize) -> &LexicalToken {
        let last = self.tokens.len() - 1;
        &self.tokens[(self.position + n).min(last)].value
    }

    pub fn advance(&mut self) -> SpannedToken {
        let token = self.current().clone();
        if !token.value.is_eof() {
            self.position += 1;
        }
        token
    }

    pub fn is_at_end(&self) -> bool {
        self.current_token().is_eof()
    }

    pub fn check_symbol(&self, symbol: Symbol) -> bool {
        self.current_token().is_symbol(symbol)
    }

    pub fn advance_if_symbol(&mut self, symbol: Symbol) -> bool {
        if self.check_symbol(symbol) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Span of the token before the current one
    pub fn previous_span(&self) -> Span {
        self.position
            .checked_sub(1)
            .and_then(|index| self.tokens.get(index))
            .map(|t| t.span)
            .unwrap_or_else(|| self.current_span())
    }

    /// Span from the token at `start` to the last consumed token
    pub fn span_from(&self, start: usize) -> Span {
        let first = self.tokens.get(start).map(|t| t.span).unwrap_or_default();
        first.merge(self.previous_span())
    }

    pub fn save_position(&self) -> usize {
        self.position
    }

    pub fn restore_position(&mut self, saved_position: usize) {
        self.position = saved_position.min(self.tokens.len() - 1);
    }

    /// Number of tokens, `Eof` excluded
    pub fn len(&self) -> usize {
        self.tokens.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn remaining_count(&self) -> usize {
        self.len().saturating_sub(self.position)
    }
}
