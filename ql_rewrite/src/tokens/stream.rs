//! Token streams and their builder

use super::token::QueryToken;
use std::fmt;

/// An ordered, immutable tree of tokens.
#[derive(Debug, Clone, Default)]
pub enum TokenStream {
    #[default]
    Empty,
    /// Flat list; spacing follows the previous token's flag
    Tokens(Vec<QueryToken>),
    /// Nested streams; spacing follows the flags at each boundary
    Composite(Vec<TokenStream>),
    /// Never reports itself as an expression
    Inline(Box<TokenStream>),
    /// Always reports itself as an expression
    Expression(Box<TokenStream>),
}

impl TokenStream {
    pub fn empty() -> Self {
        TokenStream::Empty
    }

    pub fn from_token(token: QueryToken) -> Self {
        TokenStream::Tokens(vec![token])
    }

    pub fn from_tokens(tokens: impl IntoIterator<Item = QueryToken>) -> Self {
        let tokens: Vec<_> = tokens.into_iter().collect();
        if tokens.is_empty() {
            TokenStream::Empty
        } else {
            TokenStream::Tokens(tokens)
        }
    }

    /// Wrap `stream` so it does not force a space on its neighbours
    pub fn inline(stream: impl Into<TokenStream>) -> Self {
        match stream.into() {
            TokenStream::Empty => TokenStream::Empty,
            inline @ TokenStream::Inline(_) => inline,
            other => TokenStream::Inline(Box::new(other)),
        }
    }

    /// Wrap `stream` so it is treated as an expression at its boundaries
    pub fn expression(stream: impl Into<TokenStream>) -> Self {
        match stream.into() {
            TokenStream::Empty => TokenStream::Empty,
            expression @ TokenStream::Expression(_) => expression,
            other => TokenStream::Expression(Box::new(other)),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            TokenStream::Empty => true,
            TokenStream::Tokens(tokens) => tokens.is_empty(),
            TokenStream::Composite(nested) => nested.iter().all(TokenStream::is_empty),
            TokenStream::Inline(inner) | TokenStream::Expression(inner) => inner.is_empty(),
        }
    }

    /// Classification of the stream's trailing unit
    pub fn is_expression(&self) -> bool {
        match self {
            TokenStream::Empty | TokenStream::Inline(_) => false,
            TokenStream::Expression(_) => true,
            TokenStream::Tokens(tokens) => tokens.last().is_some_and(QueryToken::is_expression),
            TokenStream::Composite(nested) => nested
                .iter()
                .rev()
                .find(|stream| !stream.is_empty())
                .is_some_and(TokenStream::is_expression),
        }
    }

    /// Concatenate two streams; adjacent flat lists merge into one list
    pub fn append(self, other: impl Into<TokenStream>) -> Self {
        let other = other.into();
        if other.is_empty() {
            return self;
        }
        match self {
            TokenStream::Empty => other,
            TokenStream::Tokens(mut tokens) => match other {
                TokenStream::Tokens(more) => {
                    tokens.extend(more);
                    TokenStream::Tokens(tokens)
                }
                other if tokens.is_empty() => other,
                other => TokenStream::Composite(vec![TokenStream::Tokens(tokens), other]),
            },
            TokenStream::Composite(mut nested) => {
                nested.push(other);
                TokenStream::Composite(nested)
            }
            wrapped => TokenStream::Composite(vec![wrapped, other]),
        }
    }

    /// Render to query text
    pub fn render(&self) -> String {
        match self {
            TokenStream::Empty => String::new(),
            TokenStream::Tokens(tokens) => render_tokens(tokens),
            TokenStream::Composite(nested) => render_nested(nested),
            TokenStream::Inline(inner) | TokenStream::Expression(inner) => inner.render(),
        }
    }

    /// All tokens in render order
    pub fn tokens(&self) -> Vec<&QueryToken> {
        let mut out = Vec::new();
        self.collect_tokens(&mut out);
        out
    }

    fn collect_tokens<'a>(&'a self, out: &mut Vec<&'a QueryToken>) {
        match self {
            TokenStream::Empty => {}
            TokenStream::Tokens(tokens) => out.extend(tokens.iter()),
            TokenStream::Composite(nested) => {
                for stream in nested {
                    stream.collect_tokens(out);
                }
            }
            TokenStream::Inline(inner) | TokenStream::Expression(inner) => {
                inner.collect_tokens(out)
            }
        }
    }

    pub fn token_count(&self) -> usize {
        self.tokens().len()
    }
}

fn ends_with_space(buffer: &str) -> bool {
    buffer.ends_with(' ')
}

fn render_tokens(tokens: &[QueryToken]) -> String {
    let mut buffer = String::new();
    let mut previous_expression = false;

    for token in tokens {
        if previous_expression && !buffer.is_empty() && !ends_with_space(&buffer) {
            buffer.push(' ');
        }
        previous_expression = token.is_expression();
        buffer.push_str(token.text());
    }

    buffer
}

fn render_nested(nested: &[TokenStream]) -> String {
    let mut buffer = String::new();
    let mut last_expression = false;

    for stream in nested.iter().filter(|stream| !stream.is_empty()) {
        if !buffer.is_empty()
            && !ends_with_space(&buffer)
            && (last_expression || stream.is_expression())
        {
            buffer.push(' ');
        }
        buffer.push_str(&stream.render());
        last_expression = stream.is_expression();
    }

    buffer
}

impl From<QueryToken> for TokenStream {
    fn from(token: QueryToken) -> Self {
        TokenStream::from_token(token)
    }
}

impl From<TokenStreamBuilder> for TokenStream {
    fn from(builder: TokenStreamBuilder) -> Self {
        builder.build()
    }
}

impl fmt::Display for TokenStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

/// Mutable accumulator used during a single rendering pass
#[derive(Debug, Clone, Default)]
pub struct TokenStreamBuilder {
    current: TokenStream,
}

impl TokenStreamBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_token(token: QueryToken) -> Self {
        let mut builder = Self::new();
        builder.append_token(token);
        builder
    }

    pub fn append(&mut self, stream: impl Into<TokenStream>) -> &mut Self {
        self.current = std::mem::take(&mut self.current).append(stream);
        self
    }

    pub fn append_token(&mut self, token: QueryToken) -> &mut Self {
        self.append(TokenStream::from_token(token))
    }

    /// Append without letting the stream's expression flag leak outward
    pub fn append_inline(&mut self, stream: impl Into<TokenStream>) -> &mut Self {
        let stream = stream.into();
        if stream.is_expression() {
            self.append(TokenStream::inline(stream))
        } else {
            self.append(stream)
        }
    }

    /// Append as an expression so it is space-separated from neighbours
    pub fn append_expression(&mut self, stream: impl Into<TokenStream>) -> &mut Self {
        let stream = stream.into();
        if stream.is_expression() {
            self.append(stream)
        } else {
            self.append(TokenStream::expression(stream))
        }
    }

    pub fn is_empty(&self) -> bool {
        self.current.is_empty()
    }

    pub fn is_expression(&self) -> bool {
        self.current.is_expression()
    }

    pub fn build(self) -> TokenStream {
        self.current
    }

    /// Join streams with `separator`, each item inlined
    pub fn concat<I, S>(items: I, separator: QueryToken) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<TokenStream>,
    {
        Self::join(items, separator, TokenStream::inline)
    }

    /// Join streams with `separator`, each item forced to an expression
    pub fn concat_expressions<I, S>(items: I, separator: QueryToken) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<TokenStream>,
    {
        Self::join(items, separator, TokenStream::expression)
    }

    fn join<I, S>(items: I, separator: QueryToken, wrap: fn(TokenStream) -> TokenStream) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<TokenStream>,
    {
        let mut builder = Self::new();
        for item in items {
            if !builder.is_empty() {
                builder.append_token(separator.clone());
            }
            builder.append(wrap(item.into()));
        }
        builder
    }
}
