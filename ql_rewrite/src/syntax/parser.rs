//! Recursive-descent parser for JPQL and HQL
//!
//! Statements and clauses are parsed top-down; expressions use binding
//! powers. Dialect-only constructs are parsed in both dialects and rejected
//! with [`SyntaxError::UnsupportedInDialect`] when the dialect lacks them, so
//! the error names the construct rather than the token that follows it.

use crate::config::compile_time::syntax::*;
use crate::config::runtime::SyntaxPreferences;
use crate::grammar::ast::*;
use crate::grammar::{Dialect, Feature, Keyword};
use crate::lexical::{LexicalToken, Symbol, TokenCursor};
use crate::logging::codes;
use crate::syntax::error::{SyntaxError, SyntaxResult};
use crate::utils::Span;
use std::collections::VecDeque;

// Binding powers, (left, right); higher binds tighter
mod bp {
    pub const OR: (u8, u8) = (1, 2);
    pub const AND: (u8, u8) = (3, 4);
    pub const NOT_PREFIX: u8 = 5;
    // = <> IS LIKE BETWEEN IN MEMBER
    pub const EQUALITY: (u8, u8) = (7, 8);
    pub const COMPARISON: (u8, u8) = (9, 10);
    pub const ADD: (u8, u8) = (15, 16);
    pub const MUL: (u8, u8) = (17, 18);
    pub const CONCAT: (u8, u8) = (19, 20);
    pub const UNARY: u8 = 23;
}

fn kw(words: Vec<String>) -> Kw {
    Kw(words.join(" "))
}

/// Second word of an HQL date-time literal such as `local date` or `offset datetime`
fn is_temporal_literal(prefix: &str, word: &str) -> bool {
    let word = word.to_ascii_lowercase();
    match prefix.to_ascii_lowercase().as_str() {
        "local" => matches!(word.as_str(), "date" | "time" | "datetime"),
        "current" => matches!(word.as_str(), "date" | "time" | "datetime" | "timestamp" | "instant"),
        "offset" => word == "datetime",
        _ => false,
    }
}

fn is_temporal_unit(word: &str) -> bool {
    matches!(
        word.to_ascii_lowercase().as_str(),
        "year" | "quarter" | "month" | "week" | "day" | "hour" | "minute" | "second" | "nanosecond"
    )
}

pub struct QueryParser {
    cursor: TokenCursor,
    dialect: Dialect,
    preferences: SyntaxPreferences,
    context_stack: Vec<&'static str>,
    failure_context: Option<String>,
    error_history: VecDeque<SyntaxError>,
    parse_depth: usize,
    max_depth: usize,
}

impl QueryParser {
    pub fn new(cursor: TokenCursor, dialect: Dialect) -> Self {
        Self::with_preferences(cursor, dialect, SyntaxPreferences::default())
    }

    pub fn with_preferences(cursor: TokenCursor, dialect: Dialect, preferences: SyntaxPreferences) -> Self {
        log_debug!("Creating query parser",
            "tokens" => cursor.len(),
            "dialect" => dialect
        );

        Self {
            cursor,
            dialect,
            preferences,
            context_stack: Vec::new(),
            failure_context: None,
            error_history: VecDeque::new(),
            parse_depth: 0,
            max_depth: MAX_PARSE_DEPTH,
        }
    }

    /// Lower the nesting limit; it can never exceed the built-in maximum
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth.clamp(1, MAX_PARSE_DEPTH);
        self
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Recent errors, oldest first
    pub fn error_history(&self) -> Vec<&SyntaxError> {
        self.error_history.iter().collect()
    }

    /// Parse one complete statement; trailing tokens are an error
    pub fn parse_statement(&mut self) -> SyntaxResult<Statement> {
        if self.cursor.is_empty() {
            let error = SyntaxError::EmptyQuery;
            log_error!(error.error_code(), "Cannot parse an empty query");
            self.record_error(error.clone());
            return Err(error);
        }

        let result = self.within("statement", |p| {
            let statement = match p.keyword() {
                Some(Keyword::Update) => Statement::Update(p.parse_update()?),
                Some(Keyword::Delete) => Statement::Delete(p.parse_delete()?),
                Some(Keyword::Insert) => Statement::Insert(p.parse_insert()?),
                _ => Statement::Select(p.parse_query()?),
            };

            if !p.cursor.is_at_end() {
                return Err(p.error_expected("end of query"));
            }
            Ok(statement)
        });

        match result {
            Ok(statement) => {
                if self.preferences.log_parse_events {
                    log_success!(codes::success::PARSE_COMPLETE,
                        "Query parsed",
                        "dialect" => self.dialect,
                        "tokens" => self.cursor.len()
                    );
                }
                Ok(statement)
            }
            Err(error) => {
                self.record_error(error.clone());
                let context = self.failure_context.clone().unwrap_or_default();
                log_error!(error.error_code(), "Query parsing failed",
                    span = error.span().unwrap_or_else(|| self.cursor.current_span()),
                    "context" => context,
                    "dialect" => self.dialect,
                    "error" => &error
                );
                Err(error)
            }
        }
    }

    // ========================================================================
    // Parser state helpers
    // ========================================================================

    /// Run `parse` one nesting level deeper, bounded by the configured depth
    fn within<T>(
        &mut self,
        context: &'static str,
        parse: impl FnOnce(&mut Self) -> SyntaxResult<T>,
    ) -> SyntaxResult<T> {
        if self.parse_depth >= self.max_depth {
            return Err(SyntaxError::max_recursion_depth(self.cursor.current_span()));
        }

        self.parse_depth += 1;
        let pushed = self.context_stack.len() < MAX_CONTEXT_STACK_DEPTH;
        if pushed {
            self.context_stack.push(context);
        }

        let result = parse(self);

        if result.is_err() && self.failure_context.is_none() {
            self.failure_context = Some(self.context_stack.join(" > "));
        }
        if pushed {
            self.context_stack.pop();
        }
        self.parse_depth -= 1;
        result
    }

    fn record_error(&mut self, error: SyntaxError) {
        if self.error_history.len() >= MAX_ERROR_HISTORY {
            self.error_history.pop_front();
        }
        self.error_history.push_back(error);
    }

    fn error_expected(&self, expected: &str) -> SyntaxError {
        let current = self.cursor.current();
        if current.value.is_eof() {
            SyntaxError::unexpected_end_of_input(expected, current.span)
        } else {
            SyntaxError::unexpected_token(expected, &current.value.describe(), current.span)
        }
    }

    fn require(&self, feature: Feature, span: Span) -> SyntaxResult<()> {
        if self.dialect.supports(feature) {
            Ok(())
        } else {
            Err(SyntaxError::unsupported(feature.description(), self.dialect, span))
        }
    }

    fn keyword_at(&self, n: usize) -> Option<Keyword> {
        match self.cursor.peek_ahead(n) {
            LexicalToken::Identifier(word) => Keyword::from_word(word),
            _ => None,
        }
    }

    fn keyword(&self) -> Option<Keyword> {
        self.keyword_at(0)
    }

    fn check_keyword(&self, keyword: Keyword) -> bool {
        self.keyword() == Some(keyword)
    }

    fn symbol_at(&self, n: usize) -> Option<Symbol> {
        match self.cursor.peek_ahead(n) {
            LexicalToken::Symbol(symbol) => Some(*symbol),
            _ => None,
        }
    }

    fn check_symbol(&self, symbol: Symbol) -> bool {
        self.cursor.check_symbol(symbol)
    }

    fn accept_symbol(&mut self, symbol: Symbol) -> bool {
        self.cursor.advance_if_symbol(symbol)
    }

    fn expect_symbol(&mut self, symbol: Symbol) -> SyntaxResult<()> {
        if self.accept_symbol(symbol) {
            Ok(())
        } else {
            Err(self.error_expected(&format!("'{}'", symbol.as_str())))
        }
    }

    /// Consume `keyword` and return its text as written
    fn accept_keyword(&mut self, keyword: Keyword) -> Option<String> {
        if self.check_keyword(keyword) {
            Some(self.cursor.advance().value.text().to_string())
        } else {
            None
        }
    }

    fn expect_keyword(&mut self, keyword: Keyword) -> SyntaxResult<String> {
        match self.accept_keyword(keyword) {
            Some(text) => Ok(text),
            None => Err(self.error_expected(&keyword.as_str().to_uppercase())),
        }
    }

    /// Consume a whole keyword sequence, or nothing
    fn accept_sequence(&mut self, sequence: &[Keyword]) -> Option<Kw> {
        let matches = sequence
            .iter()
            .enumerate()
            .all(|(i, keyword)| self.keyword_at(i) == Some(*keyword));
        if !matches {
            return None;
        }

        let words = sequence
            .iter()
            .map(|_| self.cursor.advance().value.text().to_string())
            .collect();
        Some(kw(words))
    }

    fn expect_sequence(&mut self, sequence: &[Keyword]) -> SyntaxResult<Kw> {
        match self.accept_sequence(sequence) {
            Some(keyword) => Ok(keyword),
            None => {
                let expected: Vec<_> = sequence.iter().map(|k| k.as_str().to_uppercase()).collect();
                Err(self.error_expected(&expected.join(" ")))
            }
        }
    }

    /// Any word, reserved or not
    fn expect_name(&mut self, expected: &str) -> SyntaxResult<String> {
        if self.cursor.current_token().is_identifier() {
            Ok(self.cursor.advance().value.text().to_string())
        } else {
            Err(self.error_expected(expected))
        }
    }

    /// `a.b.c` with any words as segments
    fn parse_dotted_name(&mut self, expected: &str) -> SyntaxResult<String> {
        let mut name = self.expect_name(expected)?;
        while self.check_symbol(Symbol::Dot) && self.cursor.peek_ahead(1).is_identifier() {
            self.cursor.advance();
            name.push('.');
            name.push_str(&self.expect_name("path segment")?);
        }
        Ok(name)
    }

    fn at_alias_candidate(&self) -> bool {
        match self.cursor.current_token() {
            LexicalToken::QuotedIdentifier(_) => true,
            LexicalToken::Identifier(word) => {
                !Keyword::from_word(word).is_some_and(Keyword::is_reserved)
            }
            _ => false,
        }
    }

    fn parse_optional_alias(&mut self) -> SyntaxResult<Option<Alias>> {
        if let Some(as_text) = self.accept_keyword(Keyword::As) {
            let name = self.expect_name("alias")?;
            return Ok(Some(Alias {
                as_keyword: Some(Kw(as_text)),
                name,
            }));
        }

        if self.at_alias_candidate() {
            let name = self.cursor.advance().value.text().to_string();
            return Ok(Some(Alias {
                as_keyword: None,
                name,
            }));
        }

        Ok(None)
    }

    /// Current token is `(` and a query starts right after it
    fn at_parenthesized_query(&self) -> bool {
        self.check_symbol(Symbol::LeftParen)
            && matches!(
                self.keyword_at(1),
                Some(Keyword::Select | Keyword::From | Keyword::With)
            )
    }

    fn parse_parenthesized_query(&mut self) -> SyntaxResult<Query> {
        self.expect_symbol(Symbol::LeftParen)?;
        let query = self.parse_query()?;
        self.expect_symbol(Symbol::RightParen)?;
        Ok(query)
    }

    fn comma_separated<T>(
        &mut self,
        mut parse_item: impl FnMut(&mut Self) -> SyntaxResult<T>,
    ) -> SyntaxResult<Vec<T>> {
        let mut items = vec![parse_item(self)?];
        while self.accept_symbol(Symbol::Comma) {
            items.push(parse_item(self)?);
        }
        Ok(items)
    }

    // ========================================================================
    // Queries
    // ========================================================================

    fn parse_query(&mut self) -> SyntaxResult<Query> {
        self.within("query", |p| {
            let with = if p.check_keyword(Keyword::With) {
                Some(p.parse_with_clause()?)
            } else {
                None
            };

            let body = p.parse_query_body()?;
            let order_by = p.parse_optional_order_by()?;
            let limit = p.parse_optional_limit()?;
            let offset = p.parse_optional_offset()?;
            let fetch = p.parse_optional_fetch()?;

            Ok(Query {
                with,
                body,
                order_by,
                limit,
                offset,
                fetch,
            })
        })
    }

    fn parse_with_clause(&mut self) -> SyntaxResult<WithClause> {
        let span = self.cursor.current_span();
        self.require(Feature::CommonTableExpressions, span)?;
        let keyword = Kw(self.expect_keyword(Keyword::With)?);

        let ctes = self.comma_separated(|p| {
            let name = p.expect_name("common table expression name")?;
            let columns = if p.accept_symbol(Symbol::LeftParen) {
                let columns = p.comma_separated(|p| p.expect_name("column name"))?;
                p.expect_symbol(Symbol::RightParen)?;
                columns
            } else {
                Vec::new()
            };

            let as_keyword = Kw(p.expect_keyword(Keyword::As)?);
            let materialized = p
                .accept_sequence(&[Keyword::Not, Keyword::Materialized])
                .or_else(|| p.accept_keyword(Keyword::Materialized).map(Kw));
            let query = p.within("common table expression", |p| p.parse_parenthesized_query())?;

            Ok(CommonTableExpression {
                name,
                columns,
                as_keyword,
                materialized,
                query: Box::new(query),
            })
        })?;

        Ok(WithClause { keyword, ctes })
    }

    fn parse_query_body(&mut self) -> SyntaxResult<QueryBody> {
        let mut body = self.parse_query_primary()?;

        while let Some(operator) = self.parse_set_operator() {
            let right = self.parse_query_primary()?;
            body = QueryBody::SetOperation {
                left: Box::new(body),
                operator,
                right: Box::new(right),
            };
        }

        Ok(body)
    }

    fn parse_set_operator(&mut self) -> Option<Kw> {
        let operator = self
            .accept_keyword(Keyword::Union)
            .or_else(|| self.accept_keyword(Keyword::Intersect))
            .or_else(|| self.accept_keyword(Keyword::Except))?;

        let mut words = vec![operator];
        if let Some(quantifier) = self
            .accept_keyword(Keyword::All)
            .or_else(|| self.accept_keyword(Keyword::Distinct))
        {
            words.push(quantifier);
        }
        Some(kw(words))
    }

    fn parse_query_primary(&mut self) -> SyntaxResult<QueryBody> {
        if self.at_parenthesized_query() {
            let query = self.within("nested query", |p| p.parse_parenthesized_query())?;
            return Ok(QueryBody::Nested(Box::new(query)));
        }
        Ok(QueryBody::Spec(Box::new(self.parse_query_spec()?)))
    }

    fn parse_query_spec(&mut self) -> SyntaxResult<QuerySpec> {
        let select = match self.keyword() {
            Some(Keyword::Select) => Some(self.parse_select_clause()?),
            Some(Keyword::From) => {
                self.require(Feature::ImplicitSelect, self.cursor.current_span())?;
                None
            }
            _ => return Err(self.error_expected("SELECT or FROM")),
        };

        let from = if self.check_keyword(Keyword::From) {
            Some(self.parse_from_clause()?)
        } else if self.dialect == Dialect::Jpql {
            return Err(self.error_expected("FROM"));
        } else {
            None
        };

        let where_clause = self.parse_optional_where()?;

        let group_by = match self.accept_sequence(&[Keyword::Group, Keyword::By]) {
            Some(keyword) => Some(GroupByClause {
                keyword,
                items: self.comma_separated(|p| p.parse_expr())?,
            }),
            None => None,
        };

        let having = match self.accept_keyword(Keyword::Having) {
            Some(text) => Some(HavingClause {
                keyword: Kw(text),
                condition: self.parse_expr()?,
            }),
            None => None,
        };

        Ok(QuerySpec {
            select,
            from,
            where_clause,
            group_by,
            having,
        })
    }

    fn parse_select_clause(&mut self) -> SyntaxResult<SelectClause> {
        let keyword = Kw(self.expect_keyword(Keyword::Select)?);
        let distinct = self.accept_keyword(Keyword::Distinct).map(Kw);
        let items = self.within("select clause", |p| p.comma_separated(|p| p.parse_select_item()))?;

        Ok(SelectClause {
            keyword,
            distinct,
            items,
        })
    }

    fn parse_select_item(&mut self) -> SyntaxResult<SelectItem> {
        let expr = if self.check_keyword(Keyword::New) {
            self.parse_constructor()?
        } else {
            self.parse_expr()?
        };
        let alias = self.parse_optional_alias()?;
        Ok(SelectItem { expr, alias })
    }

    fn parse_constructor(&mut self) -> SyntaxResult<Expr> {
        let keyword = Kw(self.expect_keyword(Keyword::New)?);
        let type_name = self.parse_dotted_name("constructor type")?;
        self.expect_symbol(Symbol::LeftParen)?;
        let args = self.comma_separated(|p| p.parse_instantiation_argument())?;
        self.expect_symbol(Symbol::RightParen)?;

        Ok(Expr::Constructor {
            keyword,
            type_name,
            args,
        })
    }

    /// Constructor argument; HQL also admits an alias or a nested `new`
    fn parse_instantiation_argument(&mut self) -> SyntaxResult<SelectItem> {
        let span = self.cursor.current_span();
        let expr = if self.check_keyword(Keyword::New) {
            self.require(Feature::InstantiationArguments, span)?;
            self.parse_constructor()?
        } else {
            self.parse_expr()?
        };

        let alias_span = self.cursor.current_span();
        let alias = self.parse_optional_alias()?;
        if alias.is_some() {
            self.require(Feature::InstantiationArguments, alias_span)?;
        }
        Ok(SelectItem { expr, alias })
    }

    fn parse_from_clause(&mut self) -> SyntaxResult<FromClause> {
        let keyword = Kw(self.expect_keyword(Keyword::From)?);
        let items = self.within("from clause", |p| p.comma_separated(|p| p.parse_from_item()))?;
        Ok(FromClause { keyword, items })
    }

    fn parse_from_item(&mut self) -> SyntaxResult<FromItem> {
        let root = self.parse_from_root()?;
        let mut joins = Vec::new();
        while let Some(join) = self.parse_optional_join()? {
            joins.push(join);
        }
        Ok(FromItem { root, joins })
    }

    fn parse_from_root(&mut self) -> SyntaxResult<FromRoot> {
        let span = self.cursor.current_span();

        if self.check_keyword(Keyword::In) && self.symbol_at(1) == Some(Symbol::LeftParen) {
            let keyword = Kw(self.expect_keyword(Keyword::In)?);
            self.expect_symbol(Symbol::LeftParen)?;
            let path = self.parse_expr()?;
            self.expect_symbol(Symbol::RightParen)?;
            let alias = self.parse_optional_alias()?;
            return Ok(FromRoot::CollectionMember {
                keyword,
                path,
                alias,
            });
        }

        let lateral = self.accept_keyword(Keyword::Lateral).map(Kw);
        if lateral.is_some() {
            self.require(Feature::LateralJoins, span)?;
        }

        if self.check_symbol(Symbol::LeftParen) {
            self.require(Feature::FromSubqueries, span)?;
            let query = self.within("from subquery", |p| p.parse_parenthesized_query())?;
            let alias = self.parse_optional_alias()?;
            return Ok(FromRoot::Subquery {
                lateral,
                query: Box::new(query),
                alias,
            });
        }

        let name = self.parse_dotted_name("entity name")?;
        if self.check_symbol(Symbol::LeftParen) {
            self.require(Feature::FromFunctions, span)?;
            let call = self.parse_function_call(name)?;
            let alias = self.parse_optional_alias()?;
            return Ok(FromRoot::Function { call, alias });
        }

        let alias = self.parse_optional_alias()?;
        Ok(FromRoot::Entity { name, alias })
    }

    fn parse_optional_join(&mut self) -> SyntaxResult<Option<Join>> {
        let mut words = Vec::new();
        match self.keyword() {
            Some(Keyword::Join) => {}
            Some(Keyword::Inner | Keyword::Cross) => {
                words.push(self.cursor.advance().value.text().to_string());
            }
            Some(Keyword::Left | Keyword::Right | Keyword::Full) => {
                words.push(self.cursor.advance().value.text().to_string());
                if let Some(outer) = self.accept_keyword(Keyword::Outer) {
                    words.push(outer);
                }
            }
            _ => return Ok(None),
        }
        words.push(self.expect_keyword(Keyword::Join)?);

        self.within("join", |p| {
            let fetch = p.accept_keyword(Keyword::Fetch).map(Kw);

            let span = p.cursor.current_span();
            let lateral = p.accept_keyword(Keyword::Lateral).map(Kw);
            if lateral.is_some() {
                p.require(Feature::LateralJoins, span)?;
            }

            let target = if p.check_symbol(Symbol::LeftParen) {
                p.require(Feature::FromSubqueries, p.cursor.current_span())?;
                Expr::Subquery(Box::new(p.parse_parenthesized_query()?))
            } else {
                p.parse_primary()?
            };

            let alias = p.parse_optional_alias()?;

            let condition_keyword = match p.accept_keyword(Keyword::On) {
                Some(text) => Some(text),
                None if p.dialect == Dialect::Hql => p.accept_keyword(Keyword::With),
                None => None,
            };
            let condition = match condition_keyword {
                Some(text) => Some(JoinCondition {
                    keyword: Kw(text),
                    condition: p.parse_expr()?,
                }),
                None => None,
            };

            Ok(Some(Join {
                keyword: kw(words),
                fetch,
                lateral,
                target,
                alias,
                condition,
            }))
        })
    }

    fn parse_optional_where(&mut self) -> SyntaxResult<Option<WhereClause>> {
        match self.accept_keyword(Keyword::Where) {
            Some(text) => Ok(Some(WhereClause {
                keyword: Kw(text),
                condition: self.within("where clause", |p| p.parse_expr())?,
            })),
            None => Ok(None),
        }
    }

    fn parse_optional_order_by(&mut self) -> SyntaxResult<Option<OrderByClause>> {
        match self.accept_sequence(&[Keyword::Order, Keyword::By]) {
            Some(keyword) => {
                let items = self.within("order by clause", |p| {
                    p.comma_separated(|p| p.parse_sort_item())
                })?;
                Ok(Some(OrderByClause { keyword, items }))
            }
            None => Ok(None),
        }
    }

    fn parse_sort_item(&mut self) -> SyntaxResult<SortItem> {
        let expr = self.parse_expr()?;
        let span = self.cursor.current_span();
        let collation = match self.accept_keyword(Keyword::Collate) {
            Some(text) => {
                self.require(Feature::Collations, span)?;
                Some((Kw(text), self.parse_collation()?))
            }
            None => None,
        };
        let direction = self
            .accept_keyword(Keyword::Asc)
            .or_else(|| self.accept_keyword(Keyword::Desc))
            .map(Kw);
        let nulls = self
            .accept_sequence(&[Keyword::Nulls, Keyword::First])
            .or_else(|| self.accept_sequence(&[Keyword::Nulls, Keyword::Last]));

        Ok(SortItem {
            expr,
            collation,
            direction,
            nulls,
        })
    }

    /// `"C"`, `'de_DE'` or a plain collation name
    fn parse_collation(&mut self) -> SyntaxResult<Expr> {
        if let LexicalToken::StringLiteral(text) = self.cursor.current_token() {
            let text = text.clone();
            self.cursor.advance();
            return Ok(Expr::Literal(text));
        }
        Ok(Expr::Path(self.parse_dotted_name("collation")?))
    }

    fn parse_optional_limit(&mut self) -> SyntaxResult<Option<LimitClause>> {
        if !self.check_keyword(Keyword::Limit) {
            return Ok(None);
        }
        self.require(Feature::ResultLimits, self.cursor.current_span())?;
        let keyword = Kw(self.expect_keyword(Keyword::Limit)?);
        let count = self.parse_expr()?;
        Ok(Some(LimitClause { keyword, count }))
    }

    fn parse_optional_offset(&mut self) -> SyntaxResult<Option<OffsetClause>> {
        if !self.check_keyword(Keyword::Offset) {
            return Ok(None);
        }
        self.require(Feature::ResultLimits, self.cursor.current_span())?;
        let keyword = Kw(self.expect_keyword(Keyword::Offset)?);
        let count = self.parse_expr()?;
        let rows = self
            .accept_keyword(Keyword::Rows)
            .or_else(|| self.accept_keyword(Keyword::Row))
            .map(Kw);
        Ok(Some(OffsetClause {
            keyword,
            count,
            rows,
        }))
    }

    fn parse_optional_fetch(&mut self) -> SyntaxResult<Option<FetchClause>> {
        if !self.check_keyword(Keyword::Fetch) {
            return Ok(None);
        }
        self.require(Feature::ResultLimits, self.cursor.current_span())?;

        let keyword = match self.accept_sequence(&[Keyword::Fetch, Keyword::First]) {
            Some(keyword) => keyword,
            None => self.expect_sequence(&[Keyword::Fetch, Keyword::Next])?,
        };

        let count = if matches!(self.keyword(), Some(Keyword::Row | Keyword::Rows)) {
            None
        } else {
            Some(self.parse_expr_bp(bp::ADD.0)?)
        };

        let mut words = match self
            .accept_keyword(Keyword::Rows)
            .or_else(|| self.accept_keyword(Keyword::Row))
        {
            Some(rows) => vec![rows],
            None => return Err(self.error_expected("ROW or ROWS")),
        };
        match self.accept_sequence(&[Keyword::With, Keyword::Ties]) {
            Some(ties) => words.push(ties.0),
            None => words.push(self.expect_keyword(Keyword::Only)?),
        }

        Ok(Some(FetchClause {
            keyword,
            count,
            tail: kw(words),
        }))
    }

    // ========================================================================
    // Data manipulation statements
    // ========================================================================

    fn parse_update(&mut self) -> SyntaxResult<UpdateStatement> {
        self.within("update statement", |p| {
            let mut words = vec![p.expect_keyword(Keyword::Update)?];
            if let Some(versioned) = p.accept_keyword(Keyword::Versioned) {
                words.push(versioned);
            }
            let entity = p.parse_dotted_name("entity name")?;
            let alias = p.parse_optional_alias()?;
            let set_keyword = Kw(p.expect_keyword(Keyword::Set)?);

            let assignments = p.comma_separated(|p| {
                let target = p.parse_expr_bp(bp::COMPARISON.0)?;
                p.expect_symbol(Symbol::Equals)?;
                let value = p.parse_expr()?;
                Ok(Assignment { target, value })
            })?;

            let where_clause = p.parse_optional_where()?;

            Ok(UpdateStatement {
                keyword: kw(words),
                entity,
                alias,
                set_keyword,
                assignments,
                where_clause,
            })
        })
    }

    fn parse_delete(&mut self) -> SyntaxResult<DeleteStatement> {
        self.within("delete statement", |p| {
            let mut words = vec![p.expect_keyword(Keyword::Delete)?];
            if let Some(from) = p.accept_keyword(Keyword::From) {
                words.push(from);
            }
            let entity = p.parse_dotted_name("entity name")?;
            let alias = p.parse_optional_alias()?;
            let where_clause = p.parse_optional_where()?;

            Ok(DeleteStatement {
                keyword: kw(words),
                entity,
                alias,
                where_clause,
            })
        })
    }

    fn parse_insert(&mut self) -> SyntaxResult<InsertStatement> {
        self.require(Feature::InsertStatements, self.cursor.current_span())?;

        self.within("insert statement", |p| {
            let mut words = vec![p.expect_keyword(Keyword::Insert)?];
            if let Some(into) = p.accept_keyword(Keyword::Into) {
                words.push(into);
            }
            let entity = p.parse_dotted_name("entity name")?;

            p.expect_symbol(Symbol::LeftParen)?;
            let columns = p.comma_separated(|p| p.parse_primary())?;
            p.expect_symbol(Symbol::RightParen)?;

            let source = match p.accept_keyword(Keyword::Values) {
                Some(text) => {
                    let rows = p.comma_separated(|p| {
                        p.expect_symbol(Symbol::LeftParen)?;
                        let row = p.comma_separated(|p| p.parse_expr())?;
                        p.expect_symbol(Symbol::RightParen)?;
                        Ok(row)
                    })?;
                    InsertSource::Values {
                        keyword: Kw(text),
                        rows,
                    }
                }
                None => InsertSource::Query(Box::new(p.parse_query()?)),
            };

            Ok(InsertStatement {
                keyword: kw(words),
                entity,
                columns,
                source,
            })
        })
    }

    // ========================================================================
    // Expressions
    // ========================================================================

    pub fn parse_expr(&mut self) -> SyntaxResult<Expr> {
        self.parse_expr_bp(0)
    }

    fn parse_expr_bp(&mut self, min_bp: u8) -> SyntaxResult<Expr> {
        self.within("expression", |p| {
            let lhs = p.parse_prefix()?;
            p.parse_infix_chain(lhs, min_bp)
        })
    }

    /// Continue an expression whose left operand is already parsed
    fn parse_infix_chain(&mut self, mut lhs: Expr, min_bp: u8) -> SyntaxResult<Expr> {
        while let Some((l_bp, r_bp)) = self.infix_bp() {
            if l_bp < min_bp {
                break;
            }
            lhs = self.parse_infix(lhs, r_bp)?;
        }
        Ok(lhs)
    }

    fn parse_prefix(&mut self) -> SyntaxResult<Expr> {
        if let Some(text) = self.accept_keyword(Keyword::Not) {
            let operand = self.parse_expr_bp(bp::NOT_PREFIX)?;
            return Ok(Expr::Not {
                keyword: Kw(text),
                operand: Box::new(operand),
            });
        }

        let operator = match self.symbol_at(0) {
            Some(Symbol::Minus) => Some(BinaryOperator::Subtract),
            Some(Symbol::Plus) => Some(BinaryOperator::Add),
            _ => None,
        };
        if let Some(operator) = operator {
            self.cursor.advance();
            let operand = self.parse_expr_bp(bp::UNARY)?;
            return Ok(Expr::Unary {
                operator,
                operand: Box::new(operand),
            });
        }

        self.parse_primary()
    }

    fn infix_bp(&self) -> Option<(u8, u8)> {
        match self.cursor.current_token() {
            LexicalToken::Symbol(symbol) => match symbol {
                Symbol::Equals | Symbol::NotEquals | Symbol::BangEquals | Symbol::CaretEquals => {
                    Some(bp::EQUALITY)
                }
                Symbol::LessThan
                | Symbol::LessOrEqual
                | Symbol::GreaterThan
                | Symbol::GreaterOrEqual => Some(bp::COMPARISON),
                Symbol::Plus | Symbol::Minus => Some(bp::ADD),
                Symbol::Star | Symbol::Slash | Symbol::Percent => Some(bp::MUL),
                Symbol::Concat => Some(bp::CONCAT),
                _ => None,
            },
            LexicalToken::Identifier(word) => match Keyword::from_word(word)? {
                Keyword::Or => Some(bp::OR),
                Keyword::And => Some(bp::AND),
                Keyword::Is
                | Keyword::Like
                | Keyword::Ilike
                | Keyword::Between
                | Keyword::In
                | Keyword::Member => Some(bp::EQUALITY),
                Keyword::Not => match self.keyword_at(1) {
                    Some(
                        Keyword::Like
                        | Keyword::Ilike
                        | Keyword::Between
                        | Keyword::In
                        | Keyword::Member,
                    ) => Some(bp::EQUALITY),
                    _ => None,
                },
                _ => None,
            },
            _ => None,
        }
    }

    fn parse_infix(&mut self, lhs: Expr, r_bp: u8) -> SyntaxResult<Expr> {
        if let Some(symbol) = self.symbol_at(0) {
            let operator = match symbol {
                Symbol::Equals => BinaryOperator::Equals,
                Symbol::NotEquals => BinaryOperator::NotEquals,
                Symbol::BangEquals => BinaryOperator::BangEquals,
                Symbol::CaretEquals => BinaryOperator::CaretEquals,
                Symbol::LessThan => BinaryOperator::LessThan,
                Symbol::LessOrEqual => BinaryOperator::LessOrEqual,
                Symbol::GreaterThan => BinaryOperator::GreaterThan,
                Symbol::GreaterOrEqual => BinaryOperator::GreaterOrEqual,
                Symbol::Plus => BinaryOperator::Add,
                Symbol::Minus => BinaryOperator::Subtract,
                Symbol::Star => BinaryOperator::Multiply,
                Symbol::Slash => BinaryOperator::Divide,
                Symbol::Percent => BinaryOperator::Modulo,
                Symbol::Concat => BinaryOperator::Concat,
                _ => return Err(self.error_expected("operator")),
            };
            self.cursor.advance();
            let rhs = self.parse_expr_bp(r_bp)?;
            return Ok(Expr::Binary {
                left: Box::new(lhs),
                operator,
                right: Box::new(rhs),
            });
        }

        let mut words = Vec::new();
        if let Some(not) = self.accept_keyword(Keyword::Not) {
            words.push(not);
        }

        let span = self.cursor.current_span();
        let Some(keyword) = self.keyword() else {
            return Err(self.error_expected("operator"));
        };
        words.push(self.cursor.advance().value.text().to_string());

        match keyword {
            Keyword::Or | Keyword::And => {
                let rhs = self.parse_expr_bp(r_bp)?;
                Ok(Expr::Logical {
                    left: Box::new(lhs),
                    keyword: kw(words),
                    right: Box::new(rhs),
                })
            }
            Keyword::Is => {
                if let Some(not) = self.accept_keyword(Keyword::Not) {
                    words.push(not);
                }
                if self.check_keyword(Keyword::Distinct) {
                    self.require(Feature::DistinctFromPredicates, span)?;
                    words.push(self.cursor.advance().value.text().to_string());
                    words.push(self.expect_keyword(Keyword::From)?);
                    let other = self.parse_expr_bp(r_bp)?;
                    return Ok(Expr::DistinctFrom {
                        expr: Box::new(lhs),
                        keyword: kw(words),
                        other: Box::new(other),
                    });
                }
                match self.keyword() {
                    Some(Keyword::Null | Keyword::Empty | Keyword::True | Keyword::False) => {
                        words.push(self.cursor.advance().value.text().to_string());
                    }
                    _ => return Err(self.error_expected("NULL, EMPTY, TRUE, FALSE or DISTINCT FROM")),
                }
                Ok(Expr::Is {
                    expr: Box::new(lhs),
                    predicate: kw(words),
                })
            }
            Keyword::Like | Keyword::Ilike => {
                if keyword == Keyword::Ilike {
                    self.require(Feature::CaseInsensitiveLike, span)?;
                }
                let pattern = self.parse_expr_bp(r_bp)?;
                let escape = match self.accept_keyword(Keyword::Escape) {
                    Some(text) => Some((Kw(text), Box::new(self.parse_expr_bp(r_bp)?))),
                    None => None,
                };
                Ok(Expr::Like {
                    expr: Box::new(lhs),
                    keyword: kw(words),
                    pattern: Box::new(pattern),
                    escape,
                })
            }
            Keyword::Between => {
                let low = self.parse_expr_bp(bp::EQUALITY.1)?;
                let and_keyword = Kw(self.expect_keyword(Keyword::And)?);
                let high = self.parse_expr_bp(bp::EQUALITY.1)?;
                Ok(Expr::Between {
                    expr: Box::new(lhs),
                    keyword: kw(words),
                    low: Box::new(low),
                    and_keyword,
                    high: Box::new(high),
                })
            }
            Keyword::In => {
                let list = self.parse_in_list()?;
                Ok(Expr::In {
                    expr: Box::new(lhs),
                    keyword: kw(words),
                    list,
                })
            }
            Keyword::Member => {
                if let Some(of) = self.accept_keyword(Keyword::Of) {
                    words.push(of);
                }
                let collection = self.parse_expr_bp(r_bp)?;
                Ok(Expr::MemberOf {
                    expr: Box::new(lhs),
                    keyword: kw(words),
                    collection: Box::new(collection),
                })
            }
            _ => Err(SyntaxError::unexpected_token("operator", &format!("'{}'", words.join(" ")), span)),
        }
    }

    fn parse_in_list(&mut self) -> SyntaxResult<InList> {
        if self.at_parenthesized_query() {
            let query = self.within("in subquery", |p| p.parse_parenthesized_query())?;
            return Ok(InList::Subquery(Box::new(query)));
        }

        if self.accept_symbol(Symbol::LeftParen) {
            let values = self.comma_separated(|p| p.parse_expr())?;
            self.expect_symbol(Symbol::RightParen)?;
            return Ok(InList::Values(values));
        }

        if matches!(self.cursor.current_token(), LexicalToken::Parameter { .. }) {
            let parameter = self.parse_primary()?;
            return Ok(InList::Parameter(Box::new(parameter)));
        }

        Err(self.error_expected("'(' or parameter"))
    }

    fn parse_primary(&mut self) -> SyntaxResult<Expr> {
        let token = self.cursor.current_token().clone();

        let expr = match token {
            LexicalToken::StringLiteral(text) | LexicalToken::NumericLiteral(text) => {
                self.cursor.advance();
                Expr::Literal(text)
            }
            LexicalToken::Parameter { text, .. } => {
                self.cursor.advance();
                Expr::Parameter(text)
            }
            LexicalToken::Symbol(Symbol::LeftParen) => self.parse_parenthesized_expr()?,
            LexicalToken::Symbol(Symbol::LeftBrace) => self.parse_jdbc_escape()?,
            LexicalToken::QuotedIdentifier(_) => Expr::Path(self.parse_dotted_name("expression")?),
            LexicalToken::Identifier(word) => self.parse_word_expr(&word)?,
            _ => return Err(self.error_expected("expression")),
        };

        let takes_unit = matches!(&expr, Expr::Literal(text) if text.starts_with(|c: char| c.is_ascii_digit()))
            || matches!(expr, Expr::Parameter(_) | Expr::Parenthesized(_));
        if takes_unit && self.dialect.supports(Feature::Durations) {
            if let LexicalToken::Identifier(word) = self.cursor.current_token() {
                if is_temporal_unit(word) {
                    let unit = word.clone();
                    self.cursor.advance();
                    return Ok(Expr::Duration {
                        amount: Box::new(expr),
                        unit,
                    });
                }
            }
        }

        if matches!(expr, Expr::Function(_)) && self.check_symbol(Symbol::Dot) {
            self.cursor.advance();
            let path = self.parse_dotted_name("path segment")?;
            return Ok(Expr::Dereference {
                base: Box::new(expr),
                path,
            });
        }

        Ok(expr)
    }

    fn parse_word_expr(&mut self, word: &str) -> SyntaxResult<Expr> {
        let keyword = Keyword::from_word(word);
        let next_is_paren = self.symbol_at(1) == Some(Symbol::LeftParen);

        if let LexicalToken::Identifier(next) = self.cursor.peek_ahead(1) {
            if is_temporal_literal(word, next) && self.symbol_at(2) != Some(Symbol::Dot) {
                // `local date|time|datetime` is standard JPQL
                if !word.eq_ignore_ascii_case("local") {
                    self.require(Feature::TemporalLiterals, self.cursor.current_span())?;
                }
                let prefix = self.cursor.advance().value.text().to_string();
                let field = self.cursor.advance().value.text().to_string();
                return Ok(Expr::Literal(format!("{} {}", prefix, field)));
            }
        }

        match keyword {
            Some(Keyword::True | Keyword::False | Keyword::Null) => {
                self.cursor.advance();
                return Ok(Expr::Literal(word.to_string()));
            }
            Some(Keyword::Case) => return self.parse_case(),
            Some(Keyword::Exists) => {
                let keyword = Kw(self.expect_keyword(Keyword::Exists)?);
                let query = self.within("exists subquery", |p| p.parse_parenthesized_query())?;
                return Ok(Expr::Exists {
                    keyword,
                    query: Box::new(query),
                });
            }
            Some(Keyword::All | Keyword::Any | Keyword::Some)
                if next_is_paren && matches!(self.keyword_at(2), Some(Keyword::Select)) =>
            {
                let keyword = Kw(self.cursor.advance().value.text().to_string());
                let query = self.within("quantified subquery", |p| p.parse_parenthesized_query())?;
                return Ok(Expr::Quantified {
                    keyword,
                    query: Box::new(query),
                });
            }
            _ => {}
        }

        let usable_as_function = !keyword
            .is_some_and(|k| k.is_reserved() && !matches!(k, Keyword::Left | Keyword::Right));
        if next_is_paren && usable_as_function {
            let name = self.expect_name("function name")?;
            return self.parse_function_call(name);
        }

        if keyword.is_some_and(Keyword::is_reserved) {
            return Err(self.error_expected("expression"));
        }

        Ok(Expr::Path(self.parse_dotted_name("expression")?))
    }

    /// `( subquery )`, `( expr )` or a tuple `( a, b )`
    fn parse_parenthesized_expr(&mut self) -> SyntaxResult<Expr> {
        if self.at_parenthesized_query() {
            let query = self.within("subquery", |p| p.parse_parenthesized_query())?;
            return Ok(Expr::Subquery(Box::new(query)));
        }

        self.expect_symbol(Symbol::LeftParen)?;
        let mut items = self.comma_separated(|p| p.parse_expr())?;
        self.expect_symbol(Symbol::RightParen)?;

        if items.len() == 1 {
            Ok(Expr::Parenthesized(Box::new(items.remove(0))))
        } else {
            Ok(Expr::Tuple(items))
        }
    }

    /// `{d '2024-01-01'}`, `{t '..'}`, `{ts '..'}`
    fn parse_jdbc_escape(&mut self) -> SyntaxResult<Expr> {
        self.expect_symbol(Symbol::LeftBrace)?;
        let kind = match self.cursor.current_token() {
            LexicalToken::Identifier(word)
                if matches!(word.to_ascii_lowercase().as_str(), "d" | "t" | "ts") =>
            {
                word.clone()
            }
            _ => return Err(self.error_expected("d, t or ts")),
        };
        self.cursor.advance();

        let literal = match self.cursor.current_token() {
            LexicalToken::StringLiteral(text) => text.clone(),
            _ => return Err(self.error_expected("string literal")),
        };
        self.cursor.advance();
        self.expect_symbol(Symbol::RightBrace)?;

        Ok(Expr::JdbcEscape { kind, literal })
    }

    fn parse_case(&mut self) -> SyntaxResult<Expr> {
        self.within("case expression", |p| {
            let keyword = Kw(p.expect_keyword(Keyword::Case)?);
            let operand = if p.check_keyword(Keyword::When) {
                None
            } else {
                Some(p.parse_expr()?)
            };

            let mut whens = Vec::new();
            while let Some(when_text) = p.accept_keyword(Keyword::When) {
                let condition = p.parse_expr()?;
                let then_keyword = Kw(p.expect_keyword(Keyword::Then)?);
                let result = p.parse_expr()?;
                whens.push(WhenClause {
                    when_keyword: Kw(when_text),
                    condition,
                    then_keyword,
                    result,
                });
            }
            if whens.is_empty() {
                return Err(p.error_expected("WHEN"));
            }

            let else_clause = match p.accept_keyword(Keyword::Else) {
                Some(text) => Some((Kw(text), p.parse_expr()?)),
                None => None,
            };
            let end_keyword = Kw(p.expect_keyword(Keyword::End)?);

            Ok(Expr::Case(Box::new(CaseExpr {
                keyword,
                operand,
                whens,
                else_clause,
                end_keyword,
            })))
        })
    }

    /// Function call with the cursor on its opening parenthesis
    fn parse_function_call(&mut self, name: String) -> SyntaxResult<Expr> {
        self.within("function call", |p| {
            p.expect_symbol(Symbol::LeftParen)?;

            let args = match Keyword::from_word(&name) {
                _ if name.eq_ignore_ascii_case("position") => p.parse_position_args()?,
                _ if name.eq_ignore_ascii_case("format") => p.parse_as_args(Feature::KeywordedFunctions)?,
                Some(Keyword::Collate) => p.parse_as_args(Feature::Collations)?,
                Some(Keyword::Cast | Keyword::Treat) => {
                    let value = p.parse_expr()?;
                    let as_keyword = Kw(p.expect_keyword(Keyword::As)?);
                    let target = p.parse_expr()?;
                    FunctionArgs::Keyworded(vec![
                        ArgPart::Expr(value),
                        ArgPart::Keyword(as_keyword),
                        ArgPart::Expr(target),
                    ])
                }
                Some(Keyword::Extract) => {
                    let mut parts = vec![ArgPart::Expr(p.parse_expr()?)];
                    if let Some(from) = p.accept_keyword(Keyword::From) {
                        parts.push(ArgPart::Keyword(Kw(from)));
                        parts.push(ArgPart::Expr(p.parse_expr()?));
                    }
                    FunctionArgs::Keyworded(parts)
                }
                Some(Keyword::Trim) => p.parse_trim_args()?,
                _ => p.parse_function_args()?,
            };
            p.expect_symbol(Symbol::RightParen)?;

            let within_group = if p.check_keyword(Keyword::Within) {
                p.require(Feature::WindowFunctions, p.cursor.current_span())?;
                let keyword = p.expect_sequence(&[Keyword::Within, Keyword::Group])?;
                p.expect_symbol(Symbol::LeftParen)?;
                let order_by = match p.parse_optional_order_by()? {
                    Some(order_by) => order_by,
                    None => return Err(p.error_expected("ORDER BY")),
                };
                p.expect_symbol(Symbol::RightParen)?;
                Some((keyword, order_by))
            } else {
                None
            };

            let filter = if p.check_keyword(Keyword::Filter) && p.symbol_at(1) == Some(Symbol::LeftParen) {
                p.require(Feature::WindowFunctions, p.cursor.current_span())?;
                let keyword = Kw(p.expect_keyword(Keyword::Filter)?);
                p.expect_symbol(Symbol::LeftParen)?;
                let where_keyword = Kw(p.expect_keyword(Keyword::Where)?);
                let condition = p.parse_expr()?;
                p.expect_symbol(Symbol::RightParen)?;
                Some(FilterClause {
                    keyword,
                    where_keyword,
                    condition,
                })
            } else {
                None
            };

            let over = if p.check_keyword(Keyword::Over) && p.symbol_at(1) == Some(Symbol::LeftParen) {
                p.require(Feature::WindowFunctions, p.cursor.current_span())?;
                Some(p.parse_over_clause()?)
            } else {
                None
            };

            Ok(Expr::Function(Box::new(FunctionCall {
                name,
                args,
                within_group,
                filter,
                over,
            })))
        })
    }

    fn parse_function_args(&mut self) -> SyntaxResult<FunctionArgs> {
        if self.check_symbol(Symbol::RightParen) {
            return Ok(FunctionArgs::Empty);
        }
        if self.check_symbol(Symbol::Star) && self.symbol_at(1) == Some(Symbol::RightParen) {
            self.cursor.advance();
            return Ok(FunctionArgs::Star);
        }

        let distinct = self.accept_keyword(Keyword::Distinct).map(Kw);
        let args = self.comma_separated(|p| p.parse_expr())?;
        Ok(FunctionArgs::List { distinct, args })
    }

    /// Rest of an ordinary argument list after its first argument
    fn parse_remaining_args(&mut self, first: Expr) -> SyntaxResult<FunctionArgs> {
        let mut args = vec![first];
        while self.accept_symbol(Symbol::Comma) {
            args.push(self.parse_expr()?);
        }
        Ok(FunctionArgs::List { distinct: None, args })
    }

    /// `position(pattern in string)`, or ordinary arguments
    fn parse_position_args(&mut self) -> SyntaxResult<FunctionArgs> {
        if self.check_symbol(Symbol::RightParen) {
            return Ok(FunctionArgs::Empty);
        }

        let pattern = self.parse_expr_bp(bp::EQUALITY.1)?;
        let span = self.cursor.current_span();
        if let Some(in_text) = self.accept_keyword(Keyword::In) {
            self.require(Feature::KeywordedFunctions, span)?;
            let string = self.parse_expr()?;
            return Ok(FunctionArgs::Keyworded(vec![
                ArgPart::Expr(pattern),
                ArgPart::Keyword(Kw(in_text)),
                ArgPart::Expr(string),
            ]));
        }

        let first = self.parse_infix_chain(pattern, 0)?;
        self.parse_remaining_args(first)
    }

    /// `format(value as 'pattern')`, `collate(value as collation)`, or ordinary arguments
    fn parse_as_args(&mut self, feature: Feature) -> SyntaxResult<FunctionArgs> {
        if self.check_symbol(Symbol::RightParen) {
            return Ok(FunctionArgs::Empty);
        }

        let value = self.parse_expr()?;
        let span = self.cursor.current_span();
        if let Some(as_text) = self.accept_keyword(Keyword::As) {
            self.require(feature, span)?;
            let target = if feature == Feature::Collations {
                self.parse_collation()?
            } else {
                self.parse_expr()?
            };
            return Ok(FunctionArgs::Keyworded(vec![
                ArgPart::Expr(value),
                ArgPart::Keyword(Kw(as_text)),
                ArgPart::Expr(target),
            ]));
        }

        self.parse_remaining_args(value)
    }

    /// `trim([leading|trailing|both] [char] [from] value)`
    fn parse_trim_args(&mut self) -> SyntaxResult<FunctionArgs> {
        let mut parts = Vec::new();

        if let Some(Keyword::Leading | Keyword::Trailing | Keyword::Both) = self.keyword() {
            parts.push(ArgPart::Keyword(Kw(self.cursor.advance().value.text().to_string())));
        }
        if !self.check_keyword(Keyword::From) {
            parts.push(ArgPart::Expr(self.parse_expr()?));
        }
        if let Some(from) = self.accept_keyword(Keyword::From) {
            parts.push(ArgPart::Keyword(Kw(from)));
            parts.push(ArgPart::Expr(self.parse_expr()?));
        }

        if !parts.iter().any(|part| matches!(part, ArgPart::Expr(_))) {
            return Err(self.error_expected("expression"));
        }
        Ok(FunctionArgs::Keyworded(parts))
    }

    fn parse_over_clause(&mut self) -> SyntaxResult<OverClause> {
        let keyword = Kw(self.expect_keyword(Keyword::Over)?);
        self.expect_symbol(Symbol::LeftParen)?;

        let partition_by = match self.accept_sequence(&[Keyword::Partition, Keyword::By]) {
            Some(keyword) => Some((keyword, self.comma_separated(|p| p.parse_expr())?)),
            None => None,
        };
        let order_by = self.parse_optional_order_by()?;
        self.expect_symbol(Symbol::RightParen)?;

        Ok(OverClause {
            keyword,
            partition_by,
            order_by,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexical::LexicalAnalyzer;
    use assert_matches::assert_matches;

    fn parser(query: &str, dialect: Dialect) -> QueryParser {
        let tokens = LexicalAnalyzer::new().tokenize(query).unwrap();
        QueryParser::new(TokenCursor::new(tokens), dialect)
    }

    fn parse(query: &str, dialect: Dialect) -> SyntaxResult<Statement> {
        parser(query, dialect).parse_statement()
    }

    fn select(query: &str) -> Query {
        match parse(query, Dialect::Hql) {
            Ok(Statement::Select(query)) => query,
            other => panic!("expected select, got {:?}", other),
        }
    }

    #[test]
    fn test_simple_select() {
        let query = select("select u from User u where u.age > ?1 order by u.name");
        let spec = query.primary_spec();

        let select = spec.select.as_ref().unwrap();
        assert_eq!(select.items[0].expr, Expr::path("u"));

        let from = spec.from.as_ref().unwrap();
        assert_matches!(
            &from.items[0].root,
            FromRoot::Entity { name, alias: Some(alias) } if name == "User" && alias.name == "u"
        );

        assert_matches!(
            &spec.where_clause.as_ref().unwrap().condition,
            Expr::Binary { operator: BinaryOperator::GreaterThan, .. }
        );
        assert_eq!(query.order_by.unwrap().keyword.as_str(), "order by");
    }

    #[test]
    fn test_keywords_keep_case() {
        let query = select("SELECT DISTINCT u FROM User AS u ORDER BY u.name DESC NULLS LAST");
        let select = query.primary_spec().select.as_ref().unwrap();
        assert_eq!(select.keyword.as_str(), "SELECT");
        assert_eq!(select.distinct.as_ref().unwrap().as_str(), "DISTINCT");

        let order_by = query.order_by.unwrap();
        assert_eq!(order_by.keyword.as_str(), "ORDER BY");
        assert_eq!(order_by.items[0].nulls.as_ref().unwrap().as_str(), "NULLS LAST");
    }

    #[test]
    fn test_reserved_entity_names() {
        let query = select("select o from Order o");
        let from = query.primary_spec().from.as_ref().unwrap();
        assert_matches!(&from.items[0].root, FromRoot::Entity { name, .. } if name == "Order");
    }

    #[test]
    fn test_joins() {
        let query = select(
            "select u from User u left outer join fetch u.roles r inner join u.address a on a.city = :city",
        );
        let item = &query.primary_spec().from.as_ref().unwrap().items[0];
        assert_eq!(item.joins.len(), 2);
        assert_eq!(item.joins[0].keyword.as_str(), "left outer join");
        assert!(item.joins[0].fetch.is_some());
        assert_eq!(item.joins[1].alias.as_ref().unwrap().name, "a");
        assert!(item.joins[1].condition.is_some());
    }

    #[test]
    fn test_constructor_expression() {
        let query = select("select new com.example.UserDto(u.name, u.age) from User u");
        let item = &query.primary_spec().select.as_ref().unwrap().items[0];
        assert_matches!(
            &item.expr,
            Expr::Constructor { type_name, args, .. } if type_name == "com.example.UserDto" && args.len() == 2
        );
    }

    #[test]
    fn test_predicates() {
        let query = select(
            "select u from User u where u.name not like :n escape '!' and u.age between 1 and 9 \
             and u.id in (1, 2) and u.manager is not null and :role member of u.roles",
        );
        let condition = &query.primary_spec().where_clause.as_ref().unwrap().condition;

        let mut kinds = Vec::new();
        let mut current = condition;
        while let Expr::Logical { left, right, .. } = current {
            kinds.push(std::mem::discriminant(right.as_ref()));
            current = left;
        }
        kinds.push(std::mem::discriminant(current));
        assert_eq!(kinds.len(), 5);
    }

    #[test]
    fn test_operator_precedence() {
        let query = select("select u from User u where u.a = 1 or u.b = 2 and u.c = 3");
        let condition = &query.primary_spec().where_clause.as_ref().unwrap().condition;
        assert_matches!(condition, Expr::Logical { keyword, right, .. }
            if keyword.as_str() == "or" && matches!(right.as_ref(), Expr::Logical { .. }));
    }

    #[test]
    fn test_subqueries_and_functions() {
        let query = select(
            "select u, (select count(r) from Role r where r.user = u) from User u \
             where exists (select 1 from Audit a where a.user = u) and upper(u.name) like 'A%'",
        );
        let items = &query.primary_spec().select.as_ref().unwrap().items;
        assert_matches!(&items[1].expr, Expr::Subquery(_));
    }

    #[test]
    fn test_special_function_forms() {
        select("select cast(u.age as string), extract(year from u.born), trim(both ' ' from u.name) from User u");
        select("select count(*), count(distinct u.name) from User u");
        select("select u from User u where treat(u as Admin).level > 2");
    }

    #[test]
    fn test_case_expression() {
        let query = select(
            "select case when u.age > 18 then 'adult' else 'minor' end from User u",
        );
        let items = &query.primary_spec().select.as_ref().unwrap().items;
        assert_matches!(&items[0].expr, Expr::Case(case) if case.whens.len() == 1 && case.else_clause.is_some());
    }

    #[test]
    fn test_hql_extensions() {
        let query = select(
            "with recent as (select e from Event e) select r from recent r limit 10 offset 5",
        );
        assert!(query.with.is_some());
        assert!(query.limit.is_some());
        assert!(query.offset.is_some());

        let query = select("from User u fetch first 5 rows only");
        assert!(query.primary_spec().select.is_none());
        assert_eq!(query.fetch.unwrap().tail.as_str(), "rows only");

        select("select u from User u union all select a from Admin a");
        select("select e from generate_series(1, 10) e");
        select("select s.n from (select u.name as n from User u) s");
    }

    #[test]
    fn test_jpql_rejects_hql_extensions() {
        for query in [
            "with x as (select e from Event e) select y from x y",
            "from User u",
            "select u from User u limit 10",
            "select s from (select u from User u) s",
            "select u from User u where u.name ilike 'a%'",
            "insert into User (name) values ('x')",
        ] {
            let error = parse(query, Dialect::Jpql).unwrap_err();
            assert_matches!(error, SyntaxError::UnsupportedInDialect { dialect: Dialect::Jpql, .. }, "{}", query);
        }
    }

    #[test]
    fn test_temporal_literals_and_durations() {
        let query = select("select local date, current timestamp, offset datetime from User u");
        let items = &query.primary_spec().select.as_ref().unwrap().items;
        assert_eq!(items[0].expr, Expr::Literal("local date".to_string()));
        assert_eq!(items[1].expr, Expr::Literal("current timestamp".to_string()));
        assert!(items.iter().all(|item| item.alias.is_none()));

        let query = select("select u from User u where u.born between :start - 1 day and :end");
        assert_matches!(
            &query.primary_spec().where_clause.as_ref().unwrap().condition,
            Expr::Between { low, .. } if matches!(low.as_ref(), Expr::Binary { right, .. }
                if matches!(right.as_ref(), Expr::Duration { unit, .. } if unit == "day"))
        );

        assert_matches!(
            parse("select local date from User u", Dialect::Jpql),
            Ok(Statement::Select(_))
        );
    }

    #[test]
    fn test_distinct_from_and_instantiation_arguments() {
        let query = select("select u from User u where u.a is not distinct from u.b");
        assert_matches!(
            &query.primary_spec().where_clause.as_ref().unwrap().condition,
            Expr::DistinctFrom { keyword, .. } if keyword.as_str() == "is not distinct from"
        );

        let query = select("select new map(u.name as n, u.age) from User u");
        let item = &query.primary_spec().select.as_ref().unwrap().items[0];
        assert_matches!(
            &item.expr,
            Expr::Constructor { args, .. } if args[0].alias.as_ref().is_some_and(|alias| alias.name == "n")
                && args[1].alias.is_none()
        );
    }

    #[test]
    fn test_keyworded_functions_and_collations() {
        let query = select("select position('a' in u.name), format(u.born as 'yyyy') from User u");
        let items = &query.primary_spec().select.as_ref().unwrap().items;
        for item in items {
            assert_matches!(
                &item.expr,
                Expr::Function(call) if matches!(call.args, FunctionArgs::Keyworded(ref parts) if parts.len() == 3)
            );
        }
        select("select position(u.name, 'a') from User u");

        let query = select("select u from User u order by u.name collate \"C\" asc");
        let item = &query.order_by.unwrap().items[0];
        assert_matches!(
            &item.collation,
            Some((keyword, Expr::Literal(collation))) if keyword.as_str() == "collate" && collation == "\"C\""
        );
        assert_eq!(item.direction.as_ref().unwrap().as_str(), "asc");

        select("select collate(u.name as ucs_basic) from User u");
    }

    #[test]
    fn test_jpql_rejects_hql_expression_forms() {
        for query in [
            "select current date from User u",
            "select u from User u where u.a is distinct from u.b",
            "select new map(u.name as n) from User u",
            "select position('a' in u.name) from User u",
            "select format(u.born as 'yyyy') from User u",
            "select u from User u order by u.name collate \"C\"",
        ] {
            let error = parse(query, Dialect::Jpql).unwrap_err();
            assert_matches!(error, SyntaxError::UnsupportedInDialect { dialect: Dialect::Jpql, .. }, "{}", query);
        }
    }

    #[test]
    fn test_data_manipulation_statements() {
        assert_matches!(
            parse("update User u set u.active = false, u.score = u.score + 1 where u.id = :id", Dialect::Jpql),
            Ok(Statement::Update(update)) if update.assignments.len() == 2
        );
        assert_matches!(
            parse("delete from User u where u.active = false", Dialect::Jpql),
            Ok(Statement::Delete(delete)) if delete.keyword.as_str() == "delete from"
        );
        assert_matches!(
            parse("insert into User (name, age) values ('a', 1), ('b', 2)", Dialect::Hql),
            Ok(Statement::Insert(InsertStatement { source: InsertSource::Values { rows, .. }, .. })) if rows.len() == 2
        );
    }

    #[test]
    fn test_syntax_errors() {
        assert_matches!(
            parse("select u form User u", Dialect::Jpql),
            Err(SyntaxError::UnexpectedToken { .. })
        );
        assert_matches!(
            parse("select u from User u where", Dialect::Jpql),
            Err(SyntaxError::UnexpectedEndOfInput { .. })
        );
        assert_matches!(parse("   ", Dialect::Jpql), Err(SyntaxError::EmptyQuery));
        assert_matches!(
            parse("select u from User u where u.name is maybe", Dialect::Jpql),
            Err(SyntaxError::UnexpectedToken { expected, .. }) if expected.contains("NULL")
        );
    }

    #[test]
    fn test_error_history_and_context() {
        let mut parser = parser("select u from User u where (u.a = ", Dialect::Jpql);
        assert!(parser.parse_statement().is_err());
        assert_eq!(parser.error_history().len(), 1);
        assert!(parser
            .failure_context
            .as_deref()
            .is_some_and(|context| context.contains("where clause")));
    }

    #[test]
    fn test_nesting_depth_is_bounded() {
        let nested = |depth: usize| {
            format!("select u from User u where u.a = {}1{}", "(".repeat(depth), ")".repeat(depth))
        };

        let mut shallow = parser(&nested(4), Dialect::Jpql).with_max_depth(16);
        assert!(shallow.parse_statement().is_ok());

        let mut deep = parser(&nested(20), Dialect::Jpql).with_max_depth(16);
        assert_matches!(deep.parse_statement(), Err(SyntaxError::MaxRecursionDepth { .. }));
    }

    #[test]
    fn test_jdbc_escape_and_collection_member() {
        let query = select("select o from Order o, in(o.items) i where o.placed > {d '2024-01-01'}");
        let from = query.primary_spec().from.as_ref().unwrap();
        assert_matches!(&from.items[1].root, FromRoot::CollectionMember { .. });
    }
}
