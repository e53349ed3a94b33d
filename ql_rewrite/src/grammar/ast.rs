//! Dialect-neutral syntax tree for JPQL and HQL statements
//!
//! Both dialects parse into these nodes; dialect-only constructs simply never
//! appear in a JPQL tree. Keywords are stored as written ([`Kw`]) so rendering
//! reproduces the query's own casing.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One or more keyword words exactly as written, joined by single spaces
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Kw(pub String);

impl Kw {
    pub fn new(text: impl Into<String>) -> Self {
        Kw(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True when the keyword was written in upper case
    pub fn is_upper_case(&self) -> bool {
        self.0
            .chars()
            .find(|c| c.is_alphabetic())
            .is_some_and(char::is_uppercase)
    }
}

impl fmt::Display for Kw {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identification variable, with the optional `AS` that introduced it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alias {
    pub as_keyword: Option<Kw>,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Statement {
    Select(Query),
    Update(UpdateStatement),
    Delete(DeleteStatement),
    Insert(InsertStatement),
}

impl Statement {
    pub fn as_query(&self) -> Option<&Query> {
        match self {
            Statement::Select(query) => Some(query),
            _ => None,
        }
    }
}

// === QUERIES ===

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Query {
    pub with: Option<WithClause>,
    pub body: QueryBody,
    pub order_by: Option<OrderByClause>,
    pub limit: Option<LimitClause>,
    pub offset: Option<OffsetClause>,
    pub fetch: Option<FetchClause>,
}

impl Query {
    /// Leftmost query specification; the one a set operation takes its shape from
    pub fn primary_spec(&self) -> &QuerySpec {
        self.body.primary_spec()
    }

    pub fn has_result_limits(&self) -> bool {
        self.limit.is_some() || self.offset.is_some() || self.fetch.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WithClause {
    pub keyword: Kw,
    pub ctes: Vec<CommonTableExpression>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommonTableExpression {
    pub name: String,
    pub columns: Vec<String>,
    pub as_keyword: Kw,
    pub materialized: Option<Kw>,
    pub query: Box<Query>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum QueryBody {
    Spec(Box<QuerySpec>),
    /// Parenthesized query, possibly with its own ordering and limits
    Nested(Box<Query>),
    SetOperation {
        left: Box<QueryBody>,
        operator: Kw,
        right: Box<QueryBody>,
    },
}

impl QueryBody {
    pub fn primary_spec(&self) -> &QuerySpec {
        match self {
            QueryBody::Spec(spec) => spec,
            QueryBody::Nested(query) => query.primary_spec(),
            QueryBody::SetOperation { left, .. } => left.primary_spec(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuerySpec {
    pub select: Option<SelectClause>,
    pub from: Option<FromClause>,
    pub where_clause: Option<WhereClause>,
    pub group_by: Option<GroupByClause>,
    pub having: Option<HavingClause>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectClause {
    pub keyword: Kw,
    pub distinct: Option<Kw>,
    pub items: Vec<SelectItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectItem {
    pub expr: Expr,
    pub alias: Option<Alias>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FromClause {
    pub keyword: Kw,
    pub items: Vec<FromItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FromItem {
    pub root: FromRoot,
    pub joins: Vec<Join>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FromRoot {
    Entity {
        name: String,
        alias: Option<Alias>,
    },
    Subquery {
        lateral: Option<Kw>,
        query: Box<Query>,
        alias: Option<Alias>,
    },
    Function {
        call: Expr,
        alias: Option<Alias>,
    },
    /// `IN (path) alias`
    CollectionMember {
        keyword: Kw,
        path: Expr,
        alias: Option<Alias>,
    },
}

impl FromRoot {
    pub fn alias(&self) -> Option<&Alias> {
        match self {
            FromRoot::Entity { alias, .. }
            | FromRoot::Subquery { alias, .. }
            | FromRoot::Function { alias, .. }
            | FromRoot::CollectionMember { alias, .. } => alias.as_ref(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Join {
    /// Join type words through `JOIN`, e.g. `left outer join`
    pub keyword: Kw,
    pub fetch: Option<Kw>,
    pub lateral: Option<Kw>,
    pub target: Expr,
    pub alias: Option<Alias>,
    pub condition: Option<JoinCondition>,
}

impl Join {
    pub fn is_outer(&self) -> bool {
        let words = self.keyword.as_str().to_ascii_lowercase();
        words.starts_with("left") || words.starts_with("right") || words.starts_with("full")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JoinCondition {
    /// `on`, or HQL's `with`
    pub keyword: Kw,
    pub condition: Expr,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WhereClause {
    pub keyword: Kw,
    pub condition: Expr,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupByClause {
    pub keyword: Kw,
    pub items: Vec<Expr>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HavingClause {
    pub keyword: Kw,
    pub condition: Expr,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderByClause {
    pub keyword: Kw,
    pub items: Vec<SortItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SortItem {
    pub expr: Expr,
    /// `collate "C"`
    pub collation: Option<(Kw, Expr)>,
    pub direction: Option<Kw>,
    /// `nulls first` / `nulls last`
    pub nulls: Option<Kw>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LimitClause {
    pub keyword: Kw,
    pub count: Expr,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OffsetClause {
    pub keyword: Kw,
    pub count: Expr,
    pub rows: Option<Kw>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchClause {
    /// `fetch first` / `fetch next`
    pub keyword: Kw,
    pub count: Option<Expr>,
    /// `rows only`, `row with ties`, ...
    pub tail: Kw,
}

// === DATA MANIPULATION ===

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateStatement {
    pub keyword: Kw,
    pub entity: String,
    pub alias: Option<Alias>,
    pub set_keyword: Kw,
    pub assignments: Vec<Assignment>,
    pub where_clause: Option<WhereClause>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    pub target: Expr,
    pub value: Expr,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeleteStatement {
    /// `delete` or `delete from`
    pub keyword: Kw,
    pub entity: String,
    pub alias: Option<Alias>,
    pub where_clause: Option<WhereClause>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsertStatement {
    /// `insert into` or `insert`
    pub keyword: Kw,
    pub entity: String,
    pub columns: Vec<Expr>,
    pub source: InsertSource,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum InsertSource {
    Query(Box<Query>),
    Values { keyword: Kw, rows: Vec<Vec<Expr>> },
}

// === EXPRESSIONS ===

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOperator {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    Concat,
    Equals,
    NotEquals,
    BangEquals,
    CaretEquals,
    LessThan,
    LessOrEqual,
    GreaterThan,
    GreaterOrEqual,
}

impl BinaryOperator {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Subtract => "-",
            Self::Multiply => "*",
            Self::Divide => "/",
            Self::Modulo => "%",
            Self::Concat => "||",
            Self::Equals => "=",
            Self::NotEquals => "<>",
            Self::BangEquals => "!=",
            Self::CaretEquals => "^=",
            Self::LessThan => "<",
            Self::LessOrEqual => "<=",
            Self::GreaterThan => ">",
            Self::GreaterOrEqual => ">=",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum InList {
    Values(Vec<Expr>),
    Subquery(Box<Query>),
    /// Collection-valued parameter without parentheses
    Parameter(Box<Expr>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WhenClause {
    pub when_keyword: Kw,
    pub condition: Expr,
    pub then_keyword: Kw,
    pub result: Expr,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseExpr {
    pub keyword: Kw,
    pub operand: Option<Expr>,
    pub whens: Vec<WhenClause>,
    pub else_clause: Option<(Kw, Expr)>,
    pub end_keyword: Kw,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ArgPart {
    Keyword(Kw),
    Expr(Expr),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FunctionArgs {
    Empty,
    Star,
    List {
        distinct: Option<Kw>,
        args: Vec<Expr>,
    },
    /// Keyword-separated forms: `cast(x as T)`, `extract(f from x)`, `trim(..)`
    Keyworded(Vec<ArgPart>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterClause {
    pub keyword: Kw,
    pub where_keyword: Kw,
    pub condition: Expr,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverClause {
    pub keyword: Kw,
    pub partition_by: Option<(Kw, Vec<Expr>)>,
    pub order_by: Option<OrderByClause>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    /// Name as written
    pub name: String,
    pub args: FunctionArgs,
    /// `within group (order by ..)`
    pub within_group: Option<(Kw, OrderByClause)>,
    pub filter: Option<FilterClause>,
    pub over: Option<OverClause>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    /// Dotted path or bare identifier, e.g. `u.address.city`
    Path(String),
    /// Literal as written: strings, numbers, `true`, `null`, enum constants
    Literal(String),
    Parameter(String),
    /// Prefix `+` or `-`
    Unary {
        operator: BinaryOperator,
        operand: Box<Expr>,
    },
    Not {
        keyword: Kw,
        operand: Box<Expr>,
    },
    Binary {
        left: Box<Expr>,
        operator: BinaryOperator,
        right: Box<Expr>,
    },
    /// `and` / `or`
    Logical {
        left: Box<Expr>,
        keyword: Kw,
        right: Box<Expr>,
    },
    Between {
        expr: Box<Expr>,
        keyword: Kw,
        low: Box<Expr>,
        and_keyword: Kw,
        high: Box<Expr>,
    },
    Like {
        expr: Box<Expr>,
        keyword: Kw,
        pattern: Box<Expr>,
        escape: Option<(Kw, Box<Expr>)>,
    },
    In {
        expr: Box<Expr>,
        keyword: Kw,
        list: InList,
    },
    /// `is [not] null|empty|true|false`
    Is {
        expr: Box<Expr>,
        predicate: Kw,
    },
    /// `is [not] distinct from other`
    DistinctFrom {
        expr: Box<Expr>,
        keyword: Kw,
        other: Box<Expr>,
    },
    MemberOf {
        expr: Box<Expr>,
        keyword: Kw,
        collection: Box<Expr>,
    },
    Exists {
        keyword: Kw,
        query: Box<Query>,
    },
    /// `all|any|some (subquery)`
    Quantified {
        keyword: Kw,
        query: Box<Query>,
    },
    Subquery(Box<Query>),
    Tuple(Vec<Expr>),
    Parenthesized(Box<Expr>),
    Case(Box<CaseExpr>),
    Function(Box<FunctionCall>),
    /// `new com.example.Dto(a, b)`; HQL arguments may carry aliases
    Constructor {
        keyword: Kw,
        type_name: String,
        args: Vec<SelectItem>,
    },
    /// Amount with a temporal unit, e.g. `1 day`
    Duration {
        amount: Box<Expr>,
        unit: String,
    },
    /// Path continued from a function result, e.g. `treat(p as Admin).level`
    Dereference {
        base: Box<Expr>,
        path: String,
    },
    /// `{d '2024-01-01'}`
    JdbcEscape {
        kind: String,
        literal: String,
    },
}

impl Expr {
    pub fn path(text: impl Into<String>) -> Self {
        Expr::Path(text.into())
    }

    pub fn is_constructor(&self) -> bool {
        matches!(self, Expr::Constructor { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(entity: &str) -> QuerySpec {
        QuerySpec {
            select: None,
            from: Some(FromClause {
                keyword: Kw::new("from"),
                items: vec![FromItem {
                    root: FromRoot::Entity {
                        name: entity.to_string(),
                        alias: None,
                    },
                    joins: vec![],
                }],
            }),
            where_clause: None,
            group_by: None,
            having: None,
        }
    }

    #[test]
    fn test_keyword_case() {
        assert!(Kw::new("SELECT").is_upper_case());
        assert!(Kw::new("Select").is_upper_case());
        assert!(!Kw::new("select").is_upper_case());
        assert_eq!(Kw::new("order by").to_string(), "order by");
    }

    #[test]
    fn test_primary_spec_of_set_operation() {
        let body = QueryBody::SetOperation {
            left: Box::new(QueryBody::Spec(Box::new(spec("User")))),
            operator: Kw::new("union"),
            right: Box::new(QueryBody::Spec(Box::new(spec("Admin")))),
        };
        let primary = body.primary_spec();
        let Some(from) = &primary.from else {
            panic!("missing from");
        };
        assert!(matches!(&from.items[0].root, FromRoot::Entity { name, .. } if name == "User"));
    }

    #[test]
    fn test_outer_join_detection() {
        let join = |words: &str| Join {
            keyword: Kw::new(words),
            fetch: None,
            lateral: None,
            target: Expr::path("u.roles"),
            alias: None,
            condition: None,
        };
        assert!(join("LEFT OUTER JOIN").is_outer());
        assert!(join("left join").is_outer());
        assert!(!join("inner join").is_outer());
        assert!(!join("join").is_outer());
    }
}
