//! Contextual keywords of JPQL and HQL
//!
//! Keywords are matched case-insensitively against identifier tokens. Only
//! the [`Keyword::is_reserved`] subset is barred from acting as an alias.
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Keyword {
    // === STATEMENTS ===
    Select,
    Update,
    Delete,
    Insert,
    Into,
    Values,
    Set,
    Versioned,

    // === CLAUSES ===
    From,
    Where,
    Group,
    By,
    Having,
    Order,
    With,
    Materialized,
    As,
    Distinct,
    New,

    // === ORDERING ===
    Asc,
    Desc,
    Nulls,
    First,
    Last,

    // === JOINS ===
    Join,
    Inner,
    Left,
    Right,
    Full,
    Outer,
    Cross,
    Fetch,
    Lateral,
    On,

    // === SET OPERATIONS ===
    Union,
    Intersect,
    Except,
    All,

    // === RESULT LIMITS ===
    Limit,
    Offset,
    Row,
    Rows,
    Next,
    Only,
    Ties,

    // === PREDICATES ===
    And,
    Or,
    Not,
    Between,
    Like,
    Ilike,
    Escape,
    In,
    Is,
    Null,
    Empty,
    True,
    False,
    Member,
    Of,
    Exists,
    Any,
    Some,

    // === EXPRESSIONS ===
    Case,
    When,
    Then,
    Else,
    End,
    Cast,
    Treat,
    Extract,
    Trim,
    Leading,
    Trailing,
    Both,
    Filter,
    Over,
    Partition,
    Within,
    Collate,
}

impl Keyword {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Select => "select",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Insert => "insert",
            Self::Into => "into",
            Self::Values => "values",
            Self::Set => "set",
            Self::Versioned => "versioned",
            Self::From => "from",
            Self::Where => "where",
            Self::Group => "group",
            Self::By => "by",
            Self::Having => "having",
            Self::Order => "order",
            Self::With => "with",
            Self::Materialized => "materialized",
            Self::As => "as",
            Self::Distinct => "distinct",
            Self::New => "new",
            Self::Asc => "asc",
            Self::Desc => "desc",
            Self::Nulls => "nulls",
            Self::First => "first",
            Self::Last => "last",
            Self::Join => "join",
            Self::Inner => "inner",
            Self::Left => "left",
            Self::Right => "right",
            Self::Full => "full",
            Self::Outer => "outer",
            Self::Cross => "cross",
            Self::Fetch => "fetch",
            Self::Lateral => "lateral",
            Self::On => "on",
            Self::Union => "union",
            Self::Intersect => "intersect",
            Self::Except => "except",
            Self::All => "all",
            Self::Limit => "limit",
            Self::Offset => "offset",
            Self::Row => "row",
            Self::Rows => "rows",
            Self::Next => "next",
            Self::Only => "only",
            Self::Ties => "ties",
            Self::And => "and",
            Self::Or => "or",
            Self::Not => "not",
            Self::Between => "between",
            Self::Like => "like",
            Self::Ilike => "ilike",
            Self::Escape => "escape",
            Self::In => "in",
            Self::Is => "is",
            Self::Null => "null",
            Self::Empty => "empty",
            Self::True => "true",
            Self::False => "false",
            Self::Member => "member",
            Self::Of => "of",
            Self::Exists => "exists",
            Self::Any => "any",
            Self::Some => "some",
            Self::Case => "case",
            Self::When => "when",
            Self::Then => "then",
            Self::Else => "else",
            Self::End => "end",
            Self::Cast => "cast",
            Self::Treat => "treat",
            Self::Extract => "extract",
            Self::Trim => "trim",
            Self::Leading => "leading",
            Self::Trailing => "trailing",
            Self::Both => "both",
            Self::Filter => "filter",
            Self::Over => "over",
            Self::Partition => "partition",
            Self::Within => "within",
            Self::Collate => "collate",
        }
    }

    /// Case-insensitive lookup
    pub fn from_word(word: &str) -> Option<Self> {
        let keyword = match word.to_ascii_lowercase().as_str() {
            "select" => Self::Select,
            "update" => Self::Update,
            "delete" => Self::Delete,
            "insert" => Self::Insert,
            "into" => Self::Into,
            "values" => Self::Values,
            "set" => Self::Set,
            "versioned" => Self::Versioned,
            "from" => Self::From,
            "where" => Self::Where,
            "group" => Self::Group,
            "by" => Self::By,
            "having" => Self::Having,
            "order" => Self::Order,
            "with" => Self::With,
            "materialized" => Self::Materialized,
            "as" => Self::As,
            "distinct" => Self::Distinct,
            "new" => Self::New,
            "asc" => Self::Asc,
            "desc" => Self::Desc,
            "nulls" => Self::Nulls,
            "first" => Self::First,
            "last" => Self::Last,
            "join" => Self::Join,
            "inner" => Self::Inner,
            "left" => Self::Left,
            "right" => Self::Right,
            "full" => Self::Full,
            "outer" => Self::Outer,
            "cross" => Self::Cross,
            "fetch" => Self::Fetch,
            "lateral" => Self::Lateral,
            "on" => Self::On,
            "union" => Self::Union,
            "intersect" => Self::Intersect,
            "except" => Self::Except,
            "all" => Self::All,
            "limit" => Self::Limit,
            "offset" => Self::Offset,
            "row" => Self::Row,
            "rows" => Self::Rows,
            "next" => Self::Next,
            "only" => Self::Only,
            "ties" => Self::Ties,
            "and" => Self::And,
            "or" => Self::Or,
            "not" => Self::Not,
            "between" => Self::Between,
            "like" => Self::Like,
            "ilike" => Self::Ilike,
            "escape" => Self::Escape,
            "in" => Self::In,
            "is" => Self::Is,
            "null" => Self::Null,
            "empty" => Self::Empty,
            "true" => Self::True,
            "false" => Self::False,
            "member" => Self::Member,
            "of" => Self::Of,
            "exists" => Self::Exists,
            "any" => Self::Any,
            "some" => Self::Some,
            "case" => Self::Case,
            "when" => Self::When,
            "then" => Self::Then,
            "else" => Self::Else,
            "end" => Self::End,
            "cast" => Self::Cast,
            "treat" => Self::Treat,
            "extract" => Self::Extract,
            "trim" => Self::Trim,
            "leading" => Self::Leading,
            "trailing" => Self::Trailing,
            "both" => Self::Both,
            "filter" => Self::Filter,
            "over" => Self::Over,
            "partition" => Self::Partition,
            "within" => Self::Within,
            "collate" => Self::Collate,
            _ => return None,
        };
        Some(keyword)
    }

    /// Keywords that end an item and so can never be read as an alias
    pub const fn is_reserved(self) -> bool {
        matches!(
            self,
            Self::Select
                | Self::From
                | Self::Where
                | Self::Group
                | Self::By
                | Self::Having
                | Self::Order
                | Self::With
                | Self::As
                | Self::Distinct
                | Self::New
                | Self::Asc
                | Self::Desc
                | Self::Nulls
                | Self::Join
                | Self::Inner
                | Self::Left
                | Self::Right
                | Self::Full
                | Self::Outer
                | Self::Cross
                | Self::Fetch
                | Self::On
                | Self::Union
                | Self::Intersect
                | Self::Except
                | Self::Limit
                | Self::Offset
                | Self::And
                | Self::Or
                | Self::Not
                | Self::Between
                | Self::Like
                | Self::Ilike
                | Self::Escape
                | Self::In
                | Self::Is
                | Self::Member
                | Self::Set
                | Self::When
                | Self::Then
                | Self::Else
                | Self::End
        )
    }
}

/// Whether `word` is a reserved keyword in any casing
pub fn is_reserved_keyword(word: &str) -> bool {
    Keyword::from_word(word).is_some_and(Keyword::is_reserved)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_case_insensitive_lookup() {
        assert_eq!(Keyword::from_word("SELECT"), Some(Keyword::Select));
        assert_eq!(Keyword::from_word("Select"), Some(Keyword::Select));
        assert_eq!(Keyword::from_word("ILike"), Some(Keyword::Ilike));
        assert_eq!(Keyword::from_word("user"), None);
    }

    #[test]
    fn test_round_trip_names() {
        for keyword in [Keyword::Materialized, Keyword::Ties, Keyword::Within, Keyword::Of, Keyword::Collate] {
            assert_eq!(Keyword::from_word(keyword.as_str()), Some(keyword));
        }
    }

    #[test]
    fn test_reserved_words() {
        assert!(is_reserved_keyword("ORDER"));
        assert!(is_reserved_keyword("join"));
        assert!(!is_reserved_keyword("value"));
        assert!(!is_reserved_keyword("first"));
        assert!(!is_reserved_keyword("count"));
    }
}
