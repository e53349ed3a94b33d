//! Parameter binding extraction
//!
//! A pattern-based pass over raw query text, independent of the parser.
//! Expression placeholders (`?#{..}`, `:#{..}`) are lifted out first and
//! replaced by synthetic parameters, then every remaining marker is
//! classified as plain, `LIKE`-decorated or `IN`-decorated.

mod extractor;
pub mod scanner;

use crate::logging::{codes, Code};
use serde::Serialize;
use std::fmt;

pub use scanner::parse_parameter_bindings;

/// Prefix of the names given to expression placeholders in named queries
pub const SYNTHETIC_PARAMETER_PREFIX: &str = "__$synthetic$__";

pub type BindingResult<T> = Result<T, BindingError>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BindingError {
    #[error("Mixing of ? parameters and other forms like ?1 or :name is not supported")]
    MixedStyles,

    #[error(
        "Parameter {identifier} is already bound as {existing} but found {found}; \
         bind a repeated parameter with the same decoration"
    )]
    IdentityConflict {
        identifier: String,
        existing: String,
        found: String,
    },

    #[error("Expression placeholder starting at offset {offset} is not terminated")]
    UnterminatedExpression { offset: usize },

    #[error("Expression placeholder of {length} characters exceeds the maximum of {max}")]
    ExpressionTooLong { length: usize, max: usize },

    #[error("Query declares more than {max} parameter bindings")]
    TooManyBindings { max: usize },
}

impl BindingError {
    pub fn error_code(&self) -> Code {
        match self {
            Self::MixedStyles => codes::binding::MIXED_PARAMETER_STYLES,
            Self::IdentityConflict { .. } => codes::binding::BINDING_IDENTITY_CONFLICT,
            Self::UnterminatedExpression { .. } => codes::binding::UNTERMINATED_EXPRESSION,
            Self::ExpressionTooLong { .. } => codes::binding::EXPRESSION_TOO_LONG,
            Self::TooManyBindings { .. } => codes::binding::TOO_MANY_BINDINGS,
        }
    }
}

/// How a parameter is addressed
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BindingIdentifier {
    Named { name: String },
    Indexed { index: usize },
    NamedAndIndexed { name: String, index: usize },
}

impl BindingIdentifier {
    pub fn named(name: impl Into<String>) -> Self {
        Self::Named { name: name.into() }
    }

    pub fn indexed(index: usize) -> Self {
        Self::Indexed { index }
    }

    pub fn named_and_indexed(name: impl Into<String>, index: usize) -> Self {
        Self::NamedAndIndexed {
            name: name.into(),
            index,
        }
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Named { name } | Self::NamedAndIndexed { name, .. } => Some(name),
            Self::Indexed { .. } => None,
        }
    }

    pub fn index(&self) -> Option<usize> {
        match self {
            Self::Indexed { index } | Self::NamedAndIndexed { index, .. } => Some(*index),
            Self::Named { .. } => None,
        }
    }

    /// Whether both identifiers address the same parameter by name or by index
    pub fn binds_to(&self, other: &BindingIdentifier) -> bool {
        let same_name = matches!((self.name(), other.name()), (Some(a), Some(b)) if a == b);
        let same_index = matches!((self.index(), other.index()), (Some(a), Some(b)) if a == b);
        same_name || same_index
    }
}

impl fmt::Display for BindingIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Named { name } => write!(f, ":{}", name),
            Self::Indexed { index } => write!(f, "?{}", index),
            Self::NamedAndIndexed { name, index } => write!(f, ":{} (?{})", name, index),
        }
    }
}

/// Where the bound value comes from
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "type", content = "source", rename_all = "snake_case")]
pub enum ParameterOrigin {
    /// Supplied by the caller under this identifier
    MethodArgument(BindingIdentifier),
    /// Evaluated from an embedded expression
    Expression(String),
}

impl ParameterOrigin {
    pub fn is_method_argument(&self) -> bool {
        matches!(self, Self::MethodArgument(_))
    }

    pub fn is_expression(&self) -> bool {
        matches!(self, Self::Expression(_))
    }
}

/// Wildcard placement around a `LIKE` parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LikeType {
    /// `like :p`, value bound as is
    Like,
    /// `like :p%`
    StartingWith,
    /// `like %:p`
    EndingWith,
    /// `like %:p%`
    Contains,
}

impl LikeType {
    pub(crate) fn from_decoration(leading: bool, trailing: bool) -> Self {
        match (leading, trailing) {
            (true, true) => Self::Contains,
            (true, false) => Self::EndingWith,
            (false, true) => Self::StartingWith,
            (false, false) => Self::Like,
        }
    }

    /// Wrap `value` in the wildcards this type stands for
    pub fn decorate(self, value: &str) -> String {
        match self {
            Self::Like => value.to_string(),
            Self::StartingWith => format!("{}%", value),
            Self::EndingWith => format!("%{}", value),
            Self::Contains => format!("%{}%", value),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", content = "like_type", rename_all = "snake_case")]
pub enum BindingKind {
    Plain,
    Like(LikeType),
    In,
}

impl fmt::Display for BindingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Plain => f.write_str("plain"),
            Self::Like(like_type) => write!(f, "like ({:?})", like_type),
            Self::In => f.write_str("in"),
        }
    }
}

/// One parameter occurrence, after deduplication
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ParameterBinding {
    pub identifier: BindingIdentifier,
    pub origin: ParameterOrigin,
    pub kind: BindingKind,
}

impl ParameterBinding {
    pub fn new(identifier: BindingIdentifier, origin: ParameterOrigin, kind: BindingKind) -> Self {
        Self {
            identifier,
            origin,
            kind,
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.identifier.name()
    }

    pub fn index(&self) -> Option<usize> {
        self.identifier.index()
    }

    pub fn binds_to(&self, other: &ParameterBinding) -> bool {
        self.identifier.binds_to(&other.identifier)
    }
}

/// Result of a binding scan
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParsedBindings {
    /// Query with expression placeholders replaced and `LIKE` wildcards removed
    pub query: String,
    pub bindings: Vec<ParameterBinding>,
    pub uses_jdbc_style: bool,
}

/// Check that every binding error code is registered
pub fn init_binding_logging() -> Result<(), String> {
    let binding_codes = [
        codes::binding::MIXED_PARAMETER_STYLES,
        codes::binding::BINDING_IDENTITY_CONFLICT,
        codes::binding::UNTERMINATED_EXPRESSION,
        codes::binding::TOO_MANY_BINDINGS,
        codes::binding::EXPRESSION_TOO_LONG,
        codes::success::BINDINGS_EXTRACTED,
    ];

    for code in &binding_codes {
        if codes::get_error_metadata(code.as_str()).is_none() {
            return Err(format!(
                "Binding code {} not found in metadata registry",
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
    fn test_binding_codes_registered() {
        assert!(init_binding_logging().is_ok());
    }

    #[test]
    fn test_identifier_binds_to() {
        let named = BindingIdentifier::named("name");
        let indexed = BindingIdentifier::indexed(1);
        let both = BindingIdentifier::named_and_indexed("name", 2);

        assert!(named.binds_to(&both));
        assert!(!indexed.binds_to(&both));
        assert!(indexed.binds_to(&BindingIdentifier::named_and_indexed("other", 1)));
        assert!(!named.binds_to(&indexed));
        assert_eq!(both.to_string(), ":name (?2)");
    }

    #[test]
    fn test_like_types() {
        assert_eq!(LikeType::from_decoration(true, true), LikeType::Contains);
        assert_eq!(LikeType::from_decoration(false, true), LikeType::StartingWith);
        assert_eq!(LikeType::EndingWith.decorate("son"), "%son");
        assert_eq!(LikeType::Like.decorate("a_c"), "a_c");
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(BindingError::MixedStyles.error_code().as_str(), "E140");
        assert_eq!(
            BindingError::UnterminatedExpression { offset: 4 }.to_string(),
            "Expression placeholder starting at offset 4 is not terminated"
        );
    }
}
