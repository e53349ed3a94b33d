//! Error and success codes with their classification metadata
//!
//! Every code emitted by the engine is declared here once, together with the
//! category, severity and recommended action reported alongside it.

use std::collections::HashMap;
use std::sync::OnceLock;

// ============================================================================
// CODE WRAPPER TYPE
// ============================================================================

/// Code shared by error, warning and success events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Code(&'static str);

impl Code {
    pub const fn new(code: &'static str) -> Self {
        Self(code)
    }

    pub fn as_str(&self) -> &'static str {
        self.0
    }
}

impl std::fmt::Display for Code {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.0)
    }
}

// ============================================================================
// CLASSIFICATION TYPES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Critical = 0,
    High = 1,
    Medium = 2,
    Low = 3,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "Critical",
            Severity::High => "High",
            Severity::Medium => "Medium",
            Severity::Low => "Low",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Critical" => Some(Severity::Critical),
            "High" => Some(Severity::High),
            "Medium" => Some(Severity::Medium),
            "Low" => Some(Severity::Low),
            _ => None,
        }
    }
}

/// Complete metadata for a code
#[derive(Debug, Clone)]
pub struct ErrorMetadata {
    pub code: &'static str,
    pub category: &'static str,
    pub severity: Severity,
    pub recoverable: bool,
    pub requires_halt: bool,
    pub description: &'static str,
    pub recommended_action: &'static str,
}

impl ErrorMetadata {
    pub const fn new(
        code: &'static str,
        category: &'static str,
        severity: Severity,
        recoverable: bool,
        requires_halt: bool,
        description: &'static str,
        recommended_action: &'static str,
    ) -> Self {
        Self {
            code,
            category,
            severity,
            recoverable,
            requires_halt,
            description,
            recommended_action,
        }
    }
}

// ============================================================================
// ERROR CODE CONSTANTS
// ============================================================================

pub mod system {
    use super::Code;

    pub const INTERNAL_ERROR: Code = Code::new("ERR001");
    pub const INITIALIZATION_FAILURE: Code = Code::new("ERR002");
}

/// Lexical analysis error codes
pub mod lexical {
    use super::Code;

    pub const INVALID_CHARACTER: Code = Code::new("E020");
    pub const UNTERMINATED_STRING: Code = Code::new("E021");
    pub const INVALID_NUMBER: Code = Code::new("E022");
    pub const IDENTIFIER_TOO_LONG: Code = Code::new("E023");
    pub const STRING_TOO_LARGE: Code = Code::new("E024");
    pub const UNTERMINATED_COMMENT: Code = Code::new("E026");
    pub const TOO_MANY_TOKENS: Code = Code::new("E027");
    pub const QUERY_TOO_LONG: Code = Code::new("E028");
    pub const INVALID_PARAMETER: Code = Code::new("E029");
}

/// Grammar error codes
pub mod syntax {
    use super::Code;

    pub const BAD_GRAMMAR: Code = Code::new("E040");
    pub const EMPTY_QUERY: Code = Code::new("E041");
    pub const GRAMMAR_VIOLATION: Code = Code::new("E043");
    pub const UNSUPPORTED_IN_DIALECT: Code = Code::new("E044");
    pub const UNEXPECTED_TOKEN: Code = Code::new("E050");
    pub const UNEXPECTED_END_OF_INPUT: Code = Code::new("E051");
    pub const MAX_RECURSION_DEPTH: Code = Code::new("E087");
}

/// Rewrite error codes
pub mod transform {
    use super::Code;

    pub const NOT_A_SELECT: Code = Code::new("E120");
    pub const UNSAFE_SORT_PROPERTY: Code = Code::new("E121");
    pub const SORT_NOT_SUPPORTED: Code = Code::new("E122");
    pub const TOO_MANY_SORT_ORDERS: Code = Code::new("E123");
}

/// Parameter binding error codes
pub mod binding {
    use super::Code;

    pub const MIXED_PARAMETER_STYLES: Code = Code::new("E140");
    pub const BINDING_IDENTITY_CONFLICT: Code = Code::new("E141");
    pub const UNTERMINATED_EXPRESSION: Code = Code::new("E142");
    pub const TOO_MANY_BINDINGS: Code = Code::new("E143");
    pub const EXPRESSION_TOO_LONG: Code = Code::new("E144");
}

/// Warning codes
pub mod warning {
    use super::Code;

    pub const SORT_CACHE_SHARD_POISONED: Code = Code::new("W120");
}

// ============================================================================
// SUCCESS CODE CONSTANTS
// ============================================================================

pub mod success {
    use super::Code;

    pub const OPERATION_COMPLETED: Code = Code::new("I001");
    pub const SYSTEM_INITIALIZATION_COMPLETED: Code = Code::new("I004");

    pub const TOKENIZATION_COMPLETE: Code = Code::new("I020");
    pub const PARSE_COMPLETE: Code = Code::new("I040");
    pub const INTROSPECTION_COMPLETE: Code = Code::new("I060");

    pub const COUNT_QUERY_DERIVED: Code = Code::new("I070");
    pub const SORT_APPLIED: Code = Code::new("I071");
    pub const DTO_PROJECTION_APPLIED: Code = Code::new("I072");

    pub const BINDINGS_EXTRACTED: Code = Code::new("I080");
}

// ============================================================================
// METADATA REGISTRY
// ============================================================================

use Severity::{Critical, High, Low, Medium};

#[rustfmt::skip]
const METADATA: &[ErrorMetadata] = &[
    // System
    ErrorMetadata::new("ERR001", "System", Critical, false, true,
        "Critical internal error", "File a bug report with the query that triggered it"),
    ErrorMetadata::new("ERR002", "System", Critical, false, true,
        "Engine initialization failed", "Check the logging and runtime configuration"),

    // Lexical
    ErrorMetadata::new("E020", "Lexical", High, false, true,
        "Character not allowed in a query", "Remove or quote the offending character"),
    ErrorMetadata::new("E021", "Lexical", High, false, true,
        "String literal is not terminated", "Close the literal with a matching quote"),
    ErrorMetadata::new("E022", "Lexical", High, false, true,
        "Malformed numeric literal", "Check digits, exponent and type suffix"),
    ErrorMetadata::new("E023", "Lexical", Medium, false, true,
        "Identifier exceeds the configured maximum length", "Shorten the identifier"),
    ErrorMetadata::new("E024", "Lexical", Medium, false, true,
        "String literal exceeds the configured maximum size", "Bind large values as parameters"),
    ErrorMetadata::new("E026", "Lexical", High, false, true,
        "Block comment is not terminated", "Close the comment with */"),
    ErrorMetadata::new("E027", "Lexical", High, false, true,
        "Query produces too many tokens", "Split the query or raise the token limit"),
    ErrorMetadata::new("E028", "Lexical", High, false, true,
        "Query text exceeds the configured maximum length", "Shorten the query"),
    ErrorMetadata::new("E029", "Lexical", High, false, true,
        "Malformed parameter marker", "Use ?N, ? or :name parameter markers"),

    // Syntax
    ErrorMetadata::new("E040", "Syntax", High, false, true,
        "Query does not conform to the dialect grammar", "Fix the query at the reported position"),
    ErrorMetadata::new("E041", "Syntax", High, false, true,
        "Query text is empty", "Provide a non-empty query"),
    ErrorMetadata::new("E043", "Syntax", High, false, true,
        "Grammar rule violated", "Fix the query at the reported position"),
    ErrorMetadata::new("E044", "Syntax", High, false, true,
        "Construct is not available in the selected dialect", "Use the HQL dialect or rewrite the construct"),
    ErrorMetadata::new("E050", "Syntax", High, false, true,
        "Unexpected token", "Fix the query at the reported position"),
    ErrorMetadata::new("E051", "Syntax", High, false, true,
        "Query ended unexpectedly", "Complete the trailing clause"),
    ErrorMetadata::new("E087", "Syntax", Critical, false, true,
        "Maximum nesting depth exceeded", "Reduce subquery or parenthesis nesting"),

    // Transform
    ErrorMetadata::new("E120", "Transform", High, false, true,
        "Statement is not a SELECT and cannot be rewritten", "Only derive count or sorted queries from SELECT statements"),
    ErrorMetadata::new("E121", "Transform", Critical, false, true,
        "Sort property contains characters outside a property path", "Fix the property or explicitly mark the order unsafe"),
    ErrorMetadata::new("E122", "Transform", Critical, false, true,
        "Sorted rewrite requested from an unsorted-only cache", "Select the LRU strategy for queries that accept a sort"),
    ErrorMetadata::new("E123", "Transform", Medium, false, true,
        "Sort specification has too many orders", "Reduce the number of sort orders"),

    // Binding
    ErrorMetadata::new("E140", "Binding", High, false, true,
        "JDBC-style ? parameters mixed with ?N or :name parameters", "Use one parameter style per query"),
    ErrorMetadata::new("E141", "Binding", High, false, true,
        "Parameter bound twice with differing binding types", "Bind each parameter with the same decoration"),
    ErrorMetadata::new("E142", "Binding", High, false, true,
        "Expression placeholder has unbalanced braces", "Close every #{ with a matching }"),
    ErrorMetadata::new("E143", "Binding", Medium, false, true,
        "Query declares too many parameters", "Reduce the number of parameters"),
    ErrorMetadata::new("E144", "Binding", Medium, false, true,
        "Expression placeholder exceeds the configured maximum length", "Move the logic out of the query"),

    // Warnings
    ErrorMetadata::new("W120", "Cache", Low, true, false,
        "A sort cache segment was poisoned and has been reset", "No action required"),

    // Success
    ErrorMetadata::new("I001", "General", Low, true, false,
        "Operation completed", "Continue"),
    ErrorMetadata::new("I004", "System", Low, true, false,
        "Logging system initialized", "Continue"),
    ErrorMetadata::new("I020", "Lexical", Low, true, false,
        "Tokenization completed", "Continue to parsing"),
    ErrorMetadata::new("I040", "Syntax", Low, true, false,
        "Query parsed", "Continue to introspection"),
    ErrorMetadata::new("I060", "Introspection", Low, true, false,
        "Query introspection completed", "Continue"),
    ErrorMetadata::new("I070", "Transform", Low, true, false,
        "Count query derived", "Continue"),
    ErrorMetadata::new("I071", "Transform", Low, true, false,
        "Sort applied to query", "Continue"),
    ErrorMetadata::new("I072", "Transform", Low, true, false,
        "DTO constructor projection applied", "Continue"),
    ErrorMetadata::new("I080", "Binding", Low, true, false,
        "Parameter bindings extracted", "Continue"),
];

static ERROR_REGISTRY: OnceLock<HashMap<&'static str, ErrorMetadata>> = OnceLock::new();

fn get_error_registry() -> &'static HashMap<&'static str, ErrorMetadata> {
    ERROR_REGISTRY.get_or_init(|| {
        METADATA
            .iter()
            .map(|metadata| (metadata.code, metadata.clone()))
            .collect()
    })
}

// ============================================================================
// CLASSIFICATION FUNCTIONS
// ============================================================================

pub fn get_error_metadata(code: &str) -> Option<&'static ErrorMetadata> {
    get_error_registry().get(code)
}

pub fn get_severity(code: &str) -> Severity {
    get_error_metadata(code)
        .map(|metadata| metadata.severity)
        .unwrap_or(Severity::Medium)
}

pub fn is_recoverable(code: &str) -> bool {
    get_error_metadata(code)
        .map(|metadata| metadata.recoverable)
        .unwrap_or(true)
}

pub fn requires_halt(code: &str) -> bool {
    get_error_metadata(code)
        .map(|metadata| metadata.requires_halt)
        .unwrap_or(false)
}

/// Human-readable description for a code
pub fn get_description(code: &str) -> &'static str {
    get_error_metadata(code)
        .map(|metadata| metadata.description)
        .unwrap_or("Unknown error")
}

pub fn get_action(code: &str) -> &'static str {
    get_error_metadata(code)
        .map(|metadata| metadata.recommended_action)
        .unwrap_or("No specific action available")
}

pub fn get_category(code: &str) -> &'static str {
    get_error_metadata(code)
        .map(|metadata| metadata.category)
        .unwrap_or("Unknown")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_code_constant_is_registered() {
        let codes = [
            system::INTERNAL_ERROR,
            lexical::UNTERMINATED_STRING,
            syntax::BAD_GRAMMAR,
            syntax::MAX_RECURSION_DEPTH,
            transform::NOT_A_SELECT,
            transform::UNSAFE_SORT_PROPERTY,
            binding::MIXED_PARAMETER_STYLES,
            binding::BINDING_IDENTITY_CONFLICT,
            warning::SORT_CACHE_SHARD_POISONED,
            success::SORT_APPLIED,
        ];
        for code in codes {
            assert!(get_error_metadata(code.as_str()).is_some(), "{} missing", code);
        }
    }

    #[test]
    fn test_registry_has_no_duplicate_codes() {
        assert_eq!(get_error_registry().len(), METADATA.len());
    }

    #[test]
    fn test_unknown_code_defaults() {
        assert_eq!(get_severity("X999"), Severity::Medium);
        assert!(is_recoverable("X999"));
        assert!(!requires_halt("X999"));
        assert_eq!(get_description("X999"), "Unknown error");
        assert_eq!(get_category("X999"), "Unknown");
    }

    #[test]
    fn test_unsafe_sort_is_critical() {
        assert_eq!(get_severity("E121"), Severity::Critical);
        assert_eq!(get_category("E121"), "Transform");
        assert_eq!(Severity::parse("Critical"), Some(Severity::Critical));
    }
}
