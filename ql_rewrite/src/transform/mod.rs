//! Query rewriters built on the renderer
//!
//! Each transformer is a [`Render`](crate::render::Render) implementation
//! that overrides the few nodes it changes and walks everything else with
//! the default rendering. All of them work on a parsed statement plus the
//! [`QueryInformation`](crate::introspect::QueryInformation) derived from it.

pub mod cache;
pub mod count;
pub mod dto;
pub mod sort;
mod support;

use crate::introspect::StatementType;
use crate::logging::{codes, Code};

pub use cache::{CachableQuery, SortCacheStrategy, SortRewriteCache};
pub use count::create_count_query;
pub use dto::{rewrite_dto_projection, ReturnedType};
pub use sort::{apply_sorting, apply_sorting_with};

pub type TransformResult<T> = Result<T, TransformError>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransformError {
    #[error("Cannot {operation} a {statement_type} statement; only SELECT queries can be rewritten")]
    NotASelect {
        operation: &'static str,
        statement_type: StatementType,
    },

    #[error(
        "Sort expression '{order}' must only contain property references or aliases used in the \
         select clause; use an unsafe order to sort by anything else"
    )]
    UnsafeSortProperty { order: String },

    #[error("Sorting is not supported by this query's cache strategy (requested {sort})")]
    SortNotSupported { sort: String },

    #[error("Too many sort orders: {count} exceeds the maximum of {max}")]
    TooManySortOrders { count: usize, max: usize },
}

impl TransformError {
    pub fn not_a_select(operation: &'static str, statement_type: StatementType) -> Self {
        Self::NotASelect {
            operation,
            statement_type,
        }
    }

    pub fn error_code(&self) -> Code {
        match self {
            Self::NotASelect { .. } => codes::transform::NOT_A_SELECT,
            Self::UnsafeSortProperty { .. } => codes::transform::UNSAFE_SORT_PROPERTY,
            Self::SortNotSupported { .. } => codes::transform::SORT_NOT_SUPPORTED,
            Self::TooManySortOrders { .. } => codes::transform::TOO_MANY_SORT_ORDERS,
        }
    }

    pub fn severity(&self) -> &'static str {
        codes::get_severity(self.error_code().as_str()).as_str()
    }

    pub fn recommended_action(&self) -> &'static str {
        codes::get_action(self.error_code().as_str())
    }
}

/// Check that every rewrite error code is registered
pub fn init_transform_logging() -> Result<(), String> {
    let transform_codes = [
        codes::transform::NOT_A_SELECT,
        codes::transform::UNSAFE_SORT_PROPERTY,
        codes::transform::SORT_NOT_SUPPORTED,
        codes::transform::TOO_MANY_SORT_ORDERS,
        codes::warning::SORT_CACHE_SHARD_POISONED,
    ];

    for code in &transform_codes {
        if codes::get_error_metadata(code.as_str()).is_none() {
            return Err(format!(
                "Transform code {} not found in metadata registry",
                code.as_str()
            ));
        }
    }

    Ok(())
}
