//! Grammar definitions shared by both query dialects

pub mod ast;
pub mod dialect;
pub mod keywords;

pub use ast::*;
pub use dialect::{Dialect, Feature};
pub use keywords::{is_reserved_keyword, Keyword};
