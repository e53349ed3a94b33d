//! Render tokens and whitespace-aware token streams
//!
//! Every renderer and rewriter in the engine produces a [`TokenStream`]
//! rather than a string. A stream is a tree of [`QueryToken`]s; spacing is
//! decided at render time purely from the expression flag of the units that
//! meet at each boundary:
//!
//! - inside a flat token list, a space goes before a token when the previous
//!   token was an expression token;
//! - between nested streams, a space goes in when the rendered text does not
//!   already end in one and either side of the boundary is an expression.
//!
//! [`TokenStream::inline`] hides a stream's expression flag from its
//! neighbours (function arguments, parenthesised groups) and
//! [`TokenStream::expression`] forces it on.

pub mod stream;
pub mod token;

pub use stream::{TokenStream, TokenStreamBuilder};
pub use token::{constants, QueryToken};
