// Internal modules
#[macro_use]
pub mod logging;
pub mod binding;
pub mod builder;
pub mod config;
pub mod enhancer;
pub mod grammar;
pub mod introspect;
pub mod lexical;
pub mod render;
pub mod sort;
pub mod syntax;
pub mod tokens;
pub mod transform;
pub mod utils;

// Re-export key types for library consumers
pub use binding::{parse_parameter_bindings, BindingError, ParameterBinding, ParsedBindings};
pub use enhancer::{DeclaredQuery, EnhancerError, EnhancerResult, QueryEnhancer};
pub use grammar::Dialect;
pub use introspect::{QueryInformation, StatementType};
pub use sort::{Direction, NullHandling, Order, Sort};
pub use syntax::{parse, BadGrammar};
pub use transform::{ReturnedType, SortCacheStrategy, TransformError};

/// Check that every error and success code the engine emits is registered
pub fn init_engine_logging() -> Result<(), String> {
    lexical::init_lexical_analysis_logging()?;
    syntax::init_syntax_analysis_logging()?;
    transform::init_transform_logging()?;
    binding::init_binding_logging()?;
    Ok(())
}
