//! One declared query, parsed once and rewritten on demand
//!
//! [`QueryEnhancer`] owns the parsed statement, its introspection result and
//! the sort cache for the query. It is immutable after construction apart
//! from that cache and is meant to be shared across threads.

use crate::binding::{parse_parameter_bindings, BindingError, ParameterBinding};
use crate::config::runtime::RewritePreferences;
use crate::grammar::{Dialect, Statement};
use crate::introspect::{introspect, order_by_properties, QueryInformation, StatementType};
use crate::logging::{codes, Code};
use crate::render::render_to_string;
use crate::sort::Sort;
use crate::syntax::{parse, BadGrammar};
use crate::transform::{self, CachableQuery, ReturnedType, SortCacheStrategy, SortRewriteCache, TransformError};

pub type EnhancerResult<T> = Result<T, EnhancerError>;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EnhancerError {
    #[error(transparent)]
    Grammar(#[from] BadGrammar),

    #[error(transparent)]
    Transform(#[from] TransformError),

    #[error(transparent)]
    Binding(#[from] BindingError),
}

impl EnhancerError {
    pub fn error_code(&self) -> Code {
        match self {
            Self::Grammar(error) => error.error_code(),
            Self::Transform(error) => error.error_code(),
            Self::Binding(error) => error.error_code(),
        }
    }

    pub fn severity(&self) -> &'static str {
        codes::get_severity(self.error_code().as_str()).as_str()
    }
}

/// Query text as declared, with its parameter bindings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclaredQuery {
    query: String,
    dialect: Dialect,
    bindings: Vec<ParameterBinding>,
    uses_jdbc_style_parameters: bool,
}

impl DeclaredQuery {
    /// Scan `query` for bindings; the stored text is the cleaned query
    pub fn of(query: &str, dialect: Dialect) -> EnhancerResult<Self> {
        let parsed = parse_parameter_bindings(query)?;
        Ok(Self {
            query: parsed.query,
            dialect,
            bindings: parsed.bindings,
            uses_jdbc_style_parameters: parsed.uses_jdbc_style,
        })
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn bindings(&self) -> &[ParameterBinding] {
        &self.bindings
    }

    pub fn uses_jdbc_style_parameters(&self) -> bool {
        self.uses_jdbc_style_parameters
    }

    pub fn has_named_parameter(&self) -> bool {
        self.bindings.iter().any(|binding| binding.name().is_some())
    }
}

/// Parsed query with its rewrites
#[derive(Debug)]
pub struct QueryEnhancer {
    declared: DeclaredQuery,
    statement: Statement,
    info: QueryInformation,
    cache: SortRewriteCache,
}

impl QueryEnhancer {
    /// Parse `query` with an LRU sort cache sized from the runtime preferences
    pub fn parse(query: &str, dialect: Dialect) -> EnhancerResult<Self> {
        let cache = SortRewriteCache::from_preferences(&RewritePreferences::default());
        Self::assemble(DeclaredQuery::of(query, dialect)?, cache)
    }

    pub fn with_cache_strategy(query: &str, dialect: Dialect, strategy: SortCacheStrategy) -> EnhancerResult<Self> {
        Self::from_declared(DeclaredQuery::of(query, dialect)?, strategy)
    }

    pub fn from_declared(declared: DeclaredQuery, strategy: SortCacheStrategy) -> EnhancerResult<Self> {
        Self::assemble(declared, SortRewriteCache::new(strategy))
    }

    fn assemble(declared: DeclaredQuery, cache: SortRewriteCache) -> EnhancerResult<Self> {
        let statement = parse(declared.query(), declared.dialect())?;
        let info = introspect(&statement);
        log_debug!("Query enhancer ready",
            "dialect" => declared.dialect(),
            "statement_type" => info.statement_type,
            "bindings" => declared.bindings().len()
        );
        Ok(Self {
            declared,
            statement,
            info,
            cache,
        })
    }

    pub fn declared_query(&self) -> &DeclaredQuery {
        &self.declared
    }

    pub fn statement(&self) -> &Statement {
        &self.statement
    }

    pub fn query_information(&self) -> &QueryInformation {
        &self.info
    }

    /// Primary alias of the query
    pub fn detect_alias(&self) -> Option<&str> {
        self.info.alias.as_deref()
    }

    /// Top-level select list as rendered text
    pub fn projection(&self) -> String {
        self.info.projection_text()
    }

    pub fn has_constructor_expression(&self) -> bool {
        self.info.has_constructor_expression
    }

    pub fn statement_type(&self) -> StatementType {
        self.info.statement_type
    }

    /// Sort keys of the query's own `ORDER BY`
    pub fn order_by_properties(&self) -> Vec<String> {
        order_by_properties(&self.statement)
    }

    /// The query rendered back without changes
    pub fn render(&self) -> String {
        render_to_string(&self.statement)
    }

    pub fn apply_sorting(&self, sort: &Sort) -> EnhancerResult<String> {
        self.apply_sorting_with(sort, &ReturnedType::Entity)
    }

    /// Sorted rendering with the selection adapted to `returned`, bypassing the cache
    pub fn apply_sorting_with(&self, sort: &Sort, returned: &ReturnedType) -> EnhancerResult<String> {
        let rendered = transform::apply_sorting_with(&self.statement, &self.info, sort, returned)?;
        Ok(rendered.render())
    }

    pub fn create_count_query(&self, count_projection: Option<&str>) -> EnhancerResult<String> {
        let rendered = transform::create_count_query(&self.statement, &self.info, count_projection)?;
        Ok(rendered.render())
    }

    /// Sorted and projected rendering through this query's cache
    ///
    /// The cache is keyed on the sort alone, so one enhancer should always be
    /// asked for the same `returned` type.
    pub fn rewrite(&self, sort: &Sort, returned: &ReturnedType) -> EnhancerResult<String> {
        let key = CachableQuery::new(self.declared.query(), sort.clone(), returned.clone());
        let rendered = self.cache.get_or_render(&key, |key| {
            transform::apply_sorting_with(&self.statement, &self.info, &key.sort, &key.returned_type)
                .map(|stream| stream.render())
        })?;
        Ok(rendered)
    }

    pub fn cache_strategy(&self) -> SortCacheStrategy {
        self.cache.strategy()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::{BindingIdentifier, BindingKind, LikeType};
    use crate::sort::Order;
    use assert_matches::assert_matches;

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn test_enhancer_is_shareable() {
        assert_send_sync::<QueryEnhancer>();
        assert_send_sync::<DeclaredQuery>();
    }

    #[test]
    fn test_introspection_accessors() {
        let enhancer =
            QueryEnhancer::parse("select new com.example.Dto(u.name) from User u order by u.name", Dialect::Jpql)
                .unwrap();
        assert_eq!(enhancer.detect_alias(), Some("u"));
        assert_eq!(enhancer.projection(), "new com.example.Dto(u.name)");
        assert!(enhancer.has_constructor_expression());
        assert_eq!(enhancer.statement_type(), StatementType::Select);
        assert_eq!(enhancer.order_by_properties(), vec!["u.name".to_string()]);
    }

    #[test]
    fn test_worked_examples() {
        let enhancer = QueryEnhancer::parse("select u from User u where u.age > ?1 order by u.name", Dialect::Jpql)
            .unwrap();
        assert_eq!(
            enhancer.apply_sorting(&Sort::by([Order::desc("age")])).unwrap(),
            "select u from User u where u.age > ?1 order by u.name, u.age desc"
        );
        assert_eq!(
            enhancer.create_count_query(None).unwrap(),
            "select count(u) from User u where u.age > ?1"
        );
    }

    #[test]
    fn test_declared_query_is_cleaned() {
        let enhancer =
            QueryEnhancer::parse("select u from User u where u.name like %:name%", Dialect::Jpql).unwrap();
        let declared = enhancer.declared_query();
        assert_eq!(declared.query(), "select u from User u where u.name like :name");
        assert_eq!(declared.bindings().len(), 1);
        assert_eq!(declared.bindings()[0].identifier, BindingIdentifier::named("name"));
        assert_eq!(declared.bindings()[0].kind, BindingKind::Like(LikeType::Contains));
        assert!(declared.has_named_parameter());
        assert!(!declared.uses_jdbc_style_parameters());
        assert_eq!(enhancer.render(), "select u from User u where u.name like :name");
    }

    #[test]
    fn test_rewrite_is_cached() {
        let enhancer = QueryEnhancer::parse("select u from User u", Dialect::Jpql).unwrap();
        let dto = ReturnedType::dto("com.example.UserDto", ["name", "email"]);
        let sort = Sort::by([Order::asc("name")]);

        let first = enhancer.rewrite(&sort, &dto).unwrap();
        assert_eq!(
            first,
            "select new com.example.UserDto(u.name, u.email) from User u order by u.name asc"
        );
        assert_eq!(enhancer.rewrite(&sort, &dto).unwrap(), first);
    }

    #[test]
    fn test_concurrent_rewrites_share_one_cache() {
        use std::thread;

        let enhancer = QueryEnhancer::with_cache_strategy(
            "select u from User u where u.age > :age",
            Dialect::Jpql,
            SortCacheStrategy::Lru { capacity: 4 },
        )
        .unwrap();
        let sorts = [
            Sort::unsorted(),
            Sort::by([Order::asc("name")]),
            Sort::by([Order::desc("age"), Order::asc("name")]),
        ];
        let expected = [
            "select u from User u where u.age > :age",
            "select u from User u where u.age > :age order by u.name asc",
            "select u from User u where u.age > :age order by u.age desc, u.name asc",
        ];

        thread::scope(|scope| {
            for _ in 0..8 {
                scope.spawn(|| {
                    for round in 0..30 {
                        let index = round % sorts.len();
                        let rendered = enhancer.rewrite(&sorts[index], &ReturnedType::Entity).unwrap();
                        assert_eq!(rendered, expected[index]);
                    }
                });
            }
        });

        assert_eq!(enhancer.cache_strategy(), SortCacheStrategy::Lru { capacity: 4 });
    }

    #[test]
    fn test_unsorted_only_strategy() {
        let enhancer =
            QueryEnhancer::with_cache_strategy("select u from User u", Dialect::Jpql, SortCacheStrategy::UnsortedOnly)
                .unwrap();
        assert_eq!(
            enhancer.rewrite(&Sort::unsorted(), &ReturnedType::Entity).unwrap(),
            "select u from User u"
        );
        let error = enhancer
            .rewrite(&Sort::by([Order::asc("name")]), &ReturnedType::Entity)
            .unwrap_err();
        assert_matches!(error, EnhancerError::Transform(TransformError::SortNotSupported { .. }));
        assert_eq!(error.error_code().as_str(), "E122");
    }

    #[test]
    fn test_errors_are_wrapped() {
        assert_matches!(
            QueryEnhancer::parse("select u from", Dialect::Jpql),
            Err(EnhancerError::Grammar(_))
        );
        assert_matches!(
            QueryEnhancer::parse("select u from User u where u.a = ? and u.b = :b", Dialect::Jpql),
            Err(EnhancerError::Binding(BindingError::MixedStyles))
        );

        let enhancer = QueryEnhancer::parse("delete from User u where u.id = ?1", Dialect::Jpql).unwrap();
        assert_matches!(
            enhancer.create_count_query(None),
            Err(EnhancerError::Transform(TransformError::NotASelect { .. }))
        );
    }
}
