//! Deriving a `COUNT` query for pagination

use super::{TransformError, TransformResult};
use crate::grammar::ast::*;
use crate::introspect::{spec_alias, QueryInformation};
use crate::logging::codes;
use crate::render::{
    comma_list, keyword, walk_from_root, walk_join_parts, walk_ordering, walk_query_spec, walk_result_limits,
    walk_select_clause, Render, Scope,
};
use crate::tokens::constants::*;
use crate::tokens::{QueryToken, TokenStream, TokenStreamBuilder};
use std::cell::{Cell, RefCell};

/// Renders a statement with every top-level selection replaced by a count
struct CountQueryTransformer<'a> {
    info: &'a QueryInformation,
    count_projection: Option<&'a str>,
    /// Alias counted in the top-level query specification being rendered
    counted_alias: RefCell<Option<String>>,
    /// Still owed an `AS __` on its first FROM root
    synthetic_alias_pending: Cell<bool>,
}

impl<'a> CountQueryTransformer<'a> {
    fn new(info: &'a QueryInformation, count_projection: Option<&'a str>) -> Self {
        Self {
            info,
            count_projection: count_projection.map(str::trim).filter(|projection| !projection.is_empty()),
            counted_alias: RefCell::new(info.alias.clone()),
            synthetic_alias_pending: Cell::new(false),
        }
    }

    fn alias_token(&self) -> QueryToken {
        match self.counted_alias.borrow().as_ref() {
            Some(alias) => QueryToken::token(alias.clone()),
            None => TOKEN_DOUBLE_UNDERSCORE,
        }
    }

    /// What goes between the parentheses of `count(..)`
    fn count_argument(&self, select: Option<&SelectClause>) -> TokenStream {
        let distinct = select.and_then(|select| select.distinct.as_ref());
        let mut builder = TokenStreamBuilder::new();

        if let Some(projection) = self.count_projection {
            let already_distinct = projection.to_ascii_lowercase().starts_with("distinct ");
            if let Some(distinct) = distinct.filter(|_| !already_distinct) {
                builder.append_token(keyword(distinct));
            }
            builder.append_token(QueryToken::token(projection.to_string()));
            return builder.build();
        }

        if let (Some(select), Some(distinct)) = (select, distinct) {
            builder.append_token(keyword(distinct));
            if select.items.iter().any(|item| item.expr.is_constructor()) {
                builder.append_token(self.alias_token());
            } else {
                let items = select.items.iter().map(|item| self.render_expr(&item.expr));
                builder.append_expression(comma_list(items));
            }
            return builder.build();
        }

        if self.info.has_cte || self.info.has_from_function {
            builder.append_token(TOKEN_STAR);
        } else {
            builder.append_token(self.alias_token());
        }
        builder.build()
    }
}

impl Render for CountQueryTransformer<'_> {
    fn render_query_spec(&self, spec: &QuerySpec, scope: Scope) -> TokenStream {
        if !scope.is_top_level() {
            return walk_query_spec(self, spec, scope);
        }

        let alias = spec_alias(spec);
        self.synthetic_alias_pending.set(alias.is_none());
        self.counted_alias.replace(alias);

        if spec.select.is_some() {
            return walk_query_spec(self, spec, scope);
        }

        let mut count = TokenStreamBuilder::from_token(TOKEN_SELECT_COUNT);
        count.append_inline(self.count_argument(None));
        count.append_token(TOKEN_CLOSE_PAREN);

        let mut builder = TokenStreamBuilder::new();
        builder.append_expression(count.build());
        builder.append_expression(walk_query_spec(self, spec, scope));
        builder.build()
    }

    fn render_select_clause(&self, select: &SelectClause, scope: Scope) -> TokenStream {
        if !scope.is_top_level() {
            return walk_select_clause(self, select, scope);
        }

        let count_function = if select.keyword.is_upper_case() {
            TOKEN_COUNT_FUNC_UPPER
        } else {
            TOKEN_COUNT_FUNC
        };

        let mut builder = TokenStreamBuilder::from_token(keyword(&select.keyword));
        builder.append_token(count_function);
        builder.append_inline(self.count_argument(Some(select)));
        builder.append_token(TOKEN_CLOSE_PAREN);
        builder.build()
    }

    fn render_from_root(&self, root: &FromRoot, scope: Scope) -> TokenStream {
        let rendered = walk_from_root(self, root, scope);
        if !scope.is_top_level() || root.alias().is_some() || !self.synthetic_alias_pending.replace(false) {
            return rendered;
        }

        let mut builder = TokenStreamBuilder::new();
        builder.append_expression(rendered);
        builder.append_token(TOKEN_AS);
        builder.append_token(TOKEN_DOUBLE_UNDERSCORE);
        builder.build()
    }

    fn render_join(&self, join: &Join, scope: Scope) -> TokenStream {
        walk_join_parts(self, join, !scope.is_top_level())
    }

    fn render_ordering(&self, query: &Query, scope: Scope) -> TokenStream {
        if scope.is_top_level() {
            walk_result_limits(self, query)
        } else {
            walk_ordering(self, query, scope)
        }
    }
}

/// Derive the count query for `statement`
///
/// `count_projection` overrides what is counted; a `DISTINCT` in the original
/// selection is carried over to it.
pub fn create_count_query(
    statement: &Statement,
    info: &QueryInformation,
    count_projection: Option<&str>,
) -> TransformResult<TokenStream> {
    if !info.is_select() {
        let error = TransformError::not_a_select("count", info.statement_type);
        log_error!(error.error_code(), "Count queries require a SELECT statement",
            "statement_type" => info.statement_type
        );
        return Err(error);
    }

    let transformer = CountQueryTransformer::new(info, count_projection);
    let rendered = transformer.render_statement(statement);

    log_success!(codes::success::COUNT_QUERY_DERIVED,
        "Count query derived",
        "explicit_projection" => count_projection.is_some(),
        "synthetic_alias" => info.alias.is_none()
    );

    Ok(rendered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::Dialect;
    use crate::introspect::{introspect, StatementType};
    use crate::syntax::parse;
    use assert_matches::assert_matches;

    fn count(query: &str, dialect: Dialect, projection: Option<&str>) -> String {
        let statement = parse(query, dialect).unwrap();
        let info = introspect(&statement);
        create_count_query(&statement, &info, projection).unwrap().render()
    }

    fn jpql(query: &str) -> String {
        count(query, Dialect::Jpql, None)
    }

    fn hql(query: &str) -> String {
        count(query, Dialect::Hql, None)
    }

    #[test]
    fn test_counts_primary_alias() {
        assert_eq!(
            jpql("select u from User u where u.age > ?1"),
            "select count(u) from User u where u.age > ?1"
        );
        assert_eq!(
            jpql("SELECT u.name FROM User u GROUP BY u.name HAVING count(u) > 1"),
            "SELECT COUNT(u) FROM User u GROUP BY u.name HAVING count(u) > 1"
        );
    }

    #[test]
    fn test_distinct_selection_is_counted() {
        assert_eq!(
            jpql("SELECT DISTINCT p.name FROM Person p"),
            "SELECT COUNT(DISTINCT p.name) FROM Person p"
        );
        assert_eq!(
            jpql("select distinct u.name as n, u.age from User u"),
            "select count(distinct u.name, u.age) from User u"
        );
        assert_eq!(
            jpql("select distinct new com.example.Dto(u.name) from User u"),
            "select count(distinct u) from User u"
        );
    }

    #[test]
    fn test_explicit_projection() {
        assert_eq!(
            count("select u from User u", Dialect::Jpql, Some("u.id")),
            "select count(u.id) from User u"
        );
        assert_eq!(
            count("select distinct u from User u", Dialect::Jpql, Some("u.id")),
            "select count(distinct u.id) from User u"
        );
        assert_eq!(
            count("select distinct u from User u", Dialect::Jpql, Some("distinct u.id")),
            "select count(distinct u.id) from User u"
        );
    }

    #[test]
    fn test_order_by_dropped() {
        assert_eq!(
            jpql("select u from User u order by u.name desc"),
            "select count(u) from User u"
        );
        assert_eq!(
            hql("select u from User u order by u.name limit 10 offset 5"),
            "select count(u) from User u limit 10 offset 5"
        );
    }

    #[test]
    fn test_fetch_joins_lose_fetch() {
        assert_eq!(
            jpql("select u from User u left join fetch u.roles r where r.name = 'admin'"),
            "select count(u) from User u left join u.roles r where r.name = 'admin'"
        );
    }

    #[test]
    fn test_subqueries_untouched() {
        assert_eq!(
            jpql("select u from User u where u.id in (select a.user.id from Audit a order by a.at)"),
            "select count(u) from User u where u.id in (select a.user.id from Audit a order by a.at)"
        );
    }

    #[test]
    fn test_implicit_select() {
        assert_eq!(hql("from User u where u.active = true"), "select count(u) from User u where u.active = true");
        assert_eq!(hql("from User"), "select count(User) from User");
    }

    #[test]
    fn test_star_for_cte_and_from_function() {
        assert_eq!(
            hql("with recent as (select e from Event e) select r from recent r"),
            "with recent as (select e from Event e) select count(*) from recent r"
        );
        assert_eq!(
            hql("select e from generate_series(1, 10) e"),
            "select count(*) from generate_series(1, 10) e"
        );
    }

    #[test]
    fn test_no_alias_fallback() {
        assert_eq!(
            hql("select s from (select u from User u)"),
            "select count(__) from (select u from User u) AS __"
        );
    }

    #[test]
    fn test_set_operation_branches() {
        assert_eq!(
            hql("select u from User u union select a from Admin a"),
            "select count(u) from User u union select count(a) from Admin a"
        );
    }

    #[test]
    fn test_result_is_a_select() {
        let rendered = jpql("select distinct u from User u join u.roles r order by u.name");
        let reparsed = parse(&rendered, Dialect::Jpql).unwrap();
        assert_eq!(introspect(&reparsed).statement_type, StatementType::Select);
        assert_eq!(rendered.matches("count(").count(), 1);
    }

    #[test]
    fn test_non_select_rejected() {
        let statement = parse("update User u set u.active = false", Dialect::Jpql).unwrap();
        let info = introspect(&statement);
        let error = create_count_query(&statement, &info, None).unwrap_err();
        assert_matches!(error, TransformError::NotASelect { operation: "count", .. });
    }
}
