//! Injecting a caller-supplied sort into a query's `ORDER BY`

use super::dto::{dto_selection, ReturnedType};
use super::support::SortSupport;
use super::{TransformError, TransformResult};
use crate::config::compile_time::rewrite::MAX_SORT_ORDERS;
use crate::grammar::ast::*;
use crate::introspect::QueryInformation;
use crate::logging::codes;
use crate::render::{walk_order_by, walk_ordering, walk_result_limits, walk_select_clause, Render, Scope};
use crate::sort::Sort;
use crate::tokens::constants::*;
use crate::tokens::{TokenStream, TokenStreamBuilder};

/// Renders a statement with `sort` appended to its top-level ordering
struct SortedQueryTransformer<'a> {
    info: &'a QueryInformation,
    returned: &'a ReturnedType,
    order_by_arguments: Option<TokenStream>,
}

impl Render for SortedQueryTransformer<'_> {
    fn render_select_clause(&self, select: &SelectClause, scope: Scope) -> TokenStream {
        if scope.is_top_level() {
            if let Some(selection) = dto_selection(select, self.info, self.returned) {
                return selection;
            }
        }
        walk_select_clause(self, select, scope)
    }

    fn render_ordering(&self, query: &Query, scope: Scope) -> TokenStream {
        let Some(arguments) = self.order_by_arguments.as_ref().filter(|_| scope.is_top_level()) else {
            return walk_ordering(self, query, scope);
        };

        let mut builder = TokenStreamBuilder::new();
        match &query.order_by {
            Some(order_by) => {
                builder.append_inline(walk_order_by(self, order_by));
                let mut amendment = TokenStreamBuilder::from_token(TOKEN_COMMA);
                amendment.append_inline(arguments.clone());
                builder.append_inline(amendment.build());
            }
            None => {
                let mut order_by = TokenStreamBuilder::from_token(TOKEN_ORDER_BY);
                order_by.append_expression(arguments.clone());
                builder.append_expression(order_by.build());
            }
        }
        builder.append_expression(walk_result_limits(self, query));

        builder.build()
    }
}

/// Render `statement` with `sort` applied
pub fn apply_sorting(statement: &Statement, info: &QueryInformation, sort: &Sort) -> TransformResult<TokenStream> {
    apply_sorting_with(statement, info, sort, &ReturnedType::Entity)
}

/// Render `statement` with `sort` applied and the selection adapted to `returned`
pub fn apply_sorting_with(
    statement: &Statement,
    info: &QueryInformation,
    sort: &Sort,
    returned: &ReturnedType,
) -> TransformResult<TokenStream> {
    if !info.is_select() {
        let error = TransformError::not_a_select("sort", info.statement_type);
        log_error!(error.error_code(), "Sorting requires a SELECT statement",
            "statement_type" => info.statement_type
        );
        return Err(error);
    }

    if sort.len() > MAX_SORT_ORDERS {
        return Err(TransformError::TooManySortOrders {
            count: sort.len(),
            max: MAX_SORT_ORDERS,
        });
    }

    let order_by_arguments = if sort.is_sorted() {
        let support = SortSupport::new(statement, info);
        let arguments = support.order_by_arguments(sort).inspect_err(|error| {
            log_error!(error.error_code(), "Rejected sort expression", "sort" => sort);
        })?;
        Some(arguments)
    } else {
        log_debug!("Unsorted request, rendering as written");
        None
    };

    let transformer = SortedQueryTransformer {
        info,
        returned,
        order_by_arguments,
    };
    let rendered = transformer.render_statement(statement);

    log_success!(codes::success::SORT_APPLIED,
        "Sort applied",
        "orders" => sort.len()
    );

    Ok(rendered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::Dialect;
    use crate::introspect::introspect;
    use crate::sort::Order;
    use crate::syntax::parse;
    use assert_matches::assert_matches;

    fn sorted(query: &str, dialect: Dialect, sort: &Sort) -> TransformResult<String> {
        let statement = parse(query, dialect).unwrap();
        let info = introspect(&statement);
        apply_sorting(&statement, &info, sort).map(|stream| stream.render())
    }

    #[test]
    fn test_existing_order_by_is_amended() {
        let result = sorted(
            "select u from User u where u.age > ?1 order by u.name",
            Dialect::Jpql,
            &Sort::by([Order::desc("age")]),
        );
        assert_eq!(
            result.unwrap(),
            "select u from User u where u.age > ?1 order by u.name, u.age desc"
        );
    }

    #[test]
    fn test_order_by_is_added() {
        let result = sorted(
            "select u from User u where u.active = true",
            Dialect::Jpql,
            &Sort::by([Order::asc("lastname"), Order::desc("firstname").ignoring_case()]),
        );
        assert_eq!(
            result.unwrap(),
            "select u from User u where u.active = true order by u.lastname asc, lower(u.firstname) desc"
        );
    }

    #[test]
    fn test_unsorted_renders_as_written() {
        let query = "select u from User u order by u.name desc";
        assert_eq!(sorted(query, Dialect::Jpql, &Sort::unsorted()).unwrap(), query);
    }

    #[test]
    fn test_sort_goes_before_limits() {
        let result = sorted(
            "select u from User u order by u.name limit 10 offset 20",
            Dialect::Hql,
            &Sort::by([Order::asc("age").nulls_first()]),
        );
        assert_eq!(
            result.unwrap(),
            "select u from User u order by u.name, u.age asc nulls first limit 10 offset 20"
        );

        let result = sorted("from User u limit 5", Dialect::Hql, &Sort::by([Order::asc("age")]));
        assert_eq!(result.unwrap(), "from User u order by u.age asc limit 5");
    }

    #[test]
    fn test_subquery_ordering_untouched() {
        let result = sorted(
            "select u from User u where u.id in (select a.user.id from Audit a)",
            Dialect::Jpql,
            &Sort::by([Order::asc("name")]),
        );
        assert_eq!(
            result.unwrap(),
            "select u from User u where u.id in (select a.user.id from Audit a) order by u.name asc"
        );
    }

    #[test]
    fn test_subquery_and_cte_aliases_are_prefixed() {
        let result = sorted(
            "select u from User u where exists (select 1 from Address address where address.owner = u)",
            Dialect::Jpql,
            &Sort::by([Order::asc("address.city")]),
        );
        assert_eq!(
            result.unwrap(),
            "select u from User u where exists (select 1 from Address address where address.owner = u) \
             order by u.address.city asc"
        );

        let result = sorted(
            "with x as (select a from Account a) select u from User u",
            Dialect::Hql,
            &Sort::by([Order::asc("a.id")]),
        );
        assert_eq!(
            result.unwrap(),
            "with x as (select a from Account a) select u from User u order by u.a.id asc"
        );

        let result = sorted(
            "select u from User u where u.id in (select a.id from Audit a)",
            Dialect::Jpql,
            &Sort::by([Order::asc("a")]),
        );
        assert_eq!(
            result.unwrap(),
            "select u from User u where u.id in (select a.id from Audit a) order by u.a asc"
        );
    }

    #[test]
    fn test_aliases_are_not_prefixed() {
        let result = sorted(
            "select u.department as dept, count(u) as headcount from User u group by u.department",
            Dialect::Jpql,
            &Sort::by([Order::desc("headcount"), Order::asc("dept")]),
        );
        assert_eq!(
            result.unwrap(),
            "select u.department as dept, count(u) as headcount from User u group by u.department \
             order by headcount desc, dept asc"
        );
    }

    #[test]
    fn test_unsafe_orders() {
        let error = sorted(
            "select u from User u",
            Dialect::Jpql,
            &Sort::by([Order::asc("name) desc, (password")]),
        )
        .unwrap_err();
        assert_matches!(error, TransformError::UnsafeSortProperty { .. });

        let result = sorted(
            "select u from User u",
            Dialect::Jpql,
            &Sort::by([Order::asc("length(u.name)").unsafe_expression()]),
        );
        assert_eq!(result.unwrap(), "select u from User u order by length(u.name) asc");
    }

    #[test]
    fn test_non_select_rejected() {
        let error = sorted("delete from User u", Dialect::Jpql, &Sort::by([Order::asc("name")])).unwrap_err();
        assert_matches!(error, TransformError::NotASelect { operation: "sort", .. });
    }

    #[test]
    fn test_too_many_orders() {
        let sort = Sort::by((0..=MAX_SORT_ORDERS).map(|i| Order::asc(format!("p{}", i))));
        let error = sorted("select u from User u", Dialect::Jpql, &sort).unwrap_err();
        assert_matches!(error, TransformError::TooManySortOrders { .. });
    }
}
