//! Shared pieces of sort rewriting: alias discovery, the sort-key safety
//! check and rendering of `ORDER BY` arguments

use super::{TransformError, TransformResult};
use crate::grammar::ast::*;
use crate::introspect::QueryInformation;
use crate::render::{walk_query, Render, Scope};
use crate::sort::{NullHandling, Order, Sort};
use crate::tokens::constants::*;
use crate::tokens::{QueryToken, TokenStream, TokenStreamBuilder};
use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;

static JOIN_ALIAS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)join\s+(?:fetch\s+)?[\w.$]+\s+(?:as\s+)?([\w$]+)").unwrap()
});

static FUNCTION_ALIAS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\w+\s*\([\w.,\s'=:;\\?]+\)\s+(?i:as)\s+([\w.]+)").unwrap()
});

static FIELD_ALIAS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+[^\s()]+\s+(?i:as)\s+([\w.]+)").unwrap());

/// Resolves sort properties against the aliases a query declares
#[derive(Debug, Clone)]
pub(crate) struct SortSupport {
    primary_alias: Option<String>,
    aliases: HashSet<String>,
}

impl SortSupport {
    /// Collect the top-level aliases from the tree and from a scan of the top-level text
    pub fn new(statement: &Statement, info: &QueryInformation) -> Self {
        let mut aliases = HashSet::new();
        if let Some(query) = statement.as_query() {
            collect_top_level_aliases(query, &mut aliases);
        }

        let outline = TopLevelOutline.render_statement(statement).render();
        for pattern in [&*JOIN_ALIAS, &*FUNCTION_ALIAS, &*FIELD_ALIAS] {
            aliases.extend(
                pattern
                    .captures_iter(&outline)
                    .filter_map(|captures| captures.get(1))
                    .map(|alias| alias.as_str().to_string())
                    .filter(|alias| !alias.is_empty()),
            );
        }

        Self {
            primary_alias: info.alias.clone(),
            aliases,
        }
    }

    #[cfg(test)]
    pub fn aliases(&self) -> &HashSet<String> {
        &self.aliases
    }

    /// `ORDER BY` arguments for `sort`, comma separated
    pub fn order_by_arguments(&self, sort: &Sort) -> TransformResult<TokenStream> {
        let mut items = Vec::with_capacity(sort.len());
        for order in sort {
            check_sort_expression(order)?;
            items.push(self.order_by_argument(order));
        }
        Ok(TokenStreamBuilder::concat(items, TOKEN_COMMA).build())
    }

    fn order_by_argument(&self, order: &Order) -> TokenStream {
        let path = self.resolve(order.property());

        let mut builder = TokenStreamBuilder::new();
        if order.is_ignore_case() {
            let lowered =
                TokenStream::from_tokens([TOKEN_LOWER_FUNC, QueryToken::token(path), TOKEN_CLOSE_PAREN]);
            builder.append_expression(lowered);
        } else {
            builder.append_token(QueryToken::expression(path));
        }

        let direction = if order.is_descending() { TOKEN_DESC } else { TOKEN_ASC };
        builder.append_expression(direction);

        match order.null_handling() {
            NullHandling::Native => {}
            NullHandling::NullsFirst => {
                builder.append_expression(TOKEN_NULLS_FIRST);
            }
            NullHandling::NullsLast => {
                builder.append_expression(TOKEN_NULLS_LAST);
            }
        }

        builder.build()
    }

    fn resolve(&self, property: &str) -> String {
        match self.primary_alias.as_deref() {
            Some(alias) if self.should_prefix(property, alias) => format!("{}.{}", alias, property),
            _ => property.to_string(),
        }
    }

    fn should_prefix(&self, property: &str, alias: &str) -> bool {
        if alias.is_empty() || property.contains('(') {
            return false;
        }
        if property.starts_with(&format!("{}.", alias)) || self.aliases.contains(property) {
            return false;
        }
        !self
            .aliases
            .iter()
            .any(|known| property.starts_with(&format!("{}.", known)))
    }
}

/// Reject sort keys that are not plain property paths unless marked unsafe
pub(crate) fn check_sort_expression(order: &Order) -> TransformResult<()> {
    if order.is_unsafe() {
        return Ok(());
    }

    let suspicious = order
        .property()
        .chars()
        .any(|c| c.is_whitespace() || (c.is_ascii_punctuation() && c != '.' && c != '_'));

    if suspicious {
        return Err(TransformError::UnsafeSortProperty {
            order: order.to_string(),
        });
    }
    Ok(())
}

fn insert_alias(alias: Option<&Alias>, aliases: &mut HashSet<String>) {
    if let Some(alias) = alias {
        aliases.insert(alias.name.clone());
    }
}

/// Renders the statement with every subquery and CTE body left empty
struct TopLevelOutline;

impl Render for TopLevelOutline {
    fn render_query(&self, query: &Query, scope: Scope) -> TokenStream {
        if scope.is_top_level() {
            walk_query(self, query, scope)
        } else {
            TokenStream::empty()
        }
    }
}

/// Result variables and range variables of the statement's own query; subqueries are not entered
fn collect_top_level_aliases(query: &Query, aliases: &mut HashSet<String>) {
    collect_body_aliases(&query.body, aliases);
}

fn collect_body_aliases(body: &QueryBody, aliases: &mut HashSet<String>) {
    match body {
        QueryBody::Spec(spec) => collect_spec_aliases(spec, aliases),
        QueryBody::Nested(query) => collect_top_level_aliases(query, aliases),
        QueryBody::SetOperation { left, right, .. } => {
            collect_body_aliases(left, aliases);
            collect_body_aliases(right, aliases);
        }
    }
}

fn collect_spec_aliases(spec: &QuerySpec, aliases: &mut HashSet<String>) {
    if let Some(select) = &spec.select {
        for item in &select.items {
            insert_alias(item.alias.as_ref(), aliases);
        }
    }

    for item in spec.from.iter().flat_map(|from| from.items.iter()) {
        insert_alias(item.root.alias(), aliases);
        for join in &item.joins {
            insert_alias(join.alias.as_ref(), aliases);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::Dialect;
    use crate::introspect::introspect;
    use crate::syntax::parse;
    use assert_matches::assert_matches;

    fn support(query: &str, dialect: Dialect) -> SortSupport {
        let statement = parse(query, dialect).unwrap();
        let info = introspect(&statement);
        SortSupport::new(&statement, &info)
    }

    #[test]
    fn test_aliases_from_tree_and_text() {
        let support = support(
            "select u.name as n, count(r) total from User u left join u.roles r \
             where u.id in (select a.user.id from Audit a)",
            Dialect::Jpql,
        );
        for alias in ["n", "total", "u", "r"] {
            assert!(support.aliases().contains(alias), "missing alias {}", alias);
        }
        assert!(!support.aliases().contains("a"));
    }

    #[test]
    fn test_subquery_aliases_are_out_of_scope() {
        let support = support(
            "select u from User u where exists (select 1 from Address address join address.city c \
             where address.owner = u) and u.id in (select max(a.id) as top from Audit a)",
            Dialect::Hql,
        );
        for alias in ["address", "c", "a", "top"] {
            assert!(!support.aliases().contains(alias), "unexpected alias {}", alias);
        }
        assert_eq!(support.resolve("address.city"), "u.address.city");
        assert_eq!(support.resolve("a"), "u.a");
    }

    #[test]
    fn test_cte_aliases_are_out_of_scope() {
        let support = support(
            "with x as (select a.id as id from Account a join a.owner o) select u from User u join u.roles r",
            Dialect::Hql,
        );
        assert!(support.aliases().contains("r"));
        for alias in ["a", "o", "id"] {
            assert!(!support.aliases().contains(alias), "unexpected alias {}", alias);
        }
        assert_eq!(support.resolve("a.id"), "u.a.id");
        assert_eq!(support.resolve("r.name"), "r.name");
    }

    #[test]
    fn test_from_subquery_alias_is_kept() {
        let support = support(
            "select s.total from (select count(o) as total from Order o) s",
            Dialect::Hql,
        );
        assert!(support.aliases().contains("s"));
        assert!(!support.aliases().contains("o"));
        assert_eq!(support.resolve("o.total"), "s.o.total");
    }

    #[test]
    fn test_function_alias_scan() {
        let support = support("select sum(o.total) AS revenue from Order o", Dialect::Jpql);
        assert!(support.aliases().contains("revenue"));
    }

    #[test]
    fn test_property_resolution() {
        let support = support(
            "select u, count(r) as roleCount from User u join u.roles r",
            Dialect::Jpql,
        );
        assert_eq!(support.resolve("name"), "u.name");
        assert_eq!(support.resolve("u.name"), "u.name");
        assert_eq!(support.resolve("roleCount"), "roleCount");
        assert_eq!(support.resolve("r.name"), "r.name");
        assert_eq!(support.resolve("length(name)"), "length(name)");
    }

    #[test]
    fn test_no_prefix_without_alias() {
        let support = support("select 1", Dialect::Hql);
        assert_eq!(support.resolve("name"), "name");
    }

    #[test]
    fn test_order_by_arguments() {
        let support = support("select u from User u", Dialect::Jpql);
        let sort = Sort::by([
            Order::asc("name"),
            Order::desc("age").ignoring_case().nulls_last(),
        ]);
        let arguments = support.order_by_arguments(&sort).unwrap();
        assert_eq!(arguments.render(), "u.name asc, lower(u.age) desc nulls last");
    }

    #[test]
    fn test_unsafe_sort_keys() {
        assert!(check_sort_expression(&Order::asc("address.city_name")).is_ok());
        assert_matches!(
            check_sort_expression(&Order::asc("name; drop table users")),
            Err(TransformError::UnsafeSortProperty { .. })
        );
        assert_matches!(
            check_sort_expression(&Order::asc("length(name)")),
            Err(TransformError::UnsafeSortProperty { .. })
        );
        assert!(check_sort_expression(&Order::asc("length(name)").unsafe_expression()).is_ok());
    }
}
