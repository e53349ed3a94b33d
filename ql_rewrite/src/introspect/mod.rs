//! Structural metadata extracted from a parsed statement
//!
//! Only the statement's own query is inspected: selections and aliases that
//! belong to subqueries never leak into the result.

use crate::grammar::ast::*;
use crate::logging::codes;
use crate::render::{walk_selection, QueryRenderer, Render};
use crate::tokens::TokenStream;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum StatementType {
    Select,
    Insert,
    Update,
    Delete,
    Merge,
    Other,
}

impl StatementType {
    pub fn as_str(self) -> &'static str {
        match self {
            StatementType::Select => "SELECT",
            StatementType::Insert => "INSERT",
            StatementType::Update => "UPDATE",
            StatementType::Delete => "DELETE",
            StatementType::Merge => "MERGE",
            StatementType::Other => "OTHER",
        }
    }
}

impl fmt::Display for StatementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the rewriters need to know about a query
#[derive(Debug, Clone)]
pub struct QueryInformation {
    /// Primary FROM alias; the entity name itself when none was declared
    pub alias: Option<String>,
    /// Top-level select list as written, empty without a select clause
    pub projection: TokenStream,
    pub has_constructor_expression: bool,
    pub statement_type: StatementType,
    pub has_cte: bool,
    pub has_from_function: bool,
}

impl QueryInformation {
    pub fn projection_text(&self) -> String {
        self.projection.render()
    }

    pub fn is_select(&self) -> bool {
        self.statement_type == StatementType::Select
    }
}

/// Inspect `statement`; never fails
pub fn introspect(statement: &Statement) -> QueryInformation {
    let info = match statement {
        Statement::Select(query) => introspect_query(query),
        Statement::Update(update) => entity_statement(
            StatementType::Update,
            &update.entity,
            update.alias.as_ref(),
        ),
        Statement::Delete(delete) => entity_statement(
            StatementType::Delete,
            &delete.entity,
            delete.alias.as_ref(),
        ),
        Statement::Insert(insert) => entity_statement(StatementType::Insert, &insert.entity, None),
    };

    log_success!(codes::success::INTROSPECTION_COMPLETE,
        "Query introspected",
        "statement_type" => info.statement_type,
        "alias" => info.alias.as_deref().unwrap_or("<none>")
    );

    info
}

fn entity_statement(statement_type: StatementType, entity: &str, alias: Option<&Alias>) -> QueryInformation {
    QueryInformation {
        alias: Some(alias.map_or_else(|| entity.to_string(), |alias| alias.name.clone())),
        projection: TokenStream::empty(),
        has_constructor_expression: false,
        statement_type,
        has_cte: false,
        has_from_function: false,
    }
}

fn introspect_query(query: &Query) -> QueryInformation {
    let spec = query.primary_spec();

    let (projection, has_constructor_expression) = match &spec.select {
        Some(select) => (
            walk_selection(&QueryRenderer, &select.items),
            select.items.iter().any(|item| item.expr.is_constructor()),
        ),
        None => (TokenStream::empty(), false),
    };

    let roots: Vec<&FromRoot> = spec
        .from
        .iter()
        .flat_map(|from| from.items.iter().map(|item| &item.root))
        .collect();

    let alias = spec_alias(spec);
    if alias.is_none() {
        log_debug!("No primary alias detected", "from_items" => roots.len());
    }

    QueryInformation {
        alias,
        projection,
        has_constructor_expression,
        statement_type: StatementType::Select,
        has_cte: query.with.is_some(),
        has_from_function: roots.iter().any(|root| matches!(root, FromRoot::Function { .. })),
    }
}

/// Alias of the first FROM root of `spec`, falling back to the entity name
pub(crate) fn spec_alias(spec: &QuerySpec) -> Option<String> {
    spec.from
        .as_ref()
        .and_then(|from| from.items.first())
        .and_then(|item| primary_alias(&item.root))
}

fn primary_alias(root: &FromRoot) -> Option<String> {
    match (root, root.alias()) {
        (_, Some(alias)) => Some(alias.name.clone()),
        (FromRoot::Entity { name, .. }, None) => Some(name.clone()),
        _ => None,
    }
}

/// Sort keys of the statement's own `ORDER BY`, rendered as written
pub fn order_by_properties(statement: &Statement) -> Vec<String> {
    let Some(order_by) = statement.as_query().and_then(|query| query.order_by.as_ref()) else {
        return Vec::new();
    };

    order_by
        .items
        .iter()
        .map(|item| QueryRenderer.render_expr(&item.expr).render())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::Dialect;
    use crate::syntax::parse;

    fn info(query: &str, dialect: Dialect) -> QueryInformation {
        introspect(&parse(query, dialect).unwrap())
    }

    #[test]
    fn test_alias_and_projection() {
        let info = info("select u.name, u.age as a from User u join u.roles r", Dialect::Jpql);
        assert_eq!(info.alias.as_deref(), Some("u"));
        assert_eq!(info.projection_text(), "u.name, u.age as a");
        assert!(!info.has_constructor_expression);
        assert_eq!(info.statement_type, StatementType::Select);
    }

    #[test]
    fn test_self_alias() {
        let info = info("select count(User) from User", Dialect::Jpql);
        assert_eq!(info.alias.as_deref(), Some("User"));
    }

    #[test]
    fn test_subquery_selections_are_ignored() {
        let info = info(
            "select u from User u where u.id in (select r.user.id from Role r)",
            Dialect::Jpql,
        );
        assert_eq!(info.projection_text(), "u");
        assert_eq!(info.alias.as_deref(), Some("u"));

        let info = self::info("select s.n from (select u.name as n from User u) s", Dialect::Hql);
        assert_eq!(info.alias.as_deref(), Some("s"));
        assert_eq!(info.projection_text(), "s.n");
    }

    #[test]
    fn test_missing_alias() {
        let info = info("select s from (select u from User u)", Dialect::Hql);
        assert_eq!(info.alias, None);

        let info = self::info("select 1", Dialect::Hql);
        assert_eq!(info.alias, None);
        assert_eq!(info.projection_text(), "1");
    }

    #[test]
    fn test_flags() {
        let info = info("select new com.example.Dto(u.name) from User u", Dialect::Jpql);
        assert!(info.has_constructor_expression);

        let info = self::info("with x as (select e from Event e) select y from x y", Dialect::Hql);
        assert!(info.has_cte);
        assert!(!info.has_from_function);

        let info = self::info("select e from generate_series(1, 3) e", Dialect::Hql);
        assert!(info.has_from_function);
        assert!(info.projection_text() == "e");
    }

    #[test]
    fn test_statement_types() {
        let update = info("update User u set u.active = false", Dialect::Jpql);
        assert_eq!(update.statement_type, StatementType::Update);
        assert_eq!(update.alias.as_deref(), Some("u"));
        assert!(update.projection.is_empty());

        let delete = info("delete from User", Dialect::Jpql);
        assert_eq!(delete.statement_type, StatementType::Delete);
        assert_eq!(delete.alias.as_deref(), Some("User"));

        let insert = info("insert into User (name) values ('a')", Dialect::Hql);
        assert_eq!(insert.statement_type.to_string(), "INSERT");
    }

    #[test]
    fn test_order_by_properties() {
        let statement = parse(
            "select u from User u order by u.lastname desc, lower(u.firstname)",
            Dialect::Jpql,
        )
        .unwrap();
        assert_eq!(order_by_properties(&statement), vec!["u.lastname", "lower(u.firstname)"]);

        let statement = parse("select u from User u", Dialect::Jpql).unwrap();
        assert!(order_by_properties(&statement).is_empty());
    }
}
