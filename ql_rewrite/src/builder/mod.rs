//! Programmatic construction of JPQL `SELECT` statements
//!
//! ```ignore
//! let person = entity("com.example.Person");
//! let address = inner_join(&person, "address");
//! let query = select_from(person.clone())
//!     .entity()
//!     .where_(where_(path(&address, "city")).eq(named_parameter("city")))
//!     .order_by(order_by(path(&person, "name"), &Order::asc("name")));
//! assert_eq!(
//!     query.render(),
//!     "SELECT p FROM com.example.Person p INNER JOIN p.address a WHERE a.city = :city ORDER BY p.name ASC"
//! );
//! ```
//!
//! Aliases are assigned while rendering. Joins referenced only by paths are
//! discovered during rendering and emitted with their parents first.

pub mod expression;
pub mod origin;

pub use expression::{
    and_all, expression, function, indexed_parameter, literal, named_parameter, nested, or_all, order_by, parameter,
    path, string_literal, where_, Expression, Predicate, WhereStep,
};
pub use origin::{Entity, Join, JoinType, Origin, RenderContext};

use std::fmt;

/// Entity by fully qualified name
pub fn entity(name: impl Into<String>) -> Entity {
    Entity::new(name)
}

pub fn inner_join(source: impl Into<Origin>, path: impl Into<String>) -> Join {
    Join::new(source, JoinType::Inner, path)
}

pub fn left_join(source: impl Into<Origin>, path: impl Into<String>) -> Join {
    Join::new(source, JoinType::Left, path)
}

/// Start a `SELECT` from `entity`
pub fn select_from(entity: Entity) -> SelectStep {
    SelectStep {
        entity,
        distinct: false,
    }
}

/// Selection choice for a query under construction
#[derive(Debug, Clone)]
pub struct SelectStep {
    entity: Entity,
    distinct: bool,
}

impl SelectStep {
    pub fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }

    /// Select the entity itself
    pub fn entity(self) -> Select {
        let selection = Selection::Entity(Origin::from(&self.entity));
        self.finish(selection)
    }

    /// `COUNT([DISTINCT] alias)`
    pub fn count(self) -> Select {
        let selection = Selection::Count {
            origin: Origin::from(&self.entity),
            distinct: self.distinct,
        };
        Select::new(self.entity, selection)
    }

    /// `new type_name(paths..)`
    pub fn instantiate(self, type_name: impl Into<String>, paths: impl IntoIterator<Item = Expression>) -> Select {
        let type_name = type_name.into();
        assert!(!type_name.trim().is_empty(), "Result type must not be empty");
        let selection = Selection::Constructor {
            type_name,
            paths: paths.into_iter().collect(),
        };
        self.finish(selection)
    }

    /// Select individual property paths, each aliased by its last segment
    pub fn select(self, paths: impl IntoIterator<Item = Expression>) -> Select {
        let selection = Selection::Multiselect(paths.into_iter().collect());
        self.finish(selection)
    }

    fn finish(self, selection: Selection) -> Select {
        let selection = if self.distinct {
            Selection::Distinct(Box::new(selection))
        } else {
            selection
        };
        Select::new(self.entity, selection)
    }
}

#[derive(Debug, Clone)]
enum Selection {
    Entity(Origin),
    Count { origin: Origin, distinct: bool },
    Constructor { type_name: String, paths: Vec<Expression> },
    Multiselect(Vec<Expression>),
    Distinct(Box<Selection>),
}

impl Selection {
    fn render(&self, context: &mut RenderContext) -> String {
        match self {
            Selection::Entity(origin) => context.alias(origin),
            Selection::Count { origin, distinct } => {
                let distinct = if *distinct { "DISTINCT " } else { "" };
                format!("COUNT({}{})", distinct, context.alias(origin))
            }
            Selection::Constructor { type_name, paths } => {
                let outer = context.is_constructor_context();
                context.set_constructor_context(true);
                let arguments = render_paths(paths, context);
                context.set_constructor_context(outer);
                format!("new {}({})", type_name, arguments)
            }
            Selection::Multiselect(paths) => render_paths(paths, context),
            Selection::Distinct(selection) => format!("DISTINCT {}", selection.render(context)),
        }
    }
}

fn render_paths(paths: &[Expression], context: &mut RenderContext) -> String {
    paths
        .iter()
        .map(|path| {
            let rendered = path.render(context);
            match path.segment().filter(|_| !context.is_constructor_context()) {
                Some(segment) => format!("{} {}", rendered, segment),
                None => rendered,
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Add `join` after its source chain unless an identical join is present
fn add_join(joins: &mut Vec<Join>, join: &Join) {
    if let Origin::Join(parent) = join.source() {
        add_join(joins, parent);
    }
    let key = join.key();
    if !joins.iter().any(|known| known.key() == key) {
        joins.push(join.clone());
    }
}

/// A `SELECT` statement under construction
#[derive(Debug, Clone)]
pub struct Select {
    entity: Entity,
    selection: Selection,
    joins: Vec<Join>,
    predicate: Option<Predicate>,
    order_by: Vec<Expression>,
}

impl Select {
    fn new(entity: Entity, selection: Selection) -> Self {
        Self {
            entity,
            selection,
            joins: Vec::new(),
            predicate: None,
            order_by: Vec::new(),
        }
    }

    /// Declare `join` explicitly, with any parent joins it hangs off
    pub fn join(mut self, join: Join) -> Self {
        add_join(&mut self.joins, &join);
        self
    }

    /// Set the `WHERE` predicate, replacing any earlier one
    pub fn where_(mut self, predicate: Predicate) -> Self {
        self.predicate = Some(predicate);
        self
    }

    pub fn order_by(mut self, expression: Expression) -> Self {
        self.order_by.push(expression);
        self
    }

    pub fn render(&self) -> String {
        let mut context = RenderContext::for_root(&self.entity);

        let selection = self.selection.render(&mut context);
        let mut rendered = format!(
            "SELECT {} FROM {} {}",
            selection,
            self.entity.name(),
            context.alias(&Origin::from(&self.entity))
        );

        let predicate = self
            .predicate
            .as_ref()
            .map(|predicate| format!(" WHERE {}", predicate.render(&mut context)))
            .unwrap_or_default();

        let order_by = if self.order_by.is_empty() {
            String::new()
        } else {
            let orders: Vec<String> = self.order_by.iter().map(|order| order.render(&mut context)).collect();
            format!(" ORDER BY {}", orders.join(", "))
        };

        let mut joins = self.joins.clone();
        for discovered in context.joins() {
            add_join(&mut joins, &discovered);
        }
        for join in &joins {
            let source = context.alias(join.source());
            let alias = context.alias(&Origin::from(join));
            rendered.push_str(&format!(" {} {}.{} {}", join.join_type(), source, join.path(), alias));
        }

        rendered.push_str(&predicate);
        rendered.push_str(&order_by);
        rendered
    }
}

impl fmt::Display for Select {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::Dialect;
    use crate::sort::Order;
    use crate::syntax::parse;

    fn person() -> Entity {
        entity("com.example.Person")
    }

    #[test]
    fn test_count() {
        assert_eq!(select_from(person()).count().render(), "SELECT COUNT(p) FROM com.example.Person p");
        assert_eq!(
            select_from(person()).distinct().count().render(),
            "SELECT COUNT(DISTINCT p) FROM com.example.Person p"
        );
    }

    #[test]
    fn test_entity_selection_with_where_and_order() {
        let query = select_from(person())
            .entity()
            .where_(
                where_(path(person(), "lastname"))
                    .eq(named_parameter("lastname"))
                    .and(where_(path(person(), "age")).gt(indexed_parameter(2))),
            )
            .order_by(order_by(path(person(), "firstname"), &Order::asc("firstname")));

        assert_eq!(
            query.to_string(),
            "SELECT p FROM com.example.Person p WHERE p.lastname = :lastname AND p.age > ?2 ORDER BY p.firstname ASC"
        );
    }

    #[test]
    fn test_distinct_multiselect() {
        let query = select_from(person())
            .distinct()
            .select([path(person(), "firstname"), path(person(), "address.city")]);
        assert_eq!(
            query.render(),
            "SELECT DISTINCT p.firstname firstname, p.address.city city FROM com.example.Person p"
        );
    }

    #[test]
    fn test_constructor_expression() {
        let query = select_from(person()).instantiate(
            "com.example.PersonDto",
            [path(person(), "firstname"), path(person(), "lastname")],
        );
        assert_eq!(
            query.render(),
            "SELECT new com.example.PersonDto(p.firstname, p.lastname) FROM com.example.Person p"
        );
    }

    #[test]
    fn test_discovered_joins_render_parent_first() {
        let person = person();
        let address = inner_join(&person, "address");
        let country = left_join(&address, "country");

        let query = select_from(person.clone())
            .entity()
            .where_(where_(path(&country, "code")).eq(string_literal("NZ")));

        assert_eq!(
            query.render(),
            "SELECT p FROM com.example.Person p INNER JOIN p.address a LEFT JOIN a.country c WHERE c.code = 'NZ'"
        );
    }

    #[test]
    fn test_explicit_joins_are_emitted_once() {
        let person = person();
        let roles = inner_join(&person, "roles");
        let query = select_from(person.clone())
            .entity()
            .join(roles.clone())
            .join(roles.clone())
            .where_(where_(path(&roles, "name")).eq(named_parameter("role")));

        assert_eq!(
            query.render(),
            "SELECT p FROM com.example.Person p INNER JOIN p.roles r WHERE r.name = :role"
        );
    }

    #[test]
    fn test_colliding_join_alias() {
        let person = person();
        let pets = left_join(&person, "pets");
        let query = select_from(person.clone())
            .entity()
            .where_(where_(path(&pets, "name")).is_not_null());
        assert_eq!(
            query.render(),
            "SELECT p FROM com.example.Person p LEFT JOIN p.pets join_0 WHERE join_0.name IS NOT NULL"
        );
    }

    #[test]
    fn test_rendered_queries_parse() {
        let person = person();
        let address = inner_join(&person, "address");
        let query = select_from(person.clone())
            .distinct()
            .entity()
            .where_(
                where_(path(&address, "city"))
                    .in_(named_parameter("cities"))
                    .or(where_(path(&person, "age")).between(literal(18), literal(30)))
                    .nest(),
            )
            .order_by(order_by(path(&person, "name"), &Order::desc("name").nulls_first()));

        assert!(parse(&query.render(), Dialect::Jpql).is_ok());
        assert!(parse(&select_from(person).count().render(), Dialect::Jpql).is_ok());
    }
}
