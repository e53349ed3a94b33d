//! Statement trees back to token streams
//!
//! [`Render`] has one method per node kind. The default methods delegate to
//! the `walk_*` functions, which reproduce the parsed query. Rewriters
//! implement the trait, override the handful of nodes they change and call
//! the matching `walk_*` function for everything else.

mod expr;
mod walk;

pub use expr::walk_expr;
pub use walk::*;

use crate::grammar::ast::*;
use crate::tokens::{QueryToken, TokenStream};

/// Where a query sits relative to the statement being rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// The statement's own query, including every branch of a set operation
    TopLevel,
    /// Expression subqueries, FROM subqueries and common table expressions
    Subquery,
}

impl Scope {
    pub fn is_top_level(self) -> bool {
        self == Scope::TopLevel
    }
}

pub trait Render {
    fn render_statement(&self, statement: &Statement) -> TokenStream {
        walk_statement(self, statement)
    }

    fn render_query(&self, query: &Query, scope: Scope) -> TokenStream {
        walk_query(self, query, scope)
    }

    fn render_query_body(&self, body: &QueryBody, scope: Scope) -> TokenStream {
        walk_query_body(self, body, scope)
    }

    fn render_query_spec(&self, spec: &QuerySpec, scope: Scope) -> TokenStream {
        walk_query_spec(self, spec, scope)
    }

    fn render_select_clause(&self, select: &SelectClause, scope: Scope) -> TokenStream {
        walk_select_clause(self, select, scope)
    }

    fn render_from_clause(&self, from: &FromClause, scope: Scope) -> TokenStream {
        walk_from_clause(self, from, scope)
    }

    fn render_from_root(&self, root: &FromRoot, scope: Scope) -> TokenStream {
        walk_from_root(self, root, scope)
    }

    fn render_join(&self, join: &Join, scope: Scope) -> TokenStream {
        walk_join(self, join, scope)
    }

    /// `ORDER BY` plus any result limits that follow it
    fn render_ordering(&self, query: &Query, scope: Scope) -> TokenStream {
        walk_ordering(self, query, scope)
    }

    fn render_expr(&self, expr: &Expr) -> TokenStream {
        walk_expr(self, expr)
    }
}

/// Plain round-trip renderer
#[derive(Debug, Clone, Copy, Default)]
pub struct QueryRenderer;

impl Render for QueryRenderer {}

/// Render a statement as written, modulo whitespace
pub fn render(statement: &Statement) -> TokenStream {
    QueryRenderer.render_statement(statement)
}

pub fn render_to_string(statement: &Statement) -> String {
    render(statement).render()
}

pub(crate) fn keyword(kw: &Kw) -> QueryToken {
    QueryToken::expression(kw.as_str().to_string())
}

pub(crate) fn name(text: &str) -> QueryToken {
    QueryToken::expression(text.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::Dialect;
    use crate::syntax::parse;

    fn round_trip(query: &str, dialect: Dialect) -> String {
        let statement = parse(query, dialect).unwrap();
        render_to_string(&statement)
    }

    fn assert_round_trip(query: &str, dialect: Dialect) {
        assert_eq!(round_trip(query, dialect), query);
    }

    #[test]
    fn test_simple_round_trips() {
        for query in [
            "select u from User u where u.age > ?1 order by u.name",
            "SELECT DISTINCT u.name, u.age AS years FROM User AS u WHERE u.active = true",
            "select u from User u left outer join fetch u.roles r where r.name in (:names)",
            "select count(u) from User u group by u.department having count(u) > 10",
            "select u from User u where u.name like :name escape '!' and u.age between 18 and 65",
            "select u from User u where u.manager is not null and :role member of u.roles",
            "select u from User u where not exists (select a from Audit a where a.user = u)",
            "select new com.example.UserDto(u.name, u.age) from User u",
            "select u from User u order by u.lastname desc nulls last, u.firstname asc",
            "select o from Order o, in(o.items) i where o.placed > {d '2024-01-01'}",
        ] {
            assert_round_trip(query, Dialect::Jpql);
        }
    }

    #[test]
    fn test_expression_round_trips() {
        for query in [
            "select -u.balance * 2 + 1 from User u",
            "select u.first || ' ' || u.last from User u",
            "select case when u.age >= 18 then 'adult' else 'minor' end from User u",
            "select case u.kind when 1 then 'a' end from User u",
            "select cast(u.age as string), extract(year from u.born) from User u",
            "select trim(both ' ' from u.name), count(distinct u.name), count(*) from User u",
            "select u from User u where (u.a = 1 or u.b = 2) and u.c = 3",
            "select u from User u where (u.a, u.b) in ((1, 2), (3, 4))",
            "select u from User u where treat(u as Admin).level > all (select a.level from Admin a)",
            "update User u set u.active = false, u.score = u.score + 1 where u.id = :id",
            "delete from User u where u.active = false",
        ] {
            assert_round_trip(query, Dialect::Jpql);
        }
    }

    #[test]
    fn test_hql_round_trips() {
        for query in [
            "from User u where u.age > 18",
            "with recent as (select e from Event e) select r from recent r",
            "select u from User u union all select a from Admin a",
            "select u from User u order by u.name limit 10 offset 5",
            "select u from User u fetch first 5 rows only",
            "select e from generate_series(1, 10) e",
            "select s.n from (select u.name as n from User u) s",
            "select rank() over (partition by u.dept order by u.salary desc) from User u",
            "select count(u) filter (where u.active = true) from User u",
            "insert into User (name, age) values ('a', 1), ('b', 2)",
            "select u from User u join u.roles r with r.active = true",
            "select local date, current date, offset datetime from User u",
            "select u from User u where u.a is not distinct from u.b",
            "select new map(u.name as n, u.age) from User u",
            "select position('a' in u.name), format(u.born as 'yyyy') from User u",
            "select u from User u order by u.name collate \"C\" asc",
            "select collate(u.name as \"C\") from User u",
            "select u from User u where u.born between :start - 1 day and :end",
            "select u.born + (:n) day from User u",
        ] {
            assert_round_trip(query, Dialect::Hql);
        }
    }

    #[test]
    fn test_whitespace_is_normalized() {
        let rendered = round_trip("select   u\n  from User u\n where u.age>?1", Dialect::Jpql);
        assert_eq!(rendered, "select u from User u where u.age > ?1");
    }

    #[test]
    fn test_rendering_is_idempotent() {
        let statement = parse("select u from User u where u.name = 'x'", Dialect::Jpql).unwrap();
        let stream = render(&statement);
        assert_eq!(stream.render(), stream.render());

        let reparsed = parse(&stream.render(), Dialect::Jpql).unwrap();
        assert_eq!(reparsed, statement);
    }
}
