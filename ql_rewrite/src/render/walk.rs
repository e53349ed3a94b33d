//! Default rendering of statements, queries and clauses

use super::{keyword, name, Render, Scope};
use crate::grammar::ast::*;
use crate::tokens::constants::*;
use crate::tokens::{QueryToken, TokenStream, TokenStreamBuilder};

/// `(` inner `)`
pub fn parenthesized(inner: impl Into<TokenStream>) -> TokenStream {
    let mut builder = TokenStreamBuilder::from_token(TOKEN_OPEN_PAREN);
    builder.append_inline(inner);
    builder.append_token(TOKEN_CLOSE_PAREN);
    builder.build()
}

/// Items separated by `, `
pub fn comma_list(items: impl IntoIterator<Item = TokenStream>) -> TokenStream {
    TokenStreamBuilder::concat(items, TOKEN_COMMA).build()
}

/// Keyword followed by its body, e.g. `where <condition>`
pub fn clause(kw: &Kw, body: impl Into<TokenStream>) -> TokenStream {
    let mut builder = TokenStreamBuilder::from_token(keyword(kw));
    builder.append_expression(body);
    builder.build()
}

pub fn render_alias(alias: &Alias) -> TokenStream {
    let mut builder = TokenStreamBuilder::new();
    if let Some(as_keyword) = &alias.as_keyword {
        builder.append_token(keyword(as_keyword));
    }
    builder.append_token(name(&alias.name));
    builder.build()
}

fn append_alias(builder: &mut TokenStreamBuilder, alias: Option<&Alias>) {
    if let Some(alias) = alias {
        builder.append_expression(render_alias(alias));
    }
}

pub fn walk_statement<R: Render + ?Sized>(r: &R, statement: &Statement) -> TokenStream {
    match statement {
        Statement::Select(query) => r.render_query(query, Scope::TopLevel),
        Statement::Update(update) => walk_update(r, update),
        Statement::Delete(delete) => walk_delete(r, delete),
        Statement::Insert(insert) => walk_insert(r, insert),
    }
}

pub fn walk_query<R: Render + ?Sized>(r: &R, query: &Query, scope: Scope) -> TokenStream {
    let mut builder = TokenStreamBuilder::new();

    if let Some(with) = &query.with {
        builder.append_expression(walk_with_clause(r, with));
    }
    builder.append_expression(r.render_query_body(&query.body, scope));
    builder.append_expression(r.render_ordering(query, scope));

    builder.build()
}

pub fn walk_with_clause<R: Render + ?Sized>(r: &R, with: &WithClause) -> TokenStream {
    let ctes = with.ctes.iter().map(|cte| {
        let mut builder = TokenStreamBuilder::from_token(name(&cte.name));
        if !cte.columns.is_empty() {
            let columns = cte.columns.iter().map(|column| TokenStream::from(name(column)));
            builder.append_inline(parenthesized(comma_list(columns)));
        }
        builder.append_token(keyword(&cte.as_keyword));
        if let Some(materialized) = &cte.materialized {
            builder.append_token(keyword(materialized));
        }
        builder.append_expression(parenthesized(r.render_query(&cte.query, Scope::Subquery)));
        builder.build()
    });

    clause(&with.keyword, comma_list(ctes))
}

pub fn walk_query_body<R: Render + ?Sized>(r: &R, body: &QueryBody, scope: Scope) -> TokenStream {
    match body {
        QueryBody::Spec(spec) => r.render_query_spec(spec, scope),
        QueryBody::Nested(query) => parenthesized(r.render_query(query, scope)),
        QueryBody::SetOperation {
            left,
            operator,
            right,
        } => {
            let mut builder = TokenStreamBuilder::new();
            builder.append_expression(r.render_query_body(left, scope));
            builder.append_token(keyword(operator));
            builder.append_expression(r.render_query_body(right, scope));
            builder.build()
        }
    }
}

pub fn walk_query_spec<R: Render + ?Sized>(r: &R, spec: &QuerySpec, scope: Scope) -> TokenStream {
    let mut builder = TokenStreamBuilder::new();

    if let Some(select) = &spec.select {
        builder.append_expression(r.render_select_clause(select, scope));
    }
    if let Some(from) = &spec.from {
        builder.append_expression(r.render_from_clause(from, scope));
    }
    if let Some(where_clause) = &spec.where_clause {
        builder.append_expression(walk_where_clause(r, where_clause));
    }
    if let Some(group_by) = &spec.group_by {
        let items = group_by.items.iter().map(|item| r.render_expr(item));
        builder.append_expression(clause(&group_by.keyword, comma_list(items)));
    }
    if let Some(having) = &spec.having {
        builder.append_expression(clause(&having.keyword, r.render_expr(&having.condition)));
    }

    builder.build()
}

pub fn walk_select_clause<R: Render + ?Sized>(r: &R, select: &SelectClause, _scope: Scope) -> TokenStream {
    let mut builder = TokenStreamBuilder::from_token(keyword(&select.keyword));
    if let Some(distinct) = &select.distinct {
        builder.append_token(keyword(distinct));
    }
    builder.append_expression(walk_selection(r, &select.items));
    builder.build()
}

/// Select items as written, aliases included
pub fn walk_selection<R: Render + ?Sized>(r: &R, items: &[SelectItem]) -> TokenStream {
    let items = items.iter().map(|item| {
        let mut builder = TokenStreamBuilder::new();
        builder.append_expression(r.render_expr(&item.expr));
        append_alias(&mut builder, item.alias.as_ref());
        builder.build()
    });
    comma_list(items)
}

pub fn walk_from_clause<R: Render + ?Sized>(r: &R, from: &FromClause, scope: Scope) -> TokenStream {
    let items = from.items.iter().map(|item| {
        let mut builder = TokenStreamBuilder::new();
        builder.append_expression(r.render_from_root(&item.root, scope));
        for join in &item.joins {
            builder.append_expression(r.render_join(join, scope));
        }
        builder.build()
    });

    clause(&from.keyword, comma_list(items))
}

pub fn walk_from_root<R: Render + ?Sized>(r: &R, root: &FromRoot, _scope: Scope) -> TokenStream {
    let mut builder = TokenStreamBuilder::new();

    match root {
        FromRoot::Entity { name: entity, alias } => {
            builder.append_token(name(entity));
            append_alias(&mut builder, alias.as_ref());
        }
        FromRoot::Subquery {
            lateral,
            query,
            alias,
        } => {
            if let Some(lateral) = lateral {
                builder.append_token(keyword(lateral));
            }
            builder.append_expression(parenthesized(r.render_query(query, Scope::Subquery)));
            append_alias(&mut builder, alias.as_ref());
        }
        FromRoot::Function { call, alias } => {
            builder.append_expression(r.render_expr(call));
            append_alias(&mut builder, alias.as_ref());
        }
        FromRoot::CollectionMember {
            keyword: kw,
            path,
            alias,
        } => {
            let mut member = TokenStreamBuilder::from_token(QueryToken::token(format!("{}(", kw)));
            member.append_inline(r.render_expr(path));
            member.append_token(TOKEN_CLOSE_PAREN);
            builder.append(member.build());
            append_alias(&mut builder, alias.as_ref());
        }
    }

    builder.build()
}

pub fn walk_join<R: Render + ?Sized>(r: &R, join: &Join, _scope: Scope) -> TokenStream {
    walk_join_parts(r, join, true)
}

/// Join rendering with the `FETCH` keyword optionally left out
pub fn walk_join_parts<R: Render + ?Sized>(r: &R, join: &Join, include_fetch: bool) -> TokenStream {
    let mut builder = TokenStreamBuilder::from_token(keyword(&join.keyword));

    if let Some(fetch) = join.fetch.as_ref().filter(|_| include_fetch) {
        builder.append_token(keyword(fetch));
    }
    if let Some(lateral) = &join.lateral {
        builder.append_token(keyword(lateral));
    }

    let target = match &join.target {
        Expr::Subquery(query) => parenthesized(r.render_query(query, Scope::Subquery)),
        target => r.render_expr(target),
    };
    builder.append_expression(target);
    append_alias(&mut builder, join.alias.as_ref());

    if let Some(condition) = &join.condition {
        builder.append_expression(clause(&condition.keyword, r.render_expr(&condition.condition)));
    }

    builder.build()
}

pub fn walk_where_clause<R: Render + ?Sized>(r: &R, where_clause: &WhereClause) -> TokenStream {
    clause(&where_clause.keyword, r.render_expr(&where_clause.condition))
}

pub fn walk_ordering<R: Render + ?Sized>(r: &R, query: &Query, _scope: Scope) -> TokenStream {
    let mut builder = TokenStreamBuilder::new();
    if let Some(order_by) = &query.order_by {
        builder.append_expression(walk_order_by(r, order_by));
    }
    builder.append_expression(walk_result_limits(r, query));
    builder.build()
}

pub fn walk_order_by<R: Render + ?Sized>(r: &R, order_by: &OrderByClause) -> TokenStream {
    let items = order_by.items.iter().map(|item| walk_sort_item(r, item));
    clause(&order_by.keyword, comma_list(items))
}

pub fn walk_sort_item<R: Render + ?Sized>(r: &R, item: &SortItem) -> TokenStream {
    let mut builder = TokenStreamBuilder::new();
    builder.append_expression(r.render_expr(&item.expr));
    if let Some((collate_keyword, collation)) = &item.collation {
        builder.append_expression(clause(collate_keyword, r.render_expr(collation)));
    }
    if let Some(direction) = &item.direction {
        builder.append_token(keyword(direction));
    }
    if let Some(nulls) = &item.nulls {
        builder.append_token(keyword(nulls));
    }
    builder.build()
}

/// `LIMIT`, `OFFSET` and `FETCH`, in that order
pub fn walk_result_limits<R: Render + ?Sized>(r: &R, query: &Query) -> TokenStream {
    let mut builder = TokenStreamBuilder::new();

    if let Some(limit) = &query.limit {
        builder.append_expression(clause(&limit.keyword, r.render_expr(&limit.count)));
    }
    if let Some(offset) = &query.offset {
        let mut offset_builder = TokenStreamBuilder::from_token(keyword(&offset.keyword));
        offset_builder.append_expression(r.render_expr(&offset.count));
        if let Some(rows) = &offset.rows {
            offset_builder.append_token(keyword(rows));
        }
        builder.append_expression(offset_builder.build());
    }
    if let Some(fetch) = &query.fetch {
        let mut fetch_builder = TokenStreamBuilder::from_token(keyword(&fetch.keyword));
        if let Some(count) = &fetch.count {
            fetch_builder.append_expression(r.render_expr(count));
        }
        fetch_builder.append_token(keyword(&fetch.tail));
        builder.append_expression(fetch_builder.build());
    }

    builder.build()
}

fn walk_entity_target(builder: &mut TokenStreamBuilder, kw: &Kw, entity: &str, alias: Option<&Alias>) {
    builder.append_token(keyword(kw));
    builder.append_token(name(entity));
    append_alias(builder, alias);
}

pub fn walk_update<R: Render + ?Sized>(r: &R, update: &UpdateStatement) -> TokenStream {
    let mut builder = TokenStreamBuilder::new();
    walk_entity_target(&mut builder, &update.keyword, &update.entity, update.alias.as_ref());

    let assignments = update.assignments.iter().map(|assignment| {
        let mut assignment_builder = TokenStreamBuilder::new();
        assignment_builder.append_inline(r.render_expr(&assignment.target));
        assignment_builder.append_token(TOKEN_EQUALS);
        assignment_builder.append_inline(r.render_expr(&assignment.value));
        assignment_builder.build()
    });
    builder.append_expression(clause(&update.set_keyword, comma_list(assignments)));

    if let Some(where_clause) = &update.where_clause {
        builder.append_expression(walk_where_clause(r, where_clause));
    }
    builder.build()
}

pub fn walk_delete<R: Render + ?Sized>(r: &R, delete: &DeleteStatement) -> TokenStream {
    let mut builder = TokenStreamBuilder::new();
    walk_entity_target(&mut builder, &delete.keyword, &delete.entity, delete.alias.as_ref());

    if let Some(where_clause) = &delete.where_clause {
        builder.append_expression(walk_where_clause(r, where_clause));
    }
    builder.build()
}

pub fn walk_insert<R: Render + ?Sized>(r: &R, insert: &InsertStatement) -> TokenStream {
    let mut builder = TokenStreamBuilder::new();
    walk_entity_target(&mut builder, &insert.keyword, &insert.entity, None);

    let columns = insert.columns.iter().map(|column| r.render_expr(column));
    builder.append_expression(parenthesized(comma_list(columns)));

    match &insert.source {
        InsertSource::Query(query) => {
            builder.append_expression(r.render_query(query, Scope::Subquery));
        }
        InsertSource::Values { keyword: kw, rows } => {
            let rows = rows.iter().map(|row| {
                parenthesized(comma_list(row.iter().map(|value| r.render_expr(value))))
            });
            builder.append_expression(clause(kw, comma_list(rows)));
        }
    }
    builder.build()
}
