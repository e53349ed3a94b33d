//! Default rendering of expressions

use super::walk::{clause, comma_list, parenthesized, walk_order_by, walk_selection};
use super::{keyword, name, Render, Scope};
use crate::grammar::ast::*;
use crate::tokens::constants::*;
use crate::tokens::{QueryToken, TokenStream, TokenStreamBuilder};

pub fn walk_expr<R: Render + ?Sized>(r: &R, expr: &Expr) -> TokenStream {
    match expr {
        Expr::Path(text) | Expr::Literal(text) | Expr::Parameter(text) => name(text).into(),

        Expr::Unary { operator, operand } => {
            let mut builder = TokenStreamBuilder::from_token(QueryToken::token(operator.as_str()));
            builder.append_inline(r.render_expr(operand));
            builder.build()
        }

        Expr::Not { keyword: kw, operand } => clause(kw, r.render_expr(operand)),

        Expr::Binary {
            left,
            operator,
            right,
        } => {
            let mut builder = TokenStreamBuilder::new();
            builder.append_inline(r.render_expr(left));
            builder.append_token(QueryToken::ventilated(operator.as_str()));
            builder.append_inline(r.render_expr(right));
            builder.build()
        }

        Expr::Logical {
            left,
            keyword: kw,
            right,
        } => {
            let mut builder = TokenStreamBuilder::new();
            builder.append_expression(r.render_expr(left));
            builder.append_token(keyword(kw));
            builder.append_expression(r.render_expr(right));
            builder.build()
        }

        Expr::Between {
            expr,
            keyword: kw,
            low,
            and_keyword,
            high,
        } => {
            let mut builder = TokenStreamBuilder::new();
            builder.append_expression(r.render_expr(expr));
            builder.append_token(keyword(kw));
            builder.append_expression(r.render_expr(low));
            builder.append_token(keyword(and_keyword));
            builder.append_expression(r.render_expr(high));
            builder.build()
        }

        Expr::Like {
            expr,
            keyword: kw,
            pattern,
            escape,
        } => {
            let mut builder = TokenStreamBuilder::new();
            builder.append_expression(r.render_expr(expr));
            builder.append_token(keyword(kw));
            builder.append_expression(r.render_expr(pattern));
            if let Some((escape_keyword, escape)) = escape {
                builder.append_token(keyword(escape_keyword));
                builder.append_expression(r.render_expr(escape));
            }
            builder.build()
        }

        Expr::In {
            expr,
            keyword: kw,
            list,
        } => {
            let list = match list {
                InList::Values(values) => {
                    parenthesized(comma_list(values.iter().map(|value| r.render_expr(value))))
                }
                InList::Subquery(query) => parenthesized(r.render_query(query, Scope::Subquery)),
                InList::Parameter(parameter) => r.render_expr(parameter),
            };

            let mut builder = TokenStreamBuilder::new();
            builder.append_expression(r.render_expr(expr));
            builder.append_token(keyword(kw));
            builder.append_expression(list);
            builder.build()
        }

        Expr::Is { expr, predicate } => {
            let mut builder = TokenStreamBuilder::new();
            builder.append_expression(r.render_expr(expr));
            builder.append_token(keyword(predicate));
            builder.build()
        }

        Expr::DistinctFrom {
            expr,
            keyword: kw,
            other,
        } => {
            let mut builder = TokenStreamBuilder::new();
            builder.append_expression(r.render_expr(expr));
            builder.append_token(keyword(kw));
            builder.append_expression(r.render_expr(other));
            builder.build()
        }

        Expr::MemberOf {
            expr,
            keyword: kw,
            collection,
        } => {
            let mut builder = TokenStreamBuilder::new();
            builder.append_expression(r.render_expr(expr));
            builder.append_token(keyword(kw));
            builder.append_expression(r.render_expr(collection));
            builder.build()
        }

        Expr::Exists { keyword: kw, query } | Expr::Quantified { keyword: kw, query } => {
            clause(kw, parenthesized(r.render_query(query, Scope::Subquery)))
        }

        Expr::Subquery(query) => parenthesized(r.render_query(query, Scope::Subquery)),

        Expr::Tuple(items) => parenthesized(comma_list(items.iter().map(|item| r.render_expr(item)))),

        Expr::Parenthesized(inner) => parenthesized(r.render_expr(inner)),

        Expr::Case(case) => walk_case(r, case),

        Expr::Function(call) => walk_function(r, call),

        Expr::Constructor {
            keyword: kw,
            type_name,
            args,
        } => {
            let mut builder = TokenStreamBuilder::from_token(keyword(kw));
            builder.append_token(QueryToken::token(format!("{}(", type_name)));
            builder.append_inline(walk_selection(r, args));
            builder.append_token(TOKEN_CLOSE_PAREN);
            builder.build()
        }

        Expr::Duration { amount, unit } => {
            let mut builder = TokenStreamBuilder::new();
            builder.append_expression(r.render_expr(amount));
            builder.append_token(name(unit));
            builder.build()
        }

        Expr::Dereference { base, path } => {
            let mut builder = TokenStreamBuilder::new();
            builder.append_inline(r.render_expr(base));
            builder.append_token(TOKEN_DOT);
            builder.append_token(QueryToken::token(path.clone()));
            builder.build()
        }

        Expr::JdbcEscape { kind, literal } => {
            let mut builder = TokenStreamBuilder::from_token(TOKEN_OPEN_BRACE);
            builder.append_token(name(kind));
            builder.append_token(QueryToken::token(literal.clone()));
            builder.append_token(TOKEN_CLOSE_BRACE);
            builder.build()
        }
    }
}

fn walk_case<R: Render + ?Sized>(r: &R, case: &CaseExpr) -> TokenStream {
    let mut builder = TokenStreamBuilder::from_token(keyword(&case.keyword));

    if let Some(operand) = &case.operand {
        builder.append_expression(r.render_expr(operand));
    }
    for when in &case.whens {
        builder.append_expression(clause(&when.when_keyword, r.render_expr(&when.condition)));
        builder.append_expression(clause(&when.then_keyword, r.render_expr(&when.result)));
    }
    if let Some((else_keyword, result)) = &case.else_clause {
        builder.append_expression(clause(else_keyword, r.render_expr(result)));
    }
    builder.append_token(keyword(&case.end_keyword));

    builder.build()
}

fn walk_function<R: Render + ?Sized>(r: &R, call: &FunctionCall) -> TokenStream {
    let args = match &call.args {
        FunctionArgs::Empty => TokenStream::empty(),
        FunctionArgs::Star => TOKEN_STAR.into(),
        FunctionArgs::List { distinct, args } => {
            let mut builder = TokenStreamBuilder::new();
            if let Some(distinct) = distinct {
                builder.append_token(keyword(distinct));
            }
            builder.append_expression(comma_list(args.iter().map(|arg| r.render_expr(arg))));
            builder.build()
        }
        FunctionArgs::Keyworded(parts) => {
            let mut builder = TokenStreamBuilder::new();
            for part in parts {
                match part {
                    ArgPart::Keyword(kw) => builder.append_token(keyword(kw)),
                    ArgPart::Expr(expr) => builder.append_expression(r.render_expr(expr)),
                };
            }
            builder.build()
        }
    };

    let mut builder = TokenStreamBuilder::from_token(QueryToken::token(format!("{}(", call.name)));
    builder.append_inline(args);
    builder.append_token(TOKEN_CLOSE_PAREN);

    if let Some((within_keyword, order_by)) = &call.within_group {
        builder.append_expression(clause(within_keyword, parenthesized(walk_order_by(r, order_by))));
    }

    if let Some(filter) = &call.filter {
        let condition = clause(&filter.where_keyword, r.render_expr(&filter.condition));
        builder.append_expression(clause(&filter.keyword, parenthesized(condition)));
    }

    if let Some(over) = &call.over {
        let mut window = TokenStreamBuilder::new();
        if let Some((partition_keyword, partitions)) = &over.partition_by {
            let partitions = partitions.iter().map(|partition| r.render_expr(partition));
            window.append_expression(clause(partition_keyword, comma_list(partitions)));
        }
        if let Some(order_by) = &over.order_by {
            window.append_expression(walk_order_by(r, order_by));
        }
        builder.append_expression(clause(&over.keyword, parenthesized(window.build())));
    }

    builder.build()
}
