//! Constructor-expression projection for DTO return types

use super::TransformResult;
use crate::grammar::ast::*;
use crate::introspect::QueryInformation;
use crate::logging::codes;
use crate::render::{comma_list, keyword};
use crate::sort::Sort;
use crate::tokens::constants::*;
use crate::tokens::{QueryToken, TokenStream, TokenStreamBuilder};
use serde::{Deserialize, Serialize};

/// What the caller maps query results into
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ReturnedType {
    /// The queried entity itself
    #[default]
    Entity,
    /// Class instantiated through its constructor, in parameter order
    Dto {
        type_name: String,
        properties: Vec<String>,
    },
    /// Interface-based projection, mapped from the entity
    Interface,
}

impl ReturnedType {
    pub fn dto(type_name: impl Into<String>, properties: impl IntoIterator<Item = impl Into<String>>) -> Self {
        ReturnedType::Dto {
            type_name: type_name.into(),
            properties: properties.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_projecting(&self) -> bool {
        !matches!(self, ReturnedType::Entity)
    }
}

/// `new Type(alias.p1, ..)` replacing a select list that is just the primary alias
pub(crate) fn dto_selection(
    select: &SelectClause,
    info: &QueryInformation,
    returned: &ReturnedType,
) -> Option<TokenStream> {
    let ReturnedType::Dto {
        type_name,
        properties,
    } = returned
    else {
        return None;
    };
    let alias = info.alias.as_deref()?;

    if properties.is_empty() || info.has_constructor_expression {
        return None;
    }
    match select.items.as_slice() {
        [item] if item.expr == Expr::path(alias) => {}
        _ => return None,
    }

    let arguments = properties
        .iter()
        .map(|property| TokenStream::from(QueryToken::expression(format!("{}.{}", alias, property))));

    let mut constructor = TokenStreamBuilder::from_token(TOKEN_NEW);
    constructor.append_token(QueryToken::token(format!("{}(", type_name)));
    constructor.append_inline(comma_list(arguments));
    constructor.append_token(TOKEN_CLOSE_PAREN);

    let mut builder = TokenStreamBuilder::from_token(keyword(&select.keyword));
    if let Some(distinct) = &select.distinct {
        builder.append_token(keyword(distinct));
    }
    builder.append_expression(constructor.build());

    log_success!(codes::success::DTO_PROJECTION_APPLIED,
        "Selection rewritten to constructor expression",
        "type" => type_name,
        "properties" => properties.len()
    );

    Some(builder.build())
}

/// Render `statement` with its selection adapted to `returned`, unsorted
pub fn rewrite_dto_projection(
    statement: &Statement,
    info: &QueryInformation,
    returned: &ReturnedType,
) -> TransformResult<TokenStream> {
    super::sort::apply_sorting_with(statement, info, &Sort::unsorted(), returned)
}
