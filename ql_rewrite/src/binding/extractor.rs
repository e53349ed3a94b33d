//! Lifting `?#{..}` and `:#{..}` expression placeholders out of query text

use super::{BindingError, BindingResult, SYNTHETIC_PARAMETER_PREFIX};
use crate::config::compile_time::binding::MAX_EXPRESSION_LENGTH;
use std::collections::HashMap;
use std::ops::Range;

/// How synthetic parameters replacing expressions are written
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum SyntheticStyle {
    /// `?N`, numbered after this index
    Indexed { after: usize },
    /// `:__$synthetic$__N`
    Named,
}

/// Query text with expression placeholders replaced
#[derive(Debug, Default)]
pub(super) struct ExtractedQuery {
    pub query: String,
    /// Index digits or parameter name of each synthetic parameter, mapped to its expression
    pub expressions: HashMap<String, String>,
}

/// Byte ranges of quoted literals, quotes included
pub(super) fn quoted_ranges(query: &str) -> Vec<Range<usize>> {
    let mut ranges = Vec::new();
    let mut open: Option<(char, usize)> = None;

    for (offset, c) in query.char_indices() {
        match open {
            Some((quote, start)) if c == quote => {
                ranges.push(start..offset + c.len_utf8());
                open = None;
            }
            Some(_) => {}
            None if c == '\'' || c == '"' => open = Some((c, offset)),
            None => {}
        }
    }
    if let Some((_, start)) = open {
        ranges.push(start..query.len());
    }
    ranges
}

pub(super) fn is_quoted(ranges: &[Range<usize>], offset: usize) -> bool {
    ranges.iter().any(|range| range.contains(&offset))
}

/// Replace each expression placeholder outside quoted literals with a synthetic parameter
pub(super) fn extract_expressions(query: &str, style: SyntheticStyle) -> BindingResult<ExtractedQuery> {
    let chars: Vec<(usize, char)> = query.char_indices().collect();
    let mut extracted = ExtractedQuery {
        query: String::with_capacity(query.len()),
        expressions: HashMap::new(),
    };
    let mut quote: Option<char> = None;
    let mut position = 0;

    while position < chars.len() {
        let (offset, c) = chars[position];

        if let Some(open) = quote {
            if c == open {
                quote = None;
            }
            extracted.query.push(c);
            position += 1;
            continue;
        }

        if c == '\'' || c == '"' {
            quote = Some(c);
            extracted.query.push(c);
            position += 1;
            continue;
        }

        let opens_expression = (c == '?' || c == ':')
            && matches!(chars.get(position + 1), Some((_, '#')))
            && matches!(chars.get(position + 2), Some((_, '{')));
        if !opens_expression {
            extracted.query.push(c);
            position += 1;
            continue;
        }

        let body_start = position + 3;
        let close = closing_brace(&chars[body_start..])
            .map(|relative| body_start + relative)
            .ok_or(BindingError::UnterminatedExpression { offset })?;

        let body_end = chars[close].0;
        let body_begin = chars.get(body_start).map_or(body_end, |(offset, _)| *offset);
        let expression = query[body_begin..body_end].trim();
        let length = expression.chars().count();
        if length > MAX_EXPRESSION_LENGTH {
            return Err(BindingError::ExpressionTooLong {
                length,
                max: MAX_EXPRESSION_LENGTH,
            });
        }

        let ordinal = extracted.expressions.len() + 1;
        let key = match style {
            SyntheticStyle::Indexed { after } => {
                let key = (after + ordinal).to_string();
                extracted.query.push('?');
                key
            }
            SyntheticStyle::Named => {
                let key = format!("{}{}", SYNTHETIC_PARAMETER_PREFIX, ordinal);
                extracted.query.push(':');
                key
            }
        };
        extracted.query.push_str(&key);
        extracted.expressions.insert(key, expression.to_string());

        position = close + 1;
    }

    Ok(extracted)
}

/// Position of the `}` closing an expression body, honoring nested braces and quotes
fn closing_brace(body: &[(usize, char)]) -> Option<usize> {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;

    for (position, (_, c)) in body.iter().enumerate() {
        match (quote, *c) {
            (Some(open), c) if c == open => quote = None,
            (Some(_), _) => {}
            (None, '\'') | (None, '"') => quote = Some(*c),
            (None, '{') => depth += 1,
            (None, '}') if depth == 0 => return Some(position),
            (None, '}') => depth -= 1,
            (None, _) => {}
        }
    }
    None
}
