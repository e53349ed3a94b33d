//! Marker scan producing the binding list

use super::extractor::{extract_expressions, is_quoted, quoted_ranges, SyntheticStyle};
use super::{
    BindingError, BindingIdentifier, BindingKind, BindingResult, LikeType, ParameterBinding, ParameterOrigin,
    ParsedBindings,
};
use crate::config::compile_time::binding::MAX_BINDINGS;
use crate::logging::codes;
use regex::{Captures, Regex};
use std::collections::HashMap;
use std::ops::Range;
use std::sync::LazyLock;

/// Numbered positional markers
static INDEXED_PARAMETER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\?(\d+)").unwrap());

/// Optional decoration keyword, optional parenthesis, then the marker with optional `%` around it
static PARAMETER_BINDING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:\b(like|in)\s*)?(?:\(\s*)?(%?)(\?(\d*)|:([\p{L}_$][\p{L}\p{N}_$]*))(%?)").unwrap()
});

const KEYWORD: usize = 1;
const LEADING_WILDCARD: usize = 2;
const MARKER: usize = 3;
const INDEX: usize = 4;
const NAME: usize = 5;
const TRAILING_WILDCARD: usize = 6;

/// One marker occurrence found by the scan
struct Marker<'q> {
    /// Index digits, empty for a bare `?`
    index: Option<&'q str>,
    name: Option<&'q str>,
    keyword: Option<String>,
    leading_wildcard: bool,
    trailing_wildcard: bool,
    /// Wildcards and marker
    span: Range<usize>,
    marker: &'q str,
}

impl<'q> Marker<'q> {
    fn from_captures(captures: &Captures<'q>) -> Option<Self> {
        let marker = captures.get(MARKER)?;
        let leading = captures.get(LEADING_WILDCARD)?;
        let trailing = captures.get(TRAILING_WILDCARD)?;
        Some(Self {
            index: captures.get(INDEX).map(|m| m.as_str()),
            name: captures.get(NAME).map(|m| m.as_str()),
            keyword: captures.get(KEYWORD).map(|m| m.as_str().to_ascii_lowercase()),
            leading_wildcard: !leading.as_str().is_empty(),
            trailing_wildcard: !trailing.as_str().is_empty(),
            span: leading.start()..trailing.end(),
            marker: marker.as_str(),
        })
    }

    fn is_bare(&self) -> bool {
        self.index == Some("")
    }

    fn kind(&self) -> BindingKind {
        match self.keyword.as_deref() {
            Some("like") => BindingKind::Like(LikeType::from_decoration(self.leading_wildcard, self.trailing_wildcard)),
            Some("in") => BindingKind::In,
            _ => BindingKind::Plain,
        }
    }
}

/// Whether the text around a match rules it out as a parameter
fn is_false_positive(query: &str, marker_start: usize, marker_end: usize, named: bool) -> bool {
    if named {
        // `::` casts and `a:b` style tokens
        let before = query[..marker_start].chars().next_back();
        return matches!(before, Some(c) if c == ':' || c.is_alphanumeric() || c == '_');
    }
    let after = query[marker_end..].chars().next();
    matches!(after, Some(c) if c.is_alphabetic() || c == '_' || c == '#')
}

/// Bindings collected so far, with `LIKE` aliases per parameter name
#[derive(Default)]
struct BindingRegistry {
    bindings: Vec<ParameterBinding>,
    like_names: HashMap<String, Vec<(LikeType, String)>>,
}

impl BindingRegistry {
    fn register(&mut self, binding: ParameterBinding) -> BindingResult<()> {
        if binding.origin.is_method_argument() {
            let conflict = self
                .bindings
                .iter()
                .filter(|existing| existing.origin.is_method_argument() && existing.binds_to(&binding))
                .find(|existing| existing.kind != binding.kind);
            if let Some(existing) = conflict {
                return Err(BindingError::IdentityConflict {
                    identifier: binding.identifier.to_string(),
                    existing: existing.kind.to_string(),
                    found: binding.kind.to_string(),
                });
            }
            if self.bindings.contains(&binding) {
                return Ok(());
            }
        }

        if self.bindings.len() >= MAX_BINDINGS {
            return Err(BindingError::TooManyBindings { max: MAX_BINDINGS });
        }
        self.bindings.push(binding);
        Ok(())
    }

    /// Name a named `LIKE` binding is bound under
    ///
    /// A method argument used again with the same wildcard placement reuses
    /// its earlier binding; any other repeat gets a fresh `name_N`.
    fn like_name(&mut self, name: &str, like_type: LikeType, origin: &ParameterOrigin) -> (String, bool) {
        let known = self.like_names.entry(name.to_string()).or_default();

        if origin.is_method_argument() {
            if let Some((_, reused)) = known.iter().find(|(known_type, _)| *known_type == like_type) {
                return (reused.clone(), true);
            }
        }

        let effective = if known.is_empty() {
            name.to_string()
        } else {
            format!("{}_{}", name, known.len())
        };
        known.push((like_type, effective.clone()));
        (effective, false)
    }
}

/// Extract the parameter bindings of `query`
///
/// The returned query has expression placeholders replaced by synthetic
/// parameters and `LIKE` wildcards stripped from parameter markers.
pub fn parse_parameter_bindings(query: &str) -> BindingResult<ParsedBindings> {
    parse(query).inspect_err(|error| {
        log_error!(error.error_code(), "Parameter binding extraction failed",
            "error" => error
        );
    })
}

fn parse(query: &str) -> BindingResult<ParsedBindings> {
    let original_quotes = quoted_ranges(query);
    let greatest_index = INDEXED_PARAMETER
        .captures_iter(query)
        .filter(|captures| captures.get(0).is_some_and(|m| !is_quoted(&original_quotes, m.start())))
        .filter_map(|captures| captures.get(1)?.as_str().parse::<usize>().ok())
        .max();

    let style = match greatest_index {
        Some(after) => SyntheticStyle::Indexed { after },
        None if query.contains("?#{") => SyntheticStyle::Indexed { after: 0 },
        None => SyntheticStyle::Named,
    };
    let extracted = extract_expressions(query, style)?;
    let text = extracted.query.as_str();
    let quotes = quoted_ranges(text);

    let mut registry = BindingRegistry::default();
    let mut cleaned = String::with_capacity(text.len());
    let mut copied = 0;
    let mut bare_markers = 0usize;
    let mut styled_markers = false;

    for captures in PARAMETER_BINDING.captures_iter(text) {
        let Some(marker) = Marker::from_captures(&captures) else {
            continue;
        };
        let Some(marker_match) = captures.get(MARKER) else {
            continue;
        };
        if is_quoted(&quotes, marker_match.start())
            || is_false_positive(text, marker_match.start(), marker_match.end(), marker.name.is_some())
        {
            continue;
        }

        let identifier = match (marker.index, marker.name) {
            (Some(""), _) => {
                bare_markers += 1;
                BindingIdentifier::indexed(bare_markers)
            }
            (Some(digits), _) => {
                styled_markers = true;
                match digits.parse::<usize>() {
                    Ok(index) => BindingIdentifier::indexed(index),
                    Err(_) => continue,
                }
            }
            (None, Some(name)) => {
                styled_markers = true;
                BindingIdentifier::named(name)
            }
            (None, None) => continue,
        };

        if bare_markers > 0 && styled_markers {
            return Err(BindingError::MixedStyles);
        }

        let expression = marker
            .index
            .filter(|_| !marker.is_bare())
            .or(marker.name)
            .and_then(|key| extracted.expressions.get(key));
        let origin = match expression {
            Some(expression) => ParameterOrigin::Expression(expression.clone()),
            None => ParameterOrigin::MethodArgument(identifier.clone()),
        };

        let kind = marker.kind();
        let replacement = match (kind, marker.name) {
            (BindingKind::Like(like_type), Some(name)) => {
                let (effective, reused) = registry.like_name(name, like_type, &origin);
                if !reused {
                    registry.register(ParameterBinding::new(BindingIdentifier::named(&effective), origin, kind))?;
                }
                Some(format!(":{}", effective))
            }
            (BindingKind::Like(_), None) => {
                registry.register(ParameterBinding::new(identifier, origin, kind))?;
                Some(marker.marker.to_string())
            }
            _ => {
                registry.register(ParameterBinding::new(identifier, origin, kind))?;
                None
            }
        };

        if let Some(replacement) = replacement {
            cleaned.push_str(&text[copied..marker.span.start]);
            cleaned.push_str(&replacement);
            copied = marker.span.end;
        }
    }
    cleaned.push_str(&text[copied..]);

    let bindings = registry.bindings;
    log_debug!("Parameter markers scanned",
        "expressions" => extracted.expressions.len(),
        "jdbc_style" => bare_markers > 0
    );
    log_success!(codes::success::BINDINGS_EXTRACTED,
        "Parameter bindings extracted",
        "bindings" => bindings.len()
    );

    Ok(ParsedBindings {
        query: cleaned,
        bindings,
        uses_jdbc_style: bare_markers > 0,
    })
}
