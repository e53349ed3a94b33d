//! Query dialects and the grammar features each one admits

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    /// Standard Jakarta Persistence query language
    #[default]
    Jpql,
    /// Hibernate query language, a superset of JPQL
    Hql,
}

/// Grammar features outside the common core
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Feature {
    CommonTableExpressions,
    FromSubqueries,
    FromFunctions,
    LateralJoins,
    ImplicitSelect,
    ResultLimits,
    InsertStatements,
    WindowFunctions,
    CaseInsensitiveLike,
    TemporalLiterals,
    DistinctFromPredicates,
    InstantiationArguments,
    KeywordedFunctions,
    Collations,
    Durations,
}

impl Feature {
    pub fn description(self) -> &'static str {
        match self {
            Feature::CommonTableExpressions => "WITH clauses",
            Feature::FromSubqueries => "subqueries in the FROM clause",
            Feature::FromFunctions => "functions in the FROM clause",
            Feature::LateralJoins => "LATERAL joins",
            Feature::ImplicitSelect => "queries without a SELECT clause",
            Feature::ResultLimits => "LIMIT, OFFSET and FETCH clauses",
            Feature::InsertStatements => "INSERT statements",
            Feature::WindowFunctions => "FILTER, OVER and WITHIN GROUP clauses",
            Feature::CaseInsensitiveLike => "ILIKE",
            Feature::TemporalLiterals => "CURRENT and OFFSET date-time literals",
            Feature::DistinctFromPredicates => "IS DISTINCT FROM",
            Feature::InstantiationArguments => "aliased or nested instantiation arguments",
            Feature::KeywordedFunctions => "POSITION(.. IN ..) and FORMAT(.. AS ..)",
            Feature::Collations => "COLLATE",
            Feature::Durations => "duration expressions",
        }
    }
}

impl Dialect {
    pub fn name(self) -> &'static str {
        match self {
            Dialect::Jpql => "JPQL",
            Dialect::Hql => "HQL",
        }
    }

    pub fn supports(self, _feature: Feature) -> bool {
        match self {
            Dialect::Hql => true,
            // Every gated feature is an HQL extension
            Dialect::Jpql => false,
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Dialect {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "jpql" => Ok(Dialect::Jpql),
            "hql" => Ok(Dialect::Hql),
            other => Err(format!("Unknown dialect '{}' (expected jpql or hql)", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feature_gates() {
        assert!(Dialect::Hql.supports(Feature::CommonTableExpressions));
        assert!(!Dialect::Jpql.supports(Feature::CommonTableExpressions));
        assert!(!Dialect::Jpql.supports(Feature::ResultLimits));
        assert!(Dialect::Hql.supports(Feature::WindowFunctions));
        assert!(Dialect::Hql.supports(Feature::Durations));
        assert!(!Dialect::Jpql.supports(Feature::DistinctFromPredicates));
    }

    #[test]
    fn test_parse_dialect() {
        assert_eq!("HQL".parse::<Dialect>(), Ok(Dialect::Hql));
        assert_eq!("jpql".parse::<Dialect>(), Ok(Dialect::Jpql));
        assert!("sql".parse::<Dialect>().is_err());
        assert_eq!(Dialect::default().to_string(), "JPQL");
    }
}
