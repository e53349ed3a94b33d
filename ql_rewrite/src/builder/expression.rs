//! Expressions and predicates of the builder DSL

use super::origin::{Origin, RenderContext};
use crate::sort::{Direction, NullHandling, Order};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Expression {
    /// Property path rooted at an origin, e.g. `p.address.city`
    Path { origin: Origin, path: String },
    /// Text rendered verbatim
    Literal(String),
    /// Quoted string literal
    StringLiteral(String),
    /// Bind marker such as `?1` or `:name`
    Parameter(String),
    Function { name: String, arguments: Vec<Expression> },
    /// Sort key with direction and null placement
    Order {
        expression: Box<Expression>,
        direction: Direction,
        null_handling: NullHandling,
    },
}

impl Expression {
    pub fn render(&self, context: &mut RenderContext) -> String {
        match self {
            Expression::Path { origin, path } => context.prefix_with_alias(origin, path),
            Expression::Literal(text) | Expression::Parameter(text) => text.clone(),
            Expression::StringLiteral(text) => format!("'{}'", text.replace('\'', "''")),
            Expression::Function { name, arguments } => {
                let arguments: Vec<String> = arguments.iter().map(|argument| argument.render(context)).collect();
                format!("{}({})", name, arguments.join(", "))
            }
            Expression::Order {
                expression,
                direction,
                null_handling,
            } => {
                let mut rendered = format!("{} {}", expression.render(context), direction);
                match null_handling {
                    NullHandling::Native => {}
                    NullHandling::NullsFirst => rendered.push_str(" NULLS FIRST"),
                    NullHandling::NullsLast => rendered.push_str(" NULLS LAST"),
                }
                rendered
            }
        }
    }

    /// Last segment of a property path
    pub(crate) fn segment(&self) -> Option<&str> {
        match self {
            Expression::Path { path, .. } => path.rsplit('.').next(),
            _ => None,
        }
    }
}

/// `origin.path`
pub fn path(origin: impl Into<Origin>, path: impl Into<String>) -> Expression {
    let path = path.into();
    assert!(!path.trim().is_empty(), "Property path must not be empty");
    Expression::Path {
        origin: origin.into(),
        path,
    }
}

/// Free-form expression text
pub fn expression(text: impl Into<String>) -> Expression {
    let text = text.into();
    assert!(!text.trim().is_empty(), "Expression must not be empty");
    Expression::Literal(text)
}

pub fn literal(value: impl ToString) -> Expression {
    Expression::Literal(value.to_string())
}

/// String literal; embedded quotes are doubled
pub fn string_literal(value: impl Into<String>) -> Expression {
    Expression::StringLiteral(value.into())
}

/// Parameter by its full placeholder text
pub fn parameter(placeholder: impl Into<String>) -> Expression {
    let placeholder = placeholder.into();
    assert!(!placeholder.trim().is_empty(), "Parameter placeholder must not be empty");
    Expression::Parameter(placeholder)
}

/// `?index`
pub fn indexed_parameter(index: usize) -> Expression {
    Expression::Parameter(format!("?{}", index))
}

/// `:name`
pub fn named_parameter(name: &str) -> Expression {
    assert!(!name.trim().is_empty(), "Parameter name must not be empty");
    Expression::Parameter(format!(":{}", name))
}

pub fn function(name: impl Into<String>, arguments: impl IntoIterator<Item = Expression>) -> Expression {
    Expression::Function {
        name: name.into(),
        arguments: arguments.into_iter().collect(),
    }
}

/// Sort key for `expression` following `order`'s direction and null handling
pub fn order_by(expression: Expression, order: &Order) -> Expression {
    Expression::Order {
        expression: Box::new(expression),
        direction: order.direction(),
        null_handling: order.null_handling(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Predicate {
    /// `left op right`
    Operator {
        left: Expression,
        operator: &'static str,
        right: Expression,
    },
    /// `expression suffix`, e.g. `p.name IS NULL`
    Suffix { expression: Expression, suffix: &'static str },
    Between {
        expression: Expression,
        lower: Expression,
        upper: Expression,
    },
    Like {
        expression: Expression,
        operator: &'static str,
        pattern: Expression,
        escape: char,
    },
    /// `expression op (values)`
    In {
        expression: Expression,
        operator: &'static str,
        values: Expression,
    },
    /// `element op collection`
    MemberOf {
        collection: Expression,
        operator: &'static str,
        element: Expression,
    },
    And(Box<Predicate>, Box<Predicate>),
    Or(Box<Predicate>, Box<Predicate>),
    Nested(Box<Predicate>),
}

impl Predicate {
    pub fn and(self, other: Predicate) -> Predicate {
        Predicate::And(Box::new(self), Box::new(other))
    }

    pub fn or(self, other: Predicate) -> Predicate {
        Predicate::Or(Box::new(self), Box::new(other))
    }

    /// Wrap in parentheses
    pub fn nest(self) -> Predicate {
        Predicate::Nested(Box::new(self))
    }

    pub fn render(&self, context: &mut RenderContext) -> String {
        match self {
            Predicate::Operator { left, operator, right } => {
                format!("{} {} {}", left.render(context), operator, right.render(context))
            }
            Predicate::Suffix { expression, suffix } => format!("{} {}", expression.render(context), suffix),
            Predicate::Between {
                expression,
                lower,
                upper,
            } => format!(
                "{} BETWEEN {} AND {}",
                expression.render(context),
                lower.render(context),
                upper.render(context)
            ),
            Predicate::Like {
                expression,
                operator,
                pattern,
                escape,
            } => format!(
                "{} {} {} ESCAPE '{}'",
                expression.render(context),
                operator,
                pattern.render(context),
                escape
            ),
            Predicate::In {
                expression,
                operator,
                values,
            } => format!("{} {} ({})", expression.render(context), operator, values.render(context)),
            Predicate::MemberOf {
                collection,
                operator,
                element,
            } => format!("{} {} {}", element.render(context), operator, collection.render(context)),
            Predicate::And(left, right) => format!("{} AND {}", left.render(context), right.render(context)),
            Predicate::Or(left, right) => format!("{} OR {}", left.render(context), right.render(context)),
            Predicate::Nested(inner) => format!("({})", inner.render(context)),
        }
    }
}

/// Fold `predicates` with `AND`; `None` when empty
pub fn and_all(predicates: impl IntoIterator<Item = Predicate>) -> Option<Predicate> {
    predicates.into_iter().reduce(Predicate::and)
}

/// Fold `predicates` with `OR`; `None` when empty
pub fn or_all(predicates: impl IntoIterator<Item = Predicate>) -> Option<Predicate> {
    predicates.into_iter().reduce(Predicate::or)
}

pub fn nested(predicate: Predicate) -> Predicate {
    predicate.nest()
}

/// Predicates with `expression` on the left-hand side
#[derive(Debug, Clone)]
pub struct WhereStep {
    expression: Expression,
}

/// Start a predicate on `expression`
pub fn where_(expression: Expression) -> WhereStep {
    WhereStep { expression }
}

impl WhereStep {
    fn operator(self, operator: &'static str, value: Expression) -> Predicate {
        Predicate::Operator {
            left: self.expression,
            operator,
            right: value,
        }
    }

    fn suffix(self, suffix: &'static str) -> Predicate {
        Predicate::Suffix {
            expression: self.expression,
            suffix,
        }
    }

    pub fn eq(self, value: Expression) -> Predicate {
        self.operator("=", value)
    }

    pub fn neq(self, value: Expression) -> Predicate {
        self.operator("!=", value)
    }

    pub fn gt(self, value: Expression) -> Predicate {
        self.operator(">", value)
    }

    pub fn gte(self, value: Expression) -> Predicate {
        self.operator(">=", value)
    }

    pub fn lt(self, value: Expression) -> Predicate {
        self.operator("<", value)
    }

    pub fn lte(self, value: Expression) -> Predicate {
        self.operator("<=", value)
    }

    pub fn between(self, lower: Expression, upper: Expression) -> Predicate {
        Predicate::Between {
            expression: self.expression,
            lower,
            upper,
        }
    }

    pub fn is_null(self) -> Predicate {
        self.suffix("IS NULL")
    }

    pub fn is_not_null(self) -> Predicate {
        self.suffix("IS NOT NULL")
    }

    pub fn is_true(self) -> Predicate {
        self.suffix("= TRUE")
    }

    pub fn is_false(self) -> Predicate {
        self.suffix("= FALSE")
    }

    pub fn is_empty(self) -> Predicate {
        self.suffix("IS EMPTY")
    }

    pub fn is_not_empty(self) -> Predicate {
        self.suffix("IS NOT EMPTY")
    }

    pub fn like(self, pattern: Expression, escape: char) -> Predicate {
        Predicate::Like {
            expression: self.expression,
            operator: "LIKE",
            pattern,
            escape,
        }
    }

    pub fn not_like(self, pattern: Expression, escape: char) -> Predicate {
        Predicate::Like {
            expression: self.expression,
            operator: "NOT LIKE",
            pattern,
            escape,
        }
    }

    pub fn in_(self, values: Expression) -> Predicate {
        Predicate::In {
            expression: self.expression,
            operator: "IN",
            values,
        }
    }

    pub fn not_in(self, values: Expression) -> Predicate {
        Predicate::In {
            expression: self.expression,
            operator: "NOT IN",
            values,
        }
    }

    /// `element MEMBER OF <this collection>`
    pub fn member_of(self, element: Expression) -> Predicate {
        Predicate::MemberOf {
            collection: self.expression,
            operator: "MEMBER OF",
            element,
        }
    }

    pub fn not_member_of(self, element: Expression) -> Predicate {
        Predicate::MemberOf {
            collection: self.expression,
            operator: "NOT MEMBER OF",
            element,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::origin::Entity;

    fn person() -> Entity {
        Entity::new("com.example.Person")
    }

    fn render(predicate: &Predicate) -> String {
        predicate.render(&mut RenderContext::for_root(&person()))
    }

    #[test]
    fn test_expressions() {
        let mut context = RenderContext::for_root(&person());
        assert_eq!(path(person(), "address.city").render(&mut context), "p.address.city");
        assert_eq!(string_literal("O'Brien").render(&mut context), "'O''Brien'");
        assert_eq!(literal(42).render(&mut context), "42");
        assert_eq!(indexed_parameter(1).render(&mut context), "?1");
        assert_eq!(named_parameter("name").render(&mut context), ":name");
        assert_eq!(
            function("upper", [path(person(), "name")]).render(&mut context),
            "upper(p.name)"
        );
        let order = Order::desc("name").nulls_last();
        assert_eq!(
            order_by(path(person(), "name"), &order).render(&mut context),
            "p.name DESC NULLS LAST"
        );
    }

    #[test]
    fn test_comparison_predicates() {
        let name = || where_(path(person(), "name"));
        assert_eq!(render(&name().eq(indexed_parameter(1))), "p.name = ?1");
        assert_eq!(render(&name().neq(indexed_parameter(1))), "p.name != ?1");
        assert_eq!(render(&name().is_null()), "p.name IS NULL");
        assert_eq!(render(&name().is_not_empty()), "p.name IS NOT EMPTY");
        assert_eq!(render(&name().is_true()), "p.name = TRUE");
        assert_eq!(
            render(&where_(path(person(), "age")).between(literal(18), literal(65))),
            "p.age BETWEEN 18 AND 65"
        );
        assert_eq!(
            render(&name().like(named_parameter("pattern"), '\\')),
            "p.name LIKE :pattern ESCAPE '\\'"
        );
        assert_eq!(render(&name().not_in(named_parameter("names"))), "p.name NOT IN (:names)");
        assert_eq!(
            render(&where_(path(person(), "roles")).member_of(named_parameter("role"))),
            ":role MEMBER OF p.roles"
        );
    }

    #[test]
    fn test_composition() {
        let a = where_(path(person(), "a")).eq(literal(1));
        let b = where_(path(person(), "b")).eq(literal(2));
        let c = where_(path(person(), "c")).eq(literal(3));

        assert_eq!(render(&a.clone().and(b.clone()).or(c.clone())), "p.a = 1 AND p.b = 2 OR p.c = 3");
        assert_eq!(
            render(&a.clone().and(b.clone().or(c.clone()).nest())),
            "p.a = 1 AND (p.b = 2 OR p.c = 3)"
        );
        assert_eq!(
            render(&and_all([a.clone(), b.clone(), c.clone()]).unwrap()),
            "p.a = 1 AND p.b = 2 AND p.c = 3"
        );
        assert_eq!(render(&or_all([a, b]).unwrap()), "p.a = 1 OR p.b = 2");
        assert!(and_all(Vec::new()).is_none());
    }

    #[test]
    #[should_panic(expected = "Parameter placeholder must not be empty")]
    fn test_empty_parameter_panics() {
        parameter("");
    }
}
