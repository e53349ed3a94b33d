//! Sort specifications applied by the sort rewriter

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

impl Direction {
    pub fn is_descending(self) -> bool {
        self == Direction::Desc
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Asc => f.write_str("ASC"),
            Direction::Desc => f.write_str("DESC"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum NullHandling {
    /// Leave null placement to the database
    #[default]
    Native,
    NullsFirst,
    NullsLast,
}

/// One sort key
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Order {
    property: String,
    direction: Direction,
    ignore_case: bool,
    null_handling: NullHandling,
    is_unsafe: bool,
}

impl Order {
    pub fn new(direction: Direction, property: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            direction,
            ignore_case: false,
            null_handling: NullHandling::Native,
            is_unsafe: false,
        }
    }

    pub fn asc(property: impl Into<String>) -> Self {
        Self::new(Direction::Asc, property)
    }

    pub fn desc(property: impl Into<String>) -> Self {
        Self::new(Direction::Desc, property)
    }

    pub fn ignoring_case(mut self) -> Self {
        self.ignore_case = true;
        self
    }

    pub fn with_null_handling(mut self, null_handling: NullHandling) -> Self {
        self.null_handling = null_handling;
        self
    }

    pub fn nulls_first(self) -> Self {
        self.with_null_handling(NullHandling::NullsFirst)
    }

    pub fn nulls_last(self) -> Self {
        self.with_null_handling(NullHandling::NullsLast)
    }

    /// Allow arbitrary expression text as the sort key
    pub fn unsafe_expression(mut self) -> Self {
        self.is_unsafe = true;
        self
    }

    pub fn property(&self) -> &str {
        &self.property
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn is_descending(&self) -> bool {
        self.direction.is_descending()
    }

    pub fn is_ignore_case(&self) -> bool {
        self.ignore_case
    }

    pub fn null_handling(&self) -> NullHandling {
        self.null_handling
    }

    pub fn is_unsafe(&self) -> bool {
        self.is_unsafe
    }
}

impl fmt::Display for Order {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.property, self.direction)?;
        match self.null_handling {
            NullHandling::Native => {}
            NullHandling::NullsFirst => f.write_str(", NULLS_FIRST")?,
            NullHandling::NullsLast => f.write_str(", NULLS_LAST")?,
        }
        if self.ignore_case {
            f.write_str(", ignoring case")?;
        }
        Ok(())
    }
}

/// `property[:asc|desc][:ic][:nulls-first|nulls-last][:unsafe]`
impl FromStr for Order {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split(':');
        let property = parts.next().unwrap_or_default().trim();
        if property.is_empty() {
            return Err(format!("Missing sort property in '{}'", s));
        }

        let mut order = Order::asc(property);
        for flag in parts {
            order = match flag.trim().to_ascii_lowercase().as_str() {
                "asc" => Order { direction: Direction::Asc, ..order },
                "desc" => Order { direction: Direction::Desc, ..order },
                "ic" | "ignorecase" => order.ignoring_case(),
                "nulls-first" | "nulls_first" => order.nulls_first(),
                "nulls-last" | "nulls_last" => order.nulls_last(),
                "unsafe" => order.unsafe_expression(),
                other => return Err(format!("Unknown sort flag '{}' in '{}'", other, s)),
            };
        }
        Ok(order)
    }
}

/// Ordered list of sort keys; empty means unsorted
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Sort {
    orders: Vec<Order>,
}

impl Sort {
    pub fn unsorted() -> Self {
        Self::default()
    }

    pub fn by(orders: impl IntoIterator<Item = Order>) -> Self {
        Self {
            orders: orders.into_iter().collect(),
        }
    }

    pub fn and(mut self, order: Order) -> Self {
        self.orders.push(order);
        self
    }

    pub fn is_sorted(&self) -> bool {
        !self.orders.is_empty()
    }

    pub fn is_unsorted(&self) -> bool {
        self.orders.is_empty()
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Order> {
        self.orders.iter()
    }
}

impl<'a> IntoIterator for &'a Sort {
    type Item = &'a Order;
    type IntoIter = std::slice::Iter<'a, Order>;

    fn into_iter(self) -> Self::IntoIter {
        self.orders.iter()
    }
}

impl fmt::Display for Sort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.orders.is_empty() {
            return f.write_str("UNSORTED");
        }
        let orders: Vec<String> = self.orders.iter().map(Order::to_string).collect();
        f.write_str(&orders.join(","))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_builders() {
        let order = Order::desc("name").ignoring_case().nulls_last();
        assert!(order.is_descending());
        assert!(order.is_ignore_case());
        assert_eq!(order.null_handling(), NullHandling::NullsLast);
        assert!(!order.is_unsafe());
        assert_eq!(order.to_string(), "name: DESC, NULLS_LAST, ignoring case");
    }

    #[test]
    fn test_parse_order() {
        let order: Order = "u.age:desc:ic".parse().unwrap();
        assert_eq!(order.property(), "u.age");
        assert!(order.is_descending());
        assert!(order.is_ignore_case());

        let order: Order = "length(name):unsafe".parse().unwrap();
        assert!(order.is_unsafe());
        assert_eq!(order.direction(), Direction::Asc);

        assert!("name:sideways".parse::<Order>().is_err());
        assert!(":desc".parse::<Order>().is_err());
    }

    #[test]
    fn test_sort_state() {
        assert!(Sort::unsorted().is_unsorted());
        let sort = Sort::by([Order::asc("a")]).and(Order::desc("b"));
        assert!(sort.is_sorted());
        assert_eq!(sort.len(), 2);
        assert_eq!(sort.to_string(), "a: ASC,b: DESC");
        assert_eq!(Sort::unsorted().to_string(), "UNSORTED");
    }
}
