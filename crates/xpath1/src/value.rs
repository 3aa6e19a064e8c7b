//! The four XPath 1.0 value types and their conversions.

use crate::node::DocumentNode;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum Value<N> {
    /// Always kept in document order without duplicates.
    NodeSet(Vec<N>),
    String(String),
    Number(f64),
    Boolean(bool),
}

impl<'a, N: DocumentNode<'a>> Value<N> {
    /// `boolean()` conversion.
    pub fn to_bool(&self) -> bool {
        match self {
            Value::NodeSet(nodes) => !nodes.is_empty(),
            Value::String(s) => !s.is_empty(),
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::Boolean(b) => *b,
        }
    }

    /// `number()` conversion.
    pub fn to_number(&self) -> f64 {
        match self {
            Value::Number(n) => *n,
            Value::String(s) => parse_number(s),
            Value::Boolean(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
            Value::NodeSet(nodes) => nodes
                .first()
                .map(|n| parse_number(&n.string_value()))
                .unwrap_or(f64::NAN),
        }
    }

    pub fn is_node_set(&self) -> bool {
        matches!(self, Value::NodeSet(_))
    }

    /// Consumes the value as a node-set, failing for the other types.
    pub fn into_nodes(self, what: &str) -> Result<Vec<N>, crate::XPathError> {
        match self {
            Value::NodeSet(nodes) => Ok(nodes),
            other => Err(crate::XPathError::TypeError(format!(
                "{} must be a node-set, got {}",
                what,
                other.type_name()
            ))),
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::NodeSet(_) => "node-set",
            Value::String(_) => "string",
            Value::Number(_) => "number",
            Value::Boolean(_) => "boolean",
        }
    }
}

impl<'a, N: DocumentNode<'a>> fmt::Display for Value<N> {
    /// `string()` conversion.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::NodeSet(nodes) => match nodes.first() {
                Some(n) => f.write_str(&n.string_value()),
                None => Ok(()),
            },
            Value::String(s) => f.write_str(s),
            Value::Number(n) => f.write_str(&number_to_string(*n)),
            Value::Boolean(b) => write!(f, "{}", b),
        }
    }
}

/// Formats a number the way `string()` does: no exponent, no trailing `.0`,
/// `NaN`, `Infinity` and `-Infinity` for the special values.
pub fn number_to_string(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        let s = if n > 0.0 { "Infinity" } else { "-Infinity" };
        s.to_string()
    } else if n == 0.0 {
        "0".to_string()
    } else {
        format!("{}", n)
    }
}

/// Parses a string the way `number()` does. Accepts optional surrounding
/// whitespace, an optional leading minus and a decimal literal; anything else
/// is NaN.
pub fn parse_number(s: &str) -> f64 {
    let trimmed = s.trim_matches(|c: char| matches!(c, ' ' | '\t' | '\r' | '\n'));
    let digits = trimmed.strip_prefix('-').unwrap_or(trimmed);
    let valid = !digits.is_empty()
        && digits.chars().any(|c| c.is_ascii_digit())
        && digits.chars().all(|c| c.is_ascii_digit() || c == '.')
        && digits.matches('.').count() <= 1;
    if valid {
        trimmed.parse().unwrap_or(f64::NAN)
    } else {
        f64::NAN
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::mock::{MockNode, create_test_tree};

    #[test]
    fn test_number_to_string() {
        assert_eq!(number_to_string(3.0), "3");
        assert_eq!(number_to_string(-0.0), "0");
        assert_eq!(number_to_string(0.5), "0.5");
        assert_eq!(number_to_string(f64::NAN), "NaN");
        assert_eq!(number_to_string(f64::NEG_INFINITY), "-Infinity");
        assert_eq!(number_to_string(1e21), "1000000000000000000000");
    }

    #[test]
    fn test_parse_number() {
        assert_eq!(parse_number(" 42 "), 42.0);
        assert_eq!(parse_number("-1.5"), -1.5);
        assert_eq!(parse_number(".5"), 0.5);
        assert!(parse_number("1e3").is_nan());
        assert!(parse_number("+1").is_nan());
        assert!(parse_number("abc").is_nan());
        assert!(parse_number("").is_nan());
        assert!(parse_number(".").is_nan());
    }

    #[test]
    fn test_conversions() {
        let tree = create_test_tree();
        let empty: Value<MockNode> = Value::NodeSet(vec![]);
        assert!(!empty.to_bool());
        assert!(empty.to_number().is_nan());
        assert_eq!(empty.to_string(), "");

        let paras = Value::NodeSet(vec![tree.node(1), tree.node(8)]);
        assert!(paras.to_bool());
        assert_eq!(paras.to_string(), "Hello");

        assert_eq!(Value::<MockNode>::Boolean(true).to_number(), 1.0);
        assert_eq!(Value::<MockNode>::Number(2.0).to_string(), "2");
        assert!(!Value::<MockNode>::Number(f64::NAN).to_bool());
        assert!(!Value::<MockNode>::String(String::new()).to_bool());
    }
}
