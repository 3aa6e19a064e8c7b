//! Binary operator evaluation, including the node-set comparison rules.

use crate::ast::BinaryOperator;
use crate::error::XPathError;
use crate::node::DocumentNode;
use crate::value::{Value, parse_number};

pub fn evaluate<'a, N: DocumentNode<'a>>(
    op: BinaryOperator,
    left: Value<N>,
    right: Value<N>,
) -> Result<Value<N>, XPathError> {
    use BinaryOperator::*;
    match op {
        Or => Ok(Value::Boolean(left.to_bool() || right.to_bool())),
        And => Ok(Value::Boolean(left.to_bool() && right.to_bool())),
        Equals | NotEquals | LessThan | LessThanOrEqual | GreaterThan | GreaterThanOrEqual => {
            Ok(Value::Boolean(compare(op, &left, &right)))
        }
        Plus => Ok(Value::Number(left.to_number() + right.to_number())),
        Minus => Ok(Value::Number(left.to_number() - right.to_number())),
        Multiply => Ok(Value::Number(left.to_number() * right.to_number())),
        Divide => Ok(Value::Number(left.to_number() / right.to_number())),
        Modulo => Ok(Value::Number(left.to_number() % right.to_number())),
        Union => union(left, right),
    }
}

/// Evaluates a comparison. A node-set operand compares true if any of its
/// nodes satisfies the comparison against the other operand.
pub fn compare<'a, N: DocumentNode<'a>>(op: BinaryOperator, left: &Value<N>, right: &Value<N>) -> bool {
    match (left, right) {
        (Value::NodeSet(l), Value::NodeSet(r)) => {
            let r_strings: Vec<String> = r.iter().map(|n| n.string_value()).collect();
            l.iter().any(|ln| {
                let ls = ln.string_value();
                r_strings.iter().any(|rs| compare_strings(op, &ls, rs))
            })
        }
        (Value::NodeSet(nodes), other) => compare_node_set(op, nodes, other, false),
        (other, Value::NodeSet(nodes)) => compare_node_set(op, nodes, other, true),
        _ => compare_atomic(op, left, right),
    }
}

fn compare_node_set<'a, N: DocumentNode<'a>>(
    op: BinaryOperator,
    nodes: &[N],
    other: &Value<N>,
    node_set_on_right: bool,
) -> bool {
    let ordered = |a: f64, b: f64| {
        if node_set_on_right {
            compare_numbers(op, b, a)
        } else {
            compare_numbers(op, a, b)
        }
    };
    match other {
        Value::Boolean(b) => {
            let set = !nodes.is_empty();
            if node_set_on_right {
                compare_booleans(op, *b, set)
            } else {
                compare_booleans(op, set, *b)
            }
        }
        Value::Number(n) => nodes
            .iter()
            .any(|node| ordered(parse_number(&node.string_value()), *n)),
        Value::String(s) => nodes.iter().any(|node| {
            let value = node.string_value();
            if node_set_on_right {
                compare_strings(op, s, &value)
            } else {
                compare_strings(op, &value, s)
            }
        }),
        Value::NodeSet(_) => false,
    }
}

fn compare_atomic<'a, N: DocumentNode<'a>>(op: BinaryOperator, left: &Value<N>, right: &Value<N>) -> bool {
    use BinaryOperator::*;
    match op {
        Equals | NotEquals => {
            if matches!(left, Value::Boolean(_)) || matches!(right, Value::Boolean(_)) {
                compare_booleans(op, left.to_bool(), right.to_bool())
            } else if matches!(left, Value::Number(_)) || matches!(right, Value::Number(_)) {
                compare_numbers(op, left.to_number(), right.to_number())
            } else {
                compare_strings(op, &left.to_string(), &right.to_string())
            }
        }
        _ => compare_numbers(op, left.to_number(), right.to_number()),
    }
}

fn compare_booleans(op: BinaryOperator, l: bool, r: bool) -> bool {
    match op {
        BinaryOperator::Equals => l == r,
        BinaryOperator::NotEquals => l != r,
        _ => compare_numbers(op, l as u8 as f64, r as u8 as f64),
    }
}

fn compare_strings(op: BinaryOperator, l: &str, r: &str) -> bool {
    match op {
        BinaryOperator::Equals => l == r,
        BinaryOperator::NotEquals => l != r,
        _ => compare_numbers(op, parse_number(l), parse_number(r)),
    }
}

fn compare_numbers(op: BinaryOperator, l: f64, r: f64) -> bool {
    match op {
        BinaryOperator::Equals => l == r,
        BinaryOperator::NotEquals => l != r,
        BinaryOperator::LessThan => l < r,
        BinaryOperator::LessThanOrEqual => l <= r,
        BinaryOperator::GreaterThan => l > r,
        BinaryOperator::GreaterThanOrEqual => l >= r,
        _ => false,
    }
}

fn union<'a, N: DocumentNode<'a>>(left: Value<N>, right: Value<N>) -> Result<Value<N>, XPathError> {
    let mut merged = left.into_nodes("Left-hand side of '|'")?;
    merged.extend(right.into_nodes("Right-hand side of '|'")?);
    merged.sort();
    merged.dedup();
    Ok(Value::NodeSet(merged))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::mock::{MockNode, create_test_tree};

    fn num<'a>(n: f64) -> Value<MockNode<'a>> {
        Value::Number(n)
    }

    fn string<'a>(s: &str) -> Value<MockNode<'a>> {
        Value::String(s.to_string())
    }

    #[test]
    fn test_logical_operators() {
        let t = Value::<MockNode>::Boolean(true);
        let f = Value::<MockNode>::Boolean(false);
        assert!(evaluate(BinaryOperator::Or, t.clone(), f.clone()).unwrap().to_bool());
        assert!(!evaluate(BinaryOperator::And, t, f).unwrap().to_bool());
    }

    #[test]
    fn test_arithmetic_operators() {
        assert_eq!(evaluate(BinaryOperator::Plus, num(10.0), num(3.0)).unwrap().to_number(), 13.0);
        assert_eq!(evaluate(BinaryOperator::Minus, num(10.0), num(3.0)).unwrap().to_number(), 7.0);
        assert_eq!(evaluate(BinaryOperator::Multiply, num(10.0), num(3.0)).unwrap().to_number(), 30.0);
        assert_eq!(evaluate(BinaryOperator::Modulo, num(10.0), num(3.0)).unwrap().to_number(), 1.0);
        assert_eq!(evaluate(BinaryOperator::Modulo, num(-5.0), num(2.0)).unwrap().to_number(), -1.0);
        assert!(evaluate(BinaryOperator::Divide, num(1.0), num(0.0)).unwrap().to_number().is_infinite());
        assert!(evaluate(BinaryOperator::Plus, string("x"), num(1.0)).unwrap().to_number().is_nan());
    }

    #[test]
    fn test_atomic_equality() {
        assert!(compare(BinaryOperator::NotEquals, &string("hello"), &string("world")));
        assert!(compare(BinaryOperator::Equals, &string("1.0"), &num(1.0)));
        assert!(compare(BinaryOperator::Equals, &string("x"), &Value::Boolean(true)));
        assert!(!compare(BinaryOperator::Equals, &num(f64::NAN), &num(f64::NAN)));
        assert!(compare(BinaryOperator::LessThan, &string("2"), &string("10")));
    }

    #[test]
    fn test_node_set_comparisons() {
        let tree = create_test_tree();
        let paras = Value::NodeSet(vec![tree.node(1), tree.node(8)]);

        // Existential: either para may satisfy the comparison.
        assert!(compare(BinaryOperator::Equals, &paras, &string("World")));
        assert!(compare(BinaryOperator::Equals, &string("World"), &paras));
        assert!(compare(BinaryOperator::NotEquals, &paras, &string("World")));
        assert!(!compare(BinaryOperator::Equals, &paras, &string("Nope")));

        let empty: Value<MockNode> = Value::NodeSet(vec![]);
        assert!(!compare(BinaryOperator::Equals, &empty, &string("")));
        assert!(!compare(BinaryOperator::NotEquals, &empty, &string("")));
        assert!(compare(BinaryOperator::Equals, &empty, &Value::Boolean(false)));

        let attrs = Value::NodeSet(vec![tree.node(2)]);
        let by_id = Value::NodeSet(vec![tree.node(2), tree.node(3)]);
        assert!(compare(BinaryOperator::Equals, &attrs, &by_id));
    }

    #[test]
    fn test_union_operator() {
        let tree = create_test_tree();
        let root = tree.root();
        let para = tree.node(1);
        let text = tree.node(4);

        let left = Value::NodeSet(vec![para, root]);
        let right = Value::NodeSet(vec![para, text]);

        let result = evaluate(BinaryOperator::Union, left, right).unwrap();
        assert_eq!(result, Value::NodeSet(vec![root, para, text]));

        let err = evaluate(BinaryOperator::Union, num(1.0), Value::NodeSet(vec![root]));
        assert!(matches!(err, Err(XPathError::TypeError(_))));
    }
}
