//! Evaluates a parsed XPath AST against any `DocumentNode` tree.

use crate::ast::{Axis, Expression, LocationPath, NodeTest, NodeTypeTest, Step, UnaryOperator};
use crate::error::XPathError;
use crate::functions::{self, FunctionRegistry};
use crate::node::{DocumentNode, NodeType, XML_NAMESPACE};
use crate::value::Value;
use crate::{axes, operators};
use std::collections::HashMap;
use std::marker::PhantomData;

/// Precomputed `xsl:key` lookups: key name, then key value, to matching nodes.
pub type KeyIndexes<N> = HashMap<String, HashMap<String, Vec<N>>>;

/// In-scope variable bindings.
pub type Variables<N> = HashMap<String, Value<N>>;

/// Everything an expression can observe while it is evaluated.
///
/// `'a` is the lifetime of the document, `'d` that of the borrowed tables.
#[derive(Clone, Copy)]
pub struct EvaluationContext<'a, 'd, N: DocumentNode<'a>> {
    pub context_node: N,
    pub root_node: N,
    /// The node XSLT's `current()` returns. Stays fixed inside predicates.
    pub current_node: N,
    pub functions: &'d FunctionRegistry,
    pub context_position: usize, // 1-based
    pub context_size: usize,
    pub variables: &'d Variables<N>,
    /// Consulted when a name is not bound in `variables`.
    pub globals: Option<&'d Variables<N>>,
    pub key_indexes: Option<&'d KeyIndexes<N>>,
    /// Prefix to URI bindings for name tests like `svg:rect`.
    pub namespaces: Option<&'d HashMap<String, String>>,
    /// Undeclared variables and prefixes become errors instead of empty values.
    pub strict: bool,
    _marker: PhantomData<&'a ()>,
}

impl<'a, 'd, N: DocumentNode<'a>> EvaluationContext<'a, 'd, N> {
    pub fn new(
        context_node: N,
        root_node: N,
        functions: &'d FunctionRegistry,
        variables: &'d Variables<N>,
    ) -> Self {
        Self {
            context_node,
            root_node,
            current_node: context_node,
            functions,
            context_position: 1,
            context_size: 1,
            variables,
            globals: None,
            key_indexes: None,
            namespaces: None,
            strict: false,
            _marker: PhantomData,
        }
    }

    pub fn at_position(mut self, position: usize, size: usize) -> Self {
        self.context_position = position;
        self.context_size = size;
        self
    }

    pub fn with_globals(mut self, globals: &'d Variables<N>) -> Self {
        self.globals = Some(globals);
        self
    }

    pub fn with_keys(mut self, key_indexes: &'d KeyIndexes<N>) -> Self {
        self.key_indexes = Some(key_indexes);
        self
    }

    pub fn with_namespaces(mut self, namespaces: &'d HashMap<String, String>) -> Self {
        self.namespaces = Some(namespaces);
        self
    }

    pub fn with_current(mut self, current_node: N) -> Self {
        self.current_node = current_node;
        self
    }

    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// A copy of this context focused on another node, as inside a predicate.
    pub fn focus(&self, node: N, position: usize, size: usize) -> Self {
        Self {
            context_node: node,
            context_position: position,
            context_size: size,
            ..*self
        }
    }

    pub fn lookup_variable(&self, name: &str) -> Option<&'d Value<N>> {
        self.variables
            .get(name)
            .or_else(|| self.globals.and_then(|g| g.get(name)))
    }

    /// Resolves a namespace prefix. `xml` is always bound. An undeclared prefix
    /// yields `None`, or an error in strict mode.
    pub fn resolve_prefix(&self, prefix: &str) -> Result<Option<&'d str>, XPathError> {
        if prefix == "xml" {
            return Ok(Some(XML_NAMESPACE));
        }
        match self.namespaces.and_then(|ns| ns.get(prefix)) {
            Some(uri) => Ok(Some(uri.as_str())),
            None if self.strict => Err(XPathError::UnknownPrefix(prefix.to_string())),
            None => Ok(None),
        }
    }
}

pub fn evaluate<'a, N>(
    expr: &Expression,
    e_ctx: &EvaluationContext<'a, '_, N>,
) -> Result<Value<N>, XPathError>
where
    N: DocumentNode<'a> + 'a,
{
    match expr {
        Expression::Literal(s) => Ok(Value::String(s.clone())),
        Expression::Number(n) => Ok(Value::Number(*n)),
        Expression::LocationPath(path) => {
            let nodes = evaluate_location_path(path, e_ctx)?;
            Ok(Value::NodeSet(nodes))
        }
        Expression::Filter {
            primary,
            predicates,
        } => {
            let value = evaluate(primary, e_ctx)?;
            if predicates.is_empty() {
                return Ok(value);
            }
            let nodes = value.into_nodes("A filtered expression")?;
            Ok(Value::NodeSet(apply_predicates(nodes, predicates, e_ctx)?))
        }
        Expression::Variable(name) => match e_ctx.lookup_variable(name) {
            Some(value) => Ok(value.clone()),
            None if e_ctx.strict => Err(XPathError::UnknownVariable(name.clone())),
            None => Ok(Value::String(String::new())),
        },
        Expression::FunctionCall { name, args } => {
            let mut evaluated_args = Vec::with_capacity(args.len());
            for arg in args {
                evaluated_args.push(evaluate(arg, e_ctx)?);
            }
            functions::evaluate_function(name, evaluated_args, e_ctx)
        }
        Expression::BinaryOp { left, op, right } => {
            let left_val = evaluate(left, e_ctx)?;
            let right_val = evaluate(right, e_ctx)?;
            operators::evaluate(*op, left_val, right_val)
        }
        Expression::UnaryOp { op, expr } => {
            let val = evaluate(expr, e_ctx)?;
            match op {
                UnaryOperator::Minus => Ok(Value::Number(-val.to_number())),
            }
        }
    }
}

fn evaluate_location_path<'a, N>(
    path: &LocationPath,
    e_ctx: &EvaluationContext<'a, '_, N>,
) -> Result<Vec<N>, XPathError>
where
    N: DocumentNode<'a> + 'a,
{
    let mut current_nodes = if let Some(start_expr) = &path.start_point {
        evaluate(start_expr, e_ctx)?.into_nodes("The start of a path")?
    } else if path.is_absolute {
        vec![e_ctx.root_node]
    } else {
        vec![e_ctx.context_node]
    };

    for step in &path.steps {
        current_nodes = evaluate_step(step, &current_nodes, e_ctx)?;
    }
    Ok(current_nodes)
}

/// Evaluates one step from every context node, then merges the results into
/// document order.
fn evaluate_step<'a, N>(
    step: &Step,
    context_nodes: &[N],
    e_ctx: &EvaluationContext<'a, '_, N>,
) -> Result<Vec<N>, XPathError>
where
    N: DocumentNode<'a> + 'a,
{
    let mut result = Vec::new();
    for &node in context_nodes {
        let axis_nodes = axes::collect(step.axis, node);
        let tested = filter_by_node_test(axis_nodes, &step.node_test, step.axis, e_ctx)?;
        result.extend(apply_predicates(tested, &step.predicates, e_ctx)?);
    }
    if context_nodes.len() > 1 || step.axis.is_reverse() {
        result.sort();
        result.dedup();
    }
    Ok(result)
}

fn filter_by_node_test<'a, N>(
    nodes: Vec<N>,
    test: &NodeTest,
    axis: Axis,
    e_ctx: &EvaluationContext<'a, '_, N>,
) -> Result<Vec<N>, XPathError>
where
    N: DocumentNode<'a> + 'a,
{
    let namespace = match test {
        NodeTest::Name {
            prefix: Some(p), ..
        }
        | NodeTest::NamespaceWildcard(p) => e_ctx.resolve_prefix(p)?,
        _ => None,
    };
    Ok(nodes
        .into_iter()
        .filter(|&node| matches_node_test(node, test, axis, namespace))
        .collect())
}

/// Tests a single node against a node test. `namespace` is the URI the test's
/// prefix resolved to, if it has one. When a prefix could not be resolved the
/// test falls back to comparing prefixes literally.
pub fn matches_node_test<'a, N>(
    node: N,
    test: &NodeTest,
    axis: Axis,
    namespace: Option<&str>,
) -> bool
where
    N: DocumentNode<'a>,
{
    let principal = if axis == Axis::Attribute {
        NodeType::Attribute
    } else {
        NodeType::Element
    };
    match test {
        NodeTest::Wildcard => node.node_type() == principal,
        NodeTest::NamespaceWildcard(prefix) => {
            node.node_type() == principal && prefix_matches(node, prefix, namespace)
        }
        NodeTest::Name { prefix, local } => {
            if node.node_type() != principal {
                return false;
            }
            let Some(q_name) = node.name() else {
                return false;
            };
            if q_name.local_part != local {
                return false;
            }
            match prefix {
                Some(p) => prefix_matches(node, p, namespace),
                None => node.namespace_uri().is_none(),
            }
        }
        NodeTest::NodeType(ntt) => match ntt {
            NodeTypeTest::Text => node.node_type() == NodeType::Text,
            NodeTypeTest::Comment => node.node_type() == NodeType::Comment,
            NodeTypeTest::ProcessingInstruction => {
                node.node_type() == NodeType::ProcessingInstruction
            }
            NodeTypeTest::Node => true,
        },
        NodeTest::ProcessingInstruction(target) => {
            node.node_type() == NodeType::ProcessingInstruction
                && node.name().is_some_and(|q| q.local_part == target)
        }
    }
}

fn prefix_matches<'a, N: DocumentNode<'a>>(node: N, prefix: &str, namespace: Option<&str>) -> bool {
    match namespace {
        Some(uri) => node.namespace_uri() == Some(uri),
        None => node.name().is_some_and(|q| q.prefix == Some(prefix)),
    }
}

/// Filters nodes through each predicate in turn. Positions are 1-based and
/// follow the order of `nodes`.
fn apply_predicates<'a, N>(
    nodes: Vec<N>,
    predicates: &[Expression],
    e_ctx: &EvaluationContext<'a, '_, N>,
) -> Result<Vec<N>, XPathError>
where
    N: DocumentNode<'a> + 'a,
{
    let mut current = nodes;
    for predicate in predicates {
        let size = current.len();
        let mut kept = Vec::with_capacity(size);
        for (i, node) in current.into_iter().enumerate() {
            let predicate_ctx = e_ctx.focus(node, i + 1, size);
            let keep = match evaluate(predicate, &predicate_ctx)? {
                Value::Number(n) => n == (i + 1) as f64,
                other => other.to_bool(),
            };
            if keep {
                kept.push(node);
            }
        }
        current = kept;
    }
    Ok(current)
}

/// Parses and evaluates an expression in one go.
pub fn evaluate_str<'a, N>(
    expression: &str,
    e_ctx: &EvaluationContext<'a, '_, N>,
) -> Result<Value<N>, XPathError>
where
    N: DocumentNode<'a> + 'a,
{
    let expr = crate::parser::parse_expression(expression)?;
    evaluate(&expr, e_ctx)
}
