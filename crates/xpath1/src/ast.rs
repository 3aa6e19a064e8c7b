//! The abstract syntax tree for XPath 1.0 expressions.

#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Literal(String),
    Number(f64),
    LocationPath(LocationPath),
    /// A primary expression narrowed by predicates, e.g. `$items[2]` or `(//a)[1]`.
    Filter {
        primary: Box<Expression>,
        predicates: Vec<Expression>,
    },
    Variable(String),
    FunctionCall {
        name: String,
        args: Vec<Expression>,
    },
    BinaryOp {
        left: Box<Expression>,
        op: BinaryOperator,
        right: Box<Expression>,
    },
    UnaryOp {
        op: UnaryOperator,
        expr: Box<Expression>,
    },
}

impl Expression {
    pub fn is_location_path(&self) -> bool {
        matches!(self, Expression::LocationPath(_))
    }

    pub fn is_binary_op(&self) -> bool {
        matches!(self, Expression::BinaryOp { .. })
    }

    /// Visits this expression and every sub-expression, depth first.
    pub fn walk(&self, visit: &mut dyn FnMut(&Expression)) {
        visit(self);
        match self {
            Expression::LocationPath(path) => path.walk(visit),
            Expression::Filter {
                primary,
                predicates,
            } => {
                primary.walk(visit);
                predicates.iter().for_each(|p| p.walk(visit));
            }
            Expression::FunctionCall { args, .. } => args.iter().for_each(|a| a.walk(visit)),
            Expression::BinaryOp { left, right, .. } => {
                left.walk(visit);
                right.walk(visit);
            }
            Expression::UnaryOp { expr, .. } => expr.walk(visit),
            Expression::Literal(_) | Expression::Number(_) | Expression::Variable(_) => {}
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    Minus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    // Logical
    Or,
    And,
    // Equality
    Equals,
    NotEquals,
    // Relational
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
    // Additive
    Plus,
    Minus,
    // Multiplicative
    Multiply,
    Divide,
    Modulo,
    // Set
    Union,
}

/// A location path such as `/child::foo`, `descendant::bar[1]` or `$var/item`.
#[derive(Debug, Clone, PartialEq)]
pub struct LocationPath {
    /// A starting expression for paths like `$var/foo` or `key('k', 'v')/foo`.
    pub start_point: Option<Box<Expression>>,
    /// True if the path starts at the document root. Ignored when `start_point` is set.
    pub is_absolute: bool,
    pub steps: Vec<Step>,
}

impl LocationPath {
    fn walk(&self, visit: &mut dyn FnMut(&Expression)) {
        if let Some(start) = &self.start_point {
            start.walk(visit);
        }
        for step in &self.steps {
            step.predicates.iter().for_each(|p| p.walk(visit));
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub axis: Axis,
    pub node_test: NodeTest,
    pub predicates: Vec<Expression>,
}

impl Step {
    pub fn new(axis: Axis, node_test: NodeTest) -> Self {
        Self {
            axis,
            node_test,
            predicates: vec![],
        }
    }

    /// The `descendant-or-self::node()` step that `//` abbreviates.
    pub fn descendant_or_self() -> Self {
        Self::new(
            Axis::DescendantOrSelf,
            NodeTest::NodeType(NodeTypeTest::Node),
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Child,
    Descendant,
    DescendantOrSelf,
    Attribute,
    Parent,
    Ancestor,
    AncestorOrSelf,
    SelfAxis,
    FollowingSibling,
    PrecedingSibling,
    Following,
    Preceding,
}

impl Axis {
    /// Reverse axes number their nodes in reverse document order for predicates.
    pub fn is_reverse(self) -> bool {
        matches!(
            self,
            Axis::Ancestor | Axis::AncestorOrSelf | Axis::PrecedingSibling | Axis::Preceding
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeTest {
    /// A name test such as `foo` or `xsl:if`.
    Name {
        prefix: Option<String>,
        local: String,
    },
    /// `*`
    Wildcard,
    /// `prefix:*`
    NamespaceWildcard(String),
    /// `text()`, `node()` and friends.
    NodeType(NodeTypeTest),
    /// `processing-instruction('target')`
    ProcessingInstruction(String),
}

impl NodeTest {
    /// Builds a name test from a lexical QName.
    pub fn name(qname: &str) -> Self {
        match qname.split_once(':') {
            Some((prefix, local)) => NodeTest::Name {
                prefix: Some(prefix.to_string()),
                local: local.to_string(),
            },
            None => NodeTest::Name {
                prefix: None,
                local: qname.to_string(),
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeTypeTest {
    Text,
    Node,
    Comment,
    ProcessingInstruction,
}
