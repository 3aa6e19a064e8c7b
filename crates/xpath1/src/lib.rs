//! An XPath 1.0 parser and evaluator over any tree implementing [`DocumentNode`].

pub mod ast;
pub mod axes;
pub mod engine;
pub mod error;
pub mod functions;
pub mod node;
pub mod operators;
pub mod parser;
pub mod value;

pub use ast::{Axis, BinaryOperator, Expression, LocationPath, NodeTest, NodeTypeTest, Step};
pub use engine::{EvaluationContext, KeyIndexes, Variables, evaluate, evaluate_str, matches_node_test};
pub use error::XPathError;
pub use functions::{FunctionRegistry, XSLT_NAMESPACE};
pub use node::{DocumentNode, NodeType, QName, XML_NAMESPACE};
pub use parser::parse_expression;
pub use value::{Value, number_to_string, parse_number};
