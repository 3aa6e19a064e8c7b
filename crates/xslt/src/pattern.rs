//! A dedicated engine for parsing and evaluating XSLT `match` patterns.
use crate::error::XsltError;
use nom::branch::alt;
use nom::bytes::complete::tag;
use nom::character::complete::{char, multispace0};
use nom::combinator::{consumed, map, opt};
use nom::multi::{many0, separated_list1};
use nom::sequence::{delimited, pair, terminated};
use nom::{IResult, Parser};
use std::fmt;
use xslview_xpath1::parser::{function_call, node_test, predicate};
use xslview_xpath1::{
    Axis, DocumentNode, EvaluationContext, Expression, NodeTest, NodeType, XPathError, evaluate,
    matches_node_test,
};

/// A single step of a match pattern, e.g. `item[@id]` or `@href`.
#[derive(Debug, Clone, PartialEq)]
struct StepPattern {
    axis: Axis,
    node_test: NodeTest,
    predicates: Vec<Expression>,
    /// Joined to the previous step (or the anchor) by `//` rather than `/`.
    descendant: bool,
}

/// What the leftmost step of a path is anchored to.
#[derive(Debug, Clone, PartialEq)]
enum Anchor {
    Relative,
    Root,
    /// An `id('...')` or `key('...', '...')` call.
    IdKey(Expression),
}

/// A single location path within a pattern, e.g. `/doc/section//para`.
#[derive(Debug, Clone, PartialEq)]
struct LocationPathPattern {
    anchor: Anchor,
    steps: Vec<StepPattern>,
    text: String,
}

/// A compiled representation of an XSLT match pattern.
#[derive(Debug, Clone, PartialEq)]
pub struct Pattern {
    /// A pattern can be a union of multiple paths, e.g., "para|note".
    paths: Vec<LocationPathPattern>,
    original_text: String,
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.original_text)
    }
}

impl Pattern {
    /// Evaluates if a given node matches this compiled pattern. `e_ctx`
    /// supplies the root, variables and keys predicates may need.
    pub fn matches<'a, N>(&self, node: N, e_ctx: &EvaluationContext<'a, '_, N>) -> Result<bool, XPathError>
    where
        N: DocumentNode<'a> + 'a,
    {
        for path in &self.paths {
            if path.matches(node, e_ctx)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Splits a union pattern into one pattern per alternative.
    pub fn alternatives(&self) -> Vec<Pattern> {
        self.paths
            .iter()
            .map(|path| Pattern {
                paths: vec![path.clone()],
                original_text: path.text.clone(),
            })
            .collect()
    }

    /// The XSLT 1.0 default priority. For a union this is the highest
    /// priority of its alternatives; rules register alternatives separately.
    pub fn default_priority(&self) -> f64 {
        self.paths
            .iter()
            .map(LocationPathPattern::default_priority)
            .fold(f64::NEG_INFINITY, f64::max)
    }
}

impl LocationPathPattern {
    fn default_priority(&self) -> f64 {
        match (&self.anchor, self.steps.as_slice()) {
            (Anchor::Relative, [step]) if step.predicates.is_empty() => match step.node_test {
                NodeTest::Name { .. } | NodeTest::ProcessingInstruction(_) => 0.0,
                NodeTest::NamespaceWildcard(_) => -0.25,
                NodeTest::Wildcard | NodeTest::NodeType(_) => -0.5,
            },
            _ => 0.5,
        }
    }

    fn matches<'a, N>(&self, node: N, e_ctx: &EvaluationContext<'a, '_, N>) -> Result<bool, XPathError>
    where
        N: DocumentNode<'a> + 'a,
    {
        if self.steps.is_empty() {
            return match &self.anchor {
                // Special case for "/"
                Anchor::Root => Ok(node.node_type() == NodeType::Root),
                Anchor::IdKey(call) => Ok(anchor_nodes(call, node, e_ctx)?.contains(&node)),
                Anchor::Relative => Ok(false),
            };
        }
        self.match_step(self.steps.len() - 1, node, e_ctx)
    }

    /// Matches steps right to left, walking up from `node`.
    fn match_step<'a, N>(
        &self,
        index: usize,
        node: N,
        e_ctx: &EvaluationContext<'a, '_, N>,
    ) -> Result<bool, XPathError>
    where
        N: DocumentNode<'a> + 'a,
    {
        let step = &self.steps[index];
        if !step.matches(node, e_ctx)? {
            return Ok(false);
        }
        if index == 0 {
            return self.match_anchor(step.descendant, node, e_ctx);
        }

        let mut parent = node.parent();
        if !step.descendant {
            return match parent {
                Some(p) => self.match_step(index - 1, p, e_ctx),
                None => Ok(false),
            };
        }
        while let Some(p) = parent {
            if self.match_step(index - 1, p, e_ctx)? {
                return Ok(true);
            }
            parent = p.parent();
        }
        Ok(false)
    }

    fn match_anchor<'a, N>(
        &self,
        descendant: bool,
        node: N,
        e_ctx: &EvaluationContext<'a, '_, N>,
    ) -> Result<bool, XPathError>
    where
        N: DocumentNode<'a> + 'a,
    {
        match &self.anchor {
            Anchor::Relative => Ok(true),
            Anchor::Root if descendant => Ok(true),
            Anchor::Root => Ok(node
                .parent()
                .is_some_and(|p| p.node_type() == NodeType::Root)),
            Anchor::IdKey(call) => {
                let anchors = anchor_nodes(call, node, e_ctx)?;
                let mut parent = node.parent();
                if !descendant {
                    return Ok(parent.is_some_and(|p| anchors.contains(&p)));
                }
                while let Some(p) = parent {
                    if anchors.contains(&p) {
                        return Ok(true);
                    }
                    parent = p.parent();
                }
                Ok(false)
            }
        }
    }
}

fn anchor_nodes<'a, N>(
    call: &Expression,
    node: N,
    e_ctx: &EvaluationContext<'a, '_, N>,
) -> Result<Vec<N>, XPathError>
where
    N: DocumentNode<'a> + 'a,
{
    evaluate(call, &e_ctx.focus(node, 1, 1))?.into_nodes("An id() or key() pattern")
}

impl StepPattern {
    /// Whether `node` satisfies the node test, ignoring predicates.
    fn test<'a, N>(&self, node: N, e_ctx: &EvaluationContext<'a, '_, N>) -> Result<bool, XPathError>
    where
        N: DocumentNode<'a> + 'a,
    {
        let kind_ok = match self.axis {
            Axis::Attribute => node.node_type() == NodeType::Attribute,
            _ => !matches!(node.node_type(), NodeType::Attribute | NodeType::Root),
        };
        if !kind_ok {
            return Ok(false);
        }
        let namespace = match &self.node_test {
            NodeTest::Name {
                prefix: Some(prefix),
                ..
            }
            | NodeTest::NamespaceWildcard(prefix) => e_ctx.resolve_prefix(prefix)?,
            _ => None,
        };
        Ok(matches_node_test(node, &self.node_test, self.axis, namespace))
    }

    fn matches<'a, N>(&self, node: N, e_ctx: &EvaluationContext<'a, '_, N>) -> Result<bool, XPathError>
    where
        N: DocumentNode<'a> + 'a,
    {
        if !self.test(node, e_ctx)? {
            return Ok(false);
        }
        if self.predicates.is_empty() {
            return Ok(true);
        }
        let Some(parent) = node.parent() else {
            return Ok(false);
        };

        // Predicates see the node among its siblings that pass the same test.
        let siblings: Box<dyn Iterator<Item = N> + 'a> = match self.axis {
            Axis::Attribute => parent.attributes(),
            _ => parent.children(),
        };
        let mut candidates = Vec::new();
        for sibling in siblings {
            if self.test(sibling, e_ctx)? {
                candidates.push(sibling);
            }
        }

        for predicate in &self.predicates {
            let size = candidates.len();
            let mut kept = Vec::with_capacity(size);
            for (i, candidate) in candidates.into_iter().enumerate() {
                let keep = match evaluate(predicate, &e_ctx.focus(candidate, i + 1, size))? {
                    xslview_xpath1::Value::Number(n) => n == (i + 1) as f64,
                    other => other.to_bool(),
                };
                if keep {
                    kept.push(candidate);
                }
            }
            if !kept.contains(&node) {
                return Ok(false);
            }
            candidates = kept;
        }
        Ok(true)
    }
}

// --- Parser ---

pub fn parse(text: &str) -> Result<Pattern, XsltError> {
    match pattern_parser(text.trim()) {
        Ok(("", paths)) => Ok(Pattern {
            paths,
            original_text: text.trim().to_string(),
        }),
        Ok((rem, _)) => Err(XsltError::XPath(XPathError::XPathParse(
            text.to_string(),
            format!("Unconsumed input in pattern: {}", rem),
        ))),
        Err(e) => Err(XsltError::XPath(XPathError::XPathParse(
            text.to_string(),
            e.to_string(),
        ))),
    }
}

fn ws<'a, F, O>(inner: F) -> impl Parser<&'a str, Output = O, Error = nom::error::Error<&'a str>>
where
    F: Parser<&'a str, Output = O, Error = nom::error::Error<&'a str>>,
{
    delimited(multispace0, inner, multispace0)
}

fn separator(input: &str) -> IResult<&str, bool> {
    ws(alt((map(tag("//"), |_| true), map(char('/'), |_| false)))).parse(input)
}

fn step_parser(input: &str) -> IResult<&str, StepPattern> {
    let (i, axis) = opt(alt((
        map(ws(char('@')), |_| Axis::Attribute),
        map(terminated(tag("attribute"), ws(tag("::"))), |_| Axis::Attribute),
        map(terminated(tag("child"), ws(tag("::"))), |_| Axis::Child),
    )))
    .parse(input)?;
    let (i, node_test) = node_test(i)?;
    let (i, predicates) = many0(predicate).parse(i)?;
    Ok((
        i,
        StepPattern {
            axis: axis.unwrap_or(Axis::Child),
            node_test,
            predicates,
            descendant: false,
        },
    ))
}

fn relative_path(input: &str) -> IResult<&str, Vec<StepPattern>> {
    let (i, first) = step_parser(input)?;
    let (i, rest) = many0(pair(separator, step_parser)).parse(i)?;
    let mut steps = vec![first];
    for (descendant, mut step) in rest {
        step.descendant = descendant;
        steps.push(step);
    }
    Ok((i, steps))
}

fn id_key_call(input: &str) -> IResult<&str, Expression> {
    let (i, call) = function_call(input)?;
    let valid = match &call {
        Expression::FunctionCall { name, args } => {
            let literal_args = args.iter().all(|a| matches!(a, Expression::Literal(_)));
            literal_args
                && ((name == "id" && args.len() == 1) || (name == "key" && args.len() == 2))
        }
        _ => false,
    };
    if !valid {
        return Err(nom::Err::Error(nom::error::Error::new(
            input,
            nom::error::ErrorKind::Verify,
        )));
    }
    Ok((i, call))
}

fn path_parser(input: &str) -> IResult<&str, LocationPathPattern> {
    let pattern = |anchor, steps| LocationPathPattern {
        anchor,
        steps,
        text: String::new(),
    };

    if let Ok((rem, _)) = tag::<&str, &str, nom::error::Error<&str>>("//").parse(input) {
        let (rem, mut steps) = relative_path(rem)?;
        steps[0].descendant = true;
        return Ok((rem, pattern(Anchor::Root, steps)));
    }
    if let Ok((rem, _)) = char::<&str, nom::error::Error<&str>>('/').parse(input) {
        // An absolute path can be just `/` or have steps like `/*` or `/root/item`.
        return Ok(match relative_path(rem) {
            Ok((rem, steps)) => (rem, pattern(Anchor::Root, steps)),
            Err(_) => (rem, pattern(Anchor::Root, vec![])),
        });
    }
    if let Ok((rem, call)) = id_key_call(input) {
        let (rem, tail) = opt(pair(separator, relative_path)).parse(rem)?;
        let steps = match tail {
            Some((descendant, mut steps)) => {
                steps[0].descendant = descendant;
                steps
            }
            None => vec![],
        };
        return Ok((rem, pattern(Anchor::IdKey(call), steps)));
    }
    // A relative path must have at least one step.
    let (rem, steps) = relative_path(input)?;
    Ok((rem, pattern(Anchor::Relative, steps)))
}

fn pattern_parser(input: &str) -> IResult<&str, Vec<LocationPathPattern>> {
    map(
        separated_list1(ws(char('|')), consumed(path_parser)),
        |paths: Vec<(&str, LocationPathPattern)>| {
            paths
                .into_iter()
                .map(|(text, mut path)| {
                    path.text = text.trim().to_string();
                    path
                })
                .collect()
        },
    )
    .parse(input)
}

#[cfg(test)]
mod tests {
    use super::*;
    use xslview_xpath1::node::mock::{MockNode, create_test_tree};
    use xslview_xpath1::{FunctionRegistry, Variables};

    fn check(pattern: &str, node: MockNode, root: MockNode) -> bool {
        let funcs = FunctionRegistry::default();
        let vars = Variables::new();
        let e_ctx = EvaluationContext::new(root, root, &funcs, &vars);
        parse(pattern).unwrap().matches(node, &e_ctx).unwrap()
    }

    #[test]
    fn test_pattern_parsing() {
        for text in [
            "foo",
            "foo/bar",
            "/",
            "/*",
            "/root/item",
            "foo|bar",
            "text()",
            "@id",
            "*",
            "foo/*/@id",
            "//item",
            "section//para",
            "item[@id='x'][1]",
            "child::item",
            "attribute::*",
            "key('k', 'v')/item",
            "id('a')",
            "svg:*",
            "processing-instruction('pi')",
        ] {
            assert!(parse(text).is_ok(), "failed to parse '{}'", text);
        }
        assert!(parse("").is_err());
        assert!(parse("foo/").is_err());
        assert!(parse("concat('a')").is_err());
    }

    #[test]
    fn test_simple_name_match() {
        let tree = create_test_tree();
        let root = tree.root();
        assert!(check("para", tree.node(1), root));
        assert!(!check("para", root, root));
        assert!(!check("para", tree.node(6), root));
    }

    #[test]
    fn test_absolute_wildcard_match() {
        let tree = create_test_tree();
        let root = tree.root();
        assert!(check("/*", tree.node(1), root));
        assert!(!check("/*", root, root));
        assert!(!check("/*", tree.node(4), root));
    }

    #[test]
    fn test_path_match() {
        let tree = create_test_tree();
        let root = tree.root();
        assert!(check("para/text()", tree.node(4), root));
        assert!(check("para/text()", tree.node(9), root));
        assert!(!check("para/text()", tree.node(1), root));
        assert!(check("//text()", tree.node(9), root));
    }

    #[test]
    fn test_root_pattern() {
        let tree = create_test_tree();
        let root = tree.root();
        assert!(check("/", root, root));
        assert!(!check("/", tree.node(1), root));
        assert!(!check("node()", root, root));
    }

    #[test]
    fn test_union_match() {
        let tree = create_test_tree();
        let root = tree.root();
        assert!(check("nonexistent|para", tree.node(1), root));
        assert!(check("nonexistent | comment()", tree.node(5), root));
    }

    #[test]
    fn test_attribute_match() {
        let tree = create_test_tree();
        let root = tree.root();
        assert!(check("@id", tree.node(2), root));
        assert!(check("para/@*", tree.node(3), root));
        assert!(!check("@id", tree.node(1), root));
        assert!(!check("*", tree.node(2), root));
    }

    #[test]
    fn test_positional_predicates_count_matching_siblings() {
        let tree = create_test_tree();
        let root = tree.root();
        assert!(check("para[1]", tree.node(1), root));
        assert!(!check("para[1]", tree.node(8), root));
        assert!(check("para[2]", tree.node(8), root));
        assert!(check("para[last()]", tree.node(8), root));
        assert!(check("para[@id='p1']", tree.node(1), root));
        assert!(!check("para[@id='p1']", tree.node(8), root));
    }

    #[test]
    fn test_default_priorities() {
        assert_eq!(parse("para").unwrap().default_priority(), 0.0);
        assert_eq!(parse("@id").unwrap().default_priority(), 0.0);
        assert_eq!(parse("svg:*").unwrap().default_priority(), -0.25);
        assert_eq!(parse("*").unwrap().default_priority(), -0.5);
        assert_eq!(parse("text()").unwrap().default_priority(), -0.5);
        assert_eq!(parse("para[1]").unwrap().default_priority(), 0.5);
        assert_eq!(parse("doc/para").unwrap().default_priority(), 0.5);
        assert_eq!(parse("/").unwrap().default_priority(), 0.5);
    }

    #[test]
    fn test_alternatives_keep_their_text() {
        let pattern = parse("a | b/c").unwrap();
        let alternatives = pattern.alternatives();
        assert_eq!(alternatives.len(), 2);
        assert_eq!(alternatives[0].to_string(), "a");
        assert_eq!(alternatives[1].to_string(), "b/c");
        assert_eq!(alternatives[1].default_priority(), 0.5);
    }
}
