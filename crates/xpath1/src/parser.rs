//! A `nom`-based parser for the XPath 1.0 expression language.

use super::ast::*;
use crate::error::XPathError;
use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::{tag, take_while, take_while1},
    character::complete::{char, multispace0},
    combinator::{map, not, opt, peek, recognize},
    multi::{many0, separated_list0},
    sequence::{delimited, pair, preceded, terminated},
};

pub fn parse_expression(input: &str) -> Result<Expression, XPathError> {
    match expression(input.trim()) {
        Ok(("", expr)) => Ok(expr),
        Ok((rem, _)) => Err(XPathError::XPathParse(
            input.to_string(),
            format!("Parser did not consume all input. Remainder: '{}'", rem),
        )),
        Err(e) => Err(XPathError::XPathParse(input.to_string(), e.to_string())),
    }
}

// --- Combinators & Helpers ---

fn ws<'a, F, O, E>(inner: F) -> impl Parser<&'a str, Output = O, Error = E>
where
    F: Parser<&'a str, Output = O, Error = E>,
    E: nom::error::ParseError<&'a str>,
{
    delimited(multispace0, inner, multispace0)
}

fn build_binary_expr_parser<'a, F, G>(
    sub_expr_parser: F,
    op_parser: G,
) -> impl FnMut(&'a str) -> IResult<&'a str, Expression>
where
    F: Parser<&'a str, Output = Expression, Error = nom::error::Error<&'a str>> + Clone,
    G: Parser<&'a str, Output = BinaryOperator, Error = nom::error::Error<&'a str>> + Clone,
{
    move |input: &str| {
        let (input, mut left) = sub_expr_parser.clone().parse(input)?;
        let (input, remainder) =
            many0(pair(ws(op_parser.clone()), sub_expr_parser.clone())).parse(input)?;

        for (op, right) in remainder {
            left = Expression::BinaryOp {
                left: Box::new(left),
                op,
                right: Box::new(right),
            };
        }
        Ok((input, left))
    }
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '-' | '.')
}

/// An operator name such as `and` or `div`, not followed by more name characters.
fn keyword<'a>(word: &'static str) -> impl Parser<&'a str, Output = &'a str, Error = nom::error::Error<&'a str>> {
    terminated(tag(word), not(peek(take_while1(is_name_char))))
}

// --- Expression Parsers (in order of precedence) ---

fn expression(input: &str) -> IResult<&str, Expression> {
    or_expr(input)
}

fn or_op(input: &str) -> IResult<&str, BinaryOperator> {
    map(keyword("or"), |_| BinaryOperator::Or).parse(input)
}

fn and_op(input: &str) -> IResult<&str, BinaryOperator> {
    map(keyword("and"), |_| BinaryOperator::And).parse(input)
}

fn or_expr(input: &str) -> IResult<&str, Expression> {
    build_binary_expr_parser(and_expr, or_op)(input)
}

fn and_expr(input: &str) -> IResult<&str, Expression> {
    build_binary_expr_parser(equality_expr, and_op)(input)
}

fn equality_op(input: &str) -> IResult<&str, BinaryOperator> {
    alt((
        map(tag("="), |_| BinaryOperator::Equals),
        map(tag("!="), |_| BinaryOperator::NotEquals),
    ))
    .parse(input)
}

fn relational_op(input: &str) -> IResult<&str, BinaryOperator> {
    alt((
        map(tag("<="), |_| BinaryOperator::LessThanOrEqual),
        map(tag(">="), |_| BinaryOperator::GreaterThanOrEqual),
        map(tag("<"), |_| BinaryOperator::LessThan),
        map(tag(">"), |_| BinaryOperator::GreaterThan),
    ))
    .parse(input)
}

fn additive_op(input: &str) -> IResult<&str, BinaryOperator> {
    alt((
        map(char('+'), |_| BinaryOperator::Plus),
        map(char('-'), |_| BinaryOperator::Minus),
    ))
    .parse(input)
}

fn multiplicative_op(input: &str) -> IResult<&str, BinaryOperator> {
    alt((
        map(char('*'), |_| BinaryOperator::Multiply),
        map(keyword("div"), |_| BinaryOperator::Divide),
        map(keyword("mod"), |_| BinaryOperator::Modulo),
    ))
    .parse(input)
}

fn union_op(input: &str) -> IResult<&str, BinaryOperator> {
    map(char('|'), |_| BinaryOperator::Union).parse(input)
}

fn equality_expr(input: &str) -> IResult<&str, Expression> {
    build_binary_expr_parser(relational_expr, equality_op)(input)
}

fn relational_expr(input: &str) -> IResult<&str, Expression> {
    build_binary_expr_parser(additive_expr, relational_op)(input)
}

fn additive_expr(input: &str) -> IResult<&str, Expression> {
    build_binary_expr_parser(multiplicative_expr, additive_op)(input)
}

fn multiplicative_expr(input: &str) -> IResult<&str, Expression> {
    build_binary_expr_parser(unary_expr, multiplicative_op)(input)
}

fn unary_expr(input: &str) -> IResult<&str, Expression> {
    if let Ok((i, _)) = ws(char::<&str, nom::error::Error<&str>>('-')).parse(input) {
        let (i, expr) = unary_expr(i)?;
        return Ok((
            i,
            Expression::UnaryOp {
                op: UnaryOperator::Minus,
                expr: Box::new(expr),
            },
        ));
    }
    union_expr(input)
}

fn union_expr(input: &str) -> IResult<&str, Expression> {
    build_binary_expr_parser(path_expr, union_op)(input)
}

/// A location path, or a filter expression optionally followed by more steps.
fn path_expr(input: &str) -> IResult<&str, Expression> {
    // Primary expressions go first: `position()` would otherwise be read as a
    // step named `position`.
    let (i, start_expr) = alt((filter_expr, map(location_path, Expression::LocationPath))).parse(input)?;
    let (i, remainder) = many0(pair(path_separator, step)).parse(i)?;

    if remainder.is_empty() {
        return Ok((i, start_expr));
    }

    let (start_point, is_absolute, mut steps) = match start_expr {
        Expression::LocationPath(lp) => (lp.start_point, lp.is_absolute, lp.steps),
        other => (Some(Box::new(other)), false, vec![]),
    };
    push_steps(&mut steps, remainder);

    Ok((
        i,
        Expression::LocationPath(LocationPath {
            start_point,
            is_absolute,
            steps,
        }),
    ))
}

fn path_separator(input: &str) -> IResult<&str, &str> {
    ws(alt((tag("//"), tag("/")))).parse(input)
}

fn push_steps(steps: &mut Vec<Step>, remainder: Vec<(&str, Step)>) {
    for (sep, next_step) in remainder {
        if sep == "//" {
            steps.push(Step::descendant_or_self());
        }
        steps.push(next_step);
    }
}

fn filter_expr(input: &str) -> IResult<&str, Expression> {
    let (i, primary) = primary_expr(input)?;
    let (i, predicates) = many0(predicate).parse(i)?;
    if predicates.is_empty() {
        Ok((i, primary))
    } else {
        Ok((
            i,
            Expression::Filter {
                primary: Box::new(primary),
                predicates,
            },
        ))
    }
}

fn primary_expr(input: &str) -> IResult<&str, Expression> {
    ws(alt((
        variable_reference,
        map(number, Expression::Number),
        map(string_literal, Expression::Literal),
        function_call,
        delimited(ws(char('(')), expression, ws(char(')'))),
    )))
    .parse(input)
}

// --- Literals ---

/// `Digits ('.' Digits?)? | '.' Digits`. Exponents and signs are not part of
/// XPath 1.0 number literals.
fn number(input: &str) -> IResult<&str, f64> {
    let digits = |s: &str| s.bytes().take_while(u8::is_ascii_digit).count();
    let integer = digits(input);
    let mut end = integer;
    if input[end..].starts_with('.') {
        let fraction = digits(&input[end + 1..]);
        if integer > 0 || fraction > 0 {
            end += 1 + fraction;
        }
    }
    if end == 0 {
        return Err(nom::Err::Error(nom::error::Error::new(
            input,
            nom::error::ErrorKind::Digit,
        )));
    }
    match input[..end].parse::<f64>() {
        Ok(value) => Ok((&input[end..], value)),
        Err(_) => Err(nom::Err::Error(nom::error::Error::new(
            input,
            nom::error::ErrorKind::Float,
        ))),
    }
}

pub fn string_literal(input: &str) -> IResult<&str, String> {
    map(
        alt((
            delimited(char('\''), take_while(|c| c != '\''), char('\'')),
            delimited(char('"'), take_while(|c| c != '"'), char('"')),
        )),
        |s: &str| s.to_string(),
    )
    .parse(input)
}

fn variable_reference(input: &str) -> IResult<&str, Expression> {
    map(preceded(char('$'), q_name), Expression::Variable).parse(input)
}

// --- Names and node tests ---

fn nc_name(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        take_while1(|c: char| c.is_alphabetic() || c == '_'),
        take_while(is_name_char),
    ))
    .parse(input)
}

fn q_name(input: &str) -> IResult<&str, String> {
    map(
        recognize(pair(nc_name, opt(pair(char(':'), nc_name)))),
        |s: &str| s.to_string(),
    )
    .parse(input)
}

fn node_type_test(input: &str) -> IResult<&str, NodeTest> {
    map(
        terminated(
            alt((
                tag("text"),
                tag("node"),
                tag("comment"),
                tag("processing-instruction"),
            )),
            pair(ws(char('(')), char(')')),
        ),
        |node_type: &str| match node_type {
            "text" => NodeTest::NodeType(NodeTypeTest::Text),
            "comment" => NodeTest::NodeType(NodeTypeTest::Comment),
            "processing-instruction" => NodeTest::NodeType(NodeTypeTest::ProcessingInstruction),
            _ => NodeTest::NodeType(NodeTypeTest::Node),
        },
    )
    .parse(input)
}

fn pi_target_test(input: &str) -> IResult<&str, NodeTest> {
    map(
        preceded(
            pair(tag("processing-instruction"), ws(char('('))),
            terminated(string_literal, ws(char(')'))),
        ),
        NodeTest::ProcessingInstruction,
    )
    .parse(input)
}

fn namespace_wildcard(input: &str) -> IResult<&str, NodeTest> {
    map(terminated(nc_name, tag(":*")), |prefix: &str| {
        NodeTest::NamespaceWildcard(prefix.to_string())
    })
    .parse(input)
}

pub fn node_test(input: &str) -> IResult<&str, NodeTest> {
    alt((
        map(char('*'), |_| NodeTest::Wildcard),
        node_type_test,
        pi_target_test,
        namespace_wildcard,
        map(q_name, |name| NodeTest::name(&name)),
    ))
    .parse(input)
}

// --- Paths ---

fn axis(input: &str) -> IResult<&str, Axis> {
    map(
        terminated(
            alt((
                tag("child"),
                tag("descendant-or-self"),
                tag("descendant"),
                tag("attribute"),
                tag("parent"),
                tag("ancestor-or-self"),
                tag("ancestor"),
                tag("self"),
                tag("following-sibling"),
                tag("preceding-sibling"),
                tag("following"),
                tag("preceding"),
            )),
            ws(tag("::")),
        ),
        |axis_str: &str| match axis_str {
            "descendant-or-self" => Axis::DescendantOrSelf,
            "descendant" => Axis::Descendant,
            "attribute" => Axis::Attribute,
            "parent" => Axis::Parent,
            "ancestor-or-self" => Axis::AncestorOrSelf,
            "ancestor" => Axis::Ancestor,
            "self" => Axis::SelfAxis,
            "following-sibling" => Axis::FollowingSibling,
            "preceding-sibling" => Axis::PrecedingSibling,
            "following" => Axis::Following,
            "preceding" => Axis::Preceding,
            _ => Axis::Child,
        },
    )
    .parse(input)
}

pub fn predicate(input: &str) -> IResult<&str, Expression> {
    delimited(ws(char('[')), expression, ws(char(']'))).parse(input)
}

pub fn step(input: &str) -> IResult<&str, Step> {
    let node = || NodeTest::NodeType(NodeTypeTest::Node);
    let (i, (axis, node_test)) = alt((
        map(tag(".."), |_| (Axis::Parent, node())),
        map(char('.'), |_| (Axis::SelfAxis, node())),
        map(preceded(ws(char('@')), node_test), |nt| (Axis::Attribute, nt)),
        map(pair(opt(axis), node_test), |(ax, nt)| {
            (ax.unwrap_or(Axis::Child), nt)
        }),
    ))
    .parse(input)?;
    let (i, predicates) = many0(predicate).parse(i)?;
    Ok((
        i,
        Step {
            axis,
            node_test,
            predicates,
        },
    ))
}

/// A path that does not start with a variable or function call.
fn location_path(input: &str) -> IResult<&str, LocationPath> {
    let (i, (is_absolute, mut steps)) = if let Ok((rem, _)) = tag::<&str, &str, nom::error::Error<&str>>("//").parse(input) {
        let (rem, first) = step(rem)?;
        (rem, (true, vec![Step::descendant_or_self(), first]))
    } else if let Ok((rem, _)) = char::<&str, nom::error::Error<&str>>('/').parse(input) {
        match step(rem) {
            Ok((rem, first)) => (rem, (true, vec![first])),
            // The root node on its own.
            Err(_) => (rem, (true, vec![])),
        }
    } else {
        let (rem, first) = step(input)?;
        (rem, (false, vec![first]))
    };

    let (i, remainder) = many0(pair(path_separator, step)).parse(i)?;
    push_steps(&mut steps, remainder);

    Ok((
        i,
        LocationPath {
            start_point: None,
            is_absolute,
            steps,
        },
    ))
}

pub fn function_call(input: &str) -> IResult<&str, Expression> {
    // Lookahead for '(' keeps `foo` in `foo/bar` a step.
    let (i, name) = q_name(input)?;
    let (i, _) = peek(ws(char('('))).parse(i)?;

    if matches!(
        name.as_str(),
        "text" | "node" | "comment" | "processing-instruction"
    ) {
        return Err(nom::Err::Error(nom::error::Error::new(
            input,
            nom::error::ErrorKind::Verify,
        )));
    }

    let (i, _) = multispace0(i)?;
    let (i, args) = delimited(
        char('('),
        separated_list0(ws(char(',')), expression),
        ws(char(')')),
    )
    .parse(i)?;

    Ok((i, Expression::FunctionCall { name, args }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn child(name: &str) -> Step {
        Step::new(Axis::Child, NodeTest::name(name))
    }

    fn path(steps: Vec<Step>) -> Expression {
        Expression::LocationPath(LocationPath {
            start_point: None,
            is_absolute: false,
            steps,
        })
    }

    #[test]
    fn test_parse_simple_path() {
        let result = parse_expression("foo/bar").unwrap();
        assert_eq!(result, path(vec![child("foo"), child("bar")]));
        assert_eq!(parse_expression("foo / bar").unwrap(), result);
    }

    #[test]
    fn test_parse_unary_minus() {
        let result = parse_expression("-5").unwrap();
        assert_eq!(
            result,
            Expression::UnaryOp {
                op: UnaryOperator::Minus,
                expr: Box::new(Expression::Number(5.0))
            }
        );

        let Expression::BinaryOp { left, op, right } = parse_expression("10 - -5").unwrap() else {
            panic!("Expected BinaryOp");
        };
        assert_eq!(op, BinaryOperator::Minus);
        assert_eq!(*left, Expression::Number(10.0));
        assert_eq!(
            *right,
            Expression::UnaryOp {
                op: UnaryOperator::Minus,
                expr: Box::new(Expression::Number(5.0))
            }
        );
        assert!(parse_expression("--5").is_ok());
    }

    #[test]
    fn test_parse_numbers() {
        assert_eq!(parse_expression("3.5").unwrap(), Expression::Number(3.5));
        assert_eq!(parse_expression(".5").unwrap(), Expression::Number(0.5));
        assert_eq!(parse_expression("1.25").unwrap(), Expression::Number(1.25));
        assert_eq!(parse_expression("7.").unwrap(), Expression::Number(7.0));
        assert_eq!(parse_expression(" 0.000001 ").unwrap(), Expression::Number(0.000001));
        let Expression::BinaryOp { left, right, .. } = parse_expression("0.1 + 0.2").unwrap() else {
            panic!("Expected BinaryOp");
        };
        assert_eq!(*left, Expression::Number(0.1));
        assert_eq!(*right, Expression::Number(0.2));
        // `info` and `nan` are element names, not numbers.
        assert_eq!(parse_expression("info").unwrap(), path(vec![child("info")]));
        assert_eq!(parse_expression("nan").unwrap(), path(vec![child("nan")]));
    }

    #[test]
    fn test_parse_axes() {
        let Expression::LocationPath(lp) = parse_expression("following-sibling::foo").unwrap() else {
            panic!("Expected LocationPath");
        };
        assert_eq!(lp.steps[0].axis, Axis::FollowingSibling);

        let Expression::LocationPath(lp) = parse_expression("ancestor-or-self::*").unwrap() else {
            panic!("Expected LocationPath");
        };
        assert_eq!(lp.steps[0].axis, Axis::AncestorOrSelf);
        assert_eq!(lp.steps[0].node_test, NodeTest::Wildcard);
    }

    #[test]
    fn test_parse_abbreviated_steps() {
        let self_node = Step::new(Axis::SelfAxis, NodeTest::NodeType(NodeTypeTest::Node));
        let parent_node = Step::new(Axis::Parent, NodeTest::NodeType(NodeTypeTest::Node));
        assert_eq!(parse_expression(".").unwrap(), path(vec![self_node]));
        assert_eq!(parse_expression("../foo").unwrap(), path(vec![parent_node, child("foo")]));
    }

    #[test]
    fn test_parse_name_tests() {
        let Expression::LocationPath(lp) = parse_expression("svg:rect/@xlink:href").unwrap() else {
            panic!("Expected LocationPath");
        };
        assert_eq!(
            lp.steps[0].node_test,
            NodeTest::Name {
                prefix: Some("svg".into()),
                local: "rect".into()
            }
        );
        assert_eq!(lp.steps[1].axis, Axis::Attribute);

        let Expression::LocationPath(lp) = parse_expression("svg:*").unwrap() else {
            panic!("Expected LocationPath");
        };
        assert_eq!(lp.steps[0].node_test, NodeTest::NamespaceWildcard("svg".into()));

        let Expression::LocationPath(lp) = parse_expression("processing-instruction('php')").unwrap() else {
            panic!("Expected LocationPath");
        };
        assert_eq!(lp.steps[0].node_test, NodeTest::ProcessingInstruction("php".into()));
    }

    #[test]
    fn test_parse_path_starting_with_variable() {
        let result = parse_expression("$myVar/foo/bar").unwrap();
        assert_eq!(
            result,
            Expression::LocationPath(LocationPath {
                start_point: Some(Box::new(Expression::Variable("myVar".to_string()))),
                is_absolute: false,
                steps: vec![child("foo"), child("bar")]
            })
        );
    }

    #[test]
    fn test_parse_filter_expression() {
        let result = parse_expression("$items[2]").unwrap();
        assert_eq!(
            result,
            Expression::Filter {
                primary: Box::new(Expression::Variable("items".into())),
                predicates: vec![Expression::Number(2.0)]
            }
        );
        let Expression::LocationPath(lp) = parse_expression("(//a)[1]/b").unwrap() else {
            panic!("Expected LocationPath");
        };
        assert!(matches!(lp.start_point.as_deref(), Some(Expression::Filter { .. })));
        assert_eq!(lp.steps, vec![child("b")]);
    }

    #[test]
    fn test_parse_predicate() {
        let result = parse_expression("foo[@id = 'a']").unwrap();
        let id_attr = path(vec![Step::new(Axis::Attribute, NodeTest::name("id"))]);
        let mut foo = child("foo");
        foo.predicates.push(Expression::BinaryOp {
            left: Box::new(id_attr),
            op: BinaryOperator::Equals,
            right: Box::new(Expression::Literal("a".into())),
        });
        assert_eq!(result, path(vec![foo]));
    }

    #[test]
    fn test_parse_function_in_predicate() {
        let Expression::LocationPath(lp) = parse_expression("para[position()=1]").unwrap() else {
            panic!("Expected LocationPath");
        };
        assert_eq!(lp.steps.len(), 1);
        assert!(lp.steps[0].predicates[0].is_binary_op());
    }

    #[test]
    fn test_parse_operator_precedence() {
        let result = parse_expression("1 + 2 * 3").unwrap();
        assert_eq!(
            result,
            Expression::BinaryOp {
                left: Box::new(Expression::Number(1.0)),
                op: BinaryOperator::Plus,
                right: Box::new(Expression::BinaryOp {
                    left: Box::new(Expression::Number(2.0)),
                    op: BinaryOperator::Multiply,
                    right: Box::new(Expression::Number(3.0)),
                }),
            }
        );
    }

    #[test]
    fn test_parse_boolean_logic() {
        let eq = |l: &str, r: &str| Expression::BinaryOp {
            left: Box::new(path(vec![child(l)])),
            op: BinaryOperator::Equals,
            right: Box::new(path(vec![child(r)])),
        };
        let result = parse_expression("a = b or c = d and e = f").unwrap();
        assert_eq!(
            result,
            Expression::BinaryOp {
                left: Box::new(eq("a", "b")),
                op: BinaryOperator::Or,
                right: Box::new(Expression::BinaryOp {
                    left: Box::new(eq("c", "d")),
                    op: BinaryOperator::And,
                    right: Box::new(eq("e", "f")),
                }),
            }
        );
    }

    #[test]
    fn test_operator_names_are_also_element_names() {
        assert_eq!(parse_expression("div").unwrap(), path(vec![child("div")]));
        assert_eq!(parse_expression("order").unwrap(), path(vec![child("order")]));
        let Expression::BinaryOp { op, .. } = parse_expression("div div mod").unwrap() else {
            panic!("Expected BinaryOp");
        };
        assert_eq!(op, BinaryOperator::Divide);
    }

    #[test]
    fn test_parse_descendant_or_self() {
        let result = parse_expression("//foo").unwrap();
        assert_eq!(
            result,
            Expression::LocationPath(LocationPath {
                start_point: None,
                is_absolute: true,
                steps: vec![Step::descendant_or_self(), child("foo")]
            })
        );
        let root_only = parse_expression("/").unwrap();
        assert_eq!(
            root_only,
            Expression::LocationPath(LocationPath {
                start_point: None,
                is_absolute: true,
                steps: vec![]
            })
        );
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            parse_expression("foo["),
            Err(XPathError::XPathParse(..))
        ));
        assert!(parse_expression("1 +").is_err());
        assert!(parse_expression("'unterminated").is_err());
    }
}
