//! The XPath 1.0 core function library plus the functions XSLT 1.0 adds.

use crate::engine::EvaluationContext;
use crate::error::XPathError;
use crate::node::{DocumentNode, NodeType};
use crate::value::{Value, parse_number};
use std::collections::HashSet;
use std::collections::hash_map::DefaultHasher;
use std::hash::Hasher;

/// The XSLT namespace, as `system-property` and `element-available` see it.
pub const XSLT_NAMESPACE: &str = "http://www.w3.org/1999/XSL/Transform";

const CORE_FUNCTIONS: &[&str] = &[
    // Node-set
    "last",
    "position",
    "count",
    "id",
    "local-name",
    "namespace-uri",
    "name",
    // String
    "string",
    "concat",
    "starts-with",
    "contains",
    "substring-before",
    "substring-after",
    "substring",
    "string-length",
    "normalize-space",
    "translate",
    // Boolean
    "boolean",
    "not",
    "true",
    "false",
    "lang",
    // Number
    "number",
    "sum",
    "floor",
    "ceiling",
    "round",
];

const XSLT_FUNCTIONS: &[&str] = &[
    "key",
    "generate-id",
    "current",
    "system-property",
    "element-available",
    "function-available",
    "format-number",
];

/// The functions and instructions a host makes available, as reported by
/// `function-available()` and `element-available()`.
#[derive(Debug, Clone)]
pub struct FunctionRegistry {
    functions: HashSet<&'static str>,
    elements: HashSet<String>,
}

impl FunctionRegistry {
    pub fn new() -> Self {
        Self {
            functions: HashSet::new(),
            elements: HashSet::new(),
        }
    }

    pub fn register(&mut self, name: &'static str) {
        self.functions.insert(name);
    }

    /// Records an XSLT instruction by its local name.
    pub fn register_element(&mut self, local_name: &str) {
        self.elements.insert(local_name.to_string());
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains(name)
    }

    pub fn contains_element(&self, local_name: &str) -> bool {
        self.elements.contains(local_name)
    }
}

impl Default for FunctionRegistry {
    fn default() -> Self {
        let mut registry = Self::new();
        for name in CORE_FUNCTIONS.iter().chain(XSLT_FUNCTIONS).copied() {
            registry.register(name);
        }
        registry
    }
}

fn expect_args<N>(name: &str, args: &[Value<N>], min: usize, max: usize) -> Result<(), XPathError> {
    if args.len() < min || args.len() > max {
        let expected = if min == max {
            format!("{} argument{}", min, if min == 1 { "" } else { "s" })
        } else if max == usize::MAX {
            format!("at least {} arguments", min)
        } else {
            format!("{} or {} arguments", min, max)
        };
        return Err(XPathError::arity(name, &expected));
    }
    Ok(())
}

/// Dispatches a function call to its implementation.
pub fn evaluate_function<'a, 'd, N: DocumentNode<'a>>(
    name: &str,
    args: Vec<Value<N>>,
    e_ctx: &EvaluationContext<'a, 'd, N>,
) -> Result<Value<N>, XPathError> {
    if !e_ctx.functions.contains(name) {
        return Err(XPathError::FunctionError {
            function: name.to_string(),
            message: "Unknown XPath function".to_string(),
        });
    }
    match name {
        // Node-set
        "last" => {
            expect_args(name, &args, 0, 0)?;
            Ok(Value::Number(e_ctx.context_size as f64))
        }
        "position" => {
            expect_args(name, &args, 0, 0)?;
            Ok(Value::Number(e_ctx.context_position as f64))
        }
        "count" => {
            expect_args(name, &args, 1, 1)?;
            let nodes = single(args).into_nodes("count() argument")?;
            Ok(Value::Number(nodes.len() as f64))
        }
        "id" => func_id(args, e_ctx),
        "local-name" | "name" | "namespace-uri" => func_node_name(name, args, e_ctx),

        // String
        "string" => {
            expect_args(name, &args, 0, 1)?;
            Ok(Value::String(string_arg_or_context(args, e_ctx)))
        }
        "concat" => {
            expect_args(name, &args, 2, usize::MAX)?;
            Ok(Value::String(args.iter().map(|v| v.to_string()).collect()))
        }
        "starts-with" => {
            expect_args(name, &args, 2, 2)?;
            let (s1, s2) = two_strings(args);
            Ok(Value::Boolean(s1.starts_with(&s2)))
        }
        "contains" => {
            expect_args(name, &args, 2, 2)?;
            let (s1, s2) = two_strings(args);
            Ok(Value::Boolean(s1.contains(&s2)))
        }
        "substring-before" => {
            expect_args(name, &args, 2, 2)?;
            let (s1, s2) = two_strings(args);
            let before = s1.find(&s2).map(|i| &s1[..i]).unwrap_or("");
            Ok(Value::String(before.to_string()))
        }
        "substring-after" => {
            expect_args(name, &args, 2, 2)?;
            let (s1, s2) = two_strings(args);
            let after = s1.find(&s2).map(|i| &s1[i + s2.len()..]).unwrap_or("");
            Ok(Value::String(after.to_string()))
        }
        "substring" => func_substring(args),
        "string-length" => {
            expect_args(name, &args, 0, 1)?;
            let s = string_arg_or_context(args, e_ctx);
            Ok(Value::Number(s.chars().count() as f64))
        }
        "normalize-space" => {
            expect_args(name, &args, 0, 1)?;
            let s = string_arg_or_context(args, e_ctx);
            Ok(Value::String(s.split_whitespace().collect::<Vec<_>>().join(" ")))
        }
        "translate" => func_translate(args),

        // Boolean
        "boolean" => {
            expect_args(name, &args, 1, 1)?;
            Ok(Value::Boolean(single(args).to_bool()))
        }
        "not" => {
            expect_args(name, &args, 1, 1)?;
            Ok(Value::Boolean(!single(args).to_bool()))
        }
        "true" | "false" => {
            expect_args(name, &args, 0, 0)?;
            Ok(Value::Boolean(name == "true"))
        }
        "lang" => func_lang(args, e_ctx),

        // Number
        "number" => {
            expect_args(name, &args, 0, 1)?;
            let n = match args.into_iter().next() {
                Some(v) => v.to_number(),
                None => parse_number(&e_ctx.context_node.string_value()),
            };
            Ok(Value::Number(n))
        }
        "sum" => {
            expect_args(name, &args, 1, 1)?;
            let nodes = single(args).into_nodes("sum() argument")?;
            let sum = nodes
                .iter()
                .map(|node| parse_number(&node.string_value()))
                .sum();
            Ok(Value::Number(sum))
        }
        "floor" => {
            expect_args(name, &args, 1, 1)?;
            Ok(Value::Number(single(args).to_number().floor()))
        }
        "ceiling" => {
            expect_args(name, &args, 1, 1)?;
            Ok(Value::Number(single(args).to_number().ceil()))
        }
        "round" => {
            expect_args(name, &args, 1, 1)?;
            Ok(Value::Number(xpath_round(single(args).to_number())))
        }

        // XSLT
        "key" => func_key(args, e_ctx),
        "generate-id" => func_generate_id(args, e_ctx),
        "current" => {
            expect_args(name, &args, 0, 0)?;
            Ok(Value::NodeSet(vec![e_ctx.current_node]))
        }
        "system-property" => {
            expect_args(name, &args, 1, 1)?;
            Ok(system_property(&single(args).to_string(), e_ctx))
        }
        "element-available" => {
            expect_args(name, &args, 1, 1)?;
            let qname = single(args).to_string();
            let available = match qname.split_once(':') {
                Some((prefix, local)) => {
                    is_xslt_prefix(prefix, e_ctx) && e_ctx.functions.contains_element(local)
                }
                None => false,
            };
            Ok(Value::Boolean(available))
        }
        "function-available" => {
            expect_args(name, &args, 1, 1)?;
            let fname = single(args).to_string();
            Ok(Value::Boolean(e_ctx.functions.contains(&fname)))
        }
        "format-number" => {
            expect_args(name, &args, 2, 3)?;
            let mut args = args.into_iter();
            let number = args.next().map(|v| v.to_number()).unwrap_or(f64::NAN);
            let pattern = args.next().map(|v| v.to_string()).unwrap_or_default();
            Ok(Value::String(format_number(number, &pattern)))
        }
        _ => Err(XPathError::FunctionError {
            function: name.to_string(),
            message: "Unknown XPath function".to_string(),
        }),
    }
}

fn single<N>(args: Vec<Value<N>>) -> Value<N> {
    args.into_iter()
        .next()
        .unwrap_or(Value::String(String::new()))
}

fn two_strings<'a, N: DocumentNode<'a>>(args: Vec<Value<N>>) -> (String, String) {
    let mut args = args.into_iter().map(|v| v.to_string());
    let first = args.next().unwrap_or_default();
    let second = args.next().unwrap_or_default();
    (first, second)
}

fn string_arg_or_context<'a, N: DocumentNode<'a>>(
    args: Vec<Value<N>>,
    e_ctx: &EvaluationContext<'a, '_, N>,
) -> String {
    match args.into_iter().next() {
        Some(v) => v.to_string(),
        None => e_ctx.context_node.string_value(),
    }
}

/// The node a name function reports on: the argument's first node, or the
/// context node when called without arguments.
fn node_arg_or_context<'a, N: DocumentNode<'a>>(
    name: &str,
    args: Vec<Value<N>>,
    e_ctx: &EvaluationContext<'a, '_, N>,
) -> Result<Option<N>, XPathError> {
    expect_args(name, &args, 0, 1)?;
    match args.into_iter().next() {
        Some(v) => {
            let nodes = v.into_nodes(&format!("{}() argument", name))?;
            Ok(nodes.first().copied())
        }
        None => Ok(Some(e_ctx.context_node)),
    }
}

fn func_node_name<'a, N: DocumentNode<'a>>(
    name: &str,
    args: Vec<Value<N>>,
    e_ctx: &EvaluationContext<'a, '_, N>,
) -> Result<Value<N>, XPathError> {
    let node = node_arg_or_context(name, args, e_ctx)?;
    let result = node
        .and_then(|n| match name {
            "local-name" => n.name().map(|q| q.local_part.to_string()),
            "namespace-uri" => n.namespace_uri().map(str::to_string),
            _ => n.name().map(|q| q.to_string()),
        })
        .unwrap_or_default();
    Ok(Value::String(result))
}

fn func_id<'a, N: DocumentNode<'a>>(
    args: Vec<Value<N>>,
    e_ctx: &EvaluationContext<'a, '_, N>,
) -> Result<Value<N>, XPathError> {
    expect_args("id", &args, 1, 1)?;
    let id_string = match single(args) {
        Value::NodeSet(nodes) => nodes
            .iter()
            .map(|n| n.string_value())
            .collect::<Vec<_>>()
            .join(" "),
        other => other.to_string(),
    };
    let wanted: HashSet<&str> = id_string.split_whitespace().collect();
    if wanted.is_empty() {
        return Ok(Value::NodeSet(vec![]));
    }

    let results = crate::axes::descendants(e_ctx.root_node)
        .into_iter()
        .filter(|node| node.node_type() == NodeType::Element)
        .filter(|node| {
            node.attributes().any(|attr| {
                attr.name().is_some_and(|q| {
                    q.local_part == "id" && matches!(q.prefix, None | Some("xml"))
                }) && wanted.contains(attr.string_value().as_str())
            })
        })
        .collect();
    Ok(Value::NodeSet(results))
}

fn func_key<'a, N: DocumentNode<'a>>(
    args: Vec<Value<N>>,
    e_ctx: &EvaluationContext<'a, '_, N>,
) -> Result<Value<N>, XPathError> {
    expect_args("key", &args, 2, 2)?;
    let mut args = args.into_iter();
    let key_name = args.next().map(|v| v.to_string()).unwrap_or_default();
    let key_value = args.next().unwrap_or(Value::String(String::new()));

    let Some(index) = e_ctx.key_indexes.and_then(|keys| keys.get(&key_name)) else {
        return if e_ctx.strict {
            Err(XPathError::FunctionError {
                function: "key()".to_string(),
                message: format!("No key named '{}' is declared", key_name),
            })
        } else {
            Ok(Value::NodeSet(vec![]))
        };
    };

    let lookups = match key_value {
        Value::NodeSet(nodes) => nodes.iter().map(|n| n.string_value()).collect(),
        other => vec![other.to_string()],
    };

    let mut result: Vec<N> = lookups
        .iter()
        .filter_map(|value| index.get(value))
        .flatten()
        .copied()
        .collect();
    result.sort();
    result.dedup();
    Ok(Value::NodeSet(result))
}

fn func_generate_id<'a, N: DocumentNode<'a>>(
    args: Vec<Value<N>>,
    e_ctx: &EvaluationContext<'a, '_, N>,
) -> Result<Value<N>, XPathError> {
    let node = node_arg_or_context("generate-id", args, e_ctx)?;
    let id = node
        .map(|n| {
            let mut hasher = DefaultHasher::new();
            n.hash(&mut hasher);
            // A leading letter keeps the id a valid NCName.
            format!("id{:x}", hasher.finish())
        })
        .unwrap_or_default();
    Ok(Value::String(id))
}

fn func_substring<'a, N: DocumentNode<'a>>(args: Vec<Value<N>>) -> Result<Value<N>, XPathError> {
    expect_args("substring", &args, 2, 3)?;
    let mut args = args.into_iter();
    let s = args.next().map(|v| v.to_string()).unwrap_or_default();
    let start = xpath_round(args.next().map(|v| v.to_number()).unwrap_or(f64::NAN));
    let end = match args.next() {
        Some(length) => start + xpath_round(length.to_number()),
        None => f64::INFINITY,
    };
    // Comparisons against NaN are false, which yields the empty string.
    let result = s
        .chars()
        .enumerate()
        .filter(|(i, _)| {
            let pos = (i + 1) as f64;
            pos >= start && pos < end
        })
        .map(|(_, c)| c)
        .collect();
    Ok(Value::String(result))
}

fn func_translate<'a, N: DocumentNode<'a>>(args: Vec<Value<N>>) -> Result<Value<N>, XPathError> {
    expect_args("translate", &args, 3, 3)?;
    let mut args = args.into_iter().map(|v| v.to_string());
    let source = args.next().unwrap_or_default();
    let from: Vec<char> = args.next().unwrap_or_default().chars().collect();
    let to: Vec<char> = args.next().unwrap_or_default().chars().collect();
    let result = source
        .chars()
        .filter_map(|c| match from.iter().position(|&fc| fc == c) {
            Some(pos) => to.get(pos).copied(),
            None => Some(c),
        })
        .collect();
    Ok(Value::String(result))
}

fn func_lang<'a, N: DocumentNode<'a>>(
    args: Vec<Value<N>>,
    e_ctx: &EvaluationContext<'a, '_, N>,
) -> Result<Value<N>, XPathError> {
    expect_args("lang", &args, 1, 1)?;
    let wanted = single(args).to_string().to_lowercase();
    let mut current = Some(e_ctx.context_node);
    if current.is_some_and(|n| n.node_type() != NodeType::Element) {
        current = current.and_then(|n| n.parent());
    }

    while let Some(node) = current {
        let lang = node.attributes().find(|attr| {
            attr.name()
                .is_some_and(|q| q.prefix == Some("xml") && q.local_part == "lang")
        });
        if let Some(attr) = lang {
            // The nearest xml:lang decides; "en" matches "en-GB".
            let lang = attr.string_value().to_lowercase();
            let matched = lang == wanted || lang.starts_with(&format!("{}-", wanted));
            return Ok(Value::Boolean(matched));
        }
        current = node.parent();
    }
    Ok(Value::Boolean(false))
}

/// `round()`: halves go towards positive infinity.
pub fn xpath_round(n: f64) -> f64 {
    if n.is_nan() || n.is_infinite() || n == 0.0 {
        return n;
    }
    (n + 0.5).floor()
}

fn is_xslt_prefix<'a, N: DocumentNode<'a>>(prefix: &str, e_ctx: &EvaluationContext<'a, '_, N>) -> bool {
    match e_ctx.namespaces.and_then(|ns| ns.get(prefix)) {
        Some(uri) => uri == XSLT_NAMESPACE,
        None => prefix == "xsl",
    }
}

fn system_property<'a, N: DocumentNode<'a>>(qname: &str, e_ctx: &EvaluationContext<'a, '_, N>) -> Value<N> {
    let Some((prefix, local)) = qname.split_once(':') else {
        return Value::String(String::new());
    };
    if !is_xslt_prefix(prefix, e_ctx) {
        return Value::String(String::new());
    }
    match local {
        "version" => Value::Number(1.0),
        "vendor" => Value::String("xslview".to_string()),
        "vendor-url" => Value::String(String::new()),
        _ => Value::String(String::new()),
    }
}

/// `format-number()` for the common decimal-format patterns: digits (`0`,
/// `#`), grouping (`,`), a decimal point, `%` and literal prefix and suffix
/// text. A negative subpattern after `;` supplies the negative prefix.
pub fn format_number(number: f64, pattern: &str) -> String {
    if number.is_nan() {
        return "NaN".to_string();
    }
    let (positive, negative) = match pattern.split_once(';') {
        Some((p, n)) => (p, Some(n)),
        None => (pattern, None),
    };
    let is_pattern_char = |c: char| matches!(c, '0' | '#' | ',' | '.');
    let start = positive.find(is_pattern_char).unwrap_or(positive.len());
    let end = positive
        .rfind(is_pattern_char)
        .map(|i| i + 1)
        .unwrap_or(start);
    let prefix = &positive[..start];
    let body = &positive[start..end.max(start)];
    let suffix = &positive[end.max(start)..];

    let mut value = number.abs();
    if prefix.contains('%') || suffix.contains('%') {
        value *= 100.0;
    } else if prefix.contains('\u{2030}') || suffix.contains('\u{2030}') {
        value *= 1000.0;
    }

    let (int_pattern, frac_pattern) = match body.split_once('.') {
        Some((i, f)) => (i, f),
        None => (body, ""),
    };
    let min_int = int_pattern.chars().filter(|&c| c == '0').count();
    let grouping = int_pattern
        .rfind(',')
        .map(|i| int_pattern[i + 1..].chars().filter(|c| matches!(c, '0' | '#')).count())
        .filter(|&g| g > 0);
    let min_frac = frac_pattern.chars().filter(|&c| c == '0').count();
    let max_frac = frac_pattern.chars().filter(|c| matches!(c, '0' | '#')).count();

    let digits = if value.is_infinite() {
        "Infinity".to_string()
    } else {
        let rounded = format!("{:.*}", max_frac, value);
        let (int_digits, frac_digits) = match rounded.split_once('.') {
            Some((i, f)) => (i.to_string(), f.trim_end_matches('0').to_string()),
            None => (rounded, String::new()),
        };
        let mut frac_digits = frac_digits;
        while frac_digits.len() < min_frac {
            frac_digits.push('0');
        }
        let int_digits = int_digits.trim_start_matches('0');
        let mut int_digits = format!("{:0>width$}", int_digits, width = min_int);
        if let Some(size) = grouping {
            int_digits = group_digits(&int_digits, size);
        }
        if frac_digits.is_empty() {
            int_digits
        } else {
            format!("{}.{}", int_digits, frac_digits)
        }
    };

    if number.is_sign_negative() && number != 0.0 {
        match negative {
            Some(neg) => {
                let neg_start = neg.find(is_pattern_char).unwrap_or(neg.len());
                let neg_end = neg.rfind(is_pattern_char).map(|i| i + 1).unwrap_or(neg_start);
                format!("{}{}{}", &neg[..neg_start], digits, &neg[neg_end.max(neg_start)..])
            }
            None => format!("-{}{}{}", prefix, digits, suffix),
        }
    } else {
        format!("{}{}{}", prefix, digits, suffix)
    }
}

fn group_digits(digits: &str, size: usize) -> String {
    let chars: Vec<char> = digits.chars().collect();
    let mut out = String::with_capacity(chars.len() + chars.len() / size);
    for (i, c) in chars.iter().enumerate() {
        if i > 0 && (chars.len() - i) % size == 0 {
            out.push(',');
        }
        out.push(*c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{KeyIndexes, Variables};
    use crate::node::mock::{MockNode, MockTree, create_test_tree};
    use std::collections::HashMap;

    struct TestSetup<'a> {
        tree: &'a MockTree<'a>,
        funcs: FunctionRegistry,
        vars: Variables<MockNode<'a>>,
        keys: KeyIndexes<MockNode<'a>>,
    }

    impl<'a> TestSetup<'a> {
        fn new(tree: &'a MockTree<'a>) -> Self {
            TestSetup {
                tree,
                funcs: FunctionRegistry::default(),
                vars: HashMap::new(),
                keys: HashMap::new(),
            }
        }

        fn with_keys(mut self, keys: KeyIndexes<MockNode<'a>>) -> Self {
            self.keys = keys;
            self
        }

        fn context<'s>(
            &'s self,
            context_node_id: usize,
            pos: usize,
            size: usize,
        ) -> EvaluationContext<'a, 's, MockNode<'a>> {
            EvaluationContext::new(self.tree.node(context_node_id), self.tree.root(), &self.funcs, &self.vars)
                .at_position(pos, size)
                .with_keys(&self.keys)
        }
    }

    fn eval_func<'a>(
        name: &str,
        args: Vec<Value<MockNode<'a>>>,
        e_ctx: &EvaluationContext<'a, '_, MockNode<'a>>,
    ) -> Value<MockNode<'a>> {
        evaluate_function(name, args, e_ctx).unwrap()
    }

    fn s<'a>(value: &str) -> Value<MockNode<'a>> {
        Value::String(value.to_string())
    }

    #[test]
    fn test_func_concat() {
        let tree = create_test_tree();
        let setup = TestSetup::new(&tree);
        let e_ctx = setup.context(0, 1, 1);
        let args = vec![s("Hello"), s(" "), s("World"), Value::Number(42.0)];
        assert_eq!(eval_func("concat", args, &e_ctx).to_string(), "Hello World42");
        assert!(evaluate_function("concat", vec![s("x")], &e_ctx).is_err());
    }

    #[test]
    fn test_func_substring() {
        let tree = create_test_tree();
        let setup = TestSetup::new(&tree);
        let e_ctx = setup.context(0, 1, 1);
        let sub = |args| eval_func("substring", args, &e_ctx).to_string();

        assert_eq!(sub(vec![s("12345"), Value::Number(2.0), Value::Number(3.0)]), "234");
        assert_eq!(sub(vec![s("12345"), Value::Number(2.0)]), "2345");
        assert_eq!(sub(vec![s("12345"), Value::Number(1.5), Value::Number(2.6)]), "234");
        assert_eq!(sub(vec![s("12345"), Value::Number(0.0), Value::Number(3.0)]), "12");
        assert_eq!(sub(vec![s("12345"), Value::Number(f64::NAN), Value::Number(3.0)]), "");
    }

    #[test]
    fn test_string_functions() {
        let tree = create_test_tree();
        let setup = TestSetup::new(&tree);
        let e_ctx = setup.context(1, 1, 1);

        assert!(eval_func("starts-with", vec![s("abcdef"), s("abc")], &e_ctx).to_bool());
        assert!(!eval_func("contains", vec![s("abcdef"), s("xyz")], &e_ctx).to_bool());
        assert_eq!(eval_func("substring-before", vec![s("1999/04/01"), s("/")], &e_ctx).to_string(), "1999");
        assert_eq!(eval_func("substring-after", vec![s("1999/04/01"), s("/")], &e_ctx).to_string(), "04/01");
        assert_eq!(eval_func("string-length", vec![], &e_ctx).to_number(), 5.0);
        assert_eq!(eval_func("normalize-space", vec![s("  a \n b  ")], &e_ctx).to_string(), "a b");
        assert_eq!(eval_func("translate", vec![s("bar"), s("abc"), s("ABC")], &e_ctx).to_string(), "BAr");
        assert_eq!(eval_func("translate", vec![s("--aaa--"), s("abc-"), s("ABC")], &e_ctx).to_string(), "AAA");
    }

    #[test]
    fn test_boolean_and_number_functions() {
        let tree = create_test_tree();
        let setup = TestSetup::new(&tree);
        let e_ctx = setup.context(0, 1, 1);

        assert!(!eval_func("not", vec![Value::Boolean(true)], &e_ctx).to_bool());
        assert!(eval_func("true", vec![], &e_ctx).to_bool());
        assert!(eval_func("boolean", vec![s("x")], &e_ctx).to_bool());
        assert_eq!(eval_func("number", vec![s(" 12 ")], &e_ctx).to_number(), 12.0);
        assert_eq!(eval_func("floor", vec![Value::Number(2.7)], &e_ctx).to_number(), 2.0);
        assert_eq!(eval_func("ceiling", vec![Value::Number(2.1)], &e_ctx).to_number(), 3.0);
        assert_eq!(eval_func("round", vec![Value::Number(2.5)], &e_ctx).to_number(), 3.0);
        assert_eq!(eval_func("round", vec![Value::Number(-2.5)], &e_ctx).to_number(), -2.0);
        assert!(eval_func("round", vec![Value::Number(f64::NAN)], &e_ctx).to_number().is_nan());
    }

    #[test]
    fn test_func_lang() {
        let tree = create_test_tree();
        let setup = TestSetup::new(&tree);
        let in_para = setup.context(4, 1, 1);
        assert!(eval_func("lang", vec![s("en")], &in_para).to_bool());
        assert!(eval_func("lang", vec![s("EN")], &in_para).to_bool());
        assert!(!eval_func("lang", vec![s("fr")], &in_para).to_bool());
        let outside = setup.context(8, 1, 1);
        assert!(!eval_func("lang", vec![s("en")], &outside).to_bool());
    }

    #[test]
    fn test_func_sum_and_count() {
        let tree = create_test_tree();
        let setup = TestSetup::new(&tree);
        let e_ctx = setup.context(0, 1, 1);
        let paras = Value::NodeSet(vec![tree.node(1), tree.node(8)]);
        assert_eq!(eval_func("count", vec![paras.clone()], &e_ctx).to_number(), 2.0);
        assert!(eval_func("sum", vec![paras], &e_ctx).to_number().is_nan());
        assert!(matches!(
            evaluate_function("count", vec![s("x")], &e_ctx),
            Err(XPathError::TypeError(_))
        ));
    }

    #[test]
    fn test_func_last_and_position() {
        let tree = create_test_tree();
        let setup = TestSetup::new(&tree);
        let e_ctx = setup.context(1, 2, 5);
        assert_eq!(eval_func("last", vec![], &e_ctx).to_number(), 5.0);
        assert_eq!(eval_func("position", vec![], &e_ctx).to_number(), 2.0);
    }

    #[test]
    fn test_name_functions() {
        let tree = create_test_tree();
        let setup = TestSetup::new(&tree);
        let para = setup.context(1, 1, 1);
        let text = setup.context(4, 1, 1);

        assert_eq!(eval_func("local-name", vec![], &para).to_string(), "para");
        assert_eq!(eval_func("local-name", vec![], &text).to_string(), "");

        let lang = Value::NodeSet(vec![tree.node(3)]);
        assert_eq!(eval_func("name", vec![lang.clone()], &para).to_string(), "xml:lang");
        assert_eq!(eval_func("local-name", vec![lang.clone()], &para).to_string(), "lang");
        assert_eq!(
            eval_func("namespace-uri", vec![lang], &para).to_string(),
            crate::node::XML_NAMESPACE
        );
    }

    #[test]
    fn test_func_id() {
        let tree = create_test_tree();
        let setup = TestSetup::new(&tree);
        let e_ctx = setup.context(0, 1, 1);
        let found = eval_func("id", vec![s("nope p1")], &e_ctx);
        assert_eq!(found, Value::NodeSet(vec![tree.node(1)]));
    }

    #[test]
    fn test_func_key() {
        let tree = create_test_tree();
        let para_node = tree.node(1);
        let attr_node = tree.node(2);

        let mut key_index = HashMap::new();
        key_index.insert("p1".to_string(), vec![para_node]);
        let mut keys = HashMap::new();
        keys.insert("id-key".to_string(), key_index);

        let setup = TestSetup::new(&tree).with_keys(keys);
        let e_ctx = setup.context(0, 1, 1);

        let found = eval_func("key", vec![s("id-key"), s("p1")], &e_ctx);
        assert_eq!(found, Value::NodeSet(vec![para_node]));

        let missing = eval_func("key", vec![s("id-key"), s("nonexistent")], &e_ctx);
        assert_eq!(missing, Value::NodeSet(vec![]));

        // A node-set argument looks up each node's string value.
        let by_node = eval_func("key", vec![s("id-key"), Value::NodeSet(vec![attr_node])], &e_ctx);
        assert_eq!(by_node, Value::NodeSet(vec![para_node]));
    }

    #[test]
    fn test_generate_id_is_stable_per_node() {
        let tree = create_test_tree();
        let setup = TestSetup::new(&tree);
        let e_ctx = setup.context(1, 1, 1);
        let own = eval_func("generate-id", vec![], &e_ctx).to_string();
        let again = eval_func("generate-id", vec![Value::NodeSet(vec![tree.node(1)])], &e_ctx).to_string();
        let other = eval_func("generate-id", vec![Value::NodeSet(vec![tree.node(8)])], &e_ctx).to_string();
        assert!(own.starts_with("id"));
        assert_eq!(own, again);
        assert_ne!(own, other);
        assert_eq!(eval_func("generate-id", vec![Value::NodeSet(vec![])], &e_ctx).to_string(), "");
    }

    #[test]
    fn test_xslt_introspection_functions() {
        let tree = create_test_tree();
        let mut setup = TestSetup::new(&tree);
        setup.funcs.register_element("value-of");
        let e_ctx = setup.context(0, 1, 1);

        assert_eq!(eval_func("system-property", vec![s("xsl:version")], &e_ctx).to_number(), 1.0);
        assert!(eval_func("function-available", vec![s("concat")], &e_ctx).to_bool());
        assert!(!eval_func("function-available", vec![s("ext:thing")], &e_ctx).to_bool());
        assert!(eval_func("element-available", vec![s("xsl:value-of")], &e_ctx).to_bool());
        assert!(!eval_func("element-available", vec![s("xsl:evaluate")], &e_ctx).to_bool());
    }

    #[test]
    fn test_unknown_function() {
        let tree = create_test_tree();
        let setup = TestSetup::new(&tree);
        let e_ctx = setup.context(0, 1, 1);
        let err = evaluate_function("ext:missing", vec![], &e_ctx).unwrap_err();
        assert!(matches!(err, XPathError::FunctionError { .. }));
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(1234567.891, "#,##0.00"), "1,234,567.89");
        assert_eq!(format_number(3.0, "0.00"), "3.00");
        assert_eq!(format_number(0.25, "0%"), "25%");
        assert_eq!(format_number(7.0, "000"), "007");
        assert_eq!(format_number(-4.5, "0.0"), "-4.5");
        assert_eq!(format_number(-4.5, "0.0;(0.0)"), "(4.5)");
        assert_eq!(format_number(2.5, "$#.##"), "$2.5");
        assert_eq!(format_number(f64::NAN, "0"), "NaN");
    }
}
