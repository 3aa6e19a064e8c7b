//! `xsl:number`: counting source nodes and formatting the result.

use crate::ast::{NumberLevel, NumberSpec};
use crate::executor::{ExecutionError, TemplateExecutor, collect_nodes};
use crate::output::OutputBuilder;
use crate::pattern::Pattern;
use xslview_xpath1::{DocumentNode, NodeType, number_to_string};

pub(crate) fn handle_number<'s, 'a, N: DocumentNode<'a> + 'a>(
    executor: &mut TemplateExecutor<'s, 'a, N>,
    spec: &NumberSpec,
    context_node: N,
    context_position: usize,
    context_size: usize,
    builder: &mut dyn OutputBuilder,
) -> Result<(), ExecutionError> {
    let format = {
        let e_ctx = executor.get_eval_context(context_node, context_position, context_size);
        executor.evaluate_avt(&spec.format, &e_ctx)?
    };

    let numbers = match &spec.value {
        Some(value) => {
            let n = executor
                .evaluate(value, context_node, context_position, context_size)?
                .to_number();
            match round_to_positive_integer(n) {
                Some(rounded) => vec![rounded],
                None => {
                    builder.add_text(&number_to_string(n));
                    return Ok(());
                }
            }
        }
        None => count_nodes(executor, spec, context_node)?,
    };

    let text = format_number_list(&numbers, &format);
    if !text.is_empty() {
        builder.add_text(&text);
    }
    Ok(())
}

struct Counter<'e, 's, 'a, N: DocumentNode<'a>> {
    executor: &'e TemplateExecutor<'s, 'a, N>,
    count: Option<&'e Pattern>,
    from: Option<&'e Pattern>,
    target: N,
}

impl<'a, N: DocumentNode<'a> + 'a> Counter<'_, '_, 'a, N> {
    /// With no `count` pattern, nodes of the same type and name as the numbered node count.
    fn counts(&self, node: N) -> Result<bool, ExecutionError> {
        match self.count {
            Some(pattern) => {
                let e_ctx = self.executor.get_eval_context(node, 1, 1);
                Ok(pattern.matches(node, &e_ctx)?)
            }
            None => Ok(node.node_type() == self.target.node_type()
                && node.name() == self.target.name()
                && node.namespace_uri() == self.target.namespace_uri()),
        }
    }

    fn is_from(&self, node: N) -> Result<bool, ExecutionError> {
        match self.from {
            Some(pattern) => {
                let e_ctx = self.executor.get_eval_context(node, 1, 1);
                Ok(pattern.matches(node, &e_ctx)?)
            }
            None => Ok(false),
        }
    }

    /// Ancestor-or-self nodes that count, innermost first, stopping at a `from` match.
    fn counted_ancestors(&self, first_only: bool) -> Result<Vec<N>, ExecutionError> {
        let mut found = Vec::new();
        let mut current = Some(self.target);
        while let Some(node) = current {
            if self.is_from(node)? {
                break;
            }
            if self.counts(node)? {
                found.push(node);
                if first_only {
                    break;
                }
            }
            current = node.parent();
        }
        Ok(found)
    }

    /// One plus the number of preceding siblings that count.
    fn sibling_number(&self, node: N) -> Result<u64, ExecutionError> {
        let Some(parent) = node.parent() else {
            return Ok(1);
        };
        let mut number = 1;
        for sibling in parent.children() {
            if sibling == node {
                break;
            }
            if self.counts(sibling)? {
                number += 1;
            }
        }
        Ok(number)
    }
}

fn count_nodes<'s, 'a, N: DocumentNode<'a> + 'a>(
    executor: &TemplateExecutor<'s, 'a, N>,
    spec: &NumberSpec,
    target: N,
) -> Result<Vec<u64>, ExecutionError> {
    let counter = Counter {
        executor,
        count: spec.count.as_ref(),
        from: spec.from.as_ref(),
        target,
    };
    match spec.level {
        NumberLevel::Single => counter
            .counted_ancestors(true)?
            .into_iter()
            .map(|node| counter.sibling_number(node))
            .collect(),
        NumberLevel::Multiple => {
            let mut numbers = counter
                .counted_ancestors(false)?
                .into_iter()
                .map(|node| counter.sibling_number(node))
                .collect::<Result<Vec<_>, _>>()?;
            numbers.reverse();
            Ok(numbers)
        }
        NumberLevel::Any => {
            let mut all_nodes = Vec::new();
            collect_nodes(executor.root_node, &mut all_nodes);
            let mut number = 0;
            for node in all_nodes {
                if node.node_type() == NodeType::Attribute && node != target {
                    continue;
                }
                if counter.is_from(node)? {
                    number = 0;
                }
                if counter.counts(node)? {
                    number += 1;
                }
                if node == target {
                    break;
                }
            }
            Ok(if number == 0 { vec![] } else { vec![number] })
        }
    }
}

/// Largest integer an `f64` holds exactly.
const MAX_EXACT_INTEGER: f64 = 9_007_199_254_740_992.0;

/// `round(n)` when that is a positive integer `f64` represents exactly.
fn round_to_positive_integer(n: f64) -> Option<u64> {
    let rounded = (n + 0.5).floor();
    (rounded.is_finite() && (1.0..=MAX_EXACT_INTEGER).contains(&rounded)).then_some(rounded as u64)
}

/// Formats a list of numbers according to an `xsl:number` format string such
/// as `1.`, `(a)` or `I.1`.
pub(crate) fn format_number_list(numbers: &[u64], format: &str) -> String {
    let chars: Vec<char> = format.chars().collect();
    let mut i = 0;
    let mut prefix = String::new();
    while i < chars.len() && !chars[i].is_alphanumeric() {
        prefix.push(chars[i]);
        i += 1;
    }

    // Alternating tokens and the separators that follow them.
    let mut tokens: Vec<String> = Vec::new();
    let mut separators: Vec<String> = Vec::new();
    while i < chars.len() {
        let mut token = String::new();
        while i < chars.len() && chars[i].is_alphanumeric() {
            token.push(chars[i]);
            i += 1;
        }
        let mut separator = String::new();
        while i < chars.len() && !chars[i].is_alphanumeric() {
            separator.push(chars[i]);
            i += 1;
        }
        tokens.push(token);
        separators.push(separator);
    }
    let suffix = if tokens.is_empty() {
        String::new()
    } else {
        separators.pop().unwrap_or_default()
    };
    if tokens.is_empty() {
        tokens.push("1".to_string());
    }

    if numbers.is_empty() {
        return format!("{}{}", prefix, suffix);
    }

    let mut out = prefix;
    for (n, number) in numbers.iter().enumerate() {
        if n > 0 {
            let separator = separators
                .get(n - 1)
                .or_else(|| separators.last())
                .map(String::as_str)
                .unwrap_or(".");
            out.push_str(separator);
        }
        let token = tokens.get(n).or_else(|| tokens.last()).map(String::as_str).unwrap_or("1");
        out.push_str(&format_token(*number, token));
    }
    out.push_str(&suffix);
    out
}

fn format_token(number: u64, token: &str) -> String {
    match token {
        "a" => alphabetic(number, b'a'),
        "A" => alphabetic(number, b'A'),
        "i" => roman(number).to_lowercase(),
        "I" => roman(number),
        t if t.len() > 1 && t.chars().all(|c| c.is_ascii_digit()) => {
            format!("{:0width$}", number, width = t.len())
        }
        _ => number.to_string(),
    }
}

fn alphabetic(mut number: u64, base: u8) -> String {
    if number == 0 {
        return "0".to_string();
    }
    let mut letters = Vec::new();
    while number > 0 {
        number -= 1;
        letters.push((base + (number % 26) as u8) as char);
        number /= 26;
    }
    letters.iter().rev().collect()
}

fn roman(mut number: u64) -> String {
    if number == 0 || number >= 4000 {
        return number.to_string();
    }
    const NUMERALS: &[(u64, &str)] = &[
        (1000, "M"),
        (900, "CM"),
        (500, "D"),
        (400, "CD"),
        (100, "C"),
        (90, "XC"),
        (50, "L"),
        (40, "XL"),
        (10, "X"),
        (9, "IX"),
        (5, "V"),
        (4, "IV"),
        (1, "I"),
    ];
    let mut out = String::new();
    for &(value, numeral) in NUMERALS {
        while number >= value {
            out.push_str(numeral);
            number -= value;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_tokens() {
        assert_eq!(format_number_list(&[3], "1"), "3");
        assert_eq!(format_number_list(&[3], "001"), "003");
        assert_eq!(format_number_list(&[28], "a"), "ab");
        assert_eq!(format_number_list(&[26], "A"), "Z");
        assert_eq!(format_number_list(&[1994], "I"), "MCMXCIV");
        assert_eq!(format_number_list(&[4], "i"), "iv");
    }

    #[test]
    fn test_round_to_positive_integer() {
        assert_eq!(round_to_positive_integer(2.5), Some(3));
        assert_eq!(round_to_positive_integer(0.49), None);
        assert_eq!(round_to_positive_integer(-3.0), None);
        assert_eq!(round_to_positive_integer(f64::NAN), None);
        assert_eq!(round_to_positive_integer(MAX_EXACT_INTEGER), Some(9_007_199_254_740_992));
        assert_eq!(round_to_positive_integer(1e23), None);
    }

    #[test]
    fn test_format_prefix_suffix_and_separators() {
        assert_eq!(format_number_list(&[2], "(1)"), "(2)");
        assert_eq!(format_number_list(&[1, 2, 3], "1.a"), "1.b.c");
        assert_eq!(format_number_list(&[1, 2], "1."), "1.2.");
        assert_eq!(format_number_list(&[4], ""), "4");
        assert_eq!(format_number_list(&[], "1."), ".");
    }
}
