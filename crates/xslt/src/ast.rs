//! The compiled form of an XSLT 1.0 stylesheet.

use crate::pattern::Pattern;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use xslview_dom::OutputMethod;
use xslview_xpath1::Expression;

/// A compiled sequence of instructions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PreparsedTemplate(pub Vec<XsltInstruction>);

/// A part of an attribute value template: literal text or an `{expression}`.
#[derive(Debug, Clone, PartialEq)]
pub enum AvtPart {
    Static(String),
    Dynamic(Expression),
}

#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValueTemplate {
    Static(String),
    Dynamic(Vec<AvtPart>),
}

/// Where a variable, parameter or `with-param` gets its value.
#[derive(Debug, Clone, PartialEq)]
pub enum VariableValue {
    Select(Expression),
    /// The body is instantiated into a result tree fragment.
    Content(PreparsedTemplate),
    /// Neither `select` nor content: the empty string.
    Empty,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: String,
    pub value: VariableValue,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WithParam {
    pub name: String,
    pub value: VariableValue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDataType {
    #[default]
    Text,
    Number,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SortKey {
    pub select: Expression,
    pub order: SortOrder,
    pub data_type: SortDataType,
}

#[derive(Debug, Clone, PartialEq)]
pub struct When {
    pub test: Expression,
    pub body: PreparsedTemplate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NumberLevel {
    #[default]
    Single,
    Multiple,
    Any,
}

/// A compiled `xsl:number`.
#[derive(Debug, Clone, PartialEq)]
pub struct NumberSpec {
    pub value: Option<Expression>,
    pub level: NumberLevel,
    pub count: Option<Pattern>,
    pub from: Option<Pattern>,
    pub format: AttributeValueTemplate,
}

/// An instruction in a compiled template body.
#[derive(Debug, Clone, PartialEq)]
pub enum XsltInstruction {
    /// Literal text, from the stylesheet or from `xsl:text`.
    Text(String),
    /// A literal result element copied to the output.
    LiteralElement {
        name: String,
        attrs: Vec<(String, AttributeValueTemplate)>,
        use_attribute_sets: Vec<String>,
        body: PreparsedTemplate,
    },
    ValueOf {
        select: Expression,
    },
    CopyOf {
        select: Expression,
    },
    Copy {
        use_attribute_sets: Vec<String>,
        body: PreparsedTemplate,
    },
    Element {
        name: AttributeValueTemplate,
        use_attribute_sets: Vec<String>,
        body: PreparsedTemplate,
    },
    Attribute {
        name: AttributeValueTemplate,
        body: PreparsedTemplate,
    },
    Comment {
        body: PreparsedTemplate,
    },
    ProcessingInstruction {
        name: AttributeValueTemplate,
        body: PreparsedTemplate,
    },
    If {
        test: Expression,
        body: PreparsedTemplate,
    },
    Choose {
        whens: Vec<When>,
        otherwise: Option<PreparsedTemplate>,
    },
    ForEach {
        select: Expression,
        sort_keys: Vec<SortKey>,
        body: PreparsedTemplate,
    },
    ApplyTemplates {
        select: Option<Expression>,
        mode: Option<String>,
        sort_keys: Vec<SortKey>,
        params: Vec<WithParam>,
    },
    CallTemplate {
        name: String,
        params: Vec<WithParam>,
    },
    Variable {
        name: String,
        value: VariableValue,
    },
    Number(Box<NumberSpec>),
    Message {
        body: PreparsedTemplate,
        terminate: bool,
    },
}

/// A template body with its declared parameters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Template {
    pub params: Vec<Param>,
    pub body: PreparsedTemplate,
}

/// A single match rule. A template whose pattern is a union contributes one
/// rule per alternative.
#[derive(Debug, Clone)]
pub struct TemplateRule {
    pub pattern: Pattern,
    pub priority: f64,
    pub mode: Option<String>,
    /// Declaration order; later rules win priority ties.
    pub order: usize,
    pub template: Arc<Template>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct KeyDefinition {
    pub name: String,
    pub pattern: Pattern,
    pub use_expr: Expression,
}

/// A top-level `xsl:variable` or `xsl:param`.
#[derive(Debug, Clone, PartialEq)]
pub struct GlobalBinding {
    pub name: String,
    pub value: VariableValue,
    /// Parameters can be overridden from outside the stylesheet.
    pub is_param: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttributeSet {
    pub use_attribute_sets: Vec<String>,
    /// `XsltInstruction::Attribute` entries, in declaration order.
    pub attributes: Vec<XsltInstruction>,
}

/// Settings from `xsl:output`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OutputSettings {
    pub method: Option<OutputMethod>,
    pub indent: bool,
    pub encoding: Option<String>,
}

/// One name test of `xsl:strip-space` or `xsl:preserve-space`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpaceTest {
    Any,
    /// `prefix:*`, resolved to the namespace URI.
    Namespace(String),
    Name {
        namespace: Option<String>,
        local: String,
    },
}

impl SpaceTest {
    /// XSLT 1.0 default priority of the test.
    pub fn priority(&self) -> f64 {
        match self {
            SpaceTest::Any => -0.5,
            SpaceTest::Namespace(_) => -0.25,
            SpaceTest::Name { .. } => 0.0,
        }
    }

    pub fn matches(&self, namespace: Option<&str>, local: &str) -> bool {
        match self {
            SpaceTest::Any => true,
            SpaceTest::Namespace(uri) => namespace == Some(uri.as_str()),
            SpaceTest::Name {
                namespace: ns,
                local: l,
            } => l == local && ns.as_deref() == namespace,
        }
    }
}

/// Which source elements have their whitespace-only text children removed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpaceRules {
    pub strip: Vec<SpaceTest>,
    pub preserve: Vec<SpaceTest>,
}

impl SpaceRules {
    pub fn is_empty(&self) -> bool {
        self.strip.is_empty()
    }

    /// Whether whitespace-only text children of the named element are
    /// stripped. The most specific matching test decides; preserve wins a tie.
    pub fn strips(&self, namespace: Option<&str>, local: &str) -> bool {
        let best = |tests: &[SpaceTest]| {
            tests
                .iter()
                .filter(|t| t.matches(namespace, local))
                .map(SpaceTest::priority)
                .fold(None, |acc: Option<f64>, p| Some(acc.map_or(p, |a| a.max(p))))
        };
        match (best(&self.strip), best(&self.preserve)) {
            (Some(strip), Some(preserve)) => strip > preserve,
            (Some(_), None) => true,
            _ => false,
        }
    }
}

/// The complete output of the XSLT compiler.
#[derive(Debug, Clone, Default)]
pub struct CompiledStylesheet {
    /// Match rules grouped by mode, highest precedence first.
    pub template_rules: HashMap<Option<String>, Vec<TemplateRule>>,
    pub named_templates: HashMap<String, Arc<Template>>,
    pub globals: Vec<GlobalBinding>,
    pub keys: Vec<KeyDefinition>,
    pub attribute_sets: HashMap<String, AttributeSet>,
    pub output: OutputSettings,
    pub space_rules: SpaceRules,
    /// Prefix bindings declared in the stylesheet, for name tests in expressions.
    pub namespaces: HashMap<String, String>,
}

impl PreparsedTemplate {
    /// Names of all variables referenced anywhere in this body.
    pub fn variable_references(&self, out: &mut HashSet<String>) {
        for instruction in &self.0 {
            instruction.variable_references(out);
        }
    }
}

impl VariableValue {
    pub fn variable_references(&self, out: &mut HashSet<String>) {
        match self {
            VariableValue::Select(expr) => expression_references(expr, out),
            VariableValue::Content(body) => body.variable_references(out),
            VariableValue::Empty => {}
        }
    }
}

fn expression_references(expr: &Expression, out: &mut HashSet<String>) {
    expr.walk(&mut |e| {
        if let Expression::Variable(name) = e {
            out.insert(name.clone());
        }
    });
}

fn avt_references(avt: &AttributeValueTemplate, out: &mut HashSet<String>) {
    if let AttributeValueTemplate::Dynamic(parts) = avt {
        for part in parts {
            if let AvtPart::Dynamic(expr) = part {
                expression_references(expr, out);
            }
        }
    }
}

impl XsltInstruction {
    fn variable_references(&self, out: &mut HashSet<String>) {
        match self {
            XsltInstruction::Text(_) => {}
            XsltInstruction::LiteralElement { attrs, body, .. } => {
                attrs.iter().for_each(|(_, avt)| avt_references(avt, out));
                body.variable_references(out);
            }
            XsltInstruction::ValueOf { select } | XsltInstruction::CopyOf { select } => {
                expression_references(select, out)
            }
            XsltInstruction::Copy { body, .. }
            | XsltInstruction::Comment { body }
            | XsltInstruction::Message { body, .. } => body.variable_references(out),
            XsltInstruction::Element { name, body, .. }
            | XsltInstruction::Attribute { name, body }
            | XsltInstruction::ProcessingInstruction { name, body } => {
                avt_references(name, out);
                body.variable_references(out);
            }
            XsltInstruction::If { test, body } => {
                expression_references(test, out);
                body.variable_references(out);
            }
            XsltInstruction::Choose { whens, otherwise } => {
                for when in whens {
                    expression_references(&when.test, out);
                    when.body.variable_references(out);
                }
                if let Some(body) = otherwise {
                    body.variable_references(out);
                }
            }
            XsltInstruction::ForEach {
                select,
                sort_keys,
                body,
            } => {
                expression_references(select, out);
                sort_keys
                    .iter()
                    .for_each(|k| expression_references(&k.select, out));
                body.variable_references(out);
            }
            XsltInstruction::ApplyTemplates {
                select,
                sort_keys,
                params,
                ..
            } => {
                if let Some(select) = select {
                    expression_references(select, out);
                }
                sort_keys
                    .iter()
                    .for_each(|k| expression_references(&k.select, out));
                params.iter().for_each(|p| p.value.variable_references(out));
            }
            XsltInstruction::CallTemplate { params, .. } => {
                params.iter().for_each(|p| p.value.variable_references(out));
            }
            XsltInstruction::Variable { value, .. } => value.variable_references(out),
            XsltInstruction::Number(spec) => {
                if let Some(value) = &spec.value {
                    expression_references(value, out);
                }
                avt_references(&spec.format, out);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_space_rules_most_specific_wins() {
        let rules = SpaceRules {
            strip: vec![SpaceTest::Any],
            preserve: vec![SpaceTest::Name {
                namespace: None,
                local: "pre".to_string(),
            }],
        };
        assert!(rules.strips(None, "div"));
        assert!(!rules.strips(None, "pre"));
        assert!(!SpaceRules::default().strips(None, "div"));
    }

    #[test]
    fn test_space_rules_namespace_test() {
        let rules = SpaceRules {
            strip: vec![SpaceTest::Namespace("urn:a".to_string())],
            preserve: vec![],
        };
        assert!(rules.strips(Some("urn:a"), "x"));
        assert!(!rules.strips(None, "x"));
    }

    #[test]
    fn test_variable_references_cover_nested_bodies() {
        let body = PreparsedTemplate(vec![XsltInstruction::If {
            test: xslview_xpath1::parse_expression("$a > 1").unwrap(),
            body: PreparsedTemplate(vec![XsltInstruction::ValueOf {
                select: xslview_xpath1::parse_expression("concat($b, 'x')").unwrap(),
            }]),
        }]);
        let mut refs = HashSet::new();
        body.variable_references(&mut refs);
        assert!(refs.contains("a"));
        assert!(refs.contains("b"));
        assert_eq!(refs.len(), 2);
    }
}
