//! Defines the CompilerBuilder, which constructs a `CompiledStylesheet` by listening to a parser driver.
use crate::ast::{
    CompiledStylesheet, Param, PreparsedTemplate, SortKey, When, WithParam, XsltInstruction,
};
use crate::error::{Location, XsltError};
use crate::parser;
use crate::util::{OwnedAttributes, get_attr_owned_optional, get_line_col_from_pos};
use xslview_xpath1::{XML_NAMESPACE, XSLT_NAMESPACE};

/// Instruction elements the compiler understands, reported by `element-available()`.
pub const SUPPORTED_INSTRUCTIONS: &[&str] = &[
    "apply-templates",
    "attribute",
    "call-template",
    "choose",
    "comment",
    "copy",
    "copy-of",
    "element",
    "fallback",
    "for-each",
    "if",
    "message",
    "number",
    "processing-instruction",
    "text",
    "value-of",
    "variable",
];

/// A trait defining the callbacks the parser driver will use to build a stylesheet.
pub trait StylesheetBuilder {
    fn start_element(
        &mut self,
        name: &str,
        attrs: OwnedAttributes,
        pos: usize,
        source: &str,
    ) -> Result<(), XsltError>;

    fn empty_element(
        &mut self,
        name: &str,
        attrs: OwnedAttributes,
        pos: usize,
        source: &str,
    ) -> Result<(), XsltError> {
        self.start_element(name, attrs, pos, source)?;
        self.end_element(name, pos, source)
    }

    fn end_element(&mut self, name: &str, pos: usize, source: &str) -> Result<(), XsltError>;

    fn text(&mut self, text: String) -> Result<(), XsltError>;
}

/// The main entry point for compiling an XSLT stylesheet.
pub fn compile(source: &str) -> Result<CompiledStylesheet, XsltError> {
    let mut builder = CompilerBuilder::new();
    parser::parse_stylesheet_content(source, &mut builder)?;
    builder.finalize()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SortableKind {
    ForEach,
    ApplyTemplates,
}

/// Represents the current state of the builder, tracking nested structures.
pub(crate) enum BuilderState {
    Stylesheet,
    Template {
        attrs: OwnedAttributes,
        params: Vec<Param>,
        /// Synthesized for a literal result element used as the whole stylesheet.
        simplified: bool,
    },
    Variable {
        attrs: OwnedAttributes,
        is_param: bool,
        top_level: bool,
    },
    WithParam(OwnedAttributes),
    Sortable {
        kind: SortableKind,
        attrs: OwnedAttributes,
        sort_keys: Vec<SortKey>,
        params: Vec<WithParam>,
    },
    CallTemplate {
        name: String,
        params: Vec<WithParam>,
    },
    Choose {
        whens: Vec<When>,
        otherwise: Option<PreparsedTemplate>,
    },
    When(OwnedAttributes),
    Otherwise,
    AttributeSet {
        name: String,
        use_attribute_sets: Vec<String>,
    },
    XslText,
    /// Any other XSLT element, finished by its local name when it closes.
    Instruction {
        local: String,
        attrs: OwnedAttributes,
    },
    LiteralElement {
        name: String,
        attrs: OwnedAttributes,
    },
    /// Foreign top-level elements and `xsl:fallback`; their content is dropped.
    Ignored,
}

/// A stateful builder that constructs a `CompiledStylesheet` from parser events.
pub struct CompilerBuilder {
    pub(crate) stylesheet: CompiledStylesheet,
    pub(crate) rule_count: usize,
    pub(crate) instruction_stack: Vec<Vec<XsltInstruction>>,
    pub(crate) state_stack: Vec<BuilderState>,
    /// Namespace URIs never copied to the result by literal result elements.
    pub(crate) excluded_namespaces: Vec<String>,
    namespace_stack: Vec<Vec<(String, String)>>,
    preserve_space_stack: Vec<bool>,
    seen_document_element: bool,
}

impl CompilerBuilder {
    pub fn new() -> Self {
        Self {
            stylesheet: CompiledStylesheet::default(),
            rule_count: 0,
            instruction_stack: vec![],
            state_stack: vec![],
            excluded_namespaces: vec![XSLT_NAMESPACE.to_string()],
            namespace_stack: vec![],
            preserve_space_stack: vec![],
            seen_document_element: false,
        }
    }

    /// Consumes the builder to produce the final, compiled artifact.
    pub fn finalize(mut self) -> Result<CompiledStylesheet, XsltError> {
        if !self.seen_document_element {
            return Err(XsltError::Compilation(
                "The stylesheet has no document element".to_string(),
            ));
        }
        for rules in self.stylesheet.template_rules.values_mut() {
            rules.sort_by(|a, b| {
                b.priority
                    .partial_cmp(&a.priority)
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then(b.order.cmp(&a.order))
            });
        }
        log::debug!(
            "Compiled stylesheet: {} modes, {} named templates, {} globals",
            self.stylesheet.template_rules.len(),
            self.stylesheet.named_templates.len(),
            self.stylesheet.globals.len()
        );
        Ok(self.stylesheet)
    }

    pub(crate) fn location(source: &str, pos: usize) -> Location {
        get_line_col_from_pos(source, pos).into()
    }

    pub(crate) fn structure_error(message: impl Into<String>, pos: usize, source: &str) -> XsltError {
        XsltError::TemplateStructure {
            message: message.into(),
            location: Self::location(source, pos),
        }
    }

    /// Appends a compiled instruction to the body of the enclosing element.
    pub(crate) fn push_instruction(&mut self, instruction: XsltInstruction) {
        if let Some(parent) = self.instruction_stack.last_mut() {
            parent.push(instruction);
        }
    }

    /// Resolves a namespace prefix against the declarations in scope.
    /// The empty prefix is the default namespace.
    pub(crate) fn resolve_prefix(&self, prefix: &str) -> Option<&str> {
        if prefix == "xml" {
            return Some(XML_NAMESPACE);
        }
        self.namespace_stack
            .iter()
            .rev()
            .flat_map(|frame| frame.iter().rev())
            .find(|(p, _)| p == prefix)
            .map(|(_, uri)| uri.as_str())
            .filter(|uri| !uri.is_empty())
    }

    /// Splits a qualified name into its namespace URI and local part.
    /// Unprefixed names take the default namespace only when `use_default` is set.
    pub(crate) fn expand_qname<'n>(
        &self,
        qname: &'n str,
        use_default: bool,
        pos: usize,
        source: &str,
    ) -> Result<(Option<String>, &'n str), XsltError> {
        match qname.split_once(':') {
            Some((prefix, local)) => {
                let uri = self.resolve_prefix(prefix).ok_or_else(|| {
                    Self::structure_error(
                        format!("Undeclared namespace prefix '{}' in '{}'", prefix, qname),
                        pos,
                        source,
                    )
                })?;
                Ok((Some(uri.to_string()), local))
            }
            None if use_default => Ok((self.resolve_prefix("").map(str::to_string), qname)),
            None => Ok((None, qname)),
        }
    }

    /// Whether the attribute name is in the XSLT namespace and has the given local part.
    pub(crate) fn is_xslt_attribute(&self, name: &str, local: &str) -> bool {
        match name.split_once(':') {
            Some((prefix, l)) => l == local && self.resolve_prefix(prefix) == Some(XSLT_NAMESPACE),
            None => false,
        }
    }

    fn push_namespace_frame(&mut self, attrs: &OwnedAttributes) {
        let mut frame = Vec::new();
        for (key, value) in attrs {
            let prefix = if key == "xmlns" {
                ""
            } else if let Some(prefix) = key.strip_prefix("xmlns:") {
                prefix
            } else {
                continue;
            };
            if !prefix.is_empty() {
                self.stylesheet
                    .namespaces
                    .entry(prefix.to_string())
                    .or_insert_with(|| value.clone());
            }
            frame.push((prefix.to_string(), value.clone()));
        }
        self.namespace_stack.push(frame);
    }

    fn preserves_space(&self) -> bool {
        self.preserve_space_stack.last().copied().unwrap_or(false)
    }

    fn parent_is(&self, check: impl Fn(&BuilderState) -> bool) -> bool {
        self.state_stack.last().is_some_and(check)
    }

    fn handle_xslt_start(
        &mut self,
        local: &str,
        attrs: OwnedAttributes,
        pos: usize,
        source: &str,
    ) -> Result<(), XsltError> {
        if self.parent_is(|s| matches!(s, BuilderState::Stylesheet)) {
            return self.handle_top_level_start(local, attrs, pos, source);
        }
        let state = match local {
            "stylesheet" | "transform" => {
                return Err(Self::structure_error(
                    format!("<xsl:{}> must be the document element", local),
                    pos,
                    source,
                ));
            }
            "param" => {
                if !self.parent_is(|s| matches!(s, BuilderState::Template { .. })) {
                    return Err(Self::structure_error(
                        "<xsl:param> is only allowed at the top level or at the start of a template",
                        pos,
                        source,
                    ));
                }
                BuilderState::Variable {
                    attrs,
                    is_param: true,
                    top_level: false,
                }
            }
            "variable" => BuilderState::Variable {
                attrs,
                is_param: false,
                top_level: false,
            },
            "with-param" => self.handle_with_param_start(attrs, pos, source)?,
            "for-each" => Self::sortable(SortableKind::ForEach, attrs),
            "apply-templates" => Self::sortable(SortableKind::ApplyTemplates, attrs),
            "call-template" => self.handle_call_template_start(attrs, pos, source)?,
            "choose" => BuilderState::Choose {
                whens: vec![],
                otherwise: None,
            },
            "when" => self.handle_when_start(attrs, pos, source)?,
            "otherwise" => self.handle_otherwise_start(pos, source)?,
            "text" => BuilderState::XslText,
            "fallback" => BuilderState::Ignored,
            "sort" => {
                if !self.parent_is(|s| matches!(s, BuilderState::Sortable { .. })) {
                    return Err(Self::structure_error(
                        "<xsl:sort> must be a child of <xsl:for-each> or <xsl:apply-templates>",
                        pos,
                        source,
                    ));
                }
                BuilderState::Instruction {
                    local: local.to_string(),
                    attrs,
                }
            }
            "if" | "value-of" | "copy-of" | "copy" | "element" | "attribute" | "comment"
            | "processing-instruction" | "number" | "message" => BuilderState::Instruction {
                local: local.to_string(),
                attrs,
            },
            _ => {
                return Err(Self::structure_error(
                    format!("Unsupported XSLT instruction <xsl:{}>", local),
                    pos,
                    source,
                ));
            }
        };
        self.state_stack.push(state);
        Ok(())
    }

    fn sortable(kind: SortableKind, attrs: OwnedAttributes) -> BuilderState {
        BuilderState::Sortable {
            kind,
            attrs,
            sort_keys: vec![],
            params: vec![],
        }
    }

    fn handle_state_end(
        &mut self,
        state: BuilderState,
        body: Vec<XsltInstruction>,
        pos: usize,
        source: &str,
    ) -> Result<(), XsltError> {
        match state {
            BuilderState::Stylesheet | BuilderState::Ignored => Ok(()),
            BuilderState::Template { .. } => self.handle_template_end(state, body, pos, source),
            BuilderState::Variable { .. } => self.handle_variable_end(state, body, pos, source),
            BuilderState::WithParam(attrs) => self.handle_with_param_end(attrs, body, pos, source),
            BuilderState::Sortable { .. } => self.handle_sortable_end(state, body, pos, source),
            BuilderState::CallTemplate { name, params } => {
                self.push_instruction(XsltInstruction::CallTemplate { name, params });
                Ok(())
            }
            BuilderState::Choose { whens, otherwise } => {
                self.handle_choose_end(whens, otherwise, body, pos, source)
            }
            BuilderState::When(attrs) => self.handle_when_end(attrs, body, pos, source),
            BuilderState::Otherwise => self.handle_otherwise_end(body),
            BuilderState::AttributeSet {
                name,
                use_attribute_sets,
            } => self.handle_attribute_set_end(name, use_attribute_sets, body, pos, source),
            BuilderState::XslText => self.handle_text_end(body, pos, source),
            BuilderState::Instruction { local, attrs } => {
                self.handle_instruction_end(&local, attrs, body, pos, source)
            }
            BuilderState::LiteralElement { name, attrs } => {
                self.handle_literal_result_element_end(name, attrs, body, pos, source)
            }
        }
    }
}

impl Default for CompilerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl StylesheetBuilder for CompilerBuilder {
    fn start_element(
        &mut self,
        name: &str,
        attrs: OwnedAttributes,
        pos: usize,
        source: &str,
    ) -> Result<(), XsltError> {
        self.push_namespace_frame(&attrs);
        let preserve = match get_attr_owned_optional(&attrs, "xml:space").as_deref() {
            Some("preserve") => true,
            Some("default") => false,
            _ => self.preserves_space(),
        };
        self.preserve_space_stack.push(preserve);

        let (uri, local) = self.expand_qname(name, true, pos, source)?;
        let is_xslt = uri.as_deref() == Some(XSLT_NAMESPACE);

        if self.state_stack.is_empty() {
            if self.seen_document_element {
                return Err(Self::structure_error(
                    "Content after the document element",
                    pos,
                    source,
                ));
            }
            self.seen_document_element = true;
            if is_xslt && (local == "stylesheet" || local == "transform") {
                self.handle_stylesheet_start(&attrs, pos, source)?;
                self.instruction_stack.push(Vec::new());
                self.state_stack.push(BuilderState::Stylesheet);
                return Ok(());
            }
            if is_xslt {
                return Err(Self::structure_error(
                    format!("<{}> is not a valid stylesheet document element", name),
                    pos,
                    source,
                ));
            }
            self.handle_simplified_stylesheet_start(&attrs, pos, source)?;
        }

        self.instruction_stack.push(Vec::new());

        if self.parent_is(|s| matches!(s, BuilderState::Ignored)) {
            self.state_stack.push(BuilderState::Ignored);
        } else if is_xslt {
            self.handle_xslt_start(local, attrs, pos, source)?;
        } else if self.parent_is(|s| matches!(s, BuilderState::Stylesheet)) {
            log::debug!("Ignoring top-level element <{}>", name);
            self.state_stack.push(BuilderState::Ignored);
        } else {
            self.handle_literal_result_element_start(name, attrs, pos, source)?;
        }
        Ok(())
    }

    fn end_element(&mut self, name: &str, pos: usize, source: &str) -> Result<(), XsltError> {
        let body = self.instruction_stack.pop().unwrap_or_default();
        let state = self.state_stack.pop().ok_or_else(|| {
            Self::structure_error(format!("Unexpected end tag </{}>", name), pos, source)
        })?;
        let result = self.handle_state_end(state, body, pos, source);
        self.namespace_stack.pop();
        self.preserve_space_stack.pop();
        result?;

        if self.state_stack.len() == 1
            && self.parent_is(|s| matches!(s, BuilderState::Template { simplified: true, .. }))
        {
            let body = self.instruction_stack.pop().unwrap_or_default();
            if let Some(state) = self.state_stack.pop() {
                self.handle_template_end(state, body, pos, source)?;
            }
        }
        Ok(())
    }

    fn text(&mut self, text: String) -> Result<(), XsltError> {
        let in_xsl_text = self.parent_is(|s| matches!(s, BuilderState::XslText));
        let significant = !text.trim().is_empty();
        if !(in_xsl_text || significant || self.preserves_space()) {
            return Ok(());
        }
        match self.state_stack.last() {
            None | Some(BuilderState::Ignored) => {}
            Some(BuilderState::Stylesheet) => {
                if significant {
                    log::warn!("Ignoring text at the top level of the stylesheet: {:?}", text.trim());
                }
            }
            Some(_) => self.push_instruction(XsltInstruction::Text(text)),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{AttributeValueTemplate, OutputSettings, SpaceTest, VariableValue};
    use xslview_dom::OutputMethod;

    fn sheet(body: &str) -> String {
        format!(
            r#"<xsl:stylesheet version="1.0" xmlns:xsl="http://www.w3.org/1999/XSL/Transform">{}</xsl:stylesheet>"#,
            body
        )
    }

    fn root_body(compiled: &CompiledStylesheet) -> &PreparsedTemplate {
        &compiled.template_rules[&None][0].template.body
    }

    #[test]
    fn test_compiles_literal_elements_and_text() {
        let compiled = compile(&sheet(
            r#"<xsl:template match="/"><p class="x">Hi <xsl:value-of select="name"/></p></xsl:template>"#,
        ))
        .unwrap();
        let body = root_body(&compiled);
        assert_eq!(body.0.len(), 1);
        let XsltInstruction::LiteralElement { name, attrs, body, .. } = &body.0[0] else {
            panic!("expected a literal result element");
        };
        assert_eq!(name, "p");
        assert_eq!(
            attrs,
            &vec![(
                "class".to_string(),
                AttributeValueTemplate::Static("x".to_string())
            )]
        );
        assert_eq!(body.0[0], XsltInstruction::Text("Hi ".to_string()));
        assert!(matches!(body.0[1], XsltInstruction::ValueOf { .. }));
    }

    #[test]
    fn test_whitespace_only_text_is_stripped_except_in_xsl_text() {
        let compiled = compile(&sheet(
            "<xsl:template match=\"/\">\n  <b/>\n  <xsl:text> </xsl:text>\n</xsl:template>",
        ))
        .unwrap();
        let body = root_body(&compiled);
        assert_eq!(body.0.len(), 2);
        assert_eq!(body.0[1], XsltInstruction::Text(" ".to_string()));
    }

    #[test]
    fn test_xml_space_preserve_keeps_whitespace() {
        let compiled = compile(&sheet(
            r#"<xsl:template match="/"><pre xml:space="preserve">  </pre></xsl:template>"#,
        ))
        .unwrap();
        let XsltInstruction::LiteralElement { body, .. } = &root_body(&compiled).0[0] else {
            panic!("expected a literal result element");
        };
        assert_eq!(body.0, vec![XsltInstruction::Text("  ".to_string())]);
    }

    #[test]
    fn test_union_pattern_registers_rule_per_alternative() {
        let compiled = compile(&sheet(
            r#"<xsl:template match="a | b/c">x</xsl:template><xsl:template match="*" mode="m">y</xsl:template>"#,
        ))
        .unwrap();
        let rules = &compiled.template_rules[&None];
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[0].priority, 0.5);
        assert_eq!(rules[1].priority, 0.0);
        assert!(std::sync::Arc::ptr_eq(&rules[0].template, &rules[1].template));
        assert_eq!(compiled.template_rules[&Some("m".to_string())].len(), 1);
    }

    #[test]
    fn test_rules_sorted_by_priority_then_declaration_order() {
        let compiled = compile(&sheet(
            r#"<xsl:template match="a">1</xsl:template>
               <xsl:template match="a" priority="2">2</xsl:template>
               <xsl:template match="a">3</xsl:template>"#,
        ))
        .unwrap();
        let texts: Vec<_> = compiled.template_rules[&None]
            .iter()
            .map(|r| r.template.body.0[0].clone())
            .collect();
        assert_eq!(
            texts,
            vec![
                XsltInstruction::Text("2".to_string()),
                XsltInstruction::Text("3".to_string()),
                XsltInstruction::Text("1".to_string()),
            ]
        );
    }

    #[test]
    fn test_named_template_params_and_globals() {
        let compiled = compile(&sheet(
            r#"<xsl:param name="title" select="'T'"/>
               <xsl:variable name="v">content</xsl:variable>
               <xsl:template name="t"><xsl:param name="p"/><xsl:value-of select="$p"/></xsl:template>"#,
        ))
        .unwrap();
        let template = &compiled.named_templates["t"];
        assert_eq!(template.params.len(), 1);
        assert_eq!(template.params[0].value, VariableValue::Empty);
        assert_eq!(template.body.0.len(), 1);
        assert_eq!(compiled.globals.len(), 2);
        assert!(compiled.globals[0].is_param);
        assert!(matches!(compiled.globals[1].value, VariableValue::Content(_)));
    }

    #[test]
    fn test_choose_and_sort_structure() {
        let compiled = compile(&sheet(
            r#"<xsl:template match="/">
                 <xsl:for-each select="*"><xsl:sort select="@n" data-type="number" order="descending"/>
                   <xsl:choose><xsl:when test="@a">a</xsl:when><xsl:otherwise>b</xsl:otherwise></xsl:choose>
                 </xsl:for-each>
               </xsl:template>"#,
        ))
        .unwrap();
        let XsltInstruction::ForEach { sort_keys, body, .. } = &root_body(&compiled).0[0] else {
            panic!("expected for-each");
        };
        assert_eq!(sort_keys.len(), 1);
        assert_eq!(sort_keys[0].order, crate::ast::SortOrder::Descending);
        assert_eq!(sort_keys[0].data_type, crate::ast::SortDataType::Number);
        let XsltInstruction::Choose { whens, otherwise } = &body.0[0] else {
            panic!("expected choose");
        };
        assert_eq!(whens.len(), 1);
        assert!(otherwise.is_some());
    }

    #[test]
    fn test_top_level_declarations() {
        let compiled = compile(&sheet(
            r#"<xsl:output method="xml" indent="yes"/>
               <xsl:strip-space elements="*"/>
               <xsl:preserve-space elements="pre"/>
               <xsl:key name="k" match="item" use="@id"/>
               <xsl:attribute-set name="s"><xsl:attribute name="class">c</xsl:attribute></xsl:attribute-set>
               <xsl:decimal-format name="d"/>"#,
        ))
        .unwrap();
        assert_eq!(
            compiled.output,
            OutputSettings {
                method: Some(OutputMethod::Xml),
                indent: true,
                encoding: None,
            }
        );
        assert_eq!(compiled.space_rules.strip, vec![SpaceTest::Any]);
        assert_eq!(compiled.space_rules.preserve.len(), 1);
        assert_eq!(compiled.keys[0].name, "k");
        assert_eq!(compiled.attribute_sets["s"].attributes.len(), 1);
    }

    #[test]
    fn test_namespace_prefixes_recorded() {
        let compiled = compile(
            r#"<t:stylesheet version="1.0" xmlns:t="http://www.w3.org/1999/XSL/Transform" xmlns:a="urn:a">
                 <t:template match="a:item">x</t:template>
               </t:stylesheet>"#,
        )
        .unwrap();
        assert_eq!(compiled.namespaces["a"], "urn:a");
        assert_eq!(compiled.template_rules[&None].len(), 1);
    }

    #[test]
    fn test_excluded_namespaces_not_copied() {
        let compiled = compile(
            r#"<xsl:stylesheet version="1.0" xmlns:xsl="http://www.w3.org/1999/XSL/Transform"
                 xmlns:a="urn:a" exclude-result-prefixes="a">
                 <xsl:template match="/"><div xmlns:b="urn:b" xmlns:a="urn:a"/></xsl:template>
               </xsl:stylesheet>"#,
        )
        .unwrap();
        let XsltInstruction::LiteralElement { attrs, .. } = &root_body(&compiled).0[0] else {
            panic!("expected a literal result element");
        };
        let names: Vec<_> = attrs.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["xmlns:b"]);
    }

    #[test]
    fn test_simplified_stylesheet() {
        let compiled = compile(
            r#"<html xsl:version="1.0" xmlns:xsl="http://www.w3.org/1999/XSL/Transform"><xsl:value-of select="/doc"/></html>"#,
        )
        .unwrap();
        let rules = &compiled.template_rules[&None];
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].pattern.to_string(), "/");
        let XsltInstruction::LiteralElement { name, attrs, .. } = &rules[0].template.body.0[0] else {
            panic!("expected a literal result element");
        };
        assert_eq!(name, "html");
        assert!(attrs.is_empty());
    }

    #[test]
    fn test_structure_errors() {
        let cases = [
            r#"<xsl:template match="/"><xsl:value-of/></xsl:template>"#,
            r#"<xsl:template match="/"><xsl:when test="1"/></xsl:template>"#,
            r#"<xsl:template match="/"><xsl:bogus/></xsl:template>"#,
            r#"<xsl:template>x</xsl:template>"#,
            r#"<xsl:template match="/"><p:x/></xsl:template>"#,
            r#"<xsl:template match="/"><xsl:choose/></xsl:template>"#,
            r#"<xsl:import href="other.xsl"/>"#,
            r#"<xsl:template match="/"><xsl:param name="late"/><xsl:if test="1"><xsl:param name="p"/></xsl:if></xsl:template>"#,
        ];
        for case in cases {
            assert!(compile(&sheet(case)).is_err(), "expected an error for {}", case);
        }
    }

    #[test]
    fn test_missing_attribute_reports_location() {
        let err = compile(&sheet("\n<xsl:template match=\"/\">\n<xsl:copy-of/></xsl:template>"))
            .unwrap_err();
        match err {
            XsltError::TemplateStructure { location, message } => {
                assert_eq!(location.line, 3);
                assert!(message.contains("select"));
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_not_a_stylesheet() {
        assert!(compile("").is_err());
        assert!(compile("<doc/>").is_err());
    }
}
