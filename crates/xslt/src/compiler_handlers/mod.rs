pub(super) mod control_flow;
pub(super) mod stylesheet;
pub(super) mod template;
pub(super) mod variables;

use crate::ast::{AttributeValueTemplate, NumberLevel, NumberSpec, PreparsedTemplate, XsltInstruction};
use crate::compiler::{BuilderState, CompilerBuilder};
use crate::error::XsltError;
use crate::pattern::{self, Pattern};
use crate::util::{OwnedAttributes, get_attr_owned_optional, get_attr_owned_required, parse_avt};
use xslview_xpath1::{Expression, XSLT_NAMESPACE, parse_expression};

// Handlers for literal result elements and the instructions that need no
// bookkeeping beyond their own attributes and body.

impl CompilerBuilder {
    pub(crate) fn parse_xpath(&self, text: &str, pos: usize, source: &str) -> Result<Expression, XsltError> {
        parse_expression(text).map_err(|e| {
            Self::structure_error(format!("Invalid expression '{}': {}", text, e), pos, source)
        })
    }

    pub(crate) fn parse_pattern(&self, text: &str, pos: usize, source: &str) -> Result<Pattern, XsltError> {
        pattern::parse(text).map_err(|e| {
            Self::structure_error(format!("Invalid pattern '{}': {}", text, e), pos, source)
        })
    }

    pub(crate) fn parse_avt_at(
        &self,
        text: &str,
        pos: usize,
        source: &str,
    ) -> Result<AttributeValueTemplate, XsltError> {
        parse_avt(text).map_err(|e| Self::structure_error(e.to_string(), pos, source))
    }

    pub(crate) fn required_expression(
        &self,
        attrs: &OwnedAttributes,
        name: &str,
        tag: &str,
        pos: usize,
        source: &str,
    ) -> Result<Expression, XsltError> {
        let text = get_attr_owned_required(attrs, name, tag, pos, source)?;
        self.parse_xpath(&text, pos, source)
    }

    fn attribute_set_names(value: Option<String>) -> Vec<String> {
        value
            .map(|v| v.split_whitespace().map(str::to_string).collect())
            .unwrap_or_default()
    }

    pub(crate) fn handle_literal_result_element_start(
        &mut self,
        name: &str,
        attrs: OwnedAttributes,
        _pos: usize,
        _source: &str,
    ) -> Result<(), XsltError> {
        self.state_stack.push(BuilderState::LiteralElement {
            name: name.to_string(),
            attrs,
        });
        Ok(())
    }

    pub(crate) fn handle_literal_result_element_end(
        &mut self,
        name: String,
        attrs: OwnedAttributes,
        body: Vec<XsltInstruction>,
        pos: usize,
        source: &str,
    ) -> Result<(), XsltError> {
        let mut excluded = self.excluded_namespaces.clone();
        if let Some((_, prefixes)) = attrs
            .iter()
            .find(|(k, _)| self.is_xslt_attribute(k, "exclude-result-prefixes"))
        {
            excluded.extend(self.resolve_prefix_list(prefixes, pos, source)?);
        }

        let mut use_attribute_sets = Vec::new();
        let mut literal_attrs = Vec::new();
        for (key, value) in &attrs {
            if key == "xmlns" || key.starts_with("xmlns:") {
                if !value.is_empty() && !excluded.contains(value) {
                    literal_attrs.push((key.clone(), AttributeValueTemplate::Static(value.clone())));
                }
                continue;
            }
            if let Some((prefix, local)) = key.split_once(':')
                && self.resolve_prefix(prefix) == Some(XSLT_NAMESPACE)
            {
                if local == "use-attribute-sets" {
                    use_attribute_sets = Self::attribute_set_names(Some(value.clone()));
                }
                continue;
            }
            literal_attrs.push((key.clone(), self.parse_avt_at(value, pos, source)?));
        }

        self.push_instruction(XsltInstruction::LiteralElement {
            name,
            attrs: literal_attrs,
            use_attribute_sets,
            body: PreparsedTemplate(body),
        });
        Ok(())
    }

    pub(crate) fn handle_text_end(
        &mut self,
        body: Vec<XsltInstruction>,
        pos: usize,
        source: &str,
    ) -> Result<(), XsltError> {
        let mut text = String::new();
        for instruction in body {
            match instruction {
                XsltInstruction::Text(t) => text.push_str(&t),
                _ => {
                    return Err(Self::structure_error(
                        "<xsl:text> may only contain character data",
                        pos,
                        source,
                    ));
                }
            }
        }
        if !text.is_empty() {
            self.push_instruction(XsltInstruction::Text(text));
        }
        Ok(())
    }

    /// Finishes an element recorded as `BuilderState::Instruction`.
    pub(crate) fn handle_instruction_end(
        &mut self,
        local: &str,
        attrs: OwnedAttributes,
        body: Vec<XsltInstruction>,
        pos: usize,
        source: &str,
    ) -> Result<(), XsltError> {
        let tag = format!("xsl:{}", local);
        let body = PreparsedTemplate(body);
        let instruction = match local {
            "value-of" => {
                if get_attr_owned_optional(&attrs, "disable-output-escaping").as_deref() == Some("yes") {
                    log::warn!("disable-output-escaping is not supported and is ignored");
                }
                XsltInstruction::ValueOf {
                    select: self.required_expression(&attrs, "select", &tag, pos, source)?,
                }
            }
            "copy-of" => XsltInstruction::CopyOf {
                select: self.required_expression(&attrs, "select", &tag, pos, source)?,
            },
            "copy" => XsltInstruction::Copy {
                use_attribute_sets: Self::attribute_set_names(get_attr_owned_optional(
                    &attrs,
                    "use-attribute-sets",
                )),
                body,
            },
            "element" => {
                let name = get_attr_owned_required(&attrs, "name", &tag, pos, source)?;
                if get_attr_owned_optional(&attrs, "namespace").is_some() {
                    log::warn!("The namespace attribute of <xsl:element> is ignored");
                }
                XsltInstruction::Element {
                    name: self.parse_avt_at(&name, pos, source)?,
                    use_attribute_sets: Self::attribute_set_names(get_attr_owned_optional(
                        &attrs,
                        "use-attribute-sets",
                    )),
                    body,
                }
            }
            "attribute" => {
                let name = get_attr_owned_required(&attrs, "name", &tag, pos, source)?;
                if get_attr_owned_optional(&attrs, "namespace").is_some() {
                    log::warn!("The namespace attribute of <xsl:attribute> is ignored");
                }
                XsltInstruction::Attribute {
                    name: self.parse_avt_at(&name, pos, source)?,
                    body,
                }
            }
            "comment" => XsltInstruction::Comment { body },
            "processing-instruction" => {
                let name = get_attr_owned_required(&attrs, "name", &tag, pos, source)?;
                XsltInstruction::ProcessingInstruction {
                    name: self.parse_avt_at(&name, pos, source)?,
                    body,
                }
            }
            "if" => XsltInstruction::If {
                test: self.required_expression(&attrs, "test", &tag, pos, source)?,
                body,
            },
            "message" => XsltInstruction::Message {
                terminate: get_attr_owned_optional(&attrs, "terminate").as_deref() == Some("yes"),
                body,
            },
            "number" => self.compile_number(&attrs, pos, source)?,
            "sort" => return self.handle_sort_end(&attrs, pos, source),
            "output" | "strip-space" | "preserve-space" | "key" | "decimal-format"
            | "namespace-alias" => return self.handle_declaration_end(local, &attrs, pos, source),
            _ => {
                return Err(Self::structure_error(
                    format!("Unsupported XSLT instruction <{}>", tag),
                    pos,
                    source,
                ));
            }
        };
        self.push_instruction(instruction);
        Ok(())
    }

    fn compile_number(
        &self,
        attrs: &OwnedAttributes,
        pos: usize,
        source: &str,
    ) -> Result<XsltInstruction, XsltError> {
        let level = match get_attr_owned_optional(attrs, "level").as_deref() {
            None | Some("single") => NumberLevel::Single,
            Some("multiple") => NumberLevel::Multiple,
            Some("any") => NumberLevel::Any,
            Some(other) => {
                return Err(Self::structure_error(
                    format!("Invalid xsl:number level '{}'", other),
                    pos,
                    source,
                ));
            }
        };
        let optional_pattern = |name: &str| {
            get_attr_owned_optional(attrs, name)
                .map(|p| self.parse_pattern(&p, pos, source))
                .transpose()
        };
        let format = get_attr_owned_optional(attrs, "format").unwrap_or_else(|| "1".to_string());
        Ok(XsltInstruction::Number(Box::new(NumberSpec {
            value: get_attr_owned_optional(attrs, "value")
                .map(|v| self.parse_xpath(&v, pos, source))
                .transpose()?,
            level,
            count: optional_pattern("count")?,
            from: optional_pattern("from")?,
            format: self.parse_avt_at(&format, pos, source)?,
        })))
    }
}
