//! Handlers for the stylesheet element and top-level declarations.

use crate::ast::{AttributeSet, KeyDefinition, SpaceTest, XsltInstruction};
use crate::compiler::{BuilderState, CompilerBuilder};
use crate::error::XsltError;
use crate::util::{OwnedAttributes, get_attr_owned_optional, get_attr_owned_required};
use xslview_dom::OutputMethod;

impl CompilerBuilder {
    pub(crate) fn handle_stylesheet_start(
        &mut self,
        attrs: &OwnedAttributes,
        pos: usize,
        source: &str,
    ) -> Result<(), XsltError> {
        match get_attr_owned_optional(attrs, "version") {
            Some(version) if version.trim() != "1.0" => {
                log::info!("Stylesheet declares version {}; processing it as XSLT 1.0", version)
            }
            Some(_) => {}
            None => log::warn!("Stylesheet has no version attribute"),
        }
        for name in ["exclude-result-prefixes", "extension-element-prefixes"] {
            if let Some(prefixes) = get_attr_owned_optional(attrs, name) {
                let uris = self.resolve_prefix_list(&prefixes, pos, source)?;
                self.excluded_namespaces.extend(uris);
            }
        }
        Ok(())
    }

    /// A literal result element used as the document element stands for a
    /// stylesheet with a single template matching the root.
    pub(crate) fn handle_simplified_stylesheet_start(
        &mut self,
        attrs: &OwnedAttributes,
        pos: usize,
        source: &str,
    ) -> Result<(), XsltError> {
        if !attrs.iter().any(|(k, _)| self.is_xslt_attribute(k, "version")) {
            return Err(Self::structure_error(
                "The document element is not an XSLT stylesheet",
                pos,
                source,
            ));
        }
        self.instruction_stack.push(Vec::new());
        self.state_stack.push(BuilderState::Template {
            attrs: vec![("match".to_string(), "/".to_string())],
            params: vec![],
            simplified: true,
        });
        Ok(())
    }

    /// Resolves a whitespace-separated prefix list; `#default` names the default namespace.
    pub(crate) fn resolve_prefix_list(
        &self,
        prefixes: &str,
        pos: usize,
        source: &str,
    ) -> Result<Vec<String>, XsltError> {
        prefixes
            .split_whitespace()
            .map(|prefix| {
                let lookup = if prefix == "#default" { "" } else { prefix };
                self.resolve_prefix(lookup)
                    .map(str::to_string)
                    .ok_or_else(|| {
                        Self::structure_error(
                            format!("Undeclared namespace prefix '{}'", prefix),
                            pos,
                            source,
                        )
                    })
            })
            .collect()
    }

    pub(crate) fn handle_top_level_start(
        &mut self,
        local: &str,
        attrs: OwnedAttributes,
        pos: usize,
        source: &str,
    ) -> Result<(), XsltError> {
        let state = match local {
            "template" => BuilderState::Template {
                attrs,
                params: vec![],
                simplified: false,
            },
            "variable" | "param" => BuilderState::Variable {
                attrs,
                is_param: local == "param",
                top_level: true,
            },
            "attribute-set" => {
                let name = get_attr_owned_required(&attrs, "name", "xsl:attribute-set", pos, source)?;
                BuilderState::AttributeSet {
                    name,
                    use_attribute_sets: get_attr_owned_optional(&attrs, "use-attribute-sets")
                        .map(|v| v.split_whitespace().map(str::to_string).collect())
                        .unwrap_or_default(),
                }
            }
            "output" | "strip-space" | "preserve-space" | "key" | "decimal-format"
            | "namespace-alias" => BuilderState::Instruction {
                local: local.to_string(),
                attrs,
            },
            "import" | "include" => {
                return Err(Self::structure_error(
                    format!(
                        "<xsl:{}> is not supported; the stylesheet must be self-contained",
                        local
                    ),
                    pos,
                    source,
                ));
            }
            _ => {
                return Err(Self::structure_error(
                    format!("<xsl:{}> is not allowed at the top level", local),
                    pos,
                    source,
                ));
            }
        };
        self.state_stack.push(state);
        Ok(())
    }

    pub(crate) fn handle_declaration_end(
        &mut self,
        local: &str,
        attrs: &OwnedAttributes,
        pos: usize,
        source: &str,
    ) -> Result<(), XsltError> {
        let tag = format!("xsl:{}", local);
        match local {
            "output" => {
                if let Some(method) = get_attr_owned_optional(attrs, "method") {
                    match OutputMethod::from_name(&method) {
                        Some(m) => self.stylesheet.output.method = Some(m),
                        None => log::warn!(
                            "Unsupported output method '{}'; using the default",
                            method
                        ),
                    }
                }
                if let Some(indent) = get_attr_owned_optional(attrs, "indent") {
                    self.stylesheet.output.indent = indent.trim() == "yes";
                }
                if let Some(encoding) = get_attr_owned_optional(attrs, "encoding") {
                    self.stylesheet.output.encoding = Some(encoding);
                }
            }
            "strip-space" | "preserve-space" => {
                let elements = get_attr_owned_required(attrs, "elements", &tag, pos, source)?;
                let tests = elements
                    .split_whitespace()
                    .map(|token| self.space_test(token, pos, source))
                    .collect::<Result<Vec<_>, _>>()?;
                let rules = &mut self.stylesheet.space_rules;
                if local == "strip-space" {
                    rules.strip.extend(tests);
                } else {
                    rules.preserve.extend(tests);
                }
            }
            "key" => {
                let name = get_attr_owned_required(attrs, "name", &tag, pos, source)?;
                let match_str = get_attr_owned_required(attrs, "match", &tag, pos, source)?;
                let key = KeyDefinition {
                    name,
                    pattern: self.parse_pattern(&match_str, pos, source)?,
                    use_expr: self.required_expression(attrs, "use", &tag, pos, source)?,
                };
                self.stylesheet.keys.push(key);
            }
            _ => log::warn!("<{}> is not supported and has no effect", tag),
        }
        Ok(())
    }

    fn space_test(&self, token: &str, pos: usize, source: &str) -> Result<SpaceTest, XsltError> {
        if token == "*" {
            return Ok(SpaceTest::Any);
        }
        let (namespace, local) = self.expand_qname(token, false, pos, source)?;
        Ok(match (namespace, local) {
            (Some(uri), "*") => SpaceTest::Namespace(uri),
            (namespace, local) => SpaceTest::Name {
                namespace,
                local: local.to_string(),
            },
        })
    }

    /// Repeated definitions of the same attribute set are merged in order.
    pub(crate) fn handle_attribute_set_end(
        &mut self,
        name: String,
        use_attribute_sets: Vec<String>,
        body: Vec<XsltInstruction>,
        pos: usize,
        source: &str,
    ) -> Result<(), XsltError> {
        let mut attributes = Vec::new();
        for instruction in body {
            match instruction {
                XsltInstruction::Attribute { .. } => attributes.push(instruction),
                XsltInstruction::Text(t) if t.trim().is_empty() => {}
                _ => {
                    return Err(Self::structure_error(
                        format!("<xsl:attribute-set name=\"{}\"> may only contain <xsl:attribute>", name),
                        pos,
                        source,
                    ));
                }
            }
        }
        let set: &mut AttributeSet = self.stylesheet.attribute_sets.entry(name).or_default();
        set.use_attribute_sets.extend(use_attribute_sets);
        set.attributes.extend(attributes);
        Ok(())
    }
}
