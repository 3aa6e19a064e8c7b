//! Handlers for templates and the instructions that invoke them.

use crate::ast::{
    PreparsedTemplate, SortDataType, SortKey, SortOrder, Template, TemplateRule, XsltInstruction,
};
use crate::compiler::{BuilderState, CompilerBuilder, SortableKind};
use crate::error::XsltError;
use crate::util::{OwnedAttributes, get_attr_owned_optional, get_attr_owned_required};
use std::sync::Arc;

impl CompilerBuilder {
    pub(crate) fn handle_template_end(
        &mut self,
        current_state: BuilderState,
        body: Vec<XsltInstruction>,
        pos: usize,
        source: &str,
    ) -> Result<(), XsltError> {
        let BuilderState::Template { attrs, params, .. } = current_state else {
            return Ok(());
        };
        let match_str = get_attr_owned_optional(&attrs, "match");
        let name = get_attr_owned_optional(&attrs, "name");
        let mode = get_attr_owned_optional(&attrs, "mode");
        if match_str.is_none() && name.is_none() {
            return Err(Self::structure_error(
                "<xsl:template> needs a match or a name attribute",
                pos,
                source,
            ));
        }

        let template = Arc::new(Template {
            params,
            body: PreparsedTemplate(body),
        });

        if let Some(match_str) = match_str {
            let pattern = self.parse_pattern(&match_str, pos, source)?;
            let priority = get_attr_owned_optional(&attrs, "priority")
                .map(|p| {
                    p.trim().parse::<f64>().map_err(|_| {
                        Self::structure_error(format!("Invalid template priority '{}'", p), pos, source)
                    })
                })
                .transpose()?;
            for alternative in pattern.alternatives() {
                let rule = TemplateRule {
                    priority: priority.unwrap_or_else(|| alternative.default_priority()),
                    pattern: alternative,
                    mode: mode.clone(),
                    order: self.rule_count,
                    template: Arc::clone(&template),
                };
                self.rule_count += 1;
                self.stylesheet
                    .template_rules
                    .entry(mode.clone())
                    .or_default()
                    .push(rule);
            }
        } else if mode.is_some() {
            log::warn!("Ignoring mode on named template '{}' without a match pattern", name.as_deref().unwrap_or_default());
        }

        if let Some(name) = name {
            if self.stylesheet.named_templates.contains_key(&name) {
                return Err(Self::structure_error(
                    format!("Duplicate named template '{}'", name),
                    pos,
                    source,
                ));
            }
            self.stylesheet.named_templates.insert(name, template);
        }
        Ok(())
    }

    pub(crate) fn handle_call_template_start(
        &mut self,
        attrs: OwnedAttributes,
        pos: usize,
        source: &str,
    ) -> Result<BuilderState, XsltError> {
        let name = get_attr_owned_required(&attrs, "name", "xsl:call-template", pos, source)?;
        Ok(BuilderState::CallTemplate {
            name,
            params: vec![],
        })
    }

    pub(crate) fn handle_sortable_end(
        &mut self,
        current_state: BuilderState,
        body: Vec<XsltInstruction>,
        pos: usize,
        source: &str,
    ) -> Result<(), XsltError> {
        let BuilderState::Sortable {
            kind,
            attrs,
            sort_keys,
            params,
        } = current_state
        else {
            return Ok(());
        };
        let instruction = match kind {
            SortableKind::ForEach => XsltInstruction::ForEach {
                select: self.required_expression(&attrs, "select", "xsl:for-each", pos, source)?,
                sort_keys,
                body: PreparsedTemplate(body),
            },
            SortableKind::ApplyTemplates => {
                let stray = body
                    .iter()
                    .any(|i| !matches!(i, XsltInstruction::Text(t) if t.trim().is_empty()));
                if stray {
                    return Err(Self::structure_error(
                        "<xsl:apply-templates> may only contain <xsl:sort> and <xsl:with-param>",
                        pos,
                        source,
                    ));
                }
                XsltInstruction::ApplyTemplates {
                    select: get_attr_owned_optional(&attrs, "select")
                        .map(|s| self.parse_xpath(&s, pos, source))
                        .transpose()?,
                    mode: get_attr_owned_optional(&attrs, "mode"),
                    sort_keys,
                    params,
                }
            }
        };
        self.push_instruction(instruction);
        Ok(())
    }

    pub(crate) fn handle_sort_end(
        &mut self,
        attrs: &OwnedAttributes,
        pos: usize,
        source: &str,
    ) -> Result<(), XsltError> {
        let select = get_attr_owned_optional(attrs, "select").unwrap_or_else(|| ".".to_string());
        let order = match get_attr_owned_optional(attrs, "order").as_deref().map(str::trim) {
            None | Some("ascending") => SortOrder::Ascending,
            Some("descending") => SortOrder::Descending,
            Some(other) => {
                return Err(Self::structure_error(
                    format!("Invalid sort order '{}'", other),
                    pos,
                    source,
                ));
            }
        };
        let data_type = match get_attr_owned_optional(attrs, "data-type").as_deref().map(str::trim) {
            None | Some("text") => SortDataType::Text,
            Some("number") => SortDataType::Number,
            Some(other) => {
                log::warn!("Unsupported sort data-type '{}'; sorting as text", other);
                SortDataType::Text
            }
        };
        let key = SortKey {
            select: self.parse_xpath(&select, pos, source)?,
            order,
            data_type,
        };
        match self.state_stack.last_mut() {
            Some(BuilderState::Sortable { sort_keys, .. }) => {
                sort_keys.push(key);
                Ok(())
            }
            _ => Err(Self::structure_error(
                "<xsl:sort> must be a child of <xsl:for-each> or <xsl:apply-templates>",
                pos,
                source,
            )),
        }
    }
}
