//! Handlers for `<xsl:variable>`, `<xsl:param>`, and `<xsl:with-param>`.

use crate::ast::{GlobalBinding, Param, PreparsedTemplate, VariableValue, WithParam, XsltInstruction};
use crate::compiler::{BuilderState, CompilerBuilder, SortableKind};
use crate::error::XsltError;
use crate::util::{OwnedAttributes, get_attr_owned_optional, get_attr_owned_required};

impl CompilerBuilder {
    fn variable_value(
        &self,
        attrs: &OwnedAttributes,
        body: Vec<XsltInstruction>,
        tag: &str,
        pos: usize,
        source: &str,
    ) -> Result<VariableValue, XsltError> {
        match get_attr_owned_optional(attrs, "select") {
            Some(_) if !body.is_empty() => Err(Self::structure_error(
                format!("<{}> cannot have both a select attribute and content", tag),
                pos,
                source,
            )),
            Some(select) => Ok(VariableValue::Select(self.parse_xpath(&select, pos, source)?)),
            None if body.is_empty() => Ok(VariableValue::Empty),
            None => Ok(VariableValue::Content(PreparsedTemplate(body))),
        }
    }

    pub(crate) fn handle_variable_end(
        &mut self,
        current_state: BuilderState,
        body: Vec<XsltInstruction>,
        pos: usize,
        source: &str,
    ) -> Result<(), XsltError> {
        let BuilderState::Variable {
            attrs,
            is_param,
            top_level,
        } = current_state
        else {
            return Ok(());
        };
        let tag = if is_param { "xsl:param" } else { "xsl:variable" };
        let name = get_attr_owned_required(&attrs, "name", tag, pos, source)?;
        let value = self.variable_value(&attrs, body, tag, pos, source)?;

        if top_level {
            if self.stylesheet.globals.iter().any(|g| g.name == name) {
                return Err(Self::structure_error(
                    format!("Duplicate top-level variable or parameter '{}'", name),
                    pos,
                    source,
                ));
            }
            self.stylesheet.globals.push(GlobalBinding {
                name,
                value,
                is_param,
            });
            return Ok(());
        }

        if is_param {
            match self.state_stack.last_mut() {
                Some(BuilderState::Template { params, .. }) => {
                    params.push(Param { name, value });
                    Ok(())
                }
                _ => Err(Self::structure_error(
                    "<xsl:param> is only allowed at the top level or at the start of a template",
                    pos,
                    source,
                )),
            }
        } else {
            self.push_instruction(XsltInstruction::Variable { name, value });
            Ok(())
        }
    }

    pub(crate) fn handle_with_param_start(
        &mut self,
        attrs: OwnedAttributes,
        pos: usize,
        source: &str,
    ) -> Result<BuilderState, XsltError> {
        match self.state_stack.last() {
            Some(BuilderState::CallTemplate { .. })
            | Some(BuilderState::Sortable {
                kind: SortableKind::ApplyTemplates,
                ..
            }) => Ok(BuilderState::WithParam(attrs)),
            _ => Err(Self::structure_error(
                "<xsl:with-param> must be a direct child of <xsl:call-template> or <xsl:apply-templates>",
                pos,
                source,
            )),
        }
    }

    pub(crate) fn handle_with_param_end(
        &mut self,
        attrs: OwnedAttributes,
        body: Vec<XsltInstruction>,
        pos: usize,
        source: &str,
    ) -> Result<(), XsltError> {
        let name = get_attr_owned_required(&attrs, "name", "xsl:with-param", pos, source)?;
        let value = self.variable_value(&attrs, body, "xsl:with-param", pos, source)?;
        match self.state_stack.last_mut() {
            Some(BuilderState::CallTemplate { params, .. })
            | Some(BuilderState::Sortable { params, .. }) => {
                params.push(WithParam { name, value });
                Ok(())
            }
            _ => Err(Self::structure_error(
                "<xsl:with-param> must be a direct child of <xsl:call-template> or <xsl:apply-templates>",
                pos,
                source,
            )),
        }
    }
}
