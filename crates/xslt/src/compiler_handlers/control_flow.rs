//! Handlers for `<xsl:choose>`, `<xsl:when>` and `<xsl:otherwise>`.

use crate::ast::{PreparsedTemplate, When, XsltInstruction};
use crate::compiler::{BuilderState, CompilerBuilder};
use crate::error::XsltError;
use crate::util::OwnedAttributes;

impl CompilerBuilder {
    fn choose_accepts_branch(&self) -> Option<bool> {
        match self.state_stack.last() {
            Some(BuilderState::Choose { otherwise, .. }) => Some(otherwise.is_none()),
            _ => None,
        }
    }

    pub(crate) fn handle_when_start(
        &mut self,
        attrs: OwnedAttributes,
        pos: usize,
        source: &str,
    ) -> Result<BuilderState, XsltError> {
        match self.choose_accepts_branch() {
            Some(true) => Ok(BuilderState::When(attrs)),
            Some(false) => Err(Self::structure_error(
                "<xsl:when> cannot follow <xsl:otherwise>",
                pos,
                source,
            )),
            None => Err(Self::structure_error(
                "<xsl:when> must be a direct child of <xsl:choose>",
                pos,
                source,
            )),
        }
    }

    pub(crate) fn handle_otherwise_start(
        &mut self,
        pos: usize,
        source: &str,
    ) -> Result<BuilderState, XsltError> {
        match self.choose_accepts_branch() {
            Some(true) => Ok(BuilderState::Otherwise),
            Some(false) => Err(Self::structure_error(
                "<xsl:choose> can only have one <xsl:otherwise>",
                pos,
                source,
            )),
            None => Err(Self::structure_error(
                "<xsl:otherwise> must be a direct child of <xsl:choose>",
                pos,
                source,
            )),
        }
    }

    pub(crate) fn handle_when_end(
        &mut self,
        attrs: OwnedAttributes,
        body: Vec<XsltInstruction>,
        pos: usize,
        source: &str,
    ) -> Result<(), XsltError> {
        let test = self.required_expression(&attrs, "test", "xsl:when", pos, source)?;
        if let Some(BuilderState::Choose { whens, .. }) = self.state_stack.last_mut() {
            whens.push(When {
                test,
                body: PreparsedTemplate(body),
            });
        }
        Ok(())
    }

    pub(crate) fn handle_otherwise_end(&mut self, body: Vec<XsltInstruction>) -> Result<(), XsltError> {
        if let Some(BuilderState::Choose { otherwise, .. }) = self.state_stack.last_mut() {
            *otherwise = Some(PreparsedTemplate(body));
        }
        Ok(())
    }

    pub(crate) fn handle_choose_end(
        &mut self,
        whens: Vec<When>,
        otherwise: Option<PreparsedTemplate>,
        body: Vec<XsltInstruction>,
        pos: usize,
        source: &str,
    ) -> Result<(), XsltError> {
        if whens.is_empty() {
            return Err(Self::structure_error(
                "<xsl:choose> needs at least one <xsl:when>",
                pos,
                source,
            ));
        }
        if body
            .iter()
            .any(|i| !matches!(i, XsltInstruction::Text(t) if t.trim().is_empty()))
        {
            return Err(Self::structure_error(
                "<xsl:choose> may only contain <xsl:when> and <xsl:otherwise>",
                pos,
                source,
            ));
        }
        self.push_instruction(XsltInstruction::Choose { whens, otherwise });
        Ok(())
    }
}
