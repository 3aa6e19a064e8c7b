//! Handlers for literal result elements and the instructions that construct
//! elements, attributes, comments and processing instructions.

use crate::ast::{AttributeValueTemplate, PreparsedTemplate};
use crate::executor::{ExecutionError, TemplateExecutor};
use crate::output::OutputBuilder;
use xslview_xpath1::DocumentNode;

fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    (first.is_alphabetic() || first == '_')
        && chars.all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.' | ':'))
}

#[allow(clippy::too_many_arguments)]
pub(crate) fn handle_literal_element<'s, 'a, N: DocumentNode<'a> + 'a>(
    executor: &mut TemplateExecutor<'s, 'a, N>,
    name: &str,
    attrs: &[(String, AttributeValueTemplate)],
    use_attribute_sets: &[String],
    body: &PreparsedTemplate,
    context_node: N,
    context_position: usize,
    context_size: usize,
    builder: &mut dyn OutputBuilder,
) -> Result<(), ExecutionError> {
    let evaluated_attrs = {
        let e_ctx = executor.get_eval_context(context_node, context_position, context_size);
        attrs
            .iter()
            .map(|(name, avt)| Ok((name.as_str(), executor.evaluate_avt(avt, &e_ctx)?)))
            .collect::<Result<Vec<_>, ExecutionError>>()?
    };

    builder.start_element(name);
    executor.apply_attribute_sets(
        use_attribute_sets,
        context_node,
        context_position,
        context_size,
        builder,
        &mut Vec::new(),
    )?;
    for (name, value) in &evaluated_attrs {
        builder.set_attribute(name, value);
    }
    executor.execute_template(body, context_node, context_position, context_size, builder)?;
    builder.end_element();
    Ok(())
}

#[allow(clippy::too_many_arguments)]
pub(crate) fn handle_element<'s, 'a, N: DocumentNode<'a> + 'a>(
    executor: &mut TemplateExecutor<'s, 'a, N>,
    name_avt: &AttributeValueTemplate,
    use_attribute_sets: &[String],
    body: &PreparsedTemplate,
    context_node: N,
    context_position: usize,
    context_size: usize,
    builder: &mut dyn OutputBuilder,
) -> Result<(), ExecutionError> {
    let tag_name = {
        let e_ctx = executor.get_eval_context(context_node, context_position, context_size);
        executor.evaluate_avt(name_avt, &e_ctx)?
    };

    if !is_valid_name(&tag_name) {
        log::warn!("xsl:element name '{}' is not a valid name; writing its content only", tag_name);
        return executor.execute_template(body, context_node, context_position, context_size, builder);
    }

    builder.start_element(&tag_name);
    executor.apply_attribute_sets(
        use_attribute_sets,
        context_node,
        context_position,
        context_size,
        builder,
        &mut Vec::new(),
    )?;
    executor.execute_template(body, context_node, context_position, context_size, builder)?;
    builder.end_element();
    Ok(())
}

pub(crate) fn handle_attribute<'s, 'a, N: DocumentNode<'a> + 'a>(
    executor: &mut TemplateExecutor<'s, 'a, N>,
    name_avt: &AttributeValueTemplate,
    body: &PreparsedTemplate,
    context_node: N,
    context_position: usize,
    context_size: usize,
    builder: &mut dyn OutputBuilder,
) -> Result<(), ExecutionError> {
    let name = {
        let e_ctx = executor.get_eval_context(context_node, context_position, context_size);
        executor.evaluate_avt(name_avt, &e_ctx)?
    };
    if name == "xmlns" || !is_valid_name(&name) {
        log::warn!("Ignoring xsl:attribute with invalid name '{}'", name);
        return Ok(());
    }

    let value = executor.execute_to_string(body, context_node, context_position, context_size)?;
    builder.set_attribute(&name, &value);
    Ok(())
}

pub(crate) fn handle_comment<'s, 'a, N: DocumentNode<'a> + 'a>(
    executor: &mut TemplateExecutor<'s, 'a, N>,
    body: &PreparsedTemplate,
    context_node: N,
    context_position: usize,
    context_size: usize,
    builder: &mut dyn OutputBuilder,
) -> Result<(), ExecutionError> {
    let mut text = executor
        .execute_to_string(body, context_node, context_position, context_size)?
        .replace("--", "- -");
    if text.ends_with('-') {
        text.push(' ');
    }
    builder.add_comment(&text);
    Ok(())
}

pub(crate) fn handle_processing_instruction<'s, 'a, N: DocumentNode<'a> + 'a>(
    executor: &mut TemplateExecutor<'s, 'a, N>,
    name_avt: &AttributeValueTemplate,
    body: &PreparsedTemplate,
    context_node: N,
    context_position: usize,
    context_size: usize,
    builder: &mut dyn OutputBuilder,
) -> Result<(), ExecutionError> {
    let target = {
        let e_ctx = executor.get_eval_context(context_node, context_position, context_size);
        executor.evaluate_avt(name_avt, &e_ctx)?
    };
    if !is_valid_name(&target) || target.contains(':') || target.eq_ignore_ascii_case("xml") {
        log::warn!("Ignoring processing instruction with invalid target '{}'", target);
        return Ok(());
    }
    let data = executor
        .execute_to_string(body, context_node, context_position, context_size)?
        .replace("?>", "? >");
    builder.add_processing_instruction(&target, data.trim_start());
    Ok(())
}
