use crate::ast::WithParam;
use crate::executor::{ExecutionError, TemplateExecutor};
use crate::output::OutputBuilder;
use std::sync::Arc;
use xslview_xpath1::DocumentNode;

pub(crate) fn handle_call_template<'s, 'a, N: DocumentNode<'a> + 'a>(
    executor: &mut TemplateExecutor<'s, 'a, N>,
    name: &str,
    params: &[WithParam],
    context_node: N,
    context_position: usize,
    context_size: usize,
    builder: &mut dyn OutputBuilder,
) -> Result<(), ExecutionError> {
    let template = executor
        .stylesheet
        .named_templates
        .get(name)
        .map(Arc::clone)
        .ok_or_else(|| ExecutionError::UnknownNamedTemplate(name.to_string()))?;

    if executor.strict {
        if let Some(undeclared) = params
            .iter()
            .find(|passed| !template.params.iter().any(|p| p.name == passed.name))
        {
            return Err(ExecutionError::TypeError(format!(
                "Call to template '{}' with undeclared parameter: '{}'",
                name, undeclared.name
            )));
        }
    }

    let passed = executor.evaluate_with_params(params, context_node, context_position, context_size)?;
    executor.invoke_template(
        &template,
        &passed,
        context_node,
        context_position,
        context_size,
        builder,
    )
}
