use crate::ast::{PreparsedTemplate, SortKey, When};
use crate::executor::{ExecutionError, TemplateExecutor};
use crate::output::OutputBuilder;
use xslview_xpath1::{DocumentNode, Expression};

pub(crate) fn handle_choose<'s, 'a, N: DocumentNode<'a> + 'a>(
    executor: &mut TemplateExecutor<'s, 'a, N>,
    whens: &[When],
    otherwise: Option<&PreparsedTemplate>,
    context_node: N,
    context_position: usize,
    context_size: usize,
    builder: &mut dyn OutputBuilder,
) -> Result<(), ExecutionError> {
    let mut chosen = otherwise;
    for when_block in whens {
        if executor
            .evaluate(&when_block.test, context_node, context_position, context_size)?
            .to_bool()
        {
            chosen = Some(&when_block.body);
            break;
        }
    }
    if let Some(body) = chosen {
        executor.execute_template(body, context_node, context_position, context_size, builder)?;
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
pub(crate) fn handle_for_each<'s, 'a, N: DocumentNode<'a> + 'a>(
    executor: &mut TemplateExecutor<'s, 'a, N>,
    select: &Expression,
    sort_keys: &[SortKey],
    body: &PreparsedTemplate,
    context_node: N,
    context_position: usize,
    context_size: usize,
    builder: &mut dyn OutputBuilder,
) -> Result<(), ExecutionError> {
    let mut nodes = executor
        .evaluate(select, context_node, context_position, context_size)?
        .into_nodes("The select expression of xsl:for-each")?;
    executor.sort_node_set(&mut nodes, sort_keys)?;

    let inner_context_size = nodes.len();
    for (i, node) in nodes.into_iter().enumerate() {
        executor.execute_template(body, node, i + 1, inner_context_size, builder)?;
    }
    Ok(())
}
