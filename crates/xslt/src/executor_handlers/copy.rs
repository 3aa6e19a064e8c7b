use crate::ast::PreparsedTemplate;
use crate::executor::{ExecutionError, TemplateExecutor};
use crate::output::OutputBuilder;
use xslview_dom::Node;
use xslview_xpath1::{DocumentNode, Expression, NodeType, Value};

pub(crate) fn handle_copy_of<'s, 'a, N: DocumentNode<'a> + 'a>(
    executor: &mut TemplateExecutor<'s, 'a, N>,
    select: &Expression,
    context_node: N,
    context_position: usize,
    context_size: usize,
    builder: &mut dyn OutputBuilder,
) -> Result<(), ExecutionError> {
    if let Expression::Variable(name) = select
        && let Some(fragment) = executor.lookup_fragment(name)
    {
        for node in &fragment.children {
            emit_result_node(node, builder);
        }
        return Ok(());
    }

    match executor.evaluate(select, context_node, context_position, context_size)? {
        Value::NodeSet(nodes) => {
            for node in nodes {
                copy_source_node(node, builder);
            }
        }
        other => {
            let content = other.to_string();
            if !content.is_empty() {
                builder.add_text(&content);
            }
        }
    }
    Ok(())
}

pub(crate) fn handle_copy<'s, 'a, N: DocumentNode<'a> + 'a>(
    executor: &mut TemplateExecutor<'s, 'a, N>,
    use_attribute_sets: &[String],
    body: &PreparsedTemplate,
    context_node: N,
    context_position: usize,
    context_size: usize,
    builder: &mut dyn OutputBuilder,
) -> Result<(), ExecutionError> {
    match context_node.node_type() {
        NodeType::Element => {
            let name = qualified_name(context_node);
            builder.start_element(&name);
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
        }
        // Copying the root node just processes the children of the xsl:copy.
        NodeType::Root => {
            executor.execute_template(body, context_node, context_position, context_size, builder)?;
        }
        NodeType::Text
        | NodeType::Attribute
        | NodeType::Comment
        | NodeType::ProcessingInstruction => copy_source_node(context_node, builder),
    }
    Ok(())
}

fn qualified_name<'a, N: DocumentNode<'a>>(node: N) -> String {
    node.name().map(|q| q.to_string()).unwrap_or_default()
}

/// Deep-copies a source node into the result.
pub(crate) fn copy_source_node<'a, N: DocumentNode<'a>>(node: N, builder: &mut dyn OutputBuilder) {
    match node.node_type() {
        NodeType::Root => {
            for child in node.children() {
                copy_source_node(child, builder);
            }
        }
        NodeType::Element => {
            builder.start_element(&qualified_name(node));
            for attr in node.attributes() {
                builder.set_attribute(&qualified_name(attr), &attr.string_value());
            }
            for child in node.children() {
                copy_source_node(child, builder);
            }
            builder.end_element();
        }
        NodeType::Attribute => builder.set_attribute(&qualified_name(node), &node.string_value()),
        NodeType::Text => builder.add_text(&node.string_value()),
        NodeType::Comment => builder.add_comment(&node.string_value()),
        NodeType::ProcessingInstruction => {
            builder.add_processing_instruction(&qualified_name(node), &node.string_value())
        }
    }
}

/// Replays a node of a result tree fragment into the result.
pub(crate) fn emit_result_node(node: &Node, builder: &mut dyn OutputBuilder) {
    match node {
        Node::Element(element) => {
            builder.start_element(&element.name);
            for attr in &element.attributes {
                builder.set_attribute(&attr.name, &attr.value);
            }
            for child in &element.children {
                emit_result_node(child, builder);
            }
            builder.end_element();
        }
        Node::Text(text) => builder.add_text(text),
        Node::Comment(text) => builder.add_comment(text),
        Node::ProcessingInstruction { target, data } => {
            builder.add_processing_instruction(target, data)
        }
    }
}
