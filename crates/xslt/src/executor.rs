//! Runs a `CompiledStylesheet` against a source tree, emitting the result
//! through an `OutputBuilder`. Implements the XSLT "push" model.
use crate::ast::{
    AttributeValueTemplate, AvtPart, CompiledStylesheet, GlobalBinding, PreparsedTemplate,
    SortDataType, SortKey, SortOrder, Template, TemplateRule, VariableValue, XsltInstruction,
};
use crate::compiler::SUPPORTED_INSTRUCTIONS;
use crate::executor_handlers;
use crate::fragment_builder::FragmentBuilder;
use crate::output::{OutputBuilder, TextCollector};
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::marker::PhantomData;
use thiserror::Error;
use xslview_dom::Fragment;
use xslview_xpath1::{
    DocumentNode, EvaluationContext, FunctionRegistry, KeyIndexes, NodeType, Value, Variables,
    XPathError,
};

/// Default limit on nested template invocations. Sized so a transform
/// running directly on a 1 MiB stack (wasm32) reports the limit instead of
/// overflowing.
pub const DEFAULT_MAX_DEPTH: usize = 128;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExecutionError {
    #[error(transparent)]
    XPath(#[from] XPathError),

    #[error("Call to unknown named template: '{0}'")]
    UnknownNamedTemplate(String),

    #[error("Reference to unknown attribute set: '{0}'")]
    UnknownAttributeSet(String),

    #[error("Type error: {0}")]
    TypeError(String),

    #[error("Global variable '{0}' depends on itself")]
    CircularVariable(String),

    #[error("Transform terminated by xsl:message: {0}")]
    Terminated(String),

    #[error("Template recursion deeper than {0} levels")]
    RecursionLimit(usize),
}

/// A bound variable: its XPath value plus, for variables built from
/// content, the result tree fragment itself.
#[derive(Debug, Clone)]
pub(crate) struct Binding<N> {
    pub(crate) value: Value<N>,
    pub(crate) fragment: Option<Fragment>,
}

impl<N> Binding<N> {
    fn of(value: Value<N>) -> Self {
        Self {
            value,
            fragment: None,
        }
    }
}

/// A binding hidden by a later one in the same frame, restored when its scope ends.
struct Shadowed<N> {
    name: String,
    value: Option<Value<N>>,
    fragment: Option<Fragment>,
}

/// The local variables visible to one template invocation.
struct Frame<N> {
    locals: Variables<N>,
    fragments: HashMap<String, Fragment>,
    scopes: Vec<Vec<Shadowed<N>>>,
}

impl<N> Default for Frame<N> {
    fn default() -> Self {
        Self {
            locals: HashMap::new(),
            fragments: HashMap::new(),
            scopes: vec![],
        }
    }
}

/// A stateful executor that writes the result of a `CompiledStylesheet`
/// applied to a generic `DocumentNode` tree into an `OutputBuilder`.
pub struct TemplateExecutor<'s, 'a, N: DocumentNode<'a>> {
    pub(crate) stylesheet: &'s CompiledStylesheet,
    pub(crate) functions: FunctionRegistry,
    pub(crate) root_node: N,
    pub(crate) strict: bool,
    max_depth: usize,
    depth: usize,
    frame: Frame<N>,
    globals: Variables<N>,
    global_fragments: HashMap<String, Fragment>,
    key_indexes: KeyIndexes<N>,
    _marker: PhantomData<&'a ()>,
}

impl<'s, 'a, N: DocumentNode<'a> + 'a> TemplateExecutor<'s, 'a, N> {
    pub fn new(stylesheet: &'s CompiledStylesheet, root_node: N, strict: bool) -> Result<Self, ExecutionError> {
        let mut functions = FunctionRegistry::default();
        for name in SUPPORTED_INSTRUCTIONS {
            functions.register_element(name);
        }
        let mut executor = Self {
            stylesheet,
            functions,
            root_node,
            strict,
            max_depth: DEFAULT_MAX_DEPTH,
            depth: 0,
            frame: Frame::default(),
            globals: HashMap::new(),
            global_fragments: HashMap::new(),
            key_indexes: HashMap::new(),
            _marker: PhantomData,
        };
        executor.key_indexes = executor.build_key_indexes()?;
        Ok(executor)
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Binds the global variables, then applies templates to the root node.
    /// `parameters` override top-level `xsl:param` declarations of the same name.
    pub fn execute(
        &mut self,
        parameters: &HashMap<String, String>,
        builder: &mut dyn OutputBuilder,
    ) -> Result<(), ExecutionError> {
        self.bind_globals(parameters)?;
        let root = self.root_node;
        self.apply_templates_to_nodes(&[root], None, &[], builder)
    }

    // --- Variables ---

    pub(crate) fn push_scope(&mut self) {
        self.frame.scopes.push(Vec::new());
    }

    pub(crate) fn pop_scope(&mut self) {
        let Some(scope) = self.frame.scopes.pop() else {
            return;
        };
        for shadowed in scope.into_iter().rev() {
            match shadowed.value {
                Some(value) => self.frame.locals.insert(shadowed.name.clone(), value),
                None => self.frame.locals.remove(&shadowed.name),
            };
            match shadowed.fragment {
                Some(fragment) => self.frame.fragments.insert(shadowed.name, fragment),
                None => self.frame.fragments.remove(&shadowed.name),
            };
        }
    }

    /// Binds a local variable until the current scope ends.
    pub(crate) fn bind_variable(&mut self, name: String, binding: Binding<N>) {
        let value = self.frame.locals.insert(name.clone(), binding.value);
        let fragment = match binding.fragment {
            Some(fragment) => self.frame.fragments.insert(name.clone(), fragment),
            None => self.frame.fragments.remove(&name),
        };
        if let Some(scope) = self.frame.scopes.last_mut() {
            scope.push(Shadowed {
                name,
                value,
                fragment,
            });
        }
    }

    /// The result tree fragment a variable holds, if it was built from content.
    pub(crate) fn lookup_fragment(&self, name: &str) -> Option<&Fragment> {
        if self.frame.locals.contains_key(name) {
            self.frame.fragments.get(name)
        } else {
            self.global_fragments.get(name)
        }
    }

    pub(crate) fn get_eval_context(
        &self,
        context_node: N,
        context_position: usize,
        context_size: usize,
    ) -> EvaluationContext<'a, '_, N> {
        EvaluationContext::new(context_node, self.root_node, &self.functions, &self.frame.locals)
            .at_position(context_position, context_size)
            .with_globals(&self.globals)
            .with_keys(&self.key_indexes)
            .with_namespaces(&self.stylesheet.namespaces)
            .strict(self.strict)
    }

    pub(crate) fn evaluate(
        &self,
        expr: &xslview_xpath1::Expression,
        context_node: N,
        context_position: usize,
        context_size: usize,
    ) -> Result<Value<N>, ExecutionError> {
        let e_ctx = self.get_eval_context(context_node, context_position, context_size);
        Ok(xslview_xpath1::evaluate(expr, &e_ctx)?)
    }

    /// Computes the value of a variable, parameter or `with-param`.
    pub(crate) fn evaluate_variable_value(
        &mut self,
        value: &VariableValue,
        context_node: N,
        context_position: usize,
        context_size: usize,
    ) -> Result<Binding<N>, ExecutionError> {
        match value {
            VariableValue::Select(expr) => Ok(Binding::of(self.evaluate(
                expr,
                context_node,
                context_position,
                context_size,
            )?)),
            VariableValue::Empty => Ok(Binding::of(Value::String(String::new()))),
            VariableValue::Content(body) => {
                let mut fragment_builder = FragmentBuilder::new();
                self.execute_template(
                    body,
                    context_node,
                    context_position,
                    context_size,
                    &mut fragment_builder,
                )?;
                let fragment = fragment_builder.get_result();
                Ok(Binding {
                    value: Value::String(fragment.text_content()),
                    fragment: Some(fragment),
                })
            }
        }
    }

    /// Evaluates top-level variables and parameters so that each one is bound
    /// before anything that refers to it.
    fn bind_globals(&mut self, parameters: &HashMap<String, String>) -> Result<(), ExecutionError> {
        let stylesheet: &'s CompiledStylesheet = self.stylesheet;
        let declared: HashMap<&str, &GlobalBinding> = stylesheet
            .globals
            .iter()
            .map(|g| (g.name.as_str(), g))
            .collect();
        let mut order = Vec::new();
        let mut done = HashSet::new();
        let mut visiting = HashSet::new();
        for global in &stylesheet.globals {
            visit_global(global, &declared, &mut done, &mut visiting, &mut order)?;
        }

        let root = self.root_node;
        for global in order {
            let external = parameters.get(&global.name).filter(|_| global.is_param);
            let binding = match external {
                Some(value) => Binding::of(Value::String(value.clone())),
                None => self.evaluate_variable_value(&global.value, root, 1, 1)?,
            };
            log::debug!("Bound global ${}", global.name);
            self.globals.insert(global.name.clone(), binding.value);
            match binding.fragment {
                Some(fragment) => self.global_fragments.insert(global.name.clone(), fragment),
                None => self.global_fragments.remove(&global.name),
            };
        }
        for name in parameters.keys() {
            if !declared.get(name.as_str()).is_some_and(|g| g.is_param) {
                log::debug!("Parameter '{}' is not declared by the stylesheet", name);
            }
        }
        Ok(())
    }

    fn build_key_indexes(&self) -> Result<KeyIndexes<N>, ExecutionError> {
        let mut indexes: KeyIndexes<N> = HashMap::new();
        if self.stylesheet.keys.is_empty() {
            return Ok(indexes);
        }
        let mut all_nodes = Vec::new();
        collect_nodes(self.root_node, &mut all_nodes);
        for key in &self.stylesheet.keys {
            let index = indexes.entry(key.name.clone()).or_default();
            for &node in &all_nodes {
                let e_ctx = self.get_eval_context(node, 1, 1);
                if !key.pattern.matches(node, &e_ctx)? {
                    continue;
                }
                let values = match xslview_xpath1::evaluate(&key.use_expr, &e_ctx)? {
                    Value::NodeSet(nodes) => nodes.iter().map(|n| n.string_value()).collect(),
                    other => vec![other.to_string()],
                };
                for value in values {
                    let entry = index.entry(value).or_default();
                    if entry.last() != Some(&node) {
                        entry.push(node);
                    }
                }
            }
        }
        Ok(indexes)
    }

    // --- Instructions ---

    /// Processes a list of instructions from a template body against a context node.
    /// Variables bound in the body go out of scope when it ends.
    pub(crate) fn execute_template(
        &mut self,
        template: &PreparsedTemplate,
        context_node: N,
        context_position: usize,
        context_size: usize,
        builder: &mut dyn OutputBuilder,
    ) -> Result<(), ExecutionError> {
        self.push_scope();
        let mut result = Ok(());
        for instruction in &template.0 {
            result =
                self.execute_instruction(instruction, context_node, context_position, context_size, builder);
            if result.is_err() {
                break;
            }
        }
        self.pop_scope();
        result
    }

    /// Runs a body and returns only the text it produced.
    pub(crate) fn execute_to_string(
        &mut self,
        body: &PreparsedTemplate,
        context_node: N,
        context_position: usize,
        context_size: usize,
    ) -> Result<String, ExecutionError> {
        let mut collector = TextCollector::new();
        self.execute_template(body, context_node, context_position, context_size, &mut collector)?;
        if collector.discarded_nodes() {
            log::warn!("Non-text output was discarded where a string value is required");
        }
        Ok(collector.into_text())
    }

    /// Evaluates an AVT and returns the resulting string.
    pub(crate) fn evaluate_avt(
        &self,
        avt: &AttributeValueTemplate,
        e_ctx: &EvaluationContext<'a, '_, N>,
    ) -> Result<String, ExecutionError> {
        match avt {
            AttributeValueTemplate::Static(s) => Ok(s.clone()),
            AttributeValueTemplate::Dynamic(parts) => {
                let mut result = String::new();
                for part in parts {
                    match part {
                        AvtPart::Static(s) => result.push_str(s),
                        AvtPart::Dynamic(expression) => {
                            result.push_str(&xslview_xpath1::evaluate(expression, e_ctx)?.to_string())
                        }
                    }
                }
                Ok(result)
            }
        }
    }

    fn execute_instruction(
        &mut self,
        instruction: &XsltInstruction,
        context_node: N,
        context_position: usize,
        context_size: usize,
        builder: &mut dyn OutputBuilder,
    ) -> Result<(), ExecutionError> {
        match instruction {
            XsltInstruction::Text(text) => builder.add_text(text),
            XsltInstruction::ValueOf { select } => {
                let content = self
                    .evaluate(select, context_node, context_position, context_size)?
                    .to_string();
                if !content.is_empty() {
                    builder.add_text(&content);
                }
            }
            XsltInstruction::CopyOf { select } => executor_handlers::copy::handle_copy_of(
                self,
                select,
                context_node,
                context_position,
                context_size,
                builder,
            )?,
            XsltInstruction::Copy {
                use_attribute_sets,
                body,
            } => executor_handlers::copy::handle_copy(
                self,
                use_attribute_sets,
                body,
                context_node,
                context_position,
                context_size,
                builder,
            )?,
            XsltInstruction::LiteralElement {
                name,
                attrs,
                use_attribute_sets,
                body,
            } => executor_handlers::literals::handle_literal_element(
                self,
                name,
                attrs,
                use_attribute_sets,
                body,
                context_node,
                context_position,
                context_size,
                builder,
            )?,
            XsltInstruction::Element {
                name,
                use_attribute_sets,
                body,
            } => executor_handlers::literals::handle_element(
                self,
                name,
                use_attribute_sets,
                body,
                context_node,
                context_position,
                context_size,
                builder,
            )?,
            XsltInstruction::Attribute { name, body } => executor_handlers::literals::handle_attribute(
                self,
                name,
                body,
                context_node,
                context_position,
                context_size,
                builder,
            )?,
            XsltInstruction::Comment { body } => executor_handlers::literals::handle_comment(
                self,
                body,
                context_node,
                context_position,
                context_size,
                builder,
            )?,
            XsltInstruction::ProcessingInstruction { name, body } => {
                executor_handlers::literals::handle_processing_instruction(
                    self,
                    name,
                    body,
                    context_node,
                    context_position,
                    context_size,
                    builder,
                )?
            }
            XsltInstruction::If { test, body } => {
                if self
                    .evaluate(test, context_node, context_position, context_size)?
                    .to_bool()
                {
                    self.execute_template(body, context_node, context_position, context_size, builder)?;
                }
            }
            XsltInstruction::Choose { whens, otherwise } => executor_handlers::control_flow::handle_choose(
                self,
                whens,
                otherwise.as_ref(),
                context_node,
                context_position,
                context_size,
                builder,
            )?,
            XsltInstruction::ForEach {
                select,
                sort_keys,
                body,
            } => executor_handlers::control_flow::handle_for_each(
                self,
                select,
                sort_keys,
                body,
                context_node,
                context_position,
                context_size,
                builder,
            )?,
            XsltInstruction::ApplyTemplates {
                select,
                mode,
                sort_keys,
                params,
            } => executor_handlers::apply_templates::handle_apply_templates(
                self,
                select.as_ref(),
                mode.as_deref(),
                sort_keys,
                params,
                context_node,
                context_position,
                context_size,
                builder,
            )?,
            XsltInstruction::CallTemplate { name, params } => {
                executor_handlers::call_template::handle_call_template(
                    self,
                    name,
                    params,
                    context_node,
                    context_position,
                    context_size,
                    builder,
                )?
            }
            XsltInstruction::Variable { name, value } => {
                let binding =
                    self.evaluate_variable_value(value, context_node, context_position, context_size)?;
                self.bind_variable(name.clone(), binding);
            }
            XsltInstruction::Number(spec) => executor_handlers::number::handle_number(
                self,
                spec,
                context_node,
                context_position,
                context_size,
                builder,
            )?,
            XsltInstruction::Message { body, terminate } => {
                let text = self.execute_to_string(body, context_node, context_position, context_size)?;
                if *terminate {
                    log::error!("xsl:message: {}", text);
                    return Err(ExecutionError::Terminated(text));
                }
                log::info!("xsl:message: {}", text);
            }
        }
        Ok(())
    }

    // --- Template rules ---

    pub(crate) fn apply_templates_to_nodes(
        &mut self,
        nodes: &[N],
        mode: Option<&str>,
        params: &[(String, Binding<N>)],
        builder: &mut dyn OutputBuilder,
    ) -> Result<(), ExecutionError> {
        let context_size = nodes.len();
        for (i, &node) in nodes.iter().enumerate() {
            let context_position = i + 1;
            match self.find_matching_template(node, mode)? {
                Some(rule) => self.invoke_template(
                    &rule.template,
                    params,
                    node,
                    context_position,
                    context_size,
                    builder,
                )?,
                None => self.apply_builtin_template(node, mode, builder)?,
            }
        }
        Ok(())
    }

    /// The built-in rules: recurse into children in the same mode, copy text and
    /// attribute values, drop comments and processing instructions.
    fn apply_builtin_template(
        &mut self,
        node: N,
        mode: Option<&str>,
        builder: &mut dyn OutputBuilder,
    ) -> Result<(), ExecutionError> {
        match node.node_type() {
            NodeType::Root | NodeType::Element => {
                let children: Vec<N> = node.children().collect();
                self.apply_templates_to_nodes(&children, mode, &[], builder)?;
            }
            NodeType::Text | NodeType::Attribute => builder.add_text(&node.string_value()),
            NodeType::Comment | NodeType::ProcessingInstruction => {}
        }
        Ok(())
    }

    fn find_matching_template(&self, node: N, mode: Option<&str>) -> Result<Option<&'s TemplateRule>, ExecutionError> {
        let Some(rules) = self.stylesheet.template_rules.get(&mode.map(String::from)) else {
            return Ok(None);
        };
        let e_ctx = self.get_eval_context(node, 1, 1);
        for rule in rules {
            if rule.pattern.matches(node, &e_ctx)? {
                return Ok(Some(rule));
            }
        }
        Ok(None)
    }

    /// Runs a template in a fresh variable frame holding only its parameters.
    pub(crate) fn invoke_template(
        &mut self,
        template: &Template,
        passed: &[(String, Binding<N>)],
        context_node: N,
        context_position: usize,
        context_size: usize,
        builder: &mut dyn OutputBuilder,
    ) -> Result<(), ExecutionError> {
        if self.depth >= self.max_depth {
            return Err(ExecutionError::RecursionLimit(self.max_depth));
        }
        self.depth += 1;
        let caller_frame = std::mem::take(&mut self.frame);
        self.push_scope();

        let result = (|| {
            for param in &template.params {
                let binding = match passed.iter().find(|(name, _)| name == &param.name) {
                    Some((_, binding)) => binding.clone(),
                    None => self.evaluate_variable_value(
                        &param.value,
                        context_node,
                        context_position,
                        context_size,
                    )?,
                };
                self.bind_variable(param.name.clone(), binding);
            }
            self.execute_template(&template.body, context_node, context_position, context_size, builder)
        })();

        self.frame = caller_frame;
        self.depth -= 1;
        result
    }

    /// Evaluates `with-param` values in the caller's context.
    pub(crate) fn evaluate_with_params(
        &mut self,
        params: &[crate::ast::WithParam],
        context_node: N,
        context_position: usize,
        context_size: usize,
    ) -> Result<Vec<(String, Binding<N>)>, ExecutionError> {
        params
            .iter()
            .map(|param| {
                let binding = self.evaluate_variable_value(
                    &param.value,
                    context_node,
                    context_position,
                    context_size,
                )?;
                Ok((param.name.clone(), binding))
            })
            .collect()
    }

    /// Adds the attributes of the named sets, including the sets they use, to
    /// the element currently open in `builder`.
    pub(crate) fn apply_attribute_sets(
        &mut self,
        names: &[String],
        context_node: N,
        context_position: usize,
        context_size: usize,
        builder: &mut dyn OutputBuilder,
        active: &mut Vec<String>,
    ) -> Result<(), ExecutionError> {
        for name in names {
            if active.contains(name) {
                return Err(ExecutionError::TypeError(format!(
                    "Attribute set '{}' uses itself",
                    name
                )));
            }
            let stylesheet = self.stylesheet;
            let set = stylesheet
                .attribute_sets
                .get(name)
                .ok_or_else(|| ExecutionError::UnknownAttributeSet(name.clone()))?;
            active.push(name.clone());
            self.apply_attribute_sets(
                &set.use_attribute_sets,
                context_node,
                context_position,
                context_size,
                builder,
                active,
            )?;
            active.pop();
            for attribute in &set.attributes {
                self.execute_instruction(attribute, context_node, context_position, context_size, builder)?;
            }
        }
        Ok(())
    }

    pub(crate) fn sort_node_set(
        &self,
        nodes: &mut Vec<N>,
        sort_keys: &[SortKey],
    ) -> Result<(), ExecutionError> {
        if sort_keys.is_empty() {
            return Ok(());
        }

        let size = nodes.len();
        let mut keyed = Vec::with_capacity(size);
        for (i, &node) in nodes.iter().enumerate() {
            let e_ctx = self.get_eval_context(node, i + 1, size);
            let mut values = Vec::with_capacity(sort_keys.len());
            for key in sort_keys {
                let value = xslview_xpath1::evaluate(&key.select, &e_ctx)?;
                values.push(match key.data_type {
                    SortDataType::Number => SortValue::Number(value.to_number()),
                    SortDataType::Text => SortValue::Text(value.to_string()),
                });
            }
            keyed.push((values, node));
        }

        keyed.sort_by(|(a, _), (b, _)| {
            for (key, (val_a, val_b)) in sort_keys.iter().zip(a.iter().zip(b.iter())) {
                let ordering = val_a.compare(val_b);
                let ordering = if key.order == SortOrder::Descending {
                    ordering.reverse()
                } else {
                    ordering
                };
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
            Ordering::Equal
        });
        *nodes = keyed.into_iter().map(|(_, node)| node).collect();
        Ok(())
    }
}

enum SortValue {
    Text(String),
    Number(f64),
}

impl SortValue {
    /// NaN sorts before every number.
    fn compare(&self, other: &SortValue) -> Ordering {
        match (self, other) {
            (SortValue::Number(a), SortValue::Number(b)) => match (a.is_nan(), b.is_nan()) {
                (true, true) => Ordering::Equal,
                (true, false) => Ordering::Less,
                (false, true) => Ordering::Greater,
                (false, false) => a.partial_cmp(b).unwrap_or(Ordering::Equal),
            },
            (SortValue::Text(a), SortValue::Text(b)) => a.cmp(b),
            _ => Ordering::Equal,
        }
    }
}

fn visit_global<'g>(
    global: &'g GlobalBinding,
    declared: &HashMap<&str, &'g GlobalBinding>,
    done: &mut HashSet<&'g str>,
    visiting: &mut HashSet<&'g str>,
    order: &mut Vec<&'g GlobalBinding>,
) -> Result<(), ExecutionError> {
    let name = global.name.as_str();
    if done.contains(name) {
        return Ok(());
    }
    if !visiting.insert(name) {
        return Err(ExecutionError::CircularVariable(name.to_string()));
    }
    let mut references = HashSet::new();
    global.value.variable_references(&mut references);
    let mut references: Vec<_> = references.into_iter().collect();
    references.sort();
    for reference in references {
        if let Some(&dependency) = declared.get(reference.as_str()) {
            visit_global(dependency, declared, done, visiting, order)?;
        }
    }
    visiting.remove(name);
    done.insert(name);
    order.push(global);
    Ok(())
}

/// Every node of the tree in document order, attributes after their element.
pub(crate) fn collect_nodes<'a, N: DocumentNode<'a>>(node: N, out: &mut Vec<N>) {
    out.push(node);
    out.extend(node.attributes());
    for child in node.children() {
        collect_nodes(child, out);
    }
}
