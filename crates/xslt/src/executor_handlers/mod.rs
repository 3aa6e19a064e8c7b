pub(crate) mod apply_templates;
pub(crate) mod call_template;
pub(crate) mod control_flow;
pub(crate) mod copy;
pub(crate) mod literals;
pub(crate) mod number;
