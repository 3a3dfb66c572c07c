//! Records which parameters a step read while it was evaluated.

use stepwise_core::model::Step;

use crate::types::FlowExecutionItem;

/// Collects parameter reads during expression evaluation, deduplicated
/// in first-access order.
#[derive(Debug, Clone, Default)]
pub struct ProvenanceCollector {
    pub parameters_used: Vec<String>,
}

impl ProvenanceCollector {
    pub fn new() -> Self {
        ProvenanceCollector::default()
    }

    pub fn record_parameter(&mut self, name: &str) {
        if !self.parameters_used.iter().any(|p| p == name) {
            self.parameters_used.push(name.to_string());
        }
    }

    /// Finalize into the stacktrace entry for `step`.
    pub fn into_item(self, step: &Step) -> FlowExecutionItem {
        FlowExecutionItem {
            step_id: step.id.clone(),
            kind: step.kind.name().to_string(),
            description: step.description.clone(),
            parameters_used: self.parameters_used,
        }
    }
}
