//! Stepwise execution engine: walks a compiled rule script against the
//! answers known so far and returns the next questions or an outcome.
//!
//! The engine consumes a compiled `Model` (see `stepwise_core::compile`).
//! Each run produces an immutable `ExecutionResult`; going back to an
//! earlier result is handled by `history` without re-running anything.

pub mod cache;
pub mod config;
pub mod engine;
pub mod form;
pub mod history;
pub mod numeric;
pub mod predicate;
pub mod provenance;
pub mod template;
pub mod types;

use std::sync::Arc;

pub use cache::ModelCache;
pub use config::EngineConfig;
pub use engine::Engine;
pub use form::{form_element, FormElement, FormElementKind, LabelSource, NoLabels};
pub use history::{DisplayExecutionResult, History, HistoryError};
pub use template::{render, template_values, unresolved_placeholders, TemplateValue};
pub use types::{
    EvalError, ExecuteRequest, ExecutionError, ExecutionResult, FlowExecutionItem, QuestionArgs,
};

/// Compile the request's script and run it with the default configuration.
pub fn execute(request: &ExecuteRequest) -> Result<ExecutionResult, ExecutionError> {
    let model = stepwise_core::compile(&request.config)?;
    Engine::default().execute(&model, &request.parameters)
}

/// Engine plus model cache, for callers that execute the same scripts
/// repeatedly.
#[derive(Debug, Default)]
pub struct Executor {
    engine: Engine,
    cache: ModelCache,
}

impl Executor {
    pub fn new(config: EngineConfig) -> Self {
        Executor {
            cache: ModelCache::with_capacity(config.model_cache_capacity),
            engine: Engine::new(config),
        }
    }

    pub fn model(&self, script: &str) -> Result<Arc<stepwise_core::Model>, ExecutionError> {
        Ok(self.cache.get_or_compile(script)?)
    }

    pub fn execute(&self, request: &ExecuteRequest) -> Result<ExecutionResult, ExecutionError> {
        let model = self.model(&request.config)?;
        self.engine.execute(&model, &request.parameters)
    }
}
