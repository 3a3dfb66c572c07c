//! Request, result and error types of the execution engine.

use serde::{Deserialize, Serialize};
use stepwise_core::{CompileError, ParametersCollection, TypeEnum};

// ──────────────────────────────────────────────
// Request
// ──────────────────────────────────────────────

/// One engine invocation: a rule script and the answers known so far.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecuteRequest {
    /// Rule script text.
    pub config: String,
    #[serde(default)]
    pub parameters: ParametersCollection,
}

impl ExecuteRequest {
    pub fn new(config: impl Into<String>, parameters: ParametersCollection) -> Self {
        ExecuteRequest {
            config: config.into(),
            parameters,
        }
    }
}

// ──────────────────────────────────────────────
// Result
// ──────────────────────────────────────────────

/// The parameters the engine is asking for, labelled with the id of the
/// question step that asks them. Empty when execution reached an end.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionArgs {
    pub label: String,
    pub parameters: ParametersCollection,
}

impl QuestionArgs {
    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.parameters.names()
    }
}

/// One visited step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowExecutionItem {
    pub step_id: String,
    pub kind: String,
    pub description: String,
    /// Parameters read while evaluating the step, in first-access order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters_used: Vec<String>,
}

/// Snapshot produced by one engine run. Never mutated after creation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub questions: QuestionArgs,
    pub parameters: ParametersCollection,
    pub stacktrace: Vec<FlowExecutionItem>,
    /// Outcome label of the end reached, when the script names one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcome: Option<String>,
}

impl ExecutionResult {
    /// Whether execution walked to an end instead of halting on a question.
    pub fn is_terminal(&self) -> bool {
        self.questions.is_empty()
    }

    /// Type of the first parameter asked; `Unknown` for a terminal result.
    pub fn inferred_type(&self) -> TypeEnum {
        self.questions
            .parameters
            .get(0)
            .map(|p| p.type_enum())
            .unwrap_or(TypeEnum::Unknown)
    }
}

// ──────────────────────────────────────────────
// Errors
// ──────────────────────────────────────────────

/// Failure of one execution. Compile errors are passed through whole.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExecutionError {
    #[error(transparent)]
    Compile(#[from] CompileError),
    /// A step was reached again without any new parameter being resolved.
    #[error("cyclic model: step '{step_id}' revisited without progress")]
    CyclicModel { step_id: String },
    /// A value only a derivation can produce is missing.
    #[error("missing parameter '{name}' needed by step '{step_id}'")]
    MissingParameter { name: String, step_id: String },
    #[error("invalid answer for '{name}': {message}")]
    InvalidAnswer { name: String, message: String },
    #[error("evaluation of step '{step_id}' failed: {message}")]
    Evaluation { step_id: String, message: String },
    #[error("execution exceeded the limit of {max_steps} steps")]
    StepLimit { max_steps: usize },
}

/// Failure of a single expression evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EvalError {
    /// The expression needs a parameter that is not known yet.
    Missing { name: String },
    /// Operand types do not fit the operator at run time.
    Type { message: String },
    /// Overflow, division by zero or an invalid rounding precision.
    Arithmetic { message: String },
}

impl std::fmt::Display for EvalError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EvalError::Missing { name } => write!(f, "parameter '{}' is not known", name),
            EvalError::Type { message } => write!(f, "type error: {}", message),
            EvalError::Arithmetic { message } => write!(f, "arithmetic error: {}", message),
        }
    }
}
