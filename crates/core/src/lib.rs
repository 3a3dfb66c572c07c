//! stepwise-core: rule scripts for stepwise questionnaires.
//!
//! Compiles a YAML rule script into an immutable [`Model`] and provides the
//! value, type-inference and parameter-store types the execution engine
//! works with.
//!
//! # Public API
//!
//! - [`compile()`] -- YAML text to [`Model`], or a positioned [`CompileError`]
//! - [`infer()`] / [`infer_text()`] -- answer type inference
//! - [`Parameter`] / [`ParametersCollection`] -- the name-unique parameter store
//! - [`Model::content_template()`] -- empty content document for a script

pub mod ast;
pub mod compile;
pub mod content;
pub mod error;
pub mod lexer;
pub mod model;
pub mod parameter;
pub mod parser;
pub mod script;
pub mod source;
pub mod typecheck;
pub mod value;

// ── Convenience re-exports ───────────────────────────────────────────

pub use ast::{Expr, Expression};
pub use compile::compile;
pub use content::{ContentEntry, ContentTemplate};
pub use error::{CompileError, CompileErrorKind};
pub use model::{
    AnswerMode, Case, Declaration, DeclarationSource, Model, QuestionParameter, Step, StepKind,
    Target,
};
pub use parameter::{Parameter, ParametersCollection};
pub use parser::parse_expression;
pub use source::{DebugInfo, LineInfo};
pub use value::{infer, infer_text, TypeEnum, Value};
