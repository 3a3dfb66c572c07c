//! The compiled, executable form of a rule script.
//!
//! A [`Model`] is immutable once compiled. Steps refer to each other by
//! index, so no name lookups happen while a model is walked.

use std::collections::{BTreeMap, HashMap};

use crate::ast::Expression;
use crate::parameter::ParametersCollection;
use crate::source::DebugInfo;
use crate::value::TypeEnum;

// ──────────────────────────────────────────────
// Steps
// ──────────────────────────────────────────────

/// Where execution continues after a step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Step(usize),
    /// Terminal. `outcome` labels the decision reached, if the script names one.
    End { outcome: Option<String> },
}

/// How a question step counts as answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerMode {
    /// Every asked parameter must be known.
    All,
    /// A choice: one known option is enough; the others read as false.
    AnyOf,
}

/// One parameter requested by a question step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionParameter {
    pub name: String,
    /// Type reported to the front-end: `List` for enumerable questions.
    pub question_type: TypeEnum,
    /// Type the answer is coerced to before it enters the known set.
    pub value_type: TypeEnum,
    pub options: Vec<String>,
    pub description: String,
}

/// A guarded formula. A case without a guard always applies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Case {
    pub guard: Option<Expression>,
    pub formula: Expression,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepKind {
    Question {
        parameters: Vec<QuestionParameter>,
        mode: AnswerMode,
    },
    Derivation {
        name: String,
        value_type: TypeEnum,
        cases: Vec<Case>,
    },
    Gate {
        condition: Expression,
        then: Target,
        otherwise: Target,
        /// Question step asked when the condition cannot be decided yet.
        fallback: Option<usize>,
    },
}

impl StepKind {
    pub fn name(&self) -> &'static str {
        match self {
            StepKind::Question { .. } => "question",
            StepKind::Derivation { .. } => "derivation",
            StepKind::Gate { .. } => "gate",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub id: String,
    pub description: String,
    pub kind: StepKind,
    /// Successor for question and derivation steps. Gates branch instead.
    pub next: Target,
    pub debug_info: DebugInfo,
}

impl Step {
    /// Parameters asked by a question step; empty for other kinds.
    pub fn question_parameters(&self) -> &[QuestionParameter] {
        match &self.kind {
            StepKind::Question { parameters, .. } => parameters,
            _ => &[],
        }
    }
}

// ──────────────────────────────────────────────
// Declarations
// ──────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclarationSource {
    Constant,
    Question { step: usize },
    Derivation { step: usize },
}

/// A name visible to expressions, with the step that produces it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    pub name: String,
    pub source: DeclarationSource,
    pub value_type: TypeEnum,
}

// ──────────────────────────────────────────────
// Model
// ──────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Model {
    pub info: BTreeMap<String, String>,
    pub constants: ParametersCollection,
    pub steps: Vec<Step>,
    pub declarations: Vec<Declaration>,
    step_index: HashMap<String, usize>,
    declaration_index: HashMap<String, usize>,
}

impl Model {
    pub fn new(
        info: BTreeMap<String, String>,
        constants: ParametersCollection,
        steps: Vec<Step>,
        declarations: Vec<Declaration>,
    ) -> Self {
        let step_index = steps
            .iter()
            .enumerate()
            .map(|(i, s)| (s.id.clone(), i))
            .collect();
        let declaration_index = declarations
            .iter()
            .enumerate()
            .map(|(i, d)| (d.name.clone(), i))
            .collect();
        Model {
            info,
            constants,
            steps,
            declarations,
            step_index,
            declaration_index,
        }
    }

    /// Entry step index. A compiled model always has at least one step.
    pub fn entry(&self) -> usize {
        0
    }

    pub fn step(&self, id: &str) -> Option<&Step> {
        self.step_index.get(id).map(|&i| &self.steps[i])
    }

    pub fn step_position(&self, id: &str) -> Option<usize> {
        self.step_index.get(id).copied()
    }

    pub fn declaration(&self, name: &str) -> Option<&Declaration> {
        self.declaration_index
            .get(name)
            .map(|&i| &self.declarations[i])
    }

    /// Question parameter declared under `name`, with its step index.
    pub fn question_parameter(&self, name: &str) -> Option<(usize, &QuestionParameter)> {
        match self.declaration(name)?.source {
            DeclarationSource::Question { step } => self.steps[step]
                .question_parameters()
                .iter()
                .find(|p| p.name == name)
                .map(|p| (step, p)),
            _ => None,
        }
    }

    /// Every asked parameter, in step order.
    pub fn questions(&self) -> impl Iterator<Item = (&Step, &QuestionParameter)> {
        self.steps
            .iter()
            .flat_map(|s| s.question_parameters().iter().map(move |p| (s, p)))
    }
}
