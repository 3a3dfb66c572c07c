//! Step-by-step execution of a compiled model.
//!
//! Execution walks the model from its entry step against a private working
//! copy of the known answers. It either halts on the first question that
//! cannot be answered from what is known, or walks to an end. The caller's
//! collection and the model are never mutated.
//!
//! Key invariant: a result is a snapshot. Everything it contains was
//! produced by this one walk, so identical inputs always yield identical
//! results.

use std::collections::HashSet;

use stepwise_core::model::{AnswerMode, Case, DeclarationSource, Model, Step, StepKind, Target};
use stepwise_core::{Parameter, ParametersCollection, Value};

use crate::config::EngineConfig;
use crate::predicate::{eval_expr, Scope};
use crate::provenance::ProvenanceCollector;
use crate::types::{EvalError, ExecutionError, ExecutionResult, FlowExecutionItem, QuestionArgs};


// ──────────────────────────────────────────────
// Engine
// ──────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct Engine {
    config: EngineConfig,
}

/// How a visited step hands control on.
enum Flow {
    Continue(Target),
    /// Halt and ask the question step at this index.
    Ask(usize),
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        Engine { config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Walk `model` against `answers`.
    pub fn execute(
        &self,
        model: &Model,
        answers: &ParametersCollection,
    ) -> Result<ExecutionResult, ExecutionError> {
        let mut known = self.normalize(model, answers)?;
        let mut stacktrace: Vec<FlowExecutionItem> = Vec::new();

        // (step, version of the known set) pairs already visited. The version
        // moves whenever a derivation changes a value, so revisiting a step
        // with the same version cannot make progress.
        let mut visited: HashSet<(usize, usize)> = HashSet::new();
        let mut version = 0usize;
        let mut step_count = 0usize;
        let mut current = Target::Step(model.entry());

        loop {
            let index = match current {
                Target::Step(index) => index,
                Target::End { outcome } => {
                    tracing::info!(
                        steps = stacktrace.len(),
                        outcome = outcome.as_deref().unwrap_or(""),
                        "execution reached an end"
                    );
                    return Ok(ExecutionResult {
                        questions: QuestionArgs::default(),
                        parameters: known,
                        stacktrace,
                        outcome,
                    });
                }
            };

            step_count += 1;
            if step_count > self.config.max_steps {
                return Err(ExecutionError::StepLimit {
                    max_steps: self.config.max_steps,
                });
            }
            let step = &model.steps[index];
            if !visited.insert((index, version)) {
                return Err(ExecutionError::CyclicModel {
                    step_id: step.id.clone(),
                });
            }
            tracing::debug!(step = %step.id, kind = step.kind.name(), "visiting step");

            let mut collector = ProvenanceCollector::new();
            let flow = match &step.kind {
                StepKind::Question { parameters, mode } => {
                    for p in parameters {
                        collector.record_parameter(&p.name);
                    }
                    if is_answered(&known, step, *mode) {
                        Flow::Continue(step.next.clone())
                    } else {
                        Flow::Ask(index)
                    }
                }

                StepKind::Gate {
                    condition,
                    then,
                    otherwise,
                    fallback,
                } => {
                    let scope = Scope::new(model, &known);
                    match eval_expr(&condition.root, &scope, &mut collector) {
                        Ok(Value::Boolean(true)) => Flow::Continue(then.clone()),
                        Ok(Value::Boolean(false)) => Flow::Continue(otherwise.clone()),
                        Ok(other) => {
                            return Err(ExecutionError::Evaluation {
                                step_id: step.id.clone(),
                                message: format!(
                                    "condition evaluated to {} '{}'",
                                    other.type_enum(),
                                    other
                                ),
                            })
                        }
                        Err(EvalError::Missing { name }) => {
                            Flow::Ask(question_for(model, &known, step, *fallback, &name)?)
                        }
                        Err(e) => return Err(evaluation_error(step, e)),
                    }
                }

                StepKind::Derivation {
                    name,
                    value_type,
                    cases,
                } => {
                    let scope = Scope::new(model, &known);
                    match derive(cases, &scope, &mut collector) {
                        Ok(Some(value)) => {
                            let value = value.coerce(*value_type).ok_or_else(|| {
                                ExecutionError::Evaluation {
                                    step_id: step.id.clone(),
                                    message: format!(
                                        "'{}' is declared {} but evaluated to {}",
                                        name,
                                        value_type,
                                        value.type_enum()
                                    ),
                                }
                            })?;
                            let changed = known
                                .get_parameter(name)
                                .map_or(true, |p| p.value() != &value);
                            if changed {
                                tracing::debug!(parameter = %name, value = %value, "derived");
                                known.upsert(Parameter::new(name.clone(), value));
                                version += 1;
                            }
                            Flow::Continue(step.next.clone())
                        }
                        Ok(None) => {
                            tracing::debug!(step = %step.id, "no case applies");
                            Flow::Continue(step.next.clone())
                        }
                        Err(EvalError::Missing { name }) => {
                            Flow::Ask(question_for(model, &known, step, None, &name)?)
                        }
                        Err(e) => return Err(evaluation_error(step, e)),
                    }
                }
            };

            stacktrace.push(collector.into_item(step));
            match flow {
                Flow::Continue(next) => current = next,
                Flow::Ask(question) => {
                    let questions = questions_of(&model.steps[question], &known);
                    tracing::info!(
                        step = %model.steps[question].id,
                        asked = questions.parameters.len(),
                        "execution halted on a question"
                    );
                    return Ok(ExecutionResult {
                        questions,
                        parameters: known,
                        stacktrace,
                        outcome: None,
                    });
                }
            }
        }
    }

    /// Working copy of the answers: coerced to the declared types, checked
    /// against option lists. Constants and derived names cannot be answered;
    /// such entries are dropped.
    fn normalize(
        &self,
        model: &Model,
        answers: &ParametersCollection,
    ) -> Result<ParametersCollection, ExecutionError> {
        let mut known = ParametersCollection::new();
        for answer in answers {
            let name = answer.name();
            if answer.value().is_unknown() {
                continue;
            }
            match model.declaration(name).map(|d| d.source) {
                Some(DeclarationSource::Question { .. }) => {
                    let value = self.accept(model, answer)?;
                    known.upsert(Parameter::new(name, value));
                }
                Some(DeclarationSource::Constant) | Some(DeclarationSource::Derivation { .. }) => {
                    tracing::debug!(parameter = %name, "ignoring answer for a computed name");
                }
                None if self.config.strict_answers => {
                    tracing::warn!(parameter = %name, "answer for undeclared parameter");
                    return Err(ExecutionError::InvalidAnswer {
                        name: name.to_string(),
                        message: "the script does not declare this parameter".to_string(),
                    });
                }
                None => known.upsert(answer.clone()),
            }
        }
        Ok(known)
    }

    fn accept(&self, model: &Model, answer: &Parameter) -> Result<Value, ExecutionError> {
        let name = answer.name();
        let Some((_, question)) = model.question_parameter(name) else {
            return Ok(answer.value().clone());
        };
        let value = answer.value().coerce(question.value_type).ok_or_else(|| {
            tracing::warn!(parameter = %name, value = %answer.value(), "rejected answer");
            ExecutionError::InvalidAnswer {
                name: name.to_string(),
                message: format!(
                    "'{}' is not a {}",
                    answer.value_as_string(),
                    question.value_type
                ),
            }
        })?;
        if !question.options.is_empty()
            && !question
                .options
                .iter()
                .any(|o| *o == value.to_string() || Value::from_text(o) == value)
        {
            tracing::warn!(parameter = %name, value = %value, "answer is not one of the options");
            return Err(ExecutionError::InvalidAnswer {
                name: name.to_string(),
                message: format!(
                    "'{}' is not one of: {}",
                    value,
                    question.options.join(", ")
                ),
            });
        }
        Ok(value)
    }
}

// ──────────────────────────────────────────────
// Step helpers
// ──────────────────────────────────────────────

fn is_answered(known: &ParametersCollection, step: &Step, mode: AnswerMode) -> bool {
    let mut names = step.question_parameters().iter().map(|p| p.name.as_str());
    match mode {
        AnswerMode::All => names.all(|n| known.is_known(n)),
        AnswerMode::AnyOf => names.any(|n| known.is_known(n)),
    }
}

/// First applicable case's value; `None` when no guard holds.
fn derive(
    cases: &[Case],
    scope: &Scope<'_>,
    collector: &mut ProvenanceCollector,
) -> Result<Option<Value>, EvalError> {
    for case in cases {
        let applies = match &case.guard {
            None => true,
            Some(guard) => match eval_expr(&guard.root, scope, collector)? {
                Value::Boolean(b) => b,
                other => {
                    return Err(EvalError::Type {
                        message: format!("case condition evaluated to {}", other.type_enum()),
                    })
                }
            },
        };
        if applies {
            return eval_expr(&case.formula.root, scope, collector).map(Some);
        }
    }
    Ok(None)
}

/// The question step to ask when `step` needs `missing`: the step's own
/// fallback if it still has something to ask, else the step that declares
/// the missing parameter.
fn question_for(
    model: &Model,
    known: &ParametersCollection,
    step: &Step,
    fallback: Option<usize>,
    missing: &str,
) -> Result<usize, ExecutionError> {
    if let Some(index) = fallback {
        let target = &model.steps[index];
        if target
            .question_parameters()
            .iter()
            .any(|p| !known.is_known(&p.name))
        {
            return Ok(index);
        }
    }
    match model.declaration(missing).map(|d| d.source) {
        Some(DeclarationSource::Question { step: index }) => Ok(index),
        _ => Err(ExecutionError::MissingParameter {
            name: missing.to_string(),
            step_id: step.id.clone(),
        }),
    }
}

/// The batch asked by a question step: its parameters that are not known
/// yet, carrying their question type and options.
fn questions_of(step: &Step, known: &ParametersCollection) -> QuestionArgs {
    let parameters = step
        .question_parameters()
        .iter()
        .filter(|p| !known.is_known(&p.name))
        .map(|p| Parameter::question(p.name.clone(), p.question_type, &p.options))
        .collect();
    QuestionArgs {
        label: step.id.clone(),
        parameters,
    }
}

fn evaluation_error(step: &Step, e: EvalError) -> ExecutionError {
    ExecutionError::Evaluation {
        step_id: step.id.clone(),
        message: e.to_string(),
    }
}
