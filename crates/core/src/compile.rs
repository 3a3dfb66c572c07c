//! Rule script compiler: YAML text to [`Model`].
//!
//! A thin orchestrator over the phases below. The first error ends
//! compilation; no partial model is ever returned.
//!
//! 1. YAML document
//! 2. step index (ids, reserved names, duplicates)
//! 3. step shapes, targets and expression parsing
//! 4. declaration table
//! 5. derivation type inference and expression type checking

use std::collections::{BTreeMap, HashMap};

use crate::ast::Expression;
use crate::error::{CompileError, ExprError, Span};
use crate::model::{
    AnswerMode, Case, Declaration, DeclarationSource, Model, QuestionParameter, Step, StepKind,
    Target,
};
use crate::parameter::{Parameter, ParametersCollection};
use crate::parser::parse_expression;
use crate::script::{self, RawAsk, RawConstant, RawDerive, RawGate, RawScript, RawStep, RawTarget};
use crate::source::{DebugInfo, SourceMap};
use crate::typecheck::{self, TypeEnv};
use crate::value::{scalar_text, TypeEnum, Value};

const RESERVED_TARGETS: [&str; 2] = ["next", "end"];

/// Compile a rule script.
pub fn compile(text: &str) -> Result<Model, CompileError> {
    let map = SourceMap::new(text);

    // Phase 1: YAML document
    let raw = script::load(text).map_err(|e| yaml_error(&map, &e))?;
    if raw.steps.is_empty() {
        return Err(CompileError::syntax(
            "script declares no steps",
            map.line_span(0),
        ));
    }

    // Phase 2: step index
    let cx = Compiler::new(map, &raw.steps);
    let index = cx.index_steps(&raw.steps)?;

    // Phase 3: steps
    let mut steps = Vec::with_capacity(raw.steps.len());
    let mut declared_types = Vec::with_capacity(raw.steps.len());
    for (i, raw_step) in raw.steps.iter().enumerate() {
        let (step, declared) = cx.build_step(raw_step, i, raw.steps.len(), &index)?;
        steps.push(step);
        declared_types.push(declared);
    }

    // Phase 4: declarations
    let constants = cx.constants(&raw.constants)?;
    let mut declarations = cx.declare(&constants, &steps)?;

    // Phase 5: types
    let env = cx.infer_types(&steps, &declared_types, &declarations);
    cx.type_check(&steps, &declared_types, &env)?;
    for step in steps.iter_mut() {
        if let StepKind::Derivation {
            name, value_type, ..
        } = &mut step.kind
        {
            *value_type = env.get(name).unwrap_or(TypeEnum::Unknown);
        }
    }
    for decl in declarations.iter_mut() {
        if let DeclarationSource::Derivation { .. } = decl.source {
            decl.value_type = env.get(&decl.name).unwrap_or(TypeEnum::Unknown);
        }
    }

    tracing::debug!(
        steps = steps.len(),
        declarations = declarations.len(),
        "compiled rule script"
    );
    Ok(Model::new(info(&raw), constants, steps, declarations))
}

fn yaml_error(map: &SourceMap<'_>, err: &serde_yaml::Error) -> CompileError {
    let at = err.location().map(|l| l.index()).unwrap_or(0);
    CompileError::syntax(format!("invalid script: {}", err), map.line_span(at))
}

fn info(raw: &RawScript) -> BTreeMap<String, String> {
    raw.info
        .iter()
        .map(|(k, v)| {
            let text = scalar_text(v).unwrap_or_else(|| {
                serde_yaml::to_string(v)
                    .map(|s| s.trim_end().to_string())
                    .unwrap_or_default()
            });
            (k.clone(), text)
        })
        .collect()
}

struct Compiler<'a> {
    map: SourceMap<'a>,
    /// Byte offset of each step's `id:` entry.
    offsets: Vec<usize>,
}

impl<'a> Compiler<'a> {
    fn new(map: SourceMap<'a>, steps: &[RawStep]) -> Self {
        let mut offsets = Vec::with_capacity(steps.len());
        let mut from = map.find("steps:", 0).unwrap_or(0);
        for step in steps {
            let at = map
                .locate_key_value("id", &step.id, from)
                .or_else(|| map.find(&step.id, from))
                .unwrap_or(from);
            offsets.push(at);
            from = at + step.id.len().max(1);
        }
        Compiler { map, offsets }
    }

    fn at_step(&self, step: usize) -> DebugInfo {
        self.map.line_span(self.offsets[step])
    }

    /// Position of `needle` inside step `step`, or the step's own line.
    fn within_step(&self, step: usize, needle: &str) -> DebugInfo {
        let from = self.offsets[step];
        match self.map.find(needle, from) {
            Some(at) if !needle.is_empty() => self.map.span(at, needle.len()),
            _ => self.at_step(step),
        }
    }

    fn expr_error(&self, err: ExprError, step: usize, text: &str, context: &str) -> CompileError {
        match self.map.find(text, self.offsets[step]) {
            Some(at) if !text.is_empty() => err.locate(&self.map, at, context),
            _ => CompileError::new(
                err.kind,
                format!("{}: {}", context, err.message),
                self.at_step(step),
            ),
        }
    }

    // ── Phase 2 ──────────────────────────────────────────────────────

    fn index_steps(&self, steps: &[RawStep]) -> Result<HashMap<String, usize>, CompileError> {
        let mut index = HashMap::new();
        for (i, step) in steps.iter().enumerate() {
            if step.id.trim().is_empty() {
                return Err(CompileError::syntax("step id is empty", self.at_step(i)));
            }
            if RESERVED_TARGETS.contains(&step.id.as_str()) {
                return Err(CompileError::syntax(
                    format!("'{}' is reserved and cannot be used as a step id", step.id),
                    self.at_step(i),
                ));
            }
            if index.insert(step.id.clone(), i).is_some() {
                return Err(CompileError::syntax(
                    format!("duplicate step id '{}'", step.id),
                    self.at_step(i),
                ));
            }
        }
        Ok(index)
    }

    // ── Phase 3 ──────────────────────────────────────────────────────

    fn build_step(
        &self,
        raw: &RawStep,
        i: usize,
        count: usize,
        index: &HashMap<String, usize>,
    ) -> Result<(Step, Option<TypeEnum>), CompileError> {
        let description = raw.description.clone().unwrap_or_default();
        let mut declared = None;
        let kind = match (&raw.choice, &raw.ask, &raw.derive, &raw.gate) {
            (Some(options), None, None, None) => self.choice(raw, i, options, &description)?,
            (None, Some(asks), None, None) => self.ask(raw, i, asks)?,
            (None, None, Some(derive), None) => {
                declared = derive.type_;
                self.derive(raw, i, derive)?
            }
            (None, None, None, Some(gate)) => {
                if raw.next.is_some() {
                    return Err(CompileError::syntax(
                        format!(
                            "gate step '{}' branches with then/else and cannot declare next",
                            raw.id
                        ),
                        self.within_step(i, "next"),
                    ));
                }
                self.gate(raw, i, count, gate, index)?
            }
            _ => {
                return Err(CompileError::syntax(
                    format!(
                        "step '{}' must declare exactly one of choice, ask, derive or gate",
                        raw.id
                    ),
                    self.at_step(i),
                ))
            }
        };

        let next = match &kind {
            StepKind::Gate { then, .. } => then.clone(),
            _ => self.target(raw.next.as_ref(), &raw.id, i, count, index)?,
        };

        Ok((
            Step {
                id: raw.id.clone(),
                description,
                kind,
                next,
                debug_info: self.at_step(i),
            },
            declared,
        ))
    }

    fn choice(
        &self,
        raw: &RawStep,
        i: usize,
        options: &[serde_yaml::Value],
        description: &str,
    ) -> Result<StepKind, CompileError> {
        if options.is_empty() {
            return Err(CompileError::syntax(
                format!("choice step '{}' has no options", raw.id),
                self.within_step(i, "choice"),
            ));
        }
        let mut parameters = Vec::with_capacity(options.len());
        for option in options {
            let name = self.label(option, i, "choice option")?;
            parameters.push(QuestionParameter {
                name,
                question_type: TypeEnum::Boolean,
                value_type: TypeEnum::Boolean,
                options: Vec::new(),
                description: description.to_string(),
            });
        }
        Ok(StepKind::Question {
            parameters,
            mode: AnswerMode::AnyOf,
        })
    }

    fn ask(&self, raw: &RawStep, i: usize, asks: &[RawAsk]) -> Result<StepKind, CompileError> {
        if asks.is_empty() {
            return Err(CompileError::syntax(
                format!("question step '{}' asks for nothing", raw.id),
                self.within_step(i, "ask"),
            ));
        }
        let mut parameters = Vec::with_capacity(asks.len());
        for ask in asks {
            if ask.name.trim().is_empty() {
                return Err(CompileError::syntax(
                    format!("question step '{}' asks for a parameter without a name", raw.id),
                    self.within_step(i, "ask"),
                ));
            }
            let options = match &ask.options {
                Some(raw_options) => {
                    let options = raw_options
                        .iter()
                        .map(|o| self.label(o, i, "option"))
                        .collect::<Result<Vec<_>, _>>()?;
                    if options.is_empty() {
                        return Err(CompileError::syntax(
                            format!("parameter '{}' declares an empty option list", ask.name),
                            self.within_step(i, "options"),
                        ));
                    }
                    options
                }
                None => Vec::new(),
            };
            let (question_type, value_type) = if options.is_empty() {
                let t = ask.type_.unwrap_or(TypeEnum::Unknown);
                (t, t)
            } else {
                (TypeEnum::List, self.option_type(ask, &options, i)?)
            };
            parameters.push(QuestionParameter {
                name: ask.name.clone(),
                question_type,
                value_type,
                options,
                description: ask
                    .description
                    .clone()
                    .or_else(|| raw.description.clone())
                    .unwrap_or_default(),
            });
        }
        Ok(StepKind::Question {
            parameters,
            mode: AnswerMode::All,
        })
    }

    /// Type of the answer to an enumerable question: the declared type, or
    /// the type shared by all option labels, or `String`.
    fn option_type(
        &self,
        ask: &RawAsk,
        options: &[String],
        i: usize,
    ) -> Result<TypeEnum, CompileError> {
        match ask.type_ {
            Some(TypeEnum::List) | Some(TypeEnum::Unknown) | None => {
                let first = Value::from_text(&options[0]).type_enum();
                let shared = options
                    .iter()
                    .all(|o| Value::from_text(o).type_enum() == first);
                Ok(if shared { first } else { TypeEnum::String })
            }
            Some(declared) => {
                for option in options {
                    if Value::String(option.clone()).coerce(declared).is_none() {
                        return Err(CompileError::type_mismatch(
                            format!(
                                "option '{}' of parameter '{}' is not a {}",
                                option, ask.name, declared
                            ),
                            self.within_step(i, option),
                        ));
                    }
                }
                Ok(declared)
            }
        }
    }

    fn derive(&self, raw: &RawStep, i: usize, derive: &RawDerive) -> Result<StepKind, CompileError> {
        if derive.name.trim().is_empty() {
            return Err(CompileError::syntax(
                format!("derivation step '{}' has no name", raw.id),
                self.within_step(i, "derive"),
            ));
        }
        let cases = match (&derive.formula, &derive.cases) {
            (Some(formula), None) => vec![Case {
                guard: None,
                formula: self.expression(formula, i, &raw.id, "formula")?,
            }],
            (None, Some(cases)) if !cases.is_empty() => {
                let mut out = Vec::with_capacity(cases.len());
                for case in cases {
                    let guard = match &case.when {
                        Some(when) => Some(self.expression(when, i, &raw.id, "case condition")?),
                        None => None,
                    };
                    let formula = self.expression(&case.formula, i, &raw.id, "case formula")?;
                    out.push(Case { guard, formula });
                }
                out
            }
            _ => {
                return Err(CompileError::syntax(
                    format!(
                        "derivation step '{}' must declare either a formula or a non-empty list of cases",
                        raw.id
                    ),
                    self.within_step(i, "derive"),
                ))
            }
        };
        Ok(StepKind::Derivation {
            name: derive.name.clone(),
            value_type: derive.type_.unwrap_or(TypeEnum::Unknown),
            cases,
        })
    }

    fn gate(
        &self,
        raw: &RawStep,
        i: usize,
        count: usize,
        gate: &RawGate,
        index: &HashMap<String, usize>,
    ) -> Result<StepKind, CompileError> {
        let condition = self.expression(&gate.when, i, &raw.id, "condition")?;
        let then = self.target(gate.then.as_ref(), &raw.id, i, count, index)?;
        let otherwise = self.target(gate.otherwise.as_ref(), &raw.id, i, count, index)?;
        let fallback = match &gate.ask {
            Some(id) => {
                let target = index.get(id).copied().ok_or_else(|| {
                    CompileError::unknown_reference(
                        format!("gate '{}' falls back to unknown step '{}'", raw.id, id),
                        self.within_step(i, id),
                    )
                })?;
                Some(target)
            }
            None => None,
        };
        Ok(StepKind::Gate {
            condition,
            then,
            otherwise,
            fallback,
        })
    }

    fn target(
        &self,
        raw: Option<&RawTarget>,
        step_id: &str,
        i: usize,
        count: usize,
        index: &HashMap<String, usize>,
    ) -> Result<Target, CompileError> {
        let id = match raw {
            None => return Ok(following(i, count)),
            Some(RawTarget::Named(name)) if name == "next" => return Ok(following(i, count)),
            Some(RawTarget::Named(name)) if name == "end" => return Ok(Target::End { outcome: None }),
            Some(RawTarget::Outcome { outcome }) => {
                if outcome.trim().is_empty() {
                    return Err(CompileError::syntax(
                        format!("step '{}' declares an empty outcome", step_id),
                        self.within_step(i, "outcome"),
                    ));
                }
                return Ok(Target::End {
                    outcome: Some(outcome.clone()),
                });
            }
            Some(RawTarget::Named(id)) | Some(RawTarget::Goto { goto: id }) => id,
        };
        index.get(id).map(|&t| Target::Step(t)).ok_or_else(|| {
            CompileError::unknown_reference(
                format!("step '{}' continues at unknown step '{}'", step_id, id),
                self.within_step(i, id),
            )
        })
    }

    fn label(&self, raw: &serde_yaml::Value, i: usize, what: &str) -> Result<String, CompileError> {
        match scalar_text(raw) {
            Some(text) if !text.trim().is_empty() => Ok(text),
            _ => Err(CompileError::syntax(
                format!("{} must be a non-empty scalar", what),
                self.at_step(i),
            )),
        }
    }

    fn expression(
        &self,
        raw: &serde_yaml::Value,
        i: usize,
        step_id: &str,
        field: &str,
    ) -> Result<Expression, CompileError> {
        let context = format!("step '{}' {}", step_id, field);
        let text = scalar_text(raw).ok_or_else(|| {
            CompileError::syntax(
                format!("{}: expected an expression", context),
                self.at_step(i),
            )
        })?;
        parse_expression(&text).map_err(|e| self.expr_error(e, i, &text, &context))
    }

    // ── Phase 4 ──────────────────────────────────────────────────────

    fn constants(&self, raw: &[RawConstant]) -> Result<ParametersCollection, CompileError> {
        let section = self.map.find("constants:", 0).unwrap_or(0);
        let mut constants = ParametersCollection::new();
        for constant in raw {
            let at = self
                .map
                .find(&constant.name, section)
                .map(|at| self.map.span(at, constant.name.len()))
                .unwrap_or_else(|| self.map.line_span(section));
            if constant.name.trim().is_empty() {
                return Err(CompileError::syntax("constant without a name", at));
            }
            if constants.contains(&constant.name) {
                return Err(CompileError::syntax(
                    format!("duplicate constant '{}'", constant.name),
                    at,
                ));
            }
            let value = Value::from_yaml(&constant.value);
            if value.is_unknown() {
                return Err(CompileError::syntax(
                    format!("constant '{}' has no value", constant.name),
                    at,
                ));
            }
            constants.upsert(Parameter::new(constant.name.clone(), value));
        }
        Ok(constants)
    }

    fn declare(
        &self,
        constants: &ParametersCollection,
        steps: &[Step],
    ) -> Result<Vec<Declaration>, CompileError> {
        let mut declarations: Vec<Declaration> = constants
            .get_all()
            .map(|c| Declaration {
                name: c.name().to_string(),
                source: DeclarationSource::Constant,
                value_type: c.type_enum(),
            })
            .collect();
        let mut seen: HashMap<String, DeclarationSource> = declarations
            .iter()
            .map(|d| (d.name.clone(), d.source))
            .collect();

        for (i, step) in steps.iter().enumerate() {
            let produced: Vec<(&str, DeclarationSource, TypeEnum)> = match &step.kind {
                StepKind::Question { parameters, .. } => parameters
                    .iter()
                    .map(|p| {
                        (
                            p.name.as_str(),
                            DeclarationSource::Question { step: i },
                            p.value_type,
                        )
                    })
                    .collect(),
                StepKind::Derivation {
                    name, value_type, ..
                } => vec![(
                    name.as_str(),
                    DeclarationSource::Derivation { step: i },
                    *value_type,
                )],
                StepKind::Gate { .. } => Vec::new(),
            };
            for (name, source, value_type) in produced {
                if let Some(previous) = seen.get(name) {
                    let by = match previous {
                        DeclarationSource::Constant => "a constant".to_string(),
                        DeclarationSource::Question { step } | DeclarationSource::Derivation { step } => {
                            format!("step '{}'", steps[*step].id)
                        }
                    };
                    return Err(CompileError::syntax(
                        format!("'{}' is already declared by {}", name, by),
                        self.within_step(i, name),
                    ));
                }
                seen.insert(name.to_string(), source);
                declarations.push(Declaration {
                    name: name.to_string(),
                    source,
                    value_type,
                });
            }
        }

        for step in steps {
            if let StepKind::Gate {
                fallback: Some(target),
                ..
            } = &step.kind
            {
                if !matches!(steps[*target].kind, StepKind::Question { .. }) {
                    let i = steps.iter().position(|s| s.id == step.id).unwrap_or(0);
                    return Err(CompileError::syntax(
                        format!(
                            "gate '{}' falls back to '{}', which is not a question step",
                            step.id, steps[*target].id
                        ),
                        self.within_step(i, &steps[*target].id),
                    ));
                }
            }
        }
        Ok(declarations)
    }

    // ── Phase 5 ──────────────────────────────────────────────────────

    /// Give untyped derivations the type of their formulas. Derivations may
    /// depend on each other in any order, so this iterates to a fixpoint.
    fn infer_types(
        &self,
        steps: &[Step],
        declared: &[Option<TypeEnum>],
        declarations: &[Declaration],
    ) -> TypeEnv {
        let mut env = TypeEnv::new();
        for decl in declarations {
            env.insert(decl.name.clone(), decl.value_type);
        }
        let pending: Vec<(&str, &[Case])> = steps
            .iter()
            .zip(declared)
            .filter_map(|(step, declared)| match (&step.kind, declared) {
                (StepKind::Derivation { name, cases, .. }, None) => {
                    Some((name.as_str(), cases.as_slice()))
                }
                _ => None,
            })
            .collect();

        for _ in 0..=pending.len() {
            let mut changed = false;
            for (name, cases) in &pending {
                let inferred = cases
                    .iter()
                    .filter_map(|c| typecheck::check(&c.formula.root, &env).ok())
                    .find(|t| *t != TypeEnum::Unknown)
                    .unwrap_or(TypeEnum::Unknown);
                if env.get(name) != Some(inferred) {
                    env.insert(*name, inferred);
                    changed = true;
                }
            }
            if !changed {
                break;
            }
        }
        env
    }

    fn type_check(
        &self,
        steps: &[Step],
        declared: &[Option<TypeEnum>],
        env: &TypeEnv,
    ) -> Result<(), CompileError> {
        for (i, step) in steps.iter().enumerate() {
            match &step.kind {
                StepKind::Gate { condition, .. } => {
                    let context = format!("step '{}' condition", step.id);
                    typecheck::check_condition(&condition.root, env)
                        .map_err(|e| self.expr_error(e, i, &condition.text, &context))?;
                }
                StepKind::Derivation { name, cases, .. } => {
                    let mut agreed = declared[i];
                    for case in cases {
                        if let Some(guard) = &case.guard {
                            let context = format!("step '{}' case condition", step.id);
                            typecheck::check_condition(&guard.root, env)
                                .map_err(|e| self.expr_error(e, i, &guard.text, &context))?;
                        }
                        let context = format!("step '{}' formula", step.id);
                        let t = typecheck::check(&case.formula.root, env)
                            .map_err(|e| self.expr_error(e, i, &case.formula.text, &context))?;
                        if t == TypeEnum::Unknown {
                            continue;
                        }
                        match agreed {
                            None => agreed = Some(t),
                            Some(expected) if expected == t => {}
                            Some(TypeEnum::String) => {}
                            Some(expected) => {
                                let err = ExprError::type_mismatch(
                                    format!(
                                        "'{}' is {} but this formula yields {}",
                                        name, expected, t
                                    ),
                                    Span::new(0, case.formula.text.len()),
                                );
                                return Err(self.expr_error(
                                    err,
                                    i,
                                    &case.formula.text,
                                    &context,
                                ));
                            }
                        }
                    }
                }
                StepKind::Question { .. } => {}
            }
        }
        Ok(())
    }
}

fn following(i: usize, count: usize) -> Target {
    if i + 1 < count {
        Target::Step(i + 1)
    } else {
        Target::End { outcome: None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CompileErrorKind;

    const SCRIPT: &str = r#"info:
  subject: zorgtoeslag
  year: 2019
constants:
  - { name: grens, value: 29562 }
steps:
  - id: woonsituatie
    description: Wat is uw woonsituatie?
    choice: [alleenstaande, aanvrager_met_toeslagpartner]
  - id: inkomen
    ask:
      - { name: toetsingsinkomen, type: Double }
  - id: toets
    gate:
      when: toetsingsinkomen <= grens
      else: { outcome: geen_recht }
      ask: inkomen
  - id: hoogte
    derive:
      name: toeslag
      cases:
        - { when: alleenstaande, formula: "1609 - 0.0243 * toetsingsinkomen" }
        - { formula: "3218 - 0.0243 * toetsingsinkomen" }
    next: { outcome: recht }
"#;

    #[test]
    fn compiles_full_script() {
        let model = compile(SCRIPT).unwrap();
        assert_eq!(model.steps.len(), 4);
        assert_eq!(model.info["subject"], "zorgtoeslag");
        assert_eq!(model.info["year"], "2019");
        assert_eq!(model.constants.len(), 1);
        assert_eq!(
            model.declaration("toeslag").unwrap().value_type,
            TypeEnum::Double
        );
        assert_eq!(
            model.declaration("alleenstaande").unwrap().source,
            DeclarationSource::Question { step: 0 }
        );
        match &model.steps[2].kind {
            StepKind::Gate {
                then,
                otherwise,
                fallback,
                ..
            } => {
                assert_eq!(then, &Target::Step(3));
                assert_eq!(
                    otherwise,
                    &Target::End {
                        outcome: Some("geen_recht".to_string())
                    }
                );
                assert_eq!(fallback, &Some(1));
            }
            other => panic!("expected gate, got {:?}", other),
        }
        assert_eq!(
            model.steps[3].next,
            Target::End {
                outcome: Some("recht".to_string())
            }
        );
    }

    #[test]
    fn compilation_is_deterministic() {
        assert_eq!(compile(SCRIPT).unwrap(), compile(SCRIPT).unwrap());
    }

    #[test]
    fn step_positions_are_recorded() {
        let model = compile(SCRIPT).unwrap();
        let pos = model.step("inkomen").unwrap().debug_info.start;
        assert_eq!(pos.line, 10);
        assert_eq!(pos.column, 5);
    }

    #[test]
    fn options_question_is_list() {
        let model = compile(
            "steps:\n  - id: keuze\n    ask:\n      - { name: optie, options: [optie1, optie2] }\n",
        )
        .unwrap();
        let (_, p) = model.question_parameter("optie").unwrap();
        assert_eq!(p.question_type, TypeEnum::List);
        assert_eq!(p.value_type, TypeEnum::String);
        assert_eq!(p.options, vec!["optie1", "optie2"]);
    }

    #[test]
    fn yaml_error_has_position() {
        let err = compile("steps:\n  - id: a\n    ask: [\n").unwrap_err();
        assert_eq!(err.kind, CompileErrorKind::SyntaxError);
        assert!(err.debug_info.start.line >= 3);
    }

    #[test]
    fn empty_script_rejected() {
        let err = compile("info: { subject: x }\n").unwrap_err();
        assert_eq!(err.kind, CompileErrorKind::SyntaxError);
        assert!(err.message.contains("no steps"));
    }

    #[test]
    fn unknown_parameter_in_condition() {
        let script = "steps:\n  - id: a\n    ask: [{ name: x, type: Double }]\n  - id: b\n    gate:\n      when: x > y\n";
        let err = compile(script).unwrap_err();
        assert_eq!(err.kind, CompileErrorKind::UnknownReferenceError);
        assert!(err.message.contains("'y'"));
        assert_eq!(err.debug_info.start.line, 6);
        assert_eq!(err.debug_info.start.column, 17);
        assert_eq!(err.debug_info.end.column, 18);
    }

    #[test]
    fn unknown_target_step() {
        let script = "steps:\n  - id: a\n    choice: [x]\n    next: nergens\n";
        let err = compile(script).unwrap_err();
        assert_eq!(err.kind, CompileErrorKind::UnknownReferenceError);
        assert_eq!(err.debug_info.start.line, 4);
    }

    #[test]
    fn non_boolean_condition() {
        let script = "steps:\n  - id: a\n    ask: [{ name: x, type: Double }]\n  - id: b\n    gate:\n      when: x + 1\n";
        let err = compile(script).unwrap_err();
        assert_eq!(err.kind, CompileErrorKind::TypeMismatchError);
    }

    #[test]
    fn cases_must_agree() {
        let script = r#"steps:
  - id: a
    choice: [x]
  - id: b
    derive:
      name: d
      cases:
        - { when: x, formula: "1" }
        - { formula: "not x" }
"#;
        let err = compile(script).unwrap_err();
        assert_eq!(err.kind, CompileErrorKind::TypeMismatchError);
        assert_eq!(err.debug_info.start.line, 9);
    }

    #[test]
    fn derivation_types_propagate_out_of_order() {
        let script = r#"steps:
  - id: a
    ask: [{ name: x, type: Double }]
  - id: b
    derive: { name: twee, formula: "een * 2" }
  - id: c
    derive: { name: een, formula: "x + 1" }
  - id: d
    gate: { when: "twee > 3" }
"#;
        let model = compile(script).unwrap();
        assert_eq!(model.declaration("twee").unwrap().value_type, TypeEnum::Double);
    }

    #[test]
    fn duplicate_step_id() {
        let script = "steps:\n  - id: a\n    choice: [x]\n  - id: a\n    choice: [y]\n";
        let err = compile(script).unwrap_err();
        assert!(err.message.contains("duplicate step id"));
        assert_eq!(err.debug_info.start.line, 4);
    }

    #[test]
    fn duplicate_declaration() {
        let script = "steps:\n  - id: a\n    choice: [x]\n  - id: b\n    ask: [{ name: x }]\n";
        let err = compile(script).unwrap_err();
        assert!(err.message.contains("already declared by step 'a'"));
    }

    #[test]
    fn step_needs_exactly_one_shape() {
        let script = "steps:\n  - id: a\n    choice: [x]\n    ask: [{ name: y }]\n";
        let err = compile(script).unwrap_err();
        assert!(err.message.contains("exactly one of"));
    }

    #[test]
    fn fallback_must_be_question() {
        let script = "steps:\n  - id: a\n    derive: { name: d, formula: \"1\" }\n  - id: b\n    gate: { when: \"d > 0\", ask: a }\n";
        let err = compile(script).unwrap_err();
        assert!(err.message.contains("not a question step"));
    }

    #[test]
    fn option_outside_declared_type() {
        let script = "steps:\n  - id: a\n    ask: [{ name: n, type: Double, options: [1, twee] }]\n";
        let err = compile(script).unwrap_err();
        assert_eq!(err.kind, CompileErrorKind::TypeMismatchError);
    }

    #[test]
    fn bad_expression_syntax_is_located() {
        let script = "steps:\n  - id: a\n    ask: [{ name: x, type: Double }]\n  - id: b\n    gate:\n      when: x >\n";
        let err = compile(script).unwrap_err();
        assert_eq!(err.kind, CompileErrorKind::SyntaxError);
        assert_eq!(err.debug_info.start.line, 6);
    }

    #[test]
    fn flow_style_steps_with_non_ascii_ids() {
        let script = "steps:\n  - { id: één, choice: [x] }\n  - { id: twee, choice: [y] }\n";
        let model = compile(script).unwrap();
        assert_eq!(model.steps[0].id, "één");
        assert_eq!(model.steps[1].id, "twee");
    }
}
