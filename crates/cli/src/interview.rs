//! `stepwise interview` -- answer a rule script one screen at a time.
//!
//! Every submitted answer runs the engine once and appends the result to the
//! session history. `<` steps back through that history by replay only: the
//! earlier screen is rebuilt from its result, prefilled with the latest
//! answers, and nothing is executed until the next answer. Each `<` returns
//! to the screen the current one was answered from.

use std::collections::BTreeMap;
use std::io::{self, BufRead, Write};

use stepwise_core::{Model, Parameter, ParametersCollection};
use stepwise_eval::{
    form_element, EngineConfig, ExecuteRequest, ExecutionResult, Executor, FormElementKind,
    History,
};

use crate::render;

pub fn run(script: &str, config: EngineConfig) -> Result<(), String> {
    let stdin = io::stdin();
    let stdout = io::stdout();
    run_session(script, config, stdin.lock(), stdout.lock())
}

/// Drive one session from `input`, writing screens to `out`.
pub fn run_session<R: BufRead, W: Write>(
    script: &str,
    config: EngineConfig,
    mut input: R,
    mut out: W,
) -> Result<(), String> {
    let executor = Executor::new(config);
    let model = executor.model(script).map_err(|e| format!("error: {}", e))?;
    let labels = labels(&model);

    let mut answers = ParametersCollection::new();
    let mut history = History::new();
    let first = execute(&executor, script, &answers).map_err(|e| format!("error: {}", e))?;
    let mut shown = history.push(first);
    // Screens answered to reach `shown`, oldest first.
    let mut trail: Vec<usize> = Vec::new();
    let mut line = String::new();

    loop {
        let latest = history.latest_index().unwrap_or(shown);
        let display = history.display(shown, latest).map_err(|e| e.to_string())?;
        let current = history.get(shown).map_err(|e| e.to_string())?;

        if current.is_terminal() {
            write_out(&mut out, &render::result_text(current))?;
            return Ok(());
        }
        let element = form_element(current, &labels);
        write_out(&mut out, &render::screen_text(&element, &display.parameters))?;
        write_out(&mut out, "> ")?;

        line.clear();
        match input.read_line(&mut line) {
            Ok(0) => {
                write_out(&mut out, "\n")?;
                return Ok(());
            }
            Ok(_) => {}
            Err(e) => return Err(format!("error reading input: {}", e)),
        }
        let trimmed = line.trim();
        match trimmed {
            "" => continue,
            "q" | "quit" => return Ok(()),
            "<" => {
                match trail.pop() {
                    Some(previous) => {
                        shown = previous;
                        tracing::debug!(shown, latest, "navigated back");
                    }
                    None => eprintln!("already at the first question"),
                }
                continue;
            }
            _ => {}
        }

        let Some(submitted) = parse_answer(trimmed, current, element.kind) else {
            eprintln!("usage: name=value, '<' to go back, 'q' to quit");
            continue;
        };
        let mut next_answers = answers.clone();
        for p in submitted {
            next_answers.upsert(p);
        }
        match execute(&executor, script, &next_answers) {
            Ok(result) => {
                answers = next_answers;
                trail.push(shown);
                shown = history.push(result);
            }
            Err(e) => {
                tracing::warn!(error = %e, "answer not accepted");
                eprintln!("error: {}", e);
            }
        }
    }
}

fn execute(
    executor: &Executor,
    script: &str,
    answers: &ParametersCollection,
) -> Result<ExecutionResult, stepwise_eval::ExecutionError> {
    executor.execute(&ExecuteRequest::new(script, answers.clone()))
}

/// Answers submitted by one input line.
///
/// `name=value` answers one parameter. A bare word answers the screen: for a
/// choice it picks the named option and clears its siblings, otherwise it is
/// the value of the single question asked.
fn parse_answer(
    line: &str,
    current: &ExecutionResult,
    kind: FormElementKind,
) -> Option<Vec<Parameter>> {
    let asked = &current.questions.parameters;
    let (name, value) = match line.split_once('=') {
        Some((n, v)) => (n.trim().to_string(), v.trim().to_string()),
        None if kind == FormElementKind::Radio && asked.contains(line) => {
            (line.to_string(), "ja".to_string())
        }
        None if asked.len() == 1 => (asked[0].name().to_string(), line.to_string()),
        None => return None,
    };
    if name.is_empty() {
        return None;
    }
    let mut submitted = vec![Parameter::from_text(name.as_str(), &value)];
    if kind == FormElementKind::Radio && value_is_true(&submitted[0]) {
        submitted.extend(
            asked
                .names()
                .into_iter()
                .filter(|n| *n != name)
                .map(|n| Parameter::from_text(n, "nee")),
        );
    }
    Some(submitted)
}

fn value_is_true(p: &Parameter) -> bool {
    p.value().as_bool() == Some(true)
}

/// Screen titles from the descriptions in the script.
fn labels(model: &Model) -> BTreeMap<String, String> {
    let mut labels = BTreeMap::new();
    for step in &model.steps {
        if !step.description.is_empty() {
            labels.insert(step.id.clone(), step.description.clone());
        }
        for p in step.question_parameters() {
            if !p.description.is_empty() && p.description != step.description {
                labels.insert(p.name.clone(), p.description.clone());
            }
        }
    }
    labels
}

fn write_out<W: Write>(out: &mut W, text: &str) -> Result<(), String> {
    out.write_all(text.as_bytes())
        .and_then(|_| out.flush())
        .map_err(|e| format!("error writing output: {}", e))
}
