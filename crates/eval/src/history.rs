//! Backward navigation over earlier execution results.
//!
//! Going back never re-runs the engine. The screen shown for an earlier
//! result is rebuilt from that result's questions, prefilled with whatever
//! the latest result knows about the same parameters. Answers given after
//! the target step therefore survive a round trip back and forth.

use serde::{Deserialize, Serialize};
use stepwise_core::ParametersCollection;

use crate::types::{ExecutionResult, QuestionArgs};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HistoryError {
    #[error("history index {index} out of range (length {len})")]
    IndexOutOfRange { index: usize, len: usize },
}

/// What is shown when navigating back to an earlier result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayExecutionResult {
    pub questions: QuestionArgs,
    /// Latest known values of the target's questions, in question order.
    pub parameters: ParametersCollection,
}

impl DisplayExecutionResult {
    pub fn new(target: &ExecutionResult, latest_parameters: &ParametersCollection) -> Self {
        let parameters = target
            .questions
            .parameters
            .get_all()
            .filter_map(|q| latest_parameters.get_parameter(q.name()))
            .cloned()
            .collect();
        DisplayExecutionResult {
            questions: target.questions.clone(),
            parameters,
        }
    }
}

/// Append-only sequence of the results of one session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct History {
    results: Vec<ExecutionResult>,
}

impl History {
    pub fn new() -> Self {
        History::default()
    }

    /// Append a result and return its index.
    pub fn push(&mut self, result: ExecutionResult) -> usize {
        self.results.push(result);
        self.results.len() - 1
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn get(&self, index: usize) -> Result<&ExecutionResult, HistoryError> {
        self.results.get(index).ok_or(HistoryError::IndexOutOfRange {
            index,
            len: self.results.len(),
        })
    }

    pub fn latest_index(&self) -> Option<usize> {
        self.results.len().checked_sub(1)
    }

    pub fn latest(&self) -> Option<&ExecutionResult> {
        self.results.last()
    }

    /// Replay `target` against the parameters of `latest`.
    pub fn display(
        &self,
        target: usize,
        latest: usize,
    ) -> Result<DisplayExecutionResult, HistoryError> {
        let target = self.get(target)?;
        let latest = self.get(latest)?;
        tracing::debug!(label = %target.questions.label, "replaying earlier result");
        Ok(DisplayExecutionResult::new(target, &latest.parameters))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stepwise_core::{compile, Parameter, TypeEnum, Value};

    use crate::engine::Engine;

    const SCRIPT: &str = r#"steps:
  - id: woonsituatie
    choice: [alleenstaande, aanvrager_met_toeslagpartner]
  - id: inkomen
    ask:
      - { name: toetsingsinkomen, type: Double }
"#;

    fn session() -> History {
        let model = compile(SCRIPT).unwrap();
        let engine = Engine::default();
        let mut answers = ParametersCollection::new();
        let mut history = History::new();
        history.push(engine.execute(&model, &answers).unwrap());
        answers.upsert(Parameter::from_text("alleenstaande", "ja"));
        history.push(engine.execute(&model, &answers).unwrap());
        history
    }

    #[test]
    fn back_navigation_prefills_from_latest() {
        let history = session();
        let shown = history.display(0, 1).unwrap();
        assert_eq!(shown.questions, history.get(0).unwrap().questions);
        assert_eq!(shown.parameters.len(), 1);
        assert_eq!(shown.parameters[0].name(), "alleenstaande");
        assert_eq!(shown.parameters[0].value(), &Value::Boolean(true));
        assert_eq!(shown.parameters[0].type_enum(), TypeEnum::Boolean);
    }

    #[test]
    fn parameters_follow_question_order() {
        let mut target = ExecutionResult::default();
        target.questions.label = "woonsituatie".to_string();
        for name in ["alleenstaande", "aanvrager_met_toeslagpartner"] {
            target
                .questions
                .parameters
                .upsert(Parameter::question(name, TypeEnum::Boolean, &[]));
        }
        let latest: ParametersCollection = [
            Parameter::from_text("toetsingsinkomen", "19000"),
            Parameter::from_text("aanvrager_met_toeslagpartner", "nee"),
            Parameter::from_text("alleenstaande", "ja"),
        ]
        .into_iter()
        .collect();
        let shown = DisplayExecutionResult::new(&target, &latest);
        assert_eq!(
            shown.parameters.names(),
            vec!["alleenstaande", "aanvrager_met_toeslagpartner"]
        );
    }

    #[test]
    fn replay_does_not_touch_history() {
        let history = session();
        let before = history.clone();
        history.display(0, 1).unwrap();
        history.display(1, 1).unwrap();
        assert_eq!(history, before);
    }

    #[test]
    fn replay_is_idempotent() {
        let history = session();
        assert_eq!(history.display(0, 1).unwrap(), history.display(0, 1).unwrap());
    }

    #[test]
    fn out_of_range_index() {
        let history = session();
        assert_eq!(
            history.display(0, 2).unwrap_err(),
            HistoryError::IndexOutOfRange { index: 2, len: 2 }
        );
        assert_eq!(history.latest_index(), Some(1));
        assert_eq!(History::new().latest_index(), None);
    }
}
