//! Maps a result to the input element a front end should render.
//!
//! The choice of widget lives here, at the boundary, and nowhere in the
//! engine. Every `TypeEnum` variant is matched explicitly.

use std::collections::BTreeMap;

use serde::Serialize;
use stepwise_core::TypeEnum;

use crate::types::ExecutionResult;

/// Source of display texts for parameters, e.g. a content store.
pub trait LabelSource {
    fn title(&self, _name: &str) -> Option<String> {
        None
    }

    fn hint(&self, _name: &str) -> Option<String> {
        None
    }
}

/// Falls back to names for every label.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoLabels;

impl LabelSource for NoLabels {}

/// Titles by parameter name.
impl LabelSource for BTreeMap<String, String> {
    fn title(&self, name: &str) -> Option<String> {
        self.get(name).cloned()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FormElementKind {
    Radio,
    Select,
    Number,
    Text,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormElement {
    /// Name of the first asked parameter; `None` for a terminal result.
    pub name: Option<String>,
    pub inferred_type: TypeEnum,
    pub kind: FormElementKind,
    pub label: String,
    /// Option key to option label.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub options: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint_text: Option<String>,
}

pub fn form_element(result: &ExecutionResult, labels: &dyn LabelSource) -> FormElement {
    let questions = &result.questions.parameters;
    let inferred_type = result.inferred_type();
    let Some(first) = questions.get(0) else {
        return FormElement {
            name: None,
            inferred_type,
            kind: FormElementKind::Text,
            label: String::new(),
            options: BTreeMap::new(),
            hint_text: None,
        };
    };

    let name = first.name().to_string();
    let label = labels
        .title(&result.questions.label)
        .or_else(|| labels.title(&name))
        .unwrap_or_else(|| capitalize(&result.questions.label));
    let hint_text = labels.hint(&name);

    let (kind, options) = match inferred_type {
        TypeEnum::Boolean => (
            FormElementKind::Radio,
            questions
                .get_all()
                .map(|p| {
                    let text = labels
                        .title(p.name())
                        .unwrap_or_else(|| capitalize(p.name()));
                    (p.name().to_string(), text)
                })
                .collect(),
        ),
        TypeEnum::List => (
            FormElementKind::Select,
            first
                .options()
                .iter()
                .map(|o| (o.clone(), labels.title(o).unwrap_or_else(|| o.clone())))
                .collect(),
        ),
        TypeEnum::Double => (FormElementKind::Number, BTreeMap::new()),
        TypeEnum::String
        | TypeEnum::DateTime
        | TypeEnum::TimeSpan
        | TypeEnum::Period
        | TypeEnum::Unknown => (FormElementKind::Text, BTreeMap::new()),
    };

    FormElement {
        name: Some(name),
        inferred_type,
        kind,
        label,
        options,
        hint_text,
    }
}

/// `aanvrager_met_toeslagpartner` → `Aanvrager met toeslagpartner`.
fn capitalize(name: &str) -> String {
    let spaced = name.replace('_', " ");
    let mut chars = spaced.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stepwise_core::{Parameter, ParametersCollection};

    use crate::types::QuestionArgs;

    fn asking(label: &str, params: Vec<Parameter>) -> ExecutionResult {
        ExecutionResult {
            questions: QuestionArgs {
                label: label.to_string(),
                parameters: params.into_iter().collect(),
            },
            ..ExecutionResult::default()
        }
    }

    #[test]
    fn boolean_choice_is_radio_keyed_by_name() {
        let result = asking(
            "woonsituatie",
            vec![
                Parameter::question("alleenstaande", TypeEnum::Boolean, &[]),
                Parameter::question("aanvrager_met_toeslagpartner", TypeEnum::Boolean, &[]),
            ],
        );
        let el = form_element(&result, &NoLabels);
        assert_eq!(el.kind, FormElementKind::Radio);
        assert_eq!(el.name.as_deref(), Some("alleenstaande"));
        assert_eq!(el.label, "Woonsituatie");
        assert_eq!(
            el.options.get("aanvrager_met_toeslagpartner").map(String::as_str),
            Some("Aanvrager met toeslagpartner")
        );
        assert_eq!(el.options.len(), 2);
    }

    #[test]
    fn list_is_select_keyed_by_value() {
        let options = vec!["optie1".to_string(), "optie2".to_string()];
        let result = asking(
            "keuze",
            vec![Parameter::question("optie", TypeEnum::List, &options)],
        );
        let mut titles = BTreeMap::new();
        titles.insert("optie1".to_string(), "Eerste optie".to_string());
        let el = form_element(&result, &titles);
        assert_eq!(el.kind, FormElementKind::Select);
        assert_eq!(el.options.get("optie1").map(String::as_str), Some("Eerste optie"));
        assert_eq!(el.options.get("optie2").map(String::as_str), Some("optie2"));
    }

    #[test]
    fn double_is_number_input() {
        let result = asking(
            "inkomen",
            vec![Parameter::question("toetsingsinkomen", TypeEnum::Double, &[])],
        );
        let el = form_element(&result, &NoLabels);
        assert_eq!(el.kind, FormElementKind::Number);
        assert!(el.options.is_empty());
    }

    #[test]
    fn other_types_are_text() {
        for t in [TypeEnum::String, TypeEnum::DateTime, TypeEnum::TimeSpan, TypeEnum::Period] {
            let result = asking("vraag", vec![Parameter::question("p", t, &[])]);
            assert_eq!(form_element(&result, &NoLabels).kind, FormElementKind::Text);
        }
    }

    #[test]
    fn terminal_result_has_no_name() {
        let result = ExecutionResult {
            parameters: ParametersCollection::new(),
            ..ExecutionResult::default()
        };
        let el = form_element(&result, &NoLabels);
        assert_eq!(el.name, None);
        assert_eq!(el.inferred_type, TypeEnum::Unknown);
    }
}
