//! Raw rule-script document, as read from YAML.
//!
//! These types mirror the authored shape one to one. Semantic checks
//! (references, types, step shapes) happen in [`crate::compile`].

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::value::TypeEnum;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawScript {
    #[serde(default)]
    pub info: BTreeMap<String, serde_yaml::Value>,
    #[serde(default)]
    pub constants: Vec<RawConstant>,
    #[serde(default)]
    pub steps: Vec<RawStep>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawConstant {
    pub name: String,
    #[serde(default)]
    pub value: serde_yaml::Value,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawStep {
    pub id: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub choice: Option<Vec<serde_yaml::Value>>,
    #[serde(default)]
    pub ask: Option<Vec<RawAsk>>,
    #[serde(default)]
    pub derive: Option<RawDerive>,
    #[serde(default)]
    pub gate: Option<RawGate>,
    #[serde(default)]
    pub next: Option<RawTarget>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawAsk {
    pub name: String,
    #[serde(rename = "type", default)]
    pub type_: Option<TypeEnum>,
    #[serde(default)]
    pub options: Option<Vec<serde_yaml::Value>>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawDerive {
    pub name: String,
    #[serde(rename = "type", default)]
    pub type_: Option<TypeEnum>,
    /// Formulas may be written as bare YAML numbers, so they are read as
    /// untyped scalars and rendered to text afterwards.
    #[serde(default)]
    pub formula: Option<serde_yaml::Value>,
    #[serde(default)]
    pub cases: Option<Vec<RawCase>>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawCase {
    #[serde(default)]
    pub when: Option<serde_yaml::Value>,
    pub formula: serde_yaml::Value,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawGate {
    pub when: serde_yaml::Value,
    #[serde(default)]
    pub then: Option<RawTarget>,
    #[serde(rename = "else", default)]
    pub otherwise: Option<RawTarget>,
    /// Question step to fall back to when the condition cannot be decided.
    #[serde(default)]
    pub ask: Option<String>,
}

/// A successor: `next`, `end`, a step id, `{goto: id}` or `{outcome: label}`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawTarget {
    Named(String),
    Goto { goto: String },
    Outcome { outcome: String },
}

/// Parse the YAML document.
pub fn load(text: &str) -> Result<RawScript, serde_yaml::Error> {
    serde_yaml::from_str(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_all_step_shapes() {
        let script = load(
            r#"
info: { subject: zorgtoeslag, year: 2019 }
constants:
  - { name: grens, value: 29562 }
steps:
  - id: woonsituatie
    choice: [alleenstaande, partner]
  - id: inkomen
    ask:
      - { name: toetsingsinkomen, type: Double }
  - id: toets
    gate:
      when: toetsingsinkomen <= grens
      else: { outcome: geen_recht }
  - id: hoogte
    derive:
      name: toeslag
      cases:
        - { when: alleenstaande, formula: 100 }
        - { formula: "200" }
    next: end
"#,
        )
        .unwrap();
        assert_eq!(script.steps.len(), 4);
        assert_eq!(script.constants[0].name, "grens");
        assert!(matches!(
            script.steps[2].gate.as_ref().unwrap().otherwise,
            Some(RawTarget::Outcome { .. })
        ));
        assert!(matches!(script.steps[3].next, Some(RawTarget::Named(ref s)) if s == "end"));
        assert_eq!(
            script.steps[1].ask.as_ref().unwrap()[0].type_,
            Some(TypeEnum::Double)
        );
    }

    #[test]
    fn unknown_step_field_rejected() {
        let err = load("steps:\n  - id: a\n    chioce: [x]\n").unwrap_err();
        assert!(err.to_string().contains("chioce"));
    }
}
