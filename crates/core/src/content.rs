//! Content-template skeleton for the text layer.
//!
//! Rule scripts only carry semantic keys. Human-readable titles, texts and
//! hints live in a separate content document; this module produces an empty
//! one with an entry for every step and every asked parameter.

use serde::Serialize;

use crate::model::{Model, StepKind};

#[derive(Debug, Serialize)]
pub struct ContentTemplate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    pub entries: Vec<ContentEntry>,
}

#[derive(Debug, Serialize)]
pub struct ContentEntry {
    pub key: String,
    pub title: String,
    pub text: String,
    pub hint: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<ContentEntry>,
}

impl ContentEntry {
    fn blank(key: impl Into<String>, title: &str) -> Self {
        ContentEntry {
            key: key.into(),
            title: title.to_string(),
            text: String::new(),
            hint: String::new(),
            parameters: Vec::new(),
        }
    }
}

impl Model {
    /// Skeleton content document. Titles are seeded with the descriptions
    /// found in the script; every other field is left empty.
    pub fn content_skeleton(&self) -> ContentTemplate {
        let entries = self
            .steps
            .iter()
            .filter(|s| !matches!(s.kind, StepKind::Derivation { .. }))
            .map(|step| {
                let mut entry = ContentEntry::blank(step.id.clone(), &step.description);
                entry.parameters = step
                    .question_parameters()
                    .iter()
                    .map(|p| {
                        let mut param = ContentEntry::blank(p.name.clone(), "");
                        if p.description != step.description {
                            param.title = p.description.clone();
                        }
                        param
                    })
                    .collect();
                entry
            })
            .collect();
        ContentTemplate {
            subject: self.info.get("subject").cloned(),
            entries,
        }
    }

    /// The skeleton rendered as YAML.
    pub fn content_template(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(&self.content_skeleton())
    }
}
