//! Parameter dictionary for `{{name}}` placeholders in content texts.

use std::collections::{BTreeMap, BTreeSet};

use rust_decimal::Decimal;
use serde::Serialize;
use stepwise_core::{ParametersCollection, Value};

/// A placeholder value: numbers keep their decimal payload so the content
/// layer can format them; everything else is its string rendering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum TemplateValue {
    Number(Decimal),
    Text(String),
}

impl std::fmt::Display for TemplateValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TemplateValue::Number(d) => write!(f, "{}", d.normalize()),
            TemplateValue::Text(s) => f.write_str(s),
        }
    }
}

pub fn template_values(parameters: &ParametersCollection) -> BTreeMap<String, TemplateValue> {
    let mut values = BTreeMap::new();
    for p in parameters {
        let value = match p.value() {
            Value::Double(d) => TemplateValue::Number(*d),
            _ => TemplateValue::Text(p.value_as_string().to_string()),
        };
        values.insert(p.name().to_string(), value);
    }
    values
}

/// Placeholder names in `text`, in order of first appearance. Whitespace
/// inside the braces is ignored.
fn placeholders(text: &str) -> Vec<(std::ops::Range<usize>, &str)> {
    let mut found = Vec::new();
    let mut rest = 0;
    while let Some(open) = text[rest..].find("{{") {
        let start = rest + open;
        let Some(close) = text[start + 2..].find("}}") else {
            break;
        };
        let end = start + 2 + close + 2;
        let name = text[start + 2..end - 2].trim();
        if !name.is_empty() {
            found.push((start..end, name));
        }
        rest = end;
    }
    found
}

/// Placeholders in `text` that have no value, deduplicated.
pub fn unresolved_placeholders(
    text: &str,
    values: &BTreeMap<String, TemplateValue>,
) -> Vec<String> {
    let mut seen = BTreeSet::new();
    placeholders(text)
        .into_iter()
        .filter(|(_, name)| !values.contains_key(*name))
        .filter(|(_, name)| seen.insert(*name))
        .map(|(_, name)| name.to_string())
        .collect()
}

/// Substitute known placeholders; unknown ones are left as written.
pub fn render(text: &str, values: &BTreeMap<String, TemplateValue>) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for (range, name) in placeholders(text) {
        if let Some(value) = values.get(name) {
            out.push_str(&text[last..range.start]);
            out.push_str(&value.to_string());
            last = range.end;
        }
    }
    out.push_str(&text[last..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    use stepwise_core::Parameter;

    fn params() -> ParametersCollection {
        [
            Parameter::from_text("toetsingsinkomen", "19000.50"),
            Parameter::from_text("alleenstaande", "ja"),
            Parameter::from_text("woonland", "Nederland"),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn doubles_keep_numeric_payload() {
        let values = template_values(&params());
        assert_eq!(
            values["toetsingsinkomen"],
            TemplateValue::Number(Decimal::from_str("19000.50").unwrap())
        );
        assert_eq!(values["alleenstaande"], TemplateValue::Text("true".into()));
        assert_eq!(values["woonland"], TemplateValue::Text("Nederland".into()));
    }

    #[test]
    fn serialized_as_plain_values() {
        let json = serde_json::to_value(template_values(&params())).unwrap();
        assert_eq!(json["woonland"], serde_json::json!("Nederland"));
        assert_eq!(json["toetsingsinkomen"], serde_json::json!("19000.50"));
    }

    #[test]
    fn unresolved_are_reported_once() {
        let values = template_values(&params());
        let text = "Inkomen {{ toetsingsinkomen }}, toeslag {{zorgtoeslag}} ({{zorgtoeslag}})";
        assert_eq!(unresolved_placeholders(text, &values), vec!["zorgtoeslag"]);
    }

    #[test]
    fn render_substitutes_known_values() {
        let values = template_values(&params());
        assert_eq!(
            render("U woont in {{woonland}}; {{onbekend}}.", &values),
            "U woont in Nederland; {{onbekend}}."
        );
        assert_eq!(render("{{toetsingsinkomen}}", &values), "19000.5");
    }

    #[test]
    fn unterminated_placeholder_is_text() {
        let values = template_values(&params());
        assert!(unresolved_placeholders("{{woonland", &values).is_empty());
        assert_eq!(render("{{woonland", &values), "{{woonland");
    }
}
