//! Plain-text rendering of results and interview screens.

use stepwise_core::ParametersCollection;
use stepwise_eval::{ExecutionResult, FormElement, FormElementKind};

pub fn result_text(result: &ExecutionResult) -> String {
    let mut out = String::new();
    if result.is_terminal() {
        out.push_str(&format!(
            "outcome: {}\n",
            result.outcome.as_deref().unwrap_or("(end)")
        ));
    } else {
        out.push_str(&format!("questions ({}):\n", result.questions.label));
        for p in result.questions.parameters.get_all() {
            let options = p.options();
            if options.is_empty() {
                out.push_str(&format!("  {}: {}\n", p.name(), p.type_enum()));
            } else {
                out.push_str(&format!(
                    "  {}: {} [{}]\n",
                    p.name(),
                    p.type_enum(),
                    options.join(", ")
                ));
            }
        }
    }
    out.push_str(&parameters_text("parameters", &result.parameters));
    out.push_str("stacktrace:\n");
    for item in &result.stacktrace {
        out.push_str(&format!("  {} [{}]\n", item.step_id, item.kind));
    }
    out
}

pub fn parameters_text(heading: &str, parameters: &ParametersCollection) -> String {
    if parameters.is_empty() {
        return String::new();
    }
    let mut out = format!("{}:\n", heading);
    for p in parameters.get_all() {
        out.push_str(&format!(
            "  {} = {} ({})\n",
            p.name(),
            p.value_as_string(),
            p.type_enum()
        ));
    }
    out
}

/// One interview screen: the element and any answers already given.
pub fn screen_text(element: &FormElement, prefill: &ParametersCollection) -> String {
    let mut out = format!("\n{}\n", element.label);
    if let Some(hint) = &element.hint_text {
        out.push_str(&format!("  ({})\n", hint));
    }
    let current = |name: &str| {
        prefill
            .get_parameter(name)
            .map(|p| p.value_as_string().to_string())
    };
    match element.kind {
        FormElementKind::Radio | FormElementKind::Select => {
            let selected = element.name.as_deref().and_then(current);
            for (key, text) in &element.options {
                let mark = match element.kind {
                    FormElementKind::Radio => current(key).is_some_and(|v| v == "true"),
                    _ => selected.as_deref() == Some(key.as_str()),
                };
                out.push_str(&format!(
                    "  [{}] {} ({})\n",
                    if mark { "x" } else { " " },
                    text,
                    key
                ));
            }
        }
        FormElementKind::Number | FormElementKind::Text => {
            if let Some(name) = &element.name {
                let value = current(name).unwrap_or_default();
                out.push_str(&format!("  {} ({}): {}\n", name, element.inferred_type, value));
            }
        }
    }
    out
}
