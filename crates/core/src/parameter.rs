//! Named, typed parameters and the ordered parameter store.
//!
//! A [`ParametersCollection`] is used both as the "known answers" input of an
//! execution and as the "resolved parameters" output. Names are unique within
//! a collection: upserting a parameter with an existing name replaces the
//! entry in place (last write wins).

use serde::{Deserialize, Deserializer, Serialize};

use crate::value::{TypeEnum, Value};

// ──────────────────────────────────────────────
// Parameter
// ──────────────────────────────────────────────

/// A named, typed value. Identity is by name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "ParameterRepr", into = "ParameterRepr")]
pub struct Parameter {
    name: String,
    type_: TypeEnum,
    value: Value,
    value_as_string: String,
}

impl Parameter {
    /// A parameter whose type is the tag of its value.
    pub fn new(name: impl Into<String>, value: Value) -> Self {
        Parameter::typed(name, value.type_enum(), value)
    }

    /// A parameter inferred from answer text, e.g. `("alleenstaande", "ja")`.
    pub fn from_text(name: impl Into<String>, text: &str) -> Self {
        Parameter::new(name, Value::from_text(text))
    }

    /// A parameter inferred from a raw JSON answer.
    pub fn from_json(name: impl Into<String>, raw: &serde_json::Value) -> Self {
        Parameter::new(name, Value::from_json(raw))
    }

    /// A parameter that is being asked for rather than answered.
    ///
    /// It carries the declared type, and for enumerable questions the option
    /// labels as a `List` value. Without options the value is `Unknown`.
    pub fn question(name: impl Into<String>, type_: TypeEnum, options: &[String]) -> Self {
        let value = if options.is_empty() {
            Value::Unknown
        } else {
            Value::List(options.to_vec())
        };
        Parameter::typed(name, type_, value)
    }

    fn typed(name: impl Into<String>, type_: TypeEnum, value: Value) -> Self {
        let value_as_string = value.to_string();
        Parameter {
            name: name.into(),
            type_,
            value,
            value_as_string,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn type_enum(&self) -> TypeEnum {
        self.type_
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn value_as_string(&self) -> &str {
        &self.value_as_string
    }

    /// Option labels of an enumerable question.
    pub fn options(&self) -> &[String] {
        match &self.value {
            Value::List(items) if self.type_ == TypeEnum::List => items,
            _ => &[],
        }
    }
}

/// Wire shape: `{"name": .., "type": .., "value": ..}`.
#[derive(Serialize, Deserialize)]
struct ParameterRepr {
    name: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    type_: Option<TypeEnum>,
    #[serde(default)]
    value: serde_json::Value,
}

impl From<ParameterRepr> for Parameter {
    fn from(repr: ParameterRepr) -> Self {
        let Some(declared) = repr.type_ else {
            return Parameter::from_json(repr.name, &repr.value);
        };
        match &repr.value {
            // Declared text is taken as written, not re-inferred.
            serde_json::Value::String(s) if declared == TypeEnum::String => {
                Parameter::new(repr.name, Value::String(s.clone()))
            }
            // Unanswered questions and option lists keep the declared type.
            serde_json::Value::Null | serde_json::Value::Array(_) => {
                Parameter::typed(repr.name, declared, Value::from_json(&repr.value))
            }
            raw => {
                let inferred = Value::from_json(raw);
                match inferred.coerce(declared) {
                    Some(coerced) => Parameter::new(repr.name, coerced),
                    None => Parameter::new(repr.name, inferred),
                }
            }
        }
    }
}

impl From<Parameter> for ParameterRepr {
    fn from(p: Parameter) -> Self {
        ParameterRepr {
            type_: Some(p.type_),
            value: match (&p.value, p.type_) {
                // Question parameters carry their options, not an answer.
                (Value::List(items), TypeEnum::List) => serde_json::json!(items),
                (v, _) => v.to_json(),
            },
            name: p.name,
        }
    }
}

// ──────────────────────────────────────────────
// ParametersCollection
// ──────────────────────────────────────────────

/// An ordered, name-unique collection of parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ParametersCollection(Vec<Parameter>);

/// Repeated names in the input collapse to their last entry, at the position
/// of the first.
impl<'de> Deserialize<'de> for ParametersCollection {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let parameters = Vec::<Parameter>::deserialize(deserializer)?;
        Ok(parameters.into_iter().collect())
    }
}

impl ParametersCollection {
    pub fn new() -> Self {
        ParametersCollection(Vec::new())
    }

    pub fn get_parameter(&self, name: &str) -> Option<&Parameter> {
        self.0.iter().find(|p| p.name == name)
    }

    /// Snapshot iteration in collection order.
    pub fn get_all(&self) -> impl Iterator<Item = &Parameter> {
        self.0.iter()
    }

    /// Insert a parameter, or replace the entry with the same name in place.
    pub fn upsert(&mut self, parameter: Parameter) {
        match self.0.iter_mut().find(|p| p.name == parameter.name) {
            Some(existing) => *existing = parameter,
            None => self.0.push(parameter),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get_parameter(name).is_some()
    }

    /// Whether `name` is present with a concrete value.
    pub fn is_known(&self, name: &str) -> bool {
        self.get_parameter(name)
            .is_some_and(|p| !p.value.is_unknown())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Parameter> {
        self.0.get(index)
    }

    pub fn names(&self) -> Vec<&str> {
        self.0.iter().map(|p| p.name.as_str()).collect()
    }

    pub fn as_slice(&self) -> &[Parameter] {
        &self.0
    }

    /// Build a collection from answers JSON: either an array of
    /// `{"name", "value"}` objects or a plain `{"name": value}` object.
    pub fn from_json(raw: &serde_json::Value) -> Result<Self, serde_json::Error> {
        match raw {
            serde_json::Value::Object(map) => Ok(map
                .iter()
                .map(|(name, value)| Parameter::from_json(name.clone(), value))
                .collect()),
            serde_json::Value::Array(_) => serde_json::from_value(raw.clone()),
            serde_json::Value::Null => Ok(ParametersCollection::new()),
            other => Err(serde::de::Error::custom(format!(
                "expected an answers object or array, got {}",
                other
            ))),
        }
    }
}

impl FromIterator<Parameter> for ParametersCollection {
    fn from_iter<I: IntoIterator<Item = Parameter>>(iter: I) -> Self {
        let mut collection = ParametersCollection::new();
        for p in iter {
            collection.upsert(p);
        }
        collection
    }
}

impl<'a> IntoIterator for &'a ParametersCollection {
    type Item = &'a Parameter;
    type IntoIter = std::slice::Iter<'a, Parameter>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl std::ops::Index<usize> for ParametersCollection {
    type Output = Parameter;

    fn index(&self, index: usize) -> &Parameter {
        &self.0[index]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use serde_json::json;

    #[test]
    fn upsert_replaces_by_name() {
        let mut params = ParametersCollection::new();
        params.upsert(Parameter::from_text("inkomen", "1000"));
        params.upsert(Parameter::from_text("alleenstaande", "ja"));
        params.upsert(Parameter::from_text("inkomen", "2000"));
        assert_eq!(params.len(), 2);
        assert_eq!(params.names(), vec!["inkomen", "alleenstaande"]);
        assert_eq!(
            params.get_parameter("inkomen").unwrap().value(),
            &Value::Double(Decimal::from(2000))
        );
    }

    #[test]
    fn parameter_from_answer_text() {
        let p = Parameter::from_text("alleenstaande", "ja");
        assert_eq!(p.type_enum(), TypeEnum::Boolean);
        assert_eq!(p.value(), &Value::Boolean(true));
        assert_eq!(p.value_as_string(), "true");
    }

    #[test]
    fn question_parameter_carries_options() {
        let options = vec!["optie1".to_string(), "optie2".to_string()];
        let p = Parameter::question("woonland", TypeEnum::List, &options);
        assert_eq!(p.type_enum(), TypeEnum::List);
        assert_eq!(p.options(), options.as_slice());
        assert_eq!(p.value_as_string(), "optie1, optie2");
        assert_eq!(
            Parameter::question("inkomen", TypeEnum::Double, &[]).value_as_string(),
            ""
        );
    }

    #[test]
    fn answers_object_builds_collection() {
        let params =
            ParametersCollection::from_json(&json!({"alleenstaande": "ja", "inkomen": 19000}))
                .unwrap();
        assert_eq!(params.len(), 2);
        assert!(params.is_known("alleenstaande"));
        assert_eq!(
            params.get_parameter("inkomen").unwrap().type_enum(),
            TypeEnum::Double
        );
    }

    #[test]
    fn answers_array_builds_collection() {
        let params = ParametersCollection::from_json(&json!([
            {"name": "inkomen", "type": "Double", "value": "19000"},
            {"name": "woonland", "value": "Nederland"}
        ]))
        .unwrap();
        assert_eq!(params[0].type_enum(), TypeEnum::Double);
        assert_eq!(params[1].type_enum(), TypeEnum::String);
    }

    #[test]
    fn answers_scalar_is_rejected() {
        assert!(ParametersCollection::from_json(&json!(42)).is_err());
    }

    #[test]
    fn serialized_shape() {
        let mut params = ParametersCollection::new();
        params.upsert(Parameter::from_text("inkomen", "19000.50"));
        let out = serde_json::to_value(&params).unwrap();
        assert_eq!(
            out,
            json!([{"name": "inkomen", "type": "Double", "value": "19000.5"}])
        );
    }

    #[test]
    fn answers_array_with_repeated_name_keeps_last() {
        let params = ParametersCollection::from_json(&json!([
            {"name": "inkomen", "value": 1000},
            {"name": "alleenstaande", "value": "ja"},
            {"name": "inkomen", "value": 2000}
        ]))
        .unwrap();
        assert_eq!(params.len(), 2);
        assert_eq!(params.names(), vec!["inkomen", "alleenstaande"]);
        assert_eq!(
            params.get_parameter("inkomen").unwrap().value(),
            &Value::Double(Decimal::from(2000))
        );
    }

    #[test]
    fn declared_text_is_kept_verbatim() {
        let params = ParametersCollection::from_json(&json!([
            {"name": "antwoord", "type": "String", "value": "ja"},
            {"name": "getal", "type": "String", "value": "1,5"}
        ]))
        .unwrap();
        assert_eq!(params[0].value(), &Value::String("ja".to_string()));
        assert_eq!(params[0].value_as_string(), "ja");
        assert_eq!(params[1].value(), &Value::String("1,5".to_string()));
    }

    #[test]
    fn every_type_survives_serialization() {
        let options = vec!["optie1".to_string(), "optie2".to_string()];
        let params: ParametersCollection = [
            Parameter::from_text("boolean", "ja"),
            Parameter::from_text("double", "19000.50"),
            Parameter::from_text("datum", "2020-01-01"),
            Parameter::from_text("tijdstip", "2020-01-01T08:30:00"),
            Parameter::from_text("duur", "1.02:00:00"),
            Parameter::from_text("periode", "2020-01-01/2020-12-31"),
            Parameter::new("tekst", Value::String("ja".to_string())),
            Parameter::new("komma", Value::String("1,5".to_string())),
            Parameter::new("lijst", Value::List(options.clone())),
            Parameter::new("onbekend", Value::Unknown),
            Parameter::question("woonland", TypeEnum::List, &options),
            Parameter::question("inkomen", TypeEnum::Double, &[]),
        ]
        .into_iter()
        .collect();
        let declared: Vec<TypeEnum> = params.get_all().map(|p| p.type_enum()).collect();
        for t in TypeEnum::ALL.iter() {
            assert!(declared.contains(t), "no parameter of type {}", t);
        }

        let json = serde_json::to_value(&params).unwrap();
        let back: ParametersCollection = serde_json::from_value(json).unwrap();
        assert_eq!(back, params);
    }
}
