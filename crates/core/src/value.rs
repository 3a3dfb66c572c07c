//! Answer values and type inference.
//!
//! [`TypeEnum`] is the closed set of answer types. It drives both the type
//! checking of rule scripts and the rendering choices made downstream (form
//! element, template substitution). [`Value`] carries one typed payload per
//! tag, so a value's tag can never fall outside the set.
//!
//! Inference never fails: shapes that are not recognized fall back to
//! `String`, and only an absent value infers `Unknown`.

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::macros::format_description;
use time::{Date, Duration, PrimitiveDateTime, Time};

// ──────────────────────────────────────────────
// Type tags
// ──────────────────────────────────────────────

/// The closed set of answer types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TypeEnum {
    #[serde(alias = "boolean", alias = "bool")]
    Boolean,
    #[serde(alias = "double", alias = "number")]
    Double,
    #[serde(alias = "string", alias = "text")]
    String,
    #[serde(alias = "datetime", alias = "date")]
    DateTime,
    #[serde(alias = "timespan", alias = "duration")]
    TimeSpan,
    #[serde(alias = "period")]
    Period,
    #[serde(alias = "list")]
    List,
    #[serde(alias = "unknown")]
    Unknown,
}

impl TypeEnum {
    pub const ALL: [TypeEnum; 8] = [
        TypeEnum::Boolean,
        TypeEnum::Double,
        TypeEnum::String,
        TypeEnum::DateTime,
        TypeEnum::TimeSpan,
        TypeEnum::Period,
        TypeEnum::List,
        TypeEnum::Unknown,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            TypeEnum::Boolean => "Boolean",
            TypeEnum::Double => "Double",
            TypeEnum::String => "String",
            TypeEnum::DateTime => "DateTime",
            TypeEnum::TimeSpan => "TimeSpan",
            TypeEnum::Period => "Period",
            TypeEnum::List => "List",
            TypeEnum::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for TypeEnum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ──────────────────────────────────────────────
// Values
// ──────────────────────────────────────────────

/// A typed answer value.
///
/// Numbers are exact decimals; there is no `f64` on the evaluation path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Boolean(bool),
    Double(Decimal),
    String(String),
    DateTime(PrimitiveDateTime),
    TimeSpan(Duration),
    Period {
        start: PrimitiveDateTime,
        end: PrimitiveDateTime,
    },
    /// Always non-empty; an empty sequence is `Unknown`.
    List(Vec<String>),
    Unknown,
}

const TRUE_WORDS: [&str; 3] = ["ja", "true", "yes"];
const FALSE_WORDS: [&str; 3] = ["nee", "false", "no"];

impl Value {
    pub fn type_enum(&self) -> TypeEnum {
        match self {
            Value::Boolean(_) => TypeEnum::Boolean,
            Value::Double(_) => TypeEnum::Double,
            Value::String(_) => TypeEnum::String,
            Value::DateTime(_) => TypeEnum::DateTime,
            Value::TimeSpan(_) => TypeEnum::TimeSpan,
            Value::Period { .. } => TypeEnum::Period,
            Value::List(_) => TypeEnum::List,
            Value::Unknown => TypeEnum::Unknown,
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Value::Unknown)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_decimal(&self) -> Option<Decimal> {
        match self {
            Value::Double(d) => Some(*d),
            _ => None,
        }
    }

    /// Infer a typed value from a raw JSON answer.
    pub fn from_json(raw: &serde_json::Value) -> Value {
        match raw {
            serde_json::Value::Null => Value::Unknown,
            serde_json::Value::Bool(b) => Value::Boolean(*b),
            serde_json::Value::Number(n) => {
                let text = n.to_string();
                parse_decimal(&text)
                    .or_else(|| Decimal::from_scientific(&text).ok())
                    .map(Value::Double)
                    .unwrap_or(Value::String(text))
            }
            serde_json::Value::String(s) => Value::from_text(s),
            serde_json::Value::Array(items) => {
                if items.is_empty() {
                    return Value::Unknown;
                }
                Value::List(
                    items
                        .iter()
                        .map(|item| match item {
                            serde_json::Value::String(s) => s.clone(),
                            other => other.to_string(),
                        })
                        .collect(),
                )
            }
            serde_json::Value::Object(_) => Value::String(raw.to_string()),
        }
    }

    /// Infer a typed value from a YAML literal in a rule script.
    pub fn from_yaml(raw: &serde_yaml::Value) -> Value {
        match raw {
            serde_yaml::Value::Null => Value::Unknown,
            serde_yaml::Value::Bool(b) => Value::Boolean(*b),
            serde_yaml::Value::Number(n) => {
                let text = n.to_string();
                parse_decimal(&text)
                    .or_else(|| Decimal::from_scientific(&text).ok())
                    .map(Value::Double)
                    .unwrap_or(Value::String(text))
            }
            serde_yaml::Value::String(s) => Value::from_text(s),
            serde_yaml::Value::Sequence(items) => {
                let labels: Vec<String> = items.iter().filter_map(scalar_text).collect();
                if labels.is_empty() {
                    Value::Unknown
                } else {
                    Value::List(labels)
                }
            }
            serde_yaml::Value::Tagged(tagged) => Value::from_yaml(&tagged.value),
            serde_yaml::Value::Mapping(_) => Value::String(
                serde_yaml::to_string(raw)
                    .map(|s| s.trim_end().to_string())
                    .unwrap_or_default(),
            ),
        }
    }

    /// Infer a typed value from answer text.
    pub fn from_text(text: &str) -> Value {
        let trimmed = text.trim();
        let lower = trimmed.to_lowercase();
        if TRUE_WORDS.contains(&lower.as_str()) {
            return Value::Boolean(true);
        }
        if FALSE_WORDS.contains(&lower.as_str()) {
            return Value::Boolean(false);
        }
        if let Some(d) = parse_decimal(trimmed) {
            return Value::Double(d);
        }
        if let Some(dt) = parse_datetime(trimmed) {
            return Value::DateTime(dt);
        }
        if let Some((start, end)) = parse_period(trimmed) {
            return Value::Period { start, end };
        }
        if let Some(span) = parse_timespan(trimmed) {
            return Value::TimeSpan(span);
        }
        Value::String(text.to_string())
    }

    /// Convert to the requested type, or `None` when the value cannot be
    /// read as that type. `Unknown` accepts any value unchanged.
    pub fn coerce(&self, target: TypeEnum) -> Option<Value> {
        if self.type_enum() == target || target == TypeEnum::Unknown {
            return Some(self.clone());
        }
        match (target, self) {
            (TypeEnum::String, Value::Unknown) => None,
            (TypeEnum::String, other) => Some(Value::String(other.to_string())),
            (_, Value::String(s)) => {
                let inferred = Value::from_text(s);
                (inferred.type_enum() == target).then_some(inferred)
            }
            (TypeEnum::List, Value::Boolean(_) | Value::Double(_)) => {
                Some(Value::List(vec![self.to_string()]))
            }
            _ => None,
        }
    }

    /// JSON rendering used for serialized results. Decimals are emitted as
    /// strings to keep their exact representation.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Boolean(b) => serde_json::Value::Bool(*b),
            Value::List(items) => serde_json::json!(items),
            Value::Unknown => serde_json::Value::Null,
            other => serde_json::Value::String(other.to_string()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Double(d) => write!(f, "{}", d.normalize()),
            Value::String(s) => f.write_str(s),
            Value::DateTime(dt) => f.write_str(&format_datetime(dt)),
            Value::TimeSpan(span) => f.write_str(&format_timespan(span)),
            Value::Period { start, end } => {
                write!(f, "{}/{}", format_datetime(start), format_datetime(end))
            }
            Value::List(items) => f.write_str(&items.join(", ")),
            Value::Unknown => Ok(()),
        }
    }
}

/// Infer the type of a raw JSON answer.
pub fn infer(raw: &serde_json::Value) -> TypeEnum {
    Value::from_json(raw).type_enum()
}

/// Infer the type of answer text.
pub fn infer_text(text: &str) -> TypeEnum {
    Value::from_text(text).type_enum()
}

/// Text of a YAML scalar; `None` for null, sequences and mappings.
pub fn scalar_text(raw: &serde_yaml::Value) -> Option<String> {
    match raw {
        serde_yaml::Value::String(s) => Some(s.clone()),
        serde_yaml::Value::Number(n) => Some(n.to_string()),
        serde_yaml::Value::Bool(b) => Some(b.to_string()),
        serde_yaml::Value::Tagged(tagged) => scalar_text(&tagged.value),
        _ => None,
    }
}

// ──────────────────────────────────────────────
// Literal parsing
// ──────────────────────────────────────────────

fn parse_decimal(text: &str) -> Option<Decimal> {
    let text = text.trim();
    let first = text.chars().next()?;
    if !(first.is_ascii_digit() || first == '-' || first == '+' || first == '.') {
        return None;
    }
    if !text
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '-' | '+' | '.' | ','))
    {
        return None;
    }
    let normalized = if text.contains(',') && !text.contains('.') {
        text.replacen(',', ".", 1)
    } else {
        text.to_string()
    };
    let normalized = normalized.strip_prefix('+').unwrap_or(&normalized);
    Decimal::from_str(normalized).ok()
}

fn parse_datetime(text: &str) -> Option<PrimitiveDateTime> {
    let date_only = format_description!("[year]-[month]-[day]");
    if let Ok(date) = Date::parse(text, &date_only) {
        return Some(PrimitiveDateTime::new(date, Time::MIDNIGHT));
    }
    let normalized = text.replacen('T', " ", 1);
    let with_seconds = format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
    if let Ok(dt) = PrimitiveDateTime::parse(&normalized, &with_seconds) {
        return Some(dt);
    }
    let without_seconds = format_description!("[year]-[month]-[day] [hour]:[minute]");
    PrimitiveDateTime::parse(&normalized, &without_seconds).ok()
}

fn parse_period(text: &str) -> Option<(PrimitiveDateTime, PrimitiveDateTime)> {
    let (left, right) = text.split_once('/')?;
    let start = parse_datetime(left.trim())?;
    let end = parse_datetime(right.trim())?;
    (start <= end).then_some((start, end))
}

/// `[d.]hh:mm[:ss]`, the layout of a .NET-style time span.
fn parse_timespan(text: &str) -> Option<Duration> {
    let (negative, text) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text),
    };
    let (days, clock) = match text.split_once('.') {
        Some((d, rest)) if rest.contains(':') && d.chars().all(|c| c.is_ascii_digit()) => {
            (d.parse::<i64>().ok()?, rest)
        }
        Some(_) => return None,
        None => (0, text),
    };
    let parts: Vec<&str> = clock.split(':').collect();
    if parts.len() < 2 || parts.len() > 3 {
        return None;
    }
    if !parts
        .iter()
        .all(|p| !p.is_empty() && p.len() <= 2 && p.chars().all(|c| c.is_ascii_digit()))
    {
        return None;
    }
    let hours: i64 = parts[0].parse().ok()?;
    let minutes: i64 = parts[1].parse().ok()?;
    let seconds: i64 = match parts.get(2) {
        Some(s) => s.parse().ok()?,
        None => 0,
    };
    if hours > 23 || minutes > 59 || seconds > 59 {
        return None;
    }
    let total = days
        .checked_mul(86_400)?
        .checked_add(hours * 3_600 + minutes * 60 + seconds)?;
    Some(Duration::seconds(if negative { -total } else { total }))
}

fn format_datetime(dt: &PrimitiveDateTime) -> String {
    let date = dt.date();
    if dt.time() == Time::MIDNIGHT {
        format!(
            "{:04}-{:02}-{:02}",
            date.year(),
            u8::from(date.month()),
            date.day()
        )
    } else {
        format!(
            "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}",
            date.year(),
            u8::from(date.month()),
            date.day(),
            dt.hour(),
            dt.minute(),
            dt.second()
        )
    }
}

fn format_timespan(span: &Duration) -> String {
    let total = span.whole_seconds();
    let sign = if total < 0 { "-" } else { "" };
    let total = total.abs();
    let days = total / 86_400;
    let hours = (total % 86_400) / 3_600;
    let minutes = (total % 3_600) / 60;
    let seconds = total % 60;
    if days > 0 {
        format!(
            "{}{}.{:02}:{:02}:{:02}",
            sign, days, hours, minutes, seconds
        )
    } else {
        format!("{}{:02}:{:02}:{:02}", sign, hours, minutes, seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn dutch_yes_is_boolean_true() {
        assert_eq!(Value::from_text("ja"), Value::Boolean(true));
        assert_eq!(Value::from_text("Nee"), Value::Boolean(false));
        assert_eq!(infer(&json!("ja")), TypeEnum::Boolean);
    }

    #[test]
    fn json_bool_and_number() {
        assert_eq!(infer(&json!(true)), TypeEnum::Boolean);
        assert_eq!(infer(&json!(1500)), TypeEnum::Double);
        assert_eq!(infer(&json!(0.25)), TypeEnum::Double);
    }

    #[test]
    fn numeric_text_with_comma_separator() {
        assert_eq!(
            Value::from_text("12,5"),
            Value::Double(Decimal::from_str("12.5").unwrap())
        );
        assert_eq!(infer_text("-3"), TypeEnum::Double);
    }

    #[test]
    fn dates_and_datetimes() {
        assert_eq!(infer_text("2020-01-31"), TypeEnum::DateTime);
        assert_eq!(infer_text("2020-01-31T12:30"), TypeEnum::DateTime);
        assert_eq!(infer_text("2020-01-31 12:30:15"), TypeEnum::DateTime);
        assert_eq!(Value::from_text("2020-01-31").to_string(), "2020-01-31");
    }

    #[test]
    fn timespans() {
        assert_eq!(infer_text("02:30"), TypeEnum::TimeSpan);
        assert_eq!(infer_text("1.02:00:00"), TypeEnum::TimeSpan);
        assert_eq!(Value::from_text("1.02:00:00").to_string(), "1.02:00:00");
        assert_eq!(infer_text("25:00"), TypeEnum::String);
    }

    #[test]
    fn oversized_day_count_is_text() {
        assert_eq!(infer_text("999999999999999.00:00"), TypeEnum::String);
        assert_eq!(infer_text("-999999999999999.00:00:00"), TypeEnum::String);
        assert_eq!(infer_text("--1.00:00"), TypeEnum::String);
        assert_eq!(infer_text("106751991167300.00:00"), TypeEnum::TimeSpan);
    }

    #[test]
    fn periods() {
        assert_eq!(infer_text("2020-01-01/2020-12-31"), TypeEnum::Period);
        assert_eq!(infer_text("2020-12-31/2020-01-01"), TypeEnum::String);
    }

    #[test]
    fn sequences_infer_list() {
        assert_eq!(infer(&json!(["optie1", "optie2"])), TypeEnum::List);
        assert_eq!(infer(&json!([])), TypeEnum::Unknown);
    }

    #[test]
    fn absent_value_is_unknown() {
        assert_eq!(infer(&json!(null)), TypeEnum::Unknown);
    }

    #[test]
    fn everything_else_is_string() {
        assert_eq!(infer_text("Nederland"), TypeEnum::String);
        assert_eq!(infer(&json!({"a": 1})), TypeEnum::String);
        assert_eq!(infer_text("1.2.3"), TypeEnum::String);
    }

    #[test]
    fn coerce_text_to_declared_type() {
        let v = Value::String("1500".to_string());
        assert_eq!(
            v.coerce(TypeEnum::Double),
            Some(Value::Double(Decimal::from(1500)))
        );
        assert_eq!(Value::String("abc".into()).coerce(TypeEnum::Double), None);
        assert_eq!(
            Value::Boolean(true).coerce(TypeEnum::String),
            Some(Value::String("true".into()))
        );
    }

    #[test]
    fn decimal_rendering_is_normalized() {
        let v = Value::Double(Decimal::from_str("99.090").unwrap());
        assert_eq!(v.to_string(), "99.09");
        assert_eq!(v.to_json(), json!("99.09"));
    }

    #[test]
    fn yaml_literals() {
        let v: serde_yaml::Value = serde_yaml::from_str("[optie1, optie2]").unwrap();
        assert_eq!(
            Value::from_yaml(&v),
            Value::List(vec!["optie1".into(), "optie2".into()])
        );
        let n: serde_yaml::Value = serde_yaml::from_str("29562").unwrap();
        assert_eq!(Value::from_yaml(&n), Value::Double(Decimal::from(29562)));
    }
}
