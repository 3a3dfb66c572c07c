//! Expression evaluator for gate conditions, case guards and formulas.
//!
//! Evaluation is strict left to right, except that `and` and `or`
//! short-circuit: an operand that cannot change the outcome is never read,
//! so it cannot make the step wait for an answer.

use stepwise_core::ast::{BinaryOp, Expr, Func, UnaryOp};
use stepwise_core::model::{AnswerMode, DeclarationSource, Model, StepKind};
use stepwise_core::{ParametersCollection, Value};

use crate::numeric;
use crate::provenance::ProvenanceCollector;
use crate::types::EvalError;

/// Names visible to expressions: the model's constants and the known set.
pub struct Scope<'a> {
    model: &'a Model,
    known: &'a ParametersCollection,
}

impl<'a> Scope<'a> {
    pub fn new(model: &'a Model, known: &'a ParametersCollection) -> Self {
        Scope { model, known }
    }

    /// Current value of `name`, or `None` while it is not known.
    ///
    /// An unanswered option of a choice whose other option was picked
    /// reads as `false`.
    pub fn resolve(&self, name: &str) -> Option<Value> {
        if let Some(constant) = self.model.constants.get_parameter(name) {
            return Some(constant.value().clone());
        }
        if let Some(p) = self.known.get_parameter(name) {
            if !p.value().is_unknown() {
                return Some(p.value().clone());
            }
        }
        let decl = self.model.declaration(name)?;
        let DeclarationSource::Question { step } = decl.source else {
            return None;
        };
        match &self.model.steps[step].kind {
            StepKind::Question {
                parameters,
                mode: AnswerMode::AnyOf,
            } if parameters.iter().any(|p| self.known.is_known(&p.name)) => {
                Some(Value::Boolean(false))
            }
            _ => None,
        }
    }
}

/// Evaluate `expr`. The `collector` records every parameter read.
pub fn eval_expr(
    expr: &Expr,
    scope: &Scope<'_>,
    collector: &mut ProvenanceCollector,
) -> Result<Value, EvalError> {
    match expr {
        Expr::Literal { value, .. } => Ok(value.clone()),

        Expr::Ref { name, .. } => {
            collector.record_parameter(name);
            scope
                .resolve(name)
                .ok_or_else(|| EvalError::Missing { name: name.clone() })
        }

        Expr::Unary { op, operand, .. } => {
            let value = eval_expr(operand, scope, collector)?;
            match (op, value) {
                (UnaryOp::Not, Value::Boolean(b)) => Ok(Value::Boolean(!b)),
                (UnaryOp::Neg, Value::Double(d)) => Ok(Value::Double(-d)),
                (UnaryOp::Neg, Value::TimeSpan(span)) => Ok(Value::TimeSpan(-span)),
                (UnaryOp::Not, other) => Err(type_error(format!(
                    "'not' expects Boolean, got {}",
                    other.type_enum()
                ))),
                (UnaryOp::Neg, other) => Err(type_error(format!(
                    "cannot negate {}",
                    other.type_enum()
                ))),
            }
        }

        Expr::Binary {
            op: op @ (BinaryOp::And | BinaryOp::Or),
            left,
            right,
            ..
        } => {
            let l = as_bool(eval_expr(left, scope, collector)?, *op)?;
            match (op, l) {
                (BinaryOp::And, false) => Ok(Value::Boolean(false)),
                (BinaryOp::Or, true) => Ok(Value::Boolean(true)),
                _ => {
                    let r = as_bool(eval_expr(right, scope, collector)?, *op)?;
                    Ok(Value::Boolean(r))
                }
            }
        }

        Expr::Binary {
            op, left, right, ..
        } => {
            let l = eval_expr(left, scope, collector)?;
            let r = eval_expr(right, scope, collector)?;
            if op.is_arithmetic() {
                eval_arith(*op, l, r)
            } else {
                compare(*op, &l, &r).map(Value::Boolean)
            }
        }

        Expr::Call { func, args, .. } => {
            let mut values = Vec::with_capacity(args.len());
            for arg in args {
                match eval_expr(arg, scope, collector)? {
                    Value::Double(d) => values.push(d),
                    other => {
                        return Err(type_error(format!(
                            "function '{}' expects Double arguments, got {}",
                            func.name(),
                            other.type_enum()
                        )))
                    }
                }
            }
            let result = match (func, values.as_slice()) {
                (Func::Min, [a, b]) => *a.min(b),
                (Func::Max, [a, b]) => *a.max(b),
                (Func::Abs, [a]) => a.abs(),
                (Func::Round, [a]) => numeric::round(*a, rust_decimal::Decimal::ZERO)?,
                (Func::Round, [a, digits]) => numeric::round(*a, *digits)?,
                _ => {
                    return Err(type_error(format!(
                        "function '{}' called with {} arguments",
                        func.name(),
                        values.len()
                    )))
                }
            };
            Ok(Value::Double(result))
        }
    }
}

fn type_error(message: String) -> EvalError {
    EvalError::Type { message }
}

fn as_bool(value: Value, op: BinaryOp) -> Result<bool, EvalError> {
    value.as_bool().ok_or_else(|| {
        type_error(format!(
            "operator '{}' expects Boolean operands, got {}",
            op.symbol(),
            value.type_enum()
        ))
    })
}

fn eval_arith(op: BinaryOp, left: Value, right: Value) -> Result<Value, EvalError> {
    let out_of_range = || EvalError::Arithmetic {
        message: "date outside the supported range".to_string(),
    };
    match (op, left, right) {
        (_, Value::Double(l), Value::Double(r)) => {
            numeric::eval_arith(op, l, r).map(Value::Double)
        }
        (BinaryOp::Add, Value::TimeSpan(l), Value::TimeSpan(r)) => l
            .checked_add(r)
            .map(Value::TimeSpan)
            .ok_or_else(out_of_range),
        (BinaryOp::Sub, Value::TimeSpan(l), Value::TimeSpan(r)) => l
            .checked_sub(r)
            .map(Value::TimeSpan)
            .ok_or_else(out_of_range),
        (BinaryOp::Add, Value::DateTime(dt), Value::TimeSpan(span))
        | (BinaryOp::Add, Value::TimeSpan(span), Value::DateTime(dt)) => dt
            .checked_add(span)
            .map(Value::DateTime)
            .ok_or_else(out_of_range),
        (BinaryOp::Sub, Value::DateTime(dt), Value::TimeSpan(span)) => dt
            .checked_sub(span)
            .map(Value::DateTime)
            .ok_or_else(out_of_range),
        (BinaryOp::Sub, Value::DateTime(l), Value::DateTime(r)) => Ok(Value::TimeSpan(l - r)),
        (BinaryOp::Mul, Value::TimeSpan(span), Value::Double(f))
        | (BinaryOp::Mul, Value::Double(f), Value::TimeSpan(span)) => {
            numeric::scale_duration(span, f, false).map(Value::TimeSpan)
        }
        (BinaryOp::Div, Value::TimeSpan(span), Value::Double(f)) => {
            numeric::scale_duration(span, f, true).map(Value::TimeSpan)
        }
        (op, l, r) => Err(type_error(format!(
            "operator '{}' cannot combine {} and {}",
            op.symbol(),
            l.type_enum(),
            r.type_enum()
        ))),
    }
}

/// Equality holds across types by string rendering; ordering needs two
/// values of the same orderable type.
fn compare(op: BinaryOp, left: &Value, right: &Value) -> Result<bool, EvalError> {
    match (left, right) {
        (Value::Double(l), Value::Double(r)) => numeric::compare_ord(l, r, op),
        (Value::DateTime(l), Value::DateTime(r)) => numeric::compare_ord(l, r, op),
        (Value::TimeSpan(l), Value::TimeSpan(r)) => numeric::compare_ord(l, r, op),
        (l, r) if matches!(op, BinaryOp::Eq | BinaryOp::Neq) => {
            let equal = if l.type_enum() == r.type_enum() {
                l == r
            } else {
                l.to_string() == r.to_string()
            };
            Ok(if op == BinaryOp::Eq { equal } else { !equal })
        }
        (l, r) => Err(type_error(format!(
            "operator '{}' cannot order {} and {}",
            op.symbol(),
            l.type_enum(),
            r.type_enum()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    use rust_decimal::Decimal;
    use stepwise_core::{compile, parse_expression, Parameter};

    const SCRIPT: &str = r#"constants:
  - { name: grens, value: 29562 }
steps:
  - id: woonsituatie
    choice: [alleenstaande, partner]
  - id: gegevens
    ask:
      - { name: inkomen, type: Double }
      - { name: geboortedatum, type: DateTime }
      - { name: vrij }
"#;

    fn eval_with(src: &str, known: &ParametersCollection) -> (Result<Value, EvalError>, Vec<String>) {
        let model = compile(SCRIPT).unwrap();
        let expr = parse_expression(src).unwrap();
        let scope = Scope::new(&model, known);
        let mut collector = ProvenanceCollector::new();
        let result = eval_expr(&expr.root, &scope, &mut collector);
        (result, collector.parameters_used)
    }

    fn known(pairs: &[(&str, &str)]) -> ParametersCollection {
        pairs
            .iter()
            .map(|(n, v)| Parameter::from_text(*n, v))
            .collect()
    }

    #[test]
    fn constants_are_visible() {
        let (result, used) = eval_with("inkomen <= grens", &known(&[("inkomen", "19000")]));
        assert_eq!(result.unwrap(), Value::Boolean(true));
        assert_eq!(used, vec!["inkomen", "grens"]);
    }

    #[test]
    fn missing_parameter_reported() {
        let (result, _) = eval_with("inkomen * 2", &ParametersCollection::new());
        assert_eq!(
            result.unwrap_err(),
            EvalError::Missing {
                name: "inkomen".to_string()
            }
        );
    }

    #[test]
    fn unanswered_choice_option_reads_false() {
        let answers = known(&[("alleenstaande", "ja")]);
        let (result, _) = eval_with("partner", &answers);
        assert_eq!(result.unwrap(), Value::Boolean(false));
        let (result, _) = eval_with("partner", &ParametersCollection::new());
        assert!(result.is_err());
    }

    #[test]
    fn and_short_circuits() {
        let answers = known(&[("partner", "nee")]);
        let (result, used) = eval_with("partner and inkomen > 0", &answers);
        assert_eq!(result.unwrap(), Value::Boolean(false));
        assert_eq!(used, vec!["partner"]);
    }

    #[test]
    fn or_short_circuits() {
        let answers = known(&[("alleenstaande", "ja")]);
        let (result, _) = eval_with("alleenstaande or inkomen > 0", &answers);
        assert_eq!(result.unwrap(), Value::Boolean(true));
    }

    #[test]
    fn formula_with_functions() {
        let answers = known(&[("inkomen", "19000")]);
        let (result, _) = eval_with(
            "max(0, round((1609 - 0.02005 * 20941 - 0.1352 * max(0, inkomen - 20941)) / 12, 2))",
            &answers,
        );
        assert_eq!(
            result.unwrap(),
            Value::Double(Decimal::from_str("99.09").unwrap())
        );
    }

    #[test]
    fn date_difference_is_timespan() {
        let answers = known(&[("geboortedatum", "2000-01-01")]);
        let (result, _) = eval_with("geboortedatum - geboortedatum", &answers);
        assert_eq!(result.unwrap(), Value::TimeSpan(time::Duration::ZERO));
    }

    #[test]
    fn untyped_value_compared_by_rendering() {
        let answers = known(&[("vrij", "12")]);
        let (result, _) = eval_with("vrij = '12'", &answers);
        assert_eq!(result.unwrap(), Value::Boolean(true));
    }

    #[test]
    fn runtime_type_error_on_untyped_value() {
        let answers = known(&[("vrij", "tekst")]);
        let (result, _) = eval_with("vrij * 2", &answers);
        assert!(matches!(result.unwrap_err(), EvalError::Type { .. }));
    }

    #[test]
    fn division_by_zero_is_arithmetic_error() {
        let answers = known(&[("inkomen", "0")]);
        let (result, _) = eval_with("100 / inkomen", &answers);
        assert!(matches!(result.unwrap_err(), EvalError::Arithmetic { .. }));
    }
}
