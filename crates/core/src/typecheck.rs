//! Static typing of expressions against the declaration table.
//!
//! `Unknown` is a wildcard: a parameter declared without a type is accepted
//! wherever a concrete type is expected, and the evaluator checks it at run
//! time instead.

use std::collections::HashMap;

use crate::ast::{BinaryOp, Expr, UnaryOp};
use crate::error::ExprError;
use crate::value::TypeEnum;

/// Name-to-type map used while checking expressions.
#[derive(Debug, Clone, Default)]
pub struct TypeEnv {
    types: HashMap<String, TypeEnum>,
}

impl TypeEnv {
    pub fn new() -> Self {
        TypeEnv::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, type_: TypeEnum) {
        self.types.insert(name.into(), type_);
    }

    pub fn get(&self, name: &str) -> Option<TypeEnum> {
        self.types.get(name).copied()
    }
}

/// Infer the type of `expr`, rejecting unknown names and operator misuse.
pub fn check(expr: &Expr, env: &TypeEnv) -> Result<TypeEnum, ExprError> {
    match expr {
        Expr::Literal { value, .. } => Ok(value.type_enum()),
        Expr::Ref { name, span } => env.get(name).ok_or_else(|| {
            ExprError::unknown_reference(format!("unknown parameter '{}'", name), *span)
        }),
        Expr::Unary { op, operand, span } => {
            let t = check(operand, env)?;
            match op {
                UnaryOp::Neg => match t {
                    TypeEnum::Double | TypeEnum::TimeSpan | TypeEnum::Unknown => Ok(t),
                    other => Err(ExprError::type_mismatch(
                        format!("cannot negate a value of type {}", other),
                        *span,
                    )),
                },
                UnaryOp::Not => {
                    expect_boolean(t, operand, "operand of 'not'")?;
                    Ok(TypeEnum::Boolean)
                }
            }
        }
        Expr::Binary {
            op,
            left,
            right,
            span,
        } => {
            let lt = check(left, env)?;
            let rt = check(right, env)?;
            match op {
                BinaryOp::And | BinaryOp::Or => {
                    expect_boolean(lt, left, &format!("left operand of '{}'", op.symbol()))?;
                    expect_boolean(rt, right, &format!("right operand of '{}'", op.symbol()))?;
                    Ok(TypeEnum::Boolean)
                }
                BinaryOp::Eq | BinaryOp::Neq => {
                    if lt != rt && lt != TypeEnum::Unknown && rt != TypeEnum::Unknown {
                        return Err(mismatch(*op, lt, rt, *span));
                    }
                    Ok(TypeEnum::Boolean)
                }
                _ if op.is_ordering() => {
                    let orderable = |t: TypeEnum| {
                        matches!(
                            t,
                            TypeEnum::Double
                                | TypeEnum::DateTime
                                | TypeEnum::TimeSpan
                                | TypeEnum::Unknown
                        )
                    };
                    if !orderable(lt) || !orderable(rt) {
                        return Err(mismatch(*op, lt, rt, *span));
                    }
                    if lt != rt && lt != TypeEnum::Unknown && rt != TypeEnum::Unknown {
                        return Err(mismatch(*op, lt, rt, *span));
                    }
                    Ok(TypeEnum::Boolean)
                }
                _ => arithmetic(*op, lt, rt)
                    .ok_or_else(|| mismatch(*op, lt, rt, *span)),
            }
        }
        Expr::Call { func, args, .. } => {
            for arg in args {
                let t = check(arg, env)?;
                if t != TypeEnum::Double && t != TypeEnum::Unknown {
                    return Err(ExprError::type_mismatch(
                        format!(
                            "function '{}' expects Double arguments, got {}",
                            func.name(),
                            t
                        ),
                        arg.span(),
                    ));
                }
            }
            Ok(TypeEnum::Double)
        }
    }
}

/// Check a condition: the expression must be Boolean (or untyped).
pub fn check_condition(expr: &Expr, env: &TypeEnv) -> Result<(), ExprError> {
    let t = check(expr, env)?;
    expect_boolean(t, expr, "condition")
}

/// Result type of an arithmetic operator, `None` when the operands do not
/// combine. Date arithmetic follows the calendar: a date plus a time span is
/// a date, the difference of two dates is a time span.
pub fn arithmetic(op: BinaryOp, lt: TypeEnum, rt: TypeEnum) -> Option<TypeEnum> {
    use TypeEnum::*;
    match (op, lt, rt) {
        (_, Double, Double) => Some(Double),
        (BinaryOp::Add | BinaryOp::Sub, TimeSpan, TimeSpan) => Some(TimeSpan),
        (BinaryOp::Add | BinaryOp::Sub, DateTime, TimeSpan) => Some(DateTime),
        (BinaryOp::Add, TimeSpan, DateTime) => Some(DateTime),
        (BinaryOp::Sub, DateTime, DateTime) => Some(TimeSpan),
        (BinaryOp::Mul, TimeSpan, Double) | (BinaryOp::Mul, Double, TimeSpan) => Some(TimeSpan),
        (BinaryOp::Div, TimeSpan, Double) => Some(TimeSpan),
        (_, Unknown, Unknown) => Some(Unknown),
        (_, Unknown, Double) | (_, Double, Unknown) => Some(Double),
        (_, Unknown, DateTime | TimeSpan) | (_, DateTime | TimeSpan, Unknown) => Some(Unknown),
        _ => None,
    }
}

fn expect_boolean(t: TypeEnum, expr: &Expr, what: &str) -> Result<(), ExprError> {
    match t {
        TypeEnum::Boolean | TypeEnum::Unknown => Ok(()),
        other => Err(ExprError::type_mismatch(
            format!("{} must be Boolean, got {}", what, other),
            expr.span(),
        )),
    }
}

fn mismatch(op: BinaryOp, lt: TypeEnum, rt: TypeEnum, span: crate::error::Span) -> ExprError {
    ExprError::type_mismatch(
        format!(
            "operator '{}' cannot combine {} and {}",
            op.symbol(),
            lt,
            rt
        ),
        span,
    )
}
