//! Decimal arithmetic for formulas.
//!
//! All arithmetic uses `rust_decimal::Decimal` with checked operations and
//! `RoundingStrategy::MidpointNearestEven`. No `f64` anywhere in the
//! evaluation path.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use stepwise_core::ast::BinaryOp;
use time::Duration;

use crate::types::EvalError;

/// Largest scale `round` accepts, the precision limit of `Decimal`.
const MAX_ROUND_DIGITS: u32 = 28;

fn overflow(what: &str) -> EvalError {
    EvalError::Arithmetic {
        message: format!("{} overflow", what),
    }
}

/// Checked `+ - * /` on two decimals.
pub fn eval_arith(op: BinaryOp, left: Decimal, right: Decimal) -> Result<Decimal, EvalError> {
    match op {
        BinaryOp::Add => left.checked_add(right).ok_or_else(|| overflow("addition")),
        BinaryOp::Sub => left
            .checked_sub(right)
            .ok_or_else(|| overflow("subtraction")),
        BinaryOp::Mul => left
            .checked_mul(right)
            .ok_or_else(|| overflow("multiplication")),
        BinaryOp::Div => {
            if right.is_zero() {
                return Err(EvalError::Arithmetic {
                    message: "division by zero".to_string(),
                });
            }
            left.checked_div(right).ok_or_else(|| overflow("division"))
        }
        other => Err(EvalError::Type {
            message: format!("operator '{}' is not arithmetic", other.symbol()),
        }),
    }
}

/// Round to `digits` decimal places, ties to even.
pub fn round(value: Decimal, digits: Decimal) -> Result<Decimal, EvalError> {
    let dp = if digits.fract().is_zero() {
        digits.to_u32().filter(|d| *d <= MAX_ROUND_DIGITS)
    } else {
        None
    };
    let dp = dp.ok_or_else(|| EvalError::Arithmetic {
        message: format!(
            "round precision must be a whole number between 0 and {}, got {}",
            MAX_ROUND_DIGITS, digits
        ),
    })?;
    Ok(value.round_dp_with_strategy(dp, RoundingStrategy::MidpointNearestEven))
}

/// Scale a time span by a decimal factor, to whole seconds.
pub fn scale_duration(span: Duration, factor: Decimal, divide: bool) -> Result<Duration, EvalError> {
    let seconds = Decimal::from(span.whole_seconds());
    let scaled = if divide {
        eval_arith(BinaryOp::Div, seconds, factor)?
    } else {
        eval_arith(BinaryOp::Mul, seconds, factor)?
    };
    scaled
        .round_dp_with_strategy(0, RoundingStrategy::MidpointNearestEven)
        .to_i64()
        .map(Duration::seconds)
        .ok_or_else(|| overflow("time span"))
}

/// Apply an ordering or equality operator to an `Ord` pair.
pub fn compare_ord<T: Ord>(left: &T, right: &T, op: BinaryOp) -> Result<bool, EvalError> {
    match op {
        BinaryOp::Eq => Ok(left == right),
        BinaryOp::Neq => Ok(left != right),
        BinaryOp::Lt => Ok(left < right),
        BinaryOp::Lte => Ok(left <= right),
        BinaryOp::Gt => Ok(left > right),
        BinaryOp::Gte => Ok(left >= right),
        other => Err(EvalError::Type {
            message: format!("operator '{}' is not a comparison", other.symbol()),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn exact_decimal_multiplication() {
        assert_eq!(
            eval_arith(BinaryOp::Mul, d("0.02005"), d("20941")).unwrap(),
            d("419.86705")
        );
    }

    #[test]
    fn division_by_zero() {
        let err = eval_arith(BinaryOp::Div, d("1"), Decimal::ZERO).unwrap_err();
        assert!(matches!(err, EvalError::Arithmetic { .. }));
    }

    #[test]
    fn multiplication_overflow() {
        assert!(eval_arith(BinaryOp::Mul, Decimal::MAX, d("2")).is_err());
    }

    #[test]
    fn round_ties_to_even() {
        assert_eq!(round(d("2.345"), d("2")).unwrap(), d("2.34"));
        assert_eq!(round(d("2.355"), d("2")).unwrap(), d("2.36"));
        assert_eq!(round(d("99.0944125"), d("2")).unwrap(), d("99.09"));
        assert_eq!(round(d("2.5"), Decimal::ZERO).unwrap(), d("2"));
    }

    #[test]
    fn round_rejects_fractional_precision() {
        assert!(round(d("1.5"), d("0.5")).is_err());
        assert!(round(d("1.5"), d("-1")).is_err());
        assert!(round(d("1.5"), d("29")).is_err());
    }

    #[test]
    fn duration_scaling() {
        let span = Duration::hours(1);
        assert_eq!(
            scale_duration(span, d("1.5"), false).unwrap(),
            Duration::minutes(90)
        );
        assert_eq!(
            scale_duration(span, d("4"), true).unwrap(),
            Duration::minutes(15)
        );
    }

    #[test]
    fn ordering_operators() {
        assert!(compare_ord(&d("1"), &d("1.0"), BinaryOp::Eq).unwrap());
        assert!(compare_ord(&d("1"), &d("2"), BinaryOp::Lt).unwrap());
        assert!(compare_ord(&1, &2, BinaryOp::Add).is_err());
    }
}
