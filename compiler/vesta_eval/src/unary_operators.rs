//! Unary operator implementations for the evaluator.
//!
//! Covers the operators that only look at the operand value. Conversions
//! (`Convert`, `ConvertChecked`, `TypeAs`, `Unbox`) need the host type
//! registry and live in [`conversions`](crate::conversions); `Quote` never
//! evaluates its operand and is handled by the interpreter.

use vesta_ir::UnaryOp;
use vesta_object::errors::{null_reference, overflow, unsupported_operation};
use vesta_object::{EvalResult, Value};

/// Evaluate a value-only unary operation.
pub fn evaluate_unary(op: UnaryOp, value: Value) -> EvalResult {
    match (op, &value) {
        (UnaryOp::Negate, _) => negate(&value, false),
        (UnaryOp::NegateChecked, _) => negate(&value, true),
        (UnaryOp::UnaryPlus, v) if v.primitive_type().is_some_and(|t| t.is_numeric()) => {
            Ok(value)
        }

        // Logical not on bool, bitwise complement on integers
        (UnaryOp::Not, Value::Bool(b)) => Ok(Value::Bool(!b)),
        (UnaryOp::Not, Value::I8(n)) => Ok(Value::I8(!n)),
        (UnaryOp::Not, Value::U8(n)) => Ok(Value::U8(!n)),
        (UnaryOp::Not, Value::I16(n)) => Ok(Value::I16(!n)),
        (UnaryOp::Not, Value::U16(n)) => Ok(Value::U16(!n)),
        (UnaryOp::Not, Value::I32(n)) => Ok(Value::I32(!n)),
        (UnaryOp::Not, Value::U32(n)) => Ok(Value::U32(!n)),
        (UnaryOp::Not, Value::I64(n)) => Ok(Value::I64(!n)),
        (UnaryOp::Not, Value::U64(n)) => Ok(Value::U64(!n)),

        (UnaryOp::ArrayLength, Value::Array(a)) => {
            Ok(Value::I32(i32::try_from(a.len()).unwrap_or(i32::MAX)))
        }

        (_, Value::Null) => Err(null_reference()),
        _ => Err(unsupported_operation(op.name(), value.type_name())),
    }
}

/// Arithmetic negation. Unchecked negation of `MIN` wraps to `MIN`.
fn negate(value: &Value, checked: bool) -> EvalResult {
    macro_rules! neg {
        ($n:expr, $variant:ident) => {
            if checked {
                $n.checked_neg()
                    .map(Value::$variant)
                    .ok_or_else(|| overflow(UnaryOp::NegateChecked.name()))
            } else {
                Ok(Value::$variant($n.wrapping_neg()))
            }
        };
    }
    match value {
        Value::I8(n) => neg!(n, I8),
        Value::I16(n) => neg!(n, I16),
        Value::I32(n) => neg!(n, I32),
        Value::I64(n) => neg!(n, I64),
        Value::F32(f) => Ok(Value::F32(-f)),
        Value::F64(f) => Ok(Value::F64(-f)),
        Value::Null => Err(null_reference()),
        other => Err(unsupported_operation(
            if checked {
                UnaryOp::NegateChecked.name()
            } else {
                UnaryOp::Negate.name()
            },
            other.type_name(),
        )),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "Tests can panic")]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use vesta_ir::ExprType;
    use vesta_object::EvalErrorKind;

    #[test]
    fn negation() {
        assert_eq!(
            evaluate_unary(UnaryOp::Negate, Value::I32(5)).unwrap(),
            Value::I32(-5)
        );
        assert_eq!(
            evaluate_unary(UnaryOp::Negate, Value::F64(1.5)).unwrap(),
            Value::F64(-1.5)
        );
        assert_eq!(
            evaluate_unary(UnaryOp::Negate, Value::I32(i32::MIN)).unwrap(),
            Value::I32(i32::MIN)
        );
    }

    #[test]
    fn checked_negation_overflows() {
        assert!(matches!(
            evaluate_unary(UnaryOp::NegateChecked, Value::I64(i64::MIN))
                .unwrap_err()
                .kind,
            EvalErrorKind::Overflow { .. }
        ));
    }

    #[test]
    fn unsigned_negation_is_unsupported() {
        let err = evaluate_unary(UnaryOp::Negate, Value::U32(1)).unwrap_err();
        assert_eq!(err.message, "negate: UInt32");
    }

    #[test]
    fn not() {
        assert_eq!(
            evaluate_unary(UnaryOp::Not, Value::Bool(true)).unwrap(),
            Value::Bool(false)
        );
        assert_eq!(
            evaluate_unary(UnaryOp::Not, Value::U8(0b1111_0000)).unwrap(),
            Value::U8(0b0000_1111)
        );
        assert!(evaluate_unary(UnaryOp::Not, Value::F64(1.0)).is_err());
    }

    #[test]
    fn unary_plus_is_identity_on_numbers() {
        assert_eq!(
            evaluate_unary(UnaryOp::UnaryPlus, Value::I16(-3)).unwrap(),
            Value::I16(-3)
        );
        assert!(evaluate_unary(UnaryOp::UnaryPlus, Value::string("x")).is_err());
    }

    #[test]
    fn array_length() {
        let array = Value::array(ExprType::Object, vec![Value::Null; 3]);
        assert_eq!(
            evaluate_unary(UnaryOp::ArrayLength, array).unwrap(),
            Value::I32(3)
        );
        assert_eq!(
            evaluate_unary(UnaryOp::ArrayLength, Value::Null)
                .unwrap_err()
                .kind,
            EvalErrorKind::NullReference
        );
    }
}
