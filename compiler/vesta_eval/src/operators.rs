//! Binary operator implementations for the evaluator.
//!
//! Arithmetic dispatches on the runtime type of the left operand over the
//! closed set of numeric primitives; the right operand must have the same
//! runtime type. The type set is fixed, so dispatch is a `match` rather
//! than trait objects.
//!
//! - Unchecked integer arithmetic wraps; `*Checked` operators raise
//!   `Overflow`.
//! - Integer `/` and `%` by zero raise `DivisionByZero`; `MIN / -1` raises
//!   `Overflow`.
//! - Equality is host value equality for every operand type; ordering is
//!   IEEE for floats and the comparable contract for everything else.
//!
//! Short-circuit operators never reach this module: the interpreter
//! evaluates their right operand on demand.

use vesta_ir::BinaryOp;
use vesta_object::errors::{
    division_by_zero, invalid_cast, null_reference, overflow, unsupported_operation,
};
use vesta_object::{EvalError, EvalResult, Value};

/// Checked arithmetic result with overflow handling.
#[inline]
fn checked_arith<T>(result: Option<T>, wrap: fn(T) -> Value, op: BinaryOp) -> EvalResult {
    result.map(wrap).ok_or_else(|| overflow(op.name()))
}

/// Checked division or remainder with zero guard.
#[inline]
fn checked_div<T, F>(is_zero: bool, f: F, wrap: fn(T) -> Value, op: BinaryOp) -> EvalResult
where
    F: FnOnce() -> Option<T>,
{
    if is_zero {
        Err(division_by_zero())
    } else {
        f().map(wrap).ok_or_else(|| overflow(op.name()))
    }
}

/// Evaluate a binary operation on two evaluated operands.
#[expect(
    clippy::needless_pass_by_value,
    reason = "operands are consumed from the operand list; references would force clones at call sites"
)]
pub fn evaluate_binary(op: BinaryOp, left: Value, right: Value) -> EvalResult {
    match op {
        BinaryOp::Eq => return Ok(Value::Bool(left.equals(&right))),
        BinaryOp::NotEq => return Ok(Value::Bool(!left.equals(&right))),
        BinaryOp::ArrayIndex => return array_index(&left, &right),
        BinaryOp::AndAlso | BinaryOp::OrElse | BinaryOp::Coalesce => {
            return Err(unsupported_operation(op.name(), "eager operands"));
        }
        _ => {}
    }
    match (&left, &right) {
        (Value::I8(a), Value::I8(b)) => eval_i8_binary(*a, *b, op),
        (Value::U8(a), Value::U8(b)) => eval_u8_binary(*a, *b, op),
        (Value::I16(a), Value::I16(b)) => eval_i16_binary(*a, *b, op),
        (Value::U16(a), Value::U16(b)) => eval_u16_binary(*a, *b, op),
        (Value::I32(a), Value::I32(b)) => eval_i32_binary(*a, *b, op),
        (Value::U32(a), Value::U32(b)) => eval_u32_binary(*a, *b, op),
        (Value::I64(a), Value::I64(b)) => eval_i64_binary(*a, *b, op),
        (Value::U64(a), Value::U64(b)) => eval_u64_binary(*a, *b, op),
        (Value::F32(a), Value::F32(b)) => eval_f32_binary(*a, *b, op),
        (Value::F64(a), Value::F64(b)) => eval_f64_binary(*a, *b, op),
        (Value::Bool(a), Value::Bool(b)) => eval_bool_binary(*a, *b, op),
        (Value::Null, _) => Err(null_reference()),
        (l, r) if is_arithmetic_left(l) => Err(invalid_cast(r.type_name(), l.type_name())),
        (l, r) if op.is_comparison() => compare_values(l, r, op),
        (l, _) => Err(unsupported_operation(op.name(), l.type_name())),
    }
}

fn is_arithmetic_left(value: &Value) -> bool {
    value
        .primitive_type()
        .is_some_and(|ty| ty.is_numeric() || ty == vesta_ir::ExprType::Bool)
}

/// Ordering through the comparable contract (chars, strings).
fn compare_values(left: &Value, right: &Value, op: BinaryOp) -> EvalResult {
    let ordering = left
        .compare(right)
        .ok_or_else(|| invalid_cast(right.type_name(), left.type_name()))?;
    Ok(Value::Bool(match op {
        BinaryOp::Lt => ordering.is_lt(),
        BinaryOp::LtEq => ordering.is_le(),
        BinaryOp::Gt => ordering.is_gt(),
        BinaryOp::GtEq => ordering.is_ge(),
        _ => return Err(unsupported_operation(op.name(), left.type_name())),
    }))
}

/// Element `index` of a one-dimensional array.
pub fn array_index(array: &Value, index: &Value) -> EvalResult {
    match array {
        Value::Array(items) => items.get(index_value(index)?),
        Value::Null => Err(null_reference()),
        other => Err(unsupported_operation(BinaryOp::ArrayIndex.name(), other.type_name())),
    }
}

/// An integer index operand widened to `i64`.
pub fn index_value(index: &Value) -> Result<i64, EvalError> {
    Ok(match index {
        Value::I8(i) => i64::from(*i),
        Value::U8(i) => i64::from(*i),
        Value::I16(i) => i64::from(*i),
        Value::U16(i) => i64::from(*i),
        Value::I32(i) => i64::from(*i),
        Value::U32(i) => i64::from(*i),
        Value::I64(i) => *i,
        Value::U64(i) => i64::try_from(*i).unwrap_or(i64::MAX),
        other => return Err(invalid_cast(other.type_name(), "Int32")),
    })
}

// Type-Specific Evaluation Functions

macro_rules! define_int_binary {
    ($($fn_name:ident: $ty:ty => $variant:ident, $host:literal;)*) => {$(
        fn $fn_name(a: $ty, b: $ty, op: BinaryOp) -> EvalResult {
            match op {
                BinaryOp::Add => Ok(Value::$variant(a.wrapping_add(b))),
                BinaryOp::AddChecked => checked_arith(a.checked_add(b), Value::$variant, op),
                BinaryOp::Sub => Ok(Value::$variant(a.wrapping_sub(b))),
                BinaryOp::SubChecked => checked_arith(a.checked_sub(b), Value::$variant, op),
                BinaryOp::Mul => Ok(Value::$variant(a.wrapping_mul(b))),
                BinaryOp::MulChecked => checked_arith(a.checked_mul(b), Value::$variant, op),
                BinaryOp::Div => checked_div(b == 0, || a.checked_div(b), Value::$variant, op),
                BinaryOp::Mod => checked_div(b == 0, || a.checked_rem(b), Value::$variant, op),
                BinaryOp::Power => match u32::try_from(b).ok() {
                    Some(exp) => checked_arith(a.checked_pow(exp), Value::$variant, op),
                    None => Err(unsupported_operation("negative power", $host)),
                },
                BinaryOp::BitAnd => Ok(Value::$variant(a & b)),
                BinaryOp::BitOr => Ok(Value::$variant(a | b)),
                BinaryOp::BitXor => Ok(Value::$variant(a ^ b)),
                BinaryOp::Lt => Ok(Value::Bool(a < b)),
                BinaryOp::LtEq => Ok(Value::Bool(a <= b)),
                BinaryOp::Gt => Ok(Value::Bool(a > b)),
                BinaryOp::GtEq => Ok(Value::Bool(a >= b)),
                _ => Err(unsupported_operation(op.name(), $host)),
            }
        }
    )*};
}

define_int_binary! {
    eval_i8_binary: i8 => I8, "SByte";
    eval_u8_binary: u8 => U8, "Byte";
    eval_i16_binary: i16 => I16, "Int16";
    eval_u16_binary: u16 => U16, "UInt16";
    eval_i32_binary: i32 => I32, "Int32";
    eval_u32_binary: u32 => U32, "UInt32";
    eval_i64_binary: i64 => I64, "Int64";
    eval_u64_binary: u64 => U64, "UInt64";
}

macro_rules! define_float_binary {
    ($($fn_name:ident: $ty:ty => $variant:ident, $host:literal;)*) => {$(
        fn $fn_name(a: $ty, b: $ty, op: BinaryOp) -> EvalResult {
            match op {
                BinaryOp::Add | BinaryOp::AddChecked => Ok(Value::$variant(a + b)),
                BinaryOp::Sub | BinaryOp::SubChecked => Ok(Value::$variant(a - b)),
                BinaryOp::Mul | BinaryOp::MulChecked => Ok(Value::$variant(a * b)),
                BinaryOp::Div => Ok(Value::$variant(a / b)),
                BinaryOp::Mod => Ok(Value::$variant(a % b)),
                BinaryOp::Power => Ok(Value::$variant(a.powf(b))),
                BinaryOp::Lt => Ok(Value::Bool(a < b)),
                BinaryOp::LtEq => Ok(Value::Bool(a <= b)),
                BinaryOp::Gt => Ok(Value::Bool(a > b)),
                BinaryOp::GtEq => Ok(Value::Bool(a >= b)),
                _ => Err(unsupported_operation(op.name(), $host)),
            }
        }
    )*};
}

define_float_binary! {
    eval_f32_binary: f32 => F32, "Single";
    eval_f64_binary: f64 => F64, "Double";
}

fn eval_bool_binary(a: bool, b: bool, op: BinaryOp) -> EvalResult {
    match op {
        BinaryOp::BitAnd => Ok(Value::Bool(a & b)),
        BinaryOp::BitOr => Ok(Value::Bool(a | b)),
        BinaryOp::BitXor => Ok(Value::Bool(a ^ b)),
        BinaryOp::Lt => Ok(Value::Bool(a < b)),
        BinaryOp::LtEq => Ok(Value::Bool(a <= b)),
        BinaryOp::Gt => Ok(Value::Bool(a > b)),
        BinaryOp::GtEq => Ok(Value::Bool(a >= b)),
        _ => Err(unsupported_operation(op.name(), "Boolean")),
    }
}
