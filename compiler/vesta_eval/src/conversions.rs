//! Conversions and type tests: `Convert`, `ConvertChecked`, `TypeAs`,
//! `Unbox`.
//!
//! Numeric conversions go through a widened intermediate (`i128` or
//! `f64`). Unchecked conversions truncate bits like a host `conv`
//! instruction; checked conversions raise `Overflow` when the value does
//! not fit. Conversions to reference types are assignability checks
//! against the host type hierarchy.

use vesta_ir::{ExprType, StringInterner, UnaryOp};
use vesta_object::errors::{invalid_cast, null_reference, overflow};
use vesta_object::{EvalResult, TypeRegistry, Value};

#[derive(Copy, Clone)]
enum Num {
    Int(i128),
    Float(f64),
}

impl Num {
    fn of(value: &Value) -> Option<Num> {
        Some(match value {
            Value::I8(n) => Num::Int(i128::from(*n)),
            Value::U8(n) => Num::Int(i128::from(*n)),
            Value::I16(n) => Num::Int(i128::from(*n)),
            Value::U16(n) => Num::Int(i128::from(*n)),
            Value::I32(n) => Num::Int(i128::from(*n)),
            Value::U32(n) => Num::Int(i128::from(*n)),
            Value::I64(n) => Num::Int(i128::from(*n)),
            Value::U64(n) => Num::Int(i128::from(*n)),
            Value::Char(c) => Num::Int(i128::from(u32::from(*c))),
            Value::F32(f) => Num::Float(f64::from(*f)),
            Value::F64(f) => Num::Float(*f),
            _ => return None,
        })
    }
}

/// Truncate a float toward zero, `None` if it is not finite or is outside
/// every integer type.
fn truncate(f: f64) -> Option<i128> {
    let t = f.trunc();
    if !(t.is_finite() && t.abs() < 1e38) {
        return None;
    }
    #[expect(clippy::cast_possible_truncation, reason = "range checked above")]
    let i = t as i128;
    Some(i)
}

/// Convert `value` to the static type `target`.
pub fn convert(
    value: Value,
    target: ExprType,
    checked: bool,
    registry: &TypeRegistry,
    interner: &StringInterner,
) -> EvalResult {
    if value.primitive_type() == Some(target) {
        return Ok(value);
    }
    match target {
        ExprType::Void => Ok(Value::Null),
        ExprType::Object => Ok(value),
        t if t.is_numeric() || t == ExprType::Char => {
            let num = match Num::of(&value) {
                Some(num) => num,
                None if value.is_null() => return Err(null_reference()),
                None => {
                    return Err(invalid_cast(
                        value.type_name(),
                        t.primitive_name().unwrap_or("Object"),
                    ))
                }
            };
            convert_number(num, t, checked)
        }
        ExprType::Bool => Err(invalid_cast(value.type_name(), "Boolean")),
        _ => {
            if value.is_null() || registry.is_instance(&value, target, interner) {
                Ok(value)
            } else {
                Err(invalid_cast(
                    value.type_name(),
                    &type_display(target, interner),
                ))
            }
        }
    }
}

#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_possible_wrap,
    clippy::cast_precision_loss,
    reason = "unchecked conversions truncate like the host conv instruction"
)]
fn convert_number(num: Num, target: ExprType, checked: bool) -> EvalResult {
    let op = if checked {
        UnaryOp::ConvertChecked.name()
    } else {
        UnaryOp::Convert.name()
    };
    macro_rules! to_int {
        ($ty:ty, $variant:ident) => {
            match num {
                Num::Int(i) if checked => <$ty>::try_from(i)
                    .map(Value::$variant)
                    .map_err(|_| overflow(op)),
                Num::Int(i) => Ok(Value::$variant(i as $ty)),
                Num::Float(f) if checked => truncate(f)
                    .and_then(|i| <$ty>::try_from(i).ok())
                    .map(Value::$variant)
                    .ok_or_else(|| overflow(op)),
                Num::Float(f) => Ok(Value::$variant(f as $ty)),
            }
        };
    }
    match target {
        ExprType::I8 => to_int!(i8, I8),
        ExprType::U8 => to_int!(u8, U8),
        ExprType::I16 => to_int!(i16, I16),
        ExprType::U16 => to_int!(u16, U16),
        ExprType::I32 => to_int!(i32, I32),
        ExprType::U32 => to_int!(u32, U32),
        ExprType::I64 => to_int!(i64, I64),
        ExprType::U64 => to_int!(u64, U64),
        ExprType::F32 => Ok(Value::F32(match num {
            Num::Int(i) => i as f32,
            Num::Float(f) => f as f32,
        })),
        ExprType::F64 => Ok(Value::F64(match num {
            Num::Int(i) => i as f64,
            Num::Float(f) => f,
        })),
        ExprType::Char => {
            let code = match num {
                Num::Int(i) if checked => u16::try_from(i).map_err(|_| overflow(op))?,
                Num::Int(i) => i as u16,
                Num::Float(f) => truncate(f)
                    .and_then(|i| u16::try_from(i).ok())
                    .ok_or_else(|| overflow(op))?,
            };
            char::from_u32(u32::from(code))
                .map(Value::Char)
                .ok_or_else(|| overflow(op))
        }
        other => Err(invalid_cast(
            "number",
            other.primitive_name().unwrap_or("Object"),
        )),
    }
}

/// `value as T`: the value if it is an instance of `target`, else `Null`.
pub fn type_as(
    value: Value,
    target: ExprType,
    registry: &TypeRegistry,
    interner: &StringInterner,
) -> Value {
    if registry.is_instance(&value, target, interner) {
        value
    } else {
        Value::Null
    }
}

/// Unbox a boxed primitive of exactly `target`.
pub fn unbox(value: Value, target: ExprType, interner: &StringInterner) -> EvalResult {
    if value.is_null() {
        return Err(null_reference());
    }
    if value.primitive_type() == Some(target) {
        Ok(value)
    } else {
        Err(invalid_cast(value.type_name(), &type_display(target, interner)))
    }
}

pub(crate) fn type_display(ty: ExprType, interner: &StringInterner) -> String {
    match ty {
        ExprType::Named(name) => interner.lookup(name).to_string(),
        other => other.primitive_name().unwrap_or("Object").to_string(),
    }
}
