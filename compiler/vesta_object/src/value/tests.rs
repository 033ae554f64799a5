use super::*;
use pretty_assertions::assert_eq;
use vesta_ir::StringInterner;

#[test]
fn equality_requires_same_runtime_type() {
    assert!(Value::I32(1).equals(&Value::I32(1)));
    assert!(!Value::I32(1).equals(&Value::I64(1)));
    assert!(!Value::I32(1).equals(&Value::Null));
    assert!(Value::Null.equals(&Value::Null));
}

#[test]
fn boxed_nan_equals_itself() {
    assert!(Value::F64(f64::NAN).equals(&Value::F64(f64::NAN)));
    assert!(!Value::F64(f64::NAN).equals(&Value::F32(f32::NAN)));
}

#[test]
fn strings_compare_by_content() {
    assert_eq!(Value::string("a"), Value::string("a"));
    assert_eq!(
        Value::string("a").compare(&Value::string("b")),
        Some(Ordering::Less)
    );
}

#[test]
fn arrays_compare_by_identity() {
    let a = Value::array(ExprType::I32, vec![Value::I32(1)]);
    let b = Value::array(ExprType::I32, vec![Value::I32(1)]);
    assert!(a.equals(&a.clone()));
    assert!(!a.equals(&b));
}

#[test]
fn mixed_types_are_incomparable() {
    assert_eq!(Value::I32(1).compare(&Value::I64(2)), None);
    assert_eq!(Value::I32(1).compare(&Value::I32(2)), Some(Ordering::Less));
}

#[test]
fn defaults_per_type() {
    assert_eq!(Value::default_for(ExprType::I64), Value::I64(0));
    assert_eq!(Value::default_for(ExprType::Bool), Value::Bool(false));
    assert_eq!(Value::default_for(ExprType::Str), Value::Null);
}

#[test]
fn literal_strings_resolve_through_interner() {
    let interner = StringInterner::new();
    let name = interner.intern("hello");
    assert_eq!(
        Value::from_literal(Literal::Str(name), &interner),
        Value::string("hello")
    );
    assert_eq!(
        Value::from_literal(Literal::U16(7), &interner),
        Value::U16(7)
    );
}

#[test]
fn type_names_follow_host_spelling() {
    assert_eq!(Value::I32(0).type_name(), "Int32");
    assert_eq!(Value::U8(0).type_name(), "Byte");
    assert_eq!(Value::F32(0.0).type_name(), "Single");
    assert_eq!(Value::string("").type_name(), "String");
}

#[test]
fn array_bounds_are_checked() {
    let arr = ArrayValue::new(ExprType::I32, vec![Value::I32(1), Value::I32(2)]);
    assert_eq!(arr.get(1).ok(), Some(Value::I32(2)));
    assert!(arr.get(2).is_err());
    assert!(arr.get(-1).is_err());
    assert!(arr.set(0, Value::I32(9)).is_ok());
    assert_eq!(arr.to_vec(), vec![Value::I32(9), Value::I32(2)]);
}

#[test]
fn display_matches_host_formatting() {
    assert_eq!(Value::Bool(true).to_string(), "True");
    assert_eq!(Value::I32(-3).to_string(), "-3");
    assert_eq!(Value::string("x").to_string(), "x");
}
