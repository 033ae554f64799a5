//! Runtime values.
//!
//! # Arc Enforcement Architecture
//!
//! Heap payloads are wrapped in [`Heap<T>`], whose constructor is private to
//! this module, so strings and arrays are only created through the factory
//! methods on `Value` (`Value::string`, `Value::array`).
//!
//! # Thread Safety
//!
//! Every heap variant is reference counted with `Arc` and mutable payloads
//! sit behind `parking_lot` locks, so a `Value` is `Send + Sync` and can be
//! cached by call sites and emitted types shared across threads.

mod array;
mod heap;

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use rustc_hash::FxHasher;
use vesta_ir::{ExprId, ExprType, Literal, SharedArena, StringInterner};

use crate::callable::{Callable, NativeObject, StrongBox};
use crate::host::ObjectRef;

pub use array::ArrayValue;
pub use heap::Heap;

/// Shared handle to a function value.
pub type FunctionRef = Arc<dyn Callable>;

/// Shared handle to a native runtime object (generators, runtime variables).
pub type NativeRef = Arc<dyn NativeObject>;

/// An expression tree captured as a value by a quote node.
#[derive(Clone, Debug)]
pub struct QuotedExpr {
    pub arena: SharedArena,
    pub expr: ExprId,
}

/// Runtime value.
#[derive(Clone)]
pub enum Value {
    Null,
    Bool(bool),
    I8(i8),
    U8(u8),
    I16(i16),
    U16(u16),
    I32(i32),
    U32(u32),
    I64(i64),
    U64(u64),
    F32(f32),
    F64(f64),
    Char(char),
    Str(Heap<String>),
    Array(Heap<ArrayValue>),
    Object(ObjectRef),
    Function(FunctionRef),
    Native(NativeRef),
    Quoted(QuotedExpr),
    /// Addressable cell used to pass arguments by reference.
    Box(StrongBox),
}

impl Value {
    // Factories

    pub fn string(s: impl Into<String>) -> Self {
        Value::Str(Heap::new(s.into()))
    }

    pub fn array(element: ExprType, items: Vec<Value>) -> Self {
        Value::Array(Heap::new(ArrayValue::new(element, items)))
    }

    pub fn function(f: impl Callable + 'static) -> Self {
        Value::Function(Arc::new(f))
    }

    pub fn native(obj: impl NativeObject + 'static) -> Self {
        Value::Native(Arc::new(obj))
    }

    /// Materialize a tree constant.
    pub fn from_literal(literal: Literal, interner: &StringInterner) -> Self {
        match literal {
            Literal::Null => Value::Null,
            Literal::Bool(b) => Value::Bool(b),
            Literal::I8(v) => Value::I8(v),
            Literal::U8(v) => Value::U8(v),
            Literal::I16(v) => Value::I16(v),
            Literal::U16(v) => Value::U16(v),
            Literal::I32(v) => Value::I32(v),
            Literal::U32(v) => Value::U32(v),
            Literal::I64(v) => Value::I64(v),
            Literal::U64(v) => Value::U64(v),
            Literal::F32(v) => Value::F32(v),
            Literal::F64(v) => Value::F64(v),
            Literal::Char(c) => Value::Char(c),
            Literal::Str(name) => Value::string(interner.lookup(name)),
        }
    }

    /// Default value of a static type: zero for numbers, `false` for bool,
    /// `Null` for everything else.
    pub fn default_for(ty: ExprType) -> Self {
        match ty {
            ExprType::Bool => Value::Bool(false),
            ExprType::I8 => Value::I8(0),
            ExprType::U8 => Value::U8(0),
            ExprType::I16 => Value::I16(0),
            ExprType::U16 => Value::U16(0),
            ExprType::I32 => Value::I32(0),
            ExprType::U32 => Value::U32(0),
            ExprType::I64 => Value::I64(0),
            ExprType::U64 => Value::U64(0),
            ExprType::F32 => Value::F32(0.0),
            ExprType::F64 => Value::F64(0.0),
            ExprType::Char => Value::Char('\0'),
            ExprType::Void
            | ExprType::Object
            | ExprType::Str
            | ExprType::Array
            | ExprType::Named(_) => Value::Null,
        }
    }

    // Inspection

    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Value::I32(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Value::Object(o) => Some(o),
            _ => None,
        }
    }

    /// Static type of a primitive value; `None` for reference values.
    pub fn primitive_type(&self) -> Option<ExprType> {
        Some(match self {
            Value::Bool(_) => ExprType::Bool,
            Value::I8(_) => ExprType::I8,
            Value::U8(_) => ExprType::U8,
            Value::I16(_) => ExprType::I16,
            Value::U16(_) => ExprType::U16,
            Value::I32(_) => ExprType::I32,
            Value::U32(_) => ExprType::U32,
            Value::I64(_) => ExprType::I64,
            Value::U64(_) => ExprType::U64,
            Value::F32(_) => ExprType::F32,
            Value::F64(_) => ExprType::F64,
            Value::Char(_) => ExprType::Char,
            Value::Str(_) => ExprType::Str,
            Value::Array(_) => ExprType::Array,
            Value::Null
            | Value::Object(_)
            | Value::Function(_)
            | Value::Native(_)
            | Value::Quoted(_)
            | Value::Box(_) => return None,
        })
    }

    /// Runtime type name, as the host runtime spells it.
    pub fn type_name(&self) -> &str {
        match self {
            Value::Null => "Null",
            Value::Object(o) => o.ty().name(),
            Value::Function(_) => "Function",
            Value::Native(n) => n.type_name(),
            Value::Quoted(_) => "Expression",
            Value::Box(_) => "StrongBox",
            other => other
                .primitive_type()
                .and_then(ExprType::primitive_name)
                .unwrap_or("Object"),
        }
    }

    /// Host equality: same runtime type and equal value, reference identity
    /// for objects, arrays and functions. Boxed NaN equals boxed NaN.
    pub fn equals(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::I8(a), Value::I8(b)) => a == b,
            (Value::U8(a), Value::U8(b)) => a == b,
            (Value::I16(a), Value::I16(b)) => a == b,
            (Value::U16(a), Value::U16(b)) => a == b,
            (Value::I32(a), Value::I32(b)) => a == b,
            (Value::U32(a), Value::U32(b)) => a == b,
            (Value::I64(a), Value::I64(b)) => a == b,
            (Value::U64(a), Value::U64(b)) => a == b,
            (Value::F32(a), Value::F32(b)) => a == b || (a.is_nan() && b.is_nan()),
            (Value::F64(a), Value::F64(b)) => a == b || (a.is_nan() && b.is_nan()),
            (Value::Char(a), Value::Char(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a.as_str() == b.as_str(),
            (Value::Array(a), Value::Array(b)) => Heap::ptr_eq(a, b),
            (Value::Object(a), Value::Object(b)) => a.ptr_eq(b),
            (Value::Function(a), Value::Function(b)) => {
                std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
            }
            (Value::Native(a), Value::Native(b)) => std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b)),
            (Value::Quoted(a), Value::Quoted(b)) => a.arena == b.arena && a.expr == b.expr,
            (Value::Box(a), Value::Box(b)) => a.ptr_eq(b),
            _ => false,
        }
    }

    /// Host comparable contract: values of the same primitive type compare,
    /// anything else is incomparable.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
            (Value::I8(a), Value::I8(b)) => Some(a.cmp(b)),
            (Value::U8(a), Value::U8(b)) => Some(a.cmp(b)),
            (Value::I16(a), Value::I16(b)) => Some(a.cmp(b)),
            (Value::U16(a), Value::U16(b)) => Some(a.cmp(b)),
            (Value::I32(a), Value::I32(b)) => Some(a.cmp(b)),
            (Value::U32(a), Value::U32(b)) => Some(a.cmp(b)),
            (Value::I64(a), Value::I64(b)) => Some(a.cmp(b)),
            (Value::U64(a), Value::U64(b)) => Some(a.cmp(b)),
            (Value::F32(a), Value::F32(b)) => Some(a.total_cmp(b)),
            (Value::F64(a), Value::F64(b)) => Some(a.total_cmp(b)),
            (Value::Char(a), Value::Char(b)) => Some(a.cmp(b)),
            (Value::Str(a), Value::Str(b)) => Some(a.as_str().cmp(b.as_str())),
            _ => None,
        }
    }

    /// Host hash code, consistent with [`Value::equals`].
    #[expect(
        clippy::cast_possible_truncation,
        reason = "hash codes are 32-bit in the host runtime"
    )]
    pub fn hash_code(&self) -> i32 {
        let mut hasher = FxHasher::default();
        match self {
            Value::Object(o) => o.addr().hash(&mut hasher),
            Value::Array(a) => Heap::addr(a).hash(&mut hasher),
            Value::F32(v) => v.to_bits().hash(&mut hasher),
            Value::F64(v) => v.to_bits().hash(&mut hasher),
            other => other.to_string().hash(&mut hasher),
        }
        hasher.finish() as i32
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.equals(other)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(true) => write!(f, "True"),
            Value::Bool(false) => write!(f, "False"),
            Value::I8(v) => write!(f, "{v}"),
            Value::U8(v) => write!(f, "{v}"),
            Value::I16(v) => write!(f, "{v}"),
            Value::U16(v) => write!(f, "{v}"),
            Value::I32(v) => write!(f, "{v}"),
            Value::U32(v) => write!(f, "{v}"),
            Value::I64(v) => write!(f, "{v}"),
            Value::U64(v) => write!(f, "{v}"),
            Value::F32(v) => write!(f, "{v}"),
            Value::F64(v) => write!(f, "{v}"),
            Value::Char(c) => write!(f, "{c}"),
            Value::Str(s) => write!(f, "{}", s.as_str()),
            Value::Array(a) => write!(
                f,
                "{}[]",
                a.element().primitive_name().unwrap_or("Object")
            ),
            Value::Object(o) => write!(f, "{}", o.ty().name()),
            Value::Function(func) => write!(f, "Function({})", func.name()),
            Value::Native(n) => write!(f, "{}", n.type_name()),
            Value::Quoted(q) => write!(f, "Quote({:?})", q.expr),
            Value::Box(b) => write!(f, "StrongBox({})", b.get()),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Str(s) => write!(f, "Str({:?})", s.as_str()),
            Value::Null => write!(f, "Null"),
            other => write!(f, "{}({other})", other.type_name()),
        }
    }
}

#[cfg(test)]
mod tests;
