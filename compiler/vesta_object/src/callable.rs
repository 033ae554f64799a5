//! Seams between values and the components that give them behavior.
//!
//! Function values and native runtime objects are defined by the crates
//! that create them (the interpreter's closures and generators, a guest
//! runtime's delegates); the object model only sees these traits.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::errors::{missing_member, EvalResult};
use crate::value::Value;

/// A value that can be invoked with arguments.
///
/// Arguments are passed as a mutable slice: a callee writes back through
/// by-reference parameter slots.
pub trait Callable: Send + Sync {
    fn name(&self) -> &str;

    /// Declared parameter count.
    fn arity(&self) -> usize;

    fn call(&self, args: &mut [Value]) -> EvalResult;
}

/// A runtime object with methods implemented natively.
pub trait NativeObject: Send + Sync {
    fn type_name(&self) -> &str;

    fn invoke_method(&self, name: &str, args: &mut [Value]) -> EvalResult {
        let _ = args;
        Err(missing_member(self.type_name(), name))
    }

    fn as_any(&self) -> &dyn Any;
}

/// An addressable mutable cell.
///
/// Marshals by-reference arguments across a call boundary: the caller boxes
/// the current value, the callee writes through the box, the caller copies
/// the final value back into the original storage location.
#[derive(Clone)]
pub struct StrongBox(Arc<Mutex<Value>>);

impl StrongBox {
    pub fn new(value: Value) -> Self {
        StrongBox(Arc::new(Mutex::new(value)))
    }

    pub fn get(&self) -> Value {
        self.0.lock().clone()
    }

    pub fn set(&self, value: Value) {
        *self.0.lock() = value;
    }

    pub fn ptr_eq(&self, other: &StrongBox) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for StrongBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StrongBox({:?})", self.get())
    }
}
