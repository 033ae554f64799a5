//! Name-to-type registry.
//!
//! One registry is created per runtime and handed explicitly to the
//! interpreter and the type emitter; there is no process-global instance.

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use vesta_ir::{ExprType, StringInterner};

use super::builtins;
use super::ty::TypeRef;
use crate::errors::{unknown_type, EvalError, MESSAGE_FIELD};
use crate::value::Value;

/// Registry of host types by name.
#[derive(Default)]
pub struct TypeRegistry {
    types: RwLock<FxHashMap<String, TypeRef>>,
}

impl TypeRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding `Object`, the primitive types, `String`, `Array`,
    /// `Function` and the exception hierarchy.
    pub fn with_builtins() -> Self {
        let registry = Self::new();
        builtins::install(&registry);
        registry
    }

    /// Register a type under its name, replacing any previous entry.
    pub fn register(&self, ty: TypeRef) {
        self.types.write().insert(ty.name().to_string(), ty);
    }

    pub fn get(&self, name: &str) -> Option<TypeRef> {
        self.types.read().get(name).cloned()
    }

    pub fn require(&self, name: &str) -> Result<TypeRef, EvalError> {
        self.get(name).ok_or_else(|| unknown_type(name))
    }

    pub fn len(&self) -> usize {
        self.types.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.read().is_empty()
    }

    /// Runtime type of a value. `Null` and native objects have none.
    pub fn type_of(&self, value: &Value) -> Option<TypeRef> {
        match value {
            Value::Object(o) => Some(o.ty().clone()),
            Value::Null | Value::Native(_) | Value::Quoted(_) | Value::Box(_) => None,
            Value::Function(_) => self.get("Function"),
            other => self.get(other.type_name()),
        }
    }

    /// Resolve a static type to a host type.
    pub fn resolve(&self, ty: ExprType, interner: &StringInterner) -> Option<TypeRef> {
        match ty {
            ExprType::Named(name) => self.get(interner.lookup(name)),
            other => other.primitive_name().and_then(|name| self.get(name)),
        }
    }

    /// Instance test: `value` is non-null and its runtime type is `ty` or a
    /// subtype of it.
    pub fn is_instance(&self, value: &Value, ty: ExprType, interner: &StringInterner) -> bool {
        if value.is_null() {
            return false;
        }
        match ty {
            ExprType::Void => false,
            ExprType::Object => true,
            ExprType::Named(_) => match (self.type_of(value), self.resolve(ty, interner)) {
                (Some(actual), Some(target)) => actual.is_subclass_of(&target),
                _ => false,
            },
            primitive => value.primitive_type() == Some(primitive),
        }
    }

    /// Exact runtime type test.
    pub fn is_exact(&self, value: &Value, ty: ExprType, interner: &StringInterner) -> bool {
        match ty {
            ExprType::Named(_) | ExprType::Object => {
                match (self.type_of(value), self.resolve(ty, interner)) {
                    (Some(actual), Some(target)) => actual.id() == target.id(),
                    _ => false,
                }
            }
            ExprType::Void => false,
            primitive => value.primitive_type() == Some(primitive),
        }
    }

    /// Whether a catch handler for `test` observes `err`.
    pub fn exception_matches(&self, err: &EvalError, test: &TypeRef) -> bool {
        if let Some(actual) = err.exception.as_ref().and_then(|e| self.type_of(e)) {
            return actual.is_subclass_of(test);
        }
        match self.get(err.exception_type_name()) {
            Some(actual) => actual.is_subclass_of(test),
            None => matches!(test.name(), "Exception" | "Object"),
        }
    }

    /// The exception object a handler binds for `err`.
    ///
    /// Guest-thrown errors carry their object; interpreter-raised errors get
    /// a fresh instance of their exception type holding the error message.
    pub fn exception_object(&self, err: &EvalError) -> Value {
        if let Some(exception) = &err.exception {
            return exception.clone();
        }
        let ty = self
            .get(err.exception_type_name())
            .or_else(|| self.get("Exception"));
        match ty {
            Some(ty) => {
                let obj = ty.allocate();
                if obj
                    .set_field(MESSAGE_FIELD, Value::string(err.message.clone()))
                    .is_err()
                {
                    tracing::trace!(ty = ty.name(), "exception type has no message field");
                }
                Value::Object(obj)
            }
            None => Value::string(err.message.clone()),
        }
    }
}

impl std::fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypeRegistry")
            .field("types", &self.len())
            .finish()
    }
}
