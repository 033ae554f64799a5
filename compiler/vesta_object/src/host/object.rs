//! Instances of host types.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use super::ty::TypeRef;
use crate::errors::{missing_member, EvalError};
use crate::value::Value;

struct HostObject {
    ty: TypeRef,
    fields: Mutex<FxHashMap<String, Value>>,
}

/// Shared handle to an instance of a host type. Equality is identity.
#[derive(Clone)]
pub struct ObjectRef(Arc<HostObject>);

impl ObjectRef {
    pub(super) fn new(ty: TypeRef, fields: FxHashMap<String, Value>) -> Self {
        ObjectRef(Arc::new(HostObject {
            ty,
            fields: Mutex::new(fields),
        }))
    }

    /// Runtime type of the instance.
    pub fn ty(&self) -> &TypeRef {
        &self.0.ty
    }

    pub fn get_field(&self, name: &str) -> Option<Value> {
        self.0.fields.lock().get(name).cloned()
    }

    /// Assign a declared instance field.
    pub fn set_field(&self, name: &str, value: Value) -> Result<(), EvalError> {
        let mut fields = self.0.fields.lock();
        match fields.get_mut(name) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(missing_member(self.0.ty.name(), name)),
        }
    }

    pub fn ptr_eq(&self, other: &ObjectRef) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    pub(crate) fn addr(&self) -> usize {
        Arc::as_ptr(&self.0) as usize
    }
}

impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{:x}", self.0.ty.name(), self.addr())
    }
}
