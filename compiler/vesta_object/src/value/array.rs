//! One-dimensional host arrays.

use parking_lot::Mutex;
use vesta_ir::ExprType;

use super::Value;
use crate::errors::{index_out_of_range, EvalError};

/// A fixed-length, element-typed, mutable array.
#[derive(Debug)]
pub struct ArrayValue {
    element: ExprType,
    items: Mutex<Vec<Value>>,
}

impl ArrayValue {
    pub(super) fn new(element: ExprType, items: Vec<Value>) -> Self {
        ArrayValue {
            element,
            items: Mutex::new(items),
        }
    }

    pub fn element(&self) -> ExprType {
        self.element
    }

    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }

    pub fn get(&self, index: i64) -> Result<Value, EvalError> {
        let items = self.items.lock();
        usize::try_from(index)
            .ok()
            .and_then(|i| items.get(i).cloned())
            .ok_or_else(|| index_out_of_range(index, items.len()))
    }

    pub fn set(&self, index: i64, value: Value) -> Result<(), EvalError> {
        let mut items = self.items.lock();
        let len = items.len();
        let slot = usize::try_from(index)
            .ok()
            .and_then(|i| items.get_mut(i))
            .ok_or_else(|| index_out_of_range(index, len))?;
        *slot = value;
        Ok(())
    }

    /// Copy of the current elements.
    pub fn to_vec(&self) -> Vec<Value> {
        self.items.lock().clone()
    }
}
