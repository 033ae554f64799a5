//! Live access to a scope's variables.

use std::any::Any;
use std::fmt;

use vesta_ir::ExprId;
use vesta_object::errors::{index_out_of_range, internal_error, missing_member};
use vesta_object::{EvalError, EvalResult, NativeObject, Value};

use crate::operators::index_value;
use crate::state::Scope;

/// The value of a `RuntimeVariables` node: reads and writes go straight to
/// the scope the node was evaluated in.
pub struct RuntimeVariables {
    scope: Scope,
    variables: Vec<ExprId>,
}

impl RuntimeVariables {
    pub(crate) fn new(scope: Scope, variables: Vec<ExprId>) -> Self {
        RuntimeVariables { scope, variables }
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    fn variable(&self, index: &Value) -> Result<ExprId, EvalError> {
        let index = index_value(index)?;
        usize::try_from(index)
            .ok()
            .and_then(|i| self.variables.get(i).copied())
            .ok_or_else(|| index_out_of_range(index, self.variables.len()))
    }

    pub fn get(&self, index: &Value) -> EvalResult {
        let var = self.variable(index)?;
        self.scope
            .lookup(var)
            .ok_or_else(|| internal_error("runtime variable is not in scope"))
    }

    pub fn set(&self, index: &Value, value: Value) -> Result<(), EvalError> {
        let var = self.variable(index)?;
        if self.scope.assign(var, value) {
            Ok(())
        } else {
            Err(internal_error("runtime variable is not in scope"))
        }
    }
}

impl NativeObject for RuntimeVariables {
    fn type_name(&self) -> &str {
        "RuntimeVariables"
    }

    fn invoke_method(&self, name: &str, args: &mut [Value]) -> EvalResult {
        match (name, &*args) {
            ("get_Count", []) => Ok(Value::I32(
                i32::try_from(self.variables.len()).unwrap_or(i32::MAX),
            )),
            ("get_Item", [index]) => self.get(index),
            ("set_Item", [index, value]) => {
                self.set(index, value.clone())?;
                Ok(Value::Null)
            }
            _ => Err(missing_member(self.type_name(), name)),
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl fmt::Debug for RuntimeVariables {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuntimeVariables")
            .field("variables", &self.variables)
            .finish()
    }
}
