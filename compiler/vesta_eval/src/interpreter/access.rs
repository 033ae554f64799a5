//! Member and indexer access, assignment and runtime variables.
//!
//! Instance members resolve in this order: a declared field of the
//! object, a property getter (`get_<name>`) found by virtual dispatch on
//! the runtime type, a static field reachable through the instance. Native
//! objects answer member access through `invoke_method` with the accessor
//! name.

use std::sync::Arc;

use smallvec::SmallVec;
use vesta_ir::{ExprId, ExprKind, ExprRange, MemberPath};
use vesta_object::errors::{
    internal_error, invalid_operation, missing_member, null_reference, unsupported_operation,
};
use vesta_object::{EvalError, EvalResult, FieldDef, TypeRef, Value};

use super::{ready, Interpreter};
use crate::flow::{eval_child, skip_while_resuming, Flow, FlowResult};
use crate::operators::{array_index, index_value};
use crate::runtime_vars::RuntimeVariables;

impl Interpreter {
    pub(super) fn eval_member(&mut self, object: Option<ExprId>, member: MemberPath) -> FlowResult {
        let name = self.script.interner().lookup(member.member);
        let Some(object) = object else {
            skip_while_resuming!(self);
            let owner = self.static_owner(member)?;
            return Ok(Flow::Value(self.read_static(&owner, name)?));
        };
        let target = eval_child!(self, object);
        skip_while_resuming!(self);
        Ok(Flow::Value(self.read_member(&target.into_value(), name)?))
    }

    fn static_owner(&self, member: MemberPath) -> Result<TypeRef, EvalError> {
        let owner = self.script.interner().lookup(member.owner);
        self.script.registry().require(owner)
    }

    pub(super) fn read_member(&self, target: &Value, name: &str) -> EvalResult {
        match target {
            Value::Null => return Err(null_reference()),
            Value::Native(native) => {
                let native = Arc::clone(native);
                let getter = format!("get_{name}");
                return self.invoke_native(native.type_name(), &getter, || {
                    native.invoke_method(&getter, &mut [])
                });
            }
            Value::Object(object) => {
                if let Some(value) = object.get_field(name) {
                    return Ok(value);
                }
            }
            _ => {}
        }
        let ty = self
            .script
            .registry()
            .type_of(target)
            .ok_or_else(|| missing_member(target.type_name(), name))?;
        if let Some(getter) = ty.resolve_virtual(&format!("get_{name}"), 0) {
            return self.invoke_host(&getter, target, &mut []);
        }
        ty.get_static(name)
            .ok_or_else(|| missing_member(ty.name(), name))
    }

    pub(super) fn read_static(&self, owner: &TypeRef, name: &str) -> EvalResult {
        if let Some(value) = owner.get_static(name) {
            return Ok(value);
        }
        match owner
            .find_method(&format!("get_{name}"), 0)
            .filter(|m| m.is_static())
        {
            Some(getter) => self.invoke_host(&getter, &Value::Null, &mut []),
            None => Err(missing_member(owner.name(), name)),
        }
    }

    pub(super) fn store_member(
        &self,
        target: &Value,
        name: &str,
        value: Value,
    ) -> Result<(), EvalError> {
        match target {
            Value::Null => return Err(null_reference()),
            Value::Native(native) => {
                let native = Arc::clone(native);
                let setter = format!("set_{name}");
                return self
                    .invoke_native(native.type_name(), &setter, || {
                        native.invoke_method(&setter, &mut [value])
                    })
                    .map(drop);
            }
            Value::Object(object) if object.get_field(name).is_some() => {
                return object.set_field(name, value);
            }
            _ => {}
        }
        let ty = self
            .script
            .registry()
            .type_of(target)
            .ok_or_else(|| missing_member(target.type_name(), name))?;
        match ty.resolve_virtual(&format!("set_{name}"), 1) {
            Some(setter) => self.invoke_host(&setter, target, &mut [value]).map(drop),
            None => self.store_static(&ty, name, value),
        }
    }

    pub(super) fn store_static(
        &self,
        owner: &TypeRef,
        name: &str,
        value: Value,
    ) -> Result<(), EvalError> {
        if owner.find_field(name).is_some_and(FieldDef::is_static) {
            return if owner.set_static(name, value) {
                Ok(())
            } else {
                Err(invalid_operation(format!(
                    "field {}.{name} is read-only",
                    owner.name()
                )))
            };
        }
        match owner
            .find_method(&format!("set_{name}"), 1)
            .filter(|m| m.is_static())
        {
            Some(setter) => self
                .invoke_host(&setter, &Value::Null, &mut [value])
                .map(drop),
            None => Err(missing_member(owner.name(), name)),
        }
    }

    pub(super) fn read_index(&self, target: &Value, indices: &mut [Value]) -> EvalResult {
        match target {
            Value::Null => Err(null_reference()),
            Value::Array(_) => match indices {
                [index] => array_index(target, index),
                _ => Err(unsupported_operation("multi-dimensional array", "Array")),
            },
            Value::Native(native) => {
                let native = Arc::clone(native);
                self.invoke_native(native.type_name(), "get_Item", || {
                    native.invoke_method("get_Item", indices)
                })
            }
            _ => {
                let ty = self
                    .script
                    .registry()
                    .type_of(target)
                    .ok_or_else(|| missing_member(target.type_name(), "Item"))?;
                let getter = ty
                    .resolve_virtual("get_Item", indices.len())
                    .ok_or_else(|| missing_member(ty.name(), "Item"))?;
                self.invoke_host(&getter, target, indices)
            }
        }
    }

    pub(super) fn store_index(
        &self,
        target: &Value,
        indices: &[Value],
        value: Value,
    ) -> Result<(), EvalError> {
        let mut args: SmallVec<[Value; 4]> = indices.iter().cloned().collect();
        match target {
            Value::Null => Err(null_reference()),
            Value::Array(array) => match indices {
                [index] => array.set(index_value(index)?, value),
                _ => Err(unsupported_operation("multi-dimensional array", "Array")),
            },
            Value::Native(native) => {
                let native = Arc::clone(native);
                args.push(value);
                self.invoke_native(native.type_name(), "set_Item", || {
                    native.invoke_method("set_Item", &mut args)
                })
                .map(drop)
            }
            _ => {
                let ty = self
                    .script
                    .registry()
                    .type_of(target)
                    .ok_or_else(|| missing_member(target.type_name(), "Item"))?;
                let setter = ty
                    .resolve_virtual("set_Item", indices.len() + 1)
                    .ok_or_else(|| missing_member(ty.name(), "Item"))?;
                args.push(value);
                self.invoke_host(&setter, target, &mut args).map(drop)
            }
        }
    }

    pub(super) fn eval_index(&mut self, id: ExprId, object: ExprId, args: ExprRange) -> FlowResult {
        let arena = self.arena.clone();
        let mut ids: SmallVec<[ExprId; 4]> = SmallVec::new();
        ids.push(object);
        ids.extend_from_slice(arena.exprs(args));
        let mut operands = ready!(self.eval_operands(id, &ids, &[])?);
        let Some((target, indices)) = operands.values.split_first_mut() else {
            return Err(internal_error("index node without a target"));
        };
        let target = target.clone();
        Ok(Flow::Value(self.read_index(&target, indices)?))
    }

    /// Assignment evaluates the target's sub-expressions first, then the
    /// value, and produces the assigned value.
    pub(super) fn eval_assign(&mut self, id: ExprId, target: ExprId, value: ExprId) -> FlowResult {
        let arena = self.arena.clone();
        match arena.kind(target) {
            ExprKind::Parameter { name } => {
                let value = eval_child!(self, value);
                skip_while_resuming!(self);
                let value = value.into_value();
                if !self.state.scope.assign(target, value.clone()) {
                    return Err(internal_error(format!(
                        "unbound variable '{}'",
                        self.script.interner().lookup(name)
                    )));
                }
                Ok(Flow::Value(value))
            }
            ExprKind::Member {
                object: Some(object),
                member,
            } => {
                let operands = ready!(self.eval_operands(id, &[object, value], &[])?);
                let (object, value) = operands.pair();
                let name = self.script.interner().lookup(member.member);
                self.store_member(&object, name, value.clone())?;
                Ok(Flow::Value(value))
            }
            ExprKind::Member {
                object: None,
                member,
            } => {
                let value = eval_child!(self, value);
                skip_while_resuming!(self);
                let value = value.into_value();
                let owner = self.static_owner(member)?;
                let name = self.script.interner().lookup(member.member);
                self.store_static(&owner, name, value.clone())?;
                Ok(Flow::Value(value))
            }
            ExprKind::Index { object, args } => {
                let mut ids: SmallVec<[ExprId; 4]> = SmallVec::new();
                ids.push(object);
                ids.extend_from_slice(arena.exprs(args));
                ids.push(value);
                let operands = ready!(self.eval_operands(id, &ids, &[])?);
                let values = operands.into_values();
                let [target, indices @ .., value] = values.as_slice() else {
                    return Err(internal_error("index assignment without a target"));
                };
                self.store_index(target, indices, value.clone())?;
                Ok(Flow::Value(value.clone()))
            }
            other => Err(internal_error(format!(
                "cannot assign to a {} node",
                other.name()
            ))),
        }
    }

    pub(super) fn eval_runtime_variables(&mut self, variables: ExprRange) -> FlowResult {
        skip_while_resuming!(self);
        let variables = self.arena.exprs(variables).to_vec();
        Ok(Flow::Value(Value::native(RuntimeVariables::new(
            self.state.scope.clone(),
            variables,
        ))))
    }
}
