//! Method calls, function invocation and object and array creation.
//!
//! Host methods are invoked reflectively: the callee reports failures as
//! errors, possibly wrapped in `TargetInvocation`. The wrapper is stripped
//! and the inner error goes through the language context, which attaches
//! guest stack metadata. By-reference arguments are written back to their
//! storage locations after the call, whether or not it succeeded.

use std::sync::Arc;
use std::time::Instant;

use smallvec::SmallVec;
use vesta_ir::{ExprId, ExprRange, ExprType, MemberPath, Name};
use vesta_object::errors::{
    missing_member, not_callable, null_reference, overflow, unknown_type, unsupported_operation,
};
use vesta_object::{EvalResult, MethodRef, TypeRef, Value};

use super::{ready, typed_result, Address, Interpreter};
use crate::flow::{Flow, FlowResult};
use crate::operators::index_value;

impl Interpreter {
    pub(super) fn eval_call(
        &mut self,
        id: ExprId,
        receiver: Option<ExprId>,
        method: MemberPath,
        args: ExprRange,
        ty: ExprType,
    ) -> FlowResult {
        let arena = self.arena.clone();
        let script = Arc::clone(&self.script);
        let args = arena.exprs(args);
        let name = script.interner().lookup(method.member);
        let owner = script.registry().get(script.interner().lookup(method.owner));
        let declared = owner
            .as_ref()
            .and_then(|owner| owner.find_method(name, args.len()));

        let mut ids: SmallVec<[ExprId; 8]> = SmallVec::with_capacity(args.len() + 1);
        let mut by_ref: SmallVec<[bool; 8]> = SmallVec::with_capacity(args.len() + 1);
        if let Some(receiver) = receiver {
            ids.push(receiver);
            by_ref.push(false);
        }
        ids.extend_from_slice(args);
        by_ref.extend((0..args.len()).map(|i| {
            declared
                .as_ref()
                .and_then(|m| m.params().get(i))
                .is_some_and(|p| p.by_ref)
        }));

        let mut operands = ready!(self.eval_operands(id, &ids, &by_ref)?);
        let result = match receiver {
            Some(_) => {
                let (this, args) = split_receiver(&mut operands.values);
                self.call_instance(declared, name, &this, args)
            }
            None => match owner {
                Some(owner) => {
                    let method = declared.ok_or_else(|| missing_member(owner.name(), name))?;
                    self.invoke_host(&method, &Value::Null, &mut operands.values)
                }
                None => Err(unknown_type(script.interner().lookup(method.owner))),
            },
        };
        if operands.has_addresses() {
            let stored = self.write_back(&operands.values, &operands.addresses);
            if result.is_ok() {
                stored?;
            }
        }
        Ok(typed_result(result?, ty))
    }

    /// Instance call with virtual dispatch on the receiver's runtime type.
    fn call_instance(
        &self,
        declared: Option<MethodRef>,
        name: &str,
        this: &Value,
        args: &mut [Value],
    ) -> EvalResult {
        match this {
            Value::Null => return Err(null_reference()),
            Value::Native(native) => {
                let native = Arc::clone(native);
                return self.invoke_native(native.type_name(), name, || {
                    native.invoke_method(name, args)
                });
            }
            Value::Function(function) if name == "Invoke" => {
                let function = Arc::clone(function);
                return function.call(args).map_err(|e| e.unwrap_invocation());
            }
            _ => {}
        }
        let runtime = self.script.registry().type_of(this);
        let method = match (declared, runtime) {
            (Some(method), Some(runtime)) if method.is_virtual() => runtime
                .resolve_virtual(name, args.len())
                .unwrap_or(method),
            (Some(method), _) => method,
            (None, Some(runtime)) => runtime
                .resolve_virtual(name, args.len())
                .ok_or_else(|| missing_member(runtime.name(), name))?,
            (None, None) => return Err(missing_member(this.type_name(), name)),
        };
        self.invoke_host(&method, this, args)
    }

    /// Invoke a host method reflectively.
    pub(super) fn invoke_host(&self, method: &MethodRef, this: &Value, args: &mut [Value]) -> EvalResult {
        self.invoke_native(method.declaring_type(), method.name(), || {
            method.invoke(this, args)
        })
    }

    /// Run a reflective call: time it when profiling, strip invocation
    /// wrappers from its error and hand the error to the language context.
    pub(super) fn invoke_native(
        &self,
        owner: &str,
        name: &str,
        call: impl FnOnce() -> EvalResult,
    ) -> EvalResult {
        let started = self.script.profiler().map(|_| Instant::now());
        let result = call();
        if let (Some(profiler), Some(started)) = (self.script.profiler(), started) {
            profiler.record(&format!("{owner}.{name}"), started.elapsed());
        }
        result.map_err(|error| {
            let error = error.unwrap_invocation();
            self.script
                .language()
                .interpret_exception_throw(self.state.frame(), error, false)
        })
    }

    /// Copy by-reference arguments back to their storage locations.
    fn write_back(
        &mut self,
        values: &[Value],
        addresses: &[Option<Address>],
    ) -> Result<(), vesta_object::EvalError> {
        for (value, address) in values.iter().zip(addresses) {
            if let Some(address) = address {
                self.store(address, value.clone())?;
            }
        }
        Ok(())
    }

    pub(super) fn eval_invoke(
        &mut self,
        id: ExprId,
        callee: ExprId,
        args: ExprRange,
        ty: ExprType,
    ) -> FlowResult {
        let arena = self.arena.clone();
        let mut ids: SmallVec<[ExprId; 8]> = SmallVec::new();
        ids.push(callee);
        ids.extend_from_slice(arena.exprs(args));
        let mut operands = ready!(self.eval_operands(id, &ids, &[])?);
        let (callee, args) = split_receiver(&mut operands.values);
        let result = match callee {
            Value::Function(function) => function.call(args).map_err(|e| e.unwrap_invocation())?,
            Value::Null => return Err(null_reference()),
            other => return Err(not_callable(other.type_name())),
        };
        Ok(typed_result(result, ty))
    }

    pub(super) fn eval_new(&mut self, id: ExprId, owner: Name, args: ExprRange) -> FlowResult {
        let arena = self.arena.clone();
        let args = arena.exprs(args);
        let owner_name = self.script.interner().lookup(owner);
        let ty = self.script.registry().get(owner_name);
        let by_ref: SmallVec<[bool; 8]> = match ty.as_ref().and_then(|t| t.find_constructor(args.len())) {
            Some(ctor) => ctor.params().iter().map(|p| p.by_ref).collect(),
            None => SmallVec::new(),
        };
        let mut operands = ready!(self.eval_operands(id, args, &by_ref)?);
        let ty: TypeRef = ty.ok_or_else(|| unknown_type(owner_name))?;
        let result = self.invoke_native(ty.name(), ".ctor", || ty.instantiate(&mut operands.values));
        if operands.has_addresses() {
            let stored = self.write_back(&operands.values, &operands.addresses);
            if result.is_ok() {
                stored?;
            }
        }
        Ok(Flow::Value(result?))
    }

    pub(super) fn eval_new_array(
        &mut self,
        id: ExprId,
        element: ExprType,
        items: ExprRange,
    ) -> FlowResult {
        let arena = self.arena.clone();
        let operands = ready!(self.eval_operands(id, arena.exprs(items), &[])?);
        Ok(Flow::Value(Value::array(
            element,
            operands.into_values().into_vec(),
        )))
    }

    /// A zero-filled array. Only one dimension is supported.
    pub(super) fn eval_new_array_bounds(
        &mut self,
        id: ExprId,
        element: ExprType,
        bounds: ExprRange,
    ) -> FlowResult {
        let arena = self.arena.clone();
        let operands = ready!(self.eval_operands(id, arena.exprs(bounds), &[])?);
        let values = operands.into_values();
        let [length] = values.as_slice() else {
            return Err(unsupported_operation("multi-dimensional array", "Array"));
        };
        let length = usize::try_from(index_value(length)?).map_err(|_| overflow("new array"))?;
        Ok(Flow::Value(Value::array(
            element,
            vec![Value::default_for(element); length],
        )))
    }
}

/// Split the receiver (first operand) from the arguments.
fn split_receiver(values: &mut [Value]) -> (Value, &mut [Value]) {
    match values.split_first_mut() {
        Some((this, args)) => (this.clone(), args),
        None => (Value::Null, &mut []),
    }
}
