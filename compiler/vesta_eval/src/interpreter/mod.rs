//! Tree-walking interpreter over Vesta expression trees.
//!
//! # Architecture
//!
//! All evaluation goes through [`Interpreter::eval`], which dispatches on the
//! node kind. Node kinds are `Copy`, so the kind is copied out of the arena
//! before dispatch and every arm is free to recurse. Helper modules split
//! the arms by concern:
//!
//! - `operands`: multi-operand evaluation with yield-aware saving
//! - `control`: blocks, loops, labels, gotos, conditionals, switches
//! - `exceptions`: try/catch/finally/fault and throw
//! - `calls`: method calls, function invocation, object creation
//! - `access`: members, indexers, assignment, runtime variables
//! - `address`: storage locations for by-reference arguments
//! - `generators`: yield and generator nodes
//!
//! # Resumption
//!
//! A generator suspends by returning `YieldReturn` all the way up and
//! resumes by walking its body again from the top. While the state's yield
//! marker is set every node answers `NextForYield` without doing its own
//! work, except along the path to the marked yield node, where nodes pick
//! up the operands, scopes and handler positions they saved on the way out.
//!
//! # Arena Threading
//!
//! An interpreter evaluates nodes of one arena. Lambdas and generators
//! capture the arena they were created in; a binding's expression runs in
//! an interpreter over the binding's own arena.

mod access;
mod address;
mod calls;
mod control;
mod exceptions;
mod generators;
mod operands;

use std::sync::Arc;

use vesta_ir::{BinderId, ExprId, ExprKind, ExprRange, ExprType, SharedArena, UnaryOp};
use vesta_object::errors::{internal_error, invalid_operation};
use vesta_object::{Callable, EvalResult, QuotedExpr, Value};

use crate::conversions::{convert, type_as, unbox};
use crate::flow::{eval_child, skip_while_resuming, ControlFlow, Flow, FlowResult};
use crate::function_val::InterpretedFunction;
use crate::stack::ensure_sufficient_stack;
use crate::state::{current_frame, Frame, FrameGuard, InterpreterState, Scope};
use crate::{evaluate_unary, ScriptCode};

pub(crate) use address::Address;
pub(crate) use operands::{Operands, OperandsFlow};

/// Unwrap ready operands or return the flow that ended their evaluation.
macro_rules! ready {
    ($e:expr) => {
        match $e {
            $crate::interpreter::OperandsFlow::Ready(operands) => operands,
            $crate::interpreter::OperandsFlow::Exit(flow) => return Ok(flow),
        }
    };
}

pub(crate) use ready;

/// Evaluates nodes of one arena against one activation state.
pub struct Interpreter {
    script: Arc<ScriptCode>,
    arena: SharedArena,
    pub(crate) state: InterpreterState,
}

impl Interpreter {
    pub fn new(script: Arc<ScriptCode>, arena: SharedArena, state: InterpreterState) -> Self {
        Interpreter {
            script,
            arena,
            state,
        }
    }

    /// Run the script's top-level lambda with `args` bound to its
    /// parameters.
    #[tracing::instrument(level = "debug", skip(script, args), fields(script = script.name()))]
    pub fn top_level_execute(script: &Arc<ScriptCode>, args: &mut [Value]) -> EvalResult {
        let entry = InterpretedFunction::new(
            Arc::clone(script),
            script.arena().clone(),
            script.entry(),
            Scope::root(),
        )?;
        entry.call(args)
    }

    /// Evaluate `expr` of the script's arena in a fresh state.
    ///
    /// A void expression completes with `Null`; any other control-flow
    /// signal reaching this entry point is an invalid operation.
    #[tracing::instrument(level = "debug", skip(script), fields(script = script.name()))]
    pub fn evaluate(script: &Arc<ScriptCode>, expr: ExprId) -> EvalResult {
        let frame = Frame::new(script.name(), current_frame());
        let _guard = FrameGuard::enter(Arc::clone(&frame));
        let state = InterpreterState::new(Scope::root(), frame);
        let mut interp = Interpreter::new(Arc::clone(script), script.arena().clone(), state);
        match interp.eval(expr)? {
            Flow::Value(value) => Ok(value),
            Flow::Signal(ControlFlow::NextStatement) => Ok(Value::Null),
            Flow::Signal(signal) => Err(invalid_operation(format!(
                "{} signal escaped the evaluated expression",
                signal.kind_name()
            ))),
        }
    }

    /// Evaluate `expr` of `arena` in a new state over `scope`, on the
    /// current frame. Used for bindings and their guards.
    pub(crate) fn run_detached(
        script: &Arc<ScriptCode>,
        arena: &SharedArena,
        scope: Scope,
        expr: ExprId,
    ) -> FlowResult {
        let frame = current_frame().unwrap_or_else(|| Frame::new(script.name(), None));
        let state = InterpreterState::new(scope, frame);
        let mut interp = Interpreter::new(Arc::clone(script), arena.clone(), state);
        interp.eval(expr)
    }

    pub fn state(&self) -> &InterpreterState {
        &self.state
    }

    pub fn script(&self) -> &Arc<ScriptCode> {
        &self.script
    }

    pub(crate) fn into_state(self) -> InterpreterState {
        self.state
    }

    /// Evaluate one node with stack safety.
    #[tracing::instrument(level = "trace", skip(self))]
    pub fn eval(&mut self, id: ExprId) -> FlowResult {
        ensure_sufficient_stack(|| self.eval_node(id))
    }

    fn eval_node(&mut self, id: ExprId) -> FlowResult {
        let expr = *self.arena.get(id);
        let ty = expr.ty;
        match expr.kind {
            ExprKind::Constant(literal) => {
                skip_while_resuming!(self);
                Ok(Flow::Value(Value::from_literal(
                    literal,
                    self.script.interner(),
                )))
            }
            ExprKind::Parameter { name } => {
                skip_while_resuming!(self);
                self.state.scope.lookup(id).map(Flow::Value).ok_or_else(|| {
                    internal_error(format!(
                        "unbound variable '{}'",
                        self.script.interner().lookup(name)
                    ))
                })
            }
            ExprKind::Unary { op, operand } => self.eval_unary(op, operand, ty),
            ExprKind::Binary { op, left, right } => self.eval_binary(id, op, left, right),
            ExprKind::TypeIs {
                operand,
                test,
                exact,
            } => {
                let value = eval_child!(self, operand);
                skip_while_resuming!(self);
                let value = value.into_value();
                let registry = self.script.registry();
                let interner = self.script.interner();
                let result = if exact {
                    registry.is_exact(&value, test, interner)
                } else {
                    registry.is_instance(&value, test, interner)
                };
                Ok(Flow::Value(Value::Bool(result)))
            }
            ExprKind::Assign { target, value } => self.eval_assign(id, target, value),
            ExprKind::Call {
                receiver,
                method,
                args,
            } => self.eval_call(id, receiver, method, args, ty),
            ExprKind::Invoke { callee, args } => self.eval_invoke(id, callee, args, ty),
            ExprKind::Member { object, member } => self.eval_member(object, member),
            ExprKind::Index { object, args } => self.eval_index(id, object, args),
            ExprKind::New { owner, args } => self.eval_new(id, owner, args),
            ExprKind::NewArrayInit { element, items } => self.eval_new_array(id, element, items),
            ExprKind::NewArrayBounds { element, bounds } => {
                self.eval_new_array_bounds(id, element, bounds)
            }
            ExprKind::Conditional {
                test,
                if_true,
                if_false,
            } => self.eval_conditional(test, if_true, if_false),
            ExprKind::Block { variables, body } => self.eval_block(id, variables, body, ty),
            ExprKind::Loop {
                body,
                break_label,
                continue_label,
            } => self.eval_loop(body, break_label, continue_label, ty),
            ExprKind::Label { label, default } => self.eval_label(label, default, ty),
            ExprKind::Goto { label, value, .. } => self.eval_goto(label, value),
            ExprKind::Switch {
                test,
                cases,
                break_label,
            } => self.eval_switch(test, cases, break_label),
            ExprKind::Try {
                body,
                handlers,
                finally,
                fault,
            } => self.eval_try(id, body, handlers, finally, fault),
            ExprKind::Throw { value } => self.eval_throw(value),
            ExprKind::Lambda { .. } => {
                skip_while_resuming!(self);
                let function = InterpretedFunction::new(
                    Arc::clone(&self.script),
                    self.arena.clone(),
                    id,
                    self.state.scope.clone(),
                )?;
                Ok(Flow::Value(Value::function(function)))
            }
            ExprKind::Generator {
                body,
                label,
                enumerable,
            } => self.eval_generator(body, label, enumerable),
            ExprKind::Yield { value } => self.eval_yield(id, value),
            ExprKind::Dynamic { binder, args } => self.eval_dynamic(id, binder, args, ty),
            ExprKind::RuntimeVariables { variables } => self.eval_runtime_variables(variables),
            ExprKind::DebugInfo { location, body } => {
                if !self.state.is_resuming() {
                    self.state.frame().set_location(location);
                }
                self.eval(body)
            }
            ExprKind::Default => {
                skip_while_resuming!(self);
                Ok(typed_result(Value::default_for(ty), ty))
            }
        }
    }

    fn eval_unary(&mut self, op: UnaryOp, operand: ExprId, ty: ExprType) -> FlowResult {
        if op == UnaryOp::Quote {
            skip_while_resuming!(self);
            return Ok(Flow::Value(Value::Quoted(QuotedExpr {
                arena: self.arena.clone(),
                expr: operand,
            })));
        }
        let value = eval_child!(self, operand);
        skip_while_resuming!(self);
        let value = value.into_value();
        let registry = self.script.registry();
        let interner = self.script.interner();
        let result = match op {
            UnaryOp::Convert => convert(value, ty, false, registry, interner)?,
            UnaryOp::ConvertChecked => convert(value, ty, true, registry, interner)?,
            UnaryOp::TypeAs => type_as(value, ty, registry, interner),
            UnaryOp::Unbox => unbox(value, ty, interner)?,
            _ => evaluate_unary(op, value)?,
        };
        Ok(Flow::Value(result))
    }

    fn eval_dynamic(
        &mut self,
        id: ExprId,
        binder: BinderId,
        args: ExprRange,
        ty: ExprType,
    ) -> FlowResult {
        let arena = self.arena.clone();
        let operands = ready!(self.eval_operands(id, arena.exprs(args), &[])?);
        let values = operands.into_values();
        let result =
            crate::exec::dynamic::invoke_dynamic(&self.script, &arena, id, binder, &values)?;
        Ok(typed_result(result, ty))
    }
}

/// The flow of a node producing `value`: `NextStatement` when the node is
/// typed `void`.
#[inline]
pub(crate) fn typed_result(value: Value, ty: ExprType) -> Flow {
    if ty.is_void() {
        Flow::NEXT_STATEMENT
    } else {
        Flow::Value(value)
    }
}

impl std::fmt::Debug for Interpreter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Interpreter")
            .field("script", &self.script.name())
            .field("arena", &self.arena.id())
            .field("state", &self.state)
            .finish()
    }
}
