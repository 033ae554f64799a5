//! Interpreted function values.
//!
//! A `Lambda` node evaluates to an [`InterpretedFunction`]: the lambda
//! node, the arena it lives in and the scope it closes over. Calling it
//! runs the body in a fresh activation.

use std::fmt;
use std::sync::Arc;

use vesta_ir::{ExprId, ExprKind, LabelId, SharedArena};
use vesta_object::errors::{internal_error, recursion_limit_exceeded, wrong_arg_count};
use vesta_object::{Callable, EvalResult, Value};

use crate::flow::{ControlFlow, Flow};
use crate::interpreter::Interpreter;
use crate::state::{current_frame, Frame, FrameGuard, InterpreterState, Scope};
use crate::ScriptCode;

/// A closure over an interpreted lambda.
pub struct InterpretedFunction {
    script: Arc<ScriptCode>,
    arena: SharedArena,
    name: &'static str,
    params: Vec<ExprId>,
    body: ExprId,
    return_label: Option<LabelId>,
    closure: Scope,
}

impl InterpretedFunction {
    /// The function value of lambda node `lambda`.
    pub fn new(
        script: Arc<ScriptCode>,
        arena: SharedArena,
        lambda: ExprId,
        closure: Scope,
    ) -> Result<Self, vesta_object::EvalError> {
        let ExprKind::Lambda {
            name,
            params,
            body,
            return_label,
        } = arena.kind(lambda)
        else {
            return Err(internal_error(format!(
                "a {} node is not a lambda",
                arena.kind(lambda).name()
            )));
        };
        let params = arena.exprs(params).to_vec();
        Ok(InterpretedFunction {
            name: script.interner().lookup(name),
            script,
            arena,
            params,
            body,
            return_label,
            closure,
        })
    }
}

impl Callable for InterpretedFunction {
    fn name(&self) -> &str {
        self.name
    }

    fn arity(&self) -> usize {
        self.params.len()
    }

    fn call(&self, args: &mut [Value]) -> EvalResult {
        if args.len() != self.params.len() {
            return Err(wrong_arg_count(self.name, self.params.len(), args.len()));
        }
        let frame = Frame::new(self.name, current_frame());
        if self.script.config().exceeds_call_depth(frame.depth()) {
            let limit = self.script.config().max_call_depth.unwrap_or_default();
            return Err(recursion_limit_exceeded(limit));
        }
        let _guard = FrameGuard::enter(Arc::clone(&frame));

        let scope = self.closure.child();
        for (&param, arg) in self.params.iter().zip(args.iter()) {
            scope.declare(param, arg.clone());
        }
        let state = InterpreterState::new(scope, frame);
        let mut interp = Interpreter::new(Arc::clone(&self.script), self.arena.clone(), state);
        match interp.eval(self.body)? {
            Flow::Value(value) => Ok(value),
            Flow::Signal(ControlFlow::NextStatement) => Ok(Value::Null),
            Flow::Signal(ControlFlow::Goto { label, value }) if Some(label) == self.return_label => {
                Ok(value.unwrap_or(Value::Null))
            }
            Flow::Signal(signal) => Err(internal_error(format!(
                "{} signal escaped lambda {}",
                signal.kind_name(),
                self.name
            ))),
        }
    }
}

impl fmt::Debug for InterpretedFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InterpretedFunction")
            .field("name", &self.name)
            .field("arity", &self.params.len())
            .field("body", &self.body)
            .finish_non_exhaustive()
    }
}
