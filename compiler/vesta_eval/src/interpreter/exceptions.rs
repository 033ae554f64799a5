//! Exception handling: try/catch/finally/fault, throw and rethrow.
//!
//! Errors propagate as `Err(EvalError)`. A handler runs with the error it
//! handles pushed on a thread-local stack, which is what a parameterless
//! rethrow re-raises. A body, handler, fault or finally block that yields
//! saves where it was under the try node; the finally block of a suspended
//! try only runs once the generator resumes and leaves the try.

use std::cell::RefCell;

use vesta_ir::{CatchBlock, CatchRange, ExprId};
use vesta_object::errors::{internal_error, invalid_cast, invalid_operation, null_reference, thrown};
use vesta_object::{EvalError, Value};

use super::Interpreter;
use crate::flow::{eval_child, skip_while_resuming, ControlFlow, Flow, FlowResult};
use crate::state::SavedState;

thread_local! {
    static HANDLED: RefCell<Vec<EvalError>> = const { RefCell::new(Vec::new()) };
}

/// Keeps an error on the handled stack while its handler runs.
struct HandledGuard;

impl HandledGuard {
    fn enter(error: EvalError) -> Self {
        HANDLED.with(|handled| handled.borrow_mut().push(error));
        HandledGuard
    }
}

impl Drop for HandledGuard {
    fn drop(&mut self) {
        HANDLED.with(|handled| {
            handled.borrow_mut().pop();
        });
    }
}

/// The error handled by the innermost running catch handler.
fn innermost_handled() -> Option<EvalError> {
    HANDLED.with(|handled| handled.borrow().last().cloned())
}

impl Interpreter {
    pub(super) fn eval_try(
        &mut self,
        id: ExprId,
        body: ExprId,
        handlers: CatchRange,
        finally: Option<ExprId>,
        fault: Option<ExprId>,
    ) -> FlowResult {
        let arena = self.arena.clone();
        let handlers = arena.catches(handlers);
        let outcome = match self.state.take_saved(id) {
            Some(SavedState::Handler { index, error }) => self.run_handler(id, handlers, index, error),
            Some(SavedState::Fault { pending }) => {
                let Some(fault) = fault else {
                    return Err(internal_error("try node without fault block saved a fault"));
                };
                return self.run_fault(id, pending, fault, finally);
            }
            Some(SavedState::Finally { pending }) => return self.run_finally(id, pending, finally),
            Some(_) => return Err(internal_error("try node saved a foreign state")),
            None => match self.eval(body) {
                Err(error) if error.is_catchable() && !handlers.is_empty() => {
                    self.catch(id, handlers, error)
                }
                outcome => outcome,
            },
        };
        self.finish_try(id, outcome, finally, fault)
    }

    /// Try the handlers in order; the first whose type and filter accept
    /// the error handles it. Unhandled errors propagate unchanged.
    fn catch(&mut self, id: ExprId, handlers: &[CatchBlock], error: EvalError) -> FlowResult {
        let registry = std::sync::Arc::clone(self.script.registry());
        for (index, handler) in handlers.iter().enumerate() {
            let Some(test) = registry.resolve(handler.test, self.script.interner()) else {
                tracing::trace!(?handler.test, "catch type is not a host type");
                continue;
            };
            if !registry.exception_matches(&error, &test) {
                continue;
            }
            if let Some(filter) = handler.filter {
                if !self.run_filter(handler, filter, &error) {
                    continue;
                }
            }
            return self.run_handler(id, handlers, index, error);
        }
        Err(error)
    }

    /// Evaluate a handler filter with the catch variable bound. A filter
    /// that fails or yields anything but `true` rejects the error.
    fn run_filter(&mut self, handler: &CatchBlock, filter: ExprId, error: &EvalError) -> bool {
        let scope = self.state.scope.child();
        if let Some(variable) = handler.variable {
            scope.declare(variable, self.script.registry().exception_object(error));
        }
        let outer = std::mem::replace(&mut self.state.scope, scope);
        let result = self.eval(filter);
        self.state.scope = outer;
        matches!(result, Ok(Flow::Value(Value::Bool(true))))
    }

    fn run_handler(
        &mut self,
        id: ExprId,
        handlers: &[CatchBlock],
        index: usize,
        mut error: EvalError,
    ) -> FlowResult {
        let handler = handlers
            .get(index)
            .ok_or_else(|| internal_error("saved catch handler out of range"))?;
        let exception = self.script.registry().exception_object(&error);
        if error.exception.is_none() {
            error.exception = Some(exception.clone());
        }
        let scope = self.state.scope.child();
        if let Some(variable) = handler.variable {
            scope.declare(variable, exception);
        }
        let outer = std::mem::replace(&mut self.state.scope, scope);
        let result = {
            let _handled = HandledGuard::enter(error.clone());
            self.eval(handler.body)
        };
        self.state.scope = outer;
        if matches!(result, Ok(ref flow) if flow.is_yield_return()) {
            self.state.save(id, SavedState::Handler { index, error });
        }
        result
    }

    /// Run fault and finally blocks around `outcome`.
    ///
    /// Nothing runs while the try is suspended or being skipped.
    fn finish_try(
        &mut self,
        id: ExprId,
        outcome: FlowResult,
        finally: Option<ExprId>,
        fault: Option<ExprId>,
    ) -> FlowResult {
        if matches!(outcome, Ok(ref flow) if flow.is_yield_return()) || self.state.is_resuming() {
            return outcome;
        }
        match (outcome, fault) {
            (outcome @ Err(_), Some(fault)) => self.run_fault(id, outcome, fault, finally),
            (outcome, _) => self.run_finally(id, outcome, finally),
        }
    }

    /// Run the fault block for the error in `pending`, then the finally
    /// block. An error raised or a jump taken by the fault block replaces
    /// the pending error.
    fn run_fault(
        &mut self,
        id: ExprId,
        pending: FlowResult,
        fault: ExprId,
        finally: Option<ExprId>,
    ) -> FlowResult {
        let outcome = match self.eval(fault) {
            Ok(Flow::Signal(signal @ ControlFlow::YieldReturn(_))) => {
                self.state.save(id, SavedState::Fault { pending });
                return Ok(Flow::Signal(signal));
            }
            Ok(Flow::Signal(signal)) if signal.is_transfer() => Ok(Flow::Signal(signal)),
            Ok(_) => pending,
            Err(error) => Err(error),
        };
        self.run_finally(id, outcome, finally)
    }

    fn run_finally(&mut self, id: ExprId, outcome: FlowResult, finally: Option<ExprId>) -> FlowResult {
        let Some(finally) = finally else {
            return outcome;
        };
        match self.eval(finally)? {
            Flow::Signal(signal @ ControlFlow::YieldReturn(_)) => {
                self.state.save(id, SavedState::Finally { pending: outcome });
                Ok(Flow::Signal(signal))
            }
            // A jump out of the finally block replaces the pending outcome.
            Flow::Signal(signal) if signal.is_transfer() => Ok(Flow::Signal(signal)),
            _ => outcome,
        }
    }

    pub(super) fn eval_throw(&mut self, value: Option<ExprId>) -> FlowResult {
        let Some(value) = value else {
            skip_while_resuming!(self);
            return Err(innermost_handled()
                .unwrap_or_else(|| invalid_operation("no exception is being handled")));
        };
        let value = eval_child!(self, value);
        skip_while_resuming!(self);
        let exception = value.into_value();
        if exception.is_null() {
            return Err(null_reference());
        }
        let registry = self.script.registry();
        let base = registry.require("Exception")?;
        let derives = matches!(exception, Value::Object(_))
            && registry
                .type_of(&exception)
                .is_some_and(|ty| ty.is_subclass_of(&base));
        if !derives {
            return Err(invalid_cast(exception.type_name(), "Exception"));
        }
        let error = thrown(exception);
        Err(self
            .script
            .language()
            .interpret_exception_throw(self.state.frame(), error, true))
    }
}
