//! Generator values.
//!
//! A generator owns one [`InterpreterState`] for its whole life. Every
//! `MoveNext` re-runs the generator body from the top with that state; the
//! yield marker and the saved operands, scopes and try positions lead the
//! walk back to the point after the last yield. The state is taken out of
//! the generator while the body runs, so a re-entrant `MoveNext` sees a
//! finished generator.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use vesta_ir::{ExprId, LabelId, SharedArena};
use vesta_object::errors::{internal_error, missing_member, unsupported_operation};
use vesta_object::{EvalError, EvalResult, NativeObject, Value};

use crate::flow::{ControlFlow, Flow};
use crate::interpreter::Interpreter;
use crate::state::{Frame, FrameGuard, InterpreterState, Scope};
use crate::ScriptCode;

/// What a `Generator` node captured when it was evaluated.
pub struct GeneratorDef {
    pub(crate) script: Arc<ScriptCode>,
    pub(crate) arena: SharedArena,
    pub(crate) body: ExprId,
    /// A goto to this label ends the iteration.
    pub(crate) label: Option<LabelId>,
    pub(crate) scope: Scope,
    pub(crate) caller: Arc<Frame>,
}

impl fmt::Debug for GeneratorDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeneratorDef")
            .field("script", &self.script.name())
            .field("body", &self.body)
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}

struct Progress {
    /// `None` once the generator finished, and while its body runs.
    state: Option<InterpreterState>,
    current: Value,
}

/// An enumerator over the values a generator body yields.
pub struct GeneratorObject {
    def: Arc<GeneratorDef>,
    progress: Mutex<Progress>,
}

impl GeneratorObject {
    pub(crate) fn new(def: &Arc<GeneratorDef>, scope: Scope) -> Self {
        let frame = Frame::new("<generator>", Some(Arc::clone(&def.caller)));
        GeneratorObject {
            def: Arc::clone(def),
            progress: Mutex::new(Progress {
                state: Some(InterpreterState::new(scope, frame)),
                current: Value::Null,
            }),
        }
    }

    /// Run the body up to its next yield. Returns `false` once the body
    /// completes, breaks or reaches the generator's label.
    ///
    /// An error finishes the generator and propagates to the caller.
    pub fn move_next(&self) -> Result<bool, EvalError> {
        let Some(state) = self.progress.lock().state.take() else {
            return Ok(false);
        };
        let def = &self.def;
        let _guard = FrameGuard::enter(Arc::clone(state.frame()));
        let mut interp = Interpreter::new(Arc::clone(&def.script), def.arena.clone(), state);
        let result = interp.eval(def.body);
        let mut progress = self.progress.lock();
        match result? {
            Flow::Signal(ControlFlow::YieldReturn(value)) => {
                tracing::trace!(generator = ?def.body, "generator yielded");
                progress.state = Some(interp.into_state());
                progress.current = value;
                Ok(true)
            }
            Flow::Signal(ControlFlow::Goto { label, .. }) if Some(label) != def.label => {
                Err(internal_error("goto escaped the generator body"))
            }
            _ => {
                tracing::trace!(generator = ?def.body, "generator finished");
                progress.current = Value::Null;
                Ok(false)
            }
        }
    }

    /// The value produced by the last successful `move_next`.
    pub fn current(&self) -> Value {
        self.progress.lock().current.clone()
    }

    /// Finish the generator without running the rest of its body.
    pub fn dispose(&self) {
        let mut progress = self.progress.lock();
        progress.state = None;
        progress.current = Value::Null;
    }

    pub fn is_finished(&self) -> bool {
        self.progress.lock().state.is_none()
    }
}

impl NativeObject for GeneratorObject {
    fn type_name(&self) -> &str {
        "Generator"
    }

    fn invoke_method(&self, name: &str, args: &mut [Value]) -> EvalResult {
        match (name, args.len()) {
            ("MoveNext", 0) => self.move_next().map(Value::Bool),
            ("get_Current", 0) => Ok(self.current()),
            ("Dispose", 0) => {
                self.dispose();
                Ok(Value::Null)
            }
            ("Reset", 0) => Err(unsupported_operation("Reset", self.type_name())),
            _ => Err(missing_member(self.type_name(), name)),
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl fmt::Debug for GeneratorObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeneratorObject")
            .field("body", &self.def.body)
            .field("finished", &self.is_finished())
            .finish()
    }
}

/// A re-enumerable generator: every enumeration starts a fresh run of the
/// body.
pub struct GeneratorEnumerable {
    def: Arc<GeneratorDef>,
}

impl GeneratorEnumerable {
    pub(crate) fn new(def: Arc<GeneratorDef>) -> Self {
        GeneratorEnumerable { def }
    }

    pub fn enumerator(&self) -> GeneratorObject {
        GeneratorObject::new(&self.def, self.def.scope.child())
    }
}

impl NativeObject for GeneratorEnumerable {
    fn type_name(&self) -> &str {
        "GeneratorEnumerable"
    }

    fn invoke_method(&self, name: &str, args: &mut [Value]) -> EvalResult {
        match (name, args.len()) {
            ("GetEnumerator", 0) => Ok(Value::native(self.enumerator())),
            _ => Err(missing_member(self.type_name(), name)),
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl fmt::Debug for GeneratorEnumerable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeneratorEnumerable")
            .field("body", &self.def.body)
            .finish()
    }
}
