//! Per-activation interpreter state.
//!
//! # Architecture
//!
//! An [`InterpreterState`] is created for every lambda invocation and every
//! generator. It owns:
//!
//! - the current [`Scope`], a parent-linked chain of variable tables keyed
//!   by the declaring node's `ExprId`;
//! - the current yield marker: while set, the state is *resuming* and
//!   every node fast-forwards with `NextForYield` until the marked yield
//!   node clears it;
//! - saved stack state: partially evaluated operands, block scopes and try
//!   resume points keyed by the node that saved them, consumed (removed)
//!   when the node is re-entered;
//! - the activation's [`Frame`], linked to its caller for backtraces.
//!
//! Scopes are shared (`Arc`) because closures, generators and runtime
//! variable objects keep them alive past the activation.

use std::cell::RefCell;
use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use vesta_ir::{ExprId, SourceLocation};
use vesta_object::{BacktraceFrame, EvalBacktrace, EvalError, Value};

use crate::flow::FlowResult;
use crate::interpreter::Operands;

struct ScopeData {
    vars: Mutex<FxHashMap<ExprId, Value>>,
    parent: Option<Scope>,
}

/// A variable scope. Clones share the same variables.
#[derive(Clone)]
pub struct Scope(Arc<ScopeData>);

impl Scope {
    pub fn root() -> Self {
        Scope(Arc::new(ScopeData {
            vars: Mutex::new(FxHashMap::default()),
            parent: None,
        }))
    }

    #[must_use]
    pub fn child(&self) -> Self {
        Scope(Arc::new(ScopeData {
            vars: Mutex::new(FxHashMap::default()),
            parent: Some(self.clone()),
        }))
    }

    /// Declare (or re-declare) a variable in this scope.
    pub fn declare(&self, var: ExprId, value: Value) {
        self.0.vars.lock().insert(var, value);
    }

    /// Look a variable up through the scope chain.
    pub fn lookup(&self, var: ExprId) -> Option<Value> {
        let mut scope = Some(self);
        while let Some(s) = scope {
            if let Some(v) = s.0.vars.lock().get(&var) {
                return Some(v.clone());
            }
            scope = s.0.parent.as_ref();
        }
        None
    }

    /// Assign in the innermost scope declaring `var`. Returns `false` if
    /// no scope declares it.
    pub fn assign(&self, var: ExprId, value: Value) -> bool {
        let mut scope = Some(self);
        while let Some(s) = scope {
            if let Some(slot) = s.0.vars.lock().get_mut(&var) {
                *slot = value;
                return true;
            }
            scope = s.0.parent.as_ref();
        }
        false
    }
}

impl std::fmt::Debug for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut depth = 0usize;
        let mut scope = self.0.parent.as_ref();
        while let Some(s) = scope {
            depth += 1;
            scope = s.0.parent.as_ref();
        }
        f.debug_struct("Scope")
            .field("vars", &self.0.vars.lock().len())
            .field("depth", &depth)
            .finish()
    }
}

/// One guest activation in the call chain.
#[derive(Debug)]
pub struct Frame {
    name: String,
    location: Mutex<Option<SourceLocation>>,
    caller: Option<Arc<Frame>>,
    depth: usize,
}

impl Frame {
    pub fn new(name: impl Into<String>, caller: Option<Arc<Frame>>) -> Arc<Self> {
        let depth = caller.as_ref().map_or(0, |c| c.depth + 1);
        Arc::new(Frame {
            name: name.into(),
            location: Mutex::new(None),
            caller,
            depth,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of callers above this frame.
    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn caller(&self) -> Option<&Arc<Frame>> {
        self.caller.as_ref()
    }

    pub fn location(&self) -> Option<SourceLocation> {
        *self.location.lock()
    }

    pub fn set_location(&self, location: SourceLocation) {
        *self.location.lock() = Some(location);
    }

    /// Snapshot of this frame and its callers, innermost first.
    pub fn backtrace(&self) -> EvalBacktrace {
        let mut frames = Vec::with_capacity(self.depth + 1);
        let mut frame = Some(self);
        while let Some(f) = frame {
            frames.push(BacktraceFrame {
                name: f.name.clone(),
                location: f.location(),
            });
            frame = f.caller.as_deref();
        }
        EvalBacktrace::new(frames)
    }
}

thread_local! {
    static CURRENT_FRAME: RefCell<Option<Arc<Frame>>> = const { RefCell::new(None) };
}

/// The innermost guest frame running on this thread.
pub fn current_frame() -> Option<Arc<Frame>> {
    CURRENT_FRAME.with(|f| f.borrow().clone())
}

/// Makes a frame current for this thread until dropped.
pub(crate) struct FrameGuard {
    previous: Option<Arc<Frame>>,
}

impl FrameGuard {
    pub(crate) fn enter(frame: Arc<Frame>) -> Self {
        let previous = CURRENT_FRAME.with(|f| f.borrow_mut().replace(frame));
        FrameGuard { previous }
    }
}

impl Drop for FrameGuard {
    fn drop(&mut self) {
        let previous = self.previous.take();
        CURRENT_FRAME.with(|f| *f.borrow_mut() = previous);
    }
}

/// Work a node saved when a yield suspended it.
pub(crate) enum SavedState {
    /// Operands evaluated before the suspension.
    Operands(Operands),
    /// The nested scope of a block.
    Scope(Scope),
    /// Suspended inside catch handler `index` while handling `error`.
    Handler { index: usize, error: EvalError },
    /// Suspended inside the fault block; `pending` is the error it runs for.
    Fault { pending: FlowResult },
    /// Suspended inside the finally block; `pending` is the outcome of the
    /// body and handlers.
    Finally { pending: FlowResult },
}

/// Mutable state of one activation.
pub struct InterpreterState {
    pub(crate) scope: Scope,
    current_yield: Option<ExprId>,
    stack_state: FxHashMap<ExprId, SavedState>,
    frame: Arc<Frame>,
}

impl InterpreterState {
    pub fn new(scope: Scope, frame: Arc<Frame>) -> Self {
        InterpreterState {
            scope,
            current_yield: None,
            stack_state: FxHashMap::default(),
            frame,
        }
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    pub fn frame(&self) -> &Arc<Frame> {
        &self.frame
    }

    /// Whether the state is fast-forwarding to a resumption point.
    #[inline]
    pub fn is_resuming(&self) -> bool {
        self.current_yield.is_some()
    }

    pub(crate) fn current_yield(&self) -> Option<ExprId> {
        self.current_yield
    }

    pub(crate) fn set_current_yield(&mut self, node: Option<ExprId>) {
        self.current_yield = node;
    }

    pub(crate) fn save(&mut self, node: ExprId, state: SavedState) {
        self.stack_state.insert(node, state);
    }

    /// Remove and return what `node` saved, if anything.
    pub(crate) fn take_saved(&mut self, node: ExprId) -> Option<SavedState> {
        if self.stack_state.is_empty() {
            return None;
        }
        self.stack_state.remove(&node)
    }
}

impl std::fmt::Debug for InterpreterState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InterpreterState")
            .field("scope", &self.scope)
            .field("current_yield", &self.current_yield)
            .field("saved", &self.stack_state.len())
            .field("frame", &self.frame.name)
            .finish()
    }
}
