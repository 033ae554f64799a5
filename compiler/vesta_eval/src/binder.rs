//! Late binding of dynamic nodes.
//!
//! A `Dynamic` node names a [`Binder`] by `BinderId`. At run time the binder
//! receives the evaluated target and arguments and answers with a
//! [`Binding`]: a small expression tree over parameter nodes, plus an
//! optional applicability guard that tells when the same binding may be
//! reused for other arguments.

use std::fmt;
use std::sync::Arc;

use vesta_ir::{ExprId, SharedArena};
use vesta_object::{EvalError, EvalResult, Value};

/// A fast delegate for a call site: receives the target followed by the
/// arguments.
pub type CompiledTarget = Arc<dyn Fn(&[Value]) -> EvalResult + Send + Sync>;

/// Resolves dynamic operations for a guest language.
pub trait Binder: Send + Sync + fmt::Debug {
    /// Bind the operation for `target` applied to `args`.
    fn bind(&self, target: &Value, args: &[Value]) -> Result<Binding, EvalError>;

    /// A compiled delegate for call sites with `arity` operands (target
    /// included), if the binder can produce one.
    fn compile(&self, arity: usize) -> Option<CompiledTarget> {
        let _ = arity;
        None
    }
}

/// The result of binding one dynamic operation.
#[derive(Clone, Debug)]
pub struct Binding {
    /// Arena holding `parameters`, `expression` and `guard`.
    pub arena: SharedArena,
    /// Parameter nodes bound to the target and the arguments, in order.
    pub parameters: Vec<ExprId>,
    /// Expression computing the operation's result.
    pub expression: ExprId,
    /// Boolean expression over `parameters`; when absent the binding
    /// applies to any arguments.
    pub guard: Option<ExprId>,
}

impl Binding {
    pub fn new(arena: SharedArena, parameters: Vec<ExprId>, expression: ExprId) -> Self {
        Binding {
            arena,
            parameters,
            expression,
            guard: None,
        }
    }

    #[must_use]
    pub fn with_guard(mut self, guard: ExprId) -> Self {
        self.guard = Some(guard);
        self
    }
}
