//! Control-flow signals.
//!
//! Evaluating a node produces either a value or a signal. Signals travel
//! up the tree as return values until a node that owns them (a block
//! holding the target label, a loop, a lambda boundary, a generator)
//! consumes them. No unwinding mechanism is involved, which is what lets a
//! generator suspend in the middle of a tree by simply returning.

use vesta_ir::LabelId;
use vesta_object::{EvalError, Value};

/// A non-value outcome of evaluating a node.
#[derive(Clone, Debug)]
pub enum ControlFlow {
    /// A void expression completed.
    NextStatement,
    /// The node was skipped while fast-forwarding to a resumption point.
    NextForYield,
    /// Jump to `label`, carrying an optional value.
    Goto {
        label: LabelId,
        value: Option<Value>,
    },
    /// A generator produced a value and suspends.
    YieldReturn(Value),
    /// A generator finished.
    YieldBreak,
}

impl ControlFlow {
    /// Jumps and yields: signals that end the evaluation of every node
    /// between their origin and their target.
    #[inline]
    pub fn is_transfer(&self) -> bool {
        matches!(
            self,
            ControlFlow::Goto { .. } | ControlFlow::YieldReturn(_) | ControlFlow::YieldBreak
        )
    }

    /// Short name of the signal for diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            ControlFlow::NextStatement => "next statement",
            ControlFlow::NextForYield => "next for yield",
            ControlFlow::Goto { .. } => "goto",
            ControlFlow::YieldReturn(_) => "yield return",
            ControlFlow::YieldBreak => "yield break",
        }
    }
}

/// Result of evaluating one node.
#[derive(Clone, Debug)]
pub enum Flow {
    Value(Value),
    Signal(ControlFlow),
}

impl Flow {
    pub const NEXT_STATEMENT: Flow = Flow::Signal(ControlFlow::NextStatement);
    pub const NEXT_FOR_YIELD: Flow = Flow::Signal(ControlFlow::NextForYield);

    #[inline]
    pub fn is_next_for_yield(&self) -> bool {
        matches!(self, Flow::Signal(ControlFlow::NextForYield))
    }

    #[inline]
    pub fn is_yield_return(&self) -> bool {
        matches!(self, Flow::Signal(ControlFlow::YieldReturn(_)))
    }

    /// The value of an operand. A void operand (`NextStatement`) reads as
    /// `Null`; callers handle every other signal first.
    #[inline]
    pub fn into_value(self) -> Value {
        match self {
            Flow::Value(v) => v,
            Flow::Signal(_) => Value::Null,
        }
    }

    /// The completion of a node typed `void` or carrying `value`.
    pub fn completion(value: Option<Value>, is_void: bool) -> Flow {
        match value {
            Some(v) => Flow::Value(v),
            None if is_void => Flow::NEXT_STATEMENT,
            None => Flow::Value(Value::Null),
        }
    }
}

/// Result of evaluating one node, or the error it raised.
pub type FlowResult = Result<Flow, EvalError>;

/// Evaluate a child node and return a jump or yield signal from the
/// enclosing evaluator. `NextStatement` and `NextForYield` are handed back.
macro_rules! eval_child {
    ($interp:expr, $id:expr) => {
        match $interp.eval($id)? {
            $crate::flow::Flow::Signal(cf) if cf.is_transfer() => {
                return Ok($crate::flow::Flow::Signal(cf));
            }
            flow => flow,
        }
    };
}

/// Return `NextForYield` from the enclosing evaluator while skipping.
macro_rules! skip_while_resuming {
    ($interp:expr) => {
        if $interp.state.is_resuming() {
            return Ok($crate::flow::Flow::NEXT_FOR_YIELD);
        }
    };
}

pub(crate) use eval_child;
pub(crate) use skip_while_resuming;
