//! Operand evaluation for composite nodes.
//!
//! Operands are evaluated left to right. When one of them yields, the
//! values of the operands before it are saved under the composite node, so
//! that on resumption only the yielding operand is walked again and the
//! earlier ones keep their values (and their side effects are not
//! repeated).

use smallvec::SmallVec;
use vesta_ir::ExprId;
use vesta_object::errors::internal_error;
use vesta_object::{EvalError, Value};

use super::{Address, Interpreter};
use crate::flow::{ControlFlow, Flow};
use crate::state::SavedState;

/// Evaluated operands of one node, with the storage location of each
/// by-reference operand.
#[derive(Clone, Default)]
pub(crate) struct Operands {
    pub(crate) values: SmallVec<[Value; 4]>,
    pub(crate) addresses: SmallVec<[Option<Address>; 4]>,
}

impl Operands {
    fn with_capacity(capacity: usize) -> Self {
        Operands {
            values: SmallVec::with_capacity(capacity),
            addresses: SmallVec::with_capacity(capacity),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.values.len()
    }

    fn push(&mut self, value: Value, address: Option<Address>) {
        self.values.push(value);
        self.addresses.push(address);
    }

    /// First operand, `Null` if there is none.
    pub(crate) fn first(&self) -> Value {
        self.values.first().cloned().unwrap_or(Value::Null)
    }

    /// The two operands of a binary node.
    pub(crate) fn pair(self) -> (Value, Value) {
        let mut values = self.values.into_iter();
        let first = values.next().unwrap_or(Value::Null);
        let second = values.next().unwrap_or(Value::Null);
        (first, second)
    }

    pub(crate) fn into_values(self) -> SmallVec<[Value; 4]> {
        self.values
    }

    /// Whether any operand was passed by reference.
    pub(crate) fn has_addresses(&self) -> bool {
        self.addresses.iter().any(Option::is_some)
    }
}

/// Outcome of evaluating a node's operands.
pub(crate) enum OperandsFlow {
    /// Every operand has a value.
    Ready(Operands),
    /// A signal ended evaluation; the node returns it as is.
    Exit(Flow),
}

impl Interpreter {
    /// Evaluate the operands `ids` of `node`.
    ///
    /// Operand `i` is evaluated as a storage location when `by_ref[i]` is
    /// set (missing entries are by value). A void operand reads as `Null`.
    pub(crate) fn eval_operands(
        &mut self,
        node: ExprId,
        ids: &[ExprId],
        by_ref: &[bool],
    ) -> Result<OperandsFlow, EvalError> {
        let mut operands = match self.state.take_saved(node) {
            Some(SavedState::Operands(saved)) => saved,
            Some(_) => return Err(internal_error("operand node saved a foreign state")),
            None => Operands::with_capacity(ids.len()),
        };
        for (index, &id) in ids.iter().enumerate().skip(operands.len()) {
            let (flow, address) = if by_ref.get(index).copied().unwrap_or(false) {
                self.eval_address(id)?
            } else {
                (self.eval(id)?, None)
            };
            match flow {
                Flow::Value(value) => operands.push(value, address),
                Flow::Signal(ControlFlow::NextStatement | ControlFlow::NextForYield) => {
                    operands.push(Value::Null, None);
                }
                Flow::Signal(signal @ ControlFlow::YieldReturn(_)) => {
                    // The yielding operand itself is walked again on resumption.
                    self.state.save(node, SavedState::Operands(operands));
                    return Ok(OperandsFlow::Exit(Flow::Signal(signal)));
                }
                Flow::Signal(signal) => return Ok(OperandsFlow::Exit(Flow::Signal(signal))),
            }
        }
        if self.state.is_resuming() {
            return Ok(OperandsFlow::Exit(Flow::NEXT_FOR_YIELD));
        }
        Ok(OperandsFlow::Ready(operands))
    }
}
