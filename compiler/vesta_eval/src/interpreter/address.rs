//! Storage locations of by-reference arguments.
//!
//! A by-reference argument is evaluated into its current value plus the
//! location it was read from. After the call, the (possibly updated) value
//! is stored back into that location. Arguments that are not variables,
//! members or indexers are passed by value.

use smallvec::SmallVec;
use vesta_ir::{ExprId, ExprKind};
use vesta_object::errors::internal_error;
use vesta_object::{EvalError, TypeRef, Value};

use super::Interpreter;
use crate::flow::{ControlFlow, Flow};

/// Where a by-reference argument was read from.
#[derive(Clone)]
pub(crate) enum Address {
    Variable(ExprId),
    Field {
        object: Value,
        name: &'static str,
    },
    Static {
        owner: TypeRef,
        name: &'static str,
    },
    Element {
        target: Value,
        indices: SmallVec<[Value; 2]>,
    },
}

/// A sub-expression of an address: its value, or the flow that ends the
/// address evaluation.
enum Part {
    Value(Value),
    Exit(Flow),
}

impl Interpreter {
    /// Evaluate `id` as a storage location.
    ///
    /// The location is only reported when the node produced a value.
    /// Sub-expressions of the location are not saved across a yield; a
    /// location suspended part-way is walked again in full.
    pub(crate) fn eval_address(
        &mut self,
        id: ExprId,
    ) -> Result<(Flow, Option<Address>), EvalError> {
        let arena = self.arena.clone();
        match arena.kind(id) {
            ExprKind::Parameter { .. } => {
                let flow = self.eval(id)?;
                let address = matches!(flow, Flow::Value(_)).then_some(Address::Variable(id));
                Ok((flow, address))
            }
            ExprKind::Member {
                object: Some(object),
                member,
            } => {
                let target = match self.address_part(object)? {
                    Part::Value(target) => target,
                    Part::Exit(flow) => return Ok((flow, None)),
                };
                let name = self.script.interner().lookup(member.member);
                let value = self.read_member(&target, name)?;
                Ok((
                    Flow::Value(value),
                    Some(Address::Field {
                        object: target,
                        name,
                    }),
                ))
            }
            ExprKind::Member {
                object: None,
                member,
            } => {
                if self.state.is_resuming() {
                    return Ok((Flow::NEXT_FOR_YIELD, None));
                }
                let interner = self.script.interner();
                let owner = self
                    .script
                    .registry()
                    .require(interner.lookup(member.owner))?;
                let name = interner.lookup(member.member);
                let value = self.read_static(&owner, name)?;
                Ok((Flow::Value(value), Some(Address::Static { owner, name })))
            }
            ExprKind::Index { object, args } => {
                let target = match self.address_part(object)? {
                    Part::Value(target) => target,
                    Part::Exit(flow) => return Ok((flow, None)),
                };
                let mut indices = SmallVec::new();
                for &arg in arena.exprs(args) {
                    match self.address_part(arg)? {
                        Part::Value(index) => indices.push(index),
                        Part::Exit(flow) => return Ok((flow, None)),
                    }
                }
                let value = self.read_index(&target, &mut indices)?;
                Ok((Flow::Value(value), Some(Address::Element { target, indices })))
            }
            _ => Ok((self.eval(id)?, None)),
        }
    }

    fn address_part(&mut self, id: ExprId) -> Result<Part, EvalError> {
        let flow = self.eval(id)?;
        if let Flow::Signal(signal) = &flow {
            if signal.is_transfer() {
                return Ok(Part::Exit(flow));
            }
        }
        if self.state.is_resuming() {
            return Ok(Part::Exit(Flow::NEXT_FOR_YIELD));
        }
        Ok(match flow {
            Flow::Value(value) => Part::Value(value),
            Flow::Signal(ControlFlow::NextStatement | ControlFlow::NextForYield) => {
                Part::Value(Value::Null)
            }
            Flow::Signal(signal) => Part::Exit(Flow::Signal(signal)),
        })
    }

    /// Store `value` into a storage location.
    pub(crate) fn store(&mut self, address: &Address, value: Value) -> Result<(), EvalError> {
        match address {
            Address::Variable(var) => {
                if self.state.scope.assign(*var, value) {
                    Ok(())
                } else {
                    Err(internal_error("by-reference variable is not in scope"))
                }
            }
            Address::Field { object, name } => self.store_member(object, name, value),
            Address::Static { owner, name } => self.store_static(owner, name, value),
            Address::Element { target, indices } => self.store_index(target, indices, value),
        }
    }
}
