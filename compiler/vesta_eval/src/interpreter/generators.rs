//! Yield and generator nodes.

use std::sync::Arc;

use vesta_ir::{ExprId, LabelId};
use vesta_object::Value;

use super::Interpreter;
use crate::flow::{eval_child, skip_while_resuming, ControlFlow, Flow, FlowResult};
use crate::generator::{GeneratorDef, GeneratorEnumerable, GeneratorObject};

impl Interpreter {
    /// A yield suspends the generator by returning `YieldReturn` and marks
    /// itself as the point to resume from. Reaching the marked yield again
    /// ends the fast-forward: execution continues after it.
    pub(super) fn eval_yield(&mut self, id: ExprId, value: Option<ExprId>) -> FlowResult {
        if self.state.current_yield() == Some(id) {
            self.state.set_current_yield(None);
            return Ok(Flow::NEXT_STATEMENT);
        }
        let Some(value) = value else {
            skip_while_resuming!(self);
            return Ok(Flow::Signal(ControlFlow::YieldBreak));
        };
        let value = eval_child!(self, value);
        skip_while_resuming!(self);
        self.state.set_current_yield(Some(id));
        Ok(Flow::Signal(ControlFlow::YieldReturn(value.into_value())))
    }

    pub(super) fn eval_generator(
        &mut self,
        body: ExprId,
        label: Option<LabelId>,
        enumerable: bool,
    ) -> FlowResult {
        skip_while_resuming!(self);
        let def = Arc::new(GeneratorDef {
            script: Arc::clone(&self.script),
            arena: self.arena.clone(),
            body,
            label,
            scope: self.state.scope.clone(),
            caller: Arc::clone(self.state.frame()),
        });
        let value = if enumerable {
            Value::native(GeneratorEnumerable::new(def))
        } else {
            Value::native(GeneratorObject::new(&def, self.state.scope.clone()))
        };
        Ok(Flow::Value(value))
    }
}
