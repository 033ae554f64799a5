//! Control flow: blocks, loops, labels, gotos, conditionals, switches and
//! binary operators (including the short-circuiting ones).

use vesta_ir::{BinaryOp, CaseRange, ExprArena, ExprId, ExprKind, ExprRange, ExprType, LabelId};
use vesta_object::errors::{internal_error, invalid_cast};
use vesta_object::Value;

use super::{ready, Interpreter, Operands};
use crate::evaluate_binary;
use crate::flow::{eval_child, skip_while_resuming, ControlFlow, Flow, FlowResult};
use crate::state::SavedState;

impl Interpreter {
    pub(super) fn eval_binary(
        &mut self,
        id: ExprId,
        op: BinaryOp,
        left: ExprId,
        right: ExprId,
    ) -> FlowResult {
        if op.is_short_circuit() {
            return self.eval_short_circuit(id, op, left, right);
        }
        let operands = ready!(self.eval_operands(id, &[left, right], &[])?);
        let (left, right) = operands.pair();
        Ok(Flow::Value(evaluate_binary(op, left, right)?))
    }

    /// `AndAlso`, `OrElse` and `Coalesce`: the right operand runs only when
    /// the left one does not decide the result.
    fn eval_short_circuit(
        &mut self,
        id: ExprId,
        op: BinaryOp,
        left: ExprId,
        right: ExprId,
    ) -> FlowResult {
        let left_value = match self.state.take_saved(id) {
            Some(SavedState::Operands(saved)) => saved.first(),
            Some(_) => return Err(internal_error("short-circuit node saved a foreign state")),
            None => {
                let flow = eval_child!(self, left);
                skip_while_resuming!(self);
                let value = flow.into_value();
                let decided = match (op, &value) {
                    (BinaryOp::AndAlso, Value::Bool(false)) | (BinaryOp::OrElse, Value::Bool(true)) => {
                        true
                    }
                    (BinaryOp::AndAlso | BinaryOp::OrElse, Value::Bool(_)) => false,
                    (BinaryOp::AndAlso | BinaryOp::OrElse, other) => {
                        return Err(invalid_cast(other.type_name(), "Boolean"));
                    }
                    (_, other) => !other.is_null(),
                };
                if decided {
                    return Ok(Flow::Value(value));
                }
                value
            }
        };
        match self.eval(right)? {
            Flow::Signal(signal @ ControlFlow::YieldReturn(_)) => {
                let mut saved = Operands::default();
                saved.values.push(left_value);
                saved.addresses.push(None);
                self.state.save(id, SavedState::Operands(saved));
                Ok(Flow::Signal(signal))
            }
            Flow::Signal(ControlFlow::NextStatement) => Ok(Flow::Value(Value::Null)),
            Flow::Signal(signal) => Ok(Flow::Signal(signal)),
            Flow::Value(value) => match (op, &value) {
                (BinaryOp::Coalesce, _) | (_, Value::Bool(_)) => Ok(Flow::Value(value)),
                (_, other) => Err(invalid_cast(other.type_name(), "Boolean")),
            },
        }
    }

    pub(super) fn eval_conditional(
        &mut self,
        test: ExprId,
        if_true: ExprId,
        if_false: ExprId,
    ) -> FlowResult {
        let test = eval_child!(self, test);
        if test.is_next_for_yield() || self.state.is_resuming() {
            // The resumption point is in one of the branches, or in neither.
            let flow = self.eval(if_true)?;
            if !flow.is_next_for_yield() {
                return Ok(flow);
            }
            return self.eval(if_false);
        }
        match test.into_value() {
            Value::Bool(true) => self.eval(if_true),
            Value::Bool(false) => self.eval(if_false),
            other => Err(invalid_cast(other.type_name(), "Boolean")),
        }
    }

    pub(super) fn eval_block(
        &mut self,
        id: ExprId,
        variables: ExprRange,
        body: ExprRange,
        ty: ExprType,
    ) -> FlowResult {
        let arena = self.arena.clone();
        let variables = arena.exprs(variables);
        let statements = arena.exprs(body);
        let saved_scope = match self.state.take_saved(id) {
            Some(SavedState::Scope(scope)) => Some(scope),
            Some(_) => return Err(internal_error("block saved a foreign state")),
            None => None,
        };
        if variables.is_empty() {
            return self.eval_statements(&arena, statements, ty);
        }
        let scope = saved_scope.unwrap_or_else(|| {
            let scope = self.state.scope.child();
            for &var in variables {
                scope.declare(var, Value::default_for(arena.ty(var)));
            }
            scope
        });
        let outer = std::mem::replace(&mut self.state.scope, scope);
        let result = self.eval_statements(&arena, statements, ty);
        let inner = std::mem::replace(&mut self.state.scope, outer);
        if matches!(result, Ok(ref flow) if flow.is_yield_return()) {
            self.state.save(id, SavedState::Scope(inner));
        }
        result
    }

    /// Run block statements in order. A goto to a label that is one of the
    /// statements continues right after that label.
    fn eval_statements(
        &mut self,
        arena: &ExprArena,
        statements: &[ExprId],
        ty: ExprType,
    ) -> FlowResult {
        let mut last = Flow::NEXT_STATEMENT;
        let mut index = 0;
        while let Some(&statement) = statements.get(index) {
            match self.eval(statement)? {
                Flow::Signal(ControlFlow::Goto { label, value }) => {
                    let Some(target) = label_position(arena, statements, label) else {
                        return Ok(Flow::Signal(ControlFlow::Goto { label, value }));
                    };
                    last = Flow::completion(value, arena.label_def(label).ty.is_void());
                    index = target + 1;
                    continue;
                }
                Flow::Signal(signal @ (ControlFlow::YieldReturn(_) | ControlFlow::YieldBreak)) => {
                    return Ok(Flow::Signal(signal));
                }
                flow => last = flow,
            }
            index += 1;
        }
        if self.state.is_resuming() {
            return Ok(Flow::NEXT_FOR_YIELD);
        }
        if ty.is_void() {
            Ok(Flow::NEXT_STATEMENT)
        } else {
            Ok(Flow::Value(last.into_value()))
        }
    }

    pub(super) fn eval_loop(
        &mut self,
        body: ExprId,
        break_label: Option<LabelId>,
        continue_label: Option<LabelId>,
        ty: ExprType,
    ) -> FlowResult {
        loop {
            match self.eval(body)? {
                Flow::Signal(ControlFlow::Goto { label, value }) if Some(label) == break_label => {
                    return Ok(Flow::completion(value, ty.is_void()));
                }
                Flow::Signal(ControlFlow::Goto { label, .. }) if Some(label) == continue_label => {}
                Flow::Signal(
                    signal @ (ControlFlow::Goto { .. }
                    | ControlFlow::YieldReturn(_)
                    | ControlFlow::YieldBreak),
                ) => return Ok(Flow::Signal(signal)),
                _ => {}
            }
            // The body did not hold the resumption point.
            skip_while_resuming!(self);
        }
    }

    pub(super) fn eval_label(
        &mut self,
        label: LabelId,
        default: Option<ExprId>,
        ty: ExprType,
    ) -> FlowResult {
        let Some(default) = default else {
            skip_while_resuming!(self);
            return Ok(Flow::completion(None, ty.is_void()));
        };
        match self.eval(default)? {
            Flow::Signal(ControlFlow::Goto { label: target, value }) if target == label => {
                Ok(Flow::completion(value, ty.is_void()))
            }
            flow => Ok(flow),
        }
    }

    pub(super) fn eval_goto(&mut self, label: LabelId, value: Option<ExprId>) -> FlowResult {
        let value = match value {
            Some(value) => Some(eval_child!(self, value).into_value()),
            None => None,
        };
        skip_while_resuming!(self);
        Ok(Flow::Signal(ControlFlow::Goto { label, value }))
    }

    /// Integer switch. Execution starts at the first matching case (or the
    /// default case) and falls through until a goto to `break_label`.
    pub(super) fn eval_switch(
        &mut self,
        test: ExprId,
        cases: CaseRange,
        break_label: LabelId,
    ) -> FlowResult {
        let arena = self.arena.clone();
        let cases = arena.cases(cases);
        let test = eval_child!(self, test);
        let start = if test.is_next_for_yield() || self.state.is_resuming() {
            0
        } else {
            let value = match test.into_value() {
                Value::I32(value) => value,
                other => return Err(invalid_cast(other.type_name(), "Int32")),
            };
            let matching = cases
                .iter()
                .position(|case| case.value == Some(value))
                .or_else(|| cases.iter().position(|case| case.value.is_none()));
            match matching {
                Some(start) => start,
                None => return Ok(Flow::NEXT_STATEMENT),
            }
        };
        for case in &cases[start..] {
            match self.eval(case.body)? {
                Flow::Signal(ControlFlow::Goto { label, .. }) if label == break_label => {
                    return Ok(Flow::NEXT_STATEMENT);
                }
                Flow::Signal(
                    signal @ (ControlFlow::Goto { .. }
                    | ControlFlow::YieldReturn(_)
                    | ControlFlow::YieldBreak),
                ) => return Ok(Flow::Signal(signal)),
                _ => {}
            }
        }
        skip_while_resuming!(self);
        Ok(Flow::NEXT_STATEMENT)
    }
}

/// Index of the statement defining `label`, if it is a direct child.
fn label_position(arena: &ExprArena, statements: &[ExprId], label: LabelId) -> Option<usize> {
    statements.iter().position(
        |&statement| matches!(arena.kind(statement), ExprKind::Label { label: l, .. } if l == label),
    )
}
