//! Expression arena: the owner of every node of a tree.
//!
//! # Architecture
//!
//! An `ExprArena` is built once by a front end (or by a binder producing a
//! binding) and then frozen behind a [`SharedArena`]. Node kinds are `Copy`,
//! so readers copy a node out and never keep a borrow of the arena across
//! evaluation. Child lists, catch blocks, switch cases and labels live in
//! side tables addressed by ranges.

use crate::{
    ArenaId, BinaryOp, BinderId, CaseRange, CatchBlock, CatchRange, Expr, ExprId, ExprKind,
    ExprRange, ExprType, GotoKind, LabelDef, LabelId, Literal, MemberPath, Name, SourceLocation,
    SwitchCase, UnaryOp,
};
use std::sync::Arc;

/// Owner of the nodes of one expression tree.
#[derive(Debug)]
pub struct ExprArena {
    id: ArenaId,
    exprs: Vec<Expr>,
    lists: Vec<ExprId>,
    catches: Vec<CatchBlock>,
    cases: Vec<SwitchCase>,
    labels: Vec<LabelDef>,
}

impl Default for ExprArena {
    fn default() -> Self {
        Self::new()
    }
}

fn index_u32(len: usize) -> u32 {
    u32::try_from(len).unwrap_or_else(|_| panic!("expression arena exceeded u32::MAX entries"))
}

impl ExprArena {
    pub fn new() -> Self {
        ExprArena {
            id: ArenaId::fresh(),
            exprs: Vec::new(),
            lists: Vec::new(),
            catches: Vec::new(),
            cases: Vec::new(),
            labels: Vec::new(),
        }
    }

    #[inline]
    pub fn id(&self) -> ArenaId {
        self.id
    }

    pub fn len(&self) -> usize {
        self.exprs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exprs.is_empty()
    }

    // Reading

    /// Get a node.
    ///
    /// # Panics
    /// Panics if `id` was not allocated in this arena.
    #[inline]
    pub fn get(&self, id: ExprId) -> &Expr {
        &self.exprs[id.index()]
    }

    #[inline]
    pub fn kind(&self, id: ExprId) -> ExprKind {
        self.exprs[id.index()].kind
    }

    #[inline]
    pub fn ty(&self, id: ExprId) -> ExprType {
        self.exprs[id.index()].ty
    }

    #[inline]
    pub fn exprs(&self, range: ExprRange) -> &[ExprId] {
        &self.lists[range.as_range()]
    }

    #[inline]
    pub fn catches(&self, range: CatchRange) -> &[CatchBlock] {
        &self.catches[range.as_range()]
    }

    #[inline]
    pub fn cases(&self, range: CaseRange) -> &[SwitchCase] {
        &self.cases[range.as_range()]
    }

    #[inline]
    pub fn label_def(&self, label: LabelId) -> LabelDef {
        self.labels[label.index()]
    }

    // Allocation

    pub fn alloc(&mut self, kind: ExprKind, ty: ExprType) -> ExprId {
        let id = ExprId::new(index_u32(self.exprs.len()));
        self.exprs.push(Expr { kind, ty });
        id
    }

    pub fn alloc_list(&mut self, ids: &[ExprId]) -> ExprRange {
        let start = index_u32(self.lists.len());
        self.lists.extend_from_slice(ids);
        ExprRange::new(start, index_u32(ids.len()))
    }

    pub fn alloc_catches(&mut self, handlers: &[CatchBlock]) -> CatchRange {
        let start = index_u32(self.catches.len());
        self.catches.extend_from_slice(handlers);
        CatchRange::new(start, index_u32(handlers.len()))
    }

    pub fn alloc_cases(&mut self, cases: &[SwitchCase]) -> CaseRange {
        let start = index_u32(self.cases.len());
        self.cases.extend_from_slice(cases);
        CaseRange::new(start, index_u32(cases.len()))
    }

    pub fn new_label(&mut self, name: Option<Name>, ty: ExprType) -> LabelId {
        let id = LabelId::new(index_u32(self.labels.len()));
        self.labels.push(LabelDef { name, ty });
        id
    }

    // Node builders

    pub fn constant(&mut self, value: Literal) -> ExprId {
        self.alloc(ExprKind::Constant(value), value.expr_type())
    }

    pub fn int(&mut self, value: i32) -> ExprId {
        self.constant(Literal::I32(value))
    }

    pub fn boolean(&mut self, value: bool) -> ExprId {
        self.constant(Literal::Bool(value))
    }

    pub fn null(&mut self) -> ExprId {
        self.constant(Literal::Null)
    }

    pub fn parameter(&mut self, name: Name, ty: ExprType) -> ExprId {
        self.alloc(ExprKind::Parameter { name }, ty)
    }

    pub fn unary(&mut self, op: UnaryOp, operand: ExprId, ty: ExprType) -> ExprId {
        self.alloc(ExprKind::Unary { op, operand }, ty)
    }

    pub fn binary(&mut self, op: BinaryOp, left: ExprId, right: ExprId) -> ExprId {
        let ty = if op.is_comparison() || matches!(op, BinaryOp::AndAlso | BinaryOp::OrElse) {
            ExprType::Bool
        } else if op == BinaryOp::ArrayIndex {
            ExprType::Object
        } else {
            self.ty(left)
        };
        self.alloc(ExprKind::Binary { op, left, right }, ty)
    }

    pub fn type_is(&mut self, operand: ExprId, test: ExprType) -> ExprId {
        self.alloc(
            ExprKind::TypeIs {
                operand,
                test,
                exact: false,
            },
            ExprType::Bool,
        )
    }

    pub fn type_equal(&mut self, operand: ExprId, test: ExprType) -> ExprId {
        self.alloc(
            ExprKind::TypeIs {
                operand,
                test,
                exact: true,
            },
            ExprType::Bool,
        )
    }

    pub fn assign(&mut self, target: ExprId, value: ExprId) -> ExprId {
        let ty = self.ty(target);
        self.alloc(ExprKind::Assign { target, value }, ty)
    }

    pub fn call(
        &mut self,
        receiver: Option<ExprId>,
        method: MemberPath,
        args: &[ExprId],
        ty: ExprType,
    ) -> ExprId {
        let args = self.alloc_list(args);
        self.alloc(
            ExprKind::Call {
                receiver,
                method,
                args,
            },
            ty,
        )
    }

    pub fn invoke(&mut self, callee: ExprId, args: &[ExprId], ty: ExprType) -> ExprId {
        let args = self.alloc_list(args);
        self.alloc(ExprKind::Invoke { callee, args }, ty)
    }

    pub fn member(&mut self, object: Option<ExprId>, member: MemberPath, ty: ExprType) -> ExprId {
        self.alloc(ExprKind::Member { object, member }, ty)
    }

    pub fn index(&mut self, object: ExprId, args: &[ExprId], ty: ExprType) -> ExprId {
        let args = self.alloc_list(args);
        self.alloc(ExprKind::Index { object, args }, ty)
    }

    pub fn new_object(&mut self, owner: Name, args: &[ExprId]) -> ExprId {
        let args = self.alloc_list(args);
        self.alloc(ExprKind::New { owner, args }, ExprType::Named(owner))
    }

    pub fn new_array(&mut self, element: ExprType, items: &[ExprId]) -> ExprId {
        let items = self.alloc_list(items);
        self.alloc(ExprKind::NewArrayInit { element, items }, ExprType::Array)
    }

    pub fn new_array_bounds(&mut self, element: ExprType, bounds: &[ExprId]) -> ExprId {
        let bounds = self.alloc_list(bounds);
        self.alloc(ExprKind::NewArrayBounds { element, bounds }, ExprType::Array)
    }

    pub fn condition(
        &mut self,
        test: ExprId,
        if_true: ExprId,
        if_false: ExprId,
        ty: ExprType,
    ) -> ExprId {
        self.alloc(
            ExprKind::Conditional {
                test,
                if_true,
                if_false,
            },
            ty,
        )
    }

    /// Block typed by its last statement (`Void` when empty).
    pub fn block(&mut self, variables: &[ExprId], body: &[ExprId]) -> ExprId {
        let ty = body.last().map_or(ExprType::Void, |last| self.ty(*last));
        self.block_typed(variables, body, ty)
    }

    pub fn block_typed(&mut self, variables: &[ExprId], body: &[ExprId], ty: ExprType) -> ExprId {
        let variables = self.alloc_list(variables);
        let body = self.alloc_list(body);
        self.alloc(ExprKind::Block { variables, body }, ty)
    }

    pub fn loop_expr(
        &mut self,
        body: ExprId,
        break_label: Option<LabelId>,
        continue_label: Option<LabelId>,
    ) -> ExprId {
        let ty = break_label.map_or(ExprType::Void, |l| self.label_def(l).ty);
        self.alloc(
            ExprKind::Loop {
                body,
                break_label,
                continue_label,
            },
            ty,
        )
    }

    pub fn label_expr(&mut self, label: LabelId, default: Option<ExprId>) -> ExprId {
        let ty = self.label_def(label).ty;
        self.alloc(ExprKind::Label { label, default }, ty)
    }

    pub fn goto(&mut self, label: LabelId, value: Option<ExprId>, kind: GotoKind) -> ExprId {
        self.alloc(ExprKind::Goto { label, value, kind }, ExprType::Void)
    }

    pub fn break_to(&mut self, label: LabelId) -> ExprId {
        self.goto(label, None, GotoKind::Break)
    }

    pub fn continue_to(&mut self, label: LabelId) -> ExprId {
        self.goto(label, None, GotoKind::Continue)
    }

    pub fn return_to(&mut self, label: LabelId, value: Option<ExprId>) -> ExprId {
        self.goto(label, value, GotoKind::Return)
    }

    pub fn switch(&mut self, test: ExprId, cases: &[SwitchCase], break_label: LabelId) -> ExprId {
        let cases = self.alloc_cases(cases);
        self.alloc(
            ExprKind::Switch {
                test,
                cases,
                break_label,
            },
            ExprType::Void,
        )
    }

    pub fn try_expr(
        &mut self,
        body: ExprId,
        handlers: &[CatchBlock],
        finally: Option<ExprId>,
        fault: Option<ExprId>,
    ) -> ExprId {
        let ty = self.ty(body);
        let handlers = self.alloc_catches(handlers);
        self.alloc(
            ExprKind::Try {
                body,
                handlers,
                finally,
                fault,
            },
            ty,
        )
    }

    pub fn throw(&mut self, value: ExprId) -> ExprId {
        self.alloc(ExprKind::Throw { value: Some(value) }, ExprType::Void)
    }

    pub fn rethrow(&mut self) -> ExprId {
        self.alloc(ExprKind::Throw { value: None }, ExprType::Void)
    }

    pub fn lambda(
        &mut self,
        name: Name,
        params: &[ExprId],
        body: ExprId,
        return_label: Option<LabelId>,
    ) -> ExprId {
        let ty = self.ty(body);
        let params = self.alloc_list(params);
        self.alloc(
            ExprKind::Lambda {
                name,
                params,
                body,
                return_label,
            },
            ty,
        )
    }

    pub fn generator(&mut self, body: ExprId, label: Option<LabelId>, enumerable: bool) -> ExprId {
        self.alloc(
            ExprKind::Generator {
                body,
                label,
                enumerable,
            },
            ExprType::Object,
        )
    }

    pub fn yield_return(&mut self, value: ExprId) -> ExprId {
        self.alloc(ExprKind::Yield { value: Some(value) }, ExprType::Void)
    }

    pub fn yield_break(&mut self) -> ExprId {
        self.alloc(ExprKind::Yield { value: None }, ExprType::Void)
    }

    pub fn dynamic(&mut self, binder: BinderId, args: &[ExprId], ty: ExprType) -> ExprId {
        let args = self.alloc_list(args);
        self.alloc(ExprKind::Dynamic { binder, args }, ty)
    }

    pub fn runtime_variables(&mut self, variables: &[ExprId]) -> ExprId {
        let variables = self.alloc_list(variables);
        self.alloc(ExprKind::RuntimeVariables { variables }, ExprType::Object)
    }

    pub fn debug_info(&mut self, location: SourceLocation, body: ExprId) -> ExprId {
        let ty = self.ty(body);
        self.alloc(ExprKind::DebugInfo { location, body }, ty)
    }

    pub fn default_value(&mut self, ty: ExprType) -> ExprId {
        self.alloc(ExprKind::Default, ty)
    }

    /// Freeze the arena for sharing.
    pub fn into_shared(self) -> SharedArena {
        SharedArena(Arc::new(self))
    }
}

/// A frozen, reference-counted arena.
///
/// Clones are cheap and share the same nodes, so node identity survives
/// being handed to closures, generators and quoted values.
#[derive(Clone, Debug)]
pub struct SharedArena(Arc<ExprArena>);

impl SharedArena {
    pub fn new(arena: ExprArena) -> Self {
        SharedArena(Arc::new(arena))
    }
}

impl std::ops::Deref for SharedArena {
    type Target = ExprArena;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl PartialEq for SharedArena {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for SharedArena {}
