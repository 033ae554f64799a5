//! Expression node kinds.
//!
//! Every kind is `Copy`: children are ids and ranges into the owning
//! [`ExprArena`](crate::ExprArena), never owned subtrees.

use crate::{
    BinaryOp, BinderId, CaseRange, CatchRange, ExprId, ExprRange, ExprType, LabelId, Name,
    SourceLocation, UnaryOp,
};

/// A constant value embedded in the tree.
#[derive(Copy, Clone, PartialEq, Debug)]
pub enum Literal {
    Null,
    Bool(bool),
    I8(i8),
    U8(u8),
    I16(i16),
    U16(u16),
    I32(i32),
    U32(u32),
    I64(i64),
    U64(u64),
    F32(f32),
    F64(f64),
    Char(char),
    Str(Name),
}

impl Literal {
    /// Static type of the literal. `Null` is typed `Object`.
    pub fn expr_type(self) -> ExprType {
        match self {
            Literal::Null => ExprType::Object,
            Literal::Bool(_) => ExprType::Bool,
            Literal::I8(_) => ExprType::I8,
            Literal::U8(_) => ExprType::U8,
            Literal::I16(_) => ExprType::I16,
            Literal::U16(_) => ExprType::U16,
            Literal::I32(_) => ExprType::I32,
            Literal::U32(_) => ExprType::U32,
            Literal::I64(_) => ExprType::I64,
            Literal::U64(_) => ExprType::U64,
            Literal::F32(_) => ExprType::F32,
            Literal::F64(_) => ExprType::F64,
            Literal::Char(_) => ExprType::Char,
            Literal::Str(_) => ExprType::Str,
        }
    }
}

/// A member of a host type, named by owner type and member name.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct MemberPath {
    pub owner: Name,
    pub member: Name,
}

impl MemberPath {
    pub const fn new(owner: Name, member: Name) -> Self {
        MemberPath { owner, member }
    }
}

/// What a `Goto` node stands for in the source language. Evaluation only
/// looks at the target label.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum GotoKind {
    Goto,
    Break,
    Continue,
    Return,
}

/// A jump target definition.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct LabelDef {
    pub name: Option<Name>,
    /// Type of the value carried by gotos to this label.
    pub ty: ExprType,
}

/// One handler of a `Try` node.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct CatchBlock {
    /// Exception type caught, matched against the host type hierarchy.
    pub test: ExprType,
    /// Variable bound to the caught exception for the filter and body.
    pub variable: Option<ExprId>,
    pub filter: Option<ExprId>,
    pub body: ExprId,
}

/// One case of a `Switch` node. `value: None` is the default case.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct SwitchCase {
    pub value: Option<i32>,
    pub body: ExprId,
}

/// Expression node kind.
#[derive(Copy, Clone, PartialEq, Debug)]
pub enum ExprKind {
    Constant(Literal),
    /// A variable. Its identity is the node's `ExprId`.
    Parameter {
        name: Name,
    },
    Unary {
        op: UnaryOp,
        operand: ExprId,
    },
    Binary {
        op: BinaryOp,
        left: ExprId,
        right: ExprId,
    },
    /// Instance test (`exact: false`) or exact runtime type test.
    TypeIs {
        operand: ExprId,
        test: ExprType,
        exact: bool,
    },
    /// Assignment to a variable, member or index node.
    Assign {
        target: ExprId,
        value: ExprId,
    },
    /// Method call; `receiver: None` calls a static method.
    Call {
        receiver: Option<ExprId>,
        method: MemberPath,
        args: ExprRange,
    },
    /// Call of a function value.
    Invoke {
        callee: ExprId,
        args: ExprRange,
    },
    /// Field or property read; `object: None` reads a static member.
    Member {
        object: Option<ExprId>,
        member: MemberPath,
    },
    /// Array element or indexer access.
    Index {
        object: ExprId,
        args: ExprRange,
    },
    New {
        owner: Name,
        args: ExprRange,
    },
    NewArrayInit {
        element: ExprType,
        items: ExprRange,
    },
    NewArrayBounds {
        element: ExprType,
        bounds: ExprRange,
    },
    Conditional {
        test: ExprId,
        if_true: ExprId,
        if_false: ExprId,
    },
    Block {
        variables: ExprRange,
        body: ExprRange,
    },
    Loop {
        body: ExprId,
        break_label: Option<LabelId>,
        continue_label: Option<LabelId>,
    },
    Label {
        label: LabelId,
        default: Option<ExprId>,
    },
    Goto {
        label: LabelId,
        value: Option<ExprId>,
        kind: GotoKind,
    },
    /// Integer switch with fall-through until a goto to `break_label`.
    Switch {
        test: ExprId,
        cases: CaseRange,
        break_label: LabelId,
    },
    Try {
        body: ExprId,
        handlers: CatchRange,
        finally: Option<ExprId>,
        fault: Option<ExprId>,
    },
    /// `value: None` rethrows the exception being handled.
    Throw {
        value: Option<ExprId>,
    },
    Lambda {
        name: Name,
        params: ExprRange,
        body: ExprId,
        return_label: Option<LabelId>,
    },
    /// Evaluates to an enumerator, or to a re-enumerable sequence when
    /// `enumerable` is set. A goto to `label` ends the iteration.
    Generator {
        body: ExprId,
        label: Option<LabelId>,
        enumerable: bool,
    },
    /// `value: None` is a yield break.
    Yield {
        value: Option<ExprId>,
    },
    /// Late-bound operation resolved by the binder at run time.
    Dynamic {
        binder: BinderId,
        args: ExprRange,
    },
    RuntimeVariables {
        variables: ExprRange,
    },
    DebugInfo {
        location: SourceLocation,
        body: ExprId,
    },
    /// Default value of the node's static type.
    Default,
}

impl ExprKind {
    /// Short name of the node kind for diagnostics.
    pub fn name(&self) -> &'static str {
        match self {
            ExprKind::Constant(_) => "constant",
            ExprKind::Parameter { .. } => "parameter",
            ExprKind::Unary { .. } => "unary",
            ExprKind::Binary { .. } => "binary",
            ExprKind::TypeIs { .. } => "type test",
            ExprKind::Assign { .. } => "assign",
            ExprKind::Call { .. } => "call",
            ExprKind::Invoke { .. } => "invoke",
            ExprKind::Member { .. } => "member",
            ExprKind::Index { .. } => "index",
            ExprKind::New { .. } => "new",
            ExprKind::NewArrayInit { .. } => "new array",
            ExprKind::NewArrayBounds { .. } => "new array bounds",
            ExprKind::Conditional { .. } => "conditional",
            ExprKind::Block { .. } => "block",
            ExprKind::Loop { .. } => "loop",
            ExprKind::Label { .. } => "label",
            ExprKind::Goto { .. } => "goto",
            ExprKind::Switch { .. } => "switch",
            ExprKind::Try { .. } => "try",
            ExprKind::Throw { .. } => "throw",
            ExprKind::Lambda { .. } => "lambda",
            ExprKind::Generator { .. } => "generator",
            ExprKind::Yield { .. } => "yield",
            ExprKind::Dynamic { .. } => "dynamic",
            ExprKind::RuntimeVariables { .. } => "runtime variables",
            ExprKind::DebugInfo { .. } => "debug info",
            ExprKind::Default => "default",
        }
    }
}

/// An expression node: kind plus static result type.
#[derive(Copy, Clone, PartialEq, Debug)]
pub struct Expr {
    pub kind: ExprKind,
    pub ty: ExprType,
}
