//! Vesta IR - expression trees for the Vesta interpreter and type emitter.
//!
//! # Architecture
//!
//! - `Name` / `StringInterner`: interned identifiers and string literals
//! - `ExprArena` / `ExprId`: flattened expression trees with `Copy` nodes
//! - `ExprKind`: node kinds, including control flow, exception handling,
//!   generators and late-bound (dynamic) operations
//! - `ExprType`: static result types
//!
//! The IR is language neutral: a front end (or a binder producing a binding)
//! builds an arena once and shares it frozen behind a `SharedArena`.

mod arena;
mod expr;
mod expr_id;
mod interner;
mod location;
mod name;
mod ops;
mod ty;

pub use arena::{ExprArena, SharedArena};
pub use expr::{CatchBlock, Expr, ExprKind, GotoKind, LabelDef, Literal, MemberPath, SwitchCase};
pub use expr_id::{ArenaId, BinderId, CaseRange, CatchRange, ExprId, ExprRange, LabelId};
pub use interner::{InternError, SharedInterner, StringInterner};
pub use location::SourceLocation;
pub use name::Name;
pub use ops::{BinaryOp, UnaryOp};
pub use ty::ExprType;
