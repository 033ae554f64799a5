//! Vesta Object - the host object model shared by the interpreter and the
//! type emitter.
//!
//! # Architecture
//!
//! - `Value`: runtime values, with `Arc`-enforced heap payloads
//! - `EvalError` / `EvalErrorKind`: structured errors mapped onto host
//!   exception types
//! - `host`: host types, methods, constructors, objects and the
//!   `TypeRegistry`
//! - `Callable` / `NativeObject`: seams for function values and native
//!   runtime objects defined by other crates

mod callable;
pub mod errors;
pub mod host;
mod value;

pub use callable::{Callable, NativeObject, StrongBox};
pub use errors::{EvalBacktrace, BacktraceFrame, EvalError, EvalErrorKind, EvalResult};
pub use host::{
    FieldDef, FieldFlags, HostConstructor, HostMethod, HostType, HostTypeId, MethodBody,
    MethodFlags, MethodRef, ObjectRef, ParamDef, TypeBuilder, TypeFlags, TypeRef, TypeRegistry,
};
pub use value::{ArrayValue, FunctionRef, Heap, NativeRef, QuotedExpr, Value};
