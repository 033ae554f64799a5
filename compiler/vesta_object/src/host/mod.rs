//! The host object system.
//!
//! Host types with single inheritance, interfaces, virtual and abstract
//! methods, constructors, instance and static fields. The interpreter calls
//! into it; the type emitter derives new types from it at run time.

mod builtins;
mod method;
mod object;
mod registry;
mod ty;

pub use method::{
    CtorFn, HostConstructor, HostMethod, MethodBody, MethodFlags, MethodRef, NativeFn, ParamDef,
};
pub use object::ObjectRef;
pub use registry::TypeRegistry;
pub use ty::{FieldDef, FieldFlags, HostType, HostTypeId, TypeBuilder, TypeFlags, TypeRef};
