//! Host methods, constructors and their parameters.

use std::fmt;
use std::sync::Arc;

use bitflags::bitflags;
use vesta_ir::ExprType;

use super::ObjectRef;
use crate::errors::{missing_implementation, wrong_arg_count, EvalError, EvalResult};
use crate::value::Value;

bitflags! {
    /// Visibility and dispatch attributes of a method or constructor.
    #[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
    pub struct MethodFlags: u16 {
        const PUBLIC = 1;
        const PROTECTED = 1 << 1;
        const PRIVATE = 1 << 2;
        const STATIC = 1 << 3;
        const VIRTUAL = 1 << 4;
        const ABSTRACT = 1 << 5;
        /// Virtual but not overridable further.
        const FINAL = 1 << 6;
        /// Property accessor or operator (`get_X`, `set_X`, `get_Item`).
        const SPECIAL_NAME = 1 << 7;
    }
}

/// Native method body: `this` (or `Null` for static methods) and arguments.
pub type NativeFn = Arc<dyn Fn(&Value, &mut [Value]) -> EvalResult + Send + Sync>;

/// Native constructor body, run on a freshly allocated object.
pub type CtorFn = Arc<dyn Fn(&ObjectRef, &mut [Value]) -> Result<(), EvalError> + Send + Sync>;

/// A formal parameter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParamDef {
    pub name: String,
    pub ty: ExprType,
    /// `ref`/`out` parameter: the callee writes its argument slot back.
    pub by_ref: bool,
    /// Trailing parameter collecting extra arguments into an array.
    pub params_array: bool,
}

impl ParamDef {
    pub fn new(name: impl Into<String>, ty: ExprType) -> Self {
        ParamDef {
            name: name.into(),
            ty,
            by_ref: false,
            params_array: false,
        }
    }

    #[must_use]
    pub fn by_ref(mut self) -> Self {
        self.by_ref = true;
        self
    }

    #[must_use]
    pub fn params_array(mut self) -> Self {
        self.params_array = true;
        self
    }
}

pub enum MethodBody {
    Native(NativeFn),
    Abstract,
}

/// A method declared on a host type.
pub struct HostMethod {
    name: String,
    declaring: String,
    params: Vec<ParamDef>,
    return_type: ExprType,
    flags: MethodFlags,
    body: MethodBody,
}

/// Shared handle to a method.
pub type MethodRef = Arc<HostMethod>;

impl HostMethod {
    pub fn new(
        name: impl Into<String>,
        params: Vec<ParamDef>,
        return_type: ExprType,
        flags: MethodFlags,
        body: MethodBody,
    ) -> Self {
        HostMethod {
            name: name.into(),
            declaring: String::new(),
            params,
            return_type,
            flags,
            body,
        }
    }

    /// A method with a native body.
    pub fn native<F>(
        name: impl Into<String>,
        params: Vec<ParamDef>,
        return_type: ExprType,
        flags: MethodFlags,
        f: F,
    ) -> Self
    where
        F: Fn(&Value, &mut [Value]) -> EvalResult + Send + Sync + 'static,
    {
        Self::new(name, params, return_type, flags, MethodBody::Native(Arc::new(f)))
    }

    /// An abstract method. Forces `VIRTUAL | ABSTRACT`.
    pub fn abstract_method(
        name: impl Into<String>,
        params: Vec<ParamDef>,
        return_type: ExprType,
        flags: MethodFlags,
    ) -> Self {
        Self::new(
            name,
            params,
            return_type,
            flags | MethodFlags::VIRTUAL | MethodFlags::ABSTRACT,
            MethodBody::Abstract,
        )
    }

    pub(super) fn set_declaring(&mut self, declaring: &str) {
        declaring.clone_into(&mut self.declaring);
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name of the type that declares this method.
    pub fn declaring_type(&self) -> &str {
        &self.declaring
    }

    pub fn params(&self) -> &[ParamDef] {
        &self.params
    }

    pub fn arity(&self) -> usize {
        self.params.len()
    }

    pub fn return_type(&self) -> ExprType {
        self.return_type
    }

    pub fn flags(&self) -> MethodFlags {
        self.flags
    }

    pub fn is_static(&self) -> bool {
        self.flags.contains(MethodFlags::STATIC)
    }

    pub fn is_virtual(&self) -> bool {
        self.flags.contains(MethodFlags::VIRTUAL)
    }

    pub fn is_abstract(&self) -> bool {
        self.flags.contains(MethodFlags::ABSTRACT)
    }

    pub fn is_final(&self) -> bool {
        self.flags.contains(MethodFlags::FINAL)
    }

    pub fn is_public(&self) -> bool {
        self.flags.contains(MethodFlags::PUBLIC)
    }

    pub fn is_protected(&self) -> bool {
        self.flags.contains(MethodFlags::PROTECTED)
    }

    pub fn is_special_name(&self) -> bool {
        self.flags.contains(MethodFlags::SPECIAL_NAME)
    }

    /// Whether the last parameter collects extra arguments.
    pub fn has_params_array(&self) -> bool {
        self.params.last().is_some_and(|p| p.params_array)
    }

    pub fn has_by_ref_params(&self) -> bool {
        self.params.iter().any(|p| p.by_ref)
    }

    /// Same name and same parameter list.
    pub fn same_signature(&self, other: &HostMethod) -> bool {
        self.name == other.name
            && self.params.len() == other.params.len()
            && self
                .params
                .iter()
                .zip(&other.params)
                .all(|(a, b)| a.ty == b.ty && a.by_ref == b.by_ref)
    }

    /// Invoke this exact body, without virtual dispatch.
    pub fn invoke(&self, this: &Value, args: &mut [Value]) -> EvalResult {
        if args.len() != self.params.len() {
            return Err(wrong_arg_count(&self.name, self.params.len(), args.len()));
        }
        match &self.body {
            MethodBody::Native(f) => f(this, args),
            MethodBody::Abstract => Err(missing_implementation(&self.declaring, &self.name)),
        }
    }
}

impl fmt::Debug for HostMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}/{}", self.declaring, self.name, self.params.len())
    }
}

/// A constructor declared on a host type.
pub struct HostConstructor {
    params: Vec<ParamDef>,
    flags: MethodFlags,
    body: CtorFn,
}

impl HostConstructor {
    pub fn new<F>(params: Vec<ParamDef>, flags: MethodFlags, f: F) -> Self
    where
        F: Fn(&ObjectRef, &mut [Value]) -> Result<(), EvalError> + Send + Sync + 'static,
    {
        HostConstructor {
            params,
            flags,
            body: Arc::new(f),
        }
    }

    pub fn params(&self) -> &[ParamDef] {
        &self.params
    }

    pub fn arity(&self) -> usize {
        self.params.len()
    }

    pub fn flags(&self) -> MethodFlags {
        self.flags
    }

    pub fn is_public(&self) -> bool {
        self.flags.contains(MethodFlags::PUBLIC)
    }

    pub fn is_protected(&self) -> bool {
        self.flags.contains(MethodFlags::PROTECTED)
    }

    /// Run the constructor body on an allocated object.
    pub fn run(&self, this: &ObjectRef, args: &mut [Value]) -> Result<(), EvalError> {
        if args.len() != self.params.len() {
            return Err(wrong_arg_count(".ctor", self.params.len(), args.len()));
        }
        (self.body)(this, args)
    }
}

impl fmt::Debug for HostConstructor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, ".ctor/{}", self.params.len())
    }
}
