//! The guest runtime seen from emitted types.
//!
//! Emitted members never know the guest language. They reach it through a
//! [`GuestRuntime`], which hands out dispatch sites and converts values,
//! and through the [`GuestCallSite`]s it creates.

use std::fmt;
use std::sync::Arc;

use vesta_ir::ExprType;
use vesta_object::{EvalError, EvalResult, Value};

/// How a site receives the arguments of the method it stands for.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum CallConvention {
    /// One argument per parameter.
    Simple,
    /// The trailing parameter is a params array the guest should splat.
    List,
}

/// Result of a guest dispatch site.
#[derive(Clone, Debug, PartialEq)]
pub enum SiteOutcome {
    /// The guest handled the call.
    Value(Value),
    /// The guest class has no override; run the base implementation.
    ForwardToBase,
}

/// A dynamic dispatch site owned by one emitted member.
pub trait GuestCallSite: Send + Sync {
    /// Dispatch to the guest override of the member on `this`. By-reference
    /// arguments arrive as `Value::Box` cells the guest may write through.
    fn invoke(&self, this: &Value, args: &mut [Value]) -> Result<SiteOutcome, EvalError>;
}

/// Services the emitted types need from the guest language.
pub trait GuestRuntime: Send + Sync + fmt::Debug {
    /// A dispatch site for the guest member `name` taking `nargs` arguments
    /// (the receiver not counted).
    fn make_call_site(
        &self,
        name: &str,
        nargs: usize,
        convention: CallConvention,
    ) -> Arc<dyn GuestCallSite>;

    /// Message for an exception created without one, given the guest class
    /// the instance belongs to.
    fn default_exception_message(&self, class: &Value) -> Value;

    /// Convert a guest result to the declared host return type.
    fn convert(&self, value: Value, ty: ExprType) -> EvalResult;

    /// Fresh per-object guest data, created on first access.
    fn create_instance_data(&self) -> Value;
}
