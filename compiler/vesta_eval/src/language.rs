//! Guest language hooks.

use vesta_object::EvalError;

use crate::state::Frame;

/// Services a guest language provides to the interpreter.
pub trait LanguageContext: Send + Sync {
    /// Called for every error raised by a guest `throw`
    /// (`is_interpreted_throw`) or escaping a host call, before it
    /// propagates. The default attaches the guest backtrace and the frame's
    /// source location, keeping any backtrace the error already carries.
    fn interpret_exception_throw(
        &self,
        frame: &Frame,
        error: EvalError,
        is_interpreted_throw: bool,
    ) -> EvalError {
        let _ = is_interpreted_throw;
        if error.backtrace.is_some() {
            return error;
        }
        let error = match (error.location, frame.location()) {
            (None, Some(location)) => error.with_location(location),
            _ => error,
        };
        error.with_backtrace(frame.backtrace())
    }
}

/// Language context with the default hooks.
#[derive(Copy, Clone, Debug, Default)]
pub struct DefaultLanguageContext;

impl LanguageContext for DefaultLanguageContext {}
