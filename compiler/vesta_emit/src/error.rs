//! Emission request errors.

use thiserror::Error;

/// A type request that cannot be satisfied. Raised before any emission
/// work starts.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum EmitError {
    /// Sealed types and interfaces cannot be derived from.
    #[error("cannot derive a guest type from `{0}`: the type is sealed")]
    SealedBase(String),

    #[error("`{0}` was requested as an interface but is a class")]
    NotAnInterface(String),
}
