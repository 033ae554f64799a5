//! Error types for evaluation and host calls.
//!
//! # Structured Error Categories
//!
//! `EvalErrorKind` provides typed error categories. Factory functions
//! (e.g., `division_by_zero()`) are the public API; they populate both
//! `kind` and `message`.
//!
//! Every kind maps to a host exception type name, so guest `catch` handlers
//! can match interpreter-raised errors through the host type hierarchy.
//! `Internal` and `StackOverflow` are never catchable by guest code.

use std::fmt;

use vesta_ir::SourceLocation;

use crate::value::Value;

/// Result of evaluation.
pub type EvalResult = Result<Value, EvalError>;

/// Field holding an exception object's message.
pub const MESSAGE_FIELD: &str = "_message";

/// Typed error category.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EvalErrorKind {
    /// A guest `throw` of an exception object (stored on the error).
    Thrown {
        type_name: String,
    },

    // Arithmetic
    DivisionByZero,
    Overflow {
        operation: String,
    },

    // Type/Operator
    InvalidCast {
        from: String,
        to: String,
    },
    UnsupportedOperation {
        op: String,
        type_name: String,
    },

    // Access
    NullReference,
    IndexOutOfRange {
        index: i64,
        len: usize,
    },
    UnknownType {
        name: String,
    },
    MissingMember {
        type_name: String,
        member: String,
    },

    // Calls
    ArityMismatch {
        name: String,
        expected: usize,
        got: usize,
    },
    NotCallable {
        type_name: String,
    },
    /// An abstract host method reached without a guest implementation.
    MissingImplementation {
        type_name: String,
        method: String,
    },
    /// Reflective invocation wrapper; the wrapped error is on `inner`.
    TargetInvocation,
    StackOverflow {
        depth: usize,
    },

    InvalidOperation {
        message: String,
    },

    /// Interpreter invariant violation. Never caught by guest handlers.
    Internal {
        message: String,
    },

    /// Catch-all for host errors with only a message.
    Custom {
        message: String,
    },
}

impl EvalErrorKind {
    /// Host exception type raised for this kind.
    pub fn exception_type_name(&self) -> &str {
        match self {
            Self::Thrown { type_name } => type_name,
            Self::DivisionByZero => "DivideByZeroException",
            Self::Overflow { .. } => "OverflowException",
            Self::InvalidCast { .. } => "InvalidCastException",
            Self::UnsupportedOperation { .. } => "NotSupportedException",
            Self::NullReference => "NullReferenceException",
            Self::IndexOutOfRange { .. } => "IndexOutOfRangeException",
            Self::UnknownType { .. } => "TypeLoadException",
            Self::MissingMember { .. } => "MissingMemberException",
            Self::ArityMismatch { .. } => "ArgumentException",
            Self::NotCallable { .. } | Self::InvalidOperation { .. } => {
                "InvalidOperationException"
            }
            Self::MissingImplementation { .. } => "MissingMethodException",
            Self::TargetInvocation => "TargetInvocationException",
            Self::StackOverflow { .. } => "StackOverflowException",
            Self::Internal { .. } => "InvalidProgramException",
            Self::Custom { .. } => "Exception",
        }
    }
}

impl fmt::Display for EvalErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Thrown { type_name } => write!(f, "exception of type '{type_name}' was thrown"),
            Self::DivisionByZero => write!(f, "attempted to divide by zero"),
            Self::Overflow { operation } => write!(f, "arithmetic overflow in {operation}"),
            Self::InvalidCast { from, to } => write!(f, "cannot convert {from} to {to}"),
            Self::UnsupportedOperation { op, type_name } => write!(f, "{op}: {type_name}"),
            Self::NullReference => write!(f, "object reference not set to an instance"),
            Self::IndexOutOfRange { index, len } => {
                write!(f, "index {index} out of range for length {len}")
            }
            Self::UnknownType { name } => write!(f, "unknown type: {name}"),
            Self::MissingMember { type_name, member } => {
                write!(f, "no member '{member}' on type {type_name}")
            }
            Self::ArityMismatch {
                name,
                expected,
                got,
            } => {
                let arg_word = if *expected == 1 {
                    "argument"
                } else {
                    "arguments"
                };
                if name.is_empty() {
                    write!(f, "expected {expected} {arg_word}, got {got}")
                } else {
                    write!(f, "{name} expects {expected} {arg_word}, got {got}")
                }
            }
            Self::NotCallable { type_name } => write!(f, "{type_name} is not callable"),
            Self::MissingImplementation { type_name, method } => {
                write!(f, "{type_name}.{method} has no implementation")
            }
            Self::TargetInvocation => write!(f, "exception thrown by the target of an invocation"),
            Self::StackOverflow { depth } => {
                write!(f, "maximum recursion depth exceeded (limit: {depth})")
            }
            Self::InvalidOperation { message }
            | Self::Internal { message }
            | Self::Custom { message } => write!(f, "{message}"),
        }
    }
}

/// A single frame in an evaluation backtrace.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BacktraceFrame {
    /// Lambda or method name.
    pub name: String,
    /// Last source location reached in the frame.
    pub location: Option<SourceLocation>,
}

/// Immutable snapshot of the guest call chain at an error site.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EvalBacktrace {
    frames: Vec<BacktraceFrame>,
}

impl EvalBacktrace {
    pub fn new(frames: Vec<BacktraceFrame>) -> Self {
        Self { frames }
    }

    pub fn frames(&self) -> &[BacktraceFrame] {
        &self.frames
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }
}

impl fmt::Display for EvalBacktrace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.frames.is_empty() {
            return Ok(());
        }
        writeln!(f, "stack backtrace:")?;
        for (i, frame) in self.frames.iter().enumerate() {
            write!(f, "  {i}: {}", frame.name)?;
            if let Some(location) = frame.location {
                write!(f, " at {location}")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// Evaluation error.
#[derive(Clone, Debug)]
pub struct EvalError {
    pub kind: EvalErrorKind,
    /// Human-readable error message.
    pub message: String,
    /// The guest exception object, for `Thrown` errors and for errors whose
    /// exception object was materialized by a catch handler.
    pub exception: Option<Value>,
    /// Wrapped error of a `TargetInvocation` error.
    pub inner: Option<Box<EvalError>>,
    /// Source location where the error was raised.
    pub location: Option<SourceLocation>,
    /// Guest call chain, attached once by the language context.
    pub backtrace: Option<EvalBacktrace>,
}

impl EvalError {
    /// Create an error with just a message (`Custom` kind).
    pub fn new(message: impl Into<String>) -> Self {
        Self::from_kind(EvalErrorKind::Custom {
            message: message.into(),
        })
    }

    /// Create an error from a structured kind; the message is the kind's
    /// `Display` output.
    pub fn from_kind(kind: EvalErrorKind) -> Self {
        let message = kind.to_string();
        Self {
            kind,
            message,
            exception: None,
            inner: None,
            location: None,
            backtrace: None,
        }
    }

    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    #[must_use]
    pub fn with_location(mut self, location: SourceLocation) -> Self {
        self.location = Some(location);
        self
    }

    #[must_use]
    pub fn with_backtrace(mut self, backtrace: EvalBacktrace) -> Self {
        self.backtrace = Some(backtrace);
        self
    }

    #[must_use]
    pub fn with_exception(mut self, exception: Value) -> Self {
        self.exception = Some(exception);
        self
    }

    /// Whether guest `catch` handlers may observe this error.
    pub fn is_catchable(&self) -> bool {
        !matches!(
            self.kind,
            EvalErrorKind::Internal { .. } | EvalErrorKind::StackOverflow { .. }
        )
    }

    pub fn exception_type_name(&self) -> &str {
        self.kind.exception_type_name()
    }

    /// Strip reflective-invocation wrappers, returning the innermost error
    /// with its own location and backtrace.
    #[must_use]
    pub fn unwrap_invocation(self) -> EvalError {
        let mut err = self;
        while err.kind == EvalErrorKind::TargetInvocation {
            match err.inner {
                Some(inner) => err = *inner,
                None => break,
            }
        }
        err
    }
}

impl fmt::Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(location) = self.location {
            write!(f, " at {location}")?;
        }
        Ok(())
    }
}

impl std::error::Error for EvalError {}

// Guest Exceptions

/// A guest `throw` of `exception`, an object of an exception type.
#[cold]
pub fn thrown(exception: Value) -> EvalError {
    let type_name = exception.type_name().to_string();
    let message = exception
        .as_object()
        .and_then(|o| o.get_field(MESSAGE_FIELD))
        .and_then(|m| m.as_str().map(str::to_string));
    let err = EvalError::from_kind(EvalErrorKind::Thrown { type_name });
    let err = match message {
        Some(message) => err.with_message(message),
        None => err,
    };
    err.with_exception(exception)
}

// Arithmetic Errors

#[cold]
pub fn division_by_zero() -> EvalError {
    EvalError::from_kind(EvalErrorKind::DivisionByZero)
}

#[cold]
pub fn overflow(operation: &str) -> EvalError {
    EvalError::from_kind(EvalErrorKind::Overflow {
        operation: operation.to_string(),
    })
}

// Type and Operator Errors

#[cold]
pub fn invalid_cast(from: &str, to: &str) -> EvalError {
    EvalError::from_kind(EvalErrorKind::InvalidCast {
        from: from.to_string(),
        to: to.to_string(),
    })
}

/// An operator applied to an operand type it has no code path for.
#[cold]
pub fn unsupported_operation(op: &str, type_name: &str) -> EvalError {
    EvalError::from_kind(EvalErrorKind::UnsupportedOperation {
        op: op.to_string(),
        type_name: type_name.to_string(),
    })
}

// Access Errors

#[cold]
pub fn null_reference() -> EvalError {
    EvalError::from_kind(EvalErrorKind::NullReference)
}

#[cold]
pub fn index_out_of_range(index: i64, len: usize) -> EvalError {
    EvalError::from_kind(EvalErrorKind::IndexOutOfRange { index, len })
}

#[cold]
pub fn unknown_type(name: &str) -> EvalError {
    EvalError::from_kind(EvalErrorKind::UnknownType {
        name: name.to_string(),
    })
}

#[cold]
pub fn missing_member(type_name: &str, member: &str) -> EvalError {
    EvalError::from_kind(EvalErrorKind::MissingMember {
        type_name: type_name.to_string(),
        member: member.to_string(),
    })
}

// Call Errors

#[cold]
pub fn wrong_arg_count(name: &str, expected: usize, got: usize) -> EvalError {
    EvalError::from_kind(EvalErrorKind::ArityMismatch {
        name: name.to_string(),
        expected,
        got,
    })
}

#[cold]
pub fn not_callable(type_name: &str) -> EvalError {
    EvalError::from_kind(EvalErrorKind::NotCallable {
        type_name: type_name.to_string(),
    })
}

#[cold]
pub fn missing_implementation(type_name: &str, method: &str) -> EvalError {
    EvalError::from_kind(EvalErrorKind::MissingImplementation {
        type_name: type_name.to_string(),
        method: method.to_string(),
    })
}

/// Wrap an error raised by the target of a reflective invocation.
#[cold]
pub fn target_invocation(inner: EvalError) -> EvalError {
    let mut err = EvalError::from_kind(EvalErrorKind::TargetInvocation);
    err.inner = Some(Box::new(inner));
    err
}

#[cold]
pub fn recursion_limit_exceeded(limit: usize) -> EvalError {
    EvalError::from_kind(EvalErrorKind::StackOverflow { depth: limit })
}

// Invalid Programs

#[cold]
pub fn invalid_operation(message: impl Into<String>) -> EvalError {
    EvalError::from_kind(EvalErrorKind::InvalidOperation {
        message: message.into(),
    })
}

#[cold]
pub fn internal_error(message: impl Into<String>) -> EvalError {
    EvalError::from_kind(EvalErrorKind::Internal {
        message: message.into(),
    })
}
