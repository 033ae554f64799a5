//! Vesta Eval - tree-walking interpreter for Vesta expression trees.
//!
//! # Architecture
//!
//! The evaluator uses:
//! - `Interpreter`: node dispatch over one arena, one activation state
//! - `Flow` / `ControlFlow`: values and control-flow signals returned by
//!   every node
//! - `InterpreterState`: scopes, the generator yield marker and saved
//!   partial work of suspended nodes
//! - `ScriptCode`: the arena, entry lambda and run-time services of a unit
//!   of guest code, including its dynamic call-site cache
//! - `evaluate_binary` / `evaluate_unary`: direct enum-based operator
//!   dispatch over host values
//! - `InterpretedFunction`, `GeneratorObject`, `RuntimeVariables`: values
//!   produced by lambda, generator and runtime-variables nodes
//!
//! # Re-exports
//!
//! Value and error types come from `vesta_object`; they are re-exported
//! for convenience.

mod binder;
mod config;
mod conversions;
mod exec;
mod flow;
mod function_val;
mod generator;
pub mod interpreter;
mod language;
mod operators;
mod profiler;
mod runtime_vars;
mod script;
mod stack;
mod state;
mod unary_operators;

pub use vesta_object::{EvalError, EvalErrorKind, EvalResult, Value};

pub use binder::{Binder, Binding, CompiledTarget};
pub use config::{EvalConfig, DEFAULT_SITE_COMPILE_THRESHOLD};
pub use conversions::{convert, type_as, unbox};
pub use exec::dynamic::CallSite;
pub use flow::{ControlFlow, Flow, FlowResult};
pub use function_val::InterpretedFunction;
pub use generator::{GeneratorDef, GeneratorEnumerable, GeneratorObject};
pub use interpreter::Interpreter;
pub use language::{DefaultLanguageContext, LanguageContext};
pub use operators::{array_index, evaluate_binary};
pub use profiler::{CallProfiler, CallStats};
pub use runtime_vars::RuntimeVariables;
pub use script::{ScriptCode, ScriptCodeBuilder};
pub use stack::ensure_sufficient_stack;
pub use state::{current_frame, Frame, InterpreterState, Scope};
pub use unary_operators::evaluate_unary;

use std::sync::Once;

static TRACING_INIT: Once = Once::new();

/// Initialize tracing for debug output.
///
/// Safe to call multiple times. Enable with `RUST_LOG=vesta_eval=debug`;
/// promotions of dynamic nodes log at `debug`, generator steps and node
/// evaluation at `trace`.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, prelude::*, EnvFilter};

        if std::env::var("RUST_LOG").is_ok() {
            let filter = EnvFilter::from_default_env();
            tracing_subscriber::registry()
                .with(fmt::layer().with_target(true).with_level(true))
                .with(filter)
                .init();
        }
    });
}

#[cfg(test)]
mod tests;
