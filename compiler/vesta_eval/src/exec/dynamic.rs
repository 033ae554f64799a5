//! Dynamic nodes and their call sites.
//!
//! # Promotion
//!
//! Every `Dynamic` node has an entry in its script's call-site cache,
//! keyed by arena and node. The entry counts evaluations. While the count
//! is at or below the configured threshold the node is bound afresh on each
//! evaluation and the binding's expression is interpreted. Past the
//! threshold the entry gets a [`CallSite`] and all further evaluations go
//! through it.
//!
//! A call site uses the binder's compiled delegate when it offers one.
//! Otherwise it keeps the most recent bindings as rules and reuses the
//! first whose guard accepts the arguments.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use vesta_ir::{ArenaId, BinderId, ExprId, SharedArena};
use vesta_object::errors::internal_error;
use vesta_object::{EvalError, EvalResult, Value};

use crate::binder::{Binder, Binding, CompiledTarget};
use crate::flow::{ControlFlow, Flow};
use crate::interpreter::Interpreter;
use crate::state::Scope;
use crate::ScriptCode;

/// Rules kept per call site; the oldest is evicted first.
const MAX_RULES: usize = 10;

/// Identity of a dynamic node across arenas.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub(crate) struct SiteKey {
    arena: ArenaId,
    node: ExprId,
}

impl SiteKey {
    pub(crate) fn new(arena: ArenaId, node: ExprId) -> Self {
        SiteKey { arena, node }
    }
}

/// Cache entry of one dynamic node.
#[derive(Default)]
pub(crate) struct CallSiteInfo {
    pub(crate) counter: u32,
    pub(crate) site: Option<Arc<CallSite>>,
}

enum SiteTarget {
    Compiled(CompiledTarget),
    Rules(RwLock<Vec<Arc<Binding>>>),
}

/// A promoted dynamic node.
pub struct CallSite {
    binder: Arc<dyn Binder>,
    arity: usize,
    target: SiteTarget,
}

impl CallSite {
    pub(crate) fn new(binder: Arc<dyn Binder>, arity: usize) -> Self {
        let target = match binder.compile(arity) {
            Some(compiled) => SiteTarget::Compiled(compiled),
            None => SiteTarget::Rules(RwLock::new(Vec::new())),
        };
        CallSite {
            binder,
            arity,
            target,
        }
    }

    /// Operand count, target included.
    pub fn arity(&self) -> usize {
        self.arity
    }

    pub fn is_compiled(&self) -> bool {
        matches!(self.target, SiteTarget::Compiled(_))
    }

    /// Number of cached rules; always zero for a compiled site.
    pub fn rule_count(&self) -> usize {
        match &self.target {
            SiteTarget::Compiled(_) => 0,
            SiteTarget::Rules(rules) => rules.read().len(),
        }
    }

    pub(crate) fn invoke(&self, script: &Arc<ScriptCode>, args: &[Value]) -> EvalResult {
        if args.len() != self.arity {
            return Err(internal_error(format!(
                "call site of arity {} invoked with {} operands",
                self.arity,
                args.len()
            )));
        }
        let rules = match &self.target {
            SiteTarget::Compiled(compiled) => return compiled(args),
            SiteTarget::Rules(rules) => rules,
        };
        // Guards run guest code, so they are evaluated outside the lock.
        let snapshot: Vec<Arc<Binding>> = rules.read().clone();
        for rule in snapshot.iter().rev() {
            if binding_applies(script, rule, args)? {
                return evaluate_binding(script, rule, args);
            }
        }
        let binding = Arc::new(bind(self.binder.as_ref(), args)?);
        verify_binding(script, &binding, args)?;
        {
            let mut rules = rules.write();
            if rules.len() >= MAX_RULES {
                rules.remove(0);
            }
            rules.push(Arc::clone(&binding));
        }
        evaluate_binding(script, &binding, args)
    }
}

impl fmt::Debug for CallSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallSite")
            .field("binder", &self.binder)
            .field("arity", &self.arity)
            .field("compiled", &self.is_compiled())
            .field("rules", &self.rule_count())
            .finish()
    }
}

/// Evaluate a dynamic node whose operands (target first) are `args`.
pub(crate) fn invoke_dynamic(
    script: &Arc<ScriptCode>,
    arena: &SharedArena,
    node: ExprId,
    binder: BinderId,
    args: &[Value],
) -> EvalResult {
    let binder = Arc::clone(script.binder(binder)?);
    let site = {
        let mut sites = script.call_sites.lock();
        let info = sites.entry(SiteKey::new(arena.id(), node)).or_default();
        info.counter = info.counter.saturating_add(1);
        let count = info.counter;
        if script.config().should_compile_site(count) {
            let site = info.site.get_or_insert_with(|| {
                tracing::debug!(?node, count, arity = args.len(), "promoting dynamic node to a call site");
                Arc::new(CallSite::new(Arc::clone(&binder), args.len()))
            });
            Some(Arc::clone(site))
        } else {
            None
        }
    };
    if let Some(site) = site {
        return site.invoke(script, args);
    }
    let binding = bind(binder.as_ref(), args)?;
    verify_binding(script, &binding, args)?;
    evaluate_binding(script, &binding, args)
}

fn bind(binder: &dyn Binder, args: &[Value]) -> Result<Binding, EvalError> {
    let Some((target, rest)) = args.split_first() else {
        return Err(internal_error("dynamic node without a target operand"));
    };
    binder.bind(target, rest)
}

/// Fail if a fresh binding's guard rejects the arguments it was bound for.
fn verify_binding(
    script: &Arc<ScriptCode>,
    binding: &Binding,
    args: &[Value],
) -> Result<(), EvalError> {
    if !script.config().verifies_bindings() || binding_applies(script, binding, args)? {
        return Ok(());
    }
    Err(internal_error(
        "binding does not apply to the arguments it was produced for",
    ))
}

fn binding_applies(
    script: &Arc<ScriptCode>,
    binding: &Binding,
    args: &[Value],
) -> Result<bool, EvalError> {
    let Some(guard) = binding.guard else {
        return Ok(true);
    };
    match run_binding(script, binding, guard, args)? {
        Value::Bool(applies) => Ok(applies),
        other => Err(internal_error(format!(
            "binding guard produced {} instead of a Boolean",
            other.type_name()
        ))),
    }
}

fn evaluate_binding(script: &Arc<ScriptCode>, binding: &Binding, args: &[Value]) -> EvalResult {
    run_binding(script, binding, binding.expression, args)
}

/// Interpret `expr` of a binding with its parameters bound to `args`.
fn run_binding(
    script: &Arc<ScriptCode>,
    binding: &Binding,
    expr: ExprId,
    args: &[Value],
) -> EvalResult {
    if binding.parameters.len() != args.len() {
        return Err(internal_error(format!(
            "binding takes {} parameters but the node has {} operands",
            binding.parameters.len(),
            args.len()
        )));
    }
    let scope = Scope::root();
    for (&param, arg) in binding.parameters.iter().zip(args) {
        scope.declare(param, arg.clone());
    }
    match Interpreter::run_detached(script, &binding.arena, scope, expr)? {
        Flow::Value(value) => Ok(value),
        Flow::Signal(ControlFlow::NextStatement) => Ok(Value::Null),
        Flow::Signal(signal) => Err(internal_error(format!(
            "{} signal escaped a dynamic binding",
            signal.kind_name()
        ))),
    }
}
