//! Dynamic nodes: binding, promotion to call sites, rule reuse and
//! compiled delegates.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use pretty_assertions::assert_eq;
use vesta_ir::{BinaryOp, BinderId, ExprArena, ExprId, ExprType, SharedArena};
use vesta_object::{EvalError, EvalErrorKind, Value};

use super::{registry_with, Tree};
use crate::{Binder, Binding, CompiledTarget, EvalConfig, Interpreter, ScriptCode};

/// Binds `target + arg`, guarded by `target is Int32`.
#[derive(Debug)]
struct AddBinder {
    arena: SharedArena,
    params: [ExprId; 2],
    sum: ExprId,
    guard: ExprId,
    binds: AtomicUsize,
    compiled: bool,
}

impl AddBinder {
    fn new(guard_holds: bool, compiled: bool) -> Arc<Self> {
        let mut arena = ExprArena::new();
        let interner = vesta_ir::SharedInterner::new();
        let target = arena.parameter(interner.intern("target"), ExprType::Object);
        let arg = arena.parameter(interner.intern("arg"), ExprType::Object);
        let sum = arena.binary(BinaryOp::Add, target, arg);
        let guard = if guard_holds {
            arena.type_is(target, ExprType::I32)
        } else {
            arena.boolean(false)
        };
        Arc::new(AddBinder {
            arena: arena.into_shared(),
            params: [target, arg],
            sum,
            guard,
            binds: AtomicUsize::new(0),
            compiled,
        })
    }

    fn binds(&self) -> usize {
        self.binds.load(Ordering::SeqCst)
    }
}

impl Binder for AddBinder {
    fn bind(&self, _target: &Value, _args: &[Value]) -> Result<Binding, EvalError> {
        self.binds.fetch_add(1, Ordering::SeqCst);
        Ok(Binding::new(self.arena.clone(), self.params.to_vec(), self.sum).with_guard(self.guard))
    }

    fn compile(&self, arity: usize) -> Option<CompiledTarget> {
        (self.compiled && arity == 2).then(|| -> CompiledTarget { Arc::new(|_| Ok(Value::I32(99))) })
    }
}

/// `main(x) => dynamic#0(x, 1)`
fn dynamic_script(binder: Arc<AddBinder>, config: EvalConfig) -> (Arc<ScriptCode>, ExprId) {
    let mut t = Tree::new();
    let x = t.var("x", ExprType::I32);
    let one = t.arena.int(1);
    let node = t.arena.dynamic(BinderId::new(0), &[x, one], ExprType::Object);
    let entry = t.lambda(&[x], node);
    let registry = registry_with(&[]);
    let script = t.script_with(entry, |b| b.registry(registry).binder(binder).config(config));
    (script, node)
}

fn call(script: &Arc<ScriptCode>, x: i32) -> Result<Value, EvalError> {
    Interpreter::top_level_execute(script, &mut [Value::I32(x)])
}

#[test]
fn nodes_bind_until_promoted_then_reuse_rules() {
    let binder = AddBinder::new(true, false);
    let (script, node) = dynamic_script(Arc::clone(&binder), EvalConfig::default());

    for x in 0..5 {
        assert_eq!(call(&script, x).unwrap(), Value::I32(x + 1));
    }
    // Two interpreted evaluations, then one bind that seeds the rule cache.
    assert_eq!(binder.binds(), 3);
    assert_eq!(script.site_invocations(node), Some(5));
    assert!(script.has_call_site(node));
}

#[test]
fn nodes_below_the_threshold_have_no_call_site() {
    let binder = AddBinder::new(true, false);
    let (script, node) = dynamic_script(Arc::clone(&binder), EvalConfig::default());
    assert_eq!(script.site_invocations(node), None);

    call(&script, 1).unwrap();
    call(&script, 2).unwrap();
    assert_eq!(script.site_invocations(node), Some(2));
    assert!(!script.has_call_site(node));
}

#[test]
fn zero_threshold_promotes_on_first_evaluation() {
    let binder = AddBinder::new(true, false);
    let config = EvalConfig {
        site_compile_threshold: 0,
        ..EvalConfig::default()
    };
    let (script, node) = dynamic_script(Arc::clone(&binder), config);
    call(&script, 1).unwrap();
    assert!(script.has_call_site(node));
    call(&script, 2).unwrap();
    assert_eq!(binder.binds(), 1);
}

#[test]
fn promoted_sites_use_the_compiled_delegate() {
    let binder = AddBinder::new(true, true);
    let (script, _) = dynamic_script(Arc::clone(&binder), EvalConfig::default());
    let results: Vec<Value> = (0..4).map(|x| call(&script, x).unwrap()).collect();
    assert_eq!(
        results,
        vec![Value::I32(1), Value::I32(2), Value::I32(99), Value::I32(99)]
    );
    assert_eq!(binder.binds(), 2);
}

#[test]
fn bindings_whose_guard_rejects_their_arguments_are_internal_errors() {
    let binder = AddBinder::new(false, false);
    let config = EvalConfig {
        verify_bindings: true,
        ..EvalConfig::default()
    };
    let (script, _) = dynamic_script(binder, config);
    let err = call(&script, 1).unwrap_err();
    assert!(matches!(err.kind, EvalErrorKind::Internal { .. }));
}

#[test]
fn unknown_binders_are_internal_errors() {
    let mut t = Tree::new();
    let one = t.arena.int(1);
    let node = t.arena.dynamic(BinderId::new(3), &[one], ExprType::Object);
    let entry = t.lambda(&[], node);
    let script = t.script(entry, registry_with(&[]));
    let err = Interpreter::top_level_execute(&script, &mut []).unwrap_err();
    assert!(matches!(err.kind, EvalErrorKind::Internal { .. }));
}
