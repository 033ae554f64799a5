//! Generators: suspension, resumption without replaying side effects,
//! operand and scope saving, yields inside try blocks.

use pretty_assertions::assert_eq;
use vesta_ir::{BinaryOp, CatchBlock, ExprId, ExprType};
use vesta_object::{EvalErrorKind, Value};

use super::{drain, registry_with, Log, Tree};
use crate::Interpreter;

fn generator_value(t: Tree, log: &Log, generator: ExprId) -> Value {
    let script = t.script(generator, registry_with(&[log.host_type()]));
    Interpreter::evaluate(&script, generator).unwrap()
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_string()).collect()
}

/// `{ log a; yield 1; log b; yield 2 }`
#[test]
fn resumption_does_not_replay_side_effects() {
    let mut t = Tree::new();
    let log = Log::default();
    let a = t.log("a");
    let one = t.arena.int(1);
    let y1 = t.arena.yield_return(one);
    let b = t.log("b");
    let two = t.arena.int(2);
    let y2 = t.arena.yield_return(two);
    let body = t.arena.block(&[], &[a, y1, b, y2]);
    let generator = t.arena.generator(body, None, false);
    let value = generator_value(t, &log, generator);

    let Value::Native(native) = &value else {
        panic!("expected a generator");
    };
    let next = || native.invoke_method("MoveNext", &mut []).unwrap();
    assert_eq!(next(), Value::Bool(true));
    assert_eq!(log.entries(), strings(&["a"]));
    assert_eq!(next(), Value::Bool(true));
    assert_eq!(log.entries(), strings(&["a", "b"]));
    assert_eq!(next(), Value::Bool(false));
    assert_eq!(log.entries(), strings(&["a", "b"]));
    // A finished generator stays finished.
    assert_eq!(next(), Value::Bool(false));
}

#[test]
fn current_tracks_the_last_yield() {
    let mut t = Tree::new();
    let log = Log::default();
    let one = t.arena.int(1);
    let y1 = t.arena.yield_return(one);
    let two = t.arena.int(2);
    let y2 = t.arena.yield_return(two);
    let body = t.arena.block(&[], &[y1, y2]);
    let generator = t.arena.generator(body, None, false);
    let value = generator_value(t, &log, generator);
    assert_eq!(drain(&value), vec![Value::I32(1), Value::I32(2)]);
}

#[test]
fn yield_break_ends_the_iteration() {
    let mut t = Tree::new();
    let log = Log::default();
    let one = t.arena.int(1);
    let y1 = t.arena.yield_return(one);
    let stop = t.arena.yield_break();
    let after = t.log("after break");
    let body = t.arena.block(&[], &[y1, stop, after]);
    let generator = t.arena.generator(body, None, false);
    let value = generator_value(t, &log, generator);
    assert_eq!(drain(&value), vec![Value::I32(1)]);
    assert!(log.entries().is_empty());
}

/// `for (i = 0; i < 3; i++) yield i * 10;` with `i` in the loop's block.
#[test]
fn yield_inside_a_loop_keeps_loop_state() {
    let mut t = Tree::new();
    let log = Log::default();
    let i = t.var("i", ExprType::I32);
    let brk = t.arena.new_label(None, ExprType::Void);
    let three = t.arena.int(3);
    let done = t.arena.binary(BinaryOp::GtEq, i, three);
    let leave = t.arena.break_to(brk);
    let stay = t.arena.default_value(ExprType::Void);
    let test = t.arena.condition(done, leave, stay, ExprType::Void);
    let ten = t.arena.int(10);
    let scaled = t.arena.binary(BinaryOp::Mul, i, ten);
    let y = t.arena.yield_return(scaled);
    let step = t.increment(i, 1);
    let body = t.arena.block(&[], &[test, y, step]);
    let lp = t.arena.loop_expr(body, Some(brk), None);
    let outer = t.arena.block(&[i], &[lp]);
    let generator = t.arena.generator(outer, None, false);
    let value = generator_value(t, &log, generator);
    assert_eq!(
        drain(&value),
        vec![Value::I32(0), Value::I32(10), Value::I32(20)]
    );
}

/// `Log.Pair(Log.Tick("first"), { yield 1; 2 })`: the first operand is
/// evaluated once, before the suspension.
#[test]
fn operands_before_a_yield_are_not_reevaluated() {
    let mut t = Tree::new();
    let log = Log::default();
    let first = t.tick("first");
    let one = t.arena.int(1);
    let y = t.arena.yield_return(one);
    let two = t.arena.int(2);
    let second = t.arena.block_typed(&[], &[y, two], ExprType::I32);
    let pair = t.path("Log", "Pair");
    let call = t.arena.call(None, pair, &[first, second], ExprType::Void);
    let body = t.arena.block(&[], &[call]);
    let generator = t.arena.generator(body, None, false);
    let value = generator_value(t, &log, generator);

    assert_eq!(drain(&value), vec![Value::I32(1)]);
    assert_eq!(
        log.entries(),
        vec![
            "first".to_string(),
            format!("pair {:?} {:?}", Value::I32(1), Value::I32(2)),
        ]
    );
}

#[test]
fn finally_runs_after_resumption_leaves_the_try() {
    let mut t = Tree::new();
    let log = Log::default();
    let one = t.arena.int(1);
    let y = t.arena.yield_return(one);
    let in_body = t.log("body");
    let body = t.arena.block(&[], &[y, in_body]);
    let fin = t.log("finally");
    let tried = t.arena.try_expr(body, &[], Some(fin), None);
    let generator = t.arena.generator(tried, None, false);
    let value = generator_value(t, &log, generator);

    let Value::Native(native) = &value else {
        panic!("expected a generator");
    };
    assert_eq!(native.invoke_method("MoveNext", &mut []).unwrap(), Value::Bool(true));
    assert!(log.entries().is_empty());
    assert_eq!(native.invoke_method("MoveNext", &mut []).unwrap(), Value::Bool(false));
    assert_eq!(log.entries(), strings(&["body", "finally"]));
}

#[test]
fn yield_inside_finally_resumes_in_the_finally_block() {
    let mut t = Tree::new();
    let log = Log::default();
    let body = t.log("body");
    let f1 = t.log("f1");
    let one = t.arena.int(1);
    let y = t.arena.yield_return(one);
    let f2 = t.log("f2");
    let fin = t.arena.block(&[], &[f1, y, f2]);
    let tried = t.arena.try_expr(body, &[], Some(fin), None);
    let generator = t.arena.generator(tried, None, false);
    let value = generator_value(t, &log, generator);

    assert_eq!(drain(&value), vec![Value::I32(1)]);
    assert_eq!(log.entries(), strings(&["body", "f1", "f2"]));
}

#[test]
fn yield_inside_a_fault_block_resumes_in_the_fault_block() {
    let mut t = Tree::new();
    let log = Log::default();
    let one = t.arena.int(1);
    let zero = t.arena.int(0);
    let fail = t.arena.binary(BinaryOp::Div, one, zero);
    let body = t.arena.block_typed(&[], &[fail], ExprType::Void);
    let f1 = t.log("f1");
    let three = t.arena.int(3);
    let y = t.arena.yield_return(three);
    let f2 = t.log("f2");
    let fault = t.arena.block(&[], &[f1, y, f2]);
    let tried = t.arena.try_expr(body, &[], None, Some(fault));
    let generator = t.arena.generator(tried, None, false);
    let value = generator_value(t, &log, generator);

    let Value::Native(native) = &value else {
        panic!("expected a generator");
    };
    assert_eq!(native.invoke_method("MoveNext", &mut []).unwrap(), Value::Bool(true));
    assert_eq!(native.invoke_method("get_Current", &mut []).unwrap(), Value::I32(3));
    assert_eq!(log.entries(), strings(&["f1"]));
    // The error the fault block ran for escapes once the block completes.
    let err = native.invoke_method("MoveNext", &mut []).unwrap_err();
    assert_eq!(err.kind, EvalErrorKind::DivisionByZero);
    assert_eq!(log.entries(), strings(&["f1", "f2"]));
}

#[test]
fn yield_inside_a_catch_handler_resumes_in_the_handler() {
    let mut t = Tree::new();
    let log = Log::default();
    let one = t.arena.int(1);
    let zero = t.arena.int(0);
    let fail = t.arena.binary(BinaryOp::Div, one, zero);
    let body = t.arena.block_typed(&[], &[fail], ExprType::Void);
    let caught = t.log("caught");
    let seven = t.arena.int(7);
    let y = t.arena.yield_return(seven);
    let after = t.log("after yield");
    let handler = t.arena.block(&[], &[caught, y, after]);
    let test = t.named("DivideByZeroException");
    let tried = t.arena.try_expr(
        body,
        &[CatchBlock {
            test,
            variable: None,
            filter: None,
            body: handler,
        }],
        None,
        None,
    );
    let generator = t.arena.generator(tried, None, false);
    let value = generator_value(t, &log, generator);

    assert_eq!(drain(&value), vec![Value::I32(7)]);
    assert_eq!(log.entries(), strings(&["caught", "after yield"]));
}

#[test]
fn enumerable_restarts_for_each_enumerator() {
    let mut t = Tree::new();
    let log = Log::default();
    let started = t.log("start");
    let one = t.arena.int(1);
    let y = t.arena.yield_return(one);
    let body = t.arena.block(&[], &[started, y]);
    let generator = t.arena.generator(body, None, true);
    let value = generator_value(t, &log, generator);

    let Value::Native(enumerable) = &value else {
        panic!("expected an enumerable");
    };
    for _ in 0..2 {
        let enumerator = enumerable.invoke_method("GetEnumerator", &mut []).unwrap();
        assert_eq!(drain(&enumerator), vec![Value::I32(1)]);
    }
    assert_eq!(log.entries(), strings(&["start", "start"]));
}

#[test]
fn generator_label_ends_the_iteration() {
    let mut t = Tree::new();
    let log = Log::default();
    let end = t.arena.new_label(None, ExprType::Void);
    let one = t.arena.int(1);
    let y = t.arena.yield_return(one);
    let stop = t.arena.break_to(end);
    let after = t.log("unreachable");
    let body = t.arena.block(&[], &[y, stop, after]);
    let generator = t.arena.generator(body, Some(end), false);
    let value = generator_value(t, &log, generator);
    assert_eq!(drain(&value), vec![Value::I32(1)]);
    assert!(log.entries().is_empty());
}

#[test]
fn errors_finish_the_generator() {
    let mut t = Tree::new();
    let log = Log::default();
    let one = t.arena.int(1);
    let zero = t.arena.int(0);
    let fail = t.arena.binary(BinaryOp::Div, one, zero);
    let body = t.arena.block(&[], &[fail]);
    let generator = t.arena.generator(body, None, false);
    let value = generator_value(t, &log, generator);

    let Value::Native(native) = &value else {
        panic!("expected a generator");
    };
    let err = native.invoke_method("MoveNext", &mut []).unwrap_err();
    assert_eq!(err.kind, EvalErrorKind::DivisionByZero);
    assert_eq!(native.invoke_method("MoveNext", &mut []).unwrap(), Value::Bool(false));
}

#[test]
fn dispose_finishes_without_running_the_rest() {
    let mut t = Tree::new();
    let log = Log::default();
    let one = t.arena.int(1);
    let y = t.arena.yield_return(one);
    let after = t.log("after");
    let body = t.arena.block(&[], &[y, after]);
    let generator = t.arena.generator(body, None, false);
    let value = generator_value(t, &log, generator);

    let Value::Native(native) = &value else {
        panic!("expected a generator");
    };
    assert_eq!(native.invoke_method("MoveNext", &mut []).unwrap(), Value::Bool(true));
    native.invoke_method("Dispose", &mut []).unwrap();
    assert_eq!(native.invoke_method("MoveNext", &mut []).unwrap(), Value::Bool(false));
    assert!(log.entries().is_empty());
}
