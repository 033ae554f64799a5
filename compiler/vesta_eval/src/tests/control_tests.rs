//! Blocks, loops, labels, gotos, conditionals and switches.

use pretty_assertions::assert_eq;
use vesta_ir::{BinaryOp, ExprType, SwitchCase};
use vesta_object::{EvalErrorKind, Value};

use super::{registry_with, run, Log, Tree};
use crate::Interpreter;

#[test]
fn block_yields_its_last_statement() {
    let mut t = Tree::new();
    let x = t.var("x", ExprType::I32);
    let one = t.arena.int(1);
    let init = t.arena.assign(x, one);
    let bump = t.increment(x, 41);
    let block = t.arena.block(&[x], &[init, bump, x]);
    let entry = t.lambda(&[], block);
    let script = t.script(entry, registry_with(&[]));
    assert_eq!(run(&script).unwrap(), Value::I32(42));
}

#[test]
fn void_expression_completes_with_null() {
    let mut t = Tree::new();
    let log = Log::default();
    let call = t.log("hello");
    let script = t.script(call, registry_with(&[log.host_type()]));
    assert_eq!(Interpreter::evaluate(&script, call).unwrap(), Value::Null);
    assert_eq!(log.entries(), vec!["hello".to_string()]);
}

#[test]
fn escaping_goto_is_an_invalid_operation() {
    let mut t = Tree::new();
    let label = t.arena.new_label(None, ExprType::Void);
    let goto = t.arena.break_to(label);
    let script = t.script(goto, registry_with(&[]));
    let err = Interpreter::evaluate(&script, goto).unwrap_err();
    assert!(matches!(err.kind, EvalErrorKind::InvalidOperation { .. }));
}

#[test]
fn conditional_requires_a_boolean_test() {
    let mut t = Tree::new();
    let test = t.arena.int(1);
    let a = t.arena.int(2);
    let b = t.arena.int(3);
    let cond = t.arena.condition(test, a, b, ExprType::I32);
    let script = t.script(cond, registry_with(&[]));
    let err = Interpreter::evaluate(&script, cond).unwrap_err();
    assert!(matches!(err.kind, EvalErrorKind::InvalidCast { .. }));
}

/// `i` counts outer iterations, `j` inner ones; `count` totals the inner
/// bodies run. Breaking the inner loop must not end the outer one.
#[test]
fn break_leaves_only_the_innermost_loop() {
    let mut t = Tree::new();
    let i = t.var("i", ExprType::I32);
    let j = t.var("j", ExprType::I32);
    let count = t.var("count", ExprType::I32);
    let outer_break = t.arena.new_label(None, ExprType::Void);
    let inner_break = t.arena.new_label(None, ExprType::Void);

    let three = t.arena.int(3);
    let inner_done = t.arena.binary(BinaryOp::GtEq, j, three);
    let leave_inner = t.arena.break_to(inner_break);
    let stay = t.arena.default_value(ExprType::Void);
    let inner_test = t.arena.condition(inner_done, leave_inner, stay, ExprType::Void);
    let count_up = t.increment(count, 1);
    let j_up = t.increment(j, 1);
    let inner_body = t.arena.block(&[], &[inner_test, count_up, j_up]);
    let inner = t.arena.loop_expr(inner_body, Some(inner_break), None);

    let two = t.arena.int(2);
    let outer_done = t.arena.binary(BinaryOp::GtEq, i, two);
    let leave_outer = t.arena.break_to(outer_break);
    let stay = t.arena.default_value(ExprType::Void);
    let outer_test = t.arena.condition(outer_done, leave_outer, stay, ExprType::Void);
    let zero = t.arena.int(0);
    let j_reset = t.arena.assign(j, zero);
    let i_up = t.increment(i, 1);
    let outer_body = t.arena.block(&[], &[outer_test, j_reset, inner, i_up]);
    let outer = t.arena.loop_expr(outer_body, Some(outer_break), None);

    let body = t.arena.block(&[i, j, count], &[outer, count]);
    let entry = t.lambda(&[], body);
    let script = t.script(entry, registry_with(&[]));
    assert_eq!(run(&script).unwrap(), Value::I32(6));
}

#[test]
fn continue_restarts_the_loop_body() {
    let mut t = Tree::new();
    let log = Log::default();
    let i = t.var("i", ExprType::I32);
    let brk = t.arena.new_label(None, ExprType::Void);
    let cont = t.arena.new_label(None, ExprType::Void);

    let i_up = t.increment(i, 1);
    let three = t.arena.int(3);
    let done = t.arena.binary(BinaryOp::Gt, i, three);
    let leave = t.arena.break_to(brk);
    let stay = t.arena.default_value(ExprType::Void);
    let exit_test = t.arena.condition(done, leave, stay, ExprType::Void);
    let two = t.arena.int(2);
    let is_two = t.arena.binary(BinaryOp::Eq, i, two);
    let skip = t.arena.continue_to(cont);
    let go_on = t.arena.default_value(ExprType::Void);
    let skip_test = t.arena.condition(is_two, skip, go_on, ExprType::Void);
    let write = t.log("body");
    let body = t.arena.block(&[], &[i_up, exit_test, skip_test, write]);
    let lp = t.arena.loop_expr(body, Some(brk), Some(cont));
    let block = t.arena.block(&[i], &[lp]);
    let entry = t.lambda(&[], block);
    let script = t.script(entry, registry_with(&[log.host_type()]));

    run(&script).unwrap();
    // i = 1, 3 write; i = 2 continues; i = 4 breaks.
    assert_eq!(log.entries().len(), 2);
}

#[test]
fn break_carries_a_value_out_of_the_loop() {
    let mut t = Tree::new();
    let brk = t.arena.new_label(None, ExprType::I32);
    let seven = t.arena.int(7);
    let leave = t.arena.goto(brk, Some(seven), vesta_ir::GotoKind::Break);
    let lp = t.arena.loop_expr(leave, Some(brk), None);
    let entry = t.lambda(&[], lp);
    let script = t.script(entry, registry_with(&[]));
    assert_eq!(run(&script).unwrap(), Value::I32(7));
}

/// `{ x = 1; { goto L; x = 2 }; x = x + 10; L: x = x + 100; x }`
#[test]
fn goto_reenters_an_ancestor_block_at_the_label() {
    let mut t = Tree::new();
    let x = t.var("x", ExprType::I32);
    let label = t.arena.new_label(None, ExprType::Void);

    let one = t.arena.int(1);
    let init = t.arena.assign(x, one);
    let jump = t.arena.goto(label, None, vesta_ir::GotoKind::Goto);
    let two = t.arena.int(2);
    let skipped = t.arena.assign(x, two);
    let inner = t.arena.block(&[], &[jump, skipped]);
    let also_skipped = t.increment(x, 10);
    let target = t.arena.label_expr(label, None);
    let after = t.increment(x, 100);
    let outer = t.arena.block(&[x], &[init, inner, also_skipped, target, after, x]);
    let entry = t.lambda(&[], outer);
    let script = t.script(entry, registry_with(&[]));
    assert_eq!(run(&script).unwrap(), Value::I32(101));
}

#[test]
fn goto_to_a_label_value_completes_the_label() {
    let mut t = Tree::new();
    let label = t.arena.new_label(None, ExprType::I32);
    let five = t.arena.int(5);
    let jump = t.arena.goto(label, Some(five), vesta_ir::GotoKind::Goto);
    let nine = t.arena.int(9);
    let body = t.arena.block_typed(&[], &[jump, nine], ExprType::I32);
    let labeled = t.arena.label_expr(label, Some(body));
    let entry = t.lambda(&[], labeled);
    let script = t.script(entry, registry_with(&[]));
    assert_eq!(run(&script).unwrap(), Value::I32(5));
}

fn switch_log(test_value: i32) -> Vec<String> {
    let mut t = Tree::new();
    let log = Log::default();
    let brk = t.arena.new_label(None, ExprType::Void);
    let test = t.arena.int(test_value);
    let one = t.log("one");
    let two = t.log("two");
    let leave = t.arena.break_to(brk);
    let two_body = t.arena.block(&[], &[two, leave]);
    let other = t.log("default");
    let switch = t.arena.switch(
        test,
        &[
            SwitchCase {
                value: Some(1),
                body: one,
            },
            SwitchCase {
                value: Some(2),
                body: two_body,
            },
            SwitchCase {
                value: None,
                body: other,
            },
        ],
        brk,
    );
    let entry = t.lambda(&[], switch);
    let script = t.script(entry, registry_with(&[log.host_type()]));
    run(&script).unwrap();
    log.entries()
}

#[test]
fn switch_falls_through_until_break() {
    assert_eq!(switch_log(1), vec!["one".to_string(), "two".to_string()]);
    assert_eq!(switch_log(2), vec!["two".to_string()]);
    assert_eq!(switch_log(5), vec!["default".to_string()]);
}

#[test]
fn and_also_skips_its_right_operand() {
    let mut t = Tree::new();
    let log = Log::default();
    let no = t.arena.boolean(false);
    let tick = t.tick("right");
    let zero = t.arena.int(0);
    let right = t.arena.binary(BinaryOp::Gt, tick, zero);
    let both = t.arena.binary(BinaryOp::AndAlso, no, right);
    let entry = t.lambda(&[], both);
    let script = t.script(entry, registry_with(&[log.host_type()]));
    assert_eq!(run(&script).unwrap(), Value::Bool(false));
    assert!(log.entries().is_empty());
}

#[test]
fn coalesce_picks_the_first_non_null() {
    let mut t = Tree::new();
    let null = t.arena.null();
    let s = t.string("fallback");
    let first = t.arena.binary(BinaryOp::Coalesce, null, s);
    let entry = t.lambda(&[], first);
    let script = t.script(entry, registry_with(&[]));
    assert_eq!(run(&script).unwrap(), Value::string("fallback"));
}

#[test]
fn runtime_variables_read_and_write_the_live_scope() {
    let mut t = Tree::new();
    let x = t.var("x", ExprType::I32);
    let vars = t.var("vars", ExprType::Object);
    let one = t.arena.int(1);
    let init = t.arena.assign(x, one);
    let rv = t.arena.runtime_variables(&[x]);
    let keep = t.arena.assign(vars, rv);
    let index = t.arena.int(0);
    let five = t.arena.int(5);
    let set = t.path("RuntimeVariables", "set_Item");
    let store = t.arena.call(Some(vars), set, &[index, five], ExprType::Void);
    let count_path = t.path("RuntimeVariables", "Count");
    let count = t.arena.member(Some(vars), count_path, ExprType::I32);
    let sum = t.add(x, count);
    let block = t.arena.block(&[x, vars], &[init, keep, store, sum]);
    let entry = t.lambda(&[], block);
    let script = t.script(entry, registry_with(&[]));
    assert_eq!(run(&script).unwrap(), Value::I32(6));
}

#[test]
fn closures_capture_the_enclosing_scope() {
    let mut t = Tree::new();
    let n = t.var("n", ExprType::I32);
    let f = t.var("f", ExprType::Object);
    let p = t.var("p", ExprType::I32);
    let ten = t.arena.int(10);
    let init = t.arena.assign(n, ten);
    let sum = t.add(p, n);
    let name = t.name("add_n");
    let lambda = t.arena.lambda(name, &[p], sum, None);
    let keep = t.arena.assign(f, lambda);
    let five = t.arena.int(5);
    let call = t.arena.invoke(f, &[five], ExprType::I32);
    let block = t.arena.block(&[n, f], &[init, keep, call]);
    let entry = t.lambda(&[], block);
    let script = t.script(entry, registry_with(&[]));
    assert_eq!(run(&script).unwrap(), Value::I32(15));
}

#[test]
fn return_label_ends_the_lambda() {
    let mut t = Tree::new();
    let log = Log::default();
    let ret = t.arena.new_label(None, ExprType::I32);
    let three = t.arena.int(3);
    let early = t.arena.return_to(ret, Some(three));
    let late = t.log("unreachable");
    let four = t.arena.int(4);
    let body = t.arena.block(&[], &[early, late, four]);
    let name = t.name("main");
    let entry = t.arena.lambda(name, &[], body, Some(ret));
    let script = t.script(entry, registry_with(&[log.host_type()]));
    assert_eq!(run(&script).unwrap(), Value::I32(3));
    assert!(log.entries().is_empty());
}

#[test]
fn lambda_arity_is_checked() {
    let mut t = Tree::new();
    let p = t.var("p", ExprType::I32);
    let entry = t.lambda(&[p], p);
    let script = t.script(entry, registry_with(&[]));
    let err = Interpreter::top_level_execute(&script, &mut []).unwrap_err();
    assert!(matches!(err.kind, EvalErrorKind::ArityMismatch { .. }));
    assert_eq!(
        Interpreter::top_level_execute(&script, &mut [Value::I32(8)]).unwrap(),
        Value::I32(8)
    );
}

#[test]
fn unbound_variable_is_internal() {
    let mut t = Tree::new();
    let x = t.var("x", ExprType::I32);
    let entry = t.lambda(&[], x);
    let script = t.script(entry, registry_with(&[]));
    let err = run(&script).unwrap_err();
    assert!(matches!(err.kind, EvalErrorKind::Internal { .. }));
    assert!(!err.is_catchable());
}

#[test]
fn call_depth_limit_is_enforced() {
    let mut t = Tree::new();
    let f = t.var("f", ExprType::Object);
    let p = t.var("p", ExprType::Object);
    // f = p => p(p); f(f)
    let recurse = t.arena.invoke(p, &[p], ExprType::Object);
    let name = t.name("loop");
    let lambda = t.arena.lambda(name, &[p], recurse, None);
    let keep = t.arena.assign(f, lambda);
    let start = t.arena.invoke(f, &[f], ExprType::Object);
    let block = t.arena.block(&[f], &[keep, start]);
    let entry = t.lambda(&[], block);
    let config = crate::EvalConfig {
        max_call_depth: Some(32),
        ..crate::EvalConfig::default()
    };
    let script = t.script_with(entry, |b| b.config(config));
    let err = run(&script).unwrap_err();
    assert!(matches!(err.kind, EvalErrorKind::StackOverflow { .. }));
}
