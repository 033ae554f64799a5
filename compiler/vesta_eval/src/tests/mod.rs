//! Interpreter tests over hand-built expression trees.
//!
//! `Tree` wraps an arena and interner with shorthand builders; `Log` is a
//! host type whose static methods record what guest code did, which is how
//! the tests observe side effects (and their absence on resumption).

#![allow(clippy::unwrap_used, reason = "Tests can panic")]

mod control_tests;
mod dynamic_tests;
mod generator_tests;

use std::sync::Arc;

use parking_lot::Mutex;
use vesta_ir::{ExprArena, ExprId, ExprType, Literal, MemberPath, Name, SharedInterner};
use vesta_object::{
    EvalResult, HostMethod, MethodFlags, ParamDef, TypeBuilder, TypeRef, TypeRegistry, Value,
};

use crate::{Interpreter, ScriptCode, ScriptCodeBuilder};

const STATIC: MethodFlags = MethodFlags::PUBLIC.union(MethodFlags::STATIC);

pub(super) struct Tree {
    pub arena: ExprArena,
    pub interner: SharedInterner,
}

impl Tree {
    pub fn new() -> Self {
        Tree {
            arena: ExprArena::new(),
            interner: SharedInterner::new(),
        }
    }

    pub fn name(&self, s: &str) -> Name {
        self.interner.intern(s)
    }

    pub fn named(&self, s: &str) -> ExprType {
        ExprType::Named(self.name(s))
    }

    pub fn path(&self, owner: &str, member: &str) -> MemberPath {
        MemberPath::new(self.name(owner), self.name(member))
    }

    pub fn var(&mut self, name: &str, ty: ExprType) -> ExprId {
        let name = self.name(name);
        self.arena.parameter(name, ty)
    }

    pub fn string(&mut self, s: &str) -> ExprId {
        let name = self.name(s);
        self.arena.constant(Literal::Str(name))
    }

    pub fn add(&mut self, left: ExprId, right: ExprId) -> ExprId {
        self.arena.binary(vesta_ir::BinaryOp::Add, left, right)
    }

    /// `target = target + amount`
    pub fn increment(&mut self, target: ExprId, amount: i32) -> ExprId {
        let amount = self.arena.int(amount);
        let sum = self.add(target, amount);
        self.arena.assign(target, sum)
    }

    /// `Log.Write(message)`
    pub fn log(&mut self, message: &str) -> ExprId {
        let message = self.string(message);
        let path = self.path("Log", "Write");
        self.arena.call(None, path, &[message], ExprType::Void)
    }

    /// `Log.Tick(message)`: logs and returns the number of entries.
    pub fn tick(&mut self, message: &str) -> ExprId {
        let message = self.string(message);
        let path = self.path("Log", "Tick");
        self.arena.call(None, path, &[message], ExprType::I32)
    }

    pub fn lambda(&mut self, params: &[ExprId], body: ExprId) -> ExprId {
        let name = self.name("main");
        self.arena.lambda(name, params, body, None)
    }

    pub fn script(self, entry: ExprId, registry: Arc<TypeRegistry>) -> Arc<ScriptCode> {
        self.script_with(entry, |builder| builder.registry(registry))
    }

    pub fn script_with(
        self,
        entry: ExprId,
        configure: impl FnOnce(ScriptCodeBuilder) -> ScriptCodeBuilder,
    ) -> Arc<ScriptCode> {
        configure(ScriptCode::builder(
            self.arena.into_shared(),
            entry,
            self.interner,
        ))
        .build()
    }
}

/// Records calls made by guest code.
#[derive(Clone, Default)]
pub(super) struct Log(Arc<Mutex<Vec<String>>>);

impl Log {
    pub fn entries(&self) -> Vec<String> {
        self.0.lock().clone()
    }

    fn push(&self, entry: String) -> usize {
        let mut entries = self.0.lock();
        entries.push(entry);
        entries.len()
    }

    pub fn host_type(&self) -> TypeRef {
        let write = self.clone();
        let tick = self.clone();
        let pair = self.clone();
        TypeBuilder::new("Log")
            .method(HostMethod::native(
                "Write",
                vec![ParamDef::new("message", ExprType::Str)],
                ExprType::Void,
                STATIC,
                move |_, args| {
                    write.push(args[0].as_str().unwrap_or_default().to_string());
                    Ok(Value::Null)
                },
            ))
            .method(HostMethod::native(
                "Tick",
                vec![ParamDef::new("message", ExprType::Str)],
                ExprType::I32,
                STATIC,
                move |_, args| {
                    let count = tick.push(args[0].as_str().unwrap_or_default().to_string());
                    Ok(Value::I32(i32::try_from(count).unwrap()))
                },
            ))
            .method(HostMethod::native(
                "Pair",
                vec![
                    ParamDef::new("a", ExprType::I32),
                    ParamDef::new("b", ExprType::I32),
                ],
                ExprType::Void,
                STATIC,
                move |_, args| {
                    pair.push(format!("pair {:?} {:?}", args[0], args[1]));
                    Ok(Value::Null)
                },
            ))
            .build()
    }
}

/// Builtin types plus `extra`.
pub(super) fn registry_with(extra: &[TypeRef]) -> Arc<TypeRegistry> {
    let registry = TypeRegistry::with_builtins();
    for ty in extra {
        registry.register(ty.clone());
    }
    Arc::new(registry)
}

/// Run the script's entry lambda without arguments.
pub(super) fn run(script: &Arc<ScriptCode>) -> EvalResult {
    Interpreter::top_level_execute(script, &mut [])
}

/// Every value a generator (or enumerable) value produces.
pub(super) fn drain(generator: &Value) -> Vec<Value> {
    let Value::Native(native) = generator else {
        panic!("expected a generator, got {generator:?}");
    };
    let mut values = Vec::new();
    while native.invoke_method("MoveNext", &mut []).unwrap() == Value::Bool(true) {
        values.push(native.invoke_method("get_Current", &mut []).unwrap());
    }
    values
}
