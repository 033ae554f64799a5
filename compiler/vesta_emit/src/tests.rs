#![allow(clippy::unwrap_used, reason = "Tests can panic")]

use std::sync::Arc;

use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use rustc_hash::FxHashMap;
use vesta_ir::ExprType;
use vesta_object::{
    EvalError, EvalErrorKind, EvalResult, FieldDef, FieldFlags, HostConstructor, HostMethod,
    MethodFlags, ParamDef, TypeBuilder, TypeFlags, TypeRef, TypeRegistry, Value,
};

use crate::names::{guest_name, CLASS_FIELD};
use crate::{
    CallConvention, EmitError, FeatureKey, GuestCallSite, GuestRuntime, SiteOutcome,
    TypeDispenser,
};

type GuestBody = Arc<dyn Fn(&Value, &mut [Value]) -> Value + Send + Sync>;

/// A guest language whose classes override members by name.
#[derive(Default)]
struct Guest {
    overrides: Mutex<FxHashMap<String, GuestBody>>,
    sites: Mutex<Vec<(String, usize, CallConvention)>>,
}

#[derive(Clone, Default)]
struct TestRuntime(Arc<Guest>);

impl TestRuntime {
    fn define(&self, name: &str, body: impl Fn(&Value, &mut [Value]) -> Value + Send + Sync + 'static) {
        self.0.overrides.lock().insert(name.to_string(), Arc::new(body));
    }

    fn site_names(&self) -> Vec<String> {
        self.0.sites.lock().iter().map(|(n, _, _)| n.clone()).collect()
    }
}

impl std::fmt::Debug for TestRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("TestRuntime")
    }
}

struct TestSite {
    guest: Arc<Guest>,
    name: String,
}

impl GuestCallSite for TestSite {
    fn invoke(&self, this: &Value, args: &mut [Value]) -> Result<SiteOutcome, EvalError> {
        let body = self.guest.overrides.lock().get(&self.name).cloned();
        Ok(match body {
            Some(body) => SiteOutcome::Value(body(this, args)),
            None => SiteOutcome::ForwardToBase,
        })
    }
}

impl GuestRuntime for TestRuntime {
    fn make_call_site(
        &self,
        name: &str,
        nargs: usize,
        convention: CallConvention,
    ) -> Arc<dyn GuestCallSite> {
        self.0.sites.lock().push((name.to_string(), nargs, convention));
        Arc::new(TestSite {
            guest: Arc::clone(&self.0),
            name: name.to_string(),
        })
    }

    fn default_exception_message(&self, class: &Value) -> Value {
        Value::string(format!("{} failed", class.as_str().unwrap_or("?")))
    }

    fn convert(&self, value: Value, _ty: ExprType) -> EvalResult {
        Ok(value)
    }

    fn create_instance_data(&self) -> Value {
        Value::string("instance data")
    }
}

const VIRTUAL: MethodFlags = MethodFlags::PUBLIC.union(MethodFlags::VIRTUAL);
const ACCESSOR: MethodFlags = VIRTUAL.union(MethodFlags::SPECIAL_NAME);

struct Fixture {
    runtime: TestRuntime,
    registry: Arc<TypeRegistry>,
    dispenser: TypeDispenser,
    shape: TypeRef,
    drawable: TypeRef,
    printable: TypeRef,
}

fn shape_type(object: TypeRef) -> TypeRef {
    TypeBuilder::new("Shape")
        .base(object)
        .flags(TypeFlags::ABSTRACT)
        .field(FieldDef::new("origin", ExprType::I32, FieldFlags::PROTECTED))
        .field(FieldDef::new(
            "count",
            ExprType::I32,
            FieldFlags::PROTECTED | FieldFlags::STATIC,
        ))
        .constructor(HostConstructor::new(vec![], MethodFlags::PUBLIC, |_, _| {
            Ok(())
        }))
        .constructor(HostConstructor::new(
            vec![ParamDef::new("name", ExprType::Str)],
            MethodFlags::PROTECTED,
            |this, _| this.set_field("origin", Value::I32(1)),
        ))
        .constructor(HostConstructor::new(
            vec![ParamDef::new("x", ExprType::I32)],
            MethodFlags::PRIVATE,
            |_, _| Ok(()),
        ))
        .method(HostMethod::native("Area", vec![], ExprType::F64, VIRTUAL, |_, _| {
            Ok(Value::F64(1.5))
        }))
        .method(HostMethod::abstract_method(
            "Perimeter",
            vec![],
            ExprType::F64,
            MethodFlags::PUBLIC,
        ))
        .method(HostMethod::native(
            "Scale",
            vec![],
            ExprType::I32,
            MethodFlags::PROTECTED,
            |_, _| Ok(Value::I32(2)),
        ))
        .method(HostMethod::native(
            "Id",
            vec![],
            ExprType::I32,
            VIRTUAL | MethodFlags::FINAL,
            |_, _| Ok(Value::I32(7)),
        ))
        .method(HostMethod::native("get_Name", vec![], ExprType::Str, ACCESSOR, |_, _| {
            Ok(Value::string("shape"))
        }))
        .method(HostMethod::native(
            "get_Item",
            vec![ParamDef::new("index", ExprType::I32)],
            ExprType::I32,
            ACCESSOR,
            |_, args| match args[0] {
                Value::I32(i) => Ok(Value::I32(i * 10)),
                _ => Ok(Value::Null),
            },
        ))
        .method(HostMethod::native(
            "set_Item",
            vec![
                ParamDef::new("index", ExprType::I32),
                ParamDef::new("value", ExprType::I32),
            ],
            ExprType::Void,
            ACCESSOR,
            |_, _| Ok(Value::Null),
        ))
        .method(HostMethod::native(
            "Bump",
            vec![ParamDef::new("value", ExprType::I32).by_ref()],
            ExprType::Void,
            VIRTUAL,
            |_, args| {
                if let Value::I32(n) = args[0] {
                    args[0] = Value::I32(n + 1);
                }
                Ok(Value::Null)
            },
        ))
        .method(HostMethod::native(
            "Join",
            vec![ParamDef::new("parts", ExprType::Array).params_array()],
            ExprType::Str,
            VIRTUAL,
            |_, _| Ok(Value::string("joined")),
        ))
        .build()
}

fn interface(name: &str, method: &str, parents: &[TypeRef]) -> TypeRef {
    let mut builder = TypeBuilder::new(name)
        .flags(TypeFlags::INTERFACE | TypeFlags::ABSTRACT)
        .method(HostMethod::abstract_method(
            method,
            vec![],
            ExprType::Str,
            MethodFlags::PUBLIC,
        ));
    for parent in parents {
        builder.add_interface(Arc::clone(parent));
    }
    builder.build()
}

impl Fixture {
    fn new() -> Self {
        let runtime = TestRuntime::default();
        let registry = Arc::new(TypeRegistry::with_builtins());
        let shape = shape_type(registry.get("Object").unwrap());
        let drawable = interface("IDrawable", "Draw", &[]);
        let printable = interface("IPrintable", "Print", &[Arc::clone(&drawable)]);
        for ty in [&shape, &drawable, &printable] {
            registry.register(Arc::clone(ty));
        }
        let dispenser = TypeDispenser::new(Arc::clone(&registry), Arc::new(runtime.clone()));
        Fixture {
            runtime,
            registry,
            dispenser,
            shape,
            drawable,
            printable,
        }
    }

    fn guest_shape(&self) -> TypeRef {
        self.dispenser
            .get_or_create_type(&self.shape, &[Arc::clone(&self.printable)], false)
            .unwrap()
    }
}

fn instance(ty: &TypeRef, class: &str) -> Value {
    ty.instantiate(&mut [Value::string(class)]).unwrap()
}

/// Virtual call, the way host code reaches an emitted override.
fn call(this: &Value, name: &str, args: &mut [Value]) -> EvalResult {
    let ty = Arc::clone(this.as_object().unwrap().ty());
    let method = ty.resolve_virtual(name, args.len()).unwrap();
    method.invoke(this, args)
}

fn call_static(ty: &TypeRef, name: &str, args: &mut [Value]) -> EvalResult {
    ty.find_method(name, args.len()).unwrap().invoke(&Value::Null, args)
}

#[test]
fn equal_requests_return_the_identical_type() {
    let f = Fixture::new();
    let first = f.guest_shape();
    let implied = f
        .dispenser
        .get_or_create_type(
            &f.shape,
            &[Arc::clone(&f.drawable), Arc::clone(&f.printable)],
            false,
        )
        .unwrap();
    assert!(Arc::ptr_eq(&first, &implied));
    assert_eq!(f.dispenser.emitted_count(), 1);

    let suppressed = f
        .dispenser
        .get_or_create_type(&f.shape, &[Arc::clone(&f.printable)], true)
        .unwrap();
    assert!(!Arc::ptr_eq(&first, &suppressed));
    assert_eq!(f.dispenser.emitted_count(), 2);
}

#[test]
fn concurrent_requests_emit_once() {
    let f = Fixture::new();
    let types: Vec<TypeRef> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..8).map(|_| scope.spawn(|| f.guest_shape())).collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });
    assert!(types.iter().all(|t| Arc::ptr_eq(t, &types[0])));
    assert_eq!(f.dispenser.emitted_count(), 1);
}

#[test]
fn sealed_bases_and_interfaces_are_rejected() {
    let f = Fixture::new();
    let string = f.registry.get("String").unwrap();
    assert_eq!(
        f.dispenser.get_or_create_type(&string, &[], false).unwrap_err(),
        EmitError::SealedBase("String".to_string())
    );
    assert_eq!(
        f.dispenser.get_or_create_type(&f.drawable, &[], false).unwrap_err(),
        EmitError::SealedBase("IDrawable".to_string())
    );
    assert_eq!(
        f.dispenser
            .get_or_create_type(&f.shape, &[Arc::clone(&f.shape)], false)
            .unwrap_err(),
        EmitError::NotAnInterface("Shape".to_string())
    );
    assert_eq!(f.dispenser.emitted_count(), 0);
}

#[test]
fn overrides_forward_to_the_base_without_a_guest_override() {
    let f = Fixture::new();
    let obj = instance(&f.guest_shape(), "Widget");
    assert_eq!(call(&obj, "Area", &mut []).unwrap(), Value::F64(1.5));
    assert_eq!(call(&obj, "get_Name", &mut []).unwrap(), Value::string("shape"));
    assert_eq!(
        call(&obj, "get_Item", &mut [Value::I32(3)]).unwrap(),
        Value::I32(30)
    );
}

#[test]
fn guest_overrides_take_precedence() {
    let f = Fixture::new();
    f.runtime.define("Area", |_, _| Value::F64(9.0));
    let obj = instance(&f.guest_shape(), "Widget");
    assert_eq!(call(&obj, "Area", &mut []).unwrap(), Value::F64(9.0));
    assert_eq!(call(&obj, "#base#Area", &mut []).unwrap(), Value::F64(1.5));
}

#[test]
fn abstract_members_without_override_are_missing_implementations() {
    let f = Fixture::new();
    let obj = instance(&f.guest_shape(), "Widget");
    for name in ["Perimeter", "Draw", "Print"] {
        let err = call(&obj, name, &mut []).unwrap_err();
        assert!(
            matches!(err.kind, EvalErrorKind::MissingImplementation { .. }),
            "{name}: {err:?}"
        );
    }
    f.runtime.define("Draw", |_, _| Value::string("drawn"));
    assert_eq!(call(&obj, "Draw", &mut []).unwrap(), Value::string("drawn"));
}

#[test]
fn sites_use_guest_member_names() {
    let f = Fixture::new();
    f.guest_shape();
    let names = f.runtime.site_names();
    for expected in ["Area", "Perimeter", "Name", "[]", "[]=", "Bump", "Draw", "Print", "ToString"] {
        assert!(names.iter().any(|n| n == expected), "no site for {expected}");
    }
    for absent in ["Id", "Scale", "get_Name", "ImmediateClass"] {
        assert!(!names.iter().any(|n| n == absent), "unexpected site {absent}");
    }
    let join = f.runtime.0.sites.lock().iter().find(|s| s.0 == "Join").cloned();
    assert_eq!(join, Some(("Join".to_string(), 1, CallConvention::List)));
}

#[test]
fn by_ref_arguments_are_written_back() {
    let f = Fixture::new();
    let obj = instance(&f.guest_shape(), "Widget");
    let mut args = [Value::I32(1)];
    call(&obj, "Bump", &mut args).unwrap();
    assert_eq!(args[0], Value::I32(2));

    f.runtime.define("Bump", |_, args| {
        if let Value::Box(cell) = &args[0] {
            cell.set(Value::I32(41));
        }
        Value::Null
    });
    call(&obj, "Bump", &mut args).unwrap();
    assert_eq!(args[0], Value::I32(41));
}

#[test]
fn protected_members_get_helpers() {
    let f = Fixture::new();
    let ty = f.guest_shape();
    let obj = ty
        .instantiate(&mut [Value::string("Widget"), Value::string("named")])
        .unwrap();
    assert_eq!(call(&obj, "#base#Scale", &mut []).unwrap(), Value::I32(2));
    assert_eq!(call(&obj, "#field_get#origin", &mut []).unwrap(), Value::I32(1));
    call(&obj, "#field_set#origin", &mut [Value::I32(5)]).unwrap();
    assert_eq!(call(&obj, "#field_get#origin", &mut []).unwrap(), Value::I32(5));

    call_static(&ty, "#field_set#count", &mut [Value::I32(3)]).unwrap();
    assert_eq!(f.shape.get_static("count"), Some(Value::I32(3)));
    assert_eq!(call_static(&ty, "#field_get#count", &mut []).unwrap(), Value::I32(3));
}

#[test]
fn guest_objects_store_class_and_instance_data() {
    let f = Fixture::new();
    let ty = f.guest_shape();
    assert!(ty.implements(f.dispenser.guest_object_interface()));
    // Private base constructors are not mirrored.
    assert_eq!(ty.constructors().len(), 2);

    let obj = instance(&ty, "Widget");
    assert_eq!(call(&obj, "get_ImmediateClass", &mut []).unwrap(), Value::string("Widget"));
    assert_eq!(call(&obj, "TryGetInstanceData", &mut []).unwrap(), Value::Null);
    let data = call(&obj, "GetInstanceData", &mut []).unwrap();
    assert_eq!(data, Value::string("instance data"));
    assert_eq!(call(&obj, "TryGetInstanceData", &mut []).unwrap(), data);
}

#[test]
fn class_is_stored_after_the_base_constructor_runs() {
    let registry = Arc::new(TypeRegistry::with_builtins());
    let seen: Arc<Mutex<Vec<Option<Value>>>> = Arc::default();
    let observed = Arc::clone(&seen);
    let base = TypeBuilder::new("Recorder")
        .base(registry.get("Object").unwrap())
        .constructor(HostConstructor::new(vec![], MethodFlags::PUBLIC, move |this, _| {
            observed.lock().push(this.get_field(CLASS_FIELD));
            Ok(())
        }))
        .build();
    registry.register(Arc::clone(&base));
    let dispenser = TypeDispenser::new(Arc::clone(&registry), Arc::new(TestRuntime::default()));
    let ty = dispenser.get_or_create_type(&base, &[], false).unwrap();

    let obj = instance(&ty, "Widget");
    let unset: Vec<bool> = seen
        .lock()
        .iter()
        .map(|class| class.as_ref().map_or(true, Value::is_null))
        .collect();
    assert_eq!(unset, vec![true]);
    assert_eq!(call(&obj, "get_ImmediateClass", &mut []).unwrap(), Value::string("Widget"));
}

#[test]
fn exception_class_constructor_uses_the_default_message() {
    let f = Fixture::new();
    let exception = f.registry.get("Exception").unwrap();
    let ty = f.dispenser.get_or_create_type(&exception, &[], false).unwrap();

    let defaulted = instance(&ty, "Oops");
    assert_eq!(
        call(&defaulted, "get_Message", &mut []).unwrap(),
        Value::string("Oops failed")
    );
    let explicit = ty
        .instantiate(&mut [Value::string("Oops"), Value::string("explicit")])
        .unwrap();
    assert_eq!(
        call(&explicit, "get_Message", &mut []).unwrap(),
        Value::string("explicit")
    );
}

#[test]
fn bases_providing_every_feature_are_reused() {
    let f = Fixture::new();
    let guest = f.guest_shape();
    let again = f
        .dispenser
        .get_or_create_type(&guest, &[Arc::clone(&f.printable)], false)
        .unwrap();
    assert!(Arc::ptr_eq(&guest, &again));
    assert_eq!(f.dispenser.emitted_count(), 1);
    assert_eq!(
        f.dispenser.features_of(&guest),
        Some(vec![
            FeatureKey::GuestObject,
            FeatureKey::Interfaces(vec![f.printable.id()]),
        ])
    );
}

#[test]
fn emitted_bases_are_reused_for_their_recorded_features() {
    let f = Fixture::new();
    let guest = f.guest_shape();
    // Same normalized feature set, spelled with the implied interface.
    for suppress_overrides in [false, true] {
        let again = f
            .dispenser
            .get_or_create_type(
                &guest,
                &[Arc::clone(&f.printable), Arc::clone(&f.drawable)],
                suppress_overrides,
            )
            .unwrap();
        assert!(Arc::ptr_eq(&guest, &again));
    }
    assert_eq!(f.dispenser.emitted_count(), 1);
    assert_eq!(f.dispenser.features_of(&f.shape), None);
}

#[test]
fn derived_guest_types_pass_the_class_through() {
    let f = Fixture::new();
    let guest = f.guest_shape();
    let extra = interface("IExtra", "Extra", &[]);
    let derived = f
        .dispenser
        .get_or_create_type(&guest, &[Arc::clone(&extra)], false)
        .unwrap();
    assert!(!Arc::ptr_eq(&guest, &derived));
    assert_eq!(derived.constructors().len(), guest.constructors().len());

    let obj = instance(&derived, "Sub");
    assert_eq!(call(&obj, "get_ImmediateClass", &mut []).unwrap(), Value::string("Sub"));
    f.runtime.define("Extra", |_, _| Value::string("extra"));
    assert_eq!(call(&obj, "Extra", &mut []).unwrap(), Value::string("extra"));
}

#[test]
fn suppressed_overrides_leave_virtuals_alone() {
    let f = Fixture::new();
    let ty = f.dispenser.get_or_create_type(&f.shape, &[], true).unwrap();
    assert!(ty.find_declared_method("Area", 0).is_none());
    assert!(ty.find_declared_method("#base#Area", 0).is_none());
    f.runtime.define("Area", |_, _| Value::F64(9.0));
    let obj = instance(&ty, "Widget");
    assert_eq!(call(&obj, "Area", &mut []).unwrap(), Value::F64(1.5));
}

#[test]
fn accessor_names_map_to_guest_names() {
    let method = |name: &str, flags| HostMethod::new(name, vec![], ExprType::Void, flags, vesta_object::MethodBody::Abstract);
    assert_eq!(guest_name(&method("get_Size", ACCESSOR)), "Size");
    assert_eq!(guest_name(&method("set_Size", ACCESSOR)), "Size=");
    assert_eq!(guest_name(&method("get_Item", ACCESSOR)), "[]");
    assert_eq!(guest_name(&method("set_Item", ACCESSOR)), "[]=");
    assert_eq!(guest_name(&method("get_Size", VIRTUAL)), "get_Size");
    assert_eq!(guest_name(&method("Run", ACCESSOR)), "Run");
}
