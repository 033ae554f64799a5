//! The guest-object feature: instance storage for the guest class and
//! guest data, the `IGuestObject` implementation, and constructors that
//! take the guest class.

use std::sync::Arc;

use vesta_ir::ExprType;
use vesta_object::errors::{internal_error, null_reference};
use vesta_object::{
    EvalError, FieldDef, FieldFlags, HostConstructor, HostMethod, MethodFlags, ObjectRef,
    ParamDef, TypeBuilder, TypeFlags, TypeRef, Value,
};

use crate::emitter::TypeEmitter;
use crate::feature::{FeatureBuilder, FeatureKey, TypeFeature};
use crate::names::{CLASS_FIELD, INSTANCE_DATA_FIELD};

/// Name of the interface every guest object implements.
pub const GUEST_OBJECT_INTERFACE: &str = "IGuestObject";

const INTERFACE_METHOD: MethodFlags = MethodFlags::PUBLIC;

/// Interface implementations that derived guest types do not override.
const SEALED_IMPL: MethodFlags = MethodFlags::PUBLIC
    .union(MethodFlags::VIRTUAL)
    .union(MethodFlags::FINAL);

/// The `IGuestObject` interface type.
pub fn guest_object_interface() -> TypeRef {
    TypeBuilder::new(GUEST_OBJECT_INTERFACE)
        .flags(TypeFlags::INTERFACE | TypeFlags::ABSTRACT)
        .method(HostMethod::abstract_method(
            "get_ImmediateClass",
            vec![],
            ExprType::Object,
            INTERFACE_METHOD | MethodFlags::SPECIAL_NAME,
        ))
        .method(HostMethod::abstract_method(
            "set_ImmediateClass",
            vec![ParamDef::new("value", ExprType::Object)],
            ExprType::Void,
            INTERFACE_METHOD | MethodFlags::SPECIAL_NAME,
        ))
        .method(HostMethod::abstract_method(
            "TryGetInstanceData",
            vec![],
            ExprType::Object,
            INTERFACE_METHOD,
        ))
        .method(HostMethod::abstract_method(
            "GetInstanceData",
            vec![],
            ExprType::Object,
            INTERFACE_METHOD,
        ))
        .build()
}

#[derive(Debug)]
pub struct GuestObjectFeature {
    interface: TypeRef,
}

impl GuestObjectFeature {
    pub fn new(interface: TypeRef) -> Self {
        GuestObjectFeature { interface }
    }
}

impl TypeFeature for GuestObjectFeature {
    fn key(&self) -> FeatureKey {
        FeatureKey::GuestObject
    }

    fn is_implemented_by(&self, ty: &TypeRef) -> bool {
        ty.implements(&self.interface)
    }

    fn make_builder(&self) -> Box<dyn FeatureBuilder + '_> {
        Box::new(GuestObjectBuilder)
    }
}

struct GuestObjectBuilder;

impl FeatureBuilder for GuestObjectBuilder {
    fn implement(&mut self, emitter: &mut TypeEmitter) {
        define_constructors(emitter);
        if !emitter.is_derived_guest_type() {
            define_guest_object(emitter);
        }
    }
}

fn object_of(this: &Value) -> Result<&ObjectRef, EvalError> {
    this.as_object().ok_or_else(null_reference)
}

fn field_of(this: &Value, name: &str) -> Result<Value, EvalError> {
    Ok(object_of(this)?.get_field(name).unwrap_or(Value::Null))
}

fn define_guest_object(emitter: &mut TypeEmitter) {
    let interface = Arc::clone(emitter.guest_interface());
    let runtime = Arc::clone(emitter.runtime());
    let builder = emitter.builder_mut();
    builder.add_interface(interface);
    builder.add_field(FieldDef::new(
        CLASS_FIELD,
        ExprType::Object,
        FieldFlags::PUBLIC,
    ));
    builder.add_field(FieldDef::new(
        INSTANCE_DATA_FIELD,
        ExprType::Object,
        FieldFlags::PUBLIC,
    ));

    let accessor = SEALED_IMPL | MethodFlags::SPECIAL_NAME;
    builder.add_method(HostMethod::native(
        "get_ImmediateClass",
        vec![],
        ExprType::Object,
        accessor,
        |this, _| field_of(this, CLASS_FIELD),
    ));
    builder.add_method(HostMethod::native(
        "set_ImmediateClass",
        vec![ParamDef::new("value", ExprType::Object)],
        ExprType::Void,
        accessor,
        |this, args| {
            object_of(this)?.set_field(CLASS_FIELD, args[0].clone())?;
            Ok(Value::Null)
        },
    ));
    builder.add_method(HostMethod::native(
        "TryGetInstanceData",
        vec![],
        ExprType::Object,
        SEALED_IMPL,
        |this, _| field_of(this, INSTANCE_DATA_FIELD),
    ));
    builder.add_method(HostMethod::native(
        "GetInstanceData",
        vec![],
        ExprType::Object,
        SEALED_IMPL,
        move |this, _| {
            let object = object_of(this)?;
            match object.get_field(INSTANCE_DATA_FIELD) {
                Some(data) if !data.is_null() => Ok(data),
                _ => {
                    let data = runtime.create_instance_data();
                    object.set_field(INSTANCE_DATA_FIELD, data.clone())?;
                    Ok(data)
                }
            }
        },
    ));
}

/// A constructor of the emitted type and the base constructor it runs.
struct ConstructorPlan {
    base: Arc<HostConstructor>,
    params: Vec<ParamDef>,
    /// The base constructor already takes the class; arguments pass through.
    pass_through: bool,
}

fn plan_constructors(emitter: &TypeEmitter) -> Vec<ConstructorPlan> {
    let pass_through = emitter.is_derived_guest_type();
    let mut plans: Vec<ConstructorPlan> = Vec::new();
    for base in emitter.base().constructors() {
        if !base.is_public() && !base.is_protected() {
            continue;
        }
        let params = if pass_through {
            base.params().to_vec()
        } else {
            std::iter::once(ParamDef::new("class", ExprType::Object))
                .chain(base.params().iter().cloned())
                .collect()
        };
        let duplicate = plans.iter().any(|p| {
            p.params.len() == params.len()
                && p.params.iter().zip(&params).all(|(a, b)| a.ty == b.ty)
        });
        if !duplicate {
            plans.push(ConstructorPlan {
                base: Arc::clone(base),
                params,
                pass_through,
            });
        }
    }
    plans
}

/// Base constructor taking a single message string.
fn message_constructor(emitter: &TypeEmitter) -> Option<Arc<HostConstructor>> {
    emitter
        .base()
        .find_constructor(1)
        .filter(|c| (c.is_public() || c.is_protected()) && c.params()[0].ty == ExprType::Str)
}

fn define_constructors(emitter: &mut TypeEmitter) {
    let plans = plan_constructors(emitter);
    let message_ctor = if emitter.is_exception() {
        message_constructor(emitter)
    } else {
        None
    };
    for plan in plans {
        let ConstructorPlan {
            base,
            params,
            pass_through,
        } = plan;
        let ctor = if pass_through {
            HostConstructor::new(params, MethodFlags::PUBLIC, move |this, args| {
                base.run(this, args)
            })
        } else {
            // An exception created with only its class gets the guest
            // language's default message.
            let message_ctor = message_ctor.clone().filter(|_| params.len() == 1);
            let runtime = Arc::clone(emitter.runtime());
            HostConstructor::new(params, MethodFlags::PUBLIC, move |this, args| {
                let Some((class, rest)) = args.split_first_mut() else {
                    return Err(internal_error("guest constructor called without a class"));
                };
                let class = class.clone();
                match &message_ctor {
                    Some(message_ctor) => {
                        let mut message = [runtime.default_exception_message(&class)];
                        message_ctor.run(this, &mut message)?;
                    }
                    None => base.run(this, rest)?,
                }
                // The class is stored once the base constructor has run.
                this.set_field(CLASS_FIELD, class)
            })
        };
        emitter.builder_mut().add_constructor(ctor);
    }
}
