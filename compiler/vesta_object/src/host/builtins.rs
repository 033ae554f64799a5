//! Builtin host types: `Object`, the primitive types, `String`, `Array`
//! and the exception hierarchy raised by the interpreter.

use vesta_ir::ExprType;

use super::method::{HostConstructor, HostMethod, MethodFlags, ParamDef};
use super::registry::TypeRegistry;
use super::ty::{FieldDef, FieldFlags, TypeBuilder, TypeFlags, TypeRef};
use crate::errors::{invalid_cast, MESSAGE_FIELD};
use crate::value::Value;

/// Exception types and their bases, in registration order.
const EXCEPTION_HIERARCHY: &[(&str, &str)] = &[
    ("SystemException", "Exception"),
    ("ArithmeticException", "SystemException"),
    ("DivideByZeroException", "ArithmeticException"),
    ("OverflowException", "ArithmeticException"),
    ("InvalidCastException", "SystemException"),
    ("NullReferenceException", "SystemException"),
    ("IndexOutOfRangeException", "SystemException"),
    ("InvalidOperationException", "SystemException"),
    ("NotSupportedException", "SystemException"),
    ("ArgumentException", "SystemException"),
    ("MemberAccessException", "SystemException"),
    ("MissingMemberException", "MemberAccessException"),
    ("MissingMethodException", "MissingMemberException"),
    ("TypeLoadException", "SystemException"),
    ("StackOverflowException", "SystemException"),
    ("InvalidProgramException", "SystemException"),
    ("TargetInvocationException", "Exception"),
];

const PRIMITIVES: &[&str] = &[
    "Boolean", "SByte", "Byte", "Int16", "UInt16", "Int32", "UInt32", "Int64", "UInt64", "Single",
    "Double", "Char",
];

const VIRTUAL: MethodFlags = MethodFlags::PUBLIC.union(MethodFlags::VIRTUAL);
const PROPERTY: MethodFlags = MethodFlags::PUBLIC.union(MethodFlags::SPECIAL_NAME);

pub(super) fn install(registry: &TypeRegistry) {
    let object = object_type();
    registry.register(object.clone());

    for name in PRIMITIVES {
        registry.register(
            TypeBuilder::new(*name)
                .base(object.clone())
                .flags(TypeFlags::SEALED)
                .method(compare_to())
                .build(),
        );
    }
    registry.register(string_type(&object));
    registry.register(
        TypeBuilder::new("Array")
            .base(object.clone())
            .flags(TypeFlags::SEALED)
            .method(HostMethod::native(
                "get_Length",
                vec![],
                ExprType::I32,
                PROPERTY,
                |this, _| match this {
                    Value::Array(a) => Ok(Value::I32(i32::try_from(a.len()).unwrap_or(i32::MAX))),
                    other => Err(invalid_cast(other.type_name(), "Array")),
                },
            ))
            .build(),
    );
    registry.register(
        TypeBuilder::new("Function")
            .base(object.clone())
            .flags(TypeFlags::SEALED)
            .build(),
    );

    let exception = exception_type(&object);
    registry.register(exception.clone());
    for (name, base) in EXCEPTION_HIERARCHY {
        let base = registry.get(base).unwrap_or_else(|| exception.clone());
        registry.register(derived_exception(name, base));
    }
}

fn object_type() -> TypeRef {
    TypeBuilder::new("Object")
        .constructor(HostConstructor::new(vec![], MethodFlags::PUBLIC, |_, _| {
            Ok(())
        }))
        .method(HostMethod::native(
            "ToString",
            vec![],
            ExprType::Str,
            VIRTUAL,
            |this, _| Ok(Value::string(this.to_string())),
        ))
        .method(HostMethod::native(
            "Equals",
            vec![ParamDef::new("obj", ExprType::Object)],
            ExprType::Bool,
            VIRTUAL,
            |this, args| Ok(Value::Bool(this.equals(&args[0]))),
        ))
        .method(HostMethod::native(
            "GetHashCode",
            vec![],
            ExprType::I32,
            VIRTUAL,
            |this, _| Ok(Value::I32(this.hash_code())),
        ))
        .build()
}

fn compare_to() -> HostMethod {
    HostMethod::native(
        "CompareTo",
        vec![ParamDef::new("other", ExprType::Object)],
        ExprType::I32,
        MethodFlags::PUBLIC,
        |this, args| {
            this.compare(&args[0])
                .map(|ordering| Value::I32(ordering as i32))
                .ok_or_else(|| invalid_cast(args[0].type_name(), this.type_name()))
        },
    )
}

fn string_type(object: &TypeRef) -> TypeRef {
    TypeBuilder::new("String")
        .base(object.clone())
        .flags(TypeFlags::SEALED)
        .method(compare_to())
        .method(HostMethod::native(
            "get_Length",
            vec![],
            ExprType::I32,
            PROPERTY,
            |this, _| {
                let s = this
                    .as_str()
                    .ok_or_else(|| invalid_cast(this.type_name(), "String"))?;
                Ok(Value::I32(
                    i32::try_from(s.chars().count()).unwrap_or(i32::MAX),
                ))
            },
        ))
        .method(HostMethod::native(
            "ToUpper",
            vec![],
            ExprType::Str,
            MethodFlags::PUBLIC,
            |this, _| {
                let s = this
                    .as_str()
                    .ok_or_else(|| invalid_cast(this.type_name(), "String"))?;
                Ok(Value::string(s.to_uppercase()))
            },
        ))
        .method(HostMethod::native(
            "Concat",
            vec![
                ParamDef::new("a", ExprType::Object),
                ParamDef::new("b", ExprType::Object),
            ],
            ExprType::Str,
            MethodFlags::PUBLIC | MethodFlags::STATIC,
            |_, args| Ok(Value::string(format!("{}{}", args[0], args[1]))),
        ))
        .build()
}

/// Message of an exception object, or the host's default message.
fn message_of(this: &Value) -> String {
    let stored = this
        .as_object()
        .and_then(|o| o.get_field(MESSAGE_FIELD))
        .and_then(|m| m.as_str().map(str::to_string));
    stored.unwrap_or_else(|| format!("Exception of type '{}' was thrown.", this.type_name()))
}

fn exception_ctors() -> [HostConstructor; 2] {
    [
        HostConstructor::new(vec![], MethodFlags::PUBLIC, |_, _| Ok(())),
        HostConstructor::new(
            vec![ParamDef::new("message", ExprType::Str)],
            MethodFlags::PUBLIC,
            |this, args| this.set_field(MESSAGE_FIELD, args[0].clone()),
        ),
    ]
}

fn exception_type(object: &TypeRef) -> TypeRef {
    let [default_ctor, message_ctor] = exception_ctors();
    TypeBuilder::new("Exception")
        .base(object.clone())
        .field(FieldDef::new(
            MESSAGE_FIELD,
            ExprType::Str,
            FieldFlags::PRIVATE,
        ))
        .constructor(default_ctor)
        .constructor(message_ctor)
        .method(HostMethod::native(
            "get_Message",
            vec![],
            ExprType::Str,
            VIRTUAL | MethodFlags::SPECIAL_NAME,
            |this, _| Ok(Value::string(message_of(this))),
        ))
        .method(HostMethod::native(
            "ToString",
            vec![],
            ExprType::Str,
            VIRTUAL,
            |this, _| {
                Ok(Value::string(format!(
                    "{}: {}",
                    this.type_name(),
                    message_of(this)
                )))
            },
        ))
        .build()
}

fn derived_exception(name: &str, base: TypeRef) -> TypeRef {
    let [default_ctor, message_ctor] = exception_ctors();
    TypeBuilder::new(name)
        .base(base)
        .constructor(default_ctor)
        .constructor(message_ctor)
        .build()
}
