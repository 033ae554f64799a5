//! Host types and their builder.
//!
//! # Architecture
//!
//! A `HostType` is immutable once built: single base type, declared
//! interfaces, fields, methods and constructors. Only static field values
//! are mutable. Types are shared as `TypeRef` and compared by identity
//! (`HostTypeId`), so two structurally equal types are still distinct.
//!
//! Method lookup walks from the most derived type to the root, which makes
//! a method declared in a derived type override a same-named method of a
//! base type.

use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use bitflags::bitflags;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use vesta_ir::ExprType;

use super::method::{HostConstructor, HostMethod, MethodRef};
use super::object::ObjectRef;
use crate::errors::{invalid_operation, wrong_arg_count, EvalResult};
use crate::value::Value;

bitflags! {
    #[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default)]
    pub struct TypeFlags: u8 {
        const SEALED = 1;
        const ABSTRACT = 1 << 1;
        const INTERFACE = 1 << 2;
    }
}

bitflags! {
    #[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default)]
    pub struct FieldFlags: u8 {
        const PUBLIC = 1;
        const PROTECTED = 1 << 1;
        const PRIVATE = 1 << 2;
        const STATIC = 1 << 3;
        const INIT_ONLY = 1 << 4;
        /// Compile-time constant; the value is on the definition.
        const LITERAL = 1 << 5;
    }
}

/// Process-unique identity of a host type.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct HostTypeId(u32);

impl HostTypeId {
    fn fresh() -> Self {
        static NEXT: AtomicU32 = AtomicU32::new(1);
        HostTypeId(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    pub fn raw(self) -> u32 {
        self.0
    }
}

/// A field declaration.
#[derive(Clone, Debug)]
pub struct FieldDef {
    pub name: String,
    pub ty: ExprType,
    pub flags: FieldFlags,
    /// Constant value for literal fields, initial value for static fields.
    pub value: Option<Value>,
}

impl FieldDef {
    pub fn new(name: impl Into<String>, ty: ExprType, flags: FieldFlags) -> Self {
        FieldDef {
            name: name.into(),
            ty,
            flags,
            value: None,
        }
    }

    #[must_use]
    pub fn with_value(mut self, value: Value) -> Self {
        self.value = Some(value);
        self
    }

    /// Literal fields are static.
    pub fn is_static(&self) -> bool {
        self.flags.intersects(FieldFlags::STATIC | FieldFlags::LITERAL)
    }

    pub fn is_protected(&self) -> bool {
        self.flags.contains(FieldFlags::PROTECTED)
    }

    pub fn is_literal(&self) -> bool {
        self.flags.contains(FieldFlags::LITERAL)
    }

    pub fn is_init_only(&self) -> bool {
        self.flags.contains(FieldFlags::INIT_ONLY)
    }
}

/// A host class or interface.
pub struct HostType {
    id: HostTypeId,
    name: String,
    base: Option<TypeRef>,
    flags: TypeFlags,
    interfaces: Vec<TypeRef>,
    fields: Vec<FieldDef>,
    methods: Vec<MethodRef>,
    constructors: Vec<Arc<HostConstructor>>,
    statics: Mutex<FxHashMap<String, Value>>,
}

/// Shared handle to a host type.
pub type TypeRef = Arc<HostType>;

impl HostType {
    pub fn id(&self) -> HostTypeId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn base(&self) -> Option<&TypeRef> {
        self.base.as_ref()
    }

    pub fn flags(&self) -> TypeFlags {
        self.flags
    }

    pub fn is_sealed(&self) -> bool {
        self.flags.contains(TypeFlags::SEALED)
    }

    pub fn is_abstract(&self) -> bool {
        self.flags.contains(TypeFlags::ABSTRACT)
    }

    pub fn is_interface(&self) -> bool {
        self.flags.contains(TypeFlags::INTERFACE)
    }

    /// Interfaces declared directly on this type.
    pub fn interfaces(&self) -> &[TypeRef] {
        &self.interfaces
    }

    /// Fields declared directly on this type.
    pub fn fields(&self) -> &[FieldDef] {
        &self.fields
    }

    /// Methods declared directly on this type.
    pub fn methods(&self) -> &[MethodRef] {
        &self.methods
    }

    pub fn constructors(&self) -> &[Arc<HostConstructor>] {
        &self.constructors
    }

    /// This type followed by its base chain.
    pub fn ancestry(&self) -> impl Iterator<Item = &HostType> {
        std::iter::successors(Some(self), |&t| t.base.as_deref())
    }

    /// Every interface implemented by this type or its bases, including
    /// interfaces inherited by interfaces, without duplicates.
    pub fn all_interfaces(&self) -> Vec<TypeRef> {
        fn collect(iface: &TypeRef, out: &mut Vec<TypeRef>) {
            if out.iter().any(|t| t.id == iface.id) {
                return;
            }
            out.push(Arc::clone(iface));
            for parent in &iface.interfaces {
                collect(parent, out);
            }
        }
        let mut out = Vec::new();
        for ty in self.ancestry() {
            for iface in &ty.interfaces {
                collect(iface, &mut out);
            }
        }
        out
    }

    /// Reflexive subtype test against the base chain and interfaces.
    pub fn is_subclass_of(&self, other: &HostType) -> bool {
        if self.ancestry().any(|t| t.id == other.id) {
            return true;
        }
        other.is_interface() && self.implements(other)
    }

    pub fn implements(&self, iface: &HostType) -> bool {
        self.id == iface.id || self.all_interfaces().iter().any(|t| t.id == iface.id)
    }

    /// Most-derived method with the given name and arity.
    pub fn find_method(&self, name: &str, arity: usize) -> Option<MethodRef> {
        self.ancestry()
            .flat_map(|t| t.methods.iter())
            .find(|m| m.name() == name && m.arity() == arity)
            .cloned()
    }

    /// Virtual dispatch: the most-derived instance method matching `name`
    /// and `arity`, falling back to default bodies on interfaces.
    pub fn resolve_virtual(&self, name: &str, arity: usize) -> Option<MethodRef> {
        self.ancestry()
            .flat_map(|t| t.methods.iter())
            .find(|m| !m.is_static() && m.name() == name && m.arity() == arity)
            .cloned()
            .or_else(|| {
                self.all_interfaces().iter().find_map(|iface| {
                    iface
                        .methods
                        .iter()
                        .find(|m| m.name() == name && m.arity() == arity)
                        .cloned()
                })
            })
    }

    pub fn find_declared_method(&self, name: &str, arity: usize) -> Option<MethodRef> {
        self.methods
            .iter()
            .find(|m| m.name() == name && m.arity() == arity)
            .cloned()
    }

    /// Field declared on this type or a base.
    pub fn find_field(&self, name: &str) -> Option<&FieldDef> {
        self.ancestry()
            .flat_map(|t| t.fields.iter())
            .find(|f| f.name == name)
    }

    /// Owner of a static field, searching the base chain.
    fn static_owner(&self, name: &str) -> Option<&HostType> {
        self.ancestry()
            .find(|t| t.fields.iter().any(|f| f.name == name && f.is_static()))
    }

    pub fn get_static(&self, name: &str) -> Option<Value> {
        let owner = self.static_owner(name)?;
        let field = owner.fields.iter().find(|f| f.name == name)?;
        if field.is_literal() {
            return field.value.clone();
        }
        Some(
            owner
                .statics
                .lock()
                .get(name)
                .cloned()
                .unwrap_or_else(|| Value::default_for(field.ty)),
        )
    }

    /// Returns `false` if no assignable static field named `name` exists.
    pub fn set_static(&self, name: &str, value: Value) -> bool {
        match self.static_owner(name) {
            Some(owner) if owner.fields.iter().any(|f| f.name == name && !f.is_literal()) => {
                owner.statics.lock().insert(name.to_string(), value);
                true
            }
            _ => false,
        }
    }

    pub fn find_constructor(&self, arity: usize) -> Option<Arc<HostConstructor>> {
        self.constructors
            .iter()
            .find(|c| c.arity() == arity)
            .cloned()
    }

    /// Allocate an instance with every instance field at its default value,
    /// without running a constructor.
    pub fn allocate(self: &TypeRef) -> ObjectRef {
        let mut fields = FxHashMap::default();
        for ty in self.ancestry() {
            for field in ty.fields.iter().filter(|f| !f.is_static()) {
                fields
                    .entry(field.name.clone())
                    .or_insert_with(|| Value::default_for(field.ty));
            }
        }
        ObjectRef::new(Arc::clone(self), fields)
    }

    /// Allocate an instance and run the constructor matching the arity of
    /// `args`.
    pub fn instantiate(self: &TypeRef, args: &mut [Value]) -> EvalResult {
        if self.is_abstract() || self.is_interface() {
            return Err(invalid_operation(format!(
                "cannot create an instance of abstract type {}",
                self.name
            )));
        }
        let ctor = self.find_constructor(args.len()).ok_or_else(|| {
            let expected = self.constructors.first().map_or(0, |c| c.arity());
            wrong_arg_count(&format!("{}..ctor", self.name), expected, args.len())
        })?;
        let obj = self.allocate();
        ctor.run(&obj, args)?;
        Ok(Value::Object(obj))
    }
}

impl PartialEq for HostType {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for HostType {}

impl fmt::Debug for HostType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HostType({}#{})", self.name, self.id.0)
    }
}

/// Builder for a [`HostType`].
///
/// Declarations are appended in order; a builder that is dropped before
/// [`TypeBuilder::build`] leaves no trace.
#[derive(Debug)]
pub struct TypeBuilder {
    name: String,
    base: Option<TypeRef>,
    flags: TypeFlags,
    interfaces: Vec<TypeRef>,
    fields: Vec<FieldDef>,
    methods: Vec<HostMethod>,
    constructors: Vec<HostConstructor>,
}

impl TypeBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        TypeBuilder {
            name: name.into(),
            base: None,
            flags: TypeFlags::empty(),
            interfaces: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
            constructors: Vec::new(),
        }
    }

    #[must_use]
    pub fn base(mut self, base: TypeRef) -> Self {
        self.base = Some(base);
        self
    }

    #[must_use]
    pub fn flags(mut self, flags: TypeFlags) -> Self {
        self.flags = flags;
        self
    }

    #[must_use]
    pub fn interface(mut self, iface: TypeRef) -> Self {
        self.add_interface(iface);
        self
    }

    #[must_use]
    pub fn field(mut self, field: FieldDef) -> Self {
        self.add_field(field);
        self
    }

    #[must_use]
    pub fn method(mut self, method: HostMethod) -> Self {
        self.add_method(method);
        self
    }

    #[must_use]
    pub fn constructor(mut self, ctor: HostConstructor) -> Self {
        self.add_constructor(ctor);
        self
    }

    pub fn add_interface(&mut self, iface: TypeRef) {
        if !self.interfaces.iter().any(|t| t.id == iface.id) {
            self.interfaces.push(iface);
        }
    }

    pub fn add_field(&mut self, field: FieldDef) {
        self.fields.push(field);
    }

    pub fn add_method(&mut self, method: HostMethod) {
        self.methods.push(method);
    }

    pub fn add_constructor(&mut self, ctor: HostConstructor) {
        self.constructors.push(ctor);
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn base_type(&self) -> Option<&TypeRef> {
        self.base.as_ref()
    }

    pub fn declared_interfaces(&self) -> &[TypeRef] {
        &self.interfaces
    }

    /// Whether a method with this name and arity was already added.
    pub fn has_method(&self, name: &str, arity: usize) -> bool {
        self.methods
            .iter()
            .any(|m| m.name() == name && m.arity() == arity)
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.fields.iter().any(|f| f.name == name)
    }

    pub fn build(self) -> TypeRef {
        let TypeBuilder {
            name,
            base,
            flags,
            interfaces,
            fields,
            methods,
            constructors,
        } = self;
        let methods = methods
            .into_iter()
            .map(|mut m| {
                m.set_declaring(&name);
                Arc::new(m)
            })
            .collect();
        let statics = fields
            .iter()
            .filter(|f| f.is_static() && !f.is_literal())
            .filter_map(|f| f.value.clone().map(|v| (f.name.clone(), v)))
            .collect();
        Arc::new(HostType {
            id: HostTypeId::fresh(),
            name,
            base,
            flags,
            interfaces,
            fields,
            methods,
            constructors: constructors.into_iter().map(Arc::new).collect(),
            statics: Mutex::new(statics),
        })
    }
}
