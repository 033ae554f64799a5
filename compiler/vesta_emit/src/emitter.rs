//! The type under construction.
//!
//! # Overrides
//!
//! Every inherited public or protected virtual method that is not final
//! gets an override. The override asks a guest dispatch site whether the
//! guest class overrides the member; if the site answers
//! [`SiteOutcome::ForwardToBase`] the base implementation runs
//! non-virtually with the arguments unchanged.
//!
//! By-reference arguments cross the site boxed in [`StrongBox`] cells and
//! are copied back into the caller's slots once the site returns.
//!
//! # Sites
//!
//! Sites are not created while members are being defined. Each member gets
//! an empty [`SiteSlot`]; [`TypeEmitter::finish`] asks the runtime for all
//! of them at once, before the type becomes visible.

use std::sync::{Arc, OnceLock};

use vesta_object::errors::{internal_error, missing_implementation, missing_member, null_reference};
use vesta_object::{
    EvalResult, FieldFlags, HostMethod, HostType, MethodFlags, MethodRef, ParamDef, StrongBox,
    TypeBuilder, TypeRef, TypeRegistry, Value,
};

use crate::names::{BASE_METHOD_PREFIX, FIELD_GETTER_PREFIX, FIELD_SETTER_PREFIX};
use crate::runtime::{CallConvention, GuestCallSite, GuestRuntime, SiteOutcome};

/// A dispatch site filled in when the type is finished.
#[derive(Clone, Default)]
pub struct SiteSlot(Arc<OnceLock<Arc<dyn GuestCallSite>>>);

impl SiteSlot {
    fn site(&self) -> Result<&Arc<dyn GuestCallSite>, vesta_object::EvalError> {
        self.0
            .get()
            .ok_or_else(|| internal_error("guest call site used before its type was finished"))
    }
}

struct PendingSite {
    name: String,
    nargs: usize,
    convention: CallConvention,
    slot: SiteSlot,
}

/// Builds one emitted type on top of a base type.
pub struct TypeEmitter {
    builder: TypeBuilder,
    base: TypeRef,
    runtime: Arc<dyn GuestRuntime>,
    registry: Arc<TypeRegistry>,
    guest_interface: TypeRef,
    pending_sites: Vec<PendingSite>,
    overridden: Vec<MethodRef>,
}

const OVERRIDE_FLAGS: MethodFlags = MethodFlags::PUBLIC
    .union(MethodFlags::PROTECTED)
    .union(MethodFlags::SPECIAL_NAME);

impl TypeEmitter {
    pub fn new(
        name: impl Into<String>,
        base: TypeRef,
        runtime: Arc<dyn GuestRuntime>,
        registry: Arc<TypeRegistry>,
        guest_interface: TypeRef,
    ) -> Self {
        TypeEmitter {
            builder: TypeBuilder::new(name).base(Arc::clone(&base)),
            base,
            runtime,
            registry,
            guest_interface,
            pending_sites: Vec::new(),
            overridden: Vec::new(),
        }
    }

    pub fn base(&self) -> &TypeRef {
        &self.base
    }

    pub fn runtime(&self) -> &Arc<dyn GuestRuntime> {
        &self.runtime
    }

    pub fn registry(&self) -> &Arc<TypeRegistry> {
        &self.registry
    }

    pub fn guest_interface(&self) -> &TypeRef {
        &self.guest_interface
    }

    pub fn builder(&self) -> &TypeBuilder {
        &self.builder
    }

    pub fn builder_mut(&mut self) -> &mut TypeBuilder {
        &mut self.builder
    }

    /// The base is itself a guest type: it already stores the class and
    /// its constructors already take it.
    pub fn is_derived_guest_type(&self) -> bool {
        self.base.implements(&self.guest_interface)
    }

    /// Whether the base derives from the host `Exception` type.
    pub fn is_exception(&self) -> bool {
        self.registry
            .get("Exception")
            .is_some_and(|exception| self.base.is_subclass_of(&exception))
    }

    /// Reserve a dispatch site for the guest member `name`.
    pub fn allocate_site(
        &mut self,
        name: impl Into<String>,
        nargs: usize,
        convention: CallConvention,
    ) -> SiteSlot {
        let slot = SiteSlot::default();
        self.pending_sites.push(PendingSite {
            name: name.into(),
            nargs,
            convention,
            slot: slot.clone(),
        });
        slot
    }

    /// Define an override of `method` dispatching to the guest member
    /// `guest_name`.
    pub fn define_virtual_override(&mut self, method: &MethodRef, guest_name: &str) {
        let convention = if method.has_params_array() {
            CallConvention::List
        } else {
            CallConvention::Simple
        };
        let slot = self.allocate_site(guest_name, method.arity(), convention);
        let runtime = Arc::clone(&self.runtime);
        let base = Arc::clone(method);
        let flags = (method.flags() & OVERRIDE_FLAGS) | MethodFlags::VIRTUAL;
        tracing::trace!(method = ?method, guest_name, "overriding");
        self.builder.add_method(HostMethod::native(
            method.name(),
            method.params().to_vec(),
            method.return_type(),
            flags,
            move |this, args| dispatch_override(&slot, runtime.as_ref(), &base, this, args),
        ));
        self.overridden.push(Arc::clone(method));
    }

    /// Define `#base#<name>`, calling `method` without virtual dispatch.
    pub fn define_base_helper(&mut self, method: &MethodRef) {
        let name = format!("{BASE_METHOD_PREFIX}{}", method.name());
        if self.builder.has_method(&name, method.arity()) {
            return;
        }
        let mut flags = MethodFlags::PUBLIC | MethodFlags::SPECIAL_NAME;
        if method.is_static() {
            flags |= MethodFlags::STATIC;
        }
        let target = Arc::clone(method);
        self.builder.add_method(HostMethod::native(
            name,
            method.params().to_vec(),
            method.return_type(),
            flags,
            move |this, args| call_base(&target, this, args),
        ));
    }

    /// Override every overridable inherited method and add base helpers for
    /// the overridden and the protected non-virtual ones.
    pub fn override_methods(&mut self) {
        for method in inherited_methods(&self.base) {
            if !method.is_public() && !method.is_protected() {
                continue;
            }
            if method.is_virtual() && !method.is_final() && !method.is_static() {
                if !self.builder.has_method(method.name(), method.arity()) {
                    let guest_name = crate::names::guest_name(&method).into_owned();
                    self.define_virtual_override(&method, &guest_name);
                }
                self.define_base_helper(&method);
            } else if method.is_protected() {
                self.define_base_helper(&method);
            }
        }
    }

    /// Define `#field_get#<name>` and `#field_set#<name>` for the protected
    /// fields of the base chain.
    pub fn define_field_accessors(&mut self) {
        let fields: Vec<_> = self
            .base
            .ancestry()
            .flat_map(HostType::fields)
            .filter(|f| f.is_protected())
            .cloned()
            .collect();
        for field in fields {
            let is_static = field.is_static();
            let mut flags = MethodFlags::PUBLIC | MethodFlags::SPECIAL_NAME;
            if is_static {
                flags |= MethodFlags::STATIC;
            }

            let owner = Arc::clone(&self.base);
            let name = field.name.clone();
            self.builder.add_method(HostMethod::native(
                format!("{FIELD_GETTER_PREFIX}{}", field.name),
                vec![],
                field.ty,
                flags,
                move |this, _| {
                    if is_static {
                        return owner
                            .get_static(&name)
                            .ok_or_else(|| missing_member(owner.name(), &name));
                    }
                    let object = this.as_object().ok_or_else(null_reference)?;
                    object
                        .get_field(&name)
                        .ok_or_else(|| missing_member(object.ty().name(), &name))
                },
            ));

            if field.flags.intersects(FieldFlags::LITERAL | FieldFlags::INIT_ONLY) {
                continue;
            }
            let owner = Arc::clone(&self.base);
            let name = field.name.clone();
            self.builder.add_method(HostMethod::native(
                format!("{FIELD_SETTER_PREFIX}{}", field.name),
                vec![ParamDef::new("value", field.ty)],
                vesta_ir::ExprType::Void,
                flags,
                move |this, args| {
                    let value = args[0].clone();
                    if is_static {
                        if owner.set_static(&name, value) {
                            return Ok(Value::Null);
                        }
                        return Err(missing_member(owner.name(), &name));
                    }
                    let object = this.as_object().ok_or_else(null_reference)?;
                    object.set_field(&name, value)?;
                    Ok(Value::Null)
                },
            ));
        }
    }

    /// Methods overridden so far, in definition order.
    pub fn overridden(&self) -> &[MethodRef] {
        &self.overridden
    }

    /// Create the pending sites, build the type and register it.
    pub fn finish(self) -> TypeRef {
        let TypeEmitter {
            builder,
            runtime,
            registry,
            pending_sites,
            ..
        } = self;
        for pending in &pending_sites {
            let site = runtime.make_call_site(&pending.name, pending.nargs, pending.convention);
            // Slots are fresh and only filled here.
            let _ = pending.slot.0.set(site);
        }
        let ty = builder.build();
        tracing::debug!(
            ty = ty.name(),
            sites = pending_sites.len(),
            "emitted guest type"
        );
        registry.register(Arc::clone(&ty));
        ty
    }
}

/// Instance and static methods visible on `ty`, the most derived
/// declaration of each signature only.
fn inherited_methods(ty: &TypeRef) -> Vec<MethodRef> {
    let mut methods: Vec<MethodRef> = Vec::new();
    for method in ty.ancestry().flat_map(HostType::methods) {
        if !methods.iter().any(|m| m.same_signature(method)) {
            methods.push(Arc::clone(method));
        }
    }
    methods
}

fn dispatch_override(
    slot: &SiteSlot,
    runtime: &dyn GuestRuntime,
    base: &HostMethod,
    this: &Value,
    args: &mut [Value],
) -> EvalResult {
    let site = slot.site()?;
    let mut marshalled: Vec<Value> = args
        .iter()
        .zip(base.params())
        .map(|(arg, param)| {
            if param.by_ref {
                Value::Box(StrongBox::new(arg.clone()))
            } else {
                arg.clone()
            }
        })
        .collect();
    let outcome = site.invoke(this, &mut marshalled)?;
    for ((arg, param), sent) in args.iter_mut().zip(base.params()).zip(&marshalled) {
        if let (true, Value::Box(cell)) = (param.by_ref, sent) {
            *arg = cell.get();
        }
    }
    match outcome {
        SiteOutcome::ForwardToBase => call_base(base, this, args),
        SiteOutcome::Value(_) if base.return_type().is_void() => Ok(Value::Null),
        SiteOutcome::Value(value) => runtime.convert(value, base.return_type()),
    }
}

/// Run `method`'s own body. Abstract methods have none.
fn call_base(method: &HostMethod, this: &Value, args: &mut [Value]) -> EvalResult {
    if method.is_abstract() {
        return Err(missing_implementation(method.declaring_type(), method.name()));
    }
    method.invoke(this, args)
}
