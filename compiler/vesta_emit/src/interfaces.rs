//! The interfaces feature: declares the requested interfaces and routes
//! every interface method the base does not implement to the guest class.

use std::sync::Arc;

use vesta_object::{HostType, TypeRef};

use crate::emitter::TypeEmitter;
use crate::feature::{FeatureBuilder, FeatureKey, TypeFeature};
use crate::names::guest_name;

#[derive(Debug)]
pub struct InterfacesFeature {
    interfaces: Vec<TypeRef>,
}

impl InterfacesFeature {
    /// `interfaces` must already be normalized.
    pub fn new(interfaces: Vec<TypeRef>) -> Self {
        InterfacesFeature { interfaces }
    }

    pub fn interfaces(&self) -> &[TypeRef] {
        &self.interfaces
    }
}

/// Whether a class in `ty`'s base chain declares the method.
fn has_class_implementation(ty: &HostType, name: &str, arity: usize) -> bool {
    ty.ancestry()
        .any(|t| !t.is_interface() && t.find_declared_method(name, arity).is_some())
}

/// Every interface in `interfaces` plus the interfaces they extend.
fn closure_of(interfaces: &[TypeRef]) -> Vec<TypeRef> {
    let mut all: Vec<TypeRef> = Vec::new();
    for iface in interfaces {
        for t in std::iter::once(Arc::clone(iface)).chain(iface.all_interfaces()) {
            if !all.iter().any(|a| a.id() == t.id()) {
                all.push(t);
            }
        }
    }
    all
}

impl TypeFeature for InterfacesFeature {
    fn key(&self) -> FeatureKey {
        FeatureKey::Interfaces(self.interfaces.iter().map(|t| t.id()).collect())
    }

    /// Declared and actually implemented: no interface method is left to
    /// its interface.
    fn is_implemented_by(&self, ty: &TypeRef) -> bool {
        self.interfaces.iter().all(|iface| ty.implements(iface))
            && closure_of(&self.interfaces).iter().all(|iface| {
                iface
                    .methods()
                    .iter()
                    .all(|m| has_class_implementation(ty, m.name(), m.arity()))
            })
    }

    fn make_builder(&self) -> Box<dyn FeatureBuilder + '_> {
        Box::new(InterfacesBuilder {
            interfaces: &self.interfaces,
        })
    }
}

struct InterfacesBuilder<'a> {
    interfaces: &'a [TypeRef],
}

impl FeatureBuilder for InterfacesBuilder<'_> {
    fn implement(&mut self, emitter: &mut TypeEmitter) {
        for iface in self.interfaces {
            emitter.builder_mut().add_interface(Arc::clone(iface));
        }
        for iface in closure_of(self.interfaces) {
            for method in iface.methods() {
                if method.is_static()
                    || has_class_implementation(emitter.base(), method.name(), method.arity())
                    || emitter.builder().has_method(method.name(), method.arity())
                {
                    continue;
                }
                let name = guest_name(method).into_owned();
                emitter.define_virtual_override(method, &name);
            }
        }
    }
}
