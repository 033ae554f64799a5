//! Type features: the units an emitted type is assembled from.
//!
//! A request for a guest type is turned into a list of features. Each
//! feature can tell whether an existing type already provides it; if every
//! feature is provided by the base the base is used as is. Otherwise each
//! feature contributes members to the type under construction through its
//! [`FeatureBuilder`].

use std::fmt;

use vesta_object::{HostTypeId, TypeRef};

use crate::emitter::TypeEmitter;
use crate::error::EmitError;

/// Value identity of a feature, part of the dispenser's cache key.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FeatureKey {
    GuestObject,
    /// Normalized interface list.
    Interfaces(Vec<HostTypeId>),
}

pub trait TypeFeature: Send + Sync + fmt::Debug {
    fn key(&self) -> FeatureKey;

    /// Whether `ty` already provides this feature.
    fn is_implemented_by(&self, ty: &TypeRef) -> bool;

    fn make_builder(&self) -> Box<dyn FeatureBuilder + '_>;
}

/// Adds one feature's members to a type under construction.
pub trait FeatureBuilder {
    fn implement(&mut self, emitter: &mut TypeEmitter);
}

/// Canonical form of a requested interface list: interfaces implied by
/// another requested interface are dropped, duplicates removed, the rest
/// ordered by name.
pub fn normalize_interfaces(interfaces: &[TypeRef]) -> Result<Vec<TypeRef>, EmitError> {
    if let Some(class) = interfaces.iter().find(|t| !t.is_interface()) {
        return Err(EmitError::NotAnInterface(class.name().to_string()));
    }
    let mut kept: Vec<TypeRef> = Vec::with_capacity(interfaces.len());
    for iface in interfaces {
        let implied = interfaces
            .iter()
            .any(|other| other.id() != iface.id() && other.implements(iface));
        if !implied && !kept.iter().any(|k| k.id() == iface.id()) {
            kept.push(TypeRef::clone(iface));
        }
    }
    kept.sort_by(|a, b| a.name().cmp(b.name()).then(a.id().cmp(&b.id())));
    Ok(kept)
}
