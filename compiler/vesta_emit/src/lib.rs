//! Vesta Emit - host types synthesized at run time for guest classes.
//!
//! A guest class that derives from a host type, or implements host
//! interfaces, needs a host type of its own so that host code calling a
//! virtual method on one of its instances reaches the guest override.
//!
//! # Architecture
//!
//! - [`TypeDispenser`]: cache of emitted types keyed by base and features
//! - [`TypeFeature`] / [`FeatureBuilder`]: the guest-object and interfaces
//!   features an emitted type is assembled from
//! - [`TypeEmitter`]: the type under construction; overrides, base helpers,
//!   field accessors and dispatch sites
//! - [`GuestRuntime`] / [`GuestCallSite`]: the guest language, as seen from
//!   emitted members

mod dispenser;
mod emitter;
mod error;
mod feature;
mod guest_object;
mod interfaces;
pub mod names;
mod runtime;

pub use dispenser::{DispenserConfig, TypeDispenser};
pub use emitter::{SiteSlot, TypeEmitter};
pub use error::EmitError;
pub use feature::{normalize_interfaces, FeatureBuilder, FeatureKey, TypeFeature};
pub use guest_object::{guest_object_interface, GuestObjectFeature, GUEST_OBJECT_INTERFACE};
pub use interfaces::InterfacesFeature;
pub use runtime::{CallConvention, GuestCallSite, GuestRuntime, SiteOutcome};

#[cfg(test)]
mod tests;
