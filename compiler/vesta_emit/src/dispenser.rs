//! Process-wide cache of emitted guest types.
//!
//! Requests are keyed by base type, normalized feature set and the
//! suppress-overrides flag. Equal requests return the identical type.
//! Lookup and emission happen under one lock, so a type is emitted at most
//! once per key even when requested from many threads.

use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use vesta_object::{HostTypeId, TypeRef, TypeRegistry};

use crate::emitter::TypeEmitter;
use crate::error::EmitError;
use crate::feature::{normalize_interfaces, FeatureKey, TypeFeature};
use crate::guest_object::{guest_object_interface, GuestObjectFeature};
use crate::interfaces::InterfacesFeature;
use crate::runtime::GuestRuntime;

/// Emitter settings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DispenserConfig {
    /// Emitted types are named `<prefix>.<base>$<n>`.
    pub type_name_prefix: String,
}

impl Default for DispenserConfig {
    fn default() -> Self {
        DispenserConfig {
            type_name_prefix: "Vesta.Guest".to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct TypeKey {
    base: HostTypeId,
    features: Vec<FeatureKey>,
    suppress_overrides: bool,
}

#[derive(Default)]
struct DispenserState {
    types: FxHashMap<TypeKey, TypeRef>,
    /// Feature sets of the types emitted here. An emitted base requested
    /// again with its own feature set is reused as is.
    features: FxHashMap<HostTypeId, Vec<FeatureKey>>,
    emitted: usize,
}

pub struct TypeDispenser {
    config: DispenserConfig,
    registry: Arc<TypeRegistry>,
    runtime: Arc<dyn GuestRuntime>,
    guest_interface: TypeRef,
    state: Mutex<DispenserState>,
}

impl TypeDispenser {
    pub fn new(registry: Arc<TypeRegistry>, runtime: Arc<dyn GuestRuntime>) -> Self {
        Self::with_config(registry, runtime, DispenserConfig::default())
    }

    /// A dispenser emitting into `registry`. Registers the `IGuestObject`
    /// interface there.
    pub fn with_config(
        registry: Arc<TypeRegistry>,
        runtime: Arc<dyn GuestRuntime>,
        config: DispenserConfig,
    ) -> Self {
        let guest_interface = guest_object_interface();
        registry.register(Arc::clone(&guest_interface));
        TypeDispenser {
            config,
            registry,
            runtime,
            guest_interface,
            state: Mutex::new(DispenserState::default()),
        }
    }

    pub fn config(&self) -> &DispenserConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<TypeRegistry> {
        &self.registry
    }

    pub fn guest_object_interface(&self) -> &TypeRef {
        &self.guest_interface
    }

    /// Number of types emitted so far.
    pub fn emitted_count(&self) -> usize {
        self.state.lock().emitted
    }

    /// Feature set of a type this dispenser emitted.
    pub fn features_of(&self, ty: &TypeRef) -> Option<Vec<FeatureKey>> {
        self.state.lock().features.get(&ty.id()).cloned()
    }

    /// The guest type deriving from `base` and implementing `interfaces`.
    #[tracing::instrument(level = "debug", skip_all, fields(base = base.name()))]
    pub fn get_or_create_type(
        &self,
        base: &TypeRef,
        interfaces: &[TypeRef],
        suppress_overrides: bool,
    ) -> Result<TypeRef, EmitError> {
        if base.is_sealed() || base.is_interface() {
            return Err(EmitError::SealedBase(base.name().to_string()));
        }
        let features: [Box<dyn TypeFeature>; 2] = [
            Box::new(GuestObjectFeature::new(Arc::clone(&self.guest_interface))),
            Box::new(InterfacesFeature::new(normalize_interfaces(interfaces)?)),
        ];
        let key = TypeKey {
            base: base.id(),
            features: features.iter().map(|f| f.key()).collect(),
            suppress_overrides,
        };

        let mut state = self.state.lock();
        if let Some(ty) = state.types.get(&key) {
            return Ok(Arc::clone(ty));
        }
        let emitted_with_same_features = state
            .features
            .get(&base.id())
            .is_some_and(|recorded| *recorded == key.features);
        let ty = if emitted_with_same_features
            || features.iter().all(|f| f.is_implemented_by(base))
        {
            tracing::trace!(emitted_with_same_features, "base already provides every feature");
            Arc::clone(base)
        } else {
            state.emitted += 1;
            let ty = self.emit(base, &features, suppress_overrides, state.emitted);
            state.features.insert(ty.id(), key.features.clone());
            ty
        };
        state.types.insert(key, Arc::clone(&ty));
        Ok(ty)
    }

    fn emit(
        &self,
        base: &TypeRef,
        features: &[Box<dyn TypeFeature>],
        suppress_overrides: bool,
        index: usize,
    ) -> TypeRef {
        let name = format!("{}.{}${index}", self.config.type_name_prefix, base.name());
        let mut emitter = TypeEmitter::new(
            name,
            Arc::clone(base),
            Arc::clone(&self.runtime),
            Arc::clone(&self.registry),
            Arc::clone(&self.guest_interface),
        );
        for feature in features {
            feature.make_builder().implement(&mut emitter);
        }
        if !suppress_overrides {
            emitter.override_methods();
        }
        emitter.define_field_accessors();
        emitter.finish()
    }
}

impl std::fmt::Debug for TypeDispenser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypeDispenser")
            .field("config", &self.config)
            .field("emitted", &self.emitted_count())
            .finish_non_exhaustive()
    }
}
