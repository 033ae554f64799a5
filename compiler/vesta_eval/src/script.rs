//! Script code: a compiled unit of guest code and its run-time services.
//!
//! # Architecture
//!
//! A `ScriptCode` bundles the frozen expression arena and its entry lambda
//! with everything evaluation of that tree needs: the string interner, the
//! host type registry, the binders referenced by `Dynamic` nodes (indexed
//! by `BinderId`, in the order they were added), the guest language
//! context, the evaluation policy and an optional call profiler.
//!
//! It also owns the dynamic call-site cache, keyed by the arena and node of
//! each `Dynamic` expression and guarded by a single mutex.

use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use vesta_ir::{BinderId, ExprId, SharedArena, SharedInterner, StringInterner};
use vesta_object::errors::internal_error;
use vesta_object::{EvalError, TypeRegistry};

use crate::binder::Binder;
use crate::config::EvalConfig;
use crate::exec::dynamic::{CallSiteInfo, SiteKey};
use crate::language::{DefaultLanguageContext, LanguageContext};
use crate::profiler::CallProfiler;

/// A unit of guest code ready to run.
pub struct ScriptCode {
    name: String,
    arena: SharedArena,
    entry: ExprId,
    interner: SharedInterner,
    registry: Arc<TypeRegistry>,
    binders: Vec<Arc<dyn Binder>>,
    language: Arc<dyn LanguageContext>,
    config: EvalConfig,
    profiler: Option<Arc<CallProfiler>>,
    pub(crate) call_sites: Mutex<FxHashMap<SiteKey, CallSiteInfo>>,
}

impl ScriptCode {
    pub fn builder(arena: SharedArena, entry: ExprId, interner: SharedInterner) -> ScriptCodeBuilder {
        ScriptCodeBuilder::new(arena, entry, interner)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn arena(&self) -> &SharedArena {
        &self.arena
    }

    /// The top-level lambda.
    pub fn entry(&self) -> ExprId {
        self.entry
    }

    pub fn interner(&self) -> &StringInterner {
        &self.interner
    }

    pub fn registry(&self) -> &Arc<TypeRegistry> {
        &self.registry
    }

    pub fn language(&self) -> &dyn LanguageContext {
        self.language.as_ref()
    }

    pub fn config(&self) -> &EvalConfig {
        &self.config
    }

    pub fn profiler(&self) -> Option<&Arc<CallProfiler>> {
        self.profiler.as_ref()
    }

    pub fn binder(&self, id: BinderId) -> Result<&Arc<dyn Binder>, EvalError> {
        self.binders
            .get(id.index())
            .ok_or_else(|| internal_error(format!("unknown binder #{}", id.index())))
    }

    /// Invocation count of a dynamic node, or `None` if it never ran.
    pub fn site_invocations(&self, node: ExprId) -> Option<u32> {
        let key = SiteKey::new(self.arena.id(), node);
        self.call_sites.lock().get(&key).map(|info| info.counter)
    }

    /// Whether a dynamic node has been promoted to a call site.
    pub fn has_call_site(&self, node: ExprId) -> bool {
        let key = SiteKey::new(self.arena.id(), node);
        self.call_sites
            .lock()
            .get(&key)
            .is_some_and(|info| info.site.is_some())
    }
}

impl std::fmt::Debug for ScriptCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptCode")
            .field("name", &self.name)
            .field("entry", &self.entry)
            .field("binders", &self.binders.len())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Builder for [`ScriptCode`].
#[must_use]
pub struct ScriptCodeBuilder {
    name: String,
    arena: SharedArena,
    entry: ExprId,
    interner: SharedInterner,
    registry: Option<Arc<TypeRegistry>>,
    binders: Vec<Arc<dyn Binder>>,
    language: Option<Arc<dyn LanguageContext>>,
    config: EvalConfig,
    profiler: Option<Arc<CallProfiler>>,
}

impl ScriptCodeBuilder {
    pub fn new(arena: SharedArena, entry: ExprId, interner: SharedInterner) -> Self {
        ScriptCodeBuilder {
            name: "<script>".to_string(),
            arena,
            entry,
            interner,
            registry: None,
            binders: Vec::new(),
            language: None,
            config: EvalConfig::default(),
            profiler: None,
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Host types visible to the script. Defaults to the builtin types.
    pub fn registry(mut self, registry: Arc<TypeRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Append a binder; its `BinderId` is its position.
    pub fn binder(mut self, binder: Arc<dyn Binder>) -> Self {
        self.binders.push(binder);
        self
    }

    pub fn language(mut self, language: Arc<dyn LanguageContext>) -> Self {
        self.language = Some(language);
        self
    }

    pub fn config(mut self, config: EvalConfig) -> Self {
        self.config = config;
        self
    }

    /// Share a profiler between scripts. Implies `profile_calls`.
    pub fn profiler(mut self, profiler: Arc<CallProfiler>) -> Self {
        self.profiler = Some(profiler);
        self.config.profile_calls = true;
        self
    }

    pub fn build(self) -> Arc<ScriptCode> {
        let profiler = match self.profiler {
            Some(profiler) => Some(profiler),
            None if self.config.profile_calls => Some(Arc::new(CallProfiler::new())),
            None => None,
        };
        Arc::new(ScriptCode {
            name: self.name,
            arena: self.arena,
            entry: self.entry,
            interner: self.interner,
            registry: self
                .registry
                .unwrap_or_else(|| Arc::new(TypeRegistry::with_builtins())),
            binders: self.binders,
            language: self
                .language
                .unwrap_or_else(|| Arc::new(DefaultLanguageContext)),
            config: self.config,
            profiler,
            call_sites: Mutex::new(FxHashMap::default()),
        })
    }
}
