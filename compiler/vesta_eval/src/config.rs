//! Interpreter configuration.
//!
//! One `EvalConfig` is fixed per script code when it is built (see
//! [`ScriptCodeBuilder`](crate::ScriptCodeBuilder)); every activation,
//! generator and call site of that script reads the same policy.

/// Default number of interpreted evaluations of a dynamic node before its
/// call site is compiled.
pub const DEFAULT_SITE_COMPILE_THRESHOLD: u32 = 2;

/// Evaluation policy for one script code.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EvalConfig {
    /// A dynamic node switches to a call site once its invocation counter
    /// exceeds this value.
    pub site_compile_threshold: u32,
    /// Maximum guest call depth, or `None` to rely on stack growth alone.
    pub max_call_depth: Option<usize>,
    /// Record reflective host calls in a [`CallProfiler`](crate::CallProfiler).
    pub profile_calls: bool,
    /// Check each binding's applicability guard against the arguments it
    /// was produced for. Always on in debug builds.
    pub verify_bindings: bool,
}

impl Default for EvalConfig {
    fn default() -> Self {
        EvalConfig {
            site_compile_threshold: DEFAULT_SITE_COMPILE_THRESHOLD,
            max_call_depth: default_max_call_depth(),
            profile_calls: false,
            verify_bindings: false,
        }
    }
}

impl EvalConfig {
    /// Whether binding guards are evaluated after each bind.
    #[inline]
    pub fn verifies_bindings(&self) -> bool {
        self.verify_bindings || cfg!(debug_assertions)
    }

    /// Whether a dynamic node seen `count` times runs through its call site.
    #[inline]
    pub fn should_compile_site(&self, count: u32) -> bool {
        count > self.site_compile_threshold
    }

    /// Whether a call at `depth` exceeds the configured limit.
    #[inline]
    pub fn exceeds_call_depth(&self, depth: usize) -> bool {
        self.max_call_depth.is_some_and(|max| depth > max)
    }
}

/// `None` on native targets (stacker grows the stack), a fixed bound on WASM.
fn default_max_call_depth() -> Option<usize> {
    #[cfg(target_arch = "wasm32")]
    {
        Some(200)
    }
    #[cfg(not(target_arch = "wasm32"))]
    {
        None
    }
}
