//! Script evaluation port.
//!
//! The processor never parses or runs script code itself.  It drives an
//! external engine through [`ScriptEngine`], which only has to offer scopes
//! with parent fallback, evaluation, and binding lookup.  The Lua backend in
//! [`crate::lua`] is the implementation shipped with this crate.

use crate::value::Value;

/// A script failed to load or run.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{source_name}: {message}")]
pub struct EvalError {
    /// Chunk name given to the engine (`sharedEnv`, `declare_0`, …).
    pub source_name: String,
    pub message: String,
}

impl EvalError {
    pub fn new(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            source_name: source_name.into(),
            message: message.into(),
        }
    }
}

/// Capability consumed from a scripting engine.
///
/// One engine instance backs one processor: it owns the shared scope built
/// at construction time and every per-render instance scope derived from it.
/// Implementations must bound runaway scripts themselves (step or time
/// limits); the processor has no cancellation of its own.
pub trait ScriptEngine: Send + Sync {
    /// Handle to a scope living inside the engine.
    type Scope: Send + Sync;

    /// Create a scope.  With no parent the scope starts out holding the
    /// engine's standard bindings.  With a parent, failed lookups fall back
    /// to the parent while every write stays in the new scope.
    fn create_scope(&self, parent: Option<&Self::Scope>) -> Result<Self::Scope, EvalError>;

    /// Run `source` for its side effects on `scope`.
    fn evaluate(&self, scope: &Self::Scope, source: &str, source_name: &str)
        -> Result<(), EvalError>;

    /// Bind the value of `expression` to `name` in `scope`.
    fn evaluate_binding(
        &self,
        scope: &Self::Scope,
        name: &str,
        expression: &str,
        source_name: &str,
    ) -> Result<(), EvalError>;

    /// Read `name` from `scope`, following parent fallback.
    fn read_binding(&self, scope: &Self::Scope, name: &str) -> Result<Value, EvalError>;

    /// Make `scope` structurally immutable.  Later writes to it, or to any
    /// object reachable from it, must fail instead of taking effect.
    fn seal(&self, scope: &Self::Scope) -> Result<(), EvalError>;
}

// ── Test double ───────────────────────────────────────────────────────────────
