//! Shared scope construction.
//!
//! The shared scope of a processor is built exactly once:
//!
//! 1. a root scope with the engine's standard bindings,
//! 2. the `sharedEnv` library,
//! 3. the `ystEngine` macro runtime,
//! 4. every declare fragment's body, in template order,
//! 5. sealing.
//!
//! Any failure aborts construction; the half-built scope is dropped.

use tracing::debug;

use crate::engine::{EvalError, ScriptEngine};
use crate::fragment::{Fragment, FragmentKind};
use crate::library::{LibraryError, LibraryLoader};

/// Logical name of the host shim library.
pub const SHARED_ENV: &str = "sharedEnv";
/// Logical name of the macro runtime library.
pub const YST_ENGINE: &str = "ystEngine";

/// Shared scope construction failed.
#[derive(Debug, thiserror::Error)]
pub enum InitError {
    #[error(transparent)]
    Library(#[from] LibraryError),
    #[error("evaluation failed in {0}")]
    Eval(#[from] EvalError),
}

/// Chunk name of the `n`th declare fragment.
pub fn declare_source_name(n: usize) -> String {
    format!("declare_{n}")
}

/// Build and seal the shared scope for `fragments`.
pub fn build_shared_scope<E: ScriptEngine>(
    engine: &E,
    loader: &LibraryLoader,
    fragments: &[Fragment],
) -> Result<E::Scope, InitError> {
    let scope = engine.create_scope(None)?;

    for library in [SHARED_ENV, YST_ENGINE] {
        let source = loader.load(library)?;
        engine.evaluate(&scope, &source, library)?;
        debug!(library, "library evaluated into shared scope");
    }

    let declares = fragments
        .iter()
        .filter(|f| f.kind() == FragmentKind::Declare)
        .filter_map(Fragment::executable_content);
    for (n, body) in declares.enumerate() {
        let name = declare_source_name(n);
        engine.evaluate(&scope, body, &name)?;
        debug!(declare = %name, "declare block evaluated");
    }

    engine.seal(&scope)?;
    Ok(scope)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
