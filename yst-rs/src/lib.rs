//! Yeast-Server template processor.
//!
//! Templates are HTML documents with embedded script directives.  A
//! [`Processor`] splits a template into typed fragments once, builds a
//! sealed shared scope from the runtime libraries and the template's
//! declare blocks, and then renders the template for any number of models,
//! each render in its own disposable scope.
//!
//! ```text
//! bytes ──decode──▶ classify ──▶ fragments ─┐
//!                        declare blocks ──▶ shared scope (sealed)
//! model ──unwrap──▶ instance scope ──▶ render walk ──▶ output
//! ```

pub mod cli;
pub mod config;
pub mod embedded;
pub mod engine;
pub mod fragment;
pub mod library;
pub mod lua;
pub mod model;
pub mod processor;
pub mod render;
pub mod scope;
pub mod status;
pub mod template;
pub mod text;
pub mod value;

pub use engine::{EvalError, ScriptEngine};
pub use fragment::{classify, ClassifyError, Fragment, FragmentKind};
pub use library::{LibraryError, LibraryLoader};
#[cfg(feature = "lua")]
pub use lua::{LuaEngine, LuaScope};
pub use model::ModelSection;
pub use processor::{BuildError, Processor};
pub use render::RenderError;
pub use scope::InitError;
pub use status::ClientStatus;
pub use template::{FileSource, MemorySource, Template, TemplateError, TemplateSource};
pub use value::Value;

use std::sync::Once;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

static TRACING: Once = Once::new();

/// Install a `tracing` subscriber filtered by `RUST_LOG` (default `warn`).
///
/// Safe to call more than once; only the first call has an effect, and an
/// already installed global subscriber is left in place.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
        let _ = tracing_subscriber::registry()
            .with(fmt::layer().with_writer(std::io::stderr).with_target(true).with_level(true))
            .with(filter)
            .try_init();
    });
}
