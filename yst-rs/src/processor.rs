//! The per-template processor.
//!
//! A [`Processor`] is built once per template: it classifies the template
//! and builds the sealed shared scope, then serves any number of
//! concurrent renders.  Construction either succeeds completely or returns
//! a [`BuildError`]; no half-built processor is ever handed out.

use std::fmt;

use tracing::info;

use crate::engine::{EvalError, ScriptEngine};
use crate::fragment::{classify, ClassifyError, Fragment, FragmentKind};
use crate::library::LibraryLoader;
use crate::render::{substitute_model, RenderError, Renderer};
use crate::scope::{build_shared_scope, InitError};
use crate::text::{Encoding, UnsupportedEncoding};
use crate::value::Value;

/// A processor could not be built.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("malformed template: {0}")]
    MalformedTemplate(#[from] ClassifyError),
    #[error(transparent)]
    UnsupportedEncoding(#[from] UnsupportedEncoding),
    #[error("cannot initialise script engine for template {template_id}: {source}")]
    EngineInit {
        template_id: String,
        #[source]
        source: InitError,
    },
}

/// A classified template bound to its shared scope.
pub struct Processor<E: ScriptEngine> {
    id: String,
    fragments: Vec<Fragment>,
    engine: E,
    shared: E::Scope,
}

impl<E: ScriptEngine> fmt::Debug for Processor<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Processor")
            .field("id", &self.id)
            .field("fragments", &self.fragments.len())
            .finish_non_exhaustive()
    }
}

impl<E: ScriptEngine> Processor<E> {
    /// Decode `template` per `encoding`, then build as [`Processor::from_text`].
    pub fn new(
        engine: E,
        loader: &LibraryLoader,
        template: &[u8],
        encoding: &str,
        id: &str,
    ) -> Result<Self, BuildError> {
        let text = Encoding::from_name(encoding)?.decode(template);
        Self::from_text(engine, loader, &text, id)
    }

    /// Classify `template` and build its shared scope on `engine`.
    pub fn from_text(
        engine: E,
        loader: &LibraryLoader,
        template: &str,
        id: &str,
    ) -> Result<Self, BuildError> {
        let fragments = classify(template)?;
        let shared = build_shared_scope(&engine, loader, &fragments).map_err(|source| {
            BuildError::EngineInit { template_id: id.to_owned(), source }
        })?;

        let declares = fragments.iter().filter(|f| f.kind() == FragmentKind::Declare).count();
        info!(template = id, fragments = fragments.len(), declares, "template processor ready");

        Ok(Self {
            id: id.to_owned(),
            fragments,
            engine,
            shared,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn fragments(&self) -> &[Fragment] {
        &self.fragments
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Render with `model_text` as the live model.
    pub fn render(&self, model_text: &str) -> Result<String, RenderError> {
        let renderer = Renderer::new(&self.engine, &self.shared, model_text)?;
        Ok(renderer.run(&self.fragments))
    }

    /// The template with its model section replaced by `model_script`,
    /// evaluating nothing.
    pub fn substitute_model(&self, model_script: &str) -> String {
        substitute_model(&self.fragments, model_script)
    }

    /// Read `name` from the shared scope.
    pub fn shared_binding(&self, name: &str) -> Result<Value, EvalError> {
        self.engine.read_binding(&self.shared, name)
    }
}

#[cfg(feature = "lua")]
impl Processor<crate::lua::LuaEngine> {
    /// Build on a fresh Lua engine with an optional per-evaluation
    /// instruction limit.
    pub fn lua(
        loader: &LibraryLoader,
        template: &str,
        id: &str,
        instruction_limit: Option<u64>,
    ) -> Result<Self, BuildError> {
        let engine = crate::lua::LuaEngine::new(instruction_limit).map_err(|e| {
            BuildError::EngineInit { template_id: id.to_owned(), source: InitError::Eval(e) }
        })?;
        Self::from_text(engine, loader, template, id)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
