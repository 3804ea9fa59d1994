//! Template lifecycle: sources, cached processors, printing.
//!
//! A [`Template`] builds its [`Processor`] on first use and keeps it until
//! the source reports a new version.  The source version is read outside
//! any lock and an up-to-date processor is shared under a read lock.
//! Rebuilding takes the write lock, so exactly one caller builds while the
//! others wait and then share the result; renders run outside the lock.

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::UNIX_EPOCH;

use tracing::info;

use crate::engine::{EvalError, ScriptEngine};
use crate::library::LibraryLoader;
use crate::model::{unwrap_model_text, ModelSection};
use crate::processor::{BuildError, Processor};
use crate::render::RenderError;
use crate::scope::InitError;
use crate::status::ClientStatus;
use crate::text::{Encoding, UnsupportedEncoding};

/// A template could not be printed.
#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    #[error("cannot read template: {0}")]
    Io(#[from] io::Error),
    #[error(transparent)]
    Build(#[from] BuildError),
    #[error("render failed: {0}")]
    Render(#[from] RenderError),
}

// ── Sources ───────────────────────────────────────────────────────────────────

/// Where template bytes come from.
pub trait TemplateSource: Send + Sync {
    fn load(&self) -> io::Result<Vec<u8>>;

    /// Changes whenever the bytes returned by [`load`](Self::load) change.
    fn version(&self) -> io::Result<u64>;
}

/// Template bytes held in memory, versioned by explicit replacement.
#[derive(Debug, Default)]
pub struct MemorySource {
    state: RwLock<(Vec<u8>, u64)>,
}

impl MemorySource {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self { state: RwLock::new((bytes.into(), 0)) }
    }

    /// Replace the bytes and bump the version.
    pub fn set(&self, bytes: impl Into<Vec<u8>>) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        state.0 = bytes.into();
        state.1 += 1;
    }
}

impl TemplateSource for MemorySource {
    fn load(&self) -> io::Result<Vec<u8>> {
        Ok(self.state.read().unwrap_or_else(PoisonError::into_inner).0.clone())
    }

    fn version(&self) -> io::Result<u64> {
        Ok(self.state.read().unwrap_or_else(PoisonError::into_inner).1)
    }
}

/// A template file, versioned by its modification time.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TemplateSource for FileSource {
    fn load(&self) -> io::Result<Vec<u8>> {
        std::fs::read(&self.path)
    }

    fn version(&self) -> io::Result<u64> {
        let modified = std::fs::metadata(&self.path)?.modified()?;
        let since = modified.duration_since(UNIX_EPOCH).unwrap_or_default();
        Ok(u64::try_from(since.as_nanos()).unwrap_or(u64::MAX))
    }
}

// ── Template ──────────────────────────────────────────────────────────────────

type EngineFactory<E> = Box<dyn Fn() -> Result<E, EvalError> + Send + Sync>;

/// A named template with a lazily built, cached processor.
pub struct Template<E: ScriptEngine> {
    id: String,
    source: Box<dyn TemplateSource>,
    encoding: Encoding,
    loader: LibraryLoader,
    new_engine: EngineFactory<E>,
    cached: RwLock<Option<(u64, Arc<Processor<E>>)>>,
}

impl<E: ScriptEngine> Template<E> {
    /// `new_engine` is called for every (re)build.
    pub fn new(
        id: impl Into<String>,
        source: impl TemplateSource + 'static,
        encoding: &str,
        loader: LibraryLoader,
        new_engine: impl Fn() -> Result<E, EvalError> + Send + Sync + 'static,
    ) -> Result<Self, UnsupportedEncoding> {
        Ok(Self {
            id: id.into(),
            source: Box::new(source),
            encoding: Encoding::from_name(encoding)?,
            loader,
            new_engine: Box::new(new_engine),
            cached: RwLock::new(None),
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    /// The processor for the current source version, building it if needed.
    pub fn processor(&self) -> Result<Arc<Processor<E>>, TemplateError> {
        let version = self.source.version()?;
        if let Some((v, processor)) = self.cached.read().unwrap_or_else(PoisonError::into_inner).as_ref() {
            if *v == version {
                return Ok(Arc::clone(processor));
            }
        }

        let mut cached = self.cached.write().unwrap_or_else(PoisonError::into_inner);
        if let Some((v, processor)) = cached.as_ref() {
            if *v == version {
                return Ok(Arc::clone(processor));
            }
            info!(template = %self.id, "template changed, rebuilding processor");
        }

        let bytes = self.source.load()?;
        let engine = (self.new_engine)().map_err(|e| BuildError::EngineInit {
            template_id: self.id.clone(),
            source: InitError::Eval(e),
        })?;
        let text = self.encoding.decode(&bytes);
        let processor = Arc::new(Processor::from_text(engine, &self.loader, &text, &self.id)?);
        *cached = Some((version, Arc::clone(&processor)));
        Ok(processor)
    }

    /// Render the template text for one request.
    ///
    /// When `status` asks for server processing the template is evaluated
    /// with `model` as its live model.  Otherwise only the model section is
    /// replaced and all scripts are left for the client.
    pub fn render(&self, model: &str, status: ClientStatus) -> Result<String, TemplateError> {
        let processor = self.processor()?;
        if status.must_process_on_server() {
            return Ok(processor.render(model)?);
        }
        let bare = unwrap_model_text(model).map_err(RenderError::from)?;
        Ok(processor.substitute_model(&ModelSection::from(bare).script_data()))
    }

    /// [`render`](Self::render) and write the result in the template's
    /// encoding.
    pub fn print(
        &self,
        model: &str,
        status: ClientStatus,
        out: &mut impl Write,
    ) -> Result<(), TemplateError> {
        let text = self.render(model, status)?;
        out.write_all(&self.encoding.encode(&text))?;
        Ok(())
    }
}

#[cfg(feature = "lua")]
impl Template<crate::lua::LuaEngine> {
    /// A Lua-backed template configured by `config`.
    pub fn lua(
        id: impl Into<String>,
        source: impl TemplateSource + 'static,
        config: &crate::config::Config,
    ) -> Result<Self, UnsupportedEncoding> {
        let limit = config.instruction_limit;
        Self::new(id, source, &config.encoding, config.loader(), move || {
            crate::lua::LuaEngine::new(limit)
        })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
