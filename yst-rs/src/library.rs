//! Library script loading by logical name.
//!
//! | Logical name | File            |
//! |--------------|-----------------|
//! | `sharedEnv`  | `sharedEnv.lua` |
//! | `ystEngine`  | `ysttxt.lua`    |
//!
//! Other names map to `<name>.lua`.  A loader looks in the packaged copies
//! baked into the binary (see [`crate::embedded`]) first, then in its
//! library directory on disk.
//!
//! # Library directory resolution (see [`default_libdir`])
//! 1. `$YSTLIBDIR` env var
//! 2. `CARGO_MANIFEST_DIR/../lib/yst` (dev builds only)
//! 3. OS user data dir (`~/.local/share/yst/lib` on Linux, etc.)

use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::embedded::get_embedded;

/// Environment variable naming the library directory.
pub const LIBDIR_ENV: &str = "YSTLIBDIR";

/// A library could not be loaded.
#[derive(Debug, thiserror::Error)]
pub enum LibraryError {
    #[error("library resource not found: {name}")]
    ResourceNotFound { name: String },
    #[error("cannot read library {name} from {}: {source}", path.display())]
    Io {
        name: String,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// File name backing a logical library name.
pub fn file_name(logical: &str) -> String {
    match logical {
        "sharedEnv" => "sharedEnv.lua".to_owned(),
        "ystEngine" => "ysttxt.lua".to_owned(),
        other if other.ends_with(".lua") => other.to_owned(),
        other => format!("{other}.lua"),
    }
}

/// Loads library source text by logical name.
#[derive(Debug, Clone)]
pub struct LibraryLoader {
    packaged: bool,
    libdir: Option<PathBuf>,
}

impl Default for LibraryLoader {
    fn default() -> Self {
        Self::packaged()
    }
}

impl LibraryLoader {
    /// Packaged copies only.
    pub fn packaged() -> Self {
        Self { packaged: true, libdir: None }
    }

    /// Packaged copies, then `dir`.
    pub fn with_libdir(dir: impl Into<PathBuf>) -> Self {
        Self { packaged: true, libdir: Some(dir.into()) }
    }

    /// `dir` only, ignoring the packaged copies.
    pub fn filesystem(dir: impl Into<PathBuf>) -> Self {
        Self { packaged: false, libdir: Some(dir.into()) }
    }

    /// Packaged copies, then the default library directory if one exists.
    pub fn from_environment() -> Self {
        Self { packaged: true, libdir: default_libdir() }
    }

    pub fn libdir(&self) -> Option<&Path> {
        self.libdir.as_deref()
    }

    /// Load the source text of library `name`, with CRLF line endings
    /// normalised to `\n`.
    pub fn load(&self, name: &str) -> Result<String, LibraryError> {
        let file = file_name(name);

        if self.packaged {
            if let Some(text) = get_embedded(&file) {
                debug!(library = name, "loaded packaged library");
                return Ok(normalise_newlines(text));
            }
        }

        if let Some(dir) = &self.libdir {
            let path = dir.join(&file);
            match std::fs::read(&path) {
                Ok(bytes) => {
                    debug!(library = name, path = %path.display(), "loaded library from disk");
                    return Ok(normalise_newlines(&String::from_utf8_lossy(&bytes)));
                }
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(source) => {
                    return Err(LibraryError::Io { name: name.to_owned(), path, source });
                }
            }
        }

        Err(LibraryError::ResourceNotFound { name: name.to_owned() })
    }
}

fn normalise_newlines(text: &str) -> String {
    text.replace("\r\n", "\n")
}

/// Determine the default library directory, if any candidate exists.
pub fn default_libdir() -> Option<PathBuf> {
    if let Ok(d) = std::env::var(LIBDIR_ENV) {
        return Some(PathBuf::from(d));
    }
    // During development, look alongside the workspace root.
    if let Ok(manifest) = std::env::var("CARGO_MANIFEST_DIR") {
        let dev = PathBuf::from(&manifest)
            .parent()
            .unwrap_or(Path::new("."))
            .join("lib/yst");
        if dev.exists() {
            return Some(dev);
        }
    }
    directories::ProjectDirs::from("org", "ystsrv", "yst")
        .map(|dirs| dirs.data_dir().join("lib"))
        .filter(|dir| dir.exists())
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn logical_names_map_to_files() {
        assert_eq!(file_name("sharedEnv"), "sharedEnv.lua");
        assert_eq!(file_name("ystEngine"), "ysttxt.lua");
        assert_eq!(file_name("extra"), "extra.lua");
        assert_eq!(file_name("extra.lua"), "extra.lua");
    }

    #[test]
    fn packaged_libraries_load() {
        let loader = LibraryLoader::packaged();
        assert!(loader.load("sharedEnv").unwrap().contains("YST_SERVER"));
        assert!(loader.load("ystEngine").unwrap().contains("YST.Txt"));
    }

    #[test]
    fn missing_library_is_not_found() {
        let err = LibraryLoader::packaged().load("nope").unwrap_err();
        assert!(matches!(err, LibraryError::ResourceNotFound { ref name } if name == "nope"));
    }

    #[test]
    fn filesystem_library_with_crlf() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("extra.lua"), "a = 1\r\nb = 2\r\n").unwrap();
        let loader = LibraryLoader::with_libdir(dir.path());
        assert_eq!(loader.load("extra").unwrap(), "a = 1\nb = 2\n");
    }

    #[test]
    fn packaged_copy_wins_over_disk() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("sharedEnv.lua"), "replaced = true").unwrap();
        let loader = LibraryLoader::with_libdir(dir.path());
        assert!(loader.load("sharedEnv").unwrap().contains("YST_SERVER"));
    }

    #[test]
    fn filesystem_only_loader_ignores_packaged() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("sharedEnv.lua"), "replaced = true").unwrap();
        let loader = LibraryLoader::filesystem(dir.path());
        assert_eq!(loader.load("sharedEnv").unwrap(), "replaced = true");
        assert!(matches!(
            loader.load("ystEngine"),
            Err(LibraryError::ResourceNotFound { .. })
        ));
    }
}
