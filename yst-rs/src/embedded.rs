//! Embedded copies of the `lib/yst/` library scripts.
//!
//! Both runtime libraries are baked into the binary at compile time via
//! `include_bytes!()`, so a processor can be built without any installed
//! library directory.  This is the "packaged" location consulted first by
//! [`crate::library::LibraryLoader`].

/// A single embedded library file.
pub struct EmbeddedFile {
    pub name: &'static str,
    pub content: &'static [u8],
}

/// All embedded files from `lib/yst/`.
pub static EMBEDDED_LIBS: &[EmbeddedFile] = &[
    EmbeddedFile { name: "sharedEnv.lua", content: include_bytes!("../../lib/yst/sharedEnv.lua") },
    EmbeddedFile { name: "ysttxt.lua",    content: include_bytes!("../../lib/yst/ysttxt.lua") },
];

/// Look up an embedded file by name, returning its content as UTF-8.
///
/// `name` should be a bare filename (e.g. `"ysttxt.lua"`), not a path.
pub fn get_embedded(name: &str) -> Option<&'static str> {
    EMBEDDED_LIBS
        .iter()
        .find(|f| f.name == name)
        .map(|f| std::str::from_utf8(f.content)
            .unwrap_or_else(|_| panic!("embedded file '{name}' contains invalid UTF-8")))
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn both_libraries_are_embedded() {
        assert!(get_embedded("sharedEnv.lua").unwrap().contains("YST_SERVER"));
        assert!(get_embedded("ysttxt.lua").unwrap().contains("YST.Txt"));
    }

    #[test]
    fn unknown_name_is_none() {
        assert!(get_embedded("stdlib.tf").is_none());
        assert!(get_embedded("lib/yst/ysttxt.lua").is_none());
    }
}
