//! Command-line argument parsing.
//!
//! Usage:
//!   yst [-L<dir>] [-c<config>] [-e<encoding>] [-m<model-file>] [-s<status>] [-i<id>] <template-file>

use std::path::PathBuf;

use crate::status::ClientStatus;

// ── Public types ──────────────────────────────────────────────────────────────

/// Parsed command-line arguments.
#[derive(Debug, Default)]
pub struct CliArgs {
    /// Library directory override (`-L<dir>`).
    pub libdir: Option<PathBuf>,
    /// Config file (`-c<config>`).
    pub config: Option<PathBuf>,
    /// Template encoding override (`-e<encoding>`).
    pub encoding: Option<String>,
    /// File holding the model (`-m<model-file>`); empty model when absent.
    pub model: Option<PathBuf>,
    /// Client status (`-s<status>`): a status code or a yes/no word.
    pub status: Option<ClientStatus>,
    /// Template id used in diagnostics (`-i<id>`); defaults to the file name.
    pub id: Option<String>,
    /// The template to render.
    pub template: PathBuf,
}

// ── Parsing ───────────────────────────────────────────────────────────────────

/// Parse `std::env::args()` and return [`CliArgs`] or an error message.
pub fn parse_args() -> Result<CliArgs, String> {
    let raw: Vec<String> = std::env::args().collect();
    parse_argv(raw.get(1..).unwrap_or_default())
}

/// Parse a slice of argument strings (exposed for testing).
pub fn parse_argv(argv: &[String]) -> Result<CliArgs, String> {
    let mut args = CliArgs::default();
    let mut positional: Vec<String> = Vec::new();
    let mut i = 0;

    while i < argv.len() {
        let arg = argv[i].as_str();

        // `--` ends flag processing.
        if arg == "--" {
            positional.extend(argv[i + 1..].iter().cloned());
            break;
        }

        if !arg.starts_with('-') || arg == "-" {
            positional.push(arg.to_owned());
            i += 1;
            continue;
        }

        // Every flag takes a value, attached (`-Ldir`) or separate (`-L dir`).
        let mut chars = arg[1..].chars();
        let Some(flag) = chars.next() else {
            return Err("empty option".to_owned());
        };
        let attached: String = chars.collect();
        let value = if !attached.is_empty() {
            attached
        } else if i + 1 < argv.len() {
            i += 1;
            argv[i].clone()
        } else {
            return Err(format!("-{flag} requires an argument"));
        };

        match flag {
            'L' => args.libdir = Some(PathBuf::from(value)),
            'c' => args.config = Some(PathBuf::from(value)),
            'e' => args.encoding = Some(value),
            'm' => args.model = Some(PathBuf::from(value)),
            's' => args.status = Some(value.parse()?),
            'i' => args.id = Some(value),
            c => return Err(format!("unknown option: -{c}")),
        }
        i += 1;
    }

    match positional.len() {
        0 => return Err("missing template file".to_owned()),
        1 => args.template = PathBuf::from(positional.remove(0)),
        n => return Err(format!("too many arguments ({n})")),
    }

    Ok(args)
}

impl CliArgs {
    /// Template id: `-i<id>`, else the template's file name.
    pub fn template_id(&self) -> String {
        self.id.clone().unwrap_or_else(|| {
            self.template
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| self.template.display().to_string())
        })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(args: &[&str]) -> Vec<String> {
        args.iter().map(|&s| s.to_owned()).collect()
    }

    #[test]
    fn template_only() {
        let a = parse_argv(&argv(&["page.html"])).unwrap();
        assert_eq!(a.template, PathBuf::from("page.html"));
        assert!(a.model.is_none() && a.status.is_none());
        assert_eq!(a.template_id(), "page.html");
    }

    #[test]
    fn missing_template() {
        assert!(parse_argv(&argv(&[])).is_err());
    }

    #[test]
    fn libdir_embedded() {
        let a = parse_argv(&argv(&["-L/some/dir", "t.html"])).unwrap();
        assert_eq!(a.libdir, Some(PathBuf::from("/some/dir")));
    }

    #[test]
    fn libdir_separate() {
        let a = parse_argv(&argv(&["-L", "/some/dir", "t.html"])).unwrap();
        assert_eq!(a.libdir, Some(PathBuf::from("/some/dir")));
    }

    #[test]
    fn all_options() {
        let a = parse_argv(&argv(&[
            "-cyst.properties", "-e", "latin1", "-mmodel.lua", "-s-1", "-iinbox", "t.html",
        ]))
        .unwrap();
        assert_eq!(a.config, Some(PathBuf::from("yst.properties")));
        assert_eq!(a.encoding.as_deref(), Some("latin1"));
        assert_eq!(a.model, Some(PathBuf::from("model.lua")));
        assert_eq!(a.status, Some(ClientStatus::NotYeipeeAndSendOff));
        assert_eq!(a.template_id(), "inbox");
    }

    #[test]
    fn status_word() {
        let a = parse_argv(&argv(&["-s", "off", "t.html"])).unwrap();
        assert_eq!(a.status, Some(ClientStatus::NotYeipeeAndSendOff));
        assert!(parse_argv(&argv(&["-s", "sideways", "t.html"])).is_err());
    }

    #[test]
    fn flag_without_value() {
        assert!(parse_argv(&argv(&["t.html", "-m"])).is_err());
    }

    #[test]
    fn double_dash_ends_flags() {
        let a = parse_argv(&argv(&["--", "-odd.html"])).unwrap();
        assert_eq!(a.template, PathBuf::from("-odd.html"));
    }

    #[test]
    fn too_many_positional() {
        assert!(parse_argv(&argv(&["a", "b"])).is_err());
    }

    #[test]
    fn unknown_flag() {
        assert!(parse_argv(&argv(&["-zvalue", "t.html"])).is_err());
    }
}
