use std::path::Path;

use proptest::prelude::*;
use yst::{classify, FragmentKind};

/// Every library script in lib/yst/ loads into a fresh root scope.
#[cfg(feature = "lua")]
#[test]
fn load_all_lib_yst_files() {
    use yst::{LuaEngine, ScriptEngine};

    let lib_dir = Path::new(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .unwrap()
        .join("lib/yst");

    let mut entries: Vec<_> = std::fs::read_dir(&lib_dir)
        .unwrap_or_else(|e| panic!("cannot open {}: {e}", lib_dir.display()))
        .filter_map(|e| e.ok())
        .filter(|e| e.path().extension().map(|x| x == "lua").unwrap_or(false))
        .collect();
    entries.sort_by_key(|e| e.path());

    assert!(!entries.is_empty(), "no .lua files found in {}", lib_dir.display());

    let mut failures = Vec::new();
    for entry in &entries {
        let path = entry.path();
        let src = std::fs::read_to_string(&path)
            .unwrap_or_else(|e| panic!("cannot read {}: {e}", path.display()));
        let engine = LuaEngine::new(None).unwrap();
        let scope = engine.create_scope(None).unwrap();
        if let Err(e) = engine.evaluate(&scope, &src, "lib") {
            failures.push(format!("{}: {e}", path.file_name().unwrap().to_string_lossy()));
        }
    }

    if !failures.is_empty() {
        panic!(
            "{}/{} files failed to load:\n  {}",
            failures.len(),
            entries.len(),
            failures.join("\n  ")
        );
    }
}

// ── Strategies ────────────────────────────────────────────────────────────────

/// Well-formed template pieces: markup and complete script elements.
fn piece() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-zA-Z0-9 >/=\"'.\n-]{0,20}",
        Just("<p class=\"x\">".to_owned()),
        Just("</p>".to_owned()),
        "[a-z =0-9]{0,12}".prop_map(|b| format!("<script>{b}</script>")),
        "[a-z =0-9]{0,12}".prop_map(|b| format!("<script yst=\"declare\">{b}</script>")),
        "[a-z =0-9]{0,12}".prop_map(|b| format!("<script yst='model'>{b}</script>")),
        "[a-z0-9 ]{0,12}".prop_map(|b| format!("<script>document.write(YST.Txt(_ENV, '{b}'))</script>")),
        "[a-z =0-9]{0,12}".prop_map(|b| format!("<script>\n//<![CDATA[\n{b}\n//]]>\n</script>")),
        Just("<script src=\"x.lua\"/>".to_owned()),
    ]
}

fn template() -> impl Strategy<Value = String> {
    prop::collection::vec(piece(), 0..8).prop_map(|pieces| pieces.concat())
}

proptest! {
    /// Concatenating fragment contents gives back the template.
    #[test]
    fn classification_round_trips(t in template()) {
        let fragments = classify(&t).unwrap();
        let joined: String = fragments.iter().map(|f| f.content()).collect();
        prop_assert_eq!(joined, t);
    }

    /// Classifying twice yields identical fragments.
    #[test]
    fn classification_is_idempotent(t in template()) {
        prop_assert_eq!(classify(&t).unwrap(), classify(&t).unwrap());
    }

    /// Only script fragments carry spans, and spans stay inside the content.
    #[test]
    fn spans_are_in_bounds(t in template()) {
        for f in classify(&t).unwrap() {
            if f.kind() == FragmentKind::Plain {
                prop_assert!(f.exec_span().is_none());
            }
            if let Some(span) = f.exec_span() {
                prop_assert!(span.start <= span.end && span.end <= f.content().len());
                prop_assert!(f.content().starts_with("<script"));
            }
        }
    }
}

proptest! {
    /// Arbitrary input either classifies or reports a malformed template;
    /// it never panics, and successful results still round-trip.
    #[test]
    fn classify_does_not_panic(s in "\\PC*") {
        if let Ok(fragments) = classify(&s) {
            let joined: String = fragments.iter().map(|f| f.content()).collect();
            prop_assert_eq!(joined, s);
        }
    }

    #[test]
    fn script_soup_does_not_panic(s in "(<script|</script>|>|/>|yst=\"model\"|//<!\\[CDATA\\[|//\\]\\]>|document\\.write\\(YST\\.Txt|x){0,12}") {
        let _ = classify(&s);
    }
}
