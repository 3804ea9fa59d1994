//! Template fragmentation.
//!
//! A template is split into an ordered sequence of [`Fragment`]s: literal
//! markup and `<script>` elements, each tagged with a [`FragmentKind`] that
//! tells the renderer what to do with it.  Concatenating the `content` of
//! every fragment, in order, gives back the original template unchanged.
//!
//! ## Markers
//!
//! | Marker | Constant | Effect |
//! |--------|----------|--------|
//! | `yst="model"` attribute | [`MODEL_ATTR`] | [`FragmentKind::Model`] |
//! | `yst="declare"` attribute | [`DECLARE_ATTR`] | [`FragmentKind::Declare`] |
//! | `//<![CDATA[` … `//]]>` | [`CDATA_START`], [`CDATA_END`] | narrows the executable span |
//! | `document.write(YST.Txt` | [`MACRO_CALL_SITE`] | [`FragmentKind::YeastExecutable`] |
//! | `if (typeof YST != 'undefined')` | [`ENGINE_ABSENT_GUARD`] | client-only boilerplate, never executed |
//!
//! Matching is plain substring search: case-sensitive, no nested `<script>`
//! support, and a script always ends at the first `</script>` after its
//! opening tag.  Templates rely on that matching order, so it is kept as is.

use std::ops::Range;
use std::sync::OnceLock;

use regex::Regex;
use tracing::trace;

// ── Markers ──────────────────────────────────────────────────────────────────

pub const SCRIPT_OPEN: &str = "<script";
pub const SCRIPT_CLOSE: &str = "</script>";
pub const MODEL_ATTR: &str = "model";
pub const DECLARE_ATTR: &str = "declare";
pub const CDATA_START: &str = "//<![CDATA";
pub const CDATA_END: &str = "//]]>";
pub const MACRO_CALL_SITE: &str = "document.write(YST.Txt";
pub const ENGINE_ABSENT_GUARD: &str = "if (typeof YST != 'undefined')";

/// The executable part of a macro-output script starts right after this.
const MACRO_OUTPUT_CALL: &str = "document.write";

fn model_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| marker_regex(MODEL_ATTR))
}

fn declare_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| marker_regex(DECLARE_ATTR))
}

/// Whole-element match of a `<script … yst="value">…</script>` element.
fn marker_regex(value: &str) -> Regex {
    let src = format!(r#"(?s)\A<script\s.*yst\s*=\s*["']{value}["']>.*</script>\z"#);
    Regex::new(&src).unwrap_or_else(|e| panic!("marker regex for '{value}' is invalid: {e}"))
}

// ── Errors ───────────────────────────────────────────────────────────────────

/// The template (or a script-wrapped model) is not well formed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClassifyError {
    #[error("expected '>' closing the <script tag opened at byte {offset}")]
    MissingTagDelimiter { offset: usize },
    #[error("expected '</script>' closing the <script tag opened at byte {offset}")]
    UnterminatedScript { offset: usize },
}

// ── Fragment ─────────────────────────────────────────────────────────────────

/// What the renderer does with a fragment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FragmentKind {
    /// Literal markup (or a script with nothing to run), copied verbatim.
    Plain,
    /// The model carrier; replaced by the live model on every render.
    Model,
    /// Setup code, evaluated once into the shared scope.
    Declare,
    /// Macro-output expression whose result is spliced into the output.
    YeastExecutable,
    /// Any other script: evaluated for side effects, then copied verbatim.
    OtherExecutable,
}

/// An immutable slice of a template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    content: String,
    kind: FragmentKind,
    /// Byte range into `content` holding the text handed to the evaluator.
    exec_span: Option<Range<usize>>,
}

impl Fragment {
    fn plain(content: &str) -> Self {
        Self {
            content: content.to_owned(),
            kind: FragmentKind::Plain,
            exec_span: None,
        }
    }

    /// Classify a `<script` … element.  `content` must start with `<script`
    /// and, unless its opening tag is self-closing, end with `</script>`.
    fn script(content: &str) -> Result<Self, ClassifyError> {
        let (kind, exec_span) = classify_script(content)?;
        Ok(Self {
            content: content.to_owned(),
            kind,
            exec_span,
        })
    }

    /// Exact text of the template this fragment covers.
    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn kind(&self) -> FragmentKind {
        self.kind
    }

    pub fn exec_span(&self) -> Option<Range<usize>> {
        self.exec_span.clone()
    }

    /// The text passed to the evaluator, if this fragment has any.
    pub fn executable_content(&self) -> Option<&str> {
        self.exec_span.clone().map(|r| &self.content[r])
    }
}

// ── Classification ───────────────────────────────────────────────────────────

/// Split `template` into its ordered fragment sequence.
///
/// Empty literal runs are dropped, so a template that starts with a script
/// produces no leading `Plain` fragment.
pub fn classify(template: &str) -> Result<Vec<Fragment>, ClassifyError> {
    let mut fragments = Vec::new();
    let mut pos = 0;

    while let Some(rel) = template[pos..].find(SCRIPT_OPEN) {
        let open = pos + rel;
        if open > pos {
            push(&mut fragments, Fragment::plain(&template[pos..open]), pos);
        }

        let tag_end = template[open..]
            .find('>')
            .map(|i| open + i)
            .ok_or(ClassifyError::MissingTagDelimiter { offset: open })?;

        let end = if template[..tag_end].ends_with('/') {
            // <script … /> has no body and no closing tag.
            tag_end + 1
        } else {
            template[tag_end..]
                .find(SCRIPT_CLOSE)
                .map(|i| tag_end + i + SCRIPT_CLOSE.len())
                .ok_or(ClassifyError::UnterminatedScript { offset: open })?
        };

        push(&mut fragments, Fragment::script(&template[open..end])?, open);
        pos = end;
    }

    if pos < template.len() {
        push(&mut fragments, Fragment::plain(&template[pos..]), pos);
    }

    Ok(fragments)
}

fn push(fragments: &mut Vec<Fragment>, fragment: Fragment, offset: usize) {
    trace!(
        offset,
        kind = ?fragment.kind,
        len = fragment.content.len(),
        "classified fragment"
    );
    fragments.push(fragment);
}

fn classify_script(content: &str) -> Result<(FragmentKind, Option<Range<usize>>), ClassifyError> {
    if model_regex().is_match(content) {
        return Ok((FragmentKind::Model, None));
    }

    let body = script_body(content)?;
    if declare_regex().is_match(content) {
        return Ok((FragmentKind::Declare, body));
    }

    let Some(mut span) = body else {
        return Ok((FragmentKind::OtherExecutable, None));
    };

    if let Some(i) = find_within(content, &span, CDATA_START) {
        span.start = after_cdata_start(content, i);
        if let Some(end) = content.rfind(CDATA_END).filter(|&e| e >= span.start) {
            span.end = end;
        }
    }

    if let Some(i) = find_within(content, &span, MACRO_CALL_SITE) {
        let start = i + MACRO_OUTPUT_CALL.len();
        return Ok((FragmentKind::YeastExecutable, Some(start..span.end)));
    }

    if find_within(content, &span, ENGINE_ABSENT_GUARD).is_some() {
        return Ok((FragmentKind::OtherExecutable, None));
    }

    if content[span.clone()].trim().is_empty() {
        Ok((FragmentKind::OtherExecutable, None))
    } else {
        Ok((FragmentKind::OtherExecutable, Some(span)))
    }
}

/// Byte range of the text between the opening and closing script tags, or
/// `None` for a self-closing `<script … />`.  The opening tag ends at the
/// first `>`.
pub(crate) fn script_body(content: &str) -> Result<Option<Range<usize>>, ClassifyError> {
    let tag_end = content
        .find('>')
        .ok_or(ClassifyError::MissingTagDelimiter { offset: content.len() })?;
    if content[..tag_end].ends_with('/') {
        return Ok(None);
    }
    let close = content[tag_end..]
        .find(SCRIPT_CLOSE)
        .map(|i| tag_end + i)
        .ok_or(ClassifyError::UnterminatedScript { offset: 0 })?;
    Ok(Some(tag_end + 1..close))
}

/// Interior of a `//<![CDATA[` … `//]]>` pair, if `text` is wrapped in one.
pub(crate) fn cdata_interior(text: &str) -> Option<&str> {
    let lead = text.len() - text.trim_start().len();
    if !text[lead..].starts_with(CDATA_START) {
        return None;
    }
    let start = after_cdata_start(text, lead);
    let end = text.rfind(CDATA_END).filter(|&e| e >= start)?;
    Some(&text[start..end])
}

fn after_cdata_start(text: &str, at: usize) -> usize {
    let start = at + CDATA_START.len();
    if text[start..].starts_with('[') {
        start + 1
    } else {
        start
    }
}

fn find_within(content: &str, span: &Range<usize>, needle: &str) -> Option<usize> {
    content[span.clone()].find(needle).map(|i| span.start + i)
}

// ── Tests ────────────────────────────────────────────────────────────────────
