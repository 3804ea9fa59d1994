//! Model payloads: building them and unwrapping them for evaluation.
//!
//! A model travels either bare (`user = 'Bob'`) or wrapped in a script
//! element, optionally with a CDATA marker pair around the body:
//!
//! ```text
//! <script type="text/lua">
//! //<![CDATA[
//! user = 'Bob'
//! //]]>
//! </script>
//! ```
//!
//! [`unwrap_model_text`] reduces either form to the bare code, and
//! [`model_carrier`] produces the tag the renderer writes back.

use std::fmt;

use crate::fragment::{cdata_interior, script_body, SCRIPT_OPEN};

/// A wrapped model could not be reduced to its content.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModelError {
    #[error("model script tag has no closing '>'")]
    MissingTagDelimiter,
    #[error("model script tag is not terminated by </script>")]
    Unterminated,
}

/// Accumulates model code for one render.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModelSection {
    data: String,
}

impl ModelSection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, code: &str) -> &mut Self {
        self.data.push_str(code);
        self
    }

    pub fn append_line(&mut self, code: &str) -> &mut Self {
        self.data.push_str(code);
        self.data.push('\n');
        self
    }

    /// Append the data of `other`.
    pub fn merge(&mut self, other: &ModelSection) -> &mut Self {
        self.data.push_str(&other.data);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn data(&self) -> &str {
        &self.data
    }

    /// The data as a self-contained script element.  The closing CDATA
    /// marker always starts its own line.
    pub fn script_data(&self) -> String {
        let newline = if self.data.is_empty() || self.data.ends_with('\n') { "" } else { "\n" };
        format!(
            "<script type=\"text/lua\">\n//<![CDATA[\n{}{newline}//]]>\n</script>",
            self.data
        )
    }
}

impl fmt::Display for ModelSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.data)
    }
}

impl From<&str> for ModelSection {
    fn from(code: &str) -> Self {
        Self { data: code.to_owned() }
    }
}

/// Reduce a model payload to bare code.
///
/// Text not starting with `<script` (after leading blanks) is returned
/// as is.  A self-closing script yields the empty model.
pub fn unwrap_model_text(text: &str) -> Result<&str, ModelError> {
    let lead = text.len() - text.trim_start().len();
    let wrapped = &text[lead..];
    if !wrapped.starts_with(SCRIPT_OPEN) {
        return Ok(text);
    }

    let end = wrapped.rfind("</script>").map(|i| i + "</script>".len());
    let element = match (wrapped.find('>'), end) {
        (None, _) => return Err(ModelError::MissingTagDelimiter),
        (Some(gt), _) if wrapped[..gt].ends_with('/') => return Ok(""),
        (Some(_), None) => return Err(ModelError::Unterminated),
        (Some(_), Some(end)) => &wrapped[..end],
    };

    let body = match script_body(element) {
        Ok(Some(span)) => &element[span],
        Ok(None) => "",
        Err(_) => return Err(ModelError::Unterminated),
    };
    Ok(cdata_interior(body).unwrap_or(body))
}

/// The model-carrier tag written in place of a template's model section.
pub fn model_carrier(model: &str) -> String {
    format!("<script yst=\"model\">{model}</script>")
}

// ── Tests ─────────────────────────────────────────────────────────────────────
