//! The render walk.
//!
//! | Fragment kind      | Output                                              |
//! |--------------------|-----------------------------------------------------|
//! | `Plain`, `Declare` | content verbatim                                    |
//! | `Model`            | new model evaluated, then `<script yst="model">…`   |
//! | `YeastExecutable`  | value of the call expression, or [`CONTENT_ERROR`]  |
//! | `OtherExecutable`  | body run for side effects (errors ignored), content verbatim |
//!
//! Every render runs in a fresh instance scope whose parent is the sealed
//! shared scope; the instance scope is dropped when the render ends.

use tracing::{debug, trace};

use crate::engine::{EvalError, ScriptEngine};
use crate::fragment::{Fragment, FragmentKind};
use crate::model::{model_carrier, unwrap_model_text, ModelError};
use crate::text::xml_escape;

/// Binding receiving the value of a macro-output expression.
pub const RESULT_BINDING: &str = "res";
/// Written in place of a macro-output fragment that failed.
pub const CONTENT_ERROR: &str = "--ERROR GETTING CONTENT--";
/// Written in place of a model that failed to evaluate.
pub const MODEL_ERROR: &str = "--ERROR EVALUATING NEW MODEL SECTION--";

/// Chunk name of the new model.
pub const MODEL_SOURCE_NAME: &str = "model";

/// A render could not start.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("cannot unwrap model text: {0}")]
    ModelUnwrap(#[from] ModelError),
    #[error("cannot create instance scope: {0}")]
    InstanceScope(#[source] EvalError),
}

/// One render of one template.
pub struct Renderer<'a, E: ScriptEngine> {
    engine: &'a E,
    scope: E::Scope,
    model: &'a str,
    out: String,
}

impl<'a, E: ScriptEngine> Renderer<'a, E> {
    /// Unwrap `model_text` and open an instance scope below `shared`.
    pub fn new(engine: &'a E, shared: &E::Scope, model_text: &'a str) -> Result<Self, RenderError> {
        let model = unwrap_model_text(model_text)?;
        let scope = engine
            .create_scope(Some(shared))
            .map_err(RenderError::InstanceScope)?;
        Ok(Self {
            engine,
            scope,
            model,
            out: String::new(),
        })
    }

    /// Walk `fragments` and return the rendered text.
    pub fn run(mut self, fragments: &[Fragment]) -> String {
        for (i, fragment) in fragments.iter().enumerate() {
            trace!(index = i, kind = ?fragment.kind(), "rendering fragment");
            match fragment.kind() {
                FragmentKind::Model => self.model(),
                FragmentKind::YeastExecutable => self.macro_output(i, fragment),
                FragmentKind::OtherExecutable => self.other_script(i, fragment),
                FragmentKind::Plain | FragmentKind::Declare => self.out.push_str(fragment.content()),
            }
        }
        self.out
    }

    fn model(&mut self) {
        match self.engine.evaluate(&self.scope, self.model, MODEL_SOURCE_NAME) {
            Ok(()) => self.out.push_str(&model_carrier(self.model)),
            Err(e) => {
                debug!(error = %e, "model evaluation failed");
                self.out.push_str(MODEL_ERROR);
                self.out.push_str(&xml_escape(&e.to_string()));
            }
        }
    }

    fn macro_output(&mut self, index: usize, fragment: &Fragment) {
        let Some(expression) = fragment.executable_content() else {
            self.out.push_str(fragment.content());
            return;
        };
        let name = format!("content_{index}");
        let value = self
            .engine
            .evaluate_binding(&self.scope, RESULT_BINDING, expression, &name)
            .and_then(|()| self.engine.read_binding(&self.scope, RESULT_BINDING));
        match value {
            Ok(v) => self.out.push_str(&v.to_string()),
            Err(e) => {
                debug!(fragment = index, error = %e, "macro output failed");
                self.out.push_str(CONTENT_ERROR);
                self.out.push_str(&xml_escape(&e.to_string()));
            }
        }
    }

    fn other_script(&mut self, index: usize, fragment: &Fragment) {
        if let Some(body) = fragment.executable_content() {
            let name = format!("command_{index}");
            if let Err(e) = self.engine.evaluate(&self.scope, body, &name) {
                debug!(fragment = index, error = %e, "ignoring script error");
            }
        }
        self.out.push_str(fragment.content());
    }
}

/// Replace the model section with `model_script` without evaluating
/// anything; every other fragment is copied verbatim.
pub fn substitute_model(fragments: &[Fragment], model_script: &str) -> String {
    let mut out = String::new();
    for fragment in fragments {
        if fragment.kind() == FragmentKind::Model {
            out.push_str(model_script);
        } else {
            out.push_str(fragment.content());
        }
    }
    out
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::recording::RecordingEngine;
    use crate::fragment::classify;

    fn render(engine: &RecordingEngine, template: &str, model: &str) -> String {
        let shared = engine.create_scope(None).unwrap();
        let frags = classify(template).unwrap();
        Renderer::new(engine, &shared, model).unwrap().run(&frags)
    }

    #[test]
    fn plain_and_model() {
        let engine = RecordingEngine::default();
        let out = render(&engine, "<p>Hi</p><script yst=\"model\">{}</script>", "{name:'Bob'}");
        assert_eq!(out, "<p>Hi</p><script yst=\"model\">{name:'Bob'}</script>");
        assert_eq!(engine.evaluated(), [(1, "model".to_owned())]);
    }

    #[test]
    fn wrapped_model_is_unwrapped() {
        let engine = RecordingEngine::default();
        let out = render(
            &engine,
            "<script yst=\"model\"></script>",
            "<script yst=\"model\">x = 1</script>",
        );
        assert_eq!(out, "<script yst=\"model\">x = 1</script>");
    }

    #[test]
    fn failing_model_leaves_marker() {
        let engine = RecordingEngine::default();
        let out = render(&engine, "<script yst=\"model\"></script>!", "FAIL");
        assert!(out.starts_with(MODEL_ERROR), "{out}");
        assert!(out.ends_with('!'));
    }

    #[test]
    fn macro_output_value_is_spliced() {
        let engine = RecordingEngine::default();
        let out = render(&engine, "<b><script>document.write(YST.Txt('x'))</script></b>", "");
        assert_eq!(out, "<b>(YST.Txt('x'))</b>");
        assert_eq!(engine.evaluated(), [(1, "content_1".to_owned())]);
    }

    #[test]
    fn macro_output_failure_is_escaped_marker() {
        let engine = RecordingEngine::default();
        let out = render(
            &engine,
            "<script>document.write(YST.Txt(FAIL))</script><script>document.write(YST.Txt('ok'))</script>",
            "",
        );
        assert_eq!(
            out,
            "--ERROR GETTING CONTENT--content_0: forced &lt;failure&gt;(YST.Txt('ok'))"
        );
    }

    #[test]
    fn other_script_errors_are_swallowed() {
        let engine = RecordingEngine::default();
        let src = "<script>FAIL window.alert(1)</script><i/>";
        assert_eq!(render(&engine, src, ""), src);
        assert_eq!(engine.evaluated(), [(1, "command_0".to_owned())]);
    }

    #[test]
    fn declare_is_not_rerun() {
        let engine = RecordingEngine::default();
        let src = "<script yst=\"declare\">a = 1</script>";
        assert_eq!(render(&engine, src, ""), src);
        assert!(engine.evaluated().is_empty());
    }

    #[test]
    fn instance_scope_is_child_of_shared() {
        let engine = RecordingEngine::default();
        let shared = engine.create_scope(None).unwrap();
        let _ = Renderer::new(&engine, &shared, "").unwrap();
        assert_eq!(engine.parents.lock().unwrap()[1], Some(shared));
    }

    #[test]
    fn bad_model_wrapper_aborts() {
        let engine = RecordingEngine::default();
        let shared = engine.create_scope(None).unwrap();
        let err = Renderer::new(&engine, &shared, "<script>x = 1").err().unwrap();
        assert!(matches!(err, RenderError::ModelUnwrap(ModelError::Unterminated)));
    }

    #[test]
    fn substitution_evaluates_nothing() {
        let frags = classify("<p><script yst=\"model\">old</script></p>").unwrap();
        assert_eq!(substitute_model(&frags, "<script>new</script>"), "<p><script>new</script></p>");
    }
}
