//! Engine-neutral snapshot of a script binding.
//!
//! The evaluation port hands bindings back as [`Value`]s so the renderer
//! never depends on a particular engine's value representation.  The
//! [`Display`](fmt::Display) form is exactly what gets spliced into output.

use std::fmt;

/// A binding read back from a script scope.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// Missing or explicitly empty binding.
    #[default]
    Nil,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    /// Tables, functions and other engine objects, by their printed form.
    Opaque {
        type_name: &'static str,
        repr: String,
    },
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => Ok(()),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(n) => write!(f, "{n}"),
            Value::Float(x) => {
                // Integral floats keep one decimal so they stay distinguishable
                // from integers (`2.0`, not `2`).
                if x.fract() == 0.0 && x.abs() < 1e15 {
                    write!(f, "{:.1}", x)
                } else {
                    write!(f, "{x}")
                }
            }
            Value::Str(s) => write!(f, "{s}"),
            Value::Opaque { repr, .. } => write!(f, "{repr}"),
        }
    }
}

impl Value {
    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    /// Script truthiness: only `Nil` and `false` are falsy.
    pub fn as_bool(&self) -> bool {
        !matches!(self, Value::Nil | Value::Bool(false))
    }

    /// Integer view, if the value is numeric without loss.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            Value::Float(x) if x.fract() == 0.0 && x.abs() < 2f64.powi(63) => Some(*x as i64),
            _ => None,
        }
    }

    /// Borrowed string view of `Str` values.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Name of the type, as the engine reports it.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Bool(_) => "boolean",
            Value::Int(_) | Value::Float(_) => "number",
            Value::Str(_) => "string",
            Value::Opaque { type_name, .. } => *type_name,
        }
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_owned())
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_nil_is_empty() {
        assert_eq!(Value::Nil.to_string(), "");
    }

    #[test]
    fn display_int() {
        assert_eq!(Value::Int(42).to_string(), "42");
        assert_eq!(Value::Int(-7).to_string(), "-7");
    }

    #[test]
    fn display_float() {
        assert_eq!(Value::Float(3.25).to_string(), "3.25");
        assert_eq!(Value::Float(1.0).to_string(), "1.0");
    }

    #[test]
    fn display_str_and_opaque() {
        assert_eq!(Value::Str("hello".into()).to_string(), "hello");
        let t = Value::Opaque { type_name: "table", repr: "table: 0x1".into() };
        assert_eq!(t.to_string(), "table: 0x1");
        assert_eq!(t.type_name(), "table");
    }

    #[test]
    fn truthiness() {
        assert!(!Value::Nil.as_bool());
        assert!(!Value::Bool(false).as_bool());
        assert!(Value::Int(0).as_bool());
        assert!(Value::Str(String::new()).as_bool());
    }

    #[test]
    fn as_int_views() {
        assert_eq!(Value::Int(5).as_int(), Some(5));
        assert_eq!(Value::Float(3.0).as_int(), Some(3));
        assert_eq!(Value::Float(3.5).as_int(), None);
        assert_eq!(Value::Str("4".into()).as_int(), None);
    }

    #[test]
    fn as_int_rejects_floats_outside_i64() {
        assert_eq!(Value::Float(1e19).as_int(), None);
        assert_eq!(Value::Float(-1e19).as_int(), None);
        assert_eq!(Value::Float(2f64.powi(63)).as_int(), None);
        assert_eq!(Value::Float(f64::INFINITY).as_int(), None);
        assert_eq!(Value::Float(f64::NAN).as_int(), None);
        assert_eq!(Value::Float(-(2f64.powi(62))).as_int(), Some(-(1i64 << 62)));
    }

    #[test]
    fn from_impls() {
        let v: Value = 42i64.into();
        assert_eq!(v, Value::Int(42));
        let v: Value = "hi".into();
        assert_eq!(v.as_str(), Some("hi"));
        let v: Value = true.into();
        assert_eq!(v, Value::Bool(true));
    }
}
