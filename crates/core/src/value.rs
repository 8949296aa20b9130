//! Value: what the language talks about
//!
//! A `Value` is pure data. Strings are interned ids into the shared
//! [`StringTable`], so copying a string value is copying an integer.
//! Arrays own their elements and are value-typed: assignment and argument
//! passing clone the whole array, so no two variables ever share storage.

use crate::strings::{StringId, StringTable};

/// A runtime value.
///
/// `Invalid` is the state of a freshly pushed local slot; reading one as a
/// typed value is a runtime error, but copying it around is fine.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Value {
    #[default]
    Invalid,

    /// Integer value
    Int(i32),

    /// Floating-point value (IEEE 754 single precision)
    Float(f32),

    /// Interned string id
    Str(StringId),

    /// Heterogeneous, nestable, value-typed sequence
    Array(Vec<Value>),
}

impl Value {
    /// Kind name as it appears in error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Invalid => "<invalid>",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
            Value::Array(_) => "array",
        }
    }

    pub fn is_int(&self) -> bool {
        matches!(self, Value::Int(_))
    }

    pub fn is_str(&self) -> bool {
        matches!(self, Value::Str(_))
    }

    /// Render a value the way `print` shows it. Strings render as their
    /// bare text; arrays render as a brace block with one element per line.
    pub fn render(&self, strings: &StringTable) -> String {
        match self {
            Value::Invalid => "<invalid>".to_string(),
            Value::Int(i) => i.to_string(),
            Value::Float(f) => f.to_string(),
            Value::Str(id) => strings.lookup(*id).unwrap_or("<bad string id>").to_string(),
            Value::Array(elems) => {
                let mut s = String::from("\n{\n");
                for elem in elems {
                    s.push_str("   ");
                    s.push_str(&elem.render(strings));
                    s.push_str(",\n");
                }
                s.push('}');
                s
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_invalid() {
        assert_eq!(Value::default(), Value::Invalid);
    }

    #[test]
    fn test_kind_names() {
        assert_eq!(Value::Int(1).kind_name(), "int");
        assert_eq!(Value::Float(1.0).kind_name(), "float");
        assert_eq!(Value::Str(0).kind_name(), "string");
        assert_eq!(Value::Array(vec![]).kind_name(), "array");
        assert_eq!(Value::Invalid.kind_name(), "<invalid>");
    }

    #[test]
    fn test_render_numbers() {
        let strings = StringTable::new();
        assert_eq!(Value::Int(42).render(&strings), "42");
        assert_eq!(Value::Int(-7).render(&strings), "-7");
        assert_eq!(Value::Float(0.5).render(&strings), "0.5");
        // Whole floats render without a trailing fraction
        assert_eq!(Value::Float(2.0).render(&strings), "2");
    }

    #[test]
    fn test_render_string_is_bare_text() {
        let mut strings = StringTable::new();
        let id = strings.intern("x=");
        assert_eq!(Value::Str(id).render(&strings), "x=");
    }

    #[test]
    fn test_render_array() {
        let strings = StringTable::new();
        let v = Value::Array(vec![Value::Int(1), Value::Int(2)]);
        assert_eq!(v.render(&strings), "\n{\n   1,\n   2,\n}");
    }

    #[test]
    fn test_array_copies_do_not_share() {
        let a = Value::Array(vec![Value::Int(1)]);
        let mut b = a.clone();
        if let Value::Array(elems) = &mut b {
            elems[0] = Value::Int(99);
        }
        assert_eq!(a, Value::Array(vec![Value::Int(1)]));
    }

    #[test]
    fn test_string_equality_is_id_equality() {
        let mut strings = StringTable::new();
        let a = strings.intern("same");
        let b = strings.intern("same");
        assert_eq!(Value::Str(a), Value::Str(b));
    }
}
