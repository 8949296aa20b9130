//! String intern table
//!
//! Identifiers and string literals are stored once and referred to by a
//! small integer id everywhere else: in AST payloads, in `OP_PUSH_STRING`
//! operands, and inside `Value::Str`. Ids are handed out monotonically and
//! never reused, so an id stays valid for the life of the table.

use std::collections::HashMap;

/// Index into the string table. Interned ids are non-negative and dense,
/// so they fit in an instruction word.
pub type StringId = u32;

/// Bidirectional intern table: text to id, id to text.
///
/// Lookup by text is byte equality. The table only grows; interning the
/// same text twice returns the same id.
#[derive(Debug, Default)]
pub struct StringTable {
    strings: Vec<String>,
    ids: HashMap<String, StringId>,
}

impl StringTable {
    pub fn new() -> Self {
        StringTable::default()
    }

    /// Intern `text`, returning the existing id if the exact byte sequence
    /// is already present.
    pub fn intern(&mut self, text: &str) -> StringId {
        if let Some(&id) = self.ids.get(text) {
            return id;
        }
        let id = self.strings.len() as StringId;
        self.strings.push(text.to_string());
        self.ids.insert(text.to_string(), id);
        id
    }

    /// Resolve an id back to its text. Returns `None` if the id was never
    /// handed out by this table.
    pub fn lookup(&self, id: StringId) -> Option<&str> {
        self.strings.get(id as usize).map(String::as_str)
    }

    /// Number of interned strings (also the next id to be assigned).
    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intern_roundtrip() {
        let mut table = StringTable::new();
        let id = table.intern("hello");
        assert_eq!(table.lookup(id), Some("hello"));
    }

    #[test]
    fn test_intern_dedup() {
        let mut table = StringTable::new();
        let a = table.intern("x");
        let b = table.intern("y");
        let c = table.intern("x");
        assert_eq!(a, c);
        assert_ne!(a, b);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_ids_are_dense_and_monotonic() {
        let mut table = StringTable::new();
        for (i, text) in ["a", "b", "c", "d"].iter().enumerate() {
            assert_eq!(table.intern(text), i as StringId);
        }
    }

    #[test]
    fn test_lookup_out_of_range() {
        let mut table = StringTable::new();
        table.intern("only");
        assert_eq!(table.lookup(1), None);
        assert_eq!(table.lookup(StringId::MAX), None);
    }

    #[test]
    fn test_byte_equality_not_normalized() {
        let mut table = StringTable::new();
        let a = table.intern("caf\u{e9}");
        let b = table.intern("cafe\u{301}");
        assert_ne!(a, b);
    }
}
