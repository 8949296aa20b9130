//! Abstract syntax tree
//!
//! One generic node shape for the whole tree: a kind, a source position,
//! an optional payload, and owned children. The tree is built by the
//! parser, consumed by the code generator, and dropped as a unit
//! afterwards; nothing else ever holds a reference into it.

use ant_core::StringId;

/// The closed set of node kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// Statement sequence / block; also the program root
    Abstract,

    Func,
    Assign,
    Local,
    FuncParams,
    FuncLocals,

    Break,
    Return,
    Call,

    And,
    Or,
    Not,

    Equal,
    NotEqual,
    Less,
    Greater,
    Lequal,
    Gequal,

    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Neg,
    Cat,

    If,
    While,
    DoWhile,
    Foreach,

    True,
    False,
    Null,
    ArrayGet,
    ArraySet,

    Id,
    Int,
    Float,
    Str,
    Array,
}

/// Node payload: at most one of these is meaningful per kind.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Payload {
    None,
    Int(i32),
    Float(f32),
    Str(StringId),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub kind: NodeKind,
    pub line: usize,
    pub column: usize,
    pub payload: Payload,
    pub children: Vec<Node>,
}

impl Node {
    pub fn new(kind: NodeKind, line: usize, column: usize) -> Self {
        Node {
            kind,
            line,
            column,
            payload: Payload::None,
            children: Vec::new(),
        }
    }

    pub fn push(&mut self, child: Node) {
        self.children.push(child);
    }

    /// The interned-string payload, for ID and STRING nodes.
    pub fn str_id(&self) -> Option<StringId> {
        match self.payload {
            Payload::Str(id) => Some(id),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_children_are_owned() {
        let mut root = Node::new(NodeKind::Abstract, 0, 0);
        let mut add = Node::new(NodeKind::Add, 0, 2);
        add.push(Node::new(NodeKind::Int, 0, 0));
        add.push(Node::new(NodeKind::Int, 0, 4));
        root.push(add);
        assert_eq!(root.children.len(), 1);
        assert_eq!(root.children[0].children.len(), 2);
    }

    #[test]
    fn test_str_id_only_for_string_payloads() {
        let mut id = Node::new(NodeKind::Id, 0, 0);
        id.payload = Payload::Str(7);
        assert_eq!(id.str_id(), Some(7));

        let mut int = Node::new(NodeKind::Int, 0, 0);
        int.payload = Payload::Int(7);
        assert_eq!(int.str_id(), None);
    }
}
