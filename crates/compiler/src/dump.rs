//! Parse-tree and bytecode dumps
//!
//! Cosmetic output behind the `-t` and `-c` flags. The tree dump is one
//! node per line, indented by depth; the code dump is a linear
//! disassembly with call targets resolved to function names through the
//! function table.

use ant_core::{Opcode, StringTable, Word, opcode};

use crate::ast::{Node, NodeKind, Payload};
use crate::scope::Context;

/// Render a parse tree, one node per line, two spaces per depth level.
pub fn render_tree(root: &Node, strings: &StringTable) -> String {
    let mut out = String::new();
    render_node(root, strings, 1, &mut out);
    out
}

fn render_node(node: &Node, strings: &StringTable, depth: usize, out: &mut String) {
    out.push_str(&"  ".repeat(depth));
    out.push_str(&node_label(node, strings));
    out.push('\n');
    for child in &node.children {
        render_node(child, strings, depth + 1, out);
    }
}

fn node_label(node: &Node, strings: &StringTable) -> String {
    let text = |id: Option<u32>| {
        id.and_then(|id| strings.lookup(id))
            .unwrap_or("<bad string id>")
    };
    match node.kind {
        NodeKind::Abstract => "node".to_string(),
        NodeKind::Func => "function".to_string(),
        NodeKind::Assign => "=".to_string(),
        NodeKind::Local => "local".to_string(),
        NodeKind::FuncParams => "func_params".to_string(),
        NodeKind::FuncLocals => "func_locals".to_string(),
        NodeKind::Break => "break".to_string(),
        NodeKind::Return => "return".to_string(),
        NodeKind::Call => "call".to_string(),
        NodeKind::And => "and".to_string(),
        NodeKind::Or => "or".to_string(),
        NodeKind::Not => "not".to_string(),
        NodeKind::Equal => "==".to_string(),
        NodeKind::NotEqual => "!=".to_string(),
        NodeKind::Less => "<".to_string(),
        NodeKind::Greater => ">".to_string(),
        NodeKind::Lequal => "<=".to_string(),
        NodeKind::Gequal => ">=".to_string(),
        NodeKind::Add => "+".to_string(),
        NodeKind::Sub => "-".to_string(),
        NodeKind::Mul => "*".to_string(),
        NodeKind::Div => "/".to_string(),
        NodeKind::Mod => "%".to_string(),
        NodeKind::Neg => "neg".to_string(),
        NodeKind::Cat => "$".to_string(),
        NodeKind::If => "if".to_string(),
        NodeKind::While => "while".to_string(),
        NodeKind::DoWhile => "do".to_string(),
        NodeKind::Foreach => "foreach".to_string(),
        NodeKind::True => "true".to_string(),
        NodeKind::False => "false".to_string(),
        NodeKind::Null => "null".to_string(),
        NodeKind::ArrayGet => "array_get".to_string(),
        NodeKind::ArraySet => "array_set".to_string(),
        NodeKind::Id => format!("id: {}", text(node.str_id())),
        NodeKind::Int => match node.payload {
            Payload::Int(i) => format!("int: {}", i),
            _ => "int: ?".to_string(),
        },
        NodeKind::Float => match node.payload {
            Payload::Float(f) => format!("float: {}", f),
            _ => "float: ?".to_string(),
        },
        NodeKind::Str => format!("string: \"{}\"", text(node.str_id())),
        NodeKind::Array => "array: ...".to_string(),
    }
}

/// Disassemble the instruction vector.
pub fn render_code(code: &[Word], strings: &StringTable, ctx: &Context) -> String {
    let mut out = String::new();
    let mut i = 0;
    while i < code.len() {
        let at = i;
        let word = code[i];
        i += 1;
        let op = match Opcode::from_word(word) {
            Some(op) => op,
            None => {
                out.push_str(&format!("{:4}:    <INVALID_OP>: {}\n", at, word));
                continue;
            }
        };

        let mut operand = || {
            let w = code.get(i).copied().unwrap_or(0);
            i += 1;
            w
        };

        let line = match op {
            Opcode::PushInt => format!("{:<12} {}", op.mnemonic(), operand()),
            Opcode::PushFloat => {
                format!("{:<12} {}", op.mnemonic(), opcode::word_to_float(operand()))
            }
            Opcode::PushString => {
                let id = operand();
                format!(
                    "{:<12} \"{}\"",
                    op.mnemonic(),
                    strings.lookup(id as u32).unwrap_or("<bad string id>")
                )
            }
            Opcode::PushVar | Opcode::Assign => {
                format!("{:<12} {}", op.mnemonic(), operand())
            }
            Opcode::PushArray => format!("{:<12} {}", op.mnemonic(), operand()),
            Opcode::Bra | Opcode::Brz | Opcode::Bnz | Opcode::Beq | Opcode::Bne => {
                format!("{:<12} {}", op.mnemonic(), operand())
            }
            Opcode::Call => {
                let target = operand();
                let nparams = operand();
                let nlocals = operand();
                let name = ctx
                    .function_map
                    .get(&target)
                    .map(|&scope| ctx.scope(scope).name.as_str())
                    .unwrap_or("<unknown>");
                format!("{:<12} {}  {}  {}", op.mnemonic(), name, nparams, nlocals)
            }
            _ => op.mnemonic().to_string(),
        };

        out.push_str(&format!("{:4}:    {}\n", at, line));
    }
    out
}
