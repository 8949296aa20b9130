//! Code generation
//!
//! A single recursive walk over the AST appending words to the shared
//! instruction vector. Function scopes are created on entry to FUNC nodes
//! and popped on exit; symbol slots come from the scope machinery in
//! [`crate::scope`]. Forward jumps are emitted as a zero placeholder and
//! patched once the target is known; backward jumps encode `start - here`
//! at the moment of emission. Either way the machine adds the stored
//! offset to the instruction pointer after reading it.

use ant_core::{Opcode, StringId, StringTable, Word, opcode};
use tracing::debug;

use crate::ast::{Node, NodeKind, Payload};
use crate::builtins;
use crate::error::{CompileError, CompileErrorKind};
use crate::scope::{Context, SymbolError};

pub struct CodeGen<'a> {
    ctx: &'a mut Context,
    strings: &'a mut StringTable,
    code: &'a mut Vec<Word>,
    /// Pending break-jump slots, one frame per enclosing loop
    loop_breaks: Vec<Vec<usize>>,
}

impl<'a> CodeGen<'a> {
    /// Generate code for one parsed file into the shared vector.
    pub fn generate(
        root: &Node,
        ctx: &'a mut Context,
        strings: &'a mut StringTable,
        code: &'a mut Vec<Word>,
    ) -> Result<(), CompileError> {
        let mut codegen = CodeGen {
            ctx,
            strings,
            code,
            loop_breaks: Vec::new(),
        };
        codegen.gen_node(root)?;
        debug!("generated {} words", codegen.code.len());
        Ok(())
    }

    fn gen_node(&mut self, n: &Node) -> Result<(), CompileError> {
        match n.kind {
            NodeKind::Abstract => {
                for child in &n.children {
                    self.gen_node(child)?;
                }
            }

            NodeKind::Int => {
                self.emit_op(Opcode::PushInt);
                self.emit(payload_int(n));
            }

            NodeKind::Float => {
                let value = match n.payload {
                    Payload::Float(f) => f,
                    _ => 0.0,
                };
                self.emit_op(Opcode::PushFloat);
                self.emit(opcode::float_to_word(value));
            }

            NodeKind::Str => {
                self.emit_op(Opcode::PushString);
                self.emit(ident_id(n) as Word);
            }

            // True and false carry their integer encodings as payload.
            NodeKind::True | NodeKind::False => {
                self.emit_op(Opcode::PushInt);
                self.emit(payload_int(n));
            }

            NodeKind::Null => {
                return Err(self.err(n, CompileErrorKind::Unsupported("null")));
            }

            NodeKind::Id => {
                let slot = self.get_local(n)?;
                self.emit_op(Opcode::PushVar);
                self.emit(slot);
            }

            NodeKind::Array => {
                for child in n.children.iter().rev() {
                    self.gen_node(child)?;
                }
                self.emit_op(Opcode::PushArray);
                self.emit(n.children.len() as Word);
            }

            NodeKind::ArrayGet => {
                self.gen_node(&n.children[0])?;
                self.gen_node(&n.children[1])?;
                self.emit_op(Opcode::Get);
            }

            NodeKind::ArraySet => {
                // SET leaves the updated array on the stack; store it back
                // into the indexed variable.
                let slot = self.get_local(&n.children[0])?;
                self.gen_node(&n.children[0])?;
                self.gen_node(&n.children[1])?;
                self.gen_node(&n.children[2])?;
                self.emit_op(Opcode::Set);
                self.emit_op(Opcode::Assign);
                self.emit(slot);
            }

            NodeKind::Assign => {
                let slot = self.get_local(&n.children[0])?;
                self.gen_node(&n.children[1])?;
                self.emit_op(Opcode::Assign);
                self.emit(slot);
            }

            NodeKind::Local => {
                let name = ident_id(&n.children[0]);
                let scope = self.ctx.current();
                let slot = self
                    .ctx
                    .add_local(scope, name)
                    .map_err(|e| self.symbol_err(&n.children[0], e, name))?;
                self.gen_node(&n.children[1])?;
                self.emit_op(Opcode::Assign);
                self.emit(slot);
            }

            NodeKind::If => {
                self.gen_node(&n.children[0])?;
                self.emit_op(Opcode::Brz);
                let over_then = self.forward_jump();
                self.gen_node(&n.children[1])?;
                self.emit_op(Opcode::Bra);
                let over_else = self.forward_jump();
                self.patch_forward_jump(over_then);
                if n.children.len() == 3 {
                    self.gen_node(&n.children[2])?;
                    self.patch_forward_jump(over_else);
                }
                // Without an else branch the second jump keeps its zero
                // offset and falls through.
            }

            NodeKind::While => {
                let start = self.code.len() as Word - 1;
                self.loop_breaks.push(Vec::new());
                self.gen_node(&n.children[0])?;
                self.emit_op(Opcode::Brz);
                let exit = self.forward_jump();
                self.gen_node(&n.children[1])?;
                self.emit_op(Opcode::Bra);
                self.emit(start - self.code.len() as Word);
                self.patch_forward_jump(exit);
                self.patch_breaks();
            }

            NodeKind::DoWhile => {
                let start = self.code.len() as Word - 1;
                self.loop_breaks.push(Vec::new());
                self.gen_node(&n.children[0])?;
                self.gen_node(&n.children[1])?;
                self.emit_op(Opcode::Bnz);
                self.emit(start - self.code.len() as Word);
                self.patch_breaks();
            }

            NodeKind::Foreach => self.gen_foreach(n)?,

            NodeKind::Break => {
                if self.loop_breaks.is_empty() {
                    return Err(self.err(n, CompileErrorKind::BreakOutsideLoop));
                }
                self.emit_op(Opcode::Bra);
                let patch = self.forward_jump();
                if let Some(frame) = self.loop_breaks.last_mut() {
                    frame.push(patch);
                }
            }

            NodeKind::Func => self.gen_function(n)?,

            NodeKind::Call => self.gen_call(n)?,

            NodeKind::Return => {
                if n.children.is_empty() {
                    self.emit_op(Opcode::PushInt);
                    self.emit(0);
                } else {
                    self.gen_node(&n.children[0])?;
                }
                self.emit_op(Opcode::Return);
            }

            NodeKind::Neg => {
                // 0 - x, promoted through SUB's rules
                self.emit_op(Opcode::PushInt);
                self.emit(0);
                self.gen_node(&n.children[0])?;
                self.emit_op(Opcode::Sub);
            }

            NodeKind::Not => {
                self.gen_node(&n.children[0])?;
                self.emit_op(Opcode::Not);
            }

            NodeKind::Cat => {
                // "" + lhs + rhs forces string concatenation whatever the
                // operand kinds are.
                let empty = self.strings.intern("");
                self.emit_op(Opcode::PushString);
                self.emit(empty as Word);
                self.gen_node(&n.children[0])?;
                self.emit_op(Opcode::Add);
                self.gen_node(&n.children[1])?;
                self.emit_op(Opcode::Add);
            }

            NodeKind::Equal => self.gen_binary(n, Opcode::Equal)?,
            NodeKind::NotEqual => self.gen_binary(n, Opcode::Nequal)?,
            NodeKind::Less => self.gen_binary(n, Opcode::Less)?,
            NodeKind::Greater => self.gen_binary(n, Opcode::Greater)?,
            NodeKind::Lequal => self.gen_binary(n, Opcode::Lequal)?,
            NodeKind::Gequal => self.gen_binary(n, Opcode::Gequal)?,
            NodeKind::And => self.gen_binary(n, Opcode::And)?,
            NodeKind::Or => self.gen_binary(n, Opcode::Or)?,
            NodeKind::Add => self.gen_binary(n, Opcode::Add)?,
            NodeKind::Sub => self.gen_binary(n, Opcode::Sub)?,
            NodeKind::Mul => self.gen_binary(n, Opcode::Mul)?,
            NodeKind::Div => self.gen_binary(n, Opcode::Div)?,
            NodeKind::Mod => self.gen_binary(n, Opcode::Mod)?,

            // Consumed by gen_function; nothing to emit on their own.
            NodeKind::FuncParams | NodeKind::FuncLocals => {}
        }
        Ok(())
    }

    fn gen_binary(&mut self, n: &Node, op: Opcode) -> Result<(), CompileError> {
        self.gen_node(&n.children[0])?;
        self.gen_node(&n.children[1])?;
        self.emit_op(op);
        Ok(())
    }

    fn gen_function(&mut self, n: &Node) -> Result<(), CompileError> {
        let name_node = &n.children[0];
        let name = ident_id(name_node);
        let name_text = self.lookup_name(name);
        debug!("function {}", name_text);

        let parent = self.ctx.current();
        let scope = self
            .ctx
            .add_function(parent, name, &name_text)
            .map_err(|e| self.symbol_err(name_node, e, name))?;
        self.ctx.push_scope(scope);

        for param in &n.children[1].children {
            let pid = ident_id(param);
            self.ctx
                .add_param(scope, pid)
                .map_err(|e| self.symbol_err(param, e, pid))?;
        }
        for local in &n.children[2].children {
            let lid = ident_id(local);
            self.ctx
                .add_local(scope, lid)
                .map_err(|e| self.symbol_err(local, e, lid))?;
        }

        self.emit_op(Opcode::Bra);
        let over_body = self.forward_jump();
        let begin = self.code.len() as Word;
        self.ctx.scope_mut(scope).begin = begin;
        self.ctx.function_map.insert(begin, scope);

        self.gen_node(&n.children[3])?;
        // Implicit return keeps control from running off the end of a
        // body with no return statement.
        self.emit_op(Opcode::PushInt);
        self.emit(0);
        self.emit_op(Opcode::Return);

        self.patch_forward_jump(over_body);
        self.ctx.pop_scope();
        Ok(())
    }

    fn gen_call(&mut self, n: &Node) -> Result<(), CompileError> {
        let callee = ident_id(&n.children[0]);
        let name = self.lookup_name(callee);
        let argc = n.children.len() - 1;

        if let Some(builtin) = builtins::lookup(&name) {
            if argc != builtin.arity() {
                return Err(self.err(
                    n,
                    CompileErrorKind::BadArity {
                        name,
                        wanted: builtin.arity(),
                        got: argc,
                    },
                ));
            }
            for arg in &n.children[1..] {
                self.gen_node(arg)?;
            }
            self.emit_op(builtin.opcode());
            return Ok(());
        }

        let func = self
            .ctx
            .find_function(self.ctx.current(), callee)
            .map_err(|e| self.symbol_err(&n.children[0], e, callee))?;
        let nparams = self.ctx.scope(func).params.len();
        if argc != nparams {
            return Err(self.err(
                n,
                CompileErrorKind::BadArity {
                    name,
                    wanted: nparams,
                    got: argc,
                },
            ));
        }

        // Arguments go on in reverse so argument 1 ends up closest to the
        // frame.
        for arg in n.children[1..].iter().rev() {
            self.gen_node(arg)?;
        }
        let scope = self.ctx.scope(func);
        let (begin, nlocals) = (scope.begin, scope.locals.len());
        self.emit_op(Opcode::Call);
        self.emit(begin);
        self.emit(nparams as Word);
        self.emit(nlocals as Word);
        Ok(())
    }

    /// foreach (x in e) body: evaluate `e` once into a hidden local and
    /// walk it by index with a second hidden local.
    fn gen_foreach(&mut self, n: &Node) -> Result<(), CompileError> {
        let var_node = &n.children[0];
        let var = ident_id(var_node);
        let scope = self.ctx.current();
        let var_slot = match self.ctx.get_local(scope, var) {
            Ok(slot) => slot,
            Err(_) => self
                .ctx
                .add_local(scope, var)
                .map_err(|e| self.symbol_err(var_node, e, var))?,
        };
        let arr_slot = self.add_temp(var_node)?;
        let idx_slot = self.add_temp(var_node)?;

        self.gen_node(&n.children[1])?;
        self.emit_op(Opcode::Assign);
        self.emit(arr_slot);
        self.emit_op(Opcode::PushInt);
        self.emit(0);
        self.emit_op(Opcode::Assign);
        self.emit(idx_slot);

        let start = self.code.len() as Word - 1;
        self.loop_breaks.push(Vec::new());

        // idx < count(arr)
        self.emit_op(Opcode::PushVar);
        self.emit(idx_slot);
        self.emit_op(Opcode::PushVar);
        self.emit(arr_slot);
        self.emit_op(Opcode::Count);
        self.emit_op(Opcode::Less);
        self.emit_op(Opcode::Brz);
        let exit = self.forward_jump();

        // x = arr[idx]
        self.emit_op(Opcode::PushVar);
        self.emit(arr_slot);
        self.emit_op(Opcode::PushVar);
        self.emit(idx_slot);
        self.emit_op(Opcode::Get);
        self.emit_op(Opcode::Assign);
        self.emit(var_slot);

        self.gen_node(&n.children[2])?;

        // idx = idx + 1
        self.emit_op(Opcode::PushVar);
        self.emit(idx_slot);
        self.emit_op(Opcode::PushInt);
        self.emit(1);
        self.emit_op(Opcode::Add);
        self.emit_op(Opcode::Assign);
        self.emit(idx_slot);

        self.emit_op(Opcode::Bra);
        self.emit(start - self.code.len() as Word);
        self.patch_forward_jump(exit);
        self.patch_breaks();
        Ok(())
    }

    /// Hidden iteration local. The `#` prefix cannot appear in an
    /// identifier, and the local count makes the name unique within its
    /// scope.
    fn add_temp(&mut self, at: &Node) -> Result<Word, CompileError> {
        let scope = self.ctx.current();
        let name = format!("#{}", self.ctx.scope(scope).locals.len());
        let id = self.strings.intern(&name);
        self.ctx
            .add_local(scope, id)
            .map_err(|e| self.symbol_err(at, e, id))
    }

    fn get_local(&self, node: &Node) -> Result<Word, CompileError> {
        let name = ident_id(node);
        self.ctx
            .get_local(self.ctx.current(), name)
            .map_err(|e| self.symbol_err(node, e, name))
    }

    fn lookup_name(&self, id: StringId) -> String {
        self.strings.lookup(id).unwrap_or("<unknown>").to_string()
    }

    fn symbol_err(&self, node: &Node, err: SymbolError, name: StringId) -> CompileError {
        let name = self.lookup_name(name);
        let kind = match err {
            SymbolError::Redeclared => CompileErrorKind::Redeclared(name),
            SymbolError::Undeclared => CompileErrorKind::Undeclared(name),
            SymbolError::UndefinedFunction => CompileErrorKind::UndefinedFunction(name),
        };
        self.err(node, kind)
    }

    fn err(&self, node: &Node, kind: CompileErrorKind) -> CompileError {
        CompileError::new(kind, node.line, node.column)
    }

    fn emit(&mut self, word: Word) {
        self.code.push(word);
    }

    fn emit_op(&mut self, op: Opcode) {
        self.code.push(op as Word);
    }

    /// Emit a zero placeholder and remember its slot.
    fn forward_jump(&mut self) -> usize {
        self.emit(0);
        self.code.len() - 1
    }

    /// Point a placeholder at the current end of code.
    fn patch_forward_jump(&mut self, slot: usize) {
        self.code[slot] = (self.code.len() - slot) as Word - 1;
    }

    fn patch_breaks(&mut self) {
        if let Some(frame) = self.loop_breaks.pop() {
            for slot in frame {
                self.patch_forward_jump(slot);
            }
        }
    }
}

fn ident_id(node: &Node) -> StringId {
    match node.payload {
        Payload::Str(id) => id,
        _ => unreachable!("node {:?} without string payload", node.kind),
    }
}

fn payload_int(node: &Node) -> Word {
    match node.payload {
        Payload::Int(i) => i,
        _ => 0,
    }
}
