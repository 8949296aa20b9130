//! AntEater compiler library
//!
//! The pipeline: lexer -> parser -> scopes -> code generator, all feeding
//! one shared instruction vector, then the virtual machine in
//! `ant-runtime` executes it. [`AntVm`] is the main entry point and owns
//! everything shared across compilations: the string table, the scope
//! context, and the instruction vector. `compile_file` / `compile_script`
//! may be called repeatedly; each call appends one file's code. `run`
//! finalises the program, executes it, and returns the captured output.
//!
//! ```no_run
//! use ant_compiler::AntVm;
//!
//! let mut vm = AntVm::new();
//! vm.compile_script("print(1 + 2);")?;
//! let result = vm.run();
//! assert_eq!(result.output, "3\n");
//! # Ok::<(), String>(())
//! ```

pub mod ast;
pub mod builtins;
pub mod codegen;
pub mod config;
pub mod dump;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod scope;

pub use ast::{Node, NodeKind, Payload};
pub use codegen::CodeGen;
pub use config::AntConfig;
pub use error::{CompileError, CompileErrorKind};
pub use lexer::{Lexer, Token, TokenKind};
pub use parser::Parser;
pub use scope::{Context, Scope, ScopeId};

use std::path::Path;

use ant_core::{Opcode, StringTable, Word};
use ant_runtime::RunResult;
use tracing::debug;

/// The embedded virtual machine: accumulated bytecode plus the shared
/// compilation state, with the prologue pre-seeded.
pub struct AntVm {
    /// Dump the parse tree of each compiled file
    pub print_tree: bool,

    ctx: Context,
    strings: StringTable,
    code: Vec<Word>,
    files: usize,
}

impl AntVm {
    pub fn new() -> Self {
        AntVm {
            print_tree: false,
            ctx: Context::new(),
            strings: StringTable::new(),
            code: prologue(),
            files: 0,
        }
    }

    /// Compile raw top-level source and append its code to the program.
    /// On failure the rendered diagnostic is returned as the error.
    pub fn compile_str(&mut self, source: &str) -> Result<(), String> {
        debug!("parsing {} bytes", source.len());
        let lines: Vec<String> = source.lines().map(str::to_string).collect();

        let root = Parser::new(source, &mut self.strings)
            .parse()
            .map_err(|e| e.report(&lines))?;

        if self.print_tree {
            println!("{}", dump::render_tree(&root, &self.strings));
        }

        debug!("generating code");
        CodeGen::generate(&root, &mut self.ctx, &mut self.strings, &mut self.code)
            .map_err(|e| e.report(&lines))
    }

    /// Compile a script the way the driver does: wrapped in a synthetic
    /// function plus a call to it, so the file's top level becomes one
    /// function body.
    pub fn compile_script(&mut self, source: &str) -> Result<(), String> {
        let name = format!("__file{}", self.files);
        self.files += 1;
        let wrapped = format!("function {name}() {{ \n{source}\n }}; {name}();");
        self.compile_str(&wrapped)
    }

    pub fn compile_file(&mut self, path: &Path) -> Result<(), String> {
        debug!("compiling {}", path.display());
        let source = std::fs::read_to_string(path)
            .map_err(|e| format!("failed to read {}: {}", path.display(), e))?;
        self.compile_script(&source)
    }

    /// Disassemble the program compiled so far.
    pub fn dump_code(&self) -> String {
        dump::render_code(&self.code, &self.strings, &self.ctx)
    }

    /// Finalise and execute: patch the prologue with the global local
    /// count, append the terminator, run, and clear the instruction
    /// vector. The captured output (including any runtime error line) is
    /// in the result.
    pub fn run(&mut self) -> RunResult {
        if self.code.len() > 3 {
            self.code[3] = self.ctx.scope(Context::GLOBAL).locals.len() as Word;
        }
        self.code.push(Opcode::Done as Word);
        debug!("running {} words", self.code.len());
        let result = ant_runtime::run(&self.code, &mut self.strings);
        self.code.clear();
        result
    }

    /// The program compiled so far (prologue included).
    pub fn code(&self) -> &[Word] {
        &self.code
    }

    pub fn strings(&self) -> &StringTable {
        &self.strings
    }

    pub fn context(&self) -> &Context {
        &self.ctx
    }
}

impl Default for AntVm {
    fn default() -> Self {
        Self::new()
    }
}

/// The four-word prologue: a call into the global scope at offset 4. The
/// local count is patched in at `run`.
fn prologue() -> Vec<Word> {
    vec![Opcode::Call as Word, Context::GLOBAL_BEGIN, 0, 0]
}
