//! Function scopes and slot assignment
//!
//! One `Scope` per function, arranged in an arena and addressed by id so
//! parent/child links are plain integers. Parameters get negative frame
//! slots (first parameter -2, second -3, ...), locals get positive ones
//! (first local 1); slots 0 and -1 belong to the call frame itself. The
//! `Context` is shared across every file compiled into one program: it
//! owns the arena, the scope stack the code generator pushes and pops,
//! and the function table mapping code offsets back to scopes.

use std::collections::HashMap;

use ant_core::{StringId, Word};

pub type ScopeId = usize;

/// Why a symbol operation failed; the code generator attaches the source
/// position and the resolved name text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolError {
    Redeclared,
    Undeclared,
    UndefinedFunction,
}

#[derive(Debug)]
pub struct Scope {
    pub name: String,
    pub parent: Option<ScopeId>,
    pub children: Vec<ScopeId>,
    /// Parameter names in declaration order
    pub params: Vec<StringId>,
    /// Local names in declaration order
    pub locals: Vec<StringId>,
    /// name -> frame slot
    symbols: HashMap<StringId, Word>,
    /// name -> child function scope
    functions: HashMap<StringId, ScopeId>,
    /// Absolute code offset of the function body
    pub begin: Word,
}

impl Scope {
    fn new(name: String, parent: Option<ScopeId>) -> Self {
        Scope {
            name,
            parent,
            children: Vec::new(),
            params: Vec::new(),
            locals: Vec::new(),
            symbols: HashMap::new(),
            functions: HashMap::new(),
            begin: 0,
        }
    }

    pub fn is_declared(&self, name: StringId) -> bool {
        self.symbols.contains_key(&name) || self.functions.contains_key(&name)
    }
}

/// Compilation context shared across files.
#[derive(Debug)]
pub struct Context {
    scopes: Vec<Scope>,
    pub scope_stack: Vec<ScopeId>,
    /// code-begin offset -> scope
    pub function_map: HashMap<Word, ScopeId>,
}

impl Context {
    pub const GLOBAL: ScopeId = 0;

    /// The global scope starts at offset 4, just past the synthetic
    /// four-word prologue.
    pub const GLOBAL_BEGIN: Word = 4;

    pub fn new() -> Self {
        let mut global = Scope::new("main".to_string(), None);
        global.begin = Self::GLOBAL_BEGIN;
        let mut function_map = HashMap::new();
        function_map.insert(Self::GLOBAL_BEGIN, Self::GLOBAL);
        Context {
            scopes: vec![global],
            scope_stack: vec![Self::GLOBAL],
            function_map,
        }
    }

    pub fn scope(&self, id: ScopeId) -> &Scope {
        &self.scopes[id]
    }

    pub fn scope_mut(&mut self, id: ScopeId) -> &mut Scope {
        &mut self.scopes[id]
    }

    /// The scope currently being generated into.
    pub fn current(&self) -> ScopeId {
        self.scope_stack.last().copied().unwrap_or(Self::GLOBAL)
    }

    pub fn push_scope(&mut self, id: ScopeId) {
        self.scope_stack.push(id);
    }

    pub fn pop_scope(&mut self) {
        self.scope_stack.pop();
    }

    /// Declare a parameter: the k-th parameter (1-based) gets slot -(k+1).
    pub fn add_param(&mut self, id: ScopeId, name: StringId) -> Result<Word, SymbolError> {
        let scope = &mut self.scopes[id];
        if scope.is_declared(name) {
            return Err(SymbolError::Redeclared);
        }
        scope.params.push(name);
        let slot = -(scope.params.len() as Word) - 1;
        scope.symbols.insert(name, slot);
        Ok(slot)
    }

    /// Declare a local: the k-th local (1-based) gets slot k.
    pub fn add_local(&mut self, id: ScopeId, name: StringId) -> Result<Word, SymbolError> {
        let scope = &mut self.scopes[id];
        if scope.is_declared(name) {
            return Err(SymbolError::Redeclared);
        }
        scope.locals.push(name);
        let slot = scope.locals.len() as Word;
        scope.symbols.insert(name, slot);
        Ok(slot)
    }

    /// Resolve a variable in this scope only; there is no outer-scope
    /// fallback for variables.
    pub fn get_local(&self, id: ScopeId, name: StringId) -> Result<Word, SymbolError> {
        self.scopes[id]
            .symbols
            .get(&name)
            .copied()
            .ok_or(SymbolError::Undeclared)
    }

    /// Register a child function scope under `name`.
    pub fn add_function(
        &mut self,
        parent: ScopeId,
        name: StringId,
        name_text: &str,
    ) -> Result<ScopeId, SymbolError> {
        if self.scopes[parent].is_declared(name) {
            return Err(SymbolError::Redeclared);
        }
        let child = self.scopes.len();
        self.scopes.push(Scope::new(name_text.to_string(), Some(parent)));
        let scope = &mut self.scopes[parent];
        scope.children.push(child);
        scope.functions.insert(name, child);
        Ok(child)
    }

    /// Resolve a function by name, walking parent scopes.
    pub fn find_function(&self, from: ScopeId, name: StringId) -> Result<ScopeId, SymbolError> {
        let mut current = Some(from);
        while let Some(id) = current {
            if let Some(&child) = self.scopes[id].functions.get(&name) {
                return Ok(child);
            }
            current = self.scopes[id].parent;
        }
        Err(SymbolError::UndefinedFunction)
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}
