//! Compile-time errors and diagnostic formatting
//!
//! Every error from the lexer, parser, or code generator carries the
//! source line and column it was raised at. `report` turns one into the
//! uniform user-facing diagnostic: message, position, the offending source
//! line, and a caret under the offending column.

use crate::lexer::TokenKind;

#[derive(Debug, Clone, PartialEq)]
pub enum CompileErrorKind {
    UnterminatedComment,
    UnterminatedString,
    BadNumber(String),
    BadToken(String),
    ExpectedToken { wanted: TokenKind, found: TokenKind },
    /// The parser needed the start of an expression and got something else
    InvalidFactor(TokenKind),
    /// Assignment to something that is not a variable
    NotAnLvalue,
    Redeclared(String),
    Undeclared(String),
    UndefinedFunction(String),
    BadArity { name: String, wanted: usize, got: usize },
    BreakOutsideLoop,
    Unsupported(&'static str),
}

impl std::fmt::Display for CompileErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CompileErrorKind::UnterminatedComment => {
                write!(f, "end of file reached before end of comment block")
            }
            CompileErrorKind::UnterminatedString => {
                write!(f, "end of file reached inside a string literal")
            }
            CompileErrorKind::BadNumber(text) => write!(f, "bad numeric literal: {}", text),
            CompileErrorKind::BadToken(text) => write!(f, "unrecognized token: {}", text),
            CompileErrorKind::ExpectedToken { wanted, found } => {
                write!(f, "expected '{}', got '{}'", wanted.describe(), found.describe())
            }
            CompileErrorKind::InvalidFactor(found) => {
                write!(f, "invalid factor: '{}'", found.describe())
            }
            CompileErrorKind::NotAnLvalue => write!(f, "expected identifier on left of '='"),
            CompileErrorKind::Redeclared(name) => {
                write!(f, "symbol already declared: {}", name)
            }
            CompileErrorKind::Undeclared(name) => write!(f, "undeclared variable: {}", name),
            CompileErrorKind::UndefinedFunction(name) => {
                write!(f, "could not find function: {}", name)
            }
            CompileErrorKind::BadArity { name, wanted, got } => {
                write!(f, "'{}' takes {} argument(s), got {}", name, wanted, got)
            }
            CompileErrorKind::BreakOutsideLoop => write!(f, "'break' outside of a loop"),
            CompileErrorKind::Unsupported(what) => write!(f, "'{}' is not supported", what),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompileError {
    pub kind: CompileErrorKind,
    /// 0-indexed source line
    pub line: usize,
    /// 0-indexed source column
    pub column: usize,
}

impl CompileError {
    pub fn new(kind: CompileErrorKind, line: usize, column: usize) -> Self {
        CompileError { kind, line, column }
    }

    /// Render the uniform diagnostic, quoting the offending source line
    /// with a caret under the offending column.
    pub fn report(&self, lines: &[String]) -> String {
        let source_line = lines.get(self.line).map(String::as_str).unwrap_or("");
        format!(
            "ERROR: {}\n    line {}, column {}\n    ... {}\n        {}^\n",
            self.kind,
            self.line + 1,
            self.column + 1,
            source_line,
            " ".repeat(self.column),
        )
    }
}

impl std::fmt::Display for CompileError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} (line {}, column {})",
            self.kind,
            self.line + 1,
            self.column + 1
        )
    }
}

impl std::error::Error for CompileError {}
