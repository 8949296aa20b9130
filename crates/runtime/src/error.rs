//! Runtime error types
//!
//! Every way execution can go wrong, as a closed enum. Messages are what
//! the user sees after `Script runtime error:` in the output log.

use ant_core::Word;

#[derive(Debug, Clone, PartialEq)]
pub enum RuntimeError {
    /// A string id with no entry in the intern table
    BadStringId(Word),

    /// An arithmetic or logical operator applied to kinds it does not accept
    BadTypes {
        op: &'static str,
        lhs: &'static str,
        rhs: &'static str,
    },

    /// A value of the wrong kind in a typed position (branch condition,
    /// `not` operand, saved frame slot, ...)
    TypeMismatch {
        wanted: &'static str,
        got: &'static str,
    },

    /// Ordering or equality comparison between unrelated kinds
    Incomparable {
        lhs: &'static str,
        rhs: &'static str,
    },

    DivideByZero,

    /// Checked integer arithmetic overflowed
    ArithOverflow(&'static str),

    IndexOutOfRange {
        index: i32,
        len: usize,
    },

    /// Indexing applied to something that is not an array
    NotIndexable(&'static str),

    /// Array index that is not an integer
    BadIndexType(&'static str),

    UnknownOpcode(Word),

    /// The instruction stream ended in the middle of an operand
    TruncatedCode,

    StackUnderflow,

    /// `OP_RETURN` with no live call frame
    InvalidReturn,
}

impl std::fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RuntimeError::BadStringId(id) => write!(f, "invalid string constant: {}", id),
            RuntimeError::BadTypes { op, lhs, rhs } => {
                write!(f, "'{}' operator used on invalid types: {}, {}", op, lhs, rhs)
            }
            RuntimeError::TypeMismatch { wanted, got } => {
                write!(f, "tried to use {} as {}", got, wanted)
            }
            RuntimeError::Incomparable { lhs, rhs } => {
                write!(f, "comparison between unrelated types: {}, {}", lhs, rhs)
            }
            RuntimeError::DivideByZero => write!(f, "division by zero"),
            RuntimeError::ArithOverflow(op) => write!(f, "integer overflow in '{}'", op),
            RuntimeError::IndexOutOfRange { index, len } => {
                write!(f, "array access out of bounds: {} (length {})", index, len)
            }
            RuntimeError::NotIndexable(kind) => {
                write!(f, "indexer cannot be used on {}", kind)
            }
            RuntimeError::BadIndexType(kind) => {
                write!(f, "type {} cannot be used to index into arrays", kind)
            }
            RuntimeError::UnknownOpcode(word) => write!(f, "unknown instruction: {}", word),
            RuntimeError::TruncatedCode => write!(f, "instruction stream ended inside an operand"),
            RuntimeError::StackUnderflow => write!(f, "operand stack underflow"),
            RuntimeError::InvalidReturn => write!(f, "return outside of any call frame"),
        }
    }
}

impl std::error::Error for RuntimeError {}
