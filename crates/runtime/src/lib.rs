//! AntEater virtual machine
//!
//! A stack machine over the flat instruction vector produced by the
//! compiler. One operand stack of [`Value`]s, a frame pointer, an
//! instruction pointer, and a side stack of per-call parameter counts;
//! everything a call frame needs lives on the operand stack itself.
//!
//! [`Value`]: ant_core::Value

pub mod error;
pub mod machine;
pub mod ops;

pub use error::RuntimeError;
pub use machine::{RunResult, run};
