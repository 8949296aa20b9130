//! The interpreter loop
//!
//! Call frames live on the operand stack. `OP_CALL` pushes the return
//! offset and the caller's frame pointer as plain `Int` values, points
//! `fp` at the saved frame pointer, and reserves the callee's local slots
//! above it. Slot addressing is `stack[fp + slot]`: arguments sit at
//! -2, -3, ... (argument 1 closest to the frame), locals at 1, 2, ..., and
//! slots 0 and -1 hold the saved frame pointer and return offset.

use ant_core::{Opcode, StringTable, Value, Word, opcode};
use tracing::trace;

use crate::error::RuntimeError;
use crate::ops;

/// What a run produced: the captured output log, and the error that
/// stopped execution if one did. A runtime error is also appended to the
/// log as `Script runtime error: <message>`.
#[derive(Debug)]
pub struct RunResult {
    pub output: String,
    pub error: Option<RuntimeError>,
}

/// Execute a finalised instruction vector from offset zero.
pub fn run(code: &[Word], strings: &mut StringTable) -> RunResult {
    let mut machine = Machine::new(code, strings);
    let error = match machine.execute() {
        Ok(()) => None,
        Err(err) => {
            machine.output.push_str("Script runtime error: ");
            machine.output.push_str(&err.to_string());
            machine.output.push('\n');
            Some(err)
        }
    };
    RunResult {
        output: machine.output,
        error,
    }
}

struct Machine<'a> {
    code: &'a [Word],
    strings: &'a mut StringTable,
    stack: Vec<Value>,
    fp: usize,
    ip: usize,
    param_counts: Vec<usize>,
    output: String,
}

impl<'a> Machine<'a> {
    fn new(code: &'a [Word], strings: &'a mut StringTable) -> Self {
        Machine {
            code,
            strings,
            stack: Vec::new(),
            fp: 0,
            ip: 0,
            param_counts: Vec::new(),
            output: String::new(),
        }
    }

    fn execute(&mut self) -> Result<(), RuntimeError> {
        while self.ip < self.code.len() {
            let word = self.code[self.ip];
            if word == Opcode::Done as Word {
                break;
            }
            let op = Opcode::from_word(word).ok_or(RuntimeError::UnknownOpcode(word))?;
            trace!("{:4}: {:<12} stack={}", self.ip, op.mnemonic(), self.stack.len());
            self.ip += 1;
            self.step(op)?;
        }
        Ok(())
    }

    fn step(&mut self, op: Opcode) -> Result<(), RuntimeError> {
        match op {
            Opcode::Call => {
                let target = self.fetch()?;
                let nparams = self.fetch()?.max(0) as usize;
                let nlocals = self.fetch()?.max(0) as usize;
                self.param_counts.push(nparams);
                self.stack.push(Value::Int(self.ip as i32));
                self.stack.push(Value::Int(self.fp as i32));
                self.fp = self.stack.len() - 1;
                self.stack
                    .resize(self.stack.len() + nlocals, Value::Invalid);
                self.ip = usize::try_from(target).unwrap_or(usize::MAX);
            }

            Opcode::Return => {
                if self.param_counts.is_empty() || self.stack.len() <= self.fp {
                    return Err(RuntimeError::InvalidReturn);
                }
                let ret = self.pop()?;
                self.stack.truncate(self.fp + 1);
                self.fp = self.pop_frame_slot()?;
                self.ip = self.pop_frame_slot()?;
                let nparams = self.param_counts.pop().unwrap_or(0);
                if self.stack.len() < nparams {
                    return Err(RuntimeError::StackUnderflow);
                }
                self.stack.truncate(self.stack.len() - nparams);
                self.stack.push(ret);
            }

            Opcode::PushInt => {
                let value = self.fetch()?;
                self.stack.push(Value::Int(value));
            }

            Opcode::PushFloat => {
                let bits = self.fetch()?;
                self.stack.push(Value::Float(opcode::word_to_float(bits)));
            }

            Opcode::PushString => {
                let id = self.fetch()?;
                if id < 0 || self.strings.lookup(id as u32).is_none() {
                    return Err(RuntimeError::BadStringId(id));
                }
                self.stack.push(Value::Str(id as u32));
            }

            Opcode::PushVar => {
                let slot = self.fetch()?;
                let index = self.slot_index(slot)?;
                self.stack.push(self.stack[index].clone());
            }

            Opcode::Assign => {
                let slot = self.fetch()?;
                let value = self.pop()?;
                let index = self.slot_index(slot)?;
                self.stack[index] = value;
            }

            Opcode::PushArray => {
                let count = self.fetch()?.max(0) as usize;
                if self.stack.len() < count {
                    return Err(RuntimeError::StackUnderflow);
                }
                let mut elems = self.stack.split_off(self.stack.len() - count);
                // Elements were pushed in reverse, so the topmost entry is
                // element 0.
                elems.reverse();
                self.stack.push(Value::Array(elems));
            }

            Opcode::Get => {
                let index = self.pop()?;
                let container = self.pop()?;
                let idx = Self::array_index(&index)?;
                let mut elems = match container {
                    Value::Array(elems) => elems,
                    other => return Err(RuntimeError::NotIndexable(other.kind_name())),
                };
                if idx < 0 || idx as usize >= elems.len() {
                    return Err(RuntimeError::IndexOutOfRange {
                        index: idx,
                        len: elems.len(),
                    });
                }
                self.stack.push(elems.swap_remove(idx as usize));
            }

            Opcode::Set => {
                let value = self.pop()?;
                let index = self.pop()?;
                let idx = Self::array_index(&index)?;
                let top = self.stack.last_mut().ok_or(RuntimeError::StackUnderflow)?;
                match top {
                    Value::Array(elems) => {
                        if idx < 0 || idx as usize >= elems.len() {
                            return Err(RuntimeError::IndexOutOfRange {
                                index: idx,
                                len: elems.len(),
                            });
                        }
                        elems[idx as usize] = value;
                        // The updated array stays on the stack; the code
                        // generator stores it back with a trailing ASSIGN.
                    }
                    other => return Err(RuntimeError::NotIndexable(other.kind_name())),
                }
            }

            Opcode::Add | Opcode::Sub | Opcode::Mul | Opcode::Div | Opcode::Mod => {
                let b = self.pop()?;
                let a = self.pop()?;
                let result = ops::arith(op, a, b, self.strings)?;
                self.stack.push(result);
            }

            Opcode::Less | Opcode::Greater | Opcode::Lequal | Opcode::Gequal => {
                let b = self.pop()?;
                let a = self.pop()?;
                self.stack.push(ops::compare(op, a, b)?);
            }

            Opcode::Equal | Opcode::Nequal => {
                let b = self.pop()?;
                let a = self.pop()?;
                self.stack.push(ops::equality(op, a, b)?);
            }

            Opcode::And | Opcode::Or => {
                let b = self.pop()?;
                let a = self.pop()?;
                self.stack.push(ops::logical(op, a, b)?);
            }

            Opcode::Not => {
                let v = self.pop()?;
                let i = Self::as_int(&v)?;
                self.stack.push(Value::Int((i == 0) as i32));
            }

            Opcode::Bra => {
                let offset = self.fetch()?;
                self.jump(offset);
            }

            Opcode::Brz => {
                let offset = self.fetch()?;
                let v = self.pop()?;
                if Self::as_int(&v)? == 0 {
                    self.jump(offset);
                }
            }

            Opcode::Bnz => {
                let offset = self.fetch()?;
                let v = self.pop()?;
                if Self::as_int(&v)? != 0 {
                    self.jump(offset);
                }
            }

            Opcode::Print => {
                let v = self.pop()?;
                self.output.push_str(&ops::to_text(&v, self.strings)?);
                self.output.push('\n');
            }

            Opcode::Count => {
                let v = self.pop()?;
                let count = match &v {
                    Value::Array(elems) => elems.len(),
                    Value::Str(id) => self
                        .strings
                        .lookup(*id)
                        .ok_or(RuntimeError::BadStringId(*id as Word))?
                        .len(),
                    other => {
                        return Err(RuntimeError::TypeMismatch {
                            wanted: "array or string",
                            got: other.kind_name(),
                        });
                    }
                };
                self.stack.push(Value::Int(count as i32));
            }

            // Reserved: decoded but never emitted.
            Opcode::Beq | Opcode::Bne => {
                return Err(RuntimeError::UnknownOpcode(op as Word));
            }

            // Handled by the execute loop before dispatch.
            Opcode::Done => unreachable!("DONE dispatched"),
        }
        Ok(())
    }

    fn fetch(&mut self) -> Result<Word, RuntimeError> {
        let word = self
            .code
            .get(self.ip)
            .copied()
            .ok_or(RuntimeError::TruncatedCode)?;
        self.ip += 1;
        Ok(word)
    }

    fn pop(&mut self) -> Result<Value, RuntimeError> {
        self.stack.pop().ok_or(RuntimeError::StackUnderflow)
    }

    /// Pop a saved ip/fp slot written by `OP_CALL`. Anything but an `Int`
    /// means the frame was smashed.
    fn pop_frame_slot(&mut self) -> Result<usize, RuntimeError> {
        match self.pop()? {
            Value::Int(i) if i >= 0 => Ok(i as usize),
            _ => Err(RuntimeError::InvalidReturn),
        }
    }

    fn slot_index(&self, slot: Word) -> Result<usize, RuntimeError> {
        let index = self.fp as i64 + slot as i64;
        if index < 0 || index as usize >= self.stack.len() {
            return Err(RuntimeError::StackUnderflow);
        }
        Ok(index as usize)
    }

    /// Relative jump: the offset is measured from the word after itself,
    /// so an offset of 0 is a no-op. A jump outside the vector simply
    /// halts via the loop bound.
    fn jump(&mut self, offset: Word) {
        self.ip = usize::try_from(self.ip as i64 + offset as i64).unwrap_or(usize::MAX);
    }

    fn as_int(v: &Value) -> Result<i32, RuntimeError> {
        match v {
            Value::Int(i) => Ok(*i),
            other => Err(RuntimeError::TypeMismatch {
                wanted: "int",
                got: other.kind_name(),
            }),
        }
    }

    fn array_index(v: &Value) -> Result<i32, RuntimeError> {
        match v {
            Value::Int(i) => Ok(*i),
            other => Err(RuntimeError::BadIndexType(other.kind_name())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CALL: Word = Opcode::Call as Word;
    const RETURN: Word = Opcode::Return as Word;
    const PUSH_INT: Word = Opcode::PushInt as Word;
    const PUSH_FLOAT: Word = Opcode::PushFloat as Word;
    const PUSH_STRING: Word = Opcode::PushString as Word;
    const PUSH_VAR: Word = Opcode::PushVar as Word;
    const PUSH_ARRAY: Word = Opcode::PushArray as Word;
    const ASSIGN: Word = Opcode::Assign as Word;
    const ADD: Word = Opcode::Add as Word;
    const DIV: Word = Opcode::Div as Word;
    const GET: Word = Opcode::Get as Word;
    const SET: Word = Opcode::Set as Word;
    const BRA: Word = Opcode::Bra as Word;
    const BRZ: Word = Opcode::Brz as Word;
    const PRINT: Word = Opcode::Print as Word;
    const COUNT: Word = Opcode::Count as Word;
    const DONE: Word = Opcode::Done as Word;

    fn exec(code: &[Word]) -> RunResult {
        let mut strings = StringTable::new();
        run(code, &mut strings)
    }

    #[test]
    fn test_push_and_print() {
        let result = exec(&[PUSH_INT, 7, PRINT, DONE]);
        assert_eq!(result.output, "7\n");
        assert!(result.error.is_none());
    }

    #[test]
    fn test_halts_when_ip_runs_off_the_end() {
        let result = exec(&[PUSH_INT, 1]);
        assert!(result.error.is_none());
    }

    #[test]
    fn test_locals_via_frame() {
        // A one-frame program with one local: x = 5; print(x);
        let result = exec(&[
            CALL, 4, 0, 1, // prologue, one global local
            PUSH_INT, 5, ASSIGN, 1, PUSH_VAR, 1, PRINT, DONE,
        ]);
        assert_eq!(result.output, "5\n");
        assert!(result.error.is_none());
    }

    #[test]
    fn test_call_and_return() {
        // function f(a) { return a + 1; }  print(f(41));
        let result = exec(&[
            CALL, 4, 0, 0, // prologue
            BRA, 6, // skip function body
            PUSH_VAR, -2, PUSH_INT, 1, ADD, RETURN, // f, begin = 6
            PUSH_INT, 41, CALL, 6, 1, 0, PRINT, DONE,
        ]);
        assert_eq!(result.output, "42\n");
        assert!(result.error.is_none());
    }

    #[test]
    fn test_divide_by_zero_reported_in_log() {
        let result = exec(&[PUSH_INT, 1, PUSH_INT, 0, DIV, DONE]);
        assert_eq!(result.error, Some(RuntimeError::DivideByZero));
        assert!(result.output.contains("Script runtime error: division by zero"));
    }

    #[test]
    fn test_error_keeps_prior_output() {
        let result = exec(&[PUSH_INT, 1, PRINT, PUSH_INT, 1, PUSH_INT, 0, DIV, DONE]);
        assert!(result.output.starts_with("1\n"));
        assert!(result.output.contains("Script runtime error:"));
    }

    #[test]
    fn test_array_literal_and_get() {
        // [10, 20, 30][1], elements pushed in reverse
        let result = exec(&[
            PUSH_INT, 30, PUSH_INT, 20, PUSH_INT, 10, PUSH_ARRAY, 3, PUSH_INT, 1, GET, PRINT,
            DONE,
        ]);
        assert_eq!(result.output, "20\n");
    }

    #[test]
    fn test_set_updates_array_in_place() {
        let result = exec(&[
            PUSH_INT, 30, PUSH_INT, 20, PUSH_INT, 10, PUSH_ARRAY, 3, // [10,20,30]
            PUSH_INT, 1, PUSH_INT, 99, SET, // a[1] = 99, updated array stays on top
            PUSH_INT, 1, GET, PRINT, DONE,
        ]);
        assert_eq!(result.output, "99\n");
    }

    #[test]
    fn test_get_out_of_bounds() {
        let result = exec(&[PUSH_INT, 10, PUSH_ARRAY, 1, PUSH_INT, 3, GET, DONE]);
        assert_eq!(
            result.error,
            Some(RuntimeError::IndexOutOfRange { index: 3, len: 1 })
        );
    }

    #[test]
    fn test_get_on_non_array() {
        let result = exec(&[PUSH_INT, 10, PUSH_INT, 0, GET, DONE]);
        assert_eq!(result.error, Some(RuntimeError::NotIndexable("int")));
    }

    #[test]
    fn test_non_int_index() {
        let result = exec(&[
            PUSH_INT, 10, PUSH_ARRAY, 1, PUSH_FLOAT, 0.5f32.to_bits() as Word, GET, DONE,
        ]);
        assert_eq!(result.error, Some(RuntimeError::BadIndexType("float")));
    }

    #[test]
    fn test_count_of_array() {
        let result = exec(&[
            PUSH_INT, 3, PUSH_INT, 2, PUSH_INT, 1, PUSH_ARRAY, 3, COUNT, PRINT, DONE,
        ]);
        assert_eq!(result.output, "3\n");
    }

    #[test]
    fn test_count_of_int_fails() {
        let result = exec(&[PUSH_INT, 3, COUNT, DONE]);
        assert!(matches!(
            result.error,
            Some(RuntimeError::TypeMismatch { got: "int", .. })
        ));
    }

    #[test]
    fn test_branch_condition_must_be_int() {
        let result = exec(&[PUSH_FLOAT, 0, BRZ, 0, DONE]);
        assert!(matches!(
            result.error,
            Some(RuntimeError::TypeMismatch { wanted: "int", .. })
        ));
    }

    #[test]
    fn test_brz_skips_when_zero() {
        // if (0) print(1); print(2);
        let result = exec(&[PUSH_INT, 0, BRZ, 3, PUSH_INT, 1, PRINT, PUSH_INT, 2, PRINT, DONE]);
        assert_eq!(result.output, "2\n");
    }

    #[test]
    fn test_bra_zero_offset_is_noop() {
        let result = exec(&[BRA, 0, PUSH_INT, 9, PRINT, DONE]);
        assert_eq!(result.output, "9\n");
    }

    #[test]
    fn test_unknown_opcode() {
        let result = exec(&[99]);
        assert_eq!(result.error, Some(RuntimeError::UnknownOpcode(99)));
    }

    #[test]
    fn test_reserved_opcodes_fail() {
        let result = exec(&[Opcode::Beq as Word, 0, DONE]);
        assert_eq!(
            result.error,
            Some(RuntimeError::UnknownOpcode(Opcode::Beq as Word))
        );
    }

    #[test]
    fn test_stack_underflow() {
        let result = exec(&[ADD, DONE]);
        assert_eq!(result.error, Some(RuntimeError::StackUnderflow));
    }

    #[test]
    fn test_return_without_frame() {
        let result = exec(&[PUSH_INT, 0, RETURN, DONE]);
        assert_eq!(result.error, Some(RuntimeError::InvalidReturn));
    }

    #[test]
    fn test_truncated_operand() {
        let result = exec(&[PUSH_INT]);
        assert_eq!(result.error, Some(RuntimeError::TruncatedCode));
    }

    #[test]
    fn test_push_string_validates_id() {
        let result = exec(&[PUSH_STRING, 5, PRINT, DONE]);
        assert_eq!(result.error, Some(RuntimeError::BadStringId(5)));
    }

    #[test]
    fn test_stack_settles_after_halt() {
        let mut strings = StringTable::new();
        let code = [CALL, 4, 0, 1, PUSH_INT, 5, ASSIGN, 1, DONE];
        let mut machine = Machine::new(&code, &mut strings);
        machine.execute().unwrap();
        // exactly the outer frame remains: saved ip, saved fp, one local
        assert_eq!(machine.stack.len(), 3);
        assert_eq!(machine.stack[2], Value::Int(5));
    }

    #[test]
    fn test_frame_is_discarded_on_return() {
        let mut strings = StringTable::new();
        // call a function that pushes junk above its return value
        let code = [
            CALL, 4, 0, 0, // prologue
            BRA, 5, // skip body
            PUSH_INT, 1, PUSH_INT, 2, RETURN, // begin = 6, leaves 1 below the return value
            PUSH_INT, 7, CALL, 6, 1, 0, DONE,
        ];
        let mut machine = Machine::new(&code, &mut strings);
        machine.execute().unwrap();
        // outer frame (ip, fp) plus exactly one return value; the junk and
        // the argument are gone
        assert_eq!(machine.stack.len(), 3);
        assert_eq!(machine.stack[2], Value::Int(2));
    }

    #[test]
    fn test_string_concat_interns_result() {
        let mut strings = StringTable::new();
        let id = strings.intern("n=") as Word;
        let result = run(&[PUSH_STRING, id, PUSH_INT, 42, ADD, PRINT, DONE], &mut strings);
        assert_eq!(result.output, "n=42\n");
        assert!(strings.lookup(strings.len() as u32 - 1) == Some("n=42"));
    }
}
