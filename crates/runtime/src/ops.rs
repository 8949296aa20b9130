//! Operator dispatch and numeric promotion
//!
//! The promotion policy for the four arithmetic operators: two ints give
//! an int; any float operand widens the other side and gives a float.
//! `+` with a string on either side concatenates the textual renderings of
//! both operands and interns the result. `%` is integer-only. Integer
//! arithmetic is checked, so overflow is an error rather than a wrap.

use ant_core::{Opcode, StringTable, Value};

use crate::error::RuntimeError;

/// Render a value as text for concatenation. Unlike the display helper on
/// [`Value`], an out-of-range string id is a hard error here.
pub fn to_text(value: &Value, strings: &StringTable) -> Result<String, RuntimeError> {
    match value {
        Value::Str(id) => strings
            .lookup(*id)
            .map(str::to_string)
            .ok_or(RuntimeError::BadStringId(*id as ant_core::Word)),
        other => Ok(other.render(strings)),
    }
}

fn symbol(op: Opcode) -> &'static str {
    match op {
        Opcode::Add => "+",
        Opcode::Sub => "-",
        Opcode::Mul => "*",
        Opcode::Div => "/",
        Opcode::Mod => "%",
        Opcode::And => "and",
        Opcode::Or => "or",
        _ => "?",
    }
}

/// ADD / SUB / MUL / DIV / MOD over two popped operands.
pub fn arith(
    op: Opcode,
    a: Value,
    b: Value,
    strings: &mut StringTable,
) -> Result<Value, RuntimeError> {
    // String concatenation wins over numeric addition when either side is
    // a string.
    if op == Opcode::Add && (a.is_str() || b.is_str()) {
        let mut text = to_text(&a, strings)?;
        text.push_str(&to_text(&b, strings)?);
        return Ok(Value::Str(strings.intern(&text)));
    }

    if op == Opcode::Mod {
        return match (&a, &b) {
            (Value::Int(x), Value::Int(y)) => {
                if *y == 0 {
                    Err(RuntimeError::DivideByZero)
                } else {
                    x.checked_rem(*y)
                        .map(Value::Int)
                        .ok_or(RuntimeError::ArithOverflow("%"))
                }
            }
            _ => Err(RuntimeError::BadTypes {
                op: "%",
                lhs: a.kind_name(),
                rhs: b.kind_name(),
            }),
        };
    }

    match (&a, &b) {
        (Value::Int(x), Value::Int(y)) => int_arith(op, *x, *y),
        (Value::Int(x), Value::Float(y)) => Ok(Value::Float(float_arith(op, *x as f32, *y))),
        (Value::Float(x), Value::Int(y)) => Ok(Value::Float(float_arith(op, *x, *y as f32))),
        (Value::Float(x), Value::Float(y)) => Ok(Value::Float(float_arith(op, *x, *y))),
        _ => Err(RuntimeError::BadTypes {
            op: symbol(op),
            lhs: a.kind_name(),
            rhs: b.kind_name(),
        }),
    }
}

fn int_arith(op: Opcode, x: i32, y: i32) -> Result<Value, RuntimeError> {
    let result = match op {
        Opcode::Add => x.checked_add(y),
        Opcode::Sub => x.checked_sub(y),
        Opcode::Mul => x.checked_mul(y),
        Opcode::Div => {
            if y == 0 {
                return Err(RuntimeError::DivideByZero);
            }
            x.checked_div(y)
        }
        _ => unreachable!("int_arith called with non-arithmetic opcode"),
    };
    result
        .map(Value::Int)
        .ok_or(RuntimeError::ArithOverflow(symbol(op)))
}

fn float_arith(op: Opcode, x: f32, y: f32) -> f32 {
    match op {
        Opcode::Add => x + y,
        Opcode::Sub => x - y,
        Opcode::Mul => x * y,
        Opcode::Div => x / y,
        _ => unreachable!("float_arith called with non-arithmetic opcode"),
    }
}

/// LESS / GREATER / LEQUAL / GEQUAL. Numeric operands only, with the same
/// int-to-float widening as arithmetic.
pub fn compare(op: Opcode, a: Value, b: Value) -> Result<Value, RuntimeError> {
    let ordering = match (&a, &b) {
        (Value::Int(x), Value::Int(y)) => x.partial_cmp(y),
        (Value::Int(x), Value::Float(y)) => (*x as f32).partial_cmp(y),
        (Value::Float(x), Value::Int(y)) => x.partial_cmp(&(*y as f32)),
        (Value::Float(x), Value::Float(y)) => x.partial_cmp(y),
        _ => {
            return Err(RuntimeError::Incomparable {
                lhs: a.kind_name(),
                rhs: b.kind_name(),
            });
        }
    };
    // NaN comparisons are simply false, matching IEEE semantics.
    let holds = match ordering {
        Some(ord) => match op {
            Opcode::Less => ord.is_lt(),
            Opcode::Greater => ord.is_gt(),
            Opcode::Lequal => ord.is_le(),
            Opcode::Gequal => ord.is_ge(),
            _ => unreachable!("compare called with non-relational opcode"),
        },
        None => false,
    };
    Ok(Value::Int(holds as i32))
}

/// EQUAL / NEQUAL. Numbers compare with promotion; strings compare by
/// interned id (equal iff their text is identical); anything else is an
/// error.
pub fn equality(op: Opcode, a: Value, b: Value) -> Result<Value, RuntimeError> {
    let equal = match (&a, &b) {
        (Value::Int(x), Value::Int(y)) => x == y,
        (Value::Int(x), Value::Float(y)) => *x as f32 == *y,
        (Value::Float(x), Value::Int(y)) => *x == *y as f32,
        (Value::Float(x), Value::Float(y)) => x == y,
        (Value::Str(x), Value::Str(y)) => x == y,
        _ => {
            return Err(RuntimeError::Incomparable {
                lhs: a.kind_name(),
                rhs: b.kind_name(),
            });
        }
    };
    let holds = match op {
        Opcode::Equal => equal,
        Opcode::Nequal => !equal,
        _ => unreachable!("equality called with non-equality opcode"),
    };
    Ok(Value::Int(holds as i32))
}

/// AND / OR over integer truth values (0 is false, anything else true).
pub fn logical(op: Opcode, a: Value, b: Value) -> Result<Value, RuntimeError> {
    match (&a, &b) {
        (Value::Int(x), Value::Int(y)) => {
            let holds = match op {
                Opcode::And => *x != 0 && *y != 0,
                Opcode::Or => *x != 0 || *y != 0,
                _ => unreachable!("logical called with non-logical opcode"),
            };
            Ok(Value::Int(holds as i32))
        }
        _ => Err(RuntimeError::BadTypes {
            op: symbol(op),
            lhs: a.kind_name(),
            rhs: b.kind_name(),
        }),
    }
}
