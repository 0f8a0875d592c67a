use thiserror::Error;

use crate::bytecode::{read_u16, Instructions, Opcode, UndefinedOpcodeError};
use crate::compiler::Bytecode;
use crate::value::Value;

/// Operand stack capacity. A tunable, not part of the language contract.
pub const STACK_SIZE: usize = 2048;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error(transparent)]
    UndefinedOpcode(#[from] UndefinedOpcodeError),
    #[error("stack overflow")]
    StackOverflow,
    #[error("unsupported type for binop: {0}, {1}")]
    UnsupportedBinopTypes(&'static str, &'static str),
    #[error("unknown integer op: {0}")]
    UnknownIntegerOp(u8),
}

pub struct Vm {
    constants: Vec<Value>,
    instructions: Instructions,
    stack: Vec<Value>,
    /// Always points at the next free slot; the live stack is `stack[..sp]`.
    sp: usize,
}

impl Vm {
    pub fn new(bytecode: Bytecode) -> Self {
        Self {
            constants: bytecode.constants,
            instructions: bytecode.instructions,
            stack: vec![Value::Null; STACK_SIZE],
            sp: 0,
        }
    }

    pub fn stack_top(&self) -> Option<&Value> {
        if self.sp == 0 {
            None
        } else {
            Some(&self.stack[self.sp - 1])
        }
    }

    /// The value most recently popped. `pop` only moves the stack pointer,
    /// so the slot just above it still holds the final result after the
    /// trailing `OpPop` of an expression statement.
    pub fn last_popped_stack_element(&self) -> &Value {
        &self.stack[self.sp]
    }

    pub fn stack_contents(&self) -> &[Value] {
        &self.stack[..self.sp]
    }

    pub fn run(&mut self) -> Result<(), RuntimeError> {
        let mut ip = 0;

        while ip < self.instructions.len() {
            let op = Opcode::try_from(self.instructions.0[ip])?;

            #[cfg(feature = "trace")]
            {
                let contents: Vec<String> =
                    self.stack_contents().iter().map(|v| v.to_string()).collect();
                println!("{:04} {:?} [{}]", ip, op, contents.join(", "));
            }

            match op {
                Opcode::Constant => {
                    let index = read_u16(&self.instructions.0[ip + 1..]) as usize;
                    ip += 2;
                    self.push(self.constants[index].clone())?;
                }
                Opcode::Pop => {
                    self.pop();
                }
                Opcode::Add | Opcode::Sub | Opcode::Mul | Opcode::Div => {
                    self.execute_binary_op(op)?;
                }
                Opcode::True => self.push(Value::Boolean(true))?,
                Opcode::False => self.push(Value::Boolean(false))?,
                Opcode::Sentinel => unreachable!("sentinel never decodes from bytecode"),
            }

            ip += 1;
        }

        Ok(())
    }

    fn push(&mut self, value: Value) -> Result<(), RuntimeError> {
        if self.sp >= STACK_SIZE {
            return Err(RuntimeError::StackOverflow);
        }
        self.stack[self.sp] = value;
        self.sp += 1;
        Ok(())
    }

    fn pop(&mut self) -> Value {
        self.sp = self
            .sp
            .checked_sub(1)
            .expect("VM should not underflow the stack");
        self.stack[self.sp].clone()
    }

    fn execute_binary_op(&mut self, op: Opcode) -> Result<(), RuntimeError> {
        let right = self.pop();
        let left = self.pop();

        match (&left, &right) {
            (Value::Integer(left), Value::Integer(right)) => {
                self.execute_integer_op(op, *left, *right)
            }
            _ => Err(RuntimeError::UnsupportedBinopTypes(
                right.type_name(),
                left.type_name(),
            )),
        }
    }

    fn execute_integer_op(&mut self, op: Opcode, left: i64, right: i64) -> Result<(), RuntimeError> {
        let result = match op {
            Opcode::Add => left + right,
            Opcode::Sub => left - right,
            Opcode::Mul => left * right,
            Opcode::Div => left / right,
            other => return Err(RuntimeError::UnknownIntegerOp(other as u8)),
        };
        self.push(Value::Integer(result))
    }
}
