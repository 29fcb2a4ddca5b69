use std::io::{self, Stdout, Write};
use std::ops::{Add, Div, Mul, Sub};

use log::debug;
use thiserror::Error;

use crate::{
    chunk::{Chunk, OpCode, UnknownOpcode},
    compiler::{compile_with, CompileError},
    config::DebugConfig,
    value::Value,
};

/// Capacity of the operand stack.
pub const STACK_MAX: usize = 256;

pub type Result<T> = std::result::Result<T, InterpretError>;

macro_rules! binary_op {
    ($op:expr, $vm:expr) => {{
        let b = $vm.pop()?;
        let a = $vm.pop()?;
        $vm.push($op(a, b))?;
    }};
}

/// Stack machine running one chunk at a time. The result of each run is
/// written as a line to `output`.
pub struct VM<W: Write = Stdout> {
    stack: [Value; STACK_MAX],
    stack_top: usize,
    ip: usize,
    config: DebugConfig,
    output: W,
}

impl VM {
    pub fn new() -> Self {
        Self::with_output(io::stdout())
    }
}

impl Default for VM {
    fn default() -> Self {
        Self::new()
    }
}

impl<W: Write> VM<W> {
    pub fn with_output(output: W) -> Self {
        Self {
            stack: [Value::default(); STACK_MAX],
            stack_top: 0,
            ip: 0,
            config: DebugConfig::environment(),
            output,
        }
    }

    pub fn with_config(mut self, config: DebugConfig) -> Self {
        self.config = config;
        self
    }

    pub fn output(&self) -> &W {
        &self.output
    }

    pub fn into_output(self) -> W {
        self.output
    }

    pub fn stack(&self) -> &[Value] {
        &self.stack[..self.stack_top]
    }

    pub fn initialize(&mut self) {
        self.ip = 0;
        self.stack_top = 0;
        self.stack.fill(Value::default());
    }

    /// Compiles `source` and runs the result.
    pub fn interpret(&mut self, source: &str) -> Result<Value> {
        let chunk = compile_with(source, &self.config)?;
        self.run(&chunk)
    }

    /// Executes `chunk` from its first byte until `RETURN`, writes the
    /// returned value and hands it back.
    pub fn run(&mut self, chunk: &Chunk) -> Result<Value> {
        self.initialize();
        debug!("running {} bytes", chunk.len());

        loop {
            if self.config.trace_execution {
                self.trace(chunk);
            }

            let offset = self.ip;
            let byte = self.read_byte(chunk)?;
            let instruction = OpCode::try_from(byte)
                .map_err(|UnknownOpcode(byte)| RuntimeError::UnknownOpcode { byte, offset })?;

            match instruction {
                OpCode::Constant => {
                    let index = self.read_byte(chunk)?;
                    let constant = chunk
                        .read_constant(index.into())
                        .ok_or(RuntimeError::InvalidConstant { index, offset })?;
                    self.push(constant)?;
                }
                OpCode::Add => binary_op!(Add::add, self),
                OpCode::Subtract => binary_op!(Sub::sub, self),
                OpCode::Multiply => binary_op!(Mul::mul, self),
                OpCode::Divide => binary_op!(Div::div, self),
                OpCode::Negate => {
                    return Err(RuntimeError::UnsupportedOpcode {
                        opcode: instruction,
                        offset,
                    }
                    .into());
                }
                OpCode::Return => {
                    let value = self.pop()?;
                    writeln!(self.output, "{value}")?;
                    debug!("returned {value}");
                    return Ok(value);
                }
            }
        }
    }

    fn read_byte(&mut self, chunk: &Chunk) -> std::result::Result<u8, RuntimeError> {
        let byte = chunk
            .code()
            .get(self.ip)
            .copied()
            .ok_or(RuntimeError::UnexpectedEnd { offset: self.ip })?;
        self.ip += 1;
        Ok(byte)
    }

    fn push(&mut self, value: Value) -> std::result::Result<(), RuntimeError> {
        if self.stack_top == STACK_MAX {
            return Err(RuntimeError::StackOverflow);
        }

        self.stack[self.stack_top] = value;
        self.stack_top += 1;
        Ok(())
    }

    fn pop(&mut self) -> std::result::Result<Value, RuntimeError> {
        if self.stack_top == 0 {
            return Err(RuntimeError::StackUnderflow);
        }

        self.stack_top -= 1;
        Ok(self.stack[self.stack_top])
    }

    fn trace(&self, chunk: &Chunk) {
        let slots: String = self
            .stack()
            .iter()
            .map(|value| format!("[ {value} ]"))
            .collect();
        eprintln!("          {slots}");
        eprint!("{}", chunk.instruction(self.ip));
    }
}

#[derive(Debug, Error)]
pub enum InterpretError {
    #[error(transparent)]
    Compile(#[from] CompileError),

    #[error(transparent)]
    Runtime(#[from] RuntimeError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

#[derive(Debug, Error, Clone, Copy, Eq, PartialEq)]
pub enum RuntimeError {
    #[error("Stack overflow: more than {} values.", STACK_MAX)]
    StackOverflow,

    #[error("Stack underflow.")]
    StackUnderflow,

    #[error("Unknown opcode {byte} at offset {offset}.")]
    UnknownOpcode { byte: u8, offset: usize },

    #[error("Unsupported instruction {opcode} at offset {offset}.")]
    UnsupportedOpcode { opcode: OpCode, offset: usize },

    #[error("Constant {index} at offset {offset} is outside the constant pool.")]
    InvalidConstant { index: u8, offset: usize },

    #[error("Reached the end of the code at offset {offset} without returning.")]
    UnexpectedEnd { offset: usize },
}
