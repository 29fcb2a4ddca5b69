use std::fmt::{self, Display, Formatter, Write};

use thiserror::Error;

use crate::value::Value;

/// Capacity of a buffer on its first write.
const MIN_CAPACITY: usize = 8;

#[repr(u8)]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum OpCode {
    Constant = 1,
    Add = 2,
    Subtract = 3,
    Multiply = 4,
    Divide = 5,
    // Reserved. The compiler never emits it.
    Negate = 6,
    Return = 7,
}

impl OpCode {
    /// Number of operand bytes following the opcode.
    pub fn operand_count(self) -> usize {
        match self {
            Self::Constant => 1,
            _ => 0,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Self::Constant => "OP_CONSTANT",
            Self::Add => "OP_ADD",
            Self::Subtract => "OP_SUBTRACT",
            Self::Multiply => "OP_MULTIPLY",
            Self::Divide => "OP_DIVIDE",
            Self::Negate => "OP_NEGATE",
            Self::Return => "OP_RETURN",
        }
    }
}

impl Display for OpCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

impl From<OpCode> for u8 {
    fn from(code: OpCode) -> Self {
        code as u8
    }
}

#[derive(Debug, Error, Clone, Copy, Eq, PartialEq)]
#[error("Unknown opcode {0}")]
pub struct UnknownOpcode(pub u8);

impl TryFrom<u8> for OpCode {
    type Error = UnknownOpcode;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        match byte {
            1 => Ok(Self::Constant),
            2 => Ok(Self::Add),
            3 => Ok(Self::Subtract),
            4 => Ok(Self::Multiply),
            5 => Ok(Self::Divide),
            6 => Ok(Self::Negate),
            7 => Ok(Self::Return),
            _ => Err(UnknownOpcode(byte)),
        }
    }
}

/// Compiled bytecode together with its constant pool.
///
/// `code` holds opcodes and their operand bytes, `lines` holds the source
/// line of every byte in `code`, and `constants` holds the numbers that
/// `CONSTANT` operands index into.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    code: Vec<u8>,
    lines: Vec<usize>,
    constants: Vec<Value>,
}

impl Chunk {
    pub fn new() -> Self {
        Chunk {
            code: vec![],
            lines: vec![],
            constants: vec![],
        }
    }

    pub fn len(&self) -> usize {
        self.code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }

    pub fn code(&self) -> &[u8] {
        &self.code
    }

    pub fn lines(&self) -> &[usize] {
        &self.lines
    }

    pub fn constants(&self) -> &[Value] {
        &self.constants
    }

    pub fn code_capacity(&self) -> usize {
        self.code.capacity()
    }

    pub fn constants_capacity(&self) -> usize {
        self.constants.capacity()
    }

    pub fn write_byte(&mut self, byte: u8, line: usize) {
        grow_if_full(&mut self.code);
        grow_if_full(&mut self.lines);
        self.code.push(byte);
        self.lines.push(line);
    }

    pub fn write_code(&mut self, code: OpCode, line: usize) {
        self.write_byte(code.into(), line);
    }

    /// Pushes a value to the constant store, returning its index.
    /// Equal values are stored again rather than shared.
    pub fn add_constant(&mut self, value: Value) -> usize {
        grow_if_full(&mut self.constants);
        self.constants.push(value);
        self.constants.len() - 1
    }

    pub fn read_constant(&self, index: usize) -> Option<Value> {
        self.constants.get(index).copied()
    }

    pub fn disassemble<'a>(&'a self, name: &'a str) -> Disassembly<'a> {
        Disassembly { chunk: self, name }
    }

    pub fn instruction(&self, offset: usize) -> Instruction<'_> {
        Instruction {
            chunk: self,
            offset,
        }
    }

    /// Writes the instruction at `offset` and returns the offset of the next one.
    fn write_instruction(&self, f: &mut impl Write, offset: usize) -> Result<usize, fmt::Error> {
        write!(f, "{:04} ", offset)?;
        if offset > 0 && self.lines[offset] == self.lines[offset - 1] {
            write!(f, "   | ")?;
        } else {
            write!(f, "{:4} ", self.lines[offset])?;
        }

        let byte = self.code[offset];
        let instruction = match OpCode::try_from(byte) {
            Ok(instruction) => instruction,
            Err(error) => {
                writeln!(f, "{error}")?;
                return Ok(offset + 1);
            }
        };

        match instruction {
            OpCode::Constant => match self.code.get(offset + 1) {
                Some(&index) => {
                    match self.read_constant(index.into()) {
                        Some(value) => writeln!(f, "{instruction:<16} {index:4} '{value}'")?,
                        None => writeln!(f, "{instruction:<16} {index:4} <missing>")?,
                    }
                    Ok(offset + 2)
                }
                None => {
                    writeln!(f, "{instruction:<16} <truncated>")?;
                    Ok(offset + 1)
                }
            },
            _ => {
                writeln!(f, "{instruction}")?;
                Ok(offset + 1)
            }
        }
    }
}

impl Default for Chunk {
    fn default() -> Self {
        Self::new()
    }
}

/// Doubles the capacity of `buffer` once its length has caught up with it.
fn grow_if_full<T>(buffer: &mut Vec<T>) {
    let capacity = buffer.capacity();
    if buffer.len() < capacity {
        return;
    }

    let new_capacity = if capacity < MIN_CAPACITY {
        MIN_CAPACITY
    } else {
        capacity * 2
    };
    buffer.reserve_exact(new_capacity - buffer.len());
}

/// Human-readable listing of a whole chunk.
pub struct Disassembly<'a> {
    chunk: &'a Chunk,
    name: &'a str,
}

impl Display for Disassembly<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(f, "== {} ==", self.name)?;

        let mut offset = 0;
        while offset < self.chunk.len() {
            offset = self.chunk.write_instruction(f, offset)?;
        }
        Ok(())
    }
}

/// Human-readable form of the single instruction at an offset.
pub struct Instruction<'a> {
    chunk: &'a Chunk,
    offset: usize,
}

impl Display for Instruction<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if self.offset >= self.chunk.len() {
            return writeln!(f, "{:04} <end of code>", self.offset);
        }
        self.chunk.write_instruction(f, self.offset).map(|_| ())
    }
}
