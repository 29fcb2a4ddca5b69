use std::ops::Add;

use fnv::FnvHashMap;
use lazy_static::lazy_static;
use log::debug;
use thiserror::Error;
use ustr::Ustr;

use crate::chunk::{Chunk, OpCode};
use crate::config::DebugConfig;
use crate::scanner::{Scanner, ScannerError, Token, TokenType};
use crate::value::Value;

pub type Result<T> = std::result::Result<T, CompileError>;

/// Highest constant index a one-byte `CONSTANT` operand can address.
const MAX_CONSTANT_INDEX: usize = u8::MAX as usize;

/// Deepest parenthesized group the parser will descend into.
const MAX_NESTING: usize = 256;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum CompileError {
    #[error(transparent)]
    Scan(#[from] ScannerError),

    #[error("[line {}] Error{}: {}", .line, location(.at), .kind)]
    Syntax {
        line: usize,
        /// Lexeme of the offending token, `None` at the end of input.
        at: Option<Ustr>,
        kind: SyntaxErrorKind,
    },
}

fn location(at: &Option<Ustr>) -> String {
    match at {
        Some(lexeme) => format!(" at '{lexeme}'"),
        None => " at end".to_string(),
    }
}

#[derive(Debug, Error, Clone, Copy, Eq, PartialEq)]
pub enum SyntaxErrorKind {
    #[error("Expect expression.")]
    ExpectExpression,

    #[error("Expect ')' after expression.")]
    ExpectRightParen,

    #[error("Expect end of expression.")]
    ExpectEnd,

    #[error("Too many constants in one chunk.")]
    TooManyConstants,

    #[error("Invalid number literal.")]
    InvalidNumber,

    #[error("Too much nesting.")]
    TooMuchNesting,
}

#[repr(u8)]
#[derive(Debug, Copy, Clone, PartialOrd, PartialEq)]
enum Precedence {
    None,
    Assignment, // =
    Or,         // or
    And,        // and
    Equality,   // == !=
    Comparison, // < > <= >=
    Term,       // + -
    Factor,     // * /
    Unary,      // ! -
    Call,       // . ()
    Primary,
}

const LEVELS: [Precedence; 11] = [
    Precedence::None,
    Precedence::Assignment,
    Precedence::Or,
    Precedence::And,
    Precedence::Equality,
    Precedence::Comparison,
    Precedence::Term,
    Precedence::Factor,
    Precedence::Unary,
    Precedence::Call,
    Precedence::Primary,
];

impl Add<u8> for Precedence {
    type Output = Self;

    /// Steps up `rhs` levels, saturating at `Primary`.
    fn add(self, rhs: u8) -> Self::Output {
        let sum = self as usize + rhs as usize;
        LEVELS.get(sum).copied().unwrap_or(Precedence::Primary)
    }
}

type ParseFn = fn(&mut Parser<'_>) -> Result<()>;

#[derive(Clone, Copy)]
struct ParseRule {
    prefix: Option<ParseFn>,
    infix: Option<ParseFn>,
    precedence: Precedence,
}

impl ParseRule {
    fn prefix(prefix: ParseFn) -> Self {
        Self {
            prefix: Some(prefix),
            infix: None,
            precedence: Precedence::None,
        }
    }

    fn infix(infix: ParseFn, precedence: Precedence) -> Self {
        Self {
            prefix: None,
            infix: Some(infix),
            precedence,
        }
    }
}

static NO_RULE: ParseRule = ParseRule {
    prefix: None,
    infix: None,
    precedence: Precedence::None,
};

lazy_static! {
    static ref RULES: FnvHashMap<TokenType, ParseRule> = {
        let mut rules = FnvHashMap::default();

        rules.insert(TokenType::LeftParen, ParseRule::prefix(grouping));
        rules.insert(TokenType::Number, ParseRule::prefix(number));

        rules.insert(TokenType::Minus, ParseRule::infix(binary, Precedence::Term));
        rules.insert(TokenType::Plus, ParseRule::infix(binary, Precedence::Term));
        rules.insert(TokenType::Slash, ParseRule::infix(binary, Precedence::Factor));
        rules.insert(TokenType::Star, ParseRule::infix(binary, Precedence::Factor));

        rules
    };
}

fn get_rule(token_type: TokenType) -> &'static ParseRule {
    RULES.get(&token_type).unwrap_or(&NO_RULE)
}

/// Compiles `source` into a fresh chunk using the environment's debug switches.
pub fn compile(source: &str) -> Result<Chunk> {
    compile_with(source, &DebugConfig::environment())
}

/// Compiles a single expression into a fresh chunk ending in `RETURN`.
/// Nothing of the chunk survives a failed compile.
pub fn compile_with(source: &str, config: &DebugConfig) -> Result<Chunk> {
    let chunk = Parser::new(source).compile()?;

    debug!(
        "compiled {} bytes and {} constants",
        chunk.len(),
        chunk.constants().len()
    );
    if config.print_code {
        eprint!("{}", chunk.disassemble("code"));
    }

    Ok(chunk)
}

/// Lookahead state for one compile. `previous` is the token just consumed
/// and `current` the one about to be.
struct Parser<'a> {
    scanner: Scanner<'a>,
    chunk: Chunk,
    previous: Token,
    current: Token,
    depth: usize,
}

impl<'a> Parser<'a> {
    fn new(source: &'a str) -> Self {
        let start = Token::new(TokenType::Eof, Ustr::from(""), 1);
        Self {
            scanner: Scanner::new(source),
            chunk: Chunk::new(),
            previous: start,
            current: start,
            depth: 0,
        }
    }

    fn compile(mut self) -> Result<Chunk> {
        self.advance()?;
        self.expression()?;
        self.consume(TokenType::Eof, SyntaxErrorKind::ExpectEnd)?;
        self.emit_code(OpCode::Return);
        Ok(self.chunk)
    }

    fn advance(&mut self) -> Result<()> {
        self.previous = self.current;
        self.current = self.scanner.scan_token()?;
        Ok(())
    }

    fn consume(&mut self, token_type: TokenType, kind: SyntaxErrorKind) -> Result<()> {
        if self.current.token_type == token_type {
            self.advance()
        } else {
            Err(self.error_at_current(kind))
        }
    }

    fn error_at_current(&self, kind: SyntaxErrorKind) -> CompileError {
        error_at(&self.current, kind)
    }

    fn error_at_previous(&self, kind: SyntaxErrorKind) -> CompileError {
        error_at(&self.previous, kind)
    }

    fn emit_byte(&mut self, byte: u8) {
        self.chunk.write_byte(byte, self.previous.line);
    }

    fn emit_code(&mut self, code: OpCode) {
        self.emit_byte(code.into());
    }

    fn emit_constant(&mut self, value: Value) -> Result<()> {
        let index = self.make_constant(value)?;
        self.emit_code(OpCode::Constant);
        self.emit_byte(index);
        Ok(())
    }

    fn make_constant(&mut self, value: Value) -> Result<u8> {
        if self.chunk.constants().len() > MAX_CONSTANT_INDEX {
            return Err(self.error_at_previous(SyntaxErrorKind::TooManyConstants));
        }

        let index = self.chunk.add_constant(value);
        u8::try_from(index).map_err(|_| self.error_at_previous(SyntaxErrorKind::TooManyConstants))
    }

    fn expression(&mut self) -> Result<()> {
        self.parse_precedence(Precedence::Assignment)
    }

    fn parse_precedence(&mut self, precedence: Precedence) -> Result<()> {
        self.advance()?;

        let prefix_rule = get_rule(self.previous.token_type)
            .prefix
            .ok_or_else(|| self.error_at_previous(SyntaxErrorKind::ExpectExpression))?;
        prefix_rule(self)?;

        while precedence <= get_rule(self.current.token_type).precedence {
            self.advance()?;
            let infix_rule = get_rule(self.previous.token_type)
                .infix
                .ok_or_else(|| self.error_at_previous(SyntaxErrorKind::ExpectExpression))?;
            infix_rule(self)?;
        }

        Ok(())
    }
}

fn error_at(token: &Token, kind: SyntaxErrorKind) -> CompileError {
    let at = match token.token_type {
        TokenType::Eof => None,
        _ => Some(token.lexeme),
    };

    CompileError::Syntax {
        line: token.line,
        at,
        kind,
    }
}

fn grouping(parser: &mut Parser<'_>) -> Result<()> {
    if parser.depth == MAX_NESTING {
        return Err(parser.error_at_previous(SyntaxErrorKind::TooMuchNesting));
    }

    parser.depth += 1;
    parser.expression()?;
    parser.depth -= 1;
    parser.consume(TokenType::RightParen, SyntaxErrorKind::ExpectRightParen)
}

fn number(parser: &mut Parser<'_>) -> Result<()> {
    let value = parser
        .previous
        .lexeme
        .parse::<f64>()
        .map_err(|_| parser.error_at_previous(SyntaxErrorKind::InvalidNumber))?;
    parser.emit_constant(value.into())
}

fn binary(parser: &mut Parser<'_>) -> Result<()> {
    let operator_type = parser.previous.token_type;
    let precedence = get_rule(operator_type).precedence;

    // The right operand binds one level tighter, which keeps equal
    // precedence operators left-associative.
    parser.parse_precedence(precedence + 1)?;

    let code = binary_opcode(operator_type)
        .ok_or_else(|| parser.error_at_previous(SyntaxErrorKind::ExpectExpression))?;
    parser.emit_code(code);
    Ok(())
}

fn binary_opcode(token_type: TokenType) -> Option<OpCode> {
    match token_type {
        TokenType::Plus => Some(OpCode::Add),
        TokenType::Minus => Some(OpCode::Subtract),
        TokenType::Star => Some(OpCode::Multiply),
        TokenType::Slash => Some(OpCode::Divide),
        _ => None,
    }
}
