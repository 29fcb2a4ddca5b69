use thiserror::Error;
use ustr::Ustr;

/// Hands out one token per call over a borrowed source string.
///
/// `start` marks the beginning of the lexeme being scanned and `current`
/// the next byte to read. Both always sit on character boundaries.
#[derive(Debug, Clone)]
pub struct Scanner<'a> {
    source: &'a str,
    start: usize,
    current: usize,
    line: usize,
    finished: bool,
}

impl<'a> Scanner<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            start: 0,
            current: 0,
            line: 1,
            finished: false,
        }
    }

    pub fn line(&self) -> usize {
        self.line
    }

    /// Scans the next token. Once the input is exhausted every call
    /// returns an `Eof` token.
    pub fn scan_token(&mut self) -> Result<Token, ScannerError> {
        self.skip_whitespace();
        self.start = self.current;

        let Some(c) = self.advance() else {
            return Ok(self.make_token(TokenType::Eof));
        };

        if c.is_ascii_digit() {
            return Ok(self.number());
        }

        if is_alpha(c) {
            return Ok(self.identifier());
        }

        let token_type = match c {
            '(' => TokenType::LeftParen,
            ')' => TokenType::RightParen,
            '{' => TokenType::LeftBrace,
            '}' => TokenType::RightBrace,
            ',' => TokenType::Comma,
            '.' => TokenType::Dot,
            '-' => TokenType::Minus,
            '+' => TokenType::Plus,
            ';' => TokenType::Semicolon,
            '/' => TokenType::Slash,
            '*' => TokenType::Star,
            _ => {
                return Err(ScannerError::UnexpectedCharacter {
                    character: c,
                    line: self.line,
                })
            }
        };

        Ok(self.make_token(token_type))
    }

    fn peek(&self) -> Option<char> {
        self.source[self.current..].chars().next()
    }

    fn peek_next(&self) -> Option<char> {
        let mut chars = self.source[self.current..].chars();
        chars.next();
        chars.next()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.current += c.len_utf8();
        Some(c)
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek() {
            match c {
                ' ' | '\r' | '\t' => {}
                '\n' => self.line += 1,
                _ => return,
            }
            self.advance();
        }
    }

    fn number(&mut self) -> Token {
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
        }

        // A trailing '.' without digits after it is left for the next token.
        if self.peek() == Some('.') && self.peek_next().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.advance();
            }
        }

        self.make_token(TokenType::Number)
    }

    fn identifier(&mut self) -> Token {
        while self.peek().is_some_and(|c| is_alpha(c) || c.is_ascii_digit()) {
            self.advance();
        }

        self.make_token(TokenType::Identifier)
    }

    fn make_token(&self, token_type: TokenType) -> Token {
        let lexeme = Ustr::from(&self.source[self.start..self.current]);
        Token::new(token_type, lexeme, self.line)
    }
}

impl Iterator for Scanner<'_> {
    type Item = Result<Token, ScannerError>;

    /// Yields tokens up to and including `Eof`, then stops.
    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        let result = self.scan_token();
        if matches!(&result, Ok(token) if token.token_type == TokenType::Eof) {
            self.finished = true;
        }
        Some(result)
    }
}

fn is_alpha(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct Token {
    pub token_type: TokenType,
    pub lexeme: Ustr,
    pub line: usize,
}

impl Token {
    pub fn new(token_type: TokenType, lexeme: Ustr, line: usize) -> Self {
        Self {
            token_type,
            lexeme,
            line,
        }
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum TokenType {
    // Single-character tokens.
    LeftParen,
    RightParen,
    LeftBrace,
    RightBrace,
    Comma,
    Dot,
    Minus,
    Plus,
    Semicolon,
    Slash,
    Star,

    // Literals.
    Identifier,
    Number,

    Eof,
}

#[derive(Debug, Error, Clone, Copy, Eq, PartialEq)]
pub enum ScannerError {
    #[error("[line {line}] Error: Unexpected character '{character}'.")]
    UnexpectedCharacter { character: char, line: usize },
}
