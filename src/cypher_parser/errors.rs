use thiserror::Error;

/// Error produced while tokenizing query text.
#[derive(Debug, Clone, Error, PartialEq)]
#[error("lexical error at {line}:{column}: {message}")]
pub struct LexicalError {
    pub message: String,
    pub line: u32,
    pub column: u32,
}

/// Error produced while parsing the token stream.
#[derive(Debug, Clone, Error, PartialEq)]
#[error("parse error at {line}:{column}: {message}")]
pub struct ParseError {
    pub message: String,
    pub line: u32,
    pub column: u32,
}

/// Anything that can go wrong turning query text into an AST.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ParserError {
    #[error(transparent)]
    Lexical(#[from] LexicalError),

    #[error(transparent)]
    Parse(#[from] ParseError),
}

impl ParserError {
    /// 1-based position of the offending input.
    pub fn position(&self) -> (u32, u32) {
        match self {
            ParserError::Lexical(e) => (e.line, e.column),
            ParserError::Parse(e) => (e.line, e.column),
        }
    }
}
