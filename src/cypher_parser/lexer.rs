//! Hand-written lexer for the Cypher dialect.
//!
//! Scans by character, tracks line/column for error reporting, skips
//! whitespace and `//` comments. Numbers back off before `..` so the
//! variable-length range `*1..3` lexes as Integer DotDot Integer.

use std::fmt;

use super::errors::LexicalError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    Match,
    Where,
    Return,
    Create,
    Delete,
    Detach,
    Set,
    Remove,
    With,
    Limit,
    Skip,
    Order,
    By,
    Asc,
    Desc,
    Distinct,
    As,
    And,
    Or,
    Not,
    Group,
    True,
    False,
    Null,
    Explain,
    Profile,
    Unwind,
    Merge,
    On,
    Optional,
    Case,
    When,
    Then,
    Else,
    End,
    Union,
    All,
    Is,
    In,
    Starts,
    Ends,
    Contains,
}

impl Keyword {
    /// Case-insensitive keyword lookup.
    pub fn from_ident(ident: &str) -> Option<Keyword> {
        let upper = ident.to_ascii_uppercase();
        let kw = match upper.as_str() {
            "MATCH" => Keyword::Match,
            "WHERE" => Keyword::Where,
            "RETURN" => Keyword::Return,
            "CREATE" => Keyword::Create,
            "DELETE" => Keyword::Delete,
            "DETACH" => Keyword::Detach,
            "SET" => Keyword::Set,
            "REMOVE" => Keyword::Remove,
            "WITH" => Keyword::With,
            "LIMIT" => Keyword::Limit,
            "SKIP" => Keyword::Skip,
            "ORDER" => Keyword::Order,
            "BY" => Keyword::By,
            "ASC" => Keyword::Asc,
            "DESC" => Keyword::Desc,
            "DISTINCT" => Keyword::Distinct,
            "AS" => Keyword::As,
            "AND" => Keyword::And,
            "OR" => Keyword::Or,
            "NOT" => Keyword::Not,
            "GROUP" => Keyword::Group,
            "TRUE" => Keyword::True,
            "FALSE" => Keyword::False,
            "NULL" => Keyword::Null,
            "EXPLAIN" => Keyword::Explain,
            "PROFILE" => Keyword::Profile,
            "UNWIND" => Keyword::Unwind,
            "MERGE" => Keyword::Merge,
            "ON" => Keyword::On,
            "OPTIONAL" => Keyword::Optional,
            "CASE" => Keyword::Case,
            "WHEN" => Keyword::When,
            "THEN" => Keyword::Then,
            "ELSE" => Keyword::Else,
            "END" => Keyword::End,
            "UNION" => Keyword::Union,
            "ALL" => Keyword::All,
            "IS" => Keyword::Is,
            "IN" => Keyword::In,
            "STARTS" => Keyword::Starts,
            "ENDS" => Keyword::Ends,
            "CONTAINS" => Keyword::Contains,
            _ => return None,
        };
        Some(kw)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Comma,
    Semicolon,
    Dot,
    DotDot,
    Colon,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Eq,
    Neq,
    Lt,
    Lte,
    Gt,
    Gte,
    /// `->`
    Arrow,
    /// `<-`
    BackArrow,
    Keyword(Keyword),
    Ident(String),
    Integer(i64),
    Float(f64),
    Str(String),
    /// `$name`
    Parameter(String),
    Eof,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::LParen => write!(f, "("),
            TokenKind::RParen => write!(f, ")"),
            TokenKind::LBracket => write!(f, "["),
            TokenKind::RBracket => write!(f, "]"),
            TokenKind::LBrace => write!(f, "{{"),
            TokenKind::RBrace => write!(f, "}}"),
            TokenKind::Comma => write!(f, ","),
            TokenKind::Semicolon => write!(f, ";"),
            TokenKind::Dot => write!(f, "."),
            TokenKind::DotDot => write!(f, ".."),
            TokenKind::Colon => write!(f, ":"),
            TokenKind::Plus => write!(f, "+"),
            TokenKind::Minus => write!(f, "-"),
            TokenKind::Star => write!(f, "*"),
            TokenKind::Slash => write!(f, "/"),
            TokenKind::Percent => write!(f, "%"),
            TokenKind::Eq => write!(f, "="),
            TokenKind::Neq => write!(f, "!="),
            TokenKind::Lt => write!(f, "<"),
            TokenKind::Lte => write!(f, "<="),
            TokenKind::Gt => write!(f, ">"),
            TokenKind::Gte => write!(f, ">="),
            TokenKind::Arrow => write!(f, "->"),
            TokenKind::BackArrow => write!(f, "<-"),
            TokenKind::Keyword(k) => write!(f, "{:?}", k),
            TokenKind::Ident(s) => write!(f, "{}", s),
            TokenKind::Integer(i) => write!(f, "{}", i),
            TokenKind::Float(x) => write!(f, "{}", x),
            TokenKind::Str(s) => write!(f, "\"{}\"", s),
            TokenKind::Parameter(p) => write!(f, "${}", p),
            TokenKind::Eof => write!(f, "<end of input>"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub line: u32,
    pub column: u32,
}

struct Lexer {
    chars: Vec<char>,
    pos: usize,
    line: u32,
    column: u32,
}

impl Lexer {
    fn new(input: &str) -> Self {
        Lexer {
            chars: input.chars().collect(),
            pos: 0,
            line: 1,
            column: 1,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.chars.get(self.pos).copied()?;
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn error(&self, message: impl Into<String>) -> LexicalError {
        LexicalError {
            message: message.into(),
            line: self.line,
            column: self.column,
        }
    }

    fn skip_trivia(&mut self) {
        loop {
            match self.peek() {
                Some(c) if c.is_whitespace() => {
                    self.bump();
                }
                Some('/') if self.peek_at(1) == Some('/') => {
                    while let Some(c) = self.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.bump();
                    }
                }
                _ => break,
            }
        }
    }

    fn lex_number(&mut self) -> Result<TokenKind, LexicalError> {
        let mut text = String::new();
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                text.push(c);
                self.bump();
            } else {
                break;
            }
        }
        // `1..3` is Integer DotDot Integer, not a malformed float.
        if self.peek() == Some('.') && self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) {
            text.push('.');
            self.bump();
            while let Some(c) = self.peek() {
                if c.is_ascii_digit() {
                    text.push(c);
                    self.bump();
                } else {
                    break;
                }
            }
            let value: f64 = text
                .parse()
                .map_err(|_| self.error(format!("invalid float literal '{}'", text)))?;
            return Ok(TokenKind::Float(value));
        }
        let value: i64 = text
            .parse()
            .map_err(|_| self.error(format!("integer literal '{}' out of range", text)))?;
        Ok(TokenKind::Integer(value))
    }

    fn lex_string(&mut self, quote: char) -> Result<TokenKind, LexicalError> {
        self.bump(); // opening quote
        let mut out = String::new();
        loop {
            match self.bump() {
                None => return Err(self.error("unterminated string literal")),
                Some('\\') => match self.bump() {
                    Some('n') => out.push('\n'),
                    Some('t') => out.push('\t'),
                    Some('r') => out.push('\r'),
                    Some('\\') => out.push('\\'),
                    Some('"') => out.push('"'),
                    Some('\'') => out.push('\''),
                    Some(c) => {
                        return Err(self.error(format!("unsupported escape sequence '\\{}'", c)))
                    }
                    None => return Err(self.error("unterminated string literal")),
                },
                Some(c) if c == quote => return Ok(TokenKind::Str(out)),
                Some(c) => out.push(c),
            }
        }
    }

    fn lex_identifier(&mut self) -> TokenKind {
        let mut text = String::new();
        while let Some(c) = self.peek() {
            if c.is_ascii_alphanumeric() || c == '_' {
                text.push(c);
                self.bump();
            } else {
                break;
            }
        }
        match Keyword::from_ident(&text) {
            Some(kw) => TokenKind::Keyword(kw),
            None => TokenKind::Ident(text),
        }
    }

    fn lex_parameter(&mut self) -> Result<TokenKind, LexicalError> {
        self.bump(); // '$'
        match self.peek() {
            Some(c) if c.is_ascii_alphabetic() || c == '_' => {
                // Keyword-shaped parameter names are still parameter names.
                let mut name = String::new();
                while let Some(c) = self.peek() {
                    if c.is_ascii_alphanumeric() || c == '_' {
                        name.push(c);
                        self.bump();
                    } else {
                        break;
                    }
                }
                Ok(TokenKind::Parameter(name))
            }
            Some(c) if c.is_ascii_digit() => {
                Err(self.error("parameter name must start with a letter or underscore"))
            }
            _ => Err(self.error("expected parameter name after '$'")),
        }
    }

    fn next_token(&mut self) -> Result<Option<Token>, LexicalError> {
        self.skip_trivia();
        let line = self.line;
        let column = self.column;
        let Some(c) = self.peek() else {
            return Ok(None);
        };

        let kind = match c {
            '(' => {
                self.bump();
                TokenKind::LParen
            }
            ')' => {
                self.bump();
                TokenKind::RParen
            }
            '[' => {
                self.bump();
                TokenKind::LBracket
            }
            ']' => {
                self.bump();
                TokenKind::RBracket
            }
            '{' => {
                self.bump();
                TokenKind::LBrace
            }
            '}' => {
                self.bump();
                TokenKind::RBrace
            }
            ',' => {
                self.bump();
                TokenKind::Comma
            }
            ';' => {
                self.bump();
                TokenKind::Semicolon
            }
            ':' => {
                self.bump();
                TokenKind::Colon
            }
            '+' => {
                self.bump();
                TokenKind::Plus
            }
            '%' => {
                self.bump();
                TokenKind::Percent
            }
            '*' => {
                self.bump();
                TokenKind::Star
            }
            '/' => {
                self.bump();
                TokenKind::Slash
            }
            '.' => {
                self.bump();
                if self.peek() == Some('.') {
                    self.bump();
                    TokenKind::DotDot
                } else {
                    TokenKind::Dot
                }
            }
            '-' => {
                self.bump();
                if self.peek() == Some('>') {
                    self.bump();
                    TokenKind::Arrow
                } else {
                    TokenKind::Minus
                }
            }
            '=' => {
                self.bump();
                TokenKind::Eq
            }
            '!' => {
                self.bump();
                if self.peek() == Some('=') {
                    self.bump();
                    TokenKind::Neq
                } else {
                    return Err(self.error("unexpected character '!' (did you mean '!=')"));
                }
            }
            '<' => {
                self.bump();
                match self.peek() {
                    Some('=') => {
                        self.bump();
                        TokenKind::Lte
                    }
                    Some('>') => {
                        self.bump();
                        TokenKind::Neq
                    }
                    Some('-') => {
                        self.bump();
                        TokenKind::BackArrow
                    }
                    _ => TokenKind::Lt,
                }
            }
            '>' => {
                self.bump();
                if self.peek() == Some('=') {
                    self.bump();
                    TokenKind::Gte
                } else {
                    TokenKind::Gt
                }
            }
            '\'' | '"' => self.lex_string(c)?,
            '$' => self.lex_parameter()?,
            c if c.is_ascii_digit() => self.lex_number()?,
            c if c.is_ascii_alphabetic() || c == '_' => self.lex_identifier(),
            c => return Err(self.error(format!("unexpected character '{}'", c))),
        };

        Ok(Some(Token { kind, line, column }))
    }
}

/// Tokenize query text. The trailing Eof token carries the end position.
pub fn tokenize(input: &str) -> Result<Vec<Token>, LexicalError> {
    let mut lexer = Lexer::new(input);
    let mut tokens = Vec::new();
    while let Some(token) = lexer.next_token()? {
        tokens.push(token);
    }
    tokens.push(Token {
        kind: TokenKind::Eof,
        line: lexer.line,
        column: lexer.column,
    });
    Ok(tokens)
}
