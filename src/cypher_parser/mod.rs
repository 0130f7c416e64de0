//! Hand-written recursive-descent parser for the Cypher dialect.
//!
//! The entry point is [`parse_query`]: tokenize, then descend over the
//! token stream clause by clause. WITH ends the current query segment and
//! parses the continuation into `Query::next`; UNION \[ALL\] parses the
//! right-hand side into `Query::union`. The parser is total: any input
//! either yields an AST or a positioned error, never a panic.

pub mod ast;
pub mod errors;
pub mod lexer;

mod clauses;
mod expression;
mod path_pattern;

use ast::Query;
use errors::{ParseError, ParserError};
use lexer::{Keyword, Token, TokenKind};

/// Parse a full statement into a [`Query`].
pub fn parse_query(input: &str) -> Result<Query, ParserError> {
    let tokens = lexer::tokenize(input)?;
    let mut parser = Parser::new(tokens);
    Ok(parser.parse_statement()?)
}

pub(crate) struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        debug_assert!(matches!(
            tokens.last().map(|t| &t.kind),
            Some(TokenKind::Eof)
        ));
        Parser { tokens, pos: 0 }
    }

    pub(crate) fn peek(&self) -> &Token {
        // The token stream always ends with Eof, which is never consumed.
        self.tokens.get(self.pos).unwrap_or_else(|| {
            self.tokens
                .last()
                .expect("token stream always carries an Eof token")
        })
    }

    pub(crate) fn peek_kind(&self) -> &TokenKind {
        &self.peek().kind
    }

    pub(crate) fn peek_kind_at(&self, offset: usize) -> &TokenKind {
        match self.tokens.get(self.pos + offset) {
            Some(t) => &t.kind,
            None => &TokenKind::Eof,
        }
    }

    pub(crate) fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        token
    }

    pub(crate) fn error_at_current(&self, message: impl Into<String>) -> ParseError {
        let token = self.peek();
        ParseError {
            message: message.into(),
            line: token.line,
            column: token.column,
        }
    }

    pub(crate) fn at_keyword(&self, kw: Keyword) -> bool {
        matches!(self.peek_kind(), TokenKind::Keyword(k) if *k == kw)
    }

    pub(crate) fn eat_keyword(&mut self, kw: Keyword) -> bool {
        if self.at_keyword(kw) {
            self.advance();
            true
        } else {
            false
        }
    }

    pub(crate) fn expect_keyword(&mut self, kw: Keyword) -> Result<(), ParseError> {
        if self.eat_keyword(kw) {
            Ok(())
        } else {
            Err(self.error_at_current(format!("expected {:?}, found {}", kw, self.peek_kind())))
        }
    }

    pub(crate) fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.peek_kind() == kind {
            self.advance();
            true
        } else {
            false
        }
    }

    pub(crate) fn expect(&mut self, kind: &TokenKind) -> Result<(), ParseError> {
        if self.eat(kind) {
            Ok(())
        } else {
            Err(self.error_at_current(format!("expected '{}', found {}", kind, self.peek_kind())))
        }
    }

    pub(crate) fn expect_identifier(&mut self, what: &str) -> Result<String, ParseError> {
        match self.peek_kind() {
            TokenKind::Ident(name) => {
                let name = name.clone();
                self.advance();
                Ok(name)
            }
            other => Err(self.error_at_current(format!("expected {}, found {}", what, other))),
        }
    }

    fn parse_statement(&mut self) -> Result<Query, ParseError> {
        let explain = self.eat_keyword(Keyword::Explain);
        let profile = !explain && self.eat_keyword(Keyword::Profile);

        let mut query = self.parse_query_body()?;
        query.explain = explain;
        query.profile = profile;

        // Trailing semicolon is tolerated; anything else is a syntax error.
        self.eat(&TokenKind::Semicolon);
        if !matches!(self.peek_kind(), TokenKind::Eof) {
            return Err(self.error_at_current(format!(
                "unexpected trailing input: {}",
                self.peek_kind()
            )));
        }
        if query.is_empty() {
            return Err(self.error_at_current("empty query"));
        }
        Ok(query)
    }

    /// Parse clauses until the segment ends (WITH, UNION, ';' or Eof).
    pub(crate) fn parse_query_body(&mut self) -> Result<Query, ParseError> {
        let mut query = Query::default();
        // Tracks whether a WHERE directly follows an OPTIONAL MATCH, in
        // which case it belongs to that clause instead of the query.
        let mut after_optional_match = false;

        loop {
            match self.peek_kind() {
                TokenKind::Eof | TokenKind::Semicolon => break,
                TokenKind::Keyword(Keyword::Match) => {
                    self.advance();
                    if query.match_clause.is_some() {
                        return Err(self.error_at_current(
                            "duplicate MATCH clause (chain query parts with WITH)",
                        ));
                    }
                    query.match_clause = Some(self.parse_match_clause()?);
                    after_optional_match = false;
                }
                TokenKind::Keyword(Keyword::Optional) => {
                    self.advance();
                    self.expect_keyword(Keyword::Match)?;
                    let clause = self.parse_optional_match_clause()?;
                    query.optional_match_clauses.push(clause);
                    after_optional_match = true;
                }
                TokenKind::Keyword(Keyword::Where) => {
                    self.advance();
                    let predicate = self.parse_expression()?;
                    if after_optional_match {
                        let clause = query
                            .optional_match_clauses
                            .last_mut()
                            .expect("after_optional_match implies a parsed clause");
                        clause.where_clause = Some(predicate);
                    } else {
                        if query.where_clause.is_some() {
                            return Err(self.error_at_current("duplicate WHERE clause"));
                        }
                        query.where_clause = Some(predicate);
                    }
                    after_optional_match = false;
                }
                TokenKind::Keyword(Keyword::Create) => {
                    self.advance();
                    if query.create_clause.is_some() {
                        return Err(self.error_at_current("duplicate CREATE clause"));
                    }
                    query.create_clause = Some(self.parse_create_clause()?);
                    after_optional_match = false;
                }
                TokenKind::Keyword(Keyword::Merge) => {
                    self.advance();
                    if query.merge_clause.is_some() {
                        return Err(self.error_at_current("duplicate MERGE clause"));
                    }
                    query.merge_clause = Some(self.parse_merge_clause()?);
                    after_optional_match = false;
                }
                TokenKind::Keyword(Keyword::Unwind) => {
                    self.advance();
                    if query.unwind_clause.is_some() {
                        return Err(self.error_at_current("duplicate UNWIND clause"));
                    }
                    query.unwind_clause = Some(self.parse_unwind_clause()?);
                    after_optional_match = false;
                }
                TokenKind::Keyword(Keyword::Set) => {
                    self.advance();
                    if query.set_clause.is_some() {
                        return Err(self.error_at_current("duplicate SET clause"));
                    }
                    query.set_clause = Some(self.parse_set_clause()?);
                    after_optional_match = false;
                }
                TokenKind::Keyword(Keyword::Remove) => {
                    self.advance();
                    if query.remove_clause.is_some() {
                        return Err(self.error_at_current("duplicate REMOVE clause"));
                    }
                    query.remove_clause = Some(self.parse_remove_clause()?);
                    after_optional_match = false;
                }
                TokenKind::Keyword(Keyword::Delete) => {
                    self.advance();
                    if query.delete_clause.is_some() {
                        return Err(self.error_at_current("duplicate DELETE clause"));
                    }
                    query.delete_clause = Some(self.parse_delete_clause(false)?);
                    after_optional_match = false;
                }
                TokenKind::Keyword(Keyword::Detach) => {
                    self.advance();
                    self.expect_keyword(Keyword::Delete)?;
                    if query.delete_clause.is_some() {
                        return Err(self.error_at_current("duplicate DELETE clause"));
                    }
                    query.delete_clause = Some(self.parse_delete_clause(true)?);
                    after_optional_match = false;
                }
                TokenKind::Keyword(Keyword::Return) => {
                    self.advance();
                    if query.return_clause.is_some() {
                        return Err(self.error_at_current("duplicate RETURN clause"));
                    }
                    query.return_clause = Some(self.parse_return_clause()?);
                    after_optional_match = false;
                }
                TokenKind::Keyword(Keyword::Order) => {
                    self.advance();
                    self.expect_keyword(Keyword::By)?;
                    if query.order_by.is_some() {
                        return Err(self.error_at_current("duplicate ORDER BY clause"));
                    }
                    query.order_by = Some(self.parse_order_by_clause()?);
                    after_optional_match = false;
                }
                TokenKind::Keyword(Keyword::Skip) => {
                    self.advance();
                    if query.skip.is_some() {
                        return Err(self.error_at_current("duplicate SKIP clause"));
                    }
                    query.skip = Some(self.parse_pagination_count("SKIP")?);
                    after_optional_match = false;
                }
                TokenKind::Keyword(Keyword::Limit) => {
                    self.advance();
                    if query.limit.is_some() {
                        return Err(self.error_at_current("duplicate LIMIT clause"));
                    }
                    query.limit = Some(self.parse_pagination_count("LIMIT")?);
                    after_optional_match = false;
                }
                TokenKind::Keyword(Keyword::With) => {
                    self.advance();
                    query.with_clause = Some(self.parse_with_clause()?);
                    let next = self.parse_query_body()?;
                    if next.is_empty() {
                        return Err(self.error_at_current("expected a clause after WITH"));
                    }
                    query.next = Some(Box::new(next));
                    break;
                }
                TokenKind::Keyword(Keyword::Union) => {
                    self.advance();
                    let all = self.eat_keyword(Keyword::All);
                    let right = self.parse_query_body()?;
                    if right.is_empty() {
                        return Err(self.error_at_current("expected a query after UNION"));
                    }
                    query.union = Some(ast::UnionClause {
                        all,
                        query: Box::new(right),
                    });
                    break;
                }
                other => {
                    return Err(
                        self.error_at_current(format!("unexpected token {} in query", other))
                    );
                }
            }
        }

        Ok(query)
    }

    fn parse_pagination_count(&mut self, clause: &str) -> Result<i64, ParseError> {
        match self.peek_kind() {
            TokenKind::Integer(n) if *n >= 0 => {
                let n = *n;
                self.advance();
                Ok(n)
            }
            TokenKind::Integer(_) => {
                Err(self.error_at_current(format!("{} must be non-negative", clause)))
            }
            other => Err(self.error_at_current(format!(
                "expected integer after {}, found {}",
                clause, other
            ))),
        }
    }
}
