//! Expression parsing: precedence climbing over the token stream.
//!
//! Lowest to highest: OR, AND, NOT, comparison (including IS \[NOT\] NULL,
//! IN and the string predicates), additive, multiplicative, unary minus,
//! atom. Binary operators are left-associative; NOT and unary minus are
//! right-recursive.

use super::ast::{ArithmeticOp, BinaryOp, CaseExpression, Expression, UnaryOp};
use super::errors::ParseError;
use super::lexer::{Keyword, TokenKind};
use super::Parser;
use crate::value::Value;

impl Parser {
    pub(crate) fn parse_expression(&mut self) -> Result<Expression, ParseError> {
        self.parse_or()
    }

    fn parse_or(&mut self) -> Result<Expression, ParseError> {
        let mut left = self.parse_and()?;
        while self.eat_keyword(Keyword::Or) {
            let right = self.parse_and()?;
            left = Expression::Binary {
                op: BinaryOp::Or,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expression, ParseError> {
        let mut left = self.parse_not()?;
        while self.eat_keyword(Keyword::And) {
            let right = self.parse_not()?;
            left = Expression::Binary {
                op: BinaryOp::And,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_not(&mut self) -> Result<Expression, ParseError> {
        if self.eat_keyword(Keyword::Not) {
            let operand = self.parse_not()?;
            return Ok(Expression::Unary {
                op: UnaryOp::Not,
                operand: Box::new(operand),
            });
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<Expression, ParseError> {
        let mut left = self.parse_additive()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::Eq => BinaryOp::Eq,
                TokenKind::Neq => BinaryOp::Neq,
                TokenKind::Lt => BinaryOp::Lt,
                TokenKind::Lte => BinaryOp::Lte,
                TokenKind::Gt => BinaryOp::Gt,
                TokenKind::Gte => BinaryOp::Gte,
                TokenKind::Keyword(Keyword::In) => BinaryOp::In,
                TokenKind::Keyword(Keyword::Contains) => BinaryOp::Contains,
                TokenKind::Keyword(Keyword::Starts) => {
                    self.advance();
                    self.expect_keyword(Keyword::With)?;
                    let right = self.parse_additive()?;
                    left = Expression::Binary {
                        op: BinaryOp::StartsWith,
                        left: Box::new(left),
                        right: Box::new(right),
                    };
                    continue;
                }
                TokenKind::Keyword(Keyword::Ends) => {
                    self.advance();
                    self.expect_keyword(Keyword::With)?;
                    let right = self.parse_additive()?;
                    left = Expression::Binary {
                        op: BinaryOp::EndsWith,
                        left: Box::new(left),
                        right: Box::new(right),
                    };
                    continue;
                }
                TokenKind::Keyword(Keyword::Is) => {
                    self.advance();
                    let op = if self.eat_keyword(Keyword::Not) {
                        UnaryOp::IsNotNull
                    } else {
                        UnaryOp::IsNull
                    };
                    self.expect_keyword(Keyword::Null)?;
                    left = Expression::Unary {
                        op,
                        operand: Box::new(left),
                    };
                    continue;
                }
                _ => break,
            };
            self.advance();
            let right = self.parse_additive()?;
            left = Expression::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_additive(&mut self) -> Result<Expression, ParseError> {
        let mut left = self.parse_multiplicative()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::Plus => ArithmeticOp::Add,
                TokenKind::Minus => ArithmeticOp::Subtract,
                _ => break,
            };
            self.advance();
            let right = self.parse_multiplicative()?;
            left = Expression::Arithmetic {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> Result<Expression, ParseError> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::Star => ArithmeticOp::Multiply,
                TokenKind::Slash => ArithmeticOp::Divide,
                TokenKind::Percent => ArithmeticOp::Modulo,
                _ => break,
            };
            self.advance();
            let right = self.parse_unary()?;
            left = Expression::Arithmetic {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expression, ParseError> {
        if self.eat(&TokenKind::Minus) {
            let operand = self.parse_unary()?;
            return Ok(Expression::Unary {
                op: UnaryOp::Minus,
                operand: Box::new(operand),
            });
        }
        self.parse_atom()
    }

    fn parse_atom(&mut self) -> Result<Expression, ParseError> {
        match self.peek_kind().clone() {
            TokenKind::LParen => {
                self.advance();
                let expr = self.parse_expression()?;
                self.expect(&TokenKind::RParen)?;
                Ok(expr)
            }
            TokenKind::Integer(n) => {
                self.advance();
                Ok(Expression::Literal(Value::Int(n)))
            }
            TokenKind::Float(x) => {
                self.advance();
                Ok(Expression::Literal(Value::Float(x)))
            }
            TokenKind::Str(s) => {
                self.advance();
                Ok(Expression::Literal(Value::String(s)))
            }
            TokenKind::Keyword(Keyword::True) => {
                self.advance();
                Ok(Expression::Literal(Value::Bool(true)))
            }
            TokenKind::Keyword(Keyword::False) => {
                self.advance();
                Ok(Expression::Literal(Value::Bool(false)))
            }
            TokenKind::Keyword(Keyword::Null) => {
                self.advance();
                Ok(Expression::Literal(Value::Null))
            }
            TokenKind::Keyword(Keyword::Case) => {
                self.advance();
                self.parse_case()
            }
            TokenKind::Parameter(name) => {
                self.advance();
                Ok(Expression::Parameter(name))
            }
            TokenKind::LBracket => {
                self.advance();
                let mut elements = Vec::new();
                if !self.eat(&TokenKind::RBracket) {
                    loop {
                        elements.push(self.parse_expression()?);
                        if self.eat(&TokenKind::Comma) {
                            continue;
                        }
                        self.expect(&TokenKind::RBracket)?;
                        break;
                    }
                }
                Ok(Expression::List(elements))
            }
            TokenKind::Ident(name) => {
                // `name(`            → function call
                // `a.b(`             → namespaced function call "a.b"
                // `a.b`              → property access
                // `a`                → bare variable (empty property)
                if matches!(self.peek_kind_at(1), TokenKind::LParen) {
                    self.advance();
                    return self.parse_function_call(name);
                }
                if matches!(self.peek_kind_at(1), TokenKind::Dot) {
                    if let TokenKind::Ident(second) = self.peek_kind_at(2).clone() {
                        if matches!(self.peek_kind_at(3), TokenKind::LParen) {
                            self.advance(); // name
                            self.advance(); // .
                            self.advance(); // second
                            return self.parse_function_call(format!("{}.{}", name, second));
                        }
                        self.advance();
                        self.advance();
                        self.advance();
                        return Ok(Expression::property(name, second));
                    }
                    // `a.` with no property name.
                    self.advance();
                    self.advance();
                    return Err(self.error_at_current("expected property name after '.'"));
                }
                self.advance();
                Ok(Expression::variable(name))
            }
            other => Err(self.error_at_current(format!("expected expression, found {}", other))),
        }
    }

    /// Arguments of a call; the name (possibly dotted) is already consumed
    /// and the current token is '('.
    fn parse_function_call(&mut self, name: String) -> Result<Expression, ParseError> {
        self.expect(&TokenKind::LParen)?;
        let mut args = Vec::new();
        if !self.eat(&TokenKind::RParen) {
            loop {
                args.push(self.parse_expression()?);
                if self.eat(&TokenKind::Comma) {
                    continue;
                }
                self.expect(&TokenKind::RParen)?;
                break;
            }
        }
        Ok(Expression::FunctionCall { name, args })
    }

    fn parse_case(&mut self) -> Result<Expression, ParseError> {
        let operand = if self.at_keyword(Keyword::When) {
            None
        } else {
            Some(Box::new(self.parse_expression()?))
        };
        let mut when_then = Vec::new();
        while self.eat_keyword(Keyword::When) {
            let when = self.parse_expression()?;
            self.expect_keyword(Keyword::Then)?;
            let then = self.parse_expression()?;
            when_then.push((when, then));
        }
        if when_then.is_empty() {
            return Err(self.error_at_current("CASE requires at least one WHEN clause"));
        }
        let else_expr = if self.eat_keyword(Keyword::Else) {
            Some(Box::new(self.parse_expression()?))
        } else {
            None
        };
        self.expect_keyword(Keyword::End)?;
        Ok(Expression::Case(CaseExpression {
            operand,
            when_then,
            else_expr,
        }))
    }
}
