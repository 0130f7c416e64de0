//! Node and relationship pattern parsing.
//!
//! A path is `(node)` optionally extended by relationship segments. Each
//! segment picks its direction from the leading and trailing arrow:
//! `-[..]->` outgoing, `<-[..]-` incoming, `-[..]-` undirected. Property
//! maps accept literals or `$param` references.

use super::ast::{NodePattern, PathPattern, PatternValue, RelationshipPattern};
use super::errors::ParseError;
use super::lexer::{Keyword, TokenKind};
use super::Parser;
use crate::graph::Direction;
use crate::value::Value;

impl Parser {
    pub(crate) fn parse_pattern_list(&mut self) -> Result<Vec<PathPattern>, ParseError> {
        let mut patterns = vec![self.parse_path_pattern()?];
        while self.eat(&TokenKind::Comma) {
            patterns.push(self.parse_path_pattern()?);
        }
        Ok(patterns)
    }

    pub(crate) fn parse_path_pattern(&mut self) -> Result<PathPattern, ParseError> {
        let mut pattern = PathPattern::single_node(self.parse_node_pattern()?);
        loop {
            let leading_incoming = if self.eat(&TokenKind::BackArrow) {
                true
            } else if self.eat(&TokenKind::Minus) {
                false
            } else {
                break;
            };
            let relationship = self.parse_relationship_pattern(leading_incoming)?;
            let node = self.parse_node_pattern()?;
            pattern.relationships.push(relationship);
            pattern.nodes.push(node);
        }
        Ok(pattern)
    }

    fn parse_node_pattern(&mut self) -> Result<NodePattern, ParseError> {
        self.expect(&TokenKind::LParen)?;
        let mut node = NodePattern::default();
        if let TokenKind::Ident(name) = self.peek_kind() {
            node.variable = Some(name.clone());
            self.advance();
        }
        while self.eat(&TokenKind::Colon) {
            node.labels.push(self.expect_identifier("label name")?);
        }
        if matches!(self.peek_kind(), TokenKind::LBrace) {
            node.properties = self.parse_property_map()?;
        }
        self.expect(&TokenKind::RParen)?;
        Ok(node)
    }

    /// The leading `-` / `<-` is already consumed.
    fn parse_relationship_pattern(
        &mut self,
        leading_incoming: bool,
    ) -> Result<RelationshipPattern, ParseError> {
        let mut rel = RelationshipPattern {
            variable: None,
            rel_type: None,
            direction: Direction::Both,
            properties: Vec::new(),
            min_hops: None,
            max_hops: None,
        };

        if self.eat(&TokenKind::LBracket) {
            if let TokenKind::Ident(name) = self.peek_kind() {
                rel.variable = Some(name.clone());
                self.advance();
            }
            if self.eat(&TokenKind::Colon) {
                rel.rel_type = Some(self.expect_identifier("relationship type")?);
            }
            if self.eat(&TokenKind::Star) {
                self.parse_hop_range(&mut rel)?;
            }
            if matches!(self.peek_kind(), TokenKind::LBrace) {
                rel.properties = self.parse_property_map()?;
            }
            self.expect(&TokenKind::RBracket)?;
        }

        let trailing_outgoing = if self.eat(&TokenKind::Arrow) {
            true
        } else if self.eat(&TokenKind::Minus) {
            false
        } else {
            return Err(self.error_at_current(format!(
                "expected '->' or '-' after relationship, found {}",
                self.peek_kind()
            )));
        };

        rel.direction = match (leading_incoming, trailing_outgoing) {
            (false, true) => Direction::Outgoing,
            (true, false) => Direction::Incoming,
            (false, false) => Direction::Both,
            (true, true) => {
                return Err(self.error_at_current("relationship cannot point both ways"))
            }
        };
        Ok(rel)
    }

    /// `*`, `*n`, `*n..`, `*n..m`, `*..m` — the `*` is already consumed.
    fn parse_hop_range(&mut self, rel: &mut RelationshipPattern) -> Result<(), ParseError> {
        rel.min_hops = Some(1);
        rel.max_hops = None;
        match self.peek_kind().clone() {
            TokenKind::Integer(n) => {
                let min = self.hop_count(n)?;
                self.advance();
                rel.min_hops = Some(min);
                if self.eat(&TokenKind::DotDot) {
                    if let TokenKind::Integer(m) = self.peek_kind().clone() {
                        let max = self.hop_count(m)?;
                        self.advance();
                        if max < min {
                            return Err(self.error_at_current(format!(
                                "variable-length range *{}..{} has max below min",
                                min, max
                            )));
                        }
                        rel.max_hops = Some(max);
                    }
                } else {
                    rel.max_hops = Some(min);
                }
            }
            TokenKind::DotDot => {
                self.advance();
                if let TokenKind::Integer(m) = self.peek_kind().clone() {
                    let max = self.hop_count(m)?;
                    self.advance();
                    rel.max_hops = Some(max);
                } else {
                    return Err(
                        self.error_at_current("expected upper bound after '*..'")
                    );
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn hop_count(&self, n: i64) -> Result<u32, ParseError> {
        u32::try_from(n)
            .map_err(|_| self.error_at_current(format!("hop count {} out of range", n)))
    }

    pub(crate) fn parse_property_map(&mut self) -> Result<Vec<(String, PatternValue)>, ParseError> {
        self.expect(&TokenKind::LBrace)?;
        let mut properties = Vec::new();
        if !self.eat(&TokenKind::RBrace) {
            loop {
                let key = self.expect_identifier("property name")?;
                self.expect(&TokenKind::Colon)?;
                let value = self.parse_pattern_value()?;
                properties.push((key, value));
                if self.eat(&TokenKind::Comma) {
                    continue;
                }
                self.expect(&TokenKind::RBrace)?;
                break;
            }
        }
        Ok(properties)
    }

    fn parse_pattern_value(&mut self) -> Result<PatternValue, ParseError> {
        let negative = self.eat(&TokenKind::Minus);
        match self.peek_kind().clone() {
            TokenKind::Integer(n) => {
                self.advance();
                Ok(PatternValue::Literal(Value::Int(if negative { -n } else { n })))
            }
            TokenKind::Float(x) => {
                self.advance();
                Ok(PatternValue::Literal(Value::Float(if negative { -x } else { x })))
            }
            TokenKind::Str(s) if !negative => {
                self.advance();
                Ok(PatternValue::Literal(Value::String(s)))
            }
            TokenKind::Keyword(Keyword::True) if !negative => {
                self.advance();
                Ok(PatternValue::Literal(Value::Bool(true)))
            }
            TokenKind::Keyword(Keyword::False) if !negative => {
                self.advance();
                Ok(PatternValue::Literal(Value::Bool(false)))
            }
            TokenKind::Keyword(Keyword::Null) if !negative => {
                self.advance();
                Ok(PatternValue::Literal(Value::Null))
            }
            TokenKind::Parameter(name) if !negative => {
                self.advance();
                Ok(PatternValue::Parameter(name))
            }
            other => Err(self.error_at_current(format!(
                "expected literal or parameter in property map, found {}",
                other
            ))),
        }
    }
}
