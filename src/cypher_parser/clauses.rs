//! Clause-level parse functions: MATCH, OPTIONAL MATCH, CREATE, MERGE,
//! UNWIND, SET, REMOVE, DELETE, WITH, RETURN and ORDER BY.

use super::ast::{
    Aggregate, CreateClause, DeleteClause, MatchClause, MergeClause, OptionalMatchClause,
    OrderByClause, OrderByItem, RemoveClause, RemoveItem, ReturnClause, ReturnItem, SetClause,
    SetItem, SortOrder, UnwindClause, WithClause, WithItem,
};
use super::errors::ParseError;
use super::lexer::{Keyword, TokenKind};
use super::Parser;

fn aggregate_from_name(name: &str) -> Option<Aggregate> {
    match name.to_ascii_uppercase().as_str() {
        "COUNT" => Some(Aggregate::Count),
        "SUM" => Some(Aggregate::Sum),
        "AVG" => Some(Aggregate::Avg),
        "MIN" => Some(Aggregate::Min),
        "MAX" => Some(Aggregate::Max),
        "COLLECT" => Some(Aggregate::Collect),
        _ => None,
    }
}

impl Parser {
    pub(crate) fn parse_match_clause(&mut self) -> Result<MatchClause, ParseError> {
        Ok(MatchClause {
            patterns: self.parse_pattern_list()?,
        })
    }

    /// `OPTIONAL MATCH` keywords are already consumed; a directly
    /// following WHERE is attached by the caller.
    pub(crate) fn parse_optional_match_clause(&mut self) -> Result<OptionalMatchClause, ParseError> {
        Ok(OptionalMatchClause {
            patterns: self.parse_pattern_list()?,
            where_clause: None,
        })
    }

    pub(crate) fn parse_create_clause(&mut self) -> Result<CreateClause, ParseError> {
        Ok(CreateClause {
            patterns: self.parse_pattern_list()?,
        })
    }

    pub(crate) fn parse_merge_clause(&mut self) -> Result<MergeClause, ParseError> {
        let pattern = self.parse_path_pattern()?;
        let mut on_create_set = None;
        let mut on_match_set = None;
        while self.eat_keyword(Keyword::On) {
            if self.eat_keyword(Keyword::Create) {
                self.expect_keyword(Keyword::Set)?;
                if on_create_set.is_some() {
                    return Err(self.error_at_current("duplicate ON CREATE SET"));
                }
                on_create_set = Some(self.parse_set_clause()?);
            } else if self.eat_keyword(Keyword::Match) {
                self.expect_keyword(Keyword::Set)?;
                if on_match_set.is_some() {
                    return Err(self.error_at_current("duplicate ON MATCH SET"));
                }
                on_match_set = Some(self.parse_set_clause()?);
            } else {
                return Err(self.error_at_current("expected CREATE or MATCH after ON"));
            }
        }
        Ok(MergeClause {
            pattern,
            on_create_set,
            on_match_set,
        })
    }

    pub(crate) fn parse_unwind_clause(&mut self) -> Result<UnwindClause, ParseError> {
        let expression = self.parse_expression()?;
        self.expect_keyword(Keyword::As)?;
        let alias = self.expect_identifier("UNWIND alias")?;
        Ok(UnwindClause { expression, alias })
    }

    pub(crate) fn parse_set_clause(&mut self) -> Result<SetClause, ParseError> {
        let mut items = vec![self.parse_set_item()?];
        while self.eat(&TokenKind::Comma) {
            items.push(self.parse_set_item()?);
        }
        Ok(SetClause { items })
    }

    fn parse_set_item(&mut self) -> Result<SetItem, ParseError> {
        let variable = self.expect_identifier("variable in SET")?;
        self.expect(&TokenKind::Dot)?;
        let property = self.expect_identifier("property name in SET")?;
        self.expect(&TokenKind::Eq)?;
        let value = self.parse_expression()?;
        Ok(SetItem {
            variable,
            property,
            value,
        })
    }

    pub(crate) fn parse_remove_clause(&mut self) -> Result<RemoveClause, ParseError> {
        let mut items = vec![self.parse_remove_item()?];
        while self.eat(&TokenKind::Comma) {
            items.push(self.parse_remove_item()?);
        }
        Ok(RemoveClause { items })
    }

    fn parse_remove_item(&mut self) -> Result<RemoveItem, ParseError> {
        let variable = self.expect_identifier("variable in REMOVE")?;
        if self.eat(&TokenKind::Dot) {
            let property = self.expect_identifier("property name in REMOVE")?;
            Ok(RemoveItem::Property { variable, property })
        } else if self.eat(&TokenKind::Colon) {
            let label = self.expect_identifier("label in REMOVE")?;
            Ok(RemoveItem::Label { variable, label })
        } else {
            Err(self.error_at_current("expected '.' or ':' after REMOVE variable"))
        }
    }

    pub(crate) fn parse_delete_clause(&mut self, detach: bool) -> Result<DeleteClause, ParseError> {
        let mut variables = vec![self.expect_identifier("variable in DELETE")?];
        while self.eat(&TokenKind::Comma) {
            variables.push(self.expect_identifier("variable in DELETE")?);
        }
        Ok(DeleteClause { detach, variables })
    }

    pub(crate) fn parse_with_clause(&mut self) -> Result<WithClause, ParseError> {
        let mut items = vec![self.parse_with_item()?];
        while self.eat(&TokenKind::Comma) {
            items.push(self.parse_with_item()?);
        }
        let where_clause = if self.eat_keyword(Keyword::Where) {
            Some(self.parse_expression()?)
        } else {
            None
        };
        Ok(WithClause {
            items,
            where_clause,
        })
    }

    fn parse_with_item(&mut self) -> Result<WithItem, ParseError> {
        let expression = self.parse_expression()?;
        let alias = if self.eat_keyword(Keyword::As) {
            Some(self.expect_identifier("alias after AS")?)
        } else {
            None
        };
        Ok(WithItem { expression, alias })
    }

    pub(crate) fn parse_return_clause(&mut self) -> Result<ReturnClause, ParseError> {
        let distinct = self.eat_keyword(Keyword::Distinct);
        let mut items = vec![self.parse_return_item()?];
        while self.eat(&TokenKind::Comma) {
            items.push(self.parse_return_item()?);
        }
        let mut group_by = Vec::new();
        if self.eat_keyword(Keyword::Group) {
            self.expect_keyword(Keyword::By)?;
            group_by.push(self.parse_expression()?);
            while self.eat(&TokenKind::Comma) {
                group_by.push(self.parse_expression()?);
            }
        }
        Ok(ReturnClause {
            distinct,
            items,
            group_by,
        })
    }

    fn parse_return_item(&mut self) -> Result<ReturnItem, ParseError> {
        let mut aggregate = None;
        let mut expression = None;

        let is_aggregate_call = match self.peek_kind() {
            TokenKind::Ident(name) => {
                aggregate_from_name(name).is_some()
                    && matches!(self.peek_kind_at(1), TokenKind::LParen)
            }
            _ => false,
        };

        if is_aggregate_call {
            let name = self.expect_identifier("aggregate name")?;
            let agg = aggregate_from_name(&name).expect("checked above");
            self.expect(&TokenKind::LParen)?;
            if agg == Aggregate::Count && self.eat(&TokenKind::Star) {
                // COUNT(*): counts bindings, no input expression.
            } else {
                expression = Some(self.parse_expression()?);
            }
            self.expect(&TokenKind::RParen)?;
            aggregate = Some(agg);
        } else {
            expression = Some(self.parse_expression()?);
        }

        let alias = if self.eat_keyword(Keyword::As) {
            Some(self.expect_identifier("alias after AS")?)
        } else {
            None
        };
        Ok(ReturnItem {
            aggregate,
            expression,
            alias,
        })
    }

    pub(crate) fn parse_order_by_clause(&mut self) -> Result<OrderByClause, ParseError> {
        let mut items = vec![self.parse_order_by_item()?];
        while self.eat(&TokenKind::Comma) {
            items.push(self.parse_order_by_item()?);
        }
        Ok(OrderByClause { items })
    }

    fn parse_order_by_item(&mut self) -> Result<OrderByItem, ParseError> {
        let expression = self.parse_expression()?;
        let order = if self.eat_keyword(Keyword::Desc) {
            SortOrder::Desc
        } else {
            self.eat_keyword(Keyword::Asc);
            SortOrder::Asc
        };
        Ok(OrderByItem { expression, order })
    }
}
