//! Recursive-descent parser for the where-expression grammar
//!
//! `&`/`&&` binds tighter than `|`/`||`; both are left-associative. A bare
//! operand is not a condition: every leaf of the tree is a comparison.

use std::cmp::Ordering;

use crate::column::Scalar;
use crate::error::{TableError, TableResult};

use super::lexer::Token;

/// Comparison operators of the language
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CmpOp {
    /// Whether the operator accepts the given ordering of lhs vs rhs
    pub fn holds_for(self, ord: Ordering) -> bool {
        match self {
            CmpOp::Eq => ord == Ordering::Equal,
            CmpOp::Ne => ord != Ordering::Equal,
            CmpOp::Lt => ord == Ordering::Less,
            CmpOp::Le => ord != Ordering::Greater,
            CmpOp::Gt => ord == Ordering::Greater,
            CmpOp::Ge => ord != Ordering::Less,
        }
    }
}

/// A comparison operand before name resolution
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// Column name or variable name, resolved at bind time
    Ident(String),
    /// Literal value
    Literal(Scalar),
}

/// Parsed condition tree
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Cmp(Operand, CmpOp, Operand),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
}

/// Parses a token stream into a condition tree.
///
/// # Errors
///
/// Usage error on empty input, trailing tokens, or any deviation from the
/// grammar.
pub fn parse(tokens: &[Token]) -> TableResult<Expr> {
    let mut parser = Parser { tokens, pos: 0 };
    let expr = parser.or_expr()?;
    if parser.pos != tokens.len() {
        return Err(TableError::usage("trailing input after condition"));
    }
    Ok(expr)
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> TableResult<&Token> {
        let tok = self
            .tokens
            .get(self.pos)
            .ok_or_else(|| TableError::usage("condition ended unexpectedly"))?;
        self.pos += 1;
        Ok(tok)
    }

    fn or_expr(&mut self) -> TableResult<Expr> {
        let mut lhs = self.and_expr()?;
        while self.peek() == Some(&Token::Or) {
            self.pos += 1;
            let rhs = self.and_expr()?;
            lhs = Expr::Or(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn and_expr(&mut self) -> TableResult<Expr> {
        let mut lhs = self.cmp_expr()?;
        while self.peek() == Some(&Token::And) {
            self.pos += 1;
            let rhs = self.cmp_expr()?;
            lhs = Expr::And(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn cmp_expr(&mut self) -> TableResult<Expr> {
        if self.peek() == Some(&Token::LParen) {
            self.pos += 1;
            let inner = self.or_expr()?;
            match self.next()? {
                Token::RParen => return Ok(inner),
                _ => return Err(TableError::usage("expected ')'")),
            }
        }

        let lhs = self.operand()?;
        let op = match self.next()? {
            Token::Eq => CmpOp::Eq,
            Token::Ne => CmpOp::Ne,
            Token::Lt => CmpOp::Lt,
            Token::Le => CmpOp::Le,
            Token::Gt => CmpOp::Gt,
            Token::Ge => CmpOp::Ge,
            other => {
                return Err(TableError::usage(format!(
                    "expected comparison operator, found {:?}",
                    other
                )));
            }
        };
        let rhs = self.operand()?;
        Ok(Expr::Cmp(lhs, op, rhs))
    }

    fn operand(&mut self) -> TableResult<Operand> {
        match self.next()? {
            Token::Ident(name) => Ok(Operand::Ident(name.clone())),
            Token::Int(v) => Ok(Operand::Literal(Scalar::Long(*v))),
            Token::Float(v) => Ok(Operand::Literal(Scalar::Double(*v))),
            Token::Str(s) => Ok(Operand::Literal(Scalar::Text(s.clone()))),
            Token::True => Ok(Operand::Literal(Scalar::Bool(true))),
            Token::False => Ok(Operand::Literal(Scalar::Bool(false))),
            other => Err(TableError::usage(format!(
                "expected operand, found {:?}",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::lexer::tokenize;

    fn parse_str(s: &str) -> TableResult<Expr> {
        parse(&tokenize(s)?)
    }

    #[test]
    fn test_parse_parenthesized_comparison() {
        let expr = parse_str("(lc==1)").unwrap();
        assert_eq!(
            expr,
            Expr::Cmp(
                Operand::Ident("lc".into()),
                CmpOp::Eq,
                Operand::Literal(Scalar::Long(1)),
            )
        );
    }

    #[test]
    fn test_and_binds_tighter_than_or() {
        let expr = parse_str("a==1 | b==2 & c==3").unwrap();
        match expr {
            Expr::Or(lhs, rhs) => {
                assert!(matches!(*lhs, Expr::Cmp(..)));
                assert!(matches!(*rhs, Expr::And(..)));
            }
            other => panic!("expected Or at the root, got {:?}", other),
        }
    }

    #[test]
    fn test_parens_override_precedence() {
        let expr = parse_str("(a==1 | b==2) & c==3").unwrap();
        assert!(matches!(expr, Expr::And(..)));
    }

    #[test]
    fn test_rejects_bare_operand_and_trailing_input() {
        assert!(parse_str("lc").is_err());
        assert!(parse_str("(lc==1) lc").is_err());
        assert!(parse_str("").is_err());
        assert!(parse_str("(lc==1").is_err());
    }
}
