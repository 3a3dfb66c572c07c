//! Recursive-descent parser for conditions and formulas.
//!
//! Precedence, loosest first: `or`, `and`, `not`, comparison, `+ -`,
//! `* /`, unary minus, atoms.

use std::str::FromStr;

use rust_decimal::Decimal;

use crate::ast::{BinaryOp, Expr, Expression, Func, UnaryOp};
use crate::error::{ExprError, Span};
use crate::lexer::{lex, Spanned, Token};
use crate::value::Value;

/// Parse one expression.
pub fn parse_expression(text: &str) -> Result<Expression, ExprError> {
    let tokens = lex(text)?;
    let mut parser = Parser::new(&tokens);
    if parser.peek() == &Token::Eof {
        return Err(ExprError::syntax("empty expression", Span::new(0, 0)));
    }
    let root = parser.parse_expr()?;
    if parser.peek() != &Token::Eof {
        return Err(parser.err(format!("unexpected {:?} after expression", parser.peek())));
    }
    Ok(Expression {
        text: text.to_string(),
        root,
    })
}

struct Parser<'a> {
    tokens: &'a [Spanned],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(tokens: &'a [Spanned]) -> Self {
        Parser { tokens, pos: 0 }
    }

    fn cur(&self) -> &Spanned {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek(&self) -> &Token {
        &self.cur().token
    }

    fn advance(&mut self) -> Spanned {
        let t = self.cur().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        t
    }

    fn is_word(&self, w: &str) -> bool {
        matches!(self.peek(), Token::Word(x) if x == w)
    }

    fn err(&self, msg: impl Into<String>) -> ExprError {
        ExprError::syntax(msg, self.cur().span)
    }

    fn expect(&mut self, expected: Token) -> Result<Span, ExprError> {
        if self.peek() == &expected {
            Ok(self.advance().span)
        } else {
            Err(self.err(format!("expected {:?}, got {:?}", expected, self.peek())))
        }
    }

    // -- Expression parsing --------------------------------------

    fn parse_expr(&mut self) -> Result<Expr, ExprError> {
        self.parse_or_expr()
    }

    fn parse_or_expr(&mut self) -> Result<Expr, ExprError> {
        let mut left = self.parse_and_expr()?;
        while self.peek() == &Token::OrOr || self.is_word("or") {
            self.advance();
            let right = self.parse_and_expr()?;
            left = binary(BinaryOp::Or, left, right);
        }
        Ok(left)
    }

    fn parse_and_expr(&mut self) -> Result<Expr, ExprError> {
        let mut left = self.parse_not_expr()?;
        while self.peek() == &Token::AndAnd || self.is_word("and") {
            self.advance();
            let right = self.parse_not_expr()?;
            left = binary(BinaryOp::And, left, right);
        }
        Ok(left)
    }

    fn parse_not_expr(&mut self) -> Result<Expr, ExprError> {
        if self.peek() == &Token::Bang || self.is_word("not") {
            let start = self.advance().span;
            let operand = self.parse_not_expr()?;
            let span = start.join(operand.span());
            return Ok(Expr::Unary {
                op: UnaryOp::Not,
                operand: Box::new(operand),
                span,
            });
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<Expr, ExprError> {
        let left = self.parse_additive()?;
        let op = match self.peek() {
            Token::Eq => BinaryOp::Eq,
            Token::Neq => BinaryOp::Neq,
            Token::Lt => BinaryOp::Lt,
            Token::Lte => BinaryOp::Lte,
            Token::Gt => BinaryOp::Gt,
            Token::Gte => BinaryOp::Gte,
            _ => return Ok(left),
        };
        self.advance();
        let right = self.parse_additive()?;
        if matches!(
            self.peek(),
            Token::Eq | Token::Neq | Token::Lt | Token::Lte | Token::Gt | Token::Gte
        ) {
            return Err(self.err("comparisons cannot be chained; use 'and'"));
        }
        Ok(binary(op, left, right))
    }

    fn parse_additive(&mut self) -> Result<Expr, ExprError> {
        let mut left = self.parse_multiplicative()?;
        loop {
            let op = match self.peek() {
                Token::Plus => BinaryOp::Add,
                Token::Minus => BinaryOp::Sub,
                _ => return Ok(left),
            };
            self.advance();
            let right = self.parse_multiplicative()?;
            left = binary(op, left, right);
        }
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, ExprError> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.peek() {
                Token::Star => BinaryOp::Mul,
                Token::Slash => BinaryOp::Div,
                _ => return Ok(left),
            };
            self.advance();
            let right = self.parse_unary()?;
            left = binary(op, left, right);
        }
    }

    fn parse_unary(&mut self) -> Result<Expr, ExprError> {
        if self.peek() == &Token::Minus {
            let start = self.advance().span;
            let operand = self.parse_unary()?;
            let span = start.join(operand.span());
            return Ok(Expr::Unary {
                op: UnaryOp::Neg,
                operand: Box::new(operand),
                span,
            });
        }
        self.parse_atom()
    }

    fn parse_atom(&mut self) -> Result<Expr, ExprError> {
        let tok = self.advance();
        match tok.token {
            Token::Number(text) => {
                let d = Decimal::from_str(&text).map_err(|e| {
                    ExprError::syntax(format!("invalid number '{}': {}", text, e), tok.span)
                })?;
                Ok(Expr::Literal {
                    value: Value::Double(d),
                    span: tok.span,
                })
            }
            Token::Str(s) => Ok(Expr::Literal {
                value: Value::String(s),
                span: tok.span,
            }),
            Token::LParen => {
                let inner = self.parse_expr()?;
                self.expect(Token::RParen)?;
                Ok(inner)
            }
            Token::Word(w) => match w.as_str() {
                "true" | "ja" => Ok(Expr::Literal {
                    value: Value::Boolean(true),
                    span: tok.span,
                }),
                "false" | "nee" => Ok(Expr::Literal {
                    value: Value::Boolean(false),
                    span: tok.span,
                }),
                "and" | "or" | "not" => Err(ExprError::syntax(
                    format!("expected operand, got keyword '{}'", w),
                    tok.span,
                )),
                _ if self.peek() == &Token::LParen => self.parse_call(&w, tok.span),
                _ => Ok(Expr::Ref {
                    name: w,
                    span: tok.span,
                }),
            },
            Token::Eof => Err(ExprError::syntax("unexpected end of expression", tok.span)),
            other => Err(ExprError::syntax(
                format!("expected operand, got {:?}", other),
                tok.span,
            )),
        }
    }

    fn parse_call(&mut self, name: &str, name_span: Span) -> Result<Expr, ExprError> {
        let func = Func::from_name(name)
            .ok_or_else(|| ExprError::syntax(format!("unknown function '{}'", name), name_span))?;
        self.expect(Token::LParen)?;
        let mut args = Vec::new();
        if self.peek() != &Token::RParen {
            loop {
                args.push(self.parse_expr()?);
                if self.peek() == &Token::Comma {
                    self.advance();
                    continue;
                }
                break;
            }
        }
        let close = self.expect(Token::RParen)?;
        let span = name_span.join(close);
        let (min, max) = func.arity();
        if args.len() < min || args.len() > max {
            let expected = if min == max {
                format!("{}", min)
            } else {
                format!("{} to {}", min, max)
            };
            return Err(ExprError::syntax(
                format!(
                    "function '{}' takes {} argument(s), got {}",
                    func.name(),
                    expected,
                    args.len()
                ),
                span,
            ));
        }
        Ok(Expr::Call { func, args, span })
    }
}

fn binary(op: BinaryOp, left: Expr, right: Expr) -> Expr {
    let span = left.span().join(right.span());
    Expr::Binary {
        op,
        left: Box::new(left),
        right: Box::new(right),
        span,
    }
}
