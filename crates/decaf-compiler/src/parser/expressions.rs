use decaf_common::Span;

use crate::ast::nodes::*;
use crate::lexer::token::TokenKind;

use super::Parser;

impl Parser {
    /// Parse a full expression (assignment is the lowest precedence and
    /// associates to the right).
    pub(super) fn parse_expression(&mut self) -> Option<Expr> {
        let left = self.parse_or()?;
        if self.eat(TokenKind::Equal) {
            let value = self.parse_expression()?;
            let span = left.span.merge(&value.span);
            return Some(Expr::new(
                ExprKind::Assign {
                    target: Box::new(left),
                    value: Box::new(value),
                },
                span,
            ));
        }
        Some(left)
    }

    fn parse_or(&mut self) -> Option<Expr> {
        let mut left = self.parse_and()?;
        while self.eat(TokenKind::PipePipe) {
            let right = self.parse_and()?;
            left = binary(BinaryOp::Or, left, right);
        }
        Some(left)
    }

    fn parse_and(&mut self) -> Option<Expr> {
        let mut left = self.parse_equality()?;
        while self.eat(TokenKind::AmpAmp) {
            let right = self.parse_equality()?;
            left = binary(BinaryOp::And, left, right);
        }
        Some(left)
    }

    fn parse_equality(&mut self) -> Option<Expr> {
        let mut left = self.parse_relational()?;
        loop {
            let op = match self.peek() {
                TokenKind::EqualEqual => BinaryOp::Eq,
                TokenKind::BangEqual => BinaryOp::Neq,
                _ => break,
            };
            self.advance();
            let right = self.parse_relational()?;
            left = binary(op, left, right);
        }
        Some(left)
    }

    fn parse_relational(&mut self) -> Option<Expr> {
        let mut left = self.parse_additive()?;
        loop {
            let op = match self.peek() {
                TokenKind::Less => BinaryOp::Lt,
                TokenKind::LessEqual => BinaryOp::Lte,
                TokenKind::Greater => BinaryOp::Gt,
                TokenKind::GreaterEqual => BinaryOp::Gte,
                _ => break,
            };
            self.advance();
            let right = self.parse_additive()?;
            left = binary(op, left, right);
        }
        Some(left)
    }

    fn parse_additive(&mut self) -> Option<Expr> {
        let mut left = self.parse_multiplicative()?;
        loop {
            let op = match self.peek() {
                TokenKind::Plus => BinaryOp::Add,
                TokenKind::Minus => BinaryOp::Sub,
                _ => break,
            };
            self.advance();
            let right = self.parse_multiplicative()?;
            left = binary(op, left, right);
        }
        Some(left)
    }

    fn parse_multiplicative(&mut self) -> Option<Expr> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.peek() {
                TokenKind::Star => BinaryOp::Mul,
                TokenKind::Slash => BinaryOp::Div,
                TokenKind::Percent => BinaryOp::Mod,
                _ => break,
            };
            self.advance();
            let right = self.parse_unary()?;
            left = binary(op, left, right);
        }
        Some(left)
    }

    fn parse_unary(&mut self) -> Option<Expr> {
        let op = match self.peek() {
            TokenKind::Minus => UnaryOp::Neg,
            TokenKind::Bang => UnaryOp::Not,
            _ => return self.parse_postfix(),
        };
        let start = self.current_span();
        self.advance();
        let operand = self.parse_unary()?;
        let span = start.merge(&operand.span);
        Some(Expr::new(
            ExprKind::Unary {
                op,
                operand: Box::new(operand),
            },
            span,
        ))
    }

    /// Postfix chains: field access, method calls, and array indexing.
    fn parse_postfix(&mut self) -> Option<Expr> {
        let mut expr = self.parse_primary()?;
        loop {
            if self.eat(TokenKind::Dot) {
                let (name, name_span) = {
                    let token = self.expect(TokenKind::Identifier)?;
                    (token.lexeme.clone(), token.span)
                };
                if self.peek() == TokenKind::LeftParen {
                    let args = self.parse_call_args()?;
                    let span = expr.span.merge(&self.previous_span());
                    expr = Expr::new(
                        ExprKind::Call {
                            receiver: Some(Box::new(expr)),
                            name,
                            name_span,
                            args,
                        },
                        span,
                    );
                } else {
                    let span = expr.span.merge(&name_span);
                    expr = Expr::new(
                        ExprKind::FieldAccess {
                            base: Box::new(expr),
                            field: name,
                            field_span: name_span,
                        },
                        span,
                    );
                }
            } else if self.eat(TokenKind::LeftBracket) {
                let index = self.parse_expression()?;
                self.expect(TokenKind::RightBracket)?;
                let span = expr.span.merge(&self.previous_span());
                expr = Expr::new(
                    ExprKind::Index {
                        base: Box::new(expr),
                        index: Box::new(index),
                    },
                    span,
                );
            } else {
                break;
            }
        }
        Some(expr)
    }

    fn parse_primary(&mut self) -> Option<Expr> {
        let span = self.current_span();
        match self.peek() {
            TokenKind::IntLiteral => {
                let lexeme = self.advance().lexeme.clone();
                let value = self.parse_int_lexeme(&lexeme, span);
                Some(Expr::new(ExprKind::IntConstant(value), span))
            }
            TokenKind::DoubleLiteral => {
                let lexeme = self.advance().lexeme.clone();
                let value = self.parse_double_lexeme(&lexeme, span);
                Some(Expr::new(ExprKind::DoubleConstant(value), span))
            }
            TokenKind::BoolLiteral => {
                let lexeme = self.advance().lexeme.clone();
                Some(Expr::new(ExprKind::BoolConstant(lexeme == "true"), span))
            }
            TokenKind::StringLiteral => {
                let lexeme = self.advance().lexeme.clone();
                Some(Expr::new(ExprKind::StringConstant(lexeme), span))
            }
            TokenKind::Null => {
                self.advance();
                Some(Expr::new(ExprKind::Null, span))
            }
            TokenKind::This => {
                self.advance();
                Some(Expr::new(ExprKind::This, span))
            }
            TokenKind::LeftParen => {
                self.advance();
                let inner = self.parse_expression()?;
                self.expect(TokenKind::RightParen)?;
                Some(inner)
            }
            TokenKind::ReadInteger => {
                self.advance();
                self.expect(TokenKind::LeftParen)?;
                self.expect(TokenKind::RightParen)?;
                Some(Expr::new(ExprKind::ReadInteger, span))
            }
            TokenKind::ReadLine => {
                self.advance();
                self.expect(TokenKind::LeftParen)?;
                self.expect(TokenKind::RightParen)?;
                Some(Expr::new(ExprKind::ReadLine, span))
            }
            TokenKind::New => {
                self.advance();
                let name_token = self.expect(TokenKind::Identifier)?;
                let class_name = name_token.lexeme.clone();
                let full_span = span.merge(&self.previous_span());
                Some(Expr::new(ExprKind::New { class_name }, full_span))
            }
            TokenKind::NewArray => {
                self.advance();
                self.expect(TokenKind::LeftParen)?;
                let size = self.parse_expression()?;
                self.expect(TokenKind::Comma)?;
                let elem = self.parse_type()?;
                self.expect(TokenKind::RightParen)?;
                let full_span = span.merge(&self.previous_span());
                Some(Expr::new(
                    ExprKind::NewArray {
                        size: Box::new(size),
                        elem,
                    },
                    full_span,
                ))
            }
            TokenKind::Identifier => {
                let (name, name_span) = {
                    let token = self.advance();
                    (token.lexeme.clone(), token.span)
                };
                if self.peek() == TokenKind::LeftParen {
                    let args = self.parse_call_args()?;
                    let full_span = name_span.merge(&self.previous_span());
                    Some(Expr::new(
                        ExprKind::Call {
                            receiver: None,
                            name,
                            name_span,
                            args,
                        },
                        full_span,
                    ))
                } else {
                    Some(Expr::new(ExprKind::Ident(name), name_span))
                }
            }
            other => {
                self.report(
                    format!("*** Expected an expression, found {:?}", other),
                    span,
                );
                None
            }
        }
    }

    /// `( expr, expr, ... )`
    fn parse_call_args(&mut self) -> Option<Vec<Expr>> {
        self.expect(TokenKind::LeftParen)?;
        let mut args = Vec::new();
        if self.peek() != TokenKind::RightParen {
            loop {
                args.push(self.parse_expression()?);
                if !self.eat(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(TokenKind::RightParen)?;
        Some(args)
    }

    // ------------------------------------------------------------------
    // Literal conversion
    // ------------------------------------------------------------------

    /// Convert an integer lexeme (decimal or `0x` hex) to its value.
    pub(super) fn parse_int_lexeme(&mut self, lexeme: &str, span: Span) -> i64 {
        let parsed = if let Some(hex) = lexeme
            .strip_prefix("0x")
            .or_else(|| lexeme.strip_prefix("0X"))
        {
            i64::from_str_radix(hex, 16)
        } else {
            lexeme.parse::<i64>()
        };
        match parsed {
            Ok(value) => value,
            Err(_) => {
                self.report(
                    format!("*** Integer constant out of range: {}", lexeme),
                    span,
                );
                0
            }
        }
    }

    /// Convert a double lexeme to its value. The scanner guarantees the
    /// shape `digits '.' digits* (exp)?`; a bare trailing dot before an
    /// exponent is normalized for `f64::from_str`.
    fn parse_double_lexeme(&mut self, lexeme: &str, span: Span) -> f64 {
        let normalized = lexeme
            .replace(".e", ".0e")
            .replace(".E", ".0E");
        match normalized.parse::<f64>() {
            Ok(value) => value,
            Err(_) => {
                self.report(
                    format!("*** Malformed double constant: {}", lexeme),
                    span,
                );
                0.0
            }
        }
    }
}

fn binary(op: BinaryOp, left: Expr, right: Expr) -> Expr {
    let span = left.span.merge(&right.span);
    Expr::new(
        ExprKind::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        },
        span,
    )
}
