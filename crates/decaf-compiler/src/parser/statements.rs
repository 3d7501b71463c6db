use crate::ast::nodes::*;
use crate::lexer::token::TokenKind;

use super::Parser;

impl Parser {
    /// Parse a statement within a block.
    pub(super) fn parse_statement(&mut self) -> Option<Stmt> {
        match self.peek() {
            TokenKind::LeftBrace => Some(Stmt::Block(self.parse_stmt_block()?)),
            TokenKind::If => self.parse_if_stmt(),
            TokenKind::While => self.parse_while_stmt(),
            TokenKind::For => self.parse_for_stmt(),
            TokenKind::Return => self.parse_return_stmt(),
            TokenKind::Break => self.parse_break_stmt(),
            TokenKind::Print => self.parse_print_stmt(),
            TokenKind::Switch => self.parse_switch_stmt(),
            TokenKind::Semicolon => {
                self.advance();
                Some(Stmt::Empty)
            }
            _ => self.parse_expr_stmt(),
        }
    }

    /// Parse `{ decls-and-stmts }`. Variable declarations may appear
    /// anywhere in the block; they are gathered into the block's
    /// declaration list.
    pub(super) fn parse_stmt_block(&mut self) -> Option<StmtBlock> {
        let start = self.current_span();
        self.expect(TokenKind::LeftBrace)?;

        let mut decls = Vec::new();
        let mut stmts = Vec::new();

        while self.peek() != TokenKind::RightBrace && !self.is_at_end() {
            if self.at_var_decl() {
                match self.parse_var_decl() {
                    Some(decl) => {
                        if self.expect(TokenKind::Semicolon).is_none() {
                            self.synchronize();
                        }
                        decls.push(decl);
                    }
                    None => self.synchronize(),
                }
            } else {
                match self.parse_statement() {
                    Some(stmt) => stmts.push(stmt),
                    None => self.synchronize(),
                }
            }
        }

        self.expect(TokenKind::RightBrace)?;
        let span = start.merge(&self.previous_span());
        Some(StmtBlock {
            decls,
            stmts,
            span,
            scope: ScopeCell::default(),
        })
    }

    /// Lookahead for a variable declaration at the current position:
    /// a primitive type keyword, `Ident Ident`, or `Ident [ ]`.
    fn at_var_decl(&self) -> bool {
        if self.peek().starts_type() {
            return true;
        }
        self.peek() == TokenKind::Identifier
            && (self.peek_at(1) == TokenKind::Identifier
                || (self.peek_at(1) == TokenKind::LeftBracket
                    && self.peek_at(2) == TokenKind::RightBracket))
    }

    /// `if (test) stmt (else stmt)?`
    fn parse_if_stmt(&mut self) -> Option<Stmt> {
        let start = self.current_span();
        self.advance(); // consume 'if'

        self.expect(TokenKind::LeftParen)?;
        let test = self.parse_expression()?;
        self.expect(TokenKind::RightParen)?;

        let then_body = Box::new(self.parse_statement()?);
        let else_body = if self.eat(TokenKind::Else) {
            Some(Box::new(self.parse_statement()?))
        } else {
            None
        };

        let span = start.merge(&self.previous_span());
        Some(Stmt::If(IfStmt {
            test,
            then_body,
            else_body,
            span,
            scope: ScopeCell::default(),
        }))
    }

    /// `while (test) stmt`
    fn parse_while_stmt(&mut self) -> Option<Stmt> {
        let start = self.current_span();
        self.advance(); // consume 'while'

        self.expect(TokenKind::LeftParen)?;
        let test = self.parse_expression()?;
        self.expect(TokenKind::RightParen)?;
        let body = Box::new(self.parse_statement()?);

        let span = start.merge(&self.previous_span());
        Some(Stmt::While(WhileStmt {
            test,
            body,
            span,
            scope: ScopeCell::default(),
        }))
    }

    /// `for (init?; test; step?) stmt`
    fn parse_for_stmt(&mut self) -> Option<Stmt> {
        let start = self.current_span();
        self.advance(); // consume 'for'

        self.expect(TokenKind::LeftParen)?;
        let init = if self.peek() != TokenKind::Semicolon {
            Some(self.parse_expression()?)
        } else {
            None
        };
        self.expect(TokenKind::Semicolon)?;
        let test = self.parse_expression()?;
        self.expect(TokenKind::Semicolon)?;
        let step = if self.peek() != TokenKind::RightParen {
            Some(self.parse_expression()?)
        } else {
            None
        };
        self.expect(TokenKind::RightParen)?;
        let body = Box::new(self.parse_statement()?);

        let span = start.merge(&self.previous_span());
        Some(Stmt::For(ForStmt {
            init,
            test,
            step,
            body,
            span,
            scope: ScopeCell::default(),
        }))
    }

    /// `return expr?;`
    fn parse_return_stmt(&mut self) -> Option<Stmt> {
        let start = self.current_span();
        self.advance(); // consume 'return'

        let value = if self.peek() != TokenKind::Semicolon {
            Some(self.parse_expression()?)
        } else {
            None
        };
        self.expect(TokenKind::Semicolon)?;

        let span = start.merge(&self.previous_span());
        Some(Stmt::Return(ReturnStmt {
            value,
            span,
            scope: ScopeCell::default(),
        }))
    }

    /// `break;`
    fn parse_break_stmt(&mut self) -> Option<Stmt> {
        let start = self.current_span();
        self.advance(); // consume 'break'
        self.expect(TokenKind::Semicolon)?;
        let span = start.merge(&self.previous_span());
        Some(Stmt::Break(BreakStmt {
            span,
            scope: ScopeCell::default(),
        }))
    }

    /// `Print(arg1, arg2, ...);`
    fn parse_print_stmt(&mut self) -> Option<Stmt> {
        let start = self.current_span();
        self.advance(); // consume 'Print'

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
        self.expect(TokenKind::Semicolon)?;

        let span = start.merge(&self.previous_span());
        Some(Stmt::Print(PrintStmt {
            args,
            span,
            scope: ScopeCell::default(),
        }))
    }

    /// `switch (subject) { case N: stmts ... default: stmts }`
    fn parse_switch_stmt(&mut self) -> Option<Stmt> {
        let start = self.current_span();
        self.advance(); // consume 'switch'

        self.expect(TokenKind::LeftParen)?;
        let subject = self.parse_expression()?;
        self.expect(TokenKind::RightParen)?;
        self.expect(TokenKind::LeftBrace)?;

        let mut cases = Vec::new();
        let mut default = None;

        while self.peek() != TokenKind::RightBrace && !self.is_at_end() {
            if self.eat(TokenKind::Case) {
                let case_start = self.previous_span();
                let (lexeme, value_span) = {
                    let token = self.expect(TokenKind::IntLiteral)?;
                    (token.lexeme.clone(), token.span)
                };
                let value = self.parse_int_lexeme(&lexeme, value_span);
                self.expect(TokenKind::Colon)?;
                let body = self.parse_case_body();
                let span = case_start.merge(&self.previous_span());
                cases.push(CaseStmt {
                    value,
                    body,
                    span,
                    scope: ScopeCell::default(),
                });
            } else if self.eat(TokenKind::Default) {
                self.expect(TokenKind::Colon)?;
                default = Some(self.parse_case_body());
            } else {
                let span = self.current_span();
                self.report(
                    format!("*** Expected 'case' or 'default', found {:?}", self.peek()),
                    span,
                );
                self.synchronize();
            }
        }
        self.expect(TokenKind::RightBrace)?;

        let span = start.merge(&self.previous_span());
        Some(Stmt::Switch(SwitchStmt {
            subject,
            cases,
            default,
            span,
            scope: ScopeCell::default(),
        }))
    }

    /// Statements up to the next `case`/`default`/`}`.
    fn parse_case_body(&mut self) -> Vec<Stmt> {
        let mut body = Vec::new();
        while !matches!(
            self.peek(),
            TokenKind::Case | TokenKind::Default | TokenKind::RightBrace | TokenKind::Eof
        ) {
            match self.parse_statement() {
                Some(stmt) => body.push(stmt),
                None => self.synchronize(),
            }
        }
        body
    }

    /// `expr;`
    fn parse_expr_stmt(&mut self) -> Option<Stmt> {
        let expr = self.parse_expression()?;
        self.expect(TokenKind::Semicolon)?;
        Some(Stmt::Expr(expr))
    }
}
