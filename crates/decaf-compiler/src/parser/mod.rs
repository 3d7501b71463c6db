mod declarations;
mod expressions;
mod statements;

use decaf_common::{DiagnosticBag, DiagnosticKind, Span};

use crate::ast::nodes::{Program, ScopeCell};
use crate::lexer::token::{Token, TokenKind};

/// Recursive descent parser for the Decaf language.
///
/// Expressions use precedence climbing; error recovery skips to the next
/// statement or declaration boundary.
///
/// All token access goes through `lookahead(n)`, which clamps past-the-end
/// reads to the trailing `Eof` token, so no helper ever has to bounds-check.
pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    diagnostics: DiagnosticBag,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        assert!(!tokens.is_empty(), "token stream always ends in Eof");
        Self {
            tokens,
            pos: 0,
            diagnostics: DiagnosticBag::new(),
        }
    }

    /// Parse the entire token stream into a Program.
    pub fn parse(mut self) -> (Program, DiagnosticBag) {
        let mut decls = Vec::new();
        let start = self.current_span();

        while !self.is_at_end() {
            match self.parse_declaration() {
                Some(decl) => decls.push(decl),
                None => self.synchronize(),
            }
        }

        let span = start.merge(&self.current_span());
        let program = Program {
            decls,
            span,
            scope: ScopeCell::default(),
        };
        (program, self.diagnostics)
    }

    // ========================================================================
    // Token access
    // ========================================================================

    /// The token `n` positions past the current one, clamped to `Eof`.
    pub(super) fn lookahead(&self, n: usize) -> &Token {
        let clamped = (self.pos + n).min(self.tokens.len() - 1);
        &self.tokens[clamped]
    }

    /// The kind `n` positions ahead.
    pub(super) fn peek_at(&self, n: usize) -> TokenKind {
        self.lookahead(n).kind
    }

    /// The current token's kind.
    pub(super) fn peek(&self) -> TokenKind {
        self.peek_at(0)
    }

    pub(super) fn is_at_end(&self) -> bool {
        self.peek() == TokenKind::Eof
    }

    /// Span of the current token.
    pub(super) fn current_span(&self) -> Span {
        self.lookahead(0).span
    }

    /// Span of the token just consumed.
    pub(super) fn previous_span(&self) -> Span {
        self.tokens[self.pos.saturating_sub(1)].span
    }

    /// Consume the current token and hand it back. `Eof` is sticky: it is
    /// returned without moving.
    pub(super) fn advance(&mut self) -> &Token {
        let at = self.pos.min(self.tokens.len() - 1);
        if self.tokens[at].kind != TokenKind::Eof {
            self.pos += 1;
        }
        &self.tokens[at]
    }

    /// Consume one token when it has the given kind.
    pub(super) fn eat(&mut self, kind: TokenKind) -> bool {
        if self.peek() != kind {
            return false;
        }
        self.advance();
        true
    }

    /// Require a token of the given kind; on mismatch, report and yield
    /// `None` so the caller can bail into recovery.
    pub(super) fn expect(&mut self, kind: TokenKind) -> Option<&Token> {
        if self.peek() != kind {
            let span = self.current_span();
            self.report(
                format!("*** Expected {:?}, found {:?}", kind, self.peek()),
                span,
            );
            return None;
        }
        Some(self.advance())
    }

    pub(super) fn report(&mut self, message: impl Into<String>, span: Span) {
        self.diagnostics.report(
            decaf_common::Diagnostic::error(message)
                .with_kind(DiagnosticKind::Syntax)
                .with_span(span),
        );
    }

    // ========================================================================
    // Error recovery
    // ========================================================================

    /// Drop tokens until just past a `;` or just before something that can
    /// begin a new declaration or statement. The offending token itself is
    /// always dropped so recovery cannot loop in place.
    pub(super) fn synchronize(&mut self) {
        self.advance();
        while !self.is_at_end() {
            if self.eat(TokenKind::Semicolon) {
                return;
            }
            if Self::is_recovery_point(self.peek()) {
                return;
            }
            self.advance();
        }
    }

    /// Tokens that can begin a declaration or statement, plus the closing
    /// brace that ends the enclosing body.
    fn is_recovery_point(kind: TokenKind) -> bool {
        matches!(
            kind,
            TokenKind::Class
                | TokenKind::Interface
                | TokenKind::Void
                | TokenKind::Int
                | TokenKind::Double
                | TokenKind::Bool
                | TokenKind::String
                | TokenKind::If
                | TokenKind::While
                | TokenKind::For
                | TokenKind::Return
                | TokenKind::Break
                | TokenKind::Print
                | TokenKind::Switch
                | TokenKind::RightBrace
        )
    }
}
