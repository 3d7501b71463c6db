use decaf_common::{DiagnosticBag, DiagnosticKind, Position};

use super::cursor::Cursor;
use super::token::{Token, TokenKind};

/// Identifiers longer than this are truncated, with a warning.
const MAX_IDENTIFIER_LEN: usize = 31;

/// Hand-written lexer for the Decaf language.
///
/// Supports decimal and hex integers, doubles with optional exponent,
/// single- or double-quoted single-line strings, line and block comments.
pub struct Lexer<'src> {
    cursor: Cursor<'src>,
    diagnostics: DiagnosticBag,
}

impl<'src> Lexer<'src> {
    pub fn new(source: &'src str) -> Self {
        Self {
            cursor: Cursor::new(source),
            diagnostics: DiagnosticBag::new(),
        }
    }

    /// Tokenize the entire source, returning all tokens and diagnostics.
    pub fn tokenize(mut self) -> (Vec<Token>, DiagnosticBag) {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token();
            let is_eof = token.kind == TokenKind::Eof;
            tokens.push(token);
            if is_eof {
                break;
            }
        }
        (tokens, self.diagnostics)
    }

    /// Scan the next token.
    fn next_token(&mut self) -> Token {
        self.skip_whitespace_and_comments();

        if self.cursor.is_eof() {
            let pos = self.cursor.position();
            return Token::eof(self.cursor.span_from(pos));
        }

        let start = self.cursor.position();
        let ch = match self.cursor.bump() {
            Some(c) => c,
            None => return Token::eof(self.cursor.span_from(start)),
        };

        match ch {
            // === Delimiters ===
            '(' => self.make_token(TokenKind::LeftParen, start),
            ')' => self.make_token(TokenKind::RightParen, start),
            '{' => self.make_token(TokenKind::LeftBrace, start),
            '}' => self.make_token(TokenKind::RightBrace, start),
            '[' => self.make_token(TokenKind::LeftBracket, start),
            ']' => self.make_token(TokenKind::RightBracket, start),
            ',' => self.make_token(TokenKind::Comma, start),
            ';' => self.make_token(TokenKind::Semicolon, start),
            '.' => self.make_token(TokenKind::Dot, start),
            ':' => self.make_token(TokenKind::Colon, start),

            // === Operators ===
            '+' => self.make_token(TokenKind::Plus, start),
            '-' => self.make_token(TokenKind::Minus, start),
            '*' => self.make_token(TokenKind::Star, start),
            '/' => self.make_token(TokenKind::Slash, start),
            '%' => self.make_token(TokenKind::Percent, start),
            '=' => {
                if self.cursor.bump_if('=') {
                    self.make_token(TokenKind::EqualEqual, start)
                } else {
                    self.make_token(TokenKind::Equal, start)
                }
            }
            '!' => {
                if self.cursor.bump_if('=') {
                    self.make_token(TokenKind::BangEqual, start)
                } else {
                    self.make_token(TokenKind::Bang, start)
                }
            }
            '<' => {
                if self.cursor.bump_if('=') {
                    self.make_token(TokenKind::LessEqual, start)
                } else {
                    self.make_token(TokenKind::Less, start)
                }
            }
            '>' => {
                if self.cursor.bump_if('=') {
                    self.make_token(TokenKind::GreaterEqual, start)
                } else {
                    self.make_token(TokenKind::Greater, start)
                }
            }
            '&' => {
                if self.cursor.bump_if('&') {
                    self.make_token(TokenKind::AmpAmp, start)
                } else {
                    let span = self.cursor.span_from(start);
                    self.diagnostics.report(
                        decaf_common::Diagnostic::error("*** Unrecognized char: '&'")
                            .with_kind(DiagnosticKind::Lexical)
                            .with_span(span),
                    );
                    self.make_token(TokenKind::AmpAmp, start)
                }
            }
            '|' => {
                if self.cursor.bump_if('|') {
                    self.make_token(TokenKind::PipePipe, start)
                } else {
                    let span = self.cursor.span_from(start);
                    self.diagnostics.report(
                        decaf_common::Diagnostic::error("*** Unrecognized char: '|'")
                            .with_kind(DiagnosticKind::Lexical)
                            .with_span(span),
                    );
                    self.make_token(TokenKind::PipePipe, start)
                }
            }

            // === String literals ===
            '\'' | '"' => self.scan_string(start, ch),

            // === Number literals ===
            c if c.is_ascii_digit() => self.scan_number(start, c),

            // === Identifiers and keywords ===
            c if is_ident_start(c) => self.scan_identifier(start),

            _ => {
                let span = self.cursor.span_from(start);
                self.diagnostics.report(
                    decaf_common::Diagnostic::error(format!("*** Unrecognized char: '{}'", ch))
                        .with_kind(DiagnosticKind::Lexical)
                        .with_span(span),
                );
                // Skip the offending character and continue.
                self.next_token()
            }
        }
    }

    fn make_token(&self, kind: TokenKind, start: Position) -> Token {
        let lexeme = self.cursor.taken_since(start.offset);
        Token::new(kind, lexeme, self.cursor.span_from(start))
    }

    // ---------------------------------------------------------------
    // Whitespace & comments
    // ---------------------------------------------------------------

    fn skip_whitespace_and_comments(&mut self) {
        loop {
            self.cursor.bump_while(|c| c.is_ascii_whitespace());

            if self.cursor.peek() == Some('/') {
                match self.cursor.peek_at(1) {
                    Some('/') => {
                        self.cursor.bump();
                        self.cursor.bump();
                        self.cursor.bump_while(|c| c != '\n');
                        continue;
                    }
                    Some('*') => {
                        let start = self.cursor.position();
                        self.cursor.bump();
                        self.cursor.bump();
                        self.skip_block_comment(start);
                        continue;
                    }
                    _ => {}
                }
            }

            break;
        }
    }

    /// Skip a (non-nesting) block comment. `start` is the position of `/*`.
    fn skip_block_comment(&mut self, start: Position) {
        loop {
            match self.cursor.bump() {
                Some('*') if self.cursor.peek() == Some('/') => {
                    self.cursor.bump();
                    return;
                }
                Some(_) => {}
                None => {
                    let span = self.cursor.span_from(start);
                    self.diagnostics.report(
                        decaf_common::Diagnostic::error("*** Input ends with unterminated comment")
                            .with_kind(DiagnosticKind::Lexical)
                            .with_span(span),
                    );
                    return;
                }
            }
        }
    }

    // ---------------------------------------------------------------
    // String scanning
    // ---------------------------------------------------------------

    /// Scan a string literal after the opening quote has been consumed.
    ///
    /// Strings are single-line. The opposite quote character is not allowed
    /// inside the literal; scanning continues to the closing quote so a
    /// single bad character yields a single diagnostic.
    fn scan_string(&mut self, start: Position, quote: char) -> Token {
        let other_quote = if quote == '"' { '\'' } else { '"' };
        let mut value = String::new();
        let mut reported_other = false;

        loop {
            match self.cursor.peek() {
                Some(c) if c == quote => {
                    self.cursor.bump();
                    let span = self.cursor.span_from(start);
                    return Token::new(TokenKind::StringLiteral, value, span);
                }
                Some('\n') | None => {
                    let span = self.cursor.span_from(start);
                    self.diagnostics.report(
                        decaf_common::Diagnostic::error(format!(
                            "*** Unterminated string constant: {}{}",
                            quote, value
                        ))
                        .with_kind(DiagnosticKind::Lexical)
                        .with_span(span),
                    );
                    return Token::new(TokenKind::StringLiteral, value, span);
                }
                Some(c) if c == other_quote => {
                    if !reported_other {
                        let pos = self.cursor.position();
                        self.cursor.bump();
                        let span = self.cursor.span_from(pos);
                        self.diagnostics.report(
                            decaf_common::Diagnostic::error(format!(
                                "*** Illegal quote character in string constant: {}",
                                other_quote
                            ))
                            .with_kind(DiagnosticKind::Lexical)
                            .with_span(span),
                        );
                        reported_other = true;
                    } else {
                        self.cursor.bump();
                    }
                    value.push(c);
                }
                Some(c) => {
                    self.cursor.bump();
                    value.push(c);
                }
            }
        }
    }

    // ---------------------------------------------------------------
    // Number scanning
    // ---------------------------------------------------------------

    /// Scan a number literal: decimal or `0x` hex integer, or a double
    /// (`digits '.' digits*` with optional exponent).
    fn scan_number(&mut self, start: Position, first: char) -> Token {
        // Hex integer
        if first == '0' && matches!(self.cursor.peek(), Some('x') | Some('X')) {
            // Only commit to hex when a hex digit actually follows; `0x` on
            // its own lexes as `0` followed by the identifier `x`.
            if self
                .cursor
                .peek_at(1)
                .is_some_and(|c| c.is_ascii_hexdigit())
            {
                self.cursor.bump();
                self.cursor.bump_while(|c| c.is_ascii_hexdigit());
                return self.make_token(TokenKind::IntLiteral, start);
            }
            return self.make_token(TokenKind::IntLiteral, start);
        }

        self.cursor.bump_while(|c| c.is_ascii_digit());

        // A '.' makes this a double; the fraction digits are optional.
        if self.cursor.peek() == Some('.') {
            self.cursor.bump();
            self.cursor.bump_while(|c| c.is_ascii_digit());

            // Exponent is only consumed when a digit actually follows
            // (`12.0E` is the double 12.0 followed by the identifier E).
            let has_exponent = matches!(self.cursor.peek(), Some('e') | Some('E'))
                && match self.cursor.peek_at(1) {
                    Some(c) if c.is_ascii_digit() => true,
                    Some('+') | Some('-') => self
                        .cursor
                        .peek_at(2)
                        .is_some_and(|c| c.is_ascii_digit()),
                    _ => false,
                };
            if has_exponent {
                self.cursor.bump(); // e/E
                if matches!(self.cursor.peek(), Some('+') | Some('-')) {
                    self.cursor.bump();
                }
                self.cursor.bump_while(|c| c.is_ascii_digit());
            }

            return self.make_token(TokenKind::DoubleLiteral, start);
        }

        self.make_token(TokenKind::IntLiteral, start)
    }

    // ---------------------------------------------------------------
    // Identifier / keyword scanning
    // ---------------------------------------------------------------

    fn scan_identifier(&mut self, start: Position) -> Token {
        self.cursor.bump_while(is_ident_continue);
        let lexeme = self.cursor.taken_since(start.offset);
        let span = self.cursor.span_from(start);

        if let Some(kind) = TokenKind::keyword_from_str(lexeme) {
            return Token::new(kind, lexeme, span);
        }
        if lexeme == "true" || lexeme == "false" {
            return Token::new(TokenKind::BoolLiteral, lexeme, span);
        }

        if lexeme.len() > MAX_IDENTIFIER_LEN {
            self.diagnostics.report(
                decaf_common::Diagnostic::warning(format!(
                    "*** Identifier too long: \"{}\"",
                    lexeme
                ))
                .with_kind(DiagnosticKind::Lexical)
                .with_span(span),
            );
            let truncated = &lexeme[..MAX_IDENTIFIER_LEN];
            return Token::new(TokenKind::Identifier, truncated, span);
        }

        Token::new(TokenKind::Identifier, lexeme, span)
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic()
}

fn is_ident_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(source: &str) -> (Vec<Token>, DiagnosticBag) {
        Lexer::new(source).tokenize()
    }

    fn kinds(source: &str) -> Vec<TokenKind> {
        lex(source).0.iter().map(|t| t.kind).collect()
    }

    #[test]
    fn keywords_and_identifiers() {
        assert_eq!(
            kinds("class Shape extends Figure"),
            vec![
                TokenKind::Class,
                TokenKind::Identifier,
                TokenKind::Extends,
                TokenKind::Identifier,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn int_literals() {
        let (tokens, diags) = lex("42 0x2A 0XFF");
        assert!(!diags.has_errors());
        assert_eq!(tokens[0].lexeme, "42");
        assert_eq!(tokens[1].lexeme, "0x2A");
        assert_eq!(tokens[2].lexeme, "0XFF");
        assert!(tokens[..3].iter().all(|t| t.kind == TokenKind::IntLiteral));
    }

    #[test]
    fn double_literals() {
        let (tokens, _) = lex("1.5 12. 0.5E3 2.5e-2");
        assert!(tokens[..4]
            .iter()
            .all(|t| t.kind == TokenKind::DoubleLiteral));
        assert_eq!(tokens[1].lexeme, "12.");
        assert_eq!(tokens[3].lexeme, "2.5e-2");
    }

    #[test]
    fn exponent_needs_digit() {
        // `12.0E` is the double 12.0 followed by the identifier E.
        let (tokens, _) = lex("12.0E");
        assert_eq!(tokens[0].kind, TokenKind::DoubleLiteral);
        assert_eq!(tokens[0].lexeme, "12.0");
        assert_eq!(tokens[1].kind, TokenKind::Identifier);
    }

    #[test]
    fn bool_literals() {
        let (tokens, _) = lex("true false");
        assert_eq!(tokens[0].kind, TokenKind::BoolLiteral);
        assert_eq!(tokens[1].kind, TokenKind::BoolLiteral);
    }

    #[test]
    fn strings_both_quotes() {
        let (tokens, diags) = lex("\"hello\" 'world'");
        assert!(!diags.has_errors());
        assert_eq!(tokens[0].kind, TokenKind::StringLiteral);
        assert_eq!(tokens[0].lexeme, "hello");
        assert_eq!(tokens[1].lexeme, "world");
    }

    #[test]
    fn unterminated_string() {
        let (_, diags) = lex("\"no closing quote\nint x;");
        assert!(diags.has_errors());
        assert!(diags.diagnostics()[0]
            .message
            .contains("Unterminated string constant"));
    }

    #[test]
    fn unterminated_comment() {
        let (_, diags) = lex("int x; /* trailing");
        assert!(diags.has_errors());
        assert!(diags.diagnostics()[0].message.contains("unterminated comment"));
    }

    #[test]
    fn identifier_truncated_to_31_chars() {
        let long = "a".repeat(40);
        let (tokens, diags) = lex(&long);
        assert_eq!(tokens[0].kind, TokenKind::Identifier);
        assert_eq!(tokens[0].lexeme.len(), 31);
        assert!(!diags.has_errors()); // warning, not error
        assert_eq!(diags.len(), 1);
    }

    #[test]
    fn operators() {
        assert_eq!(
            kinds("<= >= == != && || !"),
            vec![
                TokenKind::LessEqual,
                TokenKind::GreaterEqual,
                TokenKind::EqualEqual,
                TokenKind::BangEqual,
                TokenKind::AmpAmp,
                TokenKind::PipePipe,
                TokenKind::Bang,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn comments_are_skipped() {
        assert_eq!(
            kinds("int /* inline */ x; // trailing\n"),
            vec![
                TokenKind::Int,
                TokenKind::Identifier,
                TokenKind::Semicolon,
                TokenKind::Eof,
            ]
        );
    }
}
