use crate::ast::nodes::*;
use crate::ast::types::{TypeAnnotation, TypeKind};
use crate::lexer::token::TokenKind;

use super::Parser;

impl Parser {
    /// Parse a top-level declaration: variable, function, class, or
    /// interface.
    pub(super) fn parse_declaration(&mut self) -> Option<Decl> {
        match self.peek() {
            TokenKind::Class => self.parse_class_decl(),
            TokenKind::Interface => self.parse_interface_decl(),
            TokenKind::Void => self.parse_fn_decl_with_return(self.void_annotation()),
            _ => self.parse_var_or_fn_decl(),
        }
    }

    /// A declaration starting with a type: `Type name;` or
    /// `Type name(formals) { ... }`.
    fn parse_var_or_fn_decl(&mut self) -> Option<Decl> {
        let ty = self.parse_type()?;
        if self.peek() == TokenKind::Identifier && self.peek_at(1) == TokenKind::LeftParen {
            return self.parse_fn_decl_with_return(ty);
        }
        let var = self.parse_var_decl_after_type(ty)?;
        self.expect(TokenKind::Semicolon)?;
        Some(Decl::Var(var))
    }

    /// `Type name` (no trailing semicolon), for formals and fields.
    fn parse_var_decl_after_type(&mut self, ty: TypeAnnotation) -> Option<VarDecl> {
        let name_token = self.expect(TokenKind::Identifier)?;
        let name = name_token.lexeme.clone();
        let span = ty.span.merge(&self.previous_span());
        Some(VarDecl {
            name,
            ty,
            span,
            scope: ScopeCell::default(),
        })
    }

    /// Parse a variable declaration from scratch: `Type name`.
    pub(super) fn parse_var_decl(&mut self) -> Option<VarDecl> {
        let ty = self.parse_type()?;
        self.parse_var_decl_after_type(ty)
    }

    fn parse_fn_decl_with_return(&mut self, return_type: TypeAnnotation) -> Option<Decl> {
        Some(Decl::Fn(self.parse_fn_after_return(return_type, true)?))
    }

    /// Parse the rest of a function after its return type. With
    /// `with_body`, a block body is required; otherwise a `;` ends a
    /// prototype.
    fn parse_fn_after_return(
        &mut self,
        return_type: TypeAnnotation,
        with_body: bool,
    ) -> Option<FnDecl> {
        let start = return_type.span;
        // `void` has no preceding type token to consume for prototypes
        // entered through `parse_declaration`; consume it here if pending.
        if self.peek() == TokenKind::Void {
            self.advance();
        }
        let name_token = self.expect(TokenKind::Identifier)?;
        let name = name_token.lexeme.clone();

        let formals = self.parse_formals()?;

        let body = if with_body {
            Some(self.parse_stmt_block()?)
        } else {
            self.expect(TokenKind::Semicolon)?;
            None
        };

        let span = start.merge(&self.previous_span());
        Some(FnDecl {
            name,
            return_type,
            formals,
            body,
            span,
            scope: ScopeCell::default(),
        })
    }

    /// `( Type name, Type name, ... )`
    fn parse_formals(&mut self) -> Option<Vec<VarDecl>> {
        self.expect(TokenKind::LeftParen)?;
        let mut formals = Vec::new();
        if self.peek() != TokenKind::RightParen {
            loop {
                formals.push(self.parse_var_decl()?);
                if !self.eat(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(TokenKind::RightParen)?;
        Some(formals)
    }

    /// `class Name (extends Base)? (implements I1, I2)? { fields }`
    fn parse_class_decl(&mut self) -> Option<Decl> {
        let start = self.current_span();
        self.advance(); // consume 'class'

        let name_token = self.expect(TokenKind::Identifier)?;
        let name = name_token.lexeme.clone();

        let extends = if self.eat(TokenKind::Extends) {
            let base = self.expect(TokenKind::Identifier)?;
            Some(NamedTypeRef {
                name: base.lexeme.clone(),
                span: base.span,
            })
        } else {
            None
        };

        let mut implements = Vec::new();
        if self.eat(TokenKind::Implements) {
            loop {
                let iface = self.expect(TokenKind::Identifier)?;
                implements.push(NamedTypeRef {
                    name: iface.lexeme.clone(),
                    span: iface.span,
                });
                if !self.eat(TokenKind::Comma) {
                    break;
                }
            }
        }

        self.expect(TokenKind::LeftBrace)?;
        let mut members = Vec::new();
        while self.peek() != TokenKind::RightBrace && !self.is_at_end() {
            match self.parse_field() {
                Some(member) => members.push(member),
                None => self.synchronize(),
            }
        }
        self.expect(TokenKind::RightBrace)?;

        let span = start.merge(&self.previous_span());
        Some(Decl::Class(ClassDecl {
            name,
            extends,
            implements,
            members,
            span,
            scope: ScopeCell::default(),
        }))
    }

    /// A class member: field (`Type name;`) or method.
    fn parse_field(&mut self) -> Option<Decl> {
        if self.peek() == TokenKind::Void {
            return self.parse_fn_decl_with_return(self.void_annotation());
        }
        self.parse_var_or_fn_decl()
    }

    /// `interface Name { prototypes }`
    fn parse_interface_decl(&mut self) -> Option<Decl> {
        let start = self.current_span();
        self.advance(); // consume 'interface'

        let name_token = self.expect(TokenKind::Identifier)?;
        let name = name_token.lexeme.clone();

        self.expect(TokenKind::LeftBrace)?;
        let mut members = Vec::new();
        while self.peek() != TokenKind::RightBrace && !self.is_at_end() {
            match self.parse_prototype() {
                Some(proto) => members.push(proto),
                None => self.synchronize(),
            }
        }
        self.expect(TokenKind::RightBrace)?;

        let span = start.merge(&self.previous_span());
        Some(Decl::Interface(InterfaceDecl {
            name,
            members,
            span,
            scope: ScopeCell::default(),
        }))
    }

    /// `(void | Type) name(formals);`
    fn parse_prototype(&mut self) -> Option<FnDecl> {
        let return_type = if self.peek() == TokenKind::Void {
            self.void_annotation()
        } else {
            self.parse_type()?
        };
        self.parse_fn_after_return(return_type, false)
    }

    // ------------------------------------------------------------------
    // Types
    // ------------------------------------------------------------------

    /// `int | double | bool | string | Ident`, each optionally followed by
    /// any number of `[]` suffixes.
    pub(super) fn parse_type(&mut self) -> Option<TypeAnnotation> {
        let start = self.current_span();
        let base_kind = match self.peek() {
            TokenKind::Int => TypeKind::Int,
            TokenKind::Double => TypeKind::Double,
            TokenKind::Bool => TypeKind::Bool,
            TokenKind::String => TypeKind::String,
            TokenKind::Identifier => TypeKind::Named(self.lookahead(0).lexeme.clone()),
            other => {
                let span = self.current_span();
                self.report(format!("*** Expected a type, found {:?}", other), span);
                return None;
            }
        };
        self.advance();

        let mut annotation = TypeAnnotation::new(base_kind, start.merge(&self.previous_span()));
        while self.peek() == TokenKind::LeftBracket && self.peek_at(1) == TokenKind::RightBracket {
            self.advance();
            self.advance();
            let span = start.merge(&self.previous_span());
            annotation = TypeAnnotation::new(TypeKind::Array(Box::new(annotation)), span);
        }
        Some(annotation)
    }

    /// A `void` annotation at the current token (not consumed).
    fn void_annotation(&self) -> TypeAnnotation {
        TypeAnnotation::new(TypeKind::Void, self.current_span())
    }
}

#[cfg(test)]
mod tests {
    use crate::ast::nodes::*;
    use crate::ast::types::TypeKind;
    use crate::lexer::Lexer;
    use crate::parser::Parser;

    fn parse(source: &str) -> Program {
        let (tokens, lex_diags) = Lexer::new(source).tokenize();
        assert!(
            !lex_diags.has_errors(),
            "lex errors: {:?}",
            lex_diags.diagnostics()
        );
        let (program, parse_diags) = Parser::new(tokens).parse();
        assert!(
            !parse_diags.has_errors(),
            "parse errors: {:?}",
            parse_diags.diagnostics()
        );
        program
    }

    #[test]
    fn parse_global_variable() {
        let prog = parse("int x;");
        match &prog.decls[0] {
            Decl::Var(v) => {
                assert_eq!(v.name, "x");
                assert_eq!(v.ty.kind, TypeKind::Int);
            }
            other => panic!("expected Var, got {:?}", other),
        }
    }

    #[test]
    fn parse_array_type() {
        let prog = parse("int[][] grid;");
        match &prog.decls[0] {
            Decl::Var(v) => match &v.ty.kind {
                TypeKind::Array(inner) => {
                    assert!(matches!(inner.kind, TypeKind::Array(_)));
                }
                other => panic!("expected array type, got {:?}", other),
            },
            other => panic!("expected Var, got {:?}", other),
        }
    }

    #[test]
    fn parse_function_with_formals() {
        let prog = parse("int add(int a, int b) { return a; }");
        match &prog.decls[0] {
            Decl::Fn(f) => {
                assert_eq!(f.name, "add");
                assert_eq!(f.formals.len(), 2);
                assert_eq!(f.return_type.kind, TypeKind::Int);
                assert!(f.body.is_some());
            }
            other => panic!("expected Fn, got {:?}", other),
        }
    }

    #[test]
    fn parse_void_function() {
        let prog = parse("void main() { }");
        match &prog.decls[0] {
            Decl::Fn(f) => {
                assert_eq!(f.name, "main");
                assert_eq!(f.return_type.kind, TypeKind::Void);
            }
            other => panic!("expected Fn, got {:?}", other),
        }
    }

    #[test]
    fn parse_class_with_clauses() {
        let prog = parse(
            "class Circle extends Shape implements Drawable, Scalable { \
               double radius; \
               double area() { return radius; } \
             }",
        );
        match &prog.decls[0] {
            Decl::Class(c) => {
                assert_eq!(c.name, "Circle");
                assert_eq!(c.extends.as_ref().map(|e| e.name.as_str()), Some("Shape"));
                let ifaces: Vec<_> = c.implements.iter().map(|i| i.name.as_str()).collect();
                assert_eq!(ifaces, vec!["Drawable", "Scalable"]);
                assert_eq!(c.members.len(), 2);
            }
            other => panic!("expected Class, got {:?}", other),
        }
    }

    #[test]
    fn parse_interface_prototypes() {
        let prog = parse("interface Drawable { void draw(); int size(int scale); }");
        match &prog.decls[0] {
            Decl::Interface(i) => {
                assert_eq!(i.name, "Drawable");
                assert_eq!(i.members.len(), 2);
                assert!(i.members.iter().all(|m| m.body.is_none()));
            }
            other => panic!("expected Interface, got {:?}", other),
        }
    }

    #[test]
    fn parse_error_recovers_at_next_declaration() {
        let (tokens, _) = Lexer::new("int 5x; class Ok { }").tokenize();
        let (program, diags) = Parser::new(tokens).parse();
        assert!(diags.has_errors());
        assert!(program
            .decls
            .iter()
            .any(|d| matches!(d, Decl::Class(c) if c.name == "Ok")));
    }
}
