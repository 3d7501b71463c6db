use decaf_common::{Diagnostic, DiagnosticBag, DiagnosticKind};

use crate::ast::nodes::*;
use crate::ast::types::{TypeAnnotation, TypeKind};

use super::scope::{ScopeId, ScopeTree};
use super::symbols::Symbol;
use super::types::Type;

/// Final pass: walk the tree computing and checking types.
///
/// Expression typing happens in `Expr::type_of`, which carries its errors
/// inside `Type::Error`; this walker unpacks those at each statement-level
/// consumption point and adds the statement- and declaration-level checks
/// (test expressions, returns, breaks, print arguments, type existence).
pub struct TypeChecker<'a> {
    scopes: &'a ScopeTree,
    diagnostics: &'a mut DiagnosticBag,
    /// Declared return types of the enclosing functions, innermost last.
    return_stack: Vec<Type>,
}

impl<'a> TypeChecker<'a> {
    pub fn new(scopes: &'a ScopeTree, diagnostics: &'a mut DiagnosticBag) -> Self {
        Self {
            scopes,
            diagnostics,
            return_stack: Vec::new(),
        }
    }

    pub fn check(mut self, program: &Program) {
        for decl in &program.decls {
            self.check_decl(decl);
        }
    }

    fn check_decl(&mut self, decl: &Decl) {
        match decl {
            Decl::Var(v) => {
                self.check_type_exists(scope_of(&v.scope), &v.ty, "type");
            }
            Decl::Fn(f) => self.check_fn(f),
            Decl::Class(c) => {
                for member in &c.members {
                    self.check_decl(member);
                }
            }
            Decl::Interface(i) => {
                for method in &i.members {
                    self.check_fn(method);
                }
            }
        }
    }

    fn check_fn(&mut self, f: &FnDecl) {
        let formals_scope = scope_of(&f.scope);
        self.check_type_exists(formals_scope, &f.return_type, "type");
        for formal in &f.formals {
            self.check_type_exists(scope_of(&formal.scope), &formal.ty, "type");
        }
        if let Some(ref body) = f.body {
            self.return_stack.push(Type::from_annotation(&f.return_type));
            self.check_block(body);
            self.return_stack.pop();
        }
    }

    fn check_block(&mut self, block: &StmtBlock) {
        for decl in &block.decls {
            self.check_type_exists(scope_of(&decl.scope), &decl.ty, "type");
        }
        for stmt in &block.stmts {
            self.check_stmt(stmt);
        }
    }

    fn check_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Block(block) => self.check_block(block),
            Stmt::If(s) => {
                self.check_test(&s.test);
                self.check_stmt(&s.then_body);
                if let Some(ref else_body) = s.else_body {
                    self.check_stmt(else_body);
                }
            }
            Stmt::While(s) => {
                self.check_test(&s.test);
                self.check_stmt(&s.body);
            }
            Stmt::For(s) => {
                if let Some(ref init) = s.init {
                    self.consume_expr(init);
                }
                self.check_test(&s.test);
                if let Some(ref step) = s.step {
                    self.consume_expr(step);
                }
                self.check_stmt(&s.body);
            }
            Stmt::Return(s) => self.check_return(s),
            Stmt::Break(s) => {
                if !self.scopes.inside_loop(scope_of(&s.scope)) {
                    self.diagnostics.report(
                        Diagnostic::error("*** break is only allowed inside a loop")
                            .with_kind(DiagnosticKind::BreakOutsideLoop)
                            .with_span(s.span),
                    );
                }
            }
            Stmt::Print(s) => self.check_print(s),
            Stmt::Switch(s) => {
                // Only the scrutinee is typed; cases are just traversed.
                self.consume_expr(&s.subject);
                for case in &s.cases {
                    for body_stmt in &case.body {
                        self.check_stmt(body_stmt);
                    }
                }
                if let Some(ref default) = s.default {
                    for body_stmt in default {
                        self.check_stmt(body_stmt);
                    }
                }
            }
            Stmt::Expr(e) => {
                self.consume_expr(e);
            }
            Stmt::Empty => {}
        }
    }

    /// Evaluate an expression for its effects only, unpacking any carried
    /// errors into the diagnostic list.
    fn consume_expr(&mut self, expr: &Expr) -> Type {
        let ty = expr.type_of(self.scopes, scope_of(&expr.scope));
        if let Type::Error(ref inner) = ty {
            for diagnostic in inner {
                self.diagnostics.report(diagnostic.clone());
            }
        }
        ty
    }

    /// An `if`/`while`/`for` test must be boolean.
    fn check_test(&mut self, test: &Expr) {
        let ty = self.consume_expr(test);
        if ty.is_unresolved() {
            return;
        }
        if ty != Type::Bool {
            self.diagnostics.report(
                Diagnostic::error("*** Test expression must have boolean type")
                    .with_kind(DiagnosticKind::InvalidTest)
                    .with_span(test.span),
            );
        }
    }

    fn check_return(&mut self, s: &ReturnStmt) {
        let declared = self
            .return_stack
            .last()
            .cloned()
            .expect("return statement outside any function body");

        match s.value {
            Some(ref value) => {
                let ty = self.consume_expr(value);
                if ty.is_unresolved() {
                    return;
                }
                if !ty.assignable_to(&declared) {
                    self.diagnostics.report(
                        Diagnostic::error(format!(
                            "*** Incompatible return : {} given, {} expected",
                            ty, declared
                        ))
                        .with_kind(DiagnosticKind::IncompatibleReturn)
                        .with_span(s.span),
                    );
                }
            }
            None => {
                if declared != Type::Void {
                    self.diagnostics.report(
                        Diagnostic::error(format!(
                            "*** Incompatible return : void given, {} expected",
                            declared
                        ))
                        .with_kind(DiagnosticKind::IncompatibleReturn)
                        .with_span(s.span),
                    );
                }
            }
        }
    }

    /// Every `Print` argument must be an int, bool, or string.
    fn check_print(&mut self, s: &PrintStmt) {
        for (i, arg) in s.args.iter().enumerate() {
            let ty = self.consume_expr(arg);
            if ty.is_unresolved() {
                continue;
            }
            if !matches!(ty, Type::Int | Type::Bool | Type::String) {
                self.diagnostics.report(
                    Diagnostic::error(format!(
                        "*** Incompatible argument {}: {} given, int/bool/string expected",
                        i + 1,
                        ty
                    ))
                    .with_kind(DiagnosticKind::IncompatibleArgument)
                    .with_span(arg.span),
                );
            }
        }
    }

    /// A named type must resolve to a class or interface declaration;
    /// array types are checked on their element.
    fn check_type_exists(&mut self, scope: ScopeId, annotation: &TypeAnnotation, kind: &str) {
        match &annotation.kind {
            TypeKind::Named(name) => match self.scopes.lookup(scope, name) {
                Some(Symbol::Class(_)) | Some(Symbol::Interface(_)) => {}
                _ => {
                    self.diagnostics.report(
                        Diagnostic::error(format!(
                            "*** No declaration found for {} '{}'",
                            kind, name
                        ))
                        .with_kind(DiagnosticKind::UndeclaredType)
                        .with_span(annotation.span),
                    );
                }
            },
            TypeKind::Array(elem) => self.check_type_exists(scope, elem, kind),
            TypeKind::Void
            | TypeKind::Int
            | TypeKind::Double
            | TypeKind::Bool
            | TypeKind::String => {}
        }
    }
}
