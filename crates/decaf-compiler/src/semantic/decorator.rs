use crate::ast::nodes::*;

use super::scope::{ScopeId, ScopeTree, LOOP_BODY};

/// First pass: attach a scope to every AST node.
///
/// Only a handful of shapes open a new child scope (classes, interfaces,
/// function formals and bodies, nested blocks, if/loop bodies); every other
/// node inherits the scope it appears in. Test expressions of `if`, `for`
/// and `while` are decorated with the *enclosing* scope, not the body's.
pub struct ScopeDecorator<'a> {
    scopes: &'a mut ScopeTree,
}

impl<'a> ScopeDecorator<'a> {
    pub fn new(scopes: &'a mut ScopeTree) -> Self {
        Self { scopes }
    }

    pub fn decorate(mut self, program: &Program) {
        let root = self.scopes.root();
        program.scope.set(Some(root));
        for decl in &program.decls {
            self.decorate_decl(root, decl);
        }
    }

    fn decorate_decl(&mut self, scope: ScopeId, decl: &Decl) {
        match decl {
            Decl::Var(v) => v.scope.set(Some(scope)),
            Decl::Fn(f) => self.decorate_fn(scope, f),
            Decl::Class(c) => {
                let class_scope = self
                    .scopes
                    .child(scope, format!("Class Declaration of {}", c.name));
                c.scope.set(Some(class_scope));
                for member in &c.members {
                    self.decorate_decl(class_scope, member);
                }
            }
            Decl::Interface(i) => {
                let iface_scope = self
                    .scopes
                    .child(scope, format!("Interface Declaration of {}", i.name));
                i.scope.set(Some(iface_scope));
                for method in &i.members {
                    self.decorate_fn(iface_scope, method);
                }
            }
        }
    }

    /// A function opens a formals sub-scope, and its body (when present)
    /// opens a further scope nested inside the formals.
    fn decorate_fn(&mut self, scope: ScopeId, f: &FnDecl) {
        let formals_scope = self
            .scopes
            .child(scope, format!("FnDecl (formals) {}", f.name));
        f.scope.set(Some(formals_scope));
        for formal in &f.formals {
            formal.scope.set(Some(formals_scope));
        }
        if let Some(ref body) = f.body {
            let body_scope = self
                .scopes
                .child(formals_scope, format!("FnDecl (body) {}", f.name));
            self.decorate_block_into(body, body_scope);
        }
    }

    /// Decorate a block's contents directly into `scope` (the block node
    /// itself does not open a further scope).
    fn decorate_block_into(&mut self, block: &StmtBlock, scope: ScopeId) {
        block.scope.set(Some(scope));
        for decl in &block.decls {
            decl.scope.set(Some(scope));
        }
        for stmt in &block.stmts {
            self.decorate_stmt(scope, stmt);
        }
    }

    fn decorate_stmt(&mut self, scope: ScopeId, stmt: &Stmt) {
        match stmt {
            Stmt::Block(block) => {
                let sub = self.scopes.child(scope, "Subblock");
                self.decorate_block_into(block, sub);
            }
            Stmt::If(s) => {
                s.scope.set(Some(scope));
                self.decorate_expr(scope, &s.test);
                let then_scope = self.scopes.child(scope, "Test body");
                self.decorate_stmt_into(then_scope, &s.then_body);
                if let Some(ref else_body) = s.else_body {
                    // A block else-branch becomes an ordinary subblock;
                    // anything else stays in the enclosing scope.
                    self.decorate_stmt(scope, else_body);
                }
            }
            Stmt::While(s) => {
                s.scope.set(Some(scope));
                self.decorate_expr(scope, &s.test);
                let loop_scope = self.scopes.child(scope, LOOP_BODY);
                self.decorate_stmt_into(loop_scope, &s.body);
            }
            Stmt::For(s) => {
                s.scope.set(Some(scope));
                if let Some(ref init) = s.init {
                    self.decorate_expr(scope, init);
                }
                self.decorate_expr(scope, &s.test);
                if let Some(ref step) = s.step {
                    self.decorate_expr(scope, step);
                }
                let loop_scope = self.scopes.child(scope, LOOP_BODY);
                self.decorate_stmt_into(loop_scope, &s.body);
            }
            Stmt::Return(s) => {
                s.scope.set(Some(scope));
                if let Some(ref value) = s.value {
                    self.decorate_expr(scope, value);
                }
            }
            Stmt::Break(s) => s.scope.set(Some(scope)),
            Stmt::Print(s) => {
                s.scope.set(Some(scope));
                for arg in &s.args {
                    self.decorate_expr(scope, arg);
                }
            }
            Stmt::Switch(s) => {
                s.scope.set(Some(scope));
                self.decorate_expr(scope, &s.subject);
                for case in &s.cases {
                    case.scope.set(Some(scope));
                    for body_stmt in &case.body {
                        self.decorate_stmt(scope, body_stmt);
                    }
                }
                if let Some(ref default) = s.default {
                    for body_stmt in default {
                        self.decorate_stmt(scope, body_stmt);
                    }
                }
            }
            Stmt::Expr(e) => self.decorate_expr(scope, e),
            Stmt::Empty => {}
        }
    }

    /// Decorate a statement that already owns a freshly created scope
    /// (an if/loop body): a block lands directly in it, anything else is
    /// decorated with it as the current scope.
    fn decorate_stmt_into(&mut self, scope: ScopeId, stmt: &Stmt) {
        match stmt {
            Stmt::Block(block) => self.decorate_block_into(block, scope),
            other => self.decorate_stmt(scope, other),
        }
    }

    fn decorate_expr(&mut self, scope: ScopeId, expr: &Expr) {
        expr.scope.set(Some(scope));
        match &expr.kind {
            ExprKind::Unary { operand, .. } => self.decorate_expr(scope, operand),
            ExprKind::Binary { left, right, .. } => {
                self.decorate_expr(scope, left);
                self.decorate_expr(scope, right);
            }
            ExprKind::Assign { target, value } => {
                self.decorate_expr(scope, target);
                self.decorate_expr(scope, value);
            }
            ExprKind::Call { receiver, args, .. } => {
                if let Some(receiver) = receiver {
                    self.decorate_expr(scope, receiver);
                }
                for arg in args {
                    self.decorate_expr(scope, arg);
                }
            }
            ExprKind::FieldAccess { base, .. } => self.decorate_expr(scope, base),
            ExprKind::Index { base, index } => {
                self.decorate_expr(scope, base);
                self.decorate_expr(scope, index);
            }
            ExprKind::NewArray { size, .. } => self.decorate_expr(scope, size),
            ExprKind::IntConstant(_)
            | ExprKind::DoubleConstant(_)
            | ExprKind::BoolConstant(_)
            | ExprKind::StringConstant(_)
            | ExprKind::Null
            | ExprKind::This
            | ExprKind::Ident(_)
            | ExprKind::New { .. }
            | ExprKind::ReadInteger
            | ExprKind::ReadLine => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;
    use crate::parser::Parser;

    fn decorate(source: &str) -> (ScopeTree, Program) {
        let (tokens, lex_diags) = Lexer::new(source).tokenize();
        assert!(!lex_diags.has_errors());
        let (program, parse_diags) = Parser::new(tokens).parse();
        assert!(!parse_diags.has_errors());
        let mut scopes = ScopeTree::new();
        ScopeDecorator::new(&mut scopes).decorate(&program);
        (scopes, program)
    }

    #[test]
    fn program_and_globals_get_root_scope() {
        let (scopes, program) = decorate("int x;");
        assert_eq!(program.scope.get(), Some(scopes.root()));
        let Decl::Var(v) = &program.decls[0] else {
            panic!("expected var");
        };
        assert_eq!(v.scope.get(), Some(scopes.root()));
    }

    #[test]
    fn class_and_interface_scopes_carry_their_names() {
        let (scopes, program) = decorate("class A { } interface I { }");
        let Decl::Class(c) = &program.decls[0] else {
            panic!("expected class");
        };
        let Decl::Interface(i) = &program.decls[1] else {
            panic!("expected interface");
        };
        assert_eq!(
            scopes.bound_name(c.scope.get().unwrap()),
            "Class Declaration of A"
        );
        assert_eq!(
            scopes.bound_name(i.scope.get().unwrap()),
            "Interface Declaration of I"
        );
    }

    #[test]
    fn function_body_nests_inside_formals() {
        let (scopes, program) = decorate("int f(int x) { int y; }");
        let Decl::Fn(f) = &program.decls[0] else {
            panic!("expected fn");
        };
        let formals_scope = f.scope.get().unwrap();
        assert_eq!(scopes.bound_name(formals_scope), "FnDecl (formals) f");
        assert_eq!(scopes.parent(formals_scope), Some(scopes.root()));

        let body_scope = f.body.as_ref().unwrap().scope.get().unwrap();
        assert_eq!(scopes.bound_name(body_scope), "FnDecl (body) f");
        assert_eq!(scopes.parent(body_scope), Some(formals_scope));

        assert_eq!(f.formals[0].scope.get(), Some(formals_scope));
        assert_eq!(
            f.body.as_ref().unwrap().decls[0].scope.get(),
            Some(body_scope)
        );
    }

    #[test]
    fn test_expression_keeps_enclosing_scope() {
        let (scopes, program) = decorate("void f() { while (true) { break; } }");
        let Decl::Fn(f) = &program.decls[0] else {
            panic!("expected fn");
        };
        let body = f.body.as_ref().unwrap();
        let body_scope = body.scope.get().unwrap();
        let Stmt::While(w) = &body.stmts[0] else {
            panic!("expected while");
        };
        // The test is decorated with the enclosing scope, the body with a
        // fresh loop scope.
        assert_eq!(w.test.scope.get(), Some(body_scope));
        let Stmt::Block(loop_block) = w.body.as_ref() else {
            panic!("expected block body");
        };
        let loop_scope = loop_block.scope.get().unwrap();
        assert_eq!(scopes.bound_name(loop_scope), LOOP_BODY);
        assert_eq!(scopes.parent(loop_scope), Some(body_scope));
    }

    #[test]
    fn if_branches_get_their_own_scopes() {
        let (scopes, program) = decorate("void f() { if (true) { } else { } }");
        let Decl::Fn(f) = &program.decls[0] else {
            panic!("expected fn");
        };
        let body = f.body.as_ref().unwrap();
        let Stmt::If(s) = &body.stmts[0] else {
            panic!("expected if");
        };
        let Stmt::Block(then_block) = s.then_body.as_ref() else {
            panic!("expected then block");
        };
        assert_eq!(
            scopes.bound_name(then_block.scope.get().unwrap()),
            "Test body"
        );
        let Some(else_body) = &s.else_body else {
            panic!("expected else");
        };
        let Stmt::Block(else_block) = else_body.as_ref() else {
            panic!("expected else block");
        };
        assert_eq!(scopes.bound_name(else_block.scope.get().unwrap()), "Subblock");
    }
}
