use decaf_common::{Diagnostic, DiagnosticBag, DiagnosticKind};

use crate::ast::nodes::*;

use super::scope::{ScopeId, ScopeTree};
use super::symbols::{ClassSymbol, InterfaceSymbol, MethodSymbol, Symbol, VariableSymbol};
use super::types::Type;

/// Second pass: insert every declaration into its scope's table.
///
/// Walks the whole tree, not just the top level, so declarations inside
/// nested blocks land in their block's scope. Conflicts are reported
/// against the earlier declaration's line and never stop the walk.
pub struct DeclarationCollector<'a> {
    scopes: &'a mut ScopeTree,
    diagnostics: &'a mut DiagnosticBag,
}

impl<'a> DeclarationCollector<'a> {
    pub fn new(scopes: &'a mut ScopeTree, diagnostics: &'a mut DiagnosticBag) -> Self {
        Self { scopes, diagnostics }
    }

    pub fn collect(mut self, program: &Program) {
        for decl in &program.decls {
            self.process_decl(decl);
        }
    }

    fn process_decl(&mut self, decl: &Decl) {
        match decl {
            Decl::Var(v) => self.process_var(v),
            Decl::Fn(f) => self.process_fn(f),
            Decl::Class(c) => self.process_class(c),
            Decl::Interface(i) => self.process_interface(i),
        }
    }

    fn process_var(&mut self, v: &VarDecl) {
        let scope = scope_of(&v.scope);
        if self.report_if_conflicting(scope, &v.name, v) {
            return;
        }
        self.scopes.define(
            scope,
            v.name.clone(),
            Symbol::Variable(VariableSymbol {
                name: v.name.clone(),
                ty: Type::from_annotation(&v.ty),
                defined_at: v.span,
            }),
        );
    }

    /// A function's name lives in the scope *enclosing* its formals
    /// sub-scope. A conflicting name suppresses the formals and body.
    fn process_fn(&mut self, f: &FnDecl) {
        let formals_scope = scope_of(&f.scope);
        let enclosing = self
            .scopes
            .parent(formals_scope)
            .expect("formals scope always has an enclosing scope");

        if self.report_if_conflicting(enclosing, &f.name, f) {
            return;
        }
        self.scopes.define(
            enclosing,
            f.name.clone(),
            Symbol::Method(MethodSymbol {
                name: f.name.clone(),
                return_type: Type::from_annotation(&f.return_type),
                formals: f.formals.iter().map(|p| Type::from_annotation(&p.ty)).collect(),
                defined_at: f.span,
            }),
        );

        for formal in &f.formals {
            self.process_var(formal);
        }
        if let Some(ref body) = f.body {
            self.collect_block(body);
        }
    }

    fn process_class(&mut self, c: &ClassDecl) {
        let class_scope = scope_of(&c.scope);
        let parent = self
            .scopes
            .parent(class_scope)
            .expect("class scope always has a parent scope");

        // Class scopes are freshly forked; `this` can never preexist.
        let prior = self.scopes.define(
            class_scope,
            "this",
            Symbol::Variable(VariableSymbol {
                name: "this".to_string(),
                ty: Type::Named(c.name.clone()),
                defined_at: c.span,
            }),
        );
        assert!(
            prior.is_none(),
            "fresh class scope for '{}' already contained 'this'",
            c.name
        );

        for member in &c.members {
            self.process_decl(member);
        }

        if self.report_if_conflicting(parent, &c.name, c) {
            return;
        }
        self.scopes.define(
            parent,
            c.name.clone(),
            Symbol::Class(ClassSymbol {
                name: c.name.clone(),
                extends: c.extends.as_ref().map(|e| e.name.clone()),
                implements: c.implements.iter().map(|i| i.name.clone()).collect(),
                scope: class_scope,
                defined_at: c.span,
            }),
        );
    }

    fn process_interface(&mut self, i: &InterfaceDecl) {
        let iface_scope = scope_of(&i.scope);
        let parent = self
            .scopes
            .parent(iface_scope)
            .expect("interface scope always has a parent scope");

        for method in &i.members {
            self.process_fn(method);
        }

        if self.report_if_conflicting(parent, &i.name, i) {
            return;
        }
        self.scopes.define(
            parent,
            i.name.clone(),
            Symbol::Interface(InterfaceSymbol {
                name: i.name.clone(),
                scope: iface_scope,
                defined_at: i.span,
            }),
        );
    }

    // ------------------------------------------------------------------
    // Statement walking (reaches declarations in nested blocks)
    // ------------------------------------------------------------------

    fn collect_block(&mut self, block: &StmtBlock) {
        for decl in &block.decls {
            self.process_var(decl);
        }
        for stmt in &block.stmts {
            self.collect_stmt(stmt);
        }
    }

    fn collect_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Block(block) => self.collect_block(block),
            Stmt::If(s) => {
                self.collect_stmt(&s.then_body);
                if let Some(ref else_body) = s.else_body {
                    self.collect_stmt(else_body);
                }
            }
            Stmt::While(s) => self.collect_stmt(&s.body),
            Stmt::For(s) => self.collect_stmt(&s.body),
            Stmt::Switch(s) => {
                for case in &s.cases {
                    for body_stmt in &case.body {
                        self.collect_stmt(body_stmt);
                    }
                }
                if let Some(ref default) = s.default {
                    for body_stmt in default {
                        self.collect_stmt(body_stmt);
                    }
                }
            }
            Stmt::Return(_) | Stmt::Break(_) | Stmt::Print(_) | Stmt::Expr(_) | Stmt::Empty => {}
        }
    }

    // ------------------------------------------------------------------
    // Conflict reporting
    // ------------------------------------------------------------------

    /// If `name` is already bound locally in `scope`, report a conflict
    /// against the prior declaration and return true.
    fn report_if_conflicting(&mut self, scope: ScopeId, name: &str, node: &dyn Spanned) -> bool {
        let Some(prior) = self.scopes.lookup_local(scope, name) else {
            return false;
        };
        let prior_line = prior.defined_at().start.line;
        self.diagnostics.report(
            Diagnostic::error(format!(
                "*** Declaration of '{}' here conflicts with declaration on line {}",
                name, prior_line
            ))
            .with_kind(DiagnosticKind::ConflictingDecl)
            .with_span(node.span()),
        );
        true
    }
}

/// Minimal span access for conflict reporting across declaration kinds.
trait Spanned {
    fn span(&self) -> decaf_common::Span;
}

impl Spanned for VarDecl {
    fn span(&self) -> decaf_common::Span {
        self.span
    }
}

impl Spanned for FnDecl {
    fn span(&self) -> decaf_common::Span {
        self.span
    }
}

impl Spanned for ClassDecl {
    fn span(&self) -> decaf_common::Span {
        self.span
    }
}

impl Spanned for InterfaceDecl {
    fn span(&self) -> decaf_common::Span {
        self.span
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;
    use crate::parser::Parser;
    use crate::semantic::decorator::ScopeDecorator;

    fn collect(source: &str) -> (ScopeTree, Program, DiagnosticBag) {
        let (tokens, lex_diags) = Lexer::new(source).tokenize();
        assert!(!lex_diags.has_errors());
        let (program, parse_diags) = Parser::new(tokens).parse();
        assert!(!parse_diags.has_errors());
        let mut scopes = ScopeTree::new();
        let mut diagnostics = DiagnosticBag::new();
        ScopeDecorator::new(&mut scopes).decorate(&program);
        DeclarationCollector::new(&mut scopes, &mut diagnostics).collect(&program);
        (scopes, program, diagnostics)
    }

    #[test]
    fn function_name_lands_in_enclosing_scope() {
        let (scopes, program, diags) = collect("int f(int x) { }");
        assert!(!diags.has_errors());
        let root = scopes.root();
        assert!(matches!(
            scopes.lookup_local(root, "f"),
            Some(Symbol::Method(_))
        ));
        // The formals scope holds only the formals.
        let Decl::Fn(f) = &program.decls[0] else {
            panic!("expected fn");
        };
        let formals_scope = scope_of(&f.scope);
        assert!(scopes.lookup_local(formals_scope, "f").is_none());
        assert!(matches!(
            scopes.lookup_local(formals_scope, "x"),
            Some(Symbol::Variable(_))
        ));
    }

    #[test]
    fn class_scope_receives_this_and_members() {
        let (scopes, program, diags) = collect("class A { int x; int getx() { return x; } }");
        assert!(!diags.has_errors());
        let Decl::Class(c) = &program.decls[0] else {
            panic!("expected class");
        };
        let class_scope = scope_of(&c.scope);
        match scopes.lookup_local(class_scope, "this") {
            Some(Symbol::Variable(v)) => assert_eq!(v.ty, Type::Named("A".into())),
            other => panic!("expected 'this' variable, got {:?}", other),
        }
        assert!(scopes.lookup_local(class_scope, "x").is_some());
        assert!(scopes.lookup_local(class_scope, "getx").is_some());
        // The class annotation itself lives in the parent scope.
        assert!(matches!(
            scopes.lookup_local(scopes.root(), "A"),
            Some(Symbol::Class(_))
        ));
    }

    #[test]
    fn conflicting_function_suppresses_its_formals() {
        let (scopes, _, diags) = collect("int f; int f(int zz) { }");
        assert!(diags.has_errors());
        assert_eq!(diags.len(), 1);
        // The conflicting function's formals were not collected.
        let root = scopes.root();
        assert!(matches!(
            scopes.lookup_local(root, "f"),
            Some(Symbol::Variable(_))
        ));
    }

    #[test]
    fn nested_block_declarations_reach_their_scope() {
        let (scopes, program, diags) = collect("void f() { { int inner; } }");
        assert!(!diags.has_errors());
        let Decl::Fn(f) = &program.decls[0] else {
            panic!("expected fn");
        };
        let body = f.body.as_ref().unwrap();
        let Stmt::Block(sub) = &body.stmts[0] else {
            panic!("expected subblock");
        };
        let sub_scope = scope_of(&sub.scope);
        assert!(scopes.lookup_local(sub_scope, "inner").is_some());
        assert!(scopes.lookup_local(scope_of(&body.scope), "inner").is_none());
    }
}
