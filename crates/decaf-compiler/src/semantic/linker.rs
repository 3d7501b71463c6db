use crate::ast::nodes::*;

use super::scope::{ScopeId, ScopeTree};
use super::symbols::Symbol;

/// Third pass: re-parent each extending class's scope under its base
/// class's scope, so that lookups for inherited members traverse the base
/// chain automatically.
pub struct InheritanceLinker<'a> {
    scopes: &'a mut ScopeTree,
}

impl<'a> InheritanceLinker<'a> {
    pub fn new(scopes: &'a mut ScopeTree) -> Self {
        Self { scopes }
    }

    pub fn link(mut self, program: &Program) {
        for decl in &program.decls {
            if let Decl::Class(c) = decl {
                self.link_class(c);
            }
        }
    }

    fn link_class(&mut self, c: &ClassDecl) {
        let Some(ref base) = c.extends else {
            return;
        };
        let Some(base_scope) = self.locate_class_scope(&base.name) else {
            // Base not in scope; type existence is checked separately.
            return;
        };
        let Some(class_scope) = self.locate_class_scope(&c.name) else {
            return;
        };

        // A class directly extending itself fails the self-reparent guard;
        // the class checker reports the cycle with its proper message, so
        // the rejection is not surfaced here.
        let _ = self.scopes.reparent(class_scope, base_scope);
    }

    /// Find the scope of the class declaration binding `name`: walk the
    /// whole scope tree from the root, looking for a local binding of
    /// `name` to a class symbol, and return that class's own scope.
    fn locate_class_scope(&self, name: &str) -> Option<ScopeId> {
        let mut stack = vec![self.scopes.root()];
        while let Some(scope) = stack.pop() {
            if let Some(Symbol::Class(class_symbol)) = self.scopes.lookup_local(scope, name) {
                return Some(class_symbol.scope);
            }
            stack.extend(self.scopes.children(scope).iter().copied());
        }
        None
    }
}
