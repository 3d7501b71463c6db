use std::collections::BTreeSet;

use decaf_common::{Diagnostic, DiagnosticBag, DiagnosticKind, Span};

use crate::ast::nodes::*;

use super::scope::ScopeTree;
use super::symbols::Symbol;

/// Fourth pass: verify inheritance acyclicity, `extends`/`implements`
/// well-formedness, interface conformance, and override signatures.
pub struct ClassChecker<'a> {
    scopes: &'a ScopeTree,
    diagnostics: &'a mut DiagnosticBag,
    /// Cycle heads already reported, so each cycle surfaces once even when
    /// several classes' chains run into it.
    reported_cycles: BTreeSet<String>,
}

impl<'a> ClassChecker<'a> {
    pub fn new(scopes: &'a ScopeTree, diagnostics: &'a mut DiagnosticBag) -> Self {
        Self {
            scopes,
            diagnostics,
            reported_cycles: BTreeSet::new(),
        }
    }

    pub fn check(mut self, program: &Program) {
        for decl in &program.decls {
            if let Decl::Class(c) = decl {
                self.check_class(c);
            }
        }
    }

    fn check_class(&mut self, c: &ClassDecl) {
        self.check_inheritance_cycle(c);

        if let Some(ref base) = c.extends {
            self.check_named_type_exists(base, "class");
        }

        for iface in &c.implements {
            self.check_named_type_exists(iface, "interface");
            self.check_conformance(c, iface);
        }

        self.check_override_signatures(c);
    }

    // ------------------------------------------------------------------
    // Cyclic inheritance
    // ------------------------------------------------------------------

    /// Walk the `extends` chain accumulating seen names; a repeated name is
    /// a cycle, attributed to the first name seen twice. A chain that runs
    /// off to an undeclared class just stops (type existence is reported
    /// separately).
    fn check_inheritance_cycle(&mut self, c: &ClassDecl) {
        let mut seen: Vec<String> = vec![c.name.clone()];
        let mut current = c.extends.as_ref().map(|e| e.name.clone());

        while let Some(name) = current {
            if seen.contains(&name) {
                if self.reported_cycles.insert(name.clone()) {
                    self.diagnostics.report(
                        Diagnostic::error(format!(
                            "*** Illegal cyclic class inheritance involving {} on line {}",
                            name, c.span.start.line
                        ))
                        .with_kind(DiagnosticKind::InheritanceCycle)
                        .with_span(c.span),
                    );
                }
                return;
            }
            let Some(Symbol::Class(base)) = self.class_lookup(&name) else {
                return;
            };
            let next = base.extends.clone();
            seen.push(name);
            current = next;
        }
    }

    // ------------------------------------------------------------------
    // Interface conformance
    // ------------------------------------------------------------------

    /// Every member the interface declares must, when the class binds the
    /// same name, match the interface's signature. A member the class does
    /// not bind at all is skipped; only present-but-mismatched members are
    /// reported.
    fn check_conformance(&mut self, c: &ClassDecl, iface: &NamedTypeRef) {
        let Some(Symbol::Interface(isym)) = self.class_lookup(&iface.name) else {
            // Not an interface in scope; existence was reported above.
            return;
        };
        let class_scope = scope_of(&c.scope);

        let mut mismatches: Vec<(String, Span)> = Vec::new();
        for (name, required) in self.scopes.local_entries(isym.scope) {
            let Some(found) = self.scopes.lookup(class_scope, name) else {
                continue;
            };
            if !required.matches(found) {
                mismatches.push((name.clone(), found.defined_at()));
            }
        }

        for (name, span) in mismatches {
            self.diagnostics.report(
                Diagnostic::error(format!(
                    "** Method '{}' must match inherited type signature",
                    name
                ))
                .with_kind(DiagnosticKind::TypeSignature)
                .with_span(span),
            );
            self.diagnostics.report(
                Diagnostic::error(format!(
                    "*** Class '{}' does not implement entire interface '{}'",
                    c.name, iface.name
                ))
                .with_kind(DiagnosticKind::UnimplementedInterface)
                .with_span(c.span),
            );
        }
    }

    // ------------------------------------------------------------------
    // Override signatures
    // ------------------------------------------------------------------

    /// Every name a class binds locally that also resolves through its
    /// inherited chain must keep the inherited signature.
    fn check_override_signatures(&mut self, c: &ClassDecl) {
        let class_scope = scope_of(&c.scope);

        let mut mismatches: Vec<(String, Span)> = Vec::new();
        for (name, local) in self.scopes.local_entries(class_scope) {
            if name == "this" {
                continue;
            }
            let Some(inherited) = self.scopes.lookup_inherited(class_scope, name) else {
                continue;
            };
            if !local.matches(inherited) {
                mismatches.push((name.clone(), local.defined_at()));
            }
        }

        for (name, span) in mismatches {
            self.diagnostics.report(
                Diagnostic::error(format!(
                    "** Method '{}' must match inherited type signature",
                    name
                ))
                .with_kind(DiagnosticKind::TypeSignature)
                .with_span(span),
            );
        }
    }

    // ------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------

    /// Class and interface names are declared at the top level, so they are
    /// resolved from the global scope. Resolving through a class's own
    /// chain would dead-end when that chain has been spliced into a cycle.
    fn class_lookup(&self, name: &str) -> Option<&Symbol> {
        self.scopes.lookup(self.scopes.root(), name)
    }

    fn check_named_type_exists(&mut self, name_ref: &NamedTypeRef, kind: &str) {
        match self.class_lookup(&name_ref.name) {
            Some(Symbol::Class(_)) | Some(Symbol::Interface(_)) => {}
            _ => {
                self.diagnostics.report(
                    Diagnostic::error(format!(
                        "*** No declaration found for {} '{}'",
                        kind, name_ref.name
                    ))
                    .with_kind(DiagnosticKind::UndeclaredType)
                    .with_span(name_ref.span),
                );
            }
        }
    }
}
