pub mod class_checker;
pub mod collector;
pub mod decorator;
pub mod expr_type;
pub mod fork_table;
pub mod linker;
pub mod scope;
pub mod symbols;
pub mod type_checker;
pub mod types;

use decaf_common::DiagnosticBag;

use crate::ast::nodes::Program;

use self::class_checker::ClassChecker;
use self::collector::DeclarationCollector;
use self::decorator::ScopeDecorator;
use self::linker::InheritanceLinker;
use self::scope::ScopeTree;
use self::type_checker::TypeChecker;

/// Run all semantic analysis passes on the given program.
///
/// Returns the populated scope tree (rooted at the global scope) and a
/// `DiagnosticBag` with every error found. The analysis performs, in order:
///  1. Scope decoration: attach a scope to every AST node
///  2. Declaration collection: insert every declaration into its scope
///  3. Inheritance linking: re-parent class scopes under their base class
///  4. Class checks: inheritance cycles, interface conformance, overrides
///  5. Type checking: tests, returns, breaks, print args, type existence
pub fn analyze(program: &Program) -> (ScopeTree, DiagnosticBag) {
    let mut scopes = ScopeTree::new();
    let mut diagnostics = DiagnosticBag::new();

    ScopeDecorator::new(&mut scopes).decorate(program);
    DeclarationCollector::new(&mut scopes, &mut diagnostics).collect(program);
    InheritanceLinker::new(&mut scopes).link(program);
    ClassChecker::new(&scopes, &mut diagnostics).check(program);
    TypeChecker::new(&scopes, &mut diagnostics).check(program);

    (scopes, diagnostics)
}
