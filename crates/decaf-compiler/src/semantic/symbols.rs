use decaf_common::Span;

use super::scope::ScopeId;
use super::types::Type;

/// A declared entity as recorded in a scope's table.
///
/// Every symbol remembers where it was declared (`defined_at`) so conflict
/// diagnostics can point back at the earlier declaration.
#[derive(Debug, Clone)]
pub enum Symbol {
    Variable(VariableSymbol),
    Method(MethodSymbol),
    Class(ClassSymbol),
    Interface(InterfaceSymbol),
}

#[derive(Debug, Clone)]
pub struct VariableSymbol {
    pub name: String,
    pub ty: Type,
    pub defined_at: Span,
}

#[derive(Debug, Clone)]
pub struct MethodSymbol {
    pub name: String,
    pub return_type: Type,
    pub formals: Vec<Type>,
    pub defined_at: Span,
}

/// A class declaration. `scope` is the class's own scope node, which after
/// inheritance linking chains through the base class's scope.
#[derive(Debug, Clone)]
pub struct ClassSymbol {
    pub name: String,
    pub extends: Option<String>,
    pub implements: Vec<String>,
    pub scope: ScopeId,
    pub defined_at: Span,
}

#[derive(Debug, Clone)]
pub struct InterfaceSymbol {
    pub name: String,
    pub scope: ScopeId,
    pub defined_at: Span,
}

impl Symbol {
    pub fn defined_at(&self) -> Span {
        match self {
            Symbol::Variable(v) => v.defined_at,
            Symbol::Method(m) => m.defined_at,
            Symbol::Class(c) => c.defined_at,
            Symbol::Interface(i) => i.defined_at,
        }
    }

    /// Structural signature matching.
    ///
    /// Variables match iff their types are comparable (including the
    /// `int`/`double` widening); methods match iff return types and all
    /// formal types pairwise are; classes and interfaces match on name.
    /// Symbols of different kinds never match.
    pub fn matches(&self, other: &Symbol) -> bool {
        match (self, other) {
            (Symbol::Variable(a), Symbol::Variable(b)) => a.ty.matches(&b.ty),
            (Symbol::Method(a), Symbol::Method(b)) => {
                a.return_type.matches(&b.return_type)
                    && a.formals.len() == b.formals.len()
                    && a.formals
                        .iter()
                        .zip(b.formals.iter())
                        .all(|(x, y)| x.matches(y))
            }
            (Symbol::Class(a), Symbol::Class(b)) => a.name == b.name,
            (Symbol::Interface(a), Symbol::Interface(b)) => a.name == b.name,
            _ => false,
        }
    }
}

impl std::fmt::Display for Symbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Symbol::Variable(v) => write!(f, "Variable of type {}", v.ty),
            Symbol::Method(m) => {
                let formals: Vec<_> = m.formals.iter().map(|t| t.display_name()).collect();
                write!(f, "Method returning {} taking ({})", m.return_type, formals.join(", "))
            }
            Symbol::Class(c) => write!(f, "Class {}", c.name),
            Symbol::Interface(i) => write!(f, "Interface {}", i.name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn var(ty: Type) -> Symbol {
        Symbol::Variable(VariableSymbol {
            name: "x".into(),
            ty,
            defined_at: Span::dummy(),
        })
    }

    fn method(ret: Type, formals: Vec<Type>) -> Symbol {
        Symbol::Method(MethodSymbol {
            name: "m".into(),
            return_type: ret,
            formals,
            defined_at: Span::dummy(),
        })
    }

    #[test]
    fn variables_match_on_type() {
        assert!(var(Type::Int).matches(&var(Type::Int)));
        assert!(var(Type::Int).matches(&var(Type::Double))); // widening
        assert!(!var(Type::Int).matches(&var(Type::Bool)));
    }

    #[test]
    fn methods_match_on_signature() {
        let a = method(Type::Int, vec![Type::Bool]);
        let b = method(Type::Int, vec![Type::Bool]);
        let c = method(Type::Int, vec![Type::Bool, Type::Int]);
        let d = method(Type::Void, vec![Type::Bool]);
        assert!(a.matches(&b));
        assert!(!a.matches(&c)); // arity
        assert!(!a.matches(&d)); // return type
    }

    #[test]
    fn cross_kind_never_matches() {
        assert!(!var(Type::Int).matches(&method(Type::Int, vec![])));
    }
}
