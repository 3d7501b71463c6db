use decaf_common::Diagnostic;

use crate::ast::types::{TypeAnnotation, TypeKind};

/// Internal type representation for semantic analysis.
///
/// Separate from the AST `TypeAnnotation` so the semantic layer can reason
/// about types without caring about spans or syntax. `Error` carries the
/// diagnostics that produced it, so a malformed subexpression propagates
/// its errors through expression composition without losing them; the
/// statement-level consumer unpacks them exactly once.
#[derive(Debug, Clone)]
pub enum Type {
    Void,
    Int,
    Double,
    Bool,
    String,
    Null,
    Named(std::string::String),
    Array(Box<Type>),
    /// A named type whose declaration could not be found.
    Undeclared(std::string::String),
    /// Error sentinel carrying the diagnostics that produced it.
    Error(Vec<Diagnostic>),
}

impl PartialEq for Type {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Type::Void, Type::Void)
            | (Type::Int, Type::Int)
            | (Type::Double, Type::Double)
            | (Type::Bool, Type::Bool)
            | (Type::String, Type::String)
            | (Type::Null, Type::Null) => true,
            (Type::Named(a), Type::Named(b)) => a == b,
            (Type::Array(a), Type::Array(b)) => a == b,
            (Type::Undeclared(a), Type::Undeclared(b)) => a == b,
            // Error compares equal to itself regardless of payload.
            (Type::Error(_), Type::Error(_)) => true,
            _ => false,
        }
    }
}

impl Type {
    /// Convert an AST `TypeAnnotation` to the internal `Type`.
    pub fn from_annotation(ann: &TypeAnnotation) -> Self {
        match &ann.kind {
            TypeKind::Void => Type::Void,
            TypeKind::Int => Type::Int,
            TypeKind::Double => Type::Double,
            TypeKind::Bool => Type::Bool,
            TypeKind::String => Type::String,
            TypeKind::Named(name) => Type::Named(name.clone()),
            TypeKind::Array(elem) => Type::Array(Box::new(Type::from_annotation(elem))),
        }
    }

    pub fn error(diagnostic: Diagnostic) -> Self {
        Type::Error(vec![diagnostic])
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Type::Error(_))
    }

    /// Error and undeclared types short-circuit further checks so one bad
    /// name does not cascade into unrelated diagnostics.
    pub fn is_unresolved(&self) -> bool {
        matches!(self, Type::Error(_) | Type::Undeclared(_))
    }

    /// Whether this type is numeric (`int` or `double`).
    pub fn is_numeric(&self) -> bool {
        matches!(self, Type::Int | Type::Double)
    }

    /// Reference types: class instances and arrays. `null` is assignable
    /// to any of them.
    pub fn is_reference(&self) -> bool {
        matches!(self, Type::Named(_) | Type::Array(_))
    }

    /// Structural comparability, with the single implicit widening:
    /// `int` and `double` are mutually comparable. Error and undeclared
    /// types compare true to suppress cascading mismatches.
    pub fn matches(&self, other: &Type) -> bool {
        if self.is_error() || other.is_error() {
            return true;
        }
        if matches!(self, Type::Undeclared(_)) || matches!(other, Type::Undeclared(_)) {
            return true;
        }
        if self == other {
            return true;
        }
        matches!(
            (self, other),
            (Type::Int, Type::Double) | (Type::Double, Type::Int)
        )
    }

    /// Whether a value of this type can be supplied where `target` is
    /// expected: structural equality, `int` widening to `double`, and
    /// `null` flowing into any reference type.
    pub fn assignable_to(&self, target: &Type) -> bool {
        if self.is_error() || target.is_error() {
            return true;
        }
        if matches!(self, Type::Undeclared(_)) || matches!(target, Type::Undeclared(_)) {
            return true;
        }
        if self == target {
            return true;
        }
        if matches!((self, target), (Type::Int, Type::Double)) {
            return true;
        }
        matches!(self, Type::Null) && target.is_reference()
    }

    /// Human-readable name for error messages and scope dumps.
    pub fn display_name(&self) -> std::string::String {
        match self {
            Type::Void => "void".into(),
            Type::Int => "int".into(),
            Type::Double => "double".into(),
            Type::Bool => "bool".into(),
            Type::String => "string".into(),
            Type::Null => "null".into(),
            Type::Named(name) => name.clone(),
            Type::Array(elem) => format!("{}[]", elem.display_name()),
            Type::Undeclared(name) => name.clone(),
            Type::Error(_) => "<error>".into(),
        }
    }
}

impl std::fmt::Display for Type {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}
