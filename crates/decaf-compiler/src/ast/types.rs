use decaf_common::Span;

/// A type written in source: variable/formal/return types and array element
/// types. `void` only appears as a function return type; `null` has no
/// written form.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeAnnotation {
    pub kind: TypeKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TypeKind {
    Void,
    Int,
    Double,
    Bool,
    String,
    Named(String),
    Array(Box<TypeAnnotation>),
}

impl TypeAnnotation {
    pub fn new(kind: TypeKind, span: Span) -> Self {
        Self { kind, span }
    }
}

impl std::fmt::Display for TypeAnnotation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.kind {
            TypeKind::Void => write!(f, "void"),
            TypeKind::Int => write!(f, "int"),
            TypeKind::Double => write!(f, "double"),
            TypeKind::Bool => write!(f, "bool"),
            TypeKind::String => write!(f, "string"),
            TypeKind::Named(name) => write!(f, "{}", name),
            TypeKind::Array(elem) => write!(f, "{}[]", elem),
        }
    }
}
