use decaf_common::{Diagnostic, DiagnosticKind, Span};

use crate::ast::nodes::*;

use super::scope::{ScopeId, ScopeTree};
use super::symbols::Symbol;
use super::types::Type;

/// Build an expression-typing diagnostic.
fn type_error(message: String, span: Span) -> Diagnostic {
    Diagnostic::error(message)
        .with_kind(DiagnosticKind::TypeError)
        .with_span(span)
}

/// Drain the diagnostics out of any error types in `parts`.
fn collect_errors(parts: &[&Type]) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    for part in parts {
        if let Type::Error(inner) = part {
            diagnostics.extend(inner.iter().cloned());
        }
    }
    diagnostics
}

impl Expr {
    /// Compute this expression's type.
    ///
    /// Pure and idempotent: diagnostics are carried inside `Type::Error`
    /// rather than reported, so a malformed subexpression propagates its
    /// errors upward without masking enclosing checks. The statement-level
    /// consumer unpacks them into the diagnostic list exactly once.
    pub fn type_of(&self, scopes: &ScopeTree, scope: ScopeId) -> Type {
        match &self.kind {
            ExprKind::IntConstant(_) => Type::Int,
            ExprKind::DoubleConstant(_) => Type::Double,
            ExprKind::BoolConstant(_) => Type::Bool,
            ExprKind::StringConstant(_) => Type::String,
            ExprKind::Null => Type::Null,

            ExprKind::This => match scopes.lookup(scope, "this") {
                Some(Symbol::Variable(v)) => v.ty.clone(),
                _ => Type::error(type_error(
                    "*** 'this' is only valid within class scope".to_string(),
                    self.span,
                )),
            },

            ExprKind::Ident(name) => match scopes.lookup(scope, name) {
                Some(Symbol::Variable(v)) => v.ty.clone(),
                _ => Type::error(type_error(
                    format!("*** No declaration found for variable '{}'", name),
                    self.span,
                )),
            },

            ExprKind::Unary { op, operand } => self.type_of_unary(scopes, scope, *op, operand),
            ExprKind::Binary { op, left, right } => {
                self.type_of_binary(scopes, scope, *op, left, right)
            }
            ExprKind::Assign { target, value } => self.type_of_assign(scopes, scope, target, value),
            ExprKind::Call {
                receiver,
                name,
                name_span,
                args,
            } => self.type_of_call(scopes, scope, receiver.as_deref(), name, *name_span, args),
            ExprKind::FieldAccess {
                base,
                field,
                field_span,
            } => self.type_of_field_access(scopes, scope, base, field, *field_span),
            ExprKind::Index { base, index } => self.type_of_index(scopes, scope, base, index),

            ExprKind::New { class_name } => match scopes.lookup(scopes.root(), class_name) {
                Some(Symbol::Class(_)) => Type::Named(class_name.clone()),
                _ => Type::error(type_error(
                    format!("*** No declaration found for class '{}'", class_name),
                    self.span,
                )),
            },

            ExprKind::NewArray { size, elem } => self.type_of_new_array(scopes, scope, size, elem),

            ExprKind::ReadInteger => Type::Int,
            ExprKind::ReadLine => Type::String,
        }
    }

    fn type_of_unary(&self, scopes: &ScopeTree, scope: ScopeId, op: UnaryOp, operand: &Expr) -> Type {
        let operand_ty = operand.type_of(scopes, scope);
        if operand_ty.is_unresolved() {
            return operand_ty;
        }
        match op {
            UnaryOp::Neg if operand_ty.is_numeric() => operand_ty,
            UnaryOp::Not if operand_ty == Type::Bool => Type::Bool,
            UnaryOp::Neg => Type::error(type_error(
                format!("*** Incompatible operand: - {}", operand_ty),
                self.span,
            )),
            UnaryOp::Not => Type::error(type_error(
                format!("*** Incompatible operand: ! {}", operand_ty),
                self.span,
            )),
        }
    }

    fn type_of_binary(
        &self,
        scopes: &ScopeTree,
        scope: ScopeId,
        op: BinaryOp,
        left: &Expr,
        right: &Expr,
    ) -> Type {
        let lt = left.type_of(scopes, scope);
        let rt = right.type_of(scopes, scope);
        let carried = collect_errors(&[&lt, &rt]);
        if !carried.is_empty() {
            return Type::Error(carried);
        }
        // Undeclared operand types were already reported at the declaration.
        if matches!(lt, Type::Undeclared(_)) {
            return lt;
        }
        if matches!(rt, Type::Undeclared(_)) {
            return rt;
        }

        match op {
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => {
                if lt.is_numeric() && rt.is_numeric() {
                    if lt == Type::Double || rt == Type::Double {
                        Type::Double
                    } else {
                        Type::Int
                    }
                } else {
                    self.operand_mismatch(op, &lt, &rt)
                }
            }
            BinaryOp::Lt | BinaryOp::Lte | BinaryOp::Gt | BinaryOp::Gte => {
                if lt.is_numeric() && rt.is_numeric() {
                    Type::Bool
                } else {
                    self.operand_mismatch(op, &lt, &rt)
                }
            }
            BinaryOp::Eq | BinaryOp::Neq => {
                if lt.assignable_to(&rt) || rt.assignable_to(&lt) {
                    Type::Bool
                } else {
                    self.operand_mismatch(op, &lt, &rt)
                }
            }
            BinaryOp::And | BinaryOp::Or => {
                if lt == Type::Bool && rt == Type::Bool {
                    Type::Bool
                } else {
                    self.operand_mismatch(op, &lt, &rt)
                }
            }
        }
    }

    fn operand_mismatch(&self, op: BinaryOp, lt: &Type, rt: &Type) -> Type {
        Type::error(type_error(
            format!("*** Incompatible operands: {} {} {}", lt, op.symbol(), rt),
            self.span,
        ))
    }

    fn type_of_assign(&self, scopes: &ScopeTree, scope: ScopeId, target: &Expr, value: &Expr) -> Type {
        let target_ty = target.type_of(scopes, scope);
        let value_ty = value.type_of(scopes, scope);
        let carried = collect_errors(&[&target_ty, &value_ty]);
        if !carried.is_empty() {
            return Type::Error(carried);
        }
        if !value_ty.assignable_to(&target_ty) {
            return Type::error(type_error(
                format!("*** Incompatible operands: {} = {}", target_ty, value_ty),
                self.span,
            ));
        }
        target_ty
    }

    fn type_of_call(
        &self,
        scopes: &ScopeTree,
        scope: ScopeId,
        receiver: Option<&Expr>,
        name: &str,
        name_span: Span,
        args: &[Expr],
    ) -> Type {
        let method = match receiver {
            None => match scopes.lookup(scope, name) {
                Some(Symbol::Method(m)) => m.clone(),
                _ => {
                    let mut diagnostics: Vec<Diagnostic> = args
                        .iter()
                        .flat_map(|arg| match arg.type_of(scopes, scope) {
                            Type::Error(inner) => inner,
                            _ => Vec::new(),
                        })
                        .collect();
                    diagnostics.push(type_error(
                        format!("*** No declaration found for function '{}'", name),
                        name_span,
                    ));
                    return Type::Error(diagnostics);
                }
            },
            Some(receiver_expr) => {
                let receiver_ty = receiver_expr.type_of(scopes, scope);
                match receiver_ty {
                    Type::Error(_) | Type::Undeclared(_) => return receiver_ty,
                    // Arrays have exactly one member, `length()`.
                    Type::Array(_) if name == "length" => {
                        if args.is_empty() {
                            return Type::Int;
                        }
                        return Type::error(type_error(
                            format!(
                                "*** Function 'length' expects 0 arguments but {} given",
                                args.len()
                            ),
                            name_span,
                        ));
                    }
                    Type::Named(ref class_name) => {
                        match self.find_member(scopes, class_name, name) {
                            MemberLookup::Found(Symbol::Method(m)) => m,
                            // The receiver's type never resolved; its
                            // declaration already carries the error.
                            MemberLookup::UnknownClass => {
                                return Type::Undeclared(class_name.clone());
                            }
                            _ => {
                                return Type::error(type_error(
                                    format!(
                                        "*** {} has no such field '{}'",
                                        receiver_ty, name
                                    ),
                                    name_span,
                                ));
                            }
                        }
                    }
                    _ => {
                        return Type::error(type_error(
                            format!("*** {} has no such field '{}'", receiver_ty, name),
                            name_span,
                        ));
                    }
                }
            }
        };

        let mut diagnostics = Vec::new();
        if args.len() != method.formals.len() {
            diagnostics.push(type_error(
                format!(
                    "*** Function '{}' expects {} arguments but {} given",
                    name,
                    method.formals.len(),
                    args.len()
                ),
                name_span,
            ));
        }

        for (i, (arg, expected)) in args.iter().zip(method.formals.iter()).enumerate() {
            let arg_ty = arg.type_of(scopes, scope);
            if let Type::Error(inner) = arg_ty {
                diagnostics.extend(inner);
            } else if !arg_ty.assignable_to(expected) {
                diagnostics.push(type_error(
                    format!(
                        "*** Incompatible argument {}: {} given, {} expected",
                        i + 1,
                        arg_ty,
                        expected
                    ),
                    arg.span,
                ));
            }
        }

        if diagnostics.is_empty() {
            method.return_type.clone()
        } else {
            Type::Error(diagnostics)
        }
    }

    fn type_of_field_access(
        &self,
        scopes: &ScopeTree,
        scope: ScopeId,
        base: &Expr,
        field: &str,
        field_span: Span,
    ) -> Type {
        let base_ty = base.type_of(scopes, scope);
        match base_ty {
            Type::Error(_) | Type::Undeclared(_) => base_ty,
            Type::Named(ref class_name) => match self.find_member(scopes, class_name, field) {
                MemberLookup::Found(Symbol::Variable(v)) => v.ty.clone(),
                MemberLookup::UnknownClass => Type::Undeclared(class_name.clone()),
                _ => Type::error(type_error(
                    format!("*** {} has no such field '{}'", base_ty, field),
                    field_span,
                )),
            },
            _ => Type::error(type_error(
                format!("*** {} has no such field '{}'", base_ty, field),
                field_span,
            )),
        }
    }

    fn type_of_index(&self, scopes: &ScopeTree, scope: ScopeId, base: &Expr, index: &Expr) -> Type {
        let base_ty = base.type_of(scopes, scope);
        let index_ty = index.type_of(scopes, scope);
        let mut diagnostics = collect_errors(&[&base_ty, &index_ty]);

        let elem = match base_ty {
            Type::Array(ref elem) => Some(elem.as_ref().clone()),
            Type::Error(_) | Type::Undeclared(_) => None,
            _ => {
                diagnostics.push(type_error(
                    "*** [] can only be applied to arrays".to_string(),
                    self.span,
                ));
                None
            }
        };

        if !index_ty.is_error() && index_ty != Type::Int {
            diagnostics.push(type_error(
                "*** Array subscript must be an integer".to_string(),
                self.span,
            ));
        }

        if !diagnostics.is_empty() {
            return Type::Error(diagnostics);
        }
        match elem {
            Some(elem) => elem,
            // Unresolved base with a clean index: stay quiet.
            None => base_ty,
        }
    }

    fn type_of_new_array(
        &self,
        scopes: &ScopeTree,
        scope: ScopeId,
        size: &Expr,
        elem: &crate::ast::types::TypeAnnotation,
    ) -> Type {
        let size_ty = size.type_of(scopes, scope);
        let mut diagnostics = collect_errors(&[&size_ty]);
        if !size_ty.is_error() && size_ty != Type::Int {
            diagnostics.push(type_error(
                "*** Size for NewArray must be an integer".to_string(),
                size.span,
            ));
        }

        let elem_ty = Type::from_annotation(elem);
        if let Type::Named(ref name) = elem_ty {
            match scopes.lookup(scopes.root(), name) {
                Some(Symbol::Class(_)) | Some(Symbol::Interface(_)) => {}
                _ => diagnostics.push(type_error(
                    format!("*** No declaration found for type '{}'", name),
                    elem.span,
                )),
            }
        }

        if !diagnostics.is_empty() {
            return Type::Error(diagnostics);
        }
        Type::Array(Box::new(elem_ty))
    }

    /// Resolve a member of a class or interface by name through its scope
    /// chain (which, after inheritance linking, includes base-class
    /// members). Type names themselves resolve from the global scope.
    fn find_member(&self, scopes: &ScopeTree, type_name: &str, member: &str) -> MemberLookup {
        let member_scope = match scopes.lookup(scopes.root(), type_name) {
            Some(Symbol::Class(class_symbol)) => class_symbol.scope,
            Some(Symbol::Interface(iface_symbol)) => iface_symbol.scope,
            _ => return MemberLookup::UnknownClass,
        };
        match scopes.lookup(member_scope, member) {
            Some(symbol) => MemberLookup::Found(symbol.clone()),
            None => MemberLookup::Missing,
        }
    }
}

/// Outcome of resolving `Type.member`.
enum MemberLookup {
    Found(Symbol),
    /// The type exists but has no such member.
    Missing,
    /// The named type has no class or interface declaration at all.
    UnknownClass,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::semantic::symbols::VariableSymbol;

    fn expr(kind: ExprKind) -> Expr {
        Expr::new(kind, Span::dummy())
    }

    fn int(value: i64) -> Box<Expr> {
        Box::new(expr(ExprKind::IntConstant(value)))
    }

    fn dbl(value: f64) -> Box<Expr> {
        Box::new(expr(ExprKind::DoubleConstant(value)))
    }

    fn boolean(value: bool) -> Box<Expr> {
        Box::new(expr(ExprKind::BoolConstant(value)))
    }

    fn binary(op: BinaryOp, left: Box<Expr>, right: Box<Expr>) -> Expr {
        expr(ExprKind::Binary { op, left, right })
    }

    #[test]
    fn int_arithmetic_stays_int() {
        let scopes = ScopeTree::new();
        let e = binary(BinaryOp::Add, int(1), int(2));
        assert_eq!(e.type_of(&scopes, scopes.root()), Type::Int);
    }

    #[test]
    fn mixed_arithmetic_widens_to_double() {
        let scopes = ScopeTree::new();
        let e = binary(BinaryOp::Mul, int(2), dbl(1.5));
        assert_eq!(e.type_of(&scopes, scopes.root()), Type::Double);
    }

    #[test]
    fn comparison_yields_bool() {
        let scopes = ScopeTree::new();
        let e = binary(BinaryOp::Lt, int(1), dbl(2.0));
        assert_eq!(e.type_of(&scopes, scopes.root()), Type::Bool);
    }

    #[test]
    fn bool_plus_int_is_an_error() {
        let scopes = ScopeTree::new();
        let e = binary(BinaryOp::Add, boolean(true), int(1));
        let ty = e.type_of(&scopes, scopes.root());
        let Type::Error(diags) = ty else {
            panic!("expected error type, got {:?}", ty);
        };
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].message, "*** Incompatible operands: bool + int");
    }

    #[test]
    fn logical_not_requires_bool() {
        let scopes = ScopeTree::new();
        let ok = expr(ExprKind::Unary {
            op: UnaryOp::Not,
            operand: boolean(false),
        });
        assert_eq!(ok.type_of(&scopes, scopes.root()), Type::Bool);
        let bad = expr(ExprKind::Unary {
            op: UnaryOp::Not,
            operand: int(1),
        });
        assert!(bad.type_of(&scopes, scopes.root()).is_error());
    }

    #[test]
    fn nested_errors_merge_without_duplication() {
        let scopes = ScopeTree::new();
        let ghost = Box::new(expr(ExprKind::Ident("ghost".into())));
        let e = binary(BinaryOp::Add, ghost, int(1));
        let Type::Error(diags) = e.type_of(&scopes, scopes.root()) else {
            panic!("expected error type");
        };
        assert_eq!(diags.len(), 1);
    }

    #[test]
    fn identifier_resolves_through_chain() {
        let mut scopes = ScopeTree::new();
        let root = scopes.root();
        scopes.define(
            root,
            "x",
            Symbol::Variable(VariableSymbol {
                name: "x".into(),
                ty: Type::Double,
                defined_at: Span::dummy(),
            }),
        );
        let inner = scopes.child(root, "Subblock");
        let e = expr(ExprKind::Ident("x".into()));
        assert_eq!(e.type_of(&scopes, inner), Type::Double);
    }

    #[test]
    fn null_equality_with_reference() {
        let mut scopes = ScopeTree::new();
        let root = scopes.root();
        scopes.define(
            root,
            "s",
            Symbol::Variable(VariableSymbol {
                name: "s".into(),
                ty: Type::Named("Shape".into()),
                defined_at: Span::dummy(),
            }),
        );
        let e = binary(
            BinaryOp::Eq,
            Box::new(expr(ExprKind::Ident("s".into()))),
            Box::new(expr(ExprKind::Null)),
        );
        assert_eq!(e.type_of(&scopes, root), Type::Bool);
    }
}
