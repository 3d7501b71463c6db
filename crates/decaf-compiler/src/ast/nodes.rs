use std::cell::Cell;

use decaf_common::Span;

use crate::semantic::scope::ScopeId;

use super::types::TypeAnnotation;

/// Back-reference from an AST node to the lexical scope governing it.
///
/// The parser creates every node with an unset cell; the scope decorator
/// assigns each exactly once. Reading an unset cell in a later pass is an
/// internal invariant violation.
pub type ScopeCell = Cell<Option<ScopeId>>;

/// Fetch a node's decorated scope; panics if decoration never ran.
pub fn scope_of(cell: &ScopeCell) -> ScopeId {
    cell.get().expect("AST node has no scope; decoration must run first")
}

// ============================================================================
// Program (top-level)
// ============================================================================

/// A complete Decaf program: a list of top-level declarations.
#[derive(Debug, Clone)]
pub struct Program {
    pub decls: Vec<Decl>,
    pub span: Span,
    pub scope: ScopeCell,
}

// ============================================================================
// Declarations
// ============================================================================

#[derive(Debug, Clone)]
pub enum Decl {
    Var(VarDecl),
    Fn(FnDecl),
    Class(ClassDecl),
    Interface(InterfaceDecl),
}

/// `Type name;` (also used for formals and class fields).
#[derive(Debug, Clone)]
pub struct VarDecl {
    pub name: String,
    pub ty: TypeAnnotation,
    pub span: Span,
    pub scope: ScopeCell,
}

/// A function or method declaration. `body` is absent for interface
/// prototypes.
///
/// After decoration, `scope` is the formals sub-scope; the scope the
/// function's name is declared in is its parent.
#[derive(Debug, Clone)]
pub struct FnDecl {
    pub name: String,
    pub return_type: TypeAnnotation,
    pub formals: Vec<VarDecl>,
    pub body: Option<StmtBlock>,
    pub span: Span,
    pub scope: ScopeCell,
}

/// A bare class or interface name in an `extends`/`implements` clause.
#[derive(Debug, Clone)]
pub struct NamedTypeRef {
    pub name: String,
    pub span: Span,
}

/// `class Name extends Base implements I1, I2 { members }`
///
/// After decoration, `scope` is the class's own scope (the one holding
/// `this` and the members).
#[derive(Debug, Clone)]
pub struct ClassDecl {
    pub name: String,
    pub extends: Option<NamedTypeRef>,
    pub implements: Vec<NamedTypeRef>,
    pub members: Vec<Decl>,
    pub span: Span,
    pub scope: ScopeCell,
}

/// `interface Name { prototypes }`
#[derive(Debug, Clone)]
pub struct InterfaceDecl {
    pub name: String,
    pub members: Vec<FnDecl>,
    pub span: Span,
    pub scope: ScopeCell,
}

// ============================================================================
// Statements
// ============================================================================

#[derive(Debug, Clone)]
pub enum Stmt {
    Block(StmtBlock),
    If(IfStmt),
    While(WhileStmt),
    For(ForStmt),
    Return(ReturnStmt),
    Break(BreakStmt),
    Print(PrintStmt),
    Switch(SwitchStmt),
    Expr(Expr),
    /// A bare `;`.
    Empty,
}

/// `{ decls stmts }`. Declarations may interleave with statements in
/// source order, but are kept separate for scope population.
#[derive(Debug, Clone)]
pub struct StmtBlock {
    pub decls: Vec<VarDecl>,
    pub stmts: Vec<Stmt>,
    pub span: Span,
    pub scope: ScopeCell,
}

#[derive(Debug, Clone)]
pub struct IfStmt {
    pub test: Expr,
    pub then_body: Box<Stmt>,
    pub else_body: Option<Box<Stmt>>,
    pub span: Span,
    pub scope: ScopeCell,
}

#[derive(Debug, Clone)]
pub struct WhileStmt {
    pub test: Expr,
    pub body: Box<Stmt>,
    pub span: Span,
    pub scope: ScopeCell,
}

#[derive(Debug, Clone)]
pub struct ForStmt {
    pub init: Option<Expr>,
    pub test: Expr,
    pub step: Option<Expr>,
    pub body: Box<Stmt>,
    pub span: Span,
    pub scope: ScopeCell,
}

#[derive(Debug, Clone)]
pub struct ReturnStmt {
    pub value: Option<Expr>,
    pub span: Span,
    pub scope: ScopeCell,
}

#[derive(Debug, Clone)]
pub struct BreakStmt {
    pub span: Span,
    pub scope: ScopeCell,
}

/// `Print(arg1, arg2, ...);`
#[derive(Debug, Clone)]
pub struct PrintStmt {
    pub args: Vec<Expr>,
    pub span: Span,
    pub scope: ScopeCell,
}

/// `switch (subject) { case N: stmts ... default: stmts }`
///
/// Parsed and traversed; only the subject expression is typed.
#[derive(Debug, Clone)]
pub struct SwitchStmt {
    pub subject: Expr,
    pub cases: Vec<CaseStmt>,
    pub default: Option<Vec<Stmt>>,
    pub span: Span,
    pub scope: ScopeCell,
}

#[derive(Debug, Clone)]
pub struct CaseStmt {
    pub value: i64,
    pub body: Vec<Stmt>,
    pub span: Span,
    pub scope: ScopeCell,
}

// ============================================================================
// Expressions
// ============================================================================

#[derive(Debug, Clone)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
    pub scope: ScopeCell,
}

impl Expr {
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Self {
            kind,
            span,
            scope: ScopeCell::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub enum ExprKind {
    IntConstant(i64),
    DoubleConstant(f64),
    BoolConstant(bool),
    StringConstant(String),
    Null,
    This,
    Ident(String),
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Assign {
        target: Box<Expr>,
        value: Box<Expr>,
    },
    /// `name(args)` or `receiver.name(args)`.
    Call {
        receiver: Option<Box<Expr>>,
        name: String,
        name_span: Span,
        args: Vec<Expr>,
    },
    FieldAccess {
        base: Box<Expr>,
        field: String,
        field_span: Span,
    },
    Index {
        base: Box<Expr>,
        index: Box<Expr>,
    },
    /// `new ClassName`
    New {
        class_name: String,
    },
    /// `NewArray(size, ElemType)`
    NewArray {
        size: Box<Expr>,
        elem: TypeAnnotation,
    },
    ReadInteger,
    ReadLine,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Lt,
    Lte,
    Gt,
    Gte,
    Eq,
    Neq,
    And,
    Or,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::Lt => "<",
            BinaryOp::Lte => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Gte => ">=",
            BinaryOp::Eq => "==",
            BinaryOp::Neq => "!=",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
        }
    }
}
