pub mod errors;
pub mod span;

pub use errors::{Diagnostic, DiagnosticBag, DiagnosticKind, Severity};
pub use span::{Position, Span};
