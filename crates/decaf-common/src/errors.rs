use crate::span::Span;

/// Severity level of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

/// The closed taxonomy of diagnostics the front-end can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticKind {
    /// Anything without a more specific classification.
    General,
    Lexical,
    Syntax,
    ConflictingDecl,
    UndeclaredType,
    InheritanceCycle,
    TypeSignature,
    UnimplementedInterface,
    InvalidTest,
    IncompatibleReturn,
    IncompatibleArgument,
    BreakOutsideLoop,
    TypeError,
}

/// A related source location providing additional context for a diagnostic.
#[derive(Debug, Clone)]
pub struct RelatedSpan {
    pub span: Span,
    pub message: String,
}

/// A compiler diagnostic.
///
/// The `message` already carries the user-facing prefix (`***` or `**`);
/// `render` adds the `*** Error line N.` header and the source excerpt.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    pub kind: DiagnosticKind,
    pub message: String,
    pub span: Option<Span>,
    pub related: Vec<RelatedSpan>,
}

impl Diagnostic {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            kind: DiagnosticKind::General,
            message: message.into(),
            span: None,
            related: Vec::new(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            kind: DiagnosticKind::General,
            message: message.into(),
            span: None,
            related: Vec::new(),
        }
    }

    pub fn with_kind(mut self, kind: DiagnosticKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }

    pub fn with_related(mut self, span: Span, message: impl Into<String>) -> Self {
        self.related.push(RelatedSpan {
            span,
            message: message.into(),
        });
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    /// Render this diagnostic in the fixed textual format checked by the
    /// golden tests:
    ///
    /// ```text
    /// *** Error line <N>.
    /// <source line with a caret under the offending columns>
    /// <message>
    /// ```
    ///
    /// A diagnostic without a span renders as the bare message.
    pub fn render(&self, source: &str) -> String {
        match self.span {
            Some(span) => format!(
                "*** Error line {}.\n{}\n{}",
                span.start.line,
                span.long_string(source),
                self.message
            ),
            None => self.message.clone(),
        }
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let prefix = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        write!(f, "{}: {}", prefix, self.message)?;
        if let Some(ref span) = self.span {
            write!(f, "\n  --> {}", span)?;
        }
        Ok(())
    }
}

/// Convenience collector for diagnostics during compilation.
///
/// Diagnostics are kept in emission order; the pipeline never reorders them.
#[derive(Debug, Default)]
pub struct DiagnosticBag {
    diagnostics: Vec<Diagnostic>,
}

impl DiagnosticBag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn report(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    pub fn error(&mut self, message: impl Into<String>, span: Span) {
        self.report(Diagnostic::error(message).with_span(span));
    }

    pub fn warning(&mut self, message: impl Into<String>, span: Span) {
        self.report(Diagnostic::warning(message).with_span(span));
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(|d| d.is_error())
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics
    }

    /// Move every diagnostic out of `other` into this bag, preserving order.
    pub fn absorb(&mut self, other: DiagnosticBag) {
        self.diagnostics.extend(other.diagnostics);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::span::Position;

    fn span_on_line(line: u32, column: u32, width: u32) -> Span {
        Span {
            start: Position {
                line,
                column,
                offset: 0,
            },
            end: Position {
                line,
                column: column + width,
                offset: 0,
            },
        }
    }

    #[test]
    fn render_golden_format() {
        let source = "int x;\nint x;\n";
        let diag = Diagnostic::error("*** Declaration of 'x' here conflicts with declaration on line 1")
            .with_kind(DiagnosticKind::ConflictingDecl)
            .with_span(span_on_line(2, 5, 1));
        assert_eq!(
            diag.render(source),
            "*** Error line 2.\nint x;\n    ^\n*** Declaration of 'x' here conflicts with declaration on line 1"
        );
    }

    #[test]
    fn render_without_span_is_bare_message() {
        let diag = Diagnostic::error("*** something went wrong");
        assert_eq!(diag.render(""), "*** something went wrong");
    }

    #[test]
    fn bag_tracks_errors() {
        let mut bag = DiagnosticBag::new();
        assert!(!bag.has_errors());
        bag.warning("just a warning", Span::dummy());
        assert!(!bag.has_errors());
        bag.error("an error", Span::dummy());
        assert!(bag.has_errors());
        assert_eq!(bag.len(), 2);
    }

    #[test]
    fn absorb_preserves_order() {
        let mut a = DiagnosticBag::new();
        a.error("first", Span::dummy());
        let mut b = DiagnosticBag::new();
        b.error("second", Span::dummy());
        a.absorb(b);
        let msgs: Vec<_> = a.diagnostics().iter().map(|d| d.message.as_str()).collect();
        assert_eq!(msgs, vec!["first", "second"]);
    }
}
