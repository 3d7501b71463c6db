/// Source position within a file (1-based line/column, 0-based byte offset).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Position {
    /// 1-based line number.
    pub line: u32,
    /// 1-based column number.
    pub column: u32,
    /// 0-based byte offset from start of file.
    pub offset: u32,
}

/// A range in source code, from `start` (inclusive) to `end` (exclusive).
///
/// The front-end operates on a single source file at a time, so spans do not
/// carry a file name; the driver supplies one where rendering needs it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Span {
    pub start: Position,
    pub end: Position,
}

impl Span {
    pub fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }

    /// A span for compiler-generated artifacts with no source location.
    pub fn dummy() -> Self {
        Self::default()
    }

    /// Merge two spans into one that covers both.
    pub fn merge(&self, other: &Span) -> Span {
        let start = if self.start.offset <= other.start.offset {
            self.start
        } else {
            other.start
        };
        let end = if self.end.offset >= other.end.offset {
            self.end
        } else {
            other.end
        };
        Span { start, end }
    }

    /// Extract the source excerpt this span points at: the raw source line
    /// followed by a caret line marking the offending columns. Consecutive
    /// blank lines in the excerpt are collapsed to one.
    pub fn long_string(&self, source: &str) -> String {
        let line_no = self.start.line.max(1) as usize;
        let line = source.lines().nth(line_no - 1).unwrap_or("");

        let start_col = self.start.column.max(1) as usize;
        let width = if self.end.line == self.start.line && self.end.column > self.start.column {
            (self.end.column - self.start.column) as usize
        } else {
            1
        };

        let mut caret = String::new();
        for _ in 1..start_col {
            caret.push(' ');
        }
        for _ in 0..width {
            caret.push('^');
        }

        collapse_blank_lines(&format!("{}\n{}", line, caret))
    }
}

/// Collapse runs of consecutive blank lines down to a single blank line.
fn collapse_blank_lines(text: &str) -> String {
    let mut out = String::new();
    let mut prev_blank = false;
    for line in text.lines() {
        let blank = line.trim().is_empty();
        if blank && prev_blank {
            continue;
        }
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str(line);
        prev_blank = blank;
    }
    out
}

impl std::fmt::Display for Span {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.start.line, self.start.column)
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}
