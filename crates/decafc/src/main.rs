use std::fs;
use std::path::PathBuf;
use std::process;

use ariadne::{Color, Label, Report, ReportKind, Source};
use clap::Parser;

use decaf_common::Diagnostic;
use decaf_compiler::lexer::Lexer;
use decaf_compiler::parser;
use decaf_compiler::semantic;

/// Decaf front-end driver.
///
/// Runs lexing, parsing, and semantic analysis over a source file.
#[derive(Parser)]
#[command(
    name = "decafc",
    version,
    about,
    long_about = "Decaf front-end driver.\n\nLexes, parses, and semantically analyzes a Decaf source file.\nDiagnostics go to stderr; the scope tree goes to stdout.\n\nExamples:\n  decafc program.decaf             Analyze and dump the scope tree\n  decafc program.decaf --check     Diagnostics only\n  decafc program.decaf --pretty    Render diagnostics as source reports"
)]
struct Cli {
    /// Input Decaf source file.
    input: PathBuf,

    /// Report diagnostics only; do not dump the scope tree.
    #[arg(long)]
    check: bool,

    /// Suppress warning output.
    #[arg(short, long)]
    quiet: bool,

    /// Render diagnostics as colored source reports instead of the plain
    /// line/caret format.
    #[arg(long)]
    pretty: bool,

    /// Emit the token stream to stdout (debug).
    #[arg(long = "emit-tokens")]
    emit_tokens: bool,

    /// Emit the AST to stdout (debug).
    #[arg(long = "emit-ast")]
    emit_ast: bool,
}

fn main() {
    let cli = Cli::parse();

    let source = match fs::read_to_string(&cli.input) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: could not read '{}': {}", cli.input.display(), e);
            process::exit(1);
        }
    };

    let file_name = cli
        .input
        .file_name()
        .unwrap_or_default()
        .to_string_lossy()
        .to_string();

    // === Lexer ===
    let (tokens, lex_diags) = Lexer::new(&source).tokenize();

    print_diagnostics(&cli, lex_diags.diagnostics(), &source, &file_name);
    if lex_diags.has_errors() {
        process::exit(1);
    }

    if cli.emit_tokens {
        for token in &tokens {
            println!(
                "{:>4}:{:<3} {:?} {:?}",
                token.span.start.line, token.span.start.column, token.kind, token.lexeme,
            );
        }
        return;
    }

    // === Parser ===
    let (program, parse_diags) = parser::Parser::new(tokens).parse();

    print_diagnostics(&cli, parse_diags.diagnostics(), &source, &file_name);
    if parse_diags.has_errors() {
        process::exit(1);
    }

    if cli.emit_ast {
        println!("{:#?}", program);
        return;
    }

    // === Semantic analysis ===
    let (scopes, sem_diags) = semantic::analyze(&program);

    print_diagnostics(&cli, sem_diags.diagnostics(), &source, &file_name);

    if !cli.check {
        print!("{}", scopes.render());
    }

    if sem_diags.has_errors() {
        process::exit(1);
    }
}

fn print_diagnostics(cli: &Cli, diagnostics: &[Diagnostic], source: &str, file_name: &str) {
    for diag in diagnostics {
        if cli.quiet && !diag.is_error() {
            continue;
        }
        if cli.pretty {
            print_pretty(diag, source, file_name);
        } else {
            eprintln!("{}", diag.render(source));
        }
    }
}

fn print_pretty(diag: &Diagnostic, source: &str, file_name: &str) {
    let kind = if diag.is_error() {
        ReportKind::Error
    } else {
        ReportKind::Warning
    };

    if let Some(ref span) = diag.span {
        let start = span.start.offset as usize;
        let end = (span.end.offset as usize).max(start + 1);

        let color = if diag.is_error() {
            Color::Red
        } else {
            Color::Yellow
        };

        let mut report = Report::build(kind, file_name, start)
            .with_message(&diag.message)
            .with_label(
                Label::new((file_name, start..end))
                    .with_message(&diag.message)
                    .with_color(color),
            );

        for related in &diag.related {
            let rs = related.span.start.offset as usize;
            let re = (related.span.end.offset as usize).max(rs + 1);
            report = report.with_label(
                Label::new((file_name, rs..re))
                    .with_message(&related.message)
                    .with_color(Color::Blue),
            );
        }

        let _ = report.finish().eprint((file_name, Source::from(source)));
    } else {
        let prefix = if diag.is_error() { "error" } else { "warning" };
        eprintln!("{}: {}", prefix, diag.message);
    }
}
