//! Lexer, parser and semantic analyzer for the Trill language.
//!
//! Lexer -> parser -> typechecker as sequential, independently testable
//! stages, glued by a thin pipeline function rather than a monolithic
//! driver.

pub mod decl_ref;
pub mod diagnostics;
pub mod formatter;
pub mod lexer;
pub mod parser;
pub mod sema;
pub mod source;

use diagnostics::Diagnostic;
use parser::ast::SourceUnit;
use sema::ASTContext;
use source::{FileId, SourceFileManager};

/// Lexes and parses a single source file, returning the parsed unit and any
/// parse-phase diagnostics. Does not run semantic analysis. A lex failure
/// yields an empty unit plus the lex diagnostic, since the hand-rolled
/// scanner has no partial-recovery mode.
pub fn parse_file(files: &SourceFileManager, file: FileId) -> (SourceUnit, Vec<Diagnostic>) {
    let source = &files.get(file).contents;
    match lexer::Lexer::new(source, file).lex() {
        Ok(tokens) => {
            let mut p = parser::Parser::new(tokens);
            let unit = p.parse_source_unit();
            let diagnostics =
                p.into_errors().into_iter().map(|e| Diagnostic::error(e.to_string(), e.range)).collect();
            (unit, diagnostics)
        }
        Err(e) => {
            let unit = SourceUnit { declarations: vec![], range: e.range };
            (unit, vec![Diagnostic::error(e.to_string(), Some(e.range))])
        }
    }
}

/// Runs the full pipeline (parse, register, constraint-solve, type-check)
/// over a single source file and returns the populated context plus every
/// diagnostic emitted along the way.
pub fn check_file(files: &SourceFileManager, file: FileId) -> (ASTContext, Vec<Diagnostic>) {
    let (unit, mut diagnostics) = parse_file(files, file);
    let mut ctx = ASTContext::new();
    let mut analyzer = sema::analyzer::Analyzer::new(&mut ctx);
    analyzer.run(vec![unit]);
    for e in sema::typecheck::check(&ctx) {
        ctx.emit_error(&e);
    }
    diagnostics.extend(ctx.diagnostics());
    (ctx, diagnostics)
}
