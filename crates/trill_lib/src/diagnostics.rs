//! Diagnostic collector.
//!
//! Rendering to a terminal or editor is a downstream concern, so
//! `Diagnostic` stays a plain data structure (kind, message, optional span,
//! optional highlight ranges) rather than a pre-rendered string.

use crate::source::SourceRange;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum DiagnosticKind {
    Error,
    Warning,
    Note,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub message: String,
    pub span: Option<SourceRange>,
    pub highlights: Vec<SourceRange>,
}

impl Diagnostic {
    pub fn error(message: impl Into<String>, span: Option<SourceRange>) -> Self {
        Diagnostic { kind: DiagnosticKind::Error, message: message.into(), span, highlights: vec![] }
    }

    pub fn warning(message: impl Into<String>, span: Option<SourceRange>) -> Self {
        Diagnostic { kind: DiagnosticKind::Warning, message: message.into(), span, highlights: vec![] }
    }

    pub fn note(message: impl Into<String>, span: Option<SourceRange>) -> Self {
        Diagnostic { kind: DiagnosticKind::Note, message: message.into(), span, highlights: vec![] }
    }

    pub fn with_highlight(mut self, range: SourceRange) -> Self {
        self.highlights.push(range);
        self
    }

    /// De-duplication key: message + kind + location.
    fn dedup_key(&self) -> (DiagnosticKind, String, Option<(usize, usize, usize)>) {
        let loc = self.span.map(|s| (s.start.file.0 as usize, s.start.line, s.start.col));
        (self.kind, self.message.clone(), loc)
    }
}

/// Collects diagnostics from every phase, in emission order, de-duplicating
/// on `(kind, message, location)` before flushing.
#[derive(Debug, Default)]
pub struct DiagnosticEngine {
    diagnostics: Vec<Diagnostic>,
}

impl DiagnosticEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn emit(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    pub fn error(&mut self, message: impl Into<String>, span: Option<SourceRange>) {
        self.emit(Diagnostic::error(message, span));
    }

    pub fn warning(&mut self, message: impl Into<String>, span: Option<SourceRange>) {
        self.emit(Diagnostic::warning(message, span));
    }

    pub fn note(&mut self, message: impl Into<String>, span: Option<SourceRange>) {
        self.emit(Diagnostic::note(message, span));
    }

    /// Emission-ordered, de-duplicated diagnostics.
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        let mut seen = std::collections::HashSet::new();
        let mut out = vec![];
        for d in &self.diagnostics {
            if seen.insert(d.dedup_key()) {
                out.push(d.clone());
            }
        }
        out
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(|d| d.kind == DiagnosticKind::Error)
    }

    /// Exit status is non-zero iff the engine recorded at least one error.
    pub fn exit_code(&self) -> i32 {
        if self.has_errors() {
            1
        } else {
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deduplicates_identical_diagnostics() {
        let mut engine = DiagnosticEngine::new();
        engine.error("boom", None);
        engine.error("boom", None);
        assert_eq!(engine.diagnostics().len(), 1);
    }

    #[test]
    fn exit_code_reflects_errors() {
        let mut engine = DiagnosticEngine::new();
        assert_eq!(engine.exit_code(), 0);
        engine.warning("hm", None);
        assert_eq!(engine.exit_code(), 0);
        engine.error("boom", None);
        assert_eq!(engine.exit_code(), 1);
    }
}
