use crate::span::Span;
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum DiagnosticLevel {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Diagnostic {
    pub level: DiagnosticLevel,
    pub message: String,
    pub span: Option<Span>,
    pub suggestions: Vec<String>,
    pub code: Option<String>,
}

impl Diagnostic {
    fn with_level(level: DiagnosticLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            span: None,
            suggestions: Vec::new(),
            code: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::with_level(DiagnosticLevel::Error, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::with_level(DiagnosticLevel::Warning, message)
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::with_level(DiagnosticLevel::Info, message)
    }

    /// Attach a span unless it is the null span.
    pub fn with_span(mut self, span: Span) -> Self {
        if !span.is_null() {
            self.span = Some(span);
        }
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    /// Same diagnostic at warning level. Used when errors are tolerated.
    pub fn downgraded(mut self) -> Self {
        if self.level == DiagnosticLevel::Error {
            self.level = DiagnosticLevel::Warning;
        }
        self
    }

    pub fn is_error(&self) -> bool {
        self.level == DiagnosticLevel::Error
    }
}

impl Display for Diagnostic {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)?;

        if let Some(code) = &self.code {
            write!(f, " [{}]", code)?;
        }

        if !self.suggestions.is_empty() {
            let hints = self.suggestions.join("; ");
            write!(f, " (hints: {})", hints)?;
        }

        Ok(())
    }
}

/// Where diagnostics go. Reporting never fails and never aborts the caller.
pub trait DiagnosticSink {
    fn report(&mut self, diagnostic: Diagnostic);
}

/// Vec-backed sink that keeps diagnostics in report order.
#[derive(Debug, Clone, Default)]
pub struct DiagnosticLog {
    diagnostics: Vec<Diagnostic>,
}

impl DiagnosticLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_error)
    }

    pub fn with_code<'a>(&'a self, code: &'a str) -> impl Iterator<Item = &'a Diagnostic> + 'a {
        self.diagnostics
            .iter()
            .filter(move |diag| diag.code.as_deref() == Some(code))
    }

    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.diagnostics
    }
}

impl DiagnosticSink for DiagnosticLog {
    fn report(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }
}

impl DiagnosticSink for Vec<Diagnostic> {
    fn report(&mut self, diagnostic: Diagnostic) {
        self.push(diagnostic);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_code_and_hints() {
        let diag = Diagnostic::error("cannot infer type for type parameter 'T'")
            .with_code("E-TP001")
            .with_suggestion("pass an argument for 'T'");
        assert_eq!(
            diag.to_string(),
            "cannot infer type for type parameter 'T' [E-TP001] (hints: pass an argument for 'T')"
        );
    }

    #[test]
    fn null_span_is_not_attached() {
        let diag = Diagnostic::warning("w").with_span(Span::null());
        assert!(diag.span.is_none());
        let diag = Diagnostic::warning("w").with_span(Span::new(1, 4, 9));
        assert_eq!(diag.span, Some(Span::new(1, 4, 9)));
    }

    #[test]
    fn downgrade_only_touches_errors() {
        let mut log = DiagnosticLog::new();
        log.report(Diagnostic::error("e").downgraded());
        log.report(Diagnostic::info("i").downgraded());
        assert!(!log.has_errors());
        assert_eq!(log.diagnostics()[0].level, DiagnosticLevel::Warning);
        assert_eq!(log.diagnostics()[1].level, DiagnosticLevel::Info);
    }
}
