//! Diagnostics and their reporting

use docschema_ast::Range;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Severity of a diagnostic
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Error - the document does not conform
    Error,
    /// Warning - suspicious but accepted
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => f.write_str("error"),
            Severity::Warning => f.write_str("warning"),
        }
    }
}

/// Stable identifier of the rule that produced a diagnostic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DiagnosticCode {
    MissingField,
    TypeMismatch,
    InvalidEnum,
    DefinitionExpected,
    UnknownField,
}

impl DiagnosticCode {
    pub fn as_str(self) -> &'static str {
        match self {
            DiagnosticCode::MissingField => "missing-field",
            DiagnosticCode::TypeMismatch => "type-mismatch",
            DiagnosticCode::InvalidEnum => "invalid-enum",
            DiagnosticCode::DefinitionExpected => "definition-expected",
            DiagnosticCode::UnknownField => "unknown-field",
        }
    }
}

impl fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Positioned validation finding
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub range: Range,
    pub message: String,
    pub severity: Severity,
    pub code: DiagnosticCode,
}

impl Diagnostic {
    pub fn error(range: Range, code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self {
            range,
            message: message.into(),
            severity: Severity::Error,
            code,
        }
    }

    pub fn warning(range: Range, code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self {
            range,
            message: message.into(),
            severity: Severity::Warning,
            code,
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    /// `line:col severity[code]: message`, one-based like editors show it
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{} {}[{}]: {}",
            self.range.start.line + 1,
            self.range.start.character + 1,
            self.severity,
            self.code,
            self.message
        )
    }
}

/// Diagnostics for one document, in emission order
#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationReport {
    pub diagnostics: Vec<Diagnostic>,
}

impl ValidationReport {
    pub fn new(diagnostics: Vec<Diagnostic>) -> Self {
        Self { diagnostics }
    }

    /// Whether no error-severity diagnostic was produced
    pub fn is_valid(&self) -> bool {
        !self.has_errors()
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_error)
    }

    pub fn has_warnings(&self) -> bool {
        self.diagnostics.iter().any(|d| d.severity == Severity::Warning)
    }

    pub fn error_count(&self) -> usize {
        self.diagnostics.iter().filter(|d| d.is_error()).count()
    }

    pub fn warning_count(&self) -> usize {
        self.diagnostics.len() - self.error_count()
    }

    /// Plain-text listing, one diagnostic per line prefixed with `source`
    pub fn render_text(&self, source: &str) -> String {
        let mut out = String::new();
        for diagnostic in &self.diagnostics {
            out.push_str(source);
            out.push(':');
            out.push_str(&diagnostic.to_string());
            out.push('\n');
        }
        out
    }
}
