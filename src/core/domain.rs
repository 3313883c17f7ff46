use std::fmt;
use std::sync::LazyLock;

use itertools::Itertools;
use regex::Regex;
use uuid::Uuid;

use crate::constants::CLASS_PATTERN;
use crate::core::traits::compiler::CompileError;

static CLASS_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(CLASS_PATTERN).expect("class pattern is a valid regex"));

/// Submitted source text together with the class name found in it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceUnit {
    pub class_name: String,
    pub text: String,
}

impl SourceUnit {
    pub fn parse(text: &str) -> Result<Self, CompileError> {
        let class_name = CLASS_REGEX
            .captures(text)
            .and_then(|captures| captures.get(1))
            .map(|name| name.as_str().to_string())
            .ok_or(CompileError::NoClassName)?;

        Ok(SourceUnit {
            class_name,
            text: text.to_string(),
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Severity {
    Error,
    Warning,
    Note,
    Other,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Note => "note",
            Severity::Other => "info",
        };
        f.write_str(label)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Position {
    pub line: u64,
    pub column: Option<u64>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    pub source: Option<String>,
    pub position: Option<Position>,
}

impl Diagnostic {
    pub fn new(severity: Severity, message: &str) -> Self {
        Diagnostic {
            severity,
            message: message.to_string(),
            source: None,
            position: None,
        }
    }

    pub fn at(mut self, source: &str, line: u64, column: Option<u64>) -> Self {
        self.source = Some(source.to_string());
        self.position = Some(Position { line, column });
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(source) = &self.source {
            write!(f, "{}:", source)?;
        }
        if let Some(position) = &self.position {
            write!(f, "{}:", position.line)?;
            if let Some(column) = position.column {
                write!(f, "{}:", column)?;
            }
        }
        if self.source.is_some() || self.position.is_some() {
            f.write_str(" ")?;
        }
        write!(f, "{}: {}", self.severity, self.message)
    }
}

/// Ordered sink the toolchain reports into during one compilation.
#[derive(Clone, Debug, Default)]
pub struct DiagnosticCollector {
    diagnostics: Vec<Diagnostic>,
}

impl DiagnosticCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn report(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| d.is_error())
    }

    pub fn error_count(&self) -> usize {
        self.errors().count()
    }

    pub fn has_errors(&self) -> bool {
        self.errors().next().is_some()
    }

    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    /// One diagnostic per line, in report order.
    pub fn render(&self) -> String {
        self.diagnostics.iter().join("\n")
    }

    pub fn into_inner(self) -> Vec<Diagnostic> {
        self.diagnostics
    }
}

impl<'a> IntoIterator for &'a DiagnosticCollector {
    type Item = &'a Diagnostic;
    type IntoIter = std::slice::Iter<'a, Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.diagnostics.iter()
    }
}

/// Result of a compile call that reached the toolchain.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CompileOutcome {
    Success {
        class_name: String,
        bytecode: Vec<u8>,
    },
    /// The toolchain reported failure; details are in the diagnostics.
    CompileFailed { errors: usize },
    /// The toolchain succeeded but nothing was produced under the expected name.
    NameMismatch {
        expected: String,
        registered: Vec<String>,
    },
    /// Another compilation replaced this call's output before it was read.
    Overwritten { class_name: String },
}

impl CompileOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, CompileOutcome::Success { .. })
    }

    pub fn bytecode(&self) -> Option<&[u8]> {
        match self {
            CompileOutcome::Success { bytecode, .. } => Some(bytecode),
            _ => None,
        }
    }

    pub fn into_bytecode(self) -> Option<Vec<u8>> {
        match self {
            CompileOutcome::Success { bytecode, .. } => Some(bytecode),
            _ => None,
        }
    }
}

impl fmt::Display for CompileOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompileOutcome::Success {
                class_name,
                bytecode,
            } => write!(f, "compiled {} ({} bytes)", class_name, bytecode.len()),
            CompileOutcome::CompileFailed { errors } => {
                write!(f, "compilation failed with {} error(s)", errors)
            }
            CompileOutcome::NameMismatch {
                expected,
                registered,
            } => write!(
                f,
                "no class named {} was produced (produced: [{}])",
                expected,
                registered.iter().join(", ")
            ),
            CompileOutcome::Overwritten { class_name } => write!(
                f,
                "output for {} was replaced by a concurrent compilation",
                class_name
            ),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Artifact {
    pub id: Uuid,
    pub class_name: String,
    pub bytecode: Vec<u8>,
    pub compiled_at: chrono::DateTime<chrono::Utc>,
}
