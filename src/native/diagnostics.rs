use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use crate::core::domain::{Diagnostic, Position, Severity};

static LOCATED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<file>.+?):(?P<line>\d+): (?P<kind>error|warning|[Nn]ote): (?P<message>.*)$")
        .expect("located diagnostic pattern is a valid regex")
});
static BARE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<kind>error|warning|[Nn]ote): (?P<message>.*)$")
        .expect("bare diagnostic pattern is a valid regex")
});
static SUMMARY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\d+ (errors?|warnings?)$").expect("summary pattern is a valid regex")
});

/// Drops every `source_root` prefix from free-form text, so temporary
/// paths never reach the caller.
fn strip_root(text: &str, source_root: &Path) -> String {
    let root = source_root.to_string_lossy();
    if root.is_empty() {
        return text.to_string();
    }
    text.replace(&format!("{}{}", root, std::path::MAIN_SEPARATOR), "")
        .replace(&*root, "")
}

fn severity(kind: &str) -> Severity {
    match kind {
        "error" => Severity::Error,
        "warning" => Severity::Warning,
        _ => Severity::Note,
    }
}

/// Turns javac's human readable stderr into diagnostics.
///
/// A located diagnostic is followed by an echo of the offending source
/// line and a caret line; the caret gives the column. Lines after the
/// caret (`symbol:`, `location:`) are appended to the message.
/// File paths under `source_root` are reported relative to it.
pub fn parse_javac_output(output: &str, source_root: &Path) -> Vec<Diagnostic> {
    let mut diagnostics: Vec<Diagnostic> = Vec::new();
    let mut seen_caret = true;

    for line in output.lines() {
        let trimmed = line.trim_end();
        if trimmed.is_empty() || SUMMARY.is_match(trimmed) {
            continue;
        }

        if let Some(captures) = LOCATED.captures(trimmed) {
            let file = Path::new(&captures["file"]);
            let source = file
                .strip_prefix(source_root)
                .unwrap_or(file)
                .to_string_lossy()
                .to_string();
            let line_number = captures["line"].parse().unwrap_or(0);

            diagnostics.push(Diagnostic {
                severity: severity(&captures["kind"]),
                message: captures["message"].to_string(),
                source: Some(source),
                position: Some(Position {
                    line: line_number,
                    column: None,
                }),
            });
            seen_caret = false;
            continue;
        }

        if let Some(captures) = BARE.captures(trimmed) {
            diagnostics.push(Diagnostic::new(
                severity(&captures["kind"]),
                &strip_root(&captures["message"], source_root),
            ));
            seen_caret = true;
            continue;
        }

        match diagnostics.last_mut() {
            Some(last) if last.position.is_some() && !seen_caret => {
                if trimmed.trim_start() == "^" {
                    let column = trimmed.chars().position(|c| c == '^').map(|i| i as u64 + 1);
                    if let Some(position) = last.position.as_mut() {
                        position.column = column;
                    }
                    seen_caret = true;
                }
                // Anything else before the caret is the echoed source line.
            }
            Some(last) if line.starts_with(char::is_whitespace) => {
                last.message.push('\n');
                last.message.push_str(&strip_root(trimmed.trim_start(), source_root));
            }
            _ => diagnostics.push(Diagnostic::new(
                Severity::Other,
                &strip_root(trimmed, source_root),
            )),
        }
    }

    diagnostics
}

/// Parses a finished javac run. A failed run always yields at least one
/// error: when nothing in `output` was recognised as one, the whole output
/// is reported as a single unlocated error.
pub fn collect_javac_output(output: &str, source_root: &Path, succeeded: bool) -> Vec<Diagnostic> {
    let mut diagnostics = parse_javac_output(output, source_root);
    if !succeeded && !diagnostics.iter().any(Diagnostic::is_error) {
        let message = strip_root(output.trim(), source_root);
        let message = if message.is_empty() {
            "javac failed without output"
        } else {
            message.as_str()
        };
        diagnostics.push(Diagnostic::new(Severity::Error, message));
    }
    diagnostics
}
