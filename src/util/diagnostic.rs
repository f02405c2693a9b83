//! Error reports for the terminal.
//!
//! A [`Diagnostic`] carries the failing message, the facts that led to it,
//! and the flags or names the user can try next.

use std::fmt;

/// Common suggestion messages for consistent error handling.
pub mod suggestions {
    /// Suggestion when a tunable name is unknown.
    pub const LIST_TUNABLES: &str = "Run with `--tunables-show` to list the declared tunables";

    /// Suggestion when a short name matches several tunables.
    pub const QUALIFY_NAME: &str = "Use the qualified name, e.g. `module::Name`";

    /// Suggestion when a capability has no usable implementation.
    pub const LOAD_MODULE: &str = "Load a module providing one with `--module <name>`";

    /// Suggestion when a file extension has no serializer.
    pub const SUPPORTED_FORMATS: &str =
        "Use one of the extensions .conf, .json, .yaml, .xml, .der";
}

const RED: &str = "\x1b[1;31m";
const GREEN: &str = "\x1b[1;32m";
const RESET: &str = "\x1b[0m";

/// An error report with context lines and numbered suggestions.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub message: String,
    pub context: Vec<String>,
    pub suggestions: Vec<String>,
}

impl Diagnostic {
    pub fn error(message: impl Into<String>) -> Self {
        Diagnostic {
            message: message.into(),
            context: Vec::new(),
            suggestions: Vec::new(),
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context.push(context.into());
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    /// Render for a terminal, with ANSI colors when `color` is set.
    pub fn format(&self, color: bool) -> String {
        let paint = |label: &str, code: &str| {
            if color {
                format!("{}{}{}", code, label, RESET)
            } else {
                label.to_string()
            }
        };

        let mut output = format!("{}: {}\n", paint("error", RED), self.message);
        for line in &self.context {
            output.push_str(&format!("  → {}\n", line));
        }

        if !self.suggestions.is_empty() {
            output.push_str(&format!("\n{}: consider:\n", paint("help", GREEN)));
            for (i, suggestion) in self.suggestions.iter().enumerate() {
                output.push_str(&format!("  {}. {}\n", i + 1, suggestion));
            }
        }

        output
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format(false))
    }
}

/// Print a diagnostic to stderr.
pub fn emit(diagnostic: &Diagnostic, color: bool) {
    eprint!("{}", diagnostic.format(color));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnostic_formatting() {
        let diag = Diagnostic::error("capability `Hasher` has multiple defaults")
            .with_context("default implementations: Sha256, Blake")
            .with_suggestion("Choose one explicitly with `--Hasher`")
            .with_suggestion("Drop the default marker from one implementation");

        let output = diag.format(false);
        assert!(output.starts_with("error: capability `Hasher`"));
        assert!(output.contains("  → default implementations: Sha256, Blake\n"));
        assert!(output.contains("help: consider:"));
        assert!(output.contains("1. Choose one explicitly"));
        assert!(output.contains("2. Drop the default marker"));
        assert_eq!(diag.to_string(), output);
    }

    #[test]
    fn test_color_only_when_asked() {
        let diag = Diagnostic::error("tunable `Salt` has no value")
            .with_suggestion(suggestions::LIST_TUNABLES);

        let plain = diag.format(false);
        assert!(!plain.contains('\x1b'));

        let colored = diag.format(true);
        assert!(colored.starts_with("\x1b[1;31merror\x1b[0m: tunable `Salt`"));
        assert!(colored.contains("\x1b[1;32mhelp\x1b[0m: consider:"));
    }

    #[test]
    fn test_no_help_section_without_suggestions() {
        let output = Diagnostic::error("I/O error: denied").format(false);
        assert_eq!(output, "error: I/O error: denied\n");
    }
}
