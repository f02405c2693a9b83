//! Error types and diagnostics.

use thiserror::Error;

use crate::util::diagnostic::{suggestions, Diagnostic};

/// Error raised by the parameter registry, the selection registry, or the
/// serializers.
#[derive(Debug, Error)]
pub enum TunableError {
    #[error("{kind} `{name}` does not exist")]
    NotFound { kind: &'static str, name: String },

    #[error("name `{name}` is ambiguous")]
    Ambiguous { name: String, candidates: Vec<String> },

    #[error("cannot convert `{input}` to {target}")]
    Coercion { input: String, target: String },

    #[error("value {value} of `{name}` is out of range {range}")]
    Range {
        name: String,
        value: String,
        range: String,
    },

    #[error("value {value} of `{name}` was rejected by its validator")]
    Predicate { name: String, value: String },

    #[error("parameter `{name}` has no value")]
    Unset { name: String },

    #[error("capability `{capability}` has multiple defaults")]
    Conflict {
        capability: String,
        defaults: Vec<String>,
    },

    #[error("capability `{capability}` has no implementation")]
    NoImplementation { capability: String },

    #[error("`{choice}` is not a valid choice for `{capability}`")]
    InvalidChoice {
        capability: String,
        choice: String,
        choices: Vec<String>,
    },

    #[error("capability `{capability}` is not {expected}")]
    TypeMismatch {
        capability: String,
        expected: &'static str,
    },

    #[error("failed to construct `{implementation}`")]
    Construction {
        implementation: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("could not load any of {candidates:?}")]
    Import { candidates: Vec<String> },

    #[error("unsupported format `{format}`")]
    UnsupportedFormat { format: String },

    #[error("schema version {found} does not match expected version {expected}")]
    SchemaVersionMismatch { expected: i64, found: i64 },

    #[error("malformed {format} document: {message}")]
    Malformed { format: String, message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl TunableError {
    pub(crate) fn parameter_not_found(name: impl Into<String>) -> Self {
        TunableError::NotFound {
            kind: "tunable",
            name: name.into(),
        }
    }

    pub(crate) fn capability_not_found(name: impl Into<String>) -> Self {
        TunableError::NotFound {
            kind: "capability",
            name: name.into(),
        }
    }

    pub(crate) fn malformed(format: &str, message: impl std::fmt::Display) -> Self {
        TunableError::Malformed {
            format: format.to_string(),
            message: message.to_string(),
        }
    }

    /// Convert to a user-friendly diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            TunableError::NotFound { kind, name } => {
                let diag = Diagnostic::error(format!("{} `{}` does not exist", kind, name));
                if *kind == "tunable" {
                    diag.with_suggestion(suggestions::LIST_TUNABLES)
                } else {
                    diag
                }
            }

            TunableError::Ambiguous { name, candidates } => {
                Diagnostic::error(format!("short name `{}` is ambiguous", name))
                    .with_context(format!("matches: {}", candidates.join(", ")))
                    .with_suggestion(suggestions::QUALIFY_NAME)
            }

            TunableError::Coercion { input, target } => {
                let mut diag =
                    Diagnostic::error(format!("cannot convert `{}` to {}", input, target));
                if target == "bool" {
                    diag = diag.with_context(
                        "accepted booleans: true/yes/t/y/1 and false/no/f/n/0".to_string(),
                    );
                }
                diag
            }

            TunableError::Range { name, value, range } => {
                Diagnostic::error(format!("value {} of `{}` is out of range", value, name))
                    .with_context(format!("allowed range: {}", range))
            }

            TunableError::Predicate { name, value } => Diagnostic::error(format!(
                "value {} of `{}` was rejected by its validator",
                value, name
            )),

            TunableError::Unset { name } => {
                Diagnostic::error(format!("tunable `{}` has no value", name)).with_suggestion(
                    format!("Set it with `--tunable {}=<value>`", name),
                )
            }

            TunableError::Conflict {
                capability,
                defaults,
            } => Diagnostic::error(format!("capability `{}` has multiple defaults", capability))
                .with_context(format!("default implementations: {}", defaults.join(", ")))
                .with_suggestion(format!("Choose one explicitly with `--{}`", capability)),

            TunableError::NoImplementation { capability } => {
                Diagnostic::error(format!("capability `{}` has no implementation", capability))
                    .with_suggestion(suggestions::LOAD_MODULE)
            }

            TunableError::InvalidChoice {
                capability,
                choice,
                choices,
            } => {
                let mut diag = Diagnostic::error(format!(
                    "`{}` is not a valid choice for `{}`",
                    choice, capability
                ));
                if !choices.is_empty() {
                    diag = diag.with_context(format!("valid choices: {}", choices.join(", ")));
                }
                diag
            }

            TunableError::TypeMismatch {
                capability,
                expected,
            } => Diagnostic::error(format!(
                "capability `{}` does not produce {}",
                capability, expected
            )),

            TunableError::Construction {
                implementation,
                source,
            } => Diagnostic::error(format!("failed to construct `{}`", implementation))
                .with_context(source.to_string()),

            TunableError::Import { candidates } => {
                Diagnostic::error("could not load module".to_string())
                    .with_context(format!("tried: {}", candidates.join(", ")))
            }

            TunableError::UnsupportedFormat { format } => {
                Diagnostic::error(format!("unsupported format `{}`", format))
                    .with_suggestion(suggestions::SUPPORTED_FORMATS)
            }

            TunableError::SchemaVersionMismatch { expected, found } => Diagnostic::error(format!(
                "document has schema version {}, expected {}",
                found, expected
            )),

            TunableError::Malformed { format, message } => {
                Diagnostic::error(format!("malformed {} document", format)).with_context(message)
            }

            TunableError::Io(e) => Diagnostic::error(format!("I/O error: {}", e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_choice_diagnostic() {
        let err = TunableError::InvalidChoice {
            capability: "Hasher".to_string(),
            choice: "Md4".to_string(),
            choices: vec!["Sha256".to_string(), "Sha512".to_string()],
        };

        let output = err.to_diagnostic().format(false);
        assert!(output.contains("`Md4` is not a valid choice for `Hasher`"));
        assert!(output.contains("Sha256, Sha512"));
    }

    #[test]
    fn test_coercion_diagnostic_lists_booleans() {
        let err = TunableError::Coercion {
            input: "maybe".to_string(),
            target: "bool".to_string(),
        };

        let output = err.to_diagnostic().format(false);
        assert!(output.contains("cannot convert `maybe` to bool"));
        assert!(output.contains("true/yes/t/y/1"));
    }
}
