//! Sanity checks on loaded configuration.
//!
//! Values that would make the bot silently lose feedback are errors; values
//! that merely degrade it are warnings.

use folio_markup::TELEGRAM_MAX_MESSAGE_LEN;

use crate::schema::FolioConfig;

/// Fragment limits below this split even short reviews into many messages.
const SMALL_FRAGMENT_LIMIT: usize = 256;

/// Severity level for a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Error,
    Warning,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warning => write!(f, "warning"),
        }
    }
}

/// A single validation diagnostic.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Dotted path, e.g. "review.fragment_limit"
    pub path: &'static str,
    pub message: String,
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}: {}", self.severity, self.path, self.message)
    }
}

/// Result of validating a configuration.
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub diagnostics: Vec<Diagnostic>,
}

impl ValidationResult {
    /// Returns `true` if any diagnostic is an error.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Warning)
    }

    fn push(&mut self, severity: Severity, path: &'static str, message: impl Into<String>) {
        self.diagnostics.push(Diagnostic {
            severity,
            path,
            message: message.into(),
        });
    }
}

/// Check value ranges that serde cannot express.
#[must_use]
pub fn validate(config: &FolioConfig) -> ValidationResult {
    let mut result = ValidationResult::default();
    let review = &config.review;

    if review.debounce_ms == 0 {
        result.push(
            Severity::Error,
            "review.debounce_ms",
            "must be greater than 0, otherwise every album image is reviewed on its own",
        );
    }

    match review.fragment_limit {
        0 => result.push(
            Severity::Error,
            "review.fragment_limit",
            "must be greater than 0",
        ),
        limit if limit > TELEGRAM_MAX_MESSAGE_LEN => result.push(
            Severity::Error,
            "review.fragment_limit",
            format!("{limit} exceeds Telegram's limit of {TELEGRAM_MAX_MESSAGE_LEN}"),
        ),
        limit if limit < SMALL_FRAGMENT_LIMIT => result.push(
            Severity::Warning,
            "review.fragment_limit",
            format!("{limit} is small; reviews will arrive in many pieces"),
        ),
        _ => {},
    }

    if review.evaluation_timeout_secs == 0 {
        result.push(
            Severity::Error,
            "review.evaluation_timeout_secs",
            "must be greater than 0, otherwise every review times out",
        );
    }

    if config.evaluator.base_url.trim().is_empty() {
        result.push(Severity::Error, "evaluator.base_url", "must not be empty");
    }

    result
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, rstest::rstest};

    fn diagnostics_for(toml_str: &str) -> ValidationResult {
        let config: FolioConfig = toml::from_str(toml_str).unwrap();
        validate(&config)
    }

    #[test]
    fn defaults_are_clean() {
        assert!(validate(&FolioConfig::default()).diagnostics.is_empty());
    }

    #[rstest]
    #[case("[review]\nfragment_limit = 0", "review.fragment_limit")]
    #[case("[review]\nfragment_limit = 5000", "review.fragment_limit")]
    #[case("[review]\ndebounce_ms = 0", "review.debounce_ms")]
    #[case("[review]\nevaluation_timeout_secs = 0", "review.evaluation_timeout_secs")]
    #[case("[evaluator]\nbase_url = \"\"", "evaluator.base_url")]
    fn out_of_range_values_are_errors(#[case] toml_str: &str, #[case] path: &str) {
        let result = diagnostics_for(toml_str);
        assert!(result.has_errors());
        let error = result.errors().next().unwrap();
        assert_eq!(error.path, path);
    }

    #[test]
    fn small_fragment_limit_is_a_warning() {
        let result = diagnostics_for("[review]\nfragment_limit = 100");
        assert!(!result.has_errors());
        let warning = result.warnings().next().unwrap();
        assert_eq!(warning.path, "review.fragment_limit");
        assert!(warning.to_string().starts_with("warning review.fragment_limit"));
    }
}
