//! Credential scrubbing for text and errors headed to observers

use std::borrow::Cow;
use std::sync::OnceLock;

use regex::Regex;

use crate::error::LlmError;

/// Placeholder substituted for secret values
pub const REDACTED: &str = "[REDACTED]";

/// Removes credential-shaped substrings before text reaches observers
pub trait SecretRedactor: Send + Sync {
    /// Redact secrets in `text`, borrowing it unchanged when nothing matched
    fn redact<'a>(&self, text: &'a str) -> Cow<'a, str>;

    /// Redact the message of `error`, keeping its kind
    ///
    /// Returns the original error when its message had nothing to redact.
    fn redact_error<'a>(&self, error: &'a LlmError) -> Cow<'a, LlmError> {
        let Some(detail) = error.detail() else {
            return Cow::Borrowed(error);
        };

        match self.redact(detail) {
            Cow::Borrowed(_) => Cow::Borrowed(error),
            Cow::Owned(clean) => Cow::Owned(error.with_message(clean)),
        }
    }
}

/// Pattern-based redactor for bearer headers and `key=value` credentials
///
/// Only the value is replaced; the key name and surrounding text survive.
#[derive(Debug, Clone, Copy, Default)]
pub struct RegexRedactor;

impl RegexRedactor {
    fn patterns() -> &'static [(Regex, &'static str)] {
        static PATTERNS: OnceLock<Vec<(Regex, &'static str)>> = OnceLock::new();
        PATTERNS.get_or_init(|| {
            [
                (r"(?i)(authorization\s*:\s*bearer)\s+[^\s,;]+", "$1 [REDACTED]"),
                (r"(?i)(api[_-]?key|token|secret|password)\s*=\s*[^\s,;]+", "$1=[REDACTED]"),
                (r"(?i)(x-api-key|access_token|refresh_token)\s*=\s*[^\s,;]+", "$1=[REDACTED]"),
            ]
            .into_iter()
            .map(|(pattern, replacement)| (Regex::new(pattern).expect("must be valid regex"), replacement))
            .collect()
        })
    }
}

impl SecretRedactor for RegexRedactor {
    fn redact<'a>(&self, text: &'a str) -> Cow<'a, str> {
        let mut current = Cow::Borrowed(text);

        for (pattern, replacement) in Self::patterns() {
            let replaced = match pattern.replace_all(&current, *replacement) {
                Cow::Borrowed(_) => None,
                Cow::Owned(s) => Some(s),
            };
            if let Some(s) = replaced {
                current = Cow::Owned(s);
            }
        }

        current
    }
}
