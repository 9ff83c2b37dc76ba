//! Maps raw error text to a short user-facing message.
//!
//! This is a best-effort heuristic: it looks for fixed substrings in the
//! lowercased error text, so a change in upstream wording silently moves an
//! error into the [`ErrorCategory::Other`] bucket.

use std::fmt::Display;

/// What went wrong, as far as the user is concerned.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ErrorCategory {
    /// Credential rejected or missing
    InvalidApiKey,
    /// Account has a billing problem
    Billing,
    /// Too many requests
    RateLimit,
    /// Anything else, carrying the original error text
    Other(String),
}

/// Ordered rules, first match wins.
const RULES: &[(&str, ErrorCategory)] = &[
    ("api key", ErrorCategory::InvalidApiKey),
    ("billing", ErrorCategory::Billing),
    ("rate limit", ErrorCategory::RateLimit),
];

impl ErrorCategory {
    /// Classifies an error by its display text.
    pub fn classify<E: Display + ?Sized>(error: &E) -> Self {
        let text = error.to_string();
        let lowered = text.to_lowercase();
        RULES
            .iter()
            .find(|(needle, _)| lowered.contains(needle))
            .map(|(_, category)| category.clone())
            .unwrap_or(ErrorCategory::Other(text))
    }

    /// The canned message shown to the user.
    pub fn user_message(&self) -> String {
        match self {
            ErrorCategory::InvalidApiKey => {
                "Invalid OpenAI API key. Please check your settings.".to_string()
            }
            ErrorCategory::Billing => {
                "OpenAI billing issue. Please check your OpenAI account.".to_string()
            }
            ErrorCategory::RateLimit => "Rate limit exceeded. Please try again later.".to_string(),
            ErrorCategory::Other(text) => format!("An error occurred: {text}"),
        }
    }
}

/// Shorthand for `ErrorCategory::classify(error).user_message()`.
pub fn classify_error<E: Display + ?Sized>(error: &E) -> String {
    ErrorCategory::classify(error).user_message()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DeghiblifyError;

    #[test]
    fn api_key_matches_case_insensitively() {
        let err = DeghiblifyError::Api {
            status: 401,
            message: "Incorrect API key provided: sk-abc.".to_string(),
        };
        assert_eq!(ErrorCategory::classify(&err), ErrorCategory::InvalidApiKey);
        assert_eq!(
            classify_error(&err),
            "Invalid OpenAI API key. Please check your settings."
        );
    }

    #[test]
    fn missing_key_is_an_api_key_problem() {
        assert_eq!(
            ErrorCategory::classify(&DeghiblifyError::MissingApiKey),
            ErrorCategory::InvalidApiKey
        );
    }

    #[test]
    fn billing_outranks_rate_limit() {
        let category = ErrorCategory::classify("Rate limit exceeded; check billing details");
        assert_eq!(category, ErrorCategory::Billing);
    }

    #[test]
    fn api_key_outranks_everything() {
        let category = ErrorCategory::classify("rate limit hit for api key, billing pending");
        assert_eq!(category, ErrorCategory::InvalidApiKey);
    }

    #[test]
    fn rate_limit_alone() {
        assert_eq!(
            classify_error("Rate limit exceeded for requests"),
            "Rate limit exceeded. Please try again later."
        );
    }

    #[test]
    fn unmatched_text_is_wrapped_verbatim() {
        assert_eq!(
            classify_error("Connection reset by Peer"),
            "An error occurred: Connection reset by Peer"
        );
    }
}
