//! Log Redaction
//!
//! Scrubs API keys and bearer tokens from strings prior to logging. Upstream
//! error bodies sometimes echo the request's credentials back.

use once_cell::sync::Lazy;
use regex::Regex;

static API_KEY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(sk-(?:or-v1-)?[a-zA-Z0-9\-_]{20,})|(Bearer\s+[a-zA-Z0-9\-\._~+/]+=*)").unwrap()
});

/// Redacts sensitive patterns in a string.
pub fn redact_sensitive_data(input: &str) -> String {
    API_KEY_RE.replace_all(input, "[REDACTED_TOKEN]").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redacts_bearer_and_keys() {
        let raw = "bad auth: Bearer eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9 \
                   key sk-or-v1-0123456789abcdef0123456789";
        let clean = redact_sensitive_data(raw);
        assert!(!clean.contains("eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9"));
        assert!(!clean.contains("sk-or-v1-0123456789abcdef0123456789"));
        assert!(clean.starts_with("bad auth: "));
    }

    #[test]
    fn leaves_ordinary_text_alone() {
        let raw = "model endpoint returned 500: upstream overloaded";
        assert_eq!(redact_sensitive_data(raw), raw);
    }
}
