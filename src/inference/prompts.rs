//! Prompt rendering
//!
//! The prompt is handed to the binary as-is; the only rewriting done here is
//! the optional language instruction.

use crate::inference::runner::InvokeError;
use once_cell::sync::Lazy;
use regex::Regex;

/// Language hints look like `en`, `es`, `pt-BR` or `zh-Hant`
static LANGUAGE_TAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z]{2,3}(-[A-Za-z0-9]{2,8})*$").expect("language tag pattern is valid")
});

/// Validate a language hint and return it trimmed
pub fn validate_language(language: &str) -> Result<String, InvokeError> {
    let language = language.trim();
    if LANGUAGE_TAG.is_match(language) {
        Ok(language.to_string())
    } else {
        Err(InvokeError::InvalidParameters(format!(
            "language must be a language code such as 'en' or 'pt-BR', got '{}'",
            language
        )))
    }
}

/// Append the response-language instruction when a hint is present
pub fn with_language_instruction(prompt: &str, language: Option<&str>) -> String {
    match language {
        Some(language) => format!("{}\n\nRespond in language: {}.", prompt, language),
        None => prompt.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_languages() {
        for tag in ["en", "es", "deu", "pt-BR", "zh-Hant", " fr "] {
            assert!(validate_language(tag).is_ok(), "{} should be accepted", tag);
        }
        assert_eq!(validate_language(" fr ").unwrap(), "fr");
    }

    #[test]
    fn test_invalid_languages() {
        for tag in ["", "e", "english language", "en_US", "en-", "en; rm -rf /"] {
            assert!(
                matches!(validate_language(tag), Err(InvokeError::InvalidParameters(_))),
                "{:?} should be rejected",
                tag
            );
        }
    }

    #[test]
    fn test_language_instruction() {
        assert_eq!(
            with_language_instruction("Explain entanglement.", None),
            "Explain entanglement."
        );
        assert_eq!(
            with_language_instruction("Explain entanglement.", Some("es")),
            "Explain entanglement.\n\nRespond in language: es."
        );
    }
}
