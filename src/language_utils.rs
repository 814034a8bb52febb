use anyhow::{Result, anyhow};
use isolang::Language;

// Language utilities for ISO language code handling
//
// Reduces BCP 47 style tags to their base subtag and validates ISO 639-1
// (2-letter) codes, the only form the caption pipeline hands to the tokenizer.

/// Reduce a possibly region-qualified tag (`pt-BR`, `zh_TW`) to its base subtag
pub fn base_language_code(tag: &str) -> String {
    tag.trim()
        .split(['-', '_'])
        .next()
        .unwrap_or_default()
        .to_lowercase()
}

/// Check whether a code is a known ISO 639-1 (2-letter) code
pub fn is_known_code(code: &str) -> bool {
    let normalized_code = code.trim().to_lowercase();
    normalized_code.len() == 2 && Language::from_639_1(&normalized_code).is_some()
}

/// Validate a language code and return it in canonical 2-letter lowercase form
pub fn validate_language_code(code: &str) -> Result<String> {
    let normalized_code = base_language_code(code);

    if is_known_code(&normalized_code) {
        return Ok(normalized_code);
    }

    Err(anyhow!("Invalid language code: {}", code))
}

/// Get the English language name from a code
pub fn get_language_name(code: &str) -> Result<String> {
    let normalized = validate_language_code(code)?;
    let lang = Language::from_639_1(&normalized)
        .ok_or_else(|| anyhow!("Failed to get language from code: {}", normalized))?;

    Ok(lang.to_name().to_string())
}
