/*!
 * Best-effort language detection for caption tracks.
 *
 * Detection is an ordered cascade of independent strategies. Each strategy
 * looks at one signal and either names a language or passes; the first
 * strategy that names a known ISO 639-1 code wins:
 *
 * 1. a 2-letter language hint in the caption URL's query string
 * 2. the language attribute on the timed-text root element
 * 3. language-diagnostic character ranges in the first few cues
 *
 * When every strategy passes, the caller's default (normally `"en"`) is used.
 */

use log::{debug, trace};
use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

use crate::caption_parser;
use crate::language_utils;

/// Query parameters that carry a language hint
const LANGUAGE_QUERY_KEYS: [&str; 4] = ["lang", "language", "hl", "tlang"];

static LANGUAGE_HINT_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([A-Za-z]{2})(?:$|[-_])").unwrap()
});

/// Character classes checked in priority order; first match wins
static CHARACTER_CLASSES: Lazy<Vec<(&'static str, Regex)>> = Lazy::new(|| {
    [
        ("es", r"(?i)[ñ¿¡]"),
        ("fr", r"(?i)[èêëîïœæàâùû]"),
        ("de", r"(?i)[äöüß]"),
        ("pt", r"(?i)[ãõç]"),
        ("it", r"(?i)[ìò]"),
        ("ja", r"[\x{3040}-\x{309F}\x{30A0}-\x{30FF}]"),
        ("ko", r"[\x{AC00}-\x{D7AF}]"),
        ("zh", r"[\x{4E00}-\x{9FFF}]"),
        ("ar", r"[\x{0600}-\x{06FF}]"),
        ("hi", r"[\x{0900}-\x{097F}]"),
    ]
    .into_iter()
    .map(|(code, pattern)| (code, Regex::new(pattern).unwrap()))
    .collect()
});

/// Signals available when a track is built
#[derive(Debug, Clone, Copy)]
pub struct DetectionInput<'a> {
    /// URL the caption payload was fetched from
    pub url: &'a str,
    /// Raw timed-text payload
    pub payload: &'a str,
    /// Text of the first few cues
    pub cue_texts: &'a [&'a str],
}

/// A single detection heuristic
pub type Strategy = fn(&DetectionInput) -> Option<String>;

/// The cascade, in priority order
pub const STRATEGIES: [(&str, Strategy); 3] = [
    ("url_hint", from_url_hint),
    ("document_language", from_document_language),
    ("character_ranges", from_character_ranges),
];

/// Run the cascade and fall back to `default` when no strategy produces a signal
pub fn detect_language(input: &DetectionInput, default: &str) -> String {
    for (name, strategy) in STRATEGIES {
        if let Some(code) = strategy(input).filter(|code| language_utils::is_known_code(code)) {
            debug!("Language '{}' detected by {}", code, name);
            return code;
        }
        trace!("Language strategy {} produced no signal", name);
    }

    debug!("No language signal found, defaulting to '{}'", default);
    default.to_string()
}

/// Read a 2-letter hint from the URL's query string
pub fn from_url_hint(input: &DetectionInput) -> Option<String> {
    let url = parse_url(input.url)?;

    url.query_pairs()
        .filter(|(key, _)| LANGUAGE_QUERY_KEYS.contains(&key.to_lowercase().as_str()))
        .find_map(|(_, value)| {
            LANGUAGE_HINT_REGEX.captures(&value)
                .map(|caps| caps[1].to_lowercase())
        })
}

/// Read the root element's language attribute, reduced to its base code
pub fn from_document_language(input: &DetectionInput) -> Option<String> {
    caption_parser::document_language(input.payload)
        .map(|tag| language_utils::base_language_code(&tag))
        .filter(|code| code.len() == 2)
}

/// Classify the sampled cue text by diagnostic character ranges
pub fn from_character_ranges(input: &DetectionInput) -> Option<String> {
    if input.cue_texts.is_empty() {
        return None;
    }

    let sample = input.cue_texts.join(" ");
    classify_text(&sample).map(str::to_string)
}

/// First character class that matches `text`, in priority order
pub fn classify_text(text: &str) -> Option<&'static str> {
    CHARACTER_CLASSES.iter()
        .find(|(_, pattern)| pattern.is_match(text))
        .map(|(code, _)| *code)
}

fn parse_url(raw: &str) -> Option<Url> {
    match Url::parse(raw) {
        Ok(url) => Some(url),
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            Url::parse("http://localhost/").ok()?.join(raw).ok()
        }
        Err(_) => None,
    }
}
