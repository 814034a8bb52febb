use std::fmt;
use regex::Regex;
use once_cell::sync::Lazy;
use log::{debug, warn};
use serde::Serialize;

use crate::app_config::{CaptionConfig, InvertedCuePolicy};
use crate::errors::CaptionError;
use crate::language_detector::{self, DetectionInput};

// @module: Timed-text payload parsing and timestamp normalization

/// Clock resolution of tick-encoded timestamps (10 MHz)
pub const TICKS_PER_SECOND: u64 = 10_000_000;

const TICKS_PER_MILLISECOND: u64 = TICKS_PER_SECOND / 1_000;

const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

// @const: Exact HH:MM:SS.mmm clock form
static CLOCK_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\d{2}:\d{2}:\d{2}\.\d{3}$").unwrap()
});

// @const: Anything that is not an ASCII digit
static NON_DIGIT_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[^0-9]").unwrap()
});

// @struct: Single timed caption entry
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Cue {
    // @field: Start time in seconds
    start_time: f64,

    // @field: End time in seconds
    end_time: f64,

    // @field: Caption text
    text: String,
}

impl Cue {
    // @creates: Validated cue
    // @validates: 0 <= start <= end, both finite
    pub fn new(start_time: f64, end_time: f64, text: impl Into<String>) -> Result<Self, CaptionError> {
        let valid = start_time.is_finite()
            && end_time.is_finite()
            && start_time >= 0.0
            && start_time <= end_time;

        if !valid {
            return Err(CaptionError::InvalidTiming { start: start_time, end: end_time });
        }

        Ok(Cue {
            start_time,
            end_time,
            text: text.into(),
        })
    }

    /// Start time in seconds
    pub fn start_time(&self) -> f64 {
        self.start_time
    }

    /// End time in seconds
    pub fn end_time(&self) -> f64 {
        self.end_time
    }

    /// Caption text
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Whether `time` lies in the half-open interval `[start, end)`
    pub fn contains(&self, time: f64) -> bool {
        self.start_time <= time && time < self.end_time
    }
}

impl fmt::Display for Cue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "[{:.3} -> {:.3}] {}", self.start_time, self.end_time, self.text)
    }
}

/// Ordered cues from one intercepted payload plus their detected language
#[derive(Debug, Clone, Serialize)]
pub struct Track {
    /// Detected language code (ISO 639-1)
    language: String,

    /// URL the payload was fetched from
    source_url: String,

    /// Cues in payload order
    cues: Vec<Cue>,
}

impl Track {
    /// Create a track from already-built cues
    pub fn new(cues: Vec<Cue>, language: impl Into<String>, source_url: impl Into<String>) -> Self {
        Track {
            language: language.into(),
            source_url: source_url.into(),
            cues,
        }
    }

    /// Parse a raw payload and detect its language
    ///
    /// Never fails: a malformed payload produces an empty track whose language
    /// comes from whatever signal the URL still carries.
    pub fn from_payload(payload: &str, source_url: &str, config: &CaptionConfig) -> Self {
        let cues = parse_cues(payload, config.inverted_cue_policy);

        let cue_texts: Vec<&str> = cues.iter()
            .take(config.language_sample_size)
            .map(Cue::text)
            .collect();

        let input = DetectionInput {
            url: source_url,
            payload,
            cue_texts: &cue_texts,
        };
        let language = language_detector::detect_language(&input, &config.default_language);

        debug!("Built track with {} cues, language '{}' from {}", cues.len(), language, source_url);

        Track::new(cues, language, source_url)
    }

    /// Detected language code
    pub fn language(&self) -> &str {
        &self.language
    }

    /// Source URL of the payload
    pub fn source_url(&self) -> &str {
        &self.source_url
    }

    /// Cues in payload order
    pub fn cues(&self) -> &[Cue] {
        &self.cues
    }

    /// Whether the track has no cues
    pub fn is_empty(&self) -> bool {
        self.cues.is_empty()
    }

    /// Latest end time over all cues, in seconds
    pub fn duration(&self) -> f64 {
        self.cues.iter().map(Cue::end_time).fold(0.0, f64::max)
    }
}

/// Parse a clock string `HH:MM:SS.mmm` into seconds
///
/// Components are read right-aligned (the last colon-separated field is
/// seconds). Non-numeric fragments are stripped; a component with no digits
/// reads as zero, and so does a missing millisecond part.
pub fn parse_clock(clock: &str) -> f64 {
    let clock = clock.trim();
    let (hms, millis) = match clock.split_once('.') {
        Some((hms, millis)) => (hms, parse_digits(millis)),
        None => (clock, 0),
    };

    let components: Vec<u64> = hms.split(':').map(parse_digits).collect();
    let component = |offset: usize| -> u64 {
        components.len()
            .checked_sub(offset)
            .and_then(|idx| components.get(idx).copied())
            .unwrap_or(0)
    };

    let hours = component(3) as f64;
    let minutes = component(2) as f64;
    let seconds = component(1) as f64;

    hours * 3600.0 + minutes * 60.0 + seconds + millis as f64 / 1000.0
}

/// Convert a tick count to seconds
pub fn ticks_to_seconds(ticks: u64) -> f64 {
    ticks as f64 / TICKS_PER_SECOND as f64
}

/// Render a tick count as `HH:MM:SS.mmm`, hours wrapped modulo 24
///
/// Milliseconds are truncated, so the clock string is at most 1 ms early.
pub fn ticks_to_clock(ticks: u64) -> String {
    let total_ms = ticks / TICKS_PER_MILLISECOND;
    let hours = (total_ms / 3_600_000) % 24;
    let minutes = (total_ms % 3_600_000) / 60_000;
    let seconds = (total_ms % 60_000) / 1_000;
    let millis = total_ms % 1_000;

    format!("{:02}:{:02}:{:02}.{:03}", hours, minutes, seconds, millis)
}

/// Whether a timestamp attribute uses the clock encoding
pub fn is_clock_encoded(value: &str) -> bool {
    CLOCK_REGEX.is_match(value)
}

/// Normalize a `begin`/`end` attribute value to seconds
///
/// Clock-encoded values are parsed directly. Everything else is read as a
/// tick count (non-digits stripped), rendered as a clock string and parsed
/// by the same routine, so both encodings share one final parser.
pub fn normalize_timestamp(value: &str) -> f64 {
    let value = value.trim();

    if is_clock_encoded(value) {
        return parse_clock(value);
    }

    let ticks = parse_digits(value);
    parse_clock(&ticks_to_clock(ticks))
}

/// Parse a timed-text payload into cues
///
/// Parse failures are logged and yield an empty list.
pub fn parse_cues(payload: &str, policy: InvertedCuePolicy) -> Vec<Cue> {
    match parse_document(payload, policy) {
        Ok(cues) => {
            if cues.is_empty() {
                debug!("Timed-text payload contained no caption entries");
            }
            cues
        }
        Err(e) => {
            warn!("Discarding caption payload: {}", e);
            Vec::new()
        }
    }
}

/// Read the language attribute of the payload's root element, if any
pub fn document_language(payload: &str) -> Option<String> {
    let document = roxmltree::Document::parse_with_options(payload, parsing_options()).ok()?;
    let root = document.root_element();

    root.attribute((XML_NAMESPACE, "lang"))
        .or_else(|| root.attribute("lang"))
        .map(|lang| lang.trim().to_string())
        .filter(|lang| !lang.is_empty())
}

fn parse_document(payload: &str, policy: InvertedCuePolicy) -> Result<Vec<Cue>, CaptionError> {
    let document = roxmltree::Document::parse_with_options(payload, parsing_options())
        .map_err(|e| CaptionError::MalformedPayload(e.to_string()))?;

    let mut cues = Vec::new();

    for (index, entry) in document.descendants()
        .filter(|node| node.is_element() && node.tag_name().name() == "p")
        .enumerate()
    {
        let mut start = normalize_timestamp(entry.attribute("begin").unwrap_or("0"));
        let mut end = normalize_timestamp(entry.attribute("end").unwrap_or("0"));

        if start > end {
            match policy {
                InvertedCuePolicy::Drop => {
                    warn!("Dropping caption entry {} with start {}s after end {}s", index, start, end);
                    continue;
                }
                InvertedCuePolicy::Swap => std::mem::swap(&mut start, &mut end),
                InvertedCuePolicy::Clamp => end = start,
            }
        }

        match Cue::new(start, end, entry_text(entry)) {
            Ok(cue) => cues.push(cue),
            Err(e) => warn!("Skipping caption entry {}: {}", index, e),
        }
    }

    Ok(cues)
}

fn entry_text(entry: roxmltree::Node) -> String {
    entry.children()
        .filter(|child| child.is_text())
        .filter_map(|child| child.text())
        .map(str::trim)
        .filter(|piece| !piece.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
        .trim()
        .to_string()
}

fn parsing_options() -> roxmltree::ParsingOptions {
    roxmltree::ParsingOptions {
        allow_dtd: true,
        ..roxmltree::ParsingOptions::default()
    }
}

fn parse_digits(value: &str) -> u64 {
    let digits = NON_DIGIT_REGEX.replace_all(value, "");
    if digits.is_empty() {
        return 0;
    }

    match digits.parse() {
        Ok(number) => number,
        Err(e) => {
            warn!("Timestamp component {:?} is out of range ({}); reading it as 0", value, e);
            0
        }
    }
}
