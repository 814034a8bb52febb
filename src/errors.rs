/*!
 * Error types for the dubsync library.
 *
 * This module contains custom error types for the different parts of the
 * caption pipeline, using the thiserror crate for ergonomic error definitions.
 * Most of these are recovered locally (parse failures become empty tracks,
 * tokenizer failures become plain-text rendering); only the controller
 * surfaces errors to its caller.
 */

use thiserror::Error;

/// Errors that can occur when talking to an HTTP service (tokenizer, host network)
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Error when making an API request fails
    #[error("API request failed: {0}")]
    RequestFailed(String),

    /// Error when parsing an API response fails
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Error returned by the API itself
    #[error("API responded with error: {status_code} - {message}")]
    ApiError {
        /// HTTP status code
        status_code: u16,
        /// Error message from the API
        message: String,
    },

    /// Error establishing or maintaining a connection
    #[error("Connection error: {0}")]
    ConnectionError(String),
}

impl From<reqwest::Error> for ProviderError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_connect() || error.is_timeout() {
            Self::ConnectionError(error.to_string())
        } else if error.is_decode() {
            Self::ParseError(error.to_string())
        } else {
            Self::RequestFailed(error.to_string())
        }
    }
}

/// Errors that can occur while turning a timed-text payload into cues
#[derive(Error, Debug)]
pub enum CaptionError {
    /// The payload is not well-formed XML
    #[error("Malformed timed-text payload: {0}")]
    MalformedPayload(String),

    /// A cue would violate `0 <= start <= end`
    #[error("Invalid cue timing: start {start}s, end {end}s")]
    InvalidTiming {
        /// Start time in seconds
        start: f64,
        /// End time in seconds
        end: f64,
    },
}

/// Main application error type that wraps all other errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Error from a file operation
    #[error("File error: {0}")]
    File(String),

    /// Error from the tokenizer service or the host network
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Error from caption processing
    #[error("Caption error: {0}")]
    Caption(#[from] CaptionError),

    /// The host page never exposed a video element and an insertion anchor
    #[error("Unsupported platform: host elements not found after {attempts} attempts")]
    UnsupportedPlatform {
        /// Number of discovery attempts made
        attempts: u32,
    },

    /// The controller was shut down before it finished starting
    #[error("Controller cancelled during startup")]
    Cancelled,

    /// Any other error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

// Utility functions for error conversion
impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::Unknown(error.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::File(error.to_string())
    }
}
