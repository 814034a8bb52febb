/*!
 * # dubsync - live caption extraction, sync and word tokenization
 *
 * A Rust library that lifts timed captions out of a streaming player's
 * network traffic, keeps a transcript in lockstep with playback and turns
 * each displayed sentence into interactive words.
 *
 * ## Features
 *
 * - Observe caption fetches without disturbing the host's requests
 * - Parse timed-text payloads with tick (10 MHz) or clock timestamps
 * - Best-effort language detection (URL hint, document tag, character ranges)
 * - Poll-driven synchronization with de-duplicated rendering
 * - Word tokenization through an external service, with plain-text fallback
 *   and staleness protection for late responses
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `interceptor`: Observing wrapper around the host's request primitive
 * - `bridge`: One-way payload channel from interception to the pipeline
 * - `caption_parser`: Cue and track model, timed-text parsing
 * - `language_detector`: Ordered language detection strategies
 * - `session`: Current track and render generation
 * - `synchronizer`: Video clock polling and active cue resolution
 * - `renderer`: Tokenizing renderer and word activation
 * - `tokenizer`: Tokenizer service client
 * - `host`: Video element, overlay surface and host discovery seams
 * - `app_controller`: Wires everything together
 * - `app_config`: Configuration management
 * - `language_utils`: ISO language code utilities
 * - `errors`: Custom error types for the application
 *
 * ## License
 *
 * This project is licensed under the MIT License
 */

// Global lints configuration
// These lints will be allowed but not auto-fixed
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod app_config;
pub mod app_controller;
pub mod bridge;
pub mod caption_parser;
pub mod errors;
pub mod host;
pub mod interceptor;
pub mod language_detector;
pub mod language_utils;
pub mod renderer;
pub mod session;
pub mod synchronizer;
pub mod tokenizer;

// Re-export main types for easier usage
pub use app_config::Config;
pub use app_controller::{CaptionComponents, Controller, ControllerHandle};
pub use bridge::{Bridge, CaptionPayload, Delivery};
pub use caption_parser::{Cue, Track};
pub use errors::{AppError, CaptionError, ProviderError};
pub use session::CaptionSession;
pub use synchronizer::{SyncAction, Synchronizer};
