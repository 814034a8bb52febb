/*!
 * Shared caption session state.
 *
 * A `CaptionSession` is the one object threaded through the ingest loop,
 * the synchronizer and the renderer. It owns the current track (and with it
 * the detected language) and the render generation counter that lets late
 * tokenizer responses recognize they are stale.
 */

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use log::info;
use parking_lot::RwLock;

use crate::caption_parser::Track;

/// Current track plus render generation
#[derive(Debug, Default)]
pub struct CaptionSession {
    track: RwLock<Option<Arc<Track>>>,
    generation: AtomicU64,
}

impl CaptionSession {
    /// Create an empty session
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomically replace the current track
    pub fn replace_track(&self, track: Track) -> Arc<Track> {
        let track = Arc::new(track);
        info!(
            "Caption track replaced: {} cues, language '{}'",
            track.cues().len(),
            track.language()
        );
        *self.track.write() = Some(Arc::clone(&track));
        track
    }

    /// The track in effect right now
    pub fn current_track(&self) -> Option<Arc<Track>> {
        self.track.read().clone()
    }

    /// Language of the current track
    pub fn language(&self) -> Option<String> {
        self.track.read()
            .as_ref()
            .map(|track| track.language().to_string())
    }

    /// Start a new render generation and return it
    pub fn advance_generation(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// The latest render generation
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Whether `generation` is still the latest one
    pub fn is_current(&self, generation: u64) -> bool {
        self.generation() == generation
    }
}
