/*!
 * Tokenizing renderer.
 *
 * Turns the active cue's sentence into interactive word spans via the
 * external tokenizer, falling back to plain text when the tokenizer fails.
 * Every render carries the session generation it was started for; a result
 * that comes back after the generation moved on is discarded unrendered.
 */

use std::sync::Arc;

use log::{debug, warn};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::host::{TranscriptSurface, VideoElement, WordSpan};
use crate::session::CaptionSession;
use crate::tokenizer::{TokenizeRequest, Tokenizer};

/// Lexical popover request for one word in its sentence
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PopoverRequest {
    /// The activated word
    pub word: String,
    /// The sentence it appeared in
    pub sentence: String,
    /// Language of the sentence
    pub language: String,
}

/// How a word span was activated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivationKind {
    Click,
    Keyboard,
}

/// What a render attempt ended up doing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderOutcome {
    /// Interactive words were rendered
    Tokenized(usize),
    /// The raw sentence was rendered without interaction
    Fallback,
    /// The cue had no text; the transcript was cleared
    Blank,
    /// A newer generation superseded this one; nothing was rendered
    Stale,
}

#[derive(Debug)]
struct InteractiveSentence {
    sentence: String,
    language: String,
    words: Vec<WordSpan>,
}

struct SurfaceState {
    surface: Box<dyn TranscriptSurface>,
    interactive: Option<InteractiveSentence>,
}

/// Renders sentences into the transcript surface
pub struct TokenizingRenderer {
    session: Arc<CaptionSession>,
    tokenizer: Arc<dyn Tokenizer>,
    video: Arc<dyn VideoElement>,
    state: Mutex<SurfaceState>,
    popovers: mpsc::UnboundedSender<PopoverRequest>,
}

impl TokenizingRenderer {
    /// Create a renderer drawing into `surface`
    pub fn new(
        session: Arc<CaptionSession>,
        tokenizer: Arc<dyn Tokenizer>,
        video: Arc<dyn VideoElement>,
        surface: Box<dyn TranscriptSurface>,
        popovers: mpsc::UnboundedSender<PopoverRequest>,
    ) -> Self {
        Self {
            session,
            tokenizer,
            video,
            state: Mutex::new(SurfaceState {
                surface,
                interactive: None,
            }),
            popovers,
        }
    }

    /// Tokenize `text` and render it if `generation` is still current
    pub async fn render(&self, text: String, language: String, generation: u64) -> RenderOutcome {
        if text.trim().is_empty() {
            let mut state = self.state.lock();
            if !self.session.is_current(generation) {
                return RenderOutcome::Stale;
            }
            state.surface.clear();
            state.interactive = None;
            return RenderOutcome::Blank;
        }

        let request = TokenizeRequest::new(text, language);
        let result = self.tokenizer.tokenize(&request).await;

        // Check and draw under one lock so a concurrent clear cannot interleave
        let mut state = self.state.lock();
        if !self.session.is_current(generation) {
            debug!("Discarding tokens for superseded sentence {:?}", request.text);
            return RenderOutcome::Stale;
        }

        match result {
            Ok(tokens) if !tokens.is_empty() => {
                let words: Vec<WordSpan> = tokens.into_iter()
                    .enumerate()
                    .map(|(index, token)| WordSpan { text: token.text, index })
                    .collect();
                let count = words.len();
                state.surface.show_words(&words);
                state.interactive = Some(InteractiveSentence {
                    sentence: request.text,
                    language: request.language,
                    words,
                });
                RenderOutcome::Tokenized(count)
            }
            Ok(_) => {
                debug!("Tokenizer returned no words for {:?}; rendering plain text", request.text);
                state.surface.show_plain(&request.text);
                state.interactive = None;
                RenderOutcome::Fallback
            }
            Err(e) => {
                warn!("Tokenizer unavailable, rendering plain text: {}", e);
                state.surface.show_plain(&request.text);
                state.interactive = None;
                RenderOutcome::Fallback
            }
        }
    }

    /// Clear the transcript if `generation` is still current
    pub fn clear(&self, generation: u64) -> bool {
        let mut state = self.state.lock();
        if !self.session.is_current(generation) {
            return false;
        }
        state.surface.clear();
        state.interactive = None;
        true
    }

    /// Handle a click or key activation on the word at `index`
    ///
    /// Pauses the video and requests a popover for the word in its sentence.
    /// Returns `false` when no interactive word has that index.
    pub fn activate_word(&self, index: usize, kind: ActivationKind) -> bool {
        let request = {
            let state = self.state.lock();
            let Some(sentence) = state.interactive.as_ref() else {
                return false;
            };
            let Some(word) = sentence.words.get(index) else {
                return false;
            };
            PopoverRequest {
                word: word.text.clone(),
                sentence: sentence.sentence.clone(),
                language: sentence.language.clone(),
            }
        };

        debug!("Word {:?} activated by {:?}", request.word, kind);
        self.video.pause();

        if self.popovers.send(request).is_err() {
            debug!("No popover listener; word activation only paused playback");
        }
        true
    }

    /// Words currently rendered as interactive spans
    pub fn interactive_words(&self) -> Vec<WordSpan> {
        self.state.lock()
            .interactive
            .as_ref()
            .map(|sentence| sentence.words.clone())
            .unwrap_or_default()
    }
}
