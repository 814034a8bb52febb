/*!
 * Keeps the rendered transcript aligned with video playback.
 *
 * The synchronizer polls the video clock on a fixed cadence, resolves the
 * active cue of the session's current track, and only does rendering work
 * when the active sentence changes. Every change starts a new session
 * generation so renders still in flight for the previous sentence are
 * discarded when they complete.
 */

use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, trace};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::app_config::OverlapPolicy;
use crate::caption_parser::Cue;
use crate::host::VideoElement;
use crate::renderer::{RenderOutcome, TokenizingRenderer};
use crate::session::CaptionSession;

/// Decision taken by one poll
#[derive(Debug, Clone, PartialEq)]
pub enum SyncAction {
    /// Nothing is displayed and nothing is active
    Idle,
    /// The active sentence is already displayed
    Unchanged,
    /// A different sentence became active
    Render {
        /// Sentence text
        text: String,
        /// Track language
        language: String,
        /// Generation the render belongs to
        generation: u64,
    },
    /// The displayed sentence is no longer active
    Clear {
        /// Generation the clear belongs to
        generation: u64,
    },
}

/// Resolve the cue active at `time` under half-open `[start, end)` intervals
pub fn find_active_cue(cues: &[Cue], time: f64, policy: OverlapPolicy) -> Option<&Cue> {
    let mut active = cues.iter().filter(|cue| cue.contains(time));

    match policy {
        OverlapPolicy::FirstInSequence => active.next(),
        // max_by keeps the last of equal elements, so ties go to the later cue
        OverlapPolicy::MostRecentlyStarted => {
            active.max_by(|a, b| a.start_time().total_cmp(&b.start_time()))
        }
    }
}

/// Polls the video clock and drives the renderer
pub struct Synchronizer {
    session: Arc<CaptionSession>,
    video: Arc<dyn VideoElement>,
    renderer: Arc<TokenizingRenderer>,
    policy: OverlapPolicy,
    // text and language of the displayed sentence
    rendered: Option<(String, String)>,
}

impl Synchronizer {
    /// Create a synchronizer with nothing displayed
    pub fn new(
        session: Arc<CaptionSession>,
        video: Arc<dyn VideoElement>,
        renderer: Arc<TokenizingRenderer>,
        policy: OverlapPolicy,
    ) -> Self {
        Self {
            session,
            video,
            renderer,
            policy,
            rendered: None,
        }
    }

    /// Text of the sentence currently displayed
    pub fn rendered_text(&self) -> Option<&str> {
        self.rendered.as_ref().map(|(text, _)| text.as_str())
    }

    /// Read the clock once and decide what, if anything, has to change
    pub fn poll(&mut self) -> SyncAction {
        let active = match (self.session.current_track(), self.video.current_time()) {
            (Some(track), Some(time)) => find_active_cue(track.cues(), time, self.policy)
                .map(|cue| (cue.text().to_string(), track.language().to_string())),
            _ => None,
        };

        match active {
            Some(key) if self.rendered.as_ref() == Some(&key) => SyncAction::Unchanged,
            Some((text, language)) => {
                let generation = self.session.advance_generation();
                trace!("Active sentence changed to {:?} [{}] (generation {})", text, language, generation);
                self.rendered = Some((text.clone(), language.clone()));
                SyncAction::Render { text, language, generation }
            }
            None if self.rendered.take().is_some() => SyncAction::Clear {
                generation: self.session.advance_generation(),
            },
            None => SyncAction::Idle,
        }
    }

    /// Poll once and apply the result
    ///
    /// Returns the render task when a new sentence started rendering.
    pub fn tick(&mut self) -> Option<JoinHandle<RenderOutcome>> {
        match self.poll() {
            SyncAction::Render { text, language, generation } => {
                let renderer = Arc::clone(&self.renderer);
                Some(tokio::spawn(async move {
                    renderer.render(text, language, generation).await
                }))
            }
            SyncAction::Clear { generation } => {
                self.renderer.clear(generation);
                None
            }
            SyncAction::Idle | SyncAction::Unchanged => None,
        }
    }

    /// Poll every `interval` until shutdown is signalled or its sender is dropped
    pub async fn run(mut self, interval: Duration, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        debug!("Synchronizer polling every {:?}", interval);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.tick();
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        info!("Synchronizer stopped");
    }
}
