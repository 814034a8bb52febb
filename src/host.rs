/*!
 * Host page seams: the video element, the overlay surface and bounded
 * discovery of both.
 */

use std::fmt;
use std::sync::Arc;

use log::{debug, info, warn};
use tokio::sync::watch;

use crate::app_config::DiscoveryConfig;

/// The page's video element
pub trait VideoElement: Send + Sync {
    /// Current playback position in seconds, `None` when the element is gone
    fn current_time(&self) -> Option<f64>;

    /// Pause playback
    fn pause(&self);
}

/// One interactive word in the rendered transcript
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WordSpan {
    /// Word text
    pub text: String,
    /// Position within the sentence
    pub index: usize,
}

/// The overlay subtree the transcript is rendered into
pub trait TranscriptSurface: Send {
    /// Replace the transcript with interactive words
    fn show_words(&mut self, words: &[WordSpan]);

    /// Replace the transcript with non-interactive text
    fn show_plain(&mut self, text: &str);

    /// Remove the transcript
    fn clear(&mut self);
}

/// Elements subtitle overlay setup needs
pub struct HostElements {
    /// The video element
    pub video: Arc<dyn VideoElement>,
    /// Overlay surface created at the platform insertion anchor
    pub surface: Box<dyn TranscriptSurface>,
}

impl fmt::Debug for HostElements {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostElements").finish_non_exhaustive()
    }
}

/// The host page, queried for its elements
pub trait HostPage: Send + Sync {
    /// Both elements, once the video element and insertion anchor exist
    fn locate(&self) -> Option<HostElements>;
}

/// Terminal state of host discovery
#[derive(Debug)]
pub enum DiscoveryOutcome {
    /// Both elements were found
    Found(HostElements),
    /// Attempts ran out; this page is not a supported player
    Unsupported {
        /// Attempts made
        attempts: u32,
    },
    /// Shutdown was requested while waiting
    Cancelled,
}

/// Look for the host elements, retrying at a fixed interval up to a bound
///
/// The wait between attempts races the shutdown signal, so teardown never
/// leaves a discovery timer behind.
pub async fn discover(
    page: &dyn HostPage,
    config: &DiscoveryConfig,
    shutdown: &mut watch::Receiver<bool>,
) -> DiscoveryOutcome {
    for attempt in 1..=config.max_attempts {
        if *shutdown.borrow() {
            return DiscoveryOutcome::Cancelled;
        }

        if let Some(elements) = page.locate() {
            info!("Host elements found after {} attempt(s)", attempt);
            return DiscoveryOutcome::Found(elements);
        }

        if attempt == config.max_attempts {
            break;
        }

        debug!("Host elements not ready (attempt {}/{})", attempt, config.max_attempts);
        tokio::select! {
            _ = tokio::time::sleep(config.retry_interval()) => {}
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    return DiscoveryOutcome::Cancelled;
                }
            }
        }
    }

    warn!("Host elements not found after {} attempts; platform unsupported", config.max_attempts);
    DiscoveryOutcome::Unsupported { attempts: config.max_attempts }
}
