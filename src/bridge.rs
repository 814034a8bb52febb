/*!
 * One-way notification channel from the interception layer to the caption
 * pipeline.
 *
 * The bridge carries `CaptionPayload`s fire-and-forget: no acknowledgment,
 * no backpressure and no buffering before a listener exists. A payload
 * emitted while no listener is attached is dropped for good, and `emit`
 * reports that as `Delivery::Dropped` so callers and tests can see the
 * attachment race instead of guessing at it.
 */

use std::sync::Arc;

use log::{debug, warn};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Raw caption payload together with the URL it was fetched from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptionPayload {
    /// Response body of the caption request
    pub data: String,
    /// Request URL
    pub url: String,
}

/// Result of a single emission
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Handed to the attached listener
    Delivered,
    /// No listener was attached (or it had gone away); the payload is lost
    Dropped,
}

/// Shared sending side of the bridge
#[derive(Debug, Clone, Default)]
pub struct Bridge {
    listener: Arc<Mutex<Option<mpsc::UnboundedSender<CaptionPayload>>>>,
}

impl Bridge {
    /// Create a bridge with no listener attached
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach the listener, replacing any previous one
    pub fn attach(&self) -> BridgeListener {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut slot = self.listener.lock();
        if slot.as_ref().is_some_and(|previous| !previous.is_closed()) {
            warn!("Replacing an attached caption listener; the old one will receive nothing further");
        }
        *slot = Some(tx);
        BridgeListener { rx }
    }

    /// Whether a live listener is attached
    pub fn is_attached(&self) -> bool {
        self.listener.lock()
            .as_ref()
            .is_some_and(|tx| !tx.is_closed())
    }

    /// Emit a payload to the listener, never blocking and never failing outward
    pub fn emit(&self, payload: CaptionPayload) -> Delivery {
        let mut slot = self.listener.lock();

        let Some(tx) = slot.as_ref() else {
            debug!("No caption listener attached; dropping payload from {}", payload.url);
            return Delivery::Dropped;
        };

        match tx.send(payload) {
            Ok(()) => Delivery::Delivered,
            Err(mpsc::error::SendError(payload)) => {
                debug!("Caption listener is gone; dropping payload from {}", payload.url);
                *slot = None;
                Delivery::Dropped
            }
        }
    }
}

/// Receiving side of the bridge, held by the caption pipeline
#[derive(Debug)]
pub struct BridgeListener {
    rx: mpsc::UnboundedReceiver<CaptionPayload>,
}

impl BridgeListener {
    /// Wait for the next payload; `None` once every bridge handle is gone
    /// or the listener was replaced
    pub async fn recv(&mut self) -> Option<CaptionPayload> {
        self.rx.recv().await
    }

    /// Take a payload if one is already queued
    pub fn try_recv(&mut self) -> Option<CaptionPayload> {
        self.rx.try_recv().ok()
    }
}
