use std::sync::Arc;

use anyhow::{Context, Result};
use log::{debug, info, warn};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::app_config::{CaptionConfig, Config};
use crate::bridge::{Bridge, BridgeListener};
use crate::caption_parser::Track;
use crate::errors::AppError;
use crate::host::{self, DiscoveryOutcome, HostPage};
use crate::renderer::{PopoverRequest, TokenizingRenderer};
use crate::session::CaptionSession;
use crate::synchronizer::Synchronizer;
use crate::tokenizer::Tokenizer;

/// External collaborators the controller wires together
pub struct CaptionComponents {
    /// Bridge the interceptor emits on
    pub bridge: Bridge,
    /// Host page providing the video element and overlay surface
    pub page: Arc<dyn HostPage>,
    /// Word tokenizer
    pub tokenizer: Arc<dyn Tokenizer>,
    /// Destination of word-activation popover requests
    pub popovers: mpsc::UnboundedSender<PopoverRequest>,
}

/// Main application controller for the caption pipeline
#[derive(Debug, Clone)]
pub struct Controller {
    // @field: App config
    config: Config,
}

impl Controller {
    // @param config: Validated on construction
    // @returns: Controller instance
    pub fn with_config(config: Config) -> Result<Self> {
        config.validate().context("Configuration validation failed")?;
        Ok(Self { config })
    }

    /// The configuration in use
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Start the pipeline
    ///
    /// The bridge listener is attached before anything else so that no
    /// payload emitted after this call is lost. Host discovery then runs to
    /// completion; on success the ingest loop and the synchronizer are spawned.
    pub async fn start(&self, components: CaptionComponents) -> Result<ControllerHandle, AppError> {
        let (_keep_open, cancel) = watch::channel(false);
        self.start_cancellable(components, cancel).await
    }

    /// Start the pipeline, abandoning host discovery once `cancel` turns true
    ///
    /// Returns `AppError::Cancelled` when cancellation wins the race with
    /// discovery. Dropping every sender of `cancel` also cancels.
    pub async fn start_cancellable(
        &self,
        components: CaptionComponents,
        mut cancel: watch::Receiver<bool>,
    ) -> Result<ControllerHandle, AppError> {
        let CaptionComponents { bridge, page, tokenizer, popovers } = components;

        let listener = bridge.attach();

        let elements = match host::discover(page.as_ref(), &self.config.discovery, &mut cancel).await {
            DiscoveryOutcome::Found(elements) => elements,
            DiscoveryOutcome::Unsupported { attempts } => {
                return Err(AppError::UnsupportedPlatform { attempts });
            }
            DiscoveryOutcome::Cancelled => {
                info!("Caption pipeline start cancelled during host discovery");
                return Err(AppError::Cancelled);
            }
        };

        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let session = Arc::new(CaptionSession::new());
        let renderer = Arc::new(TokenizingRenderer::new(
            Arc::clone(&session),
            tokenizer,
            Arc::clone(&elements.video),
            elements.surface,
            popovers,
        ));
        let synchronizer = Synchronizer::new(
            Arc::clone(&session),
            elements.video,
            Arc::clone(&renderer),
            self.config.sync.overlap_policy,
        );

        let ingest_task = tokio::spawn(ingest(
            listener,
            Arc::clone(&session),
            self.config.caption.clone(),
            shutdown_rx.clone(),
        ));
        let sync_task = tokio::spawn(synchronizer.run(self.config.sync.poll_interval(), shutdown_rx));

        info!("Caption pipeline started");

        Ok(ControllerHandle {
            session,
            renderer,
            shutdown: shutdown_tx,
            tasks: vec![ingest_task, sync_task],
        })
    }
}

/// Turn every bridged payload into a track and make it current
async fn ingest(
    mut listener: BridgeListener,
    session: Arc<CaptionSession>,
    config: CaptionConfig,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            payload = listener.recv() => {
                let Some(payload) = payload else {
                    warn!("Caption bridge closed; no further tracks will arrive");
                    break;
                };
                let track = Track::from_payload(&payload.data, &payload.url, &config);
                session.replace_track(track);
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
        }
    }

    debug!("Caption ingest stopped");
}

/// Running pipeline; dropping it signals shutdown
pub struct ControllerHandle {
    session: Arc<CaptionSession>,
    renderer: Arc<TokenizingRenderer>,
    shutdown: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
}

impl ControllerHandle {
    /// Shared session state
    pub fn session(&self) -> &Arc<CaptionSession> {
        &self.session
    }

    /// The renderer, for word activation
    pub fn renderer(&self) -> &Arc<TokenizingRenderer> {
        &self.renderer
    }

    /// Stop the ingest loop and the synchronizer and wait for both
    pub async fn shutdown(mut self) {
        let _ = self.shutdown.send(true);
        for task in self.tasks.drain(..) {
            if let Err(e) = task.await {
                warn!("Caption task ended abnormally: {}", e);
            }
        }
        info!("Caption pipeline stopped");
    }
}

impl Drop for ControllerHandle {
    fn drop(&mut self) {
        let _ = self.shutdown.send(true);
    }
}
