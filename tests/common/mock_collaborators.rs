/*!
 * Mock collaborators for testing
 *
 * This module provides stand-ins for everything the caption pipeline talks
 * to outside the crate: the video element, the overlay surface, the host
 * page, the host's request primitive and the tokenizer service. Each one
 * records what happened to it so tests can assert on behavior.
 */

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

use dubsync::errors::ProviderError;
use dubsync::host::{HostElements, HostPage, TranscriptSurface, VideoElement, WordSpan};
use dubsync::interceptor::{ExchangeResponse, HttpExchange, RequestLine};
use dubsync::tokenizer::{Token, TokenizeRequest, Tokenizer};

/// Video element whose clock is set by the test
#[derive(Debug, Default)]
pub struct ScriptedVideo {
    time: Mutex<Option<f64>>,
    pauses: AtomicUsize,
}

impl ScriptedVideo {
    /// Create a video positioned at `time`
    pub fn at(time: f64) -> Arc<Self> {
        Arc::new(Self {
            time: Mutex::new(Some(time)),
            pauses: AtomicUsize::new(0),
        })
    }

    /// Move the playback position
    pub fn seek(&self, time: f64) {
        *self.time.lock().unwrap() = Some(time);
    }

    /// Simulate the element disappearing
    pub fn detach(&self) {
        *self.time.lock().unwrap() = None;
    }

    /// Number of pause calls received
    pub fn pause_count(&self) -> usize {
        self.pauses.load(Ordering::SeqCst)
    }
}

impl VideoElement for ScriptedVideo {
    fn current_time(&self) -> Option<f64> {
        *self.time.lock().unwrap()
    }

    fn pause(&self) {
        self.pauses.fetch_add(1, Ordering::SeqCst);
    }
}

/// What happened to the surface
#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceEvent {
    /// Interactive words were shown
    Words(Vec<String>),
    /// Plain text was shown
    Plain(String),
    /// The transcript was cleared
    Cleared,
}

/// Surface that records every call; clones share the same log
#[derive(Debug, Clone, Default)]
pub struct RecordingSurface {
    events: Arc<Mutex<Vec<SurfaceEvent>>>,
}

impl RecordingSurface {
    /// Create an empty recording surface
    pub fn new() -> Self {
        Self::default()
    }

    /// All events in order
    pub fn events(&self) -> Vec<SurfaceEvent> {
        self.events.lock().unwrap().clone()
    }

    /// The most recent event
    pub fn last(&self) -> Option<SurfaceEvent> {
        self.events.lock().unwrap().last().cloned()
    }
}

impl TranscriptSurface for RecordingSurface {
    fn show_words(&mut self, words: &[WordSpan]) {
        let texts = words.iter().map(|word| word.text.clone()).collect();
        self.events.lock().unwrap().push(SurfaceEvent::Words(texts));
    }

    fn show_plain(&mut self, text: &str) {
        self.events.lock().unwrap().push(SurfaceEvent::Plain(text.to_string()));
    }

    fn clear(&mut self) {
        self.events.lock().unwrap().push(SurfaceEvent::Cleared);
    }
}

/// Host page whose elements appear after a number of failed lookups
#[derive(Debug)]
pub struct ScriptedPage {
    video: Arc<ScriptedVideo>,
    surface: RecordingSurface,
    ready_after: Option<u32>,
    lookups: AtomicU32,
}

impl ScriptedPage {
    /// Page whose elements exist from the start
    pub fn ready(video: Arc<ScriptedVideo>, surface: RecordingSurface) -> Self {
        Self::ready_after(video, surface, 0)
    }

    /// Page whose elements appear once `failures` lookups have failed
    pub fn ready_after(video: Arc<ScriptedVideo>, surface: RecordingSurface, failures: u32) -> Self {
        Self {
            video,
            surface,
            ready_after: Some(failures),
            lookups: AtomicU32::new(0),
        }
    }

    /// Page that never exposes its elements
    pub fn never() -> Self {
        Self {
            video: ScriptedVideo::at(0.0),
            surface: RecordingSurface::new(),
            ready_after: None,
            lookups: AtomicU32::new(0),
        }
    }

    /// Number of lookups made so far
    pub fn lookups(&self) -> u32 {
        self.lookups.load(Ordering::SeqCst)
    }
}

impl HostPage for ScriptedPage {
    fn locate(&self) -> Option<HostElements> {
        let previous = self.lookups.fetch_add(1, Ordering::SeqCst);
        let ready_after = self.ready_after?;

        if previous < ready_after {
            return None;
        }

        Some(HostElements {
            video: self.video.clone(),
            surface: Box::new(self.surface.clone()),
        })
    }
}

/// Behavior mode for the mock tokenizer
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TokenizerBehavior {
    /// Split on whitespace
    Working,
    /// Always fail as if the service were unreachable
    Failing,
    /// Succeed with no tokens
    Empty,
}

/// Tokenizer stand-in with per-sentence response gates
#[derive(Debug)]
pub struct MockTokenizer {
    behavior: TokenizerBehavior,
    requests: Mutex<Vec<TokenizeRequest>>,
    gates: Mutex<HashMap<String, Arc<Notify>>>,
}

impl MockTokenizer {
    /// Create a mock tokenizer with the specified behavior
    pub fn new(behavior: TokenizerBehavior) -> Arc<Self> {
        Arc::new(Self {
            behavior,
            requests: Mutex::new(Vec::new()),
            gates: Mutex::new(HashMap::new()),
        })
    }

    /// Create a working mock tokenizer
    pub fn working() -> Arc<Self> {
        Self::new(TokenizerBehavior::Working)
    }

    /// Create a failing mock tokenizer
    pub fn failing() -> Arc<Self> {
        Self::new(TokenizerBehavior::Failing)
    }

    /// Hold responses for `text` until the returned gate is notified
    pub fn gate(&self, text: &str) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.gates.lock().unwrap().insert(text.to_string(), gate.clone());
        gate
    }

    /// Number of tokenize calls received
    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// All requests received, in order
    pub fn requests(&self) -> Vec<TokenizeRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Tokenizer for MockTokenizer {
    async fn tokenize(&self, request: &TokenizeRequest) -> Result<Vec<Token>, ProviderError> {
        self.requests.lock().unwrap().push(request.clone());

        let gate = self.gates.lock().unwrap().get(&request.text).cloned();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        match self.behavior {
            TokenizerBehavior::Working => Ok(request.text.split_whitespace().map(Token::new).collect()),
            TokenizerBehavior::Failing => Err(ProviderError::ConnectionError("mock tokenizer offline".to_string())),
            TokenizerBehavior::Empty => Ok(Vec::new()),
        }
    }
}

/// Request primitive with canned responses per URL
#[derive(Debug, Default)]
pub struct MockExchange {
    responses: HashMap<String, Result<ExchangeResponse, String>>,
    sent: Mutex<Vec<RequestLine>>,
}

impl MockExchange {
    /// Create an exchange that answers 404 to everything
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `url` with a 200 and `body`
    pub fn with_body(mut self, url: &str, body: &str) -> Self {
        self.responses.insert(url.to_string(), Ok(ExchangeResponse {
            status: 200,
            body: Some(body.to_string()),
        }));
        self
    }

    /// Answer `url` with a 200 whose body cannot be read
    pub fn with_unreadable_body(mut self, url: &str) -> Self {
        self.responses.insert(url.to_string(), Ok(ExchangeResponse {
            status: 200,
            body: None,
        }));
        self
    }

    /// Fail requests to `url` at the transport level
    pub fn with_failure(mut self, url: &str, message: &str) -> Self {
        self.responses.insert(url.to_string(), Err(message.to_string()));
        self
    }

    /// Requests sent so far
    pub fn sent(&self) -> Vec<RequestLine> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl HttpExchange for MockExchange {
    async fn send(&self, request: &RequestLine, _body: Option<String>) -> Result<ExchangeResponse, ProviderError> {
        self.sent.lock().unwrap().push(request.clone());

        match self.responses.get(&request.url) {
            Some(Ok(response)) => Ok(response.clone()),
            Some(Err(message)) => Err(ProviderError::ConnectionError(message.clone())),
            None => Ok(ExchangeResponse {
                status: 404,
                body: Some("not found".to_string()),
            }),
        }
    }
}
