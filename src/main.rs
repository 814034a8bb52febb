// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{Context, Result, anyhow};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{Shell, generate};
use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError, error, info, warn};
use parking_lot::Mutex;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

use dubsync::app_config::{self, Config};
use dubsync::bridge::{Bridge, CaptionPayload, Delivery};
use dubsync::caption_parser::Track;
use dubsync::host::{HostElements, HostPage, TranscriptSurface, VideoElement, WordSpan};
use dubsync::interceptor::{self, HttpExchange, ReqwestExchange};
use dubsync::language_utils;
use dubsync::tokenizer::TokenizerClient;
use dubsync::{CaptionComponents, Controller};

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for app_config::LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => app_config::LogLevel::Error,
            CliLogLevel::Warn => app_config::LogLevel::Warn,
            CliLogLevel::Info => app_config::LogLevel::Info,
            CliLogLevel::Debug => app_config::LogLevel::Debug,
            CliLogLevel::Trace => app_config::LogLevel::Trace,
        }
    }
}

fn level_filter(level: &app_config::LogLevel) -> LevelFilter {
    match level {
        app_config::LogLevel::Error => LevelFilter::Error,
        app_config::LogLevel::Warn => LevelFilter::Warn,
        app_config::LogLevel::Info => LevelFilter::Info,
        app_config::LogLevel::Debug => LevelFilter::Debug,
        app_config::LogLevel::Trace => LevelFilter::Trace,
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Parse a timed-text file and print the resulting track as JSON
    Parse {
        /// Timed-text payload file
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// URL the payload is attributed to (used for the language hint)
        #[arg(short, long, default_value = "file:///?o=local")]
        url: String,
    },

    /// Detect the language of a timed-text file
    Detect {
        /// Timed-text payload file
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// URL the payload is attributed to (used for the language hint)
        #[arg(short, long, default_value = "file:///?o=local")]
        url: String,
    },

    /// Play captions against a wall clock and print the live transcript
    Replay {
        /// Caption URL (fetched through the interceptor) or payload file
        #[arg(value_name = "SOURCE")]
        source: String,

        /// URL a payload file is attributed to
        #[arg(short, long, default_value = "file:///?o=local")]
        url: String,

        /// Playback position to start from, in seconds
        #[arg(short, long, default_value_t = 0.0)]
        start: f64,
    },

    /// Check that the tokenizer service is reachable
    Health,

    /// Generate shell completions for dubsync
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// dubsync - live caption sync with word tokenization
///
/// Parses intercepted timed-text captions, keeps a transcript aligned with
/// playback and tokenizes each sentence into interactive words.
#[derive(Parser, Debug)]
#[command(name = "dubsync")]
#[command(version)]
#[command(about = "Caption timeline parsing, playback sync and word tokenization")]
#[command(long_about = "dubsync parses timed-text caption payloads, keeps a transcript in step with playback and hands each sentence to a tokenizer service.

EXAMPLES:
    dubsync parse captions.xml                       # Print cues and language as JSON
    dubsync detect captions.xml                      # Print the detected language
    dubsync replay captions.xml                      # Replay captions in the terminal
    dubsync replay 'https://cdn.example/?o=abc'      # Fetch through the interceptor, then replay
    dubsync health                                   # Check the tokenizer service
    dubsync completions bash > dubsync.bash          # Generate bash completions

CONFIGURATION:
    Configuration is stored in conf.json by default. You can specify a different
    config file with --config-path. If the config file doesn't exist, a default
    one will be created automatically.")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, default_value = "conf.json", global = true)]
    config_path: String,

    /// Set logging level
    #[arg(short, long, value_enum, global = true)]
    log_level: Option<CliLogLevel>,
}

// @struct: Custom logger implementation
struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    // @creates: New logger with specified level
    fn new(level: LevelFilter) -> Self {
        CustomLogger { level }
    }

    // @initializes: Global logger
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        let logger = Box::new(CustomLogger::new(level));
        log::set_boxed_logger(logger)?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: ANSI color and tag for level
    fn style_for_level(level: Level) -> (&'static str, &'static str) {
        match level {
            Level::Error => ("\x1B[1;31m", "ERROR"),
            Level::Warn => ("\x1B[1;33m", "WARN "),
            Level::Info => ("\x1B[1;32m", "INFO "),
            Level::Debug => ("\x1B[1;36m", "DEBUG"),
            Level::Trace => ("\x1B[1;35m", "TRACE"),
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let (color, tag) = Self::style_for_level(record.level());

            let mut stderr = std::io::stderr();
            let _ = writeln!(stderr, "{}{} {} {}\x1B[0m", color, now, tag, record.args());
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

// @struct: Video element driven by the wall clock
struct WallClockVideo {
    state: Mutex<ClockState>,
}

struct ClockState {
    anchor: Instant,
    base: f64,
    paused: bool,
}

impl WallClockVideo {
    fn starting_at(position: f64) -> Self {
        Self {
            state: Mutex::new(ClockState {
                anchor: Instant::now(),
                base: position.max(0.0),
                paused: false,
            }),
        }
    }
}

impl VideoElement for WallClockVideo {
    fn current_time(&self) -> Option<f64> {
        let state = self.state.lock();
        if state.paused {
            return Some(state.base);
        }
        Some(state.base + state.anchor.elapsed().as_secs_f64())
    }

    fn pause(&self) {
        let mut state = self.state.lock();
        if !state.paused {
            state.base += state.anchor.elapsed().as_secs_f64();
            state.paused = true;
        }
    }
}

// @struct: Transcript printed to stdout
struct TerminalSurface;

impl TranscriptSurface for TerminalSurface {
    fn show_words(&mut self, words: &[WordSpan]) {
        let line = words.iter()
            .map(|word| format!("[{}]{}", word.index, word.text))
            .collect::<Vec<_>>()
            .join(" ");
        println!("{}", line);
    }

    fn show_plain(&mut self, text: &str) {
        println!("{}", text);
    }

    fn clear(&mut self) {
        println!();
    }
}

// @struct: Terminal "page" whose elements are always present
struct TerminalPage {
    video: Arc<WallClockVideo>,
}

impl HostPage for TerminalPage {
    fn locate(&self) -> Option<HostElements> {
        Some(HostElements {
            video: self.video.clone(),
            surface: Box::new(TerminalSurface),
        })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize the logger once with info level by default
    // We'll update the level after loading the config if needed
    CustomLogger::init(LevelFilter::Trace)?;
    log::set_max_level(LevelFilter::Info);

    let cli = CommandLineOptions::parse();

    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = CommandLineOptions::command();
        generate(*shell, &mut cmd, "dubsync", &mut std::io::stdout());
        return Ok(());
    }

    let mut config = Config::load_or_default(&cli.config_path)?;
    if let Some(log_level) = &cli.log_level {
        config.log_level = log_level.clone().into();
    }
    log::set_max_level(level_filter(&config.log_level));

    config.validate()
        .context("Configuration validation failed")?;

    match cli.command {
        Commands::Parse { file, url } => {
            let track = load_track(&file, &url, &config)?;
            println!("{}", serde_json::to_string_pretty(&track)?);
        }
        Commands::Detect { file, url } => {
            let track = load_track(&file, &url, &config)?;
            let name = language_utils::get_language_name(track.language())
                .unwrap_or_else(|_| "Unknown".to_string());
            println!("{} ({})", track.language(), name);
        }
        Commands::Replay { source, url, start } => {
            run_replay(config, &source, &url, start).await?;
        }
        Commands::Health => {
            let client = TokenizerClient::new(
                config.tokenizer.endpoint.clone(),
                Duration::from_secs(config.tokenizer.timeout_secs),
            );
            let health = client.test_connection().await
                .map_err(|e| anyhow!("Tokenizer service check failed: {}", e))?;
            info!("Tokenizer service '{}' {} is {}", health.service, health.version, health.status);
        }
        Commands::Completions { .. } => {}
    }

    Ok(())
}

fn load_track(file: &Path, url: &str, config: &Config) -> Result<Track> {
    let payload = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read caption file: {}", file.display()))?;
    Ok(Track::from_payload(&payload, url, &config.caption))
}

async fn run_replay(config: Config, source: &str, url: &str, start: f64) -> Result<()> {
    let controller = Controller::with_config(config.clone())?;
    let video = Arc::new(WallClockVideo::starting_at(start));
    let bridge = Bridge::new();
    let (popover_tx, _popover_rx) = mpsc::unbounded_channel();

    let tokenizer = Arc::new(TokenizerClient::new(
        config.tokenizer.endpoint.clone(),
        Duration::from_secs(config.tokenizer.timeout_secs),
    ));

    let handle = controller.start(CaptionComponents {
        bridge: bridge.clone(),
        page: Arc::new(TerminalPage { video: video.clone() }),
        tokenizer,
        popovers: popover_tx,
    }).await?;

    if source.starts_with("http://") || source.starts_with("https://") {
        let exchange = interceptor::install(
            ReqwestExchange::new(Duration::from_secs(config.tokenizer.timeout_secs)),
            bridge.clone(),
            &config.caption.url_marker,
        );
        if !exchange.is_caption_url(source) {
            warn!("URL does not contain the caption marker '{}'; nothing will be forwarded", config.caption.url_marker);
        }
        let request = exchange.open("GET", source);
        let response = exchange.send(&request, None).await?;
        info!("Fetched {} (status {})", source, response.status);
    } else {
        let data = std::fs::read_to_string(source)
            .with_context(|| format!("Failed to read caption file: {}", source))?;
        if bridge.emit(CaptionPayload { data, url: url.to_string() }) == Delivery::Dropped {
            error!("Caption payload was dropped before reaching the pipeline");
        }
    }

    let mut ticker = tokio::time::interval(Duration::from_millis(250));
    let mut idle_ticks = 0u32;
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let Some(track) = handle.session().current_track() else {
                    idle_ticks += 1;
                    if idle_ticks >= 40 {
                        warn!("No caption track arrived; giving up");
                        break;
                    }
                    continue;
                };
                let position = video.current_time().unwrap_or_default();
                if track.is_empty() || position > track.duration() + 1.0 {
                    info!("Reached end of track at {:.1}s", position);
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                break;
            }
        }
    }

    handle.shutdown().await;
    Ok(())
}
