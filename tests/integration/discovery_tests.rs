/*!
 * Tests for bounded host discovery
 */

use std::time::Duration;

use tokio::sync::watch;
use tokio::time::Instant;

use dubsync::app_config::DiscoveryConfig;
use dubsync::host::{discover, DiscoveryOutcome};
use crate::common;
use crate::common::mock_collaborators::{RecordingSurface, ScriptedPage, ScriptedVideo};

fn assert_elapsed(started: Instant, millis: u64) {
    let elapsed = started.elapsed();
    assert!(
        elapsed >= Duration::from_millis(millis) && elapsed < Duration::from_millis(millis + 50),
        "expected about {} ms, got {:?}",
        millis, elapsed
    );
}

/// Test that elements appearing late are still found
#[tokio::test(start_paused = true)]
async fn test_discover_withLateElements_shouldFindThem() {
    common::init_logging();
    let page = ScriptedPage::ready_after(ScriptedVideo::at(0.0), RecordingSurface::new(), 3);
    let (_tx, mut rx) = watch::channel(false);
    let started = Instant::now();

    let outcome = discover(&page, &DiscoveryConfig::default(), &mut rx).await;

    assert!(matches!(outcome, DiscoveryOutcome::Found(_)));
    assert_eq!(page.lookups(), 4);
    assert_elapsed(started, 750);
}

/// Test that discovery gives up after the configured attempts
#[tokio::test(start_paused = true)]
async fn test_discover_withMissingElements_shouldReportUnsupported() {
    common::init_logging();
    let page = ScriptedPage::never();
    let config = DiscoveryConfig { retry_interval_ms: 250, max_attempts: 5 };
    let (_tx, mut rx) = watch::channel(false);
    let started = Instant::now();

    let outcome = discover(&page, &config, &mut rx).await;

    assert!(matches!(outcome, DiscoveryOutcome::Unsupported { attempts: 5 }));
    assert_eq!(page.lookups(), 5);
    assert_elapsed(started, 1000);
}

/// Test that the default bound is 40 attempts at 250 ms
#[tokio::test(start_paused = true)]
async fn test_discover_withDefaults_shouldGiveUpAfterFortyAttempts() {
    let page = ScriptedPage::never();
    let (_tx, mut rx) = watch::channel(false);
    let started = Instant::now();

    let outcome = discover(&page, &DiscoveryConfig::default(), &mut rx).await;

    assert!(matches!(outcome, DiscoveryOutcome::Unsupported { attempts: 40 }));
    assert_eq!(page.lookups(), 40);
    assert_elapsed(started, 39 * 250);
}

/// Test that shutdown interrupts the wait between attempts
#[tokio::test(start_paused = true)]
async fn test_discover_withShutdownDuringWait_shouldCancel() {
    let page = ScriptedPage::never();
    let config = DiscoveryConfig::default();
    let (tx, mut rx) = watch::channel(false);

    let (outcome, _) = tokio::join!(
        discover(&page, &config, &mut rx),
        async {
            tokio::time::sleep(Duration::from_millis(600)).await;
            tx.send(true).unwrap();
        }
    );

    assert!(matches!(outcome, DiscoveryOutcome::Cancelled));
    assert_eq!(page.lookups(), 3);
}

/// Test that a shutdown already requested skips discovery entirely
#[tokio::test(start_paused = true)]
async fn test_discover_afterShutdown_shouldNotLookUp() {
    let page = ScriptedPage::never();
    let (tx, mut rx) = watch::channel(false);
    tx.send(true).unwrap();

    let outcome = discover(&page, &DiscoveryConfig::default(), &mut rx).await;

    assert!(matches!(outcome, DiscoveryOutcome::Cancelled));
    assert_eq!(page.lookups(), 0);
}
