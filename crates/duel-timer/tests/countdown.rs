//! Integration tests for `Countdown`.
//!
//! Time is paused and auto-advanced, so deadlines are exact.

use std::time::Duration;

use duel_timer::{Countdown, Phase};
use tokio::time;

fn mulligan() -> Countdown {
    Countdown::new("mulligan", Duration::from_secs(10))
}

// =========================================================================
// Start semantics
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_start_if_idle_starts_exactly_once() {
    let mut c = mulligan();
    assert!(c.start_if_idle());
    let deadline = c.deadline().unwrap();

    time::advance(Duration::from_secs(4)).await;
    assert!(!c.start_if_idle());
    assert_eq!(c.deadline(), Some(deadline));
    assert_eq!(c.remaining(), Some(Duration::from_secs(6)));
}

#[tokio::test(start_paused = true)]
async fn test_start_if_idle_restarts_after_expiry() {
    let mut c = mulligan();
    c.start();
    time::advance(Duration::from_secs(11)).await;
    assert_eq!(c.phase(), Phase::Expired);
    assert_eq!(c.remaining(), Some(Duration::ZERO));

    assert!(c.start_if_idle());
    assert_eq!(c.remaining(), Some(Duration::from_secs(10)));
}

#[tokio::test(start_paused = true)]
async fn test_start_always_restarts() {
    let mut c = mulligan();
    c.start();
    time::advance(Duration::from_secs(7)).await;
    c.start();
    assert_eq!(c.remaining(), Some(Duration::from_secs(10)));
}

// =========================================================================
// Pause / resume
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_pause_preserves_remaining_time() {
    let mut c = Countdown::new("turn", Duration::from_secs(60));
    c.start();
    time::advance(Duration::from_secs(20)).await;

    assert!(c.pause());
    assert!(c.is_paused());
    time::advance(Duration::from_secs(100)).await;
    assert_eq!(c.phase(), Phase::Paused);
    assert_eq!(c.remaining(), Some(Duration::from_secs(40)));

    assert!(c.resume());
    assert!(c.is_running());
    time::advance(Duration::from_secs(39)).await;
    assert!(c.is_running());
    time::advance(Duration::from_secs(1)).await;
    assert_eq!(c.phase(), Phase::Expired);
}

#[tokio::test(start_paused = true)]
async fn test_pause_is_idempotent() {
    let mut c = Countdown::new("turn", Duration::from_secs(60));
    c.start();
    assert!(c.pause());
    assert!(!c.pause());
    assert!(c.resume());
    assert!(!c.resume());
}

#[tokio::test(start_paused = true)]
async fn test_expired_countdown_cannot_be_paused() {
    let mut c = mulligan();
    c.start();
    time::advance(Duration::from_secs(10)).await;
    assert!(!c.pause());
    assert_eq!(c.phase(), Phase::Expired);
}

// =========================================================================
// wait_expired
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_wait_expired_completes_at_deadline() {
    let mut c = mulligan();
    c.start();
    let start = time::Instant::now();
    c.wait_expired().await;
    assert!(start.elapsed() >= Duration::from_secs(10));
    assert_eq!(c.phase(), Phase::Expired);
}

#[tokio::test(start_paused = true)]
async fn test_wait_expired_pends_while_idle_or_paused() {
    let c = mulligan();
    let idle = time::timeout(Duration::from_secs(3600), c.wait_expired()).await;
    assert!(idle.is_err());

    let mut c = mulligan();
    c.start();
    c.pause();
    let paused = time::timeout(Duration::from_secs(3600), c.wait_expired()).await;
    assert!(paused.is_err());
}
