//! Integration tests for `EffectScheduler` timing.
//!
//! Time is paused; `sleep` auto-advances the clock so every spawned
//! effect timer fires at its exact deadline.

use std::time::Duration;

use duel_effects::{
    AttackPhase, CardUsage, EffectScheduler, Point, TurnSide, UsagePosition,
};
use tokio::time;

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

/// Lets spawned timer tasks observe the advanced clock.
async fn settle() {
    for _ in 0..4 {
        tokio::task::yield_now().await;
    }
}

// =========================================================================
// Turn banner
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_banner_hides_after_window() {
    let fx = EffectScheduler::default();
    fx.show_turn_banner(TurnSide::First);
    assert_eq!(fx.snapshot().banner.visible, Some(TurnSide::First));

    time::sleep(ms(1799)).await;
    settle().await;
    assert!(fx.snapshot().banner.is_visible());

    time::sleep(ms(2)).await;
    settle().await;
    assert!(!fx.snapshot().banner.is_visible());
}

#[tokio::test(start_paused = true)]
async fn test_banner_reshow_restarts_window() {
    let fx = EffectScheduler::default();
    fx.show_turn_banner(TurnSide::First);
    time::sleep(ms(1000)).await;
    fx.show_turn_banner(TurnSide::Second);

    // The first window would have ended here.
    time::sleep(ms(1000)).await;
    settle().await;
    assert_eq!(fx.snapshot().banner.visible, Some(TurnSide::Second));

    time::sleep(ms(801)).await;
    settle().await;
    assert!(!fx.snapshot().banner.is_visible());
}

// =========================================================================
// Attack sequence
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_launch_resolves_after_launch_time() {
    let fx = EffectScheduler::default();
    fx.declare_attack(Some("me-1".into()), true, Point::new(100.0, 500.0));
    assert_eq!(fx.snapshot().attack.phase, AttackPhase::Declaration);

    fx.launch(Point::new(640.0, 100.0));
    let board = fx.snapshot();
    assert_eq!(board.attack.phase, AttackPhase::Preparation);
    assert_eq!(board.attack.target, Some(Point::new(640.0, 100.0)));

    time::sleep(fx.timings().launch + ms(1)).await;
    settle().await;
    assert_eq!(fx.snapshot().attack.phase, AttackPhase::Resolved);
}

#[tokio::test(start_paused = true)]
async fn test_launch_cancel_wins_over_pending_resolution() {
    let fx = EffectScheduler::default();
    fx.declare_attack(None, false, Point::default());
    fx.launch(Point::default());
    fx.cancel_launch();

    time::sleep(fx.timings().launch * 2).await;
    settle().await;
    assert_eq!(fx.snapshot().attack.phase, AttackPhase::Cancelled);
}

// =========================================================================
// Keyed marks
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_multiple_status_changes_per_unit_removed_individually() {
    let fx = EffectScheduler::default();
    let a = fx.add_status_change("u1", "bp", 1000);
    let b = fx.add_status_change("u1", "block", 0);
    fx.remove_after(a, ms(500));
    fx.remove_after(b, ms(1500));

    assert_eq!(fx.snapshot().status_changes_for("u1").count(), 2);
    time::sleep(ms(501)).await;
    settle().await;
    let board = fx.snapshot();
    let left: Vec<_> = board.status_changes_for("u1").map(|s| s.kind.as_str()).collect();
    assert_eq!(left, vec!["block"]);

    time::sleep(ms(1000)).await;
    settle().await;
    assert_eq!(fx.snapshot().status_changes_for("u1").count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_overclock_and_select_ring_until_removed() {
    let fx = EffectScheduler::default();
    let glow = fx.add_overclock("u2");
    let ring = fx.add_select_ring("u3");
    assert!(fx.snapshot().is_overclocked("u2"));
    assert!(fx.snapshot().is_selected("u3"));

    // Nothing removes them on its own.
    time::sleep(Duration::from_secs(60)).await;
    settle().await;
    assert!(fx.snapshot().is_overclocked("u2"));

    assert!(fx.remove(glow));
    assert!(fx.remove(ring));
    assert!(!fx.remove(ring));
    let board = fx.snapshot();
    assert!(!board.is_overclocked("u2"));
    assert!(!board.is_selected("u3"));
}

// =========================================================================
// Card usage, highlight, subscription
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_card_usage_replaced_and_hidden() {
    let fx = EffectScheduler::default();
    let usage = |image: &str| CardUsage {
        image: image.into(),
        kind: "UNIT".into(),
        position: UsagePosition::Right,
    };
    fx.show_card_usage(usage("a.png"));
    time::sleep(ms(1500)).await;
    fx.show_card_usage(usage("b.png"));

    time::sleep(ms(600)).await;
    settle().await;
    assert_eq!(fx.snapshot().card_usage.map(|u| u.image), Some("b.png".to_string()));

    time::sleep(ms(1500)).await;
    settle().await;
    assert!(fx.snapshot().card_usage.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_subscribers_see_changes() {
    let fx = EffectScheduler::default();
    let mut rx = fx.subscribe();

    fx.highlight_unit(Some("u9".into()));
    rx.changed().await.unwrap();
    assert_eq!(rx.borrow_and_update().highlight.as_deref(), Some("u9"));

    // Same value again is not a change.
    fx.highlight_unit(Some("u9".into()));
    assert!(!rx.has_changed().unwrap());
}
