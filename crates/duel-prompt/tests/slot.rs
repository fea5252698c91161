//! Integration tests for `PromptSlot` timing and exactly-once delivery.

use std::time::Duration;

use duel_prompt::{Outcome, PromptKind, PromptSlot, PromptState};
use duel_protocol::PromptId;
use tokio::time;

fn pid(id: &str) -> PromptId {
    PromptId::from(id)
}

#[tokio::test(start_paused = true)]
async fn test_no_action_times_out_at_deadline() {
    let slot = PromptSlot::new(PromptKind::Option);
    let ticket = slot.open(pid("p1"), Some(Duration::from_secs(10)));
    let start = time::Instant::now();

    assert_eq!(ticket.wait().await, Outcome::TimedOut);
    assert!(start.elapsed() >= Duration::from_secs(10));
    assert!(matches!(
        slot.state(),
        PromptState::Resolved { outcome: Outcome::TimedOut, .. }
    ));
}

#[tokio::test(start_paused = true)]
async fn test_selection_before_deadline_wins() {
    let slot = PromptSlot::new(PromptKind::Option);
    let ticket = slot.open(pid("p1"), Some(Duration::from_secs(10)));

    let chooser = slot.clone();
    tokio::spawn(async move {
        time::sleep(Duration::from_secs(3)).await;
        assert!(chooser.select(&pid("p1"), vec!["b".into()]));
    });

    assert_eq!(ticket.wait().await, Outcome::Selected(vec!["b".into()]));

    // The deadline passing later changes nothing.
    time::sleep(Duration::from_secs(20)).await;
    assert!(!slot.expire(&pid("p1")));
    assert!(matches!(
        slot.state(),
        PromptState::Resolved { outcome: Outcome::Selected(_), .. }
    ));
}

#[tokio::test(start_paused = true)]
async fn test_second_select_is_noop() {
    let slot = PromptSlot::new(PromptKind::Card);
    let ticket = slot.open(pid("c1"), None);

    assert!(slot.select(&pid("c1"), vec!["x".into()]));
    assert!(!slot.select(&pid("c1"), vec!["y".into()]));
    assert_eq!(ticket.wait().await, Outcome::Selected(vec!["x".into()]));
}

#[tokio::test(start_paused = true)]
async fn test_open_supersedes_pending_prompt() {
    let slot = PromptSlot::new(PromptKind::Card);
    let first = slot.open(pid("c1"), None);
    let second = slot.open(pid("c2"), None);

    assert_eq!(first.wait().await, Outcome::Cancelled);
    assert_eq!(slot.pending_id(), Some(pid("c2")));

    // A late choice for the superseded prompt doesn't leak into the new one.
    assert!(!slot.select(&pid("c1"), vec!["late".into()]));
    assert!(slot.select(&pid("c2"), vec!["ok".into()]));
    assert_eq!(second.wait().await, Outcome::Selected(vec!["ok".into()]));
}

#[tokio::test(start_paused = true)]
async fn test_cancel_resolves_with_cancelled() {
    let slot = PromptSlot::new(PromptKind::Option);
    let ticket = slot.open(pid("p1"), Some(Duration::from_secs(10)));

    assert!(slot.cancel(None));
    assert_eq!(ticket.wait().await, Outcome::Cancelled);
    assert!(!slot.is_pending());
}

#[tokio::test(start_paused = true)]
async fn test_stale_deadline_does_not_expire_newer_prompt() {
    let slot = PromptSlot::new(PromptKind::Unit);
    let old = slot.open(pid("u1"), Some(Duration::from_secs(5)));
    let new = slot.open(pid("u2"), Some(Duration::from_secs(60)));

    assert_eq!(old.wait().await, Outcome::Cancelled);
    time::sleep(Duration::from_secs(10)).await;
    assert_eq!(slot.pending_id(), Some(pid("u2")));

    assert!(slot.select(&pid("u2"), vec!["me-1".into()]));
    assert_eq!(new.wait().await.into_choice(), vec!["me-1"]);
}

#[tokio::test(start_paused = true)]
async fn test_ticket_reports_deadline() {
    let slot = PromptSlot::new(PromptKind::Intercept);
    let before = time::Instant::now();
    let ticket = slot.open(pid("i1"), Some(Duration::from_secs(60)));
    assert_eq!(ticket.id(), &pid("i1"));
    assert_eq!(ticket.deadline(), Some(before + Duration::from_secs(60)));

    let untimed = PromptSlot::new(PromptKind::Effect).open(pid("d1"), None);
    assert_eq!(untimed.deadline(), None);
}

#[tokio::test(start_paused = true)]
async fn test_responder_answers_only_its_prompt() {
    let slot = PromptSlot::new(PromptKind::Block);
    let first = slot.open(pid("b1"), None);
    let stale = first.responder();
    let second = slot.open(pid("b2"), None);
    let current = second.responder();

    assert!(!stale.is_pending());
    assert!(!stale.select_one("me-1"));
    assert!(current.is_pending());
    assert_eq!(current.kind(), PromptKind::Block);
    assert!(current.select_one("me-2"));

    assert_eq!(first.wait().await, Outcome::Cancelled);
    assert_eq!(second.wait().await, Outcome::Selected(vec!["me-2".into()]));
}

#[tokio::test(start_paused = true)]
async fn test_responder_cancel() {
    let slot = PromptSlot::new(PromptKind::Unit);
    let ticket = slot.open(pid("u1"), Some(Duration::from_secs(60)));
    let responder = ticket.responder();
    assert_eq!(responder.prompt_id(), &pid("u1"));

    assert!(responder.cancel());
    assert!(!responder.cancel());
    assert_eq!(ticket.wait().await, Outcome::Cancelled);
}
