//! Screen-space aiming for attack and card-usage effects.
//!
//! Pure functions; unit positions come from the frontend, which may not
//! have every unit registered.

use duel_effects::{Point, UsagePosition};
use duel_protocol::{PlayerId, Snapshot};

use crate::config::ScreenSize;

/// Aim point when the defending player is the local one.
const OWN_SIDE_Y_OFFSET: f64 = 300.0;
/// Aim point when the defending player is the opponent.
const OPPONENT_SIDE_Y: f64 = 100.0;

fn top_center(screen: ScreenSize) -> Point {
    Point::new(screen.width / 2.0, 0.0)
}

/// Unit ids are prefixed with their owner's player id.
pub fn is_own_unit(unit_id: Option<&str>, local: &PlayerId) -> bool {
    unit_id.is_some_and(|id| !local.as_str().is_empty() && id.starts_with(local.as_str()))
}

/// Where an attack declaration starts: the attacker's position, or the
/// top center of the screen if the attacker is unknown or not on screen.
pub fn attack_origin(
    attacker: Option<&str>,
    position: impl Fn(&str) -> Option<Point>,
    screen: ScreenSize,
) -> Point {
    attacker
        .and_then(position)
        .unwrap_or_else(|| top_center(screen))
}

/// Where a launched attack lands.
///
/// A blocked attack aims at the blocker (top center if it isn't on
/// screen). An unblocked attack by a unit on the local player's field
/// aims at the opponent near the top; anything else aims at the local
/// player near the bottom.
pub fn launch_target(
    attacker: Option<&str>,
    blocker: Option<&str>,
    position: impl Fn(&str) -> Option<Point>,
    snapshot: Option<&Snapshot>,
    local: &PlayerId,
    screen: ScreenSize,
) -> Point {
    if let Some(blocker) = blocker {
        return position(blocker).unwrap_or_else(|| top_center(screen));
    }

    let attacker = attacker.unwrap_or_default();
    let own_attacker = snapshot.is_some_and(|s| s.field_contains(local, attacker));
    if own_attacker {
        Point::new(screen.width / 2.0, OPPONENT_SIDE_Y)
    } else {
        Point::new(screen.width / 2.0, screen.height - OWN_SIDE_Y_OFFSET)
    }
}

/// Units slide in from their owner's side; other cards appear centered.
pub fn usage_position(kind: &str, player: &PlayerId, local: &PlayerId) -> UsagePosition {
    match kind {
        "UNIT" if player == local => UsagePosition::Right,
        "UNIT" => UsagePosition::Left,
        _ => UsagePosition::Center,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    const SCREEN: ScreenSize = ScreenSize {
        width: 1000.0,
        height: 800.0,
    };

    fn me() -> PlayerId {
        PlayerId::from("p1")
    }

    fn positions(unit: &str) -> Option<Point> {
        (unit == "p1-u1").then(|| Point::new(120.0, 640.0))
    }

    fn snapshot() -> Snapshot {
        Snapshot::new(json!({
            "players": {
                "p1": {"field": [{"id": "p1-u1"}]},
                "p2": {"field": [{"id": "p2-u9"}]}
            }
        }))
    }

    #[test]
    fn test_is_own_unit_by_prefix() {
        assert!(is_own_unit(Some("p1-u1"), &me()));
        assert!(!is_own_unit(Some("p2-u9"), &me()));
        assert!(!is_own_unit(None, &me()));
        assert!(!is_own_unit(Some("p1-u1"), &PlayerId::from("")));
    }

    #[test]
    fn test_attack_origin() {
        assert_eq!(attack_origin(Some("p1-u1"), positions, SCREEN), Point::new(120.0, 640.0));
        assert_eq!(attack_origin(Some("p2-u9"), positions, SCREEN), Point::new(500.0, 0.0));
        assert_eq!(attack_origin(None, positions, SCREEN), Point::new(500.0, 0.0));
    }

    #[test]
    fn test_launch_at_blocker() {
        let snap = snapshot();
        let target = launch_target(Some("p2-u9"), Some("p1-u1"), positions, Some(&snap), &me(), SCREEN);
        assert_eq!(target, Point::new(120.0, 640.0));

        let target = launch_target(Some("p1-u1"), Some("p2-u9"), positions, Some(&snap), &me(), SCREEN);
        assert_eq!(target, Point::new(500.0, 0.0));
    }

    #[test]
    fn test_unblocked_launch_by_own_unit_aims_top() {
        let snap = snapshot();
        let target = launch_target(Some("p1-u1"), None, positions, Some(&snap), &me(), SCREEN);
        assert_eq!(target, Point::new(500.0, 100.0));
    }

    #[test]
    fn test_unblocked_launch_by_opponent_aims_bottom() {
        let snap = snapshot();
        let target = launch_target(Some("p2-u9"), None, positions, Some(&snap), &me(), SCREEN);
        assert_eq!(target, Point::new(500.0, 500.0));

        let target = launch_target(Some("p1-u1"), None, positions, None, &me(), SCREEN);
        assert_eq!(target, Point::new(500.0, 500.0));
    }

    #[test]
    fn test_usage_position() {
        let them = PlayerId::from("p2");
        assert_eq!(usage_position("UNIT", &me(), &me()), UsagePosition::Right);
        assert_eq!(usage_position("UNIT", &them, &me()), UsagePosition::Left);
        assert_eq!(usage_position("TRIGGER", &me(), &me()), UsagePosition::Center);
    }
}
