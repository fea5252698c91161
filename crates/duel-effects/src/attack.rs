//! The attack sequence: declaration, preparation, then resolved or
//! cancelled.

use crate::Point;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AttackPhase {
    #[default]
    Idle,
    /// The attacker is announced.
    Declaration,
    /// The attacker is moving toward its target.
    Preparation,
    /// The strike landed.
    Resolved,
    /// The attack was called off.
    Cancelled,
}

/// State of the current (or last) attack animation.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AttackSequence {
    pub phase: AttackPhase,
    pub attacker_id: Option<String>,
    /// Whether the attacker belongs to the local player.
    pub is_own: bool,
    /// Where the attacker starts from.
    pub origin: Point,
    /// The unit declared as blocker, shown enlarged.
    pub blocker_id: Option<String>,
    /// Where the attacker is heading, once launched.
    pub target: Option<Point>,
    generation: u64,
}

impl AttackSequence {
    /// Starts a new sequence at declaration, discarding any previous one.
    pub fn declare(&mut self, attacker_id: Option<String>, is_own: bool, origin: Point) {
        *self = Self {
            phase: AttackPhase::Declaration,
            attacker_id,
            is_own,
            origin,
            blocker_id: None,
            target: None,
            generation: self.generation + 1,
        };
    }

    /// Records the blocker for the current sequence.
    pub fn declare_block(&mut self, blocker_id: String) {
        self.blocker_id = Some(blocker_id);
    }

    /// Moves to preparation, aimed at `target`. Returns the generation
    /// that [`resolve`](Self::resolve) must present.
    pub fn prepare(&mut self, target: Point) -> u64 {
        self.phase = AttackPhase::Preparation;
        self.target = Some(target);
        self.generation += 1;
        self.generation
    }

    /// Completes the preparation started as `generation`.
    ///
    /// Ignored if the sequence moved on since (cancelled, or a newer
    /// attack started).
    pub fn resolve(&mut self, generation: u64) -> bool {
        if self.phase == AttackPhase::Preparation && self.generation == generation {
            self.phase = AttackPhase::Resolved;
            true
        } else {
            false
        }
    }

    /// Forces the sequence to cancelled, whatever phase it was in.
    pub fn cancel(&mut self) {
        self.phase = AttackPhase::Cancelled;
        self.generation += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_sequence() {
        let mut attack = AttackSequence::default();
        attack.declare(Some("me-1".into()), true, Point::new(10.0, 20.0));
        assert_eq!(attack.phase, AttackPhase::Declaration);

        attack.declare_block("op-2".into());
        let generation = attack.prepare(Point::new(5.0, 5.0));
        assert_eq!(attack.phase, AttackPhase::Preparation);
        assert!(attack.resolve(generation));
        assert_eq!(attack.phase, AttackPhase::Resolved);
        assert_eq!(attack.blocker_id.as_deref(), Some("op-2"));
    }

    #[test]
    fn test_cancel_from_any_phase() {
        let mut attack = AttackSequence::default();
        attack.cancel();
        assert_eq!(attack.phase, AttackPhase::Cancelled);

        attack.declare(None, false, Point::default());
        attack.cancel();
        assert_eq!(attack.phase, AttackPhase::Cancelled);

        attack.declare(None, false, Point::default());
        let generation = attack.prepare(Point::default());
        attack.cancel();
        assert!(!attack.resolve(generation));
        assert_eq!(attack.phase, AttackPhase::Cancelled);
    }

    #[test]
    fn test_new_declaration_clears_previous_attack() {
        let mut attack = AttackSequence::default();
        attack.declare(Some("me-1".into()), true, Point::default());
        attack.declare_block("op-1".into());
        let stale = attack.prepare(Point::new(1.0, 1.0));

        attack.declare(Some("op-3".into()), false, Point::default());
        assert!(attack.blocker_id.is_none());
        assert!(attack.target.is_none());
        assert!(!attack.resolve(stale));
    }
}
