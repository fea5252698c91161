//! The turn-change banner.

/// Which side the new turn belongs to, as shown on the banner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnSide {
    First,
    Second,
}

/// Visible for a fixed window after each turn change.
///
/// Showing it again while visible restarts the window: only the hide
/// scheduled by the latest [`show`](Self::show) takes effect.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TurnBanner {
    pub visible: Option<TurnSide>,
    generation: u64,
}

impl TurnBanner {
    /// Shows the banner and returns the generation to hide it with.
    pub fn show(&mut self, side: TurnSide) -> u64 {
        self.visible = Some(side);
        self.generation += 1;
        self.generation
    }

    /// Hides the banner if nothing re-showed it since `generation`.
    pub fn hide(&mut self, generation: u64) -> bool {
        if self.generation == generation && self.visible.is_some() {
            self.visible = None;
            true
        } else {
            false
        }
    }

    pub fn is_visible(&self) -> bool {
        self.visible.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stale_hide_is_ignored() {
        let mut banner = TurnBanner::default();
        let first = banner.show(TurnSide::First);
        let second = banner.show(TurnSide::Second);

        assert!(!banner.hide(first));
        assert_eq!(banner.visible, Some(TurnSide::Second));
        assert!(banner.hide(second));
        assert!(!banner.is_visible());
    }
}
