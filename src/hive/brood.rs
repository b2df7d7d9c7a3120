//! Larva growth: stage, nutrients and the digestion timer

use serde::{Deserialize, Serialize};

/// Result of a stage advance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageAdvance {
    /// Stage after the advance (0 after hatching)
    pub stage: u8,
    /// The larva passed the final stage and a new agent should be spawned
    pub hatched: bool,
}

/// Growth state of a brood cell
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Brood {
    stage: u8,
    /// Fed honey not yet digested
    nutrients: u32,
    /// Remaining digestion time; at most one timer is ever armed
    timer_ms: Option<f32>,
}

impl Brood {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stage(&self) -> u8 {
        self.stage
    }

    pub fn nutrients(&self) -> u32 {
        self.nutrients
    }

    pub fn timer_pending(&self) -> bool {
        self.timer_ms.is_some()
    }

    pub fn remaining_ms(&self) -> Option<f32> {
        self.timer_ms
    }

    /// A growing larva that has digested its last meal
    pub fn is_awaiting_food(&self) -> bool {
        self.stage > 0 && self.nutrients == 0 && self.timer_ms.is_none()
    }

    pub fn required_honey(&self, honey_per_stage: u32) -> u32 {
        u32::from(self.stage) * honey_per_stage
    }

    pub fn feed(&mut self, honey: u32) {
        self.nutrients = self.nutrients.saturating_add(honey);
    }

    /// Arm the digestion timer for the current nutrients.
    ///
    /// Returns false without touching anything if a timer is already pending
    /// or there is nothing to digest.
    pub fn start_consumption(&mut self, nutrient_ms: f32) -> bool {
        if self.timer_ms.is_some() || self.nutrients == 0 {
            return false;
        }
        self.timer_ms = Some(nutrient_ms * self.nutrients as f32);
        true
    }

    /// Advance one stage by hand. Ignored while digestion is pending.
    pub fn progress_stage(&mut self, max_stage: u8) -> Option<StageAdvance> {
        if self.timer_pending() {
            return None;
        }
        Some(self.advance(max_stage))
    }

    /// Run the digestion timer; returns the advance when it expires
    pub fn tick(&mut self, dt_ms: f32, max_stage: u8) -> Option<StageAdvance> {
        let remaining = self.timer_ms? - dt_ms;
        if remaining > 0.0 {
            self.timer_ms = Some(remaining);
            return None;
        }

        // Nutrients are cleared before the advance so a re-feed starts from zero
        self.timer_ms = None;
        self.nutrients = 0;
        Some(self.advance(max_stage))
    }

    fn advance(&mut self, max_stage: u8) -> StageAdvance {
        let next = self.stage.saturating_add(1);
        if next > max_stage {
            self.stage = 0;
            StageAdvance {
                stage: 0,
                hatched: true,
            }
        } else {
            self.stage = next;
            StageAdvance {
                stage: next,
                hatched: false,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_brood_is_dormant() {
        let brood = Brood::new();
        assert_eq!(brood.stage(), 0);
        assert!(!brood.is_awaiting_food(), "stage 0 larvae do not ask for food");
    }

    #[test]
    fn test_progress_makes_brood_hungry() {
        let mut brood = Brood::new();
        let advance = brood.progress_stage(4).unwrap();
        assert_eq!(advance, StageAdvance { stage: 1, hatched: false });
        assert!(brood.is_awaiting_food());
        assert_eq!(brood.required_honey(2), 2);
    }

    #[test]
    fn test_feeding_arms_timer_proportional_to_nutrients() {
        let mut brood = Brood::new();
        brood.progress_stage(4);
        brood.progress_stage(4);
        brood.feed(4);

        assert!(brood.start_consumption(10_000.0));
        assert_eq!(brood.remaining_ms(), Some(40_000.0));
        assert!(!brood.is_awaiting_food());
    }

    #[test]
    fn test_start_consumption_is_idempotent() {
        let mut brood = Brood::new();
        brood.progress_stage(4);
        brood.feed(2);
        assert!(brood.start_consumption(1000.0));

        brood.tick(500.0, 4);
        assert!(!brood.start_consumption(1000.0), "second arm must be refused");
        assert_eq!(brood.remaining_ms(), Some(1500.0));
        assert_eq!(brood.nutrients(), 2);
    }

    #[test]
    fn test_progress_ignored_while_timer_pending() {
        let mut brood = Brood::new();
        brood.progress_stage(4);
        brood.feed(2);
        brood.start_consumption(1000.0);

        assert_eq!(brood.progress_stage(4), None);
        assert_eq!(brood.stage(), 1);
        assert_eq!(brood.nutrients(), 2);
    }

    #[test]
    fn test_timer_expiry_advances_once() {
        let mut brood = Brood::new();
        brood.progress_stage(4);
        brood.feed(2);
        brood.start_consumption(1000.0);

        assert_eq!(brood.tick(999.0, 4), None);
        let advance = brood.tick(1.0, 4).unwrap();
        assert_eq!(advance.stage, 2);
        assert_eq!(brood.nutrients(), 0);
        assert!(brood.is_awaiting_food());
        assert_eq!(brood.tick(5000.0, 4), None, "no timer left to expire");
    }

    #[test]
    fn test_wraps_after_final_stage() {
        let mut brood = Brood::new();
        for expected in 1..=4 {
            assert_eq!(brood.progress_stage(4).unwrap().stage, expected);
        }
        let advance = brood.progress_stage(4).unwrap();
        assert!(advance.hatched);
        assert_eq!(brood.stage(), 0);
    }

    #[test]
    fn test_start_consumption_without_food() {
        let mut brood = Brood::new();
        brood.progress_stage(4);
        assert!(!brood.start_consumption(1000.0));
        assert!(brood.is_awaiting_food());
    }
}
