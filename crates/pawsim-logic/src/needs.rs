//! Energy and satiety.

use serde::{Deserialize, Serialize};

use crate::config::NeedsConfig;

pub const NEED_MAX: f32 = 100.0;

/// Physiological needs of a pet, both on a 0-100 scale.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PetNeeds {
    pub energy: f32,
    pub satiety: f32,
}

impl Default for PetNeeds {
    fn default() -> Self {
        Self {
            energy: NEED_MAX,
            satiety: NEED_MAX,
        }
    }
}

impl PetNeeds {
    pub fn new(energy: f32, satiety: f32) -> Self {
        Self {
            energy: energy.clamp(0.0, NEED_MAX),
            satiety: satiety.clamp(0.0, NEED_MAX),
        }
    }

    /// Apply one tick of drain (and recovery while asleep).
    pub fn tick(&mut self, config: &NeedsConfig, sleeping: bool, dt: f32) {
        if sleeping {
            self.energy = (self.energy + config.energy_recovery * dt).min(NEED_MAX);
        } else {
            self.energy = (self.energy - config.energy_decay * dt).max(0.0);
        }
        self.satiety = (self.satiety - config.satiety_decay * dt).max(0.0);
    }

    pub fn is_tired(&self, config: &NeedsConfig) -> bool {
        self.energy <= config.tired_threshold
    }

    pub fn is_hungry(&self, config: &NeedsConfig) -> bool {
        self.satiety <= config.hungry_threshold
    }

    pub fn is_rested(&self, config: &NeedsConfig) -> bool {
        self.energy >= config.wake_threshold.min(NEED_MAX)
    }

    pub fn feed(&mut self, amount: f32) {
        self.satiety = (self.satiety + amount).clamp(0.0, NEED_MAX);
    }
}

/// Nutritional value of a food item.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Meal {
    pub satiety_recovery: f32,
    /// 1 (bland) to 5 (delicious).
    pub tastiness: u8,
}

impl Default for Meal {
    fn default() -> Self {
        Self {
            satiety_recovery: 25.0,
            tastiness: 3,
        }
    }
}

impl Meal {
    pub fn new(satiety_recovery: f32, tastiness: u8) -> Self {
        Self {
            satiety_recovery,
            tastiness: tastiness.clamp(1, 5),
        }
    }

    /// Total satiety gained from finishing the meal.
    pub fn total_satiety(&self) -> f32 {
        self.satiety_recovery + (self.tastiness.max(1) - 1) as f32 * 5.0
    }
}

/// A meal being eaten, paid out in whole-second portions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MealProgress {
    per_portion: f32,
    portions: u32,
    served: u32,
    elapsed: f32,
}

impl MealProgress {
    pub fn new(meal: Meal, duration: f32) -> Self {
        let portions = (duration.ceil() as u32).max(1);
        Self {
            per_portion: (meal.total_satiety() / portions as f32).ceil(),
            portions,
            served: 0,
            elapsed: 0.0,
        }
    }

    /// Advance the meal. Returns the satiety gained during this tick.
    pub fn tick(&mut self, dt: f32) -> f32 {
        self.elapsed += dt;
        let mut gained = 0.0;
        while self.served < self.portions && self.elapsed >= (self.served + 1) as f32 {
            self.served += 1;
            gained += self.per_portion;
        }
        gained
    }

    pub fn is_finished(&self) -> bool {
        self.served >= self.portions
    }
}
