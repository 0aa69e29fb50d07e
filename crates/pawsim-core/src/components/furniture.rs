//! Furniture, toys and food

use pawsim_logic::geometry::Vec2;
use pawsim_logic::needs::Meal;
use pawsim_logic::surface::ObstacleShape;
use pawsim_logic::world::InteractableKind;
use pawsim_logic::InteractableId;
use serde::{Deserialize, Serialize};

/// Something a pet can occupy: a toy, a bed or a bowl of food.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interactable {
    pub id: InteractableId,
    pub kind: InteractableKind,
}

/// Obstacle data used when the walkable surface is rebuilt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Obstacle(pub ObstacleShape);

/// Food contents of a bowl.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Food(pub Meal);

/// Counts down while nobody is using the object; despawned at zero.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Lifetime {
    pub remaining: f32,
}

impl Lifetime {
    /// Wind-up mice run out after ten seconds of being ignored.
    pub const TOY_MOUSE: f32 = 10.0;

    pub fn new(seconds: f32) -> Self {
        Self { remaining: seconds }
    }

    pub fn is_expired(&self) -> bool {
        self.remaining <= 0.0
    }
}

/// Scurries around the room on its own. Stops while occupied.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Roaming {
    pub speed: f32,
    /// How far a single dash may go.
    pub range: f32,
    pub destination: Option<Vec2>,
}

impl Roaming {
    pub fn new(speed: f32, range: f32) -> Self {
        Self {
            speed,
            range,
            destination: None,
        }
    }
}

impl Default for Roaming {
    fn default() -> Self {
        Self::new(1.0, 3.0)
    }
}
