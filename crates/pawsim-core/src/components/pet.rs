//! Pet components

use pawsim_logic::geometry::Vec2;
use pawsim_logic::AgentId;
use serde::{Deserialize, Serialize};

/// Marks an entity as a pet and carries its stable id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pet {
    pub id: AgentId,
}

/// Display name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Name(pub String);

/// Ground-plane position, shared by pets and placed objects.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position(pub Vec2);

impl Position {
    pub fn new(x: f32, y: f32) -> Self {
        Self(Vec2::new(x, y))
    }
}

// Pets also carry `PetNeeds` and `PetBrain` from pawsim-logic directly.
