//! ECS Components for PawSim
//!
//! Components are pure data structs attached to entities.
//! They have no behavior - that lives in systems and in `pawsim-logic`.

mod pet;
mod furniture;

pub use pet::*;
pub use furniture::*;

pub use pawsim_logic::geometry::{Rect, Vec2};
