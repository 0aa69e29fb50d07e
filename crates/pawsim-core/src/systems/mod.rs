//! Systems - logic that operates on components
//!
//! Pet decisions themselves live in `pawsim-logic`; these systems move data
//! between the ECS world and that logic.

mod behavior;
mod furniture;
mod needs;
mod obstacles;

pub use behavior::*;
pub use furniture::*;
pub use needs::*;
pub use obstacles::*;
