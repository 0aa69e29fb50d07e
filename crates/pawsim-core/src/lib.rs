//! PawSim Core - Virtual Pet Simulation Engine
//!
//! An ECS-based simulation of a room full of pets, toys and furniture. Pets
//! get tired and hungry, notice toys, compete for them, and walk around
//! whatever furniture the player drops in their way.
//!
//! # Architecture
//!
//! The simulation uses an Entity Component System (ECS) architecture via `hecs`:
//! - **Entities**: Pets, toys, beds, food bowls, furniture
//! - **Components**: Pure data attached to entities (Position, PetNeeds, Obstacle, etc.)
//! - **Systems**: Logic that queries and updates components
//!
//! Decision making, navigation and slot arbitration live in `pawsim-logic`;
//! this crate wires them to the world.
//!
//! # Example
//!
//! ```rust,no_run
//! use pawsim_core::prelude::*;
//! use pawsim_logic::config::SimConfig;
//! use pawsim_logic::world::InteractableKind;
//!
//! let mut sim = PetSimulation::new(SimConfig::default()).unwrap();
//! sim.spawn_pet("Biscuit", Vec2::new(2.0, 2.0));
//! sim.spawn_interactable(InteractableKind::CatTeaser, Vec2::new(6.0, 4.0));
//!
//! loop {
//!     sim.update(1.0 / 30.0);
//!     for cue in sim.drain_cues() {
//!         println!("{:?}", cue);
//!     }
//! }
//! ```

pub mod components;
pub mod engine;
pub mod records;
pub mod systems;

/// Commonly used types for convenient importing
pub mod prelude {
    pub use crate::components::*;
    pub use crate::engine::PetSimulation;
    pub use crate::records::PetRecord;
}
