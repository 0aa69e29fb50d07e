//! Pure pet behavior logic for PawSim.
//!
//! This crate contains the coordination core of the pet simulation and is
//! independent of any ECS, renderer or save format. Functions take plain
//! data and collaborator traits, so every piece can be unit-tested in
//! isolation and driven by the `pawsim-core` engine or the headless harness.
//!
//! # Module Overview
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`arbitration`] | Single-occupant interaction slots and the slot registry |
//! | [`behavior`] | Per-pet state machine (idle → attracted → travel → interact → cooldown) |
//! | [`config`] | Designer-tunable constants, JSON loading and validation |
//! | [`cues`] | Fire-and-forget presentation cues |
//! | [`decision`] | Closed behavior tree choosing what an idle pet does next |
//! | [`error`] | Error types for navigation, surface builds and configuration |
//! | [`geometry`] | Planar vectors and rectangles |
//! | [`grid`] | In-memory grid implementation of the walkable surface |
//! | [`navigation`] | Per-pet navigation executor with stuck and desync recovery |
//! | [`needs`] | Energy and satiety bookkeeping |
//! | [`rebake`] | Debounced, coalescing walkable-surface rebuild scheduler |
//! | [`surface`] | Walkable-surface contracts and obstacle preparation |
//! | [`world`] | World query contract and per-tick scene snapshots |

pub mod arbitration;
pub mod behavior;
pub mod config;
pub mod cues;
pub mod decision;
pub mod error;
pub mod geometry;
pub mod grid;
pub mod navigation;
pub mod needs;
pub mod rebake;
pub mod surface;
pub mod world;

use serde::{Deserialize, Serialize};

/// Stable identifier of a pet agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AgentId(pub u32);

/// Stable identifier of an interactable world object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct InteractableId(pub u32);

impl std::fmt::Display for AgentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "pet#{}", self.0)
    }
}

impl std::fmt::Display for InteractableId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "obj#{}", self.0)
    }
}
