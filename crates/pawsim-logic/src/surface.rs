//! Walkable-surface contracts.
//!
//! The planner that owns the walkable area is a collaborator: the behavior
//! core only plans, follows and releases paths through [`NavSurface`], and the
//! rebake scheduler rebuilds it through [`RebuildableSurface`]. The grid
//! implementation lives in [`crate::grid`].
//!
//! This module also holds the obstacle preparation step that runs before
//! every rebuild.

use serde::{Deserialize, Serialize};

use crate::error::{BuildError, NavError};
use crate::geometry::{Rect, Vec2};

/// Opaque handle to a planned path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PathHandle(pub u64);

/// Path planning and path following on the walkable surface.
///
/// Implementations must tolerate stale handles: a released or rebuilt-away
/// handle reports no pending work, infinite remaining distance and never
/// moves the agent.
pub trait NavSurface {
    /// Request a path. The path may stay pending for a few ticks.
    fn plan_path(&mut self, from: Vec2, to: Vec2) -> Result<PathHandle, NavError>;

    /// True while the planner is still computing the path.
    fn is_pending(&self, handle: PathHandle) -> bool;

    /// Distance left along the path from the last steered position.
    fn remaining_distance(&self, handle: PathHandle) -> f32;

    /// Distance at which the planner considers a path finished.
    fn stopping_distance(&self) -> f32;

    /// Advance `position` along the path. Returns the new position.
    fn steer(&mut self, handle: PathHandle, position: Vec2, speed: f32, dt: f32) -> Vec2;

    /// Drop the path. Unknown handles are ignored.
    fn release(&mut self, handle: PathHandle);

    /// True when `position` is on a walkable part of the surface.
    fn is_on_surface(&self, position: Vec2) -> bool;

    /// Nearest walkable point within `max_distance` of `near`.
    fn sample_position(&self, near: Vec2, max_distance: f32) -> Option<Vec2>;
}

/// A surface whose walkable index can be rebuilt around carved obstacles.
pub trait RebuildableSurface: NavSurface {
    /// Rebuild the index. All outstanding path handles become stale.
    fn rebuild(&mut self, carved: &[Rect]) -> Result<(), BuildError>;
}

/// How an object collides with pets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Collider {
    /// No collision shape at all.
    None,
    /// Solid: pets walk around it.
    Solid,
    /// Trigger: pets walk over it.
    Trigger,
}

/// Width and depth of a shape on the ground plane.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Footprint {
    pub width: f32,
    pub depth: f32,
}

impl Footprint {
    pub const UNIT: Self = Self {
        width: 1.0,
        depth: 1.0,
    };

    pub fn new(width: f32, depth: f32) -> Self {
        Self { width, depth }
    }

    pub fn at(&self, center: Vec2) -> Rect {
        Rect::centered(center, self.width, self.depth)
    }
}

/// Obstacle-relevant shape data of a placed object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObstacleShape {
    pub collider: Collider,
    /// Visual bounds, used to size a footprint when one is added.
    pub bounds: Option<Footprint>,
    /// Blocking volume used by the surface builder.
    pub footprint: Option<Footprint>,
    /// Whether the rebuild cuts a hole for this object.
    pub carve: bool,
}

impl ObstacleShape {
    pub fn new(collider: Collider, bounds: Option<Footprint>) -> Self {
        Self {
            collider,
            bounds,
            footprint: None,
            carve: false,
        }
    }

    pub fn blocks_pets(&self) -> bool {
        self.collider == Collider::Solid
    }

    /// World-space hole this object cuts into the surface, if any.
    pub fn carved_rect(&self, position: Vec2) -> Option<Rect> {
        match self.footprint {
            Some(footprint) if self.carve => Some(footprint.at(position)),
            _ => None,
        }
    }
}

/// Result of preparing one object for a rebuild.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrepareOutcome {
    /// A footprint was added and carving enabled.
    Prepared,
    /// The object was already usable by the builder.
    AlreadyPrepared,
    /// Walkable object; a stale footprint was removed.
    Cleared,
    /// Walkable object with nothing to do.
    Walkable,
}

impl PrepareOutcome {
    /// Whether the object takes part in the rebuild as an obstacle.
    pub fn is_obstacle(&self) -> bool {
        matches!(self, PrepareOutcome::Prepared | PrepareOutcome::AlreadyPrepared)
    }
}

/// Make sure a placed object has a shape the surface builder can use.
///
/// Solid objects get a footprint (their visual bounds, else a unit square)
/// and are marked carve-capable. Walkable objects lose any footprint.
/// Running this twice on the same object changes nothing the second time.
pub fn prepare_obstacle(shape: &mut ObstacleShape) -> PrepareOutcome {
    if shape.blocks_pets() {
        let already = shape.footprint.is_some() && shape.carve;
        if shape.footprint.is_none() {
            let size = shape
                .bounds
                .filter(|b| b.width > 0.0 && b.depth > 0.0)
                .unwrap_or(Footprint::UNIT);
            shape.footprint = Some(size);
        }
        shape.carve = true;
        if already {
            PrepareOutcome::AlreadyPrepared
        } else {
            PrepareOutcome::Prepared
        }
    } else if shape.footprint.take().is_some() {
        shape.carve = false;
        PrepareOutcome::Cleared
    } else {
        shape.carve = false;
        PrepareOutcome::Walkable
    }
}
