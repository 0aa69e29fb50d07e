//! Debounced rebuilds of the walkable surface.
//!
//! Placing, moving or removing furniture marks the surface dirty. Requests
//! are collapsed: the first one starts a debounce window, later ones ride
//! along, and anything arriving while a build is running schedules exactly
//! one follow-up. A build is spread over two ticks: obstacle preparation
//! runs when the debounce window closes, the rebuild itself on the next
//! tick.

use log::{debug, error, info};
use serde::{Deserialize, Serialize};

use crate::config::RebakeConfig;
use crate::error::BuildError;

/// What the scheduler drives. Implemented by the engine over its world and
/// surface.
pub trait RebakeTarget {
    /// Give every obstacle-bearing object a usable footprint. Returns the
    /// number of objects that block pets.
    fn prepare_obstacles(&mut self) -> usize;

    fn rebuild_surface(&mut self) -> Result<(), BuildError>;

    /// Called after a successful rebuild so navigating pets can re-plan.
    fn surface_rebuilt(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RebakePhase {
    Idle,
    Debouncing { remaining: f32 },
    /// Obstacles are prepared; the rebuild runs on the next tick.
    Building { obstacles: usize },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RebakeStats {
    pub requests: u32,
    /// Requests absorbed by a window or build already under way.
    pub coalesced: u32,
    pub builds: u32,
    pub failures: u32,
}

#[derive(Debug, Clone)]
pub struct RebakeScheduler {
    config: RebakeConfig,
    phase: RebakePhase,
    pending: bool,
    stats: RebakeStats,
}

impl RebakeScheduler {
    pub fn new(config: RebakeConfig) -> Self {
        Self {
            config,
            phase: RebakePhase::Idle,
            pending: false,
            stats: RebakeStats::default(),
        }
    }

    pub fn phase(&self) -> RebakePhase {
        self.phase
    }

    pub fn is_building(&self) -> bool {
        matches!(self.phase, RebakePhase::Building { .. })
    }

    /// A follow-up build is owed once the current one finishes.
    pub fn is_pending(&self) -> bool {
        self.pending
    }

    pub fn is_idle(&self) -> bool {
        self.phase == RebakePhase::Idle && !self.pending
    }

    pub fn stats(&self) -> RebakeStats {
        self.stats
    }

    /// Mark the surface dirty.
    pub fn request_rebake(&mut self) {
        self.stats.requests += 1;
        match self.phase {
            RebakePhase::Building { .. } => {
                self.pending = true;
                self.stats.coalesced += 1;
            }
            RebakePhase::Debouncing { .. } => {
                // The open window already covers this request
                self.stats.coalesced += 1;
            }
            RebakePhase::Idle => {
                debug!("surface rebake requested, waiting {:.2}s", self.config.debounce);
                self.phase = RebakePhase::Debouncing {
                    remaining: self.config.debounce,
                };
            }
        }
    }

    /// Advance the scheduler. At most one build phase runs per call.
    pub fn tick(&mut self, dt: f32, target: &mut dyn RebakeTarget) {
        match self.phase {
            RebakePhase::Idle => {}
            RebakePhase::Debouncing { remaining } => {
                let remaining = remaining - dt;
                if remaining > 0.0 {
                    self.phase = RebakePhase::Debouncing { remaining };
                } else {
                    let obstacles = target.prepare_obstacles();
                    self.stats.builds += 1;
                    self.phase = RebakePhase::Building { obstacles };
                }
            }
            RebakePhase::Building { obstacles } => {
                self.finish_build(obstacles, target);
            }
        }
    }

    /// Build immediately, skipping the debounce window. Does nothing and
    /// returns false while a build is already in flight.
    pub fn build_now(&mut self, target: &mut dyn RebakeTarget) -> bool {
        if self.is_building() {
            return false;
        }
        let obstacles = target.prepare_obstacles();
        self.stats.builds += 1;
        self.phase = RebakePhase::Building { obstacles };
        self.finish_build(obstacles, target);
        true
    }

    fn finish_build(&mut self, obstacles: usize, target: &mut dyn RebakeTarget) {
        match target.rebuild_surface() {
            Ok(()) => {
                info!("walkable surface rebuilt around {} obstacles", obstacles);
                target.surface_rebuilt();
            }
            Err(err) => {
                self.stats.failures += 1;
                error!("walkable surface rebuild failed: {}", err);
            }
        }

        self.phase = RebakePhase::Idle;
        if self.pending {
            self.pending = false;
            debug!("changes arrived during the build, scheduling another");
            self.phase = RebakePhase::Debouncing {
                remaining: self.config.debounce,
            };
        }
    }
}
