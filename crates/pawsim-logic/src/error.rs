//! Error types shared across the logic crate.

use thiserror::Error;

/// Failures reported by the walkable-surface planner.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum NavError {
    /// The agent is not standing on the walkable surface, so no planner
    /// binding exists for it.
    #[error("agent is not on the walkable surface")]
    NotOnSurface,
    /// No walkable route connects the two points.
    #[error("no walkable route to ({x:.2}, {y:.2})")]
    Unreachable { x: f32, y: f32 },
    /// The handle was invalidated by a surface rebuild or released. The
    /// executor recovers from this by re-pathing.
    #[error("path handle {0} is no longer valid")]
    StaleHandle(u64),
}

/// Failures raised while rebuilding the walkable surface.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BuildError {
    #[error("surface bounds are empty")]
    EmptySurface,
    #[error("invalid cell size {0}")]
    InvalidCellSize(f32),
    #[error("obstacles cover the entire surface")]
    FullyBlocked,
    /// Failure injected by a test or the harness.
    #[error("build failed: {0}")]
    Injected(String),
}

/// Failures loading a [`crate::config::SimConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config parse error: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid config: {}", .0.join("; "))]
    Invalid(Vec<String>),
}
