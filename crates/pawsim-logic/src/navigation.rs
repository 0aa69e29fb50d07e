//! Per-agent navigation executor.
//!
//! Drives one agent toward a (possibly moving) target over a shared
//! [`NavSurface`]. Recovers locally from target movement, from an agent that
//! stops making progress, and from a planner that reports arrival while the
//! agent is visibly somewhere else.

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::config::NavigationConfig;
use crate::error::NavError;
use crate::geometry::Vec2;
use crate::surface::{NavSurface, PathHandle};
use crate::AgentId;

/// Outcome of one navigation tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavStatus {
    InProgress,
    Arrived,
    Failed,
}

/// Recovery counters, exposed for diagnostics and the harness.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavStats {
    pub path_requests: u32,
    pub stuck_recoveries: u32,
    pub desync_recoveries: u32,
    pub failures: u32,
}

#[derive(Debug, Clone)]
struct ActiveNav {
    /// `None` until a path is needed (or after a rejected re-plan).
    handle: Option<PathHandle>,
    target: Vec2,
    /// Target position at the time of the last path request.
    requested_target: Vec2,
    tolerance: f32,
    speed: f32,
    last_position: Vec2,
    stuck_timer: f32,
    repath_timer: f32,
    /// Premature arrivals since the agent last made progress.
    desync_streak: u32,
}

#[derive(Debug, Clone)]
pub struct NavigationExecutor {
    agent: AgentId,
    config: NavigationConfig,
    active: Option<ActiveNav>,
    stats: NavStats,
}

impl NavigationExecutor {
    pub fn new(agent: AgentId, config: NavigationConfig) -> Self {
        Self {
            agent,
            config,
            active: None,
            stats: NavStats::default(),
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    /// Current destination, if navigating.
    pub fn target(&self) -> Option<Vec2> {
        self.active.as_ref().map(|a| a.target)
    }

    pub fn stats(&self) -> NavStats {
        self.stats
    }

    /// Start moving toward `target`. Any previous navigation is cancelled.
    pub fn begin(
        &mut self,
        surface: &mut dyn NavSurface,
        position: Vec2,
        target: Vec2,
        tolerance: f32,
        speed: f32,
    ) -> Result<(), NavError> {
        self.cancel(surface);

        if !surface.is_on_surface(position) {
            self.stats.failures += 1;
            return Err(NavError::NotOnSurface);
        }

        let mut active = ActiveNav {
            handle: None,
            target,
            requested_target: target,
            tolerance,
            speed,
            last_position: position,
            stuck_timer: 0.0,
            repath_timer: 0.0,
            desync_streak: 0,
        };

        if position.distance(&target) > surface.stopping_distance() + tolerance {
            match surface.plan_path(position, target) {
                Ok(handle) => {
                    self.stats.path_requests += 1;
                    active.handle = Some(handle);
                }
                Err(err) => {
                    self.stats.failures += 1;
                    return Err(err);
                }
            }
        }

        self.active = Some(active);
        Ok(())
    }

    /// Advance the agent one step. `target` is the live target position;
    /// `None` means it no longer exists.
    pub fn tick(
        &mut self,
        surface: &mut dyn NavSurface,
        position: &mut Vec2,
        target: Option<Vec2>,
        dt: f32,
    ) -> NavStatus {
        if self.active.is_none() {
            return NavStatus::Failed;
        }
        let Some(target) = target else {
            warn!("{}: navigation target vanished", self.agent);
            return self.fail(surface);
        };
        if !surface.is_on_surface(*position) {
            warn!("{}: left the walkable surface at ({:.2}, {:.2})", self.agent, position.x, position.y);
            return self.fail(surface);
        }

        let stop = surface.stopping_distance();
        let config = &self.config;
        let Some(active) = self.active.as_mut() else {
            return NavStatus::Failed;
        };
        active.target = target;
        let arrive_distance = stop + active.tolerance;

        let mut handle = match active.handle {
            Some(handle) => handle,
            None => {
                if position.distance(&target) <= arrive_distance {
                    return self.finish(surface);
                }
                match Self::request(surface, active, *position, &mut self.stats) {
                    Ok(handle) => handle,
                    Err(err) => {
                        warn!("{}: path request rejected: {}", self.agent, err);
                        return self.fail(surface);
                    }
                }
            }
        };

        // Re-path on target movement, throttled
        active.repath_timer += dt;
        if active.repath_timer >= config.repath_interval {
            active.repath_timer = 0.0;
            if target.distance(&active.requested_target) > config.target_move_epsilon {
                debug!("{}: target moved, re-pathing", self.agent);
                match Self::request(surface, active, *position, &mut self.stats) {
                    Ok(h) => handle = h,
                    Err(err) => {
                        warn!("{}: re-path rejected: {}", self.agent, err);
                        return self.fail(surface);
                    }
                }
            }
        }

        // Rebuilt away underneath us without an invalidate
        if !surface.is_pending(handle) && !surface.remaining_distance(handle).is_finite() {
            debug!("{}: {}, re-pathing", self.agent, NavError::StaleHandle(handle.0));
            match Self::request(surface, active, *position, &mut self.stats) {
                Ok(h) => handle = h,
                Err(err) => {
                    warn!("{}: re-path rejected: {}", self.agent, err);
                    return self.fail(surface);
                }
            }
        }

        *position = surface.steer(handle, *position, active.speed, dt);
        let moved = position.distance(&active.last_position);
        active.last_position = *position;

        let pending = surface.is_pending(handle);
        let within = !pending && surface.remaining_distance(handle) <= arrive_distance;

        if within {
            let straight = position.distance(&target);
            if straight <= arrive_distance + config.arrival_slack {
                return self.finish(surface);
            }
            // Planner believes we are there but we are not
            if active.desync_streak >= config.max_desync_recoveries {
                warn!(
                    "{}: planner keeps reporting arrival {:.2} away from target, giving up",
                    self.agent, straight
                );
                return self.fail(surface);
            }
            debug!(
                "{}: planner reports arrival {:.2} away from target, re-pathing",
                self.agent, straight
            );
            self.stats.desync_recoveries += 1;
            active.desync_streak += 1;
            active.stuck_timer = 0.0;
            if let Err(err) = Self::request(surface, active, *position, &mut self.stats) {
                warn!("{}: re-path rejected: {}", self.agent, err);
                return self.fail(surface);
            }
            return NavStatus::InProgress;
        }

        if moved >= config.stuck_move_threshold {
            active.desync_streak = 0;
        }

        if !pending && moved < config.stuck_move_threshold {
            active.stuck_timer += dt;
            if active.stuck_timer >= config.stuck_timeout {
                debug!("{}: stuck for {:.2}s, re-pathing", self.agent, active.stuck_timer);
                active.stuck_timer = 0.0;
                self.stats.stuck_recoveries += 1;
                if let Err(err) = Self::request(surface, active, *position, &mut self.stats) {
                    warn!("{}: re-path rejected: {}", self.agent, err);
                    return self.fail(surface);
                }
            }
        } else {
            active.stuck_timer = 0.0;
        }

        NavStatus::InProgress
    }

    /// Stop navigating and release the path. Safe to call at any time.
    pub fn cancel(&mut self, surface: &mut dyn NavSurface) {
        if let Some(active) = self.active.take() {
            if let Some(handle) = active.handle {
                surface.release(handle);
            }
        }
    }

    /// Re-plan after the surface was rebuilt underneath the current path.
    pub fn invalidate(&mut self, surface: &mut dyn NavSurface) {
        let Some(active) = self.active.as_mut() else {
            return;
        };
        if let Some(old) = active.handle.take() {
            surface.release(old);
        }
        active.stuck_timer = 0.0;
        let from = active.last_position;
        if let Err(err) = Self::request(surface, active, from, &mut self.stats) {
            // Retried on the next tick
            debug!("{}: re-plan after rebuild failed: {}", self.agent, err);
        }
    }

    fn request(
        surface: &mut dyn NavSurface,
        active: &mut ActiveNav,
        from: Vec2,
        stats: &mut NavStats,
    ) -> Result<PathHandle, NavError> {
        if let Some(old) = active.handle.take() {
            surface.release(old);
        }
        let handle = surface.plan_path(from, active.target)?;
        stats.path_requests += 1;
        active.handle = Some(handle);
        active.requested_target = active.target;
        Ok(handle)
    }

    fn finish(&mut self, surface: &mut dyn NavSurface) -> NavStatus {
        self.cancel(surface);
        NavStatus::Arrived
    }

    fn fail(&mut self, surface: &mut dyn NavSurface) -> NavStatus {
        self.stats.failures += 1;
        self.cancel(surface);
        NavStatus::Failed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Rect;
    use crate::grid::GridSurface;

    fn grid() -> GridSurface {
        GridSurface::with_bounds(Rect::new(Vec2::ZERO, Vec2::new(12.0, 12.0)), 0.25, 0.1, 1).unwrap()
    }

    fn executor() -> NavigationExecutor {
        NavigationExecutor::new(AgentId(1), NavigationConfig::default())
    }

    #[test]
    fn arrives_at_static_target() {
        let mut surface = grid();
        let mut nav = executor();
        let mut pos = Vec2::new(1.0, 1.0);
        let target = Vec2::new(9.0, 7.0);
        nav.begin(&mut surface, pos, target, 0.2, 3.0).unwrap();

        let mut status = NavStatus::InProgress;
        for _ in 0..200 {
            status = nav.tick(&mut surface, &mut pos, Some(target), 0.05);
            if status != NavStatus::InProgress {
                break;
            }
        }
        assert_eq!(status, NavStatus::Arrived);
        assert!(pos.distance(&target) <= 0.1 + 0.2 + 0.2);
        assert!(!nav.is_active());
        assert_eq!(surface.active_paths(), 0);
    }

    #[test]
    fn approaches_target_every_tick() {
        let mut surface = grid();
        let mut nav = executor();
        let mut pos = Vec2::new(1.125, 10.875);
        let target = Vec2::new(10.375, 2.125);
        nav.begin(&mut surface, pos, target, 0.2, 3.0).unwrap();

        let mut last = pos.distance(&target);
        let mut status = NavStatus::InProgress;
        for _ in 0..300 {
            status = nav.tick(&mut surface, &mut pos, Some(target), 0.05);
            let now = pos.distance(&target);
            assert!(now <= last + 1e-4, "moved away: {last:.4} -> {now:.4}");
            last = now;
            if status != NavStatus::InProgress {
                break;
            }
        }
        assert_eq!(status, NavStatus::Arrived);
    }

    #[test]
    fn begin_within_tolerance_arrives_without_request() {
        let mut surface = grid();
        let mut nav = executor();
        let mut pos = Vec2::new(5.0, 5.0);
        nav.begin(&mut surface, pos, Vec2::new(5.1, 5.0), 0.2, 3.0).unwrap();
        assert_eq!(nav.stats().path_requests, 0);
        assert_eq!(
            nav.tick(&mut surface, &mut pos, Some(Vec2::new(5.1, 5.0)), 0.1),
            NavStatus::Arrived
        );
    }

    #[test]
    fn begin_off_surface_fails() {
        let mut surface = grid();
        let mut nav = executor();
        let err = nav
            .begin(&mut surface, Vec2::new(-5.0, 0.0), Vec2::new(3.0, 3.0), 0.2, 3.0)
            .unwrap_err();
        assert_eq!(err, NavError::NotOnSurface);
        assert!(!nav.is_active());
    }

    #[test]
    fn vanished_target_fails_and_releases() {
        let mut surface = grid();
        let mut nav = executor();
        let mut pos = Vec2::new(1.0, 1.0);
        nav.begin(&mut surface, pos, Vec2::new(8.0, 8.0), 0.2, 3.0).unwrap();
        assert_eq!(surface.active_paths(), 1);

        assert_eq!(nav.tick(&mut surface, &mut pos, None, 0.1), NavStatus::Failed);
        assert_eq!(surface.active_paths(), 0);
        assert_eq!(nav.stats().failures, 1);
    }

    #[test]
    fn follows_moving_target() {
        let mut surface = grid();
        let mut nav = executor();
        let mut pos = Vec2::new(1.0, 1.0);
        let mut target = Vec2::new(6.0, 1.0);
        nav.begin(&mut surface, pos, target, 0.2, 3.0).unwrap();

        let mut status = NavStatus::InProgress;
        for step in 0..400 {
            if step < 40 {
                target = Vec2::new(6.0, 1.0 + step as f32 * 0.2);
            }
            status = nav.tick(&mut surface, &mut pos, Some(target), 0.05);
            if status != NavStatus::InProgress {
                break;
            }
        }
        assert_eq!(status, NavStatus::Arrived);
        assert!(pos.distance(&target) < 0.6);
        assert!(nav.stats().path_requests > 1);
    }

    #[test]
    fn invalidate_replans_after_rebuild() {
        use crate::surface::RebuildableSurface;

        let mut surface = grid();
        let mut nav = executor();
        let mut pos = Vec2::new(1.0, 6.0);
        let target = Vec2::new(11.0, 6.0);
        nav.begin(&mut surface, pos, target, 0.2, 3.0).unwrap();
        for _ in 0..5 {
            nav.tick(&mut surface, &mut pos, Some(target), 0.05);
        }

        surface.rebuild(&[Rect::centered(Vec2::new(6.0, 6.0), 1.0, 6.0)]).unwrap();
        let before = nav.stats().path_requests;
        nav.invalidate(&mut surface);
        assert_eq!(nav.stats().path_requests, before + 1);
        assert_eq!(surface.active_paths(), 1);

        let mut status = NavStatus::InProgress;
        for _ in 0..400 {
            status = nav.tick(&mut surface, &mut pos, Some(target), 0.05);
            if status != NavStatus::InProgress {
                break;
            }
        }
        assert_eq!(status, NavStatus::Arrived);
    }

    #[test]
    fn stale_handle_is_replaced_on_next_tick() {
        use crate::surface::RebuildableSurface;

        let mut surface = grid();
        let mut nav = executor();
        let mut pos = Vec2::new(1.0, 3.0);
        let target = Vec2::new(11.0, 3.0);
        nav.begin(&mut surface, pos, target, 0.2, 3.0).unwrap();
        for _ in 0..5 {
            nav.tick(&mut surface, &mut pos, Some(target), 0.05);
        }

        // No invalidate after the rebuild
        surface.rebuild(&[]).unwrap();
        assert_eq!(surface.active_paths(), 0);
        let before = nav.stats().path_requests;
        assert_eq!(nav.tick(&mut surface, &mut pos, Some(target), 0.05), NavStatus::InProgress);
        assert_eq!(nav.stats().path_requests, before + 1);
        assert_eq!(nav.stats().stuck_recoveries, 0);
        assert_eq!(surface.active_paths(), 1);

        let mut status = NavStatus::InProgress;
        for _ in 0..400 {
            status = nav.tick(&mut surface, &mut pos, Some(target), 0.05);
            if status != NavStatus::InProgress {
                break;
            }
        }
        assert_eq!(status, NavStatus::Arrived);
    }

    #[test]
    fn cancel_twice_is_harmless() {
        let mut surface = grid();
        let mut nav = executor();
        nav.begin(&mut surface, Vec2::new(1.0, 1.0), Vec2::new(4.0, 4.0), 0.2, 3.0)
            .unwrap();
        nav.cancel(&mut surface);
        nav.cancel(&mut surface);
        assert!(!nav.is_active());
    }
}
