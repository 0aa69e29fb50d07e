//! Per-pet behavior state machine.
//!
//! ```text
//! Idle ──detect──▶ Attracted ──T1, slot won──▶ Traveling ──arrived──▶ Interacting ──T2──▶ Cooldown ──T3──▶ Idle
//!   │                  └──T1, slot lost──▶ Idle          │                 (or Sleeping / Eating)
//!   ├──tired──▶ Traveling(bed) ─▶ Sleeping ─▶ Idle         └──failed / target gone──▶ Idle
//!   └──hungry──▶ Traveling(food) ─▶ Eating ─▶ Idle
//! ```
//!
//! The slot of the target interactable is claimed when the pet commits to
//! traveling and is held in a [`SlotLease`] carried by the state itself, so
//! every state that holds a slot can only be left through code that has the
//! lease in hand. The lease releases at most once.
//!
//! What an idle pet does next is decided by a [`DecisionNode`] tree shared
//! by all pets.

use log::{debug, warn};
use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};

use crate::arbitration::Arbitrator;
use crate::config::SimConfig;
use crate::cues::{Cue, CueSink};
use crate::decision::{ActionKind, Blackboard, ConditionKind, DecisionNode, NodeStatus};
use crate::error::NavError;
use crate::geometry::Vec2;
use crate::navigation::{NavStatus, NavigationExecutor};
use crate::needs::{MealProgress, PetNeeds};
use crate::surface::NavSurface;
use crate::world::{InteractableKind, InteractableSnapshot, WorldQuery};
use crate::{AgentId, InteractableId};

/// Flat view of the behavior state, used for records and diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Activity {
    Idle,
    Sleeping,
    Eating,
    Attracted,
    Traveling,
    Interacting,
    Cooldown,
}

/// Boolean activity flags as the presentation layer consumes them.
/// Exactly one is set for any [`Activity`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActivityFlags {
    pub idle: bool,
    pub sleeping: bool,
    pub eating: bool,
    pub attracted: bool,
    pub traveling: bool,
    pub interacting: bool,
    pub cooldown: bool,
}

impl ActivityFlags {
    pub fn count_set(&self) -> usize {
        [
            self.idle,
            self.sleeping,
            self.eating,
            self.attracted,
            self.traveling,
            self.interacting,
            self.cooldown,
        ]
        .iter()
        .filter(|f| **f)
        .count()
    }
}

impl From<Activity> for ActivityFlags {
    fn from(activity: Activity) -> Self {
        let mut flags = ActivityFlags::default();
        match activity {
            Activity::Idle => flags.idle = true,
            Activity::Sleeping => flags.sleeping = true,
            Activity::Eating => flags.eating = true,
            Activity::Attracted => flags.attracted = true,
            Activity::Traveling => flags.traveling = true,
            Activity::Interacting => flags.interacting = true,
            Activity::Cooldown => flags.cooldown = true,
        }
        flags
    }
}

/// Claim on one interaction slot. Releasing is single-shot.
#[derive(Debug, PartialEq, Eq)]
pub struct SlotLease {
    slot: Option<(InteractableId, AgentId)>,
}

impl SlotLease {
    /// Enter the slot, or `None` if the arbitrator refuses.
    pub fn acquire(arbitrator: &mut Arbitrator, id: InteractableId, agent: AgentId) -> Option<Self> {
        if arbitrator.try_enter(id, agent) {
            Some(Self {
                slot: Some((id, agent)),
            })
        } else {
            None
        }
    }

    pub fn id(&self) -> Option<InteractableId> {
        self.slot.map(|(id, _)| id)
    }

    pub fn is_held(&self) -> bool {
        self.slot.is_some()
    }

    /// Leave the slot. Returns false if already released.
    pub fn release(&mut self, arbitrator: &mut Arbitrator) -> bool {
        match self.slot.take() {
            Some((id, agent)) => {
                arbitrator.leave(id, agent);
                true
            }
            None => false,
        }
    }
}

/// Why the pet is traveling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TravelPurpose {
    Play,
    Rest,
    Eat,
}

#[derive(Debug)]
pub enum BehaviorState {
    Idle {
        /// Time left before the next wander leg.
        pause: f32,
    },
    Attracted {
        target: InteractableId,
        elapsed: f32,
    },
    Traveling {
        target: InteractableId,
        purpose: TravelPurpose,
        lease: SlotLease,
    },
    Interacting {
        target: InteractableId,
        elapsed: f32,
        lease: SlotLease,
    },
    Sleeping {
        target: InteractableId,
        lease: SlotLease,
    },
    Eating {
        target: InteractableId,
        meal: MealProgress,
        lease: SlotLease,
    },
    Cooldown {
        remaining: f32,
    },
}

impl BehaviorState {
    pub fn activity(&self) -> Activity {
        match self {
            BehaviorState::Idle { .. } => Activity::Idle,
            BehaviorState::Attracted { .. } => Activity::Attracted,
            BehaviorState::Traveling { .. } => Activity::Traveling,
            BehaviorState::Interacting { .. } => Activity::Interacting,
            BehaviorState::Sleeping { .. } => Activity::Sleeping,
            BehaviorState::Eating { .. } => Activity::Eating,
            BehaviorState::Cooldown { .. } => Activity::Cooldown,
        }
    }

    pub fn target(&self) -> Option<InteractableId> {
        match self {
            BehaviorState::Attracted { target, .. }
            | BehaviorState::Traveling { target, .. }
            | BehaviorState::Interacting { target, .. }
            | BehaviorState::Sleeping { target, .. }
            | BehaviorState::Eating { target, .. } => Some(*target),
            BehaviorState::Idle { .. } | BehaviorState::Cooldown { .. } => None,
        }
    }

    pub fn lease(&self) -> Option<&SlotLease> {
        match self {
            BehaviorState::Traveling { lease, .. }
            | BehaviorState::Interacting { lease, .. }
            | BehaviorState::Sleeping { lease, .. }
            | BehaviorState::Eating { lease, .. } => Some(lease),
            _ => None,
        }
    }
}

/// Something the engine has to act on after a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrainEvent {
    /// A toy interaction ended (completed or cut short).
    InteractionEnded(InteractableId),
    /// A meal was finished and the food is gone.
    Consumed(InteractableId),
}

/// Everything a pet needs from the outside world for one tick.
pub struct BrainContext<'a> {
    pub arbitrator: &'a mut Arbitrator,
    pub surface: &'a mut dyn NavSurface,
    pub world: &'a dyn WorldQuery,
    pub cues: &'a mut dyn CueSink,
    pub rng: &'a mut dyn RngCore,
    pub config: &'a SimConfig,
    pub tree: &'a DecisionNode,
    /// Simulation clock in seconds.
    pub now: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InteractionEnd {
    Completed,
    Interrupted,
}

#[derive(Debug)]
pub struct PetBrain {
    agent: AgentId,
    state: BehaviorState,
    nav: NavigationExecutor,
    bored_since: Option<f64>,
    since_detection: f32,
}

impl PetBrain {
    pub fn new(agent: AgentId, config: &SimConfig) -> Self {
        Self {
            agent,
            state: idle(config),
            nav: NavigationExecutor::new(agent, config.navigation.clone()),
            bored_since: None,
            since_detection: 0.0,
        }
    }

    /// Rebuild a brain from saved data. Transient activities are not
    /// resumed; the pet starts idle with its boredom intact.
    pub fn restore(agent: AgentId, config: &SimConfig, bored_since: Option<f64>) -> Self {
        let mut brain = Self::new(agent, config);
        brain.bored_since = bored_since;
        brain
    }

    pub fn agent(&self) -> AgentId {
        self.agent
    }

    pub fn state(&self) -> &BehaviorState {
        &self.state
    }

    pub fn activity(&self) -> Activity {
        self.state.activity()
    }

    pub fn flags(&self) -> ActivityFlags {
        self.activity().into()
    }

    pub fn is_bored(&self) -> bool {
        self.bored_since.is_some()
    }

    pub fn bored_since(&self) -> Option<f64> {
        self.bored_since
    }

    /// Slot held through the current state's lease.
    pub fn held_slot(&self) -> Option<InteractableId> {
        self.state.lease().and_then(SlotLease::id)
    }

    pub fn navigation(&self) -> &NavigationExecutor {
        &self.nav
    }

    /// Advance the pet by `dt` seconds.
    pub fn tick(
        &mut self,
        position: &mut Vec2,
        needs: &mut PetNeeds,
        ctx: &mut BrainContext<'_>,
        dt: f32,
    ) -> Option<BrainEvent> {
        self.update_boredom(ctx);

        let state = std::mem::replace(&mut self.state, idle(ctx.config));
        match state {
            BehaviorState::Idle { pause } => {
                self.state = BehaviorState::Idle { pause };
                self.since_detection += dt;
                let tree = ctx.tree;
                let mut board = IdleBoard {
                    brain: self,
                    position,
                    needs,
                    ctx,
                    dt,
                };
                tree.evaluate(&mut board);
                None
            }
            BehaviorState::Attracted { target, elapsed } => {
                self.tick_attracted(target, elapsed + dt, *position, ctx);
                None
            }
            BehaviorState::Traveling {
                target,
                purpose,
                lease,
            } => {
                self.tick_traveling(target, purpose, lease, position, ctx, dt);
                None
            }
            BehaviorState::Interacting {
                target,
                elapsed,
                lease,
            } => {
                let elapsed = elapsed + dt;
                if ctx.world.interactable(target).is_none() {
                    warn!("{}: {} vanished mid-interaction", self.agent, target);
                    self.end_interaction(target, lease, InteractionEnd::Interrupted, ctx)
                } else if elapsed >= ctx.config.behavior.interact_duration {
                    self.end_interaction(target, lease, InteractionEnd::Completed, ctx)
                } else {
                    self.state = BehaviorState::Interacting {
                        target,
                        elapsed,
                        lease,
                    };
                    None
                }
            }
            BehaviorState::Sleeping { target, mut lease } => {
                let bed_gone = ctx.world.interactable(target).is_none();
                if bed_gone || needs.is_rested(&ctx.config.needs) {
                    lease.release(ctx.arbitrator);
                    ctx.cues.emit(Cue::WakeUp { agent: self.agent });
                    debug!("{}: woke up (energy {:.0})", self.agent, needs.energy);
                } else {
                    self.state = BehaviorState::Sleeping { target, lease };
                }
                None
            }
            BehaviorState::Eating {
                target,
                mut meal,
                mut lease,
            } => {
                if ctx.world.interactable(target).is_none() {
                    lease.release(ctx.arbitrator);
                    ctx.cues.emit(Cue::Confused { agent: self.agent });
                    return None;
                }
                needs.feed(meal.tick(dt));
                if meal.is_finished() {
                    lease.release(ctx.arbitrator);
                    ctx.cues.emit(Cue::FinishEating {
                        agent: self.agent,
                        target,
                    });
                    Some(BrainEvent::Consumed(target))
                } else {
                    self.state = BehaviorState::Eating { target, meal, lease };
                    None
                }
            }
            BehaviorState::Cooldown { remaining } => {
                let remaining = remaining - dt;
                if remaining > 0.0 {
                    self.state = BehaviorState::Cooldown { remaining };
                }
                None
            }
        }
    }

    /// Abandon whatever the pet is doing and return it to idle, releasing
    /// any held slot.
    pub fn interrupt(&mut self, ctx: &mut BrainContext<'_>) -> Option<BrainEvent> {
        self.nav.cancel(ctx.surface);
        let state = std::mem::replace(&mut self.state, idle(ctx.config));
        match state {
            BehaviorState::Idle { .. } | BehaviorState::Cooldown { .. } => None,
            BehaviorState::Attracted { target, .. } => {
                self.lose_interest(target, ctx);
                None
            }
            BehaviorState::Traveling { mut lease, .. } => {
                lease.release(ctx.arbitrator);
                None
            }
            BehaviorState::Interacting { target, lease, .. } => {
                self.end_interaction(target, lease, InteractionEnd::Interrupted, ctx)
            }
            BehaviorState::Sleeping { mut lease, .. } => {
                lease.release(ctx.arbitrator);
                ctx.cues.emit(Cue::WakeUp { agent: self.agent });
                None
            }
            BehaviorState::Eating {
                target, mut lease, ..
            } => {
                lease.release(ctx.arbitrator);
                ctx.cues.emit(Cue::FinishEating {
                    agent: self.agent,
                    target,
                });
                None
            }
        }
    }

    /// The walkable surface was rebuilt; re-plan any active path.
    pub fn on_surface_rebuilt(&mut self, surface: &mut dyn NavSurface) {
        self.nav.invalidate(surface);
    }

    fn update_boredom(&mut self, ctx: &BrainContext<'_>) {
        if let Some(since) = self.bored_since {
            if ctx.now - since >= ctx.config.behavior.boredom_recovery as f64 {
                debug!("{}: no longer bored", self.agent);
                self.bored_since = None;
            }
        }
    }

    fn tick_attracted(
        &mut self,
        target: InteractableId,
        elapsed: f32,
        position: Vec2,
        ctx: &mut BrainContext<'_>,
    ) {
        let Some(toy) = ctx.world.interactable(target) else {
            self.lose_interest(target, ctx);
            return;
        };
        if elapsed < ctx.config.behavior.attract_duration {
            self.state = BehaviorState::Attracted { target, elapsed };
            return;
        }

        self.lose_interest(target, ctx);
        let Some(lease) = SlotLease::acquire(ctx.arbitrator, target, self.agent) else {
            debug!("{}: {} was taken first", self.agent, target);
            return;
        };
        let speed = ctx.config.navigation.run_speed;
        if let Err(err) = self.start_travel(toy, TravelPurpose::Play, lease, position, speed, ctx) {
            warn!("{}: cannot reach {}: {}", self.agent, target, err);
        }
    }

    fn tick_traveling(
        &mut self,
        target: InteractableId,
        purpose: TravelPurpose,
        mut lease: SlotLease,
        position: &mut Vec2,
        ctx: &mut BrainContext<'_>,
        dt: f32,
    ) {
        let snapshot = ctx.world.interactable(target);
        let anchor = snapshot.map(|s| s.anchor);

        match self.nav.tick(ctx.surface, position, anchor, dt) {
            NavStatus::InProgress => {
                self.state = BehaviorState::Traveling {
                    target,
                    purpose,
                    lease,
                };
            }
            NavStatus::Failed => {
                if snapshot.is_none() {
                    warn!("{}: {} disappeared while traveling", self.agent, target);
                } else {
                    warn!("{}: gave up traveling to {}", self.agent, target);
                }
                lease.release(ctx.arbitrator);
                ctx.cues.emit(Cue::Confused { agent: self.agent });
            }
            NavStatus::Arrived => {
                let agent = self.agent;
                self.state = match purpose {
                    TravelPurpose::Play => {
                        ctx.cues.emit(Cue::StartInteracting { agent, target });
                        BehaviorState::Interacting {
                            target,
                            elapsed: 0.0,
                            lease,
                        }
                    }
                    TravelPurpose::Rest => {
                        ctx.cues.emit(Cue::StartSleeping { agent, target });
                        BehaviorState::Sleeping { target, lease }
                    }
                    TravelPurpose::Eat => {
                        ctx.cues.emit(Cue::StartEating { agent, target });
                        let meal = snapshot.and_then(|s| s.meal).unwrap_or_default();
                        BehaviorState::Eating {
                            target,
                            meal: MealProgress::new(meal, ctx.config.needs.eating_duration),
                            lease,
                        }
                    }
                };
                debug!("{}: arrived at {}, now {:?}", agent, target, self.state.activity());
            }
        }
    }

    fn end_interaction(
        &mut self,
        target: InteractableId,
        mut lease: SlotLease,
        end: InteractionEnd,
        ctx: &mut BrainContext<'_>,
    ) -> Option<BrainEvent> {
        lease.release(ctx.arbitrator);
        ctx.cues.emit(Cue::EndInteracting {
            agent: self.agent,
            target,
        });

        self.state = idle(ctx.config);
        if end == InteractionEnd::Completed {
            let behavior = &ctx.config.behavior;
            if ctx.rng.gen::<f32>() < behavior.boredom_chance {
                self.bored_since = Some(ctx.now);
                ctx.cues.emit(Cue::BecameBored { agent: self.agent });
                debug!("{}: became bored", self.agent);
            }
            if behavior.cooldown_duration > 0.0 {
                self.state = BehaviorState::Cooldown {
                    remaining: behavior.cooldown_duration,
                };
            }
        }
        Some(BrainEvent::InteractionEnded(target))
    }

    fn lose_interest(&mut self, target: InteractableId, ctx: &mut BrainContext<'_>) {
        ctx.arbitrator.clear_attracted(target);
        ctx.cues.emit(Cue::HideCuriosity { agent: self.agent });
    }

    /// Begin traveling to `snapshot`. On failure the lease is released and
    /// the pet stays idle.
    fn start_travel(
        &mut self,
        snapshot: InteractableSnapshot,
        purpose: TravelPurpose,
        mut lease: SlotLease,
        position: Vec2,
        speed: f32,
        ctx: &mut BrainContext<'_>,
    ) -> Result<(), NavError> {
        let tolerance = ctx.config.navigation.arrival_radius;
        match self.nav.begin(ctx.surface, position, snapshot.anchor, tolerance, speed) {
            Ok(()) => {
                debug!("{}: traveling to {} ({:?})", self.agent, snapshot.id, purpose);
                self.state = BehaviorState::Traveling {
                    target: snapshot.id,
                    purpose,
                    lease,
                };
                Ok(())
            }
            Err(err) => {
                lease.release(ctx.arbitrator);
                self.state = idle(ctx.config);
                Err(err)
            }
        }
    }

    fn seek(
        &mut self,
        kind: InteractableKind,
        purpose: TravelPurpose,
        position: Vec2,
        ctx: &mut BrainContext<'_>,
    ) -> NodeStatus {
        let arbitrator = &*ctx.arbitrator;
        let accept = |s: &InteractableSnapshot| {
            arbitrator.can_enter(s.id) && (purpose != TravelPurpose::Eat || s.meal.is_some())
        };
        let radius = ctx.config.needs.search_radius;
        let Some(found) = ctx.world.nearest_interactable(&[kind], position, radius, &accept) else {
            return NodeStatus::Failure;
        };
        let Some(lease) = SlotLease::acquire(ctx.arbitrator, found.id, self.agent) else {
            return NodeStatus::Failure;
        };
        let speed = ctx.config.navigation.walk_speed;
        match self.start_travel(found, purpose, lease, position, speed, ctx) {
            Ok(()) => NodeStatus::Success,
            Err(err) => {
                debug!("{}: cannot reach {}: {}", self.agent, found.id, err);
                NodeStatus::Failure
            }
        }
    }

    fn detect_toy(&mut self, position: Vec2, ctx: &mut BrainContext<'_>) -> NodeStatus {
        let detection = &ctx.config.detection;
        if self.since_detection < detection.check_interval {
            return NodeStatus::Failure;
        }
        self.since_detection = 0.0;

        let arbitrator = &*ctx.arbitrator;
        let accept = |s: &InteractableSnapshot| arbitrator.can_enter(s.id);
        let Some(toy) =
            ctx.world
                .nearest_interactable(&InteractableKind::TOYS, position, detection.radius, &accept)
        else {
            return NodeStatus::Failure;
        };
        if ctx.rng.gen::<f32>() >= detection.attraction_chance {
            return NodeStatus::Failure;
        }

        self.nav.cancel(ctx.surface);
        ctx.arbitrator.note_attracted(toy.id);
        ctx.cues.emit(Cue::ShowCuriosity {
            agent: self.agent,
            target: toy.id,
        });
        debug!("{}: attracted by {}", self.agent, toy.id);
        self.state = BehaviorState::Attracted {
            target: toy.id,
            elapsed: 0.0,
        };
        NodeStatus::Success
    }

    fn wander(&mut self, position: &mut Vec2, ctx: &mut BrainContext<'_>, dt: f32) -> NodeStatus {
        let wander = &ctx.config.wander;
        if self.nav.is_active() {
            let target = self.nav.target();
            return match self.nav.tick(ctx.surface, position, target, dt) {
                NavStatus::InProgress => NodeStatus::Running,
                NavStatus::Arrived | NavStatus::Failed => {
                    self.state = BehaviorState::Idle { pause: wander.pause };
                    NodeStatus::Success
                }
            };
        }

        let BehaviorState::Idle { pause } = &mut self.state else {
            return NodeStatus::Failure;
        };
        *pause -= dt;
        if *pause > 0.0 {
            return NodeStatus::Running;
        }
        *pause = wander.pause;

        let angle = ctx.rng.gen_range(0.0..std::f32::consts::TAU);
        let distance = if wander.max_distance > wander.min_distance {
            ctx.rng.gen_range(wander.min_distance..wander.max_distance)
        } else {
            wander.min_distance
        };
        let goal = *position + Vec2::new(angle.cos(), angle.sin()) * distance;
        let Some(goal) = ctx.surface.sample_position(goal, distance) else {
            return NodeStatus::Failure;
        };
        let tolerance = ctx.config.navigation.arrival_radius;
        let speed = ctx.config.navigation.walk_speed;
        match self.nav.begin(ctx.surface, *position, goal, tolerance, speed) {
            Ok(()) => NodeStatus::Running,
            Err(_) => NodeStatus::Failure,
        }
    }
}

fn idle(config: &SimConfig) -> BehaviorState {
    BehaviorState::Idle {
        pause: config.wander.pause,
    }
}

/// Binds the idle decision tree to one pet for one tick.
struct IdleBoard<'b, 'a> {
    brain: &'b mut PetBrain,
    position: &'b mut Vec2,
    needs: &'b PetNeeds,
    ctx: &'b mut BrainContext<'a>,
    dt: f32,
}

impl Blackboard for IdleBoard<'_, '_> {
    fn check(&mut self, condition: ConditionKind) -> bool {
        let config = self.ctx.config;
        match condition {
            ConditionKind::Tired => self.needs.is_tired(&config.needs),
            ConditionKind::Hungry => self.needs.is_hungry(&config.needs),
            ConditionKind::Curious => !self.brain.is_bored(),
            ConditionKind::WanderEnabled => config.wander.enabled,
        }
    }

    fn act(&mut self, action: ActionKind) -> NodeStatus {
        let position = *self.position;
        match action {
            ActionKind::SeekBed => {
                self.brain
                    .seek(InteractableKind::Bed, TravelPurpose::Rest, position, self.ctx)
            }
            ActionKind::SeekFood => {
                self.brain
                    .seek(InteractableKind::Food, TravelPurpose::Eat, position, self.ctx)
            }
            ActionKind::DetectToy => self.brain.detect_toy(position, self.ctx),
            ActionKind::Wander => self.brain.wander(self.position, self.ctx, self.dt),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cues::CueLog;
    use crate::geometry::Rect;
    use crate::grid::GridSurface;
    use crate::needs::Meal;
    use crate::world::SceneSnapshot;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    const TOY: InteractableId = InteractableId(1);

    struct Rig {
        arbitrator: Arbitrator,
        surface: GridSurface,
        scene: SceneSnapshot,
        cues: CueLog,
        rng: StdRng,
        config: SimConfig,
        tree: DecisionNode,
        now: f64,
    }

    impl Rig {
        fn new(config: SimConfig) -> Self {
            let surface =
                GridSurface::with_bounds(Rect::new(Vec2::ZERO, Vec2::new(12.0, 12.0)), 0.25, 0.1, 1)
                    .unwrap();
            Self {
                arbitrator: Arbitrator::new(),
                surface,
                scene: SceneSnapshot::new(),
                cues: CueLog::new(),
                rng: StdRng::seed_from_u64(7),
                config,
                tree: DecisionNode::idle_tree(),
                now: 0.0,
            }
        }

        fn add(&mut self, id: u32, kind: InteractableKind, at: Vec2) {
            let meal = (kind == InteractableKind::Food).then(|| Meal::new(25.0, 3));
            self.scene.upsert(InteractableSnapshot {
                id: InteractableId(id),
                kind,
                anchor: at,
                meal,
            });
            self.arbitrator.register(InteractableId(id));
        }

        fn remove(&mut self, id: InteractableId) {
            self.scene.remove(id);
            self.arbitrator.despawn(id);
        }

        fn context(&mut self) -> BrainContext<'_> {
            BrainContext {
                arbitrator: &mut self.arbitrator,
                surface: &mut self.surface,
                world: &self.scene,
                cues: &mut self.cues,
                rng: &mut self.rng,
                config: &self.config,
                tree: &self.tree,
                now: self.now,
            }
        }

        fn tick(&mut self, brain: &mut PetBrain, pos: &mut Vec2, needs: &mut PetNeeds, dt: f32) -> Option<BrainEvent> {
            let sleeping = brain.activity() == Activity::Sleeping;
            needs.tick(&self.config.needs, sleeping, dt);
            let mut ctx = self.context();
            let event = brain.tick(pos, needs, &mut ctx, dt);
            self.now += dt as f64;
            event
        }

        /// Tick until `brain` reaches `activity`, returning the elapsed time.
        fn run_until(
            &mut self,
            brain: &mut PetBrain,
            pos: &mut Vec2,
            needs: &mut PetNeeds,
            activity: Activity,
            limit: f32,
        ) -> f32 {
            let mut elapsed = 0.0;
            while brain.activity() != activity {
                assert!(elapsed < limit, "never reached {activity:?}, stuck in {:?}", brain.activity());
                self.tick(brain, pos, needs, 0.1);
                elapsed += 0.1;
            }
            elapsed
        }
    }

    fn eager_config() -> SimConfig {
        let mut config = SimConfig::default();
        config.detection.attraction_chance = 1.0;
        config.detection.check_interval = 0.0;
        config.behavior.boredom_chance = 0.0;
        config.wander.enabled = false;
        config
    }

    #[test]
    fn full_toy_sequence_releases_slot() {
        let mut rig = Rig::new(eager_config());
        rig.add(1, InteractableKind::ToyMouse, Vec2::new(6.0, 5.0));
        let mut brain = PetBrain::new(AgentId(1), &rig.config);
        let mut pos = Vec2::new(3.0, 5.0);
        let mut needs = PetNeeds::default();

        rig.tick(&mut brain, &mut pos, &mut needs, 0.1);
        assert_eq!(brain.activity(), Activity::Attracted);
        // Attraction alone does not claim the slot
        assert!(rig.arbitrator.is_available(TOY));

        rig.run_until(&mut brain, &mut pos, &mut needs, Activity::Traveling, 4.0);
        assert_eq!(rig.arbitrator.occupant(TOY), Some(AgentId(1)));
        assert_eq!(brain.held_slot(), Some(TOY));

        rig.run_until(&mut brain, &mut pos, &mut needs, Activity::Interacting, 5.0);
        assert!(pos.distance(&Vec2::new(6.0, 5.0)) <= 0.5);

        let mut ended = None;
        for _ in 0..50 {
            if let Some(event) = rig.tick(&mut brain, &mut pos, &mut needs, 0.1) {
                ended = Some(event);
                break;
            }
        }
        assert_eq!(ended, Some(BrainEvent::InteractionEnded(TOY)));
        assert_eq!(brain.activity(), Activity::Cooldown);
        assert!(rig.arbitrator.is_available(TOY));

        rig.run_until(&mut brain, &mut pos, &mut needs, Activity::Idle, 3.5);
        let cues = rig.cues.drain();
        assert!(cues.contains(&Cue::StartInteracting { agent: AgentId(1), target: TOY }));
        assert!(cues.contains(&Cue::EndInteracting { agent: AgentId(1), target: TOY }));
    }

    #[test]
    fn loser_of_race_returns_to_idle() {
        let mut rig = Rig::new(eager_config());
        rig.add(1, InteractableKind::CatTeaser, Vec2::new(6.0, 6.0));
        let mut a = PetBrain::new(AgentId(1), &rig.config);
        let mut b = PetBrain::new(AgentId(2), &rig.config);
        let (mut pa, mut pb) = (Vec2::new(4.0, 6.0), Vec2::new(8.0, 6.0));
        let (mut na, mut nb) = (PetNeeds::default(), PetNeeds::default());

        for _ in 0..30 {
            rig.tick(&mut a, &mut pa, &mut na, 0.1);
            rig.tick(&mut b, &mut pb, &mut nb, 0.1);
            if a.activity() != Activity::Attracted {
                break;
            }
        }
        assert_eq!(a.activity(), Activity::Traveling);
        assert_ne!(b.activity(), Activity::Traveling);
        assert_eq!(rig.arbitrator.occupant(TOY), Some(AgentId(1)));
        assert_eq!(b.held_slot(), None);
    }

    #[test]
    fn destroyed_toy_mid_interaction_frees_slot() {
        let mut rig = Rig::new(eager_config());
        rig.add(1, InteractableKind::ToyMouse, Vec2::new(5.0, 5.0));
        let mut brain = PetBrain::new(AgentId(1), &rig.config);
        let mut pos = Vec2::new(4.0, 5.0);
        let mut needs = PetNeeds::default();

        rig.run_until(&mut brain, &mut pos, &mut needs, Activity::Interacting, 6.0);
        rig.remove(TOY);
        let event = rig.tick(&mut brain, &mut pos, &mut needs, 0.1);

        assert_eq!(event, Some(BrainEvent::InteractionEnded(TOY)));
        assert_eq!(brain.activity(), Activity::Idle);
        assert!(rig.arbitrator.is_available(TOY));
        assert_eq!(rig.arbitrator.holding(AgentId(1)), None);
    }

    #[test]
    fn interrupt_while_traveling_releases() {
        let mut rig = Rig::new(eager_config());
        rig.add(1, InteractableKind::ToyMouse, Vec2::new(10.0, 10.0));
        let mut brain = PetBrain::new(AgentId(1), &rig.config);
        let mut pos = Vec2::new(7.0, 7.0);
        let mut needs = PetNeeds::default();

        rig.run_until(&mut brain, &mut pos, &mut needs, Activity::Traveling, 4.0);
        let mut ctx = rig.context();
        assert_eq!(brain.interrupt(&mut ctx), None);
        assert_eq!(brain.activity(), Activity::Idle);
        assert!(!brain.navigation().is_active());
        assert!(rig.arbitrator.is_available(TOY));
        // Second interrupt finds nothing to clean up
        let mut ctx = rig.context();
        assert_eq!(brain.interrupt(&mut ctx), None);
    }

    #[test]
    fn boredom_suppresses_detection_until_recovery() {
        let mut config = eager_config();
        config.behavior.boredom_chance = 1.0;
        config.behavior.boredom_recovery = 5.0;
        config.behavior.cooldown_duration = 0.0;
        let mut rig = Rig::new(config);
        rig.add(1, InteractableKind::CatTeaser, Vec2::new(5.0, 5.0));
        let mut brain = PetBrain::new(AgentId(1), &rig.config);
        let mut pos = Vec2::new(4.0, 5.0);
        let mut needs = PetNeeds::default();

        rig.run_until(&mut brain, &mut pos, &mut needs, Activity::Interacting, 6.0);
        let start = rig.now;
        while brain.activity() == Activity::Interacting {
            rig.tick(&mut brain, &mut pos, &mut needs, 0.1);
        }
        assert!(brain.is_bored());
        assert!(rig.cues.iter().any(|c| matches!(c, Cue::BecameBored { .. })));

        // Bored: stays idle with a toy in reach
        for _ in 0..30 {
            rig.tick(&mut brain, &mut pos, &mut needs, 0.1);
            assert_eq!(brain.activity(), Activity::Idle);
        }
        rig.run_until(&mut brain, &mut pos, &mut needs, Activity::Attracted, 6.0);
        assert!(!brain.is_bored());
        assert!(rig.now - start >= 5.0);
    }

    #[test]
    fn tired_pet_sleeps_until_rested() {
        let mut config = eager_config();
        config.needs.wake_threshold = 20.0;
        let mut rig = Rig::new(config);
        rig.add(3, InteractableKind::Bed, Vec2::new(8.0, 8.0));
        let mut brain = PetBrain::new(AgentId(1), &rig.config);
        let mut pos = Vec2::new(3.0, 3.0);
        let mut needs = PetNeeds::new(4.0, 100.0);

        rig.tick(&mut brain, &mut pos, &mut needs, 0.1);
        assert_eq!(brain.activity(), Activity::Traveling);
        assert_eq!(rig.arbitrator.occupant(InteractableId(3)), Some(AgentId(1)));

        rig.run_until(&mut brain, &mut pos, &mut needs, Activity::Sleeping, 10.0);
        rig.run_until(&mut brain, &mut pos, &mut needs, Activity::Idle, 15.0);
        assert!(needs.energy >= 20.0);
        assert!(rig.arbitrator.is_available(InteractableId(3)));
        assert!(rig.cues.iter().any(|c| matches!(c, Cue::WakeUp { .. })));
    }

    #[test]
    fn hungry_pet_eats_and_consumes_food() {
        let mut rig = Rig::new(eager_config());
        rig.add(4, InteractableKind::Food, Vec2::new(5.0, 3.0));
        let mut brain = PetBrain::new(AgentId(1), &rig.config);
        let mut pos = Vec2::new(3.0, 3.0);
        let mut needs = PetNeeds::new(100.0, 2.0);

        rig.run_until(&mut brain, &mut pos, &mut needs, Activity::Eating, 5.0);
        let mut consumed = None;
        for _ in 0..40 {
            if let Some(event) = rig.tick(&mut brain, &mut pos, &mut needs, 0.1) {
                consumed = Some(event);
                break;
            }
        }
        assert_eq!(consumed, Some(BrainEvent::Consumed(InteractableId(4))));
        assert!(needs.satiety > 30.0);
        assert_eq!(brain.activity(), Activity::Idle);
        assert!(rig.arbitrator.is_available(InteractableId(4)));
    }

    #[test]
    fn wandering_moves_the_pet() {
        let mut config = SimConfig::default();
        config.wander.pause = 0.2;
        let mut rig = Rig::new(config);
        let mut brain = PetBrain::new(AgentId(1), &rig.config);
        let start = Vec2::new(6.0, 6.0);
        let mut pos = start;
        let mut needs = PetNeeds::default();

        let mut farthest: f32 = 0.0;
        for _ in 0..20 {
            rig.tick(&mut brain, &mut pos, &mut needs, 0.1);
            assert_eq!(brain.activity(), Activity::Idle);
            farthest = farthest.max(pos.distance(&start));
        }
        assert!(farthest > 1.0);
    }

    #[test]
    fn every_activity_sets_exactly_one_flag() {
        for activity in [
            Activity::Idle,
            Activity::Sleeping,
            Activity::Eating,
            Activity::Attracted,
            Activity::Traveling,
            Activity::Interacting,
            Activity::Cooldown,
        ] {
            assert_eq!(ActivityFlags::from(activity).count_set(), 1, "{activity:?}");
        }
    }

    #[test]
    fn lease_releases_once() {
        let mut arbitrator = Arbitrator::new();
        arbitrator.register(TOY);
        let mut lease = SlotLease::acquire(&mut arbitrator, TOY, AgentId(1)).unwrap();
        assert!(SlotLease::acquire(&mut arbitrator, TOY, AgentId(2)).is_none());

        assert!(lease.release(&mut arbitrator));
        assert!(arbitrator.try_enter(TOY, AgentId(2)));
        // A stale second release must not evict the new occupant
        assert!(!lease.release(&mut arbitrator));
        assert_eq!(arbitrator.occupant(TOY), Some(AgentId(2)));
    }

    #[test]
    fn restored_brain_is_idle_and_keeps_boredom() {
        let config = SimConfig::default();
        let brain = PetBrain::restore(AgentId(9), &config, Some(12.5));
        assert_eq!(brain.activity(), Activity::Idle);
        assert_eq!(brain.bored_since(), Some(12.5));
    }
}
