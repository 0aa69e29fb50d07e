//! Simulation engine - owns the world and runs all systems

use std::collections::HashMap;

use hecs::{Entity, EntityBuilder, World};
use log::{debug, info, warn};
use pawsim_logic::arbitration::Arbitrator;
use pawsim_logic::behavior::{Activity, BrainContext, BrainEvent, PetBrain};
use pawsim_logic::config::SimConfig;
use pawsim_logic::cues::{Cue, CueLog};
use pawsim_logic::decision::DecisionNode;
use pawsim_logic::error::BuildError;
use pawsim_logic::grid::GridSurface;
use pawsim_logic::needs::{Meal, PetNeeds};
use pawsim_logic::rebake::{RebakeScheduler, RebakeTarget};
use pawsim_logic::surface::{Collider, Footprint, NavSurface, ObstacleShape, RebuildableSurface};
use pawsim_logic::world::{InteractableKind, SceneSnapshot};
use pawsim_logic::{AgentId, InteractableId};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::components::*;
use crate::records::PetRecord;
use crate::systems;

/// Needs drift slowly, no point ticking them every frame.
const NEEDS_INTERVAL: f64 = 0.1;

/// How far a restored pet may be moved to land on the walkable surface.
const RESTORE_SNAP_RADIUS: f32 = 2.0;

/// The main simulation engine
pub struct PetSimulation {
    /// ECS world containing all entities
    pub world: World,
    /// Simulation time in seconds
    pub sim_time: f64,
    /// Time scale (1.0 = real-time, 10.0 = 10x speed)
    pub time_scale: f32,
    config: SimConfig,
    surface: GridSurface,
    arbitrator: Arbitrator,
    rebake: RebakeScheduler,
    scene: SceneSnapshot,
    cues: CueLog,
    tree: DecisionNode,
    rng: StdRng,
    /// Pets in spawn order; earlier pets win same-tick contention.
    pets: Vec<Entity>,
    interactables: HashMap<InteractableId, Entity>,
    next_agent: u32,
    next_interactable: u32,
    last_needs_update: f64,
}

/// Rebake callbacks over the engine's world and surface.
struct SurfaceUpkeep<'a> {
    world: &'a mut World,
    surface: &'a mut GridSurface,
    pets: &'a [Entity],
}

impl RebakeTarget for SurfaceUpkeep<'_> {
    fn prepare_obstacles(&mut self) -> usize {
        systems::prepare_obstacles_system(self.world)
    }

    fn rebuild_surface(&mut self) -> Result<(), BuildError> {
        let carved = systems::carved_rects(self.world);
        self.surface.rebuild(&carved)
    }

    fn surface_rebuilt(&mut self) {
        systems::surface_rebuilt_system(self.world, self.pets, self.surface);
    }
}

impl PetSimulation {
    /// Create an empty room. Fails if the configured surface is unusable.
    pub fn new(config: SimConfig) -> Result<Self, BuildError> {
        let surface = GridSurface::new(&config.surface)?;
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        info!(
            "pet simulation ready: {}x{} room, {:.2} cells",
            config.surface.width, config.surface.depth, config.surface.cell_size
        );
        Ok(Self {
            world: World::new(),
            sim_time: 0.0,
            time_scale: 1.0,
            rebake: RebakeScheduler::new(config.rebake.clone()),
            config,
            surface,
            arbitrator: Arbitrator::new(),
            scene: SceneSnapshot::new(),
            cues: CueLog::new(),
            tree: DecisionNode::idle_tree(),
            rng,
            pets: Vec::new(),
            interactables: HashMap::new(),
            next_agent: 1,
            next_interactable: 1,
            last_needs_update: 0.0,
        })
    }

    /// Replace the idle decision tree.
    pub fn with_tree(mut self, tree: DecisionNode) -> Self {
        self.tree = tree;
        self
    }

    /// Update the simulation by delta_seconds (real time)
    pub fn update(&mut self, delta_seconds: f32) {
        let dt = delta_seconds * self.time_scale;
        if dt <= 0.0 {
            return;
        }
        self.sim_time += dt as f64;

        // Surface first, so pets never plan against a layout that is
        // about to be replaced this tick
        let mut upkeep = SurfaceUpkeep {
            world: &mut self.world,
            surface: &mut self.surface,
            pets: &self.pets,
        };
        self.rebake.tick(dt, &mut upkeep);

        for id in systems::lifetime_system(&mut self.world, &self.arbitrator, dt) {
            self.remove_interactable(id);
        }
        systems::roaming_system(
            &mut self.world,
            &self.surface,
            &self.arbitrator,
            &mut self.rng,
            dt,
        );

        if self.sim_time - self.last_needs_update >= NEEDS_INTERVAL {
            let elapsed = (self.sim_time - self.last_needs_update) as f32;
            systems::needs_system(&mut self.world, &self.config.needs, elapsed);
            self.last_needs_update = self.sim_time;
        }

        systems::scene_snapshot_system(&self.world, &mut self.scene);
        let events = {
            let mut ctx = BrainContext {
                arbitrator: &mut self.arbitrator,
                surface: &mut self.surface,
                world: &self.scene,
                cues: &mut self.cues,
                rng: &mut self.rng,
                config: &self.config,
                tree: &self.tree,
                now: self.sim_time,
            };
            systems::behavior_system(&mut self.world, &self.pets, &mut ctx, dt)
        };
        for event in events {
            self.handle_event(event);
        }
    }

    /// Set time scale (1.0 = real-time)
    pub fn set_time_scale(&mut self, scale: f32) {
        self.time_scale = scale.clamp(0.0, 100.0);
    }

    // --- Pets ---

    pub fn spawn_pet(&mut self, name: &str, position: Vec2) -> AgentId {
        let id = AgentId(self.next_agent);
        self.next_agent += 1;
        let brain = PetBrain::new(id, &self.config);
        self.insert_pet(id, name, position, PetNeeds::default(), brain);
        id
    }

    /// Remove a pet, ending whatever it was doing first.
    pub fn remove_pet(&mut self, agent: AgentId) -> bool {
        let Some(entity) = self.find_pet(agent) else {
            return false;
        };
        if let Some(event) = self.interrupt_entity(entity) {
            self.handle_event(event);
        }
        self.arbitrator.release_agent(agent);
        self.pets.retain(|e| *e != entity);
        if let Err(err) = self.world.despawn(entity) {
            debug!("{} had no entity to despawn: {}", agent, err);
        }
        debug!("{} left the room", agent);
        true
    }

    /// Cut the pet's current activity short and return it to idle.
    pub fn interrupt_pet(&mut self, agent: AgentId) -> bool {
        let Some(entity) = self.find_pet(agent) else {
            return false;
        };
        if let Some(event) = self.interrupt_entity(entity) {
            self.handle_event(event);
        }
        true
    }

    pub fn find_pet(&self, agent: AgentId) -> Option<Entity> {
        self.pets.iter().copied().find(|entity| {
            self.world
                .get::<&Pet>(*entity)
                .map(|pet| pet.id == agent)
                .unwrap_or(false)
        })
    }

    /// Pet ids in spawn order
    pub fn pet_ids(&self) -> Vec<AgentId> {
        self.pets
            .iter()
            .filter_map(|e| self.world.get::<&Pet>(*e).ok().map(|pet| pet.id))
            .collect()
    }

    pub fn activity(&self, agent: AgentId) -> Option<Activity> {
        let entity = self.find_pet(agent)?;
        let brain = self.world.get::<&PetBrain>(entity).ok()?;
        Some(brain.activity())
    }

    pub fn pet_position(&self, agent: AgentId) -> Option<Vec2> {
        let entity = self.find_pet(agent)?;
        let pos = self.world.get::<&Position>(entity).ok()?;
        Some(pos.0)
    }

    pub fn needs(&self, agent: AgentId) -> Option<PetNeeds> {
        let entity = self.find_pet(agent)?;
        let needs = self.world.get::<&PetNeeds>(entity).ok()?;
        Some(*needs)
    }

    pub fn set_needs(&mut self, agent: AgentId, needs: PetNeeds) -> bool {
        let Some(entity) = self.find_pet(agent) else {
            return false;
        };
        match self.world.get::<&mut PetNeeds>(entity) {
            Ok(mut current) => {
                *current = needs;
                true
            }
            Err(_) => false,
        }
    }

    /// Slot the pet currently holds, as the pet sees it.
    pub fn held_slot(&self, agent: AgentId) -> Option<InteractableId> {
        let entity = self.find_pet(agent)?;
        let brain = self.world.get::<&PetBrain>(entity).ok()?;
        brain.held_slot()
    }

    pub fn is_bored(&self, agent: AgentId) -> bool {
        self.find_pet(agent)
            .and_then(|e| self.world.get::<&PetBrain>(e).ok().map(|b| b.is_bored()))
            .unwrap_or(false)
    }

    // --- Interactables and furniture ---

    /// Put a toy, bed or food bowl into the room.
    ///
    /// Toy mice wander on their own and vanish after ten unclaimed seconds.
    /// Beds are walkable obstacles, so placing one schedules a rebake. Food
    /// starts with a default meal.
    pub fn spawn_interactable(&mut self, kind: InteractableKind, position: Vec2) -> InteractableId {
        let meal = (kind == InteractableKind::Food).then(Meal::default);
        self.insert_interactable(kind, position, meal)
    }

    pub fn spawn_food(&mut self, position: Vec2, meal: Meal) -> InteractableId {
        self.insert_interactable(InteractableKind::Food, position, Some(meal))
    }

    /// Remove an interactable. Any pet using it notices on its next tick.
    pub fn remove_interactable(&mut self, id: InteractableId) -> bool {
        let Some(entity) = self.interactables.remove(&id) else {
            return false;
        };
        let had_obstacle = self.world.get::<&Obstacle>(entity).is_ok();
        if let Err(err) = self.world.despawn(entity) {
            debug!("{} was already gone from the world: {}", id, err);
        }
        if let Some(agent) = self.arbitrator.despawn(id) {
            debug!("{} removed while {} was using it", id, agent);
        }
        self.scene.remove(id);
        if had_obstacle {
            self.rebake.request_rebake();
        }
        true
    }

    pub fn set_interactable_enabled(&mut self, id: InteractableId, enabled: bool) -> bool {
        if !self.interactables.contains_key(&id) {
            return false;
        }
        self.arbitrator.set_enabled(id, enabled);
        true
    }

    pub fn interactable_position(&self, id: InteractableId) -> Option<Vec2> {
        let entity = self.interactables.get(&id)?;
        let pos = self.world.get::<&Position>(*entity).ok()?;
        Some(pos.0)
    }

    pub fn contains_interactable(&self, id: InteractableId) -> bool {
        self.interactables.contains_key(&id)
    }

    /// Place plain furniture (sofa, shelf...). Schedules a rebake.
    pub fn place_furniture(
        &mut self,
        name: &str,
        position: Vec2,
        collider: Collider,
        bounds: Option<Footprint>,
    ) -> Entity {
        let entity = self.world.spawn((
            Name(name.to_string()),
            Position(position),
            Obstacle(ObstacleShape::new(collider, bounds)),
        ));
        debug!("placed {} at ({:.1}, {:.1})", name, position.x, position.y);
        self.rebake.request_rebake();
        entity
    }

    /// Move any placed object. Obstacles schedule a rebake.
    pub fn move_object(&mut self, entity: Entity, position: Vec2) -> bool {
        let moved = match self.world.get::<&mut Position>(entity) {
            Ok(mut pos) => {
                pos.0 = position;
                true
            }
            Err(_) => false,
        };
        if moved && self.world.get::<&Obstacle>(entity).is_ok() {
            self.rebake.request_rebake();
        }
        moved
    }

    /// Remove plain furniture. Interactables go through
    /// [`remove_interactable`](Self::remove_interactable).
    pub fn remove_furniture(&mut self, entity: Entity) -> bool {
        if let Ok(item) = self.world.get::<&Interactable>(entity).map(|i| *i) {
            return self.remove_interactable(item.id);
        }
        if self.pets.contains(&entity) {
            warn!("remove_furniture called on a pet, ignoring");
            return false;
        }
        let had_obstacle = self.world.get::<&Obstacle>(entity).is_ok();
        if self.world.despawn(entity).is_err() {
            return false;
        }
        if had_obstacle {
            self.rebake.request_rebake();
        }
        true
    }

    pub fn interactable_entity(&self, id: InteractableId) -> Option<Entity> {
        self.interactables.get(&id).copied()
    }

    // --- Surface ---

    /// Mark the walkable surface dirty.
    pub fn request_rebake(&mut self) {
        self.rebake.request_rebake();
    }

    /// Rebuild right away instead of waiting out the debounce window.
    pub fn build_surface_now(&mut self) -> bool {
        let mut upkeep = SurfaceUpkeep {
            world: &mut self.world,
            surface: &mut self.surface,
            pets: &self.pets,
        };
        self.rebake.build_now(&mut upkeep)
    }

    pub fn surface(&self) -> &GridSurface {
        &self.surface
    }

    /// Make the next `count` surface rebuilds fail.
    pub fn inject_build_failures(&mut self, count: u32) {
        self.surface.inject_build_failures(count);
    }

    pub fn rebake(&self) -> &RebakeScheduler {
        &self.rebake
    }

    pub fn is_walkable(&self, position: Vec2) -> bool {
        self.surface.is_on_surface(position) && !self.surface.is_blocked(position)
    }

    // --- Cues and inspection ---

    pub fn drain_cues(&mut self) -> Vec<Cue> {
        self.cues.drain()
    }

    pub fn arbitrator(&self) -> &Arbitrator {
        &self.arbitrator
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn pet_count(&self) -> usize {
        self.pets.len()
    }

    pub fn interactable_count(&self) -> usize {
        self.interactables.len()
    }

    pub fn furniture_count(&self) -> usize {
        self.world
            .query::<&Obstacle>()
            .without::<&Interactable>()
            .iter()
            .count()
    }

    // --- Records ---

    pub fn pet_records(&self) -> Vec<PetRecord> {
        let mut records = Vec::with_capacity(self.pets.len());
        for &entity in &self.pets {
            let Ok(mut query) = self
                .world
                .query_one::<(&Pet, &Name, &Position, &PetNeeds, &PetBrain)>(entity)
            else {
                continue;
            };
            if let Some((pet, name, pos, needs, brain)) = query.get() {
                records.push(PetRecord {
                    id: pet.id,
                    name: name.0.clone(),
                    position: pos.0,
                    activity: brain.activity(),
                    needs: *needs,
                    bored_for: brain.bored_since().map(|since| self.sim_time - since),
                });
            }
        }
        records
    }

    /// Bring a pet back from a record. An existing pet with the same id is
    /// reset in place; otherwise a new pet is spawned. The pet starts idle.
    pub fn restore_pet(&mut self, record: &PetRecord) -> AgentId {
        let bored_since = record.bored_for.map(|secs| self.sim_time - secs);
        let brain = PetBrain::restore(record.id, &self.config, bored_since);
        let position = if self.surface.is_on_surface(record.position) {
            record.position
        } else {
            match self.surface.sample_position(record.position, RESTORE_SNAP_RADIUS) {
                Some(snapped) => snapped,
                None => {
                    warn!("{} restored off the walkable surface", record.id);
                    record.position
                }
            }
        };

        if let Some(entity) = self.find_pet(record.id) {
            if let Some(event) = self.interrupt_entity(entity) {
                self.handle_event(event);
            }
            if let Ok((name, pos, needs, current)) = self
                .world
                .query_one_mut::<(&mut Name, &mut Position, &mut PetNeeds, &mut PetBrain)>(entity)
            {
                name.0 = record.name.clone();
                pos.0 = position;
                *needs = record.needs;
                *current = brain;
            }
        } else {
            self.next_agent = self.next_agent.max(record.id.0 + 1);
            self.insert_pet(record.id, &record.name, position, record.needs, brain);
        }
        record.id
    }

    // --- Internals ---

    fn insert_pet(
        &mut self,
        id: AgentId,
        name: &str,
        position: Vec2,
        needs: PetNeeds,
        brain: PetBrain,
    ) -> Entity {
        let entity = self.world.spawn((
            Pet { id },
            Name(name.to_string()),
            Position(position),
            needs,
            brain,
        ));
        self.pets.push(entity);
        debug!("{} ({}) joined at ({:.1}, {:.1})", id, name, position.x, position.y);
        entity
    }

    fn insert_interactable(
        &mut self,
        kind: InteractableKind,
        position: Vec2,
        meal: Option<Meal>,
    ) -> InteractableId {
        let id = InteractableId(self.next_interactable);
        self.next_interactable += 1;

        let mut builder = EntityBuilder::new();
        builder.add(Interactable { id, kind }).add(Position(position));
        match kind {
            InteractableKind::ToyMouse => {
                builder
                    .add(Lifetime::new(Lifetime::TOY_MOUSE))
                    .add(Roaming::default());
            }
            InteractableKind::Bed => {
                let shape = ObstacleShape::new(Collider::Trigger, Some(Footprint::new(1.2, 1.0)));
                builder.add(Obstacle(shape));
                self.rebake.request_rebake();
            }
            InteractableKind::Food | InteractableKind::CatTeaser => {}
        }
        if let Some(meal) = meal {
            builder.add(Food(meal));
        }
        let entity = self.world.spawn(builder.build());

        self.arbitrator.register(id);
        self.interactables.insert(id, entity);
        debug!("{} ({:?}) placed at ({:.1}, {:.1})", id, kind, position.x, position.y);
        id
    }

    fn interrupt_entity(&mut self, entity: Entity) -> Option<BrainEvent> {
        let brain = self.world.query_one_mut::<&mut PetBrain>(entity).ok()?;
        let mut ctx = BrainContext {
            arbitrator: &mut self.arbitrator,
            surface: &mut self.surface,
            world: &self.scene,
            cues: &mut self.cues,
            rng: &mut self.rng,
            config: &self.config,
            tree: &self.tree,
            now: self.sim_time,
        };
        brain.interrupt(&mut ctx)
    }

    fn handle_event(&mut self, event: BrainEvent) {
        match event {
            BrainEvent::InteractionEnded(id) => {
                let kind = self
                    .interactables
                    .get(&id)
                    .and_then(|e| self.world.get::<&Interactable>(*e).ok().map(|i| i.kind));
                // Mice are single-use
                if kind == Some(InteractableKind::ToyMouse) {
                    self.remove_interactable(id);
                }
            }
            BrainEvent::Consumed(id) => {
                self.remove_interactable(id);
            }
        }
    }
}
