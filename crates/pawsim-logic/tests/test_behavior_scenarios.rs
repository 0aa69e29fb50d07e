//! Multi-pet behavior scenarios over the grid surface.
//!
//! Pure logic: a hand-rolled room stands in for the ECS engine.

use pawsim_logic::arbitration::Arbitrator;
use pawsim_logic::behavior::{Activity, BrainContext, BrainEvent, PetBrain};
use pawsim_logic::config::SimConfig;
use pawsim_logic::cues::{Cue, CueLog};
use pawsim_logic::decision::DecisionNode;
use pawsim_logic::geometry::{Rect, Vec2};
use pawsim_logic::grid::GridSurface;
use pawsim_logic::needs::PetNeeds;
use pawsim_logic::world::{InteractableKind, InteractableSnapshot, SceneSnapshot};
use pawsim_logic::{AgentId, InteractableId};
use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;

// ── Helpers ────────────────────────────────────────────────────────────

struct Pet {
    brain: PetBrain,
    position: Vec2,
    needs: PetNeeds,
}

struct Room {
    arbitrator: Arbitrator,
    surface: GridSurface,
    scene: SceneSnapshot,
    cues: CueLog,
    rng: StdRng,
    config: SimConfig,
    tree: DecisionNode,
    pets: Vec<Pet>,
    now: f64,
    next_id: u32,
}

impl Room {
    fn new(config: SimConfig, seed: u64) -> Self {
        let bounds = Rect::new(Vec2::ZERO, Vec2::new(12.0, 12.0));
        Self {
            arbitrator: Arbitrator::new(),
            surface: GridSurface::with_bounds(bounds, 0.25, 0.1, 1).unwrap(),
            scene: SceneSnapshot::new(),
            cues: CueLog::new(),
            rng: StdRng::seed_from_u64(seed),
            config,
            tree: DecisionNode::idle_tree(),
            pets: Vec::new(),
            now: 0.0,
            next_id: 1,
        }
    }

    fn add_pet(&mut self, at: Vec2) -> usize {
        let id = AgentId(self.pets.len() as u32 + 1);
        self.pets.push(Pet {
            brain: PetBrain::new(id, &self.config),
            position: at,
            needs: PetNeeds::default(),
        });
        self.pets.len() - 1
    }

    fn add_item(&mut self, kind: InteractableKind, at: Vec2) -> InteractableId {
        let id = InteractableId(self.next_id);
        self.next_id += 1;
        self.scene.upsert(InteractableSnapshot {
            id,
            kind,
            anchor: at,
            meal: None,
        });
        self.arbitrator.register(id);
        id
    }

    fn destroy(&mut self, id: InteractableId) {
        self.scene.remove(id);
        self.arbitrator.despawn(id);
    }

    fn tick(&mut self, dt: f32) -> Vec<BrainEvent> {
        let mut events = Vec::new();
        for pet in &mut self.pets {
            let sleeping = pet.brain.activity() == Activity::Sleeping;
            pet.needs.tick(&self.config.needs, sleeping, dt);
            let mut ctx = BrainContext {
                arbitrator: &mut self.arbitrator,
                surface: &mut self.surface,
                world: &self.scene,
                cues: &mut self.cues,
                rng: &mut self.rng,
                config: &self.config,
                tree: &self.tree,
                now: self.now,
            };
            if let Some(event) = pet.brain.tick(&mut pet.position, &mut pet.needs, &mut ctx, dt) {
                events.push(event);
            }
        }
        self.now += dt as f64;
        events
    }

    fn interrupt(&mut self, index: usize) {
        let pet = &mut self.pets[index];
        let mut ctx = BrainContext {
            arbitrator: &mut self.arbitrator,
            surface: &mut self.surface,
            world: &self.scene,
            cues: &mut self.cues,
            rng: &mut self.rng,
            config: &self.config,
            tree: &self.tree,
            now: self.now,
        };
        pet.brain.interrupt(&mut ctx);
    }

    fn activity(&self, index: usize) -> Activity {
        self.pets[index].brain.activity()
    }

    fn run_until(&mut self, index: usize, activity: Activity, limit: f32) {
        let mut elapsed = 0.0;
        while self.activity(index) != activity {
            assert!(elapsed < limit, "pet {index} stuck in {:?}", self.activity(index));
            self.tick(0.1);
            elapsed += 0.1;
        }
    }
}

fn eager_config() -> SimConfig {
    let mut config = SimConfig::default();
    config.detection.attraction_chance = 1.0;
    config.detection.check_interval = 0.5;
    config.wander.enabled = false;
    config
}

// ── Destroyed mid-interaction ──────────────────────────────────────────

#[test]
fn interactable_destroyed_mid_interaction_leaves_no_lock() {
    let mut room = Room::new(eager_config(), 1);
    let a = room.add_pet(Vec2::new(2.0, 2.0));
    let toy = room.add_item(InteractableKind::ToyMouse, Vec2::new(4.0, 3.0));

    room.run_until(a, Activity::Attracted, 1.0);
    assert!(room.arbitrator.is_available(toy));
    room.run_until(a, Activity::Traveling, 3.0);
    assert_eq!(room.arbitrator.occupant(toy), Some(AgentId(1)));
    room.run_until(a, Activity::Interacting, 5.0);

    room.tick(1.0);
    room.destroy(toy);
    let events = room.tick(0.1);

    assert_eq!(events, vec![BrainEvent::InteractionEnded(toy)]);
    assert_eq!(room.activity(a), Activity::Idle);
    assert!(room.arbitrator.is_available(toy));
    assert_eq!(room.arbitrator.holding(AgentId(1)), None);
    assert_eq!(room.pets[a].brain.held_slot(), None);
    assert_eq!(room.arbitrator.occupied_count(), 0);
}

#[test]
fn destroyed_while_traveling_returns_to_idle() {
    let mut room = Room::new(eager_config(), 2);
    let a = room.add_pet(Vec2::new(1.0, 1.0));
    let toy = room.add_item(InteractableKind::CatTeaser, Vec2::new(4.5, 4.0));

    room.run_until(a, Activity::Traveling, 4.0);
    room.destroy(toy);
    room.tick(0.1);

    assert_eq!(room.activity(a), Activity::Idle);
    assert_eq!(room.pets[a].brain.held_slot(), None);
    assert!(room.cues.iter().any(|c| *c == Cue::Confused { agent: AgentId(1) }));
}

// ── Contention ─────────────────────────────────────────────────────────

#[test]
fn many_pets_one_toy() {
    let mut room = Room::new(eager_config(), 3);
    for i in 0..6 {
        room.add_pet(Vec2::new(3.0 + i as f32, 3.0));
    }
    let toy = room.add_item(InteractableKind::CatTeaser, Vec2::new(5.5, 5.0));

    let mut players = 0;
    for _ in 0..200 {
        room.tick(0.1);
        let engaged = (0..6)
            .filter(|i| {
                matches!(
                    room.activity(*i),
                    Activity::Traveling | Activity::Interacting
                )
            })
            .count();
        assert!(engaged <= 1, "{engaged} pets engaged with one toy");
        players = players.max(engaged);
        if let Some(holder) = room.arbitrator.occupant(toy) {
            assert_eq!(room.pets[holder.0 as usize - 1].brain.held_slot(), Some(toy));
        }
    }
    assert_eq!(players, 1);
}

#[test]
fn interrupt_is_idempotent() {
    let mut room = Room::new(eager_config(), 4);
    let a = room.add_pet(Vec2::new(2.0, 2.0));
    let toy = room.add_item(InteractableKind::CatTeaser, Vec2::new(3.0, 2.0));

    room.run_until(a, Activity::Interacting, 5.0);
    room.interrupt(a);
    room.interrupt(a);

    assert_eq!(room.activity(a), Activity::Idle);
    assert!(room.arbitrator.is_available(toy));
    let ends = room
        .cues
        .iter()
        .filter(|c| matches!(c, Cue::EndInteracting { .. }))
        .count();
    assert_eq!(ends, 1);
}

// ── Random schedules ───────────────────────────────────────────────────

#[derive(Debug, Clone)]
enum Step {
    Tick(u8),
    Interrupt(usize),
    DestroyOldest,
    Spawn(u8, u8),
}

fn step() -> impl Strategy<Value = Step> {
    prop_oneof![
        6 => (1u8..6).prop_map(Step::Tick),
        1 => (0usize..3).prop_map(Step::Interrupt),
        1 => Just(Step::DestroyOldest),
        1 => (1u8..11, 1u8..11).prop_map(|(x, y)| Step::Spawn(x, y)),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn flags_and_slots_stay_consistent(seed in 0u64..1000, steps in prop::collection::vec(step(), 1..150)) {
        let mut room = Room::new(eager_config(), seed);
        room.add_pet(Vec2::new(2.0, 2.0));
        room.add_pet(Vec2::new(6.0, 6.0));
        room.add_pet(Vec2::new(9.0, 3.0));
        let mut live = vec![room.add_item(InteractableKind::ToyMouse, Vec2::new(4.0, 4.0))];

        for step in steps {
            match step {
                Step::Tick(tenths) => {
                    room.tick(tenths as f32 / 10.0);
                    // After a tick every pet agrees with the arbitrator
                    for pet in &room.pets {
                        let agent = pet.brain.agent();
                        prop_assert_eq!(pet.brain.held_slot(), room.arbitrator.holding(agent));
                    }
                }
                Step::Interrupt(i) => {
                    room.interrupt(i);
                    prop_assert_eq!(room.arbitrator.holding(room.pets[i].brain.agent()), None);
                }
                Step::DestroyOldest => {
                    if !live.is_empty() {
                        let id = live.remove(0);
                        room.destroy(id);
                        prop_assert!(room.arbitrator.is_available(id));
                    }
                }
                Step::Spawn(x, y) => {
                    live.push(room.add_item(InteractableKind::CatTeaser, Vec2::new(x as f32, y as f32)));
                }
            }

            for pet in &room.pets {
                prop_assert_eq!(pet.brain.flags().count_set(), 1);
                // The arbitrator never holds a slot the pet does not know about
                if let Some(id) = room.arbitrator.holding(pet.brain.agent()) {
                    prop_assert_eq!(pet.brain.held_slot(), Some(id));
                }
            }
        }
    }
}
