//! Behavior system - runs every pet's state machine in spawn order

use hecs::{Entity, World};
use pawsim_logic::behavior::{BrainContext, BrainEvent, PetBrain};
use pawsim_logic::needs::PetNeeds;
use pawsim_logic::world::{InteractableSnapshot, SceneSnapshot};

use crate::components::{Food, Interactable, Position};

/// Rebuild the read-only scene pets query during this tick.
pub fn scene_snapshot_system(world: &World, scene: &mut SceneSnapshot) {
    scene.clear();
    for (_, (item, pos, food)) in world
        .query::<(&Interactable, &Position, Option<&Food>)>()
        .iter()
    {
        scene.upsert(InteractableSnapshot {
            id: item.id,
            kind: item.kind,
            anchor: pos.0,
            meal: food.map(|f| f.0),
        });
    }
}

/// Tick each pet once. Pets act in the order given, so the first pet in
/// `pets` wins any slot contested within the same tick.
pub fn behavior_system(
    world: &mut World,
    pets: &[Entity],
    ctx: &mut BrainContext<'_>,
    delta_seconds: f32,
) -> Vec<BrainEvent> {
    let mut events = Vec::new();
    for &entity in pets {
        let Ok((pos, needs, brain)) =
            world.query_one_mut::<(&mut Position, &mut PetNeeds, &mut PetBrain)>(entity)
        else {
            continue;
        };
        if let Some(event) = brain.tick(&mut pos.0, needs, ctx, delta_seconds) {
            events.push(event);
        }
    }
    events
}
