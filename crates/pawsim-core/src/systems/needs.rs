//! Needs system - drains energy and satiety, restores energy while asleep

use hecs::World;
use pawsim_logic::behavior::{Activity, PetBrain};
use pawsim_logic::config::NeedsConfig;
use pawsim_logic::needs::PetNeeds;

pub fn needs_system(world: &mut World, config: &NeedsConfig, delta_seconds: f32) {
    for (_, (needs, brain)) in world.query_mut::<(&mut PetNeeds, &PetBrain)>() {
        let sleeping = brain.activity() == Activity::Sleeping;
        needs.tick(config, sleeping, delta_seconds);
    }
}
