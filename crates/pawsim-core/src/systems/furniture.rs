//! Loose objects - expiring toys and toys that move on their own

use hecs::World;
use log::debug;
use pawsim_logic::arbitration::Arbitrator;
use pawsim_logic::grid::GridSurface;
use pawsim_logic::surface::NavSurface;
use pawsim_logic::InteractableId;
use rand::Rng;

use crate::components::{Interactable, Lifetime, Position, Roaming, Vec2};

/// Count down lifetimes of objects nobody has claimed. Returns the ids that
/// ran out; the caller despawns them.
pub fn lifetime_system(
    world: &mut World,
    arbitrator: &Arbitrator,
    delta_seconds: f32,
) -> Vec<InteractableId> {
    let mut expired = Vec::new();
    for (_, (item, lifetime)) in world.query_mut::<(&Interactable, &mut Lifetime)>() {
        if arbitrator.occupant(item.id).is_some() {
            continue;
        }
        lifetime.remaining -= delta_seconds;
        if lifetime.is_expired() {
            debug!("{} ran out of time", item.id);
            expired.push(item.id);
        }
    }
    expired
}

/// Move roaming toys toward a random nearby walkable point. A claimed toy
/// holds still so the claiming pet can reach it.
pub fn roaming_system<R: Rng + ?Sized>(
    world: &mut World,
    surface: &GridSurface,
    arbitrator: &Arbitrator,
    rng: &mut R,
    delta_seconds: f32,
) {
    for (_, (item, pos, roam)) in world.query_mut::<(&Interactable, &mut Position, &mut Roaming)>() {
        if arbitrator.occupant(item.id).is_some() || roam.range <= 0.0 {
            roam.destination = None;
            continue;
        }

        let destination = match roam.destination {
            Some(destination) => destination,
            None => {
                let offset = Vec2::new(
                    rng.gen_range(-roam.range..=roam.range),
                    rng.gen_range(-roam.range..=roam.range),
                );
                match surface.sample_position(pos.0 + offset, roam.range) {
                    Some(destination) => destination,
                    None => continue,
                }
            }
        };

        let next = pos.0.move_towards(destination, roam.speed * delta_seconds);
        if surface.is_blocked(next) {
            // Ran into furniture, pick somewhere else next tick
            roam.destination = None;
            continue;
        }
        pos.0 = next;
        roam.destination = if next.distance(&destination) < 0.01 {
            None
        } else {
            Some(destination)
        };
    }
}
