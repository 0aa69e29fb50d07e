//! Obstacle upkeep around surface rebuilds

use hecs::{Entity, World};
use log::{debug, warn};
use pawsim_logic::behavior::PetBrain;
use pawsim_logic::grid::GridSurface;
use pawsim_logic::surface::{prepare_obstacle, NavSurface, PrepareOutcome};

use crate::components::{Obstacle, Position, Rect};

/// How far a pet may be pushed out of freshly placed furniture.
const EVICT_RADIUS: f32 = 3.0;

/// Give every placed object a footprint the surface builder can use.
/// Returns the number of objects that block pets.
pub fn prepare_obstacles_system(world: &mut World) -> usize {
    let mut blocking = 0;
    for (entity, obstacle) in world.query_mut::<&mut Obstacle>() {
        let outcome = prepare_obstacle(&mut obstacle.0);
        if outcome == PrepareOutcome::Prepared {
            debug!("added obstacle footprint to {:?}", entity);
        }
        if outcome.is_obstacle() {
            blocking += 1;
        }
    }
    blocking
}

/// Holes the surface builder has to cut.
pub fn carved_rects(world: &World) -> Vec<Rect> {
    world
        .query::<(&Obstacle, &Position)>()
        .iter()
        .filter_map(|(_, (obstacle, pos))| obstacle.0.carved_rect(pos.0))
        .collect()
}

/// After a rebuild: push pets out of newly carved cells and have every
/// navigating pet re-plan on the new surface.
pub fn surface_rebuilt_system(world: &mut World, pets: &[Entity], surface: &mut GridSurface) {
    for &entity in pets {
        let Ok((pos, brain)) = world.query_one_mut::<(&mut Position, &mut PetBrain)>(entity) else {
            continue;
        };
        if surface.is_blocked(pos.0) {
            match surface.sample_position(pos.0, EVICT_RADIUS) {
                Some(free) => pos.0 = free,
                None => warn!("{} is boxed in by furniture", brain.agent()),
            }
        }
        brain.on_surface_rebuilt(surface);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pawsim_logic::config::{SimConfig, SurfaceConfig};
    use pawsim_logic::surface::{Collider, Footprint, ObstacleShape, RebuildableSurface};
    use pawsim_logic::needs::PetNeeds;
    use pawsim_logic::AgentId;

    fn sofa(world: &mut World, x: f32, y: f32) -> Entity {
        world.spawn((
            Position::new(x, y),
            Obstacle(ObstacleShape::new(Collider::Solid, Some(Footprint::new(2.0, 1.0)))),
        ))
    }

    #[test]
    fn test_prepare_counts_blocking_objects() {
        let mut world = World::new();
        sofa(&mut world, 3.0, 3.0);
        sofa(&mut world, 8.0, 3.0);
        world.spawn((
            Position::new(5.0, 5.0),
            Obstacle(ObstacleShape::new(Collider::Trigger, None)),
        ));

        assert!(carved_rects(&world).is_empty());
        assert_eq!(prepare_obstacles_system(&mut world), 2);
        assert_eq!(carved_rects(&world).len(), 2);
        // Second pass finds everything already prepared
        assert_eq!(prepare_obstacles_system(&mut world), 2);
    }

    #[test]
    fn test_pet_pushed_out_of_new_furniture() {
        let config = SimConfig::default();
        let mut world = World::new();
        sofa(&mut world, 5.0, 5.0);
        let pet = world.spawn((
            Position::new(5.0, 5.0),
            PetNeeds::default(),
            PetBrain::new(AgentId(1), &config),
        ));
        let mut surface = GridSurface::new(&SurfaceConfig::default()).unwrap();

        prepare_obstacles_system(&mut world);
        surface.rebuild(&carved_rects(&world)).unwrap();
        surface_rebuilt_system(&mut world, &[pet], &mut surface);

        let pos = world.get::<&Position>(pet).unwrap().0;
        assert!(!surface.is_blocked(pos));
        assert!(surface.is_on_surface(pos));
    }
}
