//! What a pet can see of the scene.
//!
//! Behavior code never touches the ECS directly. The engine rebuilds a
//! [`SceneSnapshot`] every tick and pets query it through [`WorldQuery`].

use serde::{Deserialize, Serialize};

use crate::geometry::Vec2;
use crate::needs::Meal;
use crate::InteractableId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InteractableKind {
    ToyMouse,
    CatTeaser,
    Bed,
    Food,
}

impl InteractableKind {
    pub const TOYS: [InteractableKind; 2] = [InteractableKind::ToyMouse, InteractableKind::CatTeaser];

    pub fn is_toy(&self) -> bool {
        matches!(self, InteractableKind::ToyMouse | InteractableKind::CatTeaser)
    }
}

/// Read-only view of one interactable at the start of a tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InteractableSnapshot {
    pub id: InteractableId,
    pub kind: InteractableKind,
    /// Point a pet has to reach to interact.
    pub anchor: Vec2,
    /// Present for food only.
    pub meal: Option<Meal>,
}

pub trait WorldQuery {
    fn interactable(&self, id: InteractableId) -> Option<InteractableSnapshot>;

    /// Nearest interactable of one of `kinds` within `radius` of `from`
    /// that `accept` agrees to. Ties go to the lower id.
    fn nearest_interactable(
        &self,
        kinds: &[InteractableKind],
        from: Vec2,
        radius: f32,
        accept: &dyn Fn(&InteractableSnapshot) -> bool,
    ) -> Option<InteractableSnapshot>;
}

/// Flat list of interactables, rebuilt by the engine every tick.
#[derive(Debug, Clone, Default)]
pub struct SceneSnapshot {
    items: Vec<InteractableSnapshot>,
}

impl SceneSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Insert or replace by id.
    pub fn upsert(&mut self, snapshot: InteractableSnapshot) {
        match self.items.iter_mut().find(|s| s.id == snapshot.id) {
            Some(existing) => *existing = snapshot,
            None => self.items.push(snapshot),
        }
    }

    pub fn remove(&mut self, id: InteractableId) -> Option<InteractableSnapshot> {
        let index = self.items.iter().position(|s| s.id == id)?;
        Some(self.items.swap_remove(index))
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &InteractableSnapshot> {
        self.items.iter()
    }
}

impl WorldQuery for SceneSnapshot {
    fn interactable(&self, id: InteractableId) -> Option<InteractableSnapshot> {
        self.items.iter().find(|s| s.id == id).copied()
    }

    fn nearest_interactable(
        &self,
        kinds: &[InteractableKind],
        from: Vec2,
        radius: f32,
        accept: &dyn Fn(&InteractableSnapshot) -> bool,
    ) -> Option<InteractableSnapshot> {
        let radius_sq = radius * radius;
        self.items
            .iter()
            .filter(|s| kinds.contains(&s.kind))
            .map(|s| (s, s.anchor.distance_squared(&from)))
            .filter(|(s, d)| *d <= radius_sq && accept(s))
            .min_by(|(a, da), (b, db)| da.total_cmp(db).then(a.id.cmp(&b.id)))
            .map(|(s, _)| *s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: u32, kind: InteractableKind, x: f32, y: f32) -> InteractableSnapshot {
        InteractableSnapshot {
            id: InteractableId(id),
            kind,
            anchor: Vec2::new(x, y),
            meal: None,
        }
    }

    #[test]
    fn nearest_respects_kind_radius_and_filter() {
        let mut scene = SceneSnapshot::new();
        scene.upsert(item(1, InteractableKind::ToyMouse, 3.0, 0.0));
        scene.upsert(item(2, InteractableKind::CatTeaser, 1.0, 0.0));
        scene.upsert(item(3, InteractableKind::Bed, 0.5, 0.0));
        scene.upsert(item(4, InteractableKind::ToyMouse, 9.0, 0.0));

        let any = |_: &InteractableSnapshot| true;
        let hit = scene.nearest_interactable(&InteractableKind::TOYS, Vec2::ZERO, 5.0, &any);
        assert_eq!(hit.map(|s| s.id), Some(InteractableId(2)));

        let not_two = |s: &InteractableSnapshot| s.id != InteractableId(2);
        let hit = scene.nearest_interactable(&InteractableKind::TOYS, Vec2::ZERO, 5.0, &not_two);
        assert_eq!(hit.map(|s| s.id), Some(InteractableId(1)));

        let hit = scene.nearest_interactable(&[InteractableKind::Food], Vec2::ZERO, 50.0, &any);
        assert!(hit.is_none());
    }

    #[test]
    fn ties_go_to_lower_id() {
        let mut scene = SceneSnapshot::new();
        scene.upsert(item(7, InteractableKind::Bed, 2.0, 0.0));
        scene.upsert(item(5, InteractableKind::Bed, -2.0, 0.0));
        let hit = scene.nearest_interactable(&[InteractableKind::Bed], Vec2::ZERO, 5.0, &|_| true);
        assert_eq!(hit.map(|s| s.id), Some(InteractableId(5)));
    }

    #[test]
    fn upsert_replaces_and_remove_drops() {
        let mut scene = SceneSnapshot::new();
        scene.upsert(item(1, InteractableKind::ToyMouse, 0.0, 0.0));
        scene.upsert(item(1, InteractableKind::ToyMouse, 4.0, 4.0));
        assert_eq!(scene.len(), 1);
        assert_eq!(scene.interactable(InteractableId(1)).map(|s| s.anchor), Some(Vec2::new(4.0, 4.0)));

        assert!(scene.remove(InteractableId(1)).is_some());
        assert!(scene.interactable(InteractableId(1)).is_none());
        assert!(scene.remove(InteractableId(1)).is_none());
    }
}
