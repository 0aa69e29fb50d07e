//! Exclusive access to interactable objects.
//!
//! Every interactable has a single slot. At most one pet holds a slot at a
//! time and a pet holds at most one slot across all interactables. There is
//! no queueing: the first pet to ask in a tick wins and everyone else gets
//! `false` back.

use std::collections::HashMap;

use log::debug;

use crate::{AgentId, InteractableId};

/// Capacity-one slot attached to an interactable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InteractionSlot {
    occupant: Option<AgentId>,
    enabled: bool,
    /// Pets currently showing interest without holding the slot.
    attracted: u32,
}

impl InteractionSlot {
    pub fn new() -> Self {
        Self {
            occupant: None,
            enabled: true,
            attracted: 0,
        }
    }

    /// Claim the slot. Fails without side effects while anyone, including
    /// `agent` itself, occupies it.
    pub fn try_enter(&mut self, agent: AgentId) -> bool {
        match self.occupant {
            Some(_) => false,
            None if self.enabled => {
                self.occupant = Some(agent);
                true
            }
            None => false,
        }
    }

    /// Release the slot if `agent` holds it.
    pub fn leave(&mut self, agent: AgentId) -> bool {
        if self.occupant == Some(agent) {
            self.occupant = None;
            true
        } else {
            false
        }
    }

    pub fn is_available(&self) -> bool {
        self.occupant.is_none()
    }

    pub fn occupant(&self) -> Option<AgentId> {
        self.occupant
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn attracted(&self) -> u32 {
        self.attracted
    }
}

/// Registry of all interaction slots in the scene.
#[derive(Debug, Clone, Default)]
pub struct Arbitrator {
    slots: HashMap<InteractableId, InteractionSlot>,
    held: HashMap<AgentId, InteractableId>,
}

impl Arbitrator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a slot for a newly spawned interactable. Registering an id twice
    /// keeps the existing slot.
    pub fn register(&mut self, id: InteractableId) {
        self.slots.entry(id).or_insert_with(InteractionSlot::new);
    }

    /// Remove an interactable. Returns the pet that was evicted, if any.
    pub fn despawn(&mut self, id: InteractableId) -> Option<AgentId> {
        let slot = self.slots.remove(&id)?;
        let evicted = slot.occupant;
        if let Some(agent) = evicted {
            self.held.remove(&agent);
            debug!("{} despawned while held by {}", id, agent);
        }
        evicted
    }

    /// Enable or disable new entries. A disabled slot keeps its occupant.
    pub fn set_enabled(&mut self, id: InteractableId, enabled: bool) {
        if let Some(slot) = self.slots.get_mut(&id) {
            slot.enabled = enabled;
        }
    }

    /// Claim `id` for `agent`.
    ///
    /// Fails without side effects when the slot is unknown, disabled or
    /// occupied (by anyone), or when `agent` already holds a slot.
    pub fn try_enter(&mut self, id: InteractableId, agent: AgentId) -> bool {
        if self.held.contains_key(&agent) {
            return false;
        }
        let Some(slot) = self.slots.get_mut(&id) else {
            return false;
        };
        if !slot.try_enter(agent) {
            return false;
        }
        self.held.insert(agent, id);
        true
    }

    /// Release `id` if `agent` holds it. Any other call is a no-op.
    pub fn leave(&mut self, id: InteractableId, agent: AgentId) -> bool {
        let released = self
            .slots
            .get_mut(&id)
            .map_or(false, |slot| slot.leave(agent));
        if self.held.get(&agent) == Some(&id) {
            self.held.remove(&agent);
        }
        released
    }

    /// Unknown ids are reported available: nothing holds them.
    pub fn is_available(&self, id: InteractableId) -> bool {
        self.slots.get(&id).map_or(true, InteractionSlot::is_available)
    }

    /// True when `id` exists, is enabled and free.
    pub fn can_enter(&self, id: InteractableId) -> bool {
        self.slots
            .get(&id)
            .map_or(false, |slot| slot.enabled && slot.is_available())
    }

    /// Drop whatever `agent` holds (the pet was removed from the scene).
    pub fn release_agent(&mut self, agent: AgentId) -> Option<InteractableId> {
        let id = self.held.remove(&agent)?;
        if let Some(slot) = self.slots.get_mut(&id) {
            slot.leave(agent);
        }
        Some(id)
    }

    /// The slot `agent` currently holds.
    pub fn holding(&self, agent: AgentId) -> Option<InteractableId> {
        self.held.get(&agent).copied()
    }

    pub fn occupant(&self, id: InteractableId) -> Option<AgentId> {
        self.slots.get(&id).and_then(InteractionSlot::occupant)
    }

    pub fn slot(&self, id: InteractableId) -> Option<&InteractionSlot> {
        self.slots.get(&id)
    }

    pub fn note_attracted(&mut self, id: InteractableId) {
        if let Some(slot) = self.slots.get_mut(&id) {
            slot.attracted += 1;
        }
    }

    pub fn clear_attracted(&mut self, id: InteractableId) {
        if let Some(slot) = self.slots.get_mut(&id) {
            slot.attracted = slot.attracted.saturating_sub(1);
        }
    }

    pub fn occupied_count(&self) -> usize {
        self.slots.values().filter(|s| !s.is_available()).count()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}
