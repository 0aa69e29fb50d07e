//! Plain-data pet records
//!
//! A record captures what survives a save: identity, placement, needs and
//! boredom. Moment-to-moment activity is recorded for inspection only; a
//! restored pet always starts idle. The on-disk format is up to the caller.

use pawsim_logic::behavior::Activity;
use pawsim_logic::geometry::Vec2;
use pawsim_logic::needs::PetNeeds;
use pawsim_logic::AgentId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PetRecord {
    pub id: AgentId,
    pub name: String,
    pub position: Vec2,
    pub activity: Activity,
    pub needs: PetNeeds,
    /// Seconds the pet has already been bored for.
    pub bored_for: Option<f64>,
}

impl PetRecord {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
