//! Presentation cues.
//!
//! Cues tell the presentation layer that something worth showing happened
//! (a curiosity bubble, a sleep animation). They are fire-and-forget: the
//! behavior core never waits on them.

use serde::{Deserialize, Serialize};

use crate::{AgentId, InteractableId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Cue {
    ShowCuriosity { agent: AgentId, target: InteractableId },
    HideCuriosity { agent: AgentId },
    StartInteracting { agent: AgentId, target: InteractableId },
    EndInteracting { agent: AgentId, target: InteractableId },
    StartSleeping { agent: AgentId, target: InteractableId },
    WakeUp { agent: AgentId },
    StartEating { agent: AgentId, target: InteractableId },
    FinishEating { agent: AgentId, target: InteractableId },
    BecameBored { agent: AgentId },
    /// Navigation gave up or the target disappeared.
    Confused { agent: AgentId },
}

impl Cue {
    pub fn agent(&self) -> AgentId {
        match *self {
            Cue::ShowCuriosity { agent, .. }
            | Cue::HideCuriosity { agent }
            | Cue::StartInteracting { agent, .. }
            | Cue::EndInteracting { agent, .. }
            | Cue::StartSleeping { agent, .. }
            | Cue::WakeUp { agent }
            | Cue::StartEating { agent, .. }
            | Cue::FinishEating { agent, .. }
            | Cue::BecameBored { agent }
            | Cue::Confused { agent } => agent,
        }
    }
}

pub trait CueSink {
    fn emit(&mut self, cue: Cue);
}

/// Buffers cues until the presentation layer drains them.
#[derive(Debug, Clone, Default)]
pub struct CueLog {
    cues: Vec<Cue>,
}

impl CueLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn drain(&mut self) -> Vec<Cue> {
        std::mem::take(&mut self.cues)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Cue> {
        self.cues.iter()
    }

    pub fn len(&self) -> usize {
        self.cues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cues.is_empty()
    }
}

impl CueSink for CueLog {
    fn emit(&mut self, cue: Cue) {
        self.cues.push(cue);
    }
}
