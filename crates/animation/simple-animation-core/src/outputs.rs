//! Output contracts from the blend engine.
//!
//! Outputs carry the normalized weights pushed to the mixer this tick and a
//! separate list of semantic events. Hosts that only care about the mixer can
//! ignore both.

use serde::{Deserialize, Serialize};

/// Normalized weight delivered to one mixer input this tick.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WeightChange {
    pub slot: usize,
    pub state: String,
    pub weight: f32,
}

/// Discrete semantic signals emitted during stepping.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum EngineEvent {
    /// The mixer input of a state started playing.
    StateStarted { state: String },
    /// The mixer input of a state was paused after the state got disabled.
    StateStopped { state: String },
    /// A `Once` state reached its end.
    StateFinished { state: String },
    /// A queued transition left the queue and started fading in.
    QueuedTransitionStarted { state: String, fade_time: f32 },
    /// A queued transition was dropped because its clone no longer exists.
    QueuedTransitionDropped { slot: usize },
    /// A clone that faded out was removed.
    CloneRetired { state: String },
    /// No state is enabled anymore.
    Done,
}

/// Outputs returned by [`crate::Engine::update`].
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Outputs {
    #[serde(default)]
    pub weights: Vec<WeightChange>,
    #[serde(default)]
    pub events: Vec<EngineEvent>,
}

impl Outputs {
    #[inline]
    pub fn clear(&mut self) {
        self.weights.clear();
        self.events.clear();
    }

    #[inline]
    pub fn push_weight(&mut self, change: WeightChange) {
        self.weights.push(change);
    }

    /// Sum of the normalized weights pushed this tick.
    pub fn total_weight(&self) -> f32 {
        self.weights.iter().map(|w| w.weight).sum()
    }
}
