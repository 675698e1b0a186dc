//! Core configuration for simple-animation-core.

use serde::{Deserialize, Serialize};

/// Engine behaviour switches and sizing hints.
/// Keep this minimal; expand as needed without breaking API.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Stopped states stay connected to the mixer (paused) instead of being
    /// disconnected until they play again.
    pub keep_stopped_playables_connected: bool,

    /// Initial capacity hint for the state table.
    pub initial_state_capacity: usize,

    /// Appended to a state's name to name the clones created by queued playback.
    pub clone_suffix: String,

    /// Maximum events to retain per tick; later events of the tick are dropped.
    pub max_events_per_tick: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            keep_stopped_playables_connected: true,
            initial_state_capacity: 8,
            clone_suffix: "Queued Clone".to_string(),
            max_events_per_tick: 1024,
        }
    }
}

impl Config {
    /// Parse a config from JSON. Missing fields take their default value.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
