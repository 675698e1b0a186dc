//! Clip descriptors and the engine's clip library.
//!
//! The core never samples clip content. A clip is only a length, a looping
//! flag and the wrap mode new states inherit from it.

use serde::{Deserialize, Serialize};

use crate::ids::ClipId;

/// Playback looping policy of a state.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WrapMode {
    /// Play to the end, then stop and disable the state.
    #[default]
    Once,
    Loop,
    /// Play to the end and hold the last frame.
    ClampForever,
    PingPong,
}

/// Descriptor of an external animation resource.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Clip {
    pub name: String,
    /// Length in seconds.
    pub length: f32,
    #[serde(default)]
    pub looping: bool,
    #[serde(default)]
    pub wrap_mode: WrapMode,
}

impl Clip {
    pub fn new(name: impl Into<String>, length: f32) -> Self {
        Self {
            name: name.into(),
            length,
            looping: false,
            wrap_mode: WrapMode::Once,
        }
    }

    pub fn looping(name: impl Into<String>, length: f32) -> Self {
        Self {
            name: name.into(),
            length,
            looping: true,
            wrap_mode: WrapMode::Loop,
        }
    }

    pub fn with_wrap_mode(mut self, wrap_mode: WrapMode) -> Self {
        self.wrap_mode = wrap_mode;
        self
    }

    /// Playable duration a state built from this clip should be given.
    /// Non-looping clips and `Once` states end at the clip length.
    pub fn playable_duration(&self, wrap_mode: WrapMode) -> f32 {
        if !self.looping || wrap_mode == WrapMode::Once {
            self.length
        } else {
            f32::INFINITY
        }
    }
}

/// Minimal clip library storage.
#[derive(Default, Debug)]
pub(crate) struct ClipLib {
    items: Vec<(ClipId, Clip)>,
}

impl ClipLib {
    pub(crate) fn insert(&mut self, id: ClipId, clip: Clip) {
        self.items.push((id, clip));
    }

    pub(crate) fn get(&self, id: ClipId) -> Option<&Clip> {
        self.items
            .iter()
            .find_map(|(c, d)| if *c == id { Some(d) } else { None })
    }

    pub(crate) fn len(&self) -> usize {
        self.items.len()
    }
}
