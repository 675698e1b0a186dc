//! State handles, detached enumeration and handle-based state access.
//!
//! A [`StateHandle`] is a slot index plus the slot generation it was taken
//! at. Every accessor re-resolves it against the table and fails with
//! [`BlendError::InvalidHandle`] once the record is gone, even if the slot
//! now holds another state.

use serde::{Deserialize, Serialize};

use crate::clip::{Clip, WrapMode};
use crate::engine::Engine;
use crate::error::{BlendError, Result};
use crate::ids::ClipId;
use crate::mixer::Mixer;
use crate::state::StateRecord;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StateHandle {
    slot: usize,
    generation: u32,
}

impl StateHandle {
    pub(crate) fn new(slot: usize, generation: u32) -> Self {
        Self { slot, generation }
    }

    #[inline]
    pub fn slot(&self) -> usize {
        self.slot
    }

    #[inline]
    pub fn generation(&self) -> u32 {
        self.generation
    }
}

/// Read-only view of a state, detached from the engine.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StateSnapshot {
    pub name: String,
    pub slot: usize,
    pub clip: String,
    pub wrap_mode: WrapMode,
    pub enabled: bool,
    pub weight: f32,
    pub target_weight: f32,
    pub fade_speed: f32,
    pub time: f32,
    pub speed: f32,
    pub is_clone: bool,
}

/// Enumerator over live states that does not borrow the engine.
///
/// It records the table version when created; once a state is added or
/// removed every call fails with [`BlendError::CollectionModified`].
#[derive(Copy, Clone, Debug)]
pub struct StateCursor {
    version: u64,
    next: usize,
}

impl StateCursor {
    /// Next live state, or `None` after the last one.
    pub fn next<M: Mixer>(&mut self, engine: &Engine<M>) -> Result<Option<StateHandle>> {
        self.check(engine)?;
        let Some(slot) = engine.states.next_live_from(self.next) else {
            self.next = engine.states.len();
            return Ok(None);
        };
        self.next = slot + 1;
        Ok(engine.states.handle(slot))
    }

    pub fn reset<M: Mixer>(&mut self, engine: &Engine<M>) -> Result<()> {
        self.check(engine)?;
        self.next = 0;
        Ok(())
    }

    fn check<M: Mixer>(&self, engine: &Engine<M>) -> Result<()> {
        if self.version != engine.states.version() {
            return Err(BlendError::CollectionModified);
        }
        Ok(())
    }
}

impl<M: Mixer> Engine<M> {
    /// Handle of the first live state named `name`.
    pub fn get_state(&self, name: &str) -> Option<StateHandle> {
        self.states
            .find(name)
            .and_then(|slot| self.states.handle(slot))
    }

    /// Handles of all live states in slot order.
    pub fn states(&self) -> impl Iterator<Item = StateHandle> + '_ {
        self.states
            .iter()
            .filter_map(|s| self.states.handle(s.slot()))
    }

    /// Detached enumerator; see [`StateCursor`].
    pub fn cursor(&self) -> StateCursor {
        StateCursor {
            version: self.states.version(),
            next: 0,
        }
    }

    pub fn is_valid(&self, handle: StateHandle) -> bool {
        self.states.resolve(handle).is_some()
    }

    fn resolve(&self, handle: StateHandle) -> Result<usize> {
        self.states
            .resolve(handle)
            .ok_or(BlendError::InvalidHandle {
                slot: handle.slot(),
            })
    }

    /// Record behind `handle`.
    pub fn record(&self, handle: StateHandle) -> Result<&StateRecord> {
        let slot = self.resolve(handle)?;
        self.states
            .get(slot)
            .ok_or(BlendError::InvalidHandle { slot })
    }

    fn record_mut(&mut self, handle: StateHandle) -> Result<&mut StateRecord> {
        let slot = self.resolve(handle)?;
        self.states
            .get_mut(slot)
            .ok_or(BlendError::InvalidHandle { slot })
    }

    pub fn state_enabled(&self, handle: StateHandle) -> Result<bool> {
        Ok(self.record(handle)?.enabled())
    }

    /// Enable or disable without touching weight or time.
    pub fn set_state_enabled(&mut self, handle: StateHandle, enabled: bool) -> Result<()> {
        let state = self.record_mut(handle)?;
        if !enabled {
            state.disable();
        } else if state.enable() {
            self.mark_not_done();
        }
        Ok(())
    }

    pub fn state_time(&self, handle: StateHandle) -> Result<f32> {
        Ok(self.record(handle)?.peek_time(&self.mixer))
    }

    pub fn set_state_time(&mut self, handle: StateHandle, time: f32) -> Result<()> {
        let slot = self.resolve(handle)?;
        if let Some(state) = self.states.get_mut(slot) {
            state.set_time(&mut self.mixer, time);
        }
        Ok(())
    }

    /// Time as a fraction of the clip length; a zero length counts as 1.
    pub fn state_normalized_time(&self, handle: StateHandle) -> Result<f32> {
        let state = self.record(handle)?;
        Ok(state.peek_time(&self.mixer) / non_zero_length(state.clip()))
    }

    pub fn set_state_normalized_time(&mut self, handle: StateHandle, normalized: f32) -> Result<()> {
        let length = non_zero_length(self.record(handle)?.clip());
        self.set_state_time(handle, normalized * length)
    }

    pub fn state_speed(&self, handle: StateHandle) -> Result<f32> {
        let slot = self.resolve(handle)?;
        Ok(self.mixer.speed(slot))
    }

    pub fn set_state_speed(&mut self, handle: StateHandle, speed: f32) -> Result<()> {
        let slot = self.resolve(handle)?;
        self.mixer.set_speed(slot, speed);
        Ok(())
    }

    pub fn state_name(&self, handle: StateHandle) -> Result<&str> {
        Ok(self.record(handle)?.name())
    }

    /// Rename a state. The name must be non-empty and unused by other states.
    pub fn set_state_name(&mut self, handle: StateHandle, name: &str) -> Result<()> {
        let slot = self.resolve(handle)?;
        if name.is_empty() {
            return Err(BlendError::IllegalArgument {
                reason: "an empty string is not a valid state name".to_string(),
            });
        }
        if self.states.find(name).is_some_and(|other| other != slot) {
            return Err(BlendError::DuplicateName {
                name: name.to_string(),
            });
        }
        if let Some(state) = self.states.get_mut(slot) {
            state.set_name(name.to_string());
        }
        Ok(())
    }

    /// Raw (un-normalized) blend weight.
    pub fn state_weight(&self, handle: StateHandle) -> Result<f32> {
        Ok(self.record(handle)?.weight())
    }

    /// Set the raw weight. A fade in progress keeps running from the new value.
    pub fn set_state_weight(&mut self, handle: StateHandle, weight: f32) -> Result<()> {
        let state = self.record_mut(handle)?;
        if weight < 0.0 {
            return Err(BlendError::NegativeWeight { weight });
        }
        state.set_weight(weight);
        Ok(())
    }

    /// Playback length at the current speed; infinite when paused by speed 0.
    pub fn state_length(&self, handle: StateHandle) -> Result<f32> {
        let state = self.record(handle)?;
        let speed = self.mixer.speed(state.slot());
        if speed == 0.0 {
            return Ok(f32::INFINITY);
        }
        Ok(state.clip().length / speed)
    }

    pub fn state_clip(&self, handle: StateHandle) -> Result<&Clip> {
        Ok(self.record(handle)?.clip())
    }

    pub fn state_clip_id(&self, handle: StateHandle) -> Result<ClipId> {
        Ok(self.record(handle)?.clip_id())
    }

    pub fn state_wrap_mode(&self, handle: StateHandle) -> Result<WrapMode> {
        Ok(self.record(handle)?.wrap_mode())
    }

    pub fn state_snapshot(&self, handle: StateHandle) -> Result<StateSnapshot> {
        let state = self.record(handle)?;
        let slot = state.slot();
        Ok(StateSnapshot {
            name: state.name().to_string(),
            slot,
            clip: state.clip().name.clone(),
            wrap_mode: state.wrap_mode(),
            enabled: state.enabled(),
            weight: state.weight(),
            target_weight: state.target_weight(),
            fade_speed: state.fade_speed(),
            time: state.peek_time(&self.mixer),
            speed: self.mixer.speed(slot),
            is_clone: state.is_clone(),
        })
    }
}

fn non_zero_length(clip: &Clip) -> f32 {
    if clip.length == 0.0 {
        1.0
    } else {
        clip.length
    }
}
