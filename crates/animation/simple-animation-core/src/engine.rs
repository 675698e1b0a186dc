//! Engine: state ownership, transition operations and the per-tick update pass.
//!
//! Methods:
//! - load_clip, add_clip, remove_clip, play, crossfade, blend, *_queued, stop, rewind
//! - update (advance mixer → resolve queue → weights/enable → normalize → done → cleanup)

use std::fmt;

use log::{debug, trace, warn};

use crate::clip::{Clip, ClipLib, WrapMode};
use crate::config::Config;
use crate::error::{BlendError, Result};
use crate::handle::StateHandle;
use crate::ids::{ClipId, IdAllocator};
use crate::mixer::{ClipMixer, Mixer};
use crate::outputs::{EngineEvent, Outputs, WeightChange};
use crate::queue::{QueueMode, TransitionQueue};
use crate::state::StateRecord;
use crate::table::StateTable;

/// Blend engine over a mixer `M`.
pub struct Engine<M: Mixer = ClipMixer> {
    // Owned data
    cfg: Config,
    ids: IdAllocator,
    clips: ClipLib,
    pub(crate) states: StateTable,
    queue: TransitionQueue,
    pub(crate) mixer: M,

    // Completion
    done: bool,
    on_done: Option<Box<dyn FnMut()>>,

    // Per-tick outputs
    pending_events: Vec<EngineEvent>,
    outputs: Outputs,
}

impl<M: Mixer + fmt::Debug> fmt::Debug for Engine<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("cfg", &self.cfg)
            .field("states", &self.states)
            .field("queue", &self.queue)
            .field("mixer", &self.mixer)
            .field("done", &self.done)
            .field("on_done", &self.on_done.is_some())
            .finish_non_exhaustive()
    }
}

impl Engine<ClipMixer> {
    /// Create a new engine with the given config over an in-process [`ClipMixer`].
    pub fn new(cfg: Config) -> Self {
        Self::with_mixer(cfg, ClipMixer::new())
    }
}

impl Default for Engine<ClipMixer> {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

impl<M: Mixer> Engine<M> {
    /// Create a new engine driving a host-provided mixer.
    pub fn with_mixer(cfg: Config, mixer: M) -> Self {
        Self {
            states: StateTable::with_capacity(cfg.initial_state_capacity),
            cfg,
            ids: IdAllocator::new(),
            clips: ClipLib::default(),
            queue: TransitionQueue::new(),
            mixer,
            done: false,
            on_done: None,
            pending_events: Vec::new(),
            outputs: Outputs::default(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.cfg
    }

    pub fn mixer(&self) -> &M {
        &self.mixer
    }

    pub fn mixer_mut(&mut self) -> &mut M {
        &mut self.mixer
    }

    /// Outputs of the last [`Engine::update`].
    pub fn outputs(&self) -> &Outputs {
        &self.outputs
    }

    /// True once no state is enabled; cleared as soon as one is.
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Number of transitions waiting in the queue.
    pub fn queued_len(&self) -> usize {
        self.queue.len()
    }

    /// Register the callback invoked each time the engine becomes done.
    pub fn set_on_done(&mut self, callback: impl FnMut() + 'static) {
        self.on_done = Some(Box::new(callback));
    }

    /// A state was just enabled, so the next idle check counts as a new episode.
    pub(crate) fn mark_not_done(&mut self) {
        self.done = false;
    }

    pub fn clear_on_done(&mut self) {
        self.on_done = None;
    }

    pub fn keep_stopped_playables_connected(&self) -> bool {
        self.cfg.keep_stopped_playables_connected
    }

    pub fn set_keep_stopped_playables_connected(&mut self, keep: bool) {
        self.cfg.keep_stopped_playables_connected = keep;
    }

    /// Register a clip descriptor, returning its ClipId.
    pub fn load_clip(&mut self, clip: Clip) -> ClipId {
        let id = self.ids.alloc_clip();
        self.clips.insert(id, clip);
        id
    }

    pub fn clip(&self, id: ClipId) -> Option<&Clip> {
        self.clips.get(id)
    }

    pub fn loaded_clip_count(&self) -> usize {
        self.clips.len()
    }

    fn find(&self, name: &str, op: &str) -> Result<usize> {
        self.states.find(name).ok_or_else(|| {
            warn!("cannot {op} state '{name}': no state with that name");
            BlendError::not_found(name)
        })
    }

    fn emit(&mut self, event: EngineEvent) {
        if self.pending_events.len() >= self.cfg.max_events_per_tick {
            trace!("event budget exhausted, dropping {event:?}");
            return;
        }
        self.pending_events.push(event);
    }

    /// Create the record and its mixer input in the next free slot.
    fn do_add_clip(&mut self, name: String, clip_id: ClipId, clip: Clip) -> usize {
        let slot = self
            .states
            .insert(|slot| StateRecord::new(slot, name, clip_id, clip));
        let (duration, wrap_mode) = match self.states.get(slot) {
            Some(state) => (
                state.clip().playable_duration(state.wrap_mode()),
                state.wrap_mode(),
            ),
            None => return slot,
        };

        self.mixer.create_input(slot);
        self.mixer.set_duration(slot, duration);
        self.mixer.pause(slot);
        if self.cfg.keep_stopped_playables_connected {
            self.mixer.connect(slot);
        }
        debug!("added state in slot {slot} ({wrap_mode:?}, duration {duration})");
        slot
    }

    /// Add a state named `name` playing the loaded clip `clip`.
    pub fn add_clip(&mut self, clip: ClipId, name: &str) -> Result<StateHandle> {
        if self.states.find(name).is_some() {
            warn!("cannot add state '{name}': a state with that name already exists");
            return Err(BlendError::DuplicateName {
                name: name.to_string(),
            });
        }
        let data = self
            .clips
            .get(clip)
            .cloned()
            .ok_or(BlendError::UnknownClip { id: clip.0 })?;

        let slot = self.do_add_clip(name.to_string(), clip, data);
        self.update_done_status();
        self.states
            .handle(slot)
            .ok_or(BlendError::InvalidHandle { slot })
    }

    /// Remove the state and cancel its queued clones.
    pub fn remove_clip(&mut self, name: &str) -> Result<()> {
        let slot = self.find(name, "remove")?;
        self.remove_clones(slot);
        self.remove_state(slot);
        Ok(())
    }

    /// Remove every state playing `clip`. Returns whether anything was removed.
    pub fn remove_clips_using(&mut self, clip: ClipId) -> bool {
        let slots: Vec<usize> = self
            .states
            .iter()
            .filter(|s| s.clip_id() == clip)
            .map(StateRecord::slot)
            .collect();
        for &slot in &slots {
            self.remove_state(slot);
        }
        let states = &self.states;
        self.queue
            .drain_where(|e| states.resolve(e.state).is_none());
        !slots.is_empty()
    }

    fn remove_state(&mut self, slot: usize) {
        if let Some(removed) = self.states.remove(slot) {
            self.mixer.destroy_input(slot);
            debug!("removed state '{}' from slot {slot}", removed.name());
        }
    }

    /// Drop queued clones of the state in `slot`, removing them from the table.
    fn remove_clones(&mut self, slot: usize) {
        let Some(parent) = self.states.handle(slot) else {
            return;
        };
        let states = &self.states;
        let removed = self.queue.drain_where(|e| {
            states
                .resolve(e.state)
                .and_then(|s| states.get(s))
                .and_then(StateRecord::parent)
                == Some(parent)
        });
        for entry in removed {
            if let Some(clone) = self.states.resolve(entry.state) {
                self.remove_state(clone);
            }
        }
    }

    /// Clones are removed outright; other states reset and lose their queued clones.
    fn do_stop(&mut self, slot: usize) {
        let Some(state) = self.states.get_mut(slot) else {
            return;
        };
        if state.is_clone() {
            self.remove_state(slot);
            return;
        }
        state.stop(&mut self.mixer);
        self.remove_clones(slot);
    }

    /// Play `name` at full weight and stop every other state.
    pub fn play(&mut self, name: &str) -> Result<()> {
        let slot = self.find(name, "play")?;
        self.play_slot(slot);
        Ok(())
    }

    fn play_slot(&mut self, target: usize) {
        for slot in 0..self.states.len() {
            if slot == target {
                if let Some(state) = self.states.get_mut(slot) {
                    if state.enable() {
                        self.done = false;
                    }
                    state.force_weight(1.0);
                }
            } else {
                self.do_stop(slot);
            }
        }
    }

    /// Fade `name` in and every other enabled state out over `time`.
    /// A zero `time` plays immediately.
    pub fn crossfade(&mut self, name: &str, time: f32) -> Result<()> {
        let slot = self.find(name, "crossfade to")?;
        if time == 0.0 {
            self.play_slot(slot);
        } else {
            self.crossfade_slot(slot, time);
        }
        Ok(())
    }

    fn crossfade_slot(&mut self, target: usize, time: f32) {
        for state in self.states.iter_mut() {
            let is_target = state.slot() == target;
            if is_target && state.enable() {
                self.done = false;
            }
            if !state.enabled() {
                continue;
            }
            let weight = if is_target { 1.0 } else { 0.0 };
            state.setup_lerp(weight, time);
        }
    }

    /// Move the weight of `name` toward `target_weight` over `time`, leaving
    /// other states alone.
    pub fn blend(&mut self, name: &str, target_weight: f32, time: f32) -> Result<()> {
        let slot = self.find(name, "blend")?;
        if target_weight < 0.0 {
            return Err(BlendError::NegativeWeight {
                weight: target_weight,
            });
        }
        if let Some(state) = self.states.get_mut(slot) {
            if state.enable() {
                self.done = false;
            }
            if time == 0.0 {
                state.force_weight(target_weight);
            } else {
                state.setup_lerp(target_weight, time);
            }
        }
        Ok(())
    }

    fn clone_state(&mut self, slot: usize) -> Result<usize> {
        let (name, clip_id, clip, parent) = match (self.states.get(slot), self.states.handle(slot)) {
            (Some(original), Some(parent)) => (
                format!("{}{}", original.name(), self.cfg.clone_suffix),
                original.clip_id(),
                original.clip().clone(),
                parent,
            ),
            _ => return Err(BlendError::InvalidHandle { slot }),
        };
        let clone = self.do_add_clip(name, clip_id, clip);
        if let Some(state) = self.states.get_mut(clone) {
            state.set_as_clone_of(parent);
        }
        Ok(clone)
    }

    fn queue_clone(&mut self, clone: usize, fade_time: f32) -> Result<StateHandle> {
        let handle = self
            .states
            .handle(clone)
            .ok_or(BlendError::InvalidHandle { slot: clone })?;
        debug!("queued clone in slot {clone} (fade {fade_time})");
        self.queue.push_back(handle, fade_time);
        Ok(handle)
    }

    /// Play a clone of `name` now, or once the playing states are about to end.
    /// Returns the clone's handle.
    pub fn play_queued(&mut self, name: &str, mode: QueueMode) -> Result<StateHandle> {
        let slot = self.find(name, "queue play to")?;
        let clone = self.clone_state(slot)?;
        match mode {
            QueueMode::PlayNow => {
                self.play_slot(clone);
                self.states
                    .handle(clone)
                    .ok_or(BlendError::InvalidHandle { slot: clone })
            }
            QueueMode::CompleteOthers => self.queue_clone(clone, 0.0),
        }
    }

    /// Crossfade to a clone of `name` now, or once the playing states have
    /// `time` left. Returns the clone's handle.
    pub fn crossfade_queued(
        &mut self,
        name: &str,
        time: f32,
        mode: QueueMode,
    ) -> Result<StateHandle> {
        let slot = self.find(name, "queue crossfade to")?;
        let clone = self.clone_state(slot)?;
        match mode {
            QueueMode::PlayNow => {
                if time == 0.0 {
                    self.play_slot(clone);
                } else {
                    self.crossfade_slot(clone, time);
                }
                self.states
                    .handle(clone)
                    .ok_or(BlendError::InvalidHandle { slot: clone })
            }
            QueueMode::CompleteOthers => self.queue_clone(clone, time),
        }
    }

    pub fn stop(&mut self, name: &str) -> Result<()> {
        let slot = self.find(name, "stop")?;
        self.do_stop(slot);
        self.update_done_status();
        Ok(())
    }

    /// Stop every state and mark the engine done.
    pub fn stop_all(&mut self) {
        for slot in 0..self.states.len() {
            self.do_stop(slot);
        }
        self.update_done_status();
        self.done = true;
    }

    pub fn rewind(&mut self, name: &str) -> Result<()> {
        let slot = self.find(name, "rewind")?;
        if let Some(state) = self.states.get_mut(slot) {
            state.set_time(&mut self.mixer, 0.0);
        }
        Ok(())
    }

    pub fn rewind_all(&mut self) {
        for state in self.states.iter_mut() {
            state.set_time(&mut self.mixer, 0.0);
        }
    }

    /// True when any state is enabled.
    pub fn is_playing(&self) -> bool {
        self.states.any_enabled()
    }

    /// True when `name` or one of its clones is enabled. Unknown names are not playing.
    pub fn is_state_playing(&self, name: &str) -> bool {
        let Some(slot) = self.states.find(name) else {
            return false;
        };
        let parent = self.states.handle(slot);
        self.states.iter().any(|s| {
            s.enabled() && (s.slot() == slot || (s.is_clone() && s.parent() == parent))
        })
    }

    /// Number of live states, clones included.
    pub fn clip_count(&self) -> usize {
        self.states.live_count()
    }

    /// Rewind every state that is settled at zero weight. Hosts call this when
    /// their playback graph stops.
    pub fn on_graph_stop(&mut self) {
        for state in self.states.iter_mut() {
            if state.fade_speed() == 0.0 && state.target_weight() == 0.0 {
                self.mixer.set_time(state.slot(), 0.0);
                state.invalidate_time();
            }
        }
    }

    /// Step the engine by `dt`, producing outputs.
    /// The phases run in a fixed order: queued transitions are resolved against
    /// the pre-update remaining time, and weights are normalized only after
    /// every per-state mutation of the tick.
    pub fn update(&mut self, dt: f32) -> &Outputs {
        self.outputs.clear();

        // 0) Host clock
        self.mixer.advance(dt);

        // 1) Cached times are stale
        for state in self.states.iter_mut() {
            state.invalidate_time();
        }

        // 2) Queued transitions
        self.update_queued_states();

        // 3-4) Fades, enable changes, completion, normalization
        self.update_states(dt);

        // 5) Done status
        self.update_done_status();

        // 6) Retire clones that faded out
        self.clean_cloned_states();

        self.outputs.events.append(&mut self.pending_events);
        &self.outputs
    }

    /// Longest remaining play time across enabled states; -1 when none is enabled.
    fn calculate_queue_times(&mut self) -> f32 {
        let mut longest = -1.0f32;
        for state in self.states.iter_mut() {
            if !state.enabled() {
                continue;
            }
            if state.wrap_mode() == WrapMode::Loop {
                return f32::INFINITY;
            }
            let slot = state.slot();
            let speed = self.mixer.speed(slot);
            let time = state.time(&self.mixer);
            // Reverse playback yields a non-positive value, so a queue behind
            // reversed states only fires early, never late.
            let remaining = if speed > 0.0 {
                (state.clip().length - time) / speed
            } else if speed < 0.0 {
                time / speed
            } else {
                f32::INFINITY
            };
            if remaining > longest {
                longest = remaining;
            }
        }
        longest
    }

    fn update_queued_states(&mut self) {
        while let Some(head) = self.queue.front().copied() {
            let Some(slot) = self.states.resolve(head.state) else {
                self.queue.pop_front();
                debug!("dropping queued transition for stale slot {}", head.state.slot());
                self.emit(EngineEvent::QueuedTransitionDropped {
                    slot: head.state.slot(),
                });
                continue;
            };

            let remaining = self.calculate_queue_times();
            if head.fade_time < remaining {
                break;
            }

            self.queue.pop_front();
            self.crossfade_slot(slot, head.fade_time);
            let state = self
                .states
                .get(slot)
                .map(|s| s.name().to_string())
                .unwrap_or_default();
            debug!("starting queued transition to '{state}' (fade {})", head.fade_time);
            self.emit(EngineEvent::QueuedTransitionStarted {
                state,
                fade_time: head.fade_time,
            });
        }
    }

    fn update_states(&mut self, dt: f32) {
        let keep_connected = self.cfg.keep_stopped_playables_connected;
        let mut must_update_weights = false;
        let mut total_weight = 0.0f32;
        let mut events = Vec::new();

        for state in self.states.iter_mut() {
            let slot = state.slot();
            let mixer = &mut self.mixer;

            if state.step_fade(dt) && state.weight() == 0.0 {
                state.stop(&mut *mixer);
            }

            if state.enabled_dirty() {
                if state.enabled() {
                    mixer.play(slot);
                    events.push(EngineEvent::StateStarted {
                        state: state.name().to_string(),
                    });
                } else {
                    mixer.pause(slot);
                    events.push(EngineEvent::StateStopped {
                        state: state.name().to_string(),
                    });
                }

                if !keep_connected {
                    let connected = mixer.is_connected(slot);
                    if connected && !state.enabled() {
                        mixer.disconnect(slot);
                    } else if state.enabled() && !connected {
                        mixer.connect(slot);
                    }
                }
            }

            if state.enabled() && state.wrap_mode() == WrapMode::Once {
                let speed = mixer.speed(slot);
                let time = state.time(&*mixer);
                let duration = mixer.duration(slot);
                let finished = mixer.is_done(slot)
                    || (speed < 0.0 && time < 0.0)
                    || (speed >= 0.0 && time >= duration);
                if finished {
                    state.stop(&mut *mixer);
                    state.disable();
                    mixer.pause(slot);
                    if !keep_connected {
                        mixer.disconnect(slot);
                    }
                    events.push(EngineEvent::StateFinished {
                        state: state.name().to_string(),
                    });
                }
            }

            total_weight += state.weight();
            if state.weight_dirty() {
                must_update_weights = true;
            }
            state.reset_dirty_flags();
        }

        if must_update_weights {
            let has_any_weight = total_weight > 0.0;
            for state in self.states.iter() {
                let weight = if has_any_weight {
                    state.weight() / total_weight
                } else {
                    0.0
                };
                self.mixer.set_input_weight(state.slot(), weight);
                trace!("slot {} '{}' weight {weight}", state.slot(), state.name());
                self.outputs.push_weight(WeightChange {
                    slot: state.slot(),
                    state: state.name().to_string(),
                    weight,
                });
            }
        }

        for event in events {
            self.emit(event);
        }
    }

    /// Mark the engine done when nothing is enabled; the callback fires on
    /// the transition only.
    fn update_done_status(&mut self) {
        if self.states.any_enabled() {
            self.done = false;
            return;
        }
        let was_done = self.done;
        self.done = true;
        if !was_done {
            debug!("all states stopped");
            if let Some(callback) = self.on_done.as_mut() {
                callback();
            }
            self.emit(EngineEvent::Done);
        }
    }

    fn clean_cloned_states(&mut self) {
        for slot in (0..self.states.len()).rev() {
            let Some(state) = self.states.get(slot) else {
                continue;
            };
            if !state.is_ready_for_cleanup() {
                continue;
            }
            let name = state.name().to_string();
            self.mixer.disconnect(slot);
            self.remove_state(slot);
            self.emit(EngineEvent::CloneRetired { state: name });
        }
    }
}
