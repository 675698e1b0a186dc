//! The per-object component: state list, default state and tick bookkeeping.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use hashbrown::HashMap;
use log::{debug, warn};
use simple_animation_core::{
    Clip, ClipId, ClipMixer, Config, Engine, Mixer, Outputs, QueueMode, StateHandle, WrapMode,
};

use crate::error::{AnimationError, Result};
use crate::settings::{validate_states, AnimatorSettings, Rig, StateSpec, DEFAULT_STATE_NAME};

/// One animated object.
///
/// Operations that start playback "kick" the component so [`Self::tick`]
/// advances the engine again. When the engine reports that every state has
/// stopped the component stops ticking until the next kick.
pub struct SimpleAnimation<M: Mixer = ClipMixer> {
    settings: AnimatorSettings,
    states: Vec<StateSpec>,
    clips: HashMap<String, ClipId>,
    engine: Engine<M>,

    initialized: bool,
    ticking: bool,
    // Raised by the engine's completion callback, consumed after each engine call.
    done_signal: Rc<Cell<bool>>,
}

impl<M: Mixer + fmt::Debug> fmt::Debug for SimpleAnimation<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimpleAnimation")
            .field("settings", &self.settings)
            .field("states", &self.states)
            .field("initialized", &self.initialized)
            .field("ticking", &self.ticking)
            .field("engine", &self.engine)
            .finish_non_exhaustive()
    }
}

impl SimpleAnimation<ClipMixer> {
    /// Component over an in-process [`ClipMixer`]. The state list is validated.
    pub fn new(settings: AnimatorSettings, states: Vec<StateSpec>) -> Self {
        let cfg = Config {
            keep_stopped_playables_connected: settings.keep_stopped_playables_connected,
            ..Config::default()
        };
        Self::with_mixer(settings, states, cfg, ClipMixer::new())
    }

    pub fn from_rig(rig: Rig) -> Self {
        Self::new(rig.settings, rig.states)
    }
}

impl<M: Mixer> SimpleAnimation<M> {
    pub fn with_mixer(
        settings: AnimatorSettings,
        mut states: Vec<StateSpec>,
        cfg: Config,
        mixer: M,
    ) -> Self {
        validate_states(&mut states, settings.default_clip.as_deref());
        let mut engine = Engine::with_mixer(cfg, mixer);
        let done_signal = Rc::new(Cell::new(false));
        let signal = Rc::clone(&done_signal);
        engine.set_on_done(move || signal.set(true));
        Self {
            settings,
            states,
            clips: HashMap::new(),
            engine,
            initialized: false,
            ticking: false,
            done_signal,
        }
    }

    pub fn engine(&self) -> &Engine<M> {
        &self.engine
    }

    pub fn settings(&self) -> &AnimatorSettings {
        &self.settings
    }

    /// Current state list. Rebuilt from the engine after states are added or removed.
    pub fn state_specs(&self) -> &[StateSpec] {
        &self.states
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Whether [`Self::tick`] currently advances the engine.
    pub fn is_ticking(&self) -> bool {
        self.ticking
    }

    pub fn play_automatically(&self) -> bool {
        self.settings.play_automatically
    }

    pub fn set_play_automatically(&mut self, value: bool) {
        self.settings.play_automatically = value;
    }

    pub fn wrap_mode(&self) -> WrapMode {
        self.settings.wrap_mode
    }

    pub fn set_wrap_mode(&mut self, wrap_mode: WrapMode) {
        self.settings.wrap_mode = wrap_mode;
    }

    pub fn default_clip(&self) -> Option<&str> {
        self.settings.default_clip.as_deref()
    }

    /// Takes effect for the "Default" state the next time it has to be created.
    pub fn set_default_clip(&mut self, clip: Option<String>) {
        self.settings.default_clip = clip;
    }

    pub fn keep_stopped_playables_connected(&self) -> bool {
        self.engine.keep_stopped_playables_connected()
    }

    pub fn set_keep_stopped_playables_connected(&mut self, keep: bool) {
        self.settings.keep_stopped_playables_connected = keep;
        self.engine.set_keep_stopped_playables_connected(keep);
    }

    /// Make a clip available to the state list under its name.
    pub fn register_clip(&mut self, clip: Clip) -> Result<ClipId> {
        if self.clips.contains_key(&clip.name) {
            return Err(AnimationError::DuplicateClip { name: clip.name });
        }
        let name = clip.name.clone();
        let id = self.engine.load_clip(clip);
        self.clips.insert(name, id);
        Ok(id)
    }

    pub fn register_clips(&mut self, clips: impl IntoIterator<Item = Clip>) -> Result<()> {
        for clip in clips {
            self.register_clip(clip)?;
        }
        Ok(())
    }

    fn clip_id(&self, name: &str) -> Result<ClipId> {
        self.clips
            .get(name)
            .copied()
            .ok_or_else(|| AnimationError::UnknownClip {
                name: name.to_string(),
            })
    }

    fn default_clip_id(&self) -> Option<ClipId> {
        self.settings
            .default_clip
            .as_deref()
            .and_then(|name| self.clips.get(name).copied())
    }

    fn kick(&mut self) {
        if !self.ticking {
            debug!("animation kicked");
            self.ticking = true;
        }
    }

    fn sync_done(&mut self) {
        if self.done_signal.replace(false) {
            debug!("all states stopped; ticking paused");
            self.ticking = false;
        }
    }

    /// Build the engine states from the state list. Runs once.
    pub fn initialize(&mut self) -> Result<()> {
        if self.initialized {
            return Ok(());
        }

        for spec in self.states.clone() {
            let Some(clip) = spec.clip.as_deref() else {
                continue;
            };
            let Some(&id) = self.clips.get(clip) else {
                warn!("state '{}' uses unregistered clip '{clip}'", spec.name);
                continue;
            };
            let added = self.engine.add_clip(id, &spec.name);
            self.sync_done();
            if let Err(err) = added {
                warn!("skipping state '{}': {err}", spec.name);
            }
        }

        self.ensure_default_state_exists()?;
        self.play_default()?;
        self.kick();
        self.initialized = true;
        Ok(())
    }

    fn ensure_default_state_exists(&mut self) -> Result<()> {
        let Some(id) = self.default_clip_id() else {
            return Ok(());
        };
        if self.engine.get_state(DEFAULT_STATE_NAME).is_none() {
            let added = self.engine.add_clip(id, DEFAULT_STATE_NAME);
            self.sync_done();
            added?;
            self.kick();
        }
        Ok(())
    }

    /// Host enabled the object: initialize, start ticking and, with
    /// play-automatically, restart from the default state.
    pub fn enable(&mut self) -> Result<()> {
        self.initialize()?;
        self.ticking = true;
        if self.settings.play_automatically {
            self.stop_all();
            self.play_default()?;
        }
        Ok(())
    }

    /// Host disabled the object: stop everything and rewind settled states.
    pub fn disable(&mut self) {
        if !self.initialized {
            return;
        }
        self.stop_all();
        self.ticking = false;
        self.engine.on_graph_stop();
    }

    /// Advance by `dt`. Returns `None` while the component is not ticking.
    pub fn tick(&mut self, dt: f32) -> Option<&Outputs> {
        if !self.ticking {
            return None;
        }
        self.engine.update(dt);
        self.sync_done();
        Some(self.engine.outputs())
    }

    /// Play the "Default" state when there is a default clip and
    /// play-automatically is set.
    pub fn play_default(&mut self) -> Result<()> {
        self.kick();
        if self.default_clip_id().is_some() && self.settings.play_automatically {
            self.engine.play(DEFAULT_STATE_NAME)?;
        }
        Ok(())
    }

    pub fn play(&mut self, name: &str) -> Result<()> {
        self.kick();
        Ok(self.engine.play(name)?)
    }

    pub fn crossfade(&mut self, name: &str, fade_length: f32) -> Result<()> {
        self.kick();
        Ok(self.engine.crossfade(name, fade_length)?)
    }

    pub fn blend(&mut self, name: &str, target_weight: f32, fade_length: f32) -> Result<()> {
        self.kick();
        Ok(self.engine.blend(name, target_weight, fade_length)?)
    }

    pub fn play_queued(&mut self, name: &str, mode: QueueMode) -> Result<StateHandle> {
        self.kick();
        Ok(self.engine.play_queued(name, mode)?)
    }

    pub fn crossfade_queued(
        &mut self,
        name: &str,
        fade_length: f32,
        mode: QueueMode,
    ) -> Result<StateHandle> {
        self.kick();
        Ok(self.engine.crossfade_queued(name, fade_length, mode)?)
    }

    pub fn stop(&mut self, name: &str) -> Result<()> {
        let stopped = self.engine.stop(name);
        self.sync_done();
        Ok(stopped?)
    }

    pub fn stop_all(&mut self) {
        self.engine.stop_all();
        self.sync_done();
    }

    pub fn rewind(&mut self, name: &str) -> Result<()> {
        self.kick();
        Ok(self.engine.rewind(name)?)
    }

    pub fn rewind_all(&mut self) {
        self.kick();
        self.engine.rewind_all();
    }

    /// Add a state named `name` playing the registered clip `clip`.
    pub fn add_state(&mut self, clip: &str, name: &str) -> Result<StateHandle> {
        let id = self.clip_id(clip)?;
        self.kick();
        let added = self.engine.add_clip(id, name);
        self.sync_done();
        let handle = added?;
        self.rebuild_states();
        Ok(handle)
    }

    pub fn add_clip(&mut self, clip: &str, name: &str) -> Result<StateHandle> {
        self.add_state(clip, name)
    }

    pub fn remove_state(&mut self, name: &str) -> Result<()> {
        self.engine.remove_clip(name)?;
        self.rebuild_states();
        Ok(())
    }

    /// Remove every state playing the registered clip `clip`. Returns whether
    /// anything was removed.
    pub fn remove_clip(&mut self, clip: &str) -> Result<bool> {
        let id = self.clip_id(clip)?;
        let removed = self.engine.remove_clips_using(id);
        if removed {
            self.rebuild_states();
        }
        Ok(removed)
    }

    pub fn is_playing(&self) -> bool {
        self.engine.is_playing()
    }

    pub fn is_state_playing(&self, name: &str) -> bool {
        self.engine.is_state_playing(name)
    }

    pub fn clip_count(&self) -> usize {
        self.engine.clip_count()
    }

    pub fn get_state(&self, name: &str) -> Option<StateHandle> {
        self.engine.get_state(name)
    }

    pub fn states(&self) -> impl Iterator<Item = StateHandle> + '_ {
        self.engine.states()
    }

    pub fn set_state_enabled(&mut self, state: StateHandle, enabled: bool) -> Result<()> {
        self.engine.set_state_enabled(state, enabled)?;
        if enabled {
            self.kick();
        }
        Ok(())
    }

    pub fn set_state_time(&mut self, state: StateHandle, time: f32) -> Result<()> {
        self.engine.set_state_time(state, time)?;
        self.kick();
        Ok(())
    }

    pub fn set_state_normalized_time(&mut self, state: StateHandle, normalized: f32) -> Result<()> {
        self.engine.set_state_normalized_time(state, normalized)?;
        self.kick();
        Ok(())
    }

    pub fn set_state_speed(&mut self, state: StateHandle, speed: f32) -> Result<()> {
        self.engine.set_state_speed(state, speed)?;
        self.kick();
        Ok(())
    }

    pub fn set_state_weight(&mut self, state: StateHandle, weight: f32) -> Result<()> {
        self.engine.set_state_weight(state, weight)?;
        self.kick();
        Ok(())
    }

    pub fn set_state_name(&mut self, state: StateHandle, name: &str) -> Result<()> {
        self.engine.set_state_name(state, name)?;
        self.rebuild_states();
        Ok(())
    }

    fn rebuild_states(&mut self) {
        let engine = &self.engine;
        let specs: Vec<StateSpec> = engine
            .states()
            .filter_map(|handle| engine.record(handle).ok())
            .map(|record| StateSpec::new(record.clip().name.clone(), record.name()))
            .collect();
        self.states = specs;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn component(play_automatically: bool) -> SimpleAnimation {
        let settings = AnimatorSettings {
            play_automatically,
            default_clip: Some("idle".into()),
            ..AnimatorSettings::default()
        };
        let mut anim = SimpleAnimation::new(settings, vec![StateSpec::new("wave", "wave")]);
        anim.register_clips([Clip::looping("idle", 2.0), Clip::new("wave", 1.0)])
            .unwrap();
        anim
    }

    #[test]
    fn initialize_runs_once() {
        let mut anim = component(false);
        anim.initialize().unwrap();
        assert_eq!(anim.clip_count(), 2);
        anim.initialize().unwrap();
        assert_eq!(anim.clip_count(), 2);
    }

    #[test]
    fn default_state_plays_automatically() {
        let mut anim = component(true);
        anim.enable().unwrap();
        assert!(anim.is_ticking());
        assert!(anim.is_state_playing(DEFAULT_STATE_NAME));
        assert!(!anim.is_state_playing("wave"));
    }

    #[test]
    fn duplicate_clip_registration_is_rejected() {
        let mut anim = component(true);
        assert_eq!(
            anim.register_clip(Clip::new("wave", 3.0)),
            Err(AnimationError::DuplicateClip {
                name: "wave".into()
            })
        );
    }

    #[test]
    fn tick_is_a_no_op_until_kicked() {
        let mut anim = component(false);
        assert!(anim.tick(0.1).is_none());
        anim.initialize().unwrap();
        anim.play("wave").unwrap();
        assert!(anim.tick(0.1).is_some());
    }
}
