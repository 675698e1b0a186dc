//! Per-state bookkeeping: enable flag, blend weight, fade target and clone linkage.

use crate::clip::{Clip, WrapMode};
use crate::handle::StateHandle;
use crate::ids::ClipId;
use crate::mixer::Mixer;

/// Float comparison with a relative tolerance and a small absolute floor.
#[inline]
pub(crate) fn approximately(a: f32, b: f32) -> bool {
    (b - a).abs() < (1e-6 * a.abs().max(b.abs())).max(f32::EPSILON * 8.0)
}

/// Move `current` toward `target` by at most `max_delta`, never overshooting.
#[inline]
pub(crate) fn move_towards(current: f32, target: f32, max_delta: f32) -> f32 {
    if (target - current).abs() <= max_delta {
        return target;
    }
    current + (target - current).signum() * max_delta
}

/// One named animation track living in a slot of the state table.
#[derive(Clone, Debug)]
pub struct StateRecord {
    slot: usize,
    name: String,
    clip_id: ClipId,
    clip: Clip,
    wrap_mode: WrapMode,

    enabled: bool,
    weight: f32,
    target_weight: f32,
    fade_speed: f32,
    fading: bool,

    weight_dirty: bool,
    enabled_dirty: bool,

    // Set only on clones created for queued playback.
    parent: Option<StateHandle>,
    ready_for_cleanup: bool,

    time: f32,
    time_up_to_date: bool,
}

impl StateRecord {
    pub(crate) fn new(slot: usize, name: String, clip_id: ClipId, clip: Clip) -> Self {
        let wrap_mode = clip.wrap_mode;
        Self {
            slot,
            name,
            clip_id,
            clip,
            wrap_mode,
            enabled: false,
            weight: 0.0,
            target_weight: 0.0,
            fade_speed: 0.0,
            fading: false,
            weight_dirty: false,
            enabled_dirty: false,
            parent: None,
            ready_for_cleanup: false,
            time: 0.0,
            time_up_to_date: false,
        }
    }

    #[inline]
    pub fn slot(&self) -> usize {
        self.slot
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn set_name(&mut self, name: String) {
        self.name = name;
    }

    #[inline]
    pub fn clip_id(&self) -> ClipId {
        self.clip_id
    }

    #[inline]
    pub fn clip(&self) -> &Clip {
        &self.clip
    }

    #[inline]
    pub fn wrap_mode(&self) -> WrapMode {
        self.wrap_mode
    }

    #[inline]
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    #[inline]
    pub fn weight(&self) -> f32 {
        self.weight
    }

    #[inline]
    pub fn target_weight(&self) -> f32 {
        self.target_weight
    }

    #[inline]
    pub fn fade_speed(&self) -> f32 {
        self.fade_speed
    }

    #[inline]
    pub fn fading(&self) -> bool {
        self.fading
    }

    #[inline]
    pub fn is_clone(&self) -> bool {
        self.parent.is_some()
    }

    #[inline]
    pub fn parent(&self) -> Option<StateHandle> {
        self.parent
    }

    #[inline]
    pub fn is_ready_for_cleanup(&self) -> bool {
        self.ready_for_cleanup
    }

    #[inline]
    pub(crate) fn weight_dirty(&self) -> bool {
        self.weight_dirty
    }

    #[inline]
    pub(crate) fn enabled_dirty(&self) -> bool {
        self.enabled_dirty
    }

    pub(crate) fn set_as_clone_of(&mut self, parent: StateHandle) {
        self.parent = Some(parent);
    }

    /// Returns true when the state was disabled before the call.
    pub(crate) fn enable(&mut self) -> bool {
        if self.enabled {
            return false;
        }
        self.enabled_dirty = true;
        self.enabled = true;
        true
    }

    pub(crate) fn disable(&mut self) {
        if !self.enabled {
            return;
        }
        self.enabled_dirty = true;
        self.enabled = false;
    }

    /// Set the weight and cancel any fade in progress.
    pub(crate) fn force_weight(&mut self, weight: f32) {
        self.target_weight = weight;
        self.fading = false;
        self.fade_speed = 0.0;
        self.set_weight(weight);
    }

    pub(crate) fn set_weight(&mut self, weight: f32) {
        self.weight = weight;
        self.weight_dirty = true;
    }

    pub(crate) fn fade_to(&mut self, weight: f32, speed: f32) {
        self.fading = speed.abs() > 0.0;
        self.fade_speed = speed;
        self.target_weight = weight;
    }

    /// Ramp toward `target` so the travel completes in `duration`. A fade
    /// already heading to the same target at a higher rate is kept.
    pub(crate) fn setup_lerp(&mut self, target: f32, duration: f32) {
        let travel = (self.weight - target).abs();
        let new_speed = if duration != 0.0 {
            travel / duration
        } else {
            f32::INFINITY
        };

        if self.fading && approximately(self.target_weight, target) && new_speed < self.fade_speed {
            return;
        }
        self.fade_to(target, new_speed);
    }

    /// Advance the fade by `dt`. Returns true when the weight settled at its
    /// target during this step.
    pub(crate) fn step_fade(&mut self, dt: f32) -> bool {
        if !self.fading {
            return false;
        }
        // An instant fade must complete even on a zero-length tick.
        let max_delta = if self.fade_speed.is_infinite() {
            f32::INFINITY
        } else {
            self.fade_speed * dt
        };
        let next = move_towards(self.weight, self.target_weight, max_delta);
        self.set_weight(next);
        if approximately(self.weight, self.target_weight) {
            self.force_weight(self.target_weight);
            return true;
        }
        false
    }

    pub(crate) fn time<M: Mixer + ?Sized>(&mut self, mixer: &M) -> f32 {
        if self.time_up_to_date {
            return self.time;
        }
        self.time = mixer.time(self.slot);
        self.time_up_to_date = true;
        self.time
    }

    /// Cached time without refreshing; used by read-only queries.
    pub(crate) fn peek_time<M: Mixer + ?Sized>(&self, mixer: &M) -> f32 {
        if self.time_up_to_date {
            self.time
        } else {
            mixer.time(self.slot)
        }
    }

    pub(crate) fn set_time<M: Mixer + ?Sized>(&mut self, mixer: &mut M, time: f32) {
        self.time = time;
        self.time_up_to_date = true;
        mixer.set_time(self.slot, time);
        let done = time >= mixer.duration(self.slot);
        mixer.set_done(self.slot, done);
    }

    pub(crate) fn invalidate_time(&mut self) {
        self.time_up_to_date = false;
    }

    /// Reset to disabled, zero weight and time zero. Clones become ready for cleanup.
    pub(crate) fn stop<M: Mixer + ?Sized>(&mut self, mixer: &mut M) {
        self.fade_speed = 0.0;
        self.force_weight(0.0);
        self.disable();
        self.set_time(mixer, 0.0);
        mixer.set_done(self.slot, false);
        if self.is_clone() {
            self.ready_for_cleanup = true;
        }
    }

    pub(crate) fn reset_dirty_flags(&mut self) {
        self.enabled_dirty = false;
        self.weight_dirty = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mixer::ClipMixer;

    fn record() -> StateRecord {
        StateRecord::new(0, "walk".into(), ClipId(0), Clip::new("walk", 1.0))
    }

    #[test]
    fn move_towards_never_overshoots() {
        assert_eq!(move_towards(0.0, 1.0, 0.25), 0.25);
        assert_eq!(move_towards(0.9, 1.0, 0.25), 1.0);
        assert_eq!(move_towards(1.0, 0.0, 0.4), 0.6);
        assert_eq!(move_towards(0.5, 0.5, f32::INFINITY), 0.5);
    }

    #[test]
    fn enable_marks_dirty_only_on_change() {
        let mut r = record();
        assert!(r.enable());
        assert!(r.enabled_dirty());
        r.reset_dirty_flags();
        assert!(!r.enable());
        assert!(!r.enabled_dirty());
    }

    #[test]
    fn slower_lerp_toward_same_target_is_ignored() {
        let mut r = record();
        r.setup_lerp(1.0, 0.5);
        assert_eq!(r.fade_speed(), 2.0);
        r.setup_lerp(1.0, 2.0);
        assert_eq!(r.fade_speed(), 2.0);
        r.setup_lerp(1.0, 0.25);
        assert_eq!(r.fade_speed(), 4.0);
    }

    #[test]
    fn fade_snaps_to_target() {
        let mut r = record();
        r.setup_lerp(1.0, 1.0);
        assert!(!r.step_fade(0.6));
        assert!(r.step_fade(0.6));
        assert_eq!(r.weight(), 1.0);
        assert!(!r.fading());
    }

    #[test]
    fn stop_resets_and_flags_clones() {
        let mut m = ClipMixer::new();
        m.create_input(0);
        let mut r = record();
        r.set_as_clone_of(StateHandle::new(3, 0));
        r.enable();
        r.force_weight(1.0);
        r.set_time(&mut m, 0.7);
        r.stop(&mut m);
        assert!(!r.enabled());
        assert_eq!(r.weight(), 0.0);
        assert_eq!(m.time(0), 0.0);
        assert!(r.is_ready_for_cleanup());
    }
}
