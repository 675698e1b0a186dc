//! Output sink contract and the in-process clip mixer.
//!
//! The engine never owns clip playback time. It drives one mixer input per
//! live state slot: play/pause, time, speed, duration, done flag, connection
//! and the normalized weight. Hosts with their own playback graph implement
//! [`Mixer`] over it; everyone else uses [`ClipMixer`].

use serde::{Deserialize, Serialize};

/// Per-slot playback primitives plus the weighted mix.
pub trait Mixer {
    /// Create the playable for `slot`, replacing anything left there.
    fn create_input(&mut self, slot: usize);
    /// Release the playable for `slot`; disconnects it first.
    fn destroy_input(&mut self, slot: usize);

    fn connect(&mut self, slot: usize);
    fn disconnect(&mut self, slot: usize);
    fn is_connected(&self, slot: usize) -> bool;

    /// Normalized contribution of `slot` to the mixed output.
    fn set_input_weight(&mut self, slot: usize, weight: f32);
    fn input_weight(&self, slot: usize) -> f32;

    fn time(&self, slot: usize) -> f32;
    fn set_time(&mut self, slot: usize, time: f32);
    fn duration(&self, slot: usize) -> f32;
    fn set_duration(&mut self, slot: usize, duration: f32);
    fn speed(&self, slot: usize) -> f32;
    fn set_speed(&mut self, slot: usize, speed: f32);

    fn play(&mut self, slot: usize);
    fn pause(&mut self, slot: usize);
    fn is_playing(&self, slot: usize) -> bool;

    fn is_done(&self, slot: usize) -> bool;
    fn set_done(&mut self, slot: usize, done: bool);

    /// Host clock tick. Mixers whose time is advanced elsewhere leave this empty.
    fn advance(&mut self, dt: f32);
}

/// Local playback state of one clip input.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClipInput {
    pub time: f32,
    pub duration: f32,
    pub speed: f32,
    pub playing: bool,
    pub done: bool,
    pub connected: bool,
    pub weight: f32,
}

impl Default for ClipInput {
    fn default() -> Self {
        Self {
            time: 0.0,
            duration: f32::INFINITY,
            speed: 1.0,
            playing: true,
            done: false,
            connected: false,
            weight: 0.0,
        }
    }
}

/// Mixer that keeps every input's state in memory and advances playing
/// inputs by `dt * speed` on each tick.
#[derive(Clone, Debug, Default)]
pub struct ClipMixer {
    inputs: Vec<Option<ClipInput>>,
}

impl ClipMixer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn input(&self, slot: usize) -> Option<&ClipInput> {
        self.inputs.get(slot).and_then(Option::as_ref)
    }

    /// Number of input slots, including released ones.
    pub fn input_count(&self) -> usize {
        self.inputs.len()
    }

    /// Sum of the weights of connected inputs.
    pub fn connected_weight(&self) -> f32 {
        self.inputs
            .iter()
            .flatten()
            .filter(|i| i.connected)
            .map(|i| i.weight)
            .sum()
    }

    fn input_mut(&mut self, slot: usize) -> Option<&mut ClipInput> {
        self.inputs.get_mut(slot).and_then(Option::as_mut)
    }
}

impl Mixer for ClipMixer {
    fn create_input(&mut self, slot: usize) {
        if slot >= self.inputs.len() {
            self.inputs.resize(slot + 1, None);
        }
        self.inputs[slot] = Some(ClipInput::default());
    }

    fn destroy_input(&mut self, slot: usize) {
        if let Some(entry) = self.inputs.get_mut(slot) {
            *entry = None;
        }
    }

    fn connect(&mut self, slot: usize) {
        if let Some(i) = self.input_mut(slot) {
            i.connected = true;
        }
    }

    fn disconnect(&mut self, slot: usize) {
        if let Some(i) = self.input_mut(slot) {
            i.connected = false;
        }
    }

    fn is_connected(&self, slot: usize) -> bool {
        self.input(slot).is_some_and(|i| i.connected)
    }

    fn set_input_weight(&mut self, slot: usize, weight: f32) {
        if let Some(i) = self.input_mut(slot) {
            i.weight = weight;
        }
    }

    fn input_weight(&self, slot: usize) -> f32 {
        self.input(slot).map_or(0.0, |i| i.weight)
    }

    fn time(&self, slot: usize) -> f32 {
        self.input(slot).map_or(0.0, |i| i.time)
    }

    fn set_time(&mut self, slot: usize, time: f32) {
        if let Some(i) = self.input_mut(slot) {
            i.time = time;
        }
    }

    fn duration(&self, slot: usize) -> f32 {
        self.input(slot).map_or(f32::INFINITY, |i| i.duration)
    }

    fn set_duration(&mut self, slot: usize, duration: f32) {
        if let Some(i) = self.input_mut(slot) {
            i.duration = duration;
        }
    }

    fn speed(&self, slot: usize) -> f32 {
        self.input(slot).map_or(0.0, |i| i.speed)
    }

    fn set_speed(&mut self, slot: usize, speed: f32) {
        if let Some(i) = self.input_mut(slot) {
            i.speed = speed;
        }
    }

    fn play(&mut self, slot: usize) {
        if let Some(i) = self.input_mut(slot) {
            i.playing = true;
        }
    }

    fn pause(&mut self, slot: usize) {
        if let Some(i) = self.input_mut(slot) {
            i.playing = false;
        }
    }

    fn is_playing(&self, slot: usize) -> bool {
        self.input(slot).is_some_and(|i| i.playing)
    }

    fn is_done(&self, slot: usize) -> bool {
        self.input(slot).is_some_and(|i| i.done)
    }

    fn set_done(&mut self, slot: usize, done: bool) {
        if let Some(i) = self.input_mut(slot) {
            i.done = done;
        }
    }

    fn advance(&mut self, dt: f32) {
        for input in self.inputs.iter_mut().flatten() {
            if !input.playing {
                continue;
            }
            input.time += dt * input.speed;
            if input.time >= input.duration {
                input.done = true;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advance_moves_only_playing_inputs() {
        let mut m = ClipMixer::new();
        m.create_input(0);
        m.create_input(1);
        m.pause(1);
        m.set_speed(0, 2.0);
        m.advance(0.25);
        assert_eq!(m.time(0), 0.5);
        assert_eq!(m.time(1), 0.0);
    }

    #[test]
    fn reaching_duration_sets_done() {
        let mut m = ClipMixer::new();
        m.create_input(2);
        assert_eq!(m.input_count(), 3);
        m.set_duration(2, 1.0);
        m.advance(0.5);
        assert!(!m.is_done(2));
        m.advance(0.5);
        assert!(m.is_done(2));
    }

    #[test]
    fn destroyed_inputs_read_as_defaults() {
        let mut m = ClipMixer::new();
        m.create_input(0);
        m.connect(0);
        m.set_input_weight(0, 1.0);
        m.destroy_input(0);
        assert!(!m.is_connected(0));
        assert_eq!(m.input_weight(0), 0.0);
        assert!(m.input(0).is_none());
    }
}
