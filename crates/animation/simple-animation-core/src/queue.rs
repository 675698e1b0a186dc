//! Transitions waiting for the playing states to approach their end.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::handle::StateHandle;

/// How a queued play or crossfade request is scheduled.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum QueueMode {
    /// Wait until the currently playing states are about to finish.
    #[default]
    #[serde(alias = "Queued")]
    CompleteOthers,
    /// Start right away on a fresh clone.
    PlayNow,
}

/// A clone state paired with the fade duration it was requested with.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QueuedTransition {
    pub state: StateHandle,
    pub fade_time: f32,
}

/// FIFO of pending transitions. Appends at the tail; the update pass pops
/// the head; cancellation removes entries anywhere.
#[derive(Debug, Default)]
pub struct TransitionQueue {
    entries: VecDeque<QueuedTransition>,
}

impl TransitionQueue {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn push_back(&mut self, state: StateHandle, fade_time: f32) {
        self.entries.push_back(QueuedTransition { state, fade_time });
    }

    #[inline]
    pub fn front(&self) -> Option<&QueuedTransition> {
        self.entries.front()
    }

    pub fn pop_front(&mut self) -> Option<QueuedTransition> {
        self.entries.pop_front()
    }

    /// Remove every entry matching `pred`, preserving the order of the rest.
    /// Returns the removed entries in queue order.
    pub fn drain_where(
        &mut self,
        mut pred: impl FnMut(&QueuedTransition) -> bool,
    ) -> Vec<QueuedTransition> {
        let mut removed = Vec::new();
        self.entries.retain(|entry| {
            if pred(entry) {
                removed.push(*entry);
                false
            } else {
                true
            }
        });
        removed
    }
}
