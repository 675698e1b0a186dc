//! Simple Animation component
//!
//! [`SimpleAnimation`] wraps one [`simple_animation_core::Engine`] per
//! animated object. It owns the editor-style state list, the default state,
//! play-automatically and the kick/ticking bookkeeping a host drives through
//! [`SimpleAnimation::enable`], [`SimpleAnimation::disable`] and
//! [`SimpleAnimation::tick`].

pub mod animation;
pub mod error;
pub mod settings;

pub use animation::SimpleAnimation;
pub use error::{AnimationError, Result};
pub use settings::{validate_states, AnimatorSettings, Rig, StateSpec, DEFAULT_STATE_NAME};

// Core types that appear in this crate's API.
pub use simple_animation_core::{
    BlendError, Clip, ClipId, ClipMixer, Config, EngineEvent, Mixer, Outputs, QueueMode,
    StateHandle, WrapMode,
};
