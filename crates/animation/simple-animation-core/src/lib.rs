//! Simple Animation Core (engine-agnostic)
//!
//! A layer of named animation states blended by weight. States crossfade
//! linearly, can be queued behind the states currently playing, and are
//! driven once per host tick by [`Engine::update`]. Clip playback itself
//! (time, speed, done flag) lives behind the [`Mixer`] trait so hosts can
//! plug in their own playback graph; [`ClipMixer`] is the in-process default.

pub mod clip;
pub mod config;
pub mod engine;
pub mod error;
pub mod handle;
pub mod ids;
pub mod mixer;
pub mod outputs;
pub mod queue;
pub mod state;
pub mod table;

// Re-exports for consumers (adapters)
pub use clip::{Clip, WrapMode};
pub use config::Config;
pub use engine::Engine;
pub use error::{BlendError, Result};
pub use handle::{StateCursor, StateHandle, StateSnapshot};
pub use ids::ClipId;
pub use mixer::{ClipInput, ClipMixer, Mixer};
pub use outputs::{EngineEvent, Outputs, WeightChange};
pub use queue::{QueueMode, QueuedTransition};
pub use state::StateRecord;
