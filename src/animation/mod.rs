//! # Keyframe Animation
//!
//! - [`clip`] - keyframe tracks sampled with step, linear or cubic-spline
//!   interpolation
//! - [`mixer`] - clip actions with their own clocks and loop modes, blended
//!   into the scene graph
//! - [`controller`] - the Paused/Playing state machine that owns the pause
//!   flag of the one tracked action

pub mod clip;
pub mod controller;
pub mod mixer;

pub use clip::{AnimationClip, Interpolation, Keyframes, Track, TrackProperty};
pub use controller::{AnimationController, PlaybackState};
pub use mixer::{ActionId, AnimationMixer, ClipAction, LoopMode};
