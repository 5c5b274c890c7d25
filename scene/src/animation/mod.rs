//! Keyframe animation of node transforms.
//!
//! Clips hold tracks that each drive one TRS property of one node. A mixer
//! owns an action per clip and writes the sampled pose into the scene.

mod action;
mod clip;
mod mixer;
mod track;

pub use action::{ActionState, AnimationAction, LoopMode};
pub use clip::AnimationClip;
pub use mixer::AnimationMixer;
pub use track::{cubic_hermite, lerp, lerp_array, slerp, Interpolation, Keyframes, Track, TrackProperty, TrackValue};
