//! cubekit-anim
//!
//! Turns animated scene state into reduced keyframe channels.
//!
//! | Module | Role |
//! |--------|------|
//! | [`source`] | [`FrameEvaluator`] / [`RestPose`] collaborator traits and the scene-file implementation |
//! | [`sampler`] | per-bone sampling relative to the rest pose and keyframe reduction |
//! | [`rotation`] | Euler continuity (full turns and the dual form) |
//! | [`events`] | discrete custom-property channels (visibility, sound, particles, instructions) |
//!
//! # Example
//!
//! ```rust,ignore
//! use cubekit_anim::{sample_animation, SampleRequest};
//! use cubekit_geometry::{build, SceneDescription};
//!
//! let scene = SceneDescription::from_path("zombie.yaml")?;
//! let tree = build(&scene)?;
//! let channels = sample_animation(&tree, &scene, &scene, &SampleRequest::new(0, 40))?;
//! ```

pub mod events;
pub mod rotation;
pub mod sampler;
pub mod source;

pub use events::{sample_property, PropertyChannel, PropertyKind};
pub use sampler::{
    reduce, sample, sample_animation, sample_bone, BoneChannels, ChannelKind, ChannelMap,
    Keyframe, SampleMode, SampleRequest, Tolerances,
};
pub use source::{FrameEvaluator, RestPose};
