//! Animation documents
//!
//! Sampled channel maps become `animation.<model>.<name>` entries with
//! time-keyed position, rotation and scale channels. Property channels are
//! written as sound/particle effects or timeline instructions.

mod document;
mod serializer;

pub use document::{
    AnimationDocument, AnimationEntry, BoneAnimation, EffectEntry, LoopValue, TimeChannel,
    ANIMATION_FORMAT_VERSION,
};
pub use serializer::{serialize, serialize_batch, serialize_entry, AnimationBatch, AnimationOptions, LoopMode};
